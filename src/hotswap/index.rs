//! The index of loaded modules and their files.
//!
//! Finding out which file a loaded module came from is the module loader's business. It
//! records the answer here once per module, typically at startup; every pass then walks the
//! index in registration order. Entries are never removed.

use std::path::{Path, PathBuf};

use crate::runtime::ModuleHandle;

/// A loaded module with an on-disk counterpart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleEntry {
    /// The live module.
    ///
    /// A pass does not resolve anything through this handle: disk types are found by their
    /// qualified name in the module's assembly. It identifies the entry for the host, e.g. in
    /// [`ModuleIndex::path_of`], and in log lines.
    pub module: ModuleHandle,
    /// Display name used in log lines, e.g. the plugin name
    pub name: String,
    /// Path of the module file
    pub path: PathBuf,
}

/// Append-only registry of loaded modules and their file paths.
///
/// Registration takes `&self`, so the loader can fill the index while holding only a shared
/// reference.
#[derive(Debug, Default)]
pub struct ModuleIndex {
    entries: boxcar::Vec<ModuleEntry>,
}

impl ModuleIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        ModuleIndex::default()
    }

    /// Records the file of a loaded module and returns its position in the index.
    pub fn register(
        &self,
        module: ModuleHandle,
        name: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> usize {
        self.entries.push(ModuleEntry {
            module,
            name: name.into(),
            path: path.into(),
        })
    }

    /// Returns the file path registered for `module`.
    #[must_use]
    pub fn path_of(&self, module: ModuleHandle) -> Option<&Path> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.module == module)
            .map(|(_, entry)| entry.path.as_path())
    }

    /// Iterates over the entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ModuleEntry> {
        self.entries.iter().map(|(_, entry)| entry)
    }

    /// Returns the number of registered modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.count()
    }

    /// Returns `true` if no module is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
