//! Qualified type names.
//!
//! A disk module and the running process describe the same types in two unrelated object
//! graphs, so types are paired by name: assembly, namespace and the chain of enclosing types
//! for nested types.
//!
//! # Examples
//!
//! ```rust
//! use dotswap::metadata::typename::TypeName;
//!
//! let name = TypeName::parse("MyMod.Outer+Inner, MyMod")?;
//! assert_eq!(name.namespace, "MyMod");
//! assert_eq!(name.enclosing, vec!["Outer".to_string()]);
//! assert_eq!(name.name, "Inner");
//! assert_eq!(name.to_string(), "MyMod.Outer+Inner");
//! # Ok::<(), dotswap::Error>(())
//! ```

use std::fmt;

use crate::Result;

/// The qualified name of a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TypeName {
    /// Simple name of the defining assembly, if known
    pub assembly: Option<String>,
    /// Namespace of the type (of the outermost enclosing type for nested types)
    pub namespace: String,
    /// Names of the enclosing types, outermost first
    pub enclosing: Vec<String>,
    /// The type's own name, including a generic arity suffix such as `` `1 ``
    pub name: String,
}

impl TypeName {
    /// Creates a top-level type name.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        TypeName {
            assembly: None,
            namespace: namespace.into(),
            enclosing: Vec::new(),
            name: name.into(),
        }
    }

    /// Sets the defining assembly.
    #[must_use]
    pub fn in_assembly(mut self, assembly: impl Into<String>) -> Self {
        self.assembly = Some(assembly.into());
        self
    }

    /// Returns the name of a type nested in `self`.
    #[must_use]
    pub fn nested(&self, name: impl Into<String>) -> Self {
        let mut enclosing = self.enclosing.clone();
        enclosing.push(self.name.clone());

        TypeName {
            assembly: self.assembly.clone(),
            namespace: self.namespace.clone(),
            enclosing,
            name: name.into(),
        }
    }

    /// Parses `Namespace.Outer+Inner[, Assembly[, Version=...]]`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] for an empty type name.
    pub fn parse(input: &str) -> Result<Self> {
        let mut parts = input.splitn(2, ',');
        let full_name = parts.next().unwrap_or_default().trim();
        let assembly = parts
            .next()
            .and_then(|rest| rest.split(',').next())
            .map(str::trim)
            .filter(|assembly| !assembly.is_empty())
            .map(str::to_string);

        let mut path = full_name.split('+').map(str::to_string).collect::<Vec<_>>();
        let Some(name) = path.pop().filter(|name| !name.is_empty()) else {
            return Err(malformed_error!("Invalid type name - '{}'", input));
        };

        // The namespace is part of the outermost segment
        match path.first_mut() {
            Some(outermost) => {
                let (namespace, outer) = split_namespace(outermost);
                *outermost = outer;
                Ok(TypeName {
                    assembly,
                    namespace,
                    enclosing: path,
                    name,
                })
            }
            None => {
                let (namespace, name) = split_namespace(&name);
                Ok(TypeName {
                    assembly,
                    namespace,
                    enclosing: Vec::new(),
                    name,
                })
            }
        }
    }

    /// Returns the full name without assembly, e.g. `System.Collections.Generic.List`1`.
    #[must_use]
    pub fn full_name(&self) -> String {
        self.to_string()
    }

    /// Returns `true` if both names denote the same type.
    ///
    /// Assembly names are only compared when both sides know them, and case-insensitively.
    #[must_use]
    pub fn matches(&self, other: &TypeName) -> bool {
        if self.namespace != other.namespace
            || self.name != other.name
            || self.enclosing != other.enclosing
        {
            return false;
        }

        match (&self.assembly, &other.assembly) {
            (Some(left), Some(right)) => left.eq_ignore_ascii_case(right),
            _ => true,
        }
    }
}

fn split_namespace(segment: &str) -> (String, String) {
    match segment.rfind('.') {
        Some(index) => (
            segment[..index].to_string(),
            segment[index + 1..].to_string(),
        ),
        None => (String::new(), segment.to_string()),
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.namespace.is_empty() {
            write!(f, "{}.", self.namespace)?;
        }
        for outer in &self.enclosing {
            write!(f, "{outer}+")?;
        }
        write!(f, "{}", self.name)
    }
}
