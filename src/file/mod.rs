//! Access to compiled modules on disk.
//!
//! A hot-swap pass never searches the filesystem: the host registers the path of every loaded
//! module's file up front (see [`crate::hotswap::ModuleIndex`]). This module turns such a path
//! into a validated PE image whose bytes the metadata decoder can read.
//!
//! # Architecture
//!
//! - [`Backend`] abstracts over the source of the image bytes
//! - `Physical` memory-maps a file from disk
//! - `Memory` owns an in-memory buffer
//! - [`File`] couples a backend with the parsed PE headers and rejects images that carry no
//!   CLR runtime header
//! - [`parser::Parser`] and [`io`] provide bounds-checked reads for method bodies and
//!   instruction streams
//!
//! # Examples
//!
//! ```rust,no_run
//! use dotswap::File;
//! use std::path::Path;
//!
//! let file = File::from_file(Path::new("Mods/Example/Assemblies/Example.dll"))?;
//! let (clr_rva, clr_size) = file.clr()?;
//! println!("CLR runtime header: RVA=0x{:x}, size={}", clr_rva, clr_size);
//! # Ok::<(), dotswap::Error>(())
//! ```

pub mod io;
pub mod parser;

mod memory;
mod physical;

use std::path::Path;

use crate::{
    Error::{Empty, GoblinErr},
    Result,
};
use goblin::pe::PE;
use memory::Memory;
use ouroboros::self_referencing;
use physical::Physical;

/// Backend trait for file data sources.
///
/// This trait abstracts over the source of PE data, allowing for both in-memory and on-disk
/// representations. All implementations must be thread-safe.
pub trait Backend: Send + Sync {
    /// Returns a slice of the data at the given offset and length.
    ///
    /// # Errors
    ///
    /// Returns an error if the requested range is out of bounds.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize;
}

#[self_referencing]
/// A loaded PE image of a compiled module.
///
/// The `File` keeps the image bytes alive together with the PE headers parsed from them.
/// Construction fails unless the image is a PE file with a CLR runtime header, so every
/// `File` handed to a [`crate::metadata::MetadataDecoder`] is known to carry .NET metadata.
pub struct File {
    /// The underlying data source (memory or file).
    data: Box<dyn Backend>,
    /// The parsed PE structure, referencing the data.
    #[borrows(data)]
    #[not_covariant]
    pe: PE<'this>,
}

impl File {
    /// Loads and validates the module at `file`.
    ///
    /// The file is memory-mapped for the lifetime of the returned value.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read or opened
    /// - The file is not a valid PE format
    /// - The PE file does not contain .NET metadata (missing CLR runtime header)
    /// - The file is empty
    pub fn from_file(file: &Path) -> Result<File> {
        let input = Physical::new(file)?;

        Self::load(input)
    }

    /// Loads and validates a module image from a memory buffer.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`File::from_file`], apart from I/O failures.
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        let input = Memory::new(data);

        Self::load(input)
    }

    fn load<T: Backend + 'static>(data: T) -> Result<File> {
        if data.len() == 0 {
            return Err(Empty);
        }

        let data = Box::new(data);

        File::try_new(data, |data| match PE::parse(data.data()) {
            Ok(pe) => match pe.header.optional_header {
                Some(optional_header) => {
                    if optional_header
                        .data_directories
                        .get_clr_runtime_header()
                        .is_none()
                    {
                        Err(malformed_error!(
                            "File does not have a CLR runtime header directory"
                        ))
                    } else {
                        Ok(pe)
                    }
                }
                None => Err(malformed_error!("File does not have an OptionalHeader")),
            },
            Err(error) => Err(GoblinErr(error)),
        })
    }

    /// Returns the total size of the loaded image in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data().len()
    }

    /// Returns `true` if the image has a length of zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the raw image bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.with_data(|data| data.data())
    }

    /// Returns a bounds-checked slice of the image.
    ///
    /// # Errors
    ///
    /// Returns an error if the requested range is out of bounds.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.with_data(|data| data.data_slice(offset, len))
    }

    /// Returns the RVA and size of the CLR runtime header.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the directory is missing, which cannot happen for
    /// a `File` that passed validation.
    pub fn clr(&self) -> Result<(usize, usize)> {
        self.with_pe(|pe| {
            let clr_dir = pe
                .header
                .optional_header
                .and_then(|header| header.data_directories.get_clr_runtime_header().copied());

            match clr_dir {
                Some(dir) => Ok((dir.virtual_address as usize, dir.size as usize)),
                None => Err(malformed_error!("CLR runtime header directory is missing")),
            }
        })
    }

    /// Converts a relative virtual address (RVA) to a file offset.
    ///
    /// # Errors
    ///
    /// Returns an error if the RVA does not fall into any section.
    pub fn rva_to_offset(&self, rva: usize) -> Result<usize> {
        let rva_u32 = u32::try_from(rva)
            .map_err(|_| malformed_error!("RVA too large to fit in u32: {}", rva))?;

        self.with_pe(|pe| {
            for section in &pe.sections {
                let Some(section_max) = section.virtual_address.checked_add(section.virtual_size)
                else {
                    return Err(malformed_error!(
                        "Section malformed, causing integer overflow - {} + {}",
                        section.virtual_address,
                        section.virtual_size
                    ));
                };

                if section.virtual_address <= rva_u32 && section_max > rva_u32 {
                    return Ok((rva - section.virtual_address as usize)
                        + section.pointer_to_raw_data as usize);
                }
            }

            Err(malformed_error!(
                "RVA could not be converted to offset - {}",
                rva
            ))
        })
    }

    /// Returns the image bytes starting at the method body located at `rva`.
    ///
    /// The slice runs to the end of the image; [`crate::metadata::method::MethodBody::from`]
    /// reads only as much of it as the body header declares.
    ///
    /// # Errors
    ///
    /// Returns an error if the RVA cannot be mapped into the image.
    pub fn method_body_at(&self, rva: u32) -> Result<&[u8]> {
        let offset = self.rva_to_offset(rva as usize)?;
        let len = self.len().saturating_sub(offset);
        self.data_slice(offset, len)
    }
}
