//! Method and type signatures.
//!
//! Signatures here are already decoded: type references are carried as [`TypeName`] values,
//! not as tokens, so a signature read from a disk module and a signature reported by the
//! running process can be compared with [`method_sig_eq`] and [`type_sig_eq`].
//!
//! # Examples
//!
//! ```rust
//! use dotswap::metadata::signatures::{method_sig_eq, SignatureMethod, TypeSignature};
//! use dotswap::metadata::typename::TypeName;
//!
//! let disk = SignatureMethod::new(TypeSignature::Void, vec![TypeSignature::I4]);
//! let live = SignatureMethod::new(
//!     TypeSignature::Void,
//!     vec![TypeSignature::ValueType(TypeName::new("System", "Int32"))],
//! );
//! assert!(method_sig_eq(&disk, &live));
//! ```
//!
//! [`TypeName`]: crate::metadata::typename::TypeName

mod compare;
mod types;

pub use compare::{method_sig_eq, type_list_eq, type_sig_eq};
pub use types::{SignatureMethod, TypeSignature};
