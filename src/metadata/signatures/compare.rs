//! Structural signature equivalence.
//!
//! The comparator answers one question: do two signatures, built from two independent views
//! of the same program, describe the same thing? Nothing is compared by identity. Named types
//! are matched with [`crate::metadata::typename::TypeName::matches`], and a primitive element
//! type is equal to the `System` type it abbreviates: reflection reports `System.Int32` where
//! a signature blob says `int32`.

use crate::metadata::signatures::{SignatureMethod, TypeSignature};

/// Returns `true` if both type signatures describe the same type.
#[must_use]
pub fn type_sig_eq(left: &TypeSignature, right: &TypeSignature) -> bool {
    use TypeSignature as T;

    match (left, right) {
        (T::Ptr(l), T::Ptr(r))
        | (T::ByRef(l), T::ByRef(r))
        | (T::Pinned(l), T::Pinned(r))
        | (T::SzArray(l), T::SzArray(r)) => type_sig_eq(l, r),
        (T::Array(l, l_rank), T::Array(r, r_rank)) => l_rank == r_rank && type_sig_eq(l, r),
        (T::GenericInst(l_def, l_args), T::GenericInst(r_def, r_args)) => {
            type_sig_eq(l_def, r_def) && type_list_eq(l_args, r_args)
        }
        (T::GenericParamType(l), T::GenericParamType(r))
        | (T::GenericParamMethod(l), T::GenericParamMethod(r)) => l == r,
        (T::FnPtr(l), T::FnPtr(r)) => method_sig_eq(l, r),
        _ => match (left.type_name(), right.type_name()) {
            (Some(l), Some(r)) => l.matches(&r),
            _ => left == right,
        },
    }
}

/// Returns `true` if both lists have the same length and are pairwise equivalent.
#[must_use]
pub fn type_list_eq(left: &[TypeSignature], right: &[TypeSignature]) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .zip(right)
            .all(|(left, right)| type_sig_eq(left, right))
}

/// Returns `true` if both method signatures have the same shape.
///
/// Calling convention, generic arity, return type and every parameter type have to agree.
#[must_use]
pub fn method_sig_eq(left: &SignatureMethod, right: &SignatureMethod) -> bool {
    left.has_this == right.has_this
        && left.explicit_this == right.explicit_this
        && left.vararg == right.vararg
        && left.param_count_generic == right.param_count_generic
        && type_sig_eq(&left.return_type, &right.return_type)
        && type_list_eq(&left.params, &right.params)
}
