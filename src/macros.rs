//! Utility macros for the backend.
//!
//! This module defines helper macros used throughout the crate:
//!
//! - `MK_ERROR!` - Creates an Error that has no source position yet
//! - `MK_INTERNAL!` - Creates an internal (contract violation) Error from a format string
//!
//! Positions are attached later by the compilation context, which is the only
//! layer that knows where the parser currently is.

/// Creates an Error instance without a position.
///
/// # Example
///
/// ```ignore
/// return Err(MK_ERROR!(ErrorImpl::DuplicateIdentifier { name }));
/// ```
#[macro_export]
macro_rules! MK_ERROR {
    ($impl:expr) => {
        $crate::errors::errors::Error::new($impl, $crate::Position::null())
    };
}

/// Creates an internal Error from a format string.
///
/// # Example
///
/// ```ignore
/// return Err(MK_INTERNAL!("store: operand cannot be a constant"));
/// ```
#[macro_export]
macro_rules! MK_INTERNAL {
    ($($arg:tt)*) => {
        $crate::MK_ERROR!($crate::errors::errors::ErrorImpl::Internal {
            message: format!($($arg)*),
        })
    };
}
