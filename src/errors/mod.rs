//! Error types and error handling for the backend.
//!
//! This module defines the error taxonomy shared by the symbol table, the
//! intermediate code and the code generator:
//!
//! - `ErrorImpl` variants for every failure the backend can report
//! - `ErrorKind`, the syntax/semantic/internal/fatal classification and its exit code
//! - `Error`, which pairs a variant with the source position it was raised at
//! - Tips shown next to the diagnostic

pub mod errors;
