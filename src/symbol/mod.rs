//! Symbol table module.
//!
//! This module tracks every entity the parser declares and decides where it
//! lives at run time:
//!
//! - A stack of scopes, one per lexical nesting level
//! - A hashed name index with per-scope and all-scopes lookup
//! - Frame offsets for locals, temporaries and parameters
//! - Forward declarations checked against their later definitions
//! - The run-time library routines every program can call

pub mod entry;
pub mod library;
pub mod symbol;

#[cfg(test)]
mod tests;
