//! Type system of the source language.
//!
//! Types are small tagged values compared structurally. The only subtlety is
//! `Any`, the element type of the empty list, which unifies with any type
//! other than `Void`.

pub mod types;
