//! Shared utilities for the Trellis dependency resolver.
//!
//! This crate holds the cross-cutting error type used when loading
//! configuration and metadata catalogs from disk.

pub mod errors;
