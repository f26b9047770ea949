//! Core data types for the Trellis dependency resolver.
//!
//! This crate defines what the resolver works on: Maven versions and version
//! ranges, dependency scopes, artifacts and their conflict ids, artifact
//! filters, repositories, dependency management, and the resolver
//! configuration file.
//!
//! This crate is intentionally free of graph logic and I/O beyond reading the
//! configuration file.

pub mod artifact;
pub mod config;
pub mod filter;
pub mod managed;
pub mod range;
pub mod repository;
pub mod scope;
pub mod version;
