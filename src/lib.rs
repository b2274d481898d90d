//! gcpsync
//!
//! Reconciles declared Compute Engine objects (static addresses and routes)
//! with the Compute API: builds insert payloads from declared state, waits
//! for the resulting operations, reads canonical state back and imports
//! existing objects by id.

pub mod config;
pub mod error;
pub mod gcp;
pub mod resource;

pub use error::{Error, ErrorKind, Result};
