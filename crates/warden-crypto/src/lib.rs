//! Cryptography for Warden
//!
//! A single symmetric key protects cached credentials at rest.

pub mod vault;

pub use vault::*;
