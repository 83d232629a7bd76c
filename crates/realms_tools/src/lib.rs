//! # Realms Development Tools
//!
//! Command-line tools for development:
//! - Config validators
//! - Cost curve tables

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod costs;
pub mod validate;
