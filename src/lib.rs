//! relwatch - GitHub release assistant
//!
//! This library routes natural-language questions about GitHub repositories
//! to one of three read-only lookups and has a language model summarize the
//! result.

pub mod adapters;
pub mod agent;
pub mod config;
pub mod error;
pub mod github;
pub mod tools;
pub mod ui;

pub use error::{Error, Result};
