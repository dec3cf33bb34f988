//! Brief - TechCrunch article summarizer
//!
//! This crate provides an HTTP service that fetches an article, extracts its
//! text and relays a streaming text completion summarizing it.

pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod prompt;
pub mod relay;
pub mod server;

pub use error::{BriefError, Result};
