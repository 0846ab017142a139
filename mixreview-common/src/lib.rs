//! # Mix Review Common Library
//!
//! Shared code for the Mix Review service including:
//! - Error taxonomy shared by every layer
//! - Configuration loading and root folder resolution
//! - Credential service (password hashing, bearer tokens)
//! - Database initialization and row models
//! - On-disk media storage layout

pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod storage;

pub use error::{Error, Result};
