//! # Sift Common Library
//!
//! Shared code for the Sift services including:
//! - Error types
//! - Notification events (SiftEvent enum) and the broadcast EventBus
//! - Configuration loading and resolution

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
