//! # Foley Common Library
//!
//! Shared vocabulary for the foley audio engine:
//! - Clip and audio-type identifiers, channel layout constants
//! - The legacy/catalog clip reference type
//! - Volume domain conversions (internal 0-255, external 0-100%)
//! - Engine configuration loading
//! - Common error types

pub mod config;
pub mod error;
pub mod types;
pub mod volume;

pub use error::{Error, Result};
pub use types::{AudioType, ClipId, ClipRef};
