//! Common utilities and types shared across voice agent components.

#![warn(clippy::pedantic)]

/// Module for platform identifiers and the voice endpoint reference
pub mod types;

/// Module for secret types that prevent accidental logging
pub mod secret;
