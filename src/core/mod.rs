//! Core types for plexup
//!
//! This module hosts the error taxonomy shared by every component and the
//! [`ErrorContext`] wrapper used to present failures to CLI users with
//! actionable suggestions.

pub mod error;

pub use error::{ErrorContext, PlexupError, user_friendly_error};
