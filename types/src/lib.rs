//! Core domain types for Iadess.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod artifact;
mod generation;
mod integrity;
mod params;
mod realm;
mod tokens;

pub use artifact::{Artifact, ArtifactId, ArtifactKind, ArtifactStatus};
pub use generation::{
    ArtifactDraft, AudioClip, ChatMessage, ChatRole, GenerationRequest, GroundingReference,
    ImageRef, TextReply,
};
pub use integrity::{Integrity, IntegrityOutOfRange};
pub use params::{ChatParams, ForgeParams, ForgeParamsError, LedgerParams};
pub use realm::{ForgeMode, Realm, RealmParseError};
pub use tokens::{MIN_STRIKE_BASE, TokenBalance, TokenGrade, strike_cost};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Intent
// ============================================================================

/// Free-text description of what the user wants generated.
///
/// Guaranteed non-empty after trimming; the stored text is the trimmed form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Intent(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("intent must not be empty")]
pub struct EmptyIntent;

impl Intent {
    pub fn new(value: impl Into<String>) -> Result<Self, EmptyIntent> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(EmptyIntent);
        }
        if trimmed.len() == value.len() {
            Ok(Self(value))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in characters, the unit the cost model is expressed in.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }
}

impl TryFrom<String> for Intent {
    type Error = EmptyIntent;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Intent {
    type Error = EmptyIntent;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Intent> for String {
    fn from(value: Intent) -> Self {
        value.0
    }
}

impl AsRef<str> for Intent {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
