//! Payloads exchanged with the generation gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::realm::Realm;

/// One structured generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub directive: String,
    pub realm: Realm,
    /// Passed to the model as a quality hint. May exceed 1.0 (overdrive).
    pub integrity_hint: f64,
}

/// Structured result of a strike or transmutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactDraft {
    pub name: String,
    pub code_shard: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ArtifactDraft {
    pub const FALLBACK_NAME: &'static str = "Error Shard";
    pub const FALLBACK_TAG: &'static str = "HONE_ERR";

    /// Sentinel draft returned in place of a real one when generation fails.
    #[must_use]
    pub fn fallback(message: &str) -> Self {
        Self {
            name: Self::FALLBACK_NAME.to_string(),
            code_shard: format!("# Error: {message}"),
            tags: vec![Self::FALLBACK_TAG.to_string()],
        }
    }

    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.tags.iter().any(|tag| tag == Self::FALLBACK_TAG)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingReference {
    pub title: String,
    pub uri: String,
}

impl GroundingReference {
    pub const DEFAULT_TITLE: &'static str = "Ref";
    pub const DEFAULT_URI: &'static str = "#";

    #[must_use]
    pub fn new(title: Option<String>, uri: Option<String>) -> Self {
        Self {
            title: title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| Self::DEFAULT_TITLE.to_string()),
            uri: uri
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| Self::DEFAULT_URI.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextReply {
    pub text: String,
    pub grounding: Vec<GroundingReference>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

impl ChatRole {
    /// Role name on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Model => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default)]
    pub grounding: Vec<GroundingReference>,
}

impl ChatMessage {
    #[must_use]
    pub fn new(id: impl Into<String>, role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            text: text.into(),
            timestamp: Utc::now(),
            is_error: false,
            grounding: Vec::new(),
        }
    }

    #[must_use]
    pub fn error(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::new(id, ChatRole::Model, text)
        }
    }
}

/// Inline image as a `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    #[must_use]
    pub fn from_inline(mime_type: &str, base64_data: &str) -> Self {
        Self(format!("data:{mime_type};base64,{base64_data}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mono 16-bit little-endian PCM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub sample_rate: u32,
    pub pcm: Vec<u8>,
}

impl AudioClip {
    pub const SPEECH_SAMPLE_RATE: u32 = 24_000;

    #[must_use]
    pub fn speech(pcm: Vec<u8>) -> Self {
        Self {
            sample_rate: Self::SPEECH_SAMPLE_RATE,
            pcm,
        }
    }

    /// Samples normalised to `[-1.0, 1.0)`. A trailing odd byte is ignored.
    #[must_use]
    pub fn samples(&self) -> Vec<f32> {
        self.pcm
            .chunks_exact(2)
            .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32768.0)
            .collect()
    }

    #[must_use]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        (self.pcm.len() / 2) as f64 / f64::from(self.sample_rate)
    }
}
