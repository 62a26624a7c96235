//! Generation gateway for Iadess.
//!
//! # Architecture
//!
//! - [`GenerationGateway`] - the boundary the forge and chat talk to
//! - [`gemini`] - Google Generative Language API implementation
//! - [`retry`] - quota-aware exponential backoff wrapping every call
//! - [`prompts`] - prompt text and directive builders
//!
//! # Error Handling
//!
//! Transport and HTTP failures surface as [`GatewayError`]. Callers that only
//! need the user-facing classification use [`GatewayError::kind`], which maps
//! onto the closed [`GatewayErrorKind`] set. Artifact generation never returns
//! an error: a failure becomes [`ArtifactOutcome::Fallback`] carrying the
//! sentinel draft.

pub mod gemini;
pub mod prompts;
pub mod retry;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use iadess_types::{
    ArtifactDraft, AudioClip, ChatMessage, GenerationRequest, ImageRef, Integrity, TextReply,
};
use thiserror::Error;

pub use gemini::{GeminiConfig, GeminiGateway};
pub use iadess_types;
pub use retry::{QuotaSignal, RetryPolicy, with_retry};

/// Canonical Gemini API base URL.
pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const CONNECT_TIMEOUT_SECS: u64 = 30;
const TCP_KEEPALIVE_SECS: u64 = 60;
const POOL_MAX_IDLE_PER_HOST: usize = 16;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;
const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

/// Secret API credential. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// User-facing failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    QuotaExhausted,
    StructuralFailure,
}

impl GatewayErrorKind {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            GatewayErrorKind::QuotaExhausted => {
                "SUBSTRATE_STARVATION: Cognitive substrate exhausted. Integrity re-calibration required."
            }
            GatewayErrorKind::StructuralFailure => "STRUCTURAL_FRACTURE: Logic relay collapse.",
        }
    }
}

impl std::fmt::Display for GatewayErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("quota exhausted (HTTP {status}): {message}")]
    QuotaExhausted { status: u16, message: String },
    #[error("upstream error (HTTP {status}): {message}")]
    Upstream { status: u16, message: String },
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("no API key configured")]
    MissingApiKey,
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl GatewayError {
    #[must_use]
    pub fn kind(&self) -> GatewayErrorKind {
        match self {
            GatewayError::QuotaExhausted { .. } => GatewayErrorKind::QuotaExhausted,
            _ => GatewayErrorKind::StructuralFailure,
        }
    }

    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Transport(err)
        }
    }
}

impl QuotaSignal for GatewayError {
    fn is_quota_exhausted(&self) -> bool {
        matches!(self, GatewayError::QuotaExhausted { .. })
    }
}

/// Result of a structured artifact call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactOutcome {
    Forged(ArtifactDraft),
    /// Generation failed; `draft` is the sentinel built from `error`.
    Fallback {
        draft: ArtifactDraft,
        error: GatewayErrorKind,
    },
}

impl ArtifactOutcome {
    #[must_use]
    pub fn fallback(error: GatewayErrorKind) -> Self {
        Self::Fallback {
            draft: ArtifactDraft::fallback(error.message()),
            error,
        }
    }

    #[must_use]
    pub fn draft(&self) -> &ArtifactDraft {
        match self {
            Self::Forged(draft) | Self::Fallback { draft, .. } => draft,
        }
    }

    #[must_use]
    pub const fn is_forged(&self) -> bool {
        matches!(self, Self::Forged(_))
    }
}

/// Boxed future returned by gateway methods.
pub type GatewayFut<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Boundary to the generative model.
///
/// Implementations hold no session state; all inputs arrive as arguments.
pub trait GenerationGateway: Send + Sync {
    fn generate_text<'a>(
        &'a self,
        history: &'a [ChatMessage],
        prompt: &'a str,
        integrity: Integrity,
    ) -> GatewayFut<'a, Result<TextReply, GatewayError>>;

    fn generate_artifact<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> GatewayFut<'a, ArtifactOutcome>;

    /// Best-effort image; any failure yields `None`.
    fn synthesize_visual<'a>(
        &'a self,
        subject: &'a str,
        integrity: Integrity,
    ) -> GatewayFut<'a, Option<ImageRef>>;

    /// Best-effort speech; any failure yields `None`.
    fn synthesize_speech<'a>(
        &'a self,
        text: &'a str,
        voice: Option<&'a str>,
    ) -> GatewayFut<'a, Option<AudioClip>>;
}

fn base_client_builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::none())
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
}

/// HTTPS-only client with a whole-request timeout.
pub fn http_client_with_timeout(timeout: Duration) -> Result<reqwest::Client, GatewayError> {
    base_client_builder()
        .https_only(true)
        .timeout(timeout)
        .build()
        .map_err(GatewayError::Client)
}

pub async fn read_capped_error_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}
