use std::time::Duration;

use base64::Engine;
use iadess_types::{
    ArtifactDraft, AudioClip, ChatMessage, GenerationRequest, GroundingReference, ImageRef,
    Integrity, TextReply,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    ApiKey, ArtifactOutcome, GEMINI_API_BASE_URL, GatewayError, GatewayFut, GenerationGateway,
    http_client_with_timeout, prompts, read_capped_error_body,
    retry::{RetryPolicy, with_retry},
};

pub const DEFAULT_TEXT_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_ARTIFACT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_SPEECH_MODEL: &str = "gemini-2.5-flash-preview-tts";
pub const DEFAULT_VOICE: &str = "Puck";

/// Integrity above which chat runs cold and thinks long.
const PRECISE_INTEGRITY: f64 = 0.8;

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: ApiKey,
    pub base_url: String,
    pub text_model: String,
    pub artifact_model: String,
    pub image_model: String,
    pub speech_model: String,
    pub voice: String,
    /// Whole-request timeout, applied per attempt.
    pub request_timeout: Duration,
    /// Attach the Google Search tool to chat requests.
    pub search_grounding: bool,
    pub retry: RetryPolicy,
}

impl GeminiConfig {
    #[must_use]
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            api_key,
            base_url: GEMINI_API_BASE_URL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            artifact_model: DEFAULT_ARTIFACT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            speech_model: DEFAULT_SPEECH_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            request_timeout: Duration::from_secs(120),
            search_grounding: true,
            retry: RetryPolicy::default(),
        }
    }
}

/// Gateway backed by the Generative Language `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiGateway {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiGateway {
    /// Build a gateway with a hardened HTTPS-only client.
    pub fn new(config: GeminiConfig) -> Result<Self, GatewayError> {
        if config.api_key.is_empty() {
            return Err(GatewayError::MissingApiKey);
        }
        let client = http_client_with_timeout(config.request_timeout)?;
        Ok(Self { config, client })
    }

    /// Build a gateway around a caller-supplied client (plain HTTP allowed).
    #[must_use]
    pub fn with_client(config: GeminiConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    #[must_use]
    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{model}:generateContent",
            self.config.base_url.trim_end_matches('/')
        )
    }

    async fn generate(&self, model: &str, body: &Value) -> Result<GenerateResponse, GatewayError> {
        let url = self.endpoint(model);
        with_retry(&self.config.retry, || self.post_once(&url, body)).await
    }

    async fn post_once(&self, url: &str, body: &Value) -> Result<GenerateResponse, GatewayError> {
        let response = self
            .client
            .post(url)
            .timeout(self.config.request_timeout)
            .header("x-goog-api-key", self.config.api_key.expose())
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(GatewayError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let text = read_capped_error_body(response).await;
            return Err(classify_error(status.as_u16(), &text));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(GatewayError::from_transport)?;
        serde_json::from_slice(&bytes).map_err(|e| GatewayError::Malformed(e.to_string()))
    }

    async fn text_reply(
        &self,
        history: &[ChatMessage],
        prompt: &str,
        integrity: Integrity,
    ) -> Result<TextReply, GatewayError> {
        let body = build_text_body(history, prompt, integrity, self.config.search_grounding);
        let response = self.generate(&self.config.text_model, &body).await?;
        Ok(response.into_text_reply())
    }

    async fn artifact_draft(
        &self,
        request: &GenerationRequest,
    ) -> Result<ArtifactDraft, GatewayError> {
        let body = build_artifact_body(request);
        let response = self.generate(&self.config.artifact_model, &body).await?;
        parse_draft(&response.first_text().unwrap_or_default())
    }
}

impl GenerationGateway for GeminiGateway {
    fn generate_text<'a>(
        &'a self,
        history: &'a [ChatMessage],
        prompt: &'a str,
        integrity: Integrity,
    ) -> GatewayFut<'a, Result<TextReply, GatewayError>> {
        Box::pin(async move {
            let result = self.text_reply(history, prompt, integrity).await;
            if let Err(e) = &result {
                tracing::error!("Gemini text generation failed: {e}");
            }
            result
        })
    }

    fn generate_artifact<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> GatewayFut<'a, ArtifactOutcome> {
        Box::pin(async move {
            match self.artifact_draft(request).await {
                Ok(draft) => ArtifactOutcome::Forged(draft),
                Err(e) => {
                    tracing::error!(realm = %request.realm, "Gemini artifact generation failed: {e}");
                    ArtifactOutcome::fallback(e.kind())
                }
            }
        })
    }

    fn synthesize_visual<'a>(
        &'a self,
        subject: &'a str,
        integrity: Integrity,
    ) -> GatewayFut<'a, Option<ImageRef>> {
        Box::pin(async move {
            let body = build_visual_body(subject, integrity);
            match self.generate(&self.config.image_model, &body).await {
                Ok(response) => response
                    .first_inline()
                    .map(|inline| ImageRef::from_inline(inline.mime_or("image/png"), &inline.data)),
                Err(e) => {
                    tracing::warn!("Visual synthesis skipped: {e}");
                    None
                }
            }
        })
    }

    fn synthesize_speech<'a>(
        &'a self,
        text: &'a str,
        voice: Option<&'a str>,
    ) -> GatewayFut<'a, Option<AudioClip>> {
        Box::pin(async move {
            let voice = voice.unwrap_or(self.config.voice.as_str());
            let body = build_speech_body(text, voice);
            let response = match self.generate(&self.config.speech_model, &body).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!("Speech synthesis skipped: {e}");
                    return None;
                }
            };
            let inline = response.first_inline()?;
            match base64::engine::general_purpose::STANDARD.decode(inline.data.as_bytes()) {
                Ok(pcm) => Some(AudioClip::speech(pcm)),
                Err(e) => {
                    tracing::warn!("Speech payload was not valid base64: {e}");
                    None
                }
            }
        })
    }
}

fn text_part(text: &str) -> Value {
    json!({ "text": text })
}

/// Chat request body.
///
/// Note: Gemini API uses mixed casing:
/// - `system_instruction` (snake_case)
/// - `generationConfig` (camelCase)
fn build_text_body(
    history: &[ChatMessage],
    prompt: &str,
    integrity: Integrity,
    search_grounding: bool,
) -> Value {
    let mut contents: Vec<Value> = history
        .iter()
        .filter(|message| !message.is_error)
        .map(|message| {
            json!({
                "role": message.role.as_str(),
                "parts": [text_part(&message.text)]
            })
        })
        .collect();
    contents.push(json!({ "role": "user", "parts": [text_part(prompt)] }));

    let precise = integrity.value() > PRECISE_INTEGRITY;
    let temperature = if precise { 0.2 } else { 0.7 };
    let thinking_budget = if precise { 16_000 } else { 4_000 };
    let mut body = json!({
        "contents": contents,
        "system_instruction": { "parts": [text_part(&prompts::chat_instruction(integrity))] },
        "generationConfig": {
            "temperature": temperature,
            "thinkingConfig": { "thinkingBudget": thinking_budget }
        }
    });
    if search_grounding {
        body["tools"] = json!([{ "googleSearch": {} }]);
    }
    body
}

fn build_artifact_body(request: &GenerationRequest) -> Value {
    let prompt = prompts::artifact_prompt(&request.directive, request.realm, request.integrity_hint);
    json!({
        "contents": [{ "role": "user", "parts": [text_part(&prompt)] }],
        "system_instruction": { "parts": [text_part(prompts::SENTIENCE)] },
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {
                    "name": { "type": "STRING" },
                    "codeShard": { "type": "STRING" },
                    "tags": { "type": "ARRAY", "items": { "type": "STRING" } }
                },
                "required": ["name", "codeShard", "tags"]
            }
        }
    })
}

fn build_visual_body(subject: &str, integrity: Integrity) -> Value {
    json!({
        "contents": [{ "parts": [text_part(&prompts::visual(subject, integrity))] }],
        "generationConfig": { "imageConfig": { "aspectRatio": "1:1" } }
    })
}

fn build_speech_body(text: &str, voice: &str) -> Value {
    json!({
        "contents": [{ "parts": [text_part(&prompts::speech(text))] }],
        "generationConfig": {
            "responseModalities": ["AUDIO"],
            "speechConfig": {
                "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": voice } }
            }
        }
    })
}

/// Map a non-2xx response onto the gateway taxonomy.
///
/// HTTP 429 and a `RESOURCE_EXHAUSTED` status in the error body both mean quota.
fn classify_error(status: u16, body: &str) -> GatewayError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let exhausted = parsed
        .as_ref()
        .and_then(|envelope| envelope.error.status.as_deref())
        == Some("RESOURCE_EXHAUSTED");
    let message = parsed
        .and_then(|envelope| envelope.error.message)
        .unwrap_or_else(|| body.to_string());

    if status == 429 || exhausted {
        GatewayError::QuotaExhausted { status, message }
    } else {
        GatewayError::Upstream { status, message }
    }
}

fn parse_draft(text: &str) -> Result<ArtifactDraft, GatewayError> {
    let draft: ArtifactDraft = serde_json::from_str(text.trim())
        .map_err(|e| GatewayError::Malformed(format!("artifact payload: {e}")))?;
    if draft.code_shard.trim().is_empty() {
        return Err(GatewayError::Malformed("artifact has no code shard".into()));
    }
    Ok(draft)
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: Option<String>,
    data: String,
}

impl InlineData {
    fn mime_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.mime_type.as_deref().unwrap_or(fallback)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebSource>,
}

#[derive(Debug, Deserialize)]
struct WebSource {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    uri: Option<String>,
}

impl GenerateResponse {
    fn parts(&self) -> impl Iterator<Item = &Part> {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .into_iter()
            .flat_map(|content| content.parts.iter())
    }

    /// Concatenated text parts of the first candidate.
    fn first_text(&self) -> Option<String> {
        let text: String = self.parts().filter_map(|part| part.text.as_deref()).collect();
        if text.is_empty() { None } else { Some(text) }
    }

    fn first_inline(&self) -> Option<&InlineData> {
        self.parts()
            .filter_map(|part| part.inline_data.as_ref())
            .find(|inline| !inline.data.is_empty())
    }

    fn into_text_reply(self) -> TextReply {
        let text = self.first_text().unwrap_or_else(|| "...".to_string());
        let grounding = self
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.grounding_metadata)
            .map(|metadata| {
                metadata
                    .grounding_chunks
                    .into_iter()
                    .map(|chunk| {
                        let (title, uri) = chunk
                            .web
                            .map(|web| (web.title, web.uri))
                            .unwrap_or((None, None));
                        GroundingReference::new(title, uri)
                    })
                    .collect()
            })
            .unwrap_or_default();
        TextReply { text, grounding }
    }
}
