//! Gemini gateway against a mock Generative Language API

use std::time::Duration;

use iadess_providers::{ArtifactOutcome, GatewayError, GatewayErrorKind, GenerationGateway};
use iadess_types::{ArtifactDraft, ChatMessage, ChatRole, GenerationRequest, Integrity, Realm};

use crate::common::{
    ARTIFACT_PATH, IMAGE_PATH, SPEECH_PATH, TEXT_PATH, gateway, gateway_with_timeout,
    mount_artifact_response, mount_image_response, mount_malformed_artifact,
    mount_quota_exhausted, mount_server_error, mount_slow_artifact, mount_speech_response,
    mount_text_response, received_bodies, start_gemini_mock,
};

fn request(directive: &str) -> GenerationRequest {
    GenerationRequest {
        directive: directive.to_string(),
        realm: Realm::Ui,
        integrity_hint: 0.95,
    }
}

#[tokio::test]
async fn text_reply_carries_grounding_with_defaults() {
    let server = start_gemini_mock().await;
    mount_text_response(&server, "The substrate hums.", Some((None, Some("https://example.com")))).await;
    let gateway = gateway(&server);

    let history = vec![
        ChatMessage::new("init_msg", ChatRole::Model, "Waiting."),
        ChatMessage::error("e1", "STRUCTURAL_FRACTURE"),
    ];
    let reply = gateway
        .generate_text(&history, "status?", Integrity::MAX)
        .await
        .unwrap();

    assert_eq!(reply.text, "The substrate hums.");
    assert_eq!(reply.grounding.len(), 1);
    assert_eq!(reply.grounding[0].title, "Ref");
    assert_eq!(reply.grounding[0].uri, "https://example.com");

    let bodies = received_bodies(&server, TEXT_PATH).await;
    assert_eq!(bodies.len(), 1);
    let body = &bodies[0];
    // The error message is not replayed to the model.
    assert_eq!(body["contents"].as_array().unwrap().len(), 2);
    assert_eq!(body["contents"][1]["parts"][0]["text"], "status?");
    assert_eq!(body["generationConfig"]["temperature"], 0.2);
    assert_eq!(
        body["generationConfig"]["thinkingConfig"]["thinkingBudget"],
        16_000
    );
    let instruction = body["system_instruction"]["parts"][0]["text"]
        .as_str()
        .unwrap();
    assert!(instruction.ends_with("INTEGRITY: 100%"));
    assert!(body["tools"][0].get("googleSearch").is_some());
}

#[tokio::test]
async fn low_integrity_chat_runs_warmer() {
    let server = start_gemini_mock().await;
    mount_text_response(&server, "ok", None).await;
    let gateway = gateway(&server);

    let integrity = Integrity::new(0.5).unwrap();
    gateway.generate_text(&[], "hi", integrity).await.unwrap();

    let body = &received_bodies(&server, TEXT_PATH).await[0];
    assert_eq!(body["generationConfig"]["temperature"], 0.7);
    assert_eq!(
        body["generationConfig"]["thinkingConfig"]["thinkingBudget"],
        4_000
    );
}

#[tokio::test]
async fn artifact_is_forged_from_structured_reply() {
    let server = start_gemini_mock().await;
    mount_artifact_response(&server, "LoginForm", "<Form/>", &["UI", "AUTH"]).await;
    let gateway = gateway(&server);

    let outcome = gateway.generate_artifact(&request("INITIAL_STRIKE")).await;
    assert_eq!(
        outcome,
        ArtifactOutcome::Forged(ArtifactDraft {
            name: "LoginForm".to_string(),
            code_shard: "<Form/>".to_string(),
            tags: vec!["UI".to_string(), "AUTH".to_string()],
        })
    );

    let body = &received_bodies(&server, ARTIFACT_PATH).await[0];
    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(prompt.contains("Realm: UI (Interface Fabric)"));
    assert!(prompt.contains("Integrity: 95%"));
    assert_eq!(
        body["generationConfig"]["responseSchema"]["required"],
        serde_json::json!(["name", "codeShard", "tags"])
    );
}

#[tokio::test]
async fn malformed_artifact_falls_back_to_sentinel() {
    let server = start_gemini_mock().await;
    mount_malformed_artifact(&server).await;
    let gateway = gateway(&server);

    let outcome = gateway.generate_artifact(&request("x")).await;
    let ArtifactOutcome::Fallback { draft, error } = outcome else {
        panic!("expected fallback");
    };
    assert_eq!(error, GatewayErrorKind::StructuralFailure);
    assert_eq!(draft.name, "Error Shard");
    assert!(draft.code_shard.starts_with("# Error: STRUCTURAL_FRACTURE"));
    assert!(draft.tags.iter().any(|t| t == "HONE_ERR"));
}

#[tokio::test]
async fn quota_exhaustion_is_retried_then_reported() {
    let server = start_gemini_mock().await;
    mount_quota_exhausted(&server, ARTIFACT_PATH, None).await;
    let gateway = gateway(&server);

    let outcome = gateway.generate_artifact(&request("x")).await;
    assert_eq!(
        outcome,
        ArtifactOutcome::fallback(GatewayErrorKind::QuotaExhausted)
    );
    // Initial attempt plus two retries.
    assert_eq!(received_bodies(&server, ARTIFACT_PATH).await.len(), 3);
}

#[tokio::test]
async fn quota_recovers_after_backoff() {
    let server = start_gemini_mock().await;
    mount_quota_exhausted(&server, ARTIFACT_PATH, Some(2)).await;
    mount_artifact_response(&server, "Recovered", "ok()", &[]).await;
    let gateway = gateway(&server);

    let outcome = gateway.generate_artifact(&request("x")).await;
    assert!(outcome.is_forged());
    assert_eq!(outcome.draft().name, "Recovered");
    assert_eq!(received_bodies(&server, ARTIFACT_PATH).await.len(), 3);
}

#[tokio::test]
async fn slow_upstream_times_out_without_retry() {
    let server = start_gemini_mock().await;
    mount_slow_artifact(&server, Duration::from_secs(2)).await;
    let gateway = gateway_with_timeout(&server, Duration::from_millis(100));

    let outcome = gateway.generate_artifact(&request("x")).await;
    let ArtifactOutcome::Fallback { draft, error } = outcome else {
        panic!("expected fallback");
    };
    assert_eq!(error, GatewayErrorKind::StructuralFailure);
    assert_eq!(draft.name, "Error Shard");
    assert_eq!(received_bodies(&server, ARTIFACT_PATH).await.len(), 1);
}

#[tokio::test]
async fn server_errors_are_not_retried() {
    let server = start_gemini_mock().await;
    mount_server_error(&server, TEXT_PATH).await;
    let gateway = gateway(&server);

    let err = gateway
        .generate_text(&[], "hi", Integrity::MAX)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Upstream { status: 500, .. }));
    assert_eq!(err.kind(), GatewayErrorKind::StructuralFailure);
    assert_eq!(received_bodies(&server, TEXT_PATH).await.len(), 1);
}

#[tokio::test]
async fn visual_synthesis_returns_data_url() {
    let server = start_gemini_mock().await;
    mount_image_response(&server, "iVBORw0KGgo=").await;
    let gateway = gateway(&server);

    let image = gateway
        .synthesize_visual("PAGES_95", Integrity::MAX)
        .await
        .unwrap();
    assert_eq!(image.as_str(), "data:image/png;base64,iVBORw0KGgo=");

    let body = &received_bodies(&server, IMAGE_PATH).await[0];
    assert_eq!(body["generationConfig"]["imageConfig"]["aspectRatio"], "1:1");
}

#[tokio::test]
async fn visual_failure_yields_none() {
    let server = start_gemini_mock().await;
    mount_server_error(&server, IMAGE_PATH).await;
    let gateway = gateway(&server);
    assert!(
        gateway
            .synthesize_visual("PAGES_95", Integrity::MAX)
            .await
            .is_none()
    );
}

#[tokio::test]
async fn speech_decodes_pcm_and_sends_voice() {
    let server = start_gemini_mock().await;
    // Two 16-bit little-endian samples: 0 and 16384.
    mount_speech_response(&server, "AAAAQA==").await;
    let gateway = gateway(&server);

    let clip = gateway
        .synthesize_speech("hello", Some("Kore"))
        .await
        .unwrap();
    assert_eq!(clip.sample_rate, 24_000);
    assert_eq!(clip.pcm, vec![0, 0, 0, 0x40]);
    assert_eq!(clip.samples(), vec![0.0, 0.5]);

    let body = &received_bodies(&server, SPEECH_PATH).await[0];
    assert_eq!(
        body["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
        "Kore"
    );
}
