//! End-to-end forging through the studio against the mock API

use std::time::Duration;

use iadess_core::{
    ArtifactRepository, ForgeError, ForgePhase, ForgeRejection, LogLevel, Studio, TokenLedger,
};
use iadess_providers::{GatewayErrorKind, GeminiGateway};
use iadess_types::{ArtifactStatus, ForgeParams, Realm};

use crate::common::{
    ARTIFACT_PATH, IMAGE_PATH, TEXT_PATH, gateway, gateway_with_timeout, mount_artifact_response,
    mount_image_response, mount_quota_exhausted, mount_server_error, mount_slow_artifact,
    mount_text_response, received_bodies, start_gemini_mock,
};

fn studio(gateway: GeminiGateway, balance: u64) -> Studio<GeminiGateway> {
    Studio::new(
        gateway,
        TokenLedger::with_balance(balance),
        ForgeParams::default(),
        Realm::Pages,
    )
}

fn heat_until_prepared(studio: &Studio<GeminiGateway>) {
    for _ in 0..3 {
        studio.apply_heat().unwrap();
    }
    assert!(studio.snapshot().is_prepared);
}

#[tokio::test]
async fn heat_strike_quench_produces_masterwork() {
    let server = start_gemini_mock().await;
    mount_artifact_response(&server, "Landing", "<Landing/>", &["PAGES"]).await;
    mount_image_response(&server, "AAAA").await;
    let studio = studio(gateway(&server), 1500);
    let mut log = studio.subscribe();

    heat_until_prepared(&studio);
    assert_eq!(studio.estimate_cost("build a UI"), Some(10));
    studio.strike("build a UI").await.unwrap();
    assert_eq!(studio.balance().amount, 1490);

    let directive = received_bodies(&server, ARTIFACT_PATH).await[0]["contents"][0]["parts"][0]
        ["text"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(directive.contains("INITIAL_STRIKE [HEAT: 75°C]"));
    assert!(directive.contains("build a UI"));

    let artifact = studio.quench().await.unwrap();
    assert_eq!(artifact.status, ArtifactStatus::Masterwork);
    assert_eq!(artifact.code_shard, "<Landing/>");
    assert_eq!(artifact.origin, Realm::Pages);
    assert_eq!(
        artifact.image_url.as_ref().map(|i| i.as_str()),
        Some("data:image/png;base64,AAAA")
    );
    assert_eq!(artifact.intelligence_cost, 10);

    let visual_prompt = received_bodies(&server, IMAGE_PATH).await[0]["contents"][0]["parts"][0]
        ["text"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(visual_prompt.contains("PAGES_100"));
    assert!(visual_prompt.contains("Perfect"));

    let snapshot = studio.snapshot();
    assert_eq!(snapshot.phase, ForgePhase::Cold);
    assert_eq!(snapshot.heat, 0);
    assert_eq!(studio.artifacts().len(), 1);

    let mut levels = Vec::new();
    while let Ok(entry) = log.try_recv() {
        levels.push(entry.level);
    }
    assert!(levels.contains(&LogLevel::Success));
}

#[tokio::test]
async fn four_heats_leave_forge_unprepared() {
    let server = start_gemini_mock().await;
    let studio = studio(gateway(&server), 1500);
    for _ in 0..4 {
        studio.apply_heat().unwrap();
    }
    let snapshot = studio.snapshot();
    assert_eq!(snapshot.heat, 100);
    assert!(!snapshot.is_prepared);

    let err = studio.strike("too hot").await.unwrap_err();
    assert_eq!(
        err,
        ForgeError::Rejected(ForgeRejection::ColdSubstrate { heat: 100 })
    );
    assert!(received_bodies(&server, ARTIFACT_PATH).await.is_empty());
    assert_eq!(studio.balance().amount, 1500);
}

#[tokio::test]
async fn quota_failure_keeps_debit_and_draft() {
    let server = start_gemini_mock().await;
    mount_quota_exhausted(&server, ARTIFACT_PATH, None).await;
    let studio = studio(gateway(&server), 1500);

    heat_until_prepared(&studio);
    let err = studio.strike("dashboard").await.unwrap_err();
    assert_eq!(err, ForgeError::Upstream(GatewayErrorKind::QuotaExhausted));
    assert_eq!(studio.balance().amount, 1490);

    let snapshot = studio.snapshot();
    assert!(snapshot.draft_code.is_empty());
    assert_eq!(snapshot.phase, ForgePhase::Prepared);
    assert!(matches!(
        studio.quench().await,
        Err(ForgeError::Rejected(ForgeRejection::NotReadyToQuench { .. }))
    ));
}

#[tokio::test]
async fn timed_out_strike_releases_the_forge() {
    let server = start_gemini_mock().await;
    mount_slow_artifact(&server, Duration::from_secs(2)).await;
    let studio = studio(
        gateway_with_timeout(&server, Duration::from_millis(100)),
        1500,
    );

    heat_until_prepared(&studio);
    let err = studio.strike("slow relay").await.unwrap_err();
    assert_eq!(err, ForgeError::Upstream(GatewayErrorKind::StructuralFailure));

    let snapshot = studio.snapshot();
    assert_ne!(snapshot.phase, ForgePhase::Processing);
    assert!(snapshot.draft_code.is_empty());
    assert_eq!(studio.balance().amount, 1490);
    assert!(studio.apply_heat().is_ok());
}

#[tokio::test]
async fn failed_transmute_debit_keeps_infinity_off() {
    let server = start_gemini_mock().await;
    mount_artifact_response(&server, "Base", "base()", &[]).await;
    let studio = studio(gateway(&server), 55);

    heat_until_prepared(&studio);
    studio.strike("x").await.unwrap();
    assert_eq!(studio.balance().amount, 45);

    let err = studio.toggle_infinity().await.unwrap_err();
    assert_eq!(
        err,
        ForgeError::Rejected(ForgeRejection::InsufficientTokens {
            cost: 50,
            available: 45
        })
    );
    assert!(!studio.snapshot().infinity_mode);
    assert_eq!(received_bodies(&server, ARTIFACT_PATH).await.len(), 1);
}

#[tokio::test]
async fn infinity_quench_without_visual_is_omega_bound() {
    let server = start_gemini_mock().await;
    mount_artifact_response(&server, "Omega", "omega()", &["OMEGA"]).await;
    mount_server_error(&server, IMAGE_PATH).await;
    let studio = studio(gateway(&server), 1500);

    heat_until_prepared(&studio);
    studio.strike("core").await.unwrap();
    assert!(studio.toggle_infinity().await.unwrap());
    assert_eq!(studio.snapshot().heat, 100);

    let artifact = studio.quench().await.unwrap();
    assert_eq!(artifact.status, ArtifactStatus::OmegaBound);
    assert!(artifact.image_url.is_none());
    assert_eq!(artifact.tags, vec!["PAGES", "INFINITY", "STRIKES_1"]);
    assert_eq!(studio.balance().amount, 1440);
}

#[tokio::test]
async fn quench_persists_to_repository() {
    let server = start_gemini_mock().await;
    mount_artifact_response(&server, "Saved", "saved()", &[]).await;
    mount_image_response(&server, "AAAA").await;
    let dir = tempfile::tempdir().unwrap();
    let repository = ArtifactRepository::new(dir.path().join("iadess_artifacts.json"));
    let studio = studio(gateway(&server), 1500).with_repository(repository.clone());

    heat_until_prepared(&studio);
    studio.strike("persist me").await.unwrap();
    let artifact = studio.quench().await.unwrap();

    let stored = repository.load();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, artifact.id);
    assert_eq!(stored[0].intent, "persist me");
}

#[tokio::test]
async fn chat_shares_ledger_and_flags_quota() {
    let server = start_gemini_mock().await;
    mount_quota_exhausted(&server, TEXT_PATH, Some(3)).await;
    mount_text_response(&server, "Online.", None).await;
    let studio = studio(gateway(&server), 40);

    let reply = studio.send_chat("ping").await.unwrap();
    assert!(reply.is_error);
    assert!(studio.chat_low_resource());
    assert_eq!(studio.balance().amount, 20);

    let reply = studio.send_chat("ping again").await.unwrap();
    assert_eq!(reply.text, "Online.");
    assert!(!studio.chat_low_resource());
    assert_eq!(studio.balance().amount, 0);

    assert!(studio.send_chat("one more").await.is_err());
    assert!(studio.chat_messages().last().unwrap().is_error);
}
