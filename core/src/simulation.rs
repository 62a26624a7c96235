//! Canned execution report for a finished artifact.

use iadess_types::Artifact;
use thiserror::Error;

const SUCCESS_THRESHOLD: f64 = 0.7;
const STABILITY_FLOOR: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationReport {
    pub success: bool,
    pub performance_score: u32,
    pub logs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("ARTIFACT_UNSTABLE: Integrity too low.")]
pub struct UnstableArtifact;

#[must_use]
pub fn simulate_artifact(artifact: &Artifact) -> SimulationReport {
    let integrity = artifact.integrity_score;
    tracing::debug!(artifact = %artifact.id, %integrity, "Simulating artifact");
    SimulationReport {
        success: integrity.value() > SUCCESS_THRESHOLD,
        performance_score: integrity.percent(),
        logs: vec![
            "Simulation initialized.".to_string(),
            "Logic shard executed.".to_string(),
            format!("Substrate density: {}", integrity.value()),
            "Integrity validated.".to_string(),
        ],
    }
}

pub fn assert_artifact_integrity(artifact: &Artifact) -> Result<(), UnstableArtifact> {
    if artifact.integrity_score.value() < STABILITY_FLOOR {
        return Err(UnstableArtifact);
    }
    Ok(())
}
