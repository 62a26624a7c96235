//! Core domain logic for Iadess.
//!
//! The forge session state machine, the shared token ledger, the artifact
//! store and its on-disk repository, the chat panel, and the [`Studio`]
//! facade that drives them against a [`GenerationGateway`].
//!
//! [`GenerationGateway`]: iadess_providers::GenerationGateway

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod artifacts;
pub mod chat;
pub mod forge;
pub mod ledger;
pub mod persistence;
pub mod simulation;
mod studio;

pub use artifacts::ArtifactStore;
pub use chat::{ChatPanel, ChatRejection, ChatTicket};
pub use forge::{
    ForgeError, ForgeLogEntry, ForgePhase, ForgeRejection, ForgeSession, ForgeSnapshot,
    InfinityToggle, LogLevel, QuenchTicket, StrikeTicket, TransmuteTicket,
};
pub use ledger::{InsufficientTokens, TokenLedger};
pub use persistence::{ArtifactRepository, RepositoryError};
pub use simulation::{SimulationReport, UnstableArtifact, assert_artifact_integrity, simulate_artifact};
pub use studio::Studio;
