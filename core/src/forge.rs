//! Forge session state machine.
//!
//! # Phases
//!
//! The phase is derived from state rather than stored:
//!
//! | Phase | Condition |
//! |-------|-----------|
//! | `Processing` | a strike or quench call is outstanding |
//! | `Transmuting` | a transmutation call is outstanding |
//! | `Struck` | at least one strike landed and a draft exists |
//! | `Prepared` | heat inside the window, or infinity engaged |
//! | `Cold` | anything else |
//!
//! # Split transitions
//!
//! Actions that call the gateway are split in two. `begin_*` runs the guards,
//! debits the ledger, marks the session busy and hands back a ticket holding
//! the request. `complete_*` consumes the ticket, applies the outcome and
//! always clears the busy flag. Nothing in between touches the session, so
//! the caller can drop its lock while the call is in flight.
//! A call that never completes is released with [`ForgeSession::abandon`].

use chrono::{DateTime, Utc};
use iadess_providers::{ArtifactOutcome, GatewayErrorKind, prompts};
use iadess_types::{
    Artifact, ArtifactDraft, ArtifactId, ArtifactKind, ArtifactStatus, ForgeParams,
    GenerationRequest, ImageRef, Integrity, Intent, Realm, strike_cost,
};
use thiserror::Error;
use uuid::Uuid;

use crate::ledger::TokenLedger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForgePhase {
    Cold,
    Prepared,
    Struck,
    Transmuting,
    Processing,
}

/// A precondition refused the action. No tokens were spent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForgeRejection {
    #[error("forge is busy with another operation")]
    AlreadyProcessing,
    #[error("intent must not be empty")]
    EmptyIntent,
    #[error("substrate cold at {heat}°C; strike imprint failed")]
    ColdSubstrate { heat: u32 },
    #[error("insufficient IQ-T: need {cost}, have {available}")]
    InsufficientTokens { cost: u64, available: u64 },
    #[error("nothing to quench (draft present: {has_draft}, strikes: {strikes})")]
    NotReadyToQuench { has_draft: bool, strikes: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForgeError {
    #[error(transparent)]
    Rejected(#[from] ForgeRejection),
    /// The gateway call failed after tokens were debited.
    #[error("{0}")]
    Upstream(GatewayErrorKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Operator-facing log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgeLogEntry {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Strike,
    Transmute,
    Quench,
}

/// Issued by [`ForgeSession::begin_strike`]; redeem with `complete_strike`.
#[derive(Debug)]
#[must_use = "a strike ticket must be completed to release the forge"]
pub struct StrikeTicket {
    request: GenerationRequest,
    cost: u64,
    strike: u32,
    prepared: bool,
}

impl StrikeTicket {
    #[must_use]
    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }

    #[must_use]
    pub fn cost(&self) -> u64 {
        self.cost
    }
}

#[derive(Debug)]
#[must_use = "a transmute ticket must be completed to release the forge"]
pub struct TransmuteTicket {
    request: GenerationRequest,
}

impl TransmuteTicket {
    #[must_use]
    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }
}

#[derive(Debug)]
#[must_use = "a quench ticket must be completed to release the forge"]
pub struct QuenchTicket {
    subject: String,
    integrity: Integrity,
}

impl QuenchTicket {
    /// Subject line for the visual projection.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn integrity(&self) -> Integrity {
        self.integrity
    }
}

/// Result of [`ForgeSession::begin_toggle_infinity`].
#[derive(Debug)]
pub enum InfinityToggle {
    /// Pure flip, no call needed.
    Flipped { enabled: bool },
    /// Turned on over an existing draft; the draft must be transmuted.
    Transmute(TransmuteTicket),
}

/// Read-only view for presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct ForgeSnapshot {
    pub realm: Realm,
    pub phase: ForgePhase,
    pub heat: u32,
    pub is_prepared: bool,
    pub strike_count: u32,
    pub integrity: Integrity,
    pub infinity_mode: bool,
    pub draft_name: Option<String>,
    pub draft_code: String,
    pub last_tags: Vec<String>,
    pub tokens_spent: u64,
    pub log_buffer: Vec<String>,
}

#[derive(Debug)]
pub struct ForgeSession {
    params: ForgeParams,
    realm: Realm,
    heat: u32,
    strike_count: u32,
    integrity: Integrity,
    infinity_mode: bool,
    intent: Option<Intent>,
    draft_name: Option<String>,
    draft_code: String,
    last_tags: Vec<String>,
    tokens_spent: u64,
    pending: Option<Pending>,
    log_buffer: Vec<String>,
    outbox: Vec<ForgeLogEntry>,
}

impl ForgeSession {
    #[must_use]
    pub fn new(params: ForgeParams, realm: Realm) -> Self {
        Self {
            params,
            realm,
            heat: 0,
            strike_count: 0,
            integrity: Integrity::MAX,
            infinity_mode: false,
            intent: None,
            draft_name: None,
            draft_code: String::new(),
            last_tags: Vec::new(),
            tokens_spent: 0,
            pending: None,
            log_buffer: Vec::new(),
            outbox: Vec::new(),
        }
    }

    #[must_use]
    pub fn params(&self) -> &ForgeParams {
        &self.params
    }

    #[must_use]
    pub fn realm(&self) -> Realm {
        self.realm
    }

    #[must_use]
    pub fn heat(&self) -> u32 {
        self.heat
    }

    #[must_use]
    pub fn strike_count(&self) -> u32 {
        self.strike_count
    }

    #[must_use]
    pub fn integrity(&self) -> Integrity {
        self.integrity
    }

    #[must_use]
    pub fn infinity_mode(&self) -> bool {
        self.infinity_mode
    }

    #[must_use]
    pub fn draft_code(&self) -> &str {
        &self.draft_code
    }

    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.pending.is_some()
    }

    #[must_use]
    pub fn is_prepared(&self) -> bool {
        self.params.is_prepared(self.heat)
    }

    /// Quench preconditions: a draft exists and at least one strike landed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        !self.draft_code.is_empty() && self.strike_count >= 1
    }

    #[must_use]
    pub fn phase(&self) -> ForgePhase {
        match self.pending {
            Some(Pending::Transmute) => ForgePhase::Transmuting,
            Some(Pending::Strike | Pending::Quench) => ForgePhase::Processing,
            None if self.is_ready() => ForgePhase::Struck,
            None if self.is_prepared() || self.infinity_mode => ForgePhase::Prepared,
            None => ForgePhase::Cold,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> ForgeSnapshot {
        ForgeSnapshot {
            realm: self.realm,
            phase: self.phase(),
            heat: self.heat,
            is_prepared: self.is_prepared(),
            strike_count: self.strike_count,
            integrity: self.integrity,
            infinity_mode: self.infinity_mode,
            draft_name: self.draft_name.clone(),
            draft_code: self.draft_code.clone(),
            last_tags: self.last_tags.clone(),
            tokens_spent: self.tokens_spent,
            log_buffer: self.log_buffer.clone(),
        }
    }

    /// Take the log lines produced since the last call.
    pub fn drain_log(&mut self) -> Vec<ForgeLogEntry> {
        std::mem::take(&mut self.outbox)
    }

    fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Info | LogLevel::Success => tracing::info!(realm = %self.realm, "{message}"),
            LogLevel::Warning => tracing::warn!(realm = %self.realm, "{message}"),
            LogLevel::Error => tracing::error!(realm = %self.realm, "{message}"),
        }
        self.outbox.push(ForgeLogEntry {
            level,
            message,
            timestamp: Utc::now(),
        });
    }

    /// Refuses every action while a gateway call is outstanding.
    pub fn check_idle(&self) -> Result<(), ForgeRejection> {
        if self.pending.is_some() {
            return Err(ForgeRejection::AlreadyProcessing);
        }
        Ok(())
    }

    pub fn check_heat(&self) -> Result<(), ForgeRejection> {
        self.check_idle()
    }

    /// Whether `intent` could be struck now, yielding it validated.
    /// Does not look at the balance.
    pub fn check_strike(&self, intent: &str) -> Result<Intent, ForgeRejection> {
        self.check_idle()?;
        let intent = Intent::new(intent).map_err(|_| ForgeRejection::EmptyIntent)?;
        if !self.is_prepared() && !self.infinity_mode {
            return Err(ForgeRejection::ColdSubstrate { heat: self.heat });
        }
        Ok(intent)
    }

    pub fn check_toggle_infinity(&self) -> Result<(), ForgeRejection> {
        self.check_idle()
    }

    pub fn check_quench(&self) -> Result<(), ForgeRejection> {
        self.check_idle()?;
        if !self.is_ready() {
            return Err(ForgeRejection::NotReadyToQuench {
                has_draft: !self.draft_code.is_empty(),
                strikes: self.strike_count,
            });
        }
        Ok(())
    }

    fn guard<T>(&mut self, check: Result<T, ForgeRejection>) -> Result<T, ForgeRejection> {
        check.map_err(|rejection| self.refuse(rejection))
    }

    /// Log a rejection and apply its penalty, if any.
    fn refuse(&mut self, rejection: ForgeRejection) -> ForgeRejection {
        match rejection {
            ForgeRejection::AlreadyProcessing => self.log(
                LogLevel::Warning,
                "RELAY_BUSY: Forge is processing. Action rejected.",
            ),
            ForgeRejection::EmptyIntent => {
                self.log(LogLevel::Warning, "STRIKE_DENIED: No architectural intent.");
            }
            ForgeRejection::ColdSubstrate { .. } => {
                self.integrity = self
                    .integrity
                    .penalize(self.params.cold_strike_penalty, self.params.integrity_floor);
                self.log(
                    LogLevel::Warning,
                    "STRUCTURAL_WARNING: Substrate cold. Strike logic imprint failed.",
                );
            }
            ForgeRejection::NotReadyToQuench { .. } => self.log(
                LogLevel::Warning,
                "QUENCH_DENIED: No struck logic to crystallize.",
            ),
            ForgeRejection::InsufficientTokens { .. } => {}
        }
        rejection
    }

    /// Release the forge after its in-flight call was dropped unanswered.
    ///
    /// Debits stand. An abandoned transmutation disengages infinity.
    pub fn abandon(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        if pending == Pending::Transmute {
            self.infinity_mode = false;
        }
        self.log(
            LogLevel::Error,
            format!("RELAY_ABORTED: {pending:?} call abandoned before completion."),
        );
    }

    pub fn set_realm(&mut self, realm: Realm) -> Result<(), ForgeRejection> {
        self.guard(self.check_idle())?;
        if realm != self.realm {
            self.realm = realm;
            self.log(
                LogLevel::Info,
                format!("REALM: Aligned to {realm} ({}).", realm.display_name()),
            );
        }
        Ok(())
    }

    /// Token cost a strike with `intent` would debit right now.
    #[must_use]
    pub fn estimate_strike_cost(&self, intent: &Intent) -> u64 {
        strike_cost(intent, self.realm.mode())
    }

    pub fn apply_heat(&mut self) -> Result<u32, ForgeRejection> {
        self.guard(self.check_heat())?;
        self.heat = self.heat.saturating_add(self.params.heat_increment);
        if self.heat > self.params.overheat_threshold {
            self.integrity = self
                .integrity
                .penalize(self.params.overheat_penalty, self.params.integrity_floor);
            self.log(
                LogLevel::Warning,
                format!(
                    "THERMAL_STRESS: {}°C exceeds tolerance. Integrity {}.",
                    self.heat, self.integrity
                ),
            );
        } else if self.is_prepared() {
            self.log(
                LogLevel::Info,
                format!("HEAT: {}°C. Substrate prepared.", self.heat),
            );
        } else {
            self.log(LogLevel::Info, format!("HEAT: {}°C.", self.heat));
        }
        Ok(self.heat)
    }

    pub fn begin_strike(
        &mut self,
        intent: &str,
        ledger: &TokenLedger,
    ) -> Result<StrikeTicket, ForgeRejection> {
        let intent = self.guard(self.check_strike(intent))?;
        let prepared = self.is_prepared();

        let cost = self.estimate_strike_cost(&intent);
        if let Err(short) = ledger.try_debit(cost) {
            self.log(
                LogLevel::Error,
                format!(
                    "SUBSTRATE_STARVATION: Depleted IQ-T. Strike needs {cost}, {} available.",
                    short.available
                ),
            );
            return Err(ForgeRejection::InsufficientTokens {
                cost,
                available: short.available,
            });
        }

        self.pending = Some(Pending::Strike);
        self.strike_count += 1;
        self.tokens_spent += cost;
        let strike = self.strike_count;
        self.log(
            LogLevel::Info,
            format!("STRIKE_{strike}: Honing {} logic...", self.realm),
        );

        let directive = if self.draft_code.is_empty() {
            prompts::initial_strike(self.heat, intent.as_str())
        } else {
            prompts::refinement_strike(self.heat, intent.as_str(), &self.draft_code)
        };
        let integrity_hint = if prepared {
            self.params.prepared_hint
        } else {
            self.params.unprepared_hint
        };
        self.intent = Some(intent);

        Ok(StrikeTicket {
            request: GenerationRequest {
                directive,
                realm: self.realm,
                integrity_hint,
            },
            cost,
            strike,
            prepared,
        })
    }

    /// Apply a strike result. The debit stands whatever the outcome.
    pub fn complete_strike(
        &mut self,
        ticket: StrikeTicket,
        outcome: ArtifactOutcome,
        ledger: &TokenLedger,
    ) -> Result<(), ForgeError> {
        self.pending = None;
        match outcome {
            ArtifactOutcome::Forged(draft) => {
                self.accept_draft(draft);
                self.integrity = self.integrity.reinforce(self.params.strike_reinforcement);
                self.log_buffer.push(format!(
                    "[Impact_{}]: Crystallized {} IQ-T logic at {}°C.",
                    ticket.strike, ticket.cost, self.heat
                ));
                if ticket.prepared && self.params.strike_reward_tokens > 0 {
                    ledger.credit(self.params.strike_reward_tokens);
                }
                self.log(
                    LogLevel::Success,
                    format!(
                        "SYNC: Kinetic impact successful. Consumed {} IQ-T.",
                        ticket.cost
                    ),
                );
                Ok(())
            }
            ArtifactOutcome::Fallback { error, .. } => {
                self.log(LogLevel::Error, format!("ERROR: {error}"));
                Err(ForgeError::Upstream(error))
            }
        }
    }

    pub fn begin_toggle_infinity(
        &mut self,
        ledger: &TokenLedger,
    ) -> Result<InfinityToggle, ForgeRejection> {
        self.guard(self.check_toggle_infinity())?;
        let enabling = !self.infinity_mode;

        if !(enabling && !self.draft_code.is_empty()) {
            self.infinity_mode = enabling;
            if enabling {
                self.log(
                    LogLevel::Info,
                    "OMEGA_WAIT: Handshake initialized. Awaiting strike to transmute.",
                );
            } else {
                self.log(LogLevel::Info, "OMEGA_RELEASE: Infinity disengaged.");
            }
            return Ok(InfinityToggle::Flipped { enabled: enabling });
        }

        let cost = self.params.transmute_cost;
        if let Err(short) = ledger.try_debit(cost) {
            self.infinity_mode = false;
            self.log(
                LogLevel::Error,
                format!(
                    "IQ-T_INSUFFICIENT_FOR_TRANSMUTATION: Needs {cost}, {} available.",
                    short.available
                ),
            );
            return Err(ForgeRejection::InsufficientTokens {
                cost,
                available: short.available,
            });
        }

        self.infinity_mode = true;
        self.pending = Some(Pending::Transmute);
        self.tokens_spent += cost;
        self.log(
            LogLevel::Info,
            "PROTOCOL: OMEGA_TRANSMUTATION engaged. Restructuring logic...",
        );

        Ok(InfinityToggle::Transmute(TransmuteTicket {
            request: GenerationRequest {
                directive: prompts::transmutation(&self.draft_code),
                realm: self.realm,
                integrity_hint: self.params.transmute_overdrive,
            },
        }))
    }

    pub fn complete_transmute(
        &mut self,
        _ticket: TransmuteTicket,
        outcome: ArtifactOutcome,
    ) -> Result<(), ForgeError> {
        self.pending = None;
        match outcome {
            ArtifactOutcome::Forged(draft) => {
                self.accept_draft(draft);
                self.integrity = Integrity::MAX;
                self.heat = self.params.transmuted_heat;
                self.log_buffer
                    .push("[OMEGA_SHIFT]: Total logic transmutation achieved.".to_string());
                self.log(
                    LogLevel::Success,
                    "SUCCESS: Substrate ascended to OMEGA grade.",
                );
                Ok(())
            }
            ArtifactOutcome::Fallback { error, .. } => {
                self.infinity_mode = false;
                self.log(LogLevel::Error, format!("ERROR: {error}"));
                Err(ForgeError::Upstream(error))
            }
        }
    }

    pub fn begin_quench(&mut self) -> Result<QuenchTicket, ForgeRejection> {
        self.guard(self.check_quench())?;

        self.pending = Some(Pending::Quench);
        self.log(
            LogLevel::Info,
            "QUENCH: Crystallizing structural state and rendering visual projection...",
        );
        Ok(QuenchTicket {
            subject: format!("{}_{}", self.realm, self.integrity.percent()),
            integrity: self.integrity,
        })
    }

    /// Emit the finished artifact and reset the session for the next forging.
    pub fn complete_quench(&mut self, ticket: QuenchTicket, visual: Option<ImageRef>) -> Artifact {
        let infinity = self.infinity_mode;
        let multiplier = if infinity {
            self.params.infinity_quench_multiplier
        } else {
            1.0
        };
        let integrity = ticket.integrity.amplify(multiplier);
        let status = if infinity {
            ArtifactStatus::OmegaBound
        } else if integrity.value() >= self.params.masterwork_threshold {
            ArtifactStatus::Masterwork
        } else {
            ArtifactStatus::Honed
        };

        let id = Uuid::new_v4().simple().to_string();
        let suffix = id[..4].to_ascii_uppercase();
        let artifact = Artifact {
            name: format!("{}_{suffix}", self.realm),
            id: ArtifactId::new(id),
            kind: if infinity {
                ArtifactKind::OmegaBound
            } else {
                ArtifactKind::Artifact
            },
            origin: self.realm,
            intent: self
                .intent
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            code_shard: std::mem::take(&mut self.draft_code),
            image_url: visual,
            status,
            tags: vec![
                self.realm.as_str().to_string(),
                if infinity { "INFINITY" } else { "STABLE" }.to_string(),
                format!("STRIKES_{}", self.strike_count),
            ],
            created_at: Utc::now(),
            expansion_history: std::mem::take(&mut self.log_buffer),
            integrity_score: integrity,
            intelligence_cost: self.tokens_spent,
        };

        self.log(
            LogLevel::Success,
            format!("CRYSTALLIZED: {} [{}].", artifact.name, artifact.status),
        );
        self.reset();
        artifact
    }

    /// Return to a cold forge, keeping the realm and any unread log lines.
    pub fn reset(&mut self) {
        self.heat = 0;
        self.strike_count = 0;
        self.integrity = Integrity::MAX;
        self.infinity_mode = false;
        self.intent = None;
        self.draft_name = None;
        self.draft_code.clear();
        self.last_tags.clear();
        self.tokens_spent = 0;
        self.pending = None;
        self.log_buffer.clear();
    }

    fn accept_draft(&mut self, draft: ArtifactDraft) {
        self.draft_name = Some(draft.name);
        self.draft_code = draft.code_shard;
        self.last_tags = draft.tags;
    }
}
