//! Facade tying the forge session, ledger, chat and gateway together.
//!
//! Every gateway-backed action runs `begin_*` under the session lock, releases
//! the lock for the call, then reacquires it for `complete_*`. A second action
//! arriving meanwhile sees the busy flag and is rejected rather than queued.
//! If an action future is dropped mid-call, a [`ReleaseOnDrop`] guard
//! abandons the outstanding call so the forge does not stay busy.

use std::sync::{Mutex, MutexGuard, PoisonError};

use iadess_providers::GenerationGateway;
use iadess_types::{
    Artifact, ArtifactId, AudioClip, ChatMessage, ChatParams, ForgeParams, Intent, Realm,
    TokenBalance,
};
use tokio::sync::broadcast;

use crate::artifacts::ArtifactStore;
use crate::chat::{ChatPanel, ChatRejection};
use crate::forge::{
    ForgeError, ForgeLogEntry, ForgeRejection, ForgeSession, ForgeSnapshot, InfinityToggle,
};
use crate::ledger::TokenLedger;
use crate::persistence::ArtifactRepository;
use crate::simulation::{SimulationReport, simulate_artifact};

const LOG_CHANNEL_CAPACITY: usize = 256;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs `release` on drop unless disarmed first.
struct ReleaseOnDrop<F: FnOnce()> {
    release: Option<F>,
}

impl<F: FnOnce()> ReleaseOnDrop<F> {
    fn new(release: F) -> Self {
        Self {
            release: Some(release),
        }
    }

    fn disarm(mut self) {
        self.release = None;
    }
}

impl<F: FnOnce()> Drop for ReleaseOnDrop<F> {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

pub struct Studio<G> {
    gateway: G,
    ledger: TokenLedger,
    session: Mutex<ForgeSession>,
    store: Mutex<ArtifactStore>,
    chat: Mutex<ChatPanel>,
    repository: Option<ArtifactRepository>,
    events: broadcast::Sender<ForgeLogEntry>,
}

impl<G: GenerationGateway> Studio<G> {
    pub fn new(gateway: G, ledger: TokenLedger, params: ForgeParams, realm: Realm) -> Self {
        let (events, _) = broadcast::channel(LOG_CHANNEL_CAPACITY);
        Self {
            gateway,
            ledger,
            session: Mutex::new(ForgeSession::new(params, realm)),
            store: Mutex::new(ArtifactStore::new()),
            chat: Mutex::new(ChatPanel::new(ChatParams::default())),
            repository: None,
            events,
        }
    }

    #[must_use]
    pub fn with_chat_params(self, params: ChatParams) -> Self {
        Self {
            chat: Mutex::new(ChatPanel::new(params)),
            ..self
        }
    }

    /// Persist quenched artifacts to `repository`, starting from its contents.
    #[must_use]
    pub fn with_repository(self, repository: ArtifactRepository) -> Self {
        let store = ArtifactStore::from_persisted(repository.load());
        tracing::info!(
            path = %repository.path().display(),
            count = store.len(),
            "Loaded artifacts"
        );
        Self {
            store: Mutex::new(store),
            repository: Some(repository),
            ..self
        }
    }

    #[must_use]
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Receive forge log lines as they are produced.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ForgeLogEntry> {
        self.events.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> ForgeSnapshot {
        lock(&self.session).snapshot()
    }

    #[must_use]
    pub fn balance(&self) -> TokenBalance {
        self.ledger.snapshot()
    }

    fn publish(&self, session: &mut ForgeSession) {
        for entry in session.drain_log() {
            // No subscribers is fine.
            let _ = self.events.send(entry);
        }
    }

    fn with_session<T>(&self, f: impl FnOnce(&mut ForgeSession) -> T) -> T {
        let mut session = lock(&self.session);
        let result = f(&mut session);
        self.publish(&mut session);
        result
    }

    pub fn apply_heat(&self) -> Result<u32, ForgeRejection> {
        self.with_session(ForgeSession::apply_heat)
    }

    pub fn set_realm(&self, realm: Realm) -> Result<(), ForgeRejection> {
        self.with_session(|s| s.set_realm(realm))
    }

    /// Cost of striking `intent` in the current realm; `None` for blank input.
    #[must_use]
    pub fn estimate_cost(&self, intent: &str) -> Option<u64> {
        let intent = Intent::new(intent).ok()?;
        Some(lock(&self.session).estimate_strike_cost(&intent))
    }

    fn release_session(&self) -> ReleaseOnDrop<impl FnOnce() + '_> {
        ReleaseOnDrop::new(move || self.with_session(ForgeSession::abandon))
    }

    pub async fn strike(&self, intent: &str) -> Result<(), ForgeError> {
        let ticket = self.with_session(|s| s.begin_strike(intent, &self.ledger))?;
        let release = self.release_session();
        let outcome = self.gateway.generate_artifact(ticket.request()).await;
        release.disarm();
        self.with_session(|s| s.complete_strike(ticket, outcome, &self.ledger))
    }

    /// Flip infinity mode, transmuting the current draft when turning it on.
    ///
    /// Returns whether infinity is engaged afterwards.
    pub async fn toggle_infinity(&self) -> Result<bool, ForgeError> {
        let toggle = self.with_session(|s| s.begin_toggle_infinity(&self.ledger))?;
        match toggle {
            InfinityToggle::Flipped { enabled } => Ok(enabled),
            InfinityToggle::Transmute(ticket) => {
                let release = self.release_session();
                let outcome = self.gateway.generate_artifact(ticket.request()).await;
                release.disarm();
                self.with_session(|s| s.complete_transmute(ticket, outcome))?;
                Ok(true)
            }
        }
    }

    /// Crystallize the session into an artifact, store it and persist it.
    pub async fn quench(&self) -> Result<Artifact, ForgeError> {
        let ticket = self.with_session(ForgeSession::begin_quench)?;
        let release = self.release_session();
        let visual = self
            .gateway
            .synthesize_visual(ticket.subject(), ticket.integrity())
            .await;
        release.disarm();
        if visual.is_none() {
            tracing::warn!("Visual projection unavailable; quenching without image");
        }
        let artifact = self.with_session(|s| s.complete_quench(ticket, visual));

        lock(&self.store).push(artifact.clone());
        if let Some(repository) = &self.repository
            && let Err(e) = repository.save(&artifact)
        {
            tracing::warn!("Failed to persist artifact {}: {e}", artifact.id);
        }
        Ok(artifact)
    }

    #[must_use]
    pub fn artifacts(&self) -> Vec<Artifact> {
        lock(&self.store).list().to_vec()
    }

    pub fn select(&self, id: &ArtifactId) -> bool {
        lock(&self.store).select(id)
    }

    #[must_use]
    pub fn selected(&self) -> Option<Artifact> {
        lock(&self.store).selected().cloned()
    }

    /// Run the canned simulation over the selected artifact.
    #[must_use]
    pub fn simulate_selected(&self) -> Option<SimulationReport> {
        lock(&self.store).selected().map(simulate_artifact)
    }

    #[must_use]
    pub fn chat_messages(&self) -> Vec<ChatMessage> {
        lock(&self.chat).messages().to_vec()
    }

    #[must_use]
    pub fn chat_low_resource(&self) -> bool {
        lock(&self.chat).low_resource()
    }

    /// Balance has fallen under the chat's warning level.
    #[must_use]
    pub fn chat_low_balance(&self) -> bool {
        lock(&self.chat).low_balance(&self.ledger)
    }

    pub fn set_voice(&self, voice: &str) -> bool {
        lock(&self.chat).set_voice(voice)
    }

    /// Send a chat message and return the message appended in response.
    pub async fn send_chat(&self, input: &str) -> Result<ChatMessage, ChatRejection> {
        let ticket = lock(&self.chat).begin_send(input, &self.ledger)?;
        let integrity = lock(&self.session).integrity();
        let release = ReleaseOnDrop::new(|| lock(&self.chat).abandon());
        let reply = self
            .gateway
            .generate_text(ticket.history(), ticket.prompt(), integrity)
            .await;
        release.disarm();

        Ok(lock(&self.chat).complete_send(ticket, reply))
    }

    /// Speak `text` in the selected voice.
    pub async fn speak(&self, text: &str) -> Option<AudioClip> {
        let voice = lock(&self.chat).voice().to_string();
        self.gateway.synthesize_speech(text, Some(&voice)).await
    }
}
