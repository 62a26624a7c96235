//! Conversation panel that spends from the shared ledger.

use iadess_providers::{GatewayError, GatewayErrorKind};
use iadess_types::{ChatMessage, ChatParams, ChatRole, TextReply};
use thiserror::Error;
use uuid::Uuid;

use crate::ledger::TokenLedger;

pub const GREETING_ID: &str = "init_msg";
pub const GREETING: &str =
    "Protocol: INTEGRITY_AS_INTELLIGENCE is active. Waiting for architectural intent.";
pub const STARVATION_MESSAGE: &str =
    "SUBSTRATE_STARVATION: Cognitive energy critical. Cannot process intent.";

pub const VOICES: [&str; 2] = ["Puck", "Kore"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatRejection {
    #[error("message must not be empty")]
    EmptyMessage,
    #[error("a reply is still pending")]
    Busy,
    #[error("insufficient IQ-T: need {cost}, have {available}")]
    InsufficientTokens { cost: u64, available: u64 },
}

/// Issued by [`ChatPanel::begin_send`]; redeem with `complete_send`.
#[derive(Debug)]
#[must_use = "a chat ticket must be completed to release the panel"]
pub struct ChatTicket {
    history: Vec<ChatMessage>,
    prompt: String,
}

impl ChatTicket {
    /// Conversation before the new prompt.
    #[must_use]
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

#[derive(Debug)]
pub struct ChatPanel {
    params: ChatParams,
    messages: Vec<ChatMessage>,
    loading: bool,
    low_resource: bool,
    voice: String,
}

impl ChatPanel {
    #[must_use]
    pub fn new(params: ChatParams) -> Self {
        Self {
            params,
            messages: vec![ChatMessage::new(GREETING_ID, ChatRole::Model, GREETING)],
            loading: false,
            low_resource: false,
            voice: VOICES[0].to_string(),
        }
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Set after the upstream reported quota exhaustion; cleared by the next good reply.
    #[must_use]
    pub fn low_resource(&self) -> bool {
        self.low_resource
    }

    #[must_use]
    pub fn low_balance(&self, ledger: &TokenLedger) -> bool {
        ledger.balance() < self.params.low_balance_warning
    }

    #[must_use]
    pub fn voice(&self) -> &str {
        &self.voice
    }

    /// Returns `false` for voices outside [`VOICES`].
    pub fn set_voice(&mut self, voice: &str) -> bool {
        match VOICES.iter().find(|v| v.eq_ignore_ascii_case(voice)) {
            Some(v) => {
                self.voice = (*v).to_string();
                true
            }
            None => false,
        }
    }

    pub fn begin_send(
        &mut self,
        input: &str,
        ledger: &TokenLedger,
    ) -> Result<ChatTicket, ChatRejection> {
        let prompt = input.trim();
        if prompt.is_empty() {
            return Err(ChatRejection::EmptyMessage);
        }
        if self.loading {
            return Err(ChatRejection::Busy);
        }

        let cost = self.params.message_cost;
        if let Err(short) = ledger.try_debit(cost) {
            tracing::warn!(cost, available = short.available, "Chat send rejected");
            self.messages
                .push(ChatMessage::error(new_id(), STARVATION_MESSAGE));
            return Err(ChatRejection::InsufficientTokens {
                cost,
                available: short.available,
            });
        }

        let history = self.messages.clone();
        self.messages
            .push(ChatMessage::new(new_id(), ChatRole::User, prompt));
        self.loading = true;
        Ok(ChatTicket {
            history,
            prompt: prompt.to_string(),
        })
    }

    /// Record the reply (or the failure) and return the message appended for it.
    pub fn complete_send(
        &mut self,
        _ticket: ChatTicket,
        reply: Result<TextReply, GatewayError>,
    ) -> ChatMessage {
        self.loading = false;
        let message = match reply {
            Ok(reply) => {
                self.low_resource = false;
                let mut message = ChatMessage::new(new_id(), ChatRole::Model, reply.text);
                message.grounding = reply.grounding;
                message
            }
            Err(err) => {
                let kind = err.kind();
                tracing::error!("Chat reply failed: {err}");
                if kind == GatewayErrorKind::QuotaExhausted {
                    self.low_resource = true;
                }
                ChatMessage::error(new_id(), kind.message())
            }
        };
        self.messages.push(message.clone());
        message
    }

    /// Release the panel after its in-flight reply was dropped. The debit stands.
    pub fn abandon(&mut self) {
        if std::mem::replace(&mut self.loading, false) {
            tracing::warn!("Chat reply abandoned before completion");
        }
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}
