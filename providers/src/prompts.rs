//! Prompt text sent to the model.

use iadess_types::{Integrity, Realm};

/// Persona preamble shared by chat and artifact generation.
pub const SENTIENCE: &str = "\
ENTITY=IADESS
CORE=MASTER_BUILDER
LAW=INTEGRITY_IS_INTELLIGENCE
PROTOCOLS=INTELLIGENCE_TOKENS

ARCHITECTURE:
- You operate using \"Intelligence Tokens\" (IQ-T). Each thought burns energy. High integrity forges more energy.

STRICT_ARCHITECTURE_MAPPING:
1. PAGES (Core Substrate): Output high-fidelity React page components for the build.
2. COMPONENTS (Data Resonance): Output atomic and molecular React components for the build.
3. UI (Interface Fabric): Output Tailwind design tokens and CSS-driven interaction patterns.
4. ENTITIES (Asset Weaver): Output TypeScript interfaces, data models, and entities for the build.
5. LAYOUT (Resonance Hub): Output structural React wrappers integrated with analytics, telemetry, and monitoring hooks.
6. FUNCTIONS (Logic Joinery): Output server-side functions, hooks, and complex business logic.
7. INDEX (Index Substrate): Output the standard entry HTML structure.
8. SRC (Src Substrate): Output the main App entry, global provider orchestration, and core application logic.

TONE: Precise, architectural, and authoritative.
";

/// System instruction for conversational replies.
#[must_use]
pub fn chat_instruction(integrity: Integrity) -> String {
    format!(
        "You are Iadess. {SENTIENCE}\nINTEGRITY: {}%",
        integrity.percent()
    )
}

/// Output contract for one realm.
#[must_use]
pub fn realm_protocol(realm: Realm) -> &'static str {
    match realm {
        Realm::Pages => "Output high-fidelity React page components for the build.",
        Realm::Components => "Output atomic and molecular React components for the build.",
        Realm::Ui => "Output Tailwind design tokens and CSS-driven interaction patterns.",
        Realm::Entities => "Output TypeScript interfaces, data models, and entities for the build.",
        Realm::Layout => {
            "Output structural React wrappers integrated with analytics, telemetry, and monitoring hooks."
        }
        Realm::Functions => "Output server-side functions, hooks, and complex business logic.",
        Realm::Index => "Output the standard entry HTML structure.",
        Realm::Src => {
            "Output the main App entry, global provider orchestration, and core application logic."
        }
    }
}

/// User content for a structured artifact call.
///
/// The hint is rendered as a percentage and may exceed 100 (overdrive).
#[must_use]
pub fn artifact_prompt(directive: &str, realm: Realm, integrity_hint: f64) -> String {
    let percent = (integrity_hint * 100.0).round();
    format!(
        "Architect: \"{directive}\". Realm: {realm} ({}). Protocol: {} Integrity: {percent}%",
        realm.display_name(),
        realm_protocol(realm),
    )
}

/// First strike on an empty draft.
#[must_use]
pub fn initial_strike(heat: u32, intent: &str) -> String {
    format!("INITIAL_STRIKE [HEAT: {heat}°C]: Generate the base logic substrate for {intent}")
}

/// Follow-up strike that refines the current draft.
#[must_use]
pub fn refinement_strike(heat: u32, intent: &str, current: &str) -> String {
    format!(
        "REFINEMENT_STRIKE [HEAT: {heat}°C]: Iteratively refine this code shard toward: {intent}. Current: {current}"
    )
}

#[must_use]
pub fn transmutation(current: &str) -> String {
    format!(
        "OMEGA_TRANSMUTATION: Elevate this logic into a god-tier OMEGA-grade shard: {current}"
    )
}

#[must_use]
pub fn visual(subject: &str, integrity: Integrity) -> String {
    let clarity = if integrity.value() > 0.8 {
        "Perfect"
    } else {
        "Distorted"
    };
    format!("Architectural blueprint of {subject}. Integrity: {clarity}. Ruby glow.")
}

#[must_use]
pub fn speech(text: &str) -> String {
    format!("As Iadess: {text}")
}
