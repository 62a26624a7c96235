//! Realms (what is being forged) and forge modes (how much it costs).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cost tier a realm is forged under.
///
/// Multipliers are held as whole percentages so cost arithmetic stays exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ForgeMode {
    CoreSubstrate,
    DataResonance,
    AuthVoid,
    LogicJoinery,
}

impl ForgeMode {
    /// Cost multiplier in percent (100 = 1.0x).
    #[must_use]
    pub const fn multiplier_percent(self) -> u32 {
        match self {
            ForgeMode::CoreSubstrate => 100,
            ForgeMode::DataResonance => 120,
            ForgeMode::AuthVoid => 150,
            ForgeMode::LogicJoinery => 180,
        }
    }

    #[must_use]
    pub fn multiplier(self) -> f64 {
        f64::from(self.multiplier_percent()) / 100.0
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ForgeMode::CoreSubstrate => "CORE_SUBSTRATE",
            ForgeMode::DataResonance => "DATA_RESONANCE",
            ForgeMode::AuthVoid => "AUTH_VOID",
            ForgeMode::LogicJoinery => "LOGIC_JOINERY",
        }
    }
}

/// Architecture category an artifact belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Realm {
    #[default]
    Pages,
    Components,
    Ui,
    Entities,
    Layout,
    Functions,
    Index,
    Src,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown realm: {0}")]
pub struct RealmParseError(pub String);

impl Realm {
    pub const ALL: [Realm; 8] = [
        Realm::Pages,
        Realm::Components,
        Realm::Ui,
        Realm::Entities,
        Realm::Layout,
        Realm::Functions,
        Realm::Index,
        Realm::Src,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Realm::Pages => "PAGES",
            Realm::Components => "COMPONENTS",
            Realm::Ui => "UI",
            Realm::Entities => "ENTITIES",
            Realm::Layout => "LAYOUT",
            Realm::Functions => "FUNCTIONS",
            Realm::Index => "INDEX",
            Realm::Src => "SRC",
        }
    }

    /// Themed display name shown next to the realm selector.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Realm::Pages => "Core Substrate",
            Realm::Components => "Data Resonance",
            Realm::Ui => "Interface Fabric",
            Realm::Entities => "Asset Weaver",
            Realm::Layout => "Resonance Hub",
            Realm::Functions => "Logic Joinery",
            Realm::Index => "Index Substrate",
            Realm::Src => "Src Substrate",
        }
    }

    #[must_use]
    pub const fn mode(self) -> ForgeMode {
        match self {
            Realm::Pages | Realm::Index | Realm::Src => ForgeMode::CoreSubstrate,
            Realm::Components | Realm::Ui => ForgeMode::DataResonance,
            Realm::Entities | Realm::Layout => ForgeMode::AuthVoid,
            Realm::Functions => ForgeMode::LogicJoinery,
        }
    }

    /// Parse a realm name, case-insensitively.
    pub fn parse(raw: &str) -> Result<Self, RealmParseError> {
        let trimmed = raw.trim();
        Self::ALL
            .into_iter()
            .find(|realm| realm.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| RealmParseError(trimmed.to_string()))
    }
}

impl std::fmt::Display for Realm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Realm {
    type Err = RealmParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
