pub mod builder;
pub mod error;
pub mod inputs;
pub mod rules;
pub mod store;
pub mod validator;
pub mod wizard;

pub use builder::build_name;
pub use error::{Error, Result};
pub use rules::{CharacterPolicy, NamingRuleSet, RuleBook};
pub use validator::{validate_batch, validate_name};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

// --- Types ---

/// One of the three naming domains, each with its own rule set and field schema.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
    schemars::JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Planner {
    Campaign,
    Placement,
    Creative,
}

impl Planner {
    pub const ALL: [Planner; 3] = [Planner::Campaign, Planner::Placement, Planner::Creative];

    pub fn as_str(&self) -> &'static str {
        match self {
            Planner::Campaign => "campaign",
            Planner::Placement => "placement",
            Planner::Creative => "creative",
        }
    }

    /// Key used for this planner in the rules document.
    pub fn config_key(&self) -> &'static str {
        match self {
            Planner::Campaign => "campaign_planner",
            Planner::Placement => "placement_planner",
            Planner::Creative => "creative_planner",
        }
    }
}

impl fmt::Display for Planner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Planner {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_ascii_lowercase();
        Planner::ALL
            .into_iter()
            .find(|p| p.as_str() == key || p.config_key() == key)
            .ok_or_else(|| Error::UnknownPlanner(s.to_string()))
    }
}

/// A proposed name awaiting validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NameCandidate {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl NameCandidate {
    pub fn manual(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reasoning: None,
        }
    }
}

/// Result of checking one candidate against a rule set.
///
/// `is_valid` is always `issues.is_empty()`; construct through
/// [`ValidationVerdict::from_issues`] to keep it that way. Deserialization
/// rejects verdicts that break it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", try_from = "RawVerdict")]
pub struct ValidationVerdict {
    pub name: String,
    pub is_valid: bool,
    pub issues: Vec<String>,
    pub reasoning: String,
}

impl ValidationVerdict {
    pub fn from_issues(name: impl Into<String>, issues: Vec<String>) -> Self {
        let is_valid = issues.is_empty();
        let reasoning = if is_valid {
            validator::VALID_REASONING.to_string()
        } else {
            issues.join("; ")
        };
        Self {
            name: name.into(),
            is_valid,
            issues,
            reasoning,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVerdict {
    name: String,
    is_valid: bool,
    #[serde(default)]
    issues: Vec<String>,
}

impl TryFrom<RawVerdict> for ValidationVerdict {
    type Error = String;

    fn try_from(raw: RawVerdict) -> std::result::Result<Self, Self::Error> {
        if raw.is_valid != raw.issues.is_empty() {
            return Err(format!(
                "verdict for '{}' has isValid={} with {} issue(s)",
                raw.name,
                raw.is_valid,
                raw.issues.len()
            ));
        }
        Ok(Self::from_issues(raw.name, raw.issues))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FixSuggestion {
    pub original: String,
    pub suggested_name: String,
    #[serde(default)]
    pub explanation: String,
}

/// Where a name came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum NameSource {
    #[default]
    Manual,
    Ai,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Valid,
    Invalid,
    #[default]
    Pending,
}

impl From<&ValidationVerdict> for ValidationStatus {
    fn from(verdict: &ValidationVerdict) -> Self {
        if verdict.is_valid {
            ValidationStatus::Valid
        } else {
            ValidationStatus::Invalid
        }
    }
}

/// A finalized name as handed to a [`store::NameStore`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NameRecord {
    pub planner: Planner,
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub free_form: Vec<String>,
    #[serde(default)]
    pub source: NameSource,
    #[serde(default)]
    pub validation_status: ValidationStatus,
}

// --- Storage ---

/// Resolve the data directory: `$NAMEGOV_HOME`, else `~/.namegov/`.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("NAMEGOV_HOME") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".namegov")
}

// --- AI Settings ---

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AiSettings {
    pub provider: String,
    pub api_key: String,
    pub model: String,
}

fn settings_path() -> PathBuf {
    data_dir().join("settings.json")
}

/// Read settings from disk. Missing or unreadable settings fall back to defaults.
pub fn read_settings() -> AiSettings {
    let path = settings_path();
    if !path.exists() {
        return AiSettings::default();
    }
    match fs::read_to_string(&path).map(|s| serde_json::from_str::<AiSettings>(&s)) {
        Ok(Ok(settings)) => settings,
        Ok(Err(e)) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed settings");
            AiSettings::default()
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot read settings");
            AiSettings::default()
        }
    }
}

pub fn write_settings(settings: &AiSettings) -> Result<()> {
    let dir = data_dir();
    fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(settings_path(), json)?;
    Ok(())
}

pub fn ai_configured(settings: &AiSettings) -> bool {
    !settings.provider.is_empty()
        && !settings.model.is_empty()
        && (settings.provider == "ollama" || !settings.api_key.is_empty())
}
