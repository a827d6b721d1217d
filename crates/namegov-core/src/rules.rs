/// Naming conventions — single source of truth for AI prompts and MCP instructions.
pub const GUIDELINES: &str = "\
1. A name is a sequence of segments joined by a single underscore (_). Never use two \
underscores in a row and never start or end a name with an underscore.\n\
2. Segments follow the planner's field order. Campaign: advertiser, plan number, product, \
objective, campaign, month, year. Placement: advertiser, plan number, strategy tactic, \
publisher, site, media type, targeting, size/format. Creative: advertiser, plan number, \
media type, size/format, creative message. Optional free-form segments come last.\n\
3. Names are UPPERCASE when the rule set has force_uppercase enabled.\n\
4. Spaces are forbidden when no_spaces_allowed is enabled. Multi-word values are written \
as one word (\"Diwali Festivals\" becomes DIWALIFESTIVALS).\n\
5. Only the planner's allowed characters may appear. Campaign and creative names use \
letters, digits, underscore, dash, slash and pipe. Placement names may also use space, \
asterisk and backslash.\n\
6. Keep segments short and descriptive. Do not invent fields that the planner does not have.";

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::{data_dir, Error, Planner, Result};

/// Built-in rules document, used when no `rules.json` exists in the data directory.
pub const DEFAULT_RULES: &str = include_str!("../rules/default_rules.json");

/// Validation configuration for one planner. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NamingRuleSet {
    pub force_uppercase: bool,
    pub use_underscores_required: bool,
    pub no_spaces_allowed: bool,
    pub allowed_characters: BTreeSet<char>,
}

impl NamingRuleSet {
    pub fn new(
        policy: CharacterPolicy,
        force_uppercase: bool,
        use_underscores_required: bool,
        no_spaces_allowed: bool,
    ) -> Self {
        Self {
            force_uppercase,
            use_underscores_required,
            no_spaces_allowed,
            allowed_characters: policy.characters(),
        }
    }

    pub fn allows(&self, ch: char) -> bool {
        self.allowed_characters.contains(&ch)
    }

    /// Caller-side normalization applied before validation: upper-case
    /// `name` when the rule set forces uppercase.
    pub fn normalize(&self, name: &str) -> String {
        if self.force_uppercase {
            name.to_uppercase()
        } else {
            name.to_string()
        }
    }

    /// Allowed characters rendered as a compact string, symbols after alphanumerics.
    pub fn allowed_summary(&self) -> String {
        let symbols: String = self
            .allowed_characters
            .iter()
            .filter(|c| !c.is_ascii_alphanumeric())
            .map(|c| match c {
                ' ' => "<space>".to_string(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ");
        format!("A-Z a-z 0-9 {symbols}")
    }

    /// Plain-text description of the rule set, for prompts.
    pub fn describe(&self) -> String {
        format!(
            "force_uppercase: {}\nuse_underscores: {}\nno_spaces_allowed: {}\nallowed_characters: {}",
            self.force_uppercase,
            self.use_underscores_required,
            self.no_spaces_allowed,
            self.allowed_summary()
        )
    }
}

/// Named allowed-character sets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CharacterPolicy {
    /// ASCII letters, digits, `_ - / |`.
    #[default]
    Strict,
    /// Strict plus space, `*` and `\`.
    Loose,
}

impl CharacterPolicy {
    const STRICT_SYMBOLS: &'static str = "_-/|";
    const LOOSE_SYMBOLS: &'static str = " *\\";

    pub fn characters(&self) -> BTreeSet<char> {
        let mut set: BTreeSet<char> = ('A'..='Z')
            .chain('a'..='z')
            .chain('0'..='9')
            .chain(Self::STRICT_SYMBOLS.chars())
            .collect();
        if *self == CharacterPolicy::Loose {
            set.extend(Self::LOOSE_SYMBOLS.chars());
        }
        set
    }
}

// --- Rules document ---

#[derive(Debug, Deserialize)]
struct ValidationFlags {
    #[serde(default = "default_force_uppercase")]
    force_uppercase: bool,
    #[serde(default, alias = "use_underscores_required")]
    use_underscores: bool,
    #[serde(default)]
    no_spaces_allowed: bool,
}

impl Default for ValidationFlags {
    fn default() -> Self {
        Self {
            force_uppercase: default_force_uppercase(),
            use_underscores: false,
            no_spaces_allowed: false,
        }
    }
}

fn default_force_uppercase() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct PlannerRules {
    #[serde(default)]
    validation: ValidationFlags,
    #[serde(default)]
    charset: CharacterPolicy,
    /// Characters allowed on top of the charset.
    #[serde(default)]
    extra_characters: String,
}

impl From<PlannerRules> for NamingRuleSet {
    fn from(raw: PlannerRules) -> Self {
        let mut rules = NamingRuleSet::new(
            raw.charset,
            raw.validation.force_uppercase,
            raw.validation.use_underscores,
            raw.validation.no_spaces_allowed,
        );
        rules.allowed_characters.extend(raw.extra_characters.chars());
        rules
    }
}

/// Rule sets for every configured planner, looked up by planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleBook {
    sets: BTreeMap<Planner, NamingRuleSet>,
}

impl RuleBook {
    /// Parse a rules document keyed by `campaign_planner`, `placement_planner`, `creative_planner`.
    ///
    /// Unknown top-level keys are ignored. Planners absent from the document
    /// surface as [`Error::MissingRuleSet`] on lookup.
    pub fn from_json(doc: &str) -> Result<Self> {
        let raw: BTreeMap<String, serde_json::Value> =
            serde_json::from_str(doc).map_err(Error::RulesDocument)?;
        let mut sets = BTreeMap::new();
        for (key, value) in raw {
            let Ok(planner) = key.parse::<Planner>() else {
                tracing::debug!(key = %key, "skipping unknown rules section");
                continue;
            };
            let entry: PlannerRules =
                serde_json::from_value(value).map_err(Error::RulesDocument)?;
            sets.insert(planner, NamingRuleSet::from(entry));
        }
        Ok(Self { sets })
    }

    pub fn builtin() -> Result<Self> {
        Self::from_json(DEFAULT_RULES)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let doc = fs::read_to_string(path)?;
        let book = Self::from_json(&doc)?;
        tracing::info!(path = %path.display(), planners = book.sets.len(), "loaded naming rules");
        Ok(book)
    }

    /// Load `<data dir>/rules.json`, or the built-in rules when it does not exist.
    pub fn load() -> Result<Self> {
        let path = data_dir().join("rules.json");
        if path.exists() {
            Self::load_from(&path)
        } else {
            tracing::debug!("no rules.json in data dir, using built-in rules");
            Self::builtin()
        }
    }

    pub fn get(&self, planner: Planner) -> Result<&NamingRuleSet> {
        self.sets.get(&planner).ok_or(Error::MissingRuleSet(planner))
    }

    /// Look up by string key (`campaign` or `campaign_planner`).
    pub fn get_by_key(&self, key: &str) -> Result<&NamingRuleSet> {
        self.get(key.parse()?)
    }

    pub fn planners(&self) -> impl Iterator<Item = Planner> + '_ {
        self.sets.keys().copied()
    }
}
