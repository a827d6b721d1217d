//! Explicit naming-session state and its pure transition function.
//!
//! A session is a [`WizardState`] value; every user step is a
//! [`UserAction`] applied with [`apply`]. Nothing here performs I/O: the
//! caller runs suggestion and fix collaborators and the store, then feeds
//! their results back in as actions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::inputs::{check_required, ordered_values};
use crate::{
    build_name, validate_batch, FixSuggestion, NameCandidate, NameSource, NamingRuleSet, Planner,
    ValidationVerdict,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WizardStep {
    /// Collecting field values and free-form segments.
    #[default]
    Details,
    /// Candidates validated; choose, fix or save.
    Review,
    /// The selected name has been saved.
    Done,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WizardState {
    pub planner: Planner,
    pub rules: NamingRuleSet,
    #[serde(default)]
    pub step: WizardStep,
    #[serde(default)]
    pub mode: NameSource,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub free_form: Vec<String>,
    /// Free-text description handed to the suggestion source.
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub candidates: Vec<NameCandidate>,
    /// Always computed from `candidates` and `rules`, never read back.
    #[serde(default, skip_deserializing)]
    pub verdicts: Vec<ValidationVerdict>,
    #[serde(default)]
    pub fixes: Vec<FixSuggestion>,
    #[serde(default)]
    pub selected: Option<String>,
    /// Names saved during this session, across resets.
    #[serde(default)]
    pub saved: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UserAction {
    SetField { key: String, value: String },
    SetContext { text: String },
    AddFreeForm { value: String },
    RemoveFreeForm { index: usize },
    ChooseMode { mode: NameSource },
    /// Build one name from the entered fields and validate it.
    BuildManual,
    ReceiveSuggestions { candidates: Vec<NameCandidate> },
    ReceiveFixes { fixes: Vec<FixSuggestion> },
    /// Replace the candidate `original` with its suggested fix and re-validate.
    AcceptFix { original: String },
    Select { name: String },
    Saved { name: String },
    /// Start another name for the same planner; the saved-name tally is kept.
    Reset,
}

impl WizardState {
    pub fn new(planner: Planner, rules: NamingRuleSet) -> Self {
        Self {
            planner,
            rules,
            step: WizardStep::Details,
            mode: NameSource::Manual,
            fields: BTreeMap::new(),
            free_form: Vec::new(),
            context: String::new(),
            candidates: Vec::new(),
            verdicts: Vec::new(),
            fixes: Vec::new(),
            selected: None,
            saved: Vec::new(),
            error: None,
        }
    }

    pub fn invalid_verdicts(&self) -> Vec<&ValidationVerdict> {
        self.verdicts.iter().filter(|v| !v.is_valid).collect()
    }

    pub fn selected_verdict(&self) -> Option<&ValidationVerdict> {
        let selected = self.selected.as_deref()?;
        self.verdicts.iter().find(|v| v.name == selected)
    }

    /// Bind a state received from outside to the loaded rule set of its
    /// planner and recompute the verdicts of its candidates.
    pub fn with_rules(mut self, rules: NamingRuleSet) -> Self {
        self.rules = rules;
        self.revalidate();
        self
    }

    fn revalidate(&mut self) {
        let names: Vec<&str> = self.candidates.iter().map(|c| c.name.as_str()).collect();
        self.verdicts = validate_batch(&names, &self.rules);
    }

    fn fail(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }
}

pub fn apply(state: WizardState, action: UserAction) -> WizardState {
    let mut state = state;
    state.error = None;

    match action {
        UserAction::SetField { key, value } => {
            if let Err(e) = state.planner.field(&key) {
                return state.fail(e.to_string());
            }
            state.fields.insert(key, value);
        }
        UserAction::SetContext { text } => state.context = text,
        UserAction::AddFreeForm { value } => {
            let value = value.trim();
            if !value.is_empty() {
                state.free_form.push(value.to_string());
            }
        }
        UserAction::RemoveFreeForm { index } => {
            if index >= state.free_form.len() {
                return state.fail(format!("no free-form segment at position {index}"));
            }
            state.free_form.remove(index);
        }
        UserAction::ChooseMode { mode } => state.mode = mode,
        UserAction::BuildManual => {
            if let Err(e) = check_required(state.planner, &state.fields) {
                return state.fail(e.to_string());
            }
            let built = build_name(&ordered_values(state.planner, &state.fields), &state.free_form);
            let name = state.rules.normalize(&built);
            state.mode = NameSource::Manual;
            state.candidates = vec![NameCandidate::manual(name.clone())];
            state.fixes.clear();
            state.selected = Some(name);
            state.revalidate();
            state.step = WizardStep::Review;
        }
        UserAction::ReceiveSuggestions { candidates } => {
            if candidates.is_empty() {
                return state.fail("the suggestion source returned no names");
            }
            state.mode = NameSource::Ai;
            state.candidates = candidates
                .into_iter()
                .map(|c| NameCandidate {
                    name: state.rules.normalize(&c.name),
                    reasoning: c.reasoning,
                })
                .collect();
            state.fixes.clear();
            state.selected = None;
            state.revalidate();
            state.step = WizardStep::Review;
        }
        UserAction::ReceiveFixes { fixes } => {
            state.fixes = fixes
                .into_iter()
                .map(|f| FixSuggestion {
                    original: state.rules.normalize(&f.original),
                    suggested_name: state.rules.normalize(&f.suggested_name),
                    explanation: f.explanation,
                })
                .collect();
        }
        UserAction::AcceptFix { original } => {
            let Some(fix) = state.fixes.iter().find(|f| f.original == original).cloned() else {
                return state.fail(format!("no fix suggested for '{original}'"));
            };
            let Some(idx) = state.candidates.iter().position(|c| c.name == original) else {
                return state.fail(format!("'{original}' is not a current candidate"));
            };
            state.candidates[idx] = NameCandidate {
                name: fix.suggested_name.clone(),
                reasoning: Some(fix.explanation),
            };
            state.fixes.retain(|f| f.original != original);
            if state.selected.as_deref() == Some(original.as_str()) {
                state.selected = Some(fix.suggested_name);
            }
            state.revalidate();
        }
        UserAction::Select { name } => {
            if !state.candidates.iter().any(|c| c.name == name) {
                return state.fail(format!("'{name}' is not a current candidate"));
            }
            state.selected = Some(name);
        }
        UserAction::Saved { name } => {
            state.saved.push(name.clone());
            state.selected = Some(name);
            state.step = WizardStep::Done;
        }
        UserAction::Reset => {
            let mut fresh = WizardState::new(state.planner, state.rules);
            fresh.saved = state.saved;
            return fresh;
        }
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CharacterPolicy;

    fn campaign() -> WizardState {
        WizardState::new(
            Planner::Campaign,
            NamingRuleSet::new(CharacterPolicy::Strict, true, true, true),
        )
    }

    fn set(state: WizardState, key: &str, value: &str) -> WizardState {
        apply(
            state,
            UserAction::SetField {
                key: key.into(),
                value: value.into(),
            },
        )
    }

    fn filled_campaign() -> WizardState {
        [
            ("advertiser", "PM"),
            ("plan_number", "1001"),
            ("product", "Saree"),
            ("objective", "sales"),
            ("campaign", "Diwali Festivals"),
            ("month", "Oct"),
            ("year", "2025"),
        ]
        .into_iter()
        .fold(campaign(), |s, (k, v)| set(s, k, v))
    }

    #[test]
    fn manual_build_uppercases_then_validates() {
        let state = apply(filled_campaign(), UserAction::BuildManual);
        assert_eq!(state.error, None);
        assert_eq!(state.step, WizardStep::Review);
        assert_eq!(
            state.candidates[0].name,
            "PM_1001_SAREE_SALES_DIWALIFESTIVALS_OCT_2025"
        );
        assert!(state.verdicts[0].is_valid);
        assert_eq!(
            state.selected_verdict().map(|v| v.is_valid),
            Some(true)
        );
    }

    #[test]
    fn manual_build_without_forced_uppercase_keeps_title_case() {
        let mut state = filled_campaign();
        state.rules.force_uppercase = false;
        let state = apply(state, UserAction::BuildManual);
        assert_eq!(
            state.candidates[0].name,
            "Pm_1001_Saree_Sales_DiwaliFestivals_Oct_2025"
        );
    }

    #[test]
    fn free_form_segments_are_appended() {
        let state = apply(
            filled_campaign(),
            UserAction::AddFreeForm {
                value: " test variant ".into(),
            },
        );
        let state = apply(state, UserAction::AddFreeForm { value: "  ".into() });
        assert_eq!(state.free_form, vec!["test variant"]);
        let state = apply(state, UserAction::BuildManual);
        assert!(state.candidates[0].name.ends_with("_2025_TESTVARIANT"));

        let state = apply(state, UserAction::RemoveFreeForm { index: 3 });
        assert!(state.error.is_some());
        assert_eq!(state.free_form.len(), 1);
    }

    #[test]
    fn missing_fields_block_the_build() {
        let state = set(campaign(), "advertiser", "PM");
        let state = apply(state, UserAction::BuildManual);
        assert_eq!(state.step, WizardStep::Details);
        assert!(state.candidates.is_empty());
        let error = state.error.unwrap();
        assert!(error.contains("Plan Number"));
        assert!(error.contains("Campaign Name"));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let state = set(campaign(), "publisher", "Acme");
        assert!(state.fields.is_empty());
        assert!(state.error.unwrap().contains("publisher"));
    }

    #[test]
    fn suggestions_are_normalized_and_validated() {
        let state = apply(
            campaign(),
            UserAction::ReceiveSuggestions {
                candidates: vec![
                    NameCandidate {
                        name: "pm_1001_saree_sales_launch".into(),
                        reasoning: Some("launch variant".into()),
                    },
                    NameCandidate::manual("PM 1001 PROMO"),
                ],
            },
        );
        assert_eq!(state.mode, NameSource::Ai);
        assert_eq!(state.candidates[0].name, "PM_1001_SAREE_SALES_LAUNCH");
        assert_eq!(state.candidates[0].reasoning.as_deref(), Some("launch variant"));
        assert!(state.verdicts[0].is_valid);
        assert!(!state.verdicts[1].is_valid);
        assert_eq!(state.invalid_verdicts().len(), 1);
    }

    #[test]
    fn empty_suggestions_are_an_error() {
        let state = apply(campaign(), UserAction::ReceiveSuggestions { candidates: vec![] });
        assert_eq!(state.step, WizardStep::Details);
        assert!(state.error.is_some());
    }

    #[test]
    fn accepting_a_fix_replaces_and_revalidates() {
        let state = apply(
            campaign(),
            UserAction::ReceiveSuggestions {
                candidates: vec![NameCandidate::manual("PM 1001 PROMO")],
            },
        );
        let state = apply(
            state,
            UserAction::Select {
                name: "PM 1001 PROMO".into(),
            },
        );
        let state = apply(
            state,
            UserAction::ReceiveFixes {
                fixes: vec![FixSuggestion {
                    original: "PM 1001 PROMO".into(),
                    suggested_name: "pm_1001_promo".into(),
                    explanation: "replaced spaces".into(),
                }],
            },
        );
        assert_eq!(state.fixes[0].suggested_name, "PM_1001_PROMO");

        let state = apply(
            state,
            UserAction::AcceptFix {
                original: "PM 1001 PROMO".into(),
            },
        );
        assert_eq!(state.error, None);
        assert_eq!(state.candidates[0].name, "PM_1001_PROMO");
        assert!(state.verdicts[0].is_valid);
        assert!(state.fixes.is_empty());
        assert_eq!(state.selected.as_deref(), Some("PM_1001_PROMO"));
    }

    #[test]
    fn selecting_an_unknown_name_fails() {
        let state = apply(filled_campaign(), UserAction::BuildManual);
        let state = apply(state, UserAction::Select { name: "OTHER".into() });
        assert!(state.error.is_some());
        assert_eq!(
            state.selected.as_deref(),
            Some("PM_1001_SAREE_SALES_DIWALIFESTIVALS_OCT_2025")
        );
    }

    #[test]
    fn reset_keeps_saved_names_of_the_session() {
        let state = apply(filled_campaign(), UserAction::BuildManual);
        let name = state.candidates[0].name.clone();
        let state = apply(state, UserAction::Saved { name: name.clone() });
        assert_eq!(state.step, WizardStep::Done);

        let state = apply(state, UserAction::Reset);
        assert_eq!(state.step, WizardStep::Details);
        assert!(state.fields.is_empty());
        assert!(state.candidates.is_empty());
        assert_eq!(state.saved, vec![name]);
    }

    #[test]
    fn rebinding_rules_replaces_edited_rules_and_verdicts() {
        let mut json: serde_json::Value = serde_json::to_value(apply(
            campaign(),
            UserAction::ReceiveSuggestions {
                candidates: vec![NameCandidate::manual("PM 1001 PROMO")],
            },
        ))
        .unwrap();
        json["rules"]["noSpacesAllowed"] = false.into();
        json["rules"]["allowedCharacters"]
            .as_array_mut()
            .unwrap()
            .push(" ".into());
        json["verdicts"] = serde_json::json!([
            {"name": "PM 1001 PROMO", "isValid": true, "issues": [], "reasoning": "Valid format"}
        ]);

        let edited: WizardState = serde_json::from_value(json).unwrap();
        assert!(!edited.rules.no_spaces_allowed);
        let state = edited.with_rules(campaign().rules);
        assert!(state.rules.no_spaces_allowed);
        assert!(!state.verdicts[0].is_valid);
        assert_eq!(
            state.verdicts[0].issues,
            vec!["contains spaces", "missing underscore delimiters"]
        );
    }

    #[test]
    fn state_and_actions_round_trip_through_json() {
        let state = apply(filled_campaign(), UserAction::BuildManual);
        let json = serde_json::to_string(&state).unwrap();
        let back: WizardState = serde_json::from_str(&json).unwrap();
        assert!(back.verdicts.is_empty());
        assert_eq!(back.with_rules(state.rules.clone()), state);

        let action: UserAction =
            serde_json::from_str(r#"{"type": "setField", "key": "month", "value": "Nov"}"#).unwrap();
        assert_eq!(
            action,
            UserAction::SetField {
                key: "month".into(),
                value: "Nov".into()
            }
        );
    }
}
