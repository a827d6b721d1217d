pub mod engine;
mod error;
pub mod parse;
mod prompt;

pub use engine::{LlmClient, TextGenerationClient};
pub use error::{Result, SuggestError};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use namegov_core::{
    validate_batch, FixSuggestion, NameCandidate, NameSource, NamingRuleSet, Planner,
    ValidationVerdict,
};

/// Input for a suggestion request. Which parts are used depends on the planner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestRequest {
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub details: BTreeMap<String, String>,
    /// Placement names to generate creatives for (creative planner only).
    #[serde(default)]
    pub placements: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum PipelineInput {
    /// Names already built or typed by the user; skips generation.
    Manual(Vec<String>),
    Ai(SuggestRequest),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutcome {
    pub source: NameSource,
    pub candidates: Vec<NameCandidate>,
    pub verdicts: Vec<ValidationVerdict>,
    pub fixes: Vec<FixSuggestion>,
    /// Verdicts for each fix's `suggested_name`, in fix order.
    pub fix_verdicts: Vec<ValidationVerdict>,
}

/// Generation, validation and fix recommendation over one text-generation client.
pub struct Advisor<C> {
    client: C,
}

impl<C: TextGenerationClient> Advisor<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Ask for name suggestions. Names are upper-cased when the rules force it.
    /// Creative suggestions come back flattened in placement order.
    ///
    /// An empty suggestion list is an error for every planner.
    pub async fn suggest(
        &self,
        planner: Planner,
        rules: &NamingRuleSet,
        request: &SuggestRequest,
    ) -> Result<Vec<NameCandidate>> {
        let (prompt, list_key) = match planner {
            Planner::Campaign => (
                prompt::campaign_suggestions(rules, &request.details, &request.context),
                "suggestions",
            ),
            Planner::Placement => (
                prompt::placement_suggestions(rules, &request.details, &request.context),
                "placement_names",
            ),
            Planner::Creative => {
                let grouped = self
                    .suggest_creatives(rules, &request.context, &request.placements)
                    .await?;
                return Ok(grouped.into_values().flatten().collect());
            }
        };

        tracing::info!(%planner, "requesting name suggestions");
        let raw = self.client.complete(&prompt).await?;
        tracing::debug!(%planner, raw = %raw, "raw suggestion output");

        let candidates = parse::parse_suggestions(&raw, list_key)?;
        if candidates.is_empty() {
            return Err(SuggestError::NoSuggestions(planner));
        }
        tracing::info!(%planner, count = candidates.len(), "parsed suggestions");

        Ok(candidates
            .into_iter()
            .map(|c| NameCandidate {
                name: rules.normalize(&c.name),
                reasoning: c.reasoning,
            })
            .collect())
    }

    /// Creative suggestions grouped by placement. Placements that received
    /// no names are dropped; no names at all is [`SuggestError::NoSuggestions`].
    pub async fn suggest_creatives(
        &self,
        rules: &NamingRuleSet,
        context: &str,
        placements: &[String],
    ) -> Result<BTreeMap<String, Vec<NameCandidate>>> {
        tracing::info!(placements = placements.len(), "requesting creative suggestions");
        let prompt = prompt::creative_suggestions(rules, context, placements);
        let raw = self.client.complete(&prompt).await?;
        tracing::debug!(raw = %raw, "raw creative output");

        let mut grouped = parse::parse_creative_suggestions(&raw)?;
        grouped.retain(|_, names| !names.is_empty());
        if grouped.is_empty() {
            return Err(SuggestError::NoSuggestions(Planner::Creative));
        }
        for names in grouped.values_mut() {
            for c in names.iter_mut() {
                c.name = rules.normalize(&c.name);
            }
        }
        tracing::info!(groups = grouped.len(), "parsed creative suggestions");
        Ok(grouped)
    }

    /// Ask for corrections of the invalid verdicts. No request is made when
    /// every verdict is valid.
    pub async fn recommend_fixes(
        &self,
        rules: &NamingRuleSet,
        verdicts: &[ValidationVerdict],
    ) -> Result<Vec<FixSuggestion>> {
        let invalid: Vec<&ValidationVerdict> = verdicts.iter().filter(|v| !v.is_valid).collect();
        if invalid.is_empty() {
            return Ok(vec![]);
        }

        tracing::info!(count = invalid.len(), "requesting fixes");
        let prompt = prompt::fix_recommendations(rules, &invalid);
        let raw = self.client.complete(&prompt).await?;
        tracing::debug!(raw = %raw, "raw fix output");

        let fixes = parse::parse_fixes(&raw, &invalid)?;
        if fixes.len() < invalid.len() {
            tracing::warn!(
                expected = invalid.len(),
                received = fixes.len(),
                "fewer fixes than invalid names"
            );
        }

        Ok(fixes
            .into_iter()
            .map(|f| FixSuggestion {
                original: rules.normalize(&f.original),
                suggested_name: rules.normalize(&f.suggested_name),
                explanation: f.explanation,
            })
            .collect())
    }

    /// Manual: validate → fix. AI: generate → validate → fix.
    pub async fn run(
        &self,
        planner: Planner,
        rules: &NamingRuleSet,
        input: PipelineInput,
    ) -> Result<PipelineOutcome> {
        let (source, candidates) = match input {
            PipelineInput::Manual(names) => (
                NameSource::Manual,
                names
                    .iter()
                    .map(|n| NameCandidate::manual(rules.normalize(n)))
                    .collect::<Vec<_>>(),
            ),
            PipelineInput::Ai(request) => {
                (NameSource::Ai, self.suggest(planner, rules, &request).await?)
            }
        };

        let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
        let verdicts = validate_batch(&names, rules);
        let fixes = self.recommend_fixes(rules, &verdicts).await?;
        let suggested: Vec<&str> = fixes.iter().map(|f| f.suggested_name.as_str()).collect();
        let fix_verdicts = validate_batch(&suggested, rules);

        Ok(PipelineOutcome {
            source,
            candidates,
            verdicts,
            fixes,
            fix_verdicts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use namegov_core::CharacterPolicy;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned replies and records every prompt it was sent.
    struct ScriptedClient {
        replies: Mutex<VecDeque<String>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
                prompts: Mutex::new(vec![]),
            }
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TextGenerationClient for ScriptedClient {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or(SuggestError::EmptyResponse)
        }
    }

    fn rules() -> NamingRuleSet {
        NamingRuleSet::new(CharacterPolicy::Strict, true, true, true)
    }

    #[tokio::test]
    async fn manual_valid_name_skips_fix_request() {
        let advisor = Advisor::new(ScriptedClient::new(&[]));
        let outcome = advisor
            .run(
                Planner::Campaign,
                &rules(),
                PipelineInput::Manual(vec!["Pm_1001_Saree_Sales".into()]),
            )
            .await
            .unwrap();
        assert_eq!(outcome.source, NameSource::Manual);
        assert_eq!(outcome.candidates[0].name, "PM_1001_SAREE_SALES");
        assert!(outcome.verdicts[0].is_valid);
        assert!(outcome.fixes.is_empty());
        assert!(advisor.client.prompts().is_empty());
    }

    #[tokio::test]
    async fn manual_invalid_name_gets_revalidated_fix() {
        let client = ScriptedClient::new(&[r#"{"fixes": [{"original": "PM 1001 SAREE",
            "suggested_name": "pm_1001_saree", "explanation": "underscores"}]}"#]);
        let advisor = Advisor::new(client);
        let outcome = advisor
            .run(
                Planner::Campaign,
                &rules(),
                PipelineInput::Manual(vec!["PM 1001 SAREE".into()]),
            )
            .await
            .unwrap();
        assert_eq!(outcome.verdicts[0].issues, vec!["contains spaces", "missing underscore delimiters"]);
        assert_eq!(outcome.fixes[0].suggested_name, "PM_1001_SAREE");
        assert!(outcome.fix_verdicts[0].is_valid);

        let prompts = advisor.client.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("PM 1001 SAREE: contains spaces, missing underscore delimiters"));
    }

    #[tokio::test]
    async fn ai_flow_generates_validates_and_fixes() {
        let client = ScriptedClient::new(&[
            r#"{"suggestions": [
                {"name": "pm_1001_saree_sales_promo_oct_2025", "reasoning": "promo"},
                {"name": "PM_1001__SAREE", "reasoning": "typo"}
            ]}"#,
            r#"{"fixes": [{"original": "PM_1001__SAREE", "suggested_name": "PM_1001_SAREE",
                "explanation": "collapsed underscores"}]}"#,
        ]);
        let advisor = Advisor::new(client);
        let request = SuggestRequest {
            context: "Diwali sale".into(),
            details: [("advertiser".to_string(), "PM".to_string())].into(),
            placements: vec![],
        };
        let outcome = advisor
            .run(Planner::Campaign, &rules(), PipelineInput::Ai(request))
            .await
            .unwrap();

        assert_eq!(outcome.source, NameSource::Ai);
        assert_eq!(outcome.candidates[0].name, "PM_1001_SAREE_SALES_PROMO_OCT_2025");
        assert!(outcome.verdicts[0].is_valid);
        assert!(!outcome.verdicts[1].is_valid);
        assert_eq!(outcome.fixes.len(), 1);
        assert!(outcome.fix_verdicts[0].is_valid);

        let prompts = advisor.client.prompts();
        assert!(prompts[0].contains("advertiser: PM"));
        assert!(prompts[0].contains("Diwali sale"));
        assert!(prompts[1].contains("PM_1001__SAREE: multiple consecutive underscores found"));
    }

    #[tokio::test]
    async fn empty_suggestions_fail_for_every_planner() {
        for planner in Planner::ALL {
            let reply = match planner {
                Planner::Campaign => r#"{"suggestions": []}"#,
                Planner::Placement => r#"{"placement_names": []}"#,
                Planner::Creative => r#"{"creative_names": {}}"#,
            };
            let advisor = Advisor::new(ScriptedClient::new(&[reply]));
            let err = advisor
                .suggest(planner, &rules(), &SuggestRequest::default())
                .await
                .unwrap_err();
            assert!(matches!(err, SuggestError::NoSuggestions(p) if p == planner));
        }
    }

    #[tokio::test]
    async fn non_json_reply_surfaces_as_error() {
        let advisor = Advisor::new(ScriptedClient::new(&["Here are some names: PM_A, PM_B"]));
        let err = advisor
            .run(
                Planner::Placement,
                &rules(),
                PipelineInput::Ai(SuggestRequest::default()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SuggestError::NoJson));
    }

    #[tokio::test]
    async fn creative_suggestions_are_grouped_and_flattened() {
        let reply = r#"{"creative_names": {
            "PM_1001_CONS_YTB": [{"name": "pm_1001_vod_15sec"}],
            "PM_1001_CONV_META": [{"name": "PM_1001_SOC_OFFER"}, {"name": "PM_1001_SOC_SALE"}]
        }}"#;
        let placements = vec!["PM_1001_CONS_YTB".to_string(), "PM_1001_CONV_META".to_string()];

        let advisor = Advisor::new(ScriptedClient::new(&[reply, reply]));
        let grouped = advisor
            .suggest_creatives(&rules(), "festive", &placements)
            .await
            .unwrap();
        assert_eq!(grouped["PM_1001_CONS_YTB"][0].name, "PM_1001_VOD_15SEC");

        let flat = advisor
            .suggest(
                Planner::Creative,
                &rules(),
                &SuggestRequest {
                    placements,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(flat.len(), 3);
        assert!(advisor.client.prompts()[1].contains("PM_1001_CONS_YTB\nPM_1001_CONV_META"));
    }

    #[tokio::test]
    async fn creative_groups_without_names_are_dropped() {
        let placements = vec!["PM_1001_CONS_YTB".to_string()];
        let advisor = Advisor::new(ScriptedClient::new(&[
            r#"{"creative_names": {"PM_1001_CONS_YTB": [{"name": "PM_A"}], "PM_1001_CONV_META": []}}"#,
            r#"{"creative_names": {"PM_1001_CONS_YTB": [], "PM_1001_CONV_META": []}}"#,
        ]));
        let grouped = advisor
            .suggest_creatives(&rules(), "", &placements)
            .await
            .unwrap();
        assert_eq!(grouped.keys().collect::<Vec<_>>(), vec!["PM_1001_CONS_YTB"]);

        let err = advisor
            .suggest_creatives(&rules(), "", &placements)
            .await
            .unwrap_err();
        assert!(matches!(err, SuggestError::NoSuggestions(Planner::Creative)));
    }

    #[tokio::test]
    async fn all_valid_verdicts_need_no_fixes() {
        let advisor = Advisor::new(ScriptedClient::new(&[]));
        let verdicts = validate_batch(&["PM_A", "PM_B"], &rules());
        assert!(advisor.recommend_fixes(&rules(), &verdicts).await.unwrap().is_empty());
        assert!(advisor.recommend_fixes(&rules(), &[]).await.unwrap().is_empty());
    }
}
