use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use namegov_core::inputs::{check_required, ordered_values, FieldSpec};
use namegov_core::store::{find_similar_names, FileStore, NameStore};
use namegov_core::wizard::{self, UserAction, WizardState};
use namegov_core::{
    build_name, validate_batch, validate_name, NameRecord, NameSource, NamingRuleSet, Planner,
    RuleBook, ValidationStatus, ValidationVerdict,
};
use namegov_suggest::{Advisor, LlmClient, PipelineInput, PipelineOutcome, SuggestRequest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// --- Request types ---

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct PlannerRequest {
    /// Planner: "campaign", "placement" or "creative"
    planner: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct BuildNameRequest {
    /// Planner: "campaign", "placement" or "creative"
    planner: String,
    /// Field values keyed by field key (see list_planners), e.g. {"advertiser": "PM", "plan_number": "1001"}
    fields: BTreeMap<String, String>,
    /// Optional extra segments appended after the planner's fields
    free_form: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct ValidateNamesRequest {
    /// Planner whose rule set to apply
    planner: String,
    /// Names to validate, in order
    names: Vec<String>,
    /// Upper-case each name before validating when the rule set forces uppercase. Default: false.
    normalize: Option<bool>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct SuggestNamesRequest {
    /// Planner: "campaign", "placement" or "creative"
    planner: String,
    /// Free-text description of what the names are for
    context: Option<String>,
    /// Known field values keyed by field key
    details: Option<BTreeMap<String, String>>,
    /// Placement names to generate creative names for (creative planner only)
    placements: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct RecommendFixesRequest {
    /// Planner whose rule set to apply
    planner: String,
    /// Names to validate; invalid ones receive a suggested correction
    names: Vec<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct SaveNameRequest {
    /// Planner the name belongs to
    planner: String,
    /// The finalized name
    name: String,
    /// Field values the name was built from
    fields: Option<BTreeMap<String, String>>,
    /// Free-form segments the name was built from
    free_form: Option<Vec<String>>,
    /// "manual" or "ai". Default: manual.
    source: Option<NameSource>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct ListNamesRequest {
    /// Restrict to one planner. Omit for all planners.
    planner: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct WizardApplyRequest {
    /// Current wizard state as returned by wizard_start or wizard_apply
    state: String,
    /// Action as JSON, e.g. {"type": "setField", "key": "advertiser", "value": "PM"}. Types: setField, setContext, addFreeForm, removeFreeForm, chooseMode, buildManual, receiveSuggestions, receiveFixes, acceptFix, select, saved, reset.
    action: String,
}

// --- Responses ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlannerInfo {
    planner: Planner,
    fields: &'static [FieldSpec],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BuiltName {
    /// Builder output before caller-side normalization.
    built: String,
    name: String,
    verdict: ValidationVerdict,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SavedName {
    name: String,
    verdict: ValidationVerdict,
}

// --- Server ---

#[derive(Clone)]
pub struct NamegovServer {
    tool_router: ToolRouter<Self>,
    rules: Arc<RuleBook>,
    store: Arc<dyn NameStore>,
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    match serde_json::to_string_pretty(value) {
        Ok(json) => Ok(CallToolResult::success(vec![Content::text(json)])),
        Err(e) => Ok(CallToolResult::error(vec![Content::text(format!(
            "Serialization error: {}",
            e
        ))])),
    }
}

fn to_result<T: Serialize>(outcome: Result<T, String>) -> Result<CallToolResult, McpError> {
    match outcome {
        Ok(value) => json_result(&value),
        Err(e) => Ok(CallToolResult::error(vec![Content::text(e)])),
    }
}

impl NamegovServer {
    fn rules_for(&self, planner: &str) -> Result<(Planner, NamingRuleSet), String> {
        let planner: Planner = planner.parse().map_err(|e| format!("{e}"))?;
        let rules = self.rules.get(planner).map_err(|e| e.to_string())?;
        Ok((planner, rules.clone()))
    }

    fn advisor() -> Result<Advisor<LlmClient>, String> {
        let settings = namegov_core::read_settings();
        LlmClient::new(settings)
            .map(Advisor::new)
            .map_err(|e| format!("{e}. Configure provider, apiKey and model in settings.json."))
    }

    fn build(&self, req: BuildNameRequest) -> Result<BuiltName, String> {
        let (planner, rules) = self.rules_for(&req.planner)?;
        for key in req.fields.keys() {
            planner.field(key).map_err(|e| e.to_string())?;
        }
        check_required(planner, &req.fields).map_err(|e| e.to_string())?;

        let free_form = req.free_form.unwrap_or_default();
        let built = build_name(&ordered_values(planner, &req.fields), &free_form);
        let name = rules.normalize(&built);
        let verdict = validate_name(&name, &rules);
        Ok(BuiltName {
            built,
            name,
            verdict,
        })
    }

    fn validate(&self, req: ValidateNamesRequest) -> Result<Vec<ValidationVerdict>, String> {
        let (_, rules) = self.rules_for(&req.planner)?;
        let names: Vec<String> = if req.normalize.unwrap_or(false) {
            req.names.iter().map(|n| rules.normalize(n)).collect()
        } else {
            req.names
        };
        Ok(validate_batch(&names, &rules))
    }

    fn save(&self, req: SaveNameRequest) -> Result<SavedName, String> {
        let (planner, rules) = self.rules_for(&req.planner)?;
        let existing = self.store.list_names(None).map_err(|e| e.to_string())?;
        let similar = find_similar_names(&req.name, &existing);
        if !similar.is_empty() {
            return Err(format!(
                "Similar names already exist: {}",
                similar.join(", ")
            ));
        }

        let verdict = validate_name(&req.name, &rules);
        let record = NameRecord {
            planner,
            name: req.name.clone(),
            fields: req.fields.unwrap_or_default(),
            free_form: req.free_form.unwrap_or_default(),
            source: req.source.unwrap_or_default(),
            validation_status: ValidationStatus::from(&verdict),
        };
        self.store.insert_unique(record).map_err(|e| e.to_string())?;
        Ok(SavedName {
            name: req.name,
            verdict,
        })
    }

    fn list(&self, req: ListNamesRequest) -> Result<Vec<String>, String> {
        let planner = match req.planner.as_deref() {
            Some(key) => Some(key.parse::<Planner>().map_err(|e| e.to_string())?),
            None => None,
        };
        self.store.list_names(planner).map_err(|e| e.to_string())
    }

    fn wizard_start_state(&self, req: PlannerRequest) -> Result<WizardState, String> {
        let (planner, rules) = self.rules_for(&req.planner)?;
        Ok(WizardState::new(planner, rules))
    }

    fn wizard_step(&self, req: WizardApplyRequest) -> Result<WizardState, String> {
        let state: WizardState =
            serde_json::from_str(&req.state).map_err(|e| format!("Invalid state JSON: {e}"))?;
        let action: UserAction =
            serde_json::from_str(&req.action).map_err(|e| format!("Invalid action JSON: {e}"))?;
        // Client-held state only carries the planner; its rules come from the rule book.
        let rules = self.rules.get(state.planner).map_err(|e| e.to_string())?;
        Ok(wizard::apply(state.with_rules(rules.clone()), action))
    }
}

#[tool_router]
impl NamegovServer {
    pub fn new(rules: RuleBook, store: Arc<dyn NameStore>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            rules: Arc::new(rules),
            store,
        }
    }

    #[tool(description = "List the planners (campaign, placement, creative) with their ordered field schema. Field keys are used by build_name, suggest_names and the wizard.")]
    fn list_planners(&self) -> Result<CallToolResult, McpError> {
        let planners: Vec<PlannerInfo> = self
            .rules
            .planners()
            .map(|planner| PlannerInfo {
                planner,
                fields: planner.fields(),
            })
            .collect();
        json_result(&planners)
    }

    #[tool(description = "Get the validation rule set of a planner: forceUppercase, useUnderscoresRequired, noSpacesAllowed and allowedCharacters")]
    fn get_rules(
        &self,
        Parameters(req): Parameters<PlannerRequest>,
    ) -> Result<CallToolResult, McpError> {
        to_result(self.rules_for(&req.planner).map(|(_, rules)| rules))
    }

    #[tool(description = "Build a name from field values. Required fields are checked first. Each value is title-cased with whitespace removed, empty values are dropped, segments are joined with '_'. Returns {built, name, verdict} where name is upper-cased when the rule set forces uppercase.")]
    fn build_name(
        &self,
        Parameters(req): Parameters<BuildNameRequest>,
    ) -> Result<CallToolResult, McpError> {
        to_result(self.build(req))
    }

    #[tool(description = "Validate names against a planner's rule set. Returns one verdict {name, isValid, issues, reasoning} per name, in input order. Every violated rule is listed.")]
    fn validate_names(
        &self,
        Parameters(req): Parameters<ValidateNamesRequest>,
    ) -> Result<CallToolResult, McpError> {
        to_result(self.validate(req))
    }

    #[tool(description = "Generate name suggestions with the configured AI provider, validate them, and recommend fixes for invalid ones. Returns {source, candidates, verdicts, fixes, fixVerdicts}.")]
    async fn suggest_names(
        &self,
        Parameters(req): Parameters<SuggestNamesRequest>,
    ) -> Result<CallToolResult, McpError> {
        let (planner, rules) = match self.rules_for(&req.planner) {
            Ok(found) => found,
            Err(e) => return Ok(CallToolResult::error(vec![Content::text(e)])),
        };
        let advisor = match Self::advisor() {
            Ok(a) => a,
            Err(e) => return Ok(CallToolResult::error(vec![Content::text(e)])),
        };
        let request = SuggestRequest {
            context: req.context.unwrap_or_default(),
            details: req.details.unwrap_or_default(),
            placements: req.placements.unwrap_or_default(),
        };
        let outcome: Result<PipelineOutcome, String> = advisor
            .run(planner, &rules, PipelineInput::Ai(request))
            .await
            .map_err(|e| format!("Suggestion failed: {e}"));
        to_result(outcome)
    }

    #[tool(description = "Validate names and ask the configured AI provider for a corrected name for each invalid one. Suggested names are re-validated. Returns {source, candidates, verdicts, fixes, fixVerdicts}.")]
    async fn recommend_fixes(
        &self,
        Parameters(req): Parameters<RecommendFixesRequest>,
    ) -> Result<CallToolResult, McpError> {
        let (planner, rules) = match self.rules_for(&req.planner) {
            Ok(found) => found,
            Err(e) => return Ok(CallToolResult::error(vec![Content::text(e)])),
        };
        let names: Vec<String> = req.names.iter().map(|n| rules.normalize(n)).collect();
        if validate_batch(&names, &rules).iter().all(|v| v.is_valid) {
            // Nothing to fix, so no provider is needed.
            let advisor = Advisor::new(NoopClient);
            return to_result(
                advisor
                    .run(planner, &rules, PipelineInput::Manual(names))
                    .await
                    .map_err(|e| e.to_string()),
            );
        }
        let advisor = match Self::advisor() {
            Ok(a) => a,
            Err(e) => return Ok(CallToolResult::error(vec![Content::text(e)])),
        };
        let outcome: Result<PipelineOutcome, String> = advisor
            .run(planner, &rules, PipelineInput::Manual(names))
            .await
            .map_err(|e| format!("Fix recommendation failed: {e}"));
        to_result(outcome)
    }

    #[tool(description = "Save a finalized name. Rejected when the same name (ignoring case) already exists. The name's validation status is recorded with it.")]
    fn save_name(
        &self,
        Parameters(req): Parameters<SaveNameRequest>,
    ) -> Result<CallToolResult, McpError> {
        to_result(self.save(req))
    }

    #[tool(description = "List saved names, optionally for one planner")]
    fn list_names(
        &self,
        Parameters(req): Parameters<ListNamesRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.list(req) {
            Ok(names) if names.is_empty() => Ok(CallToolResult::success(vec![Content::text(
                "No names saved yet. Use save_name to add one.",
            )])),
            Ok(names) => Ok(CallToolResult::success(vec![Content::text(names.join("\n"))])),
            Err(e) => Ok(CallToolResult::error(vec![Content::text(e)])),
        }
    }

    #[tool(description = "Start a naming wizard session for a planner. Returns the wizard state as JSON; pass it to wizard_apply with each action.")]
    fn wizard_start(
        &self,
        Parameters(req): Parameters<PlannerRequest>,
    ) -> Result<CallToolResult, McpError> {
        to_result(self.wizard_start_state(req))
    }

    #[tool(description = "Apply one action to a wizard state and return the next state. Invalid actions leave the state unchanged and set its error field. Feed results of suggest_names / recommend_fixes back in with receiveSuggestions / receiveFixes.")]
    fn wizard_apply(
        &self,
        Parameters(req): Parameters<WizardApplyRequest>,
    ) -> Result<CallToolResult, McpError> {
        to_result(self.wizard_step(req))
    }
}

/// Client for pipeline runs that never reach the collaborator.
struct NoopClient;

#[async_trait::async_trait]
impl namegov_suggest::TextGenerationClient for NoopClient {
    async fn complete(&self, _prompt: &str) -> namegov_suggest::Result<String> {
        Err(namegov_suggest::SuggestError::NotConfigured)
    }
}

const INSTRUCTIONS: &str = r#"Namegov governs marketing names for three planners: campaign, placement and creative.

## Workflow
1. `list_planners` to see each planner's ordered fields, and `get_rules` for its rule set.
2. Build a name from field values with `build_name`, or ask for AI suggestions with `suggest_names`.
3. Check any name with `validate_names`. Verdicts list every violated rule; fix all of them.
4. For invalid names, `recommend_fixes` asks for corrected versions and re-validates them.
5. `save_name` stores the final name. Duplicates (ignoring case) are rejected.

For multi-step sessions, `wizard_start` returns a state object and `wizard_apply` advances it one action at a time."#;

#[tool_handler]
impl ServerHandler for NamegovServer {
    fn get_info(&self) -> ServerInfo {
        let instructions = format!(
            "{}\n\n## Naming Conventions\n{}",
            INSTRUCTIONS,
            namegov_core::rules::GUIDELINES
        );
        ServerInfo {
            instructions: Some(instructions.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

/// Log to stderr; stdout carries the MCP transport.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let rules = RuleBook::load()?;
    let store = FileStore::default_location();
    tracing::info!(store = %store.path().display(), "starting namegov MCP server");

    let service = NamegovServer::new(rules, Arc::new(store))
        .serve(rmcp::transport::io::stdio())
        .await
        .inspect_err(|e| tracing::error!(error = %e, "MCP server error"))?;
    service.waiting().await?;
    Ok(())
}
