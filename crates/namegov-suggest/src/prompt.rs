use std::collections::BTreeMap;

use namegov_core::rules::GUIDELINES;
use namegov_core::{NamingRuleSet, ValidationVerdict};

pub fn system_prompt() -> String {
    format!(
        "You are a marketing naming governance assistant. You propose and correct campaign, \
placement and creative names so that they follow the naming rules exactly.\n\n\
## Naming Conventions\n{GUIDELINES}\n\n\
Reply with ONLY valid JSON: no Markdown, no code fences, no explanation text."
    )
}

/// `key: value` lines, one per non-empty detail.
fn details_block(details: &BTreeMap<String, String>) -> String {
    details
        .iter()
        .filter(|(_, v)| !v.trim().is_empty())
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn context_or_none(context: &str) -> &str {
    if context.trim().is_empty() {
        "(none)"
    } else {
        context
    }
}

pub fn campaign_suggestions(
    rules: &NamingRuleSet,
    details: &BTreeMap<String, String>,
    context: &str,
) -> String {
    format!(
        "Generate 3 to 5 campaign name suggestions from the campaign details and naming rules \
below. Every name MUST follow the field order and rules, but you may vary the campaign \
descriptor (e.g. FESTIVAL, LAUNCH, PROMO, OFFER, COLLECTION).\n\n\
**Rules:**\n{rules}\n\n\
**Details:**\n{details}\n\n\
**Context:**\n{context}\n\n\
Respond in this format:\n\
{{\"suggestions\": [{{\"name\": \"PM_1001_SAREE_SALES_DIWALIFESTIVALS_OCT_2025\", \
\"reasoning\": \"Follows all fields with the FESTIVALS descriptor.\"}}]}}",
        rules = rules.describe(),
        details = details_block(details),
        context = context_or_none(context),
    )
}

pub fn placement_suggestions(
    rules: &NamingRuleSet,
    details: &BTreeMap<String, String>,
    context: &str,
) -> String {
    format!(
        "Generate 3 placement / media buy name suggestions that follow these rules.\n\n\
**Rules:**\n{rules}\n\n\
**Details:**\n{details}\n\n\
**Context:**\n{context}\n\n\
Respond in this format:\n\
{{\"placement_names\": [{{\"name\": \"...\", \"reasoning\": \"...\"}}]}}",
        rules = rules.describe(),
        details = details_block(details),
        context = context_or_none(context),
    )
}

pub fn creative_suggestions(rules: &NamingRuleSet, context: &str, placements: &[String]) -> String {
    let placements = if placements.is_empty() {
        "(none)".to_string()
    } else {
        placements.join("\n")
    };
    format!(
        "For each placement below, generate 2 to 3 creative name suggestions. Include campaign \
or product context where relevant and keep names short, descriptive and consistent.\n\n\
**Rules:**\n{rules}\n\n\
**Context:**\n{context}\n\n\
**Placements:**\n{placements}\n\n\
Respond in this format:\n\
{{\"creative_names\": {{\"<placement name>\": [{{\"name\": \"...\", \"reasoning\": \"...\"}}]}}}}",
        rules = rules.describe(),
        context = context_or_none(context),
    )
}

/// Correction prompt listing each invalid name with its issues.
pub fn fix_recommendations(rules: &NamingRuleSet, invalid: &[&ValidationVerdict]) -> String {
    let invalid_list = invalid
        .iter()
        .map(|v| format!("{}: {}", v.name, v.issues.join(", ")))
        .collect::<Vec<_>>()
        .join("\n");
    let case_note = if rules.force_uppercase {
        "All suggested names must be UPPERCASE.\n\n"
    } else {
        ""
    };
    format!(
        "For each invalid name below, suggest one corrected version that follows all naming \
rules. {case_note}\
**Rules:**\n{rules}\n\n\
**Invalid Names and Issues:**\n{invalid_list}\n\n\
Respond in this format:\n\
{{\"fixes\": [{{\"original\": \"PM_1001_SAREE_AWAR_DIWALIFESTIVALS\", \
\"suggested_name\": \"PM_1001_SAREE_AWAR_DIWALIFESTIVALS_OCT_2025\", \
\"explanation\": \"Added missing month and year.\"}}]}}",
        rules = rules.describe(),
    )
}
