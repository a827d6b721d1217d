//! Per-planner field schemas and required-input checks.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::{Error, Planner, Result};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub required: bool,
    pub numeric: bool,
}

const fn field(key: &'static str, label: &'static str, required: bool) -> FieldSpec {
    FieldSpec {
        key,
        label,
        required,
        numeric: false,
    }
}

const PLAN_NUMBER: FieldSpec = FieldSpec {
    key: "plan_number",
    label: "Plan Number",
    required: true,
    numeric: true,
};

const CAMPAIGN_FIELDS: &[FieldSpec] = &[
    field("advertiser", "Advertiser", true),
    PLAN_NUMBER,
    field("product", "Product", true),
    field("objective", "Objective", true),
    field("campaign", "Campaign Name", true),
    field("month", "Month", false),
    field("year", "Year", false),
];

const PLACEMENT_FIELDS: &[FieldSpec] = &[
    field("advertiser", "Advertiser", true),
    PLAN_NUMBER,
    field("strategy_tactic", "Strategy Tactic", false),
    field("publisher", "Publisher / Media Agency Name", false),
    field("site", "Site", false),
    field("media_type", "Media Type", false),
    field("targeting", "Targeting Audience", false),
    field("size_format", "Size / Format / Duration", false),
];

const CREATIVE_FIELDS: &[FieldSpec] = &[
    field("advertiser", "Advertiser", true),
    PLAN_NUMBER,
    field("media_type", "Media Type", false),
    field("size_format", "Size / Format / Duration", false),
    field("creative_message", "Creative Message / Free Text", false),
];

impl Planner {
    /// Fields in the order their values appear in a built name.
    pub fn fields(&self) -> &'static [FieldSpec] {
        match self {
            Planner::Campaign => CAMPAIGN_FIELDS,
            Planner::Placement => PLACEMENT_FIELDS,
            Planner::Creative => CREATIVE_FIELDS,
        }
    }

    pub fn field(&self, key: &str) -> Result<&'static FieldSpec> {
        self.fields()
            .iter()
            .find(|f| f.key == key)
            .ok_or_else(|| Error::UnknownField {
                planner: *self,
                field: key.to_string(),
            })
    }
}

/// Check that required fields are filled and numeric fields are digits.
///
/// All missing fields are reported together, labelled, in schema order.
pub fn check_required(planner: Planner, values: &BTreeMap<String, String>) -> Result<()> {
    let missing: Vec<String> = planner
        .fields()
        .iter()
        .filter(|f| f.required && trimmed(values, f.key).is_empty())
        .map(|f| f.label.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(Error::MissingFields(missing));
    }

    for spec in planner.fields().iter().filter(|f| f.numeric) {
        let value = trimmed(values, spec.key);
        if !value.is_empty() && !value.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::NotNumeric(spec.label.to_string()));
        }
    }
    Ok(())
}

fn trimmed<'a>(values: &'a BTreeMap<String, String>, key: &str) -> &'a str {
    values.get(key).map(|v| v.trim()).unwrap_or("")
}

/// Raw values in schema order; absent keys become empty strings.
pub fn ordered_values(planner: Planner, values: &BTreeMap<String, String>) -> Vec<String> {
    planner
        .fields()
        .iter()
        .map(|f| values.get(f.key).cloned().unwrap_or_default())
        .collect()
}
