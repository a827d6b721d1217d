//! Rule-based name checks.
//!
//! Every check runs on every name; a verdict lists all violations found,
//! in check order. The validator never rewrites the name it is given.

use std::fmt;

use crate::{NamingRuleSet, ValidationVerdict};

pub const VALID_REASONING: &str = "Valid format";

/// One rule violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Issue {
    ContainsSpaces,
    NotUppercase,
    MissingUnderscores,
    ConsecutiveUnderscores,
    InvalidCharacter(char),
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::ContainsSpaces => f.write_str("contains spaces"),
            Issue::NotUppercase => f.write_str("must be uppercase"),
            Issue::MissingUnderscores => f.write_str("missing underscore delimiters"),
            Issue::ConsecutiveUnderscores => f.write_str("multiple consecutive underscores found"),
            Issue::InvalidCharacter(ch) => write!(f, "invalid character found: '{ch}'"),
        }
    }
}

/// Collect every issue for `name`, in check order.
///
/// When `no_spaces_allowed` is set, a space is reported once as
/// [`Issue::ContainsSpaces`] and is not also reported per occurrence as an
/// invalid character.
pub fn find_issues(name: &str, rules: &NamingRuleSet) -> Vec<Issue> {
    let mut issues = Vec::new();

    if rules.no_spaces_allowed && name.contains(' ') {
        issues.push(Issue::ContainsSpaces);
    }
    // A name without letters is trivially uppercase.
    if rules.force_uppercase && name.chars().any(char::is_lowercase) {
        issues.push(Issue::NotUppercase);
    }
    if rules.use_underscores_required && !name.contains('_') {
        issues.push(Issue::MissingUnderscores);
    }
    if name.contains("__") {
        issues.push(Issue::ConsecutiveUnderscores);
    }
    issues.extend(
        name.chars()
            .filter(|&ch| !(ch == ' ' && rules.no_spaces_allowed))
            .filter(|&ch| !rules.allows(ch))
            .map(Issue::InvalidCharacter),
    );

    issues
}

pub fn validate_name(name: &str, rules: &NamingRuleSet) -> ValidationVerdict {
    let issues = find_issues(name, rules)
        .into_iter()
        .map(|issue| issue.to_string())
        .collect();
    ValidationVerdict::from_issues(name, issues)
}

/// One verdict per input name, in input order.
pub fn validate_batch<S: AsRef<str>>(names: &[S], rules: &NamingRuleSet) -> Vec<ValidationVerdict> {
    names
        .iter()
        .map(|name| validate_name(name.as_ref(), rules))
        .collect()
}
