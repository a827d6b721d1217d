//! Deterministic name construction from ordered field values.
//!
//! Each surviving segment is title-cased word by word and then has its
//! whitespace removed, so `"Diwali Festivals"` becomes `"DiwaliFestivals"`.
//! Segments are joined with `_`. Nothing here validates the result; run the
//! output through [`crate::validate_batch`] separately.
//!
//! Callers that enforce uppercase names upper-case the built string
//! afterwards (see [`crate::wizard`]); the builder itself always title-cases.

pub const SEPARATOR: char = '_';

/// Build a name from `fields` (in schema order) followed by `free_form`.
///
/// Empty and whitespace-only segments are dropped, so they never introduce
/// a doubled separator.
pub fn build_name<S: AsRef<str>>(fields: &[S], free_form: &[S]) -> String {
    let segments: Vec<String> = fields
        .iter()
        .chain(free_form)
        .map(|s| clean_segment(s.as_ref()))
        .filter(|s| !s.is_empty())
        .collect();
    segments.join(&SEPARATOR.to_string())
}

/// Title-case every whitespace-delimited word and concatenate the words.
pub fn clean_segment(raw: &str) -> String {
    raw.split_whitespace().map(title_case_word).collect()
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
