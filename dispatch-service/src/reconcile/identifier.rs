//! Connection-point shape rules.
//!
//! Observation rows carry no type tag: a generation unit is reported as
//! `"<site><voltage> <unit>"` while anything reported under a substation is a
//! single token whose first three characters are the substation's site code.

const SITE_CODE_LEN: usize = 3;

pub fn is_generation_identifier(id: &str) -> bool {
    id.split_whitespace().nth(1).is_some()
}

/// Parent substation code of a single-token identifier, ignoring surrounding
/// whitespace. Identifiers shorter than a site code are returned whole.
pub fn substation_code_of(id: &str) -> &str {
    let id = id.trim();
    match id.char_indices().nth(SITE_CODE_LEN) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}
