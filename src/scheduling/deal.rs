//! Resolves which deal the meeting belongs to.
//!
//! Three sources, tried in order: an explicitly typed numeric id, a deal id
//! pulled out of a pasted card URL, and the placement context the CRM frame
//! forwards when the form is embedded in a deal view. User-pasted input is
//! forgiving by design: anything unparseable just falls through to the next
//! source, and "no deal" is a valid answer.

use regex::Regex;
use serde_json::{Map, Value};

pub type DealId = u64;

/// Key aliases under which portals report the deal id in placement options.
const PLACEMENT_ID_KEYS: [&str; 4] = ["ENTITY_ID", "entityId", "ID", "id"];

/// Resolve a deal id, preferring the explicit id over the pasted link over
/// the placement context. Returns `None` when every source comes up empty.
pub fn resolve(
    explicit_id: Option<&str>,
    pasted_url: Option<&str>,
    placement: Option<&Map<String, Value>>,
) -> Option<DealId> {
    explicit_id
        .and_then(parse_positive)
        .or_else(|| pasted_url.and_then(extract_from_link))
        .or_else(|| placement.and_then(from_placement))
}

/// Pull the deal id out of a pasted card URL. Matches the
/// `/deal/details/<digits>/` path segment, trailing slash optional.
pub fn extract_from_link(url: &str) -> Option<DealId> {
    let with_slash = Regex::new(r"(?i)/deal/details/(\d+)/").unwrap();
    let without_slash = Regex::new(r"(?i)/deal/details/(\d+)").unwrap();
    let digits = with_slash
        .captures(url)
        .or_else(|| without_slash.captures(url))?
        .get(1)?
        .as_str();
    parse_positive(digits)
}

fn from_placement(options: &Map<String, Value>) -> Option<DealId> {
    PLACEMENT_ID_KEYS
        .iter()
        .find_map(|key| options.get(*key).and_then(numeric_id))
}

// Placement options carry ids as JSON numbers or numeric strings depending
// on the portal version.
fn numeric_id(value: &Value) -> Option<DealId> {
    match value {
        Value::Number(n) => n.as_u64().filter(|id| *id > 0),
        Value::String(s) => parse_positive(s),
        _ => None,
    }
}

fn parse_positive(text: &str) -> Option<DealId> {
    text.trim().parse::<DealId>().ok().filter(|id| *id > 0)
}
