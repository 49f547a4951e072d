//! Prefixed identifiers and display timestamps.

use std::sync::OnceLock;

use regex::Regex;
use uuid::Uuid;

pub const MESSAGE_ID_PREFIX: &str = "msg_";
pub const DIALOG_ID_PREFIX: &str = "dlg_";
pub const PROJECT_ID_PREFIX: &str = "prj_";

static ID_BODY: OnceLock<Option<Regex>> = OnceLock::new();

fn is_id_body(body: &str) -> bool {
    ID_BODY
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,128}$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(body))
}

/// Mint a fresh identifier with the given prefix.
pub fn mint(prefix: &str) -> String {
    format!("{prefix}{}", Uuid::new_v4().simple())
}

/// Whether `value` is already a canonical identifier for `prefix`.
pub fn is_canonical(prefix: &str, value: &str) -> bool {
    value
        .strip_prefix(prefix)
        .is_some_and(is_id_body)
}

/// Coerce a raw identifier into canonical `prefix` form.
///
/// Canonical ids are returned unchanged; bare bodies made of id-safe
/// characters get the prefix prepended. Anything else yields `None`.
pub fn canonicalize(prefix: &str, raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if is_canonical(prefix, trimmed) {
        return Some(trimmed.to_string());
    }
    if is_id_body(trimmed) {
        let candidate = format!("{prefix}{trimmed}");
        if is_canonical(prefix, &candidate) {
            return Some(candidate);
        }
    }
    None
}

/// Display-formatted time of day for message timestamps.
pub fn display_time() -> String {
    chrono::Local::now().format("%H:%M").to_string()
}
