//! Language names reported by the API that changed spelling over time.

/// `(reported, canonical)` pairs. Add a row here to map another rename.
const LANGUAGE_RENAMES: &[(&str, &str)] = &[("Vim script", "Vim Script")];

pub fn normalize_language(name: &str) -> String {
    LANGUAGE_RENAMES
        .iter()
        .find(|(reported, _)| *reported == name)
        .map(|(_, canonical)| (*canonical).to_string())
        .unwrap_or_else(|| name.to_string())
}
