//! Credential presence checks for the health probe.

const REQUIRED_KEYS: [&str; 4] = [
    "OPENAI_API_KEY",
    "REPLICATE_API_TOKEN",
    "ELEVENLABS_API_KEY",
    "ELEVENLABS_VOICE_ID",
];

/// Names of required credentials that are unset or empty.
pub fn missing_keys() -> Vec<&'static str> {
    REQUIRED_KEYS
        .iter()
        .copied()
        .filter(|key| std::env::var(key).map(|v| v.is_empty()).unwrap_or(true))
        .collect()
}

/// True when every external-service credential is configured.
pub fn has_all_keys() -> bool {
    let missing = missing_keys();
    if !missing.is_empty() {
        tracing::warn!(missing = ?missing, "Missing API credentials");
    }
    missing.is_empty()
}
