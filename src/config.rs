use anyhow::Result;

#[derive(Debug, Clone)]
pub struct Config {
    // Storage
    pub database_path: String,

    // Language heuristic
    pub default_language: String,

    // Search
    pub search_limit: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            // Storage
            database_path: std::env::var("DICTIONARY_DB")
                .unwrap_or_else(|_| "dictionary.db".to_string()),

            // Fallback when no language marker is found in a query
            default_language: std::env::var("DEFAULT_LANGUAGE")
                .unwrap_or_else(|_| "en".to_string()),

            // Search
            search_limit: std::env::var("SEARCH_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
        })
    }
}
