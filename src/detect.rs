//! Character-frequency language heuristic.
//!
//! Each supported language has a set of marker characters that do not occur
//! in the others (Kazakh-specific Cyrillic, the common Russian Cyrillic
//! range, Turkish diacritics). Detection counts markers in the lowercased
//! input and picks the language with the highest non-zero count. The search
//! entry point uses the guess to rank matches in the detected language
//! first; it is a bias, not an authority.

/// Marker characters per language, in tie-break priority order. A language
/// earlier in this table wins when counts are equal.
const PROFILES: &[(&str, &str)] = &[
    ("kk", "әғқңөұүіһ"),
    ("ru", "ёйцукенгшщзхъфывапролджэячсмитьбю"),
    ("tr", "çğıöşü"),
];

/// Best-guess language detector. Pure and deterministic: identical input
/// always yields the identical guess.
#[derive(Debug, Clone)]
pub struct LanguageDetector {
    default_language: String,
}

impl LanguageDetector {
    /// `default_language` is returned when the text contains no marker
    /// character from any profile.
    pub fn new(default_language: &str) -> Self {
        Self {
            default_language: default_language.to_string(),
        }
    }

    /// Guess the language of `text`.
    pub fn detect(&self, text: &str) -> &str {
        let lowered = text.to_lowercase();
        let mut best: Option<(&str, usize)> = None;
        for (code, markers) in PROFILES {
            let count = lowered.chars().filter(|c| markers.contains(*c)).count();
            if count == 0 {
                continue;
            }
            // Strictly greater keeps the earlier profile on ties.
            match best {
                Some((_, best_count)) if count <= best_count => {}
                _ => best = Some((code, count)),
            }
        }
        match best {
            Some((code, _)) => code,
            None => &self.default_language,
        }
    }
}
