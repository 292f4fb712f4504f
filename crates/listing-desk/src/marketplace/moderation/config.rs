/// Words that must not appear in a listing's title or description.
pub const DEFAULT_FORBIDDEN_WORDS: [&str; 6] = [
    "lừa đảo",
    "cờ bạc",
    "cá độ",
    "ma túy",
    "đa cấp",
    "scam",
];

/// Content rules the moderation engine applies. Penalties and thresholds are fixed policy;
/// only the forbidden-word list can be extended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationConfig {
    forbidden_words: Vec<String>,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            forbidden_words: DEFAULT_FORBIDDEN_WORDS
                .iter()
                .map(|word| word.to_string())
                .collect(),
        }
    }
}

impl ModerationConfig {
    /// Appends words, lower-cased and de-duplicated.
    pub fn with_extra_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for word in words {
            let normalized = word.as_ref().trim().to_lowercase();
            if normalized.is_empty() || self.forbidden_words.contains(&normalized) {
                continue;
            }
            self.forbidden_words.push(normalized);
        }
        self
    }

    pub fn forbidden_words(&self) -> &[String] {
        &self.forbidden_words
    }
}
