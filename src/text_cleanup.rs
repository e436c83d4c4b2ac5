// Text cleanup module
// Applies regex patterns to clean up scraped track/album/artist names

use crate::config::CleanupConfig;
use regex::Regex;

pub struct TextCleaner {
    patterns: Vec<Regex>,
}

impl TextCleaner {
    /// Create a new text cleaner from config
    pub fn new(config: &CleanupConfig) -> Self {
        if !config.enabled {
            return Self { patterns: Vec::new() };
        }

        let patterns = config
            .patterns
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(compiled) => Some(compiled),
                Err(error) => {
                    log::warn!("Invalid cleanup pattern '{}': {}", pattern, error);
                    None
                }
            })
            .collect();

        Self { patterns }
    }

    /// Strip all configured patterns from `text` and normalize whitespace
    pub fn clean(&self, text: &str) -> String {
        let mut result = text.to_string();
        for pattern in &self.patterns {
            result = pattern.replace_all(&result, "").into_owned();
        }

        result.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cleaner(patterns: &[&str]) -> TextCleaner {
        TextCleaner::new(&CleanupConfig {
            enabled: true,
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        })
    }

    #[test]
    fn removes_patterns_in_order() {
        let cleaner = cleaner(&[r"\s*\[Explicit\]", r"\s*\(Clean\)"]);
        assert_eq!(cleaner.clean("Cop Show [Explicit] (Clean)"), "Cop Show");
    }

    #[test]
    fn collapses_leftover_whitespace() {
        let cleaner = cleaner(&[r"\[Explicit\]"]);
        assert_eq!(cleaner.clean("Cop  [Explicit]  Show"), "Cop Show");
    }

    #[test]
    fn disabled_cleaner_only_trims() {
        let cleaner = TextCleaner::new(&CleanupConfig {
            enabled: false,
            patterns: vec![r".*".to_string()],
        });
        assert_eq!(cleaner.clean("  Cop Show  "), "Cop Show");
    }

    #[test]
    fn invalid_patterns_are_skipped() {
        let cleaner = cleaner(&["(unclosed", r"\[Explicit\]"]);
        assert_eq!(cleaner.clean("Cop Show [Explicit]"), "Cop Show");
    }
}
