//! Minimum-size check for candidate chapters
//!
//! Short ranges are usually false positives: dedications, blank pages, a
//! running header that happens to say "Capítulo".

use crate::config::ValidatorConfig;

/// Word and character counts of a chapter's text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChapterStats {
    pub words: usize,
    pub chars: usize,
}

impl ChapterStats {
    pub fn of(text: &str) -> Self {
        Self {
            words: text.split_whitespace().count(),
            chars: text.chars().count(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChapterValidator {
    config: ValidatorConfig,
}

impl ChapterValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Accepts when both counts reach their minimum.
    pub fn is_valid(&self, stats: &ChapterStats) -> bool {
        stats.words >= self.config.min_words && stats.chars >= self.config.min_chars
    }

    pub fn check(&self, text: &str) -> (bool, ChapterStats) {
        let stats = ChapterStats::of(text);
        (self.is_valid(&stats), stats)
    }
}

impl Default for ChapterValidator {
    fn default() -> Self {
        Self::new(ValidatorConfig::default())
    }
}
