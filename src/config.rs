//! Run configuration
//!
//! Patterns, thresholds and output locations, passed explicitly to the
//! detector, validator and writer.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;

/// Localized chapter headings, optionally followed by a number
static PRIMARY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)cap[ií]tulo(?:\s+\d+)?").unwrap(),
        Regex::new(r"(?i)\bcap\.\s*\d+").unwrap(),
        Regex::new(r"(?i)\bchapter(?:\s+\d+)?").unwrap(),
    ]
});

/// Bare integers and roman numerals; noisy, only used when nothing else hits
static FALLBACK_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"\b\d+\b").unwrap(),
        Regex::new(r"(?i)\b[IVXLCDM]+\b").unwrap(),
    ]
});

static CHAPTER_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)cap[ií]tulo|cap\. |chapter").unwrap());

/// Phrases that mark a line as referring to a chapter rather than opening one
const CONTEXT_STOPLIST: &[&str] = &[
    "anterior",
    "anteriores",
    "vimos no",
    "veja",
    "como vimos",
    "conforme",
    "sobre",
    "leia",
    "consulte",
    "mencionado",
    "mencionados",
    "mencionadas",
    "citados",
    "citadas",
    "citando",
    "referência",
    "referido",
    "referida",
    "referidos",
    "referidas",
    "próximo",
    "próximos",
    "seguinte",
    "seguintes",
    "nos ",
    "no ",
    "previous",
    "as seen in",
    "next",
    "see",
];

/// Default starting font size for heading detection
pub const DEFAULT_FONT_SIZE_THRESHOLD: u32 = 16;

/// How boundaries are searched for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectionStrategy {
    /// Match over the whole font-filtered text of each page
    #[default]
    WholePage,
    /// Match line by line over unfiltered text with context suppression
    LineScoped,
}

/// How the font-size threshold is lowered when nothing is detected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffPolicy {
    /// Subtract a fixed step; 1 is always tried last
    Step(u32),
    /// Go straight to 1
    JumpToOne,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy::Step(15)
    }
}

impl BackoffPolicy {
    /// Thresholds to try, starting at `start` and ending at 1.
    pub fn thresholds(&self, start: u32) -> Vec<u32> {
        let start = start.max(1);
        let mut sizes = vec![start];
        let mut current = start;
        while current > 1 {
            current = match *self {
                BackoffPolicy::Step(step) => current.saturating_sub(step.max(1)).max(1),
                BackoffPolicy::JumpToOne => 1,
            };
            sizes.push(current);
        }
        sizes
    }
}

/// What happens to a boundary whose title was already written
///
/// Titles are the matched heading text. Books whose headings are a bare
/// "CAPÍTULO" over a worded title produce the same title for every chapter,
/// so under [`DuplicatePolicy::SkipRepeated`] only the first one is written;
/// use [`DuplicatePolicy::RenameOnly`] for those.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Skip the boundary when its trimmed, lowercased title was seen before
    #[default]
    SkipRepeated,
    /// Write it anyway; only the filename gets a suffix
    RenameOnly,
}

/// Patterns and suppression rules for the boundary detector
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub primary_patterns: Vec<Regex>,
    pub fallback_patterns: Vec<Regex>,
    /// A line with more than one keyword hit is a TOC or running header
    pub keyword_pattern: Regex,
    /// Compared against the lowercased context window
    pub context_stoplist: Vec<String>,
    /// Characters before a match inspected for stoplist phrases
    pub context_window: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            primary_patterns: PRIMARY_PATTERNS.to_vec(),
            fallback_patterns: FALLBACK_PATTERNS.to_vec(),
            keyword_pattern: Regex::clone(&CHAPTER_KEYWORD),
            context_stoplist: CONTEXT_STOPLIST.iter().map(|s| s.to_string()).collect(),
            context_window: 60,
        }
    }
}

impl DetectorConfig {
    /// Replace the primary patterns with user-supplied regexes
    pub fn with_primary_patterns<I, S>(mut self, patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.primary_patterns = patterns
            .into_iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<Result<_, _>>()?;
        Ok(self)
    }
}

/// Minimum size of a chapter worth writing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorConfig {
    pub min_words: usize,
    pub min_chars: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            min_words: 100,
            min_chars: 500,
        }
    }
}

/// Configuration for a whole split run
#[derive(Debug, Clone)]
pub struct SplitConfig {
    pub strategy: DetectionStrategy,
    pub detector: DetectorConfig,
    /// None disables validation
    pub validator: Option<ValidatorConfig>,
    pub font_size_threshold: u32,
    pub backoff: BackoffPolicy,
    pub duplicates: DuplicatePolicy,
    /// Chapters go to `<output_root>/<book name>/`
    pub output_root: PathBuf,
    /// Per-page texts go to `<txt_root>/<book name>/page_NNN.txt` when set
    pub txt_root: Option<PathBuf>,
    pub debug: bool,
    /// Where debug logs are written
    pub debug_dir: PathBuf,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            strategy: DetectionStrategy::default(),
            detector: DetectorConfig::default(),
            validator: Some(ValidatorConfig::default()),
            font_size_threshold: DEFAULT_FONT_SIZE_THRESHOLD,
            backoff: BackoffPolicy::default(),
            duplicates: DuplicatePolicy::default(),
            output_root: PathBuf::from("capitulos_extraidos"),
            txt_root: None,
            debug: false,
            debug_dir: PathBuf::from("."),
        }
    }
}
