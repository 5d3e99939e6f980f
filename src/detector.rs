//! Chapter boundary detection
//!
//! Scans per-page text for chapter headings. The primary pattern set runs
//! first over every page; only when it finds nothing does the fallback set
//! run, and its hits replace the (empty) primary result.
//!
//! Detection is pure: nothing is written here. What happened along the way
//! is returned as a list of [`DetectionEvent`]s for the caller to log or
//! persist.

use crate::config::{DetectionStrategy, DetectorConfig};
use regex::Regex;

/// A detected chapter start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    /// Page index (0-based)
    pub page: usize,
    /// The matched heading text
    pub title: String,
}

impl Boundary {
    pub fn new(page: usize, title: impl Into<String>) -> Self {
        Self {
            page,
            title: title.into(),
        }
    }
}

/// Why a line-scoped match was dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuppressReason {
    /// A stoplist phrase sits right before the match
    BackReference(String),
    /// The line names more than one chapter
    MultipleKeywords(usize),
}

/// Observations made during detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionEvent {
    /// A match was kept as a boundary
    LineMatched {
        page: usize,
        line: usize,
        text: String,
        title: String,
    },
    /// A match was dropped by context suppression
    Suppressed {
        page: usize,
        line: usize,
        title: String,
        reason: SuppressReason,
    },
    /// The primary patterns found nothing and the fallback set was used
    FallbackEngaged,
}

/// Result of a detection pass
#[derive(Debug, Clone, Default)]
pub struct Detection {
    pub boundaries: Vec<Boundary>,
    pub used_fallback: bool,
    pub events: Vec<DetectionEvent>,
}

impl Detection {
    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }
}

/// Detect chapter boundaries in per-page texts (index = page).
pub fn detect_chapters(
    pages: &[String],
    strategy: DetectionStrategy,
    config: &DetectorConfig,
) -> Detection {
    let mut detection = Detection::default();
    scan(pages, strategy, &config.primary_patterns, config, &mut detection);

    if detection.boundaries.is_empty() && !config.fallback_patterns.is_empty() {
        log::warn!("Nenhum capítulo detectado com o padrão principal. Tentando fallback...");
        detection.events.push(DetectionEvent::FallbackEngaged);
        detection.used_fallback = true;
        scan(pages, strategy, &config.fallback_patterns, config, &mut detection);
        if !detection.boundaries.is_empty() {
            log::info!(
                "Fallback detectou {} possíveis capítulos.",
                detection.boundaries.len()
            );
        }
    }

    detection
}

fn scan(
    pages: &[String],
    strategy: DetectionStrategy,
    patterns: &[Regex],
    config: &DetectorConfig,
    detection: &mut Detection,
) {
    for (page, text) in pages.iter().enumerate() {
        match strategy {
            DetectionStrategy::WholePage => scan_whole_page(page, text, patterns, detection),
            DetectionStrategy::LineScoped => {
                scan_lines(page, text, patterns, config, detection)
            }
        }
    }
}

fn scan_whole_page(page: usize, text: &str, patterns: &[Regex], detection: &mut Detection) {
    for pattern in patterns {
        for m in pattern.find_iter(text) {
            let line = text[..m.start()].matches('\n').count();
            let line_text = text.lines().nth(line).unwrap_or_default();
            detection.boundaries.push(Boundary::new(page, m.as_str()));
            detection.events.push(DetectionEvent::LineMatched {
                page,
                line,
                text: line_text.trim().to_string(),
                title: m.as_str().to_string(),
            });
        }
    }
}

fn scan_lines(
    page: usize,
    text: &str,
    patterns: &[Regex],
    config: &DetectorConfig,
    detection: &mut Detection,
) {
    for (line_idx, line) in text.lines().enumerate() {
        for pattern in patterns {
            for m in pattern.find_iter(line) {
                let title = m.as_str().to_string();

                if let Some(reason) = suppression(line, m.start(), config) {
                    log::debug!(
                        "Ignorando '{}' na página {} ({:?})",
                        title,
                        page + 1,
                        reason
                    );
                    detection.events.push(DetectionEvent::Suppressed {
                        page,
                        line: line_idx,
                        title,
                        reason,
                    });
                    continue;
                }

                detection.boundaries.push(Boundary::new(page, title.clone()));
                detection.events.push(DetectionEvent::LineMatched {
                    page,
                    line: line_idx,
                    text: line.trim().to_string(),
                    title,
                });
            }
        }
    }
}

/// Decide whether a match starting at byte `start` of `line` is a reference
/// to a chapter rather than its heading.
fn suppression(line: &str, start: usize, config: &DetectorConfig) -> Option<SuppressReason> {
    let context = preceding_context(line, start, config.context_window).to_lowercase();
    if let Some(phrase) = config
        .context_stoplist
        .iter()
        .find(|phrase| context.contains(phrase.as_str()))
    {
        return Some(SuppressReason::BackReference(phrase.clone()));
    }

    let keywords = config.keyword_pattern.find_iter(line).count();
    if keywords > 1 {
        return Some(SuppressReason::MultipleKeywords(keywords));
    }

    None
}

/// The last `window` characters before byte offset `start`
fn preceding_context(line: &str, start: usize, window: usize) -> &str {
    let prefix = &line[..start];
    if window == 0 {
        return "";
    }
    match prefix.char_indices().rev().nth(window - 1) {
        Some((idx, _)) => &prefix[idx..],
        None => prefix,
    }
}
