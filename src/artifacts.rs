//! Files written alongside the chapters: per-page texts and debug logs

use crate::detector::DetectionEvent;
use crate::SplitError;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Appended full text of every scanned page
pub const PAGE_DUMP_FILE: &str = "debug_paginas.txt";
/// One line per emitted chapter match
pub const DETECTED_LINES_FILE: &str = "debug_capitulos_detectados.txt";

/// Name of the intermediate text file for a 0-based page index
pub fn page_text_filename(page: usize) -> String {
    format!("page_{:03}.txt", page + 1)
}

/// Write each page's text to `<dir>/page_NNN.txt`, returning the page count.
pub fn write_page_texts(dir: &Path, pages: &[String]) -> Result<usize, SplitError> {
    fs::create_dir_all(dir)?;
    for (page, text) in pages.iter().enumerate() {
        fs::write(dir.join(page_text_filename(page)), text)?;
    }
    Ok(pages.len())
}

/// Append every page's text to the page dump in `dir`.
pub fn append_page_dump(dir: &Path, pages: &[String]) -> Result<PathBuf, SplitError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(PAGE_DUMP_FILE);
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    for (page, text) in pages.iter().enumerate() {
        write!(file, "\n--- Página {} ---\n{}\n", page + 1, text)?;
    }
    Ok(path)
}

/// `[PNNN][LNNN] line` for every kept match, 1-based.
pub fn detected_lines(events: &[DetectionEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            DetectionEvent::LineMatched {
                page, line, text, ..
            } => Some(format!("[P{:03}][L{:03}] {}", page + 1, line + 1, text)),
            _ => None,
        })
        .collect()
}

/// Write the matched-lines file in `dir`. Nothing is written without matches.
pub fn write_detected_lines(
    dir: &Path,
    events: &[DetectionEvent],
) -> Result<Option<PathBuf>, SplitError> {
    let lines = detected_lines(events);
    if lines.is_empty() {
        return Ok(None);
    }
    fs::create_dir_all(dir)?;
    let path = dir.join(DETECTED_LINES_FILE);
    fs::write(&path, lines.join("\n"))?;
    Ok(Some(path))
}
