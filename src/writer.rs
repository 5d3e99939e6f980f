//! Writing one PDF per chapter
//!
//! Boundaries are turned into contiguous page ranges: a chapter runs from its
//! start page up to the next boundary's start page, the last one up to the
//! end of the book. Pages before the first boundary belong to no chapter.

use crate::config::DuplicatePolicy;
use crate::detector::Boundary;
use crate::extractor::{PageSource, PdfBook};
use crate::validator::{ChapterStats, ChapterValidator};
use crate::SplitError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

static UNSAFE_FILENAME_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\-_\. ]").unwrap());

/// Pages `[start, end)` assigned to one boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterRange {
    /// Position of the boundary in detection order (0-based)
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub title: String,
}

impl ChapterRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Derive one range per boundary.
pub fn plan_ranges(boundaries: &[Boundary], page_count: usize) -> Vec<ChapterRange> {
    boundaries
        .iter()
        .enumerate()
        .map(|(index, boundary)| {
            let end = boundaries
                .get(index + 1)
                .map_or(page_count, |next| next.page)
                .min(page_count);
            ChapterRange {
                index,
                start: boundary.page.min(end),
                end,
                title: boundary.title.clone(),
            }
        })
        .collect()
}

/// Pages (1-based) where more than one chapter was detected to start.
pub fn problem_pages(boundaries: &[Boundary]) -> Vec<usize> {
    let mut pages: Vec<usize> = boundaries
        .windows(2)
        .filter(|pair| pair[0].page == pair[1].page)
        .map(|pair| pair[0].page + 1)
        .collect();
    pages.dedup();
    pages
}

/// Replace everything but word characters, `-`, `_`, `.` and space with `_`.
pub fn sanitize_filename(name: &str) -> String {
    UNSAFE_FILENAME_CHARS.replace_all(name, "_").into_owned()
}

/// Hands out chapter filenames, never the same one twice in a run
#[derive(Debug, Default)]
pub struct FileNamer {
    used: HashSet<String>,
}

impl FileNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// `<title>.pdf`, or `<title>_NN.pdf` with the boundary's 1-based index
    /// when that name is taken.
    pub fn name_for(&mut self, title: &str, index: usize) -> String {
        let base = sanitize_filename(&title.trim().replace(' ', "_"));
        let mut name = format!("{base}.pdf");
        let mut seq = index + 1;
        while self.used.contains(&name) {
            name = format!("{base}_{seq:02}.pdf");
            seq += 1;
        }
        self.used.insert(name.clone());
        name
    }
}

/// Why a boundary produced no file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Same normalized title as an earlier chapter
    DuplicateTitle,
    /// Below the validator's minimums
    ShortChapter(ChapterStats),
    /// Next boundary starts on the same page
    EmptyRange,
}

#[derive(Debug, Clone)]
pub struct SkippedChapter {
    pub range: ChapterRange,
    pub reason: SkipReason,
}

#[derive(Debug, Clone)]
pub struct WrittenChapter {
    pub range: ChapterRange,
    pub path: PathBuf,
    /// Present when the chapter went through validation
    pub stats: Option<ChapterStats>,
}

/// What one writer run produced
#[derive(Debug, Clone, Default)]
pub struct WriteOutcome {
    pub written: Vec<WrittenChapter>,
    pub skipped: Vec<SkippedChapter>,
    /// 1-based page numbers
    pub problem_pages: Vec<usize>,
}

/// Copies chapter page ranges of a book into separate PDF files
pub struct ChapterWriter<'a> {
    book: &'a PdfBook,
    output_dir: PathBuf,
    duplicates: DuplicatePolicy,
    validator: Option<ChapterValidator>,
}

impl<'a> ChapterWriter<'a> {
    pub fn new(book: &'a PdfBook, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            book,
            output_dir: output_dir.into(),
            duplicates: DuplicatePolicy::default(),
            validator: None,
        }
    }

    pub fn with_duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    pub fn with_validator(mut self, validator: Option<ChapterValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write every surviving boundary to its own file.
    ///
    /// Skips are logged and reported; any I/O or PDF error stops the run and
    /// leaves already written files in place.
    pub fn write_all(&self, boundaries: &[Boundary]) -> Result<WriteOutcome, SplitError> {
        fs::create_dir_all(&self.output_dir)?;

        let mut outcome = WriteOutcome {
            problem_pages: problem_pages(boundaries),
            ..Default::default()
        };
        let mut processed_titles = HashSet::new();
        let mut namer = FileNamer::new();

        for range in plan_ranges(boundaries, self.book.page_count()) {
            if self.duplicates == DuplicatePolicy::SkipRepeated {
                let normalized = range.title.trim().to_lowercase();
                if !processed_titles.insert(normalized) {
                    log::warn!(
                        "Capítulo repetido ignorado: '{}' na página {}",
                        range.title,
                        range.start + 1
                    );
                    outcome.skipped.push(SkippedChapter {
                        range,
                        reason: SkipReason::DuplicateTitle,
                    });
                    continue;
                }
            }

            if range.is_empty() {
                log::warn!(
                    "Capítulo sem páginas ignorado: '{}' na página {}",
                    range.title,
                    range.start + 1
                );
                outcome.skipped.push(SkippedChapter {
                    range,
                    reason: SkipReason::EmptyRange,
                });
                continue;
            }

            let stats = match &self.validator {
                Some(validator) => {
                    let (valid, stats) = validator.check(&self.range_text(&range)?);
                    if !valid {
                        log::warn!(
                            "Capítulo ignorado por ser muito curto: '{}' na página {} (palavras: {}, caracteres: {})",
                            range.title,
                            range.start + 1,
                            stats.words,
                            stats.chars
                        );
                        outcome.skipped.push(SkippedChapter {
                            range,
                            reason: SkipReason::ShortChapter(stats),
                        });
                        continue;
                    }
                    Some(stats)
                }
                None => None,
            };

            let path = self
                .output_dir
                .join(namer.name_for(&range.title, range.index));
            self.save_range(&range, &path)?;

            match stats {
                Some(stats) => log::info!(
                    "Arquivo gerado: {} (páginas {}-{}) | Palavras: {} | Caracteres: {}",
                    path.display(),
                    range.start + 1,
                    range.end,
                    stats.words,
                    stats.chars
                ),
                None => log::info!(
                    "Arquivo gerado: {} (páginas {}-{})",
                    path.display(),
                    range.start + 1,
                    range.end
                ),
            }

            outcome.written.push(WrittenChapter { range, path, stats });
        }

        Ok(outcome)
    }

    /// Unfiltered text of the pages in a range
    fn range_text(&self, range: &ChapterRange) -> Result<String, SplitError> {
        let mut pages = Vec::with_capacity(range.len());
        for page in range.start..range.end {
            pages.push(self.book.page_text(page, None)?);
        }
        Ok(pages.join("\n"))
    }

    /// Copy the range's pages into a new document and save it to `path`
    fn save_range(&self, range: &ChapterRange, path: &Path) -> Result<(), SplitError> {
        let to_delete: Vec<u32> = (0..self.book.page_count())
            .filter(|page| *page < range.start || *page >= range.end)
            .filter_map(|page| self.book.page_number(page))
            .collect();

        let mut chapter = self.book.document().clone();
        if !to_delete.is_empty() {
            chapter.delete_pages(&to_delete);
        }
        chapter.prune_objects();

        let mut file = BufWriter::new(File::create(path)?);
        chapter.save_to(&mut file)?;
        file.flush()?;
        Ok(())
    }
}
