//! Split a PDF book into one PDF per chapter using lopdf
//!
//! This crate provides:
//! - Text extraction with rendered font sizes, filtered to large headings
//! - Chapter heading detection with fallback patterns and context suppression
//! - Per-chapter PDF output with validation and filename deduplication

pub mod artifacts;
pub mod config;
pub mod detector;
pub mod extractor;
pub mod validator;
pub mod writer;

pub use config::{
    BackoffPolicy, DetectionStrategy, DetectorConfig, DuplicatePolicy, SplitConfig,
    ValidatorConfig,
};
pub use detector::{detect_chapters, Boundary, Detection, DetectionEvent, SuppressReason};
pub use extractor::{filter_by_font_size, text_from_items, PageSource, PdfBook, TextItem};
pub use validator::{ChapterStats, ChapterValidator};
pub use writer::{
    plan_ranges, sanitize_filename, ChapterRange, ChapterWriter, SkipReason, SkippedChapter,
    WrittenChapter,
};

use std::path::{Path, PathBuf};

/// Outcome of a split run
#[derive(Debug)]
pub struct SplitReport {
    /// Source file stem, also the output subdirectory name
    pub book_name: String,
    /// Directory holding the chapter files
    pub output_dir: PathBuf,
    /// Page count of the source document
    pub page_count: usize,
    /// Font size the boundaries were found at (None for line-scoped detection)
    pub font_size_threshold: Option<u32>,
    /// Whether the fallback patterns produced the boundaries
    pub used_fallback: bool,
    /// Every detected boundary, before deduplication and validation
    pub boundaries: Vec<Boundary>,
    pub written: Vec<WrittenChapter>,
    pub skipped: Vec<SkippedChapter>,
    /// Pages (1-based) where more than one chapter starts
    pub problem_pages: Vec<usize>,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl SplitReport {
    /// Human-readable summary printed at the end of a run
    pub fn summary(&self) -> String {
        let mut out = String::from("Resumo do processamento:\n");
        out.push_str(&format!("Capítulos detectados: {}\n", self.boundaries.len()));
        out.push_str(&format!("Arquivos gerados: {}\n", self.written.len()));
        if self.problem_pages.is_empty() {
            out.push_str("Nenhuma página problemática detectada.\n");
        } else {
            out.push_str(&format!(
                "Páginas problemáticas (mais de um capítulo na mesma página): {:?}\n",
                self.problem_pages
            ));
        }
        out
    }
}

/// Split the PDF at `path` into chapters.
///
/// Chapters are written to `<output_root>/<file stem>/`. Fails before any
/// output when the file is missing or unreadable, and after exhausting every
/// font-size threshold when no chapter heading is found.
pub fn split_pdf<P: AsRef<Path>>(path: P, config: &SplitConfig) -> Result<SplitReport, SplitError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(SplitError::NotFound(path.to_path_buf()));
    }

    let book = PdfBook::open(path)?;
    log::info!(
        "PDF carregado: {} ({} páginas)",
        path.display(),
        book.page_count()
    );

    split_book(&book, &book_name(path), config)
}

/// Split an already loaded book. `book_name` names the output subdirectory.
pub fn split_book(
    book: &PdfBook,
    book_name: &str,
    config: &SplitConfig,
) -> Result<SplitReport, SplitError> {
    let start = std::time::Instant::now();

    let pages = (0..book.page_count())
        .map(|page| book.page_items(page))
        .collect::<Result<Vec<_>, _>>()?;

    let (detection, threshold, texts) = match config.strategy {
        DetectionStrategy::WholePage => detect_with_backoff(&pages, book_name, config)?,
        DetectionStrategy::LineScoped => {
            let texts = page_texts(&pages, None);
            let detection = detect_chapters(&texts, config.strategy, &config.detector);
            if detection.is_empty() {
                log::error!("Nenhum capítulo detectado.");
                return Err(SplitError::NoChapters);
            }
            (detection, None, texts)
        }
    };

    if config.debug {
        let dump = artifacts::append_page_dump(&config.debug_dir, &texts)?;
        log::debug!("Texto das páginas salvo em {}", dump.display());
        if let Some(lines) = artifacts::write_detected_lines(&config.debug_dir, &detection.events)? {
            log::debug!("Linhas detectadas salvas em {}", lines.display());
        }
    }

    log::info!("Capítulos detectados: {}", detection.boundaries.len());
    for (idx, boundary) in detection.boundaries.iter().enumerate() {
        log::info!(
            "Capítulo {}: '{}' na página {}",
            idx + 1,
            boundary.title,
            boundary.page + 1
        );
    }

    let output_dir = config.output_root.join(book_name);
    let writer = ChapterWriter::new(book, &output_dir)
        .with_duplicates(config.duplicates)
        .with_validator(config.validator.map(ChapterValidator::new));
    let outcome = writer.write_all(&detection.boundaries)?;

    Ok(SplitReport {
        book_name: book_name.to_string(),
        output_dir,
        page_count: book.page_count(),
        font_size_threshold: threshold,
        used_fallback: detection.used_fallback,
        boundaries: detection.boundaries,
        written: outcome.written,
        skipped: outcome.skipped,
        problem_pages: outcome.problem_pages,
        processing_time_ms: start.elapsed().as_millis() as u64,
    })
}

/// Retry whole-page detection at lower font sizes until something is found
fn detect_with_backoff(
    pages: &[Vec<TextItem>],
    book_name: &str,
    config: &SplitConfig,
) -> Result<(Detection, Option<u32>, Vec<String>), SplitError> {
    let thresholds = config.backoff.thresholds(config.font_size_threshold);
    let lowest = thresholds.last().copied().unwrap_or(1);

    for font_size in thresholds {
        let texts = page_texts(pages, Some(font_size));

        if let Some(txt_root) = &config.txt_root {
            let txt_dir = txt_root.join(book_name);
            log::info!(
                "Gerando arquivos .txt apenas com fontes >= {} em {}...",
                font_size,
                txt_dir.display()
            );
            artifacts::write_page_texts(&txt_dir, &texts)?;
        }

        let detection = detect_chapters(&texts, config.strategy, &config.detector);
        if !detection.is_empty() {
            return Ok((detection, Some(font_size), texts));
        }
        log::warn!(
            "Nenhum capítulo detectado com limite de fonte {}.",
            font_size
        );
    }

    log::error!("Nenhum capítulo detectado mesmo após diminuir o limite de fonte.");
    Err(SplitError::DetectionExhausted {
        lowest_threshold: lowest,
    })
}

fn page_texts(pages: &[Vec<TextItem>], min_font_size: Option<u32>) -> Vec<String> {
    pages
        .iter()
        .map(|items| text_from_items(items.clone(), min_font_size))
        .collect()
}

/// File stem of the source, used as the output subdirectory
pub fn book_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "livro".to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    #[error("Erro de E/S: {0}")]
    Io(#[from] std::io::Error),
    #[error("Erro ao ler o PDF: {0}")]
    Parse(String),
    #[error("Arquivo não encontrado: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Página {page} fora do intervalo (o documento tem {page_count} páginas)")]
    PageOutOfRange { page: usize, page_count: usize },
    #[error("Padrão de capítulo inválido: {0}")]
    InvalidPattern(#[from] regex::Error),
    #[error("Nenhum capítulo detectado mesmo com limite de fonte {lowest_threshold}")]
    DetectionExhausted { lowest_threshold: u32 },
    #[error("Nenhum capítulo detectado")]
    NoChapters,
}

impl From<lopdf::Error> for SplitError {
    fn from(e: lopdf::Error) -> Self {
        SplitError::Parse(e.to_string())
    }
}
