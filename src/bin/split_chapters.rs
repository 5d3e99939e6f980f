//! CLI tool for splitting a PDF book into chapter files

use clap::{Parser, ValueEnum};
use pdf_chapter_splitter::{
    split_pdf, BackoffPolicy, DetectionStrategy, DetectorConfig, DuplicatePolicy, SplitConfig,
    SplitError, ValidatorConfig,
};
use std::io::Write;
use std::path::PathBuf;
use std::process;

/// Split a PDF book into one PDF per detected chapter
#[derive(Parser, Debug)]
#[command(name = "split-chapters", version, about, long_about = None)]
struct Cli {
    /// Path to the source PDF
    pdf: PathBuf,

    /// Chapters are written to <OUTPUT_ROOT>/<book name>/
    #[arg(long, default_value = "capitulos_extraidos")]
    output_root: PathBuf,

    /// Also write the filtered text of each page to <TXT_ROOT>/<book name>/page_NNN.txt
    #[arg(long)]
    txt_root: Option<PathBuf>,

    /// How chapter headings are searched for
    #[arg(long, value_enum, default_value_t = Strategy::WholePage)]
    strategy: Strategy,

    /// Initial minimum font size for heading text
    #[arg(long, default_value_t = 16)]
    font_size: u32,

    /// Amount the font size is lowered after a pass with no chapters
    #[arg(long, default_value_t = 15, conflicts_with = "backoff_jump")]
    backoff_step: u32,

    /// Retry directly at font size 1 after a pass with no chapters
    #[arg(long)]
    backoff_jump: bool,

    /// What to do with a chapter whose title was already seen
    #[arg(long, value_enum, default_value_t = Duplicates::Skip)]
    duplicates: Duplicates,

    /// Replace the chapter heading patterns (regex, repeatable)
    #[arg(long = "pattern")]
    patterns: Vec<String>,

    /// Minimum words for a chapter to be written
    #[arg(long, default_value_t = 100)]
    min_words: usize,

    /// Minimum characters for a chapter to be written
    #[arg(long, default_value_t = 500)]
    min_chars: usize,

    /// Write every detected chapter regardless of its size
    #[arg(long)]
    no_validate: bool,

    /// Save page texts and matched lines for inspection
    #[arg(long)]
    debug: bool,

    /// Directory for the debug files
    #[arg(long, default_value = ".")]
    debug_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Strategy {
    WholePage,
    LineScoped,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Duplicates {
    Skip,
    Rename,
}

impl Cli {
    fn into_config(self) -> Result<(PathBuf, SplitConfig), SplitError> {
        let mut detector = DetectorConfig::default();
        if !self.patterns.is_empty() {
            detector = detector.with_primary_patterns(&self.patterns)?;
        }

        let config = SplitConfig {
            strategy: match self.strategy {
                Strategy::WholePage => DetectionStrategy::WholePage,
                Strategy::LineScoped => DetectionStrategy::LineScoped,
            },
            detector,
            validator: (!self.no_validate).then_some(ValidatorConfig {
                min_words: self.min_words,
                min_chars: self.min_chars,
            }),
            font_size_threshold: self.font_size,
            backoff: if self.backoff_jump {
                BackoffPolicy::JumpToOne
            } else {
                BackoffPolicy::Step(self.backoff_step)
            },
            duplicates: match self.duplicates {
                Duplicates::Skip => DuplicatePolicy::SkipRepeated,
                Duplicates::Rename => DuplicatePolicy::RenameOnly,
            },
            output_root: self.output_root,
            txt_root: self.txt_root,
            debug: self.debug,
            debug_dir: self.debug_dir,
        };
        Ok((self.pdf, config))
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            process::exit(code);
        }
    };

    let default_level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| writeln!(buf, "{}: {}", record.level(), record.args()))
        .init();

    let (pdf_path, config) = match cli.into_config() {
        Ok(parts) => parts,
        Err(e) => {
            eprintln!("Erro: {}", e);
            process::exit(1);
        }
    };

    match split_pdf(&pdf_path, &config) {
        Ok(report) => {
            println!();
            print!("{}", report.summary());
        }
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}
