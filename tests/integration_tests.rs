//! Integration tests for pdf-chapter-splitter

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use pdf_chapter_splitter::{
    split_book, split_pdf, BackoffPolicy, DetectionStrategy, DuplicatePolicy, PageSource,
    PdfBook, SkipReason, SplitConfig, SplitError, TextItem,
};
use std::fs;
use std::path::{Path, PathBuf};

const BODY: &str = "lorem ipsum dolor sit amet consectetur adipiscing elit sed do";

// Helper to build a PDF where each page is a list of (font size, line text)
fn build_pdf(pages: &[Vec<(f32, String)>]) -> Vec<u8> {
    let streams = pages
        .iter()
        .map(|lines| {
            let mut operations = vec![Operation::new("BT", vec![])];
            let mut y = 780;
            for (size, text) in lines {
                operations.push(Operation::new(
                    "Tf",
                    vec![Object::Name(b"F1".to_vec()), Object::Real(*size)],
                ));
                operations.push(Operation::new(
                    "Tm",
                    vec![
                        Object::Integer(1),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(1),
                        Object::Integer(72),
                        Object::Integer(y),
                    ],
                ));
                operations.push(show(text));
                y -= 20;
            }
            operations.push(Operation::new("ET", vec![]));
            operations
        })
        .collect::<Vec<_>>();
    build_pdf_from_operations(&streams)
}

fn show(text: &str) -> Operation {
    let latin1: Vec<u8> = text.chars().map(|c| c as u8).collect();
    Operation::new("Tj", vec![Object::string_literal(latin1)])
}

fn numbers(values: &[f32]) -> Vec<Object> {
    values.iter().map(|v| Object::Real(*v)).collect()
}

// Helper to build a PDF with one raw content stream per page
fn build_pdf_from_operations(pages: &[Vec<Operation>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for operations in pages {
        let content = Content {
            operations: operations.clone(),
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(count),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

fn body_page() -> Vec<(f32, String)> {
    (0..3).map(|_| (11.0, BODY.to_string())).collect()
}

fn heading_page(size: f32, heading: &str) -> Vec<(f32, String)> {
    let mut page = vec![(size, heading.to_string())];
    page.extend(body_page());
    page
}

/// 10 pages, "Capítulo 1" on page 0 and "Capítulo 2" on page 5
fn two_chapter_book() -> Vec<Vec<(f32, String)>> {
    (0..10)
        .map(|page| match page {
            0 => heading_page(24.0, "Capítulo 1"),
            5 => heading_page(24.0, "Capítulo 2"),
            _ => body_page(),
        })
        .collect()
}

fn write_pdf(dir: &Path, name: &str, pages: &[Vec<(f32, String)>]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, build_pdf(pages)).unwrap();
    path
}

fn config_in(root: &Path) -> SplitConfig {
    SplitConfig {
        output_root: root.join("capitulos_extraidos"),
        debug_dir: root.join("debug"),
        ..Default::default()
    }
}

fn first_page_text(path: &Path) -> String {
    PdfBook::open(path).unwrap().page_text(0, None).unwrap()
}

// ============================================================================
// Extraction
// ============================================================================

#[test]
fn test_extracts_items_with_font_sizes() {
    let book = PdfBook::open_mem(&build_pdf(&two_chapter_book())).unwrap();
    assert_eq!(book.page_count(), 10);

    let items = book.page_items(0).unwrap();
    assert_eq!(items.len(), 4);
    assert_eq!(items[0].text, "Capítulo 1");
    assert_eq!(items[0].font_size, 24.0);
    assert_eq!(items[1].font_size, 11.0);
    assert!(items.iter().all(|i| i.page == 0));
}

#[test]
fn test_font_filtered_page_text() {
    let book = PdfBook::open_mem(&build_pdf(&two_chapter_book())).unwrap();
    assert_eq!(book.page_text(0, Some(16)).unwrap(), "Capítulo 1");
    assert_eq!(book.page_text(1, Some(16)).unwrap(), "");

    let unfiltered = book.page_text(0, None).unwrap();
    assert_eq!(unfiltered.lines().count(), 4);
    assert_eq!(book.page_text(0, Some(1)).unwrap(), unfiltered);
}

#[test]
fn test_page_out_of_range() {
    let book = PdfBook::open_mem(&build_pdf(&two_chapter_book())).unwrap();
    assert!(matches!(
        book.page_items(10),
        Err(SplitError::PageOutOfRange {
            page: 10,
            page_count: 10
        })
    ));
}

#[test]
fn test_ctm_scaled_heading_passes_font_filter() {
    let operations = vec![
        Operation::new("q", vec![]),
        Operation::new("cm", numbers(&[2.0, 0.0, 0.0, 2.0, 0.0, 0.0])),
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Real(10.0)]),
        Operation::new("Td", numbers(&[36.0, 350.0])),
        show("Capítulo 1"),
        Operation::new("ET", vec![]),
        Operation::new("Q", vec![]),
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Real(11.0)]),
        Operation::new("Td", numbers(&[72.0, 600.0])),
        show(BODY),
        Operation::new("ET", vec![]),
    ];
    let book = PdfBook::open_mem(&build_pdf_from_operations(&[operations])).unwrap();

    let items = book.page_items(0).unwrap();
    assert_eq!(items[0].font_size, 20.0);
    assert_eq!(items[1].font_size, 11.0);
    assert_eq!(book.page_text(0, Some(16)).unwrap(), "Capítulo 1");
}

// Scaled text matrix with a unit font size, as some PDF producers emit
fn scaled_matrix_page() -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(1)]),
        Operation::new("Tm", numbers(&[12.0, 0.0, 0.0, 12.0, 72.0, 700.0])),
        show("Capítulo 1"),
        Operation::new("Td", numbers(&[0.0, -1.5])),
        show("como vimos no Capítulo 2"),
        Operation::new("TD", numbers(&[0.0, -1.5])),
        show("primeira linha"),
        Operation::new("T*", vec![]),
        show("segunda linha"),
        Operation::new("ET", vec![]),
    ]
}

#[test]
fn test_scaled_text_matrix_keeps_lines_apart() {
    let book = PdfBook::open_mem(&build_pdf_from_operations(&[scaled_matrix_page()])).unwrap();

    let items = book.page_items(0).unwrap();
    let ys: Vec<f32> = items.iter().map(|i| i.y).collect();
    assert_eq!(ys, vec![700.0, 682.0, 664.0, 646.0]);
    assert!(items.iter().all(|i| i.font_size == 12.0));

    assert_eq!(
        book.page_text(0, None).unwrap(),
        "Capítulo 1\ncomo vimos no Capítulo 2\nprimeira linha\nsegunda linha"
    );
}

#[test]
fn test_line_scoped_heading_survives_reference_on_next_line() {
    let dir = tempfile::tempdir().unwrap();
    let pdf_path = dir.path().join("escalado.pdf");
    fs::write(&pdf_path, build_pdf_from_operations(&[scaled_matrix_page()])).unwrap();
    let config = SplitConfig {
        strategy: DetectionStrategy::LineScoped,
        validator: None,
        ..config_in(dir.path())
    };

    let report = split_pdf(&pdf_path, &config).unwrap();
    let titles: Vec<_> = report.boundaries.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, vec!["Capítulo 1"]);
}

struct SyntheticBook {
    pages: Vec<Vec<TextItem>>,
}

impl PageSource for SyntheticBook {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_items(&self, index: usize) -> Result<Vec<TextItem>, SplitError> {
        Ok(self.pages[index].clone())
    }
}

#[test]
fn test_filter_round_trip_on_synthetic_pages() {
    let item = |text: &str, y: f32, font_size: f32| TextItem {
        text: text.to_string(),
        x: 72.0,
        y,
        font: "F1".to_string(),
        font_size,
        page: 0,
    };
    let book = SyntheticBook {
        pages: vec![vec![item("CAPÍTULO 4", 700.0, 20.0), item("A fuga", 670.0, 18.0)]],
    };
    assert_eq!(
        book.page_text(0, Some(18)).unwrap(),
        book.page_text(0, Some(1)).unwrap()
    );
    assert_eq!(book.page_text(0, Some(19)).unwrap(), "CAPÍTULO 4");
}

// ============================================================================
// End-to-end
// ============================================================================

#[test]
fn test_two_chapters_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "livro.pdf", &two_chapter_book());

    let report = split_pdf(&pdf, &config_in(dir.path())).unwrap();

    assert_eq!(report.book_name, "livro");
    assert_eq!(report.font_size_threshold, Some(16));
    assert!(!report.used_fallback);
    assert_eq!(report.boundaries.len(), 2);
    assert_eq!(report.written.len(), 2);
    assert!(report.skipped.is_empty());
    assert!(report.problem_pages.is_empty());

    let spans: Vec<_> = report
        .written
        .iter()
        .map(|c| (c.range.start, c.range.end))
        .collect();
    assert_eq!(spans, vec![(0, 5), (5, 10)]);

    let out = dir.path().join("capitulos_extraidos").join("livro");
    let first = out.join("Capítulo_1.pdf");
    let second = out.join("Capítulo_2.pdf");
    assert_eq!(PdfBook::open(&first).unwrap().page_count(), 5);
    assert_eq!(PdfBook::open(&second).unwrap().page_count(), 5);
    assert!(first_page_text(&first).starts_with("Capítulo 1"));
    assert!(first_page_text(&second).starts_with("Capítulo 2"));

    assert!(report.summary().contains("Capítulos detectados: 2"));
    assert!(report.summary().contains("Arquivos gerados: 2"));
}

#[test]
fn test_pages_before_first_chapter_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let mut pages = vec![body_page(), body_page()];
    pages.extend(two_chapter_book());
    let pdf = write_pdf(dir.path(), "prefacio.pdf", &pages);

    let report = split_pdf(&pdf, &config_in(dir.path())).unwrap();
    let spans: Vec<_> = report
        .written
        .iter()
        .map(|c| (c.range.start, c.range.end))
        .collect();
    assert_eq!(spans, vec![(2, 7), (7, 12)]);
}

#[test]
fn test_output_is_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "livro.pdf", &two_chapter_book());

    let first_root = dir.path().join("a");
    let second_root = dir.path().join("b");
    let first = split_pdf(&pdf, &config_in(&first_root)).unwrap();
    let second = split_pdf(&pdf, &config_in(&second_root)).unwrap();

    assert_eq!(first.written.len(), second.written.len());
    for (a, b) in first.written.iter().zip(&second.written) {
        assert_eq!(a.path.file_name(), b.path.file_name());
        assert_eq!(a.range, b.range);
        assert_eq!(fs::read(&a.path).unwrap(), fs::read(&b.path).unwrap());
    }
}

// ============================================================================
// Skips and deduplication
// ============================================================================

fn repeated_title_book() -> Vec<Vec<(f32, String)>> {
    (0..8)
        .map(|page| match page {
            0 | 4 => heading_page(24.0, "Capítulo 1"),
            _ => body_page(),
        })
        .collect()
}

#[test]
fn test_repeated_title_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "livro.pdf", &repeated_title_book());

    let report = split_pdf(&pdf, &config_in(dir.path())).unwrap();
    assert_eq!(report.boundaries.len(), 2);
    assert_eq!(report.written.len(), 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].reason, SkipReason::DuplicateTitle);
    assert_eq!(report.skipped[0].range.start, 4);
}

#[test]
fn test_rename_policy_suffixes_colliding_names() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "livro.pdf", &repeated_title_book());
    let config = SplitConfig {
        duplicates: DuplicatePolicy::RenameOnly,
        ..config_in(dir.path())
    };

    let report = split_pdf(&pdf, &config).unwrap();
    let names: Vec<_> = report
        .written
        .iter()
        .map(|c| c.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["Capítulo_1.pdf", "Capítulo_1_02.pdf"]);
}

fn bare_heading_book() -> Vec<Vec<(f32, String)>> {
    (0..8)
        .map(|page| match page {
            0 | 4 => {
                let title = if page == 0 { "A partida" } else { "A volta" };
                let mut lines = vec![
                    (24.0, "CAPÍTULO".to_string()),
                    (20.0, title.to_string()),
                ];
                lines.extend(body_page());
                lines
            }
            _ => body_page(),
        })
        .collect()
}

#[test]
fn test_bare_headings_need_rename_policy() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "livro.pdf", &bare_heading_book());

    let skipping = split_pdf(&pdf, &config_in(dir.path())).unwrap();
    assert_eq!(skipping.boundaries.len(), 2);
    assert!(skipping.boundaries.iter().all(|b| b.title == "CAPÍTULO"));
    assert_eq!(skipping.written.len(), 1);

    let renaming = SplitConfig {
        duplicates: DuplicatePolicy::RenameOnly,
        output_root: dir.path().join("renomeados"),
        ..config_in(dir.path())
    };
    let report = split_pdf(&pdf, &renaming).unwrap();
    let spans: Vec<_> = report
        .written
        .iter()
        .map(|c| (c.range.start, c.range.end))
        .collect();
    assert_eq!(spans, vec![(0, 4), (4, 8)]);
}

#[test]
fn test_short_chapter_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let pages = vec![
        vec![(24.0, "Capítulo 1".to_string())],
        heading_page(24.0, "Capítulo 2"),
        body_page(),
        body_page(),
        body_page(),
        body_page(),
    ];
    let pdf = write_pdf(dir.path(), "livro.pdf", &pages);

    let report = split_pdf(&pdf, &config_in(dir.path())).unwrap();
    assert_eq!(report.written.len(), 1);
    assert_eq!(report.written[0].range.title, "Capítulo 2");
    assert!(matches!(
        report.skipped[0].reason,
        SkipReason::ShortChapter(stats) if stats.words == 2
    ));

    let unvalidated = SplitConfig {
        validator: None,
        output_root: dir.path().join("sem_validacao"),
        ..config_in(dir.path())
    };
    let report = split_pdf(&pdf, &unvalidated).unwrap();
    assert_eq!(report.written.len(), 2);
    assert!(report.written[0].stats.is_none());
}

#[test]
fn test_same_page_chapters_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut pages = two_chapter_book();
    pages[5] = vec![
        (24.0, "Capítulo 2".to_string()),
        (24.0, "Capítulo 3".to_string()),
    ];
    pages[5].extend(body_page());
    let pdf = write_pdf(dir.path(), "livro.pdf", &pages);

    let report = split_pdf(&pdf, &config_in(dir.path())).unwrap();
    assert_eq!(report.problem_pages, vec![6]);
    assert!(report
        .skipped
        .iter()
        .any(|s| s.reason == SkipReason::EmptyRange && s.range.title == "Capítulo 2"));
    assert!(report.summary().contains("[6]"));
}

// ============================================================================
// Back-off and strategies
// ============================================================================

#[test]
fn test_backoff_finds_small_headings() {
    let dir = tempfile::tempdir().unwrap();
    let pages: Vec<_> = (0..8)
        .map(|page| match page {
            0 => heading_page(14.0, "Capítulo 1"),
            4 => heading_page(14.0, "Capítulo 2"),
            _ => body_page(),
        })
        .collect();
    let pdf = write_pdf(dir.path(), "pequeno.pdf", &pages);
    let config = SplitConfig {
        txt_root: Some(dir.path().join("txt")),
        ..config_in(dir.path())
    };

    let report = split_pdf(&pdf, &config).unwrap();
    assert_eq!(report.font_size_threshold, Some(1));
    assert_eq!(report.boundaries.len(), 2);
    assert_eq!(report.written.len(), 2);

    let txt = dir.path().join("txt").join("pequeno");
    assert!(fs::read_to_string(txt.join("page_001.txt"))
        .unwrap()
        .starts_with("Capítulo 1"));
    assert!(txt.join("page_008.txt").exists());
}

#[test]
fn test_detection_exhausted() {
    let dir = tempfile::tempdir().unwrap();
    let pages: Vec<_> = (0..3).map(|_| body_page()).collect();
    let pdf = write_pdf(dir.path(), "vazio.pdf", &pages);
    let config = SplitConfig {
        backoff: BackoffPolicy::JumpToOne,
        ..config_in(dir.path())
    };

    let err = split_pdf(&pdf, &config).unwrap_err();
    assert!(matches!(
        err,
        SplitError::DetectionExhausted {
            lowest_threshold: 1
        }
    ));
    assert!(!dir.path().join("capitulos_extraidos").exists());
}

#[test]
fn test_line_scoped_ignores_references() {
    let dir = tempfile::tempdir().unwrap();
    let mut pages = two_chapter_book();
    pages[7].push((11.0, "como vimos no Capítulo 1 isso se repete".to_string()));
    let pdf = write_pdf(dir.path(), "livro.pdf", &pages);
    let config = SplitConfig {
        strategy: DetectionStrategy::LineScoped,
        debug: true,
        ..config_in(dir.path())
    };

    let book = PdfBook::open(&pdf).unwrap();
    let report = split_book(&book, "livro", &config).unwrap();
    assert_eq!(report.font_size_threshold, None);
    let pages: Vec<_> = report.boundaries.iter().map(|b| b.page).collect();
    assert_eq!(pages, vec![0, 5]);

    let matched = fs::read_to_string(
        dir.path()
            .join("debug")
            .join("debug_capitulos_detectados.txt"),
    )
    .unwrap();
    assert_eq!(matched, "[P001][L001] Capítulo 1\n[P006][L001] Capítulo 2");
    assert!(dir.path().join("debug").join("debug_paginas.txt").exists());
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = split_pdf(dir.path().join("nada.pdf"), &config_in(dir.path())).unwrap_err();
    assert!(matches!(err, SplitError::NotFound(_)));
}

#[test]
fn test_unreadable_pdf_fails_before_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quebrado.pdf");
    fs::write(&path, b"not a pdf").unwrap();

    let err = split_pdf(&path, &config_in(dir.path())).unwrap_err();
    assert!(matches!(err, SplitError::Parse(_)));
    assert!(!dir.path().join("capitulos_extraidos").exists());
}
