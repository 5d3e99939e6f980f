//! Print text items with their rendered font sizes, to pick a heading threshold

use pdf_chapter_splitter::{PageSource, PdfBook};
use std::env;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: debug-fonts <pdf_path> [max_page | min-max]");
        std::process::exit(1);
    }

    let range = args.get(2).map(|s| s.as_str()).unwrap_or("1-3");
    let (min_page, max_page) = if let Some((a, b)) = range.split_once('-') {
        (a.parse().unwrap_or(1), b.parse().unwrap_or(3))
    } else {
        (1, range.parse().unwrap_or(3))
    };

    let book = match PdfBook::open(&args[1]) {
        Ok(book) => book,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let max_page = max_page.min(book.page_count());
    for page in min_page.max(1)..=max_page {
        let items = match book.page_items(page - 1) {
            Ok(items) => items,
            Err(e) => {
                eprintln!("Page {}: {}", page, e);
                continue;
            }
        };
        println!("=== PAGE {} ({} items) ===", page, items.len());
        for item in &items {
            println!(
                "  x={:7.1} y={:7.1} fs={:5.1} font={:<6} text={:?}",
                item.x, item.y, item.font_size, item.font, item.text
            );
        }
        println!();
    }
}
