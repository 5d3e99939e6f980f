//! Text extraction from PDF pages using lopdf
//!
//! Every text-showing operator becomes a [`TextItem`] carrying its rendered
//! font size, so callers can keep only the large headings of a page before
//! turning it back into plain text.

use crate::SplitError;
use lopdf::{Document, Object, ObjectId};
use std::collections::BTreeMap;
use std::path::Path;

/// A text item with position and size information
#[derive(Debug, Clone)]
pub struct TextItem {
    /// The text content
    pub text: String,
    /// X position on page
    pub x: f32,
    /// Y position on page (PDF coordinates, origin at bottom-left)
    pub y: f32,
    /// Font resource name
    pub font: String,
    /// Rendered font size, 0.0 when no font was selected
    pub font_size: f32,
    /// Page index (0-based)
    pub page: usize,
}

/// A line of text (grouped text items)
#[derive(Debug, Clone)]
pub struct TextLine {
    pub items: Vec<TextItem>,
    pub y: f32,
    pub page: usize,
}

impl TextLine {
    pub fn text(&self) -> String {
        self.items
            .iter()
            .map(|i| i.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Anything that can hand out the text items of its pages.
///
/// Font filtering and plain-text extraction only need this. Writing chapters
/// copies pages out of the loaded document, so the writer takes a
/// [`PdfBook`], the lopdf-backed implementation.
pub trait PageSource {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Text items of the page at `index` (0-based), in content-stream order.
    fn page_items(&self, index: usize) -> Result<Vec<TextItem>, SplitError>;

    /// Plain text of a page, optionally keeping only items at or above
    /// `min_font_size`.
    fn page_text(&self, index: usize, min_font_size: Option<u32>) -> Result<String, SplitError> {
        let items = self.page_items(index)?;
        Ok(text_from_items(items, min_font_size))
    }
}

/// A loaded PDF document with its pages in reading order
#[derive(Debug, Clone)]
pub struct PdfBook {
    document: Document,
    /// lopdf page numbers (1-based), indexed by 0-based page index
    page_numbers: Vec<u32>,
    page_ids: Vec<ObjectId>,
}

impl PdfBook {
    /// Load a PDF from disk
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SplitError> {
        let document = Document::load(path)?;
        Ok(Self::from_document(document))
    }

    /// Load a PDF from a memory buffer
    pub fn open_mem(buffer: &[u8]) -> Result<Self, SplitError> {
        let document = Document::load_mem(buffer)?;
        Ok(Self::from_document(document))
    }

    pub fn from_document(document: Document) -> Self {
        let pages = document.get_pages();
        let page_numbers = pages.keys().copied().collect();
        let page_ids = pages.values().copied().collect();
        Self {
            document,
            page_numbers,
            page_ids,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// lopdf page number (1-based) of a 0-based page index
    pub fn page_number(&self, index: usize) -> Option<u32> {
        self.page_numbers.get(index).copied()
    }
}

impl PageSource for PdfBook {
    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn page_items(&self, index: usize) -> Result<Vec<TextItem>, SplitError> {
        let page_id = *self
            .page_ids
            .get(index)
            .ok_or(SplitError::PageOutOfRange {
                page: index,
                page_count: self.page_ids.len(),
            })?;
        extract_page_text_items(&self.document, page_id, index)
    }
}

/// Keep only items rendered at `min_font_size` or larger.
///
/// Items without a selected font carry size 0 and never pass.
pub fn filter_by_font_size(items: Vec<TextItem>, min_font_size: u32) -> Vec<TextItem> {
    let threshold = min_font_size as f32;
    items
        .into_iter()
        .filter(|item| item.font_size >= threshold)
        .collect()
}

/// Turn page items into plain text, one line per baseline.
///
/// With `min_font_size` set, smaller items are dropped first. Returns an
/// empty string when nothing qualifies.
pub fn text_from_items(items: Vec<TextItem>, min_font_size: Option<u32>) -> String {
    let items = match min_font_size {
        Some(size) => filter_by_font_size(items, size),
        None => items,
    };

    group_into_lines(items)
        .iter()
        .map(TextLine::text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Multiply two 2D transformation matrices
/// Matrix format: [a, b, c, d, e, f] representing:
/// | a  b  0 |
/// | c  d  0 |
/// | e  f  1 |
fn multiply_matrices(m1: &[f32; 6], m2: &[f32; 6]) -> [f32; 6] {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

/// Text state while walking a content stream
struct TextState {
    ctm: [f32; 6],
    ctm_stack: Vec<[f32; 6]>,
    font: String,
    /// None until the first Tf
    font_size: Option<f32>,
    text_matrix: [f32; 6],
    line_matrix: [f32; 6],
    /// Set by TL and TD, in unscaled text space units
    leading: f32,
    in_text_block: bool,
}

impl TextState {
    fn new() -> Self {
        Self {
            ctm: IDENTITY,
            ctm_stack: Vec::new(),
            font: String::new(),
            font_size: None,
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            leading: 0.0,
            in_text_block: false,
        }
    }

    /// Start a new line offset from the current line start: Tlm = T(tx, ty) x Tlm
    fn move_line(&mut self, tx: f32, ty: f32) {
        let translation = [1.0, 0.0, 0.0, 1.0, tx, ty];
        self.line_matrix = multiply_matrices(&translation, &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }

    fn item(&self, text: String, page: usize) -> TextItem {
        // Text rendering matrix without the Tz/Ts terms
        let combined = multiply_matrices(&self.text_matrix, &self.ctm);
        let font_size = self
            .font_size
            .map(|size| effective_font_size(size, &combined))
            .unwrap_or(0.0);
        TextItem {
            text,
            x: combined[4],
            y: combined[5],
            font: self.font.clone(),
            font_size,
            page,
        }
    }
}

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Extract text items from a single page
fn extract_page_text_items(
    doc: &Document,
    page_id: ObjectId,
    page: usize,
) -> Result<Vec<TextItem>, SplitError> {
    use lopdf::content::Content;

    let mut items = Vec::new();

    let fonts = doc.get_page_fonts(page_id).unwrap_or_default();

    let content_data = doc
        .get_page_content(page_id)
        .map_err(|e| SplitError::Parse(e.to_string()))?;

    let content = Content::decode(&content_data).map_err(|e| SplitError::Parse(e.to_string()))?;

    let mut state = TextState::new();

    for op in &content.operations {
        match op.operator.as_str() {
            "q" => state.ctm_stack.push(state.ctm),
            "Q" => {
                if let Some(saved) = state.ctm_stack.pop() {
                    state.ctm = saved;
                }
            }
            "cm" => {
                if op.operands.len() >= 6 {
                    let new_matrix = [
                        get_number(&op.operands[0]).unwrap_or(1.0),
                        get_number(&op.operands[1]).unwrap_or(0.0),
                        get_number(&op.operands[2]).unwrap_or(0.0),
                        get_number(&op.operands[3]).unwrap_or(1.0),
                        get_number(&op.operands[4]).unwrap_or(0.0),
                        get_number(&op.operands[5]).unwrap_or(0.0),
                    ];
                    state.ctm = multiply_matrices(&new_matrix, &state.ctm);
                }
            }
            "BT" => {
                state.in_text_block = true;
                state.text_matrix = IDENTITY;
                state.line_matrix = IDENTITY;
            }
            "ET" => state.in_text_block = false,
            "Tf" => {
                if op.operands.len() >= 2 {
                    if let Ok(name) = op.operands[0].as_name() {
                        state.font = String::from_utf8_lossy(name).to_string();
                    }
                    if let Some(size) = get_number(&op.operands[1]) {
                        state.font_size = Some(size);
                    }
                }
            }
            "Td" | "TD" => {
                if op.operands.len() >= 2 {
                    let tx = get_number(&op.operands[0]).unwrap_or(0.0);
                    let ty = get_number(&op.operands[1]).unwrap_or(0.0);
                    if op.operator == "TD" {
                        state.leading = -ty;
                    }
                    state.move_line(tx, ty);
                }
            }
            "TL" => {
                if let Some(leading) = op.operands.first().and_then(get_number) {
                    state.leading = leading;
                }
            }
            "Tm" => {
                if op.operands.len() >= 6 {
                    for (i, operand) in op.operands.iter().take(6).enumerate() {
                        state.text_matrix[i] = get_number(operand)
                            .unwrap_or(if i == 0 || i == 3 { 1.0 } else { 0.0 });
                    }
                    state.line_matrix = state.text_matrix;
                }
            }
            "T*" => state.next_line(),
            "Tj" => {
                if state.in_text_block && !op.operands.is_empty() {
                    if let Some(text) =
                        extract_text_from_operand(&op.operands[0], doc, &fonts, &state.font)
                    {
                        if !text.trim().is_empty() {
                            items.push(state.item(text, page));
                        }
                    }
                }
            }
            "TJ" => {
                if state.in_text_block && !op.operands.is_empty() {
                    if let Ok(array) = op.operands[0].as_array() {
                        let mut combined_text = String::new();
                        for element in array {
                            if let Some(text) =
                                extract_text_from_operand(element, doc, &fonts, &state.font)
                            {
                                combined_text.push_str(&text);
                            }
                        }
                        if !combined_text.trim().is_empty() {
                            items.push(state.item(combined_text, page));
                        }
                    }
                }
            }
            "'" | "\"" => {
                // `"` carries word and char spacing before the string
                state.next_line();
                let string_operand = if op.operator == "'" {
                    op.operands.first()
                } else {
                    op.operands.get(2)
                };
                if let Some(operand) = string_operand {
                    if let Some(text) = extract_text_from_operand(operand, doc, &fonts, &state.font)
                    {
                        if !text.trim().is_empty() {
                            items.push(state.item(text, page));
                        }
                    }
                }
            }
            _ => {}
        }
    }

    Ok(items)
}

/// Helper to get f32 from Object
fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Compute effective font size from base size and the text rendering matrix
/// (text matrix times CTM). Matrix is [a, b, c, d, tx, ty].
fn effective_font_size(base_size: f32, matrix: &[f32; 6]) -> f32 {
    let scale_x = (matrix[0].powi(2) + matrix[1].powi(2)).sqrt();
    let scale_y = (matrix[2].powi(2) + matrix[3].powi(2)).sqrt();
    base_size * scale_x.max(scale_y)
}

/// Extract text from a text operand, handling encoding
fn extract_text_from_operand(
    obj: &Object,
    doc: &Document,
    fonts: &BTreeMap<Vec<u8>, &lopdf::Dictionary>,
    current_font: &str,
) -> Option<String> {
    if let Object::String(bytes, _) = obj {
        if let Some(font_dict) = fonts.get(current_font.as_bytes()) {
            if let Ok(encoding) = font_dict.get_font_encoding(doc) {
                if let Ok(text) = Document::decode_text(&encoding, bytes) {
                    return Some(text);
                }
            }
        }

        // Fallback: try UTF-16BE then Latin-1
        if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
            let utf16: Vec<u16> = bytes[2..]
                .chunks_exact(2)
                .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
                .collect();
            return Some(String::from_utf16_lossy(&utf16));
        }

        Some(bytes.iter().map(|&b| b as char).collect())
    } else {
        None
    }
}

/// Group text items into lines.
///
/// Preserves PDF stream order (which is typically reading order) and only
/// merges consecutive items that sit on the same baseline of the same page.
pub fn group_into_lines(items: Vec<TextItem>) -> Vec<TextLine> {
    let mut lines: Vec<TextLine> = Vec::new();
    let y_tolerance = 3.0;

    for item in items {
        match lines.last_mut() {
            Some(last) if last.page == item.page && (last.y - item.y).abs() < y_tolerance => {
                last.items.push(item);
            }
            _ => {
                let y = item.y;
                let page = item.page;
                lines.push(TextLine {
                    items: vec![item],
                    y,
                    page,
                });
            }
        }
    }

    // Left to right within a line
    for line in &mut lines {
        line.items
            .sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
    }

    lines
}
