//! Document data model
//!
//! JSON-backed types mirror the snake_case keys written by the converter.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Archive-level structures
// ============================================================================

/// Document manifest (`manifest.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: i64,
    pub title: String,
    pub doc_id: String,
    /// Unix seconds
    pub created_at: f64,
    /// Unix seconds
    pub modified_at: f64,
    pub processing_mode: String,
    pub page_count: usize,
    pub original_file: String,
}

impl Manifest {
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        timestamp_to_utc(self.created_at)
    }

    pub fn modified_at_utc(&self) -> Option<DateTime<Utc>> {
        timestamp_to_utc(self.modified_at)
    }
}

fn timestamp_to_utc(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}

/// One row of `pages/index.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageIndexEntry {
    pub index: usize,
    /// Archive path of the page bundle
    pub filename: String,
    pub id: String,
    pub size: u64,
    pub checksum: String,
}

/// Optional full-text index (`search_index.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchIndex {
    pub statistics: SearchStatistics,
    pub word_index: HashMap<String, Vec<WordMatch>>,
    pub text_elements: HashMap<String, Vec<TextElementInfo>>,
}

impl SearchIndex {
    /// Matches for a word, trying the exact key before a case-insensitive scan
    pub fn lookup(&self, word: &str) -> &[WordMatch] {
        if let Some(matches) = self.word_index.get(word) {
            return matches;
        }
        let lowered = word.to_lowercase();
        self.word_index
            .iter()
            .find(|(key, _)| key.to_lowercase() == lowered)
            .map(|(_, matches)| matches.as_slice())
            .unwrap_or_default()
    }

    pub fn text_element(&self, element_id: &str) -> &[TextElementInfo] {
        self.text_elements
            .get(element_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStatistics {
    pub total_words: u64,
    pub unique_words: u64,
    pub total_text_elements: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordMatch {
    pub page_index: usize,
    pub element_id: String,
    #[serde(default)]
    pub word_position: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextElementInfo {
    pub id: String,
    pub text: String,
    pub position: Vec<f64>,
}

// ============================================================================
// Page bundle contents
// ============================================================================

/// `metadata.json` inside a page bundle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub dimensions: PageDimensions,
    #[serde(default)]
    pub original_page: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageDimensions {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextElement {
    #[serde(default)]
    pub id: Option<String>,
    pub text: String,
    pub position: Vec<f64>,
    pub style: TextStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    #[serde(default)]
    pub font: Option<String>,
    pub size: f64,
    #[serde(default)]
    pub color: Option<Vec<i64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub position: Vec<f64>,
    pub dimensions: Vec<f64>,
}

/// Ink stroke as stored in a page bundle's `strokes.bin`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stroke {
    /// Up to 36 bytes on the wire
    pub id: String,
    pub kind: u8,
    /// RGBA
    pub color: [u8; 4],
    pub width: f32,
    /// Unix seconds
    pub timestamp: f64,
    pub points: Vec<StrokePoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StrokePoint {
    /// Tenth-of-a-unit precision
    pub x: f32,
    pub y: f32,
    /// 0.0 to 1.0
    pub pressure: f32,
}

// ============================================================================
// Page
// ============================================================================

/// One decoded page
///
/// Built once per page load and immutable afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TalyaPage {
    metadata: Option<PageMetadata>,
    strokes: Vec<Stroke>,
    text_elements: Vec<TextElement>,
    images: BTreeMap<String, Vec<u8>>,
    shapes: Vec<Shape>,
    shape_ids: HashMap<String, usize>,
}

impl TalyaPage {
    pub fn new(
        metadata: Option<PageMetadata>,
        strokes: Vec<Stroke>,
        text_elements: Vec<TextElement>,
        images: BTreeMap<String, Vec<u8>>,
        shapes: Vec<Shape>,
    ) -> Self {
        // First occurrence wins for duplicate ids
        let mut shape_ids = HashMap::with_capacity(shapes.len());
        for (position, shape) in shapes.iter().enumerate() {
            shape_ids.entry(shape.id.clone()).or_insert(position);
        }

        Self {
            metadata,
            strokes,
            text_elements,
            images,
            shapes,
            shape_ids,
        }
    }

    pub fn metadata(&self) -> Option<&PageMetadata> {
        self.metadata.as_ref()
    }

    pub fn dimensions(&self) -> Option<PageDimensions> {
        self.metadata.map(|m| m.dimensions)
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn text_elements(&self) -> &[TextElement] {
        &self.text_elements
    }

    /// Raw image bytes keyed by image id
    pub fn images(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.images
    }

    pub fn image(&self, id: &str) -> Option<&[u8]> {
        self.images.get(id).map(Vec::as_slice)
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn shape(&self, id: &str) -> Option<&Shape> {
        self.shape_ids
            .get(id)
            .and_then(|&position| self.shapes.get(position))
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_none()
            && self.strokes.is_empty()
            && self.text_elements.is_empty()
            && self.images.is_empty()
            && self.shapes.is_empty()
    }
}
