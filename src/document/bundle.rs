//! Page bundle parsing
//!
//! A page bundle is itself a ZIP archive:
//!
//! | Entry | Contents |
//! |---|---|
//! | `metadata.json` | [`PageMetadata`] |
//! | `strokes.bin` | legacy stroke blob, see [`super::strokes`] |
//! | `text.json` | array of [`TextElement`] |
//! | `shapes.json` | array of [`Shape`] |
//! | `images/<id>.webp` | raw image bytes |
//!
//! Every entry is optional. A missing or undecodable entry leaves the
//! corresponding part of the page empty.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;

use super::error::{Result, TalyaError};
use super::strokes::parse_strokes;
use super::types::{PageMetadata, Shape, TalyaPage, TextElement};
use crate::archive::{ArchiveAccessor, ZipArchiveAccessor};

pub const METADATA_ENTRY: &str = "metadata.json";
pub const STROKES_ENTRY: &str = "strokes.bin";
pub const TEXT_ENTRY: &str = "text.json";
pub const SHAPES_ENTRY: &str = "shapes.json";
pub const IMAGES_PREFIX: &str = "images/";
const IMAGE_SUFFIX: &str = ".webp";

/// Parse a page bundle from its archive bytes
pub fn parse_page_bundle(bytes: Vec<u8>) -> Result<TalyaPage> {
    let archive = ZipArchiveAccessor::from_bytes(bytes)
        .map_err(|e| TalyaError::PageBundleOpenFailed(e.to_string()))?;
    Ok(parse_page_archive(&archive))
}

/// Build a page from an already opened bundle archive
pub fn parse_page_archive(archive: &dyn ArchiveAccessor) -> TalyaPage {
    let metadata: Option<PageMetadata> = read_json(archive, METADATA_ENTRY);

    let strokes = read_entry(archive, STROKES_ENTRY)
        .map(|data| parse_strokes(&data))
        .unwrap_or_default();

    let text_elements: Vec<TextElement> = read_json(archive, TEXT_ENTRY).unwrap_or_default();
    let shapes: Vec<Shape> = read_json(archive, SHAPES_ENTRY).unwrap_or_default();

    let mut images = BTreeMap::new();
    for entry in archive.entries_with_prefix(IMAGES_PREFIX) {
        let id = image_id(&entry.path);
        if id.is_empty() {
            continue;
        }
        match archive.extract(&entry) {
            Ok(data) => {
                images.insert(id.to_string(), data);
            }
            Err(e) => tracing::warn!(path = %entry.path, "Skipping unreadable image: {}", e),
        }
    }

    tracing::debug!(
        strokes = strokes.len(),
        text_elements = text_elements.len(),
        shapes = shapes.len(),
        images = images.len(),
        "Parsed page bundle"
    );

    TalyaPage::new(metadata, strokes, text_elements, images, shapes)
}

/// `images/cover.webp` -> `cover`
fn image_id(path: &str) -> &str {
    let name = path.strip_prefix(IMAGES_PREFIX).unwrap_or(path);
    name.strip_suffix(IMAGE_SUFFIX).unwrap_or(name)
}

fn read_entry(archive: &dyn ArchiveAccessor, path: &str) -> Option<Vec<u8>> {
    let entry = archive.entry(path)?;
    match archive.extract(&entry) {
        Ok(data) => Some(data),
        Err(e) => {
            tracing::warn!(path, "Skipping unreadable page entry: {}", e);
            None
        }
    }
}

fn read_json<T: DeserializeOwned>(archive: &dyn ArchiveAccessor, path: &str) -> Option<T> {
    let data = read_entry(archive, path)?;
    match serde_json::from_slice(&data) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(path, "Skipping malformed page entry: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::fixtures::{build_zip, sample_strokes};
    use crate::document::strokes::encode_strokes;

    #[test]
    fn test_full_bundle() {
        let strokes = sample_strokes(3);
        let stroke_bytes = encode_strokes(&strokes);
        let bytes = build_zip(&[
            (
                METADATA_ENTRY,
                br#"{"dimensions": {"width": 612, "height": 792}, "original_page": 4}"#,
            ),
            (STROKES_ENTRY, stroke_bytes.as_slice()),
            (
                TEXT_ENTRY,
                br#"[{"id": "t1", "text": "Hi", "position": [1, 2], "style": {"size": 12}}]"#,
            ),
            (
                SHAPES_ENTRY,
                br#"[{"id": "s1", "type": "line", "position": [0, 0], "dimensions": [5, 0]}]"#,
            ),
            ("images/fig1.webp", b"RIFF1"),
            ("images/fig2.webp", b"RIFF2"),
        ]);

        let page = parse_page_bundle(bytes).unwrap();
        let metadata = page.metadata().unwrap();
        assert_eq!(metadata.dimensions.width, 612.0);
        assert_eq!(metadata.original_page, Some(4));
        assert_eq!(page.strokes(), &strokes[..]);
        assert_eq!(page.text_elements()[0].text, "Hi");
        assert_eq!(page.shape("s1").unwrap().kind, "line");
        assert_eq!(page.image("fig1"), Some(&b"RIFF1"[..]));
        assert_eq!(page.images().len(), 2);
    }

    #[test]
    fn test_missing_entries_yield_empty_page() {
        let page = parse_page_bundle(build_zip(&[])).unwrap();
        assert!(page.is_empty());
        assert!(page.images().is_empty());
    }

    #[test]
    fn test_no_images_is_empty_map() {
        let bytes = build_zip(&[(
            METADATA_ENTRY,
            br#"{"dimensions": {"width": 100, "height": 100}}"#,
        )]);
        let page = parse_page_bundle(bytes).unwrap();
        assert!(page.images().is_empty());
        assert_eq!(page.metadata().unwrap().original_page, None);
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let strokes = sample_strokes(1);
        let stroke_bytes = encode_strokes(&strokes);
        let bytes = build_zip(&[
            (METADATA_ENTRY, b"{not json"),
            (TEXT_ENTRY, b"42"),
            (STROKES_ENTRY, stroke_bytes.as_slice()),
        ]);

        let page = parse_page_bundle(bytes).unwrap();
        assert!(page.metadata().is_none());
        assert!(page.text_elements().is_empty());
        assert_eq!(page.strokes().len(), 1);
    }

    #[test]
    fn test_not_an_archive() {
        let result = parse_page_bundle(b"garbage".to_vec());
        assert!(matches!(result, Err(TalyaError::PageBundleOpenFailed(_))));
    }

    #[test]
    fn test_image_id() {
        assert_eq!(image_id("images/cover.webp"), "cover");
        assert_eq!(image_id("images/raw.png"), "raw.png");
        assert_eq!(image_id("images/"), "");
    }
}
