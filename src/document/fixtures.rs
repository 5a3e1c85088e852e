//! In-memory archive fixtures for tests

use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::strokes::encode_strokes;
use super::types::{Stroke, StrokePoint};
use crate::archive::{ArchiveAccessor, ArchiveEntry, ArchiveResult, ZipArchiveAccessor};

pub fn build_zip(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, data) in files {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub fn sample_strokes(count: usize) -> Vec<Stroke> {
    (0..count)
        .map(|i| Stroke {
            id: format!("stroke-{i}"),
            kind: 0,
            color: [0, 0, 255, 255],
            width: 1.5,
            timestamp: 1_700_000_000.0 + i as f64,
            points: (0..4)
                .map(|j| StrokePoint {
                    x: (i * 10 + j) as f32,
                    y: 50.0 + j as f32 * 0.5,
                    pressure: 1.0,
                })
                .collect(),
        })
        .collect()
}

pub fn manifest_json(page_count: usize) -> String {
    format!(
        r#"{{
            "version": 1,
            "title": "Fixture",
            "doc_id": "abc123",
            "created_at": 1700000000.0,
            "modified_at": 1700000000.0,
            "processing_mode": "vector",
            "page_count": {page_count},
            "original_file": "fixture.pdf"
        }}"#
    )
}

/// Page bundle with `stroke_count` strokes, one text element and one image
pub fn page_bundle(page: usize, stroke_count: usize) -> Vec<u8> {
    let strokes = encode_strokes(&sample_strokes(stroke_count));
    let metadata = format!(
        r#"{{"dimensions": {{"width": 612, "height": 792}}, "original_page": {page}}}"#
    );
    let text = format!(
        r#"[{{"id": "p{page}-t0", "text": "page {page}", "position": [72, 72], "style": {{"size": 12}}}}]"#
    );
    let image = format!("image-{page}");
    let image_path = format!("images/img{page}.webp");

    build_zip(&[
        ("metadata.json", metadata.as_bytes()),
        ("strokes.bin", strokes.as_slice()),
        ("text.json", text.as_bytes()),
        (image_path.as_str(), image.as_bytes()),
    ])
}

/// Document whose page `i` carries `i + 1` strokes
pub fn document_bytes(page_count: usize) -> Vec<u8> {
    let manifest = manifest_json(page_count);
    let bundles: Vec<(String, Vec<u8>)> = (0..page_count)
        .map(|i| (format!("pages/page_{i:04}.talyapage"), page_bundle(i, i + 1)))
        .collect();

    let index: Vec<String> = bundles
        .iter()
        .enumerate()
        .map(|(i, (name, data))| {
            format!(
                r#"{{"index": {i}, "filename": "{name}", "id": "page-{i}", "size": {}, "checksum": ""}}"#,
                data.len()
            )
        })
        .collect();
    let index = format!("[{}]", index.join(","));

    let mut files: Vec<(&str, &[u8])> = vec![
        ("manifest.json", manifest.as_bytes()),
        ("pages/index.json", index.as_bytes()),
    ];
    for (name, data) in &bundles {
        files.push((name.as_str(), data.as_slice()));
    }
    build_zip(&files)
}

/// Wraps an accessor, counts extractions and can slow them down
pub struct CountingAccessor {
    inner: ZipArchiveAccessor,
    extracts: AtomicUsize,
    delay_ms: AtomicU64,
}

impl CountingAccessor {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            inner: ZipArchiveAccessor::from_bytes(bytes).unwrap(),
            extracts: AtomicUsize::new(0),
            delay_ms: AtomicU64::new(0),
        }
    }

    /// Sleep this long inside every subsequent extraction
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn extract_count(&self) -> usize {
        self.extracts.load(Ordering::SeqCst)
    }
}

impl ArchiveAccessor for CountingAccessor {
    fn entry(&self, path: &str) -> Option<ArchiveEntry> {
        self.inner.entry(path)
    }

    fn extract(&self, entry: &ArchiveEntry) -> ArchiveResult<Vec<u8>> {
        self.extracts.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay));
        }
        self.inner.extract(entry)
    }

    fn entries_with_prefix(&self, prefix: &str) -> Vec<ArchiveEntry> {
        self.inner.entries_with_prefix(prefix)
    }
}
