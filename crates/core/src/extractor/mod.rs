//! Path -> (plain text, detected type, size) extraction (spec §4.2).
//!
//! `Extractor` is a trait object so the rest of the engine never depends on
//! which formats are compiled in. A `PlainTextExtractor` (txt/md) ships
//! unconditionally; PDF/DOCX/XLSX/PPTX live behind the `office` feature in
//! [`office`] — mirroring the teacher's own optional-dependency split
//! (`semantic` feature gating `fastembed`/`ort`).

#[cfg(feature = "office")]
pub mod office;

use crate::error::{CoreError, CoreResult};
use std::path::Path;

/// Result of a successful extraction.
#[derive(Clone, Debug)]
pub struct Extracted {
    pub text: String,
    pub file_type: String,
    pub size_bytes: u64,
}

/// Path -> plain text contract (spec §4.2). Implementations must not execute
/// file content — only read and decode it.
pub trait Extractor: Send + Sync {
    /// Extensions (lowercase, no dot) this extractor handles.
    fn extensions(&self) -> &[&str];

    /// Extract plain text from `path`. Callers are expected to have already
    /// checked the size cap; this is only about decoding.
    fn extract(&self, path: &Path) -> CoreResult<Extracted>;
}

/// Plain-text / Markdown extractor — reads bytes as UTF-8 (lossily).
pub struct PlainTextExtractor;

impl Extractor for PlainTextExtractor {
    fn extensions(&self) -> &[&str] {
        &["txt", "md", "markdown", "rst", "text"]
    }

    fn extract(&self, path: &Path) -> CoreResult<Extracted> {
        let bytes = std::fs::read(path)?;
        let size_bytes = bytes.len() as u64;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let file_type = extension_of(path).unwrap_or_else(|| "txt".to_string());
        Ok(Extracted { text, file_type, size_bytes })
    }
}

/// Registry of extractors keyed by extension, plus the shared policy checks
/// (size cap, content deny-list) that apply regardless of backend.
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn Extractor>>,
    max_file_size_bytes: u64,
}

impl ExtractorRegistry {
    /// Build the default registry: plain text always, office formats when
    /// the `office` feature is compiled in.
    pub fn default_for(max_file_size_bytes: u64) -> Self {
        let mut extractors: Vec<Box<dyn Extractor>> = vec![Box::new(PlainTextExtractor)];
        #[cfg(feature = "office")]
        extractors.extend(office::office_extractors());
        Self { extractors, max_file_size_bytes }
    }

    fn find(&self, ext: &str) -> Option<&dyn Extractor> {
        self.extractors.iter().find(|e| e.extensions().contains(&ext)).map(|b| b.as_ref())
    }

    /// Extract `path`, enforcing the size cap and content deny-list (spec §4.2).
    /// Recoverable failures (`UnsupportedType`, `TooLarge`, `ContentRejected`)
    /// are returned as `Err` for the caller (the scheduler) to count per-file
    /// rather than abort the whole task.
    pub fn extract(&self, path: &Path) -> CoreResult<Extracted> {
        let metadata = std::fs::metadata(path)?;
        let size_bytes = metadata.len();
        if size_bytes > self.max_file_size_bytes {
            return Err(CoreError::TooLarge { size_bytes, cap_bytes: self.max_file_size_bytes });
        }

        let ext = extension_of(path)
            .ok_or_else(|| CoreError::UnsupportedType("no extension".to_string()))?;
        let extractor = self
            .find(&ext)
            .ok_or_else(|| CoreError::UnsupportedType(ext.clone()))?;

        let extracted = extractor.extract(path)?;
        validate_content(&extracted.text)?;
        Ok(extracted)
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension().and_then(|e| e.to_str()).map(|s| s.to_lowercase())
}

/// Fixed deny-list checked against decoded text before indexing (spec §4.2,
/// SPEC_FULL §11 "Content deny-list"). Case-insensitive substring match —
/// deliberately simple, since this is a policy tripwire, not a sandbox.
const DENY_PATTERNS: &[&str] = &["<script", "javascript:", "<iframe", "onerror="];

fn validate_content(text: &str) -> CoreResult<()> {
    let lower = text.to_lowercase();
    for pattern in DENY_PATTERNS {
        if lower.contains(pattern) {
            return Err(CoreError::ContentRejected(format!("matched deny-list pattern {pattern:?}")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn plain_text_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "hello world").unwrap();

        let registry = ExtractorRegistry::default_for(1024 * 1024);
        let extracted = registry.extract(&path).unwrap();
        assert_eq!(extracted.text, "hello world");
        assert_eq!(extracted.file_type, "txt");
    }

    #[test]
    fn unsupported_extension_is_recoverable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.xyz");
        std::fs::write(&path, "hello").unwrap();

        let registry = ExtractorRegistry::default_for(1024 * 1024);
        let err = registry.extract(&path).unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedType(_)));
        assert!(err.is_recoverable_per_file());
    }

    #[test]
    fn oversized_file_is_too_large() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "x".repeat(100)).unwrap();

        let registry = ExtractorRegistry::default_for(10);
        let err = registry.extract(&path).unwrap_err();
        assert!(matches!(err, CoreError::TooLarge { .. }));
    }

    #[test]
    fn denied_content_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.md");
        std::fs::write(&path, "hello <script>alert(1)</script>").unwrap();

        let registry = ExtractorRegistry::default_for(1024 * 1024);
        let err = registry.extract(&path).unwrap_err();
        assert!(matches!(err, CoreError::ContentRejected(_)));
    }
}
