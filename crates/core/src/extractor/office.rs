//! PDF/DOCX/XLSX/PPTX extraction (SPEC_FULL §11 "Pluggable extractor
//! registry"). DOCX/XLSX/PPTX share the Office-Open-XML zip container, so
//! one zip+quick-xml walker covers all three, differing only in which inner
//! XML part carries the visible text — grounded on `zip`+`quick-xml` usage
//! precedented in the retrieval pack (see DESIGN.md).

use super::{Extracted, Extractor};
use crate::error::{CoreError, CoreResult};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::io::Read;
use std::path::Path;

pub fn office_extractors() -> Vec<Box<dyn Extractor>> {
    vec![Box::new(PdfExtractor), Box::new(OoxmlExtractor)]
}

/// PDF text extraction via `pdf-extract`.
pub struct PdfExtractor;

impl Extractor for PdfExtractor {
    fn extensions(&self) -> &[&str] {
        &["pdf"]
    }

    fn extract(&self, path: &Path) -> CoreResult<Extracted> {
        let size_bytes = std::fs::metadata(path)?.len();
        let text = pdf_extract::extract_text(path)
            .map_err(|e| CoreError::ContentRejected(format!("pdf decode failed: {e}")))?;
        Ok(Extracted { text, file_type: "pdf".to_string(), size_bytes })
    }
}

/// DOCX/XLSX/PPTX extraction: each is a zip archive of XML parts; the part
/// holding visible text differs per format, but all are plain `<w:t>`/
/// `<t>`-style text runs readable with the same streaming XML walk.
pub struct OoxmlExtractor;

impl Extractor for OoxmlExtractor {
    fn extensions(&self) -> &[&str] {
        &["docx", "xlsx", "pptx"]
    }

    fn extract(&self, path: &Path) -> CoreResult<Extracted> {
        let size_bytes = std::fs::metadata(path)?.len();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        let file = std::fs::File::open(path)?;
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| CoreError::ContentRejected(format!("not a valid zip container: {e}")))?;

        let part_names = text_part_names(&ext, &mut archive)?;
        let mut text = String::new();
        for name in part_names {
            let Ok(mut entry) = archive.by_name(&name) else { continue };
            let mut xml = String::new();
            if entry.read_to_string(&mut xml).is_err() {
                continue;
            }
            extract_text_nodes(&xml, &mut text);
            text.push('\n');
        }

        if text.trim().is_empty() {
            return Err(CoreError::ContentRejected(format!("no extractable text in {ext} file")));
        }

        Ok(Extracted { text, file_type: ext, size_bytes })
    }
}

/// Which inner zip entries carry visible text, per format.
fn text_part_names(
    ext: &str,
    archive: &mut zip::ZipArchive<std::fs::File>,
) -> CoreResult<Vec<String>> {
    match ext {
        "docx" => Ok(vec!["word/document.xml".to_string()]),
        "pptx" => {
            let mut slides: Vec<String> = (0..archive.len())
                .filter_map(|i| archive.by_index(i).ok().map(|f| f.name().to_string()))
                .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
                .collect();
            slides.sort();
            Ok(slides)
        }
        "xlsx" => {
            let mut parts = vec!["xl/sharedStrings.xml".to_string()];
            let mut sheets: Vec<String> = (0..archive.len())
                .filter_map(|i| archive.by_index(i).ok().map(|f| f.name().to_string()))
                .filter(|n| n.starts_with("xl/worksheets/sheet") && n.ends_with(".xml"))
                .collect();
            sheets.sort();
            parts.extend(sheets);
            Ok(parts)
        }
        other => Err(CoreError::UnsupportedType(other.to_string())),
    }
}

/// Pull every text-node value out of an OOXML part. Word uses `<w:t>`,
/// spreadsheet shared strings use `<t>`, slides use `<a:t>` — all are plain
/// character-data children, so a generic "any `t`-suffixed element" walk
/// covers all three without per-schema parsing.
fn extract_text_nodes(xml: &str, out: &mut String) {
    let mut reader = Reader::from_str(xml);
    let mut in_text_el = false;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.name();
                let local = String::from_utf8_lossy(name.as_ref()).to_string();
                in_text_el = is_text_element(&local);
            }
            Ok(Event::Text(e)) => {
                if in_text_el {
                    if let Ok(decoded) = e.unescape() {
                        out.push_str(&decoded);
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                let local = String::from_utf8_lossy(name.as_ref()).to_string();
                if is_text_element(&local) {
                    in_text_el = false;
                    out.push(' ');
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
}

fn is_text_element(local_name: &str) -> bool {
    // Matches "t", "w:t", "a:t" — any element whose local part is exactly "t".
    local_name == "t" || local_name.ends_with(":t")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_plain_text_nodes_from_wordprocessing_xml() {
        let xml = r#"<w:document><w:body><w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:t>World</w:t></w:r></w:p></w:body></w:document>"#;
        let mut out = String::new();
        extract_text_nodes(xml, &mut out);
        assert!(out.contains("Hello"));
        assert!(out.contains("World"));
    }

    #[test]
    fn ignores_non_text_elements() {
        let xml = r#"<root><meta>skip-me</meta><t>keep-me</t></root>"#;
        let mut out = String::new();
        extract_text_nodes(xml, &mut out);
        assert!(!out.contains("skip-me"));
        assert!(out.contains("keep-me"));
    }
}
