//! Template engine - renders generated documents from the template package

use crate::docx::package::{DocxPackage, CORE_PART, DOCUMENT_PART};
use crate::docx::xml::{part_text, rewrite_creator, rewrite_part};
use crate::error::SheetdocResult;
use std::path::Path;

/// One marker-to-content substitution applied to a render.
#[derive(Debug, Clone)]
pub struct Substitution {
    /// Literal text to locate in the template's paragraphs
    pub marker: String,
    /// Replacement paragraph content
    pub content: String,
    /// Paragraph style to apply; `None` keeps the template's style
    pub style: Option<String>,
}

/// A paragraph appended to the end of the document body.
#[derive(Debug, Clone)]
pub struct AppendParagraph {
    pub content: String,
    pub style: Option<String>,
}

/// Result of one render: packed document bytes plus the markers that
/// matched nothing. The caller decides whether unmatched markers are an
/// error (placeholder map) or a warning (instruction rows).
#[derive(Debug)]
pub struct RenderOutcome {
    pub bytes: Vec<u8>,
    pub unmatched: Vec<String>,
}

/// Loads the template .docx once and renders fresh copies from it.
/// The loaded package is never mutated: every render clones it.
pub struct TemplateEngine {
    package: DocxPackage,
}

impl TemplateEngine {
    pub fn load(path: &Path) -> SheetdocResult<Self> {
        Ok(TemplateEngine {
            package: DocxPackage::open(path)?,
        })
    }

    /// Render one document: apply the substitutions to the body and all
    /// header/footer parts, append paragraphs to the body, and stamp
    /// the author into the core properties.
    pub fn render(
        &self,
        subs: &[Substitution],
        appends: &[AppendParagraph],
        author: Option<&str>,
    ) -> SheetdocResult<RenderOutcome> {
        let mut package = self.package.clone();
        let mut totals = vec![0usize; subs.len()];

        for name in package.text_part_names() {
            let Some(xml) = package.part(&name) else {
                continue;
            };
            let part_appends = if name == DOCUMENT_PART { appends } else { &[] };
            let outcome = rewrite_part(xml, subs, part_appends)?;
            for (total, count) in totals.iter_mut().zip(&outcome.matches) {
                *total += count;
            }
            package.set_part(&name, outcome.xml);
        }

        if let Some(author) = author {
            if let Some(core) = package.part(CORE_PART) {
                let rewritten = rewrite_creator(core, author)?;
                package.set_part(CORE_PART, rewritten);
            }
        }

        let unmatched = subs
            .iter()
            .zip(&totals)
            .filter(|(_, total)| **total == 0)
            .map(|(sub, _)| sub.marker.clone())
            .collect();

        Ok(RenderOutcome {
            bytes: package.pack()?,
            unmatched,
        })
    }

    /// Markers from the list with no matching location in any text part.
    /// Used by `sheetdoc validate` before any document is generated.
    pub fn missing_markers(&self, markers: &[String]) -> SheetdocResult<Vec<String>> {
        let mut text = String::new();
        for name in self.package.text_part_names() {
            if let Some(xml) = self.package.part(&name) {
                text.push_str(&part_text(xml)?);
            }
        }
        Ok(markers
            .iter()
            .filter(|marker| !text.contains(marker.as_str()))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read, Write};
    use zip::write::SimpleFileOptions;
    use zip::{ZipArchive, ZipWriter};

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t>Dear {{CUSTOMER}}</w:t></w:r></w:p><w:p><w:r><w:t>Regards</w:t></w:r></w:p><w:sectPr/></w:body></w:document>"#;

    const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:hdr xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:p><w:r><w:t>{{CUSTOMER}} file</w:t></w:r></w:p></w:hdr>"#;

    const CORE: &str = r#"<?xml version="1.0"?><cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:creator>original</dc:creator></cp:coreProperties>"#;

    fn fixture_template(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("template.docx");
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        for (name, content) in [
            ("[Content_Types].xml", "<Types/>"),
            ("word/document.xml", DOCUMENT),
            ("word/header1.xml", HEADER),
            ("docProps/core.xml", CORE),
        ] {
            writer.start_file(name, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
        path
    }

    fn unzip_part(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let mut content = String::new();
        archive
            .by_name(name)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        content
    }

    fn customer_sub() -> Substitution {
        Substitution {
            marker: "{{CUSTOMER}}".to_string(),
            content: "Acme Corp".to_string(),
            style: None,
        }
    }

    #[test]
    fn render_substitutes_body_and_header() {
        let dir = tempfile::tempdir().unwrap();
        let engine = TemplateEngine::load(&fixture_template(dir.path())).unwrap();
        let outcome = engine.render(&[customer_sub()], &[], None).unwrap();
        assert!(outcome.unmatched.is_empty());

        let body = unzip_part(&outcome.bytes, "word/document.xml");
        assert!(body.contains(">Acme Corp</w:t>"));
        assert!(!body.contains("{{CUSTOMER}}"));
        let header = unzip_part(&outcome.bytes, "word/header1.xml");
        assert!(!header.contains("{{CUSTOMER}}"));
    }

    #[test]
    fn render_reports_unmatched_markers() {
        let dir = tempfile::tempdir().unwrap();
        let engine = TemplateEngine::load(&fixture_template(dir.path())).unwrap();
        let subs = [
            customer_sub(),
            Substitution {
                marker: "{{MISSING}}".to_string(),
                content: "x".to_string(),
                style: None,
            },
        ];
        let outcome = engine.render(&subs, &[], None).unwrap();
        assert_eq!(outcome.unmatched, vec!["{{MISSING}}".to_string()]);
    }

    #[test]
    fn render_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let engine = TemplateEngine::load(&fixture_template(dir.path())).unwrap();
        let first = engine.render(&[customer_sub()], &[], Some("tester")).unwrap();
        let second = engine.render(&[customer_sub()], &[], Some("tester")).unwrap();
        assert_eq!(first.bytes, second.bytes);
    }

    #[test]
    fn render_sets_author_in_core_properties() {
        let dir = tempfile::tempdir().unwrap();
        let engine = TemplateEngine::load(&fixture_template(dir.path())).unwrap();
        let outcome = engine.render(&[customer_sub()], &[], Some("ernst")).unwrap();
        let core = unzip_part(&outcome.bytes, "docProps/core.xml");
        assert!(core.contains("<dc:creator>ernst</dc:creator>"));
    }

    #[test]
    fn appends_only_touch_the_document_body() {
        let dir = tempfile::tempdir().unwrap();
        let engine = TemplateEngine::load(&fixture_template(dir.path())).unwrap();
        let appends = [AppendParagraph {
            content: "appendix".to_string(),
            style: None,
        }];
        let outcome = engine.render(&[], &appends, None).unwrap();
        assert!(unzip_part(&outcome.bytes, "word/document.xml").contains(">appendix<"));
        assert!(!unzip_part(&outcome.bytes, "word/header1.xml").contains("appendix"));
    }

    #[test]
    fn missing_markers_scans_all_text_parts() {
        let dir = tempfile::tempdir().unwrap();
        let engine = TemplateEngine::load(&fixture_template(dir.path())).unwrap();
        let markers = vec![
            "{{CUSTOMER}}".to_string(),
            "Regards".to_string(),
            "{{ABSENT}}".to_string(),
        ];
        let missing = engine.missing_markers(&markers).unwrap();
        assert_eq!(missing, vec!["{{ABSENT}}".to_string()]);
    }
}
