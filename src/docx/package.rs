//! Docx package access
//!
//! A .docx file is a zip archive of XML parts. The package keeps every
//! part's bytes in memory in archive order so a generation can swap the
//! rewritten parts and repack without touching anything else (styles,
//! numbering, images, relationships all pass through untouched).

use crate::error::{SheetdocError, SheetdocResult};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Main document part, always present in a well-formed .docx
pub const DOCUMENT_PART: &str = "word/document.xml";

/// Core properties part carrying author/title metadata
pub const CORE_PART: &str = "docProps/core.xml";

#[derive(Debug, Clone)]
pub struct DocxPackage {
    names: Vec<String>,
    parts: HashMap<String, Vec<u8>>,
}

impl DocxPackage {
    /// Read every part of the archive into memory.
    pub fn open(path: &Path) -> SheetdocResult<Self> {
        let file = File::open(path).map_err(|e| {
            SheetdocError::Template(format!(
                "Failed to open template '{}': {}",
                path.display(),
                e
            ))
        })?;
        let mut archive = ZipArchive::new(BufReader::new(file)).map_err(|e| {
            SheetdocError::Template(format!(
                "Template '{}' is not a readable zip archive: {}",
                path.display(),
                e
            ))
        })?;

        let mut names = Vec::with_capacity(archive.len());
        let mut parts = HashMap::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(|e| {
                SheetdocError::Template(format!(
                    "Failed to read template '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut bytes).map_err(|e| {
                SheetdocError::Template(format!(
                    "Failed to read part '{}' of template '{}': {}",
                    name,
                    path.display(),
                    e
                ))
            })?;
            names.push(name.clone());
            parts.insert(name, bytes);
        }

        if !parts.contains_key(DOCUMENT_PART) {
            return Err(SheetdocError::Template(format!(
                "Template '{}' has no {} part; is it a .docx document?",
                path.display(),
                DOCUMENT_PART
            )));
        }

        Ok(DocxPackage { names, parts })
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts.get(name).map(Vec::as_slice)
    }

    /// Replace an existing part's bytes. Unknown names are ignored:
    /// the archive's entry list is fixed at open time.
    pub fn set_part(&mut self, name: &str, bytes: Vec<u8>) {
        if let Some(slot) = self.parts.get_mut(name) {
            *slot = bytes;
        }
    }

    /// Parts holding visible paragraph text: the document body plus
    /// every header and footer part (covers body text, tables, headers
    /// and footers, since tables live inside these parts).
    pub fn text_part_names(&self) -> Vec<String> {
        self.names
            .iter()
            .filter(|name| {
                name.as_str() == DOCUMENT_PART
                    || (name.starts_with("word/header") && name.ends_with(".xml"))
                    || (name.starts_with("word/footer") && name.ends_with(".xml"))
            })
            .cloned()
            .collect()
    }

    /// Repack all parts into .docx bytes, preserving archive order.
    pub fn pack(&self) -> SheetdocResult<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for name in &self.names {
            let bytes = &self.parts[name];
            writer
                .start_file(name.as_str(), options)
                .and_then(|()| writer.write_all(bytes).map_err(Into::into))
                .map_err(|e| {
                    SheetdocError::Template(format!("Failed to pack part '{}': {}", name, e))
                })?;
        }
        let cursor = writer
            .finish()
            .map_err(|e| SheetdocError::Template(format!("Failed to finish document: {}", e)))?;
        Ok(cursor.into_inner())
    }
}
