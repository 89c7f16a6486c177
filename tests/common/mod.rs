//! Shared fixture builders for integration tests

#![allow(dead_code)]

use rust_xlsxwriter::Workbook;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/></Types>"#;

const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:pPr><w:pStyle w:val="Title"/></w:pPr><w:r><w:t>REPLACE_TITLE</w:t></w:r></w:p><w:p><w:r><w:t>Customer: {{CUSTOMER}}</w:t></w:r></w:p><w:p><w:r><w:t>City: {{CITY}}</w:t></w:r></w:p><w:p><w:r><w:t>Amount: {{AMOUNT}}</w:t></w:r></w:p><w:p><w:r><w:t>REPLACE_BODY</w:t></w:r></w:p><w:p><w:r><w:t>Kind regards</w:t></w:r></w:p><w:sectPr/></w:body></w:document>"#;

const CORE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:creator>template author</dc:creator><dc:title>Letter</dc:title></cp:coreProperties>"#;

/// Write the letter template .docx used across the integration tests.
pub fn write_template(dir: &Path) -> PathBuf {
    let path = dir.join("template.docx");
    let file = File::create(&path).unwrap();
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    for (name, content) in [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", RELS),
        ("word/document.xml", DOCUMENT),
        ("docProps/core.xml", CORE),
    ] {
        writer.start_file(name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
    path
}

/// Write an .xlsx workbook: one sheet, a header row, then the given
/// rows. Cells parsing as numbers are written as numbers.
pub fn write_workbook(dir: &Path, sheet: &str, header: &[&str], rows: &[Vec<&str>]) -> PathBuf {
    let path = dir.join("source.xlsx");
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet).unwrap();
    for (col, name) in header.iter().enumerate() {
        worksheet.write_string(0, col as u16, *name).unwrap();
    }
    for (row_idx, row) in rows.iter().enumerate() {
        for (col, cell) in row.iter().enumerate() {
            if cell.is_empty() {
                continue;
            }
            match cell.parse::<f64>() {
                Ok(number) => worksheet
                    .write_number((row_idx + 1) as u32, col as u16, number)
                    .unwrap(),
                Err(_) => worksheet
                    .write_string((row_idx + 1) as u32, col as u16, *cell)
                    .unwrap(),
            };
        }
    }
    workbook.save(&path).unwrap();
    path
}

/// The standard three-customer workbook for row-mode tests.
pub fn write_customer_workbook(dir: &Path) -> PathBuf {
    write_workbook(
        dir,
        "Content",
        &["Name", "City", "Amount"],
        &[
            vec!["Acme Corp", "Berlin", "1200.5"],
            vec!["Globex", "Hamburg", "300"],
            vec!["Initech", "Munich", "7"],
        ],
    )
}

/// Row-mode configuration over the standard template and workbook.
/// `extra_output` lines land in the `[output]` section; supplying a
/// `pattern` there overrides the default one.
pub fn row_mode_config(
    source: &Path,
    template: &Path,
    output_dir: &Path,
    extra_output: &str,
) -> String {
    let pattern_line = if extra_output.contains("pattern") {
        ""
    } else {
        "pattern = \"generatedDataFile{seq}_{date}_{time}.docx\""
    };
    format!(
        r#"[source]
path = "{source}"
worksheet = "Content"
key_columns = ["Name"]

[template]
path = "{template}"

[output]
directory = "{output}"
{pattern_line}
{extra_output}

[mapping]
bindings = [
    {{ column = "Name", placeholder = "{{{{CUSTOMER}}}}" }},
    {{ column = "City", placeholder = "{{{{CITY}}}}" }},
    {{ column = "Amount", placeholder = "{{{{AMOUNT}}}}" }},
]
"#,
        source = source.display(),
        template = template.display(),
        output = output_dir.display(),
        extra_output = extra_output,
    )
}

/// Read one part of a generated .docx back as a string.
pub fn read_part(path: &Path, part: &str) -> String {
    let file = File::open(path).unwrap();
    let mut archive = ZipArchive::new(file).unwrap();
    let mut content = String::new();
    archive
        .by_name(part)
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    content
}

/// Generated .docx files in a directory, sorted by name.
pub fn generated_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().map(|e| e == "docx").unwrap_or(false))
        .collect();
    files.sort();
    files
}
