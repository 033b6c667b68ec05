//! DOCX text extraction
//!
//! Reads `word/document.xml` out of the zip package. Text is assembled in two
//! passes: every non-empty top-level paragraph in document order, then every
//! non-empty table cell in row-major order, table by table. Tables are never
//! interleaved with the paragraphs that surround them.

use crate::error::IngestError;
use improver_domain::{DocumentFormat, ExtractedDocument};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use tracing::debug;
use zip::ZipArchive;

/// Backend name recorded in [`ExtractedDocument::extraction_method`]
pub const EXTRACTION_METHOD: &str = "docx-xml";

const DOCUMENT_PART: &str = "word/document.xml";
const CORE_PROPERTIES_PART: &str = "docProps/core.xml";

/// Paragraphs and table cells of a document body
#[derive(Debug, Default, PartialEq)]
pub struct DocxBody {
    /// Top-level paragraph texts, empty ones included
    pub paragraphs: Vec<String>,

    /// Table cell texts in table order, row-major
    pub cells: Vec<String>,
}

impl DocxBody {
    /// Join non-empty paragraphs, then non-empty cells
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .chain(self.cells.iter())
            .filter(|part| !part.trim().is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Number of paragraphs with visible text
    pub fn non_empty_paragraphs(&self) -> usize {
        self.paragraphs
            .iter()
            .filter(|p| !p.trim().is_empty())
            .count()
    }
}

/// Extract the text and metadata of a DOCX package held in memory
///
/// The returned text may be blank; [`crate::extract`] turns that into an error.
pub fn extract(bytes: &[u8]) -> Result<ExtractedDocument, IngestError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| IngestError::failed(DocumentFormat::Docx, format!("Not a DOCX package: {}", e)))?;

    let document_xml = read_part(&mut archive, DOCUMENT_PART)?
        .ok_or_else(|| IngestError::failed(DocumentFormat::Docx, "Missing word/document.xml"))?;
    let body = parse_document_xml(&document_xml)?;

    let (title, author) = match read_part(&mut archive, CORE_PROPERTIES_PART)? {
        Some(core_xml) => parse_core_properties(&core_xml)?,
        None => (None, None),
    };

    debug!(
        paragraphs = body.paragraphs.len(),
        cells = body.cells.len(),
        "Parsed DOCX body"
    );

    Ok(ExtractedDocument {
        text: body.text(),
        format: DocumentFormat::Docx,
        unit_count: body.non_empty_paragraphs(),
        title,
        author,
        extraction_method: EXTRACTION_METHOD.to_string(),
    })
}

fn read_part<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>, IngestError> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(IngestError::failed(DocumentFormat::Docx, e)),
    };

    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|e| IngestError::failed(DocumentFormat::Docx, format!("{}: {}", name, e)))?;
    Ok(Some(xml))
}

/// Split `word/document.xml` into top-level paragraphs and table cells
///
/// A cell's text is its paragraphs joined with `\n`. Tables nested inside a
/// cell are folded into that cell. Text boxes (`w:txbxContent`) are anchored
/// inside runs and are not part of the paragraph text; their content is
/// skipped.
pub fn parse_document_xml(xml: &str) -> Result<DocxBody, IngestError> {
    let mut reader = Reader::from_str(xml);
    let xml_error = |e: quick_xml::Error| IngestError::failed(DocumentFormat::Docx, e);

    let mut body = DocxBody::default();
    let mut table_depth = 0usize;
    let mut text_box_depth = 0usize;
    let mut run_depth = 0usize;
    let mut in_text_run = false;
    let mut paragraph = String::new();
    let mut cell: Vec<String> = Vec::new();

    loop {
        let event = reader.read_event().map_err(xml_error)?;

        if text_box_depth > 0 {
            match event {
                Event::Start(e) if e.name().as_ref() == b"w:txbxContent" => text_box_depth += 1,
                Event::End(e) if e.name().as_ref() == b"w:txbxContent" => text_box_depth -= 1,
                Event::Eof => break,
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"w:txbxContent" => text_box_depth = 1,
                b"w:tbl" => table_depth += 1,
                b"w:tc" if table_depth == 1 => cell.clear(),
                b"w:p" => paragraph.clear(),
                b"w:r" => run_depth += 1,
                b"w:t" => in_text_run = true,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                // Outside a run, w:tab is a tab-stop definition in w:pPr
                b"w:tab" if run_depth > 0 => paragraph.push('\t'),
                b"w:br" | b"w:cr" if run_depth > 0 => paragraph.push('\n'),
                b"w:p" if table_depth == 0 => body.paragraphs.push(String::new()),
                b"w:p" => cell.push(String::new()),
                _ => {}
            },
            Event::Text(e) if in_text_run => {
                paragraph.push_str(&e.unescape().map_err(xml_error)?);
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:r" => run_depth = run_depth.saturating_sub(1),
                b"w:p" => {
                    let text = std::mem::take(&mut paragraph);
                    if table_depth == 0 {
                        body.paragraphs.push(text);
                    } else {
                        cell.push(text);
                    }
                }
                b"w:tc" if table_depth == 1 => body.cells.push(cell.join("\n")),
                b"w:tbl" => table_depth = table_depth.saturating_sub(1),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(body)
}

/// Title and author from `docProps/core.xml`
pub fn parse_core_properties(xml: &str) -> Result<(Option<String>, Option<String>), IngestError> {
    let mut reader = Reader::from_str(xml);
    let xml_error = |e: quick_xml::Error| IngestError::failed(DocumentFormat::Docx, e);

    let mut title = None;
    let mut author = None;
    let mut current: Option<&'static str> = None;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => {
                current = match e.name().as_ref() {
                    b"dc:title" => Some("title"),
                    b"dc:creator" => Some("author"),
                    _ => None,
                };
            }
            Event::Text(e) => {
                let value = e.unescape().map_err(xml_error)?.trim().to_string();
                if value.is_empty() {
                    continue;
                }
                match current {
                    Some("title") => title = Some(value),
                    Some("author") => author = Some(value),
                    _ => {}
                }
            }
            Event::End(_) => current = None,
            Event::Eof => break,
            _ => {}
        }
    }

    Ok((title, author))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    const NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main""#;

    fn document_xml(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document {}><w:body>{}</w:body></w:document>"#,
            NS, body
        )
    }

    fn para(text: &str) -> String {
        format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", text)
    }

    fn table(rows: &[&[&str]]) -> String {
        let mut xml = String::from("<w:tbl>");
        for row in rows {
            xml.push_str("<w:tr>");
            for cell in row.iter() {
                xml.push_str(&format!("<w:tc>{}</w:tc>", para(cell)));
            }
            xml.push_str("</w:tr>");
        }
        xml.push_str("</w:tbl>");
        xml
    }

    fn build_docx(body: &str, core: Option<&str>) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(DOCUMENT_PART, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(document_xml(body).as_bytes()).unwrap();
        if let Some(core) = core {
            writer
                .start_file(CORE_PROPERTIES_PART, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(core.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_paragraphs_then_tables() {
        let body = format!(
            "{}{}{}",
            para("Intro"),
            table(&[&["Reagent", "Volume"], &["Buffer", "5 uL"]]),
            para("Closing")
        );
        let doc = extract(&build_docx(&body, None)).unwrap();

        assert_eq!(doc.text, "Intro\nClosing\nReagent\nVolume\nBuffer\n5 uL");
        assert_eq!(doc.unit_count, 2);
        assert_eq!(doc.format, DocumentFormat::Docx);
    }

    #[test]
    fn test_empty_paragraphs_are_skipped_and_not_counted() {
        let body = format!("{}<w:p/>{}{}", para("One"), para("   "), para("Two"));
        let doc = extract(&build_docx(&body, None)).unwrap();
        assert_eq!(doc.text, "One\nTwo");
        assert_eq!(doc.unit_count, 2);
    }

    #[test]
    fn test_runs_tabs_and_breaks() {
        let body = "<w:p><w:r><w:t>Mix</w:t></w:r><w:r><w:tab/><w:t xml:space=\"preserve\"> gently</w:t><w:br/><w:t>then spin</w:t></w:r></w:p>";
        let parsed = parse_document_xml(&document_xml(body)).unwrap();
        assert_eq!(parsed.paragraphs, vec!["Mix\t gently\nthen spin".to_string()]);
    }

    #[test]
    fn test_tab_stop_definitions_are_not_text() {
        let body = r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/><w:tab w:val="right" w:pos="9360"/></w:tabs></w:pPr><w:r><w:t>Mix reagents</w:t></w:r></w:p>"#;
        let parsed = parse_document_xml(&document_xml(body)).unwrap();
        assert_eq!(parsed.paragraphs, vec!["Mix reagents".to_string()]);
    }

    #[test]
    fn test_text_box_does_not_split_paragraph() {
        let body = concat!(
            "<w:p><w:r><w:t xml:space=\"preserve\">Before </w:t></w:r>",
            "<w:r><w:pict><v:shape><v:textbox><w:txbxContent>",
            "<w:p><w:r><w:t>Box</w:t></w:r></w:p>",
            "</w:txbxContent></v:textbox></v:shape></w:pict></w:r>",
            "<w:r><w:t>After</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>Next</w:t></w:r></w:p>",
        );
        let parsed = parse_document_xml(&document_xml(body)).unwrap();
        assert_eq!(
            parsed.paragraphs,
            vec!["Before After".to_string(), "Next".to_string()]
        );
    }

    #[test]
    fn test_cell_paragraph_join_ignores_serialization() {
        let self_closing = "<w:tbl><w:tr><w:tc><w:p><w:r><w:t>A</w:t></w:r></w:p><w:p/><w:p><w:r><w:t>B</w:t></w:r></w:p></w:tc></w:tr></w:tbl>";
        let open_close = "<w:tbl><w:tr><w:tc><w:p><w:r><w:t>A</w:t></w:r></w:p><w:p></w:p><w:p><w:r><w:t>B</w:t></w:r></w:p></w:tc></w:tr></w:tbl>";

        let a = parse_document_xml(&document_xml(self_closing)).unwrap();
        let b = parse_document_xml(&document_xml(open_close)).unwrap();
        assert_eq!(a.cells, vec!["A\n\nB".to_string()]);
        assert_eq!(a.cells, b.cells);
    }

    #[test]
    fn test_escaped_entities() {
        let parsed = parse_document_xml(&document_xml(&para("5 &lt; 10 &amp; pH"))).unwrap();
        assert_eq!(parsed.paragraphs[0], "5 < 10 & pH");
    }

    #[test]
    fn test_empty_cells_are_skipped() {
        let body = table(&[&["A", ""], &["", "D"]]);
        let doc = extract(&build_docx(&body, None)).unwrap();
        assert_eq!(doc.text, "A\nD");
        assert_eq!(doc.unit_count, 0);
    }

    #[test]
    fn test_only_empty_content_fails() {
        let body = format!("<w:p/>{}", table(&[&[""]]));
        let bytes = build_docx(&body, None);
        let result = crate::extract(&bytes, DocumentFormat::Docx);
        assert!(matches!(result, Err(IngestError::ExtractionFailed { .. })));
    }

    #[test]
    fn test_core_properties() {
        let core = r#"<?xml version="1.0" encoding="UTF-8"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <dc:title>Western Blot</dc:title>
  <dc:creator>Protein Core</dc:creator>
</cp:coreProperties>"#;
        let doc = extract(&build_docx(&para("Step"), Some(core))).unwrap();
        assert_eq!(doc.title.as_deref(), Some("Western Blot"));
        assert_eq!(doc.author.as_deref(), Some("Protein Core"));
    }

    #[test]
    fn test_not_a_zip_fails() {
        // Legacy binary .doc files land here
        let result = extract(b"\xD0\xCF\x11\xE0 legacy word file");
        assert!(matches!(result, Err(IngestError::ExtractionFailed { .. })));
    }

    #[test]
    fn test_zip_without_document_part_fails() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("readme.txt", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"hello").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        match extract(&bytes) {
            Err(IngestError::ExtractionFailed { reason, .. }) => {
                assert!(reason.contains("word/document.xml"))
            }
            other => panic!("expected ExtractionFailed, got {:?}", other),
        }
    }
}
