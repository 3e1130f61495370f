//! Text extraction for uploaded documents.
//!
//! PDFs go through `pdf-extract`, DOCX through `zip` + `quick-xml`
//! (`<w:t>` runs of `word/document.xml`). Every other media type is decoded
//! as UTF-8 with invalid sequences replaced, so Markdown, JSON and plain
//! text all work without a dedicated parser.
//!
//! Parsing runs on tokio's blocking pool; a panic inside a parser becomes
//! an extraction error for that document.

use async_trait::async_trait;
use std::io::Read;
use std::path::Path;

use ragdesk_core::error::{Error, Result};
use ragdesk_core::ingest::TextExtractor;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_TEXT: &str = "text/plain";

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// The extractor used by the CLI and the HTTP server.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentExtractor;

#[async_trait]
impl TextExtractor for DocumentExtractor {
    async fn extract(&self, bytes: &[u8], media_type: &str) -> Result<String> {
        let media_type = essence(media_type);
        if media_type != MIME_PDF && media_type != MIME_DOCX {
            return Ok(String::from_utf8_lossy(bytes).into_owned());
        }

        let bytes = bytes.to_vec();
        tokio::task::spawn_blocking(move || extract_text(&bytes, &media_type))
            .await
            .map_err(|e| Error::extraction(format!("extraction task failed: {}", e)))?
    }
}

/// Synchronous extraction by media type. Blocks for the whole parse.
pub fn extract_text(bytes: &[u8], media_type: &str) -> Result<String> {
    match essence(media_type).as_str() {
        MIME_PDF => extract_pdf(bytes),
        MIME_DOCX => extract_docx(bytes),
        _ => Ok(String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// Media type without parameters, lower-cased (`"Text/Plain; charset=utf-8"` → `"text/plain"`).
pub fn essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Guess a media type from a file extension.
pub fn media_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => MIME_PDF,
        "docx" => MIME_DOCX,
        "md" | "markdown" => "text/markdown",
        "json" => "application/json",
        "html" | "htm" => "text/html",
        "csv" => "text/csv",
        _ => MIME_TEXT,
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| Error::extraction(format!("PDF extraction failed: {}", e)))
}

fn ooxml_error(e: impl std::fmt::Display) -> Error {
    Error::extraction(format!("DOCX extraction failed: {}", e))
}

fn extract_docx(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(ooxml_error)?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| ooxml_error("word/document.xml not found"))?;

    let mut doc_xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut doc_xml)
        .map_err(ooxml_error)?;
    if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ooxml_error("word/document.xml exceeds size limit"));
    }

    paragraphs_text(&doc_xml)
}

/// Collect `<w:t>` text, one line per `<w:p>` paragraph.
fn paragraphs_text(xml: &[u8]) -> Result<String> {
    use quick_xml::events::Event;

    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::Text(te)) if in_text => {
                let text = te.unescape().map_err(ooxml_error)?;
                out.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_error(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(out.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx_with_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            let body: String = paragraphs
                .iter()
                .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
                .collect();
            let xml = format!(
                "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
                body
            );
            zip.write_all(xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf
    }

    #[test]
    fn docx_paragraphs_become_lines() {
        let bytes = docx_with_paragraphs(&["KYC norms &amp; updates", "Second paragraph"]);
        let text = extract_text(&bytes, MIME_DOCX).unwrap();
        assert_eq!(text, "KYC norms & updates\nSecond paragraph");
    }

    #[tokio::test]
    async fn docx_is_parsed_on_the_blocking_pool() {
        let bytes = docx_with_paragraphs(&["Repo rate unchanged"]);
        let text = DocumentExtractor.extract(&bytes, MIME_DOCX).await.unwrap();
        assert_eq!(text, "Repo rate unchanged");
    }

    #[tokio::test]
    async fn text_is_decoded_lossily() {
        let text = DocumentExtractor
            .extract(b"caf\xff notes", "text/plain; charset=utf-8")
            .await
            .unwrap();
        assert_eq!(text, "caf\u{fffd} notes");
    }

    #[tokio::test]
    async fn unknown_types_fall_back_to_utf8() {
        let text = DocumentExtractor
            .extract(b"{\"a\": 1}", "application/octet-stream")
            .await
            .unwrap();
        assert_eq!(text, "{\"a\": 1}");
    }

    #[tokio::test]
    async fn invalid_pdf_is_an_extraction_error() {
        let err = DocumentExtractor
            .extract(b"not a pdf", "Application/PDF")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
    }

    #[test]
    fn invalid_docx_is_an_extraction_error() {
        let err = extract_text(b"not a zip", MIME_DOCX).unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
    }

    #[test]
    fn media_type_from_extension() {
        assert_eq!(media_type_for_path(Path::new("a/B.PDF")), MIME_PDF);
        assert_eq!(media_type_for_path(Path::new("notes.md")), "text/markdown");
        assert_eq!(media_type_for_path(Path::new("README")), MIME_TEXT);
        assert_eq!(essence("Application/PDF ; x=y"), MIME_PDF);
    }
}
