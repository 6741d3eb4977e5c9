//! Document text extraction dispatched on file extension
//!
//! Plain-text formats are read directly; PDF goes through `pdf-extract`,
//! and DOCX is unpacked from its OOXML archive with `zip` + `quick-xml`.
//! Every failure surfaces as an [`FitragError::Ingestion`] so a bad file
//! never takes down a batch.

use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::errors::FitragError;
use crate::errors::Result;

/// Decompression cap for a single archive entry, as zip-bomb protection
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Read a knowledge document and return its plain text.
///
/// Supported extensions: `.txt`, `.md` (UTF-8 text), `.pdf`, `.docx`.
/// Unsupported extensions, unreadable archives, and empty extractions all
/// yield an ingestion error.
pub fn read_document(path: &Path) -> Result<String> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    debug!("Reading document {} ({extension})", path.display());

    let text = match extension.as_str() {
        "txt" | "md" => std::fs::read_to_string(path)?,
        "pdf" => extract_pdf(&std::fs::read(path)?)?,
        "docx" => extract_docx(&std::fs::read(path)?)?,
        other => {
            return Err(FitragError::Ingestion(format!(
                "unsupported file extension {:?} for {}",
                other,
                path.display()
            )))
        }
    };

    if text.trim().is_empty() {
        return Err(FitragError::Ingestion(format!(
            "no text extracted from {}",
            path.display()
        )));
    }

    Ok(text)
}

fn extract_pdf(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| FitragError::Ingestion(format!("PDF extraction failed: {e}")))
}

/// Pull the `w:t` text runs out of `word/document.xml`, inserting a line
/// break per paragraph so downstream chunking sees the document structure
fn extract_docx(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| FitragError::Ingestion(format!("DOCX is not a readable archive: {e}")))?;

    let entry = archive
        .by_name("word/document.xml")
        .map_err(|e| FitragError::Ingestion(format!("word/document.xml missing: {e}")))?;

    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| FitragError::Ingestion(format!("DOCX read failed: {e}")))?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(FitragError::Ingestion(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }

    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text_run = true;
                }
            }
            Ok(quick_xml::events::Event::Text(t)) if in_text_run => {
                out.push_str(t.unescape().unwrap_or_default().as_ref());
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                // paragraph end becomes a paragraph break in the plain text
                b"p" => out.push_str("\n\n"),
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => {
                return Err(FitragError::Ingestion(format!(
                    "DOCX XML parse failed: {e}"
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}
