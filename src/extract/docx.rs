//! DOCX text extraction.
//!
//! A DOCX file is a zip container; the body lives in `word/document.xml` as
//! WordprocessingML. Text sits in `t` runs grouped into `p` paragraphs.
//! Elements are matched by local name since the namespace prefix is chosen
//! by the producer (`w:` by convention only).

use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::Event;

use super::kind::DocumentKind;
use super::provider::ExtractionError;

const DOCUMENT_PART: &str = "word/document.xml";

/// Upper bound on the decompressed size of `word/document.xml`.
const MAX_DOCUMENT_XML_BYTES: u64 = 64 * 1024 * 1024;

fn malformed(e: impl std::fmt::Display) -> ExtractionError {
    ExtractionError::Malformed {
        kind: DocumentKind::Docx,
        reason: e.to_string(),
    }
}

/// Extract paragraph text from a DOCX file held in memory.
pub(super) fn extract_text(data: &[u8]) -> Result<String, ExtractionError> {
    extract_text_with_limit(data, MAX_DOCUMENT_XML_BYTES)
}

fn extract_text_with_limit(data: &[u8], limit: u64) -> Result<String, ExtractionError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data)).map_err(malformed)?;
    let part = archive.by_name(DOCUMENT_PART).map_err(malformed)?;

    // One extra byte tells a part of exactly `limit` bytes from a larger one.
    let mut raw = Vec::new();
    part.take(limit + 1).read_to_end(&mut raw)?;
    if raw.len() as u64 > limit {
        return Err(malformed(format!(
            "{DOCUMENT_PART} exceeds {limit} bytes when decompressed"
        )));
    }

    let xml = String::from_utf8(raw).map_err(malformed)?;
    parse_document_xml(&xml)
}

fn parse_document_xml(xml: &str) -> Result<String, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_run_text = false;

    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_run_text = true,
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_run_text = false,
                b"p" => text.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" => text.push('\t'),
                b"br" | b"cr" | b"p" => text.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_run_text => text.push_str(&t.decode().map_err(malformed)?),
            Event::GeneralRef(r) if in_run_text => {
                if let Some(ch) = r.resolve_char_ref().map_err(malformed)? {
                    text.push(ch);
                } else {
                    let name = r.decode().map_err(malformed)?;
                    let value = resolve_predefined_entity(&name)
                        .ok_or_else(|| malformed(format!("unknown entity &{name};")))?;
                    text.push_str(value);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text.trim_end().to_string())
}
