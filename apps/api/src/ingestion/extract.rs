//! Document extraction — converts an attachment blob into cleaned resume
//! text. Extension-dispatched: PDF text layer, DOCX OOXML runs, raw bytes
//! for everything else. Returns None (never an error) when there is nothing
//! usable; the caller falls back to the email body.

use std::io::{Cursor, Read};

use tracing::warn;

use crate::ingestion::mime::ExtractedAttachment;

/// Extensions treated as resume files, in the order they are tried.
const RESUME_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "txt", "rtf"];

/// True when the filename extension belongs to the accepted resume set.
pub fn is_resume_file(filename: &str) -> bool {
    match extension(filename) {
        Some(ext) => RESUME_EXTENSIONS.contains(&ext.as_str()),
        None => false,
    }
}

/// Picks the first attachment that looks like a resume.
pub fn find_resume_attachment(
    attachments: &[ExtractedAttachment],
) -> Option<&ExtractedAttachment> {
    attachments.iter().find(|a| is_resume_file(&a.filename))
}

/// Converts one attachment into cleaned text. None when the attachment has
/// no data, the format decode fails, or nothing printable survives cleaning.
pub fn extract_text(attachment: &ExtractedAttachment) -> Option<String> {
    let data = attachment.data.as_ref()?;
    if data.is_empty() {
        return None;
    }

    let raw = match extension(&attachment.filename).as_deref() {
        Some("pdf") => match pdf_extract::extract_text_from_mem(data) {
            Ok(text) => text,
            Err(e) => {
                warn!("PDF extraction failed for {}: {e}", attachment.filename);
                return None;
            }
        },
        Some("docx") => docx_text(data)?,
        // .doc, .txt, .rtf and unknown extensions: raw byte decode
        _ => String::from_utf8_lossy(data).into_owned(),
    };

    let cleaned = clean_text(&raw);
    (!cleaned.is_empty()).then_some(cleaned)
}

fn extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Pulls visible text runs (`<w:t>` elements) out of the OOXML main document
/// part. Deliberately schema-light: a resume's text content is all we need.
fn docx_text(data: &[u8]) -> Option<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data)).ok()?;
    let mut document = String::new();
    archive
        .by_name("word/document.xml")
        .ok()?
        .read_to_string(&mut document)
        .ok()?;

    let mut text = String::new();
    let mut rest = document.as_str();
    while let Some(start) = rest.find("<w:t") {
        rest = &rest[start..];
        // Only <w:t> itself, not <w:tbl>/<w:tc> and friends
        if !matches!(rest.as_bytes().get(4), Some(b'>') | Some(b' ') | Some(b'/')) {
            rest = &rest[4..];
            continue;
        }
        let open_end = rest.find('>')?;
        // Self-closing run carries no text
        if rest[..open_end].ends_with('/') {
            rest = &rest[open_end + 1..];
            continue;
        }
        rest = &rest[open_end + 1..];
        let close = rest.find("</w:t>")?;
        text.push_str(&unescape_xml(&rest[..close]));
        text.push(' ');
        rest = &rest[close..];
    }
    (!text.is_empty()).then_some(text)
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Collapses whitespace runs to single spaces, strips non-printable and
/// non-ASCII characters, trims. Also applied to email bodies used as
/// fallback resume text.
pub(crate) fn clean_text(text: &str) -> String {
    let ascii: String = text
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() {
                c
            } else {
                ' '
            }
        })
        .collect();
    ascii.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::io::Write;

    fn attachment(filename: &str, data: Option<&[u8]>) -> ExtractedAttachment {
        ExtractedAttachment {
            filename: filename.to_string(),
            mime_type: "application/octet-stream".to_string(),
            data: data.map(Bytes::copy_from_slice),
        }
    }

    fn docx_with_document_xml(xml: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("word/document.xml", zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_is_resume_file_accepted_extensions() {
        for name in [
            "resume.pdf",
            "Resume.DOCX",
            "cv.doc",
            "notes.txt",
            "old.rtf",
        ] {
            assert!(is_resume_file(name), "{name} should be a resume file");
        }
    }

    #[test]
    fn test_is_resume_file_rejects_others() {
        for name in ["photo.png", "archive.zip", "noextension", "script.exe"] {
            assert!(!is_resume_file(name), "{name} should not be a resume file");
        }
    }

    #[test]
    fn test_find_resume_attachment_picks_first_match() {
        let attachments = vec![
            attachment("photo.png", Some(b"png")),
            attachment("resume.pdf", Some(b"pdf")),
            attachment("other.docx", Some(b"docx")),
        ];
        let found = find_resume_attachment(&attachments).unwrap();
        assert_eq!(found.filename, "resume.pdf");
    }

    #[test]
    fn test_missing_data_returns_none() {
        assert_eq!(extract_text(&attachment("resume.pdf", None)), None);
    }

    #[test]
    fn test_zero_length_data_returns_none() {
        assert_eq!(extract_text(&attachment("resume.pdf", Some(b""))), None);
    }

    #[test]
    fn test_invalid_pdf_returns_none() {
        assert_eq!(
            extract_text(&attachment("resume.pdf", Some(b"not a pdf at all"))),
            None
        );
    }

    #[test]
    fn test_plain_text_attachment_is_cleaned() {
        let text = extract_text(&attachment(
            "resume.txt",
            Some("  Jane\tDoe\n\nRust   engineer\u{2013}since 2018  ".as_bytes()),
        ))
        .unwrap();
        assert_eq!(text, "Jane Doe Rust engineer since 2018");
    }

    #[test]
    fn test_docx_text_runs_extracted() {
        let bytes = docx_with_document_xml(
            r#"<?xml version="1.0"?><w:document><w:body>
                <w:p><w:r><w:t>Jane Doe</w:t></w:r></w:p>
                <w:p><w:r><w:t xml:space="preserve">Rust &amp; Postgres</w:t></w:r></w:p>
            </w:body></w:document>"#,
        );
        let text = extract_text(&attachment("resume.docx", Some(&bytes))).unwrap();
        assert_eq!(text, "Jane Doe Rust & Postgres");
    }

    #[test]
    fn test_corrupt_docx_returns_none() {
        assert_eq!(
            extract_text(&attachment("resume.docx", Some(b"not a zip"))),
            None
        );
    }

    #[test]
    fn test_clean_text_strips_non_ascii() {
        assert_eq!(clean_text("r\u{00e9}sum\u{00e9}  text"), "r sum text");
    }

    #[test]
    fn test_unknown_extension_decodes_raw_bytes() {
        let text = extract_text(&attachment("resume.rtf", Some(b"plain words here"))).unwrap();
        assert_eq!(text, "plain words here");
    }
}
