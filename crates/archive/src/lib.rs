//! Decodes a serialized web archive (a MIME multipart container bundling an
//! HTML resource with its sub-resources) into the primary HTML string.
//!
//! Sub-resources (images, CSS, scripts) are discarded; only the `text/html`
//! part is returned. Character-encoding handling is delegated to the MIME
//! parser, which honors a declared charset in the part header and otherwise
//! defaults to UTF-8.

mod error;

pub use error::ArchiveError;

/// The primary HTML resource decoded from an archive container, plus
/// whatever incidental metadata the same parse pass turned up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedArchive {
    /// The page's HTML text.
    pub html: String,
    /// `Content-Location` header on the html part, if the container declared
    /// one. This is a hint only; the caller-supplied capture URL remains
    /// authoritative.
    pub declared_url: Option<String>,
}

/// Decodes archive `bytes` into the primary page HTML.
///
/// Tries structured MIME parsing first. If the container has no `text/html`
/// part (or cannot be parsed as MIME at all), falls back to a best-effort
/// linear scan for a `Content-Type: text/html` part boundary. The fallback
/// never fails: it returns whatever text it located, which may be empty.
pub fn decode(bytes: &[u8]) -> Result<DecodedArchive, ArchiveError> {
    match decode_structured(bytes) {
        Ok(archive) => Ok(archive),
        Err(err) => {
            tracing::warn!(error = %err, "structured archive parse failed, using fallback scan");
            Ok(DecodedArchive {
                html: fallback_scan(bytes),
                declared_url: None,
            })
        }
    }
}

/// Structured-only decode path. Fails with [`ArchiveError::ArchiveMalformed`]
/// when the container has no `text/html` part.
fn decode_structured(bytes: &[u8]) -> Result<DecodedArchive, ArchiveError> {
    let message = mail_parser::MessageParser::default()
        .parse(bytes)
        .ok_or(ArchiveError::ArchiveMalformed)?;

    let html = message
        .html_body(0)
        .ok_or(ArchiveError::ArchiveMalformed)?
        .into_owned();

    let declared_url = message
        .header("Content-Location")
        .and_then(|v| v.as_text())
        .map(str::to_string);

    Ok(DecodedArchive { html, declared_url })
}

/// Best-effort scan for the first `Content-Type: text/html` part in a raw
/// multipart byte stream. Used only when structured parsing fails; never
/// panics, never returns an error.
fn fallback_scan(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let lower = text.to_ascii_lowercase();

    let Some(header_pos) = lower.find("content-type: text/html") else {
        return String::new();
    };

    // The part body starts after the first blank line following the header.
    let Some(blank_offset) = text[header_pos..].find("\r\n\r\n").map(|p| p + 4).or_else(|| {
        text[header_pos..].find("\n\n").map(|p| p + 2)
    }) else {
        return String::new();
    };
    let body_start = header_pos + blank_offset;

    // The part body ends at the next MIME boundary marker, if any.
    let body_end = text[body_start..]
        .find("\r\n--")
        .map(|p| body_start + p)
        .unwrap_or(text.len());

    text[body_start..body_end].trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn multipart_with_html(boundary: &str, html: &str) -> Vec<u8> {
        format!(
            "Content-Type: multipart/related; boundary=\"{boundary}\"\r\n\r\n\
             --{boundary}\r\n\
             Content-Type: text/html; charset=utf-8\r\n\
             Content-Location: https://example.com/page\r\n\r\n\
             {html}\r\n\
             --{boundary}--\r\n"
        )
        .into_bytes()
    }

    #[test]
    fn decodes_the_html_part_of_a_well_formed_container() {
        let bytes = multipart_with_html("BOUNDARY", "<html><body>hi</body></html>");
        let decoded = decode(&bytes).unwrap();
        assert!(decoded.html.contains("hi"));
    }

    #[test]
    fn fallback_never_errors_on_garbage_input() {
        let decoded = decode(b"not a mime container at all").unwrap();
        assert_eq!(decoded.html, "");
    }

    #[test]
    fn fallback_recovers_html_from_an_unparsable_but_html_shaped_blob() {
        let bytes = b"garbage preamble\r\nContent-Type: text/html\r\n\r\n<p>hello</p>\r\n--X--\r\n";
        let decoded = decode(bytes).unwrap();
        assert_eq!(decoded.html, "<p>hello</p>");
    }

    #[test]
    fn structured_decode_fails_without_an_html_part() {
        let bytes = b"Content-Type: text/plain\r\n\r\nplain text only";
        assert!(matches!(
            decode_structured(bytes),
            Err(ArchiveError::ArchiveMalformed)
        ));
    }
}
