use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ExtractionError, ExtractionFailure};

/// Global the ordering page assigns its serialized state to.
pub const STATE_MARKER: &str = "window.__OO_STATE__";

static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"{}\s*=\s*", regex::escape(STATE_MARKER))).unwrap());

/// Locate the object literal assigned to [`STATE_MARKER`] and return its text,
/// from the opening `{` through the matching `}`.
///
/// The end is found by brace depth, not by pattern: quoted strings (all three
/// quote styles, with escapes) and comments are skipped, so braces or `};`
/// inside string values never end the blob early. No part of the document is
/// trusted to be free of such content.
pub fn locate_state_blob(html: &str) -> Result<&str, ExtractionError> {
    for m in MARKER_RE.find_iter(html) {
        if !html[m.end()..].starts_with('{') {
            continue;
        }
        let start = m.end();
        let end = matching_brace(html, start)?;
        return Ok(&html[start..=end]);
    }

    Err(ExtractionError::new(ExtractionFailure::MarkerNotFound))
}

/// Byte index of the `}` closing the `{` at `open`.
fn matching_brace(src: &str, open: usize) -> Result<usize, ExtractionError> {
    let bytes = src.as_bytes();
    let unbalanced = || ExtractionError::new(ExtractionFailure::UnbalancedBraces);
    let mut depth = 0usize;
    let mut i = open;

    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            quote @ (b'"' | b'\'' | b'`') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                if i >= bytes.len() {
                    return Err(unbalanced());
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => match src[i + 2..].find("*/") {
                Some(off) => i += 2 + off + 1,
                None => return Err(unbalanced()),
            },
            // the script element ended before the literal did
            b'<' if src[i..].starts_with("</script") => return Err(unbalanced()),
            _ => {}
        }
        i += 1;
    }

    Err(unbalanced())
}
