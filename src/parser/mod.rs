pub mod blob;
pub mod literal;
pub mod state;

use tracing::debug;

use crate::error::ExtractionError;
use state::EmbeddedState;

/// Three-step pipeline: html → state literal text → parsed value → typed records.
pub fn extract_state(html: &str) -> Result<EmbeddedState, ExtractionError> {
    let blob = blob::locate_state_blob(html)?;
    debug!(bytes = blob.len(), "located embedded state");
    let value = literal::parse(blob)?;
    let state = state::classify(&value);
    debug!(records = state.records.len(), menus = state.menus().count(), "classified state");
    Ok(state)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractionFailure;

    #[test]
    fn fixture_page_has_menus() {
        let html = std::fs::read_to_string("tests/fixtures/menu_page.html").unwrap();
        let state = extract_state(&html).unwrap();
        assert_eq!(state.menus().count(), 2);
    }

    #[test]
    fn page_without_marker() {
        let err = extract_state("<html><script>window.__APOLLO__ = {};</script></html>").unwrap_err();
        assert_eq!(err.reason, ExtractionFailure::MarkerNotFound);
    }

    #[test]
    fn blob_that_is_code_fails_to_parse() {
        let html = "<script>window.__OO_STATE__ = {a: fetch('//evil')};</script>";
        let err = extract_state(html).unwrap_err();
        assert_eq!(err.reason, ExtractionFailure::ParseFailed);
        assert_eq!(err.to_string().split(':').next(), Some("could not extract embedded state (parse-failed)"));
    }
}
