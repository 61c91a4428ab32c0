use acn_logging::acn_warn;

use crate::message::Message;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SemanticSearchError {
    #[error("missing API key for semantic search")]
    MissingApiKey,
}

/// Placeholder for model-assisted search over the outline.
///
/// Returns the ids of matching messages. No backend is wired up, so a valid
/// request logs a warning and matches nothing.
pub fn semantic_search(
    query: &str,
    messages: &[Message],
    api_key: Option<&str>,
) -> Result<Vec<String>, SemanticSearchError> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(Vec::new());
    }
    if api_key.map_or(true, |key| key.trim().is_empty()) {
        return Err(SemanticSearchError::MissingApiKey);
    }
    acn_warn!(
        "semantic search is not implemented (query_len={}, messages={})",
        query.len(),
        messages.len()
    );
    Ok(Vec::new())
}
