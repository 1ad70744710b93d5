use serde_json::Value;

use crate::error::GenerationError;
use crate::files::FileTree;

/// Uniform access to the text of a model response.
///
/// Upstream clients disagree on shape: some expose the text as a plain field,
/// others behind a zero-argument accessor. Each client variant implements this
/// once and everything downstream only sees `extract_text`.
pub trait ExtractText {
    fn extract_text(&self) -> Option<String>;
}

/// Response whose text is a direct field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldText {
    pub text: Option<String>,
}

impl FieldText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    pub fn absent() -> Self {
        Self { text: None }
    }
}

impl ExtractText for FieldText {
    fn extract_text(&self) -> Option<String> {
        self.text.clone()
    }
}

/// Response whose text is produced by calling an accessor.
pub struct AccessorText<F>(pub F);

impl<F> ExtractText for AccessorText<F>
where
    F: Fn() -> Option<String>,
{
    fn extract_text(&self) -> Option<String> {
        (self.0)()
    }
}

impl<F> std::fmt::Debug for AccessorText<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessorText(..)")
    }
}

/// Extract the text of `response`, treating absent or blank text as [`GenerationError::UpstreamEmpty`].
pub fn require_text<R: ExtractText + ?Sized>(response: &R) -> Result<String, GenerationError> {
    match response.extract_text() {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(GenerationError::UpstreamEmpty),
    }
}

/// Strip markdown fences and leading commentary around a JSON document.
pub fn strip_fences(response: &str) -> String {
    let trimmed = response.trim();

    if trimmed.is_empty() {
        return String::new();
    }

    let mut text = trimmed.to_string();

    // Remove opening fence: ```json or ```
    if text.starts_with("```json") {
        text = text["```json".len()..].trim_start_matches('\n').to_string();
    } else if text.starts_with("```") {
        text = text["```".len()..].trim_start_matches('\n').to_string();
    }

    // Remove closing fence
    if text.ends_with("```") {
        text = text[..text.len() - "```".len()]
            .trim_end_matches('\n')
            .to_string();
    }

    // Drop commentary around the document itself
    if let Some(pos) = text.find('{') {
        if pos > 0 {
            text = text[pos..].to_string();
        }
    }
    if let Some(end) = text.rfind('}') {
        text.truncate(end + 1);
    }

    text.trim().to_string()
}

/// Read the `files` object out of a parsed document.
pub fn files_from_value(document: &Value) -> Result<FileTree, GenerationError> {
    let files = document
        .get("files")
        .filter(|files| files.is_object())
        .ok_or_else(|| GenerationError::SchemaError("JSON has no \"files\" object".to_string()))?;

    serde_json::from_value(files.clone())
        .map_err(|e| GenerationError::SchemaError(format!("Invalid file entry: {e}")))
}

/// Parse raw model text into a file tree overlay.
pub fn parse_code_document(text: &str) -> Result<FileTree, GenerationError> {
    let cleaned = strip_fences(text);
    let document: Value = serde_json::from_str(&cleaned)
        .map_err(|e| GenerationError::ParseError(format!("Model did not return valid JSON: {e}")))?;

    files_from_value(&document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::FileContent;
    use std::cell::Cell;

    #[test]
    fn test_field_text() {
        assert_eq!(require_text(&FieldText::new("hello")).unwrap(), "hello");
    }

    #[test]
    fn test_accessor_text() {
        let calls = Cell::new(0);
        let response = AccessorText(|| {
            calls.set(calls.get() + 1);
            Some("from accessor".to_string())
        });
        assert_eq!(require_text(&response).unwrap(), "from accessor");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_absent_text_is_upstream_empty() {
        assert_eq!(
            require_text(&FieldText::absent()),
            Err(GenerationError::UpstreamEmpty)
        );
        assert_eq!(
            require_text(&AccessorText(|| None)),
            Err(GenerationError::UpstreamEmpty)
        );
    }

    #[test]
    fn test_blank_text_is_upstream_empty() {
        assert_eq!(
            require_text(&FieldText::new("  \n")),
            Err(GenerationError::UpstreamEmpty)
        );
    }

    #[test]
    fn test_strip_fences_plain_json() {
        assert_eq!(strip_fences(r#"{"a":1}"#), r#"{"a":1}"#);
    }

    #[test]
    fn test_strip_fences_json_fence() {
        let response = "```json\n{\"files\":{}}\n```";
        assert_eq!(strip_fences(response), "{\"files\":{}}");
    }

    #[test]
    fn test_strip_fences_leading_commentary() {
        let response = "Here is your project:\n```json\n{\"files\":{}}\n```";
        assert_eq!(strip_fences(response), "{\"files\":{}}");
    }

    #[test]
    fn test_strip_fences_trailing_commentary() {
        let response = "```json\n{\"files\":{}}\n```\nLet me know if you need more.";
        assert_eq!(strip_fences(response), "{\"files\":{}}");
    }

    #[test]
    fn test_strip_fences_empty() {
        assert_eq!(strip_fences("   "), "");
    }

    #[test]
    fn test_parse_code_document() {
        let text = r#"{"projectTitle":"Buttons","files":{"/App.js":{"code":"export default 1"}}}"#;
        let files = parse_code_document(text).unwrap();
        assert_eq!(files["/App.js"], FileContent::new("export default 1"));
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_parse_code_document_not_json() {
        let err = parse_code_document("I could not do that, sorry").unwrap_err();
        assert!(matches!(err, GenerationError::ParseError(_)));
    }

    #[test]
    fn test_parse_code_document_missing_files() {
        let err = parse_code_document("{}").unwrap_err();
        assert_eq!(
            err,
            GenerationError::SchemaError("JSON has no \"files\" object".to_string())
        );
    }

    #[test]
    fn test_parse_code_document_files_wrong_type() {
        let err = parse_code_document(r#"{"files":["/App.js"]}"#).unwrap_err();
        assert!(matches!(err, GenerationError::SchemaError(_)));
    }

    #[test]
    fn test_parse_code_document_bad_entry() {
        let err = parse_code_document(r#"{"files":{"/App.js":"raw code"}}"#).unwrap_err();
        match err {
            GenerationError::SchemaError(msg) => assert!(msg.starts_with("Invalid file entry")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
