use serde::Deserialize;

use crate::transcript::Message;

/// Default suffix for conversational replies.
pub const CHAT_PROMPT: &str = "\
You are an AI assistant experienced in React development.
GUIDELINES:
- Tell the user what you are building.
- Keep the response under 15 lines.
- Skip code examples and commentary.";

/// Default suffix for file tree generation.
pub const CODE_GEN_PROMPT: &str = r#"
Generate a React project using Vite and Tailwind CSS for styling.
Create a separate file for each component and organize them in folders.
Use lucide-react icons only when they add clarity.
Return the response as a single JSON object and nothing else, in this schema:
{
  "projectTitle": "",
  "explanation": "",
  "files": {
    "/App.js": {
      "code": ""
    }
  },
  "generatedFiles": []
}
Every key of "files" is an absolute project path and every value has exactly one "code" string."#;

/// Prompt suffixes appended after the serialized transcript.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PromptTemplates {
    pub chat_prompt: String,
    pub code_prompt: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            chat_prompt: CHAT_PROMPT.to_string(),
            code_prompt: CODE_GEN_PROMPT.to_string(),
        }
    }
}

impl PromptTemplates {
    /// Parse a TOML document with optional `chat_prompt` / `code_prompt` keys.
    ///
    /// Missing keys keep their default value.
    pub fn from_toml_str(source: &str) -> Result<Self, String> {
        toml::from_str(source).map_err(|e| format!("Invalid prompt templates: {e}"))
    }
}

/// Serialize the transcript as JSON and append the prompt suffix.
pub fn build_prompt(messages: &[Message], suffix: &str) -> String {
    let transcript = serde_json::to_string(messages).unwrap_or_else(|_| "[]".to_string());
    format!("{transcript} {suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_prompt_serializes_transcript() {
        let messages = vec![Message::user("add a button")];
        let prompt = build_prompt(&messages, "SUFFIX");
        assert_eq!(
            prompt,
            r#"[{"role":"user","content":"add a button"}] SUFFIX"#
        );
    }

    #[test]
    fn test_build_prompt_empty_transcript() {
        assert_eq!(build_prompt(&[], "go"), "[] go");
    }

    #[test]
    fn test_build_prompt_escapes_content() {
        let messages = vec![Message::user("say \"hi\"\nthen leave")];
        let prompt = build_prompt(&messages, "");
        assert!(prompt.contains(r#"say \"hi\"\nthen leave"#));
    }

    #[test]
    fn test_templates_from_toml_partial() {
        let templates = PromptTemplates::from_toml_str("chat_prompt = \"be brief\"").unwrap();
        assert_eq!(templates.chat_prompt, "be brief");
        assert_eq!(templates.code_prompt, CODE_GEN_PROMPT);
    }

    #[test]
    fn test_templates_from_toml_invalid() {
        let err = PromptTemplates::from_toml_str("chat_prompt = ").unwrap_err();
        assert!(err.starts_with("Invalid prompt templates"));
    }

    #[test]
    fn test_default_code_prompt_mentions_files() {
        assert!(PromptTemplates::default().code_prompt.contains("\"files\""));
    }
}
