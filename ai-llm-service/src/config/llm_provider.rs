use std::str::FromStr;

use crate::error_handler::ConfigError;

/// Backend used for chat completions or embeddings.
///
/// Parsed from `LLM_KIND` (`openai` or `ollama`, case-insensitive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmProvider {
    /// Local or self-hosted Ollama runtime.
    Ollama,
    /// OpenAI REST API (or any compatible gateway).
    OpenAI,
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "chatgpt" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}
