//! Wire envelope for Gemini streaming frames.

use serde::Deserialize;
use serde_json::Value as JsonValue;

/// One streamed generation response chunk.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// Response candidates; only the first is consumed.
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Usage counters; authoritative only on the final frame.
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
}

/// One response candidate.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Generated content so far.
    #[serde(default)]
    pub content: Option<CandidateContent>,
    /// Raw finish indicator; present only on the final frame.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Candidate content container.
#[derive(Debug, Clone, Deserialize)]
pub struct CandidateContent {
    /// Content parts.
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// One content part.
///
/// Gemini parts are objects with exactly one populated field; fields this
/// client does not consume are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Part {
    /// Cumulative text produced so far.
    #[serde(default)]
    pub text: Option<String>,
    /// A complete, non-incremental tool invocation.
    #[serde(default, rename = "functionCall")]
    pub function_call: Option<FunctionCall>,
}

/// A complete function/tool call.
#[derive(Debug, Clone, Deserialize)]
pub struct FunctionCall {
    /// Tool name.
    pub name: String,
    /// Full argument object.
    #[serde(default)]
    pub args: JsonValue,
}

/// Token usage counters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    /// Prompt-side token count.
    #[serde(default)]
    pub prompt_token_count: u64,
    /// Completion-side token count.
    #[serde(default)]
    pub candidates_token_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_chunk() {
        let json = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello"}]}}]}"#;
        let chunk: GenerateContentResponse = serde_json::from_str(json).unwrap();
        let part = &chunk.candidates[0].content.as_ref().unwrap().parts[0];
        assert_eq!(part.text.as_deref(), Some("Hello"));
    }

    #[test]
    fn test_parse_function_call_chunk() {
        let json = r#"{"candidates":[{"content":{"parts":[{"functionCall":{"name":"search","args":{"q":"rust"}}}]},"finishReason":"STOP"}],"usageMetadata":{"promptTokenCount":12,"candidatesTokenCount":3}}"#;
        let chunk: GenerateContentResponse = serde_json::from_str(json).unwrap();
        let candidate = &chunk.candidates[0];
        let call = candidate.content.as_ref().unwrap().parts[0]
            .function_call
            .as_ref()
            .unwrap();
        assert_eq!(call.name, "search");
        assert_eq!(candidate.finish_reason.as_deref(), Some("STOP"));
        assert_eq!(chunk.usage_metadata.unwrap().prompt_token_count, 12);
    }
}
