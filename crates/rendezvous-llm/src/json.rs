//! JSON extraction from model output.
//!
//! Models asked for JSON frequently wrap it in prose or a markdown code
//! block, or leave a trailing comma behind. [`extract_json`] tries several
//! recovery strategies in order before giving up:
//!
//! 1. The whole text as JSON.
//! 2. The contents of the first code block.
//! 3. The span from the first `{` to the last `}`.
//!
//! Each candidate is retried with trailing commas stripped.

use serde::de::DeserializeOwned;

use crate::error::LlmError;

/// Deserialize a `T` out of free-form model output.
///
/// # Errors
///
/// Returns [`LlmError::Parse`] if no strategy yields a valid `T`.
pub fn extract_json<T: DeserializeOwned>(raw: &str) -> Result<T, LlmError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LlmError::Parse("empty response".to_owned()));
    }

    let candidates = [
        Some(trimmed),
        extract_json_from_codeblock(trimmed),
        outermost_object(trimmed),
    ];

    // The whole response is tried first, so its error is the one reported.
    let mut first_error: Option<String> = None;
    for candidate in candidates.into_iter().flatten() {
        let error = match serde_json::from_str::<T>(candidate) {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        if let Ok(value) = serde_json::from_str::<T>(&strip_trailing_commas(candidate)) {
            return Ok(value);
        }
        first_error.get_or_insert_with(|| error.to_string());
    }

    Err(LlmError::Parse(
        first_error.unwrap_or_else(|| "no JSON object found".to_owned()),
    ))
}

/// Extract JSON content from a markdown code block.
fn extract_json_from_codeblock(text: &str) -> Option<&str> {
    // Look for ```json ... ``` or ``` ... ```
    let start = text
        .find("```json")
        .map(|i| after_fence_line(text, i, 7))
        .or_else(|| text.find("```").map(|i| after_fence_line(text, i, 3)))?;

    let remaining = text.get(start..)?;
    let end = remaining.find("```")?;
    remaining.get(..end).map(str::trim)
}

/// Byte offset of the line following a code fence that starts at `fence`.
fn after_fence_line(text: &str, fence: usize, tag_len: usize) -> usize {
    let after_tag = fence.checked_add(tag_len).unwrap_or(fence);
    text.get(after_tag..)
        .and_then(|s| s.find('\n'))
        .and_then(|nl| after_tag.checked_add(nl))
        .and_then(|pos| pos.checked_add(1))
        .unwrap_or(after_tag)
}

/// The span from the first `{` to the last `}` inclusive.
fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    text.get(start..=end)
}

/// Strip trailing commas before closing braces and brackets (common LLM error).
fn strip_trailing_commas(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == ',' {
            let rest: String = chars.clone().skip_while(|n| n.is_whitespace()).take(1).collect();
            if rest == "}" || rest == "]" {
                continue;
            }
        }
        result.push(c);
    }

    result
}
