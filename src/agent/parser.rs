//! Response parsing for model outputs.
//!
//! The model is asked to wrap its query in a ```sql code block; this
//! module pulls that block out of whatever prose surrounds it.

/// Extracts a SQL query from a model response.
///
/// Looks for ```sql blocks first, then bare ``` blocks. The first match
/// wins. Returns None when the response carries no code block, which the
/// caller treats as a plain-text answer.
pub fn extract_sql(response: &str) -> Option<String> {
    if let Some(sql) = extract_code_block(response, "sql") {
        return Some(sql.trim().to_string());
    }

    extract_code_block(response, "").map(|sql| sql.trim().to_string())
}

/// Extracts content from a markdown code block with the specified language.
///
/// Pass an empty string for `lang` to match blocks without a language
/// specifier.
fn extract_code_block(text: &str, lang: &str) -> Option<String> {
    let start_pattern = if lang.is_empty() {
        "```".to_string()
    } else {
        format!("```{}", lang)
    };

    let start_idx = text.find(&start_pattern)?;

    // Find the newline after the opening fence.
    let content_start = text[start_idx + start_pattern.len()..]
        .find('\n')
        .map(|i| start_idx + start_pattern.len() + i + 1)?;

    // A bare fence must not actually open a language-specific block.
    if lang.is_empty() {
        let after_fence = &text[start_idx + 3..content_start - 1];
        if !after_fence.trim().is_empty() {
            return None;
        }
    }

    let end_idx = text[content_start..].find("```")?;

    Some(text[content_start..content_start + end_idx].to_string())
}
