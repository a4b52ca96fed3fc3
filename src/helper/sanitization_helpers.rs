use regex::Regex;

/// Escapes all HTML in long-form markdown content while leaving fenced
/// code blocks (```) untouched. Existing entities are decoded first so
/// content that is edited and saved again is not double-escaped.
pub fn sanitize_markdown_content(markdown_input: &str) -> String {
    let mut code_blocks: Vec<String> = Vec::new();
    let code_block_regex = Regex::new(r"(?s)```[\s\S]*?```").unwrap();

    // Step 1: pull code blocks out behind placeholders.
    let with_placeholders = code_block_regex.replace_all(markdown_input, |caps: &regex::Captures| {
        code_blocks.push(caps[0].to_string());
        format!("__CODE_BLOCK_PLACEHOLDER_{}__", code_blocks.len() - 1)
    });

    // Step 2: normalize entities, then escape what remains.
    let decoded = html_escape::decode_html_entities(&with_placeholders);
    let escaped = html_escape::encode_text(&decoded).to_string();

    // Step 3: restore the original code blocks.
    let mut final_output = escaped;
    for (i, block) in code_blocks.iter().enumerate() {
        let placeholder = format!("__CODE_BLOCK_PLACEHOLDER_{}__", i);
        final_output = final_output.replacen(&placeholder, block, 1);
    }

    final_output
}

/// Strips all HTML tags from short plain-text fields (titles, names,
/// addresses).
pub fn strip_all_html(input: &str) -> String {
    use std::collections::HashSet;
    ammonia::Builder::new().tags(HashSet::new()).clean(input).to_string()
}
