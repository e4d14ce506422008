//! Token budgeting for prompt sections

use crate::llm::estimate_tokens;

/// Marker appended to text cut short by the budget
pub const TRUNCATION_MARKER: &str = "\n[... truncated]";

/// Cut `text` so its estimate fits `tokens`, on a char boundary
pub fn truncate_to_tokens(text: &str, tokens: usize) -> String {
    if estimate_tokens(text) <= tokens {
        return text.to_string();
    }
    let limit = (tokens * 4).saturating_sub(TRUNCATION_MARKER.len());
    let mut end = limit.min(text.len());
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    if end == 0 {
        return String::new();
    }
    format!("{}{}", &text[..end], TRUNCATION_MARKER)
}

/// Join as many of the newest entries as fit `tokens`, oldest first
///
/// Entries are kept whole. When even the newest entry is too large it is
/// truncated. Dropped entries are summarised by a leading note.
pub fn fit_entries(entries: &[String], tokens: usize) -> String {
    if entries.is_empty() || tokens == 0 {
        return String::new();
    }

    let mut used = 0;
    let mut kept: Vec<String> = Vec::new();
    for entry in entries.iter().rev() {
        let cost = estimate_tokens(entry) + 1;
        if used + cost > tokens {
            if kept.is_empty() {
                kept.push(truncate_to_tokens(entry, tokens));
            }
            break;
        }
        used += cost;
        kept.push(entry.clone());
    }
    kept.reverse();

    let omitted = entries.len() - kept.len();
    if omitted > 0 {
        log::debug!("Prompt budget dropped {} earlier entries", omitted);
        kept.insert(0, format!("[{} earlier entries omitted]", omitted));
    }
    kept.join("\n\n")
}
