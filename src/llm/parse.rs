//! Turning free-form model replies into lists.

/// Parse a reply into at most `max` non-empty entries.
///
/// A JSON array of strings is preferred (optionally wrapped in a code fence);
/// otherwise each non-blank line is one entry, with bullets and numbering
/// stripped.
pub fn parse_list_reply(reply: &str, max: usize) -> Vec<String> {
    let body = strip_code_fence(reply.trim());

    let entries: Vec<String> = match serde_json::from_str::<Vec<String>>(body) {
        Ok(items) => items,
        Err(_) => body.lines().map(strip_list_marker).map(str::to_string).collect(),
    };

    entries
        .into_iter()
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .take(max)
        .collect()
}

/// Parse a reply into at most `max` lowercase tags, skipping any in `exclude`.
///
/// Accepts the same shapes as [`parse_list_reply`] and additionally splits on
/// commas. Leading `#` is dropped.
pub fn parse_tag_reply(reply: &str, max: usize, exclude: &[String]) -> Vec<String> {
    let excluded: Vec<String> = exclude.iter().map(|t| t.trim().to_lowercase()).collect();
    let mut tags: Vec<String> = Vec::new();

    for entry in parse_list_reply(reply, usize::MAX) {
        for part in entry.split(',') {
            let tag = part.trim().trim_start_matches('#').trim().to_lowercase();
            if tag.is_empty() || excluded.contains(&tag) || tags.contains(&tag) {
                continue;
            }
            tags.push(tag);
            if tags.len() == max {
                return tags;
            }
        }
    }

    tags
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (e.g. `json`) on the opening line.
    let rest = match rest.find('\n') {
        Some(i) => &rest[i + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    let line = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .or_else(|| line.strip_prefix("• "))
        .unwrap_or(line);

    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return rest.trim();
        }
    }
    line.trim()
}
