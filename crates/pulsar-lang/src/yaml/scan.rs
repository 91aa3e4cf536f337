//! Line-based pre-scans over the raw document text.
//!
//! serde_yaml's duplicate-key handling is version-dependent, and its parsed
//! values carry no per-node source lines, so both duplicate detection and
//! rule provenance come from scanning the text directly.

use std::collections::HashSet;

/// Detect duplicate keys within one YAML mapping scope.
///
/// Scopes are tracked by indentation; each `- ` list item opens a fresh
/// scope so `- a: 1` followed by `- a: 2` is two items, not a duplicate,
/// while `- a: 1` with an `a: 2` at the same item indent is a duplicate.
/// Returns the 1-based line and key of the first duplicate found.
pub fn find_duplicate_key(text: &str) -> Option<(usize, String)> {
    let mut scopes: Vec<(usize, HashSet<String>)> = vec![(0, HashSet::new())];

    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let indent = line.len() - line.trim_start().len();
        let is_list_item = trimmed.starts_with('-');
        let key_source = if is_list_item {
            trimmed.strip_prefix('-').map(str::trim_start).unwrap_or("")
        } else {
            trimmed
        };

        if is_list_item {
            while scopes.len() > 1 && scopes.last().is_some_and(|(i, _)| *i >= indent) {
                scopes.pop();
            }
            // `indent + 1` marks the item scope as deeper than its dash.
            scopes.push((indent + 1, HashSet::new()));
        }

        if let Some(key) = mapping_key(key_source) {
            if !is_list_item {
                while scopes.len() > 1 && scopes.last().is_some_and(|(i, _)| *i > indent) {
                    scopes.pop();
                }
                if scopes.last().is_none_or(|(i, _)| *i < indent) {
                    scopes.push((indent, HashSet::new()));
                }
            }
            if let Some((_, keys)) = scopes.last_mut() {
                if !keys.insert(key.clone()) {
                    return Some((idx + 1, key));
                }
            }
        }
    }

    None
}

/// Extract the mapping key from a line, if the line is a `key: ...` entry.
fn mapping_key(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.starts_with('-') {
        return None;
    }
    let mut depth: usize = 0;
    for (i, c) in trimmed.char_indices() {
        match c {
            '[' | '{' => depth += 1,
            ']' | '}' => depth = depth.saturating_sub(1),
            ':' if depth == 0 => {
                // A key-value separator is a colon at end-of-line or
                // followed by whitespace; `input:temperature` is a scalar.
                let rest = &trimmed[i + 1..];
                if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
                    return None;
                }
                let key = trimmed[..i].trim().trim_matches(['"', '\'']);
                if key.is_empty() || key.contains(' ') {
                    return None;
                }
                return Some(key.to_string());
            }
            _ => {}
        }
    }
    None
}

/// 1-based lines of each rule-level `name:` scalar, in document order.
///
/// Rules are the only sequence items in the surface grammar that carry a
/// `name` key, so every `name:` mapping entry belongs to a rule.
pub fn rule_name_lines(text: &str) -> Vec<usize> {
    let mut lines = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        let entry = trimmed.strip_prefix('-').map(str::trim_start).unwrap_or(trimmed);
        if entry == "name:" || entry.starts_with("name: ") {
            lines.push(idx + 1);
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_key_in_same_mapping_is_found() {
        let doc = "rules:\n  - name: a\n    name: b\n";
        let (line, key) = find_duplicate_key(doc).unwrap();
        assert_eq!(line, 3);
        assert_eq!(key, "name");
    }

    #[test]
    fn sibling_list_items_may_repeat_keys() {
        let doc = "rules:\n  - name: a\n  - name: b\n";
        assert!(find_duplicate_key(doc).is_none());
    }

    #[test]
    fn prefixed_sensor_scalars_are_not_keys() {
        let doc = "rules:\n  - name: a\n    sensor: input:temperature\n";
        assert!(find_duplicate_key(doc).is_none());
    }

    #[test]
    fn name_lines_follow_document_order() {
        let doc = "rules:\n  - name: a\n    actions: []\n  - name: b\n";
        assert_eq!(rule_name_lines(doc), vec![2, 4]);
    }
}
