//! Name transforms for command and parameter resolution

/// Convert an identifier to snake_case
///
/// Splits on punctuation and case boundaries, lowercases, and joins with a
/// single `_`. Digits stay attached to the word before them, so
/// `camelCase123Number` becomes `camel_case123_number`. Applying the
/// transform to its own output returns it unchanged.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            push_separator(&mut out);
            continue;
        }
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            // "getHTTPResponse" splits as get / http / response
            if prev.is_lowercase() || prev.is_numeric() || (prev.is_uppercase() && next_is_lower) {
                push_separator(&mut out);
            }
        }
        out.extend(c.to_lowercase());
    }

    let trimmed_len = out.trim_end_matches('_').len();
    out.truncate(trimmed_len);
    out
}

fn push_separator(out: &mut String) {
    if !out.is_empty() && !out.ends_with('_') {
        out.push('_');
    }
}

/// Levenshtein distance over chars
pub fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut row = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        row[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            row[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(row[j] + 1);
        }
        std::mem::swap(&mut prev, &mut row);
    }
    prev[b.len()]
}

/// Closest candidate within `max_distance` edits, first one wins on ties
pub fn closest_name<'a>(
    name: &str,
    candidates: impl IntoIterator<Item = &'a str>,
    max_distance: usize,
) -> Option<&'a str> {
    candidates
        .into_iter()
        .map(|c| (edit_distance(name, c), c))
        .filter(|(d, _)| *d <= max_distance)
        .min_by_key(|(d, _)| *d)
        .map(|(_, c)| c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case() {
        assert_eq!(to_snake_case("getCurrentFunction"), "get_current_function");
        assert_eq!(to_snake_case("FunctionWithUpperCase"), "function_with_upper_case");
        assert_eq!(to_snake_case("camelCase123Number"), "camel_case123_number");
    }

    #[test]
    fn test_acronyms() {
        assert_eq!(to_snake_case("getHTTPResponse"), "get_http_response");
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
    }

    #[test]
    fn test_punctuation_separators() {
        assert_eq!(to_snake_case("get-current-function"), "get_current_function");
        assert_eq!(to_snake_case("list functions"), "list_functions");
        assert_eq!(to_snake_case("rename__function"), "rename_function");
        assert_eq!(to_snake_case("_list_methods_"), "list_methods");
    }

    #[test]
    fn test_snake_case_idempotent() {
        for name in ["getCurrentFunction", "camelCase123Number", "HTTPServer", "a-B.c"] {
            let once = to_snake_case(name);
            assert_eq!(to_snake_case(&once), once);
        }
    }

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("", ""), 0);
        assert_eq!(edit_distance("abc", ""), 3);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("list_function", "list_functions"), 1);
    }

    #[test]
    fn test_closest_name() {
        let names = ["list_functions", "list_methods", "decompile_function"];
        assert_eq!(closest_name("list_function", names, 3), Some("list_functions"));
        assert_eq!(closest_name("decompile_fn", names, 3), None);
        assert_eq!(closest_name("totally_different", names, 3), None);
    }
}
