//! Address and integer canonicalisation

/// Auto-generated label prefixes; longest first so `thunk_FUN_` wins over `FUN_`
const LABEL_PREFIXES: [&str; 5] = ["thunk_FUN_", "FUN_", "SUB_", "LAB_", "DAT_"];

const HEX_PREFIXES: [&str; 2] = ["0x", "0X"];

/// Reduce an address-like value to bare hexadecimal digits
///
/// `FUN_00401000`, `0x00401000` and `00401000` all canonicalise to
/// `00401000`. Label prefixes are only stripped when what follows is a
/// hex number, so symbol names such as `FUN_main_helper` pass through.
/// Stripping repeats until nothing changes, which makes the function
/// idempotent.
pub fn canonicalize_address(value: &str) -> String {
    let mut current = value.trim();
    loop {
        let next = strip_prefix_once(current);
        if next.len() == current.len() {
            return current.to_string();
        }
        current = next;
    }
}

fn strip_prefix_once(value: &str) -> &str {
    for prefix in LABEL_PREFIXES {
        if let Some(rest) = value.strip_prefix(prefix)
            && is_hex(strip_hex_prefix(rest))
        {
            return rest;
        }
    }
    let rest = strip_hex_prefix(value);
    if rest.is_empty() { value } else { rest }
}

fn strip_hex_prefix(value: &str) -> &str {
    HEX_PREFIXES
        .iter()
        .find_map(|p| value.strip_prefix(p))
        .unwrap_or(value)
}

/// Check for a non-empty run of hex digits
pub fn is_hex(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_hexdigit())
}

/// Parse a decimal or `0x` hexadecimal integer
pub fn parse_integer(value: &str) -> Option<i64> {
    let value = value.trim();
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };
    let magnitude = match HEX_PREFIXES.iter().find_map(|p| digits.strip_prefix(p)) {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i64>().ok()?,
    };
    Some(if negative { -magnitude } else { magnitude })
}
