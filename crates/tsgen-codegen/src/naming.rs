//! Identifier casing helpers.

/// Lower camel case for a Rust identifier.
///
/// `snake_case` and `SCREAMING_CASE` are split on `_` and rejoined, keeping
/// any leading underscores. Anything else has its leading upper-case run
/// lowered, so `FirstValue` becomes `firstValue` and `ID` becomes `id`.
pub fn camel_case(name: &str) -> String {
    let trimmed = name.trim_start_matches('_');
    let prefix = &name[..name.len() - trimmed.len()];

    if trimmed.contains('_') {
        let mut out = String::from(prefix);
        for (i, word) in trimmed.split('_').filter(|w| !w.is_empty()).enumerate() {
            let lower = word.to_lowercase();
            if i == 0 {
                out.push_str(&lower);
            } else {
                let mut chars = lower.chars();
                if let Some(first) = chars.next() {
                    out.extend(first.to_uppercase());
                    out.push_str(chars.as_str());
                }
            }
        }
        return out;
    }

    let chars: Vec<char> = trimmed.chars().collect();
    let upper_run = chars.iter().take_while(|c| c.is_uppercase()).count();
    let lowered = match upper_run {
        0 => 0,
        // `IDValue`: keep the `V` that starts the next word.
        n if n > 1 && n < chars.len() && chars[n].is_lowercase() => n - 1,
        n => n,
    };

    let mut out = String::from(prefix);
    for (i, c) in chars.iter().enumerate() {
        if i < lowered.max(1) && c.is_uppercase() {
            out.extend(c.to_lowercase());
        } else {
            out.push(*c);
        }
    }
    out
}

/// Whether `name` can be written as a bare TypeScript property key.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `text` as a single-quoted TypeScript string.
pub fn quoted(text: &str) -> String {
    format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
}
