//! Profile and property-name utilities.
//!
//! A qualified key is `%profile.name` or just `name`. Everything here works
//! on logical text, i.e. after continuation sequences have been removed.

/// Removes every backslash-newline continuation together with the leading
/// whitespace of the continued line.
///
/// `"key1.\\\n  key2"` becomes `"key1.key2"`. An escaped backslash (`\\\\`)
/// is kept as is.
pub fn strip_continuations(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.peek() {
            Some('\n') | Some('\r') => {
                if chars.next() == Some('\r') && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                while matches!(chars.peek(), Some(' ') | Some('\t') | Some('\x0c')) {
                    chars.next();
                }
            }
            Some(_) => {
                out.push(ch);
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            None => {}
        }
    }

    out
}

/// Splits a logical key into its profile and property name.
///
/// - `%dev.key` gives `(Some("dev"), "key")`
/// - `%dev.` gives `(Some("dev"), "")`
/// - `%dev` gives `(Some("dev"), "")`
/// - `key` gives `(None, "key")`
pub fn split_profile(key: &str) -> (Option<&str>, &str) {
    match key.strip_prefix('%') {
        Some(rest) => match rest.split_once('.') {
            Some((profile, name)) => (Some(profile), name),
            None => (Some(rest), ""),
        },
        None => (None, key),
    }
}

/// Joins a profile and a property name into a qualified key.
pub fn qualify(profile: Option<&str>, name: &str) -> String {
    match profile {
        Some(profile) => format!("%{profile}.{name}"),
        None => name.to_string(),
    }
}

/// Returns the property name of a qualified key, dropping any profile.
pub fn base_name(key: &str) -> &str {
    split_profile(key).1
}

/// Environment variable names probed for a property, in lookup order.
///
/// MicroProfile Config checks the exact name, then the name with every
/// non-alphanumeric character replaced by `_`, then that upper-cased.
pub fn env_var_candidates(key: &str) -> Vec<String> {
    let sanitized: String = key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let upper = sanitized.to_ascii_uppercase();

    let mut candidates = vec![key.to_string()];
    for candidate in [sanitized, upper] {
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }
    candidates
}
