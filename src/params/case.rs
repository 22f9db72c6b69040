//! Case conventions for wire names.
//!
//! Header and path names are kebab-case (`x-request-id`), query names are
//! snake_case (`page_size`). Declared identifiers may be snake_case Rust fields or
//! camelCase overrides; both are split into words first.

use once_cell::sync::Lazy;
use regex::Regex;

static KEBAB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("kebab-case regex should be valid")
});

/// Split an identifier into lowercase words.
///
/// Word boundaries are `_`, `-`, a lower-to-upper transition (`userId`) and the
/// end of an acronym (`HTTPServer` -> `http`, `server`).
fn words(ident: &str) -> Vec<String> {
    let ident = ident.strip_prefix("r#").unwrap_or(ident);
    let chars: Vec<char> = ident.chars().collect();
    let mut out = Vec::new();
    let mut cur = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' {
            if !cur.is_empty() {
                out.push(std::mem::take(&mut cur));
            }
            continue;
        }
        if c.is_uppercase() && !cur.is_empty() {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower) {
                out.push(std::mem::take(&mut cur));
            }
        }
        cur.extend(c.to_lowercase());
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}

/// `page_size` -> `page-size`, `XRequestID` -> `x-request-id`.
#[must_use]
pub fn to_kebab(ident: &str) -> String {
    words(ident).join("-")
}

/// `pageSize` -> `page_size`.
#[must_use]
pub fn to_snake(ident: &str) -> String {
    words(ident).join("_")
}

/// Whether `name` is already in kebab-case.
#[must_use]
pub fn is_kebab(name: &str) -> bool {
    KEBAB.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_kebab() {
        assert_eq!(to_kebab("page_size"), "page-size");
        assert_eq!(to_kebab("X_Y"), "x-y");
        assert_eq!(to_kebab("userID"), "user-id");
        assert_eq!(to_kebab("XRequestID"), "x-request-id");
        assert_eq!(to_kebab("HTTPServer"), "http-server");
        assert_eq!(to_kebab("r#type"), "type");
    }

    #[test]
    fn test_to_snake() {
        assert_eq!(to_snake("pageSize"), "page_size");
        assert_eq!(to_snake("keyword"), "keyword");
        assert_eq!(to_snake("content-type"), "content_type");
    }

    #[test]
    fn test_is_kebab() {
        assert!(is_kebab("user-id"));
        assert!(is_kebab("id2"));
        assert!(!is_kebab("userID"));
        assert!(!is_kebab("user_id"));
        assert!(!is_kebab("-id"));
        assert!(!is_kebab(""));
    }
}
