//! Classifies link attribute values by URL scheme.
//!
//! Attackers hide schemes from naive prefix checks with character references the parser left
//! behind (`ja&Tab;vascript&colon;`) and with control characters that browsers drop while parsing
//! URLs (`java\tscript:`). Values are therefore always normalized before the scheme is read.

use std::borrow::Cow;
use std::collections::HashSet;

use html5ever::data::NAMED_ENTITIES;

/// Pseudo-protocol allowing in-page anchors such as `#top`.
pub const ANCHOR: &str = "#";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    /// The attribute carries no protocol restriction.
    Unrestricted,
    /// The value names an allowed scheme, or is an allowed anchor.
    Allowed,
    /// The value has no scheme: a reference relative to the document's base URI.
    Relative,
    /// The value names a scheme that is not allowed.
    Disallowed,
}

/// Classifies `value` against the schemes it may use. `None` or an empty set means the attribute
/// is unrestricted.
pub fn classify(value: &str, allowed: Option<&HashSet<String>>) -> Protocol {
    let allowed = match allowed {
        Some(allowed) if !allowed.is_empty() => allowed,
        _ => return Protocol::Unrestricted,
    };

    let normalized = normalize(value);
    match scheme(&normalized) {
        Some(scheme) if allowed.contains(scheme) => {
            // The scheme only counts if a browser reads the stored text the same way.
            match self::scheme(&browser_view(value)) {
                Some(raw) if raw == scheme => Protocol::Allowed,
                _ => Protocol::Relative,
            }
        }
        Some(_) => Protocol::Disallowed,
        None if allowed.contains(ANCHOR) && is_anchor(&normalized) => Protocol::Allowed,
        None => Protocol::Relative,
    }
}

/// The value as a URL parser sees it: tabs and newlines removed, leading and trailing control
/// characters and spaces trimmed. Character references are not decoded.
fn browser_view(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '\t' | '\n' | '\r'))
        .collect::<String>()
        .trim_matches(|c: char| c.is_ascii_control() || c == ' ')
        .to_ascii_lowercase()
}

/// Rewrites the scheme of `value` in lowercase (`HTTP://x` to `http://x`), leaving the rest of
/// the value untouched. Values without a scheme are returned as they are.
pub fn lowercase_scheme(value: &str) -> Cow<'_, str> {
    let trimmed = value.trim();
    match scheme(trimmed) {
        Some(scheme) if scheme.bytes().any(|b| b.is_ascii_uppercase()) => Cow::Owned(format!(
            "{}{}",
            scheme.to_ascii_lowercase(),
            &trimmed[scheme.len()..]
        )),
        _ => Cow::Borrowed(value),
    }
}

/// Decodes leftover character references, strips ASCII control characters anywhere in the value,
/// trims it and lowercases it. The result is only used for comparison.
pub fn normalize(value: &str) -> String {
    let decoded = decode_character_references(value);
    let stripped = decoded
        .chars()
        .filter(|c| !c.is_ascii_control())
        .collect::<String>();
    stripped.trim().to_lowercase()
}

/// The scheme of a normalized value: the text before the first `:`, provided it matches the URL
/// scheme grammar (`ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`).
pub fn scheme(normalized: &str) -> Option<&str> {
    let (candidate, _) = normalized.split_once(':')?;
    let mut chars = candidate.chars();
    let starts_with_letter = chars.next().map_or(false, |c| c.is_ascii_alphabetic());
    let rest_is_valid = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if starts_with_letter && rest_is_valid {
        Some(candidate)
    } else {
        None
    }
}

fn is_anchor(normalized: &str) -> bool {
    normalized.starts_with('#') && !normalized.contains(char::is_whitespace)
}

/// Decodes numeric and named character references. The trailing `;` is optional, as it is for
/// browsers. Anything that is not a reference is left untouched.
pub fn decode_character_references(value: &str) -> Cow<'_, str> {
    if !value.contains('&') {
        return Cow::Borrowed(value);
    }

    let mut decoded = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(amp) = rest.find('&') {
        decoded.push_str(&rest[..amp]);
        let reference = &rest[amp + 1..];
        match decode_reference(reference, &mut decoded) {
            Some(consumed) => rest = &reference[consumed..],
            None => {
                decoded.push('&');
                rest = reference;
            }
        }
    }
    decoded.push_str(rest);
    Cow::Owned(decoded)
}

/// Decodes the reference at the start of `reference` (just past the `&`) into `decoded`,
/// returning the number of bytes consumed.
fn decode_reference(reference: &str, decoded: &mut String) -> Option<usize> {
    if let Some(number) = reference.strip_prefix('#') {
        let (digits, radix, prefix) = match number.strip_prefix(|c: char| c == 'x' || c == 'X') {
            Some(hex) => (hex, 16, 2),
            None => (number, 10, 1),
        };
        let len = digits
            .find(|c: char| !c.is_digit(radix))
            .unwrap_or(digits.len());
        if len == 0 {
            return None;
        }
        let c = u32::from_str_radix(&digits[..len], radix)
            .ok()
            .and_then(char::from_u32)
            .unwrap_or('\u{fffd}');
        decoded.push(c);
        return Some(prefix + len + terminator(&digits[len..]));
    }

    let len = reference
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(reference.len());
    if len == 0 {
        return None;
    }
    // Entity keys carry their `;`. Without one, fall back to the longest legacy name.
    let terminated = if terminator(&reference[len..]) == 1 {
        NAMED_ENTITIES
            .get(&reference[..=len])
            .map(|code_points| (code_points, len + 1))
    } else {
        None
    };
    let (code_points, consumed) = terminated.or_else(|| {
        (1..=len)
            .rev()
            .find_map(|end| NAMED_ENTITIES.get(&reference[..end]).map(|cp| (cp, end)))
    })?;

    let (first, second) = *code_points;
    decoded.push(char::from_u32(first).unwrap_or('\u{fffd}'));
    if second != 0 {
        decoded.push(char::from_u32(second).unwrap_or('\u{fffd}'));
    }
    Some(consumed)
}

fn terminator(rest: &str) -> usize {
    if rest.starts_with(';') {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn web() -> HashSet<String> {
        hashset! {"http".to_owned(), "https".to_owned(), "mailto".to_owned()}
    }

    #[test]
    fn decodes_references() {
        assert_eq!(decode_character_references("no refs"), "no refs");
        assert_eq!(
            decode_character_references("ja&Tab;va&Tab;script&colon;alert(1)"),
            "ja\tva\tscript:alert(1)"
        );
        assert_eq!(decode_character_references("&#106;&#x61;&#X76;a"), "java");
        assert_eq!(decode_character_references("&#0013;x&#58"), "\rx:");
        assert_eq!(decode_character_references("a &unknown; b &"), "a &unknown; b &");
        assert_eq!(decode_character_references("&#;&#x;"), "&#;&#x;");
        assert_eq!(decode_character_references("&#99999999999;"), "\u{fffd}");
    }

    #[test]
    fn decodes_every_named_reference() {
        assert_eq!(decode_character_references("&NonBreakingSpace;x"), "\u{a0}x");
        assert_eq!(
            decode_character_references("&NotEqualTilde;"),
            "\u{2242}\u{338}"
        );
        assert_eq!(decode_character_references("&ampx &notit;"), "&x \u{ac}it;");
    }

    #[test]
    fn normalizes_obfuscated_schemes() {
        assert_eq!(
            normalize("\rja\tva\tscript\n:alert(1)"),
            "javascript:alert(1)"
        );
        assert_eq!(normalize("  JaVaScRiPt&colon;x "), "javascript:x");
        assert_eq!(normalize("java\u{0}script:x"), "javascript:x");
    }

    #[test]
    fn reads_schemes() {
        assert_eq!(scheme("http://example.com"), Some("http"));
        assert_eq!(scheme("svn+ssh://host"), Some("svn+ssh"));
        assert_eq!(scheme("a:b"), Some("a"));
        assert_eq!(scheme("/foo"), None);
        assert_eq!(scheme("/foo:bar"), None);
        assert_eq!(scheme("1ab:c"), None);
        assert_eq!(scheme(":nothing"), None);
        assert_eq!(scheme("java script:x"), None);
    }

    #[test]
    fn unrestricted_without_protocols() {
        assert_eq!(classify("javascript:alert(1)", None), Protocol::Unrestricted);
        assert_eq!(
            classify("javascript:alert(1)", Some(&HashSet::new())),
            Protocol::Unrestricted
        );
    }

    #[test]
    fn classifies_against_allowed_schemes() {
        let web = web();
        assert_eq!(classify("http://example.com", Some(&web)), Protocol::Allowed);
        assert_eq!(classify("HTTPS://example.com", Some(&web)), Protocol::Allowed);
        assert_eq!(classify("mailto:info@example.com", Some(&web)), Protocol::Allowed);
        assert_eq!(classify("ftp://example.com", Some(&web)), Protocol::Disallowed);
        assert_eq!(classify("any://example.com", Some(&web)), Protocol::Disallowed);
        assert_eq!(classify("a:b", Some(&web)), Protocol::Disallowed);
        assert_eq!(classify("/foo", Some(&web)), Protocol::Relative);
        assert_eq!(classify("foo/bar.html", Some(&web)), Protocol::Relative);
        assert_eq!(classify("", Some(&web)), Protocol::Relative);
    }

    #[test]
    fn rejects_dangerous_schemes() {
        let web = web();
        for value in &[
            "javascript:alert(1)",
            "data:text/html;base64,PHNjcmlwdD4=",
            "vbscript:msgbox(1)",
            "\rja\tva\tscript\n:alert(1)",
            "ja&Tab;va&Tab;script&colon;alert(1)",
            "ja\tvas\rcript:alert(1)",
            "&#106;avascript:alert(1)",
            " javascript:alert(1)",
        ] {
            assert_eq!(classify(value, Some(&web)), Protocol::Disallowed, "{:?}", value);
        }
    }

    #[test]
    fn references_cannot_hide_a_scheme() {
        let web = web();
        assert_eq!(
            classify("&NonBreakingSpace;javascript:alert(1)", Some(&web)),
            Protocol::Disallowed
        );
        // Browsers see no scheme in the stored text, so neither is `http` granted.
        assert_eq!(classify("http&colon;evil", Some(&web)), Protocol::Relative);
        assert_eq!(classify("\thttp://example.com", Some(&web)), Protocol::Allowed);
    }

    #[test]
    fn lowercases_schemes() {
        assert_eq!(lowercase_scheme("HTTP://nice.com"), "http://nice.com");
        assert_eq!(lowercase_scheme(" MailTo:A@B.com"), "mailto:A@B.com");
        assert!(matches!(lowercase_scheme("http://X"), Cow::Borrowed(_)));
        assert_eq!(lowercase_scheme("/Foo:Bar"), "/Foo:Bar");
    }

    #[test]
    fn anchors_need_the_anchor_protocol() {
        let mut allowed = web();
        assert_eq!(classify("#top", Some(&allowed)), Protocol::Relative);
        allowed.insert(ANCHOR.to_owned());
        assert_eq!(classify("#top", Some(&allowed)), Protocol::Allowed);
        assert_eq!(classify("#a b", Some(&allowed)), Protocol::Relative);
    }
}
