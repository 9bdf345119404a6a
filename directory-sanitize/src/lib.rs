//! Escaping and validation of untrusted facility text before it is stored or
//! rendered. Every function here is total: unusable input comes back as an
//! empty string (or `false`), never as a panic.

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email pattern compiles")
});

static PHONE_EXTENSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*(?:ext\.?|x)\s*[0-9]+").expect("extension pattern compiles"));

static UNSAFE_SCHEME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(javascript|vbscript|data):").expect("scheme pattern compiles")
});

static DANGEROUS_TEXT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<script|javascript:|vbscript:|on\w+\s*=").expect("text pattern compiles")
});

const BLOCKED_URL_SCHEMES: [&str; 5] = ["javascript:", "vbscript:", "data:", "file:", "ftp:"];

/// Sanitization used by the normalization engine and the render projection.
pub trait Sanitizer {
    /// Escape for insertion as markup text.
    fn sanitize_text(&self, input: &str) -> String;
    /// Escape for insertion inside an HTML attribute value.
    fn sanitize_attribute_text(&self, input: &str) -> String;
    /// Cleaned phone number, or `""` when it is not a plausible US number.
    fn sanitize_phone(&self, input: &str) -> String;
    /// `http(s)`, `tel:` or `mailto:` URL, or `""` when rejected.
    fn sanitize_url(&self, input: &str) -> String;
    fn validate_input_text(&self, input: &str, max_length: usize) -> bool;
}

/// Production sanitizer backed by the free functions of this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlSanitizer;

impl Sanitizer for HtmlSanitizer {
    fn sanitize_text(&self, input: &str) -> String {
        sanitize_text(input)
    }

    fn sanitize_attribute_text(&self, input: &str) -> String {
        sanitize_attribute_text(input)
    }

    fn sanitize_phone(&self, input: &str) -> String {
        sanitize_phone(input)
    }

    fn sanitize_url(&self, input: &str) -> String {
        sanitize_url(input)
    }

    fn validate_input_text(&self, input: &str, max_length: usize) -> bool {
        validate_input_text(input, max_length)
    }
}

/// Pass-through sanitizer: returns every input unchanged and accepts all text.
/// Meant for tests that want to observe merge behaviour on raw values.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentitySanitizer;

impl Sanitizer for IdentitySanitizer {
    fn sanitize_text(&self, input: &str) -> String {
        input.to_string()
    }

    fn sanitize_attribute_text(&self, input: &str) -> String {
        input.to_string()
    }

    fn sanitize_phone(&self, input: &str) -> String {
        input.to_string()
    }

    fn sanitize_url(&self, input: &str) -> String {
        input.to_string()
    }

    fn validate_input_text(&self, _input: &str, _max_length: usize) -> bool {
        true
    }
}

/// Escape `&`, `<`, `>` and non-breaking spaces the way a browser serializes
/// a text node.
pub fn sanitize_text(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\u{a0}' => escaped.push_str("&nbsp;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Escape `& " ' < > ( )` and defuse script-capable URL schemes.
pub fn sanitize_attribute_text(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '(' => escaped.push_str("&#40;"),
            ')' => escaped.push_str("&#41;"),
            other => escaped.push(other),
        }
    }

    UNSAFE_SCHEME_RE
        .replace_all(&escaped, |caps: &regex::Captures| {
            format!("{}_unsafe:", caps[1].to_ascii_lowercase())
        })
        .into_owned()
}

/// Strip extensions and stray characters, then accept 10 digits or 11 digits
/// starting with a `1` country code. The cleaned (formatted) string is
/// returned, not the bare digits.
pub fn sanitize_phone(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let without_extension = PHONE_EXTENSION_RE.replace_all(trimmed, "");
    let cleaned: String = without_extension
        .trim()
        .chars()
        .filter(|&c| c.is_ascii_digit() || c.is_whitespace() || matches!(c, '(' | ')' | '-' | '+'))
        .collect();

    let digits = digits_only(&cleaned);
    if digits.len() == 10 || (digits.len() == 11 && digits.starts_with('1')) {
        cleaned.trim().to_string()
    } else {
        String::new()
    }
}

/// Only ASCII digits of `input`.
pub fn digits_only(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

pub fn sanitize_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if BLOCKED_URL_SCHEMES
        .iter()
        .any(|scheme| strip_prefix_ignore_case(trimmed, scheme).is_some())
    {
        warn!("Blocked URL with a disallowed scheme: {trimmed}");
        return String::new();
    }

    if let Some(number) = strip_prefix_ignore_case(trimmed, "tel:") {
        let phone = sanitize_phone(number);
        return if phone.is_empty() {
            String::new()
        } else {
            format!("tel:{phone}")
        };
    }

    if let Some(email) = strip_prefix_ignore_case(trimmed, "mailto:") {
        return if validate_email(email) {
            format!("mailto:{email}")
        } else {
            String::new()
        };
    }

    let has_http_scheme = strip_prefix_ignore_case(trimmed, "http://").is_some()
        || strip_prefix_ignore_case(trimmed, "https://").is_some();
    let normalized = if has_http_scheme {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    if normalized.eq_ignore_ascii_case("http://") || normalized.eq_ignore_ascii_case("https://") {
        return String::new();
    }

    match Url::parse(&normalized) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url.to_string(),
        Ok(_) => String::new(),
        Err(err) => {
            warn!("Invalid URL format {trimmed:?}: {err}");
            String::new()
        }
    }
}

pub fn validate_email(input: &str) -> bool {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.len() > 254 {
        return false;
    }
    if trimmed.starts_with('.') || trimmed.ends_with('.') || trimmed.contains("..") {
        return false;
    }

    let mut parts = trimmed.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    if local.len() > 64 || domain.len() > 253 {
        return false;
    }
    if domain.starts_with('-') || domain.ends_with('-') {
        return false;
    }

    EMAIL_RE.is_match(trimmed)
}

/// `false` when `input` is longer than `max_length` characters or contains
/// script tags, script URL schemes or inline event handlers.
pub fn validate_input_text(input: &str, max_length: usize) -> bool {
    if input.chars().count() > max_length {
        return false;
    }
    !DANGEROUS_TEXT_RE.is_match(input)
}

fn strip_prefix_ignore_case<'a>(input: &'a str, prefix: &str) -> Option<&'a str> {
    let head = input.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&input[prefix.len()..])
    } else {
        None
    }
}
