use directory_sanitize::{
    digits_only, sanitize_attribute_text, sanitize_phone, sanitize_text, sanitize_url,
    validate_email, validate_input_text, HtmlSanitizer, IdentitySanitizer, Sanitizer,
};

#[test]
fn script_tags_are_escaped_in_text() {
    let escaped = sanitize_text("<script>alert(1)</script>");
    assert_eq!(escaped, "&lt;script&gt;alert(1)&lt;/script&gt;");
    assert!(!escaped.contains("<script"));

    assert_eq!(sanitize_text("Rock & Roll \"House\""), "Rock &amp; Roll \"House\"");
    assert_eq!(sanitize_text("a\u{a0}b"), "a&nbsp;b");
    assert_eq!(sanitize_text(""), "");
}

#[test]
fn attribute_text_escapes_quotes_and_defuses_schemes() {
    assert_eq!(
        sanitize_attribute_text(r#"" onclick='x()'"#),
        "&quot; onclick=&#x27;x&#40;&#41;&#x27;"
    );
    assert_eq!(
        sanitize_attribute_text("JavaScript:alert(1)"),
        "javascript_unsafe:alert&#40;1&#41;"
    );
    assert_eq!(sanitize_attribute_text("vbscript:x"), "vbscript_unsafe:x");
    assert_eq!(
        sanitize_attribute_text("DATA:text/html"),
        "data_unsafe:text/html"
    );
    assert_eq!(sanitize_attribute_text("123 Main St"), "123 Main St");
}

#[test]
fn phone_accepts_ten_or_eleven_digit_numbers() {
    assert_eq!(sanitize_phone("123-456-7890"), "123-456-7890");
    assert_eq!(sanitize_phone(" (402) 555-0100 "), "(402) 555-0100");
    assert_eq!(sanitize_phone("+1-402-555-0100"), "+1-402-555-0100");
    assert_eq!(sanitize_phone("1 402 555 0100"), "1 402 555 0100");
    assert_eq!(sanitize_phone("402.555.0100"), "4025550100");
}

#[test]
fn phone_rejects_implausible_numbers() {
    assert_eq!(sanitize_phone("12345"), "");
    assert_eq!(sanitize_phone("2-402-555-0100"), "");
    assert_eq!(sanitize_phone(""), "");
    assert_eq!(sanitize_phone("call us"), "");
}

#[test]
fn phone_extensions_are_stripped() {
    assert_eq!(sanitize_phone("402-555-0100 ext. 12"), "402-555-0100");
    assert_eq!(sanitize_phone("402-555-0100 x345"), "402-555-0100");
    assert_eq!(sanitize_phone("402-555-0100 EXT 9"), "402-555-0100");
}

#[test]
fn urls_get_https_and_normalized_form() {
    assert_eq!(sanitize_url("example.org"), "https://example.org/");
    assert_eq!(
        sanitize_url("  http://example.org/path?q=1 "),
        "http://example.org/path?q=1"
    );
    assert_eq!(sanitize_url("HTTPS://Example.org"), "https://example.org/");
}

#[test]
fn dangerous_url_schemes_are_rejected() {
    assert_eq!(sanitize_url("javascript:alert(1)"), "");
    assert_eq!(sanitize_url("JAVASCRIPT:alert(1)"), "");
    assert_eq!(sanitize_url("vbscript:msgbox"), "");
    assert_eq!(sanitize_url("data:text/html;base64,AAAA"), "");
    assert_eq!(sanitize_url("file:///etc/passwd"), "");
    assert_eq!(sanitize_url("ftp://example.org"), "");
}

#[test]
fn tel_and_mailto_urls_delegate_to_validators() {
    assert_eq!(sanitize_url("tel:402-555-0100"), "tel:402-555-0100");
    assert_eq!(sanitize_url("tel:555"), "");
    assert_eq!(
        sanitize_url("mailto:intake@example.org"),
        "mailto:intake@example.org"
    );
    assert_eq!(sanitize_url("mailto:not-an-email"), "");
}

#[test]
fn empty_or_bare_urls_are_rejected() {
    assert_eq!(sanitize_url(""), "");
    assert_eq!(sanitize_url("   "), "");
    assert_eq!(sanitize_url("https://"), "");
    assert_eq!(sanitize_url("not a url"), "");
}

#[test]
fn email_validation_checks_structure_and_lengths() {
    assert!(validate_email("intake@example.org"));
    assert!(validate_email("first.last+tag@sub.example.org"));

    assert!(!validate_email(""));
    assert!(!validate_email("no-at-sign.example.org"));
    assert!(!validate_email("two@@example.org"));
    assert!(!validate_email("a@b@example.org"));
    assert!(!validate_email(".leading@example.org"));
    assert!(!validate_email("trailing@example.org."));
    assert!(!validate_email("double..dot@example.org"));
    assert!(!validate_email("user@-example.org"));
    assert!(!validate_email("user@example.org-"));

    let long_local = format!("{}@example.org", "a".repeat(65));
    assert!(!validate_email(&long_local));
    let long_total = format!("user@{}.org", "a".repeat(250));
    assert!(!validate_email(&long_total));
}

#[test]
fn input_text_rejects_long_or_scripted_values() {
    assert!(validate_input_text("Bright Path Recovery", 200));
    assert!(!validate_input_text(&"a".repeat(201), 200));
    assert!(validate_input_text(&"é".repeat(200), 200));
    assert!(!validate_input_text("<SCRIPT src=x>", 200));
    assert!(!validate_input_text("see javascript:void(0)", 200));
    assert!(!validate_input_text("VBScript:run", 200));
    assert!(!validate_input_text("<img onerror = x>", 200));
}

#[test]
fn digits_only_keeps_ascii_digits() {
    assert_eq!(digits_only("(402) 555-0100"), "4025550100");
    assert_eq!(digits_only("none"), "");
}

#[test]
fn identity_sanitizer_passes_everything_through() {
    let sanitizer = IdentitySanitizer;
    assert_eq!(sanitizer.sanitize_text("<b>"), "<b>");
    assert_eq!(sanitizer.sanitize_phone("12345"), "12345");
    assert_eq!(sanitizer.sanitize_url("javascript:x"), "javascript:x");
    assert!(sanitizer.validate_input_text("<script>", 1));
}

#[test]
fn html_sanitizer_delegates_to_free_functions() {
    let sanitizer = HtmlSanitizer;
    assert_eq!(sanitizer.sanitize_text("<b>"), sanitize_text("<b>"));
    assert_eq!(
        sanitizer.sanitize_attribute_text("a'b"),
        sanitize_attribute_text("a'b")
    );
    assert_eq!(sanitizer.sanitize_url("example.org"), "https://example.org/");
    assert!(!sanitizer.validate_input_text("<script>", 200));
}
