// tests/ingest_normalize.rs
use trade_signal_gatherer::ingest::normalize_text;

#[test]
fn empty_is_ok() {
    assert_eq!(normalize_text(""), "");
}

#[test]
fn strips_html_and_unescapes() {
    let s = "<p>Hello&nbsp;<b>world</b> &ldquo;ok&rdquo;</p>";
    let n = normalize_text(s);
    assert_eq!(n, r#"Hello world "ok""#);
}

#[test]
fn escaped_markup_is_stripped_after_decoding() {
    let s = "&lt;a href=\"https://x.test\"&gt;Fed holds&lt;/a&gt; Reuters";
    assert_eq!(normalize_text(s), "Fed holds Reuters");
}

#[test]
fn cdata_wrappers_are_removed() {
    assert_eq!(normalize_text("<![CDATA[ Tariffs &amp; trade ]]>"), "Tariffs & trade");
}

#[test]
fn folds_whitespace_and_nbsp() {
    let s = "A\u{00A0}\n\tB   C";
    let n = normalize_text(s);
    assert_eq!(n, "A B C");
}

#[test]
fn trailing_punctuation_is_kept() {
    assert_eq!(normalize_text("Markets rally!"), "Markets rally!");
}

#[test]
fn length_cap_applies() {
    let s = "x".repeat(2_000);
    let n = normalize_text(&s);
    assert_eq!(n.chars().count(), 1_500);
}
