// tests/ingest_normalize.rs
use crypto_news_signal::ingest::{normalize_link, normalize_text, parse_pub_date};

#[test]
fn empty_is_ok() {
    assert_eq!(normalize_text(""), "");
    assert_eq!(normalize_link(""), "");
}

#[test]
fn strips_html_and_unescapes() {
    let s = "<p>Hello&nbsp;<b>world</b> &ldquo;ok&rdquo;</p>";
    let n = normalize_text(s);
    assert_eq!(n, r#"Hello world "ok""#);
}

#[test]
fn folds_whitespace_and_nbsp() {
    let s = "A\u{00A0}\n\tB   C";
    let n = normalize_text(s);
    assert_eq!(n, "A B C");
}

#[test]
fn length_cap_applies() {
    let s = "x".repeat(2_000);
    let n = normalize_text(&s);
    assert!(n.len() <= 1_500);
}

#[test]
fn tracking_params_and_fragment_are_removed() {
    assert_eq!(
        normalize_link("https://www.coindesk.com/markets/2024/01/01/btc/?utm_source=rss&utm_medium=feed#comments"),
        "https://www.coindesk.com/markets/2024/01/01/btc/"
    );
    assert_eq!(
        normalize_link("https://news.google.com/rss/articles/abc?oc=5&utm_term=x&hl=en-US"),
        "https://news.google.com/rss/articles/abc?oc=5&hl=en-US"
    );
}

#[test]
fn non_tracking_params_keep_their_order() {
    let l = "https://ex.test/p?z=1&a=2&m=3";
    assert_eq!(normalize_link(l), l);
}

#[test]
fn same_story_normalizes_identically() {
    let a = normalize_link("https://ex.test/s?id=1&utm_source=a");
    let b = normalize_link("  https://ex.test/s?utm_campaign=b&id=1#x ");
    assert_eq!(a, b);
}

#[test]
fn normalization_is_idempotent() {
    for l in [
        "https://ex.test/s?id=1&utm_source=a#frag",
        "https://EX.test/%7Euser?q=a%20b",
        "mailto:desk@ex.test",
        "::not a url::",
    ] {
        let once = normalize_link(l);
        assert_eq!(normalize_link(&once), once, "{l}");
    }
}

#[test]
fn pub_dates_in_feed_formats() {
    assert!(parse_pub_date("Tue, 02 Jan 2024 09:15:00 +0900").is_some());
    assert!(parse_pub_date("2024-01-02T00:15:00.000Z").is_some());
    assert!(parse_pub_date("2024-01-02 00:15:00").is_some());
    assert!(parse_pub_date("").is_none());
    assert!(parse_pub_date("02/01/2024").is_none());
}
