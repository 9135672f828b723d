//! Minification of rendered template output.
//!
//! The output extension decides the minifier: `.html` goes through
//! `minify_html`, `.xml` has its indentation stripped, everything else is
//! passed through untouched.

use std::borrow::Cow;
use std::path::Path;

/// Minify `content` written to `path` when `enabled`.
///
/// Returns `Cow::Borrowed` when nothing was changed.
pub fn minify_output<'a>(path: &Path, content: &'a [u8], enabled: bool) -> Cow<'a, [u8]> {
    if !enabled {
        return Cow::Borrowed(content);
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some("html" | "htm") => Cow::Owned(minify_html_inner(content)),
        Some("xml") => Cow::Owned(minify_xml_inner(content)),
        _ => Cow::Borrowed(content),
    }
}

fn minify_html_inner(html: &[u8]) -> Vec<u8> {
    let mut cfg = minify_html::Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.keep_comments = false;
    cfg.minify_css = true;
    cfg.minify_js = true;
    minify_html::minify(html, &cfg)
}

fn minify_xml_inner(xml: &[u8]) -> Vec<u8> {
    String::from_utf8_lossy(xml)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<String>()
        .into_bytes()
}
