//! Header metadata of markdown files.
//!
//! ```text
//! ---
//! title: Hello
//! related_posts: blog/a.md,
//!     blog/b.md
//! ---
//! ```
//!
//! The header is a block of `key: value` lines at the very top of a file,
//! optionally fenced by `---`. Lines indented by four or more spaces add
//! values to the previous key. The block ends at the first blank line, at a
//! closing `---`/`...` fence, or at the first line that is neither.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Lowercased key to values, in file order.
pub type Metadata = BTreeMap<String, Vec<String>>;

static META_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ ]{0,3}([A-Za-z0-9_-]+):[ \t]*(.*)$").expect("valid regex"));
static META_MORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ ]{4,}(.*)$").expect("valid regex"));
static BEGIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-{3}([ \t].*)?$").expect("valid regex"));
static END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-{3}|\.{3})([ \t].*)?$").expect("valid regex"));

/// Split a document into its header metadata and the remaining body.
pub fn parse_front_matter(text: &str) -> (Metadata, &str) {
    let mut meta = Metadata::new();
    let mut key: Option<String> = None;
    let mut offset = 0;

    for (index, raw_line) in text.split_inclusive('\n').enumerate() {
        let line = raw_line.trim_end_matches(['\n', '\r']);

        if index == 0 && BEGIN_RE.is_match(line) {
            offset += raw_line.len();
            continue;
        }
        if line.trim().is_empty() || END_RE.is_match(line) {
            offset += raw_line.len();
            break;
        }
        if let Some(caps) = META_RE.captures(line) {
            let name = caps[1].to_lowercase();
            meta.entry(name.clone())
                .or_default()
                .push(caps[2].trim().to_string());
            key = Some(name);
        } else if let (Some(caps), Some(name)) = (META_MORE_RE.captures(line), key.as_ref()) {
            meta.entry(name.clone())
                .or_default()
                .push(caps[1].trim().to_string());
        } else {
            break;
        }
        offset += raw_line.len();
    }

    (meta, &text[offset..])
}

/// Serialize metadata into a header block that parses back to the same map.
///
/// Values are expected to be single-line and free of surrounding whitespace.
pub fn format_front_matter(meta: &Metadata) -> String {
    let mut out = String::new();
    for (key, values) in meta {
        let mut values = values.iter();
        let Some(first) = values.next() else { continue };
        out.push_str(&format!("{key}: {first}\n"));
        for value in values {
            out.push_str(&format!("    {value}\n"));
        }
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns_compile() {
        for re in [&META_RE, &META_MORE_RE, &BEGIN_RE, &END_RE] {
            LazyLock::force(re);
        }
    }

    #[test]
    fn test_single_and_multiple_values() {
        let text = "Title: Hello\nTags: rust\n    web\n    cli\n\n# Body\n";
        let (meta, body) = parse_front_matter(text);

        assert_eq!(meta["title"], vec!["Hello"]);
        assert_eq!(meta["tags"], vec!["rust", "web", "cli"]);
        assert_eq!(body, "# Body\n");
    }

    #[test]
    fn test_fenced_header() {
        let text = "---\ntitle: Hello\nrelated_posts: blog/bye.md\n---\nBody text\n";
        let (meta, body) = parse_front_matter(text);

        assert_eq!(meta["title"], vec!["Hello"]);
        assert_eq!(meta["related_posts"], vec!["blog/bye.md"]);
        assert_eq!(body, "Body text\n");
    }

    #[test]
    fn test_no_header() {
        let text = "# Just a heading\n\nSome text.";
        let (meta, body) = parse_front_matter(text);
        assert!(meta.is_empty());
        assert_eq!(body, text);
    }

    #[test]
    fn test_header_stops_at_plain_line() {
        let text = "title: Hi\nnot metadata here\n";
        let (meta, body) = parse_front_matter(text);
        assert_eq!(meta["title"], vec!["Hi"]);
        assert_eq!(body, "not metadata here\n");
    }

    #[test]
    fn test_crlf_lines() {
        let (meta, body) = parse_front_matter("title: Hi\r\n\r\nbody");
        assert_eq!(meta["title"], vec!["Hi"]);
        assert_eq!(body, "body");
    }

    #[test]
    fn test_format_round_trip() {
        let text = "title: Hello\ndate_posted: 2024-01-02\nrelated_posts: a.md\n    b.md\n\n";
        let (meta, _) = parse_front_matter(text);

        let formatted = format_front_matter(&meta);
        let (reparsed, body) = parse_front_matter(&formatted);

        assert_eq!(reparsed, meta);
        assert_eq!(reparsed["related_posts"], vec!["a.md", "b.md"]);
        assert_eq!(body, "");
    }
}
