//! Markup rendering for content entries.
//!
//! [`MarkupRenderer`] is the seam the markdown processor renders through;
//! [`CommonMark`] is the `pulldown-cmark` implementation.

mod frontmatter;

pub use frontmatter::{Metadata, format_front_matter, parse_front_matter};

use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, TagEnd, html};
use rustc_hash::FxHashMap;
use serde::Serialize;

/// One heading of a rendered document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub level: u8,
    pub text: String,
    pub id: String,
}

#[derive(Debug, Clone, Default)]
pub struct Rendered {
    pub html: String,
    pub metadata: Metadata,
    pub toc: Vec<TocEntry>,
}

pub trait MarkupRenderer {
    /// Render a whole source file, header included.
    fn render(&self, raw: &str) -> Rendered;
}

/// CommonMark with tables, footnotes, strikethrough, task lists and smart
/// punctuation.
#[derive(Debug, Clone)]
pub struct CommonMark {
    options: Options,
}

impl Default for CommonMark {
    fn default() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_SMART_PUNCTUATION);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
        Self { options }
    }
}

impl MarkupRenderer for CommonMark {
    fn render(&self, raw: &str) -> Rendered {
        let (metadata, body) = parse_front_matter(raw);
        let mut events: Vec<Event> = Parser::new_ext(body, self.options).collect();
        let toc = assign_heading_ids(&mut events);

        let mut out = String::with_capacity(body.len() * 3 / 2);
        html::push_html(&mut out, events.into_iter());

        Rendered {
            html: out,
            metadata,
            toc,
        }
    }
}

/// Give every heading an id (explicit `{#id}` attributes win) and collect the
/// outline. Repeated slugs get `-1`, `-2`, ... suffixes.
fn assign_heading_ids(events: &mut [Event<'_>]) -> Vec<TocEntry> {
    let mut toc = Vec::new();
    let mut seen: FxHashMap<String, usize> = FxHashMap::default();
    let mut open: Option<(usize, u8, String)> = None;

    for index in 0..events.len() {
        match &events[index] {
            Event::Start(Tag::Heading { level, .. }) => {
                open = Some((index, *level as u8, String::new()));
                continue;
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, _, heading)) = open.as_mut() {
                    heading.push_str(text);
                }
                continue;
            }
            Event::End(TagEnd::Heading(_)) => {}
            _ => continue,
        }

        let Some((start, level, text)) = open.take() else {
            continue;
        };
        let Event::Start(Tag::Heading { id, .. }) = &mut events[start] else {
            continue;
        };
        let slug = match id {
            Some(explicit) => explicit.to_string(),
            None => {
                let base = slugify(&text);
                let count = seen.entry(base.clone()).or_insert(0);
                let slug = match *count {
                    0 => base,
                    n => format!("{base}-{n}"),
                };
                *count += 1;
                *id = Some(CowStr::from(slug.clone()));
                slug
            }
        };
        toc.push(TocEntry { level, text, id: slug });
    }
    toc
}

/// Lowercase ASCII slug: transliterated, alphanumerics kept, runs of anything
/// else collapsed to one `-`.
pub fn slugify(text: &str) -> String {
    let ascii = deunicode::deunicode(text).to_lowercase();
    let mut slug = String::with_capacity(ascii.len());
    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "section".to_string()
    } else {
        slug.to_string()
    }
}
