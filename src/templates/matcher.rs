//! Which templates render which entries.
//!
//! 1. A template next to the entry with the entry's stem (`blog/hello.html`
//!    for `blog/hello.md`) is dedicated to it and wins outright.
//! 2. Otherwise the generic `entry.*` templates of the nearest directory,
//!    walking from the entry's own directory up to the template root.
//! 3. Otherwise nothing renders the entry.

use super::{TemplateRef, TemplateTree};
use crate::context::EntryUri;

#[derive(Debug, Clone, Copy)]
pub struct EntryTemplateMatcher<'a> {
    tree: &'a TemplateTree,
}

impl<'a> EntryTemplateMatcher<'a> {
    pub fn new(tree: &'a TemplateTree) -> Self {
        Self { tree }
    }

    /// Every template of the winning rule, in path order.
    pub fn templates_for(&self, uri: &EntryUri) -> Vec<&'a TemplateRef> {
        let dedicated: Vec<_> = self
            .tree
            .in_dir(uri.parent())
            .filter(|t| !t.is_partial() && t.stem() == uri.stem())
            .collect();
        if !dedicated.is_empty() {
            return dedicated;
        }

        let mut dir = uri.parent();
        loop {
            let generic: Vec<_> = self
                .tree
                .in_dir(dir)
                .filter(|t| t.is_generic_entry())
                .collect();
            if !generic.is_empty() {
                return generic;
            }
            if dir.is_empty() {
                return Vec::new();
            }
            dir = dir.rsplit_once('/').map_or("", |(parent, _)| parent);
        }
    }

    pub fn template_for(&self, uri: &EntryUri) -> Option<&'a TemplateRef> {
        self.templates_for(uri).into_iter().next()
    }

    pub fn can_render(&self, template: &TemplateRef, uri: &EntryUri) -> bool {
        self.templates_for(uri).iter().any(|t| *t == template)
    }

    /// Whether `template` renders entries rather than its own path, given the
    /// renderable entries that currently exist.
    pub fn is_entry_template<'e>(
        &self,
        template: &TemplateRef,
        mut entries: impl Iterator<Item = &'e EntryUri>,
    ) -> bool {
        template.is_generic_entry()
            || entries.any(|uri| uri.parent() == template.parent() && uri.stem() == template.stem())
    }
}
