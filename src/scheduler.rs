//! Decide which templates to render after a batch of changes.
//!
//! A cold build renders every template for every entry it matches plus every
//! standalone template. An incremental build queues, in this order:
//!
//! 1. every template that renders an edited entry,
//! 2. every edited template, and every template that transitively includes
//!    one, for each entry it renders (or once, when standalone),
//! 3. nothing else: the remaining outputs are touched when they exist and
//!    rendered when they don't.
//!
//! A task queued twice runs once. Entries a processor failed on get no task
//! at all.

use crate::aggregator::ChangeSet;
use crate::config::BuildConfig;
use crate::context::{Context, EntryUri};
use crate::log;
use crate::templates::{EntryTemplateMatcher, TemplateDependencyResolver, TemplateRef, TemplateTree};
use crate::utils::path::is_ignored;
use rustc_hash::FxHashSet;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// One template render. Equal tasks produce the same output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RenderTask {
    Entry { template: TemplateRef, uri: EntryUri },
    Standalone { template: TemplateRef },
}

impl RenderTask {
    /// Path of the rendered file relative to the output root.
    pub fn output_path(&self) -> String {
        match self {
            Self::Entry { template, uri } => uri.with_suffix(template.output_suffix()),
            Self::Standalone { template } => template.output_path().to_string(),
        }
    }
}

impl fmt::Display for RenderTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entry { template, uri } => write!(f, "{uri} with {template}"),
            Self::Standalone { template } => write!(f, "{template}"),
        }
    }
}

/// Insertion-ordered task list without duplicates.
#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: Vec<RenderTask>,
    seen: FxHashSet<RenderTask>,
}

impl TaskQueue {
    pub fn push(&mut self, task: RenderTask) -> bool {
        if self.seen.contains(&task) {
            return false;
        }
        self.seen.insert(task.clone());
        self.tasks.push(task);
        true
    }

    pub fn contains(&self, task: &RenderTask) -> bool {
        self.seen.contains(task)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RenderTask> {
        self.tasks.iter()
    }
}

/// Result of one scheduling cycle.
#[derive(Debug, Default)]
pub struct Schedule {
    /// Tasks to run, in order.
    pub tasks: TaskQueue,
    /// Unselected tasks whose output already exists; refreshed, not rendered.
    pub touch: Vec<RenderTask>,
    /// Renderable entries with no template, among the entries considered.
    pub unresolved: Vec<EntryUri>,
}

pub struct RenderScheduler<'a> {
    build: &'a BuildConfig,
    tree: &'a TemplateTree,
    deps: &'a mut TemplateDependencyResolver,
}

impl<'a> RenderScheduler<'a> {
    pub fn new(
        build: &'a BuildConfig,
        tree: &'a TemplateTree,
        deps: &'a mut TemplateDependencyResolver,
    ) -> Self {
        Self { build, tree, deps }
    }

    /// Plan a cold build (`None`) or an incremental one for `changes`.
    pub fn schedule(&mut self, ctx: &Context, changes: Option<&ChangeSet>) -> Schedule {
        let (build, tree) = (self.build, self.tree);
        let matcher = EntryTemplateMatcher::new(tree);
        let mut matches: BTreeMap<&EntryUri, Vec<&TemplateRef>> = ctx
            .entries()
            .keys()
            .filter(|uri| uri.extension().is_some_and(|ext| build.is_renderable(ext)))
            .map(|uri| (uri, matcher.templates_for(uri)))
            .collect();
        let standalone: BTreeSet<&TemplateRef> = tree
            .iter()
            .filter(|t| !t.is_partial() && !matcher.is_entry_template(t, matches.keys().copied()))
            .collect();
        // An entry a processor failed on is incomplete: its output is neither
        // written nor refreshed this cycle. It still decides which templates
        // are entry templates.
        matches.retain(|uri, _| !ctx.is_failed(uri.as_str()));

        let mut schedule = Schedule::default();
        let sweep = |template: &TemplateRef| -> Vec<RenderTask> {
            if standalone.contains(template) {
                return vec![RenderTask::Standalone {
                    template: template.clone(),
                }];
            }
            matches
                .iter()
                .filter(|(_, templates)| templates.iter().any(|t| *t == template))
                .map(|(uri, _)| RenderTask::Entry {
                    template: template.clone(),
                    uri: (*uri).clone(),
                })
                .collect()
        };

        let Some(changes) = changes else {
            for (uri, templates) in &matches {
                if templates.is_empty() {
                    schedule.unresolved.push((*uri).clone());
                }
            }
            for template in tree.iter().filter(|t| !t.is_partial()) {
                sweep(template).into_iter().for_each(|task| {
                    schedule.tasks.push(task);
                });
            }
            return schedule;
        };

        // Edited entries
        for uri in self.edited_entries(changes) {
            let Some(templates) = matches.get(&uri) else {
                continue;
            };
            if templates.is_empty() {
                schedule.unresolved.push(uri.clone());
            }
            for template in templates {
                schedule.tasks.push(RenderTask::Entry {
                    template: (*template).clone(),
                    uri: uri.clone(),
                });
            }
        }

        // Edited templates, then everything that includes one of them
        let edited = self.edited_templates(changes);
        let mut affected: BTreeSet<TemplateRef> = edited
            .iter()
            .filter(|t| tree.contains(t))
            .cloned()
            .collect();
        if !edited.is_empty() {
            for template in tree.iter() {
                let closure = self.deps.transitive_children_of(template);
                if let Some(fragment) = edited.iter().find(|e| closure.contains(*e)) {
                    log!("render"; "{template} is affected by {fragment}");
                    affected.insert(template.clone());
                }
            }
        }
        for template in affected.iter().filter(|t| !t.is_partial()) {
            sweep(template).into_iter().for_each(|task| {
                schedule.tasks.push(task);
            });
        }

        // Everything else
        for template in tree.iter().filter(|t| !t.is_partial()) {
            for task in sweep(template) {
                if schedule.tasks.contains(&task) {
                    continue;
                }
                if build.output.join(task.output_path()).is_file() {
                    schedule.touch.push(task);
                } else {
                    schedule.tasks.push(task);
                }
            }
        }
        schedule
    }

    /// Changed content files that still exist, as uris.
    fn edited_entries(&self, changes: &ChangeSet) -> Vec<EntryUri> {
        let root = &self.build.content;
        changes
            .under(root)
            .filter(|path| path.is_file())
            .filter(|path| path.strip_prefix(root).is_ok_and(|rel| !is_ignored(rel)))
            .filter_map(|path| EntryUri::from_path(path, root))
            .collect()
    }

    /// Changed template paths, existing or not. Their cached dependencies are
    /// dropped so they are read again.
    fn edited_templates(&mut self, changes: &ChangeSet) -> BTreeSet<TemplateRef> {
        let tree = self.tree;
        let root = tree.root();
        let edited: BTreeSet<TemplateRef> = changes
            .under(root)
            .filter(|path| path.strip_prefix(root).is_ok_and(|rel| !is_ignored(rel)))
            .filter_map(|path| TemplateRef::from_path(path, root))
            .collect();
        for template in &edited {
            self.deps.invalidate(template);
        }
        edited
    }
}
