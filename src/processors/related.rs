//! Checking `related_*` references against the entry map.

use super::ContextProcessor;
use crate::aggregator::ChangeSet;
use crate::context::Context;
use crate::error::BuildReport;
use anyhow::Result;

/// Applies the relation policy after markdown has written its fields.
///
/// Lookups themselves stay lazy (`Context::related`); this only makes
/// dangling references visible at build time.
pub struct RelatedProcessor;

impl ContextProcessor for RelatedProcessor {
    fn name(&self) -> &'static str {
        "related"
    }

    fn process(
        &mut self,
        ctx: &mut Context,
        _changes: Option<&ChangeSet>,
        _report: &mut BuildReport,
    ) -> Result<()> {
        ctx.check_relations()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelationPolicy;
    use crate::context::{Entry, EntryUri};
    use crate::error::BuildError;

    fn ctx(policy: RelationPolicy) -> Context {
        let mut ctx = Context::new(Default::default(), policy);
        let mut entry = Entry::new();
        entry.insert("related_posts", "missing.md");
        ctx.insert(EntryUri::new("a.md"), entry);
        ctx
    }

    #[test]
    fn test_fail_fast() {
        let mut ctx = ctx(RelationPolicy::FailFast);
        let err = RelatedProcessor
            .process(&mut ctx, None, &mut BuildReport::default())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::UnresolvedRelation { .. })
        ));
    }

    #[test]
    fn test_drop() {
        let mut ctx = ctx(RelationPolicy::Drop);
        RelatedProcessor
            .process(&mut ctx, None, &mut BuildReport::default())
            .unwrap();
        // The reference stays stored; lookups skip it
        assert!(ctx.get("a.md").unwrap().contains("related_posts"));
        assert!(ctx.related("a.md", "related_posts").unwrap().is_empty());
    }
}
