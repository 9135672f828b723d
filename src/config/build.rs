//! `[build]` section configuration.
//!
//! Paths, rebuild strategy, and the ordered processor/renderer registries.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Enums
// ============================================================================

/// What to do when a `related_*` field names an entry that does not exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationPolicy {
    /// Fail the build with `UnresolvedRelation` (default).
    #[default]
    FailFast,
    /// Log the dangling reference and leave it out of lookups.
    Drop,
}

/// Context processors, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorKind {
    /// Drop entries whose source file was deleted.
    Stale,
    /// Image dimensions and planned transforms.
    Image,
    /// Markdown body, front matter, url.
    Markdown,
    /// Validate `related_*` references.
    Related,
}

/// Renderers, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RendererKind {
    /// Copy non-template files from the template tree.
    StaticAssets,
    /// Copy archives from the content tree.
    Archives,
    /// Resize images and thumbnail PDFs.
    ImageTransforms,
    /// Render templates through the scheduler.
    Templates,
}

impl ProcessorKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Stale => "stale",
            Self::Image => "image",
            Self::Markdown => "markdown",
            Self::Related => "related",
        }
    }
}

impl RendererKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::StaticAssets => "static_assets",
            Self::Archives => "archives",
            Self::ImageTransforms => "image_transforms",
            Self::Templates => "templates",
        }
    }
}

// ============================================================================
// BuildConfig
// ============================================================================

/// `[build]` section in quill.toml.
///
/// # Example
/// ```toml
/// [build]
/// content = "content"
/// templates = "templates"
/// output = "output"
/// fast_rebuilds = true
/// processors = ["stale", "image", "markdown", "related"]
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Content source directory.
    #[serde(default = "defaults::build::content")]
    #[educe(Default = defaults::build::content())]
    pub content: PathBuf,

    /// Template directory.
    #[serde(default = "defaults::build::templates")]
    #[educe(Default = defaults::build::templates())]
    pub templates: PathBuf,

    /// Build output directory.
    #[serde(default = "defaults::build::output")]
    #[educe(Default = defaults::build::output())]
    pub output: PathBuf,

    /// Only re-render what a change batch affects; touch everything else and
    /// skip stale-output reconciliation.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub fast_rebuilds: bool,

    /// Minify rendered HTML.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub minify: bool,

    /// Fail one-shot builds when a renderable entry has no template.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub strict_templates: bool,

    /// Dangling `related_*` reference policy.
    #[serde(default = "defaults::build::relations")]
    #[educe(Default = defaults::build::relations())]
    pub relations: RelationPolicy,

    /// Content extensions that are rendered through templates.
    #[serde(default = "defaults::build::render_extensions")]
    #[educe(Default = defaults::build::render_extensions())]
    pub render_extensions: Vec<String>,

    /// Extensions that mark a file in the template tree as a template.
    #[serde(default = "defaults::build::template_extensions")]
    #[educe(Default = defaults::build::template_extensions())]
    pub template_extensions: Vec<String>,

    /// Content extensions copied verbatim by the archives renderer.
    #[serde(default = "defaults::build::archive_extensions")]
    #[educe(Default = defaults::build::archive_extensions())]
    pub archive_extensions: Vec<String>,

    #[serde(default = "defaults::build::processors")]
    #[educe(Default = defaults::build::processors())]
    pub processors: Vec<ProcessorKind>,

    #[serde(default = "defaults::build::renderers")]
    #[educe(Default = defaults::build::renderers())]
    pub renderers: Vec<RendererKind>,
}

impl BuildConfig {
    /// Whether a content file with this extension is rendered by templates.
    pub fn is_renderable(&self, ext: &str) -> bool {
        self.render_extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }

    pub fn is_template_ext(&self, ext: &str) -> bool {
        self.template_extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }

    pub fn is_archive_ext(&self, ext: &str) -> bool {
        self.archive_extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

#[cfg(test)]
mod tests {
    use super::super::SiteConfig;
    use super::*;

    #[test]
    fn test_build_config_defaults() {
        let config: SiteConfig = toml::from_str("").unwrap();

        assert_eq!(config.build.content, PathBuf::from("content"));
        assert_eq!(config.build.output, PathBuf::from("output"));
        assert!(!config.build.fast_rebuilds);
        assert_eq!(config.build.relations, RelationPolicy::FailFast);
        assert_eq!(config.build.processors.len(), 4);
        assert_eq!(config.build.renderers.last(), Some(&RendererKind::Templates));
    }

    #[test]
    fn test_processor_and_renderer_names() {
        let config: SiteConfig = toml::from_str(
            r#"
            [build]
            processors = ["stale", "markdown"]
            renderers = ["templates"]
            relations = "drop"
        "#,
        )
        .unwrap();

        assert_eq!(
            config.build.processors,
            vec![ProcessorKind::Stale, ProcessorKind::Markdown]
        );
        assert_eq!(config.build.renderers, vec![RendererKind::Templates]);
        assert_eq!(config.build.relations, RelationPolicy::Drop);
    }

    #[test]
    fn test_unknown_processor_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str(
            r#"
            [build]
            processors = ["git_date"]
        "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_extension_checks_ignore_case() {
        let build = BuildConfig::default();
        assert!(build.is_renderable("MD"));
        assert!(build.is_template_ext("jinja"));
        assert!(build.is_archive_ext("Zip"));
        assert!(!build.is_template_ext("css"));
    }
}
