//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization and by
//! `educe` for `Default` impls, so both paths agree.

pub fn r#true() -> bool {
    true
}

pub fn r#false() -> bool {
    false
}

// ============================================================================
// [site] Section Defaults
// ============================================================================

pub mod site {
    pub fn url() -> String {
        String::new()
    }

    pub fn html_url_extension() -> String {
        ".html".into()
    }
}

// ============================================================================
// [build] Section Defaults
// ============================================================================

pub mod build {
    use super::super::{ProcessorKind, RelationPolicy, RendererKind};
    use std::path::PathBuf;

    pub fn content() -> PathBuf {
        "content".into()
    }

    pub fn templates() -> PathBuf {
        "templates".into()
    }

    pub fn output() -> PathBuf {
        "output".into()
    }

    pub fn relations() -> RelationPolicy {
        RelationPolicy::FailFast
    }

    pub fn render_extensions() -> Vec<String> {
        vec!["md".into()]
    }

    pub fn template_extensions() -> Vec<String> {
        ["html", "xml", "txt", "json", "jinja"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    pub fn archive_extensions() -> Vec<String> {
        ["zip", "rar", "gz", "7z"].into_iter().map(String::from).collect()
    }

    pub fn processors() -> Vec<ProcessorKind> {
        vec![
            ProcessorKind::Stale,
            ProcessorKind::Image,
            ProcessorKind::Markdown,
            ProcessorKind::Related,
        ]
    }

    pub fn renderers() -> Vec<RendererKind> {
        vec![
            RendererKind::StaticAssets,
            RendererKind::Archives,
            RendererKind::ImageTransforms,
            RendererKind::Templates,
        ]
    }
}

// ============================================================================
// [images] Section Defaults
// ============================================================================

pub mod images {
    use super::super::TransformBucket;
    use std::collections::BTreeMap;

    /// Largest edge of the default image variant.
    pub const DEFAULT_MAX_SIZE: u32 = 5000;

    pub fn transforms() -> BTreeMap<String, TransformBucket> {
        BTreeMap::from([(
            String::new(),
            TransformBucket {
                max_size: Some([DEFAULT_MAX_SIZE, DEFAULT_MAX_SIZE]),
                ..TransformBucket::default()
            },
        )])
    }

    pub fn include() -> Vec<String> {
        vec!["*".into()]
    }

    pub fn output_types() -> Vec<String> {
        vec!["original".into()]
    }
}

// ============================================================================
// [watch] / [serve] Section Defaults
// ============================================================================

pub mod watch {
    pub fn debounce_ms() -> u64 {
        500
    }
}

pub mod serve {
    pub fn interface() -> String {
        "127.0.0.1".into()
    }

    pub fn port() -> u16 {
        8000
    }
}
