//! Site configuration management for `quill.toml`.
//!
//! # Sections
//!
//! | Section     | Purpose                                          |
//! |-------------|--------------------------------------------------|
//! | `[site]`    | Public url and url extension of rendered entries |
//! | `[build]`   | Paths, rebuild strategy, processors, renderers   |
//! | `[images]`  | Image/PDF transform buckets                      |
//! | `[watch]`   | Change batching window                           |
//! | `[serve]`   | Development server (port, interface, watch)      |
//! | `[globals]` | User-defined values exposed to every template    |
//!
//! # Example
//!
//! ```toml
//! [site]
//! url = "https://example.com"
//!
//! [build]
//! content = "content"
//! output = "public"
//! fast_rebuilds = true
//!
//! [images.transforms.thumbnails]
//! max_size = [400, 400]
//! output_types = ["webp"]
//!
//! [globals]
//! site_name = "My Site"
//! ```

mod build;
pub mod defaults;
mod error;
mod images;
mod serve;
mod site;

pub use build::{BuildConfig, ProcessorKind, RelationPolicy, RendererKind};
pub use error::ConfigError;
pub use images::{ImagesConfig, TransformBucket};
pub use serve::{ServeConfig, WatchConfig};
pub use site::SiteSection;

use crate::cli::{Cli, Commands};
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing quill.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Absolute project root (set after loading)
    #[serde(skip)]
    #[educe(Default = PathBuf::from("./"))]
    pub root: PathBuf,

    #[serde(default)]
    pub site: SiteSection,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub images: ImagesConfig,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub serve: ServeConfig,

    /// Free-form values exposed at the root of every template context
    #[serde(default)]
    pub globals: BTreeMap<String, toml::Value>,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: SiteConfig = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Load the config named by the CLI, falling back to defaults when the
    /// file is absent, then apply overrides and validate.
    pub fn load(cli: &Cli) -> Result<Self> {
        let root = cli.root.as_deref().unwrap_or(Path::new("./"));
        let config_path = root.join(&cli.config);

        let mut config = if config_path.exists() {
            Self::from_path(&config_path)?
        } else {
            Self::default()
        };
        config.update_with_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        Self::update_option(&mut self.build.content, cli.content.as_ref());
        Self::update_option(&mut self.build.templates, cli.templates.as_ref());
        Self::update_option(&mut self.build.output, cli.output.as_ref());

        if let Some(args) = cli.build_args() {
            Self::update_option(&mut self.build.fast_rebuilds, args.fast.as_ref());
            Self::update_option(&mut self.build.strict_templates, args.strict.as_ref());
            Self::update_option(&mut self.build.minify, args.minify.as_ref());
        }

        if let Commands::Serve {
            interface,
            port,
            watch,
            ..
        } = &cli.command
        {
            Self::update_option(&mut self.serve.interface, interface.as_ref());
            Self::update_option(&mut self.serve.port, port.as_ref());
            Self::update_option(&mut self.serve.watch, watch.as_ref());
        }

        let root = cli.root.clone().unwrap_or_else(|| PathBuf::from("./"));
        self.resolve_paths(&root);
        self.config_path = normalize_path(&self.root.join(&cli.config));
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Make the root and every directory path absolute.
    pub fn resolve_paths(&mut self, root: &Path) {
        self.root = normalize_path(root);
        self.build.content = normalize_path(&self.root.join(&self.build.content));
        self.build.templates = normalize_path(&self.root.join(&self.build.templates));
        self.build.output = normalize_path(&self.root.join(&self.build.output));
    }

    /// Validate configuration before any build starts
    pub fn validate(&self) -> Result<()> {
        if !self.site.url.is_empty() && !self.site.url.starts_with("http") {
            bail!(ConfigError::SiteUrl(self.site.url.clone()));
        }

        if !self.build.content.is_dir() {
            bail!(ConfigError::ContentDir(self.build.content.clone()));
        }

        if let Err(err) = crate::processors::check_order(&self.build.processors) {
            bail!(ConfigError::ProcessorOrder(err));
        }

        for (key, bucket) in &self.images.transforms {
            if let Some(ty) = bucket
                .output_types
                .iter()
                .find(|ty| !crate::imaging::is_known_output_type(ty))
            {
                bail!(ConfigError::UnknownOutputType {
                    bucket: key.clone(),
                    ty: ty.clone(),
                });
            }
            if matches!(bucket.max_size, Some([0, _] | [_, 0])) {
                bail!(ConfigError::EmptyMaxSize(key.clone()));
            }
        }

        Ok(())
    }

    /// Globals converted for the template context.
    pub fn globals_json(&self) -> BTreeMap<String, serde_json::Value> {
        self.globals
            .iter()
            .filter_map(|(key, value)| {
                serde_json::to_value(value)
                    .ok()
                    .map(|value| (key.clone(), value))
            })
            .collect()
    }
}

/// Normalize a path to absolute, using canonicalize if the path exists
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        // For non-existent paths, manually make them absolute
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_from_str() {
        let config = SiteConfig::from_str(
            r#"
            [site]
            url = "https://example.com"

            [build]
            fast_rebuilds = true
        "#,
        )
        .unwrap();

        assert_eq!(config.site.url, "https://example.com");
        assert_eq!(config.site.html_url_extension, ".html");
        assert!(config.build.fast_rebuilds);
    }

    #[test]
    fn test_from_str_invalid_toml() {
        let result = SiteConfig::from_str("[site\nurl = 1");
        assert!(result.is_err());
        assert!(result.unwrap_err().downcast_ref::<ConfigError>().is_some());
    }

    #[test]
    fn test_unknown_section_rejected() {
        assert!(SiteConfig::from_str("[deploy]\nforce = true").is_err());
    }

    #[test]
    fn test_globals() {
        let config = SiteConfig::from_str(
            r#"
            [globals]
            site_name = "Quill"
            tags = ["rust", "web"]
            [globals.social]
            github = "someone"
        "#,
        )
        .unwrap();

        let globals = config.globals_json();
        assert_eq!(globals["site_name"], serde_json::json!("Quill"));
        assert_eq!(globals["tags"], serde_json::json!(["rust", "web"]));
        assert_eq!(globals["social"]["github"], serde_json::json!("someone"));
    }

    #[test]
    fn test_update_with_cli_overrides() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_str().unwrap();
        let cli = Cli::try_parse_from([
            "quill", "-r", root, "-o", "public", "serve", "--port", "9000", "--fast",
        ])
        .unwrap();

        let mut config = SiteConfig::default();
        config.update_with_cli(&cli);

        assert!(config.build.fast_rebuilds);
        assert_eq!(config.serve.port, 9000);
        // Rewritten by the server once it knows the bound port
        assert_eq!(config.site.url, "");
        assert!(config.build.output.is_absolute());
        assert!(config.build.output.ends_with("public"));
        assert!(config.config_path.ends_with("quill.toml"));
    }

    #[test]
    fn test_validate_missing_content_dir() {
        let dir = TempDir::new().unwrap();
        let mut config = SiteConfig::default();
        config.resolve_paths(dir.path());

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("[build.content]"));
    }

    #[test]
    fn test_validate_processor_order() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("content")).unwrap();

        let mut config =
            SiteConfig::from_str("[build]\nprocessors = [\"related\", \"markdown\"]").unwrap();
        config.resolve_paths(dir.path());

        let err = config.validate().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::ProcessorOrder(_))
        ));
    }

    #[test]
    fn test_validate_unknown_output_type() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("content")).unwrap();

        let mut config = SiteConfig::from_str(
            r#"
            [images.transforms.small]
            output_types = ["tiff2000"]
        "#,
        )
        .unwrap();
        config.resolve_paths(dir.path());

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("tiff2000"));
    }

    #[test]
    fn test_validate_zero_max_size() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("content")).unwrap();

        let mut config = SiteConfig::from_str("[images.transforms.tiny]\nmax_size = [0, 100]").unwrap();
        config.resolve_paths(dir.path());

        let err = config.validate().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::EmptyMaxSize(key)) if key == "tiny"
        ));
    }

    #[test]
    fn test_validate_ok() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("content")).unwrap();

        let mut config = SiteConfig::default();
        config.resolve_paths(dir.path());
        assert!(config.validate().is_ok());
    }
}
