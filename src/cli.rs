//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Quill incremental static site builder CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root directory (default: current directory)
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Output directory path (relative to project root)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Content directory path (relative to project root)
    #[arg(short, long)]
    pub content: Option<PathBuf>,

    /// Template directory path (relative to project root)
    #[arg(short, long)]
    pub templates: Option<PathBuf>,

    /// Config file name (default: quill.toml)
    #[arg(short = 'C', long, default_value = "quill.toml")]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Shared build arguments for Build and Serve commands
#[derive(clap::Args, Debug, Clone)]
pub struct BuildArgs {
    /// Only re-render what each change batch affects
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub fast: Option<bool>,

    /// Fail the build when a renderable entry has no template
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub strict: Option<bool>,

    /// Minify the html content
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub minify: Option<bool>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build the site once, or keep rebuilding on change with --watch
    Build {
        #[command(flatten)]
        build_args: BuildArgs,

        /// Keep watching content and templates after the first build
        #[arg(short, long)]
        watch: bool,
    },

    /// Check content for dangling relations and entries without a template
    Lint {
        /// Only report findings for these content files
        files: Vec<PathBuf>,
    },

    /// Serve the output directory. Rebuild on change automatically
    Serve {
        #[command(flatten)]
        build_args: BuildArgs,

        /// Interface to bind on
        #[arg(short, long)]
        interface: Option<String>,

        /// The port you should provide
        #[arg(short, long)]
        port: Option<u16>,

        /// enable watch
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        watch: Option<bool>,
    },
}

impl Cli {
    pub fn build_args(&self) -> Option<&BuildArgs> {
        match &self.command {
            Commands::Build { build_args, .. } | Commands::Serve { build_args, .. } => {
                Some(build_args)
            }
            Commands::Lint { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build_watch() {
        let cli = Cli::try_parse_from(["quill", "build", "--watch", "--fast"]).unwrap();
        match &cli.command {
            Commands::Build { build_args, watch } => {
                assert!(*watch);
                assert_eq!(build_args.fast, Some(true));
                assert_eq!(build_args.strict, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.config, PathBuf::from("quill.toml"));
    }

    #[test]
    fn test_parse_serve_port() {
        let cli = Cli::try_parse_from(["quill", "serve", "--port", "9000", "--watch", "false"])
            .unwrap();
        match cli.command {
            Commands::Serve { port, watch, .. } => {
                assert_eq!(port, Some(9000));
                assert_eq!(watch, Some(false));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_lint_files() {
        let cli = Cli::try_parse_from(["quill", "-r", "site", "lint", "blog/a.md", "b.md"]).unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("site")));
        assert!(cli.build_args().is_none());
        match cli.command {
            Commands::Lint { files } => assert_eq!(files.len(), 2),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
