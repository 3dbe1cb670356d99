//! Command-line argument parsing.

use clap::Parser;
use std::path::{Path, PathBuf};

/// Template compiler - emits the ES module tree for Jinja-like templates
#[derive(Parser, Debug, Clone)]
#[command(name = "jinja-js-rs")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Template files to compile
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format
    #[arg(long, default_value = "json")]
    pub output: OutputFormat,

    /// Accepted file extensions
    #[arg(long = "ext", default_values_t = default_extensions())]
    pub extensions: Vec<String>,

    /// Ignore patterns (substring match on the path)
    #[arg(long)]
    pub ignore: Vec<String>,

    /// Stop at the first failing file
    #[arg(long)]
    pub fail_fast: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

fn default_extensions() -> Vec<String> {
    vec!["jinja".to_string(), "j2".to_string(), "html".to_string()]
}

/// Output format for compiled trees and diagnostics.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// The serialized syntax tree, one JSON document per file
    #[default]
    Json,
    /// Per-file status lines and pretty error reports
    Human,
}

impl Args {
    /// Check whether a file passes the include/exclude filter.
    pub fn accepts(&self, path: &Path) -> bool {
        let matches_extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext));
        if !matches_extension {
            return false;
        }
        let text = path.to_string_lossy();
        !self.ignore.iter().any(|pattern| text.contains(pattern))
    }
}
