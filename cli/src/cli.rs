use std::path::PathBuf;

use clap::Parser;
use treewatch_core::{Result, WatchConfig};

/// Watch a directory tree for created and deleted entries, down to a fixed
/// depth.
#[derive(Debug, Parser)]
#[command(name = "treewatch", version, about)]
pub struct Cli {
    /// Directory to watch.
    pub path: PathBuf,

    /// How many levels below PATH receive a watch (0 = PATH only).
    #[arg(value_parser = parse_depth, allow_negative_numbers = true)]
    pub depth: usize,

    /// TOML file with additional watch settings.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print one JSON object per event instead of text lines.
    #[arg(long)]
    pub json: bool,

    /// Do not descend into symlinked directories.
    #[arg(long)]
    pub no_follow_symlinks: bool,
}

impl Cli {
    /// Merge the optional config file with the command line. Positional
    /// arguments always win.
    pub fn watch_config(&self) -> Result<WatchConfig> {
        let config = match &self.config {
            Some(path) => WatchConfig::load(path)?,
            None => WatchConfig::default(),
        };

        let mut config = config.with_root(&self.path).with_max_depth(self.depth);
        if self.no_follow_symlinks {
            config = config.follow_symlinks(false);
        }
        Ok(config)
    }
}

fn parse_depth(raw: &str) -> std::result::Result<usize, String> {
    let depth: i64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("depth must be a non-negative integer, got '{raw}'"))?;

    if depth < 0 {
        return Err("depth must be a non-negative integer".to_string());
    }

    usize::try_from(depth).map_err(|e| e.to_string())
}
