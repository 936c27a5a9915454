//! refminer: detect refactorings between two structural-model snapshots.
//!
//! Usage:
//!   cargo run --bin refminer -- <before.json> <after.json> [--hints hints.json] [--config config.json]
//
//! Output:
//!   Pretty JSON array of refactorings on stdout.
//!   Summary (counts per kind, leftover classes) on stderr.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use refminer_core::{DiffConfig, RenameHints, StructuralModel, diff_models};

const USAGE: &str = "Usage: refminer <before.json> <after.json> [--hints hints.json] [--config config.json]";

struct Cli {
    before: PathBuf,
    after: PathBuf,
    hints: Option<PathBuf>,
    config: Option<PathBuf>,
}

fn parse_args(args: &[String]) -> Option<Cli> {
    let mut positional = Vec::new();
    let (mut hints, mut config) = (None, None);
    let mut it = args.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--hints" => hints = Some(PathBuf::from(it.next()?)),
            "--config" => config = Some(PathBuf::from(it.next()?)),
            flag if flag.starts_with("--") => return None,
            path => positional.push(PathBuf::from(path)),
        }
    }
    let [before, after]: [PathBuf; 2] = positional.try_into().ok()?;
    Some(Cli { before, after, hints, config })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = env::args().skip(1).collect::<Vec<_>>();
    let Some(cli) = parse_args(&args) else {
        eprintln!("{USAGE}");
        std::process::exit(1);
    };

    // 1) inputs
    let before = StructuralModel::load(&cli.before)
        .with_context(|| format!("failed to load before model {}", cli.before.display()))?;
    let after = StructuralModel::load(&cli.after)
        .with_context(|| format!("failed to load after model {}", cli.after.display()))?;
    let hints: RenameHints = match &cli.hints {
        Some(path) => {
            let raw = fs::read_to_string(path).with_context(|| format!("failed to read hints {}", path.display()))?;
            serde_json::from_str(&raw).with_context(|| format!("hints {} are not a path map", path.display()))?
        }
        None => RenameHints::new(),
    };
    let config = match &cli.config {
        Some(path) => DiffConfig::load(path).with_context(|| format!("failed to load config {}", path.display()))?,
        None => DiffConfig::default(),
    };

    // 2) diff
    let diff = diff_models(&before, &after, &hints, &config).context("model diff failed")?;
    println!("{}", serde_json::to_string_pretty(&diff.refactorings)?);

    // summary
    let mut per_kind: BTreeMap<&str, usize> = BTreeMap::new();
    for r in &diff.refactorings {
        *per_kind.entry(r.kind.display_name()).or_default() += 1;
    }
    eprintln!("\n--- Summary ---");
    eprintln!("Refactorings:    {}", diff.refactorings.len());
    for (kind, count) in per_kind {
        eprintln!("  {:<24} {}", kind, count);
    }
    eprintln!("Removed classes: {}", diff.removed_classes.len());
    eprintln!("Added classes:   {}", diff.added_classes.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_positional_and_flags() {
        let cli = parse_args(&args(&["a.json", "--hints", "h.json", "b.json"])).unwrap();
        assert_eq!(cli.before, PathBuf::from("a.json"));
        assert_eq!(cli.after, PathBuf::from("b.json"));
        assert_eq!(cli.hints, Some(PathBuf::from("h.json")));
        assert!(cli.config.is_none());
    }

    #[test]
    fn rejects_bad_usage() {
        assert!(parse_args(&args(&["only.json"])).is_none());
        assert!(parse_args(&args(&["a.json", "b.json", "--config"])).is_none());
        assert!(parse_args(&args(&["a.json", "b.json", "--verbose"])).is_none());
    }
}
