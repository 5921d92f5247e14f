//! Pathweld entrypoint.
//!
//! Thin front end over `core-engine::clean_file`: argument parsing, option
//! layering (CLI flags over `pathweld.toml` over defaults), logging
//! bootstrap, and exit-code mapping. Success is silent; failures surface the
//! error chain on stderr.

use anyhow::{Context, Result};
use clap::Parser;
use core_engine::{CleanStats, Options};
use std::path::PathBuf;
use std::sync::Once;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "pathweld", version, about = "EPS path reconstruction cleaner")]
struct Args {
    /// EPS file to clean (rewritten in place unless --out is given).
    pub input: PathBuf,
    /// Destination path; defaults to rewriting the input through a sibling
    /// temporary file.
    #[arg(long = "out")]
    pub out: Option<PathBuf>,
    /// Discard blocks that contain rectangle operators.
    #[arg(long = "remove-boxes")]
    pub remove_boxes: bool,
    /// Preserve Z-order: group only runs of consecutive identical-state blocks.
    #[arg(long = "group-soft")]
    pub group_soft: bool,
    /// Merge adjacent filled polygons that share edges.
    #[arg(long = "combine-areas")]
    pub combine_areas: bool,
    /// Insert the synthetic linecap even for dashed strokes
    /// (earlier-revision compatibility).
    #[arg(long = "dash-linecap")]
    pub dash_linecap: bool,
    /// Optional configuration file path (overrides discovery of `pathweld.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
}

fn configure_logging() -> Option<WorkerGuard> {
    let file_appender = tracing_appender::rolling::never(".", "pathweld.log");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .try_init()
    {
        Ok(()) => Some(guard),
        // Global subscriber already installed; drop the guard so the writer
        // shuts down.
        Err(_err) => None,
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

/// CLI flags win over config-file values; the file supplies defaults only.
fn layer_options(args: &Args, cfg: &core_config::CleanConfig) -> Options {
    Options {
        remove_boxes: args.remove_boxes || cfg.remove_boxes,
        group_soft: args.group_soft || cfg.group_soft,
        combine_areas: args.combine_areas || cfg.combine_areas,
        dash_linecap: args.dash_linecap || cfg.dash_linecap,
    }
}

fn run(args: &Args) -> Result<CleanStats> {
    let config = core_config::load_from(args.config.clone())
        .context("failed to load configuration")?;
    let opts = layer_options(args, &config.file.clean);
    info!(
        target: "runtime.startup",
        input = %args.input.display(),
        out = args.out.as_ref().map(|p| p.display().to_string()).as_deref(),
        config_override = args.config.is_some(),
        ?opts,
        "startup"
    );
    let stats = core_engine::clean_file(&args.input, args.out.as_deref(), &opts)
        .with_context(|| format!("failed to clean {}", args.input.display()))?;
    Ok(stats)
}

fn main() -> Result<()> {
    let _log_guard = configure_logging();
    install_panic_hook();
    let args = Args::parse();
    let stats = run(&args)?;
    info!(
        target: "runtime",
        blocks = stats.blocks,
        prefixes = stats.prefixes,
        polylines = stats.polylines,
        merged = stats.polygons_merged,
        discarded = stats.blocks_discarded,
        "done"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["pathweld"];
        argv.extend_from_slice(extra);
        argv.push("figure.eps");
        Args::parse_from(argv)
    }

    #[test]
    fn flags_override_config_defaults() {
        let cfg = core_config::CleanConfig {
            remove_boxes: false,
            group_soft: true,
            combine_areas: false,
            dash_linecap: false,
        };
        let opts = layer_options(&args(&["--combine-areas"]), &cfg);
        assert!(opts.combine_areas);
        assert!(opts.group_soft); // from config
        assert!(!opts.remove_boxes);
    }

    #[test]
    fn defaults_are_all_off() {
        let opts = layer_options(&args(&[]), &core_config::CleanConfig::default());
        assert_eq!(opts, Options::default());
    }

    #[test]
    fn end_to_end_clean_through_run() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("figure.eps");
        std::fs::write(
            &input,
            "%%EndPageSetup\nGS\np\nN\n0 0 M\n1 0 L\nGR\n%%Trailer\n",
        )
        .unwrap();
        let out = dir.path().join("clean.eps");
        let cfg = dir.path().join("absent.toml");
        let argv = [
            "pathweld",
            "--out",
            out.to_str().unwrap(),
            "--config",
            cfg.to_str().unwrap(),
            input.to_str().unwrap(),
        ];
        let parsed = Args::parse_from(argv);
        let stats = run(&parsed).unwrap();
        assert_eq!(stats.blocks, 1);
        assert!(
            std::fs::read_to_string(&out)
                .unwrap()
                .contains("N\n0 0 M\n1 0 L\nS\nGR\n")
        );
    }
}
