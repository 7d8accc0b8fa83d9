//! hca: hierarchical clustering of FTMap hotspots.
//! Entry point for the command-line binary.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use console::style;
use hca_common::{Collaborators, PipelineError};
use hca_config::{AlignmentMode, Config, Preset};
use hca_pipeline::{CommandBridge, Console, Pipeline, PipelineSettings};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "hca", version, about = "Hierarchical clustering of FTMap hotspots")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, short, env = "HCA_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load, align, select and cluster; write one dendrogram per job.
    Run(Overrides),
    /// Print the resolved jobs and settings without touching any file.
    Plan(Overrides),
}

#[derive(Debug, Args)]
struct Overrides {
    /// Glob for FTMap structure files (`~` and `$VAR` are expanded).
    #[arg(long, short)]
    pattern: Option<String>,

    /// Strength cutoff for hotspot selection.
    #[arg(long)]
    cutoff: Option<f64>,

    /// Output file prefix.
    #[arg(long)]
    prefix: Option<String>,

    /// Job list: all, ho, jaccard, overlap or euclidean.
    #[arg(long)]
    preset: Option<Preset>,

    /// Alignment topology: global, per-job or skip.
    #[arg(long)]
    alignment: Option<AlignmentMode>,

    /// Also write the run report as JSON.
    #[arg(long)]
    report_json: Option<PathBuf>,

    /// Warn and continue when a structure file cannot be loaded.
    #[arg(long)]
    skip_unreadable: bool,

    /// Collaborator helper executable.
    #[arg(long)]
    backend: Option<String>,
}

impl Overrides {
    fn apply(self, config: &mut Config) {
        if let Some(pattern) = self.pattern {
            config.input.pattern = pattern;
        }
        if let Some(cutoff) = self.cutoff {
            config.selection.cutoff = cutoff;
        }
        if let Some(prefix) = self.prefix {
            config.output.prefix = prefix;
        }
        if let Some(preset) = self.preset {
            config.output.preset = preset;
            config.jobs.clear();
        }
        if let Some(mode) = self.alignment {
            config.alignment.mode = Some(mode);
        }
        if self.report_json.is_some() {
            config.output.report_json = self.report_json;
        }
        if self.skip_unreadable {
            config.input.skip_unreadable = true;
        }
        if let Some(program) = self.backend {
            config.backend.program = program;
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> hca_common::Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

fn print_plan(config: &Config, settings: &PipelineSettings) {
    println!("{}", style("Resolved HCA plan").bold());
    println!("  input pattern : {}", settings.pattern);
    println!("  selection     : {}", settings.predicate);
    println!("  alignment     : {} ({})", settings.dispatch.mode, settings.dispatch.reference);
    println!("  backend       : {} {}", config.backend.program, config.backend.args.join(" "));
    println!("  jobs:");
    for (i, job) in settings.jobs.iter().enumerate() {
        let aligned = if job.requires_pre_alignment { ", aligned" } else { "" };
        println!(
            "    {:>2}. {:<10} {:<9} -> {}{}",
            i + 1,
            job.name,
            job.metric,
            job.output.display(),
            aligned
        );
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = load_config(cli.config.as_ref())?;
    let (overrides, execute) = match cli.command {
        Command::Run(o) => (o, true),
        Command::Plan(o) => (o, false),
    };
    overrides.apply(&mut config);
    let settings = PipelineSettings::from_config(&config)?;

    if !execute {
        print_plan(&config, &settings);
        return Ok(());
    }

    info!("hca {} starting", env!("CARGO_PKG_VERSION"));
    let collaborators = Collaborators::from_backend(CommandBridge::from_config(&config.backend));
    let mut pipeline = Pipeline::new(settings, collaborators, Console::stdout());
    let report = pipeline.run().await?;
    info!(run_id = %report.run_id, artifacts = report.artifacts.len(), "Run finished");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hca=info,warn")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await.context("hca run failed") {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = e
                .downcast_ref::<PipelineError>()
                .map(PipelineError::exit_code)
                .unwrap_or(1);
            eprintln!("{} {e:#}", style("error:").red().bold());
            ExitCode::from(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run_overrides() {
        let cli = Cli::try_parse_from([
            "hca", "run", "--pattern", "./maps/*.pdb", "--cutoff", "15", "--preset", "ho",
            "--alignment", "skip",
        ])
        .unwrap();
        let Command::Run(overrides) = cli.command else {
            panic!("expected run");
        };
        let mut config = Config::default();
        overrides.apply(&mut config);
        assert_eq!(config.input.pattern, "./maps/*.pdb");
        assert_eq!(config.selection.cutoff, 15.0);
        assert_eq!(config.output.preset, Preset::Ho);
        assert_eq!(config.alignment_mode(), AlignmentMode::Disabled);
    }

    #[test]
    fn test_bad_preset_is_rejected() {
        assert!(Cli::try_parse_from(["hca", "plan", "--preset", "ward"]).is_err());
    }

    #[test]
    fn test_config_error_maps_to_exit_code() {
        let err: anyhow::Error = load_config(Some(&PathBuf::from("/nonexistent/hca.toml")))
            .unwrap_err()
            .into();
        let err = err.context("hca run failed");
        assert_eq!(err.downcast_ref::<PipelineError>().map(PipelineError::exit_code), Some(64));
    }
}
