use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use scrape_pipeline::config::Config;
use scrape_pipeline::diagnostics::Diagnostics;
use scrape_pipeline::export::ExportFormat;
use scrape_pipeline::layout::OutputLayout;
use scrape_pipeline::loader::expand_inputs;
use scrape_pipeline::obs;
use scrape_pipeline::pipeline::{analyze_files, process_files, run_pipeline, PipelineSettings};

/// Clean, deduplicate and analyze scraped e-commerce listings.
#[derive(Parser, Debug)]
#[command(name = "scrape-pipeline", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
struct CommonArgs {
    /// Input JSON files or directories of them.
    #[arg(long, short = 'i', num_args = 1.., required = true)]
    input: Vec<PathBuf>,

    /// Output root (holds raw/, processed/ and reports/).
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// JSON file overriding the validation rules.
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Write into a fresh run_NNN folder.
    #[arg(long)]
    numbered: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate, clean, deduplicate and export raw scraper output.
    Process {
        #[command(flatten)]
        common: CommonArgs,
        /// Export formats: json, csv, excel.
        #[arg(long, num_args = 1.., value_parser = parse_format)]
        formats: Vec<ExportFormat>,
    },
    /// Generate statistical and trend reports.
    Analyze {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Process, then analyze the processed data.
    Pipeline {
        #[command(flatten)]
        common: CommonArgs,
        /// Export formats: json, csv, excel.
        #[arg(long, num_args = 1.., value_parser = parse_format)]
        formats: Vec<ExportFormat>,
    },
}

impl Command {
    fn common(&self) -> &CommonArgs {
        match self {
            Command::Process { common, .. }
            | Command::Analyze { common }
            | Command::Pipeline { common, .. } => common,
        }
    }
}

fn parse_format(value: &str) -> Result<ExportFormat, String> {
    ExportFormat::parse(value)
        .ok_or_else(|| format!("unknown format '{}' (expected json, csv or excel)", value))
}

fn main() {
    let cli = Cli::parse();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = obs::init_tracing(config.log_file.as_deref()) {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
    tracing::info!("Configuration loaded successfully");

    let common = cli.command.common().clone();
    if let Some(output) = common.output {
        config.output_root = output;
    }
    if let Some(rules) = common.rules {
        config.rules_file = Some(rules);
    }
    config.numbered_runs |= common.numbered;

    let mut diagnostics = Diagnostics::default();
    if let Err(e) = run(cli.command, &config, &mut diagnostics) {
        tracing::error!("❌ {:#}", e);
        if diagnostics.errors.is_empty() {
            diagnostics.error(format!("{:#}", e));
        }
        if let Err(dump_err) = diagnostics.dump(&OutputLayout::new(&config.output_root).reports) {
            tracing::error!("Failed to write diagnostics: {}", dump_err);
        }
        std::process::exit(1);
    }
}

fn run(command: Command, config: &Config, diagnostics: &mut Diagnostics) -> anyhow::Result<()> {
    let inputs = expand_inputs(&command.common().input)?;
    if inputs.is_empty() {
        anyhow::bail!("No input files to process");
    }

    let layout = if config.numbered_runs {
        OutputLayout::numbered(&config.output_root)?
    } else {
        OutputLayout::new(&config.output_root)
    };
    layout.ensure()?;

    let mut settings = PipelineSettings {
        layout,
        formats: config.formats.clone(),
        rules: config.load_rules()?,
    };

    match command {
        Command::Process { formats, .. } => {
            if !formats.is_empty() {
                settings.formats = formats;
            }
            let report = process_files(&inputs, &settings, diagnostics)?;
            println!(
                "Processed {} of {} records (validation rate {:.1}%, {} duplicates removed)",
                report.processed_records,
                report.original_records,
                report.validation_rate * 100.0,
                report.deduplication.removed
            );
            for file in report.exported_files.files.values() {
                println!("  {}: {}", file.format, file.path.display());
            }
        }
        Command::Analyze { .. } => {
            let outcome = analyze_files(
                &inputs,
                &settings.layout.reports,
                &settings.rules,
                diagnostics,
            )?;
            println!("Analyzed {} records", outcome.total_records_processed);
            for (kind, path) in &outcome.generated_files {
                println!("  {}: {}", kind, path.display());
            }
        }
        Command::Pipeline { formats, .. } => {
            if !formats.is_empty() {
                settings.formats = formats;
            }
            let outcome = run_pipeline(&inputs, &settings, diagnostics)?;
            println!(
                "Processed {} records into {}",
                outcome.processing.processed_records,
                outcome.processing.output_dir.display()
            );
            for (kind, path) in &outcome.analysis.generated_files {
                println!("  {}: {}", kind, path.display());
            }
        }
    }

    tracing::info!("✓ Run {} finished", diagnostics.run_id);
    Ok(())
}
