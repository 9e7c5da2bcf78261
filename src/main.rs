//! catalog-delta: compliance-aware catalog diff and fleet overview tool

use anyhow::{Context, Result};
use catalog_delta::{
    config::{
        generate_example_config, generate_json_schema, resolve_config, AppConfig, ConfigOverrides,
    },
    pipeline::{self, exit_codes, OutputTarget},
    query::{NodeExtractor, Query},
    reports::{self, create_reporter, DeltaReporter, Report, ReportFormat},
    DeltaContext, DeltaEngine, Exclude, Factory, Overview, Severity,
};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "catalog-delta")]
#[command(version)]
#[command(about = "Compare configuration catalogs and summarize the differences across a fleet", long_about = None)]
#[command(after_help = "EXIT CODES (diff):
    0  Preview equal to baseline
    1  Error occurred
    4  Preview compliant with baseline
    5  Preview different from baseline
    6  Some hosts of a fleet run failed

EXAMPLES:
    # Compare two catalogs of one host
    catalog-delta diff baseline.json preview.json --node web01

    # Compare a directory of hosts and keep the overview
    catalog-delta fleet hosts/ --environment future --overview overview.json

    # Report on a stored overview
    catalog-delta report overview.json -o json")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output (also respects `NO_COLOR` env)
    #[arg(long, global = true)]
    no_color: bool,

    /// Path to configuration file
    #[arg(long, global = true, env = "CATALOG_DELTA_CONFIG")]
    config: Option<PathBuf>,

    /// Start from a named preset instead of the defaults (default, strict, verbose)
    #[arg(long, global = true)]
    preset: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Comparison flags shared by `diff` and `fleet`
#[derive(Args)]
struct DeltaArgs {
    /// Exclusion rule file (JSON)
    #[arg(long)]
    excludes: Option<PathBuf>,

    /// Leave resource tags out of the comparison
    #[arg(long)]
    skip_tags: bool,

    /// Keep attribute sets of added and missing resources
    #[arg(long)]
    verbose_diff: bool,

    /// Treat numeric strings and numbers as different
    #[arg(long)]
    diff_string_numeric: bool,

    /// Treat a one-element array and its element as different
    #[arg(long)]
    diff_array_value: bool,
}

/// Output flags shared by every reporting command
#[derive(Args)]
struct OutputArgs {
    /// Output format
    #[arg(short, long)]
    output: Option<ReportFormat>,

    /// Output file path (stdout if not specified)
    #[arg(short = 'O', long)]
    output_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare the baseline and preview catalogs of one host
    Diff {
        baseline: PathBuf,
        preview: PathBuf,

        /// Host name recorded in the delta
        #[arg(long)]
        node: String,

        #[command(flatten)]
        delta: DeltaArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Compare every host directory below a root and report on the fleet
    Fleet {
        /// Directory with one subdirectory per host
        root: PathBuf,

        /// Environment recorded for hosts whose compilation failed
        #[arg(long, default_value = "preview")]
        environment: String,

        /// Extend this overview instead of starting empty
        #[arg(long)]
        from: Option<PathBuf>,

        /// Write the merged overview here
        #[arg(long)]
        overview: Option<PathBuf>,

        /// Nodes listed in the report
        #[arg(long)]
        top_n: Option<usize>,

        #[command(flatten)]
        delta: DeltaArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Merge delta files into an overview
    Merge {
        /// Delta files written by `diff -o json`
        #[arg(required = true)]
        deltas: Vec<PathBuf>,

        /// Extend this overview instead of starting empty
        #[arg(long)]
        from: Option<PathBuf>,

        /// Output file path (stdout if not specified)
        #[arg(short = 'O', long)]
        output_file: Option<PathBuf>,
    },

    /// Report on a stored overview
    Report {
        overview: PathBuf,

        /// Restrict the report to the latest run of this host
        #[arg(long)]
        node: Option<String>,

        /// Nodes listed in the report
        #[arg(long)]
        top_n: Option<usize>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print a JSON schema or an example configuration
    Schema {
        #[arg(value_enum, default_value = "config")]
        kind: SchemaKind,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaKind {
    /// Configuration file schema
    Config,
    /// Exclusion rule file schema
    Excludes,
    /// Example configuration file
    Example,
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            exit_codes::ERROR
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Diff {
            baseline,
            preview,
            node,
            delta,
            output,
        } => {
            let overrides = overrides(&delta, &output, None, cli.no_color);
            let config = resolve_config(cli.config.as_deref(), cli.preset.as_deref(), &overrides)?;
            let engine = engine(&config)?;

            let baseline_catalog = pipeline::load_catalog(&baseline)?;
            let preview_catalog = pipeline::load_catalog(&preview)?;
            let context = DeltaContext::new(node).with_catalog_paths(
                baseline.display().to_string(),
                preview.display().to_string(),
            );
            let result = engine.compare(&baseline_catalog, &preview_catalog, &context)?;

            let target = OutputTarget::from_option(output.output_file);
            let use_color = pipeline::should_use_color(config.report.no_color, &target);
            let rendered = create_reporter(config.report.format, use_color).render(&result)?;
            pipeline::write_output(&rendered, &target)?;
            Ok(Severity::of_delta(&result).exit_code())
        }

        Commands::Fleet {
            root,
            environment,
            from,
            overview,
            top_n,
            delta,
            output,
        } => {
            let overrides = overrides(&delta, &output, top_n, cli.no_color);
            let config = resolve_config(cli.config.as_deref(), cli.preset.as_deref(), &overrides)?;
            let engine = engine(&config)?;

            let factory = match &from {
                Some(path) => Factory::from_overview(&pipeline::load_overview(path)?)?,
                None => Factory::new(),
            };
            let (jobs, mut errors) = pipeline::load_fleet(&root, &environment)?;
            let factory = Mutex::new(factory);
            let outcome = pipeline::compare_and_merge(&engine, jobs, &factory);
            errors.extend(outcome.errors);
            for failure in &errors {
                eprintln!("{}: {}", failure.node, failure.error);
            }

            let merged = factory
                .into_inner()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .create_overview();
            if let Some(path) = overview {
                pipeline::write_output(&merged.to_json()?, &OutputTarget::File(path))?;
            }
            let target = OutputTarget::from_option(output.output_file);
            let rendered = render_report(&merged, config.report.top_n, config.report.format)?;
            pipeline::write_output(&rendered, &target)?;

            Ok(if errors.is_empty() {
                exit_codes::SUCCESS
            } else {
                exit_codes::PARTIAL
            })
        }

        Commands::Merge {
            deltas,
            from,
            output_file,
        } => {
            let mut factory = match &from {
                Some(path) => Factory::from_overview(&pipeline::load_overview(path)?)?,
                None => Factory::new(),
            };
            for path in &deltas {
                let delta = pipeline::load_delta(path)?;
                factory
                    .merge(&delta)
                    .with_context(|| format!("merging {}", path.display()))?;
            }
            let merged = factory.create_overview();
            tracing::info!(deltas = deltas.len(), entities = merged.len(), "overview merged");
            pipeline::write_output(&merged.to_json()?, &OutputTarget::from_option(output_file))?;
            Ok(exit_codes::SUCCESS)
        }

        Commands::Report {
            overview,
            node,
            top_n,
            output,
        } => {
            let overrides = ConfigOverrides {
                no_color: cli.no_color,
                top_n,
                format: output.output,
                ..ConfigOverrides::default()
            };
            let config = resolve_config(cli.config.as_deref(), cli.preset.as_deref(), &overrides)?;

            let mut loaded = pipeline::load_overview(&overview)?;
            if let Some(name) = node {
                let id = Query::new(&loaded)
                    .latest_node(&name)
                    .map(|n| n.id())
                    .with_context(|| format!("no node named {name} in {}", overview.display()))?;
                let mut extractor = NodeExtractor::new(&loaded);
                extractor.add_node(id)?;
                loaded = extractor.overview();
            }
            let rendered = render_report(&loaded, config.report.top_n, config.report.format)?;
            pipeline::write_output(&rendered, &OutputTarget::from_option(output.output_file))?;
            Ok(exit_codes::SUCCESS)
        }

        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "catalog-delta", &mut std::io::stdout());
            Ok(exit_codes::SUCCESS)
        }

        Commands::Schema { kind } => {
            let text = match kind {
                SchemaKind::Config => generate_json_schema(),
                SchemaKind::Excludes => Exclude::json_schema(),
                SchemaKind::Example => generate_example_config(),
            };
            println!("{text}");
            Ok(exit_codes::SUCCESS)
        }
    }
}

fn overrides(
    delta: &DeltaArgs,
    output: &OutputArgs,
    top_n: Option<usize>,
    no_color: bool,
) -> ConfigOverrides {
    ConfigOverrides {
        skip_tags: delta.skip_tags,
        verbose_diff: delta.verbose_diff,
        diff_string_numeric: delta.diff_string_numeric,
        diff_array_value: delta.diff_array_value,
        no_color,
        top_n,
        format: output.output,
        excludes_file: delta.excludes.clone(),
    }
}

fn engine(config: &AppConfig) -> Result<DeltaEngine> {
    let engine = DeltaEngine::new().with_options(config.delta);
    match &config.excludes.file {
        Some(path) => {
            let rules = Exclude::parse_file(path)?;
            tracing::debug!(rules = rules.len(), "loaded exclusion rules");
            Ok(engine.with_excludes(&rules)?)
        }
        None => Ok(engine),
    }
}

fn render_report(overview: &Overview, top_n: usize, format: ReportFormat) -> Result<String> {
    let report = Report::new(overview).with_top_n(top_n);
    let rendered = match format {
        ReportFormat::Json => serde_json::to_string_pretty(&report.to_value()?)?,
        ReportFormat::Text => report.to_text()?,
        ReportFormat::Summary => reports::render_summary(&report.build())?,
    };
    Ok(rendered)
}
