//! AggForge CLI
//!
//! Command-line interface for compiling analytics requests into search queries.

use std::collections::BTreeSet;
use std::io::{self, Read};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use aggforge::adapter::{
    FacetsQueryAdapter, MeasuresQueryAdapter, MessageMeasuresQueryAdapter, QueryAdapter,
    TimeSeriesQueryAdapter,
};
use aggforge::document::QueryDocument;
use aggforge::fields::{self, Domain};
use aggforge::models::{FacetsQuery, MeasuresQuery, TimeSeriesQuery};
use aggforge::Config;

/// AggForge - analytics aggregation query compiler
#[derive(Parser)]
#[command(name = "aggforge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "AGGFORGE_CONFIG")]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a request file into a query document
    Compile {
        #[command(subcommand)]
        command: CompileCommands,
    },

    /// List the fields metrics, filters and facets resolve to
    Fields {
        /// Metrics domain
        #[arg(long, default_value_t = Domain::Http)]
        domain: Domain,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum CompileCommands {
    /// Flat measures over the time range
    Measures(CompileArgs),

    /// Measures grouped by facets
    Facets(CompileArgs),

    /// Measures bucketed over time
    TimeSeries {
        #[command(flatten)]
        args: CompileArgs,

        /// Bucket width (e.g. "5m", "1h"), overrides the request's interval
        #[arg(long)]
        interval: Option<humantime::Duration>,
    },

    /// Message measures, optionally restricted to request ids
    Messages {
        #[command(flatten)]
        input: InputArgs,

        /// Request id to restrict to (repeatable)
        #[arg(long = "request-id")]
        request_ids: Vec<String>,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Request JSON file, `-` for stdin
    #[arg(short, long, default_value = "-")]
    input: String,
}

#[derive(Args)]
struct CompileArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Metrics domain
    #[arg(long, default_value_t = Domain::Http)]
    domain: Domain,
}

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    dotenvy::dotenv().ok();

    // Load configuration
    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config, cli.verbose);

    // Execute command
    let result = match cli.command {
        Commands::Compile { command } => run_compile(&config, command, cli.format),
        Commands::Fields { domain } => run_fields(domain, cli.format),
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(config: &Config, verbose: bool) {
    let log_level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run_compile(config: &Config, command: CompileCommands, format: OutputFormat) -> anyhow::Result<()> {
    let compiler = config.compiler.clone();

    let doc = match command {
        CompileCommands::Measures(args) => {
            let query: MeasuresQuery = read_request(&args.input)?;
            MeasuresQueryAdapter::new(args.domain, compiler).adapt(&query)?
        }
        CompileCommands::Facets(args) => {
            let query: FacetsQuery = read_request(&args.input)?;
            FacetsQueryAdapter::new(args.domain, compiler).adapt(&query)?
        }
        CompileCommands::TimeSeries { args, interval } => {
            let mut query: TimeSeriesQuery = read_request(&args.input)?;
            if let Some(interval) = interval {
                let millis = std::time::Duration::from(interval).as_millis();
                query.interval = u64::try_from(millis).context("interval is too large")?;
                debug!(interval_ms = query.interval, "Interval overridden");
            }
            TimeSeriesQueryAdapter::new(args.domain, compiler).adapt(&query)?
        }
        CompileCommands::Messages { input, request_ids } => {
            let query: MeasuresQuery = read_request(&input)?;
            let request_ids: BTreeSet<String> = request_ids.into_iter().collect();
            MessageMeasuresQueryAdapter::new(compiler).adapt(&query, Some(&request_ids))?
        }
    };

    println!("{}", render(&doc, format, config.compiler.pretty)?);
    Ok(())
}

fn read_request<T: DeserializeOwned>(args: &InputArgs) -> anyhow::Result<T> {
    let raw = if args.input == "-" {
        let mut raw = String::new();
        io::stdin()
            .read_to_string(&mut raw)
            .context("Failed to read request from stdin")?;
        raw
    } else {
        std::fs::read_to_string(&args.input)
            .with_context(|| format!("Failed to read request file {}", args.input))?
    };

    info!(input = %args.input, bytes = raw.len(), "Read request");

    serde_json::from_str(&raw).with_context(|| format!("Invalid request in {}", args.input))
}

/// Text output is always indented, JSON only when `pretty` is set
fn render(doc: &QueryDocument, format: OutputFormat, pretty: bool) -> anyhow::Result<String> {
    let rendered = match format {
        OutputFormat::Json if !pretty => doc.to_json()?,
        _ => doc.to_json_pretty()?,
    };
    Ok(rendered)
}

fn run_fields(domain: Domain, format: OutputFormat) -> anyhow::Result<()> {
    let mappings = fields::mappings(domain);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&mappings)?),
        OutputFormat::Text => {
            println!("Fields for the {domain} domain");
            println!("{}", "-".repeat(72));
            for mapping in &mappings {
                println!(
                    "{:<8} {:<28} {}",
                    mapping.kind.to_string(),
                    mapping.name,
                    mapping.fields.join(" | ")
                );
            }
        }
    }

    Ok(())
}

fn generate_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;

    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "aggforge", &mut io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;
    use aggforge::compiler::Aggs;

    fn doc() -> QueryDocument {
        QueryDocument::new(vec![], Aggs::new())
    }

    #[test]
    fn test_json_format_follows_pretty_setting() {
        let compact = render(&doc(), OutputFormat::Json, false).unwrap();
        assert!(!compact.contains('\n'));

        let indented = render(&doc(), OutputFormat::Json, true).unwrap();
        assert!(indented.contains('\n'));
    }

    #[test]
    fn test_text_format_is_always_indented() {
        for pretty in [false, true] {
            let rendered = render(&doc(), OutputFormat::Text, pretty).unwrap();
            assert!(rendered.contains('\n'));
        }
    }
}
