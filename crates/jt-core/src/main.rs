//! jt-core - junction-tree inference CLI
//!
//! Validates and compiles discrete Bayesian networks and answers marginal,
//! joint and conditional probability queries. Payloads go to stdout, logs
//! and errors to stderr.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use jt_config::settings::MAX_PRECISION;
use jt_core::config::{load_config, ConfigError, ConfigOptions, ResolvedConfig};
use jt_core::error::EngineError;
use jt_core::exit_codes::ExitCode;
use jt_core::inference::{EngineOptions, InferAllOptions, InferenceEngine, TraversalMode};
use jt_core::logging::{
    event_names, init_logging, LogConfig, LogContext, LogFormat, LogLevel, Stage,
};
use jt_core::output::{
    render, CheckReport, CompileReport, ErrorOutput, InferReport, OutputFormat, QueryReport,
    Render,
};
use jt_core::schema::{
    available_schemas, format_schema, generate_all_schemas, generate_schema, SchemaFormat,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

/// Junction-tree exact inference for discrete Bayesian networks
#[derive(Parser)]
#[command(name = "jt-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Settings file (JSON, YAML or TOML)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Override the propagation traversal (recursive | iterative)
    #[arg(long, global = true)]
    traversal: Option<TraversalMode>,

    /// Minimum log level
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,

    /// Log format on stderr
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a network file
    Check(CheckArgs),

    /// Show the junction forest compiled from a network
    Compile(NetworkArg),

    /// Posterior marginals of every variable
    Infer(InferArgs),

    /// Joint or conditional probability of an event
    Query(QueryArgs),

    /// Print JSON Schemas (network format by default)
    Schema(SchemaArgs),

    /// Print version information
    Version,
}

#[derive(Args, Debug)]
struct NetworkArg {
    /// Network file; falls back to JT_NETWORK and the config directories
    network: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CheckArgs {
    #[command(flatten)]
    input: NetworkArg,

    /// Also require every distribution to sum to 1
    #[arg(long)]
    strict: bool,
}

#[derive(Args, Debug)]
struct InferArgs {
    #[command(flatten)]
    input: NetworkArg,

    /// Observation NAME=STATE (repeatable)
    #[arg(long, short = 'e', value_parser = parse_assignment)]
    evidence: Vec<(String, String)>,

    /// Decimal places for reported probabilities
    #[arg(long)]
    precision: Option<u32>,
}

#[derive(Args, Debug)]
struct QueryArgs {
    #[command(flatten)]
    input: NetworkArg,

    /// Event NAME=STATE (repeatable; all must hold)
    #[arg(long, required = true, value_parser = parse_assignment)]
    event: Vec<(String, String)>,

    /// Condition NAME=STATE (repeatable)
    #[arg(long, value_parser = parse_assignment)]
    given: Vec<(String, String)>,

    /// Observation NAME=STATE (repeatable)
    #[arg(long, short = 'e', value_parser = parse_assignment)]
    evidence: Vec<(String, String)>,
}

#[derive(Args, Debug)]
struct SchemaArgs {
    /// Type name (see --list)
    #[arg(default_value = jt_core::schema::DEFAULT_SCHEMA)]
    name: String,

    /// List available schema types
    #[arg(long, conflicts_with = "all")]
    list: bool,

    /// Print every schema keyed by type name
    #[arg(long)]
    all: bool,

    /// Single-line JSON
    #[arg(long)]
    compact: bool,
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let (name, state) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=STATE, got {:?}", raw))?;
    let (name, state) = (name.trim(), state.trim());
    if name.is_empty() || state.is_empty() {
        return Err(format!("expected NAME=STATE, got {:?}", raw));
    }
    Ok((name.to_string(), state.to_string()))
}

/// Failure of one command.
#[derive(Debug, Error)]
enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("invalid argument: {0}")]
    Args(String),

    #[error("failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CommandError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CommandError::Config(e) => ExitCode::from(e),
            CommandError::Engine(e) => ExitCode::from(e),
            CommandError::Args(_) => ExitCode::ArgsError,
            CommandError::Output(_) => ExitCode::InternalError,
        }
    }

    fn output(&self) -> ErrorOutput {
        let exit_code = self.exit_code();
        let error = match self {
            CommandError::Config(e) => e.report(),
            CommandError::Engine(e) => e.report(),
            CommandError::Args(message) => jt_core::ErrorReport {
                code: exit_code.as_i32() as u32,
                category: jt_core::ErrorCategory::Config,
                message: message.clone(),
                recoverable: true,
            },
            CommandError::Output(e) => EngineError::Internal(e.to_string()).report(),
        };
        ErrorOutput {
            status: "error".to_string(),
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_name().to_string(),
            error,
        }
    }
}

// ============================================================================
// Main entry point
// ============================================================================

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let log_config = LogConfig::from_env(cli.global.log_level, cli.global.log_format)
        .with_verbosity(cli.global.verbose, cli.global.quiet);
    init_logging(&log_config);

    let ctx = LogContext::generate();
    let exit_code = {
        let _span = ctx.span(Stage::Init).entered();
        info!(target: event_names::RUN_STARTED, version = env!("CARGO_PKG_VERSION"), "jt-core started");
        let result = match &cli.command {
            Commands::Check(args) => run_check(&cli.global, &ctx, args),
            Commands::Compile(args) => run_compile(&cli.global, &ctx, args),
            Commands::Infer(args) => run_infer(&cli.global, &ctx, args),
            Commands::Query(args) => run_query(&cli.global, &ctx, args),
            Commands::Schema(args) => run_schema(args),
            Commands::Version => run_version(&cli.global, &ctx),
        };
        let code = match result {
            Ok(()) => ExitCode::Ok,
            Err(e) => report_error(&cli.global, &ctx, &e),
        };
        info!(target: event_names::RUN_FINISHED, exit_code = code.as_i32(), "jt-core finished");
        code
    };

    exit_code.into()
}

fn report_error(global: &GlobalOpts, ctx: &LogContext, error: &CommandError) -> ExitCode {
    let code = error.exit_code();
    if code == ExitCode::InternalError {
        tracing::error!(target: event_names::INTERNAL_ERROR, "{}", error);
    } else {
        debug!(exit_code = code.as_i32(), "{}", error);
    }
    let payload = error.output();
    match render(global.format, &ctx.run_id, "error", &payload) {
        Ok(text) => eprintln!("{}", text),
        Err(_) => eprintln!("{}", payload.summary()),
    }
    code
}

fn emit<T: Serialize + Render>(
    global: &GlobalOpts,
    ctx: &LogContext,
    command: &str,
    payload: &T,
) -> Result<(), CommandError> {
    let _span = ctx.span(Stage::Report).entered();
    println!("{}", render(global.format, &ctx.run_id, command, payload)?);
    Ok(())
}

// ============================================================================
// Command implementations
// ============================================================================

fn load(
    global: &GlobalOpts,
    ctx: &LogContext,
    input: &NetworkArg,
    strict: bool,
) -> Result<ResolvedConfig, CommandError> {
    let _span = ctx.span(Stage::Load).entered();
    let config = load_config(&ConfigOptions {
        settings_path: global.settings.clone(),
        network_path: input.network.clone(),
        strict_probabilities: strict,
    })?;
    Ok(config)
}

fn build_engine(
    global: &GlobalOpts,
    ctx: &LogContext,
    config: ResolvedConfig,
) -> Result<InferenceEngine, CommandError> {
    let _span = ctx.span(Stage::Compile).entered();
    let mut options = EngineOptions::from(&config.settings);
    if let Some(mode) = global.traversal {
        options.traversal = mode;
    }
    let engine = InferenceEngine::with_options(config.network, options)?;
    let topology = engine.topology();
    info!(
        target: event_names::COMPILE_FINISHED,
        cliques = topology.clique_count(),
        treewidth = topology.treewidth(),
        fill_edges = topology.fill_edges().len(),
        "junction forest compiled"
    );
    Ok(engine)
}

fn apply_evidence(
    ctx: &LogContext,
    engine: &mut InferenceEngine,
    evidence: &[(String, String)],
) -> Result<(), CommandError> {
    let _span = ctx.span(Stage::Evidence).entered();
    engine.set_evidence(evidence.iter().map(|(k, v)| (k, v)))?;
    info!(
        target: event_names::EVIDENCE_CHANGED,
        observed = engine.evidence().len(),
        "evidence applied"
    );
    Ok(())
}

fn run_check(global: &GlobalOpts, ctx: &LogContext, args: &CheckArgs) -> Result<(), CommandError> {
    let config = load(global, ctx, &args.input, args.strict)?;
    let strict = args.strict || config.settings.validation.strict_probabilities;
    let report = CheckReport {
        status: "ok".to_string(),
        network_path: config.paths.network.as_ref().map(|p| p.display().to_string()),
        config_id: config.snapshot.short_id().to_string(),
        strict_probabilities: strict,
        network: config.network.summary(),
    };
    emit(global, ctx, "check", &report)
}

fn run_compile(global: &GlobalOpts, ctx: &LogContext, args: &NetworkArg) -> Result<(), CommandError> {
    let config = load(global, ctx, args, false)?;
    let engine = build_engine(global, ctx, config)?;
    let report = CompileReport::from_topology(&engine.topology());
    emit(global, ctx, "compile", &report)
}

fn run_infer(global: &GlobalOpts, ctx: &LogContext, args: &InferArgs) -> Result<(), CommandError> {
    let config = load(global, ctx, &args.input, false)?;
    let precision = args.precision.or(config.settings.output.precision);
    if let Some(p) = precision {
        if p > MAX_PRECISION {
            return Err(CommandError::Args(format!(
                "precision {} exceeds the maximum of {}",
                p, MAX_PRECISION
            )));
        }
    }
    let mut engine = build_engine(global, ctx, config)?;
    apply_evidence(ctx, &mut engine, &args.evidence)?;

    let report = {
        let _span = ctx.span(Stage::Propagate).entered();
        let evidence_probability = engine.evidence_probability()?;
        info!(
            target: event_names::PROPAGATE_FINISHED,
            evidence_probability,
            "potentials propagated"
        );
        let marginals = engine.infer_all(InferAllOptions { precision })?;
        InferReport {
            evidence: engine.evidence(),
            evidence_probability,
            marginals,
        }
    };
    emit(global, ctx, "infer", &report)
}

fn run_query(global: &GlobalOpts, ctx: &LogContext, args: &QueryArgs) -> Result<(), CommandError> {
    let config = load(global, ctx, &args.input, false)?;
    let mut engine = build_engine(global, ctx, config)?;
    apply_evidence(ctx, &mut engine, &args.evidence)?;

    let probability = {
        let _span = ctx.span(Stage::Query).entered();
        let event = args.event.iter().map(|(k, v)| (k, v));
        let given = args.given.iter().map(|(k, v)| (k, v));
        let p = engine.conditional(event, given)?;
        info!(target: event_names::QUERY_ANSWERED, probability = p, "query answered");
        p
    };
    let report = QueryReport {
        event: to_map(&args.event),
        given: to_map(&args.given),
        evidence: engine.evidence(),
        probability,
    };
    emit(global, ctx, "query", &report)
}

fn run_schema(args: &SchemaArgs) -> Result<(), CommandError> {
    if args.list {
        for (name, description) in available_schemas() {
            println!("{:<16} {}", name, description);
        }
        return Ok(());
    }
    let format = if args.compact {
        SchemaFormat::JsonCompact
    } else {
        SchemaFormat::Json
    };
    let schema = if args.all {
        serde_json::to_value(generate_all_schemas())?
    } else {
        generate_schema(&args.name)
            .ok_or_else(|| CommandError::Args(format!("unknown schema type: {}", args.name)))?
    };
    println!("{}", format_schema(&schema, format)?);
    Ok(())
}

#[derive(Serialize)]
struct VersionInfo {
    version: &'static str,
    config_schema_version: &'static str,
    output_schema_version: &'static str,
}

impl Render for VersionInfo {
    fn markdown(&self) -> String {
        format!(
            "# jt-core {}\n\nConfig schema: {}\nOutput schema: {}\n",
            self.version, self.config_schema_version, self.output_schema_version
        )
    }

    fn summary(&self) -> String {
        format!("jt-core {}", self.version)
    }
}

fn run_version(global: &GlobalOpts, ctx: &LogContext) -> Result<(), CommandError> {
    let info = VersionInfo {
        version: env!("CARGO_PKG_VERSION"),
        config_schema_version: jt_config::CONFIG_SCHEMA_VERSION,
        output_schema_version: jt_core::output::OUTPUT_SCHEMA_VERSION,
    };
    emit(global, ctx, "version", &info)
}

fn to_map(pairs: &[(String, String)]) -> BTreeMap<String, String> {
    pairs.iter().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("RAIN=T").unwrap(),
            ("RAIN".to_string(), "T".to_string())
        );
        assert_eq!(
            parse_assignment(" RAIN = T ").unwrap(),
            ("RAIN".to_string(), "T".to_string())
        );
        assert!(parse_assignment("RAIN").is_err());
        assert!(parse_assignment("=T").is_err());
    }
}
