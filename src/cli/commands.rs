//! CLI command implementations
//!
//! Each command loads the configuration, reads one request from stdin and
//! writes one response to stdout. Compilation runs against the offline
//! backend, so only domains that need no database round trip succeed.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::compiler::{CompileContext, DomainCompiler, OfflineBackend};
use crate::config::{is_valid_lang, CompilerConfig};
use crate::domain::{distribute_not, is_false, normalize, Domain};
use crate::observability::{log_event, Event, Logger};
use crate::schema::{Registry, SchemaLoader};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_request, write_error, write_response};

/// `compile` request body
#[derive(Debug, Deserialize)]
struct CompileRequest {
    model: String,
    domain: Value,
    #[serde(default)]
    lang: Option<String>,
    #[serde(default)]
    active_test: Option<bool>,
}

/// `normalize` request body
#[derive(Debug, Deserialize)]
struct NormalizeRequest {
    domain: Value,
}

/// Main CLI entry point
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    let result = run_command(cli.command);
    if let Err(e) = &result {
        log_event(
            Event::RequestFailed,
            &[("code", e.code_str()), ("message", e.message())],
        );
        write_error(e.code_str(), e.message())?;
    }
    result
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Compile { config } => compile(&config),
        Command::Normalize { config } => normalize_domain(&config),
    }
}

/// Compile the domain of one request
pub fn compile(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let registry = load_registry(&config)?;
    let request = read_request()?;
    let data = compile_request(&config, registry, request)?;
    write_response(data)
}

/// Normalize the domain of one request
pub fn normalize_domain(config_path: &Path) -> CliResult<()> {
    load_config(config_path)?;
    let request = read_request()?;
    let data = normalize_request(request)?;
    write_response(data)
}

fn load_config(config_path: &Path) -> CliResult<CompilerConfig> {
    let config = CompilerConfig::load(config_path)?;
    Logger::set_min_severity(config.severity()?);
    Ok(config)
}

fn load_registry(config: &CompilerConfig) -> CliResult<Registry> {
    let schema_dir = config
        .schema_dir
        .as_ref()
        .ok_or_else(|| CliError::config_error("schema_dir is not set"))?;
    let mut loader = SchemaLoader::new(schema_dir);
    loader.load_all()?;
    Ok(loader.into_registry())
}

fn compile_request(config: &CompilerConfig, registry: Registry, request: Value) -> CliResult<Value> {
    let request: CompileRequest = serde_json::from_value(request)
        .map_err(|e| CliError::invalid_request(format!("Invalid compile request: {}", e)))?;
    let domain = Domain::from_json(&request.domain)?;

    let mut context = CompileContext::from_config(config);
    if let Some(lang) = request.lang {
        if !is_valid_lang(&lang) {
            return Err(CliError::invalid_request(format!("Invalid lang: '{}'", lang)));
        }
        context = context.with_lang(lang);
    }
    if let Some(active_test) = request.active_test {
        context = context.with_active_test(active_test);
    }

    let compiler = DomainCompiler::new(Arc::new(registry), Arc::new(OfflineBackend)).with_context(context);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let explain = runtime.block_on(compiler.explain(&request.model, &domain))?;

    Ok(json!({
        "sql": explain.sql,
        "params": explain.params,
        "joins": explain.joins,
    }))
}

fn normalize_request(request: Value) -> CliResult<Value> {
    let request: NormalizeRequest = serde_json::from_value(request)
        .map_err(|e| CliError::invalid_request(format!("Invalid normalize request: {}", e)))?;
    let domain = Domain::from_json(&request.domain)?;

    Ok(json!({
        "normalized": normalize(&domain)?.to_json(),
        "distributed": distribute_not(&domain)?.to_json(),
        "is_false": is_false(&domain)?,
    }))
}
