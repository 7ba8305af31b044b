//! Command-line interface.
//!
//! ```text
//! switchyard [--config PATH] [--output text|json|yaml] [-v...] <COMMAND>
//!   list                                 list registered names
//!   run <name> [args...]                 dispatch a handler
//!   register <alias> <target> [args...]  persist an alias
//!   remove <alias>                       delete a persisted alias
//!   batch [FILE]                         dispatch JSON-lines calls
//! ```
//!
//! Every positional handler argument is parsed as JSON and taken as a plain
//! string when that fails, so `run math.add 2 3` passes two numbers while
//! `run text.upper hi` passes a string.
//!
//! Exit codes: 0 on success, 1 when a dispatch fails or the command errors,
//! and clap's own code for usage errors.

use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use switchyard_dispatch::{
    render_result, serialize_structured, to_json_line, Call, Dispatcher, InvocationResult,
    OutputMode, Registry, RegistryError,
};
use tracing::{debug, info};

use crate::alias::AliasHandler;
use crate::config::{default_config_path, AliasSpec, Config, ConfigError, CONFIG_ENV};
use crate::{builtins, logging};

/// Top-level arguments.
#[derive(Debug, Parser)]
#[command(
    name = "switchyard",
    version,
    about = "Register handlers by name and dispatch to them"
)]
pub struct Cli {
    /// Alias config file [default: switchyard.yaml]
    #[arg(long, global = true, env = CONFIG_ENV, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputMode::Text)]
    pub output: OutputMode,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List registered names with their descriptions
    List,

    /// Dispatch a handler by name
    Run {
        name: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Persist an alias: a name for a target with preset leading arguments
    Register {
        /// Description shown by `list`
        #[arg(short, long)]
        description: Option<String>,
        alias: String,
        target: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Delete a persisted alias
    Remove { alias: String },

    /// Dispatch calls read as JSON lines (`{"name": ..., "args": [...]}`)
    Batch {
        /// Input file; reads stdin when omitted
        file: Option<PathBuf>,
    },
}

/// Parses `args`, runs the command and returns the process exit code.
pub fn run<I, T>(
    args: I,
    input: &mut dyn BufRead,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = if e.use_stderr() {
                write!(err, "{}", e)
            } else {
                write!(out, "{}", e)
            };
            return e.exit_code();
        }
    };

    logging::init(cli.verbose);

    match execute(cli, input, out, err) {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            let _ = writeln!(err, "error: {:#}", e);
            1
        }
    }
}

/// Runs a parsed command; `Ok(false)` means it ran but did not succeed.
pub fn execute(
    cli: Cli,
    input: &mut dyn BufRead,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<bool> {
    let path = cli.config.unwrap_or_else(default_config_path);
    let mode = cli.output;

    match cli.command {
        Command::List => {
            let registry = load_registry(&Config::load(&path)?)?;
            list(&registry, mode, out)?;
            Ok(true)
        }
        Command::Run { name, args } => {
            let registry = load_registry(&Config::load(&path)?)?;
            let result = Dispatcher::new().dispatch(&registry, &name, parse_args(&args));
            emit(out, &render_result(&result, mode)?)?;
            Ok(result.is_success())
        }
        Command::Register {
            description,
            alias,
            target,
            args,
        } => {
            let mut spec = AliasSpec::new(target, parse_args(&args));
            if let Some(description) = description {
                spec = spec.describe(description);
            }
            register(&path, &alias, spec)?;
            report(out, mode, "registered", &alias)?;
            Ok(true)
        }
        Command::Remove { alias } => {
            remove(&path, &alias)?;
            report(out, mode, "removed", &alias)?;
            Ok(true)
        }
        Command::Batch { file } => {
            let registry = load_registry(&Config::load(&path)?)?;
            batch(&registry, file.as_deref(), input, out, err, mode)
        }
    }
}

/// Parses one command-line argument: JSON if it parses, a string otherwise.
pub fn parse_arg(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn parse_args(raw: &[String]) -> Vec<Value> {
    raw.iter().map(|a| parse_arg(a)).collect()
}

/// Builds the registry: built-ins first, then the configured aliases.
fn load_registry(config: &Config) -> Result<Registry> {
    let mut registry = builtins::registry()?;
    config.install(&mut registry).context("invalid alias config")?;
    debug!(handlers = registry.len(), "registry ready");
    Ok(registry)
}

fn register(path: &Path, alias: &str, spec: AliasSpec) -> Result<()> {
    let mut config = Config::load(path)?;
    let mut registry = load_registry(&config)?;

    let inner = registry.get(&spec.target)?;
    let handler = AliasHandler::new(
        spec.target.clone(),
        inner,
        spec.args.clone(),
        spec.description.clone(),
    );
    if !handler.is_satisfiable() {
        return Err(ConfigError::TooManyPresetArgs {
            alias: alias.to_string(),
            target: spec.target,
        }
        .into());
    }
    registry.register(alias, handler)?;

    info!(alias, target = %spec.target, "registering alias");
    config.aliases.insert(alias.to_string(), spec);
    config.save(path)?;
    Ok(())
}

fn remove(path: &Path, alias: &str) -> Result<()> {
    if builtins::registry()?.contains(alias) {
        bail!("'{}' is a built-in handler and cannot be removed", alias);
    }

    let mut config = Config::load(path)?;
    if !config.aliases.contains_key(alias) {
        return Err(RegistryError::NotFound(alias.to_string()).into());
    }

    let dependents = config.dependents_of(alias);
    if !dependents.is_empty() {
        bail!(
            "alias '{}' is the target of {}",
            alias,
            dependents.join(", ")
        );
    }

    info!(alias, "removing alias");
    config.aliases.remove(alias);
    config.save(path)?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct ListEntry {
    name: String,
    description: Option<String>,
    min_args: usize,
    max_args: Option<usize>,
}

fn list(registry: &Registry, mode: OutputMode, out: &mut dyn Write) -> Result<()> {
    let entries = registry
        .list_names()
        .into_iter()
        .map(|name| {
            registry.describe(&name).map(|info| ListEntry {
                name: info.name,
                description: info.description,
                min_args: info.arity.min,
                max_args: info.arity.max,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if mode.is_structured() {
        return Ok(emit(out, &serialize_structured(&entries, mode)?)?);
    }

    let width = entries.iter().map(|e| e.name.len()).max().unwrap_or(0);
    for entry in &entries {
        match &entry.description {
            Some(description) => {
                writeln!(out, "{:<width$}  {}", entry.name, description, width = width)?
            }
            None => writeln!(out, "{}", entry.name)?,
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct Change<'a> {
    action: &'a str,
    alias: &'a str,
}

fn report(out: &mut dyn Write, mode: OutputMode, action: &str, alias: &str) -> Result<()> {
    if mode.is_structured() {
        Ok(emit(out, &serialize_structured(&Change { action, alias }, mode)?)?)
    } else {
        Ok(emit(out, &format!("{} alias '{}'", action, alias))?)
    }
}

/// Dispatches every parseable line; unparseable lines are reported on `err`.
///
/// JSON output is one compact result per line; YAML output is a single
/// sequence of results.
fn batch(
    registry: &Registry,
    file: Option<&Path>,
    input: &mut dyn BufRead,
    out: &mut dyn Write,
    err: &mut dyn Write,
    mode: OutputMode,
) -> Result<bool> {
    let mut file_reader;
    let reader: &mut dyn BufRead = match file {
        Some(path) => {
            let opened = File::open(path)
                .with_context(|| format!("failed to open batch file {}", path.display()))?;
            file_reader = BufReader::new(opened);
            &mut file_reader
        }
        None => input,
    };

    let (calls, malformed) = read_calls(reader, err)?;
    let results = Dispatcher::new().dispatch_batch(registry, calls);

    match mode {
        OutputMode::Json => {
            for result in &results {
                writeln!(out, "{}", to_json_line(result)?)?;
            }
        }
        OutputMode::Yaml => emit(out, &serialize_structured(&results, mode)?)?,
        OutputMode::Text => {
            for result in &results {
                writeln!(out, "{}", render_result(result, mode)?)?;
            }
        }
    }

    let ok = malformed == 0 && results.iter().all(InvocationResult::is_success);
    Ok(ok)
}

/// Reads JSON-lines calls, skipping blank lines. Returns the calls and the
/// number of lines that failed to parse.
fn read_calls(reader: &mut dyn BufRead, err: &mut dyn Write) -> Result<(Vec<Call>, usize)> {
    let mut calls = Vec::new();
    let mut malformed = 0;
    let mut line = String::new();
    let mut number = 0;

    loop {
        line.clear();
        if reader.read_line(&mut line).context("failed to read batch input")? == 0 {
            break;
        }
        number += 1;

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<Call>(trimmed) {
            Ok(call) => calls.push(call),
            Err(e) => {
                malformed += 1;
                writeln!(err, "error: line {}: {}", number, e)?;
            }
        }
    }

    debug!(calls = calls.len(), malformed, "read batch");
    Ok((calls, malformed))
}

fn emit(out: &mut dyn Write, text: &str) -> io::Result<()> {
    if text.is_empty() {
        Ok(())
    } else if text.ends_with('\n') {
        out.write_all(text.as_bytes())
    } else {
        writeln!(out, "{}", text)
    }
}
