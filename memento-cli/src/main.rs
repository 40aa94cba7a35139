//! memento CLI
//!
//! Memoizes external programs: each stdin line is a JSON array of arguments,
//! and the program only runs for argument lists it has not seen before.

use std::io::{self, BufRead, Write};
use std::process::Command;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use serde_json::Value;
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use memento_cache::{AdviceConfig, CachingAdvice, HashedKeyGenerator, JsonKeyGenerator, MemoryStore};
use memento_core::error::AdviceError;
use memento_core::traits::{Advice, KeyGenerator};
use memento_core::Invocation;

/// memento - memoize program runs by their arguments
#[derive(Parser)]
#[command(name = "memento")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the cache key derived from JSON arguments
    Key {
        /// Arguments, each one a JSON value
        args: Vec<String>,
        /// Hash the key with SHA3-256
        #[arg(long)]
        hash: bool,
        /// Namespace prepended to the key
        #[arg(long, env = "MEMENTO_KEY_PREFIX")]
        prefix: Option<String>,
    },

    /// Run a program once per distinct argument line read from stdin
    Run {
        /// Hash keys with SHA3-256
        #[arg(long)]
        hash: bool,
        /// Namespace prepended to every key
        #[arg(long, env = "MEMENTO_KEY_PREFIX")]
        prefix: Option<String>,
        /// Hold a lock across lookup, run and store
        #[arg(long, env = "MEMENTO_SERIALIZE_CALLS")]
        serialize: bool,
        /// Program and leading arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "memento_cache=trace,memento_cli=debug,info"
    } else {
        "memento_cli=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match cli.command {
        Commands::Key { args, hash, prefix } => {
            let config = advice_config(prefix, false);
            if hash {
                cmd_key(&args, config, HashedKeyGenerator::new(JsonKeyGenerator))
            } else {
                cmd_key(&args, config, JsonKeyGenerator)
            }
        }
        Commands::Run {
            hash,
            prefix,
            serialize,
            command,
        } => {
            let config = advice_config(prefix, serialize);
            if hash {
                cmd_run(&command, config, HashedKeyGenerator::new(JsonKeyGenerator))
            } else {
                cmd_run(&command, config, JsonKeyGenerator)
            }
        }
    }
}

fn advice_config(prefix: Option<String>, serialize: bool) -> AdviceConfig {
    AdviceConfig {
        key_prefix: prefix.filter(|p| !p.is_empty()),
        serialize_calls: serialize,
    }
}

/// Print the key for a list of JSON arguments
fn cmd_key<G>(raw_args: &[String], config: AdviceConfig, key_generator: G) -> Result<()>
where
    G: KeyGenerator<Vec<Value>>,
{
    let args = raw_args
        .iter()
        .map(|raw| parse_arg(raw))
        .collect::<Result<Vec<Value>>>()?;

    let advice = CachingAdvice::with_config(Arc::new(MemoryStore::<String>::new()), config)
        .with_key_generator(key_generator);
    let key = advice.key_for(&args).context("Failed to derive key")?;

    println!("{key}");
    Ok(())
}

/// Counts reported after a run
#[derive(Debug)]
struct RunSummary {
    runs: usize,
    hits: u64,
    distinct: usize,
    failures: usize,
}

/// Run the program for each stdin line, reusing earlier output
fn cmd_run<G>(command: &[String], config: AdviceConfig, key_generator: G) -> Result<()>
where
    G: KeyGenerator<Vec<Value>>,
{
    let advice = CachingAdvice::with_config(Arc::new(MemoryStore::new()), config)
        .with_key_generator(key_generator);
    let summary = run_lines(io::stdin().lock(), io::stdout().lock(), command, &advice)?;

    let hits = summary.hits.to_string();
    eprintln!("\n{}", "Summary".cyan().bold());
    eprintln!("   {} {}", "Runs:".dimmed(), summary.runs);
    eprintln!("   {} {}", "Cache hits:".dimmed(), hits.green());
    eprintln!("   {} {}", "Distinct results:".dimmed(), summary.distinct);
    if summary.failures > 0 {
        let failures = summary.failures.to_string();
        eprintln!("   {} {}", "Failures:".dimmed(), failures.red());
    }

    Ok(())
}

/// Route each argument line through the advice and write the program's output
fn run_lines<R, W, G>(
    input: R,
    mut output: W,
    command: &[String],
    advice: &CachingAdvice<MemoryStore<String>, G>,
) -> Result<RunSummary>
where
    R: BufRead,
    W: Write,
    G: KeyGenerator<Vec<Value>>,
{
    let (program, leading) = command
        .split_first()
        .ok_or_else(|| anyhow!("No program given"))?;

    let mut runs = 0;
    let mut failures = 0;

    for (number, line) in input.lines().enumerate() {
        let line_no = number + 1;
        let line = line.context("Failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }
        let args = parse_line(&line).with_context(|| format!("Line {line_no}"))?;

        let invocation = Invocation::new(args, |args: Vec<Value>| {
            runs += 1;
            run_program(program, leading, &args)
        });

        match advice.around(invocation) {
            Ok(result) => write!(output, "{result}")?,
            Err(AdviceError::Operation(e)) => {
                failures += 1;
                warn!(line = line_no, error = %e, "Program failed, result not cached");
            }
            Err(AdviceError::KeyGeneration(e)) => {
                return Err(e).with_context(|| format!("Line {line_no}"));
            }
        }
    }
    output.flush()?;

    let stats = advice.store().stats();
    Ok(RunSummary {
        runs,
        hits: stats.hits,
        distinct: stats.entries,
        failures,
    })
}

/// Parse one command-line argument as JSON
fn parse_arg(raw: &str) -> Result<Value> {
    serde_json::from_str::<Value>(raw)
        .with_context(|| format!("Invalid JSON argument: {raw}"))
}

/// Parse one stdin line as a JSON array of arguments
fn parse_line(line: &str) -> Result<Vec<Value>> {
    match serde_json::from_str::<Value>(line).context("Invalid JSON")? {
        Value::Array(args) => Ok(args),
        other => bail!("Expected a JSON array of arguments, got {other}"),
    }
}

/// Render JSON values as program arguments; strings are passed unquoted
fn program_args(args: &[Value]) -> Vec<String> {
    args.iter()
        .map(|arg| match arg {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect()
}

fn run_program(program: &str, leading: &[String], args: &[Value]) -> Result<String> {
    let args = program_args(args);
    debug!(program, ?args, "Running program");

    let output = Command::new(program)
        .args(leading)
        .args(&args)
        .output()
        .with_context(|| format!("Failed to start {program}"))?;

    if !output.status.success() {
        bail!(
            "{program} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
