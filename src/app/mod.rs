use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use qfilter::codec::{serialize, to_query_string};
use qfilter::config::{ExprSpec, FilterConfig};
use qfilter::filter::{FilterExpression, JsonEvaluator, RecordEvaluator, evaluate_filter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Parse a URL query string into a filter expression
    Parse {
        /// Query string such as "q=p1&filter[p1][name]=age&..." ("-" reads stdin)
        query: String,

        /// Parser configuration file (YAML)
        #[arg(short, long, env = "QFILTER_CONFIG")]
        config: Option<PathBuf>,

        /// Reject filter names that have no configured rule
        #[arg(long)]
        strict: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Evaluate the expression against a JSON object and print the result
        #[arg(long)]
        record: Option<PathBuf>,
    },

    /// Encode an expression file (YAML or JSON) into query parameters
    Encode {
        /// Expression file
        #[arg(short, long)]
        expr: PathBuf,

        /// Print one `key=value` pair per line instead of a query string
        #[arg(long)]
        params: bool,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn run(cli: &Cli) -> Result<String> {
    match &cli.command {
        Command::Parse {
            query,
            config,
            strict,
            format,
            record,
        } => run_parse(query, config.as_deref(), *strict, *format, record.as_deref()),
        Command::Encode { expr, params } => run_encode(expr, *params),
    }
}

fn load_config(path: Option<&Path>, strict: bool) -> Result<FilterConfig> {
    let mut config = match path {
        Some(path) => FilterConfig::load(path)
            .with_context(|| format!("Config: Failed to load {:?}", path))?,
        None => FilterConfig::default(),
    };
    config.transform.strict |= strict;

    tracing::info!(
        "Config: {} field rules (strict: {}, max tokens: {})",
        config.transform.fields.len(),
        config.transform.strict,
        config.limits.token_budget()
    );
    Ok(config)
}

fn read_query(query: &str) -> Result<String> {
    if query != "-" {
        return Ok(query.to_string());
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("CLI: Failed to read query from stdin")?;
    Ok(buf.trim().to_string())
}

fn load_record(path: &Path) -> Result<HashMap<String, String>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Record: Failed to read {:?}", path))?;
    let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&contents)
        .with_context(|| format!("Record: {:?} is not a JSON object", path))?;

    Ok(object
        .into_iter()
        .map(|(k, v)| {
            let v = match v {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (k, v)
        })
        .collect())
}

pub fn run_parse(
    query: &str,
    config: Option<&Path>,
    strict: bool,
    format: OutputFormat,
    record: Option<&Path>,
) -> Result<String> {
    let config = load_config(config, strict)?;
    let parser = config.parser();
    let raw = read_query(query)?;

    let expr = parser
        .parse_query_string(&raw)
        .context("Parse: Invalid filter query")?;

    if let Some(path) = record {
        let record = load_record(path)?;
        let matched = RecordEvaluator::matches(&expr, &record).context("Eval: Failed")?;
        return Ok(matched.to_string());
    }

    render(&expr, format)
}

fn render(expr: &FilterExpression, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(expr.to_string()),
        OutputFormat::Json => {
            let value = evaluate_filter(&mut JsonEvaluator, expr).context("Output: Failed")?;
            Ok(serde_json::to_string_pretty(&value)?)
        }
    }
}

pub fn run_encode(path: &Path, as_params: bool) -> Result<String> {
    let spec = ExprSpec::load(path)
        .with_context(|| format!("Encode: Failed to read expression {:?}", path))?;
    let expr = spec.build().context("Encode: Invalid expression")?;
    tracing::info!("Encode: {} ({} leaves)", expr, expr.leaf_count());

    if as_params {
        let params = serialize(&expr).context("Encode: Failed")?;
        return Ok(params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("\n"));
    }

    to_query_string(&expr).context("Encode: Failed")
}
