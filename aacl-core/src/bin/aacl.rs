//! AACL command-line client.
//!
//! # Usage
//!
//! ```bash
//! # Fetch a grammar and print it (the grammar is discarded, never executed)
//! aacl --base-url http://localhost:8000 issue TRANSFER_MONEY
//!
//! # Bind fields to a fresh grammar and execute once
//! AACL_SESSION_COOKIE="session=..." aacl --base-url http://localhost:8000 \
//!     send TRANSFER_MONEY -f recipient_id=456 -f amount=50 -f memo=rent
//!
//! # Same, with the data as one JSON object
//! aacl --config aacl.yaml send CHANGE_PASSWORD --json '{"current_password": "..."}'
//! ```
//!
//! `-f key=value` values are parsed as JSON when they parse (`50`, `true`,
//! `"quoted"`), and taken as plain strings otherwise.

use aacl::grammar::Grammar;
use aacl::{ClientConfig, GrammarTransport, HttpTransport, Session};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "aacl")]
#[command(version, about = "AACL single-use grammar client", long_about = None)]
struct Cli {
    /// Path to a YAML client configuration file
    #[arg(short, long, env = "AACL_CONFIG")]
    config: Option<PathBuf>,

    /// Server base URL (overrides the configuration file)
    #[arg(long, env = "AACL_BASE_URL")]
    base_url: Option<String>,

    /// Log filter (e.g. warn, debug, aacl=debug)
    #[arg(long, env = "AACL_LOG", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a grammar for an intent and print it
    Issue {
        /// Intent to request a grammar for
        intent: String,
    },

    /// Bind caller data to a fresh grammar and execute the intent once
    Send {
        /// Intent to execute
        intent: String,

        /// Field in key=value format (repeatable)
        #[arg(short = 'f', long = "field")]
        fields: Vec<String>,

        /// Caller data as a JSON object (merged under -f fields)
        #[arg(long)]
        json: Option<String>,
    },

    /// Print client version and resolved configuration
    Info,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Issue { intent } => {
            let transport = HttpTransport::new(&config)?;
            let grammar: Grammar = transport.fetch_grammar(&intent).await?;
            if let Err(e) = grammar.validate() {
                eprintln!("⚠ WARNING: {}", e);
            }
            println!("{}", serde_json::to_string_pretty(&grammar)?);
        }

        Commands::Send {
            intent,
            fields,
            json,
        } => {
            let data = collect_data(json.as_deref(), &fields)?;
            let mut session = Session::from_config(&config)?;
            let result = session.send(&intent, &data).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Info => {
            println!("AACL client v{}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Base URL:       {}", config.base_url);
            match config.timeout() {
                Some(timeout) => println!("Timeout:        {:?}", timeout),
                None => println!("Timeout:        none"),
            }
            println!("User-Agent:     {}", config.user_agent);
            println!(
                "Session cookie: {}",
                if config.session_cookie.is_some() {
                    "configured"
                } else {
                    "none"
                }
            );
            println!(
                "Bearer token:   {}",
                if config.bearer_token.is_some() {
                    "configured"
                } else {
                    "none"
                }
            );
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<ClientConfig, Box<dyn std::error::Error>> {
    let mut config = match (&cli.config, &cli.base_url) {
        (Some(path), _) => ClientConfig::from_file(path)?,
        (None, Some(url)) => ClientConfig::new(url.clone()),
        (None, None) => {
            return Err("no server configured: pass --base-url or --config".into());
        }
    };
    config.apply_env()?;
    if let Some(url) = &cli.base_url {
        config.base_url = url.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Merge `--json` and `-f` fields into one object; `-f` wins on conflicts.
fn collect_data(
    json: Option<&str>,
    fields: &[String],
) -> Result<Map<String, Value>, Box<dyn std::error::Error>> {
    let mut data = match json {
        Some(raw) => match serde_json::from_str::<Value>(raw)? {
            Value::Object(map) => map,
            _ => return Err("--json must be a JSON object".into()),
        },
        None => Map::new(),
    };

    for field in fields {
        let (key, value) = parse_field(field)?;
        data.insert(key, value);
    }
    Ok(data)
}

fn parse_field(field: &str) -> Result<(String, Value), Box<dyn std::error::Error>> {
    let (key, raw) = field
        .split_once('=')
        .ok_or_else(|| format!("Invalid field format (expected key=value): {}", field))?;
    if key.is_empty() {
        return Err(format!("Invalid field format (empty key): {}", field).into());
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_field_values() {
        assert_eq!(parse_field("amount=50").unwrap(), ("amount".into(), json!(50)));
        assert_eq!(parse_field("to=bob").unwrap(), ("to".into(), json!("bob")));
        assert_eq!(parse_field("flag=true").unwrap(), ("flag".into(), json!(true)));
        assert_eq!(parse_field("memo=a=b").unwrap(), ("memo".into(), json!("a=b")));
        assert_eq!(parse_field("empty=").unwrap(), ("empty".into(), json!("")));
    }

    #[test]
    fn test_parse_field_rejects_malformed() {
        assert!(parse_field("amount").is_err());
        assert!(parse_field("=50").is_err());
    }

    #[test]
    fn test_collect_data_merges_fields_over_json() {
        let data = collect_data(
            Some(r#"{"amount": 10, "memo": "rent"}"#),
            &["amount=50".to_string()],
        )
        .unwrap();
        assert_eq!(Value::Object(data), json!({"amount": 50, "memo": "rent"}));
    }

    #[test]
    fn test_collect_data_rejects_non_object_json() {
        assert!(collect_data(Some("[1, 2]"), &[]).is_err());
    }
}
