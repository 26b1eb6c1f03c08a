use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde::Deserialize;
use stalk_transport::{
    ConfigurationError, Connection, Generation, TransportError, TransportOptions,
};

#[derive(Parser)]
#[command(name = "stalk", about = "Send and consume messages on beanstalkd tubes")]
struct Cli {
    /// Server DSN, e.g. beanstalkd://localhost:11300?tube_name=emails
    #[arg(long, env = "STALK_DSN", global = true)]
    dsn: Option<String>,

    /// Connection option as key=value; overrides the DSN query and config file
    #[arg(long = "option", value_name = "KEY=VALUE", value_parser = parse_pair, global = true)]
    options: Vec<(String, String)>,

    /// TOML file with `dsn` and an `[options]` table
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use the v4 client generation
    #[arg(long, global = true)]
    legacy_client: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Put a message on the tube
    Send {
        /// Message body
        body: String,

        /// Message header as key=value (repeatable)
        #[arg(long = "header", value_name = "KEY=VALUE", value_parser = parse_pair)]
        headers: Vec<(String, String)>,

        /// Milliseconds before the message becomes ready
        #[arg(long, default_value = "0")]
        delay_ms: u64,
    },

    /// Reserve the next ready message
    Get,

    /// Acknowledge (delete) a message
    Ack {
        /// Job id
        id: String,
    },

    /// Reject (discard) a message
    Reject {
        /// Job id
        id: String,
    },

    /// Show the number of ready messages
    Count,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    dsn: Option<String>,
    #[serde(default)]
    options: TransportOptions,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("cannot read config file {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("no DSN given; pass --dsn, set STALK_DSN or add `dsn` to the config file")]
    MissingDsn,

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got \"{raw}\"")),
    }
}

fn load_config(path: &Path) -> Result<ConfigFile, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::ReadConfig {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| CliError::ParseConfig {
        path: path.to_path_buf(),
        source,
    })
}

fn open(cli: &Cli) -> Result<Connection, CliError> {
    let file = match &cli.config {
        Some(path) => load_config(path)?,
        None => ConfigFile::default(),
    };

    let dsn = cli.dsn.clone().or(file.dsn).ok_or(CliError::MissingDsn)?;
    let mut options = file.options;
    for (key, value) in &cli.options {
        options.insert(key.as_str(), value.as_str());
    }

    let generation = if cli.legacy_client {
        Generation::V4
    } else {
        Generation::detect()
    };
    tracing::debug!(%generation, "opening connection");
    Ok(Connection::from_dsn_with(&dsn, &options, generation)?)
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut connection = open(&cli)?;

    match cli.command {
        Commands::Send {
            body,
            headers,
            delay_ms,
        } => {
            let headers: BTreeMap<String, String> = headers.into_iter().collect();
            let id = connection.send(&body, &headers, delay_ms)?;
            println!("Sent message {id} to \"{}\"", connection.tube());
        }
        Commands::Get => match connection.get()? {
            Some(message) => {
                println!("Message: {}", message.id);
                println!("  Body:    {}", message.body);
                let headers = serde_json::to_string(&message.headers)
                    .map_err(TransportError::Encode)?;
                println!("  Headers: {headers}");
            }
            None => println!("No message ready."),
        },
        Commands::Ack { id } => {
            connection.ack(&id)?;
            println!("Acknowledged message {id}");
        }
        Commands::Reject { id } => {
            connection.reject(&id)?;
            println!("Rejected message {id}");
        }
        Commands::Count => {
            let count = connection.message_count()?;
            println!("{count}");
        }
    }
    Ok(())
}

fn main() {
    stalk_transport::telemetry::init_tracing();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
