//! JSON:API codec CLI
//!
//! Validates documents, previews wire names and summarizes relationships.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use jsonapi_codec::{
    validate_document, Document, NamingConfig, RelationshipData, ResourceObject, ValidateError,
};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Errors reading input files.
#[derive(Debug, Error)]
enum InputError {
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl InputError {
    fn exit_code(&self) -> u8 {
        match self {
            InputError::FileNotFound { .. } | InputError::ReadError { .. } => 3,
            InputError::InvalidJson { .. } => 2,
        }
    }
}

#[derive(Parser)]
#[command(name = "jsonapi-codec")]
#[command(about = "Validate and inspect JSON:API documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a document's envelope
    Validate {
        /// Document file to validate
        document: PathBuf,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Print the wire name for Rust type or field names
    Name {
        /// Names to convert (e.g. SimplePost, user_id)
        #[arg(required = true)]
        names: Vec<String>,

        /// Treat names as field names instead of type names
        #[arg(long)]
        field: bool,

        /// JSON file with extra initialisms, irregular plurals and uncountable words
        #[arg(long)]
        naming_config: Option<PathBuf>,
    },

    /// List the resources in a document and their relationships
    Inspect {
        /// Document file to inspect
        document: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { document, json } => run_validate(&document, json),
        Commands::Name {
            names,
            field,
            naming_config,
        } => run_name(&names, field, naming_config.as_deref()),
        Commands::Inspect { document } => run_inspect(&document),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn run_validate(path: &Path, json_output: bool) -> Result<(), u8> {
    let document = read_json(path).map_err(|e| {
        report_error(json_output, &format!("loading document: {}", e));
        e.exit_code()
    })?;

    match validate_document(&document) {
        Ok(()) => {
            if json_output {
                println!(r#"{{"valid":true}}"#);
            } else {
                println!("Valid");
            }
            Ok(())
        }
        Err(ValidateError::Invalid { errors }) => {
            if json_output {
                let output = serde_json::json!({
                    "valid": false,
                    "errors": errors
                });
                println!("{}", output);
            } else {
                eprintln!("Validation failed:");
                for error in errors {
                    eprintln!("  {}", error);
                }
            }
            Err(1)
        }
        Err(e @ ValidateError::InvalidSchema { .. }) => {
            report_error(json_output, &e.to_string());
            Err(2)
        }
    }
}

fn read_file(path: &Path) -> Result<String, InputError> {
    if !path.exists() {
        return Err(InputError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    std::fs::read_to_string(path).map_err(|source| InputError::ReadError {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json(path: &Path) -> Result<Value, InputError> {
    let content = read_file(path)?;
    serde_json::from_str(&content).map_err(|source| InputError::InvalidJson {
        path: path.to_path_buf(),
        source,
    })
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        let output = serde_json::json!({ "valid": false, "error": msg });
        println!("{}", output);
    } else {
        eprintln!("Error: {}", msg);
    }
}

fn run_name(names: &[String], field: bool, naming_config: Option<&Path>) -> Result<(), u8> {
    let naming = match naming_config {
        Some(path) => {
            let content = read_file(path).map_err(|e| {
                eprintln!("Error: {}", e);
                e.exit_code()
            })?;
            NamingConfig::from_json_str(&content).map_err(|e| {
                eprintln!("Error: invalid naming config {}: {}", path.display(), e);
                2u8
            })?
        }
        None => NamingConfig::default(),
    };

    for name in names {
        let converted = if field {
            naming.jsonify(name)
        } else {
            naming.resource_type_name(name)
        };
        println!("{} -> {}", name, converted);
    }

    Ok(())
}

fn run_inspect(path: &Path) -> Result<(), u8> {
    let value = read_json(path).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code()
    })?;

    let document: Document = serde_json::from_value(value).map_err(|e| {
        eprintln!("Error: not a document: {}", e);
        2u8
    })?;
    debug!(
        data = document.data.kind(),
        included = document.included.len(),
        "inspecting document"
    );

    for resource in document.primary() {
        println!("{}", describe("data", resource));
    }
    for resource in &document.included {
        println!("{}", describe("included", resource));
    }

    Ok(())
}

/// `data widgets/1 author=to-one tags=to-many`
fn describe(section: &str, resource: &ResourceObject) -> String {
    let mut line = format!("{} {}/{}", section, resource.resource_type, resource.id);
    for (name, relationship) in &resource.relationships {
        let kind = match relationship.data {
            RelationshipData::Absent => "not loaded",
            RelationshipData::Null => "null",
            RelationshipData::One(_) => "to-one",
            RelationshipData::Many(_) => "to-many",
        };
        line.push_str(&format!(" {}={}", name, kind));
    }
    line
}
