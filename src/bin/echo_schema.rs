//! Echo Schema CLI
//!
//! Inspect, normalize and check portable schema documents, and parse DXNs.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use echo_schema::codec::structural_errors;
use echo_schema::config::OutputFormat;
use echo_schema::tree::{typename_of, visit_leaves};
use echo_schema::{
    from_json_schema, to_json_schema_with, validate, Dxn, EchoConfig, Reference, SchemaKind,
    SchemaNode, Value,
};
use serde_json::Value as Json;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "echo-schema")]
#[command(about = "Inspect and normalize portable Echo schema documents")]
struct Cli {
    /// Config file (in addition to the default locations)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a document and list its typename and leaf properties
    Inspect {
        /// Portable schema document (JSON)
        file: PathBuf,
    },

    /// Import a document and export it again
    Normalize {
        /// Portable schema document (JSON)
        file: PathBuf,
        /// Compact output, overriding the configured format
        #[arg(long)]
        compact: bool,
    },

    /// Parse a DXN
    Dxn {
        /// Canonical name, e.g. dxn:echo:@:01J00J9B45YHYSGZQTQMSKMGJ6
        name: String,
    },

    /// Validate an instance against a document
    Check {
        /// Portable schema document (JSON)
        schema: PathBuf,
        /// Instance (JSON)
        instance: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match EchoConfig::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli.command, config) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands, mut config: EchoConfig) -> anyhow::Result<()> {
    match command {
        Commands::Inspect { file } => {
            let document = read_json(&file)?;
            let schema = from_json_schema(&document, None)
                .with_context(|| format!("failed to import {}", file.display()))?;

            match typename_of(&schema) {
                Some(typename) => println!("📦 {}", typename),
                None => println!("📦 (untyped {})", describe(&schema)),
            }
            visit_leaves(&schema, |leaf, path| {
                println!("  {:<32} {}", path.join("."), describe(leaf));
                true
            });
        }

        Commands::Normalize { file, compact } => {
            let document = read_json(&file)?;
            let schema = from_json_schema(&document, None)
                .with_context(|| format!("failed to import {}", file.display()))?;
            if compact {
                config.codec.output_format = OutputFormat::Compact;
            }
            let normalized = to_json_schema_with(&schema, &config.export_options());
            println!("{}", config.render(&normalized)?);
        }

        Commands::Dxn { name } => {
            let dxn = Dxn::parse(&name)?;
            println!("kind:  {}", dxn.kind());
            println!("parts: {}", dxn.parts().join(", "));
            match Reference::from_dxn(&dxn) {
                Ok(reference) => println!("reference: {}", serde_json::to_string(&reference)?),
                Err(e) => debug!(error = %e, "DXN does not name a reference"),
            }
        }

        Commands::Check { schema, instance } => {
            let document = read_json(&schema)?;
            let instance = read_json(&instance)?;

            let mut errors = structural_errors(&document, &instance)?;
            let tree = from_json_schema(&document, None)?;
            if let Err(e) = validate(&tree, &Value::from(&instance)) {
                errors.push(e.to_string());
            }

            if !errors.is_empty() {
                for error in &errors {
                    println!("  ❌ {}", error);
                }
                bail!("{} validation error(s)", errors.len());
            }
            println!("✅ Valid");
        }
    }

    Ok(())
}

fn read_json(path: &Path) -> anyhow::Result<Json> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn describe(node: &SchemaNode) -> String {
    let base = match &node.kind {
        SchemaKind::String => "string".to_string(),
        SchemaKind::Number => "number".to_string(),
        SchemaKind::Boolean => "boolean".to_string(),
        SchemaKind::Any => "any".to_string(),
        SchemaKind::Unknown => "unknown".to_string(),
        SchemaKind::ObjectKeyword => "object".to_string(),
        SchemaKind::Never => "never".to_string(),
        SchemaKind::Literal(value) => value.to_json().to_string(),
        SchemaKind::Struct(_) => "struct".to_string(),
        SchemaKind::Union(members) => members.iter().map(describe).collect::<Vec<_>>().join(" | "),
        SchemaKind::Tuple { elements, .. } => {
            format!("[{}]", elements.iter().map(describe).collect::<Vec<_>>().join(", "))
        }
        SchemaKind::Array(item) => format!("{}[]", describe(item)),
        SchemaKind::Refinement { from, .. } => describe(from),
    };
    match node.reference() {
        Some(reference) => format!("ref<{}>", reference.typename),
        None => base,
    }
}
