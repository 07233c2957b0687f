//! Picobuf CLI
//!
//! Inspects definition files and encodes or decodes records against them.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use picobuf::{Config, Encoder, FieldType, Model, NoneEncoder, Picobuf, Shape, Value};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "picobuf")]
#[command(about = "Inspect model definitions and encode or decode records")]
struct Cli {
    /// Definitions file (.json or .toml)
    #[arg(short, long)]
    definitions: PathBuf,

    /// Config file (defaults to picobuf.toml lookup)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List enums, models and services
    Inspect,

    /// Encode a JSON record. Buffer fields are given as arrays of byte values
    /// (top-level fields only).
    Encode {
        /// Model name
        #[arg(short, long)]
        model: String,
        /// Record as JSON
        #[arg(long)]
        data: String,
        /// Write the payload here instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decode a payload file and print the record as JSON. Buffer fields are
    /// printed as arrays of byte values.
    Decode {
        /// Model name
        #[arg(short, long)]
        model: String,
        /// Payload file
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load_from(cli.config.as_deref()).context("loading config")?;
    let mut picobuf = Picobuf::with_config(config);
    picobuf
        .load_path(&cli.definitions)
        .with_context(|| format!("loading {}", cli.definitions.display()))?;

    match cli.command {
        Commands::Inspect => {
            let domain = picobuf.domain();
            println!("Enums:");
            for name in domain.enum_names() {
                if let Some(e) = domain.get_enum(&name) {
                    println!("  {} [{}]", name, e.values().join(", "));
                }
            }
            println!("Models:");
            for name in domain.model_names() {
                if let Some(model) = domain.get_model(&name) {
                    print_model(&model);
                }
            }
            println!("Services:");
            for service in picobuf.services() {
                println!("  {}", service.name());
                for method in service.methods() {
                    let side = |m: &Option<std::sync::Arc<Model>>| {
                        m.as_ref().map(|m| m.name().to_string()).unwrap_or_else(|| "-".to_string())
                    };
                    println!("    {}({}) -> {}", method.name, side(&method.request), side(&method.response));
                }
            }
            Ok(())
        }

        Commands::Encode { model, data, output } => {
            let model = find_model(&picobuf, &model)?;
            let json: serde_json::Value = serde_json::from_str(&data).context("parsing --data")?;
            let record = buffers_from_json(&model, Value::from(json), model.shape());
            let payload = model.encode(&record)?;

            let bytes = match payload {
                Value::Bytes(bytes) => bytes,
                other => serde_json::to_vec(&serde_json::Value::from(other))?,
            };
            match output {
                Some(path) => {
                    std::fs::write(&path, &bytes)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Wrote {} bytes to {}", bytes.len(), path.display());
                }
                None if is_textual(&model) => println!("{}", String::from_utf8_lossy(&bytes)),
                None => println!("{}", hex(&bytes)),
            }
            Ok(())
        }

        Commands::Decode { model, input } => {
            let model = find_model(&picobuf, &model)?;
            let bytes = std::fs::read(&input).with_context(|| format!("reading {}", input.display()))?;
            let payload = if is_textual(&model) {
                let json = Value::from(serde_json::from_slice::<serde_json::Value>(&bytes)?);
                // Passthrough payloads are slot arrays, object-mode payloads are records
                let layout = if model.config().object_mode { model.shape() } else { Shape::Positional };
                buffers_from_json(&model, json, layout)
            } else {
                Value::Bytes(bytes)
            };
            let record = model.decode(&payload)?;
            println!("{}", serde_json::to_string_pretty(&serde_json::Value::from(record))?);
            Ok(())
        }
    }
}

fn find_model(picobuf: &Picobuf, name: &str) -> anyhow::Result<std::sync::Arc<Model>> {
    if let Some(model) = picobuf.get_model(name) {
        return Ok(model);
    }
    let suggestions = picobuf.domain().search_models(name, 3);
    if suggestions.is_empty() {
        bail!("Model {} not found", name);
    }
    bail!("Model {} not found (did you mean {}?)", name, suggestions.join(", "))
}

/// Payloads of passthrough and object-mode models are JSON, not bytes
fn is_textual(model: &Model) -> bool {
    model.config().object_mode || model.encoder().name() == NoneEncoder.name()
}

/// JSON has no bytes, so buffer fields arrive as arrays of integers
fn buffers_from_json(model: &Model, mut value: Value, layout: Shape) -> Value {
    for (position, field) in model.fields().iter().enumerate() {
        if field.field_type() != FieldType::Buffer {
            continue;
        }
        let slot = match (layout, &mut value) {
            (Shape::Record, Value::Map(map)) => map.get_mut(field.name()),
            (Shape::Positional, Value::Array(items)) => items.get_mut(position),
            (Shape::Scalar, scalar) => Some(scalar),
            _ => None,
        };
        if let Some(slot) = slot {
            let converted = if field.is_list() {
                slot.as_array()
                    .and_then(|items| items.iter().map(byte_array).collect::<Option<Vec<_>>>())
                    .map(|items| Value::Array(items.into_iter().map(Value::Bytes).collect()))
            } else {
                byte_array(slot).map(Value::Bytes)
            };
            if let Some(converted) = converted {
                *slot = converted;
            }
        }
    }
    value
}

fn byte_array(value: &Value) -> Option<Vec<u8>> {
    value
        .as_array()?
        .iter()
        .map(|b| b.as_i64().and_then(|b| u8::try_from(b).ok()))
        .collect()
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn print_model(model: &Model) {
    println!(
        "  {} ({:?}, {}, {})",
        model.name(),
        model.shape(),
        model.encoder().name(),
        model.fingerprint().short()
    );
    for field in model.fields() {
        let mut flags = Vec::new();
        if field.is_required() {
            flags.push("required".to_string());
        }
        if field.is_list() {
            flags.push("list".to_string());
        }
        if let Some(default) = field.default_value() {
            flags.push(format!("default={}", default));
        }
        println!("    {}: {} {}", field.name(), field.type_name(), flags.join(" "));
    }
}
