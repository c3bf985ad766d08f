//! ddl-gen-entities - generate Rust entity models from SQL DDL sources
//!
//! Usage: ddl-gen-entities [--config <config.json>] [--out <dir>] <schema.sql>...
//!
//! Reads every schema file, runs the generation pipeline, and writes one file
//! per artifact under the output directory. Diagnostics go to stderr and the
//! process exits non-zero without writing anything if the pipeline fails.

use std::fs;
use std::path::{Path, PathBuf};

use ddl_gen_entities::config::GeneratorConfig;
use ddl_gen_entities::ingest::SchemaSource;
use ddl_gen_entities::GenerateRequest;

fn main() {
    if let Err(e) = run() {
        eprintln!("ddl-gen-entities: {}", e);
        std::process::exit(1);
    }
}

struct Args {
    config: Option<PathBuf>,
    out: PathBuf,
    schemas: Vec<PathBuf>,
}

fn parse_args() -> Result<Args, String> {
    let mut config = None;
    let mut out = PathBuf::from("generated");
    let mut schemas = Vec::new();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                config = Some(PathBuf::from(
                    args.next().ok_or("--config requires a path")?,
                ));
            }
            "--out" => {
                out = PathBuf::from(args.next().ok_or("--out requires a path")?);
            }
            "--help" | "-h" => {
                return Err(
                    "usage: ddl-gen-entities [--config <config.json>] [--out <dir>] <schema.sql>..."
                        .to_string(),
                );
            }
            other if other.starts_with('-') => {
                return Err(format!("unknown option '{}'", other));
            }
            _ => schemas.push(PathBuf::from(arg)),
        }
    }

    if schemas.is_empty() {
        return Err("no schema files given".to_string());
    }
    Ok(Args {
        config,
        out,
        schemas,
    })
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args()?;

    let config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
            serde_json::from_str::<GeneratorConfig>(&text)
                .map_err(|e| format!("invalid config {}: {}", path.display(), e))?
        }
        None => GeneratorConfig::default(),
    };

    let mut sources = Vec::with_capacity(args.schemas.len());
    for path in &args.schemas {
        let text = fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        sources.push(SchemaSource::new(name, text));
    }

    let request = GenerateRequest { sources, config };
    let output = match ddl_gen_entities::generate(&request) {
        Ok(output) => output,
        Err(e) => {
            eprintln!("ddl-gen-entities: {}", e);
            for diagnostic in e.diagnostics() {
                eprintln!("  {}", diagnostic);
            }
            std::process::exit(1);
        }
    };

    for (name, content) in &output.artifacts {
        let path = args.out.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
    }

    // Debug: print what we generated
    if std::env::var("DDLGEN_DEBUG").is_ok() {
        eprintln!(
            "[ddl-gen-entities] Generated {} files",
            output.artifacts.len()
        );
        for name in output.artifacts.keys() {
            eprintln!("[ddl-gen-entities]   - {}", relative_display(&args.out, name));
        }
    }

    Ok(())
}

fn relative_display(out: &Path, name: &str) -> String {
    out.join(name).display().to_string()
}
