//! schemaforge CLI - generate Laravel projects from schema definitions
//!
//! Reads a schema (JSON or YAML), generates the project tree and writes it
//! as a `.tar.gz` archive or as plain files.

use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process;

use schemaforge::codegen::fs_utils;
use schemaforge::{
    archive_file_name, load_schema, ArtifactKind, Archiver, Generated, GenerationError, Generator,
    GeneratorConfig, RelationKind, SchemaDefinition,
};

#[derive(Parser)]
#[command(name = "schemaforge")]
#[command(version, about = "Generate Laravel projects from entity/field/validation schemas", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a project archive from a schema file
    Generate {
        /// Schema definition (.json, .yaml or .yml)
        schema: PathBuf,

        /// Archive path (default: <project>.tar.gz in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the project as plain files into this directory instead of an archive
        #[arg(short, long)]
        extract: Option<PathBuf>,

        /// Path to schemaforge.yaml
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Render workers (0 = available parallelism); overrides config and environment
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Validate a schema and report relationships and warnings
    Validate {
        /// Schema definition (.json, .yaml or .yml)
        schema: PathBuf,

        /// Path to schemaforge.yaml
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List the files a schema would generate
    Inspect {
        /// Schema definition (.json, .yaml or .yml)
        schema: PathBuf,

        /// Path to schemaforge.yaml
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the file list as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate { schema, output, extract, config, workers } => {
            generate_project(schema, output, extract, config, workers)
        }
        Commands::Validate { schema, config } => validate_schema(schema, config),
        Commands::Inspect { schema, config, json } => inspect_schema(schema, config, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Format a generation error with the schema location it points at
fn describe(error: &GenerationError) -> String {
    let report = error.report();
    let mut location = Vec::new();
    if let Some(entity) = report.entity_id {
        location.push(format!("entity={}", entity));
    }
    if let Some(field) = report.field_id {
        location.push(format!("field={}", field));
    }
    if let Some(rule) = report.rule {
        location.push(format!("rule={}", rule));
    }
    if location.is_empty() {
        format!("[{}] {}", report.kind, report.message)
    } else {
        format!("[{}] {} ({})", report.kind, report.message, location.join(", "))
    }
}

fn load(
    schema_path: &Path,
    config_path: Option<PathBuf>,
    workers: Option<usize>,
    verbose: bool,
) -> Result<(SchemaDefinition, Generator), String> {
    let config = GeneratorConfig::resolve(config_path.as_deref(), workers)?;
    let overlay = config.load_overlay()?;

    let schema = load_schema(schema_path).map_err(|e| describe(&e))?;
    if verbose {
        println!(
            "  ✓ Loaded schema '{}' ({} entities, {})",
            schema.name,
            schema.entities.len(),
            schema.stack_variant
        );
    }

    let generator = Generator::new(config)
        .map_err(|e| describe(&e))?
        .with_overlay(overlay);
    Ok((schema, generator))
}

fn print_warnings(generated: &Generated) {
    for warning in &generated.warnings {
        println!("  ⚠ {}", warning.message);
    }
}

/// Generate a project archive (or plain files) from a schema file
fn generate_project(
    schema_path: PathBuf,
    output: Option<PathBuf>,
    extract: Option<PathBuf>,
    config_path: Option<PathBuf>,
    workers: Option<usize>,
) -> Result<(), String> {
    println!("🔧 Generating project from {}...", schema_path.display());

    let (schema, generator) = load(&schema_path, config_path, workers, true)?;
    let generated = generator.generate(&schema).map_err(|e| describe(&e))?;
    print_warnings(&generated);
    println!(
        "  ✓ Generated {} files ({} from entities)",
        generated.tree.len(),
        generated.artifacts.len()
    );

    if let Some(dir) = extract {
        let written = fs_utils::write_tree(&generated.tree, &dir)
            .map_err(|e| format!("Failed to write project to {}: {}", dir.display(), e))?;
        println!("  ✓ Wrote {} files to {}", written, dir.display());
        println!("✨ Project generation complete!");
        return Ok(());
    }

    let name = archive_file_name(&schema.name).map_err(|e| describe(&e))?;
    let target = output.unwrap_or_else(|| PathBuf::from(&name));

    let stream = Archiver::from_config(generator.config())
        .archive(&generated.tree, &name)
        .map_err(|e| e.to_string())?;
    let bytes = stream
        .save_to(&target)
        .map_err(|e| format!("Failed to write {}: {}", target.display(), e))?;

    println!("  ✓ Wrote {} ({} bytes)", target.display(), bytes);
    println!("✨ Project generation complete!");
    Ok(())
}

/// Validate a schema without writing anything
fn validate_schema(schema_path: PathBuf, config_path: Option<PathBuf>) -> Result<(), String> {
    println!("🔍 Validating {}...", schema_path.display());

    let (schema, generator) = load(&schema_path, config_path, None, true)?;
    let generated = generator.generate(&schema).map_err(|e| describe(&e))?;

    let entity_names: HashMap<&str, &str> = schema
        .entities
        .iter()
        .map(|e| (e.id.as_str(), e.name.as_str()))
        .collect();
    let name_of = |id: &str| entity_names.get(id).copied().unwrap_or("?").to_string();

    let belongs_to: Vec<_> = generated
        .relationships
        .edges()
        .iter()
        .filter(|edge| edge.kind == RelationKind::BelongsTo)
        .collect();

    println!("  ✓ {} relationships", belongs_to.len());
    for edge in belongs_to {
        println!(
            "    - {}.{} → {} (accessor '{}')",
            name_of(&edge.source_entity),
            edge.foreign_key_column,
            name_of(&edge.target_entity),
            edge.accessor
        );
    }

    let order: Vec<String> = generated.migration_order.iter().map(|id| name_of(id)).collect();
    println!("  ✓ Migration order: {}", order.join(", "));

    if generated.warnings.is_empty() {
        println!("  ✓ No warnings");
    } else {
        println!("  ℹ {} warnings", generated.warnings.len());
        print_warnings(&generated);
    }

    println!("✨ Schema is valid!");
    Ok(())
}

/// List the files a schema would generate
fn inspect_schema(schema_path: PathBuf, config_path: Option<PathBuf>, json: bool) -> Result<(), String> {
    let (schema, generator) = load(&schema_path, config_path, None, !json)?;
    let generated = generator.generate(&schema).map_err(|e| describe(&e))?;

    let kinds: HashMap<&str, ArtifactKind> = generated
        .artifacts
        .iter()
        .map(|a| (a.relative_path.as_str(), a.kind))
        .collect();

    if json {
        let files: Vec<serde_json::Value> = generated
            .tree
            .iter()
            .map(|(path, content)| {
                serde_json::json!({
                    "path": path,
                    "bytes": content.len(),
                    "kind": kinds.get(path).map(|k| k.as_str()).unwrap_or("skeleton"),
                })
            })
            .collect();
        let out = serde_json::to_string_pretty(&files)
            .map_err(|e| format!("Failed to serialize file list: {}", e))?;
        println!("{}", out);
        return Ok(());
    }

    println!("📋 {} files:", generated.tree.len());
    for (path, content) in generated.tree.iter() {
        let kind = kinds.get(path).map(|k| k.as_str()).unwrap_or("skeleton");
        println!("  {:<10} {:>7}  {}", kind, content.len(), path);
    }
    print_warnings(&generated);
    Ok(())
}
