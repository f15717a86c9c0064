//! CLI binary for fdgen: generate form-data types from a declarative form model.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fdgen_core::config::FdgenConfig;
use fdgen_core::error::GenerationError;
use fdgen_core::output::OutputNode;
use fdgen_core::schema::{self, ModelFile};
use fdgen_engine::{Generator, RenderFormat, RenderOptions, SynthesisOptions, TypeModelProvider};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "fdgen", about = "Form-data synthesis for declarative form models")]
struct Cli {
    /// Project root directory (defaults to current directory)
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    /// Model file to read instead of .fdgen/model.json
    #[arg(short, long, global = true)]
    model: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty model file
    Init {
        /// Overwrite an existing model file
        #[arg(long)]
        force: bool,
    },

    /// Generate the data types of one form, one template, or everything
    Generate {
        /// Form (or, with --template, template) identity
        root: Option<String>,

        /// Generate every form and template in the model
        #[arg(long, conflicts_with = "root")]
        all: bool,

        /// Treat ROOT as a template and keep its type parameters unbound
        #[arg(long)]
        template: bool,

        /// Output format: java, json
        #[arg(short, long, default_value = "java")]
        format: String,

        /// Write one file per generated type into this directory
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Validate the model and try to generate every form
    Check,

    /// Print the snapshot a generation request for ROOT would read
    Snapshot {
        /// Form identity
        root: String,
    },

    /// Show model statistics
    Info,
}

fn get_project_root(cli: &Cli) -> Result<PathBuf> {
    match &cli.project {
        Some(p) => Ok(p.clone()),
        None => std::env::current_dir().context("failed to get current directory"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let project_root = get_project_root(&cli)?;
    let model_path = cli
        .model
        .clone()
        .unwrap_or_else(|| fdgen_core::storage::model_file(&project_root));

    match cli.command {
        Commands::Init { force } => cmd_init(&model_path, force),
        Commands::Generate {
            root,
            all,
            template,
            format,
            out,
        } => cmd_generate(
            &project_root,
            &model_path,
            root.as_deref(),
            all,
            template,
            &format,
            out.as_deref(),
        ),
        Commands::Check => cmd_check(&project_root, &model_path),
        Commands::Snapshot { root } => cmd_snapshot(&project_root, &model_path, &root),
        Commands::Info => cmd_info(&model_path),
    }
}

fn load_model(model_path: &Path) -> Result<ModelFile> {
    if !model_path.exists() {
        anyhow::bail!(
            "No model found at {}. Run `fdgen init` first.",
            model_path.display()
        );
    }
    fdgen_core::storage::load_from(model_path)
}

fn synthesis_options(config: &FdgenConfig) -> SynthesisOptions {
    SynthesisOptions {
        rule_defaults: config.rules.clone(),
        strict_extensions: config.generation.strict_extensions,
    }
}

fn parse_format(format: &str) -> Result<RenderFormat> {
    match format {
        "java" => Ok(RenderFormat::Java),
        "json" => Ok(RenderFormat::Json),
        other => anyhow::bail!("unknown format '{}'. Use: java, json", other),
    }
}

fn cmd_init(model_path: &Path, force: bool) -> Result<()> {
    if model_path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite.",
            model_path.display()
        );
    }
    fdgen_core::storage::save_to(model_path, &ModelFile::default())?;
    eprintln!("Created {}", model_path.display());
    Ok(())
}

/// What one `generate` invocation asked for.
enum Target<'a> {
    Form(&'a str),
    Template(&'a str),
}

fn cmd_generate(
    project_root: &Path,
    model_path: &Path,
    root: Option<&str>,
    all: bool,
    template: bool,
    format: &str,
    out: Option<&Path>,
) -> Result<()> {
    let format = parse_format(format)?;
    let config = FdgenConfig::load(project_root)?;
    let model = load_model(model_path)?;
    let generator = Generator::new(&model, synthesis_options(&config));
    let render_options = RenderOptions::from(&config.render);

    let form_names = model.form_names();
    let template_names = model.template_names();
    let targets: Vec<Target<'_>> = match (root, all) {
        (_, true) => form_names
            .iter()
            .map(|n| Target::Form(n.as_str()))
            .chain(template_names.iter().map(|n| Target::Template(n.as_str())))
            .collect(),
        (Some(name), false) if template => vec![Target::Template(name)],
        (Some(name), false) => vec![Target::Form(name)],
        (None, false) => anyhow::bail!("specify a form identity or --all"),
    };

    tracing::info!(requests = targets.len(), model = %model_path.display(), "starting generation");
    let results: Vec<(String, Result<OutputNode, GenerationError>)> = targets
        .par_iter()
        .map(|target| match target {
            Target::Form(name) => (name.to_string(), generator.run(name)),
            Target::Template(name) => (name.to_string(), generator.run_template(name)),
        })
        .collect();

    if let Some(dir) = out {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
    }

    let mut failures = 0;
    for (name, result) in results {
        let output = match result {
            Ok(output) => output,
            Err(e) => {
                eprintln!("error [{}] {}: {}", e.tag(), name, e);
                failures += 1;
                continue;
            }
        };
        let text = fdgen_engine::render(&output, format, &render_options)?;
        match out {
            Some(dir) => {
                let path = dir.join(format!("{}.{}", output.name, format.extension()));
                std::fs::write(&path, text)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                eprintln!("Wrote {} ({} types)", path.display(), output.node_count());
            }
            None => println!("{}", text),
        }
    }

    if failures > 0 {
        anyhow::bail!("{} generation request(s) failed", failures);
    }
    Ok(())
}

fn cmd_check(project_root: &Path, model_path: &Path) -> Result<()> {
    let config = FdgenConfig::load(project_root)?;
    let model = load_model(model_path)?;
    schema::validate_version(&model)?;
    model.validate()?;

    let generator = Generator::new(&model, synthesis_options(&config));
    let forms = model.form_names();
    let failures: Vec<(String, GenerationError)> = forms
        .par_iter()
        .filter_map(|name| generator.run(name).err().map(|e| (name.clone(), e)))
        .collect();

    for (name, error) in &failures {
        println!("FAIL: {} [{}] {}", name, error.tag(), error);
    }

    if failures.is_empty() {
        eprintln!("Model is valid. {} forms generate cleanly.", forms.len());
        Ok(())
    } else {
        anyhow::bail!("{} of {} forms failed to generate", failures.len(), forms.len())
    }
}

fn cmd_snapshot(project_root: &Path, model_path: &Path, root: &str) -> Result<()> {
    let config = FdgenConfig::load(project_root)?;
    let model = load_model(model_path)?;
    let generator = Generator::new(&model, synthesis_options(&config));
    let snapshot = generator.snapshot(root)?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

fn cmd_info(model_path: &Path) -> Result<()> {
    if !model_path.exists() {
        eprintln!("No model found. Run `fdgen init` first.");
        return Ok(());
    }
    let model = fdgen_core::storage::load_from(model_path)?;

    println!("Model v{}", model.version);
    println!("Forms: {}", model.forms.len());
    println!("Templates: {}", model.templates.len());
    println!("Extension declarations: {}", model.extensions.len());
    println!("External types: {}", model.external_types.len());

    if !model.forms.is_empty() {
        println!("\nForms:");
        for form in &model.forms {
            match &form.super_type {
                Some(super_ref) => println!("  {} extends {}", form.identity, super_ref.identity),
                None => println!("  {}", form.identity),
            }
        }
    }
    if !model.templates.is_empty() {
        println!("\nTemplates:");
        for template in &model.templates {
            println!("  {}<{}>", template.identity, template.type_params.join(", "));
        }
    }
    Ok(())
}
