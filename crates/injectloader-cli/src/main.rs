use anyhow::Context;
use clap::Parser;
use injectloader_core::config::{CliOverrides, InjectConfig, DEFAULT_CONFIG_FILE};
use injectloader_core::{FilterSet, Injector};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// inject-loader - Make a module's require() calls overridable at runtime
#[derive(Parser, Debug, Clone)]
#[command(name = "inject-loader")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input files or directories to rewrite
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Loader query selecting the dependencies to wrap (e.g. "?./dep&./other")
    #[arg(short, long, value_name = "QUERY")]
    query: Option<String>,

    /// Path to injectconfig.yaml configuration file
    #[arg(short, long, value_name = "FILE")]
    project: Option<PathBuf>,

    /// Output directory for rewritten modules
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Write a default injectconfig.yaml in the current directory
    #[arg(long)]
    init: bool,
}

/// One module to rewrite and where its output goes relative to the output directory
struct Input {
    path: PathBuf,
    relative: PathBuf,
}

fn main() -> anyhow::Result<()> {
    // Set RUST_LOG=debug for detailed logs
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.init {
        InjectConfig::init_file(Path::new(DEFAULT_CONFIG_FILE))
            .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;
        println!("Created {}", DEFAULT_CONFIG_FILE);
        return Ok(());
    }

    let config = load_config(&cli)?;
    let inputs = collect_inputs(&cli.files, &config)?;

    if inputs.is_empty() {
        eprintln!("Error: No input files specified. Use --help for usage information.");
        std::process::exit(1);
    }

    let injector = Injector::from_config(&config).context("Failed to build require pattern")?;
    debug!("Require pattern: {}", injector.pattern().regex().as_str());

    match config.out_dir {
        Some(ref out_dir) => {
            let failures = rewrite_to_dir(&injector, &inputs, Path::new(out_dir));
            if failures > 0 {
                error!("{} of {} file(s) failed", failures, inputs.len());
                std::process::exit(1);
            }
            info!("Rewrote {} file(s) into {}", inputs.len(), out_dir);
        }
        None => {
            if inputs.len() > 1 {
                eprintln!("Error: --out-dir is required when rewriting more than one file.");
                std::process::exit(1);
            }
            let output = rewrite_file(&injector, &inputs[0].path)?;
            print!("{}", output);
        }
    }

    Ok(())
}

/// Load the configuration file (if any) and apply command line overrides
fn load_config(cli: &Cli) -> anyhow::Result<InjectConfig> {
    let mut config = if let Some(ref project_path) = cli.project {
        InjectConfig::from_file(project_path)
            .with_context(|| format!("Failed to load config file {}", project_path.display()))?
    } else {
        let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            InjectConfig::from_file(&default_path)
                .with_context(|| format!("Failed to load {}", DEFAULT_CONFIG_FILE))?
        } else {
            InjectConfig::default()
        }
    };

    let mut overrides = CliOverrides::default();
    if let Some(ref query) = cli.query {
        overrides.filters = Some(FilterSet::from_query(query).context("Invalid --query")?);
    }
    if let Some(ref out_dir) = cli.out_dir {
        overrides.out_dir = Some(out_dir.to_string_lossy().to_string());
    }
    config.merge(&overrides);

    Ok(config)
}

/// Expand directories into the module files they contain
fn collect_inputs(paths: &[PathBuf], config: &InjectConfig) -> anyhow::Result<Vec<Input>> {
    use walkdir::WalkDir;

    let mut inputs = Vec::new();
    for path in paths {
        if !path.is_dir() {
            let relative = PathBuf::from(path.file_name().unwrap_or_default());
            inputs.push(Input {
                path: path.clone(),
                relative,
            });
            continue;
        }

        for entry in WalkDir::new(path).follow_links(false).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed to walk {}", path.display()))?;
            let file = entry.path();
            if !entry.file_type().is_file() || !config.matches_extension(file) {
                continue;
            }
            if file.components().any(|c| c.as_os_str() == "node_modules") {
                continue;
            }
            let relative = file.strip_prefix(path).unwrap_or(file).to_path_buf();
            inputs.push(Input {
                path: file.to_path_buf(),
                relative,
            });
        }
    }

    Ok(inputs)
}

fn rewrite_file(injector: &Injector, path: &Path) -> anyhow::Result<String> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    injector
        .transform(&source)
        .with_context(|| format!("Failed to rewrite {}", path.display()))
}

/// Rewrite every input in parallel, returning the number of failures
fn rewrite_to_dir(injector: &Injector, inputs: &[Input], out_dir: &Path) -> usize {
    use rayon::prelude::*;

    inputs
        .par_iter()
        .map(|input| {
            let output_path = out_dir.join(&input.relative);
            let result = rewrite_file(injector, &input.path).and_then(|output| {
                if let Some(parent) = output_path.parent() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create {}", parent.display()))?;
                }
                std::fs::write(&output_path, output)
                    .with_context(|| format!("Failed to write {}", output_path.display()))
            });

            match result {
                Ok(()) => {
                    debug!("{} -> {}", input.path.display(), output_path.display());
                    0
                }
                Err(e) => {
                    error!("{:#}", e);
                    1
                }
            }
        })
        .sum()
}
