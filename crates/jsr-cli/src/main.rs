use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use jsr_core::config::{self, CONFIG_FILE_NAME, JsrConfig};
use jsr_core::{Reflector, RootSchema, TypeCatalog, TypeRef};

#[derive(Parser)]
#[command(name = "jsr", about = "JSON Schema reflector for type catalogs", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a JSON Schema for a type in the catalog
    Generate {
        /// Path to the type catalog (YAML or JSON)
        #[arg(short, long)]
        catalog: Option<PathBuf>,

        /// Root type: a catalog name or a builtin keyword such as `string`
        #[arg(short, long)]
        root: Option<String>,

        /// Write the schema here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Inline the root type instead of emitting a $ref
        #[arg(long)]
        expanded: bool,

        /// Allow properties not declared on a record
        #[arg(long)]
        allow_additional_properties: bool,
    },

    /// Validate a type catalog and its registrations
    Validate {
        /// Path to the type catalog
        #[arg(short, long)]
        catalog: PathBuf,
    },

    /// Inspect the parsed type catalog
    Inspect {
        /// Path to the type catalog
        #[arg(short, long)]
        catalog: PathBuf,

        /// Output format
        #[arg(long, default_value = "yaml")]
        format: InspectFormat,
    },

    /// Write a starter config and type catalog
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Clone, ValueEnum)]
enum InspectFormat {
    Yaml,
    Json,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            catalog,
            root,
            output,
            expanded,
            allow_additional_properties,
        } => cmd_generate(GenerateArgs {
            catalog,
            root,
            output,
            expanded,
            allow_additional_properties,
        }),

        Commands::Validate { catalog } => cmd_validate(catalog),

        Commands::Inspect { catalog, format } => cmd_inspect(catalog, format),

        Commands::Init { force } => cmd_init(force),

        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            clap_complete::generate(shell, &mut cmd, "jsr", &mut std::io::stdout());
            Ok(())
        }
    }
}

struct GenerateArgs {
    catalog: Option<PathBuf>,
    root: Option<String>,
    output: Option<PathBuf>,
    expanded: bool,
    allow_additional_properties: bool,
}

/// The project config in the current directory, or the defaults when there
/// is none.
fn project_config() -> Result<JsrConfig> {
    match config::load_config(Path::new(CONFIG_FILE_NAME))? {
        Some(cfg) => Ok(cfg),
        None => {
            log::debug!("no {CONFIG_FILE_NAME} found, using defaults");
            Ok(JsrConfig::default())
        }
    }
}

fn load_catalog(path: &Path) -> Result<TypeCatalog> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("yaml");

    let catalog = match ext {
        "json" => TypeCatalog::from_json(&content),
        _ => TypeCatalog::from_yaml(&content),
    }
    .with_context(|| format!("failed to parse {}", path.display()))?;

    log::debug!("loaded {} types from {}", catalog.types.len(), path.display());
    Ok(catalog)
}

fn render(schema: &RootSchema, pretty: bool) -> Result<String> {
    let mut out = if pretty {
        serde_json::to_string_pretty(schema)?
    } else {
        serde_json::to_string(schema)?
    };
    out.push('\n');
    Ok(out)
}

fn cmd_generate(args: GenerateArgs) -> Result<()> {
    let cfg = project_config()?;
    let catalog_path = args.catalog.unwrap_or_else(|| PathBuf::from(&cfg.catalog));
    let root = args
        .root
        .or(cfg.root)
        .context("no root type given; pass --root or set `root` in the config")?;
    let output = args.output.or_else(|| cfg.output.map(PathBuf::from));

    let mut options = cfg.options;
    options.expanded_root |= args.expanded;
    options.allow_additional_properties |= args.allow_additional_properties;

    let catalog = load_catalog(&catalog_path)?;
    let mut reflector = Reflector::new(&catalog).with_options(options);
    reflector.register_from_catalog()?;

    let schema = reflector
        .reflect(&TypeRef::parse(root.as_str()))
        .with_context(|| format!("failed to reflect {root}"))?;
    let dangling = schema.dangling_references();
    if !dangling.is_empty() {
        log::warn!("schema has unresolved references: {}", dangling.join(", "));
    }

    let rendered = render(&schema, cfg.pretty)?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create directory {}", parent.display()))?;
            }
            fs::write(&path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!(
                "Wrote schema for {root} ({} definitions) to {}",
                schema.definitions.len(),
                path.display()
            );
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

fn cmd_validate(path: PathBuf) -> Result<()> {
    let catalog = load_catalog(&path)?;
    catalog.validate()?;

    let mut reflector = Reflector::new(&catalog);
    reflector.register_from_catalog()?;

    eprintln!("Valid type catalog: {}", path.display());
    eprintln!("  Types: {}", catalog.types.len());
    eprintln!("  Enums: {}", catalog.enums.len());
    eprintln!("  Discriminators: {}", catalog.discriminators.len());

    // Every named type must reflect on its own.
    for name in catalog.types.keys() {
        reflector
            .reflect(&TypeRef::named(name))
            .with_context(|| format!("failed to reflect {name}"))?;
    }

    eprintln!("Validation successful.");
    Ok(())
}

fn cmd_inspect(path: PathBuf, format: InspectFormat) -> Result<()> {
    let catalog = load_catalog(&path)?;
    let summary = build_inspect_summary(&catalog);

    match format {
        InspectFormat::Yaml => {
            let yaml = serde_yaml_ng::to_string(&summary)?;
            print!("{}", yaml);
        }
        InspectFormat::Json => {
            let json = serde_json::to_string_pretty(&summary)?;
            println!("{}", json);
        }
    }

    Ok(())
}

fn build_inspect_summary(catalog: &TypeCatalog) -> serde_json::Value {
    let types: Vec<serde_json::Value> = catalog
        .types
        .iter()
        .map(|(name, desc)| {
            serde_json::json!({
                "name": name,
                "kind": desc.kind.name(),
                "methods": desc.methods,
            })
        })
        .collect();

    let enums: Vec<serde_json::Value> = catalog
        .enums
        .iter()
        .map(|e| {
            serde_json::json!({
                "type": e.ty.to_string(),
                "values": e.values.len(),
            })
        })
        .collect();

    let discriminators: Vec<serde_json::Value> = catalog
        .discriminators
        .iter()
        .map(|d| {
            serde_json::json!({
                "base": d.base.to_string(),
                "field": d.field,
                "variants": d.variants.keys().collect::<Vec<_>>(),
            })
        })
        .collect();

    serde_json::json!({
        "types": types,
        "enums": enums,
        "discriminators": discriminators,
    })
}

fn cmd_init(force: bool) -> Result<()> {
    let config_path = Path::new(CONFIG_FILE_NAME);
    if config_path.exists() && !force {
        anyhow::bail!("{CONFIG_FILE_NAME} already exists. Use --force to overwrite.");
    }
    fs::write(config_path, config::default_config_content())
        .with_context(|| format!("failed to write {CONFIG_FILE_NAME}"))?;
    eprintln!("Created {CONFIG_FILE_NAME}");

    // The starter catalog is only written when it would not clobber one.
    let catalog_path = PathBuf::from(JsrConfig::default().catalog);
    if catalog_path.exists() && !force {
        eprintln!("Kept existing {}", catalog_path.display());
        return Ok(());
    }
    fs::write(&catalog_path, config::default_catalog_content())
        .with_context(|| format!("failed to write {}", catalog_path.display()))?;
    eprintln!(
        "Created {}; try `jsr generate --root User`",
        catalog_path.display()
    );
    Ok(())
}
