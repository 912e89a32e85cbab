use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use vouch::{
    build_record, prove_record, read_proof, read_record, report_to_json, verify_against,
    write_proof, RecordSummary, RootConfig, RootError,
};

/// Vouch: commit to a record, reveal only what you choose.
#[derive(Parser, Debug)]
#[command(name = "vouch", version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a configuration file
    Init {
        /// Schema mapping, as RECORD_TYPE=SCHEMA_ID (repeatable)
        #[arg(long = "schema", value_name = "TYPE=ID")]
        schemas: Vec<String>,

        /// Upper bound on each ledger call, in milliseconds
        #[arg(long)]
        publish_timeout_ms: Option<u64>,

        /// Data directory for vouch state
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Commit to a record file and print its root
    Build {
        /// JSON record: array of { name, type, value }
        record: PathBuf,
    },

    /// Produce a proof revealing some fields of a record
    Prove {
        /// JSON record: array of { name, type, value }
        record: PathBuf,

        /// Field names to reveal (comma-separated or repeated)
        #[arg(short, long, value_delimiter = ',', required = true)]
        reveal: Vec<String>,

        /// Output file, or `-` for stdout [default: <data_dir>/proofs/<record>.proof.json]
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Verify a proof against a published root
    Verify {
        /// JSON proof produced by `prove`
        proof: PathBuf,

        /// Expected root, hex with or without 0x
        #[arg(long)]
        root: String,
    },

    /// List configured record types and their schema ids
    Schemas,
}

fn init_tracing(verbose: bool, default_filter: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("vouch=debug,vouch_proof=debug,vouch_attest=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn config_path(path: Option<&PathBuf>) -> PathBuf {
    path.cloned().unwrap_or_else(RootConfig::default_config_path)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = RootConfig::load(&config_path(cli.config.as_ref()));
    let filter = config
        .as_ref()
        .map(|c| c.log.filter.clone())
        .unwrap_or_else(|_| "vouch=info".to_string());
    init_tracing(cli.verbose, &filter);

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: RootConfig) -> Result<(), RootError> {
    match cli.command {
        Commands::Init {
            schemas,
            publish_timeout_ms,
            data_dir,
        } => cmd_init(
            config_path(cli.config.as_ref()),
            config,
            schemas,
            publish_timeout_ms,
            data_dir,
        ),
        Commands::Build { record } => cmd_build(&record),
        Commands::Prove {
            record,
            reveal,
            out,
        } => cmd_prove(&config, &record, &reveal, out),
        Commands::Verify { proof, root } => cmd_verify(&proof, &root),
        Commands::Schemas => cmd_schemas(&config),
    }
}

fn cmd_init(
    save_path: PathBuf,
    mut config: RootConfig,
    schemas: Vec<String>,
    publish_timeout_ms: Option<u64>,
    data_dir: Option<PathBuf>,
) -> Result<(), RootError> {
    for mapping in schemas {
        let (record_type, schema_id) = mapping.split_once('=').ok_or_else(|| {
            RootError::Config(format!("expected TYPE=ID, got '{}'", mapping))
        })?;
        config.attest = config.attest.with_schema(record_type.trim(), schema_id.trim());
    }
    if let Some(ms) = publish_timeout_ms {
        config.attest.publish_timeout_ms = ms;
    }
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    config.validate()?;

    std::fs::create_dir_all(&config.data_dir)?;
    config.save(&save_path)?;
    info!(path = %save_path.display(), "configuration written");

    println!("Vouch initialized.");
    println!("  Data dir: {}", config.data_dir.display());
    println!("  Config:   {}", save_path.display());
    println!("  Schemas:  {}", config.attest.schemas.len());
    Ok(())
}

fn cmd_build(record: &Path) -> Result<(), RootError> {
    let fields = read_record(record)?;
    let tree = build_record(&fields)?;
    info!(root = %tree.root(), leaves = tree.leaf_count(), "record committed");
    println!("{}", serde_json::to_string_pretty(&RecordSummary::from(&tree))?);
    Ok(())
}

fn cmd_prove(
    config: &RootConfig,
    record: &Path,
    reveal: &[String],
    out: Option<PathBuf>,
) -> Result<(), RootError> {
    let fields = read_record(record)?;
    let proof = prove_record(&fields, reveal)?;

    match out {
        Some(path) if path.as_os_str() == "-" => {
            println!("{}", serde_json::to_string_pretty(&proof)?);
        }
        out => {
            let path = out.unwrap_or_else(|| config.proof_path_for(record));
            write_proof(&path, &proof)?;
            info!(
                path = %path.display(),
                revealed = proof.revealed_fields.len(),
                "proof written"
            );
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn cmd_verify(proof: &Path, root: &str) -> Result<(), RootError> {
    let proof = read_proof(proof)?;
    let report = verify_against(&proof, root)?;
    println!("{}", serde_json::to_string_pretty(&report_to_json(&report))?);

    match report.failure() {
        None => Ok(()),
        Some(e) => Err(RootError::VerificationFailed(e.to_string())),
    }
}

fn cmd_schemas(config: &RootConfig) -> Result<(), RootError> {
    if config.attest.schemas.is_empty() {
        println!("No schemas configured. Add one with `vouch init --schema TYPE=ID`.");
        return Ok(());
    }
    for (record_type, schema_id) in &config.attest.schemas {
        println!("{:<20} {}", record_type, schema_id);
    }
    Ok(())
}
