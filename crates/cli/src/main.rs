use clap::{Parser, Subcommand};
use handoff_core::{
    config::{core_config_from_lookup, env},
    FsStore, RandomCodeGenerator, ReferenceStore, RegistrationService, ValidationService,
    DEFAULT_DATA_DIR,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "handoff")]
#[command(about = "Operator CLI for the handoff file-sharing broker")]
struct Cli {
    /// Filesystem store directory (defaults to HANDOFF_DATA_DIR, then "handoff_data")
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register an uploaded file and print its access code
    Register {
        /// Location pointer returned by the object store
        location: String,
        /// Original file name
        name: String,
    },
    /// Look up the file registered under a code
    Validate {
        /// Access code
        code: String,
    },
    /// Delete the share registered under a code
    Delete {
        /// Access code
        code: String,
    },
    /// Remove all expired shares
    Purge,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Use 'handoff --help' for commands");
        return Ok(());
    };

    let cfg = Arc::new(core_config_from_lookup(|k| std::env::var(k).ok())?);
    let data_dir = cli
        .data_dir
        .or_else(|| std::env::var(env::DATA_DIR).ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    let store: Arc<dyn ReferenceStore> = Arc::new(FsStore::open(&data_dir).await?);

    match command {
        Commands::Register { location, name } => {
            let generator = RandomCodeGenerator::new(cfg.code_digits())
                .ok_or("configured code width is unsupported")?;
            let service = RegistrationService::new(cfg, store, Arc::new(generator));
            match service.register(&location, &name).await {
                Ok(code) => println!("Registered {} with code: {}", name, code),
                Err(e) => eprintln!("Error registering file: {}", e),
            }
        }
        Commands::Validate { code } => {
            let service = ValidationService::new(cfg, store);
            match service.validate(&code).await {
                Ok(reference) => {
                    println!(
                        "Code: {}, Name: {}, URL: {}, Created: {}",
                        reference.code,
                        reference.display_name,
                        reference.location_pointer,
                        reference.created_at.to_rfc3339()
                    );
                    if let Some(expires_at) = reference.expires_at {
                        println!("Expires: {}", expires_at.to_rfc3339());
                    }
                }
                Err(e) => eprintln!("Error validating code: {}", e),
            }
        }
        Commands::Delete { code } => {
            let parsed = handoff_core::AccessCode::parse(&code, cfg.code_digits())?;
            if store.delete(&parsed).await? {
                println!("Deleted share with code: {}", parsed);
            } else {
                println!("No share found with code: {}", parsed);
            }
        }
        Commands::Purge => {
            let purged = store.purge_expired(chrono::Utc::now()).await?;
            println!("Purged {} expired shares", purged);
        }
    }

    Ok(())
}
