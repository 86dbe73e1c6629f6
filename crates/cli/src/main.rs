//! Maintenance CLI for a MediBook data directory.
//!
//! Reads `MEDIBOOK_DATA_DIR` (default `booking_data`) and the profile default variables the same
//! way the API server does.

use anyhow::Context;
use clap::{Parser, Subcommand};
use medibook_core::{
    config::{data_dir_from_env_value, profile_defaults_from_env_values},
    CoreConfig, LogNotifier, SeedData, Services, Sha256CredentialHasher, SystemClock,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "medibook")]
#[command(about = "MediBook appointment booking maintenance CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace all doctors, the admin and every appointment with demonstration data
    Seed {
        /// Seed file (YAML); the bundled data is used when omitted
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Remove all doctors, admins, profiles and appointments. Patients are kept
    Destroy,
    /// List doctor profiles whose account no longer exists
    Orphans {
        /// Delete the orphaned profiles
        #[arg(long)]
        delete: bool,
    },
    /// Explain why each doctor is or is not publicly listed
    Visibility,
    /// List the publicly visible doctors
    ListDoctors,
}

fn services_from_env() -> anyhow::Result<Services> {
    let data_dir = data_dir_from_env_value(std::env::var("MEDIBOOK_DATA_DIR").ok());
    let defaults = profile_defaults_from_env_values(
        std::env::var("DEFAULT_SPECIALTY").ok(),
        std::env::var("DEFAULT_QUALIFICATIONS").ok(),
        std::env::var("DEFAULT_EXPERIENCE_YEARS").ok(),
    )?;
    let services = Services::new(
        Arc::new(CoreConfig::new(data_dir, defaults)?),
        Arc::new(LogNotifier),
        Arc::new(SystemClock),
        Arc::new(Sha256CredentialHasher),
    )?;
    Ok(services)
}

fn load_seed(file: Option<PathBuf>) -> anyhow::Result<SeedData> {
    match file {
        Some(path) => {
            let yaml = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read seed file {}", path.display()))?;
            Ok(SeedData::from_yaml(&yaml)?)
        }
        None => Ok(SeedData::bundled()?),
    }
}

fn run(services: &Services, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Seed { file } => {
            let data = load_seed(file)?;
            let summary = services.seeder.seed(&data)?;
            println!(
                "Seeded {} doctors with {} reviews. Admin: {}",
                summary.doctors, summary.reviews, data.admin.email
            );
        }
        Commands::Destroy => {
            services.seeder.destroy()?;
            println!("Data destroyed.");
        }
        Commands::Orphans { delete } => {
            let orphans = services.doctors.orphaned_profiles();
            if orphans.is_empty() {
                println!("No orphaned profiles found.");
            }
            for profile in &orphans {
                if delete {
                    services.doctors.delete(&profile.id)?;
                    println!("Deleted orphaned profile {}", profile.id);
                } else {
                    println!(
                        "Orphaned profile {} (missing account {})",
                        profile.id, profile.identity_id
                    );
                }
            }
        }
        Commands::Visibility => {
            let report = services.doctors.visibility_report();
            if report.is_empty() {
                println!("No doctor accounts found.");
            }
            for entry in report {
                let status = if entry.visible {
                    "visible".to_string()
                } else {
                    format!("hidden: {}", entry.reasons.join(", "))
                };
                println!("{} <{}>: {}", entry.identity.name, entry.identity.email, status);
            }
        }
        Commands::ListDoctors => {
            let doctors = services.doctors.public_listing();
            if doctors.is_empty() {
                println!("No doctors found.");
            }
            for entry in doctors {
                let name = entry
                    .owner
                    .as_ref()
                    .map(|o| o.name.to_string())
                    .unwrap_or_default();
                println!(
                    "ID: {}, Name: {}, Specialty: {}, Rating: {:.1} ({} reviews)",
                    entry.profile.id,
                    name,
                    entry.profile.specialty,
                    entry.profile.rating,
                    entry.profile.review_count
                );
            }
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("medibook_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("Use 'medibook --help' for commands");
        return Ok(());
    };

    let services = services_from_env()?;
    run(&services, command)
}
