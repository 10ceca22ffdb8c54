mod migrate;
mod seed;

pub use migrate::MigrateCommand;
pub use seed::SeedCommand;

use anyhow::Result;
use clap::{Parser, Subcommand};

use keel::keel_core::config::KeelConfig;
use keel::{database, logging, Keel};

/// Keel - database migrations and seeders
#[derive(Parser)]
#[command(name = "keel")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path. Falls back to environment variables when missing.
    #[arg(short, long, default_value = "keel.toml", global = true)]
    pub config: String,

    /// Directory holding SQL migrations (overrides the configuration).
    #[arg(short, long, global = true)]
    pub migrations_dir: Option<String>,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Manage database migrations.
    Migrate(MigrateCommand),

    /// Populate the database with sample data.
    Seed(SeedCommand),
}

impl Cli {
    /// Execute the CLI command.
    pub async fn execute(self) -> Result<()> {
        // Load .env if present
        dotenvy::dotenv().ok();

        let config = KeelConfig::load(&self.config)?;
        logging::init(&config.logging, self.verbose)?;

        let mut builder = Keel::builder()
            .config(config)
            .migrations(database::migrations::all())
            .seeders(database::seeders::all());
        if let Some(dir) = &self.migrations_dir {
            builder = builder.migrations_dir(dir);
        }
        let keel = builder.build()?;

        match self.command {
            Commands::Migrate(cmd) => cmd.execute(keel).await,
            Commands::Seed(cmd) => cmd.execute(keel).await,
        }
    }
}

fn print_header(title: &str) {
    println!();
    println!(
        "  {}  {} {}",
        console::style("⚓").bold(),
        console::style("KEEL").bold().cyan(),
        title
    );
    println!();
}
