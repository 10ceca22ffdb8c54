use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;

use keel::keel_runtime::migrations::{MigrationRunner, MigrationState, MigrationStatus};
use keel::keel_runtime::PgDatabase;
use keel::Keel;

use super::print_header;

/// Manage database migrations.
#[derive(Parser)]
pub struct MigrateCommand {
    #[command(subcommand)]
    pub action: MigrateAction,
}

#[derive(Subcommand)]
pub enum MigrateAction {
    /// Run all pending migrations.
    Up,

    /// Rollback the last N migrations.
    Down {
        /// Number of migrations to rollback.
        #[arg(default_value = "1")]
        count: usize,
    },

    /// Show migration status.
    Status {
        /// Print the status as JSON.
        #[arg(long)]
        json: bool,
    },
}

impl MigrateCommand {
    pub async fn execute(self, keel: Keel) -> Result<()> {
        let db = keel.connect().await?;
        let runner = keel.into_migrator(db);

        let result = run_action(self.action, &runner).await;
        runner.db().close().await;
        result
    }
}

async fn run_action(action: MigrateAction, runner: &MigrationRunner<PgDatabase>) -> Result<()> {
    match action {
        MigrateAction::Up => {
            print_header("Migrations");
            println!("  {} Running pending migrations...", style("→").dim());

            let report = runner.run().await?;
            if report.is_empty() {
                println!("  {} Nothing to migrate", style("ℹ").blue());
            } else {
                for version in &report.applied {
                    println!("  {} Migrated: {}", style("✓").green(), version);
                }
                println!();
                println!(
                    "  {} Applied {} migration(s)",
                    style("✓").green(),
                    report.count()
                );
            }
            println!();
        }

        MigrateAction::Down { count } => {
            print_header("Migrations");
            println!(
                "  {} Rolling back {} migration(s)...",
                style("→").dim(),
                count
            );

            let reverted = runner.rollback(count).await?;
            if reverted.is_empty() {
                println!("  {} No migrations to rollback", style("ℹ").blue());
            } else {
                for version in &reverted {
                    println!("  {} Rolled back: {}", style("✓").green(), version);
                }
                println!();
                println!(
                    "  {} Rolled back {} migration(s)",
                    style("✓").green(),
                    reverted.len()
                );
            }
            println!();
        }

        MigrateAction::Status { json } => {
            let status = runner.status().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }
    }

    Ok(())
}

fn print_status(status: &MigrationStatus) {
    print_header("Migration Status");

    if status.entries.is_empty() && status.orphaned.is_empty() {
        println!("  {} No migrations found", style("ℹ").blue());
        println!();
        return;
    }

    for entry in &status.entries {
        match &entry.state {
            MigrationState::Applied { applied_at } => println!(
                "    {} {} {} ({})",
                style("✓").green(),
                style(&entry.version).cyan(),
                style(&entry.description).dim(),
                applied_at.format("%Y-%m-%d %H:%M:%S")
            ),
            MigrationState::Pending => println!(
                "    {} {} {}",
                style("○").yellow(),
                style(&entry.version).yellow(),
                style(&entry.description).dim()
            ),
        }
    }

    if !status.orphaned.is_empty() {
        println!();
        println!(
            "  {} Applied but not registered (cannot be rolled back):",
            style("!").red()
        );
        for record in &status.orphaned {
            println!(
                "    {} {} ({})",
                style("?").red(),
                style(&record.version).red(),
                record.applied_at.format("%Y-%m-%d %H:%M:%S")
            );
        }
    }

    println!();
    println!(
        "  {} {} applied, {} pending, {} total",
        style("ℹ").blue(),
        status.applied_count,
        status.pending_count,
        status.total
    );
    println!();
}
