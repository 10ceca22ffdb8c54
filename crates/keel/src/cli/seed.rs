use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;

use keel::keel_runtime::seeders::list_seeders;
use keel::Keel;

use super::print_header;

/// Populate the database with sample data.
#[derive(Parser)]
pub struct SeedCommand {
    #[command(subcommand)]
    pub action: SeedAction,
}

#[derive(Subcommand)]
pub enum SeedAction {
    /// Run every seeder, or one seeder and its dependencies.
    Run {
        /// Seeder name; the `Seeder` suffix may be omitted.
        name: Option<String>,
    },

    /// List seeders in execution order.
    List,
}

impl SeedCommand {
    pub async fn execute(self, keel: Keel) -> Result<()> {
        match self.action {
            SeedAction::Run { name } => {
                let db = keel.connect().await?;
                let runner = keel.into_seeder(db);

                print_header("Seeders");
                match &name {
                    Some(name) => println!("  {} Running {}...", style("→").dim(), name),
                    None => println!("  {} Running all seeders...", style("→").dim()),
                }

                let result = runner.run(name.as_deref()).await;
                runner.db().close().await;

                let ran = result?;
                if ran.is_empty() {
                    println!("  {} No seeders registered", style("ℹ").blue());
                } else {
                    for seeder in &ran {
                        println!("  {} Seeded: {}", style("✓").green(), seeder);
                    }
                    println!();
                    println!("  {} Ran {} seeder(s)", style("✓").green(), ran.len());
                }
                println!();
            }

            SeedAction::List => {
                print_header("Seeders");

                let listing = list_seeders(keel.seeders());
                if listing.is_empty() {
                    println!("  {} No seeders registered", style("ℹ").blue());
                }
                for item in &listing {
                    if item.dependencies.is_empty() {
                        println!("  {:>3}. {}", item.position, style(&item.name).cyan());
                    } else {
                        println!(
                            "  {:>3}. {} {} {}",
                            item.position,
                            style(&item.name).cyan(),
                            style("after").dim(),
                            item.dependencies.join(", ")
                        );
                    }
                }
                println!();
            }
        }

        Ok(())
    }
}
