// src/main.rs
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use plancharge_core::calendar::{build_period, YearMonth};
use plancharge_core::config::Config;
use plancharge_core::export::rights_to_csv;
use plancharge_core::feeds::PlanningSnapshot;
use plancharge_core::server::{self, AppState};

#[derive(Parser)]
#[command(name = "plancharge")]
#[command(about = "Plan de charge and titres-restaurant computations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve,
    /// Print the calendar of a month
    Calendar {
        /// Month as YYYY-MM
        #[arg(long)]
        month: YearMonth,
    },
    /// Compute the plan de charge of a month from a snapshot file
    Plan {
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long)]
        month: YearMonth,
        /// Print the full view as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compute meal-voucher rights of a month from a snapshot file
    MealVouchers {
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long)]
        month: YearMonth,
        /// Write the provider CSV to this file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration from environment")?;

    match cli.command {
        Commands::Serve => {
            info!("Starting plan de charge API");
            server::serve(&config).await?;
        }
        Commands::Calendar { month } => {
            let days = build_period(month, &config.holiday_source());
            for day in &days {
                let kind = if day.is_holiday {
                    "férié"
                } else if day.is_weekend {
                    "week-end"
                } else {
                    "ouvré"
                };
                println!("{} {} {}", day.label, day.date, kind);
            }
            println!(
                "{} jours ouvrés",
                days.iter().filter(|day| day.is_workable()).count()
            );
        }
        Commands::Plan {
            snapshot,
            month,
            json,
        } => {
            let data = PlanningSnapshot::load(&snapshot)
                .await
                .with_context(|| format!("Failed to load snapshot {}", snapshot.display()))?;
            let view = AppState::from_config(&config).plan_charge(month, &data).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
                return Ok(());
            }

            for collaborator in &view.collaborators {
                let summary = &collaborator.summary;
                println!(
                    "{:<30} TACE {:>3}% déclarés {:>2} prévus {:>2} absences {:>2} non planifiés {:>2}{}",
                    collaborator.collaborator.name,
                    summary.utilization_percent,
                    summary.declared_days,
                    summary.forecast_days,
                    summary.absence_days,
                    summary.unplanned_days,
                    if summary.insufficient_staffing {
                        "  ⚠ staffing insuffisant"
                    } else {
                        ""
                    }
                );
            }
            let metrics = &view.global_metrics;
            println!(
                "TACE global {}% ({} collaborateurs, {} en staffing insuffisant)",
                metrics.global_utilization_percent,
                metrics.active_collaborators,
                metrics.collaborators_with_insufficient_staffing
            );
            println!(
                "Déclarés {}% / prévus {}% / non planifiés {}%",
                metrics.declared_percent, metrics.forecast_percent, metrics.unplanned_percent
            );
        }
        Commands::MealVouchers {
            snapshot,
            month,
            csv,
        } => {
            let data = PlanningSnapshot::load(&snapshot)
                .await
                .with_context(|| format!("Failed to load snapshot {}", snapshot.display()))?;
            let rights = AppState::from_config(&config)
                .meal_vouchers(month, &data)
                .await?;

            println!("{} jours ouvrés en {}", rights.working_days, month);
            for employee in &rights.employees {
                println!(
                    "{:<10} {:<30} {:>2} - {:>2} = {:>2} titres",
                    employee.matricule.as_deref().unwrap_or("-"),
                    employee.name,
                    employee.working_days,
                    employee.absence_days,
                    employee.rights
                );
            }

            if let Some(out) = csv {
                let content = rights_to_csv(&rights)?;
                tokio::fs::write(&out, content)
                    .await
                    .with_context(|| format!("Failed to write {}", out.display()))?;
                info!("Wrote {}", out.display());
            }
        }
    }

    Ok(())
}
