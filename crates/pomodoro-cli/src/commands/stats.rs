use chrono::NaiveDate;
use clap::Subcommand;
use pomodoro_core::stats;
use pomodoro_core::Database;

use crate::render;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Runs started today
    Today {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Runs started on a given day
    Day {
        /// Local date, YYYY-MM-DD
        date: NaiveDate,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Every recorded run
    All {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    match action {
        StatsAction::Today { json } => {
            let summary = stats::today_summary(&db)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", render::daily_table(&summary));
            }
        }
        StatsAction::Day { date, json } => {
            let summary = stats::daily_summary(&db, date)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", render::daily_table(&summary));
            }
        }
        StatsAction::All { json } => {
            let records = stats::all_records(&db)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("No runs recorded yet.");
            } else {
                print!("{}", render::records_table(&records));
            }
        }
    }
    Ok(())
}
