use std::fmt::Write as _;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use voyagecraft::itinerary::{PlanMode, PlanOutcome, TripRequest};
use voyagecraft::shared::{build_trip_planner, logging, VoyageConfig};

#[derive(Parser)]
#[command(name = "voyagecraft")]
#[command(about = "VoyageCraft - day-by-day itineraries from map data and an LLM planner")]
struct Args {
    /// Verbose logs on stderr
    #[arg(long, global = true, env = "VOYAGECRAFT_DEBUG")]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Plan a trip and print the itinerary
    Plan {
        /// City or region to visit
        destination: String,

        /// First day (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// Last day, inclusive (YYYY-MM-DD)
        #[arg(long)]
        end: String,

        /// Comma-separated interests, e.g. "history, food"
        #[arg(long, default_value = "")]
        interests: String,

        #[arg(long, value_enum, default_value_t = ModeArg::PerDay)]
        mode: ModeArg,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    PerDay,
    WholeTrip,
}

impl From<ModeArg> for PlanMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::PerDay => PlanMode::PerDay,
            ModeArg::WholeTrip => PlanMode::WholeTrip,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Text,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_cli_logging(args.debug);

    match args.command {
        Command::Plan {
            destination,
            start,
            end,
            interests,
            mode,
            format,
        } => {
            let (config, _) = VoyageConfig::load()?;
            let trips = build_trip_planner(&config)?;
            let request = TripRequest {
                destination,
                start_date: start,
                end_date: end,
                budget: None,
                interests: split_interests(&interests),
                mode: mode.into(),
            };

            let outcome = trips.plan(&request).await?;
            match format {
                Format::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&outcome).context("failed to encode plan")?
                ),
                Format::Text => print!("{}", render_text(&request.destination, &outcome)),
            }
        }
    }
    Ok(())
}

fn split_interests(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn render_text(destination: &str, outcome: &PlanOutcome) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Trip to {destination}");
    for day in &outcome.plan.days {
        let _ = writeln!(out);
        match day.score {
            Some(score) => {
                let _ = writeln!(out, "{} (score {:.2})", day.date, score);
            }
            None => {
                let _ = writeln!(out, "{}", day.date);
            }
        }
        if day.items.is_empty() {
            let _ = writeln!(out, "  (nothing scheduled)");
        }
        for item in &day.items {
            let start = item.start.as_deref().unwrap_or("--:--");
            let end = item.end.as_deref().unwrap_or("--:--");
            let _ = writeln!(out, "  {start}-{end}  {} [{}]", item.name, item.category_key());
            if let Some(blurb) = item.blurb.as_deref().filter(|b| !b.is_empty()) {
                let _ = writeln!(out, "               {blurb}");
            }
        }
    }
    let totals = &outcome.plan.totals;
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Estimated cost: {:.0}-{:.0}",
        totals.cost_low, totals.cost_high
    );
    for error in &outcome.planner_errors {
        let _ = writeln!(out, "note: {error}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use voyagecraft::itinerary::{Day, Plan, Poi, Totals};

    #[test]
    fn test_split_interests() {
        assert_eq!(split_interests(" history, food,, "), vec!["history", "food"]);
        assert!(split_interests("").is_empty());
    }

    #[test]
    fn test_render_text() {
        let mut tower = Poi::new("Galata Tower", 41.0256, 28.9741, "sight");
        tower.start = Some("09:00".to_string());
        tower.end = Some("11:00".to_string());
        tower.blurb = Some("Medieval stone tower.".to_string());
        let mut day = Day::new("2025-08-20", vec![tower]);
        day.score = Some(10.5);

        let outcome = PlanOutcome {
            plan: Plan {
                days: vec![day, Day::new("2025-08-21", Vec::new())],
                totals: Totals::for_days(2),
            },
            origins: Vec::new(),
            planner_errors: vec!["Planner error for 2025-08-21: timeout".to_string()],
        };

        let text = render_text("Istanbul", &outcome);
        assert!(text.starts_with("Trip to Istanbul\n"));
        assert!(text.contains("2025-08-20 (score 10.50)"));
        assert!(text.contains("  09:00-11:00  Galata Tower [sight]"));
        assert!(text.contains("Medieval stone tower."));
        assert!(text.contains("(nothing scheduled)"));
        assert!(text.contains("Estimated cost: 100-240"));
        assert!(text.contains("note: Planner error for 2025-08-21: timeout"));
    }
}
