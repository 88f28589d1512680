use clap::{Parser, Subcommand};
use crm_analytics::{AnalyticsEngine, AnalyticsReport, TimeRange};

#[derive(Parser)]
#[command(name = "crm-analytics", about = "CRM analytics reports")]
struct Cli {
    /// Database path (default: ~/.crm-analytics/crm.db)
    #[arg(long)]
    db: Option<String>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the combined analytics report
    Report {
        /// Range: this_month, last_month, this_quarter, last_quarter,
        /// this_year, last_year, all_time
        #[arg(long, default_value = "last_year")]
        range: String,
        /// Evaluate as of this date (YYYY-MM-DD) instead of today
        #[arg(long)]
        now: Option<String>,
        /// Reject unknown ranges instead of falling back to last_year
        #[arg(long)]
        strict: bool,
        /// Output the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import records from a JSON dataset file
    Load {
        /// Path to the dataset
        file: std::path::PathBuf,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// List the range tokens and the windows they resolve to today
    Ranges,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// List all config values
    List,
}

fn parse_now(now: Option<&str>) -> anyhow::Result<chrono::NaiveDateTime> {
    let current = chrono::Local::now().naive_local();
    match now {
        Some(s) => {
            let date = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|_| anyhow::anyhow!("--now must be YYYY-MM-DD, got '{s}'"))?;
            Ok(date.and_time(current.time()))
        }
        None => Ok(current),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let db = match &cli.db {
        Some(path) => crm_analytics::Database::open_at(path).await?,
        None => crm_analytics::Database::open().await?,
    };

    match cli.command {
        Commands::Report {
            range,
            now,
            strict,
            json,
        } => {
            let range = if strict {
                TimeRange::parse_strict(&range)?
            } else {
                TimeRange::parse(&range)
            };
            let now = parse_now(now.as_deref())?;
            let engine = AnalyticsEngine::from_database(db).await?;
            let report = engine.compute_all_at(range, now).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Commands::Load { file } => {
            let text = std::fs::read_to_string(&file)?;
            let data = serde_json::from_str(&text)?;
            let engine = AnalyticsEngine::from_database(db).await?;
            let r = engine.load(data).await?;
            println!("Loaded {} records from {}", r.total(), file.display());
            println!("  Members:       {}", r.members);
            println!("  Donations:     {}", r.donations);
            println!("  Events:        {}", r.events);
            println!("  Registrations: {}", r.registrations);
            println!("  Volunteers:    {}", r.volunteers);
            println!("  Partners:      {}", r.partners);
        }
        Commands::Config { action } => {
            // Plain engine: a malformed stored value must not block fixing it.
            let engine = AnalyticsEngine::new(db, crm_analytics::EngineConfig::default());
            handle_config(&engine, action).await?;
        }
        Commands::Ranges => {
            let engine = AnalyticsEngine::from_database(db).await?;
            let now = parse_now(None)?;
            for range in TimeRange::ALL {
                let w = engine.scope(range, now).window;
                println!(
                    "{:<13} {:<13} {} .. {}",
                    range.as_str(),
                    w.label,
                    w.start.format("%Y-%m-%d %H:%M:%S"),
                    w.end.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
    }

    Ok(())
}

async fn handle_config(engine: &AnalyticsEngine, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => match engine.config_get(&key).await? {
            Some(v) => println!("{key} = {v}"),
            None => println!("{key} is not set"),
        },
        ConfigAction::Set { key, value } => {
            if !crm_analytics::config::KEYS.contains(&key.as_str()) {
                log::warn!("'{key}' is not read by the engine");
            }
            // Validate before storing.
            crm_analytics::EngineConfig::from_pairs([(key.as_str(), value.as_str())])?;
            engine.config_set(&key, &value).await?;
            println!("Config updated.");
        }
        ConfigAction::List => {
            let items = engine.config_list().await?;
            if items.is_empty() {
                println!("No config values set.");
            } else {
                for (k, v) in items {
                    println!("{k} = {v}");
                }
            }
        }
    }
    Ok(())
}

fn print_report(r: &AnalyticsReport) {
    println!(
        "{} ({} .. {})",
        r.window.label,
        r.window.start.format("%Y-%m-%d"),
        r.window.end.format("%Y-%m-%d")
    );
    for m in &r.overview.key_metrics {
        println!("  {:<16} {:>14}  {:>+5}%", m.title, m.value, m.growth);
    }

    let s = &r.members.summary;
    println!("  Members:");
    println!("    Total:     {} ({:+}%)", s.total_members, s.total_growth);
    println!("    Active:    {} ({:+}%)", s.active_members, s.active_growth);
    println!("    New:       {} ({:+}%)", s.new_members, s.new_members_growth);
    println!("    Retention: {}%", s.retention_rate);
    println!("    Tenure:    {:.1} years", s.avg_tenure_years);

    let d = &r.donations.summary;
    println!("  Donations:");
    println!("    Raised:    {:.2} ({:+}%)", d.total_raised, d.raised_growth);
    println!("    Donors:    {} ({:+}%)", d.total_donors, d.donors_growth);
    println!("    Average:   {} ({:+}%)", d.avg_donation, d.avg_donation_growth);
    println!("    Recurring: {}", d.recurring_donors);

    let e = &r.events.summary;
    println!("  Events:");
    println!("    Held:       {} ({:+}%)", e.total_events, e.events_growth);
    println!("    Attendance: {} of {} registered ({}%)", e.total_attendance, e.total_registrations, e.attendance_rate);

    let p = &r.programs.summary;
    println!("  Programs:");
    println!("    Volunteers: {} active of {}", p.active_volunteers, p.total_volunteers);
    println!("    Hours:      {} (estimated)", p.volunteer_hours);
    println!("    Partners:   {} active", p.active_partners);
}
