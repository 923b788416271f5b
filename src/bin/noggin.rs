//! # noggin
//!
//! Command-line front end for milestone test history and retry reminders.
//!
//! Usage: `noggin record pincerGrasp --fail --profile Lucas`

use anyhow::Result;
use chrono::{Local, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use dotenvy::dotenv;
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use noggin::core::{format_duration, parse_duration};
use noggin::{
    Config, Database, Delivery, NotificationHost, OutcomeAdvisor, OutcomeCatalog, OutcomeView,
    ReminderDecision, ReminderEvent, ReminderScheduler, TestHistoryStore, TestId,
};

#[derive(Parser)]
#[command(
    name = "noggin",
    version,
    about = "Milestone test history and retry reminders"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage child profiles
    #[command(subcommand)]
    Profile(ProfileCmd),
    /// Record a test attempt and show the advice for it
    Record(RecordArgs),
    /// Show the advice for the current history without recording
    Advise(AdviseArgs),
    /// Inspect and manage retry reminders
    #[command(subcommand)]
    Reminders(RemindersCmd),
    /// Deliver reminders as they come due
    Watch,
    /// List the milestone tests
    Tests,
}

#[derive(Subcommand)]
enum ProfileCmd {
    /// Add a child profile
    Add {
        name: String,
        /// Birth date (YYYY-MM-DD)
        #[arg(long)]
        born: Option<NaiveDate>,
    },
    /// List profiles
    List,
    /// Select the profile used when --profile is omitted
    Use { name: String },
    /// Show a profile's test history
    Show { name: Option<String> },
    /// Delete a profile and its history
    Remove { name: String },
}

#[derive(Args)]
struct RecordArgs {
    test: TestId,
    #[arg(long, conflicts_with = "fail", required_unless_present = "fail")]
    pass: bool,
    #[arg(long)]
    fail: bool,
    #[arg(long)]
    profile: Option<String>,
    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct AdviseArgs {
    test: TestId,
    #[arg(long)]
    profile: Option<String>,
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum RemindersCmd {
    /// List pending reminders and the badge counter
    List,
    /// Schedule a reminder unless one is already pending
    Schedule {
        test: TestId,
        /// Delay like 5s, 2h, 2w (defaults to the test's catalog delay)
        #[arg(long, value_parser = parse_delay)]
        delay: Option<Duration>,
    },
    /// Cancel the pending reminder for a test
    Cancel { test: TestId },
    /// Cancel every reminder and reset the badge
    Clear,
    /// Open a pending reminder as if the user tapped it
    Fire { id: Uuid },
    /// Deliver every reminder that is due now
    Due,
}

fn parse_delay(s: &str) -> std::result::Result<Duration, String> {
    parse_duration(s).ok_or_else(|| {
        format!("Invalid delay '{s}'. Use formats like `30m`, `2h`, `1d`, `2w` or `1h30m`.")
    })
}

struct Services {
    config: Config,
    history: TestHistoryStore<Database>,
    scheduler: ReminderScheduler<Database>,
}

impl Services {
    fn open(config: Config) -> Result<Self> {
        let database = Database::new(&config.database_path)?;

        let catalog = match &config.catalog_path {
            Some(path) => {
                let catalog = OutcomeCatalog::load(path)?;
                info!("📄 Loaded outcome catalog from {path}");
                catalog
            }
            None => OutcomeCatalog::builtin()?,
        };

        Ok(Self {
            history: TestHistoryStore::new(database.clone()),
            scheduler: ReminderScheduler::new(database, Arc::new(catalog)),
            config,
        })
    }

    fn advisor(&self) -> OutcomeAdvisor<'_, Database, Database> {
        OutcomeAdvisor::new(&self.history, &self.scheduler)
    }

    /// Explicit --profile, else the selected profile
    fn resolve_profile(&self, explicit: Option<String>) -> Result<String> {
        match explicit {
            Some(name) => Ok(name),
            None => self.history.current_profile()?.ok_or_else(|| {
                anyhow::anyhow!("No profile selected. Pass --profile or run `noggin profile use <name>`.")
            }),
        }
    }
}

fn print_view(view: &OutcomeView, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(view)?);
        return Ok(());
    }

    if let Some(headline) = &view.headline {
        println!("{headline}");
    }
    println!("{}", view.message);
    println!(
        "\n{}: {} failed attempt{}",
        view.test_id.display_name(),
        view.failed_count,
        if view.failed_count == 1 { "" } else { "s" }
    );

    match &view.reminder {
        ReminderDecision::Scheduled {
            fire_at,
            confirmation,
        } => {
            println!("⏰ {confirmation}");
            println!("   (fires {})", fire_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"));
        }
        ReminderDecision::AlreadyPending => println!("⏰ A reminder for this test is already pending."),
        ReminderDecision::Cancelled => println!("✅ The pending reminder for this test was cancelled."),
        ReminderDecision::NotRequested => {}
    }
    Ok(())
}

fn print_delivery(delivery: &Delivery) {
    println!("🔔 {}", delivery.reminder.prompt_text());
    println!("   → {}", delivery.destination);
}

fn run_profile(services: &Services, cmd: ProfileCmd) -> Result<()> {
    match cmd {
        ProfileCmd::Add { name, born } => {
            let profile = services.history.create_profile(&name, born)?;
            if services.history.current_profile()?.is_none() {
                services.history.set_current_profile(&profile.name)?;
            }
            println!("Added profile {}", profile.name);
        }
        ProfileCmd::List => {
            let current = services.history.current_profile()?;
            let profiles = services.history.profiles()?;
            if profiles.is_empty() {
                println!("No profiles yet. Use `noggin profile add <name>` to create one.");
            }
            let today = Local::now().date_naive();
            for profile in profiles {
                let marker = if current.as_deref() == Some(profile.name.as_str()) {
                    "*"
                } else {
                    " "
                };
                match profile.age_in_months(today) {
                    Some(months) => println!("{marker} {} ({months} months)", profile.name),
                    None => println!("{marker} {}", profile.name),
                }
            }
        }
        ProfileCmd::Use { name } => {
            services.history.set_current_profile(&name)?;
            println!("Now using profile {name}");
        }
        ProfileCmd::Show { name } => {
            let name = services.resolve_profile(name)?;
            let profile = services.history.load(&name)?;
            println!("{}", profile.name);
            if profile.records.is_empty() {
                println!("  No tests recorded.");
            }
            for record in profile.records.values() {
                let attempts: String = record
                    .outcomes
                    .iter()
                    .map(|passed| if *passed { '✓' } else { '✗' })
                    .collect();
                println!(
                    "  {:<24} {} ({} failed)",
                    record.test_id.display_name(),
                    attempts,
                    record.failed_count()
                );
            }
        }
        ProfileCmd::Remove { name } => {
            if services.history.remove_profile(&name)? {
                println!("Removed profile {name}");
            } else {
                println!("No profile named {name}");
            }
        }
    }
    Ok(())
}

fn run_reminders(services: &Services, cmd: RemindersCmd) -> Result<()> {
    let scheduler = &services.scheduler;
    match cmd {
        RemindersCmd::List => {
            let pending = scheduler.pending()?;
            println!("Badge: {}", scheduler.badge()?);
            if pending.is_empty() {
                println!("📋 No pending reminders.");
            }
            let now = Utc::now();
            for reminder in pending {
                let when = match (reminder.fire_at - now).to_std() {
                    Ok(remaining) => format!("in {}", format_duration(remaining)),
                    Err(_) => "due now".to_string(),
                };
                println!(
                    "{}  {:<22} {}",
                    reminder.id,
                    reminder.test_name().unwrap_or("(unknown)"),
                    when
                );
            }
        }
        RemindersCmd::Schedule { test, delay } => {
            if scheduler.exists(test)? {
                println!("⏰ A reminder for {} is already pending.", test.display_name());
                return Ok(());
            }
            let delay = delay.unwrap_or_else(|| {
                scheduler
                    .catalog()
                    .reminder_delay(test, services.config.default_reminder_delay())
            });
            scheduler.schedule(test, delay)?;
            println!("{}", scheduler.confirmation_message(test, delay));
        }
        RemindersCmd::Cancel { test } => {
            if scheduler.cancel(test)? {
                println!("✅ Cancelled the {} reminder.", test.display_name());
            } else {
                println!("No pending reminder for {}.", test.display_name());
            }
        }
        RemindersCmd::Clear => {
            scheduler.clear_all()?;
            println!("✅ Cleared all reminders.");
        }
        RemindersCmd::Fire { id } => {
            let reminder = scheduler
                .pending()?
                .into_iter()
                .find(|r| r.id == id)
                .ok_or_else(|| anyhow::anyhow!("No pending reminder with id {}", id))?;
            let destination = scheduler.handle_fired(&reminder)?;
            print_delivery(&Delivery {
                reminder,
                destination,
            });
        }
        RemindersCmd::Due => {
            let deliveries = scheduler.deliver_due(Utc::now())?;
            if deliveries.is_empty() {
                println!("Nothing due.");
            }
            for delivery in &deliveries {
                print_delivery(delivery);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    let cli = Cli::parse();
    let services = Services::open(config)?;

    match cli.cmd {
        Command::Profile(cmd) => run_profile(&services, cmd)?,
        Command::Record(args) => {
            let profile = services.resolve_profile(args.profile)?;
            let passed = args.pass && !args.fail;
            let view = services.advisor().record(&profile, args.test, passed)?;
            print_view(&view, args.json)?;
        }
        Command::Advise(args) => {
            let profile = services.resolve_profile(args.profile)?;
            let view = services.advisor().advise(&profile, args.test)?;
            print_view(&view, args.json)?;
        }
        Command::Reminders(cmd) => run_reminders(&services, cmd)?,
        Command::Watch => {
            let poll = services.config.reminder_poll_interval();
            let mut events = services.scheduler.subscribe();
            tokio::spawn(async move {
                while let Ok(event) = events.recv().await {
                    match event {
                        ReminderEvent::Scheduled { .. } => {
                            info!("Reminder scheduled for {}", event.test_id())
                        }
                        ReminderEvent::Removed { .. } => {
                            info!("Reminder removed for {}", event.test_id())
                        }
                    }
                }
            });

            info!(
                "Watching for due reminders (badge {})",
                services.scheduler.host().badge().unwrap_or_else(|e| {
                    error!("Failed to read badge: {e}");
                    0
                })
            );
            services.scheduler.run(poll, |delivery| print_delivery(&delivery)).await;
        }
        Command::Tests => {
            for test in TestId::ALL {
                let entry = services.scheduler.catalog().entry(test);
                let delay = entry
                    .map(|e| format_duration(Duration::from_secs(e.reminder_delay_seconds)))
                    .unwrap_or_else(|| "-".to_string());
                println!("{:<22} {:<24} retry after {}", test.as_str(), test.display_name(), delay);
            }
        }
    }

    Ok(())
}
