mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "schulmanager-ics")]
#[command(about = "Export a Schulmanager Online timetable as an iCalendar file")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the timetable and write an ICS file
    Generate {
        /// Schulmanager e-mail address or username
        #[arg(short, long)]
        username: String,

        /// Password
        #[arg(short = 'P', long)]
        password: String,

        /// Output file, `-` for stdout
        #[arg(short, long)]
        output: Option<String>,

        /// Calendar name
        #[arg(long)]
        calendar_name: Option<String>,

        /// Timezone hint written as X-WR-TIMEZONE (e.g. Europe/Berlin)
        #[arg(long)]
        timezone: Option<String>,

        /// Reminder before each lesson, in minutes
        #[arg(long)]
        reminder_minutes: Option<u32>,

        /// Reference date for the schedule window (format: YYYY-MM-DD, defaults to today)
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Check credentials and the linked student
    Validate {
        /// Schulmanager e-mail address or username
        #[arg(short, long)]
        username: String,

        /// Password
        #[arg(short = 'P', long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };

    // stdout may carry the calendar itself
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("schulmanager_ics_cli={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Generate {
            username,
            password,
            output,
            calendar_name,
            timezone,
            reminder_minutes,
            date,
        } => {
            commands::generate_command(commands::GenerateParams {
                username,
                password,
                output,
                calendar_name,
                timezone,
                reminder_minutes,
                date,
            })
            .await
        }

        Commands::Validate { username, password } => {
            commands::validate_command(username, password).await
        }
    }
}
