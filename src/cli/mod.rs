use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod schedule;
pub mod serve;

#[derive(Subcommand)]
enum Command {
    /// Run the API server the embedded form talks to
    Serve {
        /// Set the server host address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Set the server port
        #[arg(long, default_value = "2222")]
        port: String,
    },
    /// Create a meeting directly, without the form. Useful for checking a
    /// portal webhook end to end.
    Schedule {
        /// Meeting type shown in the subject ("R1", "R2", ...)
        #[arg(long, default_value = "R1")]
        kind: String,

        /// Start as a datetime-local value, e.g. 2024-06-10T14:00
        #[arg(long)]
        datetime: Option<String>,

        /// Start date, when used together with --time
        #[arg(long)]
        date: Option<String>,

        /// Start time of day, when used together with --date
        #[arg(long)]
        time: Option<String>,

        /// Duration in minutes
        #[arg(long)]
        duration: Option<String>,

        /// Explicit deal id
        #[arg(long)]
        deal_id: Option<String>,

        /// Pasted deal card URL
        #[arg(long)]
        deal_link: Option<String>,

        /// Client email recorded in the description
        #[arg(long)]
        client_email: Option<String>,

        /// Conference link recorded in the description
        #[arg(long)]
        meet_link: Option<String>,

        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();

    // Handle each sub command
    match args.command {
        Some(Command::Serve { host, port }) => {
            serve::run(host, port).await;
        }
        Some(Command::Schedule {
            kind,
            datetime,
            date,
            time,
            duration,
            deal_id,
            deal_link,
            client_email,
            meet_link,
            notes,
        }) => {
            let values = crate::scheduling::FormValues {
                kind: Some(kind),
                datetime,
                date,
                time,
                duration,
                deal_id,
                deal_link,
                placement: None,
                client_email,
                meet_link,
                notes,
            };
            schedule::run(values).await?;
        }
        None => {}
    }

    Ok(())
}
