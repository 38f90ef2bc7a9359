use clap::{Args, Parser, Subcommand};
use preptrack::domain::{
    parse_date, Difficulty, EntryStatus, PrepCategory, RecurrenceFrequency,
};
use time::Date;

#[derive(Debug, Parser)]
#[command(name = "preptrack")]
#[command(about = "Track interview preparation from the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sign in with email and password, or with a passkey
    Login {
        email: Option<String>,
        /// Use a passkey instead of a password
        #[arg(long)]
        passkey: bool,
        /// Keep the session only until the next reboot
        #[arg(long)]
        no_remember: bool,
    },
    /// Create an account and sign in
    Signup {
        email: Option<String>,
        #[arg(long)]
        no_remember: bool,
    },
    /// Forget the local session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Manage entries
    Entries {
        #[command(subcommand)]
        command: EntriesCommand,
    },
    /// Show today's tasks
    Today,
    /// Show tasks for a past day or a date range
    History {
        #[arg(value_parser = parse_date_arg, conflicts_with_all = ["from", "to"])]
        date: Option<Date>,
        #[arg(long, value_parser = parse_date_arg, requires = "to")]
        from: Option<Date>,
        #[arg(long, value_parser = parse_date_arg, requires = "from")]
        to: Option<Date>,
    },
    /// Set the status of one task occurrence
    Status {
        entry_id: String,
        status: EntryStatus,
        /// Occurrence date, defaults to today
        #[arg(long, value_parser = parse_date_arg)]
        date: Option<Date>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Show progress statistics
    Stats {
        /// Days of completion history to show
        #[arg(long, default_value_t = preptrack::api::stats::DEFAULT_PROGRESS_DAYS)]
        days: u32,
    },
    /// Manage passkeys
    Passkeys {
        #[command(subcommand)]
        command: PasskeysCommand,
    },
    /// Print config path and create default file if missing
    ConfigPath,
}

#[derive(Debug, Subcommand)]
pub enum EntriesCommand {
    /// List entries
    List(ListArgs),
    /// Show one entry
    Show { id: String },
    /// Create an entry
    Add(AddArgs),
    /// Change fields of an entry
    Update(UpdateArgs),
    /// Delete one or more entries
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Full-text search
    Search { query: String },
    /// Tags with usage counts
    Tags,
    /// Topics with usage counts
    Topics {
        #[arg(long)]
        category: Option<PrepCategory>,
    },
    /// Sources with usage counts
    Sources,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(long)]
    pub category: Option<PrepCategory>,
    #[arg(long)]
    pub topic: Option<String>,
    #[arg(long)]
    pub difficulty: Option<Difficulty>,
    #[arg(long)]
    pub status: Option<EntryStatus>,
    #[arg(long)]
    pub source: Option<String>,
    #[arg(long)]
    pub tag: Option<String>,
    #[arg(long, value_parser = parse_date_arg)]
    pub date: Option<Date>,
    #[arg(long, value_parser = parse_date_arg)]
    pub from: Option<Date>,
    #[arg(long, value_parser = parse_date_arg)]
    pub to: Option<Date>,
    #[arg(long)]
    pub page: Option<u32>,
    #[arg(long)]
    pub limit: Option<u32>,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    pub title: String,
    #[arg(long)]
    pub category: PrepCategory,
    /// Due date, defaults to today
    #[arg(long, value_parser = parse_date_arg)]
    pub deadline: Option<Date>,
    #[arg(long)]
    pub difficulty: Option<Difficulty>,
    #[arg(long)]
    pub topic: Option<String>,
    #[arg(long)]
    pub source: Option<String>,
    #[arg(long)]
    pub url: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Make the entry recurring
    #[arg(long)]
    pub repeat: Option<RecurrenceFrequency>,
    /// Weekdays for weekly/custom recurrence, 0 = Sunday
    #[arg(long, value_delimiter = ',', value_parser = clap::value_parser!(u8).range(0..=6))]
    pub days: Vec<u8>,
    /// Last occurrence date of a recurring entry
    #[arg(long, value_parser = parse_date_arg, requires = "repeat")]
    pub until: Option<Date>,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub status: Option<EntryStatus>,
    #[arg(long)]
    pub category: Option<PrepCategory>,
    #[arg(long)]
    pub difficulty: Option<Difficulty>,
    #[arg(long)]
    pub topic: Option<String>,
    #[arg(long)]
    pub source: Option<String>,
    #[arg(long)]
    pub url: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
    #[arg(long)]
    pub solution: Option<String>,
    /// Replaces all tags
    #[arg(long = "tag")]
    pub tags: Option<Vec<String>>,
    #[arg(long, value_parser = parse_date_arg)]
    pub deadline: Option<Date>,
}

#[derive(Debug, Subcommand)]
pub enum PasskeysCommand {
    /// List registered passkeys
    List,
    /// Register a new passkey
    Add {
        #[arg(long)]
        name: Option<String>,
    },
    /// Rename a passkey
    Rename { id: String, name: String },
    /// Delete a passkey
    Delete { id: String },
    /// Turn passkey sign-in off for this account
    OptOut,
}

fn parse_date_arg(value: &str) -> Result<Date, String> {
    parse_date(value).map_err(|_| format!("expected YYYY-MM-DD, got `{}`", value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use time::macros::date;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_add_with_recurrence() {
        let cli = Cli::try_parse_from([
            "preptrack",
            "entries",
            "add",
            "Two Sum",
            "--category",
            "dsa",
            "--tag",
            "arrays",
            "--tag",
            "hashing",
            "--repeat",
            "weekly",
            "--days",
            "1,3",
            "--until",
            "2024-03-01",
        ])
        .unwrap();

        let Commands::Entries {
            command: EntriesCommand::Add(args),
        } = cli.command
        else {
            panic!("expected entries add");
        };
        assert_eq!(args.category, PrepCategory::Dsa);
        assert_eq!(args.tags, vec!["arrays", "hashing"]);
        assert_eq!(args.repeat, Some(RecurrenceFrequency::Weekly));
        assert_eq!(args.days, vec![1, 3]);
        assert_eq!(args.until, Some(date!(2024 - 03 - 01)));
    }

    #[test]
    fn rejects_bad_dates_and_weekdays() {
        assert!(Cli::try_parse_from(["preptrack", "history", "2024-13-01"]).is_err());
        assert!(Cli::try_parse_from([
            "preptrack", "entries", "add", "x", "--category", "dsa", "--days", "7"
        ])
        .is_err());
    }

    #[test]
    fn history_range_needs_both_ends() {
        assert!(Cli::try_parse_from(["preptrack", "history", "--from", "2024-01-01"]).is_err());
        let cli = Cli::try_parse_from([
            "preptrack",
            "history",
            "--from",
            "2024-01-01",
            "--to",
            "2024-01-07",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::History { date: None, from: Some(_), to: Some(_) }
        ));
    }

    #[test]
    fn status_accepts_snake_case_values() {
        let cli = Cli::try_parse_from(["preptrack", "status", "e1", "in_progress"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Status { status: EntryStatus::InProgress, .. }
        ));
    }
}
