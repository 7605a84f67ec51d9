use clap::{Parser, Subcommand};

/// FitTrack: activity notifications and daily reminders
#[derive(Parser)]
#[command(name = "fittrack", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server and the daily reminder scheduler
    Serve {
        /// Port to bind (defaults to FITTRACK_PORT)
        #[arg(short, long)]
        port: Option<u16>,
        /// Do not start the reminder scheduler in this process
        #[arg(long)]
        no_reminders: bool,
    },

    /// Run the daily reminder job
    Reminders {
        #[command(subcommand)]
        command: ReminderCommands,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Inspect notifications
    Notifications {
        #[command(subcommand)]
        command: NotificationCommands,
    },
}

#[derive(Subcommand)]
pub enum ReminderCommands {
    /// Run one reminder pass now (safe to repeat on the same day)
    Run,
    /// Show when the scheduler fires next
    Next,
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a user with default preferences
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Start with notifications disabled
        #[arg(long)]
        no_notifications: bool,
    },
}

#[derive(Subcommand)]
pub enum NotificationCommands {
    /// List a user's notifications, newest first
    List {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        limit: Option<i64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["fittrack", "serve", "--port", "8080", "--no-reminders"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Serve { port: Some(8080), no_reminders: true })
        ));

        let cli = Cli::try_parse_from(["fittrack", "reminders", "next"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Reminders { command: ReminderCommands::Next })
        ));

        let cli = Cli::try_parse_from([
            "fittrack", "notifications", "list", "--user-id", "abc", "--limit", "5",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Notifications { command: NotificationCommands::List { user_id, limit } }) => {
                assert_eq!(user_id, "abc");
                assert_eq!(limit, Some(5));
            }
            _ => panic!("expected notifications list"),
        }
    }

    #[test]
    fn test_help_is_a_display_request() {
        let err = Cli::try_parse_from(["fittrack", "--help"]).err().unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
