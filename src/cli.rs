use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use domain::event::EventFilter;
use secrecy::SecretString;
use service::config::Config;

#[derive(Debug, Parser)]
#[command(name = "event_portal")]
#[command(author, version, about = "Event Portal command line client", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Load `.env` and parse the process arguments.
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Cli::parse()
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and remember the session for later commands
    Login(Credentials),
    /// End the current session
    Logout,
    /// Show who is logged in
    Whoami,
    /// Open a view by path (e.g. /dashboard, /event/7) and report where the guard lands
    Open { path: String },
    /// Create a new account
    SignUp(SignUpArgs),
    /// List events
    Events {
        /// Which events to show: upcoming, ongoing or completed
        #[arg(short, long, default_value = "upcoming")]
        filter: EventFilter,
    },
    /// Show one event with its registration figures
    Event { id: String },
    /// Create an event (organizers)
    CreateEvent(NewEventArgs),
    /// Change an event (organizers); omitted fields keep their current value
    EditEvent {
        id: String,
        #[command(flatten)]
        changes: EventChanges,
    },
    /// Delete an event (organizers)
    DeleteEvent { id: String },
    /// Register for an event (volunteers)
    RegisterEvent { id: String },
    /// Withdraw from an event (volunteers)
    UnregisterEvent { id: String },
    /// List the events you are registered for (volunteers)
    MyRegistrations,
    /// Show your profile
    Profile,
    /// Change your phone number and address
    UpdateProfile {
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
    /// Change your password; you are logged out afterwards
    ChangePassword(PasswordArgs),
}

#[derive(Debug, Args)]
pub struct Credentials {
    #[arg(short, long, env = "EVENT_PORTAL_EMAIL")]
    pub email: String,

    #[arg(short, long, env = "EVENT_PORTAL_PASSWORD", hide_env_values = true)]
    pub password: SecretString,
}

#[derive(Debug, Args)]
pub struct SignUpArgs {
    #[command(flatten)]
    pub credentials: Credentials,

    /// ORGANIZER or VOLUNTEER
    #[arg(short, long, default_value = "VOLUNTEER")]
    pub role: domain::Role,

    #[arg(long)]
    pub phone: String,

    #[arg(long)]
    pub address: String,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub city: Option<String>,
}

#[derive(Debug, Args)]
pub struct NewEventArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long, default_value = "")]
    pub description: String,

    /// First day, as YYYY-MM-DD
    #[arg(long)]
    pub start_date: NaiveDate,

    /// Last day, as YYYY-MM-DD
    #[arg(long)]
    pub end_date: NaiveDate,

    #[arg(long)]
    pub address: String,

    #[arg(long)]
    pub city: String,

    #[arg(long)]
    pub max_registrations: u32,

    /// Create the event with registration closed
    #[arg(long)]
    pub closed: bool,
}

#[derive(Debug, Args)]
pub struct EventChanges {
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    #[arg(long)]
    pub end_date: Option<NaiveDate>,

    #[arg(long)]
    pub address: Option<String>,

    #[arg(long)]
    pub city: Option<String>,

    #[arg(long)]
    pub max_registrations: Option<u32>,

    /// Open or close registration
    #[arg(long)]
    pub registration_allowed: Option<bool>,
}

#[derive(Debug, Args)]
pub struct PasswordArgs {
    #[arg(long, env = "EVENT_PORTAL_OLD_PASSWORD", hide_env_values = true)]
    pub old_password: SecretString,

    #[arg(long, env = "EVENT_PORTAL_NEW_PASSWORD", hide_env_values = true)]
    pub new_password: SecretString,

    #[arg(long, env = "EVENT_PORTAL_CONFIRM_PASSWORD", hide_env_values = true)]
    pub confirm_password: SecretString,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["event_portal"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_config_flags_precede_subcommand() {
        let cli = parse(&["--base-url", "http://portal:9000", "events", "-f", "ongoing"]);

        assert_eq!(cli.config.base_url(), "http://portal:9000");
        match cli.command {
            Command::Events { filter } => assert_eq!(filter, EventFilter::Ongoing),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_create_event_parses_dates() {
        let cli = parse(&[
            "create-event",
            "--name",
            "Cleanup",
            "--start-date",
            "2026-03-01",
            "--end-date",
            "2026-03-02",
            "--address",
            "Marina",
            "--city",
            "Chennai",
            "--max-registrations",
            "40",
        ]);

        match cli.command {
            Command::CreateEvent(args) => {
                assert_eq!(args.start_date, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
                assert!(!args.closed);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_bad_date_is_rejected() {
        let argv = [
            "event_portal",
            "edit-event",
            "7",
            "--end-date",
            "next week",
        ];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_sign_up_role_is_case_insensitive() {
        let cli = parse(&[
            "sign-up",
            "-e",
            "a@x.com",
            "-p",
            "pw",
            "--role",
            "organizer",
            "--phone",
            "555",
            "--address",
            "Main St",
        ]);

        match cli.command {
            Command::SignUp(args) => assert_eq!(args.role, domain::Role::Organizer),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
