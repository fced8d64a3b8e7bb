use chrono::NaiveDate;
use colored::*;
use domain::capability::{self, Action};
use domain::event::{Event, EventAnalytics, EventId};
use domain::user::Profile;
use domain::Session;
use portal_auth::notify::Notifier;

/// Shows notifications on the terminal, the way toasts appear in a browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn success(&self, message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red(), message.red());
    }
}

pub fn print_session(session: Option<&Session>) {
    match session {
        Some(session) => println!(
            "Logged in as {} ({})",
            session.identity.bold(),
            session.role.to_string().cyan()
        ),
        None => println!("{}", "Not logged in".dimmed()),
    }

    let allowed: Vec<&str> = capability::allowed_actions(session.map(|s| s.role))
        .map(Action::as_str)
        .collect();
    println!("   You can: {}", allowed.join(", ").dimmed());
}

pub fn print_redirect(requested: &str, landed: &str) {
    println!("{} {} redirected to {}", "→".blue(), requested, landed.bold());
}

/// One line per event, with the state a volunteer cares about.
pub fn print_event_list(events: &[Event], registered: Option<&[EventId]>, today: NaiveDate) {
    if events.is_empty() {
        println!("{}", "No events found".dimmed());
        return;
    }

    for event in events {
        let status = if event.has_ended(today) {
            "ENDED".dimmed()
        } else if event.registration_allowed {
            "OPEN".green()
        } else {
            "CLOSED".red()
        };
        let mark = match registered {
            Some(ids) if ids.contains(&event.event_id) => " [registered]".yellow(),
            _ => "".normal(),
        };

        println!(
            "#{:<6} {:<8} {} ({} → {}, {}){}",
            event.event_id,
            status,
            event.name.bold(),
            event.start_date,
            event.end_date,
            event.city,
            mark
        );
    }
}

pub fn print_event_details(event: &Event, today: NaiveDate) {
    println!("{}", event.name.bright_white().bold());
    println!("   ID:      #{}", event.event_id);
    println!("   Dates:   {} → {}", event.start_date, event.end_date);
    println!("   Where:   {}, {}", event.address, event.city);
    println!("   Phase:   {}", event.phase(today));
    let registration = if event.is_open_for_registration(today) {
        "OPEN FOR REGISTRATION".green()
    } else {
        "CLOSED".red()
    };
    println!("   Status:  {}", registration);
    if !event.description.is_empty() {
        println!("\n   {}", event.description.dimmed());
    }
}

pub fn print_analytics(analytics: &EventAnalytics) {
    println!("\n{}", "Registrations".bold());
    println!(
        "   {} of {} seats taken ({:.0}%), {} left",
        analytics.total_registrations.to_string().green(),
        analytics.max_capacity,
        analytics.fill_ratio() * 100.0,
        analytics.remaining_seats()
    );
    for day in &analytics.daily_stats {
        println!(
            "   {}  +{:<4} total {}",
            day.date,
            day.count,
            day.cumulative.to_string().dimmed()
        );
    }
}

pub fn print_profile(profile: &Profile) {
    let field = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    println!("{}", profile.email_id.bright_white().bold());
    if let Some(role) = profile.role {
        println!("   Role:    {}", role.to_string().cyan());
    }
    println!("   Name:    {}", field(&profile.name));
    println!("   Phone:   {}", field(&profile.phone));
    println!("   Address: {}", field(&profile.address));
    println!("   City:    {}", field(&profile.city));
}
