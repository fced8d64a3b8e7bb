//! One handler per subcommand, each entered through the route guard like a page.

use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use log::*;

use domain::event::{self, EventFilter, EventId, NewEvent};
use domain::user::{self, PasswordChange, ProfileUpdate, SignUp};
use domain::{Client, Error, KeyValueStore, Role};
use portal_auth::guard::{NavigationTicket, Navigator, Route, RouteGuard};
use portal_auth::http::{HttpClientConfig, Transport};
use portal_auth::notify::Notifier;
use portal_auth::session::Store;
use portal_auth::storage::FileStore;
use service::config::Config;

use crate::cli::{Command, Credentials, EventChanges, NewEventArgs, PasswordArgs, SignUpArgs};
use crate::output;

/// A failure the user has already been shown through the notifier.
#[derive(Debug)]
pub struct Reported;

impl fmt::Display for Reported {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "failure already reported")
    }
}

impl std::error::Error for Reported {}

pub struct App<S: KeyValueStore + 'static> {
    store: Arc<Store<S>>,
    navigator: Navigator<S>,
    client: Client<S>,
    notifier: Arc<dyn Notifier>,
    today: NaiveDate,
}

impl App<FileStore> {
    /// Build the client stack from configuration and restore the persisted session.
    pub async fn start(config: &Config, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let http = HttpClientConfig {
            timeout: config.request_timeout(),
            max_retries: config.max_retries,
            ..HttpClientConfig::default()
        };
        let transport = Transport::with_auth_header(config.base_url(), config.auth_header(), http)
            .with_context(|| format!("Failed to set up the API client for {}", config.base_url()))?;

        let storage = FileStore::new(config.session_file());
        Ok(Self::with_store(storage, transport, notifier).await)
    }
}

impl<S: KeyValueStore + 'static> App<S> {
    pub async fn with_store(storage: S, transport: Transport, notifier: Arc<dyn Notifier>) -> Self {
        let store = Arc::new(Store::new(storage, transport).with_notifier(notifier.clone()));
        store.initialize().await;

        Self {
            navigator: Navigator::new(RouteGuard::new(store.clone())),
            client: Client::new(store.clone()),
            store,
            notifier,
            today: Local::now().date_naive(),
        }
    }

    pub async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Login(credentials) => self.login(credentials).await,
            Command::Logout => {
                self.store.logout().await;
                Ok(())
            }
            Command::Whoami => {
                output::print_session(self.store.current().as_ref());
                Ok(())
            }
            Command::Open { path } => self.open(&path).await,
            Command::SignUp(args) => self.sign_up(args).await,
            Command::Events { filter } => self.events(filter).await,
            Command::Event { id } => self.event_details(EventId::new(id)).await,
            Command::CreateEvent(args) => self.create_event(args).await,
            Command::EditEvent { id, changes } => self.edit_event(EventId::new(id), changes).await,
            Command::DeleteEvent { id } => self.delete_event(EventId::new(id)).await,
            Command::RegisterEvent { id } => self.register(EventId::new(id)).await,
            Command::UnregisterEvent { id } => self.unregister(EventId::new(id)).await,
            Command::MyRegistrations => self.my_registrations().await,
            Command::Profile => self.profile().await,
            Command::UpdateProfile { phone, address } => self.update_profile(phone, address).await,
            Command::ChangePassword(args) => self.change_password(args).await,
        }
    }

    /// Navigate to `route`, stopping here if the guard sends the user to log in.
    async fn enter(&self, route: Route) -> Result<NavigationTicket> {
        let navigation = self.navigator.navigate(route).await;

        if navigation.was_redirected() {
            output::print_redirect(&navigation.requested.path(), &navigation.landed.path());
            if navigation.landed == Route::Login {
                self.notifier.error("Please log in to continue");
                return Err(Reported.into());
            }
        }
        Ok(navigation.ticket)
    }

    /// Show a failed request to the user.
    ///
    /// A rejected session has already been announced by the store; the current view
    /// is then left for the login page instead of showing the request's own error.
    async fn fail(&self, err: Error, fallback: &str) -> anyhow::Error {
        debug!("Request failed: {}", err);

        if err.is_authentication() {
            if let Some(navigation) = self.navigator.revalidate().await {
                output::print_redirect(&navigation.requested.path(), &navigation.landed.path());
                return Reported.into();
            }
        }

        self.notifier.error(&err.reason_or(fallback));
        Reported.into()
    }

    fn refuse(&self, message: &str) -> anyhow::Error {
        self.notifier.error(message);
        Reported.into()
    }

    fn is_volunteer(&self) -> bool {
        self.store
            .current()
            .is_some_and(|session| session.role == Role::Volunteer)
    }

    async fn login(&self, credentials: Credentials) -> Result<()> {
        self.enter(Route::Login).await?;

        // The store reports the outcome itself.
        let session = self
            .store
            .login(&credentials.email, &credentials.password)
            .await
            .map_err(|_| Reported)?;

        self.navigator.navigate(Route::Dashboard).await;
        output::print_session(Some(&session));
        Ok(())
    }

    async fn open(&self, path: &str) -> Result<()> {
        let route: Route = path.parse()?;
        let navigation = self.navigator.navigate(route).await;

        if navigation.was_redirected() {
            output::print_redirect(&navigation.requested.path(), &navigation.landed.path());
        } else {
            println!("Showing {}", navigation.landed);
        }
        Ok(())
    }

    async fn sign_up(&self, args: SignUpArgs) -> Result<()> {
        self.enter(Route::Register).await?;

        let form = SignUp {
            email_id: args.credentials.email,
            password: args.credentials.password,
            role: args.role,
            phone: args.phone,
            address: args.address,
            name: args.name,
            city: args.city,
        };
        match user::sign_up(&self.client, &form).await {
            Ok(()) => {
                self.notifier.success("Registration Successful! Please Login.");
                Ok(())
            }
            Err(err) => Err(self.fail(err, "Registration Failed").await),
        }
    }

    async fn events(&self, filter: EventFilter) -> Result<()> {
        let ticket = self.enter(Route::Dashboard).await?;

        let events = match event::list(&self.client, filter).await {
            Ok(events) => events,
            Err(err) => return Err(self.fail(err, "Failed to load events").await),
        };

        let registered = if self.is_volunteer() {
            match event::my_registrations(&self.client).await {
                Ok(ids) => Some(ids),
                Err(err) => {
                    warn!("Failed to fetch registrations: {}", err);
                    None
                }
            }
        } else {
            None
        };

        if let Some((events, registered)) = ticket.accept((events, registered)) {
            output::print_event_list(&events, registered.as_deref(), self.today);
        }
        Ok(())
    }

    async fn event_details(&self, id: EventId) -> Result<()> {
        let ticket = self.enter(Route::EventDetails(id.to_string())).await?;

        let loaded = tokio::try_join!(
            event::find_by_id(&self.client, &id),
            event::analytics(&self.client, &id)
        );
        let (details, analytics) = match loaded {
            Ok(loaded) => loaded,
            Err(err) => return Err(self.fail(err, "Failed to load details").await),
        };

        let registered = if self.is_volunteer() {
            match event::my_registrations(&self.client).await {
                Ok(ids) => Some(ids.contains(&id)),
                Err(err) => return Err(self.fail(err, "Failed to load details").await),
            }
        } else {
            None
        };

        let Some((details, analytics, registered)) = ticket.accept((details, analytics, registered))
        else {
            return Ok(());
        };
        output::print_event_details(&details, self.today);
        output::print_analytics(&analytics);
        match registered {
            Some(true) => println!("\nYou are registered for this event"),
            Some(false) => println!("\nYou are not registered for this event"),
            None => {}
        }
        Ok(())
    }

    async fn create_event(&self, args: NewEventArgs) -> Result<()> {
        self.enter(Route::CreateEvent).await?;

        let draft = NewEvent {
            name: args.name,
            description: args.description,
            start_date: args.start_date,
            end_date: args.end_date,
            address: args.address,
            city: args.city,
            maximum_allowed_registrations: args.max_registrations,
            registration_allowed: !args.closed,
        };
        match event::create(&self.client, &draft).await {
            Ok(()) => {
                self.notifier.success("Event Created Successfully!");
                Ok(())
            }
            Err(err) => Err(self.fail(err, "Failed to create event").await),
        }
    }

    async fn edit_event(&self, id: EventId, changes: EventChanges) -> Result<()> {
        self.enter(Route::EditEvent(id.to_string())).await?;

        let current = match event::find_by_id(&self.client, &id).await {
            Ok(current) => current,
            Err(err) => return Err(self.fail(err, "Failed to load event details").await),
        };
        if current.has_ended(self.today) {
            return Err(self.refuse("This event has ended. You cannot edit it."));
        }

        let draft = apply_changes(current.to_draft(), changes);
        match event::update(&self.client, &id, &draft).await {
            Ok(()) => {
                self.notifier.success("Event Updated Successfully!");
                Ok(())
            }
            Err(err) => Err(self.fail(err, "Failed to update event").await),
        }
    }

    async fn delete_event(&self, id: EventId) -> Result<()> {
        self.enter(Route::Dashboard).await?;

        let current = match event::find_by_id(&self.client, &id).await {
            Ok(current) => current,
            Err(err) => return Err(self.fail(err, "Delete failed").await),
        };
        if current.has_ended(self.today) {
            return Err(self.refuse("This event has ended and can no longer be deleted."));
        }

        match event::delete(&self.client, &id).await {
            Ok(()) => {
                self.notifier.success("Event Deleted");
                Ok(())
            }
            Err(err) => Err(self.fail(err, "Delete failed").await),
        }
    }

    async fn register(&self, id: EventId) -> Result<()> {
        self.enter(Route::EventDetails(id.to_string())).await?;

        let current = match event::find_by_id(&self.client, &id).await {
            Ok(current) => current,
            Err(err) => return Err(self.fail(err, "Registration Failed").await),
        };
        if current.has_ended(self.today) {
            return Err(self.refuse("Event Ended"));
        }
        if !current.registration_allowed {
            return Err(self.refuse("Registration Closed"));
        }

        match event::register(&self.client, &id).await {
            Ok(()) => {
                self.notifier.success("Registered Successfully!");
                Ok(())
            }
            Err(err) => Err(self.fail(err, "Registration Failed").await),
        }
    }

    async fn unregister(&self, id: EventId) -> Result<()> {
        self.enter(Route::EventDetails(id.to_string())).await?;

        let current = match event::find_by_id(&self.client, &id).await {
            Ok(current) => current,
            Err(err) => return Err(self.fail(err, "Unregistration Failed").await),
        };
        if current.has_ended(self.today) {
            return Err(self.refuse("Event Ended"));
        }

        match event::unregister(&self.client, &id).await {
            Ok(()) => {
                self.notifier.success("Unregistered Successfully!");
                Ok(())
            }
            Err(err) => Err(self.fail(err, "Unregistration Failed").await),
        }
    }

    async fn my_registrations(&self) -> Result<()> {
        let ticket = self.enter(Route::Dashboard).await?;

        let ids = match event::my_registrations(&self.client).await {
            Ok(ids) => ids,
            Err(err) => return Err(self.fail(err, "Failed to fetch registrations").await),
        };

        if let Some(ids) = ticket.accept(ids) {
            if ids.is_empty() {
                println!("You are not registered for any events");
            }
            for id in ids {
                println!("#{}", id);
            }
        }
        Ok(())
    }

    async fn profile(&self) -> Result<()> {
        let ticket = self.enter(Route::Profile).await?;

        match user::profile(&self.client).await {
            Ok(profile) => {
                if let Some(profile) = ticket.accept(profile) {
                    output::print_profile(&profile);
                }
                Ok(())
            }
            Err(err) => Err(self.fail(err, "Failed to load profile.").await),
        }
    }

    async fn update_profile(&self, phone: Option<String>, address: Option<String>) -> Result<()> {
        self.enter(Route::Profile).await?;

        // Fields left out keep their current value, as in a pre-filled form.
        let update = match (phone, address) {
            (Some(phone), Some(address)) => ProfileUpdate { phone, address },
            (phone, address) => {
                let current = match user::profile(&self.client).await {
                    Ok(current) => current,
                    Err(err) => return Err(self.fail(err, "Failed to load profile.").await),
                };
                ProfileUpdate {
                    phone: phone.or(current.phone).unwrap_or_default(),
                    address: address.or(current.address).unwrap_or_default(),
                }
            }
        };

        match user::update_profile(&self.client, &update).await {
            Ok(()) => {
                self.notifier.success("Profile Updated!");
                Ok(())
            }
            Err(err) => Err(self.fail(err, "Update Failed.").await),
        }
    }

    async fn change_password(&self, args: PasswordArgs) -> Result<()> {
        self.enter(Route::ResetPassword).await?;

        let change = PasswordChange {
            old_password: args.old_password,
            new_password: args.new_password,
            confirm_password: args.confirm_password,
        };
        match user::change_password(&self.client, &change).await {
            Ok(()) => {
                self.notifier
                    .success("Password reset successfully! Please login again.");
                self.store.logout().await;
                Ok(())
            }
            Err(err) => Err(self.fail(err, "Password reset failed").await),
        }
    }
}

fn apply_changes(mut draft: NewEvent, changes: EventChanges) -> NewEvent {
    if let Some(name) = changes.name {
        draft.name = name;
    }
    if let Some(description) = changes.description {
        draft.description = description;
    }
    if let Some(start_date) = changes.start_date {
        draft.start_date = start_date;
    }
    if let Some(end_date) = changes.end_date {
        draft.end_date = end_date;
    }
    if let Some(address) = changes.address {
        draft.address = address;
    }
    if let Some(city) = changes.city {
        draft.city = city;
    }
    if let Some(max) = changes.max_registrations {
        draft.maximum_allowed_registrations = max;
    }
    if let Some(allowed) = changes.registration_allowed {
        draft.registration_allowed = allowed;
    }
    draft
}
