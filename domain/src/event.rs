//! Events: listing, details, analytics, organizer management and volunteer registration.

use std::fmt;

use chrono::NaiveDate;
use log::*;
use reqwest::Method;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;

use portal_auth::{
    api::Client,
    capability::Action,
    error::{api_error, ApiErrorKind, Error},
    storage::KeyValueStore,
};

/// Identifier the backend assigns to an event.
///
/// Some backend responses carry it as a JSON number, others as a string; both
/// decode to the same id so membership checks against `my_registrations` agree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl<'de> Deserialize<'de> for EventId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(id) => EventId(id),
            Raw::Number(id) => EventId(id.to_string()),
        })
    }
}

/// An event as the backend returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_id: EventId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub maximum_allowed_registrations: u32,
    #[serde(default)]
    pub registration_allowed: bool,
}

impl Event {
    /// An event has ended once its last day is before `today`.
    pub fn has_ended(&self, today: NaiveDate) -> bool {
        self.end_date < today
    }

    /// Volunteers may sign up while the organizer allows it and the event has not ended.
    pub fn is_open_for_registration(&self, today: NaiveDate) -> bool {
        self.registration_allowed && !self.has_ended(today)
    }

    /// Where `today` falls relative to the event's dates.
    pub fn phase(&self, today: NaiveDate) -> EventFilter {
        if today < self.start_date {
            EventFilter::Upcoming
        } else if self.has_ended(today) {
            EventFilter::Completed
        } else {
            EventFilter::Ongoing
        }
    }

    /// The editable fields of this event, e.g. to pre-fill an edit form.
    pub fn to_draft(&self) -> NewEvent {
        NewEvent {
            name: self.name.clone(),
            description: self.description.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
            address: self.address.clone(),
            city: self.city.clone(),
            maximum_allowed_registrations: self.maximum_allowed_registrations,
            registration_allowed: self.registration_allowed,
        }
    }
}

/// Body for creating or updating an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub name: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub address: String,
    pub city: String,
    pub maximum_allowed_registrations: u32,
    pub registration_allowed: bool,
}

impl NewEvent {
    /// Checks the form rules before anything is sent.
    pub fn validate(&self) -> Result<(), Error> {
        for (field, value) in [
            ("Name", &self.name),
            ("City", &self.city),
            ("Address", &self.address),
        ] {
            if value.trim().is_empty() {
                return Err(api_error(
                    ApiErrorKind::Validation,
                    &format!("{field} is required"),
                ));
            }
        }
        if self.end_date < self.start_date {
            return Err(api_error(
                ApiErrorKind::Validation,
                "End date cannot be before the start date",
            ));
        }
        Ok(())
    }
}

/// Which events `list` returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EventFilter {
    #[default]
    Upcoming,
    Ongoing,
    Completed,
}

impl EventFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventFilter::Upcoming => "upcoming",
            EventFilter::Ongoing => "ongoing",
            EventFilter::Completed => "completed",
        }
    }
}

impl fmt::Display for EventFilter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "upcoming" => Ok(EventFilter::Upcoming),
            "ongoing" => Ok(EventFilter::Ongoing),
            "completed" => Ok(EventFilter::Completed),
            other => Err(api_error(
                ApiErrorKind::Validation,
                &format!("Unknown event filter: {other}"),
            )),
        }
    }
}

/// Registration figures for one event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventAnalytics {
    pub total_registrations: u32,
    pub max_capacity: u32,
    #[serde(default)]
    pub daily_stats: Vec<DailyStats>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    /// New registrations on this day.
    pub count: u64,
    /// Registrations up to and including this day.
    pub cumulative: u64,
}

impl EventAnalytics {
    pub fn remaining_seats(&self) -> u32 {
        self.max_capacity.saturating_sub(self.total_registrations)
    }

    /// Share of capacity taken, in `0.0..=1.0`. An event without capacity reads as full.
    pub fn fill_ratio(&self) -> f64 {
        if self.max_capacity == 0 {
            return 1.0;
        }
        (self.total_registrations as f64 / self.max_capacity as f64).min(1.0)
    }
}

pub async fn list<S: KeyValueStore>(
    client: &Client<S>,
    filter: EventFilter,
) -> Result<Vec<Event>, Error> {
    debug!("Listing {} events", filter);
    client
        .send(
            Action::ListEvents,
            Method::GET,
            &format!("/event/list?type={}", filter.as_str()),
            None,
        )
        .await
}

pub async fn find_by_id<S: KeyValueStore>(client: &Client<S>, id: &EventId) -> Result<Event, Error> {
    client
        .send(Action::ViewEvent, Method::GET, &event_path(id, ""), None)
        .await
}

pub async fn analytics<S: KeyValueStore>(
    client: &Client<S>,
    id: &EventId,
) -> Result<EventAnalytics, Error> {
    client
        .send(
            Action::ViewAnalytics,
            Method::GET,
            &event_path(id, "/analytics"),
            None,
        )
        .await
}

/// Create an event. Organizers only.
pub async fn create<S: KeyValueStore>(client: &Client<S>, event: &NewEvent) -> Result<(), Error> {
    event.validate()?;
    let body = serde_json::to_value(event)?;
    client
        .execute(Action::CreateEvent, Method::POST, "/event/create", Some(&body))
        .await?;
    info!("Created event {}", event.name);
    Ok(())
}

/// Replace the editable fields of an event. Organizers only.
pub async fn update<S: KeyValueStore>(
    client: &Client<S>,
    id: &EventId,
    event: &NewEvent,
) -> Result<(), Error> {
    event.validate()?;
    let body = serde_json::to_value(event)?;
    client
        .execute(
            Action::UpdateEvent,
            Method::PUT,
            &format!("/event/update?eventId={}", urlencoding::encode(id.as_str())),
            Some(&body),
        )
        .await?;
    info!("Updated event {}", id);
    Ok(())
}

/// Delete an event. Organizers only.
pub async fn delete<S: KeyValueStore>(client: &Client<S>, id: &EventId) -> Result<(), Error> {
    client
        .execute(
            Action::DeleteEvent,
            Method::DELETE,
            &format!("/event/delete?eventId={}", urlencoding::encode(id.as_str())),
            None,
        )
        .await?;
    info!("Deleted event {}", id);
    Ok(())
}

/// Sign the logged-in volunteer up for an event.
pub async fn register<S: KeyValueStore>(client: &Client<S>, id: &EventId) -> Result<(), Error> {
    registration(client, Action::RegisterForEvent, "/event/register", id).await
}

/// Withdraw the logged-in volunteer from an event.
pub async fn unregister<S: KeyValueStore>(client: &Client<S>, id: &EventId) -> Result<(), Error> {
    registration(client, Action::UnregisterFromEvent, "/event/unregister", id).await
}

/// Ids of the events the logged-in volunteer is registered for.
pub async fn my_registrations<S: KeyValueStore>(client: &Client<S>) -> Result<Vec<EventId>, Error> {
    client
        .send(
            Action::ListMyRegistrations,
            Method::GET,
            "/event/my-registrations",
            None,
        )
        .await
}

async fn registration<S: KeyValueStore>(
    client: &Client<S>,
    action: Action,
    path: &str,
    id: &EventId,
) -> Result<(), Error> {
    // An empty identity lets the client refuse the request with its usual reason.
    let email_id = client
        .session()
        .map(|session| session.identity)
        .unwrap_or_default();
    let body = json!({ "eventId": id, "emailId": email_id });

    client.execute(action, Method::POST, path, Some(&body)).await?;
    info!("{} succeeded for event {}", path, id);
    Ok(())
}

fn event_path(id: &EventId, suffix: &str) -> String {
    format!("/event/{}{}", urlencoding::encode(id.as_str()), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_auth::error::ErrorKind;
    use portal_auth::http::{HttpClientConfig, Transport};
    use portal_auth::session::{Store, TOKEN_KEY, USER_KEY};
    use portal_auth::storage::MemoryStore;
    use mockito::{Matcher, Server};
    use std::sync::Arc;

    async fn client_as(url: &str, role: &str) -> Client<MemoryStore> {
        let storage = MemoryStore::with_entries([
            (TOKEN_KEY.to_string(), "t1".to_string()),
            (
                USER_KEY.to_string(),
                format!(r#"{{"emailId":"a@x.com","role":"{role}"}}"#),
            ),
        ]);
        let config = HttpClientConfig {
            max_retries: 0,
            ..HttpClientConfig::default()
        };
        let store = Arc::new(Store::new(storage, Transport::new(url, config).unwrap()));
        store.initialize().await;
        Client::new(store)
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn draft() -> NewEvent {
        NewEvent {
            name: "Beach cleanup".to_string(),
            description: "Bring gloves".to_string(),
            start_date: date("2026-03-01"),
            end_date: date("2026-03-02"),
            address: "Marina".to_string(),
            city: "Chennai".to_string(),
            maximum_allowed_registrations: 50,
            registration_allowed: true,
        }
    }

    const EVENT_JSON: &str = r#"{
        "eventId": 7,
        "name": "Beach cleanup",
        "description": "Bring gloves",
        "startDate": "2026-03-01",
        "endDate": "2026-03-02",
        "address": "Marina",
        "city": "Chennai",
        "maximumAllowedRegistrations": 50,
        "registrationAllowed": true
    }"#;

    #[test]
    fn test_event_id_accepts_numbers_and_strings() {
        let ids: Vec<EventId> = serde_json::from_str(r#"[7, "7", "abc"]"#).unwrap();
        assert_eq!(ids[0], ids[1]);
        assert_eq!(ids[2].as_str(), "abc");
    }

    #[test]
    fn test_event_dates_drive_phase_and_registration() {
        let event: Event = serde_json::from_str(EVENT_JSON).unwrap();

        assert_eq!(event.phase(date("2026-02-28")), EventFilter::Upcoming);
        assert_eq!(event.phase(date("2026-03-02")), EventFilter::Ongoing);
        assert_eq!(event.phase(date("2026-03-03")), EventFilter::Completed);

        assert!(event.is_open_for_registration(date("2026-03-02")));
        assert!(!event.is_open_for_registration(date("2026-03-03")));

        let closed = Event {
            registration_allowed: false,
            ..event
        };
        assert!(!closed.is_open_for_registration(date("2026-02-01")));
    }

    #[test]
    fn test_validate_rejects_bad_drafts() {
        assert!(draft().validate().is_ok());

        let err = NewEvent {
            name: "  ".to_string(),
            ..draft()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.reason(), "Name is required");

        let err = NewEvent {
            end_date: date("2026-02-01"),
            ..draft()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::Api(ApiErrorKind::Validation));
    }

    #[test]
    fn test_analytics_helpers() {
        let analytics: EventAnalytics = serde_json::from_str(
            r#"{"totalRegistrations":30,"maxCapacity":40,"dailyStats":[
                {"date":"2026-02-01","count":10,"cumulative":10},
                {"date":"2026-02-02","count":20,"cumulative":30}]}"#,
        )
        .unwrap();

        assert_eq!(analytics.remaining_seats(), 10);
        assert!((analytics.fill_ratio() - 0.75).abs() < f64::EPSILON);
        assert_eq!(analytics.daily_stats[1].cumulative, 30);

        let overbooked = EventAnalytics {
            total_registrations: 45,
            ..analytics
        };
        assert_eq!(overbooked.remaining_seats(), 0);
        assert_eq!(overbooked.fill_ratio(), 1.0);
    }

    #[test]
    fn test_filter_parses_case_insensitively() {
        assert_eq!("Ongoing".parse::<EventFilter>().unwrap(), EventFilter::Ongoing);
        assert!("past".parse::<EventFilter>().is_err());
    }

    #[tokio::test]
    async fn test_list_sends_filter() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/event/list")
            .match_query(Matcher::UrlEncoded("type".into(), "completed".into()))
            .match_header("x-auth-token", "t1")
            .with_status(200)
            .with_body(format!("[{EVENT_JSON}]"))
            .create_async()
            .await;
        let client = client_as(&server.url(), "VOLUNTEER").await;

        let events = list(&client, EventFilter::Completed).await.unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_id, EventId::from("7"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_find_by_id_maps_missing_event() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/event/99")
            .with_status(404)
            .with_body(r#"{"message":"Event not found"}"#)
            .create_async()
            .await;
        let client = client_as(&server.url(), "VOLUNTEER").await;

        let err = find_by_id(&client, &EventId::from("99")).await.unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::Api(ApiErrorKind::NotFound));
        assert_eq!(err.reason(), "Event not found");
    }

    #[tokio::test]
    async fn test_register_sends_session_identity() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/event/register")
            .match_body(Matcher::Json(
                json!({ "eventId": "7", "emailId": "a@x.com" }),
            ))
            .with_status(200)
            .create_async()
            .await;
        let client = client_as(&server.url(), "VOLUNTEER").await;

        register(&client, &EventId::from("7")).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_my_registrations_decodes_ids() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/event/my-registrations")
            .with_status(200)
            .with_body("[3, 7]")
            .create_async()
            .await;
        let client = client_as(&server.url(), "VOLUNTEER").await;

        let ids = my_registrations(&client).await.unwrap();

        assert!(ids.contains(&EventId::from("7")));
    }

    #[tokio::test]
    async fn test_update_puts_draft_with_event_id_query() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/event/update")
            .match_query(Matcher::UrlEncoded("eventId".into(), "7".into()))
            .match_body(Matcher::PartialJson(json!({
                "name": "Beach cleanup",
                "startDate": "2026-03-01",
                "maximumAllowedRegistrations": 50
            })))
            .with_status(200)
            .create_async()
            .await;
        let client = client_as(&server.url(), "ORGANIZER").await;

        update(&client, &EventId::from("7"), &draft()).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_organizer_actions_are_refused_for_volunteers() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/event/create")
            .expect(0)
            .create_async()
            .await;
        let client = client_as(&server.url(), "VOLUNTEER").await;

        let err = create(&client, &draft()).await.unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::Api(ApiErrorKind::Authorization));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalid_draft_is_not_sent() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/event/create")
            .expect(0)
            .create_async()
            .await;
        let client = client_as(&server.url(), "ORGANIZER").await;
        let bad = NewEvent {
            city: String::new(),
            ..draft()
        };

        let err = create(&client, &bad).await.unwrap_err();

        assert_eq!(err.reason(), "City is required");
        mock.assert_async().await;
    }
}
