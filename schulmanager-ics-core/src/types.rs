use std::{fmt, sync::Arc};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize, Serializer};

use crate::{Error, Result};

/// Class period with its time-of-day boundaries in minutes since midnight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    pub id: i64,
    pub start_minutes: u32,
    pub end_minutes: u32,
}

impl Period {
    pub fn new(id: i64, start_minutes: u32, end_minutes: u32) -> Result<Self> {
        if start_minutes > end_minutes {
            return Err(Error::Validation(format!(
                "period {id} starts after it ends ({start_minutes} > {end_minutes})"
            )));
        }
        Ok(Self {
            id,
            start_minutes,
            end_minutes,
        })
    }
}

/// Teacher
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Person {
    pub first_name: String,
    pub last_name: String,
}

impl Person {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    /// Absent when upstream only sends a label
    pub id: Option<i64>,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: i64,
    pub name: String,
}

/// Shared, ordered list of teachers.
///
/// Two lists count as "the same" only when they are the same allocation, so
/// cloning a `TeacherList` keeps identity while building an equal list from
/// scratch does not.
#[derive(Debug, Clone)]
pub struct TeacherList(Arc<[Person]>);

impl TeacherList {
    pub fn new(teachers: Vec<Person>) -> Self {
        Self(teachers.into())
    }

    pub fn same_list(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn first(&self) -> Option<&Person> {
        self.0.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Person> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for TeacherList {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

/// One concrete scheduled occurrence of a lesson
#[derive(Debug, Clone, Default)]
pub struct LessonVariant {
    pub subject: Option<Subject>,
    pub room: Option<Room>,
    pub teachers: Option<TeacherList>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonKind {
    Regular,
    Changed,
    Cancelled,
}

/// A lesson as delivered by the schedule provider
#[derive(Debug, Clone)]
pub struct LessonRecord {
    pub kind: LessonKind,
    pub date: NaiveDate,
    pub period_id: i64,
    /// Absent for cancelled lessons.
    pub actual: Option<LessonVariant>,
    /// What would have happened without the change; empty for regular lessons.
    pub originals: Vec<LessonVariant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Private,
    Confidential,
}

impl Classification {
    pub const fn as_ics(self) -> &'static str {
        match self {
            Self::Private => "PRIVATE",
            Self::Confidential => "CONFIDENTIAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Confirmed,
    Tentative,
    Cancelled,
}

impl EventStatus {
    pub const fn as_ics(self) -> &'static str {
        match self {
            Self::Confirmed => "CONFIRMED",
            Self::Tentative => "TENTATIVE",
            Self::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendeeRole {
    /// Teacher actually holding the lesson
    Primary,
    /// Teacher who would normally hold the lesson
    Secondary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attendee {
    pub name: String,
    pub role: AttendeeRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contact {
    pub name: String,
}

/// Fully specified calendar event for one lesson
#[derive(Debug, Clone, Serialize)]
pub struct EventDescriptor {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub classification: Classification,
    pub title: String,
    pub organizer: Option<Contact>,
    pub attendees: Vec<Attendee>,
    pub location: String,
    pub category: String,
    pub status: EventStatus,
}

/// Login credentials
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Upstream session obtained by logging in
#[derive(Clone)]
pub struct Session {
    pub token: String,
    /// Student linked to the account, if any.
    pub student_id: Option<i64>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("student_id", &self.student_id)
            .finish()
    }
}

/// Upstream API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the Schulmanager instance
    pub base_url: String,
    /// Frontend bundle version sent along with every API call
    pub bundle_version: String,
    /// Request timeout in seconds
    pub timeout: u64,
}

impl ProviderConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://login.schulmanager-online.de";
    pub const DEFAULT_BUNDLE_VERSION: &'static str = "823ec1610e";
    pub const DEFAULT_TIMEOUT: u64 = 30;

    /// Reads `SCHULMANAGER_BASE_URL`, `SCHULMANAGER_BUNDLE_VERSION` and
    /// `SCHULMANAGER_TIMEOUT_SECS`, falling back to the defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(base_url) = env_non_empty("SCHULMANAGER_BASE_URL") {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(bundle_version) = env_non_empty("SCHULMANAGER_BUNDLE_VERSION") {
            config.bundle_version = bundle_version;
        }
        if let Some(timeout) = env_non_empty("SCHULMANAGER_TIMEOUT_SECS") {
            config.timeout = timeout.parse().map_err(|_| {
                Error::Config(format!("SCHULMANAGER_TIMEOUT_SECS is not a number: {timeout}"))
            })?;
        }
        Ok(config)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            bundle_version: Self::DEFAULT_BUNDLE_VERSION.to_string(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

/// ICS generation options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IcsOptions {
    pub calendar_name: Option<String>,
    /// Written as `X-WR-TIMEZONE`; event times stay floating
    pub timezone: Option<String>,
    pub reminder_minutes: Option<u32>,
}

impl IcsOptions {
    /// Overrides the defaults with `CALENDAR_NAME`, `CALENDAR_TIMEZONE` and
    /// `CALENDAR_REMINDER_MINUTES` when set.
    pub fn from_env() -> Result<Self> {
        let mut options = Self::default();
        if let Some(name) = env_non_empty("CALENDAR_NAME") {
            options.calendar_name = Some(name);
        }
        if let Some(timezone) = env_non_empty("CALENDAR_TIMEZONE") {
            options.timezone = Some(timezone);
        }
        if let Some(minutes) = env_non_empty("CALENDAR_REMINDER_MINUTES") {
            options.reminder_minutes = Some(minutes.parse().map_err(|_| {
                Error::Config(format!("CALENDAR_REMINDER_MINUTES is not a number: {minutes}"))
            })?);
        }
        Ok(options)
    }
}

impl Default for IcsOptions {
    fn default() -> Self {
        Self {
            calendar_name: Some("Schulmanager".to_string()),
            timezone: None,
            reminder_minutes: None,
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_rejects_inverted_bounds() {
        assert!(Period::new(1, 525, 480).is_err());
        assert!(Period::new(1, 480, 480).is_ok());
    }

    #[test]
    fn teacher_list_identity_survives_clone_only() {
        let list = TeacherList::new(vec![Person::new("Anna", "Schmidt")]);
        let cloned = list.clone();
        let rebuilt = TeacherList::new(vec![Person::new("Anna", "Schmidt")]);

        assert!(list.same_list(&cloned));
        assert!(!list.same_list(&rebuilt));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let credentials = Credentials::new("max", "hunter2");
        let session = Session {
            token: "jwt-secret".to_string(),
            student_id: Some(7),
        };

        assert!(!format!("{credentials:?}").contains("hunter2"));
        assert!(!format!("{session:?}").contains("jwt-secret"));
    }
}
