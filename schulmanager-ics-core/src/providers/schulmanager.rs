use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{StatusCode, header};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    Credentials, Error, LessonKind, LessonRecord, LessonVariant, Period, Person, ProviderConfig,
    Result, Room, ScheduleWindow, Session, Subject, TeacherList,
    providers::{BaseProvider, BaseProviderBuilder, Provider, ProviderInfo},
};

const SCHEDULES_MODULE: &str = "schedules";
const CLASS_HOURS_ENDPOINT: &str = "get-class-hours";
const LESSONS_ENDPOINT: &str = "get-actual-lessons";
const DAYS_PER_WEEK: usize = 7;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    email_or_username: &'a str,
    password: &'a str,
    mobile_app: bool,
    institution_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    jwt: String,
    user: LoginUser,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginUser {
    #[allow(dead_code)]
    id: i64,
    #[serde(default)]
    associated_student: Option<AssociatedStudent>,
}

#[derive(Debug, Deserialize)]
struct AssociatedStudent {
    id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CallsRequest<'a> {
    bundle_version: &'a str,
    requests: [Call<'a>; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Call<'a> {
    module_name: &'a str,
    endpoint_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<LessonsParameters<'a>>,
}

#[derive(Debug, Serialize)]
struct LessonsParameters<'a> {
    student: StudentRef,
    start: &'a str,
    end: &'a str,
}

#[derive(Debug, Serialize)]
struct StudentRef {
    id: i64,
}

/// Envelope of the `/api/calls` endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallsResponse {
    results: Vec<CallResult>,
    #[allow(dead_code)]
    #[serde(default)]
    system_status_messages: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct CallResult {
    status: u16,
    #[serde(default)]
    data: serde_json::Value,
}

impl CallResult {
    fn into_data<T: DeserializeOwned>(self) -> Result<T> {
        if self.status != 200 {
            return Err(Error::Validation(format!(
                "call returned status {}",
                self.status
            )));
        }
        Ok(serde_json::from_value(self.data)?)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassHour {
    id: i64,
    #[allow(dead_code)]
    number: String,
    from: String,
    until: String,
    from_by_day: Vec<String>,
    until_by_day: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireLesson {
    #[serde(rename = "type")]
    kind: String,
    date: String,
    class_hour: WireClassHourRef,
    #[serde(default)]
    actual_lesson: Option<WireVariant>,
    #[serde(default)]
    original_lessons: Option<Vec<WireVariant>>,
}

#[derive(Debug, Deserialize)]
struct WireClassHourRef {
    id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireVariant {
    #[serde(default)]
    subject: Option<WireSubject>,
    #[serde(default)]
    subject_label: Option<String>,
    #[serde(default)]
    room: Option<WireRoom>,
    #[serde(default)]
    teachers: Option<Vec<WireTeacher>>,
}

#[derive(Debug, Deserialize)]
struct WireSubject {
    id: i64,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireRoom {
    id: i64,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireTeacher {
    #[serde(default)]
    firstname: String,
    #[serde(default)]
    lastname: String,
}

impl From<WireVariant> for LessonVariant {
    fn from(wire: WireVariant) -> Self {
        let subject = match (wire.subject, wire.subject_label) {
            (None, None) => None,
            (subject, label) => Some(Subject {
                id: subject.as_ref().map(|s| s.id),
                label: label
                    .or_else(|| subject.and_then(|s| s.name))
                    .unwrap_or_default(),
            }),
        };
        Self {
            subject,
            room: wire.room.map(|room| Room {
                id: room.id,
                name: room.name.unwrap_or_default(),
            }),
            teachers: wire.teachers.map(|teachers| {
                TeacherList::new(
                    teachers
                        .into_iter()
                        .map(|t| Person::new(t.firstname, t.lastname))
                        .collect(),
                )
            }),
        }
    }
}

fn lesson_kind(tag: &str) -> LessonKind {
    match tag {
        "changedLesson" => LessonKind::Changed,
        "cancelledLesson" => LessonKind::Cancelled,
        _ => LessonKind::Regular,
    }
}

/// Accepts `YYYY-MM-DD` as well as full ISO timestamps.
fn parse_date(value: &str) -> Result<NaiveDate> {
    let day = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| Error::Validation(format!("invalid lesson date '{value}': {e}")))
}

/// Parses a period boundary: either plain minutes (`"480"`) or a clock time
/// (`"08:00"`, `"08:00:00"`).
pub fn parse_offset(value: &str) -> Result<u32> {
    let value = value.trim();
    let invalid = || Error::Validation(format!("invalid period offset '{value}'"));

    if !value.contains(':') {
        return value.parse().map_err(|_| invalid());
    }

    let parts: Vec<&str> = value.split(':').collect();
    if !(2..=3).contains(&parts.len()) {
        return Err(invalid());
    }
    let hours: u32 = parts[0].parse().map_err(|_| invalid())?;
    let minutes: u32 = parts[1].parse().map_err(|_| invalid())?;
    let seconds: u32 = match parts.get(2) {
        Some(seconds) => seconds.parse().map_err(|_| invalid())?,
        None => 0,
    };
    // 24:00 marks the end of the day, nothing later
    if minutes >= 60 || seconds >= 60 || hours > 24 || (hours == 24 && minutes + seconds > 0) {
        return Err(invalid());
    }
    Ok(hours * 60 + minutes)
}

fn first_result(body: &[u8]) -> Result<Option<CallResult>> {
    let response: CallsResponse = serde_json::from_slice(body)?;
    Ok(response.results.into_iter().next())
}

pub(crate) fn parse_login(body: &[u8]) -> Result<Session> {
    let response: LoginResponse = serde_json::from_slice(body)
        .map_err(|e| Error::Authentication(format!("unexpected login response: {e}")))?;
    Ok(Session {
        token: response.jwt,
        student_id: response.user.associated_student.map(|s| s.id),
    })
}

pub(crate) fn parse_class_hours(body: &[u8]) -> Result<Vec<Period>> {
    let Some(result) = first_result(body)? else {
        return Ok(Vec::new());
    };
    let hours: Vec<ClassHour> = result.into_data()?;

    hours
        .into_iter()
        .map(|hour| {
            if hour.from_by_day.len() != DAYS_PER_WEEK || hour.until_by_day.len() != DAYS_PER_WEEK
            {
                return Err(Error::Validation(format!(
                    "class hour {} must list {DAYS_PER_WEEK} daily times",
                    hour.id
                )));
            }
            Period::new(hour.id, parse_offset(&hour.from)?, parse_offset(&hour.until)?)
        })
        .collect()
}

pub(crate) fn parse_lessons(body: &[u8]) -> Result<Vec<LessonRecord>> {
    let result =
        first_result(body)?.ok_or_else(|| Error::Validation("no lesson results".to_string()))?;
    let lessons: Vec<WireLesson> = result.into_data()?;

    lessons
        .into_iter()
        .map(|lesson| {
            Ok(LessonRecord {
                kind: lesson_kind(&lesson.kind),
                date: parse_date(&lesson.date)?,
                period_id: lesson.class_hour.id,
                actual: lesson.actual_lesson.map(LessonVariant::from),
                originals: lesson
                    .original_lessons
                    .unwrap_or_default()
                    .into_iter()
                    .map(LessonVariant::from)
                    .collect(),
            })
        })
        .collect()
}

pub struct SchulmanagerProvider {
    base: BaseProvider,
    config: ProviderConfig,
}

impl SchulmanagerProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let mut base = BaseProviderBuilder::new_with_timeout(
            ProviderInfo {
                name: "schulmanager".to_string(),
                description: "Schulmanager Online API".to_string(),
            },
            config.timeout,
        );
        let origin = header::HeaderValue::from_str(&config.base_url)
            .map_err(|e| Error::Config(format!("invalid base URL: {e}")))?;
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ORIGIN, origin);
        base.client_builder = base.client_builder.default_headers(headers);

        Ok(Self {
            base: base.build()?,
            config,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.config.base_url, path)
    }

    async fn call(&self, session: &Session, call: Call<'_>) -> Result<Vec<u8>> {
        let body = CallsRequest {
            bundle_version: &self.config.bundle_version,
            requests: [call],
        };
        let response = self
            .base
            .client
            .post(self.url("calls"))
            .bearer_auth(&session.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.base.handle_error_req(e))?;

        if !response.status().is_success() {
            return Err(self
                .base
                .custom_error(format!("HTTP {} error", response.status())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.base.handle_error_req(e))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl Provider for SchulmanagerProvider {
    fn name(&self) -> &str {
        &self.base.info.name
    }

    fn description(&self) -> &str {
        &self.base.info.description
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<Session> {
        tracing::info!("Authenticating user: {}", credentials.username);

        let response = self
            .base
            .client
            .post(self.url("login"))
            .header(header::REFERER, format!("{}/", self.config.base_url))
            .json(&LoginRequest {
                email_or_username: &credentials.username,
                password: &credentials.password,
                mobile_app: false,
                institution_id: None,
            })
            .send()
            .await
            .map_err(|e| self.base.handle_error_req(e))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(Error::Authentication("invalid credentials".to_string()));
            }
            status => {
                return Err(Error::Authentication(format!("login returned HTTP {status}")));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.base.handle_error_req(e))?;
        parse_login(&bytes)
    }

    async fn fetch_periods(&self, session: &Session) -> Result<Vec<Period>> {
        let body = self
            .call(
                session,
                Call {
                    module_name: SCHEDULES_MODULE,
                    endpoint_name: CLASS_HOURS_ENDPOINT,
                    parameters: None,
                },
            )
            .await?;
        let periods = parse_class_hours(&body)?;
        tracing::debug!("Fetched {} class hours", periods.len());
        Ok(periods)
    }

    async fn fetch_schedule(
        &self,
        session: &Session,
        student_id: i64,
        window: &ScheduleWindow,
    ) -> Result<Vec<LessonRecord>> {
        let start = window.start_str();
        let end = window.end_str();
        tracing::info!(
            "Fetching lessons for student {} from {} to {}",
            student_id,
            start,
            end
        );

        let body = self
            .call(
                session,
                Call {
                    module_name: SCHEDULES_MODULE,
                    endpoint_name: LESSONS_ENDPOINT,
                    parameters: Some(LessonsParameters {
                        student: StudentRef { id: student_id },
                        start: &start,
                        end: &end,
                    }),
                },
            )
            .await?;
        let lessons = parse_lessons(&body)?;
        tracing::debug!("Fetched {} lessons", lessons.len());
        Ok(lessons)
    }
}
