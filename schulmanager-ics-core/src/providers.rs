pub mod base;
pub mod schulmanager;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    Credentials, Error, EventDescriptor, IcsOptions, LessonRecord, Period, Result,
    ScheduleWindow, Session, Stage, feed::assemble, ics::IcsGenerator, period::PeriodIndex,
};

pub use base::*;

/// Upstream school-management API
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name
    fn name(&self) -> &str;

    /// Provider description
    fn description(&self) -> &str;

    /// Exchange credentials for a session token and the linked student
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session>;

    /// Class periods with their time boundaries
    async fn fetch_periods(&self, session: &Session) -> Result<Vec<Period>>;

    /// Lessons of `student_id` within `window`, already validated
    async fn fetch_schedule(
        &self,
        session: &Session,
        student_id: i64,
        window: &ScheduleWindow,
    ) -> Result<Vec<LessonRecord>>;
}

/// Builds a student's feed from a provider.
///
/// Each upstream call needs the previous one's output, so the pipeline is
/// strictly sequential: login, period table, schedule, then assembly.
#[derive(Clone)]
pub struct FeedService {
    provider: Arc<dyn Provider>,
}

impl FeedService {
    pub fn new(provider: impl Provider + 'static) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn provider_description(&self) -> &str {
        self.provider.description()
    }

    /// Logs in and resolves the linked student.
    pub async fn login(&self, credentials: &Credentials) -> Result<(Session, i64)> {
        let session = self
            .provider
            .authenticate(credentials)
            .await
            .map_err(|e| match e {
                Error::Authentication(_) => e,
                other => Error::Authentication(other.to_string()),
            })?;

        let student_id = session.student_id.ok_or(Error::MissingStudent)?;
        Ok((session, student_id))
    }

    /// Fetches everything for the window around `today` and projects it into
    /// events, in schedule order.
    pub async fn events(
        &self,
        credentials: &Credentials,
        today: NaiveDate,
    ) -> Result<Vec<EventDescriptor>> {
        let (session, student_id) = self.login(credentials).await.inspect_err(|e| {
            tracing::warn!("Login for {} failed: {}", credentials.username, e);
        })?;

        let periods = self
            .provider
            .fetch_periods(&session)
            .await
            .map_err(|e| e.at(Stage::Periods))?;

        let window = ScheduleWindow::around(today);
        let lessons = self
            .provider
            .fetch_schedule(&session, student_id, &window)
            .await
            .map_err(|e| e.at(Stage::Schedule))?;

        let index = PeriodIndex::build(periods);
        let events = assemble(&lessons, &index)?;

        tracing::info!(
            "Built {} events for {} ({} to {})",
            events.len(),
            credentials.username,
            window.start,
            window.end
        );
        Ok(events)
    }

    /// Same as [`FeedService::events`], serialized to iCalendar.
    pub async fn calendar(
        &self,
        credentials: &Credentials,
        today: NaiveDate,
        options: IcsOptions,
    ) -> Result<String> {
        let events = self.events(credentials, today).await?;
        IcsGenerator::new(options).generate(&events)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{LessonKind, LessonVariant, Person, Room, Subject, TeacherList};

    /// In-memory provider recording the order of calls
    #[derive(Default)]
    struct FakeProvider {
        student_id: Option<i64>,
        reject_login: bool,
        fail_periods: bool,
        fail_schedule: bool,
        lesson_period: i64,
        calls: Mutex<Vec<String>>,
    }

    impl FakeProvider {
        fn working() -> Self {
            Self {
                student_id: Some(4711),
                lesson_period: 3,
                ..Self::default()
            }
        }

        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }
    }

    #[async_trait]
    impl Provider for Arc<FakeProvider> {
        fn name(&self) -> &str {
            "fake"
        }

        fn description(&self) -> &str {
            "in-memory provider"
        }

        async fn authenticate(&self, credentials: &Credentials) -> Result<Session> {
            self.record("authenticate");
            if self.reject_login || credentials.password != "secret" {
                return Err(Error::Authentication("invalid credentials".to_string()));
            }
            Ok(Session {
                token: "token".to_string(),
                student_id: self.student_id,
            })
        }

        async fn fetch_periods(&self, session: &Session) -> Result<Vec<Period>> {
            self.record("periods");
            assert_eq!(session.token, "token");
            if self.fail_periods {
                return Err(Error::Timeout);
            }
            Ok(vec![Period::new(3, 480, 525)?])
        }

        async fn fetch_schedule(
            &self,
            _session: &Session,
            student_id: i64,
            window: &ScheduleWindow,
        ) -> Result<Vec<LessonRecord>> {
            self.record(format!("schedule {student_id} {}", window.start_str()));
            if self.fail_schedule {
                return Err(Error::Validation("bad lesson".to_string()));
            }
            Ok(vec![LessonRecord {
                kind: LessonKind::Regular,
                date: NaiveDate::from_ymd_opt(2024, 5, 6).unwrap(),
                period_id: self.lesson_period,
                actual: Some(LessonVariant {
                    subject: Some(Subject {
                        id: Some(1),
                        label: "Math".to_string(),
                    }),
                    room: Some(Room {
                        id: 10,
                        name: "A101".to_string(),
                    }),
                    teachers: Some(TeacherList::new(vec![Person::new("Anna", "Schmidt")])),
                }),
                originals: Vec::new(),
            }])
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 8).unwrap()
    }

    fn credentials() -> Credentials {
        Credentials::new("max", "secret")
    }

    #[test]
    fn pipeline_runs_in_order() {
        let fake = Arc::new(FakeProvider::working());
        let service = FeedService::new(fake.clone());

        let events = tokio_test::block_on(service.events(&credentials(), today())).unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Math");
        assert_eq!(
            *fake.calls.lock().unwrap(),
            ["authenticate", "periods", "schedule 4711 2024-04-21"]
        );
    }

    #[test]
    fn wrong_password_stops_before_fetching() {
        let fake = Arc::new(FakeProvider::working());
        let service = FeedService::new(fake.clone());

        let err = tokio_test::block_on(service.events(&Credentials::new("max", "nope"), today()))
            .unwrap_err();

        assert!(matches!(err, Error::Authentication(_)));
        assert_eq!(*fake.calls.lock().unwrap(), ["authenticate"]);
    }

    #[test]
    fn missing_student_is_reported() {
        let fake = Arc::new(FakeProvider {
            student_id: None,
            ..FakeProvider::working()
        });
        let service = FeedService::new(fake.clone());

        let err = tokio_test::block_on(service.events(&credentials(), today())).unwrap_err();

        assert!(matches!(err, Error::MissingStudent));
        assert_eq!(fake.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn upstream_failures_carry_their_stage() {
        let periods = FeedService::new(Arc::new(FakeProvider {
            fail_periods: true,
            ..FakeProvider::working()
        }));
        let err = tokio_test::block_on(periods.events(&credentials(), today())).unwrap_err();
        assert!(matches!(
            err,
            Error::Upstream {
                stage: Stage::Periods,
                ..
            }
        ));

        let schedule = FeedService::new(Arc::new(FakeProvider {
            fail_schedule: true,
            ..FakeProvider::working()
        }));
        let err = tokio_test::block_on(schedule.events(&credentials(), today())).unwrap_err();
        assert!(matches!(
            err,
            Error::Upstream {
                stage: Stage::Schedule,
                ..
            }
        ));
    }

    #[test]
    fn unknown_period_fails_the_feed() {
        let service = FeedService::new(Arc::new(FakeProvider {
            lesson_period: 9,
            ..FakeProvider::working()
        }));

        let err = tokio_test::block_on(service.events(&credentials(), today())).unwrap_err();

        assert!(matches!(err, Error::PeriodNotFound { period_id: 9, .. }));
    }

    #[test]
    fn calendar_serializes_events() {
        let service = FeedService::new(Arc::new(FakeProvider::working()));

        let ics = tokio_test::block_on(service.calendar(
            &credentials(),
            today(),
            IcsOptions::default(),
        ))
        .unwrap();

        assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(ics.contains("SUMMARY:Math\r\n"));
        assert!(ics.contains("DTSTART:20240506T080000\r\n"));
    }
}
