use chrono::{Duration, NaiveDateTime};

use crate::{
    Classification, Contact, Error, EventDescriptor, EventStatus, LessonKind, LessonRecord,
    Result, period::PeriodIndex, reconcile::reconcile,
};

/// Category attached to every event
pub const CATEGORY: &str = "Schulmanager";

/// Turns one lesson into a calendar event.
///
/// Fails only when the lesson's period is missing from `periods`.
pub fn project(record: &LessonRecord, periods: &PeriodIndex) -> Result<EventDescriptor> {
    let period = periods
        .lookup(record.period_id)
        .ok_or(Error::PeriodNotFound {
            period_id: record.period_id,
            date: record.date,
        })?;

    let midnight = NaiveDateTime::from(record.date);
    let start = midnight + Duration::minutes(i64::from(period.start_minutes));
    let end = midnight + Duration::minutes(i64::from(period.end_minutes));

    let diff = reconcile(record);

    let organizer = record
        .actual
        .as_ref()
        .and_then(|v| v.teachers.as_ref())
        .and_then(|teachers| teachers.first())
        .map(|teacher| Contact {
            name: teacher.display_name(),
        });

    Ok(EventDescriptor {
        start,
        end,
        classification: classification(record.kind),
        title: format!("{}{}", title_prefix(record.kind), diff.subject.display),
        organizer,
        attendees: diff.teachers.attendees,
        location: diff.room.display,
        category: CATEGORY.to_string(),
        status: status(record.kind),
    })
}

const fn classification(kind: LessonKind) -> Classification {
    match kind {
        LessonKind::Changed => Classification::Private,
        LessonKind::Regular | LessonKind::Cancelled => Classification::Confidential,
    }
}

const fn status(kind: LessonKind) -> EventStatus {
    match kind {
        LessonKind::Regular => EventStatus::Confirmed,
        LessonKind::Changed => EventStatus::Tentative,
        LessonKind::Cancelled => EventStatus::Cancelled,
    }
}

const fn title_prefix(kind: LessonKind) -> &'static str {
    match kind {
        LessonKind::Regular => "",
        LessonKind::Changed => "(Changed) ",
        LessonKind::Cancelled => "(Cancelled) ",
    }
}
