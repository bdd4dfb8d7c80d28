//! Decides which of the actual and original lesson data to show and how to
//! annotate changes.
//!
//! Subject and room are compared by identifier and rendered as a single
//! `"<original> -> <actual>"` string. Teachers are compared by list identity
//! and rendered additively: the original teachers are appended as secondary
//! attendees instead of being folded into one string.

use crate::{Attendee, AttendeeRole, LessonKind, LessonRecord, LessonVariant, Room, Subject};

pub const NO_SUBJECT: &str = "No subject assigned";
pub const NO_ROOM: &str = "No room assigned";
pub const NORMALLY_PREFIX: &str = "normally: ";

/// Display text for a subject or room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDiff {
    pub display: String,
    pub changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeacherDiff {
    pub attendees: Vec<Attendee>,
    pub changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffResult {
    pub subject: FieldDiff,
    pub teachers: TeacherDiff,
    pub room: FieldDiff,
}

/// Field of a lesson variant that has an identifier and a display text
trait Labelled {
    fn id(&self) -> Option<i64>;
    fn text(&self) -> &str;
}

impl Labelled for Subject {
    fn id(&self) -> Option<i64> {
        self.id
    }

    fn text(&self) -> &str {
        &self.label
    }
}

impl Labelled for Room {
    fn id(&self) -> Option<i64> {
        Some(self.id)
    }

    fn text(&self) -> &str {
        &self.name
    }
}

pub fn reconcile(record: &LessonRecord) -> DiffResult {
    DiffResult {
        subject: field_diff(record, |v| v.subject.as_ref(), NO_SUBJECT),
        teachers: teacher_diff(record),
        room: field_diff(record, |v| v.room.as_ref(), NO_ROOM),
    }
}

fn field_diff<T, F>(record: &LessonRecord, pick: F, sentinel: &str) -> FieldDiff
where
    T: Labelled,
    F: Fn(&LessonVariant) -> Option<&T>,
{
    let actual_field = record.actual.as_ref().and_then(&pick);

    let actual = actual_field
        .map(Labelled::text)
        .filter(|text| !text.is_empty())
        .unwrap_or(sentinel);

    let changed = record.kind == LessonKind::Changed
        && record
            .originals
            .first()
            .and_then(&pick)
            .and_then(Labelled::id)
            .is_some_and(|original| actual_field.and_then(Labelled::id) != Some(original));

    if !changed {
        return FieldDiff {
            display: actual.to_string(),
            changed,
        };
    }

    let joined = record
        .originals
        .iter()
        .map(|variant| pick(variant).map_or("", Labelled::text))
        .collect::<Vec<_>>()
        .join(", ");
    let original = if joined.is_empty() {
        sentinel
    } else {
        joined.as_str()
    };

    FieldDiff {
        display: format!("{original} -> {actual}"),
        changed,
    }
}

fn teacher_diff(record: &LessonRecord) -> TeacherDiff {
    let actual = record.actual.as_ref().and_then(|v| v.teachers.as_ref());

    let mut attendees: Vec<Attendee> = actual
        .into_iter()
        .flat_map(|teachers| teachers.iter())
        .map(|teacher| Attendee {
            name: teacher.display_name(),
            role: AttendeeRole::Primary,
        })
        .collect();

    // Identity, not content: an equal but separately built list still counts
    // as a change.
    let original = record
        .originals
        .first()
        .and_then(|v| v.teachers.as_ref())
        .filter(|original| !actual.is_some_and(|actual| actual.same_list(original)))
        .filter(|_| record.kind == LessonKind::Changed);

    if let Some(original) = original {
        attendees.extend(original.iter().map(|teacher| Attendee {
            name: format!("{NORMALLY_PREFIX}{}", teacher.display_name()),
            role: AttendeeRole::Secondary,
        }));
    }

    TeacherDiff {
        attendees,
        changed: original.is_some(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::{Person, TeacherList};

    fn variant(subject: (i64, &str), room: (i64, &str), teachers: &[(&str, &str)]) -> LessonVariant {
        LessonVariant {
            subject: Some(Subject {
                id: Some(subject.0),
                label: subject.1.to_string(),
            }),
            room: Some(Room {
                id: room.0,
                name: room.1.to_string(),
            }),
            teachers: Some(TeacherList::new(
                teachers.iter().map(|(f, l)| Person::new(*f, *l)).collect(),
            )),
        }
    }

    fn record(
        kind: LessonKind,
        actual: Option<LessonVariant>,
        originals: Vec<LessonVariant>,
    ) -> LessonRecord {
        LessonRecord {
            kind,
            date: NaiveDate::from_ymd_opt(2024, 5, 6).unwrap(),
            period_id: 3,
            actual,
            originals,
        }
    }

    fn names(diff: &TeacherDiff) -> Vec<&str> {
        diff.attendees.iter().map(|a| a.name.as_str()).collect()
    }

    #[test]
    fn regular_lesson_never_shows_diff() {
        let lesson = record(
            LessonKind::Regular,
            Some(variant((1, "Math"), (10, "A101"), &[("Anna", "Schmidt")])),
            vec![variant((2, "Physics"), (11, "B202"), &[("Bernd", "Meyer")])],
        );

        let diff = reconcile(&lesson);

        assert_eq!(diff.subject.display, "Math");
        assert!(!diff.subject.changed);
        assert_eq!(diff.room.display, "A101");
        assert!(!diff.room.changed);
        assert_eq!(names(&diff.teachers), ["Anna Schmidt"]);
        assert!(!diff.teachers.changed);
        assert!(
            diff.teachers
                .attendees
                .iter()
                .all(|a| a.role == AttendeeRole::Primary)
        );
    }

    #[test]
    fn changed_subject_joins_all_originals() {
        let lesson = record(
            LessonKind::Changed,
            Some(variant((1, "Math"), (10, "A101"), &[("Anna", "Schmidt")])),
            vec![
                variant((2, "Physics"), (10, "A101"), &[("Anna", "Schmidt")]),
                variant((3, "Chemistry"), (10, "A101"), &[("Anna", "Schmidt")]),
            ],
        );

        let diff = reconcile(&lesson);

        assert_eq!(diff.subject.display, "Physics, Chemistry -> Math");
        assert!(diff.subject.changed);
        // same room id in the first original
        assert_eq!(diff.room.display, "A101");
        assert!(!diff.room.changed);
    }

    #[test]
    fn changed_with_equal_subject_id_has_no_arrow() {
        let lesson = record(
            LessonKind::Changed,
            Some(variant((1, "Math"), (10, "A101"), &[])),
            vec![variant((1, "Mathematics"), (12, "C303"), &[])],
        );

        let diff = reconcile(&lesson);

        assert_eq!(diff.subject.display, "Math");
        assert!(!diff.subject.changed);
        assert_eq!(diff.room.display, "C303 -> A101");
        assert!(diff.room.changed);
    }

    #[test]
    fn changed_teachers_are_appended_as_normally() {
        let lesson = record(
            LessonKind::Changed,
            Some(variant(
                (1, "Math"),
                (10, "A101"),
                &[("Anna", "Schmidt"), ("Carl", "Weber")],
            )),
            vec![variant((1, "Math"), (10, "A101"), &[("Bernd", "Meyer")])],
        );

        let diff = reconcile(&lesson);

        assert!(diff.teachers.changed);
        assert_eq!(
            names(&diff.teachers),
            ["Anna Schmidt", "Carl Weber", "normally: Bernd Meyer"]
        );
        assert_eq!(diff.teachers.attendees[2].role, AttendeeRole::Secondary);
    }

    #[test]
    fn structurally_equal_teacher_lists_still_count_as_changed() {
        let lesson = record(
            LessonKind::Changed,
            Some(variant((1, "Math"), (10, "A101"), &[("Anna", "Schmidt")])),
            vec![variant((1, "Math"), (10, "A101"), &[("Anna", "Schmidt")])],
        );

        let diff = reconcile(&lesson);

        assert_eq!(
            names(&diff.teachers),
            ["Anna Schmidt", "normally: Anna Schmidt"]
        );
    }

    #[test]
    fn shared_teacher_list_is_not_a_change() {
        let actual = variant((1, "Math"), (10, "A101"), &[("Anna", "Schmidt")]);
        let mut original = variant((2, "Physics"), (10, "A101"), &[]);
        original.teachers = actual.teachers.clone();
        let lesson = record(LessonKind::Changed, Some(actual), vec![original]);

        let diff = reconcile(&lesson);

        assert!(!diff.teachers.changed);
        assert_eq!(names(&diff.teachers), ["Anna Schmidt"]);
    }

    #[test]
    fn missing_actual_data_degrades_to_sentinels() {
        let lesson = record(LessonKind::Regular, Some(LessonVariant::default()), vec![]);

        let diff = reconcile(&lesson);

        assert_eq!(diff.subject.display, NO_SUBJECT);
        assert_eq!(diff.room.display, NO_ROOM);
        assert!(diff.teachers.attendees.is_empty());
    }

    #[test]
    fn empty_labels_count_as_missing() {
        let lesson = record(
            LessonKind::Regular,
            Some(variant((1, ""), (10, ""), &[("Anna", "Schmidt")])),
            vec![],
        );

        let diff = reconcile(&lesson);

        assert_eq!(diff.subject.display, NO_SUBJECT);
        assert_eq!(diff.room.display, NO_ROOM);
    }

    #[test]
    fn cancelled_lesson_shows_original_without_arrow() {
        let lesson = record(
            LessonKind::Cancelled,
            None,
            vec![variant((2, "Physics"), (11, "B202"), &[("Bernd", "Meyer")])],
        );

        let diff = reconcile(&lesson);

        assert_eq!(diff.subject.display, NO_SUBJECT);
        assert!(!diff.subject.changed);
        assert_eq!(diff.room.display, NO_ROOM);
        assert!(diff.teachers.attendees.is_empty());
        assert!(!diff.teachers.changed);
    }

    #[test]
    fn changed_without_originals_shows_actual_only() {
        let lesson = record(
            LessonKind::Changed,
            Some(variant((1, "Math"), (10, "A101"), &[("Anna", "Schmidt")])),
            vec![],
        );

        let diff = reconcile(&lesson);

        assert_eq!(diff.subject.display, "Math");
        assert_eq!(diff.room.display, "A101");
        assert_eq!(names(&diff.teachers), ["Anna Schmidt"]);
    }

    #[test]
    fn original_without_room_is_not_compared() {
        let mut original = variant((2, "Physics"), (11, "B202"), &[]);
        original.room = None;
        original.teachers = None;
        let lesson = record(
            LessonKind::Changed,
            Some(variant((1, "Math"), (10, "A101"), &[("Anna", "Schmidt")])),
            vec![original],
        );

        let diff = reconcile(&lesson);

        assert_eq!(diff.subject.display, "Physics -> Math");
        assert_eq!(diff.room.display, "A101");
        assert!(!diff.room.changed);
        assert!(!diff.teachers.changed);
    }

    #[test]
    fn subject_without_id_counts_as_different() {
        let mut actual = variant((1, "Math"), (10, "A101"), &[]);
        actual.subject = Some(Subject {
            id: None,
            label: "Math".to_string(),
        });
        let lesson = record(
            LessonKind::Changed,
            Some(actual),
            vec![variant((1, "Mathematik"), (10, "A101"), &[])],
        );

        let diff = reconcile(&lesson);

        assert!(diff.subject.changed);
        assert_eq!(diff.subject.display, "Mathematik -> Math");
        assert!(!diff.room.changed);
    }

    #[test]
    fn original_missing_label_joins_as_empty() {
        let mut second = variant((3, "Chemistry"), (12, "C303"), &[]);
        second.subject = None;
        let lesson = record(
            LessonKind::Changed,
            Some(variant((1, "Math"), (10, "A101"), &[])),
            vec![variant((2, "Physics"), (11, "B202"), &[]), second],
        );

        let diff = reconcile(&lesson);

        assert_eq!(diff.subject.display, "Physics,  -> Math");
        assert_eq!(diff.room.display, "B202, C303 -> A101");
    }
}
