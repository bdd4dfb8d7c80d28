use chrono::{NaiveDateTime, Utc};
use uuid::Uuid;

use crate::{AttendeeRole, EventDescriptor, IcsOptions, Result};


/// Content lines longer than this many octets are folded
const MAX_LINE_OCTETS: usize = 75;
/// Schulmanager does not expose e-mail addresses
const PLACEHOLDER_ADDRESS: &str = "mailto:noreply@schulmanager.invalid";

/// iCalendar serializer for lesson events
pub struct IcsGenerator {
    options: IcsOptions,
}

impl IcsGenerator {
    pub fn new(options: IcsOptions) -> Self {
        Self { options }
    }

    /// Serializes `events` in the given order
    pub fn generate(&self, events: &[EventDescriptor]) -> Result<String> {
        let mut ics_content = String::new();

        push_line(&mut ics_content, "BEGIN:VCALENDAR");
        push_line(&mut ics_content, "VERSION:2.0");
        push_line(
            &mut ics_content,
            "PRODID:-//Schulmanager ICS//Schulmanager Lesson Calendar//DE",
        );
        push_line(&mut ics_content, "CALSCALE:GREGORIAN");
        push_line(&mut ics_content, "METHOD:PUBLISH");

        if let Some(ref name) = self.options.calendar_name {
            push_line(
                &mut ics_content,
                &format!("X-WR-CALNAME:{}", self.escape_text(name)),
            );
        }

        if let Some(ref timezone) = self.options.timezone {
            push_line(
                &mut ics_content,
                &format!("X-WR-TIMEZONE:{}", self.escape_text(timezone)),
            );
        }

        for event in events {
            self.add_event(&mut ics_content, event)?;
        }

        push_line(&mut ics_content, "END:VCALENDAR");

        Ok(ics_content)
    }

    fn add_event(&self, ics_content: &mut String, event: &EventDescriptor) -> Result<()> {
        let uid = Uuid::new_v4().to_string();
        let dtstamp = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();

        push_line(ics_content, "BEGIN:VEVENT");
        push_line(ics_content, &format!("UID:{uid}"));
        push_line(ics_content, &format!("DTSTAMP:{dtstamp}"));
        push_line(ics_content, &format!("DTSTART:{}", floating(event.start)));
        push_line(ics_content, &format!("DTEND:{}", floating(event.end)));
        push_line(
            ics_content,
            &format!("SUMMARY:{}", self.escape_text(&event.title)),
        );
        push_line(
            ics_content,
            &format!("LOCATION:{}", self.escape_text(&event.location)),
        );
        push_line(
            ics_content,
            &format!("CLASS:{}", event.classification.as_ics()),
        );
        push_line(ics_content, &format!("STATUS:{}", event.status.as_ics()));
        push_line(
            ics_content,
            &format!("CATEGORIES:{}", self.escape_text(&event.category)),
        );

        if let Some(ref organizer) = event.organizer {
            push_line(
                ics_content,
                &format!(
                    "ORGANIZER;CN={}:{PLACEHOLDER_ADDRESS}",
                    self.param_value(&organizer.name)
                ),
            );
        }

        for attendee in &event.attendees {
            let role = match attendee.role {
                AttendeeRole::Primary => "REQ-PARTICIPANT",
                AttendeeRole::Secondary => "OPT-PARTICIPANT",
            };
            push_line(
                ics_content,
                &format!(
                    "ATTENDEE;ROLE={role};CN={}:{PLACEHOLDER_ADDRESS}",
                    self.param_value(&attendee.name)
                ),
            );
        }

        if let Some(reminder_minutes) = self.options.reminder_minutes {
            push_line(ics_content, "BEGIN:VALARM");
            push_line(ics_content, "ACTION:DISPLAY");
            push_line(
                ics_content,
                &format!("DESCRIPTION:{}", self.escape_text(&event.title)),
            );
            push_line(ics_content, &format!("TRIGGER:-PT{reminder_minutes}M"));
            push_line(ics_content, "END:VALARM");
        }

        push_line(ics_content, "END:VEVENT");

        Ok(())
    }

    /// Escapes a TEXT value
    pub fn escape_text(&self, text: &str) -> String {
        text.replace('\\', "\\\\")
            .replace("\r\n", "\\n")
            .replace('\n', "\\n")
            .replace('\r', "\\n")
            .replace(',', "\\,")
            .replace(';', "\\;")
    }

    /// Parameter values are quoted and cannot contain double quotes.
    pub fn param_value(&self, text: &str) -> String {
        let cleaned: String = text
            .chars()
            .filter(|c| !c.is_control())
            .map(|c| if c == '"' { '\'' } else { c })
            .collect();
        format!("\"{cleaned}\"")
    }
}

impl Default for IcsGenerator {
    fn default() -> Self {
        Self::new(IcsOptions::default())
    }
}

/// Local time without a zone; clients place it in their own zone.
fn floating(time: NaiveDateTime) -> String {
    time.format("%Y%m%dT%H%M%S").to_string()
}

/// Appends one content line, folding it at octet boundaries that keep
/// multi-byte characters intact.
fn push_line(ics_content: &mut String, line: &str) {
    let mut octets = 0;
    for ch in line.chars() {
        let len = ch.len_utf8();
        if octets + len > MAX_LINE_OCTETS {
            ics_content.push_str("\r\n ");
            octets = 1;
        }
        ics_content.push(ch);
        octets += len;
    }
    ics_content.push_str("\r\n");
}
