//! Schulmanager ICS Core Library
//!
//! Turns a student's Schulmanager Online timetable into iCalendar events:
//! lessons are reconciled against their original schedule, projected onto
//! their class period and serialized as a subscribable feed.

pub mod error;
pub mod feed;
pub mod ics;
pub mod period;
pub mod projector;
pub mod providers;
pub mod reconcile;
pub mod types;
pub mod window;

// Re-export core types and error handling
pub use error::{Error, Result, Stage};
pub use types::*;
pub use window::ScheduleWindow;

/// Commonly used items
pub mod prelude {
    pub use crate::{
        feed::*, ics::*, period::*, projector::*, providers::*, reconcile::*, types::*,
        window::*,
    };
}
