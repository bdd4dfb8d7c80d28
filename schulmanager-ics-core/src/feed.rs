use crate::{EventDescriptor, LessonRecord, Result, period::PeriodIndex, projector::project};

/// Projects every lesson in input order.
///
/// All or nothing: the first lesson whose period cannot be resolved aborts
/// the whole feed.
pub fn assemble(records: &[LessonRecord], periods: &PeriodIndex) -> Result<Vec<EventDescriptor>> {
    let events = records
        .iter()
        .map(|record| project(record, periods))
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(
        "Assembled {} events from {} periods",
        events.len(),
        periods.len()
    );
    Ok(events)
}
