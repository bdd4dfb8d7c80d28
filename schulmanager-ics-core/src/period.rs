use std::collections::HashMap;

use crate::Period;

/// Lookup from period id to its time boundaries, built once per feed
#[derive(Debug, Clone, Default)]
pub struct PeriodIndex {
    periods: HashMap<i64, Period>,
}

impl PeriodIndex {
    /// Later entries replace earlier ones with the same id.
    pub fn build(periods: impl IntoIterator<Item = Period>) -> Self {
        let mut index = HashMap::new();
        for period in periods {
            index.insert(period.id, period);
        }
        Self { periods: index }
    }

    pub fn lookup(&self, period_id: i64) -> Option<&Period> {
        self.periods.get(&period_id)
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }
}

impl FromIterator<Period> for PeriodIndex {
    fn from_iter<T: IntoIterator<Item = Period>>(iter: T) -> Self {
        Self::build(iter)
    }
}
