// budget.rs — Daily budget counter (§4.G): per-(org, uapk, date) monotonic
// counter. `check` and `increment` are separate store operations, matching
// the pipeline's own step ordering (§4.K steps 6 and 9) — the increment
// happens only after the decision is known to be `approved`.

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::error::GatewayError;
use crate::model::{budget_key, ActionCounter};
use crate::store::JsonStore;

pub struct BudgetStore {
    inner: JsonStore<ActionCounter>,
}

#[derive(Debug, Clone, Copy)]
pub enum BudgetCheck {
    /// Under the daily cap.
    Ok { count: u64, limit: u64 },
    /// At or above `threshold_fraction * limit` but still under `limit`.
    ThresholdReached { count: u64, limit: u64 },
    /// At or above `limit`.
    Exceeded { count: u64, limit: u64 },
}

impl BudgetStore {
    pub fn new(dir: impl AsRef<std::path::Path>) -> Result<Self, GatewayError> {
        Ok(Self { inner: JsonStore::new(dir)? })
    }

    pub fn count_for(&self, org_id: &str, uapk_id: &str, date: NaiveDate) -> Result<u64, GatewayError> {
        Ok(self.inner.get(&budget_key(org_id, uapk_id, date))?.map(|c| c.count).unwrap_or(0))
    }

    /// Check today's count against `limit`, escalating at `threshold_fraction`
    /// of the limit if configured (e.g. `0.9` for a 90% warning).
    pub fn check(
        &self,
        org_id: &str,
        uapk_id: &str,
        date: NaiveDate,
        limit: u64,
        threshold_fraction: Option<f64>,
    ) -> Result<BudgetCheck, GatewayError> {
        let count = self.count_for(org_id, uapk_id, date)?;
        if count >= limit {
            return Ok(BudgetCheck::Exceeded { count, limit });
        }
        if let Some(fraction) = threshold_fraction {
            let threshold = (limit as f64 * fraction).floor() as u64;
            if count >= threshold {
                return Ok(BudgetCheck::ThresholdReached { count, limit });
            }
        }
        Ok(BudgetCheck::Ok { count, limit })
    }

    /// Atomically increment today's count for `(org_id, uapk_id)`, creating
    /// the row if absent.
    pub fn increment(&self, org_id: &str, uapk_id: &str, date: NaiveDate) -> Result<u64, GatewayError> {
        let key = budget_key(org_id, uapk_id, date);
        let org_id = org_id.to_string();
        let uapk_id = uapk_id.to_string();
        let counter = self.inner.update_or_insert(
            &key,
            || ActionCounter {
                id: Uuid::new_v4(),
                org_id,
                uapk_id,
                counter_date: date,
                count: 0,
                updated_at: Utc::now(),
            },
            |c| {
                c.count += 1;
                c.updated_at = Utc::now();
                Ok(())
            },
        )?;
        Ok(counter.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn increment_creates_row_and_counts_up() {
        let store = BudgetStore::new(tempdir().unwrap().into_path()).unwrap();
        let today = Utc::now().date_naive();
        assert_eq!(store.increment("org-1", "bot-1", today).unwrap(), 1);
        assert_eq!(store.increment("org-1", "bot-1", today).unwrap(), 2);
        assert_eq!(store.count_for("org-1", "bot-1", today).unwrap(), 2);
    }

    #[test]
    fn check_reports_exceeded_at_limit() {
        let store = BudgetStore::new(tempdir().unwrap().into_path()).unwrap();
        let today = Utc::now().date_naive();
        for _ in 0..3 {
            store.increment("org-1", "bot-1", today).unwrap();
        }
        let result = store.check("org-1", "bot-1", today, 3, None).unwrap();
        assert!(matches!(result, BudgetCheck::Exceeded { count: 3, limit: 3 }));
    }

    #[test]
    fn separate_chains_do_not_share_counters() {
        let store = BudgetStore::new(tempdir().unwrap().into_path()).unwrap();
        let today = Utc::now().date_naive();
        store.increment("org-1", "bot-1", today).unwrap();
        assert_eq!(store.count_for("org-1", "bot-2", today).unwrap(), 0);
    }
}
