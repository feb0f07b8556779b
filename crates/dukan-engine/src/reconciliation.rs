//! Brings daily figures in line after side-channel returns and exchanges.
//!
//! Entries dated today are folded in incrementally; back-dated ones
//! trigger a rebuild of their day. Nothing here fails the caller: a closed
//! day or a failed update leaves `pending_reconciliation` set, and
//! [`Reconciliation::replay_pending`] catches those days up later.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use dukan_core::{CustomerTransaction, DailyInventory};
use dukan_db::repository::daily;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use ts_rs::TS;

use crate::daily::{today, RefreshOutcome};
use crate::error::EngineResult;
use crate::Engine;

/// What happened to one day during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DayReconciliation {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub outcome: RefreshOutcome,
}

#[derive(Debug, Clone, Copy)]
pub struct Reconciliation<'a> {
    engine: &'a Engine,
}

impl<'a> Reconciliation<'a> {
    pub(crate) fn new(engine: &'a Engine) -> Self {
        Reconciliation { engine }
    }

    /// Applies freshly committed mirror entries to their days.
    pub async fn reconcile(&self, txs: &[CustomerTransaction]) -> Vec<DayReconciliation> {
        let mut by_date: BTreeMap<NaiveDate, Vec<CustomerTransaction>> = BTreeMap::new();
        for tx in txs {
            by_date.entry(tx.business_date()).or_default().push(tx.clone());
        }

        let current = today();
        let service = self.engine.daily();
        let mut results = Vec::with_capacity(by_date.len());

        for (date, batch) in by_date {
            let outcome = if date == current {
                service.absorb(&batch).await
            } else {
                service.refresh(date).await
            };
            results.push(DayReconciliation { date, outcome });
        }

        results
    }

    /// Days whose figures are known to be stale.
    pub async fn pending_days(&self) -> EngineResult<Vec<DailyInventory>> {
        let mut conn = self.engine.db().acquire().await?;
        Ok(daily::list_pending(&mut conn).await?)
    }

    /// Rebuilds every pending day, closed ones included.
    ///
    /// A day that still fails stays pending.
    pub async fn replay_pending(&self) -> EngineResult<Vec<DayReconciliation>> {
        let pending = self.pending_days().await?;
        let service = self.engine.daily();
        let mut results = Vec::with_capacity(pending.len());

        for day in pending {
            let date = day.business_date;
            let outcome = match service.recalculate(date).await {
                Ok(_) => RefreshOutcome::Rebuilt,
                Err(e) => {
                    error!(date = %date, error = %e, "Replay failed");
                    RefreshOutcome::Failed
                }
            };
            results.push(DayReconciliation { date, outcome });
        }

        info!(days = results.len(), "Pending days replayed");
        Ok(results)
    }
}
