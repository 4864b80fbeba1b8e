//! Reconciliation of the balance cache against posted voucher lines

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

use crate::traits::*;
use crate::types::*;

/// A cached row whose totals disagree with the posted lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceMismatch {
    pub account_id: AccountId,
    pub fiscal_period_id: FiscalPeriodId,
    pub cached_debit: BigDecimal,
    pub cached_credit: BigDecimal,
    pub posted_debit: BigDecimal,
    pub posted_credit: BigDecimal,
}

/// A row whose opening or closing balance does not follow from its neighbours
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuityBreak {
    pub account_id: AccountId,
    pub fiscal_period_id: FiscalPeriodId,
    pub expected: BigDecimal,
    pub actual: BigDecimal,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub rows_checked: usize,
    pub mismatches: Vec<BalanceMismatch>,
    pub continuity_breaks: Vec<ContinuityBreak>,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty() && self.continuity_breaks.is_empty()
    }
}

/// Compares the `AccountBalance` cache with totals recomputed from posted lines
pub struct BalanceReconciler<S: LedgerStorage> {
    storage: S,
}

impl<S: LedgerStorage> BalanceReconciler<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Check every (account, period) pair that has either a cached row or
    /// posted lines.
    ///
    /// Missing rows count as zero on the cached side. Continuity is checked
    /// per account in period order: each row must open at the closing of the
    /// latest earlier row in scope (zero if none), and close at opening plus
    /// its signed totals.
    pub async fn reconcile(&self) -> LedgerResult<ReconciliationReport> {
        let zero = BigDecimal::from(0);
        let accounts: HashMap<AccountId, LedgerAccount> = self
            .storage
            .list_accounts(None)
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();
        let periods = self.storage.list_fiscal_periods(None).await?;
        let position: HashMap<FiscalPeriodId, usize> =
            periods.iter().enumerate().map(|(i, p)| (p.id, i)).collect();

        let mut posted: BTreeMap<(AccountId, FiscalPeriodId), (BigDecimal, BigDecimal)> =
            BTreeMap::new();
        for voucher in self.storage.list_vouchers(&VoucherFilter::posted()).await? {
            for line in &voucher.lines {
                let entry = posted
                    .entry((line.ledger_account_id, voucher.fiscal_period_id))
                    .or_insert_with(|| (zero.clone(), zero.clone()));
                entry.0 = &entry.0 + &line.debit;
                entry.1 = &entry.1 + &line.credit;
            }
        }

        let cached: BTreeMap<(AccountId, FiscalPeriodId), AccountBalance> = self
            .storage
            .list_balances(None)
            .await?
            .into_iter()
            .map(|row| ((row.ledger_account_id, row.fiscal_period_id), row))
            .collect();

        let mut report = ReconciliationReport::default();

        let mut keys: Vec<(AccountId, FiscalPeriodId)> =
            cached.keys().chain(posted.keys()).copied().collect();
        keys.sort();
        keys.dedup();
        for key in keys {
            report.rows_checked += 1;
            let (cached_debit, cached_credit) = cached
                .get(&key)
                .map(|row| (row.debit_total.clone(), row.credit_total.clone()))
                .unwrap_or_else(|| (zero.clone(), zero.clone()));
            let (posted_debit, posted_credit) = posted
                .get(&key)
                .cloned()
                .unwrap_or_else(|| (zero.clone(), zero.clone()));

            if cached_debit != posted_debit || cached_credit != posted_credit {
                warn!(
                    account_id = %key.0,
                    fiscal_period_id = %key.1,
                    cached_debit = %cached_debit,
                    posted_debit = %posted_debit,
                    cached_credit = %cached_credit,
                    posted_credit = %posted_credit,
                    "Balance cache mismatch"
                );
                report.mismatches.push(BalanceMismatch {
                    account_id: key.0,
                    fiscal_period_id: key.1,
                    cached_debit,
                    cached_credit,
                    posted_debit,
                    posted_credit,
                });
            }
        }

        // continuity, per account in period order
        let mut rows_by_account: BTreeMap<AccountId, Vec<&AccountBalance>> = BTreeMap::new();
        for row in cached.values() {
            rows_by_account
                .entry(row.ledger_account_id)
                .or_default()
                .push(row);
        }

        for (account_id, mut rows) in rows_by_account {
            let Some(account) = accounts.get(&account_id) else {
                continue;
            };
            rows.sort_by_key(|row| position.get(&row.fiscal_period_id).copied());

            let mut previous: Option<&AccountBalance> = None;
            for row in rows {
                let expected_closing = row.expected_closing(account.account_type);
                if row.closing_balance != expected_closing {
                    report.continuity_breaks.push(ContinuityBreak {
                        account_id,
                        fiscal_period_id: row.fiscal_period_id,
                        expected: expected_closing,
                        actual: row.closing_balance.clone(),
                        reason: "closing balance does not match opening plus totals".to_string(),
                    });
                }

                let carries = previous.is_some_and(|prev| {
                    account.account_type.is_real()
                        || same_year(&periods, &position, prev.fiscal_period_id, row.fiscal_period_id)
                });
                let expected_opening = match previous {
                    Some(prev) if carries => prev.closing_balance.clone(),
                    _ => zero.clone(),
                };
                if row.opening_balance != expected_opening {
                    report.continuity_breaks.push(ContinuityBreak {
                        account_id,
                        fiscal_period_id: row.fiscal_period_id,
                        expected: expected_opening,
                        actual: row.opening_balance.clone(),
                        reason: "opening balance does not match the preceding closing".to_string(),
                    });
                }
                previous = Some(row);
            }
        }

        if report.is_clean() {
            info!(rows = report.rows_checked, "Balance cache reconciled");
        } else {
            warn!(
                rows = report.rows_checked,
                mismatches = report.mismatches.len(),
                continuity_breaks = report.continuity_breaks.len(),
                "Balance cache out of step with posted lines"
            );
        }
        Ok(report)
    }
}

fn same_year(
    periods: &[FiscalPeriod],
    position: &HashMap<FiscalPeriodId, usize>,
    a: FiscalPeriodId,
    b: FiscalPeriodId,
) -> bool {
    let year = |id: FiscalPeriodId| position.get(&id).map(|&i| periods[i].fiscal_year_id);
    year(a).is_some() && year(a) == year(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::MemoryStorage;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_detects_tampered_row() {
        let storage = MemoryStorage::new();
        storage
            .commit_accounts(AccountChangeSet {
                insert: Some(LedgerAccount::new(
                    AccountId(1),
                    &NewAccount::new("1111", "Cash", AccountType::Asset),
                )),
                ..Default::default()
            })
            .await
            .unwrap();
        storage
            .insert_fiscal_period(&FiscalPeriod {
                id: FiscalPeriodId(1),
                fiscal_year_id: FiscalYearId(1),
                period_name: "2024-01".to_string(),
                start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
                is_open: true,
            })
            .await
            .unwrap();

        let mut row = AccountBalance::new(BalanceId(1), AccountId(1), FiscalPeriodId(1), BigDecimal::from(0));
        row.debit_total = BigDecimal::from(75);
        storage
            .save_balances(&BalanceBatch {
                rows: vec![row],
                ..Default::default()
            })
            .await
            .unwrap();

        let report = BalanceReconciler::new(storage).reconcile().await.unwrap();
        assert!(!report.is_clean());
        assert_eq!(report.rows_checked, 1);
        assert_eq!(report.mismatches.len(), 1);
        assert_eq!(report.mismatches[0].cached_debit, BigDecimal::from(75));
        // closing was never recomputed either
        assert_eq!(report.continuity_breaks.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_ledger_is_clean() {
        let report = BalanceReconciler::new(MemoryStorage::new())
            .reconcile()
            .await
            .unwrap();
        assert!(report.is_clean());
        assert_eq!(report.rows_checked, 0);
    }
}
