//! Fiscal calendar: years, periods and their open/closed state

use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::config::FiscalConfig;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation;

/// Shared gate between period state changes and postings.
///
/// Postings hold it for reading while they validate and commit; closing or
/// reopening a period holds it for writing, so a period cannot close under
/// an in-flight posting.
pub type PostingGate = Arc<RwLock<()>>;

/// Manages fiscal years and periods
pub struct FiscalCalendar<S: LedgerStorage> {
    storage: S,
    config: FiscalConfig,
    gate: PostingGate,
    write_lock: Mutex<()>,
}

impl<S: LedgerStorage> FiscalCalendar<S> {
    pub fn new(storage: S) -> Self {
        Self::with_config(storage, FiscalConfig::default())
    }

    pub fn with_config(storage: S, config: FiscalConfig) -> Self {
        Self {
            storage,
            config,
            gate: Arc::new(RwLock::new(())),
            write_lock: Mutex::new(()),
        }
    }

    /// Gate to be held (for reading) by anything that posts into a period
    pub fn posting_gate(&self) -> PostingGate {
        Arc::clone(&self.gate)
    }

    /// Create a new, inactive fiscal year
    pub async fn create_fiscal_year(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<FiscalYear> {
        validation::validate_fiscal_code(code)?;
        validation::validate_date_range("end_date", start_date, end_date)?;

        let _guard = self.write_lock.lock().await;
        let year = FiscalYear {
            id: FiscalYearId(self.storage.next_id(IdKind::FiscalYear).await?),
            code: code.trim().to_string(),
            start_date,
            end_date,
            is_active: false,
            is_closed: false,
        };
        self.storage.insert_fiscal_year(&year).await?;

        info!(
            fiscal_year_id = %year.id,
            code = %year.code,
            start = %start_date,
            end = %end_date,
            "Created fiscal year"
        );
        Ok(year)
    }

    /// Mark a year active. Other years are deactivated unless
    /// `fiscal.single_active_year` is off.
    pub async fn activate_fiscal_year(&self, year_id: FiscalYearId) -> LedgerResult<FiscalYear> {
        let _guard = self.write_lock.lock().await;
        let years = self.storage.list_fiscal_years().await?;

        let Some(target) = years.iter().find(|y| y.id == year_id) else {
            return Err(LedgerError::not_found("fiscal year", year_id));
        };
        if target.is_closed {
            return Err(LedgerError::InvalidState(format!(
                "Fiscal year {} is closed",
                target.code
            )));
        }

        let mut changed = Vec::new();
        for year in &years {
            let should_be_active = if year.id == year_id {
                true
            } else if self.config.single_active_year {
                false
            } else {
                year.is_active
            };
            if year.is_active != should_be_active {
                changed.push(FiscalYear {
                    is_active: should_be_active,
                    ..year.clone()
                });
            }
        }
        self.storage.update_fiscal_years(&changed).await?;

        info!(fiscal_year_id = %year_id, "Activated fiscal year");
        self.get_fiscal_year_required(year_id).await
    }

    /// Close a year together with all of its periods. The year stops being active.
    pub async fn close_fiscal_year(&self, year_id: FiscalYearId) -> LedgerResult<FiscalYear> {
        let _gate = self.gate.write().await;
        let _guard = self.write_lock.lock().await;

        let mut year = self.get_fiscal_year_required(year_id).await?;
        let periods = self.storage.list_fiscal_periods(Some(year_id)).await?;

        let mut closing = Vec::new();
        for period in periods.into_iter().filter(|p| p.is_open) {
            self.ensure_no_pending(period.id).await?;
            closing.push(FiscalPeriod {
                is_open: false,
                ..period
            });
        }

        self.storage.update_fiscal_periods(&closing).await?;
        year.is_closed = true;
        year.is_active = false;
        self.storage
            .update_fiscal_years(std::slice::from_ref(&year))
            .await?;

        info!(
            fiscal_year_id = %year_id,
            periods_closed = closing.len(),
            "Closed fiscal year"
        );
        Ok(year)
    }

    /// Create an open period inside a fiscal year
    pub async fn create_fiscal_period(
        &self,
        year_id: FiscalYearId,
        period_name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<FiscalPeriod> {
        if period_name.trim().is_empty() {
            return Err(LedgerError::validation(
                "period_name",
                "Period name cannot be empty",
            ));
        }
        validation::validate_date_range("end_date", start_date, end_date)?;

        let _guard = self.write_lock.lock().await;
        let year = self.get_fiscal_year_required(year_id).await?;
        if year.is_closed {
            return Err(LedgerError::InvalidState(format!(
                "Fiscal year {} is closed",
                year.code
            )));
        }

        if self.config.enforce_period_within_year
            && (!year.contains_date(start_date) || !year.contains_date(end_date))
        {
            return Err(LedgerError::invalid_range(
                "start_date",
                format!(
                    "period {}..{} falls outside fiscal year {} ({}..{})",
                    start_date, end_date, year.code, year.start_date, year.end_date
                ),
            ));
        }

        if self.config.reject_overlapping_periods {
            let siblings = self.storage.list_fiscal_periods(Some(year_id)).await?;
            if let Some(other) = siblings.iter().find(|p| p.overlaps(start_date, end_date)) {
                return Err(LedgerError::invalid_range(
                    "start_date",
                    format!("period overlaps {}", other.period_name),
                ));
            }
        }

        let period = FiscalPeriod {
            id: FiscalPeriodId(self.storage.next_id(IdKind::FiscalPeriod).await?),
            fiscal_year_id: year_id,
            period_name: period_name.trim().to_string(),
            start_date,
            end_date,
            is_open: true,
        };
        self.storage.insert_fiscal_period(&period).await?;

        info!(
            fiscal_period_id = %period.id,
            fiscal_year_id = %year_id,
            name = %period.period_name,
            "Created fiscal period"
        );
        Ok(period)
    }

    /// Close a period for posting
    pub async fn close_period(&self, period_id: FiscalPeriodId) -> LedgerResult<FiscalPeriod> {
        let _gate = self.gate.write().await;
        let _guard = self.write_lock.lock().await;

        let mut period = self.get_fiscal_period_required(period_id).await?;
        if !period.is_open {
            return Ok(period);
        }
        self.ensure_no_pending(period_id).await?;

        period.is_open = false;
        self.storage
            .update_fiscal_periods(std::slice::from_ref(&period))
            .await?;

        info!(fiscal_period_id = %period_id, name = %period.period_name, "Closed fiscal period");
        Ok(period)
    }

    /// Reopen a period. Periods of a closed year stay closed.
    pub async fn reopen_period(&self, period_id: FiscalPeriodId) -> LedgerResult<FiscalPeriod> {
        let _gate = self.gate.write().await;
        let _guard = self.write_lock.lock().await;

        let mut period = self.get_fiscal_period_required(period_id).await?;
        if period.is_open {
            return Ok(period);
        }
        let year = self.get_fiscal_year_required(period.fiscal_year_id).await?;
        if year.is_closed {
            return Err(LedgerError::InvalidState(format!(
                "Cannot reopen {} because fiscal year {} is closed",
                period.period_name, year.code
            )));
        }

        period.is_open = true;
        self.storage
            .update_fiscal_periods(std::slice::from_ref(&period))
            .await?;

        info!(fiscal_period_id = %period_id, name = %period.period_name, "Reopened fiscal period");
        Ok(period)
    }

    async fn ensure_no_pending(&self, period_id: FiscalPeriodId) -> LedgerResult<()> {
        if !self.config.block_close_with_drafts {
            return Ok(());
        }

        let filter = VoucherFilter {
            fiscal_period_id: Some(period_id),
            ..VoucherFilter::default()
        };
        let count = self
            .storage
            .list_vouchers(&filter)
            .await?
            .iter()
            .filter(|v| matches!(v.status, VoucherStatus::Draft | VoucherStatus::Approved))
            .count();

        if count > 0 {
            warn!(fiscal_period_id = %period_id, count, "Period has unposted vouchers");
            return Err(LedgerError::PendingVouchers { period_id, count });
        }
        Ok(())
    }

    pub async fn get_fiscal_year(&self, year_id: FiscalYearId) -> LedgerResult<Option<FiscalYear>> {
        self.storage.get_fiscal_year(year_id).await
    }

    pub async fn get_fiscal_year_required(&self, year_id: FiscalYearId) -> LedgerResult<FiscalYear> {
        self.storage
            .get_fiscal_year(year_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("fiscal year", year_id))
    }

    pub async fn get_fiscal_period_required(
        &self,
        period_id: FiscalPeriodId,
    ) -> LedgerResult<FiscalPeriod> {
        self.storage
            .get_fiscal_period(period_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("fiscal period", period_id))
    }

    pub async fn list_fiscal_years(&self) -> LedgerResult<Vec<FiscalYear>> {
        self.storage.list_fiscal_years().await
    }

    /// The active fiscal year, if any. With several active years the
    /// earliest one wins.
    pub async fn active_fiscal_year(&self) -> LedgerResult<Option<FiscalYear>> {
        Ok(self
            .storage
            .list_fiscal_years()
            .await?
            .into_iter()
            .find(|y| y.is_active))
    }

    /// Periods of a year ordered by start date
    pub async fn periods_for_year(&self, year_id: FiscalYearId) -> LedgerResult<Vec<FiscalPeriod>> {
        self.storage.list_fiscal_periods(Some(year_id)).await
    }

    pub async fn open_periods_for_year(
        &self,
        year_id: FiscalYearId,
    ) -> LedgerResult<Vec<FiscalPeriod>> {
        Ok(self
            .periods_for_year(year_id)
            .await?
            .into_iter()
            .filter(|p| p.is_open)
            .collect())
    }

    /// Period containing `date`, searched across all years
    pub async fn period_for_date(&self, date: NaiveDate) -> LedgerResult<Option<FiscalPeriod>> {
        Ok(self
            .storage
            .list_fiscal_periods(None)
            .await?
            .into_iter()
            .find(|p| p.contains_date(date)))
    }
}

/// Helpers for laying out a calendar
pub mod utils {
    use super::*;
    use chrono::{Datelike, Months};

    /// Create a year with one period per calendar month, named like `2024-07`.
    /// The last period is clipped to the year end.
    pub async fn create_monthly_year<S: LedgerStorage>(
        calendar: &FiscalCalendar<S>,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<(FiscalYear, Vec<FiscalPeriod>)> {
        let year = calendar
            .create_fiscal_year(code, start_date, end_date)
            .await?;

        let mut periods = Vec::new();
        let mut start = start_date;
        while start <= end_date {
            let next = start
                .checked_add_months(Months::new(1))
                .ok_or_else(|| LedgerError::invalid_range("end_date", "date overflow"))?;
            let end = next.pred_opt().unwrap_or(next).min(end_date);
            let name = format!("{}-{:02}", start.year(), start.month());
            periods.push(
                calendar
                    .create_fiscal_period(year.id, &name, start, end)
                    .await?,
            );
            start = next;
        }

        Ok((year, periods))
    }
}
