//! Main ledger orchestrator that coordinates the chart, calendar, posting
//! engine and reports

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::LedgerConfig;
use crate::ledger::{AccountTree, ChartOfAccounts, FiscalCalendar, VoucherDraft, VoucherEngine, VoucherUpdate};
use crate::reconciliation::{BalanceReconciler, ReconciliationReport};
use crate::reporting::*;
use crate::traits::*;
use crate::types::*;

/// Result of a full consistency check
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// Accounts whose stored `is_leaf` disagrees with their child count
    pub leaf_flag_drift: Vec<AccountId>,
    /// Accounts that are their own ancestor
    pub cyclic_accounts: Vec<AccountId>,
    /// Stored vouchers whose lines do not balance
    pub unbalanced_vouchers: Vec<VoucherId>,
    /// Posted lines that reference a non-leaf account
    pub lines_on_group_accounts: Vec<VoucherLineId>,
    pub balances: ReconciliationReport,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.leaf_flag_drift.is_empty()
            && self.cyclic_accounts.is_empty()
            && self.unbalanced_vouchers.is_empty()
            && self.lines_on_group_accounts.is_empty()
            && self.balances.is_clean()
    }
}

/// Main ledger system that orchestrates all accounting operations
pub struct Ledger<S: LedgerStorage> {
    storage: S,
    chart: ChartOfAccounts<S>,
    calendar: FiscalCalendar<S>,
    vouchers: VoucherEngine<S>,
    reports: ReportProjector<S>,
    reconciler: BalanceReconciler<S>,
}

impl<S: LedgerStorage + Clone> Ledger<S> {
    /// Create a new ledger with the given storage backend and default settings
    pub fn new(storage: S) -> Self {
        Self::with_config(storage, LedgerConfig::default())
    }

    pub fn with_config(storage: S, config: LedgerConfig) -> Self {
        Self::with_validators(
            storage,
            config,
            Box::new(DefaultAccountValidator),
            Box::new(DefaultVoucherValidator),
        )
    }

    /// Create a new ledger with custom validators
    pub fn with_validators(
        storage: S,
        config: LedgerConfig,
        account_validator: Box<dyn AccountValidator>,
        voucher_validator: Box<dyn VoucherValidator>,
    ) -> Self {
        let calendar = FiscalCalendar::with_config(storage.clone(), config.fiscal);
        let vouchers = VoucherEngine::with_validator(
            storage.clone(),
            calendar.posting_gate(),
            voucher_validator,
            config.posting,
        );
        Self {
            chart: ChartOfAccounts::with_gate(
                storage.clone(),
                account_validator,
                calendar.posting_gate(),
            ),
            calendar,
            vouchers,
            reports: ReportProjector::with_config(storage.clone(), config.reporting),
            reconciler: BalanceReconciler::new(storage.clone()),
            storage,
        }
    }
}

impl<S: LedgerStorage> Ledger<S> {
    pub fn chart(&self) -> &ChartOfAccounts<S> {
        &self.chart
    }

    pub fn calendar(&self) -> &FiscalCalendar<S> {
        &self.calendar
    }

    pub fn vouchers(&self) -> &VoucherEngine<S> {
        &self.vouchers
    }

    // Chart of accounts

    pub async fn create_account(&self, input: NewAccount) -> LedgerResult<LedgerAccount> {
        self.chart.create_account(input).await
    }

    pub async fn move_account(
        &self,
        account_id: AccountId,
        new_parent_id: Option<AccountId>,
    ) -> LedgerResult<LedgerAccount> {
        self.chart.move_account(account_id, new_parent_id).await
    }

    pub async fn delete_account(&self, account_id: AccountId) -> LedgerResult<()> {
        self.chart.delete_account(account_id).await
    }

    pub async fn update_account(
        &self,
        account_id: AccountId,
        changes: AccountChanges,
    ) -> LedgerResult<LedgerAccount> {
        self.chart.update_account(account_id, changes).await
    }

    pub async fn set_account_active(
        &self,
        account_id: AccountId,
        active: bool,
    ) -> LedgerResult<LedgerAccount> {
        self.chart.set_active(account_id, active).await
    }

    pub async fn get_account(&self, account_id: AccountId) -> LedgerResult<Option<LedgerAccount>> {
        self.chart.get_account(account_id).await
    }

    pub async fn list_accounts(&self) -> LedgerResult<Vec<LedgerAccount>> {
        self.chart.list_accounts().await
    }

    pub async fn account_tree(&self) -> LedgerResult<AccountTree> {
        self.chart.tree().await
    }

    pub async fn account_path(&self, account_id: AccountId) -> LedgerResult<Vec<LedgerAccount>> {
        self.chart.account_path(account_id).await
    }

    pub async fn descendants(
        &self,
        account_id: AccountId,
    ) -> LedgerResult<Vec<(usize, LedgerAccount)>> {
        self.chart.descendants(account_id).await
    }

    // Fiscal calendar

    pub async fn create_fiscal_year(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<FiscalYear> {
        self.calendar
            .create_fiscal_year(code, start_date, end_date)
            .await
    }

    pub async fn activate_fiscal_year(&self, year_id: FiscalYearId) -> LedgerResult<FiscalYear> {
        self.calendar.activate_fiscal_year(year_id).await
    }

    pub async fn close_fiscal_year(&self, year_id: FiscalYearId) -> LedgerResult<FiscalYear> {
        self.calendar.close_fiscal_year(year_id).await
    }

    pub async fn create_fiscal_period(
        &self,
        year_id: FiscalYearId,
        period_name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<FiscalPeriod> {
        self.calendar
            .create_fiscal_period(year_id, period_name, start_date, end_date)
            .await
    }

    pub async fn close_period(&self, period_id: FiscalPeriodId) -> LedgerResult<FiscalPeriod> {
        self.calendar.close_period(period_id).await
    }

    pub async fn reopen_period(&self, period_id: FiscalPeriodId) -> LedgerResult<FiscalPeriod> {
        self.calendar.reopen_period(period_id).await
    }

    pub async fn active_fiscal_year(&self) -> LedgerResult<Option<FiscalYear>> {
        self.calendar.active_fiscal_year().await
    }

    pub async fn open_periods_for_year(
        &self,
        year_id: FiscalYearId,
    ) -> LedgerResult<Vec<FiscalPeriod>> {
        self.calendar.open_periods_for_year(year_id).await
    }

    pub async fn period_for_date(&self, date: NaiveDate) -> LedgerResult<Option<FiscalPeriod>> {
        self.calendar.period_for_date(date).await
    }

    // Vouchers

    /// Validate and store a voucher (posted unless the draft asks otherwise)
    pub async fn post_voucher(&self, draft: VoucherDraft) -> LedgerResult<Voucher> {
        self.vouchers.submit(draft).await
    }

    pub async fn approve_voucher(
        &self,
        voucher_id: VoucherId,
        approved_by: i64,
    ) -> LedgerResult<Voucher> {
        self.vouchers.approve(voucher_id, approved_by).await
    }

    pub async fn post_approved_voucher(&self, voucher_id: VoucherId) -> LedgerResult<Voucher> {
        self.vouchers.post_approved(voucher_id).await
    }

    pub async fn cancel_voucher(&self, voucher_id: VoucherId) -> LedgerResult<Voucher> {
        self.vouchers.cancel(voucher_id).await
    }

    pub async fn update_voucher(
        &self,
        voucher_id: VoucherId,
        update: VoucherUpdate,
    ) -> LedgerResult<Voucher> {
        self.vouchers.update(voucher_id, update).await
    }

    pub async fn delete_voucher(&self, voucher_id: VoucherId) -> LedgerResult<()> {
        self.vouchers.delete(voucher_id).await
    }

    pub async fn get_voucher(&self, voucher_id: VoucherId) -> LedgerResult<Option<Voucher>> {
        self.vouchers.get_voucher(voucher_id).await
    }

    pub async fn find_voucher(&self, voucher_no: &str) -> LedgerResult<Option<Voucher>> {
        self.vouchers.find_by_no(voucher_no).await
    }

    pub async fn list_vouchers(&self, filter: &VoucherFilter) -> LedgerResult<Vec<Voucher>> {
        self.vouchers.list_vouchers(filter).await
    }

    // Balances

    pub async fn get_balance(
        &self,
        account_id: AccountId,
        period_id: FiscalPeriodId,
    ) -> LedgerResult<Option<AccountBalance>> {
        self.vouchers
            .accumulator()
            .get_balance(account_id, period_id)
            .await
    }

    pub async fn list_balances(
        &self,
        account_id: Option<AccountId>,
    ) -> LedgerResult<Vec<AccountBalance>> {
        self.vouchers.accumulator().list_balances(account_id).await
    }

    // Reports

    pub async fn trial_balance(&self, filter: &ReportFilter) -> LedgerResult<TrialBalance> {
        self.reports.trial_balance(filter).await
    }

    pub async fn profit_and_loss(&self, filter: &ReportFilter) -> LedgerResult<ProfitAndLoss> {
        self.reports.profit_and_loss(filter).await
    }

    pub async fn balance_sheet(&self, filter: &ReportFilter) -> LedgerResult<BalanceSheet> {
        self.reports.balance_sheet(filter).await
    }

    pub async fn cash_flow(&self, filter: &ReportFilter) -> LedgerResult<CashFlowStatement> {
        self.reports.cash_flow(filter).await
    }

    pub async fn equity_statement(&self, filter: &ReportFilter) -> LedgerResult<EquityStatement> {
        self.reports.equity_statement(filter).await
    }

    pub async fn reconcile_balances(&self) -> LedgerResult<ReconciliationReport> {
        self.reconciler.reconcile().await
    }

    /// Check the chart, every stored voucher and the balance cache
    pub async fn validate_integrity(&self) -> LedgerResult<IntegrityReport> {
        let tree = self.chart.tree().await?;

        let mut report = IntegrityReport {
            leaf_flag_drift: tree.leaf_flag_drift(),
            cyclic_accounts: tree.cyclic_accounts(),
            ..IntegrityReport::default()
        };

        for voucher in self.storage.list_vouchers(&VoucherFilter::default()).await? {
            if !voucher.is_balanced() {
                report.unbalanced_vouchers.push(voucher.id);
            }
            if !voucher.is_posted() {
                continue;
            }
            for line in &voucher.lines {
                if tree.child_count(line.ledger_account_id) > 0 {
                    report.lines_on_group_accounts.push(line.id);
                }
            }
        }

        report.balances = self.reconciler.reconcile().await?;

        if report.is_clean() {
            info!("Ledger integrity check passed");
        } else {
            warn!(
                leaf_flag_drift = report.leaf_flag_drift.len(),
                cyclic_accounts = report.cyclic_accounts.len(),
                unbalanced_vouchers = report.unbalanced_vouchers.len(),
                lines_on_group_accounts = report.lines_on_group_accounts.len(),
                "Ledger integrity check found problems"
            );
        }
        Ok(report)
    }
}
