//! Traits for storage abstraction and extensibility

use async_trait::async_trait;

use crate::ledger::VoucherDraft;
use crate::types::*;
use crate::utils::validation;

/// Filter for voucher listings. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoucherFilter {
    pub status: Option<VoucherStatus>,
    pub fiscal_year_id: Option<FiscalYearId>,
    pub fiscal_period_id: Option<FiscalPeriodId>,
    pub account_id: Option<AccountId>,
}

impl VoucherFilter {
    pub fn posted() -> Self {
        Self {
            status: Some(VoucherStatus::Posted),
            ..Self::default()
        }
    }

    pub fn matches(&self, voucher: &Voucher) -> bool {
        self.status.is_none_or(|s| voucher.status == s)
            && self
                .fiscal_year_id
                .is_none_or(|y| voucher.fiscal_year_id == y)
            && self
                .fiscal_period_id
                .is_none_or(|p| voucher.fiscal_period_id == p)
            && self
                .account_id
                .is_none_or(|a| voucher.references_account(a))
    }
}

/// Batch of chart-of-accounts writes that must land together
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountChangeSet {
    pub insert: Option<LedgerAccount>,
    pub update: Vec<LedgerAccount>,
    pub delete: Option<AccountId>,
}

/// Storage abstraction for the ledger
///
/// Implementations back the chart of accounts, the fiscal calendar, vouchers
/// and the balance cache. Every method that takes several rows must write
/// them as one unit: either all rows land or none do.
#[async_trait]
pub trait LedgerStorage: Send + Sync {
    /// Allocate the next id of a sequence
    async fn next_id(&self, kind: IdKind) -> LedgerResult<i64>;

    // Chart of accounts

    /// Apply a batch of account writes. Fails with `DuplicateCode` if an
    /// inserted or updated account uses a code held by another account.
    async fn commit_accounts(&self, changes: AccountChangeSet) -> LedgerResult<()>;

    async fn get_account(&self, account_id: AccountId) -> LedgerResult<Option<LedgerAccount>>;

    async fn find_account_by_code(&self, code: &str) -> LedgerResult<Option<LedgerAccount>>;

    /// List accounts ordered by code, optionally filtered by type
    async fn list_accounts(
        &self,
        account_type: Option<AccountType>,
    ) -> LedgerResult<Vec<LedgerAccount>>;

    /// Whether any stored voucher line references the account
    async fn account_in_use(&self, account_id: AccountId) -> LedgerResult<bool>;

    // Fiscal calendar

    /// Fails with `DuplicateCode` on a duplicate year code
    async fn insert_fiscal_year(&self, year: &FiscalYear) -> LedgerResult<()>;

    async fn get_fiscal_year(&self, year_id: FiscalYearId) -> LedgerResult<Option<FiscalYear>>;

    /// List fiscal years ordered by start date
    async fn list_fiscal_years(&self) -> LedgerResult<Vec<FiscalYear>>;

    async fn update_fiscal_years(&self, years: &[FiscalYear]) -> LedgerResult<()>;

    async fn insert_fiscal_period(&self, period: &FiscalPeriod) -> LedgerResult<()>;

    async fn get_fiscal_period(
        &self,
        period_id: FiscalPeriodId,
    ) -> LedgerResult<Option<FiscalPeriod>>;

    /// List periods ordered by start date, optionally restricted to one year
    async fn list_fiscal_periods(
        &self,
        year_id: Option<FiscalYearId>,
    ) -> LedgerResult<Vec<FiscalPeriod>>;

    async fn update_fiscal_periods(&self, periods: &[FiscalPeriod]) -> LedgerResult<()>;

    // Vouchers and the balance cache

    /// Insert a voucher with its lines and write the balance batch.
    /// Fails with `DuplicateVoucher` (writing nothing) if the voucher number
    /// is taken.
    async fn insert_voucher(&self, voucher: &Voucher, balances: &BalanceBatch) -> LedgerResult<()>;

    /// Replace a stored voucher and write the balance batch
    async fn update_voucher(&self, voucher: &Voucher, balances: &BalanceBatch) -> LedgerResult<()>;

    /// Delete a voucher together with its lines and write the balance batch.
    /// Applied-posting records of the voucher are dropped with it.
    async fn delete_voucher(
        &self,
        voucher_id: VoucherId,
        balances: &BalanceBatch,
    ) -> LedgerResult<()>;

    async fn get_voucher(&self, voucher_id: VoucherId) -> LedgerResult<Option<Voucher>>;

    async fn find_voucher_by_no(&self, voucher_no: &str) -> LedgerResult<Option<Voucher>>;

    /// List vouchers ordered by date then number
    async fn list_vouchers(&self, filter: &VoucherFilter) -> LedgerResult<Vec<Voucher>>;

    async fn get_balance(
        &self,
        account_id: AccountId,
        period_id: FiscalPeriodId,
    ) -> LedgerResult<Option<AccountBalance>>;

    /// Upsert balance rows keyed by (account, period) and record the
    /// batch's applied postings
    async fn save_balances(&self, balances: &BalanceBatch) -> LedgerResult<()>;

    /// Whether a posting has already been applied to an account
    async fn posting_applied(&self, posting: &AppliedPosting) -> LedgerResult<bool>;

    async fn list_balances(&self, account_id: Option<AccountId>)
        -> LedgerResult<Vec<AccountBalance>>;
}

/// Trait for implementing custom account validation rules
pub trait AccountValidator: Send + Sync {
    /// Validate an account before it is created
    fn validate_new_account(&self, account: &NewAccount) -> LedgerResult<()>;

    /// Validate a rename/retype request
    fn validate_changes(&self, changes: &AccountChanges) -> LedgerResult<()>;
}

/// Trait for implementing custom voucher validation rules
///
/// Runs before the built-in shape, balance and reference checks.
pub trait VoucherValidator: Send + Sync {
    fn validate_draft(&self, draft: &VoucherDraft) -> LedgerResult<()>;
}

/// Default account validator with basic rules
pub struct DefaultAccountValidator;

impl AccountValidator for DefaultAccountValidator {
    fn validate_new_account(&self, account: &NewAccount) -> LedgerResult<()> {
        validation::validate_account_code(&account.code)?;
        validation::validate_account_name(&account.name)
    }

    fn validate_changes(&self, changes: &AccountChanges) -> LedgerResult<()> {
        if let Some(code) = &changes.code {
            validation::validate_account_code(code)?;
        }
        if let Some(name) = &changes.name {
            validation::validate_account_name(name)?;
        }
        Ok(())
    }
}

/// Default voucher validator: header field formats
pub struct DefaultVoucherValidator;

impl VoucherValidator for DefaultVoucherValidator {
    fn validate_draft(&self, draft: &VoucherDraft) -> LedgerResult<()> {
        validation::validate_voucher_no(&draft.voucher_no)?;
        validation::validate_narration(&draft.narration)
    }
}
