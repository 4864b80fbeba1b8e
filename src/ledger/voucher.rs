//! Voucher posting engine

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::PostingConfig;
use crate::ledger::balance::{BalanceAccumulator, StagedBalances};
use crate::ledger::fiscal::PostingGate;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation;

/// Whether a submitted voucher is stored as a draft or posted immediately
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostingIntent {
    Draft,
    #[default]
    Post,
}

/// One row of a journal-shaped voucher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalRow {
    pub account_id: AccountId,
    pub debit: BigDecimal,
    pub credit: BigDecimal,
    pub subledger: Option<SubledgerRef>,
    pub reference: Option<ReferenceRef>,
    pub instrument: Option<Instrument>,
    pub particulars: Option<String>,
}

impl JournalRow {
    pub fn debit(account_id: AccountId, amount: BigDecimal) -> Self {
        Self::new(account_id, amount, BigDecimal::from(0))
    }

    pub fn credit(account_id: AccountId, amount: BigDecimal) -> Self {
        Self::new(account_id, BigDecimal::from(0), amount)
    }

    fn new(account_id: AccountId, debit: BigDecimal, credit: BigDecimal) -> Self {
        Self {
            account_id,
            debit,
            credit,
            subledger: None,
            reference: None,
            instrument: None,
            particulars: None,
        }
    }

    pub fn with_subledger(mut self, kind: SubledgerKind, id: i64) -> Self {
        self.subledger = Some(SubledgerRef { kind, id });
        self
    }

    pub fn with_reference(mut self, kind: ReferenceKind, id: i64) -> Self {
        self.reference = Some(ReferenceRef { kind, id });
        self
    }

    pub fn with_instrument(mut self, kind: InstrumentType, number: Option<String>) -> Self {
        self.instrument = Some(Instrument { kind, number });
        self
    }

    pub fn with_particulars(mut self, particulars: impl Into<String>) -> Self {
        self.particulars = Some(particulars.into());
        self
    }
}

/// Typed entry of a voucher, one variant per voucher shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum VoucherEntry {
    /// Receipt, payment and petty cash: one amount against a cash account
    SingleSided {
        account_id: AccountId,
        amount: BigDecimal,
        cash_account_id: AccountId,
    },
    /// Contra: move an amount between two accounts
    Transfer {
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: BigDecimal,
    },
    /// Free-form balanced rows
    Journal { rows: Vec<JournalRow> },
}

impl VoucherEntry {
    pub fn shape(&self) -> VoucherShape {
        match self {
            VoucherEntry::SingleSided { .. } => VoucherShape::SingleSided,
            VoucherEntry::Transfer { .. } => VoucherShape::Transfer,
            VoucherEntry::Journal { .. } => VoucherShape::Journal,
        }
    }
}

/// Voucher submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoucherDraft {
    pub voucher_no: String,
    pub voucher_type: VoucherType,
    pub voucher_date: NaiveDate,
    pub fiscal_period_id: FiscalPeriodId,
    pub branch_id: i64,
    pub narration: String,
    pub created_by: i64,
    pub entry: VoucherEntry,
    #[serde(default)]
    pub intent: PostingIntent,
}

/// Header edits. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoucherUpdate {
    pub narration: Option<String>,
    pub voucher_date: Option<NaiveDate>,
}

/// Line contents before ids are assigned
#[derive(Debug, Clone, PartialEq)]
struct LineSpec {
    account_id: AccountId,
    debit: BigDecimal,
    credit: BigDecimal,
    subledger: Option<SubledgerRef>,
    reference: Option<ReferenceRef>,
    instrument: Option<Instrument>,
    particulars: Option<String>,
}

impl From<JournalRow> for LineSpec {
    fn from(row: JournalRow) -> Self {
        Self {
            account_id: row.account_id,
            debit: row.debit,
            credit: row.credit,
            subledger: row.subledger,
            reference: row.reference,
            instrument: row.instrument,
            particulars: row.particulars,
        }
    }
}

/// Expand an entry into lines, checking its shape and balance.
///
/// Pure: no storage access, so every structural error surfaces before any
/// lookup or write.
fn expand_entry(
    voucher_type: VoucherType,
    entry: &VoucherEntry,
    config: &PostingConfig,
) -> LedgerResult<Vec<LineSpec>> {
    if entry.shape() != voucher_type.shape() {
        return Err(LedgerError::validation(
            "voucher_type",
            format!(
                "{:?} vouchers take a {} entry, got {}",
                voucher_type,
                voucher_type.shape(),
                entry.shape()
            ),
        ));
    }

    let lines: Vec<LineSpec> = match entry {
        VoucherEntry::SingleSided {
            account_id,
            amount,
            cash_account_id,
        } => {
            validation::validate_positive_amount("amount", amount)?;
            validation::validate_amount_scale("amount", amount)?;
            if account_id == cash_account_id {
                return Err(LedgerError::validation(
                    "cash_account_id",
                    "Cash account must differ from the voucher account",
                ));
            }
            let cash_side = voucher_type.cash_side().unwrap_or(EntryType::Debit);
            let (debited, credited) = match cash_side {
                EntryType::Debit => (*cash_account_id, *account_id),
                EntryType::Credit => (*account_id, *cash_account_id),
            };
            vec![
                JournalRow::debit(debited, amount.clone()).into(),
                JournalRow::credit(credited, amount.clone()).into(),
            ]
        }
        VoucherEntry::Transfer {
            from_account_id,
            to_account_id,
            amount,
        } => {
            validation::validate_positive_amount("amount", amount)?;
            validation::validate_amount_scale("amount", amount)?;
            if from_account_id == to_account_id {
                return Err(LedgerError::validation(
                    "to_account_id",
                    "Transfer accounts must differ",
                ));
            }
            vec![
                JournalRow::debit(*to_account_id, amount.clone()).into(),
                JournalRow::credit(*from_account_id, amount.clone()).into(),
            ]
        }
        VoucherEntry::Journal { rows } => {
            if rows.len() < 2 {
                return Err(LedgerError::validation(
                    "rows",
                    "Journal vouchers need at least two rows",
                ));
            }
            let zero = BigDecimal::from(0);
            for row in rows {
                validation::validate_non_negative("debit", &row.debit)?;
                validation::validate_non_negative("credit", &row.credit)?;
                validation::validate_amount_scale("debit", &row.debit)?;
                validation::validate_amount_scale("credit", &row.credit)?;
                if config.enforce_single_sided_lines && ((row.debit > zero) == (row.credit > zero))
                {
                    return Err(LedgerError::validation(
                        "rows",
                        format!(
                            "Row for account {} must carry exactly one of debit or credit",
                            row.account_id
                        ),
                    ));
                }
            }
            rows.iter().cloned().map(LineSpec::from).collect()
        }
    };

    let debit: BigDecimal = lines.iter().map(|l| &l.debit).sum();
    let credit: BigDecimal = lines.iter().map(|l| &l.credit).sum();
    if debit != credit || debit <= BigDecimal::from(0) {
        return Err(LedgerError::UnbalancedVoucher { debit, credit });
    }

    Ok(lines)
}

/// Serializes operations on one voucher. The map entry is dropped with the
/// last holder, so only vouchers with operations in flight keep a lock.
struct VoucherLock<'a> {
    locks: &'a DashMap<VoucherId, Arc<Mutex<()>>>,
    voucher_id: VoucherId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for VoucherLock<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks
            .remove_if(&self.voucher_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Validates and commits vouchers, and drives their lifecycle
pub struct VoucherEngine<S: LedgerStorage> {
    storage: S,
    accumulator: BalanceAccumulator<S>,
    validator: Box<dyn VoucherValidator>,
    config: PostingConfig,
    gate: PostingGate,
    voucher_locks: DashMap<VoucherId, Arc<Mutex<()>>>,
}

impl<S: LedgerStorage + Clone> VoucherEngine<S> {
    pub fn new(storage: S, gate: PostingGate) -> Self {
        Self::with_validator(
            storage,
            gate,
            Box::new(DefaultVoucherValidator),
            PostingConfig::default(),
        )
    }

    pub fn with_validator(
        storage: S,
        gate: PostingGate,
        validator: Box<dyn VoucherValidator>,
        config: PostingConfig,
    ) -> Self {
        Self {
            accumulator: BalanceAccumulator::new(storage.clone()),
            storage,
            validator,
            config,
            gate,
            voucher_locks: DashMap::new(),
        }
    }
}

impl<S: LedgerStorage> VoucherEngine<S> {
    pub fn accumulator(&self) -> &BalanceAccumulator<S> {
        &self.accumulator
    }

    async fn lock_voucher(&self, voucher_id: VoucherId) -> VoucherLock<'_> {
        let lock = self.voucher_locks.entry(voucher_id).or_default().value().clone();
        VoucherLock {
            locks: &self.voucher_locks,
            voucher_id,
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Validate a draft and store it as POSTED, or as DRAFT when the
    /// draft's intent says so. All-or-nothing: on any error nothing is
    /// written.
    pub async fn submit(&self, draft: VoucherDraft) -> LedgerResult<Voucher> {
        self.validator.validate_draft(&draft)?;
        let specs = expand_entry(draft.voucher_type, &draft.entry, &self.config)?;

        let _gate = self.gate.read().await;
        let (period, year) = self
            .check_period(draft.fiscal_period_id, draft.voucher_date)
            .await?;
        self.check_accounts(specs.iter().map(|s| s.account_id)).await?;

        let voucher_no = draft.voucher_no.trim().to_string();
        if self.storage.find_voucher_by_no(&voucher_no).await?.is_some() {
            return Err(LedgerError::DuplicateVoucher(voucher_no));
        }

        let voucher_id = VoucherId(self.storage.next_id(IdKind::Voucher).await?);
        let mut lines = Vec::with_capacity(specs.len());
        for spec in specs {
            lines.push(VoucherLine {
                id: VoucherLineId(self.storage.next_id(IdKind::VoucherLine).await?),
                voucher_id,
                ledger_account_id: spec.account_id,
                debit: spec.debit,
                credit: spec.credit,
                subledger: spec.subledger,
                reference: spec.reference,
                instrument: spec.instrument,
                particulars: spec.particulars,
            });
        }

        let now = chrono::Utc::now().naive_utc();
        let post = draft.intent == PostingIntent::Post;
        let voucher = Voucher {
            id: voucher_id,
            voucher_no,
            voucher_type: draft.voucher_type,
            voucher_date: draft.voucher_date,
            fiscal_year_id: year.id,
            fiscal_period_id: period.id,
            branch_id: draft.branch_id,
            status: if post {
                VoucherStatus::Posted
            } else {
                VoucherStatus::Draft
            },
            narration: draft.narration.trim().to_string(),
            created_by: draft.created_by,
            approved_by: None,
            approved_at: None,
            posted_at: post.then_some(now),
            posting_id: post.then(Uuid::new_v4),
            lines,
            created_at: now,
            updated_at: now,
        };

        let staged = if post {
            self.accumulator
                .stage_voucher(&voucher, PostingDirection::Apply)
                .await?
        } else {
            StagedBalances::empty()
        };
        self.storage.insert_voucher(&voucher, staged.batch()).await?;
        drop(staged);

        info!(
            voucher_id = %voucher.id,
            voucher_no = %voucher.voucher_no,
            voucher_type = ?voucher.voucher_type,
            status = %voucher.status,
            fiscal_period_id = %voucher.fiscal_period_id,
            amount = %voucher.total_debits(),
            "Voucher submitted"
        );
        Ok(voucher)
    }

    /// DRAFT -> APPROVED
    pub async fn approve(&self, voucher_id: VoucherId, approved_by: i64) -> LedgerResult<Voucher> {
        let _lock = self.lock_voucher(voucher_id).await;

        let mut voucher = self.get_voucher_required(voucher_id).await?;
        Self::ensure_transition(&voucher, VoucherStatus::Approved)?;

        let now = chrono::Utc::now().naive_utc();
        voucher.status = VoucherStatus::Approved;
        voucher.approved_by = Some(approved_by);
        voucher.approved_at = Some(now);
        voucher.touch();
        self.storage.update_voucher(&voucher, &BalanceBatch::default()).await?;

        info!(voucher_id = %voucher_id, approved_by, "Voucher approved");
        Ok(voucher)
    }

    /// APPROVED -> POSTED. Period and accounts are checked again, since
    /// either may have changed since the voucher was drafted.
    pub async fn post_approved(&self, voucher_id: VoucherId) -> LedgerResult<Voucher> {
        let _lock = self.lock_voucher(voucher_id).await;
        let _gate = self.gate.read().await;

        let mut voucher = self.get_voucher_required(voucher_id).await?;
        Self::ensure_transition(&voucher, VoucherStatus::Posted)?;
        self.check_period(voucher.fiscal_period_id, voucher.voucher_date)
            .await?;
        self.check_accounts(voucher.lines.iter().map(|l| l.ledger_account_id))
            .await?;

        voucher.status = VoucherStatus::Posted;
        voucher.posted_at = Some(chrono::Utc::now().naive_utc());
        voucher.posting_id = Some(Uuid::new_v4());
        voucher.touch();

        let staged = self
            .accumulator
            .stage_voucher(&voucher, PostingDirection::Apply)
            .await?;
        self.storage.update_voucher(&voucher, staged.batch()).await?;
        drop(staged);

        info!(voucher_id = %voucher_id, voucher_no = %voucher.voucher_no, "Voucher posted");
        Ok(voucher)
    }

    /// Cancel a voucher. A posted voucher has its balance effect reversed,
    /// which requires its period to still be open.
    pub async fn cancel(&self, voucher_id: VoucherId) -> LedgerResult<Voucher> {
        let _lock = self.lock_voucher(voucher_id).await;
        let _gate = self.gate.read().await;

        let mut voucher = self.get_voucher_required(voucher_id).await?;
        Self::ensure_transition(&voucher, VoucherStatus::Cancelled)?;

        let staged = if voucher.is_posted() {
            self.check_period_open(voucher.fiscal_period_id).await?;
            self.accumulator
                .stage_voucher(&voucher, PostingDirection::Reverse)
                .await?
        } else {
            StagedBalances::empty()
        };

        let was = voucher.status;
        voucher.status = VoucherStatus::Cancelled;
        voucher.touch();
        self.storage.update_voucher(&voucher, staged.batch()).await?;
        drop(staged);

        info!(voucher_id = %voucher_id, from = %was, "Voucher cancelled");
        Ok(voucher)
    }

    /// Edit narration or date
    ///
    /// Posted vouchers are frozen unless `posting.allow_posted_edits` is on;
    /// cancelled vouchers are always frozen.
    pub async fn update(&self, voucher_id: VoucherId, update: VoucherUpdate) -> LedgerResult<Voucher> {
        let _lock = self.lock_voucher(voucher_id).await;

        let mut voucher = self.get_voucher_required(voucher_id).await?;
        match voucher.status {
            VoucherStatus::Cancelled => {
                return Err(LedgerError::InvalidState(format!(
                    "Voucher {} is cancelled",
                    voucher.voucher_no
                )))
            }
            VoucherStatus::Posted if !self.config.allow_posted_edits => {
                return Err(LedgerError::InvalidState(format!(
                    "Voucher {} is posted and cannot be edited",
                    voucher.voucher_no
                )))
            }
            _ => {}
        }

        if let Some(narration) = update.narration {
            validation::validate_narration(&narration)?;
            voucher.narration = narration.trim().to_string();
        }
        if let Some(voucher_date) = update.voucher_date {
            if self.config.require_date_in_period {
                let period = self.period_reference(voucher.fiscal_period_id).await?;
                Self::check_date(&period, voucher_date)?;
            }
            voucher.voucher_date = voucher_date;
        }
        voucher.touch();
        self.storage.update_voucher(&voucher, &BalanceBatch::default()).await?;

        info!(voucher_id = %voucher_id, "Voucher updated");
        Ok(voucher)
    }

    /// Delete a voucher with its lines
    ///
    /// Posted vouchers may only be deleted when `posting.allow_posted_deletion`
    /// is on; their balance effect is reversed in the same write.
    pub async fn delete(&self, voucher_id: VoucherId) -> LedgerResult<()> {
        let _lock = self.lock_voucher(voucher_id).await;
        let _gate = self.gate.read().await;

        let voucher = self.get_voucher_required(voucher_id).await?;
        let staged = if voucher.is_posted() {
            if !self.config.allow_posted_deletion {
                return Err(LedgerError::InvalidState(format!(
                    "Voucher {} is posted and cannot be deleted",
                    voucher.voucher_no
                )));
            }
            self.check_period_open(voucher.fiscal_period_id).await?;
            warn!(voucher_id = %voucher_id, voucher_no = %voucher.voucher_no, "Deleting posted voucher");
            self.accumulator
                .stage_voucher(&voucher, PostingDirection::Reverse)
                .await?
        } else {
            StagedBalances::empty()
        };

        self.storage.delete_voucher(voucher_id, staged.batch()).await?;
        drop(staged);

        info!(voucher_id = %voucher_id, voucher_no = %voucher.voucher_no, "Voucher deleted");
        Ok(())
    }

    pub async fn get_voucher(&self, voucher_id: VoucherId) -> LedgerResult<Option<Voucher>> {
        self.storage.get_voucher(voucher_id).await
    }

    pub async fn get_voucher_required(&self, voucher_id: VoucherId) -> LedgerResult<Voucher> {
        self.storage
            .get_voucher(voucher_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("voucher", voucher_id))
    }

    pub async fn find_by_no(&self, voucher_no: &str) -> LedgerResult<Option<Voucher>> {
        self.storage.find_voucher_by_no(voucher_no).await
    }

    pub async fn list_vouchers(&self, filter: &VoucherFilter) -> LedgerResult<Vec<Voucher>> {
        self.storage.list_vouchers(filter).await
    }

    fn ensure_transition(voucher: &Voucher, next: VoucherStatus) -> LedgerResult<()> {
        if voucher.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(LedgerError::InvalidState(format!(
                "Voucher {} cannot move from {} to {}",
                voucher.voucher_no, voucher.status, next
            )))
        }
    }

    async fn period_reference(&self, period_id: FiscalPeriodId) -> LedgerResult<FiscalPeriod> {
        self.storage
            .get_fiscal_period(period_id)
            .await?
            .ok_or_else(|| {
                LedgerError::invalid_reference(
                    "fiscal_period_id",
                    format!("fiscal period {} does not exist", period_id),
                )
            })
    }

    fn check_date(period: &FiscalPeriod, date: NaiveDate) -> LedgerResult<()> {
        if period.contains_date(date) {
            Ok(())
        } else {
            Err(LedgerError::invalid_range(
                "voucher_date",
                format!(
                    "{} is outside {} ({}..{})",
                    date, period.period_name, period.start_date, period.end_date
                ),
            ))
        }
    }

    /// The period must exist and be open, and so must its year
    async fn check_period(
        &self,
        period_id: FiscalPeriodId,
        voucher_date: NaiveDate,
    ) -> LedgerResult<(FiscalPeriod, FiscalYear)> {
        let period = self.period_reference(period_id).await?;
        let year = self
            .storage
            .get_fiscal_year(period.fiscal_year_id)
            .await?
            .ok_or_else(|| {
                LedgerError::invalid_reference(
                    "fiscal_period_id",
                    format!("fiscal year {} does not exist", period.fiscal_year_id),
                )
            })?;

        if !period.is_open || year.is_closed {
            return Err(LedgerError::PeriodClosed(period.id));
        }
        if self.config.require_date_in_period {
            Self::check_date(&period, voucher_date)?;
        }
        Ok((period, year))
    }

    async fn check_period_open(&self, period_id: FiscalPeriodId) -> LedgerResult<()> {
        let period = self.period_reference(period_id).await?;
        if !period.is_open {
            return Err(LedgerError::PeriodClosed(period_id));
        }
        Ok(())
    }

    /// Every referenced account must exist and be an active leaf
    async fn check_accounts(
        &self,
        account_ids: impl Iterator<Item = AccountId>,
    ) -> LedgerResult<()> {
        let unique: BTreeSet<AccountId> = account_ids.collect();
        for account_id in unique {
            let account = self.storage.get_account(account_id).await?.ok_or_else(|| {
                LedgerError::invalid_reference(
                    "rows",
                    format!("account {} does not exist", account_id),
                )
            })?;
            if !account.is_leaf {
                return Err(LedgerError::invalid_reference(
                    "rows",
                    format!("account {} is a group account", account.code),
                ));
            }
            if !account.is_active {
                return Err(LedgerError::invalid_reference(
                    "rows",
                    format!("account {} is inactive", account.code),
                ));
            }
        }
        Ok(())
    }
}

/// Builder for voucher drafts
#[derive(Debug, Clone)]
pub struct VoucherBuilder {
    draft: VoucherDraft,
    rows: Vec<JournalRow>,
    entry: Option<VoucherEntry>,
}

impl VoucherBuilder {
    /// Start a builder. Defaults: branch 0, created by 0, posted on submit.
    pub fn new(
        voucher_no: impl Into<String>,
        voucher_type: VoucherType,
        voucher_date: NaiveDate,
        fiscal_period_id: FiscalPeriodId,
    ) -> Self {
        Self {
            draft: VoucherDraft {
                voucher_no: voucher_no.into(),
                voucher_type,
                voucher_date,
                fiscal_period_id,
                branch_id: 0,
                narration: String::new(),
                created_by: 0,
                entry: VoucherEntry::Journal { rows: Vec::new() },
                intent: PostingIntent::Post,
            },
            rows: Vec::new(),
            entry: None,
        }
    }

    pub fn narration(mut self, narration: impl Into<String>) -> Self {
        self.draft.narration = narration.into();
        self
    }

    pub fn branch(mut self, branch_id: i64) -> Self {
        self.draft.branch_id = branch_id;
        self
    }

    pub fn created_by(mut self, user_id: i64) -> Self {
        self.draft.created_by = user_id;
        self
    }

    /// Store as DRAFT instead of posting
    pub fn as_draft(mut self) -> Self {
        self.draft.intent = PostingIntent::Draft;
        self
    }

    pub fn debit(mut self, account_id: AccountId, amount: BigDecimal) -> Self {
        self.rows.push(JournalRow::debit(account_id, amount));
        self
    }

    pub fn credit(mut self, account_id: AccountId, amount: BigDecimal) -> Self {
        self.rows.push(JournalRow::credit(account_id, amount));
        self
    }

    pub fn row(mut self, row: JournalRow) -> Self {
        self.rows.push(row);
        self
    }

    pub fn single(
        mut self,
        account_id: AccountId,
        amount: BigDecimal,
        cash_account_id: AccountId,
    ) -> Self {
        self.entry = Some(VoucherEntry::SingleSided {
            account_id,
            amount,
            cash_account_id,
        });
        self
    }

    pub fn transfer(
        mut self,
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: BigDecimal,
    ) -> Self {
        self.entry = Some(VoucherEntry::Transfer {
            from_account_id,
            to_account_id,
            amount,
        });
        self
    }

    pub fn build(self) -> LedgerResult<VoucherDraft> {
        let mut draft = self.draft;
        draft.entry = match (self.entry, self.rows.is_empty()) {
            (Some(entry), true) => entry,
            (None, _) => VoucherEntry::Journal { rows: self.rows },
            (Some(_), false) => {
                return Err(LedgerError::validation(
                    "rows",
                    "Journal rows cannot be combined with a single-sided or transfer entry",
                ))
            }
        };
        Ok(draft)
    }
}

/// Common voucher patterns
pub mod patterns {
    use super::*;

    /// Opening balance journal: debit `debit_account`, credit `credit_account`
    pub fn opening_balance(
        voucher_no: &str,
        date: NaiveDate,
        period_id: FiscalPeriodId,
        debit_account: AccountId,
        credit_account: AccountId,
        amount: BigDecimal,
    ) -> LedgerResult<VoucherDraft> {
        VoucherBuilder::new(voucher_no, VoucherType::Journal, date, period_id)
            .narration("Opening balance")
            .debit(debit_account, amount.clone())
            .credit(credit_account, amount)
            .build()
    }

    /// Cash received against `account_id` (debit cash)
    pub fn receipt(
        voucher_no: &str,
        date: NaiveDate,
        period_id: FiscalPeriodId,
        account_id: AccountId,
        cash_account_id: AccountId,
        amount: BigDecimal,
    ) -> LedgerResult<VoucherDraft> {
        VoucherBuilder::new(voucher_no, VoucherType::Receipt, date, period_id)
            .single(account_id, amount, cash_account_id)
            .build()
    }

    /// Cash paid out against `account_id` (credit cash)
    pub fn payment(
        voucher_no: &str,
        date: NaiveDate,
        period_id: FiscalPeriodId,
        account_id: AccountId,
        cash_account_id: AccountId,
        amount: BigDecimal,
    ) -> LedgerResult<VoucherDraft> {
        VoucherBuilder::new(voucher_no, VoucherType::Payment, date, period_id)
            .single(account_id, amount, cash_account_id)
            .build()
    }

    /// Contra transfer, e.g. cash deposited at the bank
    pub fn transfer(
        voucher_no: &str,
        date: NaiveDate,
        period_id: FiscalPeriodId,
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: BigDecimal,
    ) -> LedgerResult<VoucherDraft> {
        VoucherBuilder::new(voucher_no, VoucherType::Contra, date, period_id)
            .transfer(from_account_id, to_account_id, amount)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;

    fn amount(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).unwrap()
    }

    fn journal(rows: Vec<JournalRow>) -> VoucherEntry {
        VoucherEntry::Journal { rows }
    }

    #[test]
    fn test_receipt_debits_cash() {
        let entry = VoucherEntry::SingleSided {
            account_id: AccountId(7),
            amount: amount("250"),
            cash_account_id: AccountId(1),
        };
        let lines = expand_entry(VoucherType::Receipt, &entry, &PostingConfig::default()).unwrap();

        assert_eq!(lines[0].account_id, AccountId(1));
        assert_eq!(lines[0].debit, amount("250"));
        assert_eq!(lines[1].account_id, AccountId(7));
        assert_eq!(lines[1].credit, amount("250"));
    }

    #[test]
    fn test_payment_credits_cash() {
        let entry = VoucherEntry::SingleSided {
            account_id: AccountId(7),
            amount: amount("90"),
            cash_account_id: AccountId(1),
        };
        let lines =
            expand_entry(VoucherType::PettyCash, &entry, &PostingConfig::default()).unwrap();

        assert_eq!(lines[0].account_id, AccountId(7));
        assert_eq!(lines[1].account_id, AccountId(1));
        assert_eq!(lines[1].credit, amount("90"));
    }

    #[test]
    fn test_transfer_debits_destination() {
        let entry = VoucherEntry::Transfer {
            from_account_id: AccountId(1),
            to_account_id: AccountId(2),
            amount: amount("1000"),
        };
        let lines = expand_entry(VoucherType::Contra, &entry, &PostingConfig::default()).unwrap();
        assert_eq!(lines[0].account_id, AccountId(2));
        assert_eq!(lines[0].debit, amount("1000"));
        assert_eq!(lines[1].account_id, AccountId(1));
    }

    #[rstest]
    #[case::shape_mismatch(
        VoucherType::Receipt,
        journal(vec![JournalRow::debit(AccountId(1), amount("5")), JournalRow::credit(AccountId(2), amount("5"))]),
        "voucher_type"
    )]
    #[case::zero_amount(
        VoucherType::Payment,
        VoucherEntry::SingleSided { account_id: AccountId(2), amount: amount("0"), cash_account_id: AccountId(1) },
        "amount"
    )]
    #[case::same_cash_account(
        VoucherType::Receipt,
        VoucherEntry::SingleSided { account_id: AccountId(1), amount: amount("5"), cash_account_id: AccountId(1) },
        "cash_account_id"
    )]
    #[case::transfer_to_self(
        VoucherType::Contra,
        VoucherEntry::Transfer { from_account_id: AccountId(1), to_account_id: AccountId(1), amount: amount("5") },
        "to_account_id"
    )]
    #[case::single_row_journal(
        VoucherType::Journal,
        journal(vec![JournalRow::debit(AccountId(1), amount("5"))]),
        "rows"
    )]
    #[case::negative_debit(
        VoucherType::Journal,
        journal(vec![JournalRow::debit(AccountId(1), amount("-5")), JournalRow::credit(AccountId(2), amount("-5"))]),
        "debit"
    )]
    #[case::sub_cent_amount(
        VoucherType::Sale,
        journal(vec![JournalRow::debit(AccountId(1), amount("5.001")), JournalRow::credit(AccountId(2), amount("5.001"))]),
        "debit"
    )]
    #[case::both_sides_on_one_row(
        VoucherType::Journal,
        journal(vec![
            JournalRow { credit: amount("5"), ..JournalRow::debit(AccountId(1), amount("5")) },
            JournalRow::credit(AccountId(2), amount("5")),
        ]),
        "rows"
    )]
    #[case::unbalanced(
        VoucherType::Journal,
        journal(vec![JournalRow::debit(AccountId(1), amount("100")), JournalRow::credit(AccountId(2), amount("90"))]),
        "rows"
    )]
    fn test_entry_rejected(
        #[case] voucher_type: VoucherType,
        #[case] entry: VoucherEntry,
        #[case] field: &str,
    ) {
        let err = expand_entry(voucher_type, &entry, &PostingConfig::default()).unwrap_err();
        assert_eq!(err.field(), Some(field), "unexpected error: {err}");
    }

    #[test]
    fn test_two_sided_rows_allowed_when_relaxed() {
        let config = PostingConfig {
            enforce_single_sided_lines: false,
            ..PostingConfig::default()
        };
        let entry = journal(vec![
            JournalRow {
                credit: amount("2"),
                ..JournalRow::debit(AccountId(1), amount("5"))
            },
            JournalRow::credit(AccountId(2), amount("3")),
        ]);
        assert!(expand_entry(VoucherType::Journal, &entry, &config).is_ok());
    }

    #[test]
    fn test_builder_rejects_mixed_entries() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let result = VoucherBuilder::new("JV-1", VoucherType::Contra, date, FiscalPeriodId(1))
            .transfer(AccountId(1), AccountId(2), amount("10"))
            .debit(AccountId(3), amount("10"))
            .build();
        assert!(result.is_err());

        let draft = patterns::receipt("RV-1", date, FiscalPeriodId(1), AccountId(4), AccountId(1), amount("10"))
            .unwrap();
        assert_eq!(draft.entry.shape(), VoucherShape::SingleSided);
        assert_eq!(draft.intent, PostingIntent::Post);
    }

    #[test]
    fn test_draft_wire_shape() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let draft = patterns::transfer("CV-1", date, FiscalPeriodId(1), AccountId(1), AccountId(2), amount("10"))
            .unwrap();
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["voucher_type"], "contra");
        assert_eq!(json["entry"]["shape"], "transfer");
        assert_eq!(json["entry"]["from_account_id"], 1);
    }

    #[tokio::test]
    async fn test_voucher_locks_released_after_each_operation() {
        use crate::ledger::fiscal::utils::create_monthly_year;
        use crate::ledger::Ledger;
        use crate::utils::MemoryStorage;

        let date = |m, d| NaiveDate::from_ymd_opt(2024, m, d).unwrap();
        let ledger = Ledger::new(MemoryStorage::new());
        let cash = ledger
            .create_account(NewAccount::new("1111", "Cash", AccountType::Asset))
            .await
            .unwrap()
            .id;
        let capital = ledger
            .create_account(NewAccount::new("3100", "Capital", AccountType::Equity))
            .await
            .unwrap()
            .id;
        let (year, periods) = create_monthly_year(ledger.calendar(), "FY2024", date(1, 1), date(12, 31))
            .await
            .unwrap();
        ledger.activate_fiscal_year(year.id).await.unwrap();

        for n in 0..5 {
            let draft = patterns::receipt(&format!("RV-{n}"), date(1, 5), periods[0].id, capital, cash, amount("100"))
                .unwrap();
            let voucher = ledger.post_voucher(draft).await.unwrap();
            ledger.cancel_voucher(voucher.id).await.unwrap();
            let rejected = ledger
                .update_voucher(
                    voucher.id,
                    VoucherUpdate {
                        narration: Some("late edit".to_string()),
                        voucher_date: None,
                    },
                )
                .await;
            assert!(matches!(rejected, Err(LedgerError::InvalidState(_))));
        }

        assert!(ledger.vouchers().voucher_locks.is_empty());
    }
}
