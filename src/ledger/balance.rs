//! Cached per-account, per-period balances

use bigdecimal::BigDecimal;
use dashmap::DashMap;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::traits::*;
use crate::types::*;

/// Debit and credit movement of one account within a posting
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BalanceDelta {
    pub debit: BigDecimal,
    pub credit: BigDecimal,
}

impl BalanceDelta {
    pub fn new(debit: BigDecimal, credit: BigDecimal) -> Self {
        Self { debit, credit }
    }

    pub fn negated(&self) -> Self {
        Self {
            debit: -&self.debit,
            credit: -&self.credit,
        }
    }

    /// Movement in the account type's normal direction
    pub fn net(&self, account_type: AccountType) -> BigDecimal {
        account_type.signed(&self.debit, &self.credit)
    }
}

/// Sum voucher lines per account, in account id order
pub fn compute_deltas(lines: &[VoucherLine]) -> BTreeMap<AccountId, BalanceDelta> {
    let mut deltas: BTreeMap<AccountId, BalanceDelta> = BTreeMap::new();
    for line in lines {
        let delta = deltas.entry(line.ledger_account_id).or_default();
        delta.debit = &delta.debit + &line.debit;
        delta.credit = &delta.credit + &line.credit;
    }
    deltas
}

/// Balance rows computed for a posting, with the account locks that keep
/// them valid until they are written.
pub struct StagedBalances {
    batch: BalanceBatch,
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl StagedBalances {
    pub fn empty() -> Self {
        Self {
            batch: BalanceBatch::default(),
            _guards: Vec::new(),
        }
    }

    pub fn rows(&self) -> &[AccountBalance] {
        &self.batch.rows
    }

    pub fn batch(&self) -> &BalanceBatch {
        &self.batch
    }

    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }
}

/// Maintains the `AccountBalance` cache
///
/// Each account has its own async mutex. A posting locks every account it
/// touches in ascending id order, reads the current rows, stages the new
/// ones and keeps the locks until the caller has committed them. Postings
/// over disjoint accounts never wait on each other.
pub struct BalanceAccumulator<S: LedgerStorage> {
    storage: S,
    locks: DashMap<AccountId, Arc<Mutex<()>>>,
}

impl<S: LedgerStorage> BalanceAccumulator<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            locks: DashMap::new(),
        }
    }

    fn account_lock(&self, account_id: AccountId) -> Arc<Mutex<()>> {
        self.locks.entry(account_id).or_default().value().clone()
    }

    /// Lock accounts in ascending order so concurrent postings cannot deadlock
    pub async fn lock_accounts(
        &self,
        account_ids: impl IntoIterator<Item = AccountId>,
    ) -> Vec<OwnedMutexGuard<()>> {
        let ordered: BTreeSet<AccountId> = account_ids.into_iter().collect();
        let mut guards = Vec::with_capacity(ordered.len());
        for account_id in ordered {
            guards.push(self.account_lock(account_id).lock_owned().await);
        }
        guards
    }

    /// Stage the balance effect of a posted voucher.
    ///
    /// `Reverse` stages the negated deltas. Accounts the posting key was
    /// already applied to are skipped, which makes retries harmless.
    pub async fn stage_voucher(
        &self,
        voucher: &Voucher,
        direction: PostingDirection,
    ) -> LedgerResult<StagedBalances> {
        let posting_id = voucher.posting_id.ok_or_else(|| {
            LedgerError::InvalidState(format!(
                "Voucher {} has no posting id",
                voucher.voucher_no
            ))
        })?;
        let key = PostingKey {
            posting_id,
            direction,
        };

        let deltas = compute_deltas(&voucher.lines);
        let guards = self.lock_accounts(deltas.keys().copied()).await;
        let calendar = PeriodOrder::load(&self.storage, voucher.fiscal_period_id).await?;

        let mut batch = BalanceBatch::default();
        for (account_id, delta) in &deltas {
            let delta = match direction {
                PostingDirection::Apply => delta.clone(),
                PostingDirection::Reverse => delta.negated(),
            };
            let rows = self.stage_account(key, *account_id, &delta, &calendar).await?;
            if !rows.is_empty() {
                batch.rows.extend(rows);
                batch.postings.push(key.for_account(*account_id));
            }
        }

        Ok(StagedBalances {
            batch,
            _guards: guards,
        })
    }

    /// Apply one account's movement for a posting and write it immediately.
    /// Returns `false` when the posting had already been applied.
    pub async fn apply_posting(
        &self,
        key: PostingKey,
        account_id: AccountId,
        period_id: FiscalPeriodId,
        debit: BigDecimal,
        credit: BigDecimal,
    ) -> LedgerResult<bool> {
        let _guards = self.lock_accounts([account_id]).await;
        let calendar = PeriodOrder::load(&self.storage, period_id).await?;
        let rows = self
            .stage_account(key, account_id, &BalanceDelta::new(debit, credit), &calendar)
            .await?;
        if rows.is_empty() {
            return Ok(false);
        }
        let batch = BalanceBatch {
            rows,
            postings: vec![key.for_account(account_id)],
        };
        self.storage.save_balances(&batch).await?;
        Ok(true)
    }

    async fn stage_account(
        &self,
        key: PostingKey,
        account_id: AccountId,
        delta: &BalanceDelta,
        calendar: &PeriodOrder,
    ) -> LedgerResult<Vec<AccountBalance>> {
        let account = self
            .storage
            .get_account(account_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("account", account_id))?;
        let account_type = account.account_type;
        let target = &calendar.target;

        if self
            .storage
            .posting_applied(&key.for_account(account_id))
            .await?
        {
            debug!(
                account_id = %account_id,
                fiscal_period_id = %target.id,
                posting_id = %key.posting_id,
                "Posting already applied, skipping"
            );
            return Ok(Vec::new());
        }

        let mut existing: HashMap<FiscalPeriodId, AccountBalance> = self
            .storage
            .list_balances(Some(account_id))
            .await?
            .into_iter()
            .map(|row| (row.fiscal_period_id, row))
            .collect();

        let mut row = match existing.remove(&target.id) {
            Some(row) => row,
            None => {
                let opening = calendar
                    .earlier(account_type)
                    .filter_map(|period| existing.get(&period.id))
                    .last()
                    .map(|prior| prior.closing_balance.clone())
                    .unwrap_or_else(|| BigDecimal::from(0));
                let id = BalanceId(self.storage.next_id(IdKind::Balance).await?);
                AccountBalance::new(id, account_id, target.id, opening)
            }
        };

        row.debit_total = &row.debit_total + &delta.debit;
        row.credit_total = &row.credit_total + &delta.credit;
        row.recompute_closing(account_type);

        debug!(
            account_id = %account_id,
            fiscal_period_id = %target.id,
            direction = ?key.direction,
            closing = %row.closing_balance,
            "Staged balance row"
        );

        let mut staged = vec![row];
        let net = delta.net(account_type);
        if net != BigDecimal::from(0) {
            for period in calendar.later(account_type) {
                if let Some(mut later) = existing.remove(&period.id) {
                    later.opening_balance = &later.opening_balance + &net;
                    later.closing_balance = &later.closing_balance + &net;
                    staged.push(later);
                }
            }
        }
        Ok(staged)
    }

    pub async fn get_balance(
        &self,
        account_id: AccountId,
        period_id: FiscalPeriodId,
    ) -> LedgerResult<Option<AccountBalance>> {
        self.storage.get_balance(account_id, period_id).await
    }

    pub async fn list_balances(
        &self,
        account_id: Option<AccountId>,
    ) -> LedgerResult<Vec<AccountBalance>> {
        self.storage.list_balances(account_id).await
    }
}

/// Chronological view of all periods relative to one target period.
///
/// Real accounts see every period as a predecessor or successor. Nominal
/// accounts only see periods of the target's fiscal year, so they open each
/// year at zero.
struct PeriodOrder {
    target: FiscalPeriod,
    periods: Vec<FiscalPeriod>,
}

impl PeriodOrder {
    async fn load<S: LedgerStorage>(storage: &S, period_id: FiscalPeriodId) -> LedgerResult<Self> {
        let periods = storage.list_fiscal_periods(None).await?;
        let target = periods
            .iter()
            .find(|p| p.id == period_id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("fiscal period", period_id))?;
        Ok(Self { target, periods })
    }

    fn in_scope(&self, account_type: AccountType, period: &FiscalPeriod) -> bool {
        account_type.is_real() || period.fiscal_year_id == self.target.fiscal_year_id
    }

    fn position(period: &FiscalPeriod) -> (chrono::NaiveDate, FiscalPeriodId) {
        (period.start_date, period.id)
    }

    /// In-scope periods before the target, oldest first
    fn earlier(&self, account_type: AccountType) -> impl Iterator<Item = &FiscalPeriod> + '_ {
        let target = Self::position(&self.target);
        self.periods
            .iter()
            .filter(move |p| Self::position(p) < target && self.in_scope(account_type, p))
    }

    /// In-scope periods after the target, oldest first
    fn later(&self, account_type: AccountType) -> impl Iterator<Item = &FiscalPeriod> + '_ {
        let target = Self::position(&self.target);
        self.periods
            .iter()
            .filter(move |p| Self::position(p) > target && self.in_scope(account_type, p))
    }
}
