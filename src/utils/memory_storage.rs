//! In-memory storage implementation for testing and development

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::traits::*;
use crate::types::*;

#[derive(Debug, Default)]
struct Tables {
    accounts: BTreeMap<AccountId, LedgerAccount>,
    fiscal_years: BTreeMap<FiscalYearId, FiscalYear>,
    fiscal_periods: BTreeMap<FiscalPeriodId, FiscalPeriod>,
    vouchers: BTreeMap<VoucherId, Voucher>,
    balances: HashMap<(AccountId, FiscalPeriodId), AccountBalance>,
    applied: HashSet<AppliedPosting>,
}

impl Tables {
    fn code_taken(&self, code: &str, except: Option<AccountId>) -> bool {
        self.accounts
            .values()
            .any(|a| a.code == code && Some(a.id) != except)
    }

    fn voucher_no_taken(&self, voucher_no: &str, except: Option<VoucherId>) -> bool {
        self.vouchers
            .values()
            .any(|v| v.voucher_no == voucher_no && Some(v.id) != except)
    }

    fn write_batch(&mut self, batch: &BalanceBatch) {
        for balance in &batch.rows {
            self.balances.insert(
                (balance.ledger_account_id, balance.fiscal_period_id),
                balance.clone(),
            );
        }
        self.applied.extend(batch.postings.iter().copied());
    }
}

/// In-memory storage for tests, demos and single-process tools.
///
/// All tables sit behind one lock so every batch write is atomic.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    tables: Arc<RwLock<Tables>>,
    sequences: Arc<[AtomicI64; 6]>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
            sequences: Arc::new(Default::default()),
        }
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> LedgerResult<()> {
        *self.write()? = Tables::default();
        Ok(())
    }

    /// Overwrite an account without any checks. Lets tests plant corrupt
    /// rows that the chart of accounts itself would never write.
    pub fn force_account(&self, account: LedgerAccount) -> LedgerResult<()> {
        self.write()?.accounts.insert(account.id, account);
        Ok(())
    }

    fn read(&self) -> LedgerResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| LedgerError::Storage("memory storage lock poisoned".to_string()))
    }

    fn write(&self) -> LedgerResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| LedgerError::Storage("memory storage lock poisoned".to_string()))
    }

    fn sequence(&self, kind: IdKind) -> &AtomicI64 {
        let slot = match kind {
            IdKind::Account => 0,
            IdKind::FiscalYear => 1,
            IdKind::FiscalPeriod => 2,
            IdKind::Voucher => 3,
            IdKind::VoucherLine => 4,
            IdKind::Balance => 5,
        };
        &self.sequences[slot]
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStorage for MemoryStorage {
    async fn next_id(&self, kind: IdKind) -> LedgerResult<i64> {
        Ok(self.sequence(kind).fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn commit_accounts(&self, changes: AccountChangeSet) -> LedgerResult<()> {
        let mut tables = self.write()?;

        if let Some(ref account) = changes.insert {
            if tables.code_taken(&account.code, None) {
                return Err(LedgerError::DuplicateCode(account.code.clone()));
            }
        }
        for account in &changes.update {
            if !tables.accounts.contains_key(&account.id) {
                return Err(LedgerError::not_found("account", account.id));
            }
            if tables.code_taken(&account.code, Some(account.id)) {
                return Err(LedgerError::DuplicateCode(account.code.clone()));
            }
        }
        if let Some(account_id) = changes.delete {
            if !tables.accounts.contains_key(&account_id) {
                return Err(LedgerError::not_found("account", account_id));
            }
        }

        if let Some(account_id) = changes.delete {
            tables.accounts.remove(&account_id);
            tables.balances.retain(|(id, _), _| *id != account_id);
        }
        for account in changes.update {
            tables.accounts.insert(account.id, account);
        }
        if let Some(account) = changes.insert {
            tables.accounts.insert(account.id, account);
        }
        Ok(())
    }

    async fn get_account(&self, account_id: AccountId) -> LedgerResult<Option<LedgerAccount>> {
        Ok(self.read()?.accounts.get(&account_id).cloned())
    }

    async fn find_account_by_code(&self, code: &str) -> LedgerResult<Option<LedgerAccount>> {
        Ok(self
            .read()?
            .accounts
            .values()
            .find(|account| account.code == code)
            .cloned())
    }

    async fn list_accounts(
        &self,
        account_type: Option<AccountType>,
    ) -> LedgerResult<Vec<LedgerAccount>> {
        let tables = self.read()?;
        let mut accounts: Vec<LedgerAccount> = tables
            .accounts
            .values()
            .filter(|account| account_type.is_none_or(|t| account.account_type == t))
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(accounts)
    }

    async fn account_in_use(&self, account_id: AccountId) -> LedgerResult<bool> {
        Ok(self
            .read()?
            .vouchers
            .values()
            .any(|voucher| voucher.references_account(account_id)))
    }

    async fn insert_fiscal_year(&self, year: &FiscalYear) -> LedgerResult<()> {
        let mut tables = self.write()?;
        if tables.fiscal_years.values().any(|y| y.code == year.code) {
            return Err(LedgerError::DuplicateCode(year.code.clone()));
        }
        tables.fiscal_years.insert(year.id, year.clone());
        Ok(())
    }

    async fn get_fiscal_year(&self, year_id: FiscalYearId) -> LedgerResult<Option<FiscalYear>> {
        Ok(self.read()?.fiscal_years.get(&year_id).cloned())
    }

    async fn list_fiscal_years(&self) -> LedgerResult<Vec<FiscalYear>> {
        let mut years: Vec<FiscalYear> = self.read()?.fiscal_years.values().cloned().collect();
        years.sort_by_key(|y| (y.start_date, y.id));
        Ok(years)
    }

    async fn update_fiscal_years(&self, years: &[FiscalYear]) -> LedgerResult<()> {
        let mut tables = self.write()?;
        if let Some(missing) = years
            .iter()
            .find(|y| !tables.fiscal_years.contains_key(&y.id))
        {
            return Err(LedgerError::not_found("fiscal year", missing.id));
        }
        for year in years {
            tables.fiscal_years.insert(year.id, year.clone());
        }
        Ok(())
    }

    async fn insert_fiscal_period(&self, period: &FiscalPeriod) -> LedgerResult<()> {
        self.write()?
            .fiscal_periods
            .insert(period.id, period.clone());
        Ok(())
    }

    async fn get_fiscal_period(
        &self,
        period_id: FiscalPeriodId,
    ) -> LedgerResult<Option<FiscalPeriod>> {
        Ok(self.read()?.fiscal_periods.get(&period_id).cloned())
    }

    async fn list_fiscal_periods(
        &self,
        year_id: Option<FiscalYearId>,
    ) -> LedgerResult<Vec<FiscalPeriod>> {
        let mut periods: Vec<FiscalPeriod> = self
            .read()?
            .fiscal_periods
            .values()
            .filter(|p| year_id.is_none_or(|y| p.fiscal_year_id == y))
            .cloned()
            .collect();
        periods.sort_by_key(|p| (p.start_date, p.id));
        Ok(periods)
    }

    async fn update_fiscal_periods(&self, periods: &[FiscalPeriod]) -> LedgerResult<()> {
        let mut tables = self.write()?;
        if let Some(missing) = periods
            .iter()
            .find(|p| !tables.fiscal_periods.contains_key(&p.id))
        {
            return Err(LedgerError::not_found("fiscal period", missing.id));
        }
        for period in periods {
            tables.fiscal_periods.insert(period.id, period.clone());
        }
        Ok(())
    }

    async fn insert_voucher(&self, voucher: &Voucher, balances: &BalanceBatch) -> LedgerResult<()> {
        let mut tables = self.write()?;
        if tables.voucher_no_taken(&voucher.voucher_no, None) {
            return Err(LedgerError::DuplicateVoucher(voucher.voucher_no.clone()));
        }
        tables.vouchers.insert(voucher.id, voucher.clone());
        tables.write_batch(balances);
        Ok(())
    }

    async fn update_voucher(&self, voucher: &Voucher, balances: &BalanceBatch) -> LedgerResult<()> {
        let mut tables = self.write()?;
        if !tables.vouchers.contains_key(&voucher.id) {
            return Err(LedgerError::not_found("voucher", voucher.id));
        }
        if tables.voucher_no_taken(&voucher.voucher_no, Some(voucher.id)) {
            return Err(LedgerError::DuplicateVoucher(voucher.voucher_no.clone()));
        }
        tables.vouchers.insert(voucher.id, voucher.clone());
        tables.write_batch(balances);
        Ok(())
    }

    async fn delete_voucher(
        &self,
        voucher_id: VoucherId,
        balances: &BalanceBatch,
    ) -> LedgerResult<()> {
        let mut tables = self.write()?;
        let Some(voucher) = tables.vouchers.remove(&voucher_id) else {
            return Err(LedgerError::not_found("voucher", voucher_id));
        };
        tables.write_batch(balances);
        if let Some(posting_id) = voucher.posting_id {
            tables.applied.retain(|p| p.posting_id != posting_id);
        }
        Ok(())
    }

    async fn get_voucher(&self, voucher_id: VoucherId) -> LedgerResult<Option<Voucher>> {
        Ok(self.read()?.vouchers.get(&voucher_id).cloned())
    }

    async fn find_voucher_by_no(&self, voucher_no: &str) -> LedgerResult<Option<Voucher>> {
        Ok(self
            .read()?
            .vouchers
            .values()
            .find(|v| v.voucher_no == voucher_no)
            .cloned())
    }

    async fn list_vouchers(&self, filter: &VoucherFilter) -> LedgerResult<Vec<Voucher>> {
        let mut vouchers: Vec<Voucher> = self
            .read()?
            .vouchers
            .values()
            .filter(|v| filter.matches(v))
            .cloned()
            .collect();
        vouchers.sort_by(|a, b| {
            (a.voucher_date, &a.voucher_no).cmp(&(b.voucher_date, &b.voucher_no))
        });
        Ok(vouchers)
    }

    async fn get_balance(
        &self,
        account_id: AccountId,
        period_id: FiscalPeriodId,
    ) -> LedgerResult<Option<AccountBalance>> {
        Ok(self
            .read()?
            .balances
            .get(&(account_id, period_id))
            .cloned())
    }

    async fn save_balances(&self, balances: &BalanceBatch) -> LedgerResult<()> {
        self.write()?.write_batch(balances);
        Ok(())
    }

    async fn posting_applied(&self, posting: &AppliedPosting) -> LedgerResult<bool> {
        Ok(self.read()?.applied.contains(posting))
    }

    async fn list_balances(
        &self,
        account_id: Option<AccountId>,
    ) -> LedgerResult<Vec<AccountBalance>> {
        let mut balances: Vec<AccountBalance> = self
            .read()?
            .balances
            .values()
            .filter(|b| account_id.is_none_or(|a| b.ledger_account_id == a))
            .cloned()
            .collect();
        balances.sort_by_key(|b| (b.ledger_account_id, b.fiscal_period_id));
        Ok(balances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: i64, code: &str) -> LedgerAccount {
        LedgerAccount::new(
            AccountId(id),
            &NewAccount::new(code, format!("Account {code}"), AccountType::Asset),
        )
    }

    #[tokio::test]
    async fn test_ids_are_sequential_per_kind() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.next_id(IdKind::Account).await.unwrap(), 1);
        assert_eq!(storage.next_id(IdKind::Account).await.unwrap(), 2);
        assert_eq!(storage.next_id(IdKind::Voucher).await.unwrap(), 1);

        let copy = storage.clone();
        assert_eq!(copy.next_id(IdKind::Account).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_commit_accounts_is_all_or_nothing() {
        let storage = MemoryStorage::new();
        storage
            .commit_accounts(AccountChangeSet {
                insert: Some(account(1, "1000")),
                ..Default::default()
            })
            .await
            .unwrap();

        let mut renamed = account(1, "1000");
        renamed.name = "Renamed".to_string();
        let result = storage
            .commit_accounts(AccountChangeSet {
                insert: Some(account(2, "1000")),
                update: vec![renamed],
                delete: None,
            })
            .await;

        assert!(matches!(result, Err(LedgerError::DuplicateCode(_))));
        let stored = storage.get_account(AccountId(1)).await.unwrap().unwrap();
        assert_eq!(stored.name, "Account 1000");
        assert!(storage.get_account(AccountId(2)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_accounts_listed_by_code() {
        let storage = MemoryStorage::new();
        for (id, code) in [(1, "3100"), (2, "1111"), (3, "2000")] {
            storage
                .commit_accounts(AccountChangeSet {
                    insert: Some(account(id, code)),
                    ..Default::default()
                })
                .await
                .unwrap();
        }

        let codes: Vec<String> = storage
            .list_accounts(None)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.code)
            .collect();
        assert_eq!(codes, vec!["1111", "2000", "3100"]);
    }
}
