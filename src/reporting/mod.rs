//! Financial reports projected from posted voucher lines
//!
//! Every report is a pure read: it loads the posted vouchers in scope and
//! aggregates their lines. The `AccountBalance` cache is never consulted,
//! which is what makes it checkable against these projections.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::config::ReportingConfig;
use crate::traits::*;
use crate::types::*;

/// Scope of a report. Both fields `None` covers every fiscal year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFilter {
    pub fiscal_year_id: Option<FiscalYearId>,
    pub fiscal_period_id: Option<FiscalPeriodId>,
}

impl ReportFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_year(fiscal_year_id: FiscalYearId) -> Self {
        Self {
            fiscal_year_id: Some(fiscal_year_id),
            fiscal_period_id: None,
        }
    }

    pub fn for_period(fiscal_period_id: FiscalPeriodId) -> Self {
        Self {
            fiscal_year_id: None,
            fiscal_period_id: Some(fiscal_period_id),
        }
    }

    fn includes(&self, period: &FiscalPeriod) -> bool {
        self.fiscal_year_id.is_none_or(|y| period.fiscal_year_id == y)
            && self.fiscal_period_id.is_none_or(|p| period.id == p)
    }
}

/// Trial balance line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    /// Fiscal year the row is scoped to, `None` when unscoped
    pub fiscal_year_id: Option<FiscalYearId>,
    /// Fiscal period the row is scoped to, `None` for a whole year or more
    pub fiscal_period_id: Option<FiscalPeriodId>,
    pub account_id: AccountId,
    pub account_code: String,
    pub account_name: String,
    pub account_type: AccountType,
    /// Sum of posted debits in scope
    pub total_debit: BigDecimal,
    /// Sum of posted credits in scope
    pub total_credit: BigDecimal,
    /// Movement in the account type's normal direction
    pub balance: BigDecimal,
}

/// Trial balance for one report scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalance {
    /// Fiscal year the report is scoped to
    pub fiscal_year_id: Option<FiscalYearId>,
    /// Fiscal period the report is scoped to
    pub fiscal_period_id: Option<FiscalPeriodId>,
    /// One row per active leaf account, ordered by code
    pub rows: Vec<TrialBalanceRow>,
    /// Total debits across all rows
    pub total_debit: BigDecimal,
    /// Total credits across all rows
    pub total_credit: BigDecimal,
    /// Whether total debits equal total credits
    pub is_balanced: bool,
}

/// Income or expense amount of one account in one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitAndLossRow {
    pub fiscal_period_id: FiscalPeriodId,
    /// Name of the fiscal period, e.g. "2024-07"
    pub period_name: String,
    pub account_id: AccountId,
    pub account_code: String,
    pub account_name: String,
    /// `Income` or `Expense`
    pub account_type: AccountType,
    /// Movement in the account type's normal direction
    pub amount: BigDecimal,
}

/// Profit and loss over the report scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitAndLoss {
    /// Rows ordered by period, then income before expense, then code
    pub rows: Vec<ProfitAndLossRow>,
    /// Sum of income amounts
    pub total_income: BigDecimal,
    /// Sum of expense amounts
    pub total_expense: BigDecimal,
    /// Income less expense
    pub net_profit: BigDecimal,
}

/// Cumulative balance of one asset, liability or equity account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheetRow {
    /// Fiscal year of the section holding this row
    pub fiscal_year_id: FiscalYearId,
    pub account_id: AccountId,
    pub account_code: String,
    pub account_name: String,
    pub account_type: AccountType,
    /// Cumulative balance in the account type's normal direction
    pub balance: BigDecimal,
}

/// Balance sheet of one fiscal year, as of its end (or the end of the
/// filtered period)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheetSection {
    pub fiscal_year_id: FiscalYearId,
    pub fiscal_year_code: String,
    /// Date the balances are taken at
    pub as_of: NaiveDate,
    /// Accounts with activity, assets first, then by code
    pub rows: Vec<BalanceSheetRow>,
    pub total_assets: BigDecimal,
    pub total_liabilities: BigDecimal,
    pub total_equity: BigDecimal,
    /// Unclosed surplus of earlier fiscal years
    pub retained_earnings: BigDecimal,
    /// Surplus of this fiscal year up to `as_of`
    pub current_earnings: BigDecimal,
    /// Assets equal liabilities plus equity plus earnings
    pub is_balanced: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheet {
    /// One section per fiscal year in scope
    pub sections: Vec<BalanceSheetSection>,
}

/// Movement of the designated cash accounts in one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowRow {
    pub fiscal_period_id: FiscalPeriodId,
    pub period_name: String,
    /// Cash held at the start of the period
    pub opening_cash: BigDecimal,
    /// Sum of vouchers that increased cash
    pub inflow: BigDecimal,
    /// Sum of vouchers that decreased cash, as a positive amount
    pub outflow: BigDecimal,
    /// Inflow less outflow
    pub net_change: BigDecimal,
    /// Cash held at the end of the period
    pub closing_cash: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowStatement {
    /// One row per period in scope
    pub rows: Vec<CashFlowRow>,
    pub total_inflow: BigDecimal,
    pub total_outflow: BigDecimal,
}

/// Movement of one equity account in one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityStatementRow {
    pub fiscal_period_id: FiscalPeriodId,
    pub period_name: String,
    pub account_id: AccountId,
    pub account_code: String,
    pub account_name: String,
    /// Balance carried in from earlier periods
    pub opening: BigDecimal,
    /// Credits posted in the period
    pub additions: BigDecimal,
    /// Debits posted in the period
    pub deductions: BigDecimal,
    /// Opening plus additions less deductions
    pub closing: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityStatement {
    /// Rows ordered by account code, then period; quiet periods are skipped
    pub rows: Vec<EquityStatementRow>,
}

#[derive(Debug, Clone, Default)]
struct Totals {
    debit: BigDecimal,
    credit: BigDecimal,
}

impl Totals {
    fn add(&mut self, debit: &BigDecimal, credit: &BigDecimal) {
        self.debit = &self.debit + debit;
        self.credit = &self.credit + credit;
    }
}

/// Everything a report needs, loaded once
struct Snapshot {
    accounts: Vec<LedgerAccount>,
    account_index: HashMap<AccountId, usize>,
    years: Vec<FiscalYear>,
    /// All periods ordered by start date
    periods: Vec<FiscalPeriod>,
    /// Posted line totals keyed by (period, account)
    totals: BTreeMap<(FiscalPeriodId, AccountId), Totals>,
    /// Net cash movement per posted voucher, keyed by period
    cash_moves: BTreeMap<FiscalPeriodId, Vec<BigDecimal>>,
}

impl Snapshot {
    fn account(&self, account_id: AccountId) -> Option<&LedgerAccount> {
        self.account_index
            .get(&account_id)
            .map(|&i| &self.accounts[i])
    }

    fn periods_where<'a>(
        &'a self,
        keep: impl Fn(&FiscalPeriod) -> bool + 'a,
    ) -> impl Iterator<Item = &'a FiscalPeriod> + 'a {
        self.periods.iter().filter(move |p| keep(p))
    }

    /// Posted totals of one account over the given periods
    fn account_totals<'a>(
        &self,
        account_id: AccountId,
        periods: impl IntoIterator<Item = &'a FiscalPeriod>,
    ) -> Totals {
        let mut totals = Totals::default();
        for period in periods {
            if let Some(t) = self.totals.get(&(period.id, account_id)) {
                totals.add(&t.debit, &t.credit);
            }
        }
        totals
    }
}

/// Builds reports over a storage backend
pub struct ReportProjector<S: LedgerStorage> {
    storage: S,
    config: ReportingConfig,
}

impl<S: LedgerStorage> ReportProjector<S> {
    pub fn new(storage: S) -> Self {
        Self::with_config(storage, ReportingConfig::default())
    }

    pub fn with_config(storage: S, config: ReportingConfig) -> Self {
        Self { storage, config }
    }

    fn round(&self, value: BigDecimal) -> BigDecimal {
        value.round(self.config.decimal_places)
    }

    async fn snapshot(&self) -> LedgerResult<Snapshot> {
        let accounts = self.storage.list_accounts(None).await?;
        let account_index = accounts
            .iter()
            .enumerate()
            .map(|(i, a)| (a.id, i))
            .collect::<HashMap<_, _>>();
        let years = self.storage.list_fiscal_years().await?;
        let periods = self.storage.list_fiscal_periods(None).await?;

        let mut totals: BTreeMap<(FiscalPeriodId, AccountId), Totals> = BTreeMap::new();
        let mut cash_moves: BTreeMap<FiscalPeriodId, Vec<BigDecimal>> = BTreeMap::new();
        for voucher in self.storage.list_vouchers(&VoucherFilter::posted()).await? {
            let mut cash = BigDecimal::from(0);
            let mut touches_cash = false;
            for line in &voucher.lines {
                totals
                    .entry((voucher.fiscal_period_id, line.ledger_account_id))
                    .or_default()
                    .add(&line.debit, &line.credit);

                let is_cash = account_index
                    .get(&line.ledger_account_id)
                    .is_some_and(|&i| accounts[i].is_cash);
                if is_cash {
                    touches_cash = true;
                    cash = cash + &line.debit - &line.credit;
                }
            }
            if touches_cash {
                cash_moves
                    .entry(voucher.fiscal_period_id)
                    .or_default()
                    .push(cash);
            }
        }

        Ok(Snapshot {
            accounts,
            account_index,
            years,
            periods,
            totals,
            cash_moves,
        })
    }

    /// Check that the filter names existing records and fill in the year of
    /// a period-only filter
    async fn check_filter(&self, filter: &ReportFilter) -> LedgerResult<ReportFilter> {
        let mut scope = *filter;
        if let Some(year_id) = filter.fiscal_year_id {
            if self.storage.get_fiscal_year(year_id).await?.is_none() {
                return Err(LedgerError::not_found("fiscal year", year_id));
            }
        }
        if let Some(period_id) = filter.fiscal_period_id {
            let period = self
                .storage
                .get_fiscal_period(period_id)
                .await?
                .ok_or_else(|| LedgerError::not_found("fiscal period", period_id))?;
            scope.fiscal_year_id.get_or_insert(period.fiscal_year_id);
        }
        Ok(scope)
    }

    /// Debit and credit totals of every active leaf account, ordered by code
    pub async fn trial_balance(&self, filter: &ReportFilter) -> LedgerResult<TrialBalance> {
        let scope = self.check_filter(filter).await?;
        let snapshot = self.snapshot().await?;

        let mut rows = Vec::new();
        let mut total_debit = BigDecimal::from(0);
        let mut total_credit = BigDecimal::from(0);

        for account in snapshot.accounts.iter().filter(|a| a.is_postable()) {
            let totals = snapshot.account_totals(
                account.id,
                snapshot.periods_where(|p| filter.includes(p)),
            );
            total_debit = &total_debit + &totals.debit;
            total_credit = &total_credit + &totals.credit;

            rows.push(TrialBalanceRow {
                fiscal_year_id: scope.fiscal_year_id,
                fiscal_period_id: scope.fiscal_period_id,
                account_id: account.id,
                account_code: account.code.clone(),
                account_name: account.name.clone(),
                account_type: account.account_type,
                balance: self.round(account.account_type.signed(&totals.debit, &totals.credit)),
                total_debit: self.round(totals.debit),
                total_credit: self.round(totals.credit),
            });
        }

        Ok(TrialBalance {
            fiscal_year_id: scope.fiscal_year_id,
            fiscal_period_id: scope.fiscal_period_id,
            rows,
            is_balanced: total_debit == total_credit,
            total_debit: self.round(total_debit),
            total_credit: self.round(total_credit),
        })
    }

    /// Income and expense per non-control account per period
    pub async fn profit_and_loss(&self, filter: &ReportFilter) -> LedgerResult<ProfitAndLoss> {
        self.check_filter(filter).await?;
        let snapshot = self.snapshot().await?;

        let mut rows = Vec::new();
        let mut total_income = BigDecimal::from(0);
        let mut total_expense = BigDecimal::from(0);

        for period in snapshot.periods_where(|p| filter.includes(p)) {
            let mut period_rows = Vec::new();
            for ((_, account_id), totals) in snapshot
                .totals
                .range((period.id, AccountId(i64::MIN))..=(period.id, AccountId(i64::MAX)))
            {
                let Some(account) = snapshot.account(*account_id) else {
                    continue;
                };
                if account.account_type.is_real() || account.is_control_account {
                    continue;
                }

                let amount = account.account_type.signed(&totals.debit, &totals.credit);
                match account.account_type {
                    AccountType::Income => total_income = &total_income + &amount,
                    _ => total_expense = &total_expense + &amount,
                }
                period_rows.push(ProfitAndLossRow {
                    fiscal_period_id: period.id,
                    period_name: period.period_name.clone(),
                    account_id: account.id,
                    account_code: account.code.clone(),
                    account_name: account.name.clone(),
                    account_type: account.account_type,
                    amount: self.round(amount),
                });
            }
            period_rows.sort_by(|a, b| {
                (a.account_type, &a.account_code).cmp(&(b.account_type, &b.account_code))
            });
            rows.extend(period_rows);
        }

        Ok(ProfitAndLoss {
            rows,
            net_profit: self.round(&total_income - &total_expense),
            total_income: self.round(total_income),
            total_expense: self.round(total_expense),
        })
    }

    /// Balance sheet per fiscal year in scope
    ///
    /// Balances are cumulative from the first period on record up to the
    /// year end, or up to the end of the filtered period.
    pub async fn balance_sheet(&self, filter: &ReportFilter) -> LedgerResult<BalanceSheet> {
        self.check_filter(filter).await?;
        let snapshot = self.snapshot().await?;

        let mut sections = Vec::new();
        for year in &snapshot.years {
            let in_scope: Vec<&FiscalPeriod> = snapshot
                .periods_where(|p| p.fiscal_year_id == year.id && filter.includes(p))
                .collect();
            let Some(last) = in_scope.last() else {
                if filter.fiscal_period_id.is_none()
                    && filter.fiscal_year_id.is_none_or(|y| y == year.id)
                {
                    sections.push(self.balance_sheet_section(&snapshot, year, year.end_date));
                }
                continue;
            };
            let as_of = if filter.fiscal_period_id.is_some() {
                last.end_date
            } else {
                year.end_date
            };
            sections.push(self.balance_sheet_section(&snapshot, year, as_of));
        }

        Ok(BalanceSheet { sections })
    }

    fn balance_sheet_section(
        &self,
        snapshot: &Snapshot,
        year: &FiscalYear,
        as_of: NaiveDate,
    ) -> BalanceSheetSection {
        let zero = BigDecimal::from(0);
        let through = |p: &FiscalPeriod| p.end_date <= as_of;

        let mut rows = Vec::new();
        let mut total_assets = zero.clone();
        let mut total_liabilities = zero.clone();
        let mut total_equity = zero.clone();
        let mut retained_earnings = zero.clone();
        let mut current_earnings = zero.clone();

        for account in &snapshot.accounts {
            let totals = snapshot.account_totals(account.id, snapshot.periods_where(through));
            let balance = account.account_type.signed(&totals.debit, &totals.credit);

            match account.account_type {
                AccountType::Income | AccountType::Expense => {
                    let in_year = snapshot.account_totals(
                        account.id,
                        snapshot.periods_where(|p| through(p) && p.fiscal_year_id == year.id),
                    );
                    let current = account.account_type.signed(&in_year.debit, &in_year.credit);
                    let earlier = &balance - &current;
                    // expenses reduce earnings
                    let sign = if account.account_type == AccountType::Income {
                        BigDecimal::from(1)
                    } else {
                        BigDecimal::from(-1)
                    };
                    current_earnings = &current_earnings + &current * &sign;
                    retained_earnings = &retained_earnings + &earlier * &sign;
                    continue;
                }
                AccountType::Asset => total_assets = &total_assets + &balance,
                AccountType::Liability => total_liabilities = &total_liabilities + &balance,
                AccountType::Equity => total_equity = &total_equity + &balance,
            }

            if totals.debit != zero || totals.credit != zero {
                rows.push(BalanceSheetRow {
                    fiscal_year_id: year.id,
                    account_id: account.id,
                    account_code: account.code.clone(),
                    account_name: account.name.clone(),
                    account_type: account.account_type,
                    balance: self.round(balance),
                });
            }
        }
        rows.sort_by(|a, b| (a.account_type, &a.account_code).cmp(&(b.account_type, &b.account_code)));

        let is_balanced =
            total_assets == &total_liabilities + &total_equity + &retained_earnings + &current_earnings;

        BalanceSheetSection {
            fiscal_year_id: year.id,
            fiscal_year_code: year.code.clone(),
            as_of,
            rows,
            total_assets: self.round(total_assets),
            total_liabilities: self.round(total_liabilities),
            total_equity: self.round(total_equity),
            retained_earnings: self.round(retained_earnings),
            current_earnings: self.round(current_earnings),
            is_balanced,
        }
    }

    /// Inflows and outflows of the accounts flagged `is_cash`, per period.
    /// Transfers between two cash accounts net to zero.
    pub async fn cash_flow(&self, filter: &ReportFilter) -> LedgerResult<CashFlowStatement> {
        self.check_filter(filter).await?;
        let snapshot = self.snapshot().await?;
        let zero = BigDecimal::from(0);

        let mut rows = Vec::new();
        let mut running = zero.clone();
        let mut total_inflow = zero.clone();
        let mut total_outflow = zero.clone();

        for period in &snapshot.periods {
            let moves = snapshot
                .cash_moves
                .get(&period.id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let inflow: BigDecimal = moves.iter().filter(|m| **m > zero).sum();
            let outflow: BigDecimal = moves.iter().filter(|m| **m < zero).map(|m| -m).sum();
            let net_change = &inflow - &outflow;
            let opening_cash = running.clone();
            running = &running + &net_change;

            if !filter.includes(period) {
                continue;
            }
            total_inflow = &total_inflow + &inflow;
            total_outflow = &total_outflow + &outflow;
            rows.push(CashFlowRow {
                fiscal_period_id: period.id,
                period_name: period.period_name.clone(),
                opening_cash: self.round(opening_cash),
                inflow: self.round(inflow),
                outflow: self.round(outflow),
                net_change: self.round(net_change),
                closing_cash: self.round(running.clone()),
            });
        }

        Ok(CashFlowStatement {
            rows,
            total_inflow: self.round(total_inflow),
            total_outflow: self.round(total_outflow),
        })
    }

    /// Movement of every equity account per period
    pub async fn equity_statement(&self, filter: &ReportFilter) -> LedgerResult<EquityStatement> {
        self.check_filter(filter).await?;
        let snapshot = self.snapshot().await?;
        let zero = BigDecimal::from(0);

        let mut rows = Vec::new();
        for account in snapshot
            .accounts
            .iter()
            .filter(|a| a.account_type == AccountType::Equity)
        {
            let mut running = zero.clone();
            for period in &snapshot.periods {
                let totals = snapshot.account_totals(account.id, [period]);
                let opening = running.clone();
                running = &running + AccountType::Equity.signed(&totals.debit, &totals.credit);

                let quiet = opening == zero && totals.debit == zero && totals.credit == zero;
                if quiet || !filter.includes(period) {
                    continue;
                }
                rows.push(EquityStatementRow {
                    fiscal_period_id: period.id,
                    period_name: period.period_name.clone(),
                    account_id: account.id,
                    account_code: account.code.clone(),
                    account_name: account.name.clone(),
                    opening: self.round(opening),
                    additions: self.round(totals.credit),
                    deductions: self.round(totals.debit),
                    closing: self.round(running.clone()),
                });
            }
        }

        Ok(EquityStatement { rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_scope() {
        let period = FiscalPeriod {
            id: FiscalPeriodId(3),
            fiscal_year_id: FiscalYearId(1),
            period_name: "2024-03".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            is_open: true,
        };

        assert!(ReportFilter::all().includes(&period));
        assert!(ReportFilter::for_year(FiscalYearId(1)).includes(&period));
        assert!(!ReportFilter::for_year(FiscalYearId(2)).includes(&period));
        assert!(ReportFilter::for_period(FiscalPeriodId(3)).includes(&period));
        assert!(!ReportFilter::for_period(FiscalPeriodId(4)).includes(&period));
    }

    #[test]
    fn test_totals_accumulate() {
        let mut totals = Totals::default();
        totals.add(&BigDecimal::from(10), &BigDecimal::from(0));
        totals.add(&BigDecimal::from(5), &BigDecimal::from(3));
        assert_eq!(totals.debit, BigDecimal::from(15));
        assert_eq!(totals.credit, BigDecimal::from(3));
    }
}
