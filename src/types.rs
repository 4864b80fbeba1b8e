//! Core types and data structures for the ledger

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Returns the raw integer id.
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

typed_id!(AccountId, "Identifier of a ledger account.");
typed_id!(FiscalYearId, "Identifier of a fiscal year.");
typed_id!(FiscalPeriodId, "Identifier of a fiscal period.");
typed_id!(VoucherId, "Identifier of a voucher.");
typed_id!(VoucherLineId, "Identifier of a voucher line.");
typed_id!(BalanceId, "Identifier of a cached account balance row.");

/// Id sequences handed out by storage backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    Account,
    FiscalYear,
    FiscalPeriod,
    Voucher,
    VoucherLine,
    Balance,
}

/// Account types following standard accounting principles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountType {
    /// Assets - what the cooperative owns (cash, loans to members, fixed assets)
    Asset,
    /// Liabilities - what it owes (member deposits, borrowings)
    Liability,
    /// Equity - share capital, reserves, retained surplus
    Equity,
    /// Income - interest earned, fees, other revenue
    Income,
    /// Expenses - interest paid, salaries, office costs
    Expense,
}

impl AccountType {
    /// Returns the normal balance side for this account type.
    /// Assets and Expenses are debit-normal; the rest are credit-normal.
    pub fn normal_balance(&self) -> EntryType {
        match self {
            AccountType::Asset | AccountType::Expense => EntryType::Debit,
            AccountType::Liability | AccountType::Equity | AccountType::Income => EntryType::Credit,
        }
    }

    /// Signed movement of `debit`/`credit` in this type's normal direction.
    pub fn signed(&self, debit: &BigDecimal, credit: &BigDecimal) -> BigDecimal {
        match self.normal_balance() {
            EntryType::Debit => debit - credit,
            EntryType::Credit => credit - debit,
        }
    }

    /// Real (balance sheet) accounts carry their balance across fiscal years.
    /// Nominal accounts (income and expense) start every fiscal year at zero.
    pub fn is_real(&self) -> bool {
        matches!(
            self,
            AccountType::Asset | AccountType::Liability | AccountType::Equity
        )
    }

    pub fn is_nominal(&self) -> bool {
        !self.is_real()
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccountType::Asset => "ASSET",
            AccountType::Liability => "LIABILITY",
            AccountType::Equity => "EQUITY",
            AccountType::Income => "INCOME",
            AccountType::Expense => "EXPENSE",
        };
        f.write_str(name)
    }
}

/// Sides of a double-entry posting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Debit,
    Credit,
}

/// Node of the chart of accounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerAccount {
    pub id: AccountId,
    /// Unique account code, e.g. `1111`
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    /// Aggregation-only group node
    pub is_control_account: bool,
    pub is_active: bool,
    /// False iff the account has at least one child. Maintained by the chart,
    /// never set by callers.
    pub is_leaf: bool,
    /// Designates the account as cash or cash-equivalent for the cash flow statement
    pub is_cash: bool,
    pub parent_id: Option<AccountId>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl LedgerAccount {
    /// Build a fresh leaf account from its creation input
    pub fn new(id: AccountId, input: &NewAccount) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id,
            code: input.code.trim().to_string(),
            name: input.name.trim().to_string(),
            account_type: input.account_type,
            is_control_account: input.is_control_account,
            is_active: true,
            is_leaf: true,
            is_cash: input.is_cash,
            parent_id: input.parent_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Only active leaf accounts may be referenced by voucher lines
    pub fn is_postable(&self) -> bool {
        self.is_leaf && self.is_active
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().naive_utc();
    }
}

/// Input for creating a ledger account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAccount {
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub parent_id: Option<AccountId>,
    #[serde(default)]
    pub is_control_account: bool,
    #[serde(default)]
    pub is_cash: bool,
}

impl NewAccount {
    pub fn new(code: impl Into<String>, name: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            account_type,
            parent_id: None,
            is_control_account: false,
            is_cash: false,
        }
    }

    /// Place the account under `parent_id`
    pub fn under(mut self, parent_id: AccountId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Mark the account as an aggregation-only control account
    pub fn control(mut self) -> Self {
        self.is_control_account = true;
        self
    }

    /// Mark the account as cash for the cash flow statement
    pub fn cash(mut self) -> Self {
        self.is_cash = true;
        self
    }
}

/// Rename/retype request. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountChanges {
    pub code: Option<String>,
    pub name: Option<String>,
    pub account_type: Option<AccountType>,
    pub is_control_account: Option<bool>,
    pub is_cash: Option<bool>,
}

/// Fiscal year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiscalYear {
    pub id: FiscalYearId,
    pub code: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
    pub is_closed: bool,
}

impl FiscalYear {
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }
}

/// A period within a fiscal year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiscalPeriod {
    pub id: FiscalPeriodId,
    pub fiscal_year_id: FiscalYearId,
    pub period_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_open: bool,
}

impl FiscalPeriod {
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Inclusive date-range overlap
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        start <= self.end_date && end >= self.start_date
    }
}

/// Voucher transaction classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoucherType {
    Receipt,
    Payment,
    Journal,
    Contra,
    Purchase,
    Sale,
    DebitNote,
    CreditNote,
    PettyCash,
}

impl VoucherType {
    /// The entry shape a voucher of this type must be submitted with
    pub fn shape(&self) -> VoucherShape {
        match self {
            VoucherType::Receipt | VoucherType::Payment | VoucherType::PettyCash => {
                VoucherShape::SingleSided
            }
            VoucherType::Contra => VoucherShape::Transfer,
            VoucherType::Journal
            | VoucherType::Purchase
            | VoucherType::Sale
            | VoucherType::DebitNote
            | VoucherType::CreditNote => VoucherShape::Journal,
        }
    }

    /// Side the cash account takes for single-sided vouchers
    pub fn cash_side(&self) -> Option<EntryType> {
        match self {
            VoucherType::Receipt => Some(EntryType::Debit),
            VoucherType::Payment | VoucherType::PettyCash => Some(EntryType::Credit),
            _ => None,
        }
    }
}

/// Closed set of voucher entry shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoucherShape {
    SingleSided,
    Transfer,
    Journal,
}

impl fmt::Display for VoucherShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VoucherShape::SingleSided => "single-sided",
            VoucherShape::Transfer => "transfer",
            VoucherShape::Journal => "journal",
        };
        f.write_str(name)
    }
}

/// Voucher lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VoucherStatus {
    Draft,
    Approved,
    Posted,
    Cancelled,
}

impl VoucherStatus {
    /// Allowed transitions:
    ///
    /// - `Draft -> Approved -> Posted`
    /// - `Draft | Approved | Posted -> Cancelled` (a posted voucher is reversed)
    ///
    /// Nothing leaves `Cancelled`.
    pub fn can_transition_to(&self, next: VoucherStatus) -> bool {
        use VoucherStatus::*;
        matches!(
            (self, next),
            (Draft, Approved) | (Approved, Posted) | (Draft | Approved | Posted, Cancelled)
        )
    }

    /// Posted vouchers are frozen and cancelled ones are dead
    pub fn is_frozen(&self) -> bool {
        matches!(self, VoucherStatus::Posted | VoucherStatus::Cancelled)
    }
}

impl fmt::Display for VoucherStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VoucherStatus::Draft => "DRAFT",
            VoucherStatus::Approved => "APPROVED",
            VoucherStatus::Posted => "POSTED",
            VoucherStatus::Cancelled => "CANCELLED",
        };
        f.write_str(name)
    }
}

/// Kinds of member-level subledgers a line can be attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubledgerKind {
    Customer,
    LoanAccount,
    DepositAccount,
    SavingsAccount,
    ShareAccount,
}

/// Subledger attribution of a voucher line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubledgerRef {
    pub kind: SubledgerKind,
    pub id: i64,
}

/// Kinds of business documents a line can point back to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    LoanDisbursement,
    LoanRepayment,
    DepositTransaction,
    ShareTransaction,
    Voucher,
}

/// Source-document reference of a voucher line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceRef {
    pub kind: ReferenceKind,
    pub id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentType {
    Cash,
    Cheque,
    BankTransfer,
    MobileWallet,
}

/// Payment instrument used for a line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub kind: InstrumentType,
    pub number: Option<String>,
}

/// Single debit or credit line of a voucher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoucherLine {
    pub id: VoucherLineId,
    pub voucher_id: VoucherId,
    pub ledger_account_id: AccountId,
    pub debit: BigDecimal,
    pub credit: BigDecimal,
    pub subledger: Option<SubledgerRef>,
    pub reference: Option<ReferenceRef>,
    pub instrument: Option<Instrument>,
    pub particulars: Option<String>,
}

/// Voucher header with its owned lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voucher {
    pub id: VoucherId,
    pub voucher_no: String,
    pub voucher_type: VoucherType,
    pub voucher_date: NaiveDate,
    pub fiscal_year_id: FiscalYearId,
    pub fiscal_period_id: FiscalPeriodId,
    pub branch_id: i64,
    pub status: VoucherStatus,
    pub narration: String,
    pub created_by: i64,
    pub approved_by: Option<i64>,
    pub approved_at: Option<NaiveDateTime>,
    pub posted_at: Option<NaiveDateTime>,
    /// Idempotency key of the balance application, assigned when posted
    pub posting_id: Option<Uuid>,
    pub lines: Vec<VoucherLine>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Voucher {
    pub fn total_debits(&self) -> BigDecimal {
        self.lines.iter().map(|l| &l.debit).sum()
    }

    pub fn total_credits(&self) -> BigDecimal {
        self.lines.iter().map(|l| &l.credit).sum()
    }

    pub fn is_balanced(&self) -> bool {
        self.total_debits() == self.total_credits()
    }

    /// Whether the voucher currently contributes to balances and reports
    pub fn is_posted(&self) -> bool {
        self.status == VoucherStatus::Posted
    }

    pub fn references_account(&self, account_id: AccountId) -> bool {
        self.lines
            .iter()
            .any(|line| line.ledger_account_id == account_id)
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().naive_utc();
    }
}

/// Whether a balance application adds or removes a voucher's effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostingDirection {
    Apply,
    Reverse,
}

/// Identity of one balance application of a voucher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PostingKey {
    pub posting_id: Uuid,
    pub direction: PostingDirection,
}

impl PostingKey {
    pub fn apply(posting_id: Uuid) -> Self {
        Self {
            posting_id,
            direction: PostingDirection::Apply,
        }
    }

    pub fn reverse(posting_id: Uuid) -> Self {
        Self {
            posting_id,
            direction: PostingDirection::Reverse,
        }
    }

    pub fn for_account(self, account_id: AccountId) -> AppliedPosting {
        AppliedPosting {
            posting_id: self.posting_id,
            direction: self.direction,
            account_id,
        }
    }
}

/// Record that a posting's movement has reached one account's balance rows.
/// Stored apart from the rows and written in the same batch as them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AppliedPosting {
    pub posting_id: Uuid,
    pub direction: PostingDirection,
    pub account_id: AccountId,
}

/// Balance rows and the applied-posting records that must land with them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BalanceBatch {
    pub rows: Vec<AccountBalance>,
    pub postings: Vec<AppliedPosting>,
}

impl BalanceBatch {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.postings.is_empty()
    }
}

/// Cached balance of one account in one fiscal period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub id: BalanceId,
    pub ledger_account_id: AccountId,
    pub fiscal_period_id: FiscalPeriodId,
    pub opening_balance: BigDecimal,
    pub debit_total: BigDecimal,
    pub credit_total: BigDecimal,
    pub closing_balance: BigDecimal,
}

impl AccountBalance {
    pub fn new(
        id: BalanceId,
        ledger_account_id: AccountId,
        fiscal_period_id: FiscalPeriodId,
        opening_balance: BigDecimal,
    ) -> Self {
        Self {
            id,
            ledger_account_id,
            fiscal_period_id,
            closing_balance: opening_balance.clone(),
            opening_balance,
            debit_total: BigDecimal::from(0),
            credit_total: BigDecimal::from(0),
        }
    }

    /// Closing balance implied by the opening balance and the period totals
    pub fn expected_closing(&self, account_type: AccountType) -> BigDecimal {
        &self.opening_balance + account_type.signed(&self.debit_total, &self.credit_total)
    }

    pub fn recompute_closing(&mut self, account_type: AccountType) {
        self.closing_balance = self.expected_closing(account_type);
    }
}

/// Errors that can occur in the ledger
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Code '{0}' is already in use")]
    DuplicateCode(String),
    #[error("Voucher number '{0}' already exists")]
    DuplicateVoucher(String),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("Moving account {account_id} under {new_parent_id} would create a cycle")]
    Cycle {
        account_id: AccountId,
        new_parent_id: AccountId,
    },
    #[error("Account {0} still has child accounts")]
    HasChildren(AccountId),
    #[error("Invalid range for {field}: {message}")]
    InvalidRange {
        field: &'static str,
        message: String,
    },
    #[error("Voucher is not balanced: debits = {debit}, credits = {credit}")]
    UnbalancedVoucher {
        debit: BigDecimal,
        credit: BigDecimal,
    },
    #[error("Invalid reference in {field}: {message}")]
    InvalidReference {
        field: &'static str,
        message: String,
    },
    #[error("Fiscal period {0} is closed for posting")]
    PeriodClosed(FiscalPeriodId),
    #[error("Fiscal period {period_id} still has {count} unposted voucher(s)")]
    PendingVouchers {
        period_id: FiscalPeriodId,
        count: usize,
    },
    #[error("Validation error on {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Configuration error: {0}")]
    Configuration(#[from] ::config::ConfigError),
}

impl LedgerError {
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        LedgerError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        LedgerError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn invalid_range(field: &'static str, message: impl Into<String>) -> Self {
        LedgerError::InvalidRange {
            field,
            message: message.into(),
        }
    }

    pub fn invalid_reference(field: &'static str, message: impl Into<String>) -> Self {
        LedgerError::InvalidReference {
            field,
            message: message.into(),
        }
    }

    /// Input field the error should be reported against, if any
    pub fn field(&self) -> Option<&'static str> {
        match self {
            LedgerError::DuplicateCode(_) => Some("code"),
            LedgerError::DuplicateVoucher(_) => Some("voucher_no"),
            LedgerError::Cycle { .. } => Some("parent_id"),
            LedgerError::InvalidRange { field, .. }
            | LedgerError::InvalidReference { field, .. }
            | LedgerError::Validation { field, .. } => Some(field),
            LedgerError::UnbalancedVoucher { .. } => Some("rows"),
            LedgerError::PeriodClosed(_) => Some("fiscal_period_id"),
            LedgerError::NotFound { .. }
            | LedgerError::HasChildren(_)
            | LedgerError::PendingVouchers { .. }
            | LedgerError::InvalidState(_)
            | LedgerError::Storage(_)
            | LedgerError::Configuration(_) => None,
        }
    }

    /// Persistence failures may succeed on resubmission; everything else is a client error
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Storage(_))
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_debit_and_credit_normal_types_mirror(debit in 0i64..1_000_000, credit in 0i64..1_000_000) {
            let (debit, credit) = (BigDecimal::from(debit), BigDecimal::from(credit));
            for (dr, cr) in [
                (AccountType::Asset, AccountType::Liability),
                (AccountType::Expense, AccountType::Income),
            ] {
                prop_assert_eq!(dr.signed(&debit, &credit), -cr.signed(&debit, &credit));
            }
            prop_assert_eq!(
                AccountType::Asset.signed(&debit, &credit),
                &debit - &credit
            );
        }
    }

    #[test]
    fn test_sign_convention() {
        let debit = BigDecimal::from(800);
        let credit = BigDecimal::from(300);

        assert_eq!(AccountType::Asset.signed(&debit, &credit), BigDecimal::from(500));
        assert_eq!(AccountType::Expense.signed(&debit, &credit), BigDecimal::from(500));
        assert_eq!(AccountType::Liability.signed(&debit, &credit), BigDecimal::from(-500));
        assert_eq!(AccountType::Equity.signed(&debit, &credit), BigDecimal::from(-500));
        assert_eq!(AccountType::Income.signed(&debit, &credit), BigDecimal::from(-500));
    }

    #[test]
    fn test_voucher_status_transitions() {
        use VoucherStatus::*;

        assert!(Draft.can_transition_to(Approved));
        assert!(Approved.can_transition_to(Posted));
        assert!(Posted.can_transition_to(Cancelled));
        assert!(Draft.can_transition_to(Cancelled));

        assert!(!Draft.can_transition_to(Posted));
        assert!(!Posted.can_transition_to(Draft));
        assert!(!Cancelled.can_transition_to(Draft));
        assert!(!Cancelled.can_transition_to(Posted));
        assert!(!Cancelled.can_transition_to(Cancelled));
    }

    #[test]
    fn test_voucher_type_shapes() {
        assert_eq!(VoucherType::Receipt.shape(), VoucherShape::SingleSided);
        assert_eq!(VoucherType::PettyCash.shape(), VoucherShape::SingleSided);
        assert_eq!(VoucherType::Contra.shape(), VoucherShape::Transfer);
        assert_eq!(VoucherType::CreditNote.shape(), VoucherShape::Journal);
        assert_eq!(VoucherType::Receipt.cash_side(), Some(EntryType::Debit));
        assert_eq!(VoucherType::Payment.cash_side(), Some(EntryType::Credit));
        assert_eq!(VoucherType::Journal.cash_side(), None);
    }

    #[test]
    fn test_balance_row_closing() {
        let mut row = AccountBalance::new(
            BalanceId(1),
            AccountId(1),
            FiscalPeriodId(1),
            BigDecimal::from(100),
        );
        row.debit_total = BigDecimal::from(50);
        row.credit_total = BigDecimal::from(20);

        row.recompute_closing(AccountType::Asset);
        assert_eq!(row.closing_balance, BigDecimal::from(130));

        row.recompute_closing(AccountType::Liability);
        assert_eq!(row.closing_balance, BigDecimal::from(70));
    }

    #[test]
    fn test_error_fields() {
        assert_eq!(
            LedgerError::DuplicateVoucher("OB-0001".into()).field(),
            Some("voucher_no")
        );
        assert_eq!(
            LedgerError::PeriodClosed(FiscalPeriodId(3)).field(),
            Some("fiscal_period_id")
        );
        assert!(LedgerError::Storage("connection reset".into()).is_transient());
        assert!(!LedgerError::HasChildren(AccountId(1)).is_transient());
    }

    #[test]
    fn test_subledger_wire_shape() {
        let subledger = SubledgerRef {
            kind: SubledgerKind::LoanAccount,
            id: 42,
        };
        let json = serde_json::to_value(subledger).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "loan_account", "id": 42 }));
    }
}
