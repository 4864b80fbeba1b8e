//! Ledger module: chart of accounts, fiscal calendar, voucher posting and
//! the balance cache

pub mod account;
pub mod balance;
pub mod core;
pub mod fiscal;
pub mod voucher;

pub use account::{AccountTree, ChartOfAccounts, TreeEntry};
pub use balance::{compute_deltas, BalanceAccumulator, BalanceDelta, StagedBalances};
pub use self::core::*;
pub use fiscal::{FiscalCalendar, PostingGate};
pub use voucher::{
    JournalRow, PostingIntent, VoucherBuilder, VoucherDraft, VoucherEngine, VoucherEntry,
    VoucherUpdate,
};
