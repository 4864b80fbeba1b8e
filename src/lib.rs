//! # Cooperative Ledger
//!
//! Double-entry general ledger core for microfinance and cooperative
//! institutions.
//!
//! ## Features
//!
//! - **Chart of accounts**: hierarchical accounts with leaf/control distinction
//! - **Fiscal calendar**: fiscal years split into non-overlapping open/closed periods
//! - **Voucher posting**: shape-checked, balanced vouchers committed all-or-nothing
//! - **Balance cache**: per-account, per-period opening/debit/credit/closing rows
//! - **Reports**: trial balance, profit & loss, balance sheet, cash flow, equity statement
//! - **Storage abstraction**: database-agnostic design with trait-based storage
//!
//! ## Quick Start
//!
//! ```rust
//! use cooperative_ledger::{AccountType, Ledger, NewAccount};
//! use cooperative_ledger::utils::MemoryStorage;
//!
//! # tokio_test_block(async {
//! let ledger = Ledger::new(MemoryStorage::new());
//! let cash = ledger
//!     .create_account(NewAccount::new("1111", "Cash in Hand", AccountType::Asset).cash())
//!     .await
//!     .unwrap();
//! assert!(cash.is_leaf);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

pub mod config;
pub mod ledger;
pub mod reconciliation;
pub mod reporting;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use crate::config::LedgerConfig;
pub use ledger::*;
pub use reconciliation::{BalanceReconciler, ReconciliationReport};
pub use reporting::*;
pub use traits::*;
pub use types::*;

// Re-export voucher patterns for convenience
pub use ledger::voucher::patterns;
