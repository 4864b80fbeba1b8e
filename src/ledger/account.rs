//! Chart of accounts: the account tree and its structural operations

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::ledger::fiscal::PostingGate;
use crate::traits::*;
use crate::types::*;

/// Arena snapshot of the chart of accounts
///
/// Nodes are indexed by position; parent and child links are explicit. The
/// snapshot is rebuilt from storage for every structural change so the
/// `is_leaf` flags written back are derived from real child counts, never
/// from the stored flags.
#[derive(Debug, Clone, Default)]
pub struct AccountTree {
    nodes: Vec<TreeNode>,
    index: HashMap<AccountId, usize>,
}

#[derive(Debug, Clone)]
struct TreeNode {
    account: LedgerAccount,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// One row of a rendered subtree
#[derive(Debug, Clone, PartialEq)]
pub struct TreeEntry<'a> {
    pub depth: usize,
    pub account: &'a LedgerAccount,
}

impl AccountTree {
    /// Build the arena. Accounts whose parent is missing are treated as roots.
    pub fn from_accounts(mut accounts: Vec<LedgerAccount>) -> Self {
        accounts.sort_by(|a, b| a.code.cmp(&b.code));

        let index: HashMap<AccountId, usize> = accounts
            .iter()
            .enumerate()
            .map(|(i, account)| (account.id, i))
            .collect();

        let mut nodes: Vec<TreeNode> = accounts
            .into_iter()
            .map(|account| TreeNode {
                account,
                parent: None,
                children: Vec::new(),
            })
            .collect();

        for i in 0..nodes.len() {
            let parent = nodes[i]
                .account
                .parent_id
                .and_then(|parent_id| index.get(&parent_id).copied());
            if let Some(parent) = parent {
                nodes[i].parent = Some(parent);
                nodes[parent].children.push(i);
            }
        }

        Self { nodes, index }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, account_id: AccountId) -> Option<&LedgerAccount> {
        self.index.get(&account_id).map(|&i| &self.nodes[i].account)
    }

    pub fn contains(&self, account_id: AccountId) -> bool {
        self.index.contains_key(&account_id)
    }

    /// Direct children, ordered by code
    pub fn children(&self, account_id: AccountId) -> Vec<&LedgerAccount> {
        self.index
            .get(&account_id)
            .map(|&i| {
                self.nodes[i]
                    .children
                    .iter()
                    .map(|&c| &self.nodes[c].account)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn child_count(&self, account_id: AccountId) -> usize {
        self.index
            .get(&account_id)
            .map_or(0, |&i| self.nodes[i].children.len())
    }

    /// Accounts without a (resolvable) parent, ordered by code
    pub fn roots(&self) -> Vec<&LedgerAccount> {
        self.nodes
            .iter()
            .filter(|node| node.parent.is_none())
            .map(|node| &node.account)
            .collect()
    }

    /// Whether `candidate` lies in the subtree rooted at `ancestor`
    /// (an account counts as part of its own subtree).
    ///
    /// Walks parent links upward and stops on a revisited node, so corrupt
    /// cyclic data cannot loop forever.
    pub fn is_in_subtree(&self, candidate: AccountId, ancestor: AccountId) -> bool {
        let mut visited = HashSet::new();
        let mut current = self.index.get(&candidate).copied();

        while let Some(i) = current {
            if !visited.insert(i) {
                return false;
            }
            if self.nodes[i].account.id == ancestor {
                return true;
            }
            current = self.nodes[i].parent;
        }
        false
    }

    /// Depth-first walk of the subtree below `account_id` (excluding the
    /// account itself), children in code order.
    pub fn descendants(&self, account_id: AccountId) -> Vec<TreeEntry<'_>> {
        let mut entries = Vec::new();
        let Some(&root) = self.index.get(&account_id) else {
            return entries;
        };

        let mut visited = HashSet::from([root]);
        let mut stack: Vec<(usize, usize)> = self.nodes[root]
            .children
            .iter()
            .rev()
            .map(|&c| (c, 1))
            .collect();

        while let Some((i, depth)) = stack.pop() {
            if !visited.insert(i) {
                continue;
            }
            entries.push(TreeEntry {
                depth,
                account: &self.nodes[i].account,
            });
            stack.extend(self.nodes[i].children.iter().rev().map(|&c| (c, depth + 1)));
        }
        entries
    }

    /// Whole chart in display order: each root followed by its subtree
    pub fn render(&self) -> Vec<TreeEntry<'_>> {
        let mut entries = Vec::new();
        for root in self.roots() {
            entries.push(TreeEntry {
                depth: 0,
                account: root,
            });
            entries.extend(self.descendants(root.id));
        }
        entries
    }

    /// Path from the root down to `account_id`
    pub fn path(&self, account_id: AccountId) -> Vec<&LedgerAccount> {
        let mut path = Vec::new();
        let mut visited = HashSet::new();
        let mut current = self.index.get(&account_id).copied();

        while let Some(i) = current {
            if !visited.insert(i) {
                break;
            }
            path.push(&self.nodes[i].account);
            current = self.nodes[i].parent;
        }
        path.reverse();
        path
    }

    /// Accounts whose stored `is_leaf` disagrees with their child count
    pub fn leaf_flag_drift(&self) -> Vec<AccountId> {
        self.nodes
            .iter()
            .filter(|node| node.account.is_leaf != node.children.is_empty())
            .map(|node| node.account.id)
            .collect()
    }

    /// Accounts that are their own ancestor
    pub fn cyclic_accounts(&self) -> Vec<AccountId> {
        self.nodes
            .iter()
            .filter(|node| {
                node.parent.is_some_and(|parent| {
                    self.is_in_subtree(self.nodes[parent].account.id, node.account.id)
                })
            })
            .map(|node| node.account.id)
            .collect()
    }

    /// Copy of `account_id` with `is_leaf` set from the arena's child count,
    /// adjusted by `child_delta` for a pending attach (+1) or detach (-1).
    fn with_leaf_flag(&self, account_id: AccountId, child_delta: isize) -> Option<LedgerAccount> {
        let account = self.get(account_id)?;
        let children = self.child_count(account_id) as isize + child_delta;
        let mut account = account.clone();
        account.is_leaf = children <= 0;
        account.touch();
        Some(account)
    }
}

/// Chart of accounts operations
///
/// Structural changes are serialized through one lock and written with a
/// single `commit_accounts` batch. Changes that affect whether an account
/// can be posted to also hold the posting gate for writing, so no posting
/// validates an account that changes before the posting commits.
///
/// Once an account has voucher lines it cannot gain children, be
/// deactivated, become a control account, change type or be deleted.
pub struct ChartOfAccounts<S: LedgerStorage> {
    storage: S,
    validator: Box<dyn AccountValidator>,
    structure_lock: Mutex<()>,
    gate: PostingGate,
}

impl<S: LedgerStorage> ChartOfAccounts<S> {
    /// Create a new chart of accounts
    pub fn new(storage: S) -> Self {
        Self::with_validator(storage, Box::new(DefaultAccountValidator))
    }

    /// Create a new chart of accounts with a custom validator
    pub fn with_validator(storage: S, validator: Box<dyn AccountValidator>) -> Self {
        Self::with_gate(storage, validator, Arc::new(RwLock::new(())))
    }

    /// Create a chart of accounts sharing the posting gate of a fiscal calendar
    pub fn with_gate(storage: S, validator: Box<dyn AccountValidator>, gate: PostingGate) -> Self {
        Self {
            storage,
            validator,
            structure_lock: Mutex::new(()),
            gate,
        }
    }

    async fn ensure_unposted(&self, account: &LedgerAccount, change: &str) -> LedgerResult<()> {
        if self.storage.account_in_use(account.id).await? {
            return Err(LedgerError::InvalidState(format!(
                "Cannot {} account {} because it has voucher lines",
                change, account.code
            )));
        }
        Ok(())
    }

    /// Load the arena snapshot
    pub async fn tree(&self) -> LedgerResult<AccountTree> {
        Ok(AccountTree::from_accounts(
            self.storage.list_accounts(None).await?,
        ))
    }

    /// Create a new account. A parent, if given, stops being a leaf.
    pub async fn create_account(&self, input: NewAccount) -> LedgerResult<LedgerAccount> {
        self.validator.validate_new_account(&input)?;

        let _gate = self.gate.write().await;
        let _guard = self.structure_lock.lock().await;
        let tree = self.tree().await?;

        let code = input.code.trim();
        if tree.nodes.iter().any(|node| node.account.code == code) {
            return Err(LedgerError::DuplicateCode(code.to_string()));
        }

        let mut update = Vec::new();
        if let Some(parent_id) = input.parent_id {
            let parent = tree
                .with_leaf_flag(parent_id, 1)
                .ok_or_else(|| LedgerError::not_found("parent account", parent_id))?;
            self.ensure_unposted(&parent, "add a child under").await?;
            update.push(parent);
        }

        let id = AccountId(self.storage.next_id(IdKind::Account).await?);
        let account = LedgerAccount::new(id, &input);

        self.storage
            .commit_accounts(AccountChangeSet {
                insert: Some(account.clone()),
                update,
                delete: None,
            })
            .await?;

        info!(
            account_id = %account.id,
            code = %account.code,
            account_type = %account.account_type,
            parent_id = ?account.parent_id,
            "Created ledger account"
        );
        Ok(account)
    }

    /// Reparent an account. `None` moves it to the top level.
    pub async fn move_account(
        &self,
        account_id: AccountId,
        new_parent_id: Option<AccountId>,
    ) -> LedgerResult<LedgerAccount> {
        let _gate = self.gate.write().await;
        let _guard = self.structure_lock.lock().await;
        let tree = self.tree().await?;

        let mut account = tree
            .get(account_id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("account", account_id))?;
        let old_parent_id = account.parent_id;
        if old_parent_id == new_parent_id {
            return Ok(account);
        }

        let mut update = Vec::new();
        if let Some(new_parent_id) = new_parent_id {
            if !tree.contains(new_parent_id) {
                return Err(LedgerError::not_found("parent account", new_parent_id));
            }
            if tree.is_in_subtree(new_parent_id, account_id) {
                return Err(LedgerError::Cycle {
                    account_id,
                    new_parent_id,
                });
            }
            if let Some(parent) = tree.with_leaf_flag(new_parent_id, 1) {
                self.ensure_unposted(&parent, "move an account under").await?;
                update.push(parent);
            }
        }
        if let Some(old_parent_id) = old_parent_id {
            update.extend(tree.with_leaf_flag(old_parent_id, -1));
        }

        account.parent_id = new_parent_id;
        account.touch();
        update.push(account.clone());

        self.storage
            .commit_accounts(AccountChangeSet {
                insert: None,
                update,
                delete: None,
            })
            .await?;

        info!(
            account_id = %account_id,
            old_parent_id = ?old_parent_id,
            new_parent_id = ?new_parent_id,
            "Moved ledger account"
        );
        Ok(account)
    }

    /// Delete a childless account that no voucher references.
    /// The former parent becomes a leaf again when this was its last child.
    pub async fn delete_account(&self, account_id: AccountId) -> LedgerResult<()> {
        let _gate = self.gate.write().await;
        let _guard = self.structure_lock.lock().await;
        let tree = self.tree().await?;

        let account = tree
            .get(account_id)
            .ok_or_else(|| LedgerError::not_found("account", account_id))?;
        if tree.child_count(account_id) > 0 {
            return Err(LedgerError::HasChildren(account_id));
        }
        self.ensure_unposted(account, "delete").await?;

        let update: Vec<LedgerAccount> = account
            .parent_id
            .and_then(|parent_id| tree.with_leaf_flag(parent_id, -1))
            .into_iter()
            .collect();

        self.storage
            .commit_accounts(AccountChangeSet {
                insert: None,
                update,
                delete: Some(account_id),
            })
            .await?;

        info!(account_id = %account_id, code = %account.code, "Deleted ledger account");
        Ok(())
    }

    /// Rename, recode or retype an account
    ///
    /// Changing the type of an account that already has voucher lines is
    /// refused: its history would flip sign.
    pub async fn update_account(
        &self,
        account_id: AccountId,
        changes: AccountChanges,
    ) -> LedgerResult<LedgerAccount> {
        self.validator.validate_changes(&changes)?;

        let _gate = self.gate.write().await;
        let _guard = self.structure_lock.lock().await;
        let mut account = self.get_account_required(account_id).await?;

        if let Some(code) = changes.code {
            let code = code.trim().to_string();
            if let Some(holder) = self.storage.find_account_by_code(&code).await? {
                if holder.id != account_id {
                    return Err(LedgerError::DuplicateCode(code));
                }
            }
            account.code = code;
        }
        if let Some(name) = changes.name {
            account.name = name.trim().to_string();
        }
        if let Some(account_type) = changes.account_type {
            if account_type != account.account_type {
                self.ensure_unposted(&account, "change the type of").await?;
            }
            account.account_type = account_type;
        }
        if let Some(is_control_account) = changes.is_control_account {
            if is_control_account && !account.is_control_account {
                self.ensure_unposted(&account, "make a control account of").await?;
            }
            account.is_control_account = is_control_account;
        }
        if let Some(is_cash) = changes.is_cash {
            account.is_cash = is_cash;
        }
        account.touch();

        self.storage
            .commit_accounts(AccountChangeSet {
                insert: None,
                update: vec![account.clone()],
                delete: None,
            })
            .await?;

        debug!(account_id = %account_id, code = %account.code, "Updated ledger account");
        Ok(account)
    }

    /// Activate or deactivate an account. Inactive accounts cannot be posted to.
    pub async fn set_active(&self, account_id: AccountId, active: bool) -> LedgerResult<LedgerAccount> {
        let _gate = self.gate.write().await;
        let _guard = self.structure_lock.lock().await;
        let mut account = self.get_account_required(account_id).await?;
        if !active && account.is_active {
            self.ensure_unposted(&account, "deactivate").await?;
        }
        account.is_active = active;
        account.touch();

        self.storage
            .commit_accounts(AccountChangeSet {
                insert: None,
                update: vec![account.clone()],
                delete: None,
            })
            .await?;

        info!(account_id = %account_id, active, "Changed account activity");
        Ok(account)
    }

    /// Get an account by ID
    pub async fn get_account(&self, account_id: AccountId) -> LedgerResult<Option<LedgerAccount>> {
        self.storage.get_account(account_id).await
    }

    /// Get an account by ID, returning an error if not found
    pub async fn get_account_required(&self, account_id: AccountId) -> LedgerResult<LedgerAccount> {
        self.storage
            .get_account(account_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("account", account_id))
    }

    pub async fn find_by_code(&self, code: &str) -> LedgerResult<Option<LedgerAccount>> {
        self.storage.find_account_by_code(code).await
    }

    /// List all accounts ordered by code
    pub async fn list_accounts(&self) -> LedgerResult<Vec<LedgerAccount>> {
        self.storage.list_accounts(None).await
    }

    /// List accounts by type
    pub async fn list_accounts_by_type(
        &self,
        account_type: AccountType,
    ) -> LedgerResult<Vec<LedgerAccount>> {
        self.storage.list_accounts(Some(account_type)).await
    }

    /// All accounts below `account_id`, depth-first
    pub async fn descendants(&self, account_id: AccountId) -> LedgerResult<Vec<(usize, LedgerAccount)>> {
        let tree = self.tree().await?;
        if !tree.contains(account_id) {
            return Err(LedgerError::not_found("account", account_id));
        }
        Ok(tree
            .descendants(account_id)
            .into_iter()
            .map(|entry| (entry.depth, entry.account.clone()))
            .collect())
    }

    /// Get the full path to an account (for hierarchical display)
    pub async fn account_path(&self, account_id: AccountId) -> LedgerResult<Vec<LedgerAccount>> {
        let tree = self.tree().await?;
        if !tree.contains(account_id) {
            return Err(LedgerError::not_found("account", account_id));
        }
        Ok(tree.path(account_id).into_iter().cloned().collect())
    }
}

/// Utility functions for working with accounts
pub mod utils {
    use super::*;

    /// Create a basic cooperative chart of accounts.
    ///
    /// Group nodes are control accounts; the returned map is keyed by code.
    pub async fn create_standard_chart<S: LedgerStorage>(
        chart: &ChartOfAccounts<S>,
    ) -> LedgerResult<HashMap<String, LedgerAccount>> {
        let mut accounts = HashMap::new();

        let groups = [
            ("1000", "Assets", AccountType::Asset),
            ("2000", "Liabilities", AccountType::Liability),
            ("3000", "Equity", AccountType::Equity),
            ("4000", "Income", AccountType::Income),
            ("5000", "Expenses", AccountType::Expense),
        ];
        for (code, name, account_type) in groups {
            let group = chart
                .create_account(NewAccount::new(code, name, account_type).control())
                .await?;
            accounts.insert(code.to_string(), group);
        }

        let leaves = [
            ("1111", "Cash in Hand", "1000", true),
            ("1112", "Cash at Bank", "1000", true),
            ("1200", "Loans to Members", "1000", false),
            ("2100", "Member Savings Deposits", "2000", false),
            ("2200", "Borrowings", "2000", false),
            ("3100", "Share Capital", "3000", false),
            ("3200", "Statutory Reserve", "3000", false),
            ("4100", "Interest on Loans", "4000", false),
            ("4200", "Fees and Commission", "4000", false),
            ("5010", "Interest on Deposits", "5000", false),
            ("5020", "Salaries", "5000", false),
            ("5030", "Office Expense", "5000", false),
        ];
        for (code, name, parent_code, is_cash) in leaves {
            let parent = &accounts[parent_code];
            let mut input = NewAccount::new(code, name, parent.account_type).under(parent.id);
            if is_cash {
                input = input.cash();
            }
            let account = chart.create_account(input).await?;
            accounts.insert(code.to_string(), account);
        }

        Ok(accounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::MemoryStorage;
    use proptest::prelude::*;

    fn node(id: i64, code: &str, parent: Option<i64>) -> LedgerAccount {
        let mut input = NewAccount::new(code, code, AccountType::Asset);
        input.parent_id = parent.map(AccountId);
        LedgerAccount::new(AccountId(id), &input)
    }

    #[test]
    fn test_tree_walks_terminate_on_corrupt_cycle() {
        // 1 -> 2 -> 3 -> 1
        let tree = AccountTree::from_accounts(vec![
            node(1, "1000", Some(3)),
            node(2, "1100", Some(1)),
            node(3, "1110", Some(2)),
        ]);

        assert!(tree.roots().is_empty());
        assert_eq!(tree.descendants(AccountId(1)).len(), 2);
        assert_eq!(tree.path(AccountId(3)).len(), 3);
        assert_eq!(tree.cyclic_accounts().len(), 3);
        assert!(tree.is_in_subtree(AccountId(3), AccountId(1)));
    }

    #[test]
    fn test_render_orders_by_code() {
        let tree = AccountTree::from_accounts(vec![
            node(1, "2000", None),
            node(2, "1000", None),
            node(3, "1200", Some(2)),
            node(4, "1100", Some(2)),
            node(5, "1110", Some(4)),
        ]);

        let rendered: Vec<(usize, &str)> = tree
            .render()
            .iter()
            .map(|e| (e.depth, e.account.code.as_str()))
            .collect();
        assert_eq!(
            rendered,
            vec![(0, "1000"), (1, "1100"), (2, "1110"), (1, "1200"), (0, "2000")]
        );
    }

    #[test]
    fn test_leaf_flag_drift_detected() {
        let parent = node(1, "1000", None);
        let child = node(2, "1100", Some(1));
        let tree = AccountTree::from_accounts(vec![parent, child]);
        assert_eq!(tree.leaf_flag_drift(), vec![AccountId(1)]);
    }

    proptest! {
        #[test]
        fn prop_chain_subtree_membership(len in 1usize..30, a in 0usize..30, b in 0usize..30) {
            let a = a % len;
            let b = b % len;
            // chain 0 <- 1 <- 2 ... each node's parent is the previous one
            let accounts = (0..len)
                .map(|i| node(i as i64 + 1, &format!("{:04}", i), i.checked_sub(1).map(|p| p as i64 + 1)))
                .collect();
            let tree = AccountTree::from_accounts(accounts);

            let in_subtree = tree.is_in_subtree(AccountId(b as i64 + 1), AccountId(a as i64 + 1));
            prop_assert_eq!(in_subtree, b >= a);
            prop_assert!(tree.cyclic_accounts().is_empty());
        }
    }

    #[tokio::test]
    async fn test_create_marks_parent_non_leaf() {
        let chart = ChartOfAccounts::new(MemoryStorage::new());
        let parent = chart
            .create_account(NewAccount::new("2000", "Liabilities", AccountType::Liability))
            .await
            .unwrap();
        assert!(parent.is_leaf);

        chart
            .create_account(
                NewAccount::new("2010", "Savings", AccountType::Liability).under(parent.id),
            )
            .await
            .unwrap();

        let parent = chart.get_account_required(parent.id).await.unwrap();
        assert!(!parent.is_leaf);
    }

    #[tokio::test]
    async fn test_create_with_missing_parent() {
        let chart = ChartOfAccounts::new(MemoryStorage::new());
        let result = chart
            .create_account(NewAccount::new("1100", "Cash", AccountType::Asset).under(AccountId(99)))
            .await;
        assert!(matches!(result, Err(LedgerError::NotFound { .. })));
        assert!(chart.list_accounts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let chart = ChartOfAccounts::new(MemoryStorage::new());
        chart
            .create_account(NewAccount::new("1111", "Cash", AccountType::Asset))
            .await
            .unwrap();
        let result = chart
            .create_account(NewAccount::new("1111", "Cash again", AccountType::Asset))
            .await;
        assert!(matches!(result, Err(LedgerError::DuplicateCode(code)) if code == "1111"));
    }

    #[tokio::test]
    async fn test_move_restores_old_parent_leaf() {
        let chart = ChartOfAccounts::new(MemoryStorage::new());
        let a = chart
            .create_account(NewAccount::new("1000", "A", AccountType::Asset))
            .await
            .unwrap();
        let b = chart
            .create_account(NewAccount::new("1500", "B", AccountType::Asset))
            .await
            .unwrap();
        let child = chart
            .create_account(NewAccount::new("1100", "Child", AccountType::Asset).under(a.id))
            .await
            .unwrap();

        chart.move_account(child.id, Some(b.id)).await.unwrap();

        assert!(chart.get_account_required(a.id).await.unwrap().is_leaf);
        assert!(!chart.get_account_required(b.id).await.unwrap().is_leaf);
        let path = chart.account_path(child.id).await.unwrap();
        assert_eq!(path.iter().map(|a| a.code.as_str()).collect::<Vec<_>>(), vec!["1500", "1100"]);
    }

    #[tokio::test]
    async fn test_move_onto_itself_is_cycle() {
        let chart = ChartOfAccounts::new(MemoryStorage::new());
        let a = chart
            .create_account(NewAccount::new("1000", "A", AccountType::Asset))
            .await
            .unwrap();
        let result = chart.move_account(a.id, Some(a.id)).await;
        assert!(matches!(result, Err(LedgerError::Cycle { .. })));
    }

    #[tokio::test]
    async fn test_recode_to_taken_code() {
        let chart = ChartOfAccounts::new(MemoryStorage::new());
        chart
            .create_account(NewAccount::new("1000", "A", AccountType::Asset))
            .await
            .unwrap();
        let b = chart
            .create_account(NewAccount::new("1500", "B", AccountType::Asset))
            .await
            .unwrap();

        let result = chart
            .update_account(
                b.id,
                AccountChanges {
                    code: Some("1000".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(LedgerError::DuplicateCode(_))));

        let renamed = chart
            .update_account(
                b.id,
                AccountChanges {
                    name: Some("Fixed Assets".to_string()),
                    account_type: Some(AccountType::Asset),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Fixed Assets");
        assert_eq!(renamed.code, "1500");
    }

    #[tokio::test]
    async fn test_standard_chart() {
        let chart = ChartOfAccounts::new(MemoryStorage::new());
        let accounts = utils::create_standard_chart(&chart).await.unwrap();

        assert!(!accounts["1000"].is_leaf);
        assert!(accounts["1111"].is_cash);
        let tree = chart.tree().await.unwrap();
        assert!(tree.leaf_flag_drift().is_empty());
        assert_eq!(tree.roots().len(), 5);
        assert_eq!(tree.children(accounts["5000"].id).len(), 3);
    }
}
