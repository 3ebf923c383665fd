//! redb-based storage for orders and their collaborators
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `Order` | Orders with line items and options |
//! | `placed_orders` | `order_id` | `created_at` | Index of orders still in PLACED |
//! | `accounts` | `user_id` | `Account` | Buyers and owners (deposit / balance) |
//! | `stores` | `store_id` | `Store` | Store directory |
//! | `menus` | `menu_id` | `MenuItem` | Catalog items |
//! | `menu_options` | `option_id` | `MenuOption` | Catalog options |
//! | `baskets` | `user_id` | `Basket` | One basket per buyer |
//! | `sequence` | name | `u64` | Counters (basket item ids) |
//!
//! Every table lives in one database, so a checkout (debit + order + basket
//! reset) or a status transition (status + refund/credit) is a single write
//! transaction. redb serialises write transactions, which makes the
//! read-check-write on an order's status a compare-and-set.

use redb::{
    Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use serde::de::DeserializeOwned;
use shared::models::{Account, Basket, MenuItem, MenuOption, Order, OrderStatus, Store};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

const ORDERS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("orders");

/// PLACED order index: key = order_id, value = created_at (millis)
const PLACED_ORDERS_TABLE: TableDefinition<i64, i64> = TableDefinition::new("placed_orders");

const ACCOUNTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("accounts");
const STORES_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("stores");
const MENUS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("menus");
const MENU_OPTIONS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("menu_options");
const BASKETS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("baskets");
const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequence");

pub const BASKET_ITEM_SEQUENCE: &str = "basket_item";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StorageResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Storage backed by redb
#[derive(Clone)]
pub struct Storage {
    db: Arc<Database>,
}

impl Storage {
    /// Open or create the database at the given path
    ///
    /// redb commits with `Durability::Immediate`: once `commit()` returns the
    /// order and the balance change it carries are on disk together.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (tests and throwaway runs)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(PLACED_ORDERS_TABLE)?;
            let _ = write_txn.open_table(ACCOUNTS_TABLE)?;
            let _ = write_txn.open_table(STORES_TABLE)?;
            let _ = write_txn.open_table(MENUS_TABLE)?;
            let _ = write_txn.open_table(MENU_OPTIONS_TABLE)?;
            let _ = write_txn.open_table(BASKETS_TABLE)?;
            let _ = write_txn.open_table(SEQUENCE_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction (blocks while another writer is active)
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    pub fn commit(txn: WriteTransaction) -> StorageResult<()> {
        txn.commit()?;
        Ok(())
    }

    /// Run `f` in its own write transaction and commit
    fn write<F>(&self, f: F) -> StorageResult<()>
    where
        F: FnOnce(&WriteTransaction) -> StorageResult<()>,
    {
        let txn = self.begin_write()?;
        f(&txn)?;
        Self::commit(txn)
    }

    // ========== Sequence ==========

    /// Increment and return the named counter
    pub fn next_sequence(&self, txn: &WriteTransaction, key: &str) -> StorageResult<u64> {
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        let current = table.get(key)?.map(|guard| guard.value()).unwrap_or(0);
        let next = current + 1;
        table.insert(key, next)?;
        Ok(next)
    }

    // ========== Orders ==========

    /// Insert or overwrite an order, keeping the PLACED index in step
    pub fn put_order(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let value = serde_json::to_vec(order)?;
        {
            let mut table = txn.open_table(ORDERS_TABLE)?;
            table.insert(order.id, value.as_slice())?;
        }
        let mut placed = txn.open_table(PLACED_ORDERS_TABLE)?;
        if order.status == OrderStatus::Placed {
            placed.insert(order.id, order.created_at)?;
        } else {
            placed.remove(order.id)?;
        }
        Ok(())
    }

    pub fn get_order(&self, order_id: i64) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: i64,
    ) -> StorageResult<Option<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    /// Scan all orders, keeping those matching `filter`
    fn scan_orders(&self, filter: impl Fn(&Order) -> bool) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let order: Order = decode(value.value())?;
            if filter(&order) {
                orders.push(order);
            }
        }
        Ok(orders)
    }

    /// Orders placed by a buyer, newest first
    pub fn orders_by_buyer(&self, buyer_id: &str) -> StorageResult<Vec<Order>> {
        let mut orders = self.scan_orders(|o| o.buyer_id == buyer_id)?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// Orders received by a store, newest first
    pub fn orders_by_store(&self, store_id: i64) -> StorageResult<Vec<Order>> {
        let mut orders = self.scan_orders(|o| o.store_id == store_id)?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// COMPLETED orders whose completion time lies in `[from, to]`
    pub fn completed_orders_between(&self, from: i64, to: i64) -> StorageResult<Vec<Order>> {
        self.scan_orders(|o| {
            o.status == OrderStatus::Completed && o.updated_at >= from && o.updated_at <= to
        })
    }

    /// Ids of PLACED orders created at or before `cutoff`, oldest first
    pub fn placed_orders_created_before(&self, cutoff: i64) -> StorageResult<Vec<i64>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PLACED_ORDERS_TABLE)?;

        let mut candidates = Vec::new();
        for result in table.iter()? {
            let (key, value) = result?;
            let created_at = value.value();
            if created_at <= cutoff {
                candidates.push((created_at, key.value()));
            }
        }
        candidates.sort_unstable();
        Ok(candidates.into_iter().map(|(_, id)| id).collect())
    }

    // ========== Accounts ==========

    pub fn put_account(&self, txn: &WriteTransaction, account: &Account) -> StorageResult<()> {
        let value = serde_json::to_vec(account)?;
        let mut table = txn.open_table(ACCOUNTS_TABLE)?;
        table.insert(account.user_id.as_str(), value.as_slice())?;
        Ok(())
    }

    pub fn get_account(&self, user_id: &str) -> StorageResult<Option<Account>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACCOUNTS_TABLE)?;
        match table.get(user_id)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_account_txn(
        &self,
        txn: &WriteTransaction,
        user_id: &str,
    ) -> StorageResult<Option<Account>> {
        let table = txn.open_table(ACCOUNTS_TABLE)?;
        match table.get(user_id)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    // ========== Stores ==========

    pub fn put_store(&self, txn: &WriteTransaction, store: &Store) -> StorageResult<()> {
        let value = serde_json::to_vec(store)?;
        let mut table = txn.open_table(STORES_TABLE)?;
        table.insert(store.store_id, value.as_slice())?;
        Ok(())
    }

    pub fn get_store(&self, store_id: i64) -> StorageResult<Option<Store>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(STORES_TABLE)?;
        match table.get(store_id)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_store_txn(
        &self,
        txn: &WriteTransaction,
        store_id: i64,
    ) -> StorageResult<Option<Store>> {
        let table = txn.open_table(STORES_TABLE)?;
        match table.get(store_id)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    // ========== Catalog ==========

    pub fn put_menu(&self, txn: &WriteTransaction, menu: &MenuItem) -> StorageResult<()> {
        let value = serde_json::to_vec(menu)?;
        let mut table = txn.open_table(MENUS_TABLE)?;
        table.insert(menu.menu_id, value.as_slice())?;
        Ok(())
    }

    /// Batched menu lookup; ids that do not resolve are absent from the map
    pub fn get_menus_txn(
        &self,
        txn: &WriteTransaction,
        menu_ids: &[i64],
    ) -> StorageResult<HashMap<i64, MenuItem>> {
        let table = txn.open_table(MENUS_TABLE)?;
        let mut menus = HashMap::with_capacity(menu_ids.len());
        for &menu_id in menu_ids {
            if let Some(value) = table.get(menu_id)? {
                menus.insert(menu_id, decode(value.value())?);
            }
        }
        Ok(menus)
    }

    pub fn put_menu_option(&self, txn: &WriteTransaction, option: &MenuOption) -> StorageResult<()> {
        let value = serde_json::to_vec(option)?;
        let mut table = txn.open_table(MENU_OPTIONS_TABLE)?;
        table.insert(option.option_id, value.as_slice())?;
        Ok(())
    }

    /// Batched option lookup; ids that do not resolve are absent from the map
    pub fn get_menu_options_txn(
        &self,
        txn: &WriteTransaction,
        option_ids: &[i64],
    ) -> StorageResult<HashMap<i64, MenuOption>> {
        let table = txn.open_table(MENU_OPTIONS_TABLE)?;
        let mut options = HashMap::with_capacity(option_ids.len());
        for &option_id in option_ids {
            if let Some(value) = table.get(option_id)? {
                options.insert(option_id, decode(value.value())?);
            }
        }
        Ok(options)
    }

    // ========== Baskets ==========

    pub fn put_basket(&self, txn: &WriteTransaction, basket: &Basket) -> StorageResult<()> {
        let value = serde_json::to_vec(basket)?;
        let mut table = txn.open_table(BASKETS_TABLE)?;
        table.insert(basket.user_id.as_str(), value.as_slice())?;
        Ok(())
    }

    pub fn get_basket(&self, user_id: &str) -> StorageResult<Option<Basket>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BASKETS_TABLE)?;
        match table.get(user_id)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_basket_txn(
        &self,
        txn: &WriteTransaction,
        user_id: &str,
    ) -> StorageResult<Option<Basket>> {
        let table = txn.open_table(BASKETS_TABLE)?;
        match table.get(user_id)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    // ========== Directory (seeding) ==========

    pub fn upsert_account(&self, account: &Account) -> StorageResult<()> {
        self.write(|txn| self.put_account(txn, account))
    }

    pub fn upsert_store(&self, store: &Store) -> StorageResult<()> {
        self.write(|txn| self.put_store(txn, store))
    }

    pub fn upsert_menu(&self, menu: &MenuItem) -> StorageResult<()> {
        self.write(|txn| self.put_menu(txn, menu))
    }

    pub fn upsert_menu_option(&self, option: &MenuOption) -> StorageResult<()> {
        self.write(|txn| self.put_menu_option(txn, option))
    }
}
