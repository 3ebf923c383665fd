//! Seeded in-memory directory shared by the unit tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use shared::models::{Account, MenuItem, MenuOption, Order, OrderItem, OrderStatus, Role, Store};

use crate::events::{DomainEvent, EventListener};
use crate::storage::Storage;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

static NEXT_ORDER_ID: AtomicI64 = AtomicI64::new(1);

pub struct Fixture {
    pub storage: Storage,
}

impl Fixture {
    pub const BUYER: &'static str = "buyer";
    pub const OWNER: &'static str = "owner";
    pub const OTHER_OWNER: &'static str = "other-owner";

    /// min order 10,000
    pub const STORE: i64 = 1;
    /// no minimum
    pub const OTHER_STORE: i64 = 2;

    pub const MENU_BIBIMBAP: i64 = 10; // 9,000
    pub const MENU_SOLD_OUT: i64 = 11;
    pub const MENU_REMOVED: i64 = 12;
    pub const MENU_SIDE: i64 = 13; // 3,000
    pub const MENU_OTHER_STORE: i64 = 20; // 7,000

    pub const OPTION_EGG: i64 = 100; // 500, on bibimbap

    pub fn new() -> Self {
        let storage = Storage::open_in_memory().unwrap();

        let account = |user_id: &str, role: Role, deposit: i64, store_id: Option<i64>| Account {
            user_id: user_id.into(),
            name: user_id.into(),
            phone: "010-1234-5678".into(),
            role,
            deposit,
            balance: 0,
            store_id,
            deleted: false,
        };
        storage.upsert_account(&account(Self::BUYER, Role::User, 15_000, None)).unwrap();
        storage.upsert_account(&account(Self::OWNER, Role::Owner, 0, Some(Self::STORE))).unwrap();
        storage
            .upsert_account(&account(Self::OTHER_OWNER, Role::Owner, 0, Some(Self::OTHER_STORE)))
            .unwrap();

        storage
            .upsert_store(&Store {
                store_id: Self::STORE,
                name: "Seoul Kitchen".into(),
                owner_id: Self::OWNER.into(),
                min_order_price: 10_000,
                deleted: false,
            })
            .unwrap();
        storage
            .upsert_store(&Store {
                store_id: Self::OTHER_STORE,
                name: "Noodle Bar".into(),
                owner_id: Self::OTHER_OWNER.into(),
                min_order_price: 0,
                deleted: false,
            })
            .unwrap();

        let menu = |menu_id: i64, store_id: i64, name: &str, price: i64| MenuItem {
            menu_id,
            store_id,
            name: name.into(),
            price,
            sold_out: false,
            deleted: false,
        };
        storage.upsert_menu(&menu(Self::MENU_BIBIMBAP, Self::STORE, "Bibimbap", 9_000)).unwrap();
        storage
            .upsert_menu(&MenuItem {
                sold_out: true,
                ..menu(Self::MENU_SOLD_OUT, Self::STORE, "Bulgogi", 12_000)
            })
            .unwrap();
        storage
            .upsert_menu(&MenuItem {
                deleted: true,
                ..menu(Self::MENU_REMOVED, Self::STORE, "Japchae", 8_000)
            })
            .unwrap();
        storage.upsert_menu(&menu(Self::MENU_SIDE, Self::STORE, "Kimchi Pancake", 3_000)).unwrap();
        storage
            .upsert_menu(&menu(Self::MENU_OTHER_STORE, Self::OTHER_STORE, "Naengmyeon", 7_000))
            .unwrap();

        storage
            .upsert_menu_option(&MenuOption {
                option_id: Self::OPTION_EGG,
                menu_id: Self::MENU_BIBIMBAP,
                name: "Fried egg".into(),
                price: 500,
            })
            .unwrap();

        Self { storage }
    }

    pub fn deposit(&self, user_id: &str) -> i64 {
        self.storage.get_account(user_id).unwrap().unwrap().deposit
    }

    pub fn balance(&self, user_id: &str) -> i64 {
        self.storage.get_account(user_id).unwrap().unwrap().balance
    }

    pub fn menu(&self, menu_id: i64) -> MenuItem {
        let txn = self.storage.begin_write().unwrap();
        self.storage.get_menus_txn(&txn, &[menu_id]).unwrap().remove(&menu_id).unwrap()
    }

    /// Insert an order for BUYER at STORE directly, without debiting
    pub fn insert_order(&self, total: i64, status: OrderStatus, created_at: i64, updated_at: i64) -> i64 {
        let order = Order {
            id: NEXT_ORDER_ID.fetch_add(1, Ordering::Relaxed),
            created_at,
            updated_at,
            status,
            total_price: total,
            address: "12 Harbor Rd".into(),
            address_detail: String::new(),
            buyer_id: Self::BUYER.into(),
            store_id: Self::STORE,
            items: vec![OrderItem {
                menu_id: Self::MENU_BIBIMBAP,
                menu_name: "Bibimbap".into(),
                unit_price: total,
                quantity: 1,
                total_price: total,
                options: Vec::new(),
            }],
        };
        let txn = self.storage.begin_write().unwrap();
        self.storage.put_order(&txn, &order).unwrap();
        Storage::commit(txn).unwrap();
        order.id
    }

    pub fn placed_order(&self, total: i64, created_at: i64) -> i64 {
        self.insert_order(total, OrderStatus::Placed, created_at, created_at)
    }

    pub fn completed_order(&self, total: i64, completed_at: i64) -> i64 {
        self.insert_order(total, OrderStatus::Completed, completed_at, completed_at)
    }
}

/// Listener that keeps every event it receives
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<DomainEvent>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl EventListener for Recorder {
    fn name(&self) -> &'static str {
        "recorder"
    }

    fn accepts(&self, _event: &DomainEvent) -> bool {
        true
    }

    async fn handle(&self, event: &DomainEvent) -> Result<(), BoxError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}
