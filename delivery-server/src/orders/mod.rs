//! Order aggregate: checkout, status transitions and read models
//!
//! Every mutating operation runs in one redb write transaction and returns
//! the domain events it produced; those are published only after the commit
//! succeeded, so no SMS or push ever describes state that was rolled back.

pub mod checkout;
pub mod pricing;
pub mod queries;
pub mod status;

use shared::error::{AppError, ErrorCode};
use shared::models::Account;
use std::sync::Arc;

use crate::error::ServiceResult;
use crate::events::EventBus;
use crate::storage::{Storage, StorageResult};

pub use status::{AppliedTransition, TransitionOutcome};

#[derive(Clone)]
pub struct OrderService {
    storage: Storage,
    events: Arc<EventBus>,
}

impl OrderService {
    pub fn new(storage: Storage, events: Arc<EventBus>) -> Self {
        Self { storage, events }
    }
}

/// Active (not deleted) account or `UserNotFound`
pub(crate) fn require_active(
    account: StorageResult<Option<Account>>,
    user_id: &str,
) -> ServiceResult<Account> {
    account?.filter(Account::is_active).ok_or_else(|| {
        AppError::new(ErrorCode::UserNotFound)
            .with_detail("user_id", user_id)
            .into()
    })
}
