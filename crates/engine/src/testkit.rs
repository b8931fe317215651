//! In-memory fakes for the three I/O seams, so dispatch and evaluator tests
//! run without Postgres, Binance, or Telegram.

use async_trait::async_trait;
use core_types::{Alert, Direction, NewAlert, User};
use database::{AlertStore, DbError};
use price_client::{PriceSource, error::PriceError};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use telegram::{Notifier, error::TelegramError};

/// An `AlertStore` over two vectors. Mirrors the live repository's
/// guarantees: unique users per telegram id, owner-scoped idempotent
/// deletes, validated inserts.
#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Vec<User>>,
    alerts: Mutex<Vec<Alert>>,
    next_user_id: AtomicI64,
    next_alert_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            next_user_id: AtomicI64::new(1),
            next_alert_id: AtomicI64::new(1),
            ..Self::default()
        }
    }

    pub fn seed_user(&self, telegram_id: i64, first_name: &str, chat_id: i64) -> User {
        let user = User {
            id: self.next_user_id.fetch_add(1, Ordering::SeqCst),
            telegram_id,
            first_name: first_name.to_string(),
            chat_id,
        };
        self.users.lock().unwrap().push(user.clone());
        user
    }

    pub fn seed_alert(
        &self,
        user_id: i64,
        symbol: &str,
        direction: Direction,
        target_price: Decimal,
    ) -> Alert {
        let alert = Alert {
            id: self.next_alert_id.fetch_add(1, Ordering::SeqCst),
            user_id,
            symbol: symbol.to_string(),
            direction,
            target_price,
        };
        self.alerts.lock().unwrap().push(alert.clone());
        alert
    }

    pub fn user_count(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    pub fn user_by_telegram_id(&self, telegram_id: i64) -> Option<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.telegram_id == telegram_id)
            .cloned()
    }

    pub fn all_alerts(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn ensure_user(
        &self,
        telegram_id: i64,
        first_name: &str,
        chat_id: i64,
    ) -> Result<User, DbError> {
        let mut users = self.users.lock().unwrap();
        if let Some(existing) = users.iter().find(|u| u.telegram_id == telegram_id) {
            return Ok(existing.clone());
        }
        let user = User {
            id: self.next_user_id.fetch_add(1, Ordering::SeqCst),
            telegram_id,
            first_name: first_name.to_string(),
            chat_id,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn create_alert(&self, new_alert: NewAlert) -> Result<Alert, DbError> {
        if new_alert.symbol.trim().is_empty() {
            return Err(DbError::InvalidAlert("symbol must not be empty".to_string()));
        }
        if new_alert.target_price <= Decimal::ZERO {
            return Err(DbError::InvalidAlert("target price must be positive".to_string()));
        }
        if !self.users.lock().unwrap().iter().any(|u| u.id == new_alert.user_id) {
            return Err(DbError::InvalidAlert(format!(
                "unknown owner user id {}",
                new_alert.user_id
            )));
        }

        Ok(self.seed_alert(
            new_alert.user_id,
            &new_alert.symbol,
            new_alert.direction,
            new_alert.target_price,
        ))
    }

    async fn alerts_for_user(&self, telegram_id: i64) -> Result<Vec<Alert>, DbError> {
        let user = self
            .user_by_telegram_id(telegram_id)
            .ok_or(DbError::UserNotFound)?;
        Ok(self
            .alerts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.user_id == user.id)
            .cloned()
            .collect())
    }

    async fn delete_alert(&self, alert_id: i64, owner_id: i64) -> Result<bool, DbError> {
        let mut alerts = self.alerts.lock().unwrap();
        let before = alerts.len();
        alerts.retain(|a| !(a.id == alert_id && a.user_id == owner_id));
        Ok(alerts.len() < before)
    }

    async fn scan_with_owners(&self) -> Result<Vec<(Alert, User)>, DbError> {
        let users = self.users.lock().unwrap();
        let alerts = self.alerts.lock().unwrap();
        Ok(alerts
            .iter()
            .filter_map(|a| {
                users
                    .iter()
                    .find(|u| u.id == a.user_id)
                    .map(|u| (a.clone(), u.clone()))
            })
            .collect())
    }
}

/// A `PriceSource` answering from a fixed table, recording every fetch.
#[derive(Default)]
pub struct StaticPrices {
    prices: Mutex<HashMap<String, Decimal>>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl StaticPrices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, symbol: &str, price: Decimal) {
        self.prices.lock().unwrap().insert(symbol.to_string(), price);
    }

    /// Makes every fetch of `symbol` fail with a transport error.
    pub fn fail(&self, symbol: &str) {
        self.failing.lock().unwrap().insert(symbol.to_string());
    }

    /// Every symbol fetched so far, in order, repeats included.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceSource for StaticPrices {
    async fn latest_price(&self, symbol: &str) -> Result<Decimal, PriceError> {
        self.calls.lock().unwrap().push(symbol.to_string());
        if self.failing.lock().unwrap().contains(symbol) {
            return Err(PriceError::Network("injected failure".to_string()));
        }
        self.prices
            .lock()
            .unwrap()
            .get(symbol)
            .copied()
            .ok_or_else(|| PriceError::NotFound(symbol.to_string()))
    }
}

/// A `Notifier` that records every send, with a switchable failure mode.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(i64, String)>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_sends(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn recover(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TelegramError::ApiError("injected send failure".to_string()));
        }
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The fake must honor the same idempotence contract as the live store.
    #[tokio::test]
    async fn ensure_user_is_idempotent() {
        let store = MemoryStore::new();
        let first = store.ensure_user(42, "Ada", 4242).await.unwrap();
        let second = store.ensure_user(42, "Ada", 4242).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn create_alert_rejects_unknown_owner() {
        let store = MemoryStore::new();
        let new_alert = NewAlert::new(99, "BTC", Direction::LowerOrEqual, Decimal::ONE).unwrap();
        assert!(matches!(
            store.create_alert(new_alert).await,
            Err(DbError::InvalidAlert(_))
        ));
    }
}
