use crate::DbError;
use async_trait::async_trait;
use core_types::{Alert, Direction, NewAlert, User};
use rust_decimal::Decimal;
use sqlx::FromRow;
use sqlx::postgres::PgPool;

/// The data-access contract the engine works against. `DbRepository` is the
/// live implementation; engine tests substitute an in-memory fake.
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Returns the user registered for `telegram_id`, creating one if absent.
    /// Idempotent under concurrent calls for the same id: the UNIQUE
    /// constraint guarantees at most one row.
    async fn ensure_user(
        &self,
        telegram_id: i64,
        first_name: &str,
        chat_id: i64,
    ) -> Result<User, DbError>;

    /// Persists a fully-collected alert and returns it with its assigned id.
    async fn create_alert(&self, new_alert: NewAlert) -> Result<Alert, DbError>;

    /// All alerts owned by the user registered for `telegram_id`, oldest
    /// first. `DbError::UserNotFound` if that identity was never registered.
    async fn alerts_for_user(&self, telegram_id: i64) -> Result<Vec<Alert>, DbError>;

    /// Deletes the alert only if it exists and belongs to `owner_id`.
    /// Returns whether a row was deleted; a miss is `false`, never an error,
    /// so ownership of other users' alert ids is not leaked and a second
    /// delete of the same id is a no-op.
    async fn delete_alert(&self, alert_id: i64, owner_id: i64) -> Result<bool, DbError>;

    /// A consistent snapshot of every alert joined with its owner. Used
    /// exclusively by the evaluator; ordering is unspecified.
    async fn scan_with_owners(&self) -> Result<Vec<(Alert, User)>, DbError>;
}

/// The `DbRepository` provides the PostgreSQL-backed `AlertStore`. It
/// encapsulates all SQL queries and data access logic; each operation
/// acquires its own connection from the shared pool.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: PgPool,
}

// Row structs mirror the table schemas; direction travels as text and is
// decoded into the closed enum on the way out.
#[derive(FromRow, Debug, Clone)]
struct UserRow {
    id: i64,
    telegram_id: i64,
    first_name: String,
    chat_id: i64,
}

#[derive(FromRow, Debug, Clone)]
struct AlertRow {
    id: i64,
    user_id: i64,
    symbol: String,
    direction: String,
    target_price: Decimal,
}

#[derive(FromRow, Debug, Clone)]
struct AlertWithOwnerRow {
    alert_id: i64,
    user_id: i64,
    symbol: String,
    direction: String,
    target_price: Decimal,
    owner_id: i64,
    telegram_id: i64,
    first_name: String,
    chat_id: i64,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            telegram_id: row.telegram_id,
            first_name: row.first_name,
            chat_id: row.chat_id,
        }
    }
}

impl TryFrom<AlertRow> for Alert {
    type Error = DbError;

    fn try_from(row: AlertRow) -> Result<Self, DbError> {
        let direction = Direction::from_db_str(&row.direction).ok_or_else(|| {
            DbError::Decode(format!("unknown direction '{}' in alert {}", row.direction, row.id))
        })?;
        Ok(Alert {
            id: row.id,
            user_id: row.user_id,
            symbol: row.symbol,
            direction,
            target_price: row.target_price,
        })
    }
}

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_user_by_telegram_id(&self, telegram_id: i64) -> Result<Option<User>, DbError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, telegram_id, first_name, chat_id FROM users WHERE telegram_id = $1",
        )
        .bind(telegram_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }
}

#[async_trait]
impl AlertStore for DbRepository {
    async fn ensure_user(
        &self,
        telegram_id: i64,
        first_name: &str,
        chat_id: i64,
    ) -> Result<User, DbError> {
        // DO NOTHING rather than a read-then-write check: two concurrent
        // registrations for the same id both land here and exactly one insert
        // wins; the follow-up read sees whichever row exists.
        sqlx::query(
            r#"
            INSERT INTO users (telegram_id, first_name, chat_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (telegram_id) DO NOTHING
            "#,
        )
        .bind(telegram_id)
        .bind(first_name)
        .bind(chat_id)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, telegram_id, first_name, chat_id FROM users WHERE telegram_id = $1",
        )
        .bind(telegram_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn create_alert(&self, new_alert: NewAlert) -> Result<Alert, DbError> {
        // `NewAlert::new` already normalizes and validates; re-check here so
        // a hand-built value can never slip a partial alert into the table.
        if new_alert.symbol.trim().is_empty() {
            return Err(DbError::InvalidAlert("symbol must not be empty".to_string()));
        }
        if new_alert.target_price <= Decimal::ZERO {
            return Err(DbError::InvalidAlert(format!(
                "target price must be positive, got {}",
                new_alert.target_price
            )));
        }

        let row = sqlx::query_as::<_, AlertRow>(
            r#"
            INSERT INTO alerts (user_id, symbol, direction, target_price)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, symbol, direction, target_price
            "#,
        )
        .bind(new_alert.user_id)
        .bind(&new_alert.symbol)
        .bind(new_alert.direction.as_db_str())
        .bind(new_alert.target_price)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            // 23503: foreign_key_violation, i.e. the owner row does not exist.
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23503") => {
                DbError::InvalidAlert(format!("unknown owner user id {}", new_alert.user_id))
            }
            _ => DbError::from(e),
        })?;

        row.try_into()
    }

    async fn alerts_for_user(&self, telegram_id: i64) -> Result<Vec<Alert>, DbError> {
        let user = self
            .find_user_by_telegram_id(telegram_id)
            .await?
            .ok_or(DbError::UserNotFound)?;

        let rows = sqlx::query_as::<_, AlertRow>(
            r#"
            SELECT id, user_id, symbol, direction, target_price
            FROM alerts
            WHERE user_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(user.id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Alert::try_from).collect()
    }

    async fn delete_alert(&self, alert_id: i64, owner_id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM alerts WHERE id = $1 AND user_id = $2")
            .bind(alert_id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn scan_with_owners(&self) -> Result<Vec<(Alert, User)>, DbError> {
        // A single JOIN SELECT: one statement, one snapshot. No alert shows
        // up twice and no half-written alert is visible.
        let rows = sqlx::query_as::<_, AlertWithOwnerRow>(
            r#"
            SELECT
                a.id AS alert_id, a.user_id, a.symbol, a.direction, a.target_price,
                u.id AS owner_id, u.telegram_id, u.first_name, u.chat_id
            FROM alerts AS a
            JOIN users AS u ON a.user_id = u.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let direction = Direction::from_db_str(&row.direction).ok_or_else(|| {
                    DbError::Decode(format!(
                        "unknown direction '{}' in alert {}",
                        row.direction, row.alert_id
                    ))
                })?;
                let alert = Alert {
                    id: row.alert_id,
                    user_id: row.user_id,
                    symbol: row.symbol,
                    direction,
                    target_price: row.target_price,
                };
                let user = User {
                    id: row.owner_id,
                    telegram_id: row.telegram_id,
                    first_name: row.first_name,
                    chat_id: row.chat_id,
                };
                Ok((alert, user))
            })
            .collect()
    }
}
