use conversation::{Conversations, SubmitOutcome};
use database::{AlertStore, DbError};
use std::sync::Arc;
use telegram::Notifier;

/// One inbound chat message, already unpacked from the transport's update
/// format: who sent it, where to answer, and what they said.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub telegram_id: i64,
    pub first_name: String,
    pub chat_id: i64,
    pub text: String,
}

/// Maps inbound messages to store operations and conversation transitions.
/// One `handle` call per message; calls for different chats run concurrently
/// and never share drafts.
pub struct Dispatcher {
    store: Arc<dyn AlertStore>,
    notifier: Arc<dyn Notifier>,
    conversations: Conversations,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn AlertStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            conversations: Conversations::new(),
        }
    }

    /// Handles one message end to end. Everything that can go wrong is
    /// answered or logged here; a chat message never crashes the process.
    pub async fn handle(&self, msg: Inbound) {
        let reply = self.route(&msg).await;
        if let Err(e) = self.notifier.send_message(msg.chat_id, &reply).await {
            tracing::error!(chat_id = msg.chat_id, error = %e, "Failed to send reply");
        }
    }

    async fn route(&self, msg: &Inbound) -> String {
        let text = msg.text.trim();

        if let Some(args) = text.strip_prefix("/delete_alert") {
            return self.delete_alert(msg, args).await;
        }

        match text {
            "/start" => self.register(msg).await,
            "/add_alert" => self.begin_alert(msg).await,
            "/list_alert" => self.list_alerts(msg).await,
            "/cancel" => {
                if self.conversations.cancel(msg.chat_id) {
                    "Alert creation cancelled.".to_string()
                } else {
                    "Nothing to cancel.".to_string()
                }
            }
            _ => self.conversation_input(msg, text).await,
        }
    }

    async fn register(&self, msg: &Inbound) -> String {
        match self
            .store
            .ensure_user(msg.telegram_id, &msg.first_name, msg.chat_id)
            .await
        {
            Ok(user) => format!("Hello {} !", user.first_name),
            Err(e) => self.store_failure(msg, "register", e),
        }
    }

    async fn begin_alert(&self, msg: &Inbound) -> String {
        // Registers on the fly, like /start would; the draft is bound to the
        // owner's surrogate id so the final alert cannot be mis-attributed.
        match self
            .store
            .ensure_user(msg.telegram_id, &msg.first_name, msg.chat_id)
            .await
        {
            Ok(user) => {
                self.conversations.begin(msg.chat_id, user.id);
                "Enter the token's symbol (BTC, ETH etc...)".to_string()
            }
            Err(e) => self.store_failure(msg, "begin alert", e),
        }
    }

    async fn list_alerts(&self, msg: &Inbound) -> String {
        match self.store.alerts_for_user(msg.telegram_id).await {
            Ok(alerts) if alerts.is_empty() => "You have no alerts yet.".to_string(),
            Ok(alerts) => alerts
                .iter()
                .map(|a| {
                    format!(
                        "{} - When {} is {} at {}",
                        a.id, a.symbol, a.direction, a.target_price
                    )
                })
                .collect::<Vec<_>>()
                .join(",\n"),
            Err(DbError::UserNotFound) => {
                "You are not registered yet. Send /start first.".to_string()
            }
            Err(e) => self.store_failure(msg, "list alerts", e),
        }
    }

    async fn delete_alert(&self, msg: &Inbound, args: &str) -> String {
        let Ok(alert_id) = args.trim().parse::<i64>() else {
            return "Usage: /delete_alert <id>".to_string();
        };

        let owner = match self
            .store
            .ensure_user(msg.telegram_id, &msg.first_name, msg.chat_id)
            .await
        {
            Ok(user) => user,
            Err(e) => return self.store_failure(msg, "delete alert", e),
        };

        // Scoped to the owner: a miss and a foreign alert id are the same
        // answer, so nothing leaks about other users' alerts.
        match self.store.delete_alert(alert_id, owner.id).await {
            Ok(true) => format!("Alert {alert_id} deleted."),
            Ok(false) => format!("No alert {alert_id} to delete."),
            Err(e) => self.store_failure(msg, "delete alert", e),
        }
    }

    async fn conversation_input(&self, msg: &Inbound, text: &str) -> String {
        match self.conversations.handle_text(msg.chat_id, text) {
            None => "Send /add_alert to create an alert.".to_string(),
            Some(Err(e)) => e.to_string(),
            Some(Ok(SubmitOutcome::NeedDirection)) => {
                "Choose condition (lower or greater)".to_string()
            }
            Some(Ok(SubmitOutcome::NeedPrice)) => "Enter target price".to_string(),
            Some(Ok(SubmitOutcome::Ready(new_alert))) => {
                match self.store.create_alert(new_alert).await {
                    Ok(alert) => format!(
                        "Alert created: {} {} {}",
                        alert.symbol, alert.direction, alert.target_price
                    ),
                    Err(e) => self.store_failure(msg, "create alert", e),
                }
            }
        }
    }

    fn store_failure(&self, msg: &Inbound, action: &str, e: DbError) -> String {
        tracing::error!(chat_id = msg.chat_id, action, error = %e, "Store operation failed");
        "Something went wrong, please try again.".to_string()
    }
}
