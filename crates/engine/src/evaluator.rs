use crate::error::EngineError;
use core_types::{Alert, User};
use database::AlertStore;
use price_client::PriceSource;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use telegram::Notifier;

/// What one evaluation run did. Useful for logs and asserted on in tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Alerts in the scan snapshot.
    pub scanned: usize,
    /// Alerts whose condition the fetched price satisfied.
    pub triggered: usize,
    /// Notifications actually accepted by the transport.
    pub notified: usize,
    /// Alerts retired after a successful notification.
    pub deleted: usize,
}

/// The periodic scan-fetch-match-notify-delete task.
///
/// Runs concurrently with the chat handlers; every race it can lose (a user
/// deleting an alert mid-run) is absorbed by the store's idempotent delete.
pub struct Evaluator {
    store: Arc<dyn AlertStore>,
    prices: Arc<dyn PriceSource>,
    notifier: Arc<dyn Notifier>,
}

impl Evaluator {
    pub fn new(
        store: Arc<dyn AlertStore>,
        prices: Arc<dyn PriceSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            prices,
            notifier,
        }
    }

    /// Runs forever on a fixed interval. The first run fires immediately;
    /// a failed run is logged and the loop keeps going.
    pub async fn run(self, interval: Duration) {
        tracing::info!(interval_secs = interval.as_secs(), "Evaluator started");
        let mut ticker = tokio::time::interval(interval);

        loop {
            ticker.tick().await;

            match self.run_once().await {
                Ok(summary) => {
                    tracing::debug!(
                        scanned = summary.scanned,
                        triggered = summary.triggered,
                        notified = summary.notified,
                        deleted = summary.deleted,
                        "Evaluation run complete"
                    );
                }
                Err(e) => tracing::error!(error = %e, "Evaluation run failed"),
            }
        }
    }

    /// One evaluation pass over a snapshot of all alerts.
    ///
    /// Each distinct symbol is fetched exactly once per run. A fetch failure
    /// defers that symbol's alerts to the next cycle; a send failure leaves
    /// the alert in place so the user still gets notified eventually; only a
    /// delivered notification retires an alert.
    pub async fn run_once(&self) -> Result<RunSummary, EngineError> {
        let entries = self.store.scan_with_owners().await?;

        let mut summary = RunSummary {
            scanned: entries.len(),
            ..RunSummary::default()
        };

        let mut by_symbol: HashMap<String, Vec<(Alert, User)>> = HashMap::new();
        for (alert, owner) in entries {
            by_symbol.entry(alert.symbol.clone()).or_default().push((alert, owner));
        }

        for (symbol, group) in by_symbol {
            let price = match self.prices.latest_price(&symbol).await {
                Ok(price) => price,
                Err(e) => {
                    tracing::warn!(%symbol, error = %e, "Price fetch failed, deferring alerts");
                    continue;
                }
            };

            for (alert, owner) in group {
                if !alert.direction.is_hit(price, alert.target_price) {
                    continue;
                }
                summary.triggered += 1;

                let text = format!(
                    "{} {} {} (now {})",
                    alert.symbol, alert.direction, alert.target_price, price
                );
                if let Err(e) = self.notifier.send_message(owner.chat_id, &text).await {
                    tracing::error!(
                        alert_id = alert.id,
                        chat_id = owner.chat_id,
                        error = %e,
                        "Notification failed, keeping alert for next cycle"
                    );
                    continue;
                }
                summary.notified += 1;

                match self.store.delete_alert(alert.id, owner.id).await {
                    Ok(true) => summary.deleted += 1,
                    // Already gone: the user deleted it while we were notifying.
                    Ok(false) => {}
                    Err(e) => {
                        tracing::error!(alert_id = alert.id, error = %e, "Failed to retire alert");
                    }
                }
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{MemoryStore, RecordingNotifier, StaticPrices};
    use core_types::Direction;
    use rust_decimal_macros::dec;

    fn evaluator(
        store: &Arc<MemoryStore>,
        prices: &Arc<StaticPrices>,
        notifier: &Arc<RecordingNotifier>,
    ) -> Evaluator {
        Evaluator::new(store.clone(), prices.clone(), notifier.clone())
    }

    #[tokio::test]
    async fn triggered_alert_is_notified_then_deleted() {
        let store = Arc::new(MemoryStore::new());
        let prices = Arc::new(StaticPrices::new());
        let notifier = Arc::new(RecordingNotifier::new());

        let user = store.seed_user(42, "Ada", 4242);
        store.seed_alert(user.id, "BTC", Direction::GreaterOrEqual, dec!(50000));
        prices.set("BTC", dec!(51000));

        let summary = evaluator(&store, &prices, &notifier).run_once().await.unwrap();

        assert_eq!(summary, RunSummary { scanned: 1, triggered: 1, notified: 1, deleted: 1 });
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 4242);
        assert_eq!(sent[0].1, "BTC >= 50000 (now 51000)");
        assert!(store.all_alerts().is_empty());
    }

    #[tokio::test]
    async fn untriggered_alert_is_left_alone() {
        let store = Arc::new(MemoryStore::new());
        let prices = Arc::new(StaticPrices::new());
        let notifier = Arc::new(RecordingNotifier::new());

        let user = store.seed_user(42, "Ada", 4242);
        store.seed_alert(user.id, "BTC", Direction::GreaterOrEqual, dec!(50000));
        prices.set("BTC", dec!(49000));

        let summary = evaluator(&store, &prices, &notifier).run_once().await.unwrap();

        assert_eq!(summary, RunSummary { scanned: 1, triggered: 0, notified: 0, deleted: 0 });
        assert!(notifier.sent().is_empty());
        assert_eq!(store.all_alerts().len(), 1);
    }

    #[tokio::test]
    async fn lower_or_equal_fires_at_the_boundary() {
        let store = Arc::new(MemoryStore::new());
        let prices = Arc::new(StaticPrices::new());
        let notifier = Arc::new(RecordingNotifier::new());

        let user = store.seed_user(42, "Ada", 4242);
        store.seed_alert(user.id, "ETH", Direction::LowerOrEqual, dec!(4000));
        prices.set("ETH", dec!(4000));

        let summary = evaluator(&store, &prices, &notifier).run_once().await.unwrap();

        assert_eq!(summary.deleted, 1);
        assert_eq!(notifier.sent()[0].1, "ETH <= 4000 (now 4000)");
    }

    #[tokio::test]
    async fn shared_symbol_is_fetched_once_per_run() {
        let store = Arc::new(MemoryStore::new());
        let prices = Arc::new(StaticPrices::new());
        let notifier = Arc::new(RecordingNotifier::new());

        let a = store.seed_user(1, "Ada", 111);
        let b = store.seed_user(2, "Bob", 222);
        store.seed_alert(a.id, "ETH", Direction::GreaterOrEqual, dec!(3000));
        store.seed_alert(b.id, "ETH", Direction::LowerOrEqual, dec!(5000));
        prices.set("ETH", dec!(4000));

        let summary = evaluator(&store, &prices, &notifier).run_once().await.unwrap();

        assert_eq!(prices.calls(), vec!["ETH".to_string()]);
        assert_eq!(summary.triggered, 2);
        assert_eq!(notifier.sent().len(), 2);
    }

    #[tokio::test]
    async fn fetch_failure_defers_that_symbol_only() {
        let store = Arc::new(MemoryStore::new());
        let prices = Arc::new(StaticPrices::new());
        let notifier = Arc::new(RecordingNotifier::new());

        let user = store.seed_user(42, "Ada", 4242);
        store.seed_alert(user.id, "SOL", Direction::GreaterOrEqual, dec!(10));
        store.seed_alert(user.id, "BTC", Direction::GreaterOrEqual, dec!(50000));
        prices.fail("SOL");
        prices.set("BTC", dec!(51000));

        let summary = evaluator(&store, &prices, &notifier).run_once().await.unwrap();

        // SOL untouched, BTC processed normally.
        let remaining = store.all_alerts();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].symbol, "SOL");
        assert_eq!(summary.notified, 1);
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn failed_send_keeps_the_alert_for_the_next_cycle() {
        let store = Arc::new(MemoryStore::new());
        let prices = Arc::new(StaticPrices::new());
        let notifier = Arc::new(RecordingNotifier::new());

        let user = store.seed_user(42, "Ada", 4242);
        store.seed_alert(user.id, "BTC", Direction::GreaterOrEqual, dec!(50000));
        prices.set("BTC", dec!(51000));
        notifier.fail_next_sends();

        let summary = evaluator(&store, &prices, &notifier).run_once().await.unwrap();

        assert_eq!(summary, RunSummary { scanned: 1, triggered: 1, notified: 0, deleted: 0 });
        assert_eq!(store.all_alerts().len(), 1);

        // The transport recovers; the next run delivers and retires it.
        notifier.recover();
        let summary = evaluator(&store, &prices, &notifier).run_once().await.unwrap();
        assert_eq!(summary.deleted, 1);
        assert!(store.all_alerts().is_empty());
    }

    #[tokio::test]
    async fn empty_store_is_a_quiet_run() {
        let store = Arc::new(MemoryStore::new());
        let prices = Arc::new(StaticPrices::new());
        let notifier = Arc::new(RecordingNotifier::new());

        let summary = evaluator(&store, &prices, &notifier).run_once().await.unwrap();

        assert_eq!(summary, RunSummary::default());
        assert!(prices.calls().is_empty());
    }
}
