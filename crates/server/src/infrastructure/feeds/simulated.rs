use async_trait::async_trait;
use rand::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tickerhub_core::{Instrument, Price};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::application::ports::{InstrumentRepository, PriceFeed, PublishError, SnapshotPublisher};
use crate::infrastructure::config::SimulationConfig;
use crate::shutdown::Shutdown;

/// Random-walk price generator with no external dependency
///
/// Every tick moves each known instrument by a uniform percentage in
/// `[-max_move_pct, +max_move_pct]`, clamped to the price floor, then
/// publishes one snapshot of all instruments.
pub struct SimulatedFeed<S, P>
where
    S: InstrumentRepository,
    P: SnapshotPublisher,
{
    store: Arc<S>,
    publisher: Arc<P>,
    config: SimulationConfig,
    rng: StdRng,
}

impl<S, P> SimulatedFeed<S, P>
where
    S: InstrumentRepository,
    P: SnapshotPublisher,
{
    pub fn new(store: Arc<S>, publisher: Arc<P>, config: SimulationConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            store,
            publisher,
            config,
            rng,
        }
    }

    /// Seed the configured instruments when the store is still empty
    pub fn seed_defaults(&self) -> bool {
        let seeded = self.store.seed_if_empty(&self.config.seeds());
        if seeded {
            info!(
                instruments = self.config.seed_prices.len(),
                "Seeded simulated instruments"
            );
        }
        seeded
    }

    fn next_price(&mut self, current: Price) -> Price {
        let max = self.config.max_move_pct.abs();
        let pct: f64 = self.rng.gen_range(-max..=max);
        (current * (1.0 + pct / 100.0)).max(self.config.price_floor)
    }

    /// Move every instrument once and publish the resulting snapshot
    pub async fn tick(&mut self) -> Result<Vec<Instrument>, PublishError> {
        for instrument in self.store.snapshot_instruments() {
            let price = self.next_price(instrument.price);
            self.store.update_price(&instrument.symbol, price);
        }

        let snapshot = self.store.snapshot_instruments();
        self.publisher.publish(snapshot.clone()).await?;
        debug!(instruments = snapshot.len(), "Simulated tick published");
        Ok(snapshot)
    }
}

#[async_trait]
impl<S, P> PriceFeed for SimulatedFeed<S, P>
where
    S: InstrumentRepository + 'static,
    P: SnapshotPublisher + 'static,
{
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn run(&mut self, mut shutdown: Shutdown) {
        self.seed_defaults();

        let period = self.config.interval().max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        info!(interval_ms = period.as_millis() as u64, "Simulated feed started");

        loop {
            tokio::select! {
                _ = shutdown.wait() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        warn!(error = %e, "Simulated feed cannot publish, stopping");
                        break;
                    }
                }
            }
        }

        info!("Simulated feed stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::store::InMemoryStateStore;
    use crate::shutdown::shutdown_channel;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingPublisher {
        snapshots: Mutex<Vec<Vec<Instrument>>>,
    }

    #[async_trait]
    impl SnapshotPublisher for RecordingPublisher {
        async fn publish(&self, snapshot: Vec<Instrument>) -> Result<(), PublishError> {
            self.snapshots.lock().push(snapshot);
            Ok(())
        }
    }

    struct ClosedPublisher;

    #[async_trait]
    impl SnapshotPublisher for ClosedPublisher {
        async fn publish(&self, _snapshot: Vec<Instrument>) -> Result<(), PublishError> {
            Err(PublishError::Closed)
        }
    }

    fn config(seed: u64) -> SimulationConfig {
        SimulationConfig {
            interval_ms: 10,
            rng_seed: Some(seed),
            ..Default::default()
        }
    }

    fn feed(
        seed: u64,
    ) -> (
        Arc<InMemoryStateStore>,
        Arc<RecordingPublisher>,
        SimulatedFeed<InMemoryStateStore, RecordingPublisher>,
    ) {
        let store = Arc::new(InMemoryStateStore::new());
        let publisher = Arc::new(RecordingPublisher::default());
        let feed = SimulatedFeed::new(Arc::clone(&store), Arc::clone(&publisher), config(seed));
        (store, publisher, feed)
    }

    #[test]
    fn test_seeds_defaults_only_when_empty() {
        let (store, _, feed) = feed(1);
        assert!(feed.seed_defaults());
        assert_eq!(store.instrument_count(), 5);
        assert_eq!(store.instrument("GOOGL").unwrap().price, 2800.0);

        assert!(!feed.seed_defaults());
        assert_eq!(store.instrument_count(), 5);
    }

    #[test]
    fn test_existing_state_is_not_reseeded() {
        let store = Arc::new(InMemoryStateStore::with_prices([("BTC", 50_000.0)]));
        let feed = SimulatedFeed::new(
            Arc::clone(&store),
            Arc::new(RecordingPublisher::default()),
            config(1),
        );

        assert!(!feed.seed_defaults());
        assert_eq!(store.instrument_count(), 1);
    }

    #[tokio::test]
    async fn test_tick_moves_within_bounds() {
        let (store, publisher, mut feed) = feed(42);
        feed.seed_defaults();

        for _ in 0..200 {
            let before = store.snapshot_instruments();
            let after = feed.tick().await.unwrap();
            assert_eq!(after.len(), before.len());

            for (old, new) in before.iter().zip(after.iter()) {
                assert_eq!(old.symbol, new.symbol);
                assert!(new.price >= 0.01);
                if new.price > 0.01 {
                    assert!(new.last_change.abs() <= 2.0 + 1e-9);
                }
            }
        }

        assert_eq!(publisher.snapshots.lock().len(), 200);
    }

    #[tokio::test]
    async fn test_price_floor_holds() {
        let store = Arc::new(InMemoryStateStore::with_prices([("PENNY", 0.01)]));
        let publisher = Arc::new(RecordingPublisher::default());
        let mut feed = SimulatedFeed::new(Arc::clone(&store), publisher, config(7));

        for _ in 0..100 {
            feed.tick().await.unwrap();
            assert!(store.instrument("PENNY").unwrap().price >= 0.01);
        }
    }

    #[tokio::test]
    async fn test_same_seed_same_walk() {
        let (_, _, mut a) = feed(99);
        let (_, _, mut b) = feed(99);
        a.seed_defaults();
        b.seed_defaults();

        for _ in 0..10 {
            assert_eq!(a.tick().await.unwrap(), b.tick().await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_tick_reports_closed_publisher() {
        let store = Arc::new(InMemoryStateStore::with_prices([("AAPL", 150.0)]));
        let mut feed = SimulatedFeed::new(store, Arc::new(ClosedPublisher), config(1));
        assert_eq!(feed.tick().await, Err(PublishError::Closed));
    }

    #[tokio::test]
    async fn test_run_publishes_until_shutdown() {
        let (store, publisher, mut feed) = feed(3);
        let (trigger, shutdown) = shutdown_channel();

        let task = tokio::spawn(async move { feed.run(shutdown).await });

        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.trigger();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(store.instrument_count(), 5);
        assert!(!publisher.snapshots.lock().is_empty());
    }
}
