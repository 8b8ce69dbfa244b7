use std::sync::{Arc, Weak};

use thiserror::Error;
use tokio::{
    sync::{Mutex, watch},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::{
    notifications::{
        Notifier, SNAPSHOT_FAILED_MESSAGE, TICK_STREAM_FAILED_MESSAGE, closed_positions_message,
    },
    positions::{
        PositionsSnapshotSource,
        group::PositionGroup,
        position::PositionId,
        positions_book::PositionBook,
    },
    prices::{
        PriceFeed, PriceTick, TickReceiver,
        dto::AStr,
        subscription::{PriceFeedSubscription, SubscriptionChanges},
    },
    settings::ContractSettingsCache,
};

pub mod notifications;
pub mod positions;
pub mod prices;
pub mod settings;


/// Groups as last published, in first-seen symbol order.
pub type PositionsView = Arc<Vec<PositionGroup>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Idle,
    Loading,
    Live,
    Closed,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CloseOutcome {
    Closed {
        position_ids: Vec<PositionId>,
        group_closed: bool,
    },
    NotFound,
}

struct EngineState {
    status: EngineStatus,
    book: PositionBook,
    subscription: PriceFeedSubscription,
    ticks_task: Option<JoinHandle<()>>,
}

/// Owns the position book and keeps it in step with the price feed.
///
/// Every mutation (snapshot apply, tick batch, close command) runs under the single `state`
/// lock and the view is published only once the mutation is complete, so readers of
/// [`PositionsEngine::current_view`] never see a half-folded group.
pub struct PositionsEngine {
    settings: ContractSettingsCache,
    snapshot_source: Arc<dyn PositionsSnapshotSource>,
    price_feed: Arc<dyn PriceFeed>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<EngineState>,
    view: watch::Sender<PositionsView>,
}

impl PositionsEngine {
    pub fn new(
        settings: ContractSettingsCache,
        snapshot_source: Arc<dyn PositionsSnapshotSource>,
        price_feed: Arc<dyn PriceFeed>,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<Self> {
        let (view, _) = watch::channel(Arc::new(Vec::new()));

        Arc::new(Self {
            settings,
            snapshot_source,
            price_feed,
            notifier,
            state: Mutex::new(EngineState {
                status: EngineStatus::Idle,
                book: PositionBook::default(),
                subscription: PriceFeedSubscription::new(),
                ticks_task: None,
            }),
            view,
        })
    }

    pub async fn start(self: &Arc<Self>) -> Result<(), AggregatorError> {
        {
            let mut state = self.state.lock().await;

            if state.status != EngineStatus::Idle {
                return Err(AggregatorError::InvalidState {
                    action: "start",
                    status: state.status,
                });
            }

            state.status = EngineStatus::Loading;
        }

        debug!("Fetching positions snapshot");
        let fetched = self.snapshot_source.fetch_snapshot().await;

        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        if state.status != EngineStatus::Loading {
            debug!(status = ?state.status, "Discarding positions snapshot");
            return Ok(());
        }

        let positions = match fetched {
            Ok(positions) => positions,
            Err(err) => {
                let err = AggregatorError::SnapshotFetchFailed(err);
                error!(error = %err, "Positions engine failed to start");
                state.status = EngineStatus::Error;
                self.notifier.notify_error(SNAPSHOT_FAILED_MESSAGE);
                return Err(err);
            }
        };

        state.book = match PositionBook::load_snapshot(positions, &self.settings) {
            Ok(book) => book,
            Err(err) => {
                error!(error = %err, "Positions snapshot rejected");
                state.status = EngineStatus::Error;
                return Err(err);
            }
        };

        info!(groups = state.book.len(), "Positions snapshot loaded");
        self.publish_view(&state.book);

        if state.book.is_empty() {
            state.status = EngineStatus::Closed;
            info!("No open positions, positions engine closed");
            return Ok(());
        }

        let ticks = self.price_feed.ticks();

        let changes = state.subscription.reconcile(state.book.symbols());
        self.apply_subscription_changes(&changes).await;

        state.status = EngineStatus::Live;

        match ticks {
            Some(ticks) => {
                state.ticks_task = Some(tokio::spawn(consume_ticks(Arc::downgrade(self), ticks)));
            }
            None => warn!("Price feed has no tick stream, profits stay at snapshot values"),
        }

        Ok(())
    }

    /// Applies a batch of ticks and publishes the view once. Ignored unless the engine is live.
    pub async fn handle_ticks(&self, ticks: Vec<PriceTick>) -> Result<(), AggregatorError> {
        let mut state = self.state.lock().await;

        if state.status != EngineStatus::Live {
            debug!(ticks = ticks.len(), status = ?state.status, "Ignoring ticks");
            return Ok(());
        }

        let mut result = Ok(());
        let mut updated = false;

        for tick in ticks {
            match state
                .book
                .apply_price_tick(&tick.symbol, tick.price, &self.settings)
            {
                Ok(applied) => updated |= applied,
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
        }

        if updated {
            self.publish_view(&state.book);
        }

        result
    }

    pub async fn close_position(&self, symbol: &str, id: PositionId) -> CloseOutcome {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        if state.status != EngineStatus::Live {
            debug!(symbol, position_id = id, status = ?state.status, "Ignoring close position");
            return CloseOutcome::NotFound;
        }

        let Some(removed) = state.book.remove_position(symbol, id) else {
            debug!(symbol, position_id = id, "Position already closed");
            return CloseOutcome::NotFound;
        };

        let position = removed.position;
        info!(symbol, position_id = position.id, size = position.size, "Position closed");
        self.notifier.notify(&closed_positions_message(&[position.id]));

        if removed.group_emptied {
            self.close_group_locked(state, symbol).await;
        } else {
            self.publish_view(&state.book);
        }

        CloseOutcome::Closed {
            position_ids: vec![position.id],
            group_closed: removed.group_emptied,
        }
    }

    pub async fn close_group(&self, symbol: &str) -> CloseOutcome {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        if state.status != EngineStatus::Live {
            debug!(symbol, status = ?state.status, "Ignoring close group");
            return CloseOutcome::NotFound;
        }

        match self.close_group_locked(state, symbol).await {
            Some(group) => CloseOutcome::Closed {
                position_ids: group.position_ids(),
                group_closed: true,
            },
            None => {
                debug!(symbol, "Group already closed");
                CloseOutcome::NotFound
            }
        }
    }

    /// Unsubscribes everything, disconnects the feed and stops tick processing. A snapshot
    /// still in flight is discarded when it arrives.
    pub async fn shutdown(&self) {
        let mut guard = self.state.lock().await;

        match guard.status {
            EngineStatus::Live => self.teardown_locked(&mut guard).await,
            EngineStatus::Idle | EngineStatus::Loading => {
                guard.status = EngineStatus::Closed;
                info!("Positions engine closed before going live");
            }
            EngineStatus::Closed | EngineStatus::Error => {}
        }
    }

    pub fn current_view(&self) -> PositionsView {
        self.view.borrow().clone()
    }

    pub fn watch_view(&self) -> watch::Receiver<PositionsView> {
        self.view.subscribe()
    }

    pub async fn status(&self) -> EngineStatus {
        self.state.lock().await.status
    }

    async fn report_tick_stream_failure(&self, err: TransportError) {
        let state = self.state.lock().await;

        if state.status != EngineStatus::Live {
            return;
        }

        let err = AggregatorError::TickStreamFailed(err);
        warn!(error = %err, "Keeping last known profits");
        self.notifier.notify_error(TICK_STREAM_FAILED_MESSAGE);
    }

    async fn close_group_locked(
        &self,
        state: &mut EngineState,
        symbol: &str,
    ) -> Option<PositionGroup> {
        let group = state.book.remove_group(symbol)?;
        let ids = group.position_ids();

        info!(symbol, positions = ids.len(), "Group closed");

        if !ids.is_empty() {
            self.notifier.notify(&closed_positions_message(&ids));
        }

        let changes = state.subscription.reconcile(state.book.symbols());
        self.apply_subscription_changes(&changes).await;

        if state.book.is_empty() {
            self.teardown_locked(state).await;
        }

        self.publish_view(&state.book);

        Some(group)
    }

    async fn teardown_locked(&self, state: &mut EngineState) {
        debug!(symbols = ?state.subscription.subscribed(), "Releasing price subscription");
        let changes = state.subscription.reconcile(std::iter::empty());
        self.apply_subscription_changes(&changes).await;

        if let Some(task) = state.ticks_task.take() {
            task.abort();
        }

        self.price_feed.disconnect().await;
        state.status = EngineStatus::Closed;

        info!("Positions engine closed");
    }

    async fn apply_subscription_changes(&self, changes: &SubscriptionChanges) {
        if changes.is_empty() {
            return;
        }

        if !changes.to_subscribe.is_empty() {
            info!(symbols = ?changes.to_subscribe, "Subscribing to prices");
            self.price_feed.subscribe(&changes.to_subscribe).await;
        }

        if !changes.to_unsubscribe.is_empty() {
            info!(symbols = ?changes.to_unsubscribe, "Unsubscribing from prices");
            self.price_feed.unsubscribe(&changes.to_unsubscribe).await;
        }
    }

    fn publish_view(&self, book: &PositionBook) {
        self.view.send_replace(Arc::new(book.snapshot()));
    }
}

async fn consume_ticks(engine: Weak<PositionsEngine>, mut ticks: TickReceiver) {
    while let Some(batch) = ticks.recv().await {
        let Some(engine) = engine.upgrade() else {
            break;
        };

        match batch {
            Ok(batch) => {
                if let Err(err) = engine.handle_ticks(batch).await {
                    error!(error = %err, "Tick batch aborted");
                }
            }
            Err(err) => engine.report_tick_stream_failure(err).await,
        }
    }

    debug!("Tick stream finished");
}

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("positions snapshot fetch failed: {0}")]
    SnapshotFetchFailed(TransportError),
    #[error("price tick stream failed: {0}")]
    TickStreamFailed(TransportError),
    #[error("no contract multiplier configured for symbol {0}")]
    UnknownSymbolConfiguration(AStr),
    #[error("position {id} has non-positive size {size}")]
    InvalidPositionSize { id: PositionId, size: f64 },
    #[error("cannot {action} while engine is {status:?}")]
    InvalidState {
        action: &'static str,
        status: EngineStatus,
    },
}
