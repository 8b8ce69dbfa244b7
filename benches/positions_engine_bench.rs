use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use yft_positions_engine::{
    PositionsEngine, TransportError,
    notifications::TracingNotifier,
    positions::{
        PositionsSnapshotSource,
        position::{Position, PositionSide},
        positions_book::PositionBook,
    },
    prices::{PriceFeed, PriceTick, TickReceiver, dto::AStr},
    settings::ContractSettingsCache,
};

const SYMBOLS: [&str; 3] = ["BTCUSD", "ETHUSD", "TTWO.US"];

struct BenchSnapshot(Vec<Position>);

#[async_trait]
impl PositionsSnapshotSource for BenchSnapshot {
    async fn fetch_snapshot(&self) -> Result<Vec<Position>, TransportError> {
        Ok(self.0.clone())
    }
}

struct SilentFeed;

#[async_trait]
impl PriceFeed for SilentFeed {
    async fn subscribe(&self, _symbols: &[AStr]) {}

    async fn unsubscribe(&self, _symbols: &[AStr]) {}

    fn ticks(&self) -> Option<TickReceiver> {
        None
    }

    async fn disconnect(&self) {}
}

fn sample_positions(count: u64) -> Vec<Position> {
    (0..count)
        .map(|id| Position {
            id,
            symbol: AStr::from(SYMBOLS[(id % 3) as usize]),
            side: match id % 2 {
                0 => PositionSide::Buy,
                _ => PositionSide::Sell,
            },
            size: 1.0 + (id % 5) as f64,
            open_time: Utc::now(),
            open_price: 1000.0 + id as f64,
            swap: 0.1,
            close_price: 1010.0,
            profit: 0.0,
        })
        .collect()
}

fn sample_ticks() -> Vec<PriceTick> {
    SYMBOLS
        .iter()
        .map(|symbol| PriceTick::new(*symbol, 1025.0))
        .collect()
}

fn bench_load_snapshot(c: &mut Criterion) {
    let settings = ContractSettingsCache::default();
    let positions = sample_positions(3_000);

    c.bench_function("load_snapshot", |b| {
        b.iter(|| {
            let book = PositionBook::load_snapshot(positions.clone(), &settings).unwrap();
            black_box(book);
        });
    });
}

fn bench_apply_price_tick(c: &mut Criterion) {
    let settings = ContractSettingsCache::default();
    let mut book = PositionBook::load_snapshot(sample_positions(3_000), &settings).unwrap();

    c.bench_function("apply_price_tick", |b| {
        b.iter(|| {
            for tick in sample_ticks() {
                book.apply_price_tick(&tick.symbol, tick.price, &settings)
                    .unwrap();
            }
        });
    });
}

fn bench_engine_handle_ticks(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let engine = PositionsEngine::new(
        ContractSettingsCache::default(),
        Arc::new(BenchSnapshot(sample_positions(3_000))),
        Arc::new(SilentFeed),
        Arc::new(TracingNotifier),
    );
    rt.block_on(engine.start()).unwrap();

    c.bench_function("engine_handle_ticks", |b| {
        b.to_async(&rt).iter(|| async {
            engine.handle_ticks(sample_ticks()).await.unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_load_snapshot,
    bench_apply_price_tick,
    bench_engine_handle_ticks
);
criterion_main!(benches);
