use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use holdings_import::{
    reconcile_snapshot, Asset, AssetId, HoldingRow, HoldingsError, HoldingsStore, MemoryStore,
    Money, NewAsset, ParsedBatch, Snapshot, SnapshotId,
};

fn as_of(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, day, 0, 0, 0).unwrap()
}

fn row(ticker: &str, qty: &str, currency: &str) -> HoldingRow {
    HoldingRow::new(ticker, qty, currency, "equity", Some(ticker)).unwrap()
}

fn tickers(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

#[test]
fn duplicate_tickers_share_one_asset() {
    let mut store = MemoryStore::new();
    let batch = ParsedBatch::from_rows(vec![row("AAPL", "10", "USD"), row("AAPL", "2.5", "USD")]);

    let summary = reconcile_snapshot(&mut store, as_of(31), &batch).unwrap();
    assert_eq!(summary.position_count, 2);
    assert_eq!(summary.as_of, as_of(31));
    assert_eq!(store.asset_count(), 1);

    let snapshot = store.get_snapshot(summary.snapshot_id).unwrap();
    assert_eq!(snapshot.positions.len(), 2);
    assert_eq!(snapshot.positions[0].asset.id, snapshot.positions[1].asset.id);
    assert_eq!(snapshot.positions[0].quantity, Money::from_str("10").unwrap());
    assert_eq!(snapshot.positions[1].quantity, Money::from_str("2.5").unwrap());
}

#[test]
fn first_occurrence_sets_new_asset_metadata() {
    let mut store = MemoryStore::new();
    let batch = ParsedBatch::from_rows(vec![row("SAP", "1", "EUR"), row("SAP", "1", "USD")]);
    reconcile_snapshot(&mut store, as_of(1), &batch).unwrap();

    let assets = store.find_assets_by_tickers(&tickers(&["SAP"])).unwrap();
    assert_eq!(assets["SAP"].currency, "EUR");
}

#[test]
fn existing_asset_is_reused_and_not_modified() {
    let mut store = MemoryStore::new();
    let existing = store
        .create_asset(NewAsset {
            ticker: "AAPL".to_string(),
            currency: "USD".to_string(),
            asset_class: "equity".to_string(),
            name: Some("Apple Inc.".to_string()),
        })
        .unwrap();

    let batch = ParsedBatch::from_rows(vec![row("AAPL", "3", "EUR")]);
    let summary = reconcile_snapshot(&mut store, as_of(2), &batch).unwrap();

    let snapshot = store.get_snapshot(summary.snapshot_id).unwrap();
    assert_eq!(snapshot.positions[0].asset, existing);
    assert_eq!(store.asset_count(), 1);
}

#[test]
fn empty_batch_creates_empty_snapshot() {
    let mut store = MemoryStore::new();
    let summary = reconcile_snapshot(&mut store, as_of(3), &ParsedBatch::default()).unwrap();
    assert_eq!(summary.position_count, 0);
    assert!(store.get_snapshot(summary.snapshot_id).unwrap().positions.is_empty());
}

#[test]
fn repeated_imports_reuse_assets() {
    let mut store = MemoryStore::new();
    let batch = ParsedBatch::from_rows(vec![row("AAPL", "1", "USD"), row("MSFT", "2", "USD")]);
    let first = reconcile_snapshot(&mut store, as_of(1), &batch).unwrap();
    let second = reconcile_snapshot(&mut store, as_of(2), &batch).unwrap();

    assert_ne!(first.snapshot_id, second.snapshot_id);
    assert_eq!(store.asset_count(), 2);
}

#[test]
fn rolled_back_transaction_leaves_store_untouched() {
    let mut store = MemoryStore::new();
    let batch = ParsedBatch::from_rows(vec![row("AAPL", "1", "USD")]);
    {
        let mut tx = store.begin();
        reconcile_snapshot(&mut tx, as_of(1), &batch).unwrap();
        tx.rollback();
    }
    assert_eq!(store.asset_count(), 0);
    assert!(store.get_latest_snapshot().unwrap().is_none());

    let mut tx = store.begin();
    let summary = reconcile_snapshot(&mut tx, as_of(1), &batch).unwrap();
    tx.commit();
    assert_eq!(store.asset_count(), 1);
    assert!(store.get_snapshot(summary.snapshot_id).is_ok());
}

#[test]
fn snapshots_are_listed_newest_first() {
    let mut store = MemoryStore::new();
    let batch = ParsedBatch::from_rows(vec![row("AAPL", "1", "USD")]);
    let jan = reconcile_snapshot(&mut store, as_of(15), &batch).unwrap();
    let early = reconcile_snapshot(&mut store, as_of(1), &batch).unwrap();
    let late = reconcile_snapshot(&mut store, as_of(31), &batch).unwrap();

    let ids: Vec<SnapshotId> = store
        .list_snapshots(10)
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(ids, [late.snapshot_id, jan.snapshot_id, early.snapshot_id]);
    assert_eq!(store.list_snapshots(1).unwrap().len(), 1);
    assert_eq!(
        store.get_latest_snapshot().unwrap().map(|s| s.id),
        Some(late.snapshot_id)
    );
}

#[test]
fn delete_cascades_to_positions_but_keeps_assets() {
    let mut store = MemoryStore::new();
    let batch = ParsedBatch::from_rows(vec![row("AAPL", "1", "USD")]);
    let summary = reconcile_snapshot(&mut store, as_of(1), &batch).unwrap();

    store.delete_snapshot(summary.snapshot_id).unwrap();
    assert!(matches!(
        store.get_snapshot(summary.snapshot_id),
        Err(HoldingsError::NotFound { .. })
    ));
    assert!(matches!(
        store.delete_snapshot(summary.snapshot_id),
        Err(HoldingsError::NotFound { .. })
    ));
    assert_eq!(store.asset_count(), 1);
}

#[test]
fn duplicate_asset_creation_conflicts() {
    let mut store = MemoryStore::new();
    let new = NewAsset {
        ticker: "AAPL".to_string(),
        currency: "USD".to_string(),
        asset_class: "equity".to_string(),
        name: None,
    };
    store.create_asset(new.clone()).unwrap();
    assert!(matches!(
        store.create_asset(new),
        Err(HoldingsError::StoreConflict { ticker }) if ticker == "AAPL"
    ));
}

/// Хранилище, в котором актив «появляется» между поиском и созданием.
struct RacingStore {
    inner: MemoryStore,
    hidden: BTreeSet<String>,
    create_attempts: usize,
}

impl HoldingsStore for RacingStore {
    fn find_assets_by_tickers(
        &self,
        tickers: &BTreeSet<String>,
    ) -> Result<HashMap<String, Asset>, HoldingsError> {
        let mut found = self.inner.find_assets_by_tickers(tickers)?;
        if self.create_attempts == 0 {
            found.retain(|ticker, _| !self.hidden.contains(ticker));
        }
        Ok(found)
    }

    fn create_asset(&mut self, asset: NewAsset) -> Result<Asset, HoldingsError> {
        self.create_attempts += 1;
        self.inner.create_asset(asset)
    }

    fn create_snapshot(&mut self, as_of: DateTime<Utc>) -> Result<SnapshotId, HoldingsError> {
        self.inner.create_snapshot(as_of)
    }

    fn create_position(
        &mut self,
        snapshot: SnapshotId,
        asset: AssetId,
        quantity: Money,
    ) -> Result<(), HoldingsError> {
        self.inner.create_position(snapshot, asset, quantity)
    }

    fn get_snapshot(&self, id: SnapshotId) -> Result<Snapshot, HoldingsError> {
        self.inner.get_snapshot(id)
    }

    fn get_latest_snapshot(&self) -> Result<Option<Snapshot>, HoldingsError> {
        self.inner.get_latest_snapshot()
    }

    fn list_snapshots(&self, limit: usize) -> Result<Vec<Snapshot>, HoldingsError> {
        self.inner.list_snapshots(limit)
    }

    fn delete_snapshot(&mut self, id: SnapshotId) -> Result<(), HoldingsError> {
        self.inner.delete_snapshot(id)
    }
}

#[test]
fn conflicting_creation_resolves_to_existing_asset() {
    let mut inner = MemoryStore::new();
    let concurrent = inner
        .create_asset(NewAsset {
            ticker: "AAPL".to_string(),
            currency: "USD".to_string(),
            asset_class: "equity".to_string(),
            name: None,
        })
        .unwrap();
    let mut store = RacingStore {
        inner,
        hidden: tickers(&["AAPL"]),
        create_attempts: 0,
    };

    let batch = ParsedBatch::from_rows(vec![row("AAPL", "4", "EUR")]);
    let summary = reconcile_snapshot(&mut store, as_of(5), &batch).unwrap();

    let snapshot = store.get_snapshot(summary.snapshot_id).unwrap();
    assert_eq!(snapshot.positions[0].asset, concurrent);
    assert_eq!(store.inner.asset_count(), 1);
}

/// Хранилище, запоминающее каждый набор тикеров, переданный в поиск.
#[derive(Default)]
struct CountingStore {
    inner: MemoryStore,
    lookups: RefCell<Vec<BTreeSet<String>>>,
}

impl HoldingsStore for CountingStore {
    fn find_assets_by_tickers(
        &self,
        tickers: &BTreeSet<String>,
    ) -> Result<HashMap<String, Asset>, HoldingsError> {
        self.lookups.borrow_mut().push(tickers.clone());
        self.inner.find_assets_by_tickers(tickers)
    }

    fn create_asset(&mut self, asset: NewAsset) -> Result<Asset, HoldingsError> {
        self.inner.create_asset(asset)
    }

    fn create_snapshot(&mut self, as_of: DateTime<Utc>) -> Result<SnapshotId, HoldingsError> {
        self.inner.create_snapshot(as_of)
    }

    fn create_position(
        &mut self,
        snapshot: SnapshotId,
        asset: AssetId,
        quantity: Money,
    ) -> Result<(), HoldingsError> {
        self.inner.create_position(snapshot, asset, quantity)
    }

    fn get_snapshot(&self, id: SnapshotId) -> Result<Snapshot, HoldingsError> {
        self.inner.get_snapshot(id)
    }

    fn get_latest_snapshot(&self) -> Result<Option<Snapshot>, HoldingsError> {
        self.inner.get_latest_snapshot()
    }

    fn list_snapshots(&self, limit: usize) -> Result<Vec<Snapshot>, HoldingsError> {
        self.inner.list_snapshots(limit)
    }

    fn delete_snapshot(&mut self, id: SnapshotId) -> Result<(), HoldingsError> {
        self.inner.delete_snapshot(id)
    }
}

#[test]
fn assets_are_looked_up_once_for_all_distinct_tickers() {
    let mut store = CountingStore::default();
    let batch = ParsedBatch::from_rows(vec![
        row("MSFT", "1", "USD"),
        row("AAPL", "2", "USD"),
        row("AAPL", "3", "USD"),
    ]);
    reconcile_snapshot(&mut store, as_of(6), &batch).unwrap();

    assert_eq!(*store.lookups.borrow(), [tickers(&["AAPL", "MSFT"])]);

    // Повторный импорт тоже обходится одним поиском, уже без создания активов.
    reconcile_snapshot(&mut store, as_of(7), &batch).unwrap();
    assert_eq!(store.lookups.borrow().len(), 2);
    assert_eq!(store.inner.asset_count(), 2);
}

#[test]
fn empty_batch_skips_asset_lookup() {
    let mut store = CountingStore::default();
    reconcile_snapshot(&mut store, as_of(8), &ParsedBatch::default()).unwrap();
    assert!(store.lookups.borrow().is_empty());
}
