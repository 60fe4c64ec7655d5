//! Хранилище активов и снимков: трейт и реализация в памяти.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};

use crate::error::HoldingsError;
use crate::types::{Asset, AssetId, Money, NewAsset, Position, Snapshot, SnapshotId};

/// Операции хранилища, которые нужны сверке и сценариям импорта.
///
/// Записи только подготавливаются: фиксацией транзакции управляет вызывающий код.
pub trait HoldingsStore {
    /// Находит активы по набору тикеров одним запросом.
    fn find_assets_by_tickers(
        &self,
        tickers: &BTreeSet<String>,
    ) -> Result<HashMap<String, Asset>, HoldingsError>;

    /// Создаёт актив и сразу делает его доступным для поиска.
    ///
    /// Если тикер уже занят, возвращает [`HoldingsError::StoreConflict`].
    fn create_asset(&mut self, asset: NewAsset) -> Result<Asset, HoldingsError>;

    /// Создаёт пустой снимок.
    fn create_snapshot(&mut self, as_of: DateTime<Utc>) -> Result<SnapshotId, HoldingsError>;

    /// Добавляет позицию в снимок.
    fn create_position(
        &mut self,
        snapshot: SnapshotId,
        asset: AssetId,
        quantity: Money,
    ) -> Result<(), HoldingsError>;

    /// Возвращает снимок с позициями и их активами.
    fn get_snapshot(&self, id: SnapshotId) -> Result<Snapshot, HoldingsError>;

    /// Возвращает снимок с самой поздней датой `as_of`.
    fn get_latest_snapshot(&self) -> Result<Option<Snapshot>, HoldingsError>;

    /// Перечисляет снимки по убыванию `as_of`.
    fn list_snapshots(&self, limit: usize) -> Result<Vec<Snapshot>, HoldingsError>;

    /// Удаляет снимок вместе с позициями. Активы остаются.
    fn delete_snapshot(&mut self, id: SnapshotId) -> Result<(), HoldingsError>;
}

#[derive(Debug, Clone)]
struct StoredPosition {
    asset: AssetId,
    quantity: Money,
}

#[derive(Debug, Clone)]
struct StoredSnapshot {
    as_of: DateTime<Utc>,
    created_at: DateTime<Utc>,
    positions: Vec<StoredPosition>,
}

#[derive(Debug, Clone, Default)]
struct StoreState {
    assets: BTreeMap<AssetId, Asset>,
    tickers: HashMap<String, AssetId>,
    snapshots: BTreeMap<SnapshotId, StoredSnapshot>,
    next_asset_id: u64,
    next_snapshot_id: u64,
}

impl StoreState {
    fn find_assets_by_tickers(&self, tickers: &BTreeSet<String>) -> HashMap<String, Asset> {
        tickers
            .iter()
            .filter_map(|ticker| self.tickers.get(ticker))
            .filter_map(|id| self.assets.get(id))
            .map(|asset| (asset.ticker.clone(), asset.clone()))
            .collect()
    }

    fn create_asset(&mut self, new: NewAsset) -> Result<Asset, HoldingsError> {
        if self.tickers.contains_key(&new.ticker) {
            return Err(HoldingsError::StoreConflict { ticker: new.ticker });
        }
        self.next_asset_id += 1;
        let asset = Asset {
            id: AssetId(self.next_asset_id),
            ticker: new.ticker,
            currency: new.currency,
            asset_class: new.asset_class,
            name: new.name,
        };
        self.tickers.insert(asset.ticker.clone(), asset.id);
        self.assets.insert(asset.id, asset.clone());
        Ok(asset)
    }

    fn create_snapshot(&mut self, as_of: DateTime<Utc>) -> SnapshotId {
        self.next_snapshot_id += 1;
        let id = SnapshotId(self.next_snapshot_id);
        self.snapshots.insert(
            id,
            StoredSnapshot {
                as_of,
                created_at: Utc::now(),
                positions: Vec::new(),
            },
        );
        id
    }

    fn create_position(
        &mut self,
        snapshot: SnapshotId,
        asset: AssetId,
        quantity: Money,
    ) -> Result<(), HoldingsError> {
        if !self.assets.contains_key(&asset) {
            return Err(HoldingsError::AssetNotFound { asset });
        }
        let stored = self
            .snapshots
            .get_mut(&snapshot)
            .ok_or(HoldingsError::NotFound { snapshot })?;
        stored.positions.push(StoredPosition { asset, quantity });
        Ok(())
    }

    fn load(&self, id: SnapshotId, stored: &StoredSnapshot) -> Snapshot {
        let positions = stored
            .positions
            .iter()
            .filter_map(|p| {
                self.assets.get(&p.asset).map(|asset| Position {
                    asset: asset.clone(),
                    quantity: p.quantity,
                })
            })
            .collect();
        Snapshot {
            id,
            as_of: stored.as_of,
            created_at: stored.created_at,
            positions,
        }
    }

    fn get_snapshot(&self, id: SnapshotId) -> Result<Snapshot, HoldingsError> {
        self.snapshots
            .get(&id)
            .map(|stored| self.load(id, stored))
            .ok_or(HoldingsError::NotFound { snapshot: id })
    }

    fn list_snapshots(&self, limit: usize) -> Vec<Snapshot> {
        let mut ordered: Vec<_> = self.snapshots.iter().collect();
        // При равных датах первым идёт более новый снимок.
        ordered.sort_by(|(a_id, a), (b_id, b)| b.as_of.cmp(&a.as_of).then(b_id.cmp(a_id)));
        ordered
            .into_iter()
            .take(limit)
            .map(|(id, stored)| self.load(*id, stored))
            .collect()
    }

    fn delete_snapshot(&mut self, id: SnapshotId) -> Result<(), HoldingsError> {
        self.snapshots
            .remove(&id)
            .map(|_| ())
            .ok_or(HoldingsError::NotFound { snapshot: id })
    }
}

/// Хранилище в памяти с уникальностью тикеров и каскадным удалением позиций.
///
/// Запись напрямую в `MemoryStore` фиксируется сразу; для атомарного импорта
/// используйте [`MemoryStore::begin`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: StoreState,
}

impl MemoryStore {
    /// Создаёт пустое хранилище.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Начинает транзакцию над копией текущего состояния.
    pub fn begin(&mut self) -> Transaction<'_> {
        let staged = self.state.clone();
        Transaction {
            target: &mut self.state,
            staged,
        }
    }

    /// Количество сохранённых активов.
    #[inline]
    pub fn asset_count(&self) -> usize {
        self.state.assets.len()
    }
}

/// Транзакция над [`MemoryStore`]: `commit` публикует записи, `drop` их отбрасывает.
#[derive(Debug)]
pub struct Transaction<'a> {
    target: &'a mut StoreState,
    staged: StoreState,
}

impl Transaction<'_> {
    /// Публикует подготовленные записи.
    pub fn commit(self) {
        *self.target = self.staged;
    }

    /// Отбрасывает подготовленные записи.
    #[inline]
    pub fn rollback(self) {}
}

/// Реализует [`HoldingsStore`] делегированием в поле `StoreState`.
macro_rules! delegate_store {
    ($ty:ty, $field:ident) => {
        impl HoldingsStore for $ty {
            fn find_assets_by_tickers(
                &self,
                tickers: &BTreeSet<String>,
            ) -> Result<HashMap<String, Asset>, HoldingsError> {
                Ok(self.$field.find_assets_by_tickers(tickers))
            }

            fn create_asset(&mut self, asset: NewAsset) -> Result<Asset, HoldingsError> {
                self.$field.create_asset(asset)
            }

            fn create_snapshot(
                &mut self,
                as_of: DateTime<Utc>,
            ) -> Result<SnapshotId, HoldingsError> {
                Ok(self.$field.create_snapshot(as_of))
            }

            fn create_position(
                &mut self,
                snapshot: SnapshotId,
                asset: AssetId,
                quantity: Money,
            ) -> Result<(), HoldingsError> {
                self.$field.create_position(snapshot, asset, quantity)
            }

            fn get_snapshot(&self, id: SnapshotId) -> Result<Snapshot, HoldingsError> {
                self.$field.get_snapshot(id)
            }

            fn get_latest_snapshot(&self) -> Result<Option<Snapshot>, HoldingsError> {
                Ok(self.$field.list_snapshots(1).into_iter().next())
            }

            fn list_snapshots(&self, limit: usize) -> Result<Vec<Snapshot>, HoldingsError> {
                Ok(self.$field.list_snapshots(limit))
            }

            fn delete_snapshot(&mut self, id: SnapshotId) -> Result<(), HoldingsError> {
                self.$field.delete_snapshot(id)
            }
        }
    };
}

delegate_store!(MemoryStore, state);
delegate_store!(Transaction<'_>, staged);
