//! Сверка разобранных позиций с хранилищем и создание снимка.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};

use crate::error::HoldingsError;
use crate::holding::HoldingRow;
use crate::store::HoldingsStore;
use crate::types::{Asset, ImportSummary, NewAsset, ParsedBatch};

/// Создаёт снимок на момент `as_of` и по позиции на каждую строку набора.
///
/// Активы ищутся одним запросом по всем тикерам; недостающие создаются с
/// метаданными первой строки тикера. Существующие активы не меняются.
/// Транзакцию не фиксирует.
pub fn reconcile_snapshot<S>(
    store: &mut S,
    as_of: DateTime<Utc>,
    batch: &ParsedBatch,
) -> Result<ImportSummary, HoldingsError>
where
    S: HoldingsStore + ?Sized,
{
    // Первая строка тикера задаёт метаданные нового актива.
    let mut first_rows: BTreeMap<&str, &HoldingRow> = BTreeMap::new();
    for row in batch {
        first_rows.entry(row.ticker()).or_insert(row);
    }

    let tickers: BTreeSet<String> = first_rows.keys().map(|t| (*t).to_string()).collect();
    let mut assets = if tickers.is_empty() {
        HashMap::new()
    } else {
        store.find_assets_by_tickers(&tickers)?
    };
    log::debug!(
        "{} of {} tickers already have assets",
        assets.len(),
        tickers.len()
    );

    for (ticker, row) in &first_rows {
        if assets.contains_key(*ticker) {
            continue;
        }
        let asset = create_or_refetch(store, NewAsset::from(*row))?;
        assets.insert(asset.ticker.clone(), asset);
    }

    let snapshot_id = store.create_snapshot(as_of)?;
    for row in batch {
        let asset = assets
            .get(row.ticker())
            .ok_or_else(|| HoldingsError::StoreConflict {
                ticker: row.ticker().to_string(),
            })?;
        store.create_position(snapshot_id, asset.id, row.quantity())?;
    }

    log::info!(
        "created snapshot {snapshot_id} as of {as_of} with {} positions",
        batch.len()
    );

    Ok(ImportSummary {
        snapshot_id,
        position_count: batch.len(),
        as_of,
        statement_period: None,
    })
}

/// Создаёт актив; при конфликте уникальности берёт уже созданный.
fn create_or_refetch<S>(store: &mut S, new: NewAsset) -> Result<Asset, HoldingsError>
where
    S: HoldingsStore + ?Sized,
{
    match store.create_asset(new) {
        Ok(asset) => {
            log::debug!("created asset {} ({})", asset.ticker, asset.asset_class);
            Ok(asset)
        }
        Err(HoldingsError::StoreConflict { ticker }) => {
            log::debug!("asset {ticker} was created concurrently, re-fetching");
            let tickers = BTreeSet::from([ticker.clone()]);
            store
                .find_assets_by_tickers(&tickers)?
                .remove(&ticker)
                .ok_or(HoldingsError::StoreConflict { ticker })
        }
        Err(err) => Err(err),
    }
}
