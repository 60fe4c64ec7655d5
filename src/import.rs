//! Сценарии импорта: разбор файла и сверка с хранилищем.
//!
//! Ни один сценарий не фиксирует транзакцию, это делает вызывающий код.

use chrono::{DateTime, Utc};

use crate::error::HoldingsError;
use crate::flat::parse_flat_csv;
use crate::holding::HoldingRow;
use crate::raw::RawInput;
use crate::reconcile::reconcile_snapshot;
use crate::statement::parse_sectioned_statement;
use crate::store::HoldingsStore;
use crate::types::{ImportSummary, LatestHoldings, ParsedBatch};

/// Импортирует позиции из простого CSV.
pub fn import_holdings_manual<S>(
    store: &mut S,
    raw: &RawInput,
    as_of: DateTime<Utc>,
) -> Result<ImportSummary, HoldingsError>
where
    S: HoldingsStore + ?Sized,
{
    let batch = parse_flat_csv(raw)?;
    reconcile_snapshot(store, as_of, &batch)
}

/// Импортирует позиции из выписки брокера.
pub fn import_holdings_ibkr<S>(
    store: &mut S,
    raw: &RawInput,
    as_of: DateTime<Utc>,
) -> Result<ImportSummary, HoldingsError>
where
    S: HoldingsStore + ?Sized,
{
    let statement = parse_sectioned_statement(raw)?;
    let summary = reconcile_snapshot(store, as_of, &statement.holdings)?;
    Ok(ImportSummary {
        statement_period: statement.period,
        ..summary
    })
}

/// Возвращает последний снимок в виде строк позиций, отсортированных по тикеру.
pub fn latest_holdings<S>(store: &S) -> Result<Option<LatestHoldings>, HoldingsError>
where
    S: HoldingsStore + ?Sized,
{
    let Some(snapshot) = store.get_latest_snapshot()? else {
        return Ok(None);
    };

    let rows: Vec<HoldingRow> = snapshot
        .positions
        .into_iter()
        .map(|p| {
            HoldingRow::from_stored(
                p.asset.ticker,
                p.quantity,
                p.asset.currency,
                p.asset.asset_class,
                p.asset.name,
            )
        })
        .collect();
    let positions = ParsedBatch::from_rows(rows);

    Ok(Some(LatestHoldings {
        snapshot_id: snapshot.id,
        as_of: snapshot.as_of,
        created_at: snapshot.created_at,
        position_count: positions.len(),
        positions,
    }))
}
