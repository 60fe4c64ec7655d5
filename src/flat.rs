//! Разбор простого CSV с позициями: заголовок и по строке на позицию.

use std::collections::HashMap;

use crate::error::HoldingsError;
use crate::holding::HoldingRow;
use crate::raw::RawInput;
use crate::types::ParsedBatch;
use crate::utils::{cell, normalize_header, raw_line, read_records};

/// Обязательные столбцы в алфавитном порядке.
const REQUIRED_COLUMNS: [&str; 4] = ["asset_type", "currency", "qty", "ticker"];

/// Позиции столбцов, найденные по заголовку.
struct ColumnMap {
    ticker: usize,
    qty: usize,
    currency: usize,
    asset_type: usize,
    name: Option<usize>,
}

impl ColumnMap {
    fn from_header(header: &csv::StringRecord) -> Result<Self, HoldingsError> {
        let mut idx: HashMap<String, usize> = HashMap::new();
        for (i, column) in header.iter().enumerate() {
            idx.entry(normalize_header(column)).or_insert(i);
        }

        let missing: Vec<String> = REQUIRED_COLUMNS
            .into_iter()
            .filter(|c| !idx.contains_key(*c))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            let mut present: Vec<String> = idx.into_keys().collect();
            present.sort();
            return Err(HoldingsError::MissingColumns { missing, present });
        }

        Ok(Self {
            ticker: idx["ticker"],
            qty: idx["qty"],
            currency: idx["currency"],
            asset_type: idx["asset_type"],
            name: idx.get("name").copied(),
        })
    }
}

/// Разбирает CSV с позициями.
///
/// Обязательные столбцы: `ticker`, `qty`, `currency`, `asset_type`; необязательный `name`.
/// Имена столбцов сравниваются без учёта регистра. Файл только с заголовком даёт пустой набор.
pub fn parse_flat_csv(raw: &RawInput) -> Result<ParsedBatch, HoldingsError> {
    let text = raw.content()?;
    let mut records = read_records(text)?.into_iter();

    // Заголовок — первая непустая строка.
    let header = records
        .by_ref()
        .find(|record| record.iter().any(|field| !field.trim().is_empty()))
        .ok_or(HoldingsError::EmptyInput)?;
    let columns = ColumnMap::from_header(&header)?;

    let mut rows = Vec::new();
    // Заголовок — строка 1; полностью пустые строки читатель CSV пропускает сам.
    for (idx, record) in records.enumerate() {
        let name = columns.name.map(|i| cell(&record, i));
        let row = HoldingRow::new(
            cell(&record, columns.ticker),
            cell(&record, columns.qty),
            cell(&record, columns.currency),
            cell(&record, columns.asset_type),
            name,
        )
        .map_err(|source| HoldingsError::FieldValidation {
            row: idx + 2,
            raw_row: raw_line(text, &record),
            source,
        })?;
        rows.push(row);
    }

    log::info!("parsed {} holdings from flat CSV", rows.len());
    Ok(ParsedBatch::from_rows(rows))
}
