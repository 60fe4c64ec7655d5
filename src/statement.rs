//! Разбор выписки Interactive Brokers (Activity Statement).
//!
//! Каждая строка начинается с имени секции, у каждой секции своя раскладка
//! столбцов. Строки классифицируются по маркерам в позициях 1 и 2, короткие
//! строки считаются несовпавшими и пропускаются.

use std::collections::HashMap;

use crate::error::{FieldError, HoldingsError};
use crate::holding::{parse_quantity, HoldingRow};
use crate::raw::RawInput;
use crate::types::{ActivityStatement, ParsedBatch, StatementPeriod};
use crate::utils::{cell, raw_line, read_records};
use csv::StringRecord;

const OPEN_POSITIONS: &str = "Open Positions";
const INSTRUMENT_INFO: &str = "Financial Instrument Information";
const STATEMENT: &str = "Statement";

const DATA: &str = "Data";
const SUMMARY: &str = "Summary";
const PERIOD: &str = "Period";

/// Минимальная длина строки «Financial Instrument Information».
const INSTRUMENT_MIN_FIELDS: usize = 10;
/// Минимальная длина строки «Open Positions».
const POSITION_MIN_FIELDS: usize = 7;
/// Минимальная длина строки периода в «Statement».
const PERIOD_MIN_FIELDS: usize = 4;

const DEFAULT_ASSET_CLASS: &str = "equity";

/// Строки выписки, сгруппированные по имени секции.
struct Sections {
    rows: HashMap<String, Vec<StringRecord>>,
}

impl Sections {
    /// Группирует записи по первому полю, сохраняя порядок внутри секции.
    fn group(text: &str) -> Result<Self, HoldingsError> {
        let mut rows: HashMap<String, Vec<StringRecord>> = HashMap::new();
        for record in read_records(text)? {
            let section = cell(&record, 0).trim();
            if section.is_empty() {
                continue;
            }
            rows.entry(section.to_string()).or_default().push(record);
        }
        log::debug!("statement sections: {:?}", rows.keys().collect::<Vec<_>>());
        Ok(Self { rows })
    }

    fn get(&self, section: &'static str) -> Result<&[StringRecord], HoldingsError> {
        self.rows
            .get(section)
            .map(Vec::as_slice)
            .ok_or(HoldingsError::MissingSection { section })
    }
}

/// Метаданные инструмента из «Financial Instrument Information».
#[derive(Debug, Clone)]
struct InstrumentInfo {
    name: String,
    asset_class: &'static str,
}

/// Тип инструмента брокера в класс актива: `ETF` — `etf`, остальное — `equity`.
fn map_instrument_type(kind: &str) -> &'static str {
    if kind.trim().eq_ignore_ascii_case("ETF") {
        "etf"
    } else {
        DEFAULT_ASSET_CLASS
    }
}

/// Строит справочник тикер → (имя, класс актива).
///
/// Раскладка: `[1]` Data, `[3]` Symbol, `[4]` Description, `[9]` Type.
fn parse_instrument_info(rows: &[StringRecord]) -> HashMap<String, InstrumentInfo> {
    let mut lookup = HashMap::new();
    for row in rows {
        if row.len() < INSTRUMENT_MIN_FIELDS || cell(row, 1) != DATA {
            continue;
        }
        let symbol = cell(row, 3).trim().to_uppercase();
        if symbol.is_empty() {
            continue;
        }
        let description = cell(row, 4).trim();
        let name = if description.is_empty() {
            symbol.clone()
        } else {
            description.to_string()
        };
        lookup.insert(
            symbol,
            InstrumentInfo {
                name,
                asset_class: map_instrument_type(cell(row, 9)),
            },
        );
    }
    lookup
}

/// Извлекает позиции из строк Data/Summary секции «Open Positions».
///
/// Раскладка: `[1]` Data, `[2]` Summary, `[4]` Currency, `[5]` Symbol, `[6]` Quantity.
/// Строки Header и Total не проходят проверку маркеров и пропускаются.
fn parse_open_positions(
    text: &str,
    rows: &[StringRecord],
    lookup: &HashMap<String, InstrumentInfo>,
) -> Result<Vec<HoldingRow>, HoldingsError> {
    let mut holdings = Vec::new();
    for row in rows {
        if row.len() < POSITION_MIN_FIELDS || cell(row, 1) != DATA || cell(row, 2) != SUMMARY {
            continue;
        }
        let symbol = cell(row, 5).trim().to_uppercase();
        if symbol.is_empty() {
            log::warn!("skipping Open Positions summary row without symbol");
            continue;
        }

        let qty = cell(row, 6);
        parse_quantity("qty", qty).map_err(|_| HoldingsError::InvalidQuantity {
            ticker: symbol.clone(),
            value: qty.trim().to_string(),
        })?;

        let (name, asset_class) = lookup.get(&symbol).map_or_else(
            || (symbol.as_str(), DEFAULT_ASSET_CLASS),
            |info| (info.name.as_str(), info.asset_class),
        );

        let holding = HoldingRow::new(&symbol, qty, cell(row, 4), asset_class, Some(name))
            .map_err(|source: FieldError| HoldingsError::FieldValidation {
                row: row
                    .position()
                    .and_then(|p| usize::try_from(p.line()).ok())
                    .unwrap_or_default(),
                raw_row: raw_line(text, row),
                source,
            })?;
        holdings.push(holding);
    }
    Ok(holdings)
}

/// Ищет период в строке `Statement,Data,Period,<текст>`.
fn parse_statement_period(rows: &[StringRecord]) -> Option<StatementPeriod> {
    rows.iter()
        .find(|row| {
            row.len() >= PERIOD_MIN_FIELDS && cell(row, 1) == DATA && cell(row, 2) == PERIOD
        })
        .map(|row| StatementPeriod(cell(row, 3).trim().to_string()))
}

/// Какие необязательные секции учитывать при разборе.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ParseOptions {
    pub load_instrument_info: bool,
    pub load_period: bool,
}

/// Справочник инструментов и период включены.
const ALL_SECTIONS: ParseOptions = ParseOptions {
    load_instrument_info: true,
    load_period: true,
};

/// Разбирает выписку, учитывая все необязательные секции.
#[inline]
pub fn parse_sectioned_statement(raw: &RawInput) -> Result<ActivityStatement, HoldingsError> {
    parse_with_options(raw, ALL_SECTIONS)
}

pub(crate) fn parse_with_options(
    raw: &RawInput,
    options: ParseOptions,
) -> Result<ActivityStatement, HoldingsError> {
    let text = raw.content()?;
    let sections = Sections::group(text)?;
    let open_positions = sections.get(OPEN_POSITIONS)?;

    // Справочник должен быть готов до разбора позиций.
    let lookup = parse_optional(options.load_instrument_info, || {
        sections.get(INSTRUMENT_INFO).map(parse_instrument_info)
    })?
    .unwrap_or_default();

    let holdings = parse_open_positions(text, open_positions, &lookup)?;
    if holdings.is_empty() {
        return Err(HoldingsError::NoHoldingsFound);
    }

    let period = parse_optional(options.load_period, || {
        sections.get(STATEMENT).map(parse_statement_period)
    })?
    .flatten();

    log::info!(
        "parsed {} holdings from activity statement (period: {})",
        holdings.len(),
        period.as_ref().map_or("unknown", StatementPeriod::as_str)
    );

    Ok(ActivityStatement {
        holdings: ParsedBatch::from_rows(holdings),
        period,
    })
}

/// Builder для разбора выписки с выбором необязательных секций.
pub struct StatementParser<'a> {
    raw: &'a RawInput,
    options: ParseOptions,
}

impl<'a> StatementParser<'a> {
    /// Создаёт builder для указанной выписки.
    ///
    /// # Пример
    ///
    /// ```
    /// # use holdings_import::{RawInput, StatementParser};
    /// let raw = RawInput::from_str(
    ///     "Open Positions,Data,Summary,Stocks,USD,CSPX,13.4888\n\
    ///      Financial Instrument Information,Data,Stocks,CSPX,ISHARES CORE S&P 500,,,,,ETF,",
    /// );
    /// let statement = StatementParser::new(&raw)
    ///     .instrument_info(false)
    ///     .parse()
    ///     .unwrap();
    /// assert_eq!(statement.holdings.rows()[0].asset_class(), "equity");
    /// ```
    #[inline]
    pub const fn new(raw: &'a RawInput) -> Self {
        Self {
            raw,
            options: ALL_SECTIONS,
        }
    }

    /// Включает или отключает справочник «Financial Instrument Information».
    #[inline]
    pub const fn instrument_info(mut self, enabled: bool) -> Self {
        self.options.load_instrument_info = enabled;
        self
    }

    /// Включает или отключает извлечение периода из «Statement».
    #[inline]
    pub const fn period(mut self, enabled: bool) -> Self {
        self.options.load_period = enabled;
        self
    }

    /// Выполняет разбор с текущими настройками.
    #[inline]
    pub fn parse(self) -> Result<ActivityStatement, HoldingsError> {
        parse_with_options(self.raw, self.options)
    }
}

/// Вызывает разбор секции, возвращая `None`, если секция отсутствует.
fn parse_optional<T, F>(enabled: bool, loader: F) -> Result<Option<T>, HoldingsError>
where
    F: FnOnce() -> Result<T, HoldingsError>,
{
    if !enabled {
        return Ok(None);
    }
    // Отсутствие секции — нормальный случай для части выписок.
    match loader() {
        Ok(value) => Ok(Some(value)),
        Err(HoldingsError::MissingSection { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_instrument_types() {
        assert_eq!(map_instrument_type("ETF"), "etf");
        assert_eq!(map_instrument_type(" etf "), "etf");
        for kind in ["COMMON", "PREFERRED", "ADR", "", "ETFX"] {
            assert_eq!(map_instrument_type(kind), "equity");
        }
    }
}
