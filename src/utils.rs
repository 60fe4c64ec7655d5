//! Вспомогательные функции для чисел, ячеек и CSV-записей.

use crate::types::Money;
use csv::{ReaderBuilder, StringRecord};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Разбирает точное десятичное число, допускается экспоненциальная запись.
pub fn parse_decimal(value: &str) -> Option<Money> {
    let value = value.trim();
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .ok()
}

/// Нормализует имя столбца: обрезает пробелы и приводит к нижнему регистру.
pub fn normalize_header(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Возвращает ячейку по индексу или пустую строку, если её нет.
#[inline]
pub fn cell(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("")
}

/// Исходный текст строки, с которой начинается запись.
pub fn raw_line(text: &str, record: &StringRecord) -> String {
    record
        .position()
        .and_then(|pos| usize::try_from(pos.line()).ok())
        .and_then(|line| text.lines().nth(line.saturating_sub(1)))
        .map_or_else(
            || record.iter().collect::<Vec<_>>().join(","),
            str::to_string,
        )
}

/// Читает все записи CSV без заголовка, допуская разное число полей.
pub fn read_records(text: &str) -> Result<Vec<StringRecord>, csv::Error> {
    ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes())
        .records()
        .collect()
}
