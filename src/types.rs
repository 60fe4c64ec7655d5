//! Доменные типы: позиции, активы, снимки и результаты импорта.

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use std::fmt;
use std::sync::LazyLock;

use crate::holding::HoldingRow;

/// Количество бумаг, используем `Decimal` для точного хранения дробных долей.
pub type Money = Decimal;

/// Идентификатор актива в хранилище.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(pub u64);

/// Идентификатор снимка позиций в хранилище.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SnapshotId(pub u64);

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Упорядоченный по тикеру набор разобранных позиций.
///
/// Строки с одинаковым тикером сохраняют исходный порядок.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedBatch {
    rows: Vec<HoldingRow>,
}

impl ParsedBatch {
    /// Сортирует строки по тикеру и собирает набор.
    pub fn from_rows(mut rows: Vec<HoldingRow>) -> Self {
        rows.sort_by(|a, b| a.ticker().cmp(b.ticker()));
        Self { rows }
    }

    /// Строки набора.
    #[inline]
    pub fn rows(&self) -> &[HoldingRow] {
        &self.rows
    }

    /// Итератор по строкам.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, HoldingRow> {
        self.rows.iter()
    }

    /// Количество строк.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Пуст ли набор.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Забирает строки.
    #[inline]
    pub fn into_rows(self) -> Vec<HoldingRow> {
        self.rows
    }
}

impl<'a> IntoIterator for &'a ParsedBatch {
    type Item = &'a HoldingRow;
    type IntoIter = std::slice::Iter<'a, HoldingRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

static PERIOD_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z]+)\s+(\d{1,2}),?\s+(\d{4})").expect("valid period date regex")
});

/// Период выписки в том виде, в каком он записан брокером.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementPeriod(pub String);

impl StatementPeriod {
    /// Исходный текст периода.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Дата окончания периода, если её удаётся разобрать.
    ///
    /// Берётся последняя дата вида `January 31, 2026` или `January 31 2026`.
    pub fn end_date(&self) -> Option<NaiveDate> {
        let caps = PERIOD_DATE_RE.captures_iter(&self.0).last()?;
        let text = format!("{} {} {}", &caps[1], &caps[2], &caps[3]);
        NaiveDate::parse_from_str(&text, "%B %d %Y")
            .or_else(|_| NaiveDate::parse_from_str(&text, "%b %d %Y"))
            .ok()
    }
}

impl fmt::Display for StatementPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Разобранная выписка брокера.
#[derive(Debug, Clone)]
pub struct ActivityStatement {
    /// Позиции из секции «Open Positions».
    pub holdings: ParsedBatch,
    /// Период выписки из секции «Statement».
    pub period: Option<StatementPeriod>,
}

/// Сохранённый актив. Метаданные задаёт первая запись тикера.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Идентификатор.
    pub id: AssetId,
    /// Уникальный тикер.
    pub ticker: String,
    /// Валюта.
    pub currency: String,
    /// Класс актива (`equity`, `etf`, ...).
    pub asset_class: String,
    /// Отображаемое имя.
    pub name: Option<String>,
}

/// Данные для создания актива.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAsset {
    /// Тикер.
    pub ticker: String,
    /// Валюта.
    pub currency: String,
    /// Класс актива.
    pub asset_class: String,
    /// Отображаемое имя.
    pub name: Option<String>,
}

impl From<&HoldingRow> for NewAsset {
    fn from(row: &HoldingRow) -> Self {
        Self {
            ticker: row.ticker().to_string(),
            currency: row.currency().to_string(),
            asset_class: row.asset_class().to_string(),
            name: row.name().map(str::to_string),
        }
    }
}

/// Позиция снимка вместе с активом, на который она ссылается.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    /// Актив позиции.
    pub asset: Asset,
    /// Количество.
    pub quantity: Money,
}

/// Неизменяемый снимок позиций на момент времени.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Идентификатор.
    pub id: SnapshotId,
    /// Момент, на который действуют позиции.
    pub as_of: DateTime<Utc>,
    /// Момент создания снимка.
    pub created_at: DateTime<Utc>,
    /// Позиции в порядке добавления.
    pub positions: Vec<Position>,
}

/// Итог импорта одного файла.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    /// Созданный снимок.
    pub snapshot_id: SnapshotId,
    /// Количество созданных позиций.
    pub position_count: usize,
    /// Момент, на который действуют позиции.
    pub as_of: DateTime<Utc>,
    /// Период выписки (только для выписок брокера).
    pub statement_period: Option<StatementPeriod>,
}

/// Последний снимок в виде строк позиций для отображения.
#[derive(Debug, Clone)]
pub struct LatestHoldings {
    /// Идентификатор снимка.
    pub snapshot_id: SnapshotId,
    /// Момент, на который действуют позиции.
    pub as_of: DateTime<Utc>,
    /// Момент создания снимка.
    pub created_at: DateTime<Utc>,
    /// Позиции, отсортированные по тикеру.
    pub positions: ParsedBatch,
    /// Количество позиций.
    pub position_count: usize,
}
