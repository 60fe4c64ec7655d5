//! Строка позиции и правила её валидации.

use crate::error::FieldError;
use crate::types::Money;
use crate::utils::parse_decimal;
use rust_decimal::Decimal;

/// Разобранная позиция: тикер, количество, валюта, класс актива и имя.
///
/// Значение существует только в валидном виде: количество строго положительно,
/// тикер и валюта в верхнем регистре, пустое имя хранится как `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldingRow {
    ticker: String,
    quantity: Money,
    currency: String,
    asset_class: String,
    name: Option<String>,
}

impl HoldingRow {
    /// Проверяет сырые поля и собирает строку.
    ///
    /// Правила проверяются по порядку, возвращается первое нарушение:
    /// тикер, количество (пустое, не число, не положительное), валюта, класс актива.
    pub fn new(
        ticker: &str,
        quantity: &str,
        currency: &str,
        asset_class: &str,
        name: Option<&str>,
    ) -> Result<Self, FieldError> {
        let ticker = required("ticker", ticker)?.to_uppercase();
        let quantity = parse_quantity("qty", quantity)?;
        let currency = required("currency", currency)?.to_uppercase();
        let asset_class = required("asset_type", asset_class)?.to_string();
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        Ok(Self {
            ticker,
            quantity,
            currency,
            asset_class,
            name,
        })
    }

    /// Собирает строку из уже сохранённых данных без повторной проверки.
    pub(crate) const fn from_stored(
        ticker: String,
        quantity: Money,
        currency: String,
        asset_class: String,
        name: Option<String>,
    ) -> Self {
        Self {
            ticker,
            quantity,
            currency,
            asset_class,
            name,
        }
    }

    /// Тикер в верхнем регистре.
    #[inline]
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// Количество, всегда больше нуля.
    #[inline]
    pub const fn quantity(&self) -> Money {
        self.quantity
    }

    /// Валюта в верхнем регистре.
    #[inline]
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Класс актива в исходном регистре.
    #[inline]
    pub fn asset_class(&self) -> &str {
        &self.asset_class
    }

    /// Отображаемое имя.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, FieldError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(FieldError::new(field, "cannot be empty"));
    }
    Ok(value)
}

/// Разбирает количество как точное десятичное число больше нуля.
pub(crate) fn parse_quantity(field: &'static str, value: &str) -> Result<Money, FieldError> {
    let value = required(field, value)?;
    let quantity = parse_decimal(value)
        .ok_or_else(|| FieldError::new(field, format!("must be a valid number, got '{value}'")))?;
    if quantity <= Decimal::ZERO {
        return Err(FieldError::new(
            field,
            format!("must be greater than 0, got '{value}'"),
        ));
    }
    Ok(quantity)
}
