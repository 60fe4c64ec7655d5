//! Ошибки разбора входных файлов и работы с хранилищем снимков.

use crate::types::{AssetId, SnapshotId};

/// Нарушение правила валидации одного поля строки позиции.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{field} {reason}")]
pub struct FieldError {
    /// Имя поля (`ticker`, `qty`, `currency`, `asset_type`).
    pub field: &'static str,
    /// Человекочитаемая причина.
    pub reason: String,
}

impl FieldError {
    pub(crate) fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Ошибка разбора, сверки или обращения к хранилищу.
#[derive(thiserror::Error, Debug)]
pub enum HoldingsError {
    /// Ошибка ввода-вывода при чтении исходного файла.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Некорректная CSV-разметка (незакрытые кавычки и т. п.).
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// Вход пуст или состоит только из пробельных символов.
    #[error("Input is empty")]
    EmptyInput,
    /// В заголовке CSV нет обязательных столбцов.
    #[error("Missing required columns: {} (header has: {})", .missing.join(", "), .present.join(", "))]
    MissingColumns {
        /// Отсутствующие столбцы в алфавитном порядке.
        missing: Vec<String>,
        /// Столбцы, найденные в заголовке, в алфавитном порядке.
        present: Vec<String>,
    },
    /// Строка данных не прошла валидацию.
    #[error("Row {row}: {source} (row data: {raw_row})")]
    FieldValidation {
        /// Номер строки, начиная с 1 (заголовок имеет номер 1).
        row: usize,
        /// Исходный текст строки.
        raw_row: String,
        /// Нарушенное правило.
        source: FieldError,
    },
    /// В выписке нет обязательной секции.
    #[error("Section '{section}' not found")]
    MissingSection {
        /// Имя секции.
        section: &'static str,
    },
    /// Количество в строке Summary не число или не положительно.
    #[error("Invalid quantity for {ticker}: '{value}'")]
    InvalidQuantity {
        /// Тикер позиции.
        ticker: String,
        /// Исходное значение количества.
        value: String,
    },
    /// Секция «Open Positions» есть, но строк Data/Summary в ней нет.
    #[error("No holdings found in Open Positions")]
    NoHoldingsFound,
    /// Актив с таким тикером уже создан параллельной записью.
    #[error("Asset '{ticker}' already exists")]
    StoreConflict {
        /// Тикер, на котором произошёл конфликт.
        ticker: String,
    },
    /// Снимок с указанным идентификатором не найден.
    #[error("Holdings snapshot {snapshot} not found")]
    NotFound {
        /// Запрошенный идентификатор.
        snapshot: SnapshotId,
    },
    /// Позиция ссылается на несуществующий актив.
    #[error("Asset {} not found", .asset.0)]
    AssetNotFound {
        /// Запрошенный идентификатор.
        asset: AssetId,
    },
}
