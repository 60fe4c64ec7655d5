//! Исходный текст входного файла, полностью загруженный в память.

use crate::error::HoldingsError;
use std::fs;
use std::io::Read;
use std::path::Path;

/// Текст CSV-файла без разбора.
#[derive(Debug, Clone)]
pub struct RawInput {
    /// Полное содержимое файла.
    pub text: String,
}

impl RawInput {
    /// Читает текст из произвольного `Read`.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, HoldingsError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Ok(Self { text })
    }

    /// Читает текст из файла по пути.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, HoldingsError> {
        Ok(Self {
            text: fs::read_to_string(path)?,
        })
    }

    /// Создаёт вход из готовой строки.
    #[inline]
    pub fn from_str(s: &str) -> Self {
        Self {
            text: s.to_string(),
        }
    }

    /// Текст для разбора, без обрезки: номера строк CSV совпадают со строками файла.
    ///
    /// Вход из одних пробельных символов означает [`HoldingsError::EmptyInput`].
    pub(crate) fn content(&self) -> Result<&str, HoldingsError> {
        if self.text.trim().is_empty() {
            return Err(HoldingsError::EmptyInput);
        }
        Ok(&self.text)
    }
}
