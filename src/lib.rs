#![warn(missing_docs)]
//! Библиотека для импорта портфельных позиций из CSV и выписок Interactive Brokers
//! в неизменяемые снимки.

mod error;
mod flat;
mod holding;
mod import;
mod raw;
mod reconcile;
mod statement;
mod store;
mod types;
mod utils;

pub use crate::error::{FieldError, HoldingsError};
pub use crate::flat::parse_flat_csv;
pub use crate::holding::HoldingRow;
pub use crate::import::{import_holdings_ibkr, import_holdings_manual, latest_holdings};
pub use crate::raw::RawInput;
pub use crate::reconcile::reconcile_snapshot;
pub use crate::statement::{parse_sectioned_statement, StatementParser};
pub use crate::store::{HoldingsStore, MemoryStore, Transaction};
pub use crate::types::*;
