//! Пример CLI: импортирует файл с позициями и выводит созданный снимок.

use std::env;

use chrono::{DateTime, NaiveDate, Utc};
use holdings_import::{
    import_holdings_manual, latest_holdings, parse_sectioned_statement, reconcile_snapshot,
    ImportSummary, MemoryStore, RawInput, StatementPeriod,
};

const USAGE: &str = "Usage: holdings-import <manual|ibkr> <path> [as-of YYYY-MM-DD]";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let (Some(format), Some(path)) = (args.next(), args.next()) else {
        println!("{USAGE}");
        return Ok(());
    };
    let as_of_arg = args
        .next()
        .map(|value| NaiveDate::parse_from_str(&value, "%Y-%m-%d"))
        .transpose()?;

    let raw = RawInput::from_path(&path)?;
    let mut store = MemoryStore::new();
    let mut tx = store.begin();

    let summary = match format.as_str() {
        "manual" => {
            let as_of = as_of_arg.unwrap_or_else(today);
            import_holdings_manual(&mut tx, &raw, to_utc(as_of))?
        }
        "ibkr" => {
            let statement = parse_sectioned_statement(&raw)?;
            // Без явной даты берём конец периода выписки.
            let as_of = as_of_arg
                .or_else(|| statement.period.as_ref().and_then(StatementPeriod::end_date))
                .unwrap_or_else(today);
            let summary = reconcile_snapshot(&mut tx, to_utc(as_of), &statement.holdings)?;
            ImportSummary {
                statement_period: statement.period,
                ..summary
            }
        }
        _ => {
            println!("{USAGE}");
            return Ok(());
        }
    };
    tx.commit();

    println!(
        "Снимок {}: {} позиций на {}",
        summary.snapshot_id,
        summary.position_count,
        summary.as_of.date_naive()
    );
    if let Some(period) = &summary.statement_period {
        println!("Период выписки: {period}");
    }
    if let Some(latest) = latest_holdings(&store)? {
        for row in &latest.positions {
            println!(
                "{:<8} {:>16} {} {:<8} {}",
                row.ticker(),
                row.quantity(),
                row.currency(),
                row.asset_class(),
                row.name().unwrap_or("")
            );
        }
    }
    println!("Активов в хранилище: {}", store.asset_count());
    Ok(())
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn to_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}
