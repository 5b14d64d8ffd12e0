use arbit_instrument::ExchangeId;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One row of `arbitrage_bf_<quote>_ccxt.csv` (spec §6). `path` is the cycle's currency list
/// joined with `->`, matching the column's plain-text rendering in `original_source`'s reports.
#[derive(Debug, Clone, Serialize)]
pub struct BfRow {
    pub exchange: ExchangeId,
    pub path: String,
    pub net_pct: Decimal,
    pub inv: Decimal,
    pub est_after: Decimal,
    pub hops: usize,
    pub iteration: u64,
    pub ts: DateTime<Utc>,
    pub net_pct_raw: Option<Decimal>,
    pub slippage_bps: Option<Decimal>,
    pub fee_bps_total: Option<Decimal>,
    pub used_ws: Option<bool>,
}

/// One row of `arbitrage_tri_<quote>_ccxt.csv`.
#[derive(Debug, Clone, Serialize)]
pub struct TriRow {
    pub exchange: ExchangeId,
    pub path: String,
    pub r1: Decimal,
    pub r2: Decimal,
    pub r3: Decimal,
    pub net_pct: Decimal,
    pub inv: Decimal,
    pub est_after: Decimal,
    pub iteration: u64,
    pub ts: DateTime<Utc>,
}

/// One row of `arbitrage_bf_<quote>_persistence.csv`, mirroring a single
/// [`arbit_risk::PersistenceRecord`].
#[derive(Debug, Clone, Serialize)]
pub struct PersistenceRow {
    pub exchange: ExchangeId,
    pub path: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub occurrences: u64,
    pub max_streak: u64,
    pub approx_duration_s: u64,
}

/// One row of `arbitrage_bf_simulation_summary_<quote>_ccxt.csv`.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationRow {
    pub exchange: ExchangeId,
    pub start_currency: String,
    pub start_balance: Decimal,
    pub end_currency: String,
    pub end_balance: Decimal,
    pub roi_pct: Decimal,
    pub iterations: u64,
}

/// Destination for the four persisted report artifacts of spec §6. Grounded on
/// `original_source`'s append-only CSV writer pattern: every call appends exactly one row, never
/// rewrites the file.
pub trait ReportSink: Send + Sync {
    fn emit_bf_row(&self, row: &BfRow) -> Result<(), ReportError>;
    fn emit_tri_row(&self, row: &TriRow) -> Result<(), ReportError>;
    fn emit_persistence_row(&self, row: &PersistenceRow) -> Result<(), ReportError>;
    fn emit_simulation_row(&self, row: &SimulationRow) -> Result<(), ReportError>;
}

/// Discards every row; the default for `mode: balance` / `mode: health` runs that never produce
/// report-worthy output.
#[derive(Debug, Default)]
pub struct NullReportSink;

impl ReportSink for NullReportSink {
    fn emit_bf_row(&self, _row: &BfRow) -> Result<(), ReportError> {
        Ok(())
    }
    fn emit_tri_row(&self, _row: &TriRow) -> Result<(), ReportError> {
        Ok(())
    }
    fn emit_persistence_row(&self, _row: &PersistenceRow) -> Result<(), ReportError> {
        Ok(())
    }
    fn emit_simulation_row(&self, _row: &SimulationRow) -> Result<(), ReportError> {
        Ok(())
    }
}

/// Appends rows to the four bit-exact-schema CSV files of spec §6, one writer per file guarded
/// by its own [`Mutex`] since iterations across venues can emit concurrently.
pub struct CsvReportSink {
    bf: Mutex<csv::Writer<std::fs::File>>,
    tri: Mutex<csv::Writer<std::fs::File>>,
    persistence: Mutex<csv::Writer<std::fs::File>>,
    simulation: Mutex<csv::Writer<std::fs::File>>,
}

impl CsvReportSink {
    /// Open (creating if needed) the four report files for `quote` under `dir`, matching the
    /// `arbitrage_{bf,tri}_<quote>_ccxt.csv` / `arbitrage_bf_<quote>_persistence.csv` /
    /// `arbitrage_bf_simulation_summary_<quote>_ccxt.csv` naming from spec §6.
    pub fn open(dir: &Path, quote: &str) -> Result<Self, ReportError> {
        let writer = |name: String| -> Result<csv::Writer<std::fs::File>, ReportError> {
            let exists = dir.join(&name).exists();
            let file = std::fs::OpenOptions::new().create(true).append(true).open(dir.join(&name))?;
            Ok(csv::WriterBuilder::new().has_headers(!exists).from_writer(file))
        };

        Ok(Self {
            bf: Mutex::new(writer(format!("arbitrage_bf_{quote}_ccxt.csv"))?),
            tri: Mutex::new(writer(format!("arbitrage_tri_{quote}_ccxt.csv"))?),
            persistence: Mutex::new(writer(format!("arbitrage_bf_{quote}_persistence.csv"))?),
            simulation: Mutex::new(writer(format!("arbitrage_bf_simulation_summary_{quote}_ccxt.csv"))?),
        })
    }
}

impl ReportSink for CsvReportSink {
    fn emit_bf_row(&self, row: &BfRow) -> Result<(), ReportError> {
        let mut writer = self.bf.lock();
        writer.serialize(row)?;
        writer.flush()?;
        Ok(())
    }

    fn emit_tri_row(&self, row: &TriRow) -> Result<(), ReportError> {
        let mut writer = self.tri.lock();
        writer.serialize(row)?;
        writer.flush()?;
        Ok(())
    }

    fn emit_persistence_row(&self, row: &PersistenceRow) -> Result<(), ReportError> {
        let mut writer = self.persistence.lock();
        writer.serialize(row)?;
        writer.flush()?;
        Ok(())
    }

    fn emit_simulation_row(&self, row: &SimulationRow) -> Result<(), ReportError> {
        let mut writer = self.simulation.lock();
        writer.serialize(row)?;
        writer.flush()?;
        Ok(())
    }
}

/// Render a cycle's currency path the way every report column expects it: `USDT->BTC->ETH`.
pub fn format_path<I, S>(currencies: I) -> String
where
    I: IntoIterator<Item = S>,
    S: std::fmt::Display,
{
    currencies.into_iter().map(|c| c.to_string()).collect::<Vec<_>>().join("->")
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbit_instrument::Currency;
    use rust_decimal_macros::dec;

    #[test]
    fn formats_a_cycle_path_with_arrows() {
        let path = vec![Currency::new("USDT"), Currency::new("BTC"), Currency::new("ETH")];
        assert_eq!(format_path(path), "USDT->BTC->ETH");
    }

    #[test]
    fn null_sink_accepts_every_row_kind() {
        let sink = NullReportSink;
        let row = BfRow {
            exchange: ExchangeId::Mock,
            path: "USDT->BTC->USDT".to_string(),
            net_pct: dec!(1.5),
            inv: dec!(100),
            est_after: dec!(101.5),
            hops: 2,
            iteration: 1,
            ts: Utc::now(),
            net_pct_raw: None,
            slippage_bps: None,
            fee_bps_total: None,
            used_ws: None,
        };
        assert!(sink.emit_bf_row(&row).is_ok());
    }

    #[test]
    fn csv_sink_appends_rows_without_rewriting_existing_headers() {
        let dir = std::env::temp_dir().join(format!("arbit-engine-report-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let sink = CsvReportSink::open(&dir, "USDT").unwrap();

        let row = TriRow {
            exchange: ExchangeId::Mock,
            path: "USDT->BTC->ETH".to_string(),
            r1: dec!(1),
            r2: dec!(1),
            r3: dec!(1),
            net_pct: dec!(0.5),
            inv: dec!(100),
            est_after: dec!(100.5),
            iteration: 1,
            ts: Utc::now(),
        };
        sink.emit_tri_row(&row).unwrap();
        sink.emit_tri_row(&row).unwrap();

        let contents = std::fs::read_to_string(dir.join("arbitrage_tri_USDT_ccxt.csv")).unwrap();
        assert_eq!(contents.lines().count(), 3, "one header line plus two data rows");

        std::fs::remove_dir_all(&dir).ok();
    }
}
