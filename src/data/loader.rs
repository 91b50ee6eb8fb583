//! CSV panel loader
//!
//! Reads the `date,open,high,low,close,volume,Name` layout used by the
//! daily S&P panel export. Rows are grouped by symbol and sorted by date;
//! duplicate (symbol, date) pairs are rejected. Missing open/high/low
//! fields parse to NaN and are left for [`StockPanel::impute_missing`].

use crate::data::types::{DailyBar, InstrumentSeries, StockPanel};
use crate::error::PipelineError;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

/// Parse a price field; empty or malformed fields become NaN
fn parse_price(field: &str) -> f64 {
    field.trim().parse().unwrap_or(f64::NAN)
}

/// Load a stock panel from a CSV file
pub fn load_panel<P: AsRef<Path>>(path: P) -> Result<StockPanel, PipelineError> {
    let file = File::open(path.as_ref())?;
    let reader = BufReader::new(file);

    let mut by_symbol: BTreeMap<String, Vec<DailyBar>> = BTreeMap::new();
    let mut first_line = true;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if first_line {
            first_line = false;
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split(',').collect();
        if parts.len() < 7 {
            return Err(PipelineError::InvalidData(format!(
                "line {}: expected 7 fields, got {}",
                line_no + 1,
                parts.len()
            )));
        }

        let date = NaiveDate::parse_from_str(parts[0].trim(), "%Y-%m-%d").map_err(|e| {
            PipelineError::InvalidData(format!("line {}: bad date '{}': {}", line_no + 1, parts[0], e))
        })?;
        let close: f64 = parts[4].trim().parse().map_err(|_| {
            PipelineError::InvalidData(format!("line {}: bad close '{}'", line_no + 1, parts[4]))
        })?;
        let symbol = parts[6].trim();
        if symbol.is_empty() {
            return Err(PipelineError::InvalidData(format!(
                "line {}: empty instrument name",
                line_no + 1
            )));
        }

        let bar = DailyBar::new(
            date,
            parse_price(parts[1]),
            parse_price(parts[2]),
            parse_price(parts[3]),
            close,
            parts[5].trim().parse().unwrap_or(0.0),
        );

        by_symbol.entry(symbol.to_string()).or_default().push(bar);
    }

    let mut series = Vec::with_capacity(by_symbol.len());
    for (symbol, mut bars) in by_symbol {
        bars.sort_by_key(|b| b.date);
        for pair in bars.windows(2) {
            if pair[0].date == pair[1].date {
                return Err(PipelineError::InvalidData(format!(
                    "{}: duplicate date {}",
                    symbol, pair[0].date
                )));
            }
        }
        series.push(InstrumentSeries::new(symbol, bars)?);
    }

    let panel = StockPanel::from_series(series)?;
    info!(
        "loaded {} instruments, {} bars total",
        panel.len(),
        panel.total_bars()
    );
    Ok(panel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp_csv(name: &str, contents: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("panel_{}_{}.csv", name, std::process::id()));
        let mut f = File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_panel_sorts_and_groups() {
        let csv = "date,open,high,low,close,volume,Name\n\
                   2020-01-03,10.0,11.0,9.0,10.5,1000,AAPL\n\
                   2020-01-02,10.0,11.0,9.0,10.2,1000,AAPL\n\
                   2020-01-02,20.0,21.0,19.0,20.5,2000,MSFT\n";
        let path = write_temp_csv("sorts", csv);
        let panel = load_panel(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(panel.len(), 2);
        let aapl = panel.get("AAPL").unwrap();
        assert_eq!(aapl.len(), 2);
        assert!(aapl.bars[0].date < aapl.bars[1].date);
    }

    #[test]
    fn test_missing_open_becomes_nan() {
        let csv = "date,open,high,low,close,volume,Name\n\
                   2020-01-02,,11.0,9.0,10.2,1000,AAPL\n";
        let path = write_temp_csv("missing_open", csv);
        let panel = load_panel(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(panel.get("AAPL").unwrap().bars[0].open.is_nan());
    }

    #[test]
    fn test_duplicate_date_rejected() {
        let csv = "date,open,high,low,close,volume,Name\n\
                   2020-01-02,10.0,11.0,9.0,10.2,1000,AAPL\n\
                   2020-01-02,10.0,11.0,9.0,10.3,1000,AAPL\n";
        let path = write_temp_csv("dup_date", csv);
        let result = load_panel(&path);
        std::fs::remove_file(&path).ok();

        assert!(result.is_err());
    }
}
