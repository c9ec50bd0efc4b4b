use analysis_core::StockRecord;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

use crate::error::DataError;

const COL_DATE: &str = "SEANCE";
const COL_GROUP: &str = "GROUPE";
const COL_CODE: &str = "CODE";
const COL_NAME: &str = "VALEUR";
const COL_OPEN: &str = "OUVERTURE";
const COL_CLOSE: &str = "CLOTURE";
const COL_LOW: &str = "PLUS_BAS";
const COL_HIGH: &str = "PLUS_HAUT";
const COL_VOLUME: &str = "QUANTITE_NEGOCIEE";
const COL_TRANSACTIONS: &str = "NB_TRANSACTION";
const COL_CAPITAL: &str = "CAPITAUX";

/// Parse a session date. Exchange files use `dd/mm/YYYY`; ISO dates are accepted too.
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}

/// Parse a number that may use a decimal comma and grouping spaces.
pub(crate) fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return None;
    }
    let normalized = if cleaned.contains(',') && !cleaned.contains('.') {
        cleaned.replace(',', ".")
    } else {
        cleaned.replace(',', "")
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn column<'r>(headers: &HashMap<String, usize>, record: &'r csv::StringRecord, name: &str) -> &'r str {
    headers
        .get(name)
        .and_then(|&i| record.get(i))
        .unwrap_or("")
}

/// Parse semicolon-delimited BVMT rows from any reader.
///
/// Rows without a date, code or close are dropped. Other numeric fields that
/// fail to parse become 0. The result is sorted by code then date, and a
/// duplicated (code, date) pair keeps its last occurrence.
pub fn parse_reader<R: Read>(reader: R) -> Result<Vec<StockRecord>, DataError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: HashMap<String, usize> = csv_reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_uppercase(), i))
        .collect();

    for required in [COL_DATE, COL_CODE, COL_CLOSE] {
        if !headers.contains_key(required) {
            return Err(DataError::MissingColumn(required.to_string()));
        }
    }

    let mut rows: BTreeMap<(String, NaiveDate), StockRecord> = BTreeMap::new();
    let mut dropped = 0usize;

    for result in csv_reader.records() {
        let record = result?;
        let field = |name: &str| column(&headers, &record, name).to_string();
        let number = |name: &str| parse_number(column(&headers, &record, name)).unwrap_or(0.0);

        let date = parse_date(&field(COL_DATE));
        let code = field(COL_CODE);
        let close = parse_number(&field(COL_CLOSE));

        let (date, close) = match (date, close) {
            (Some(d), Some(c)) if !code.is_empty() => (d, c),
            _ => {
                dropped += 1;
                continue;
            }
        };

        let group = Some(field(COL_GROUP)).filter(|g| !g.is_empty());
        let row = StockRecord {
            date,
            stock_name: field(COL_NAME),
            group,
            open: number(COL_OPEN),
            close,
            high: number(COL_HIGH),
            low: number(COL_LOW),
            volume: number(COL_VOLUME),
            num_transactions: number(COL_TRANSACTIONS).max(0.0) as u64,
            capital: number(COL_CAPITAL),
            stock_code: code.clone(),
        };
        rows.insert((code, date), row);
    }

    if dropped > 0 {
        tracing::debug!("Dropped {} rows missing date, code or close", dropped);
    }

    Ok(rows.into_values().collect())
}

/// Load a single CSV file.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<StockRecord>, DataError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(DataError::NotFound(path.display().to_string()));
    }
    let file = std::fs::File::open(path)?;
    let records = parse_reader(file)?;
    tracing::info!("Loaded {} rows from {}", records.len(), path.display());
    Ok(records)
}

/// Load every `.csv` / `.txt` file of a directory, merged and re-sorted.
pub fn load_dir(dir: impl AsRef<Path>) -> Result<Vec<StockRecord>, DataError> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(DataError::NotFound(dir.display().to_string()));
    }

    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("csv") || e.eq_ignore_ascii_case("txt"))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    let mut merged: BTreeMap<(String, NaiveDate), StockRecord> = BTreeMap::new();
    for path in paths {
        match load_csv(&path) {
            Ok(records) => {
                for r in records {
                    merged.insert((r.stock_code.clone(), r.date), r);
                }
            }
            Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
        }
    }

    Ok(merged.into_values().collect())
}

/// Load a file or a directory of files.
pub fn load_path(path: impl AsRef<Path>) -> Result<Vec<StockRecord>, DataError> {
    let path = path.as_ref();
    if path.is_dir() {
        load_dir(path)
    } else {
        load_csv(path)
    }
}
