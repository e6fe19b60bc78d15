//! Raw table to canonical records

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::{Field, FieldKind, TradeRecord, TransactionType, SOURCE_BSE};

use super::schema::{Layout, Schema};
use super::table::RawTable;

/// Company-name cells that are really repeated header labels
static HEADER_ROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)COMPANY NAME|NAME OF").expect("valid header-row pattern"));

/// Date formats tried in order; day-first as the exchange publishes them
const DATE_FORMATS: &[&str] = &[
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%Y-%m-%d",
    "%d.%m.%Y",
    "%d %b %Y",
    "%d-%b-%Y",
    "%d %B %Y",
    "%d-%B-%Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %I:%M:%S %p",
    "%d/%m/%Y %I:%M %p",
    "%d %b %Y %H:%M",
    "%d %b %Y %I:%M %p",
];

/// Text that stands for a missing value
const PLACEHOLDERS: &[&str] = &["nan", "none", "null", "nat"];

/// Turns raw disclosure tables into [`TradeRecord`]s for one fetch batch
#[derive(Debug, Clone)]
pub struct Normalizer {
    fetch_date: NaiveDate,
    source: String,
}

impl Normalizer {
    /// Normalizer stamping records with `fetch_date` and the BSE source tag
    pub fn new(fetch_date: NaiveDate) -> Self {
        Self {
            fetch_date,
            source: SOURCE_BSE.to_string(),
        }
    }

    /// Map every data row of `table` to a canonical record.
    ///
    /// Fails only when the table has no columns. Rows with unparseable
    /// numbers or dates are kept with those fields unset; repeated header
    /// rows and rows without a company name are dropped when the layout has
    /// a company name column.
    pub fn normalize(&self, table: &RawTable) -> Result<Vec<TradeRecord>> {
        if table.width() == 0 {
            return Err(Error::schema("raw table has no columns"));
        }

        let schema = Schema::detect(table);
        info!(
            layout = ?schema.layout(),
            columns = table.width(),
            rows = table.height(),
            "Detected disclosure table layout"
        );
        if let Layout::Generic(n) = schema.layout() {
            debug!(columns = n, "Unrecognized column count, using placeholder names");
        }

        let filter_headers = schema.declares(Field::CompanyName);
        let mut dropped = 0usize;

        let records: Vec<TradeRecord> = table
            .rows
            .iter()
            .map(|row| self.normalize_row(&schema, row))
            .filter(|record| {
                let keep = !filter_headers || !is_header_row(&record.company_name);
                if !keep {
                    dropped += 1;
                }
                keep
            })
            .collect();

        info!(
            records = records.len(),
            dropped_header_rows = dropped,
            "Normalized disclosure rows"
        );
        Ok(records)
    }

    fn normalize_row(&self, schema: &Schema, row: &[Option<String>]) -> TradeRecord {
        let mut record = TradeRecord::new(schema.fields().clone(), self.fetch_date, &self.source);

        for (index, cell) in row.iter().enumerate() {
            if let Some(field) = schema.column_field(index) {
                assign(&mut record, field, cell.as_deref());
            }
        }

        // No reliable price is published, so a value is never inferred.
        record.securities_value = None;
        record
    }
}

fn assign(record: &mut TradeRecord, field: Field, raw: Option<&str>) {
    match field.kind() {
        FieldKind::Number => {
            let value = raw.and_then(parse_number);
            match field {
                Field::BeforeShares => record.before_shares = value,
                Field::AcquiredShares => record.acquired_shares = value,
                Field::AfterShares => record.after_shares = value,
                Field::SecuritiesValue => record.securities_value = value,
                Field::TradingDerivativeValue => record.trading_derivative_value = value,
                _ => {}
            }
        }
        FieldKind::Date => {
            let value = raw.and_then(parse_date);
            match field {
                Field::AcquisitionDate => record.acquisition_date = value,
                Field::IntimationDate => record.intimation_date = value,
                Field::AcquisitionPeriodFrom => record.acquisition_period_from = value,
                Field::AcquisitionPeriodTo => record.acquisition_period_to = value,
                _ => {}
            }
        }
        FieldKind::Transaction => {
            record.acquisition_disposal = TransactionType::canonicalize(&clean_text(raw));
        }
        FieldKind::Text => {
            let value = clean_text(raw);
            match field {
                Field::ScripCode => record.scrip_code = value,
                Field::CompanyName => record.company_name = value,
                Field::PersonName => record.person_name = value,
                Field::PersonCategory => record.person_category = value,
                Field::SecurityType => record.security_type = value,
                Field::SecurityTypePrior => record.security_type_prior = value,
                Field::AcquisitionMode => record.acquisition_mode = value,
                Field::TradingDerivativeType => record.trading_derivative_type = value,
                Field::Column(i) => {
                    record.columns.insert(i, value);
                }
                _ => {}
            }
        }
    }
}

/// Whether a company-name cell is empty or a repeated header label
pub fn is_header_row(company_name: &str) -> bool {
    company_name.is_empty() || HEADER_ROW.is_match(company_name)
}

/// Parse a published number, stripping thousands separators and whitespace.
///
/// Returns `None` for anything that is not a finite number; never zero.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a published date; date-times keep their date part.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(&text, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Trim, collapse whitespace, and blank out placeholder text
pub fn clean_text(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if PLACEHOLDERS.iter().any(|p| text.eq_ignore_ascii_case(p)) {
        return String::new();
    }
    text
}
