//! Column layouts of the disclosure table
//!
//! The exchange has published the table in several shapes. Headerless tables
//! are told apart by column count; tables with headers go through a fixed
//! header dictionary.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::models::Field;

use super::table::{ColumnId, RawTable};

/// Current 16-column layout, including derivative trading columns
pub const FULL_FIELDS: [Field; 16] = [
    Field::ScripCode,
    Field::CompanyName,
    Field::PersonName,
    Field::PersonCategory,
    Field::BeforeShares,
    Field::SecurityType,
    Field::AcquiredShares,
    Field::SecuritiesValue,
    Field::AcquisitionDisposal,
    Field::AfterShares,
    Field::AcquisitionPeriodFrom,
    Field::AcquisitionPeriodTo,
    Field::AcquisitionMode,
    Field::TradingDerivativeType,
    Field::TradingDerivativeValue,
    Field::IntimationDate,
];

/// Older 12-column layout
pub const LEGACY_FIELDS: [Field; 12] = [
    Field::ScripCode,
    Field::CompanyName,
    Field::PersonName,
    Field::PersonCategory,
    Field::SecurityType,
    Field::AcquisitionDisposal,
    Field::BeforeShares,
    Field::AcquiredShares,
    Field::AfterShares,
    Field::AcquisitionDate,
    Field::IntimationDate,
    Field::AcquisitionMode,
];

/// Header text to field, for tables published with named columns
pub const HEADER_FIELDS: [(&str, Field); 13] = [
    ("Scrip Code", Field::ScripCode),
    ("Company Name", Field::CompanyName),
    ("Name of the Acquirer/Seller", Field::PersonName),
    ("Category of Person", Field::PersonCategory),
    ("Type of security (prior)", Field::SecurityTypePrior),
    ("Type of security (Acquired)", Field::SecurityType),
    ("No. of securities held prior", Field::BeforeShares),
    ("Acquisition/ Disposal", Field::AcquisitionDisposal),
    ("No. of Securities acquired / Disposed", Field::AcquiredShares),
    ("Post Acqusition/ Disposal", Field::AfterShares),
    (
        "Date of allotment advice/ acquisition of shares/ sale of shares specify",
        Field::AcquisitionDate,
    ),
    ("Date of Intimation to company", Field::IntimationDate),
    ("Mode of acquisition / disposal", Field::AcquisitionMode),
];

static HEADER_LOOKUP: Lazy<HashMap<String, Field>> = Lazy::new(|| {
    HEADER_FIELDS
        .iter()
        .map(|(header, field)| (header_key(header), *field))
        .collect()
});

/// Which shape a raw table was published in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// 16 positional columns
    Full,
    /// 12 positional columns
    Legacy,
    /// Positional columns of any other count
    Generic(usize),
    /// Named columns resolved through [`HEADER_FIELDS`]
    Named,
}

impl Layout {
    /// Choose the layout for a table's column identifiers
    pub fn detect(columns: &[ColumnId]) -> Self {
        let positional = columns.iter().all(|c| matches!(c, ColumnId::Index(_)));
        if !positional {
            return Self::Named;
        }
        match columns.len() {
            16 => Self::Full,
            12 => Self::Legacy,
            n => Self::Generic(n),
        }
    }

    /// Field for each raw column, `None` for columns that are dropped
    pub fn map_columns(&self, columns: &[ColumnId]) -> Vec<Option<Field>> {
        match self {
            Self::Full => FULL_FIELDS.iter().copied().map(Some).collect(),
            Self::Legacy => LEGACY_FIELDS.iter().copied().map(Some).collect(),
            Self::Generic(n) => (0..*n).map(|i| Some(Field::Column(i))).collect(),
            Self::Named => {
                let mut seen = Vec::new();
                columns
                    .iter()
                    .map(|column| {
                        let ColumnId::Named(name) = column else {
                            return None;
                        };
                        let field = lookup_header(name)?;
                        if seen.contains(&field) {
                            return None;
                        }
                        seen.push(field);
                        Some(field)
                    })
                    .collect()
            }
        }
    }
}

/// Resolved schema of one raw table
#[derive(Debug, Clone)]
pub struct Schema {
    layout: Layout,
    columns: Vec<Option<Field>>,
    fields: Arc<[Field]>,
}

impl Schema {
    /// Detect the layout of `table` and map its columns
    pub fn detect(table: &RawTable) -> Self {
        let layout = Layout::detect(&table.columns);
        let columns = layout.map_columns(&table.columns);
        let fields: Arc<[Field]> = columns.iter().flatten().copied().collect();
        Self {
            layout,
            columns,
            fields,
        }
    }

    /// Detected layout
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Field of raw column `index`
    pub fn column_field(&self, index: usize) -> Option<Field> {
        self.columns.get(index).copied().flatten()
    }

    /// Ordered declared fields
    pub fn fields(&self) -> &Arc<[Field]> {
        &self.fields
    }

    /// Whether the schema carries `field`
    pub fn declares(&self, field: Field) -> bool {
        self.fields.contains(&field)
    }
}

/// Dictionary lookup, ignoring case and whitespace runs
pub fn lookup_header(name: &str) -> Option<Field> {
    HEADER_LOOKUP.get(&header_key(name)).copied()
}

fn header_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn positional(n: usize) -> Vec<ColumnId> {
        (0..n).map(ColumnId::Index).collect()
    }

    #[test]
    fn test_detect_by_column_count() {
        assert_eq!(Layout::detect(&positional(16)), Layout::Full);
        assert_eq!(Layout::detect(&positional(12)), Layout::Legacy);
        assert_eq!(Layout::detect(&positional(9)), Layout::Generic(9));
    }

    #[test]
    fn test_named_columns_select_dictionary() {
        let columns = vec![
            ColumnId::Named("Scrip Code".to_string()),
            ColumnId::Named("Something Else".to_string()),
            ColumnId::Named("company   name".to_string()),
        ];
        assert_eq!(Layout::detect(&columns), Layout::Named);
        assert_eq!(
            Layout::Named.map_columns(&columns),
            vec![Some(Field::ScripCode), None, Some(Field::CompanyName)]
        );
    }

    #[test]
    fn test_duplicate_headers_keep_first() {
        let columns = vec![
            ColumnId::Named("Company Name".to_string()),
            ColumnId::Named("Company Name".to_string()),
        ];
        assert_eq!(
            Layout::Named.map_columns(&columns),
            vec![Some(Field::CompanyName), None]
        );
    }

    #[test]
    fn test_generic_fields_are_placeholders() {
        let table = RawTable::positional(vec![vec![None; 3]]);
        let schema = Schema::detect(&table);
        assert_eq!(schema.layout(), Layout::Generic(3));
        let names: Vec<_> = schema.fields().iter().map(|f| f.name().into_owned()).collect();
        assert_eq!(names, vec!["column_0", "column_1", "column_2"]);
    }

    #[test]
    fn test_every_header_resolves() {
        for (header, field) in HEADER_FIELDS {
            assert_eq!(lookup_header(header), Some(field), "{header}");
        }
    }
}
