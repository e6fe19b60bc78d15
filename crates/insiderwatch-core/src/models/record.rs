//! Canonical insider trading record

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::{Map, Number, Value};
use sha2::{Digest, Sha256};

/// Source tag stamped on every record.
pub const SOURCE_BSE: &str = "BSE";

/// Direction of a disclosed transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum TransactionType {
    /// Holdings increased
    Acquisition,
    /// Holdings decreased
    Disposal,
    /// Anything else the source published, upper-cased
    Unknown(String),
    /// Column absent or empty
    #[default]
    Unset,
}

impl TransactionType {
    /// Map a raw indicator onto the canonical values.
    ///
    /// Known synonyms collapse onto `Acquisition`/`Disposal`; everything else
    /// passes through upper-cased.
    pub fn canonicalize(raw: &str) -> Self {
        let upper = raw.trim().to_uppercase();
        match upper.as_str() {
            "" => Self::Unset,
            "ACQUISITION" | "BUY" | "PURCHASE" => Self::Acquisition,
            "DISPOSAL" | "SELL" => Self::Disposal,
            _ => Self::Unknown(upper),
        }
    }

    /// Text stored and displayed for this value
    pub fn as_str(&self) -> &str {
        match self {
            Self::Acquisition => "ACQUISITION",
            Self::Disposal => "DISPOSAL",
            Self::Unknown(raw) => raw,
            Self::Unset => "",
        }
    }

    /// Whether this is a canonical acquisition
    pub fn is_acquisition(&self) -> bool {
        matches!(self, Self::Acquisition)
    }

    /// Whether this is a canonical disposal
    pub fn is_disposal(&self) -> bool {
        matches!(self, Self::Disposal)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a field's raw text is coerced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Date,
    Transaction,
}

/// Canonical field names a raw column can map onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    ScripCode,
    CompanyName,
    PersonName,
    PersonCategory,
    SecurityTypePrior,
    SecurityType,
    BeforeShares,
    AcquiredShares,
    SecuritiesValue,
    AcquisitionDisposal,
    AfterShares,
    AcquisitionPeriodFrom,
    AcquisitionPeriodTo,
    AcquisitionMode,
    TradingDerivativeType,
    TradingDerivativeValue,
    AcquisitionDate,
    IntimationDate,
    /// Placeholder for a column of an unrecognized layout
    Column(usize),
}

impl Field {
    /// Column name used in stored rows
    pub fn name(&self) -> Cow<'static, str> {
        let name = match self {
            Self::ScripCode => "scrip_code",
            Self::CompanyName => "company_name",
            Self::PersonName => "person_name",
            Self::PersonCategory => "person_category",
            Self::SecurityTypePrior => "security_type_prior",
            Self::SecurityType => "security_type",
            Self::BeforeShares => "before_shares",
            Self::AcquiredShares => "acquired_shares",
            Self::SecuritiesValue => "securities_value",
            Self::AcquisitionDisposal => "acquisition_disposal",
            Self::AfterShares => "after_shares",
            Self::AcquisitionPeriodFrom => "acquisition_period_from",
            Self::AcquisitionPeriodTo => "acquisition_period_to",
            Self::AcquisitionMode => "acquisition_mode",
            Self::TradingDerivativeType => "trading_derivative_type",
            Self::TradingDerivativeValue => "trading_derivative_value",
            Self::AcquisitionDate => "acquisition_date",
            Self::IntimationDate => "intimation_date",
            Self::Column(i) => return Cow::Owned(format!("column_{i}")),
        };
        Cow::Borrowed(name)
    }

    /// Coercion applied to this field
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::BeforeShares
            | Self::AcquiredShares
            | Self::SecuritiesValue
            | Self::AfterShares
            | Self::TradingDerivativeValue => FieldKind::Number,
            Self::AcquisitionPeriodFrom
            | Self::AcquisitionPeriodTo
            | Self::AcquisitionDate
            | Self::IntimationDate => FieldKind::Date,
            Self::AcquisitionDisposal => FieldKind::Transaction,
            _ => FieldKind::Text,
        }
    }
}

/// One disclosed transaction after normalization.
///
/// `fields` is the ordered field list of the layout the row was read with;
/// [`TradeRecord::to_row`] only emits those plus metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    /// Exchange security code
    pub scrip_code: String,
    /// Issuer name
    pub company_name: String,
    /// Reporting insider
    pub person_name: String,
    /// Promoter, director, employee and so on
    pub person_category: String,
    /// Security type after the transaction
    pub security_type: String,
    /// Security type held before the transaction
    pub security_type_prior: String,
    /// Holding before the transaction
    pub before_shares: Option<f64>,
    /// Signed size of the transaction
    pub acquired_shares: Option<f64>,
    /// Holding after the transaction
    pub after_shares: Option<f64>,
    /// Rarely published; never inferred
    pub securities_value: Option<f64>,
    /// Acquisition, disposal or whatever the source printed
    pub acquisition_disposal: TransactionType,
    /// Market purchase, off market, pledge and so on
    pub acquisition_mode: String,
    /// Trade date
    pub acquisition_date: Option<NaiveDate>,
    /// Date the exchange was informed
    pub intimation_date: Option<NaiveDate>,
    /// Start of the acquisition period
    pub acquisition_period_from: Option<NaiveDate>,
    /// End of the acquisition period
    pub acquisition_period_to: Option<NaiveDate>,
    /// Derivative contract type, if any
    pub trading_derivative_type: String,
    /// Derivative notional, if any
    pub trading_derivative_value: Option<f64>,
    /// Values of placeholder columns, keyed by position
    pub columns: BTreeMap<usize, String>,
    /// Date of the fetch this record came from
    pub fetch_date: NaiveDate,
    /// Source label, e.g. `BSE`
    pub source: String,
    /// Layout the row was read with
    pub fields: Arc<[Field]>,
}

impl TradeRecord {
    /// An empty record for the given layout and batch
    pub fn new(fields: Arc<[Field]>, fetch_date: NaiveDate, source: impl Into<String>) -> Self {
        Self {
            scrip_code: String::new(),
            company_name: String::new(),
            person_name: String::new(),
            person_category: String::new(),
            security_type: String::new(),
            security_type_prior: String::new(),
            before_shares: None,
            acquired_shares: None,
            after_shares: None,
            securities_value: None,
            acquisition_disposal: TransactionType::Unset,
            acquisition_mode: String::new(),
            acquisition_date: None,
            intimation_date: None,
            acquisition_period_from: None,
            acquisition_period_to: None,
            trading_derivative_type: String::new(),
            trading_derivative_value: None,
            columns: BTreeMap::new(),
            fetch_date,
            source: source.into(),
            fields,
        }
    }

    /// Security identifier used for alert dedup
    pub fn symbol(&self) -> &str {
        &self.scrip_code
    }

    /// Whether the layout this record came from declares `field`
    pub fn declares(&self, field: Field) -> bool {
        self.fields.contains(&field)
    }

    /// Value of a single field as a flat scalar
    pub fn value(&self, field: Field) -> Value {
        match field {
            Field::ScripCode => text(&self.scrip_code),
            Field::CompanyName => text(&self.company_name),
            Field::PersonName => text(&self.person_name),
            Field::PersonCategory => text(&self.person_category),
            Field::SecurityTypePrior => text(&self.security_type_prior),
            Field::SecurityType => text(&self.security_type),
            Field::BeforeShares => number(self.before_shares),
            Field::AcquiredShares => number(self.acquired_shares),
            Field::SecuritiesValue => number(self.securities_value),
            Field::AcquisitionDisposal => text(self.acquisition_disposal.as_str()),
            Field::AfterShares => number(self.after_shares),
            Field::AcquisitionPeriodFrom => date(self.acquisition_period_from),
            Field::AcquisitionPeriodTo => date(self.acquisition_period_to),
            Field::AcquisitionMode => text(&self.acquisition_mode),
            Field::TradingDerivativeType => text(&self.trading_derivative_type),
            Field::TradingDerivativeValue => number(self.trading_derivative_value),
            Field::AcquisitionDate => date(self.acquisition_date),
            Field::IntimationDate => date(self.intimation_date),
            Field::Column(i) => self.columns.get(&i).map_or(Value::Null, |v| text(v)),
        }
    }

    /// Flat field-name to scalar mapping of this record.
    ///
    /// Contains exactly the declared layout fields, then `symbol` (when the
    /// layout has a scrip code), `fetch_date` and `source`.
    pub fn to_row(&self) -> Map<String, Value> {
        let mut row = Map::new();
        for field in self.fields.iter() {
            row.insert(field.name().into_owned(), self.value(*field));
        }
        if self.declares(Field::ScripCode) {
            row.insert("symbol".to_string(), text(self.symbol()));
        }
        row.insert("fetch_date".to_string(), date(Some(self.fetch_date)));
        row.insert("source".to_string(), text(&self.source));
        row
    }

    /// Stable hash identifying this disclosure within its fetch batch.
    ///
    /// Covers every scalar of [`TradeRecord::to_row`], so rows differing in
    /// any declared field get distinct ids.
    pub fn record_id(&self) -> String {
        let mut hasher = Sha256::new();
        for (name, value) in self.to_row() {
            hasher.update(name.as_bytes());
            hasher.update([0x1f]);
            hasher.update(value.to_string().as_bytes());
            hasher.update([0x1e]);
        }
        hex::encode(hasher.finalize())
    }
}

fn text(value: &str) -> Value {
    Value::String(value.to_string())
}

fn number(value: Option<f64>) -> Value {
    match value {
        Some(v) if v.fract() == 0.0 && v.abs() < 9.0e15 => Value::Number(Number::from(v as i64)),
        Some(v) => Number::from_f64(v).map_or(Value::Null, Value::Number),
        None => Value::Null,
    }
}

fn date(value: Option<NaiveDate>) -> Value {
    value.map_or(Value::Null, |d| Value::String(d.format("%Y-%m-%d").to_string()))
}
