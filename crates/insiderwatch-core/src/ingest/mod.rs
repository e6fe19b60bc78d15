//! Ingestion: fetch the disclosure page and normalize its table
//!
//! The fetcher downloads the listing and picks the most plausible data table;
//! the normalizer reconciles whichever column layout was published into
//! canonical [`TradeRecord`](crate::models::TradeRecord)s.

mod fetcher;
mod normalizer;
mod schema;
mod table;

pub use fetcher::{DisclosureFetcher, DisclosureSource};
pub use normalizer::{clean_text, is_header_row, parse_date, parse_number, Normalizer};
pub use schema::{lookup_header, Layout, Schema, FULL_FIELDS, HEADER_FIELDS, LEGACY_FIELDS};
pub use table::{parse_tables, select_data_table, ColumnId, RawTable};
