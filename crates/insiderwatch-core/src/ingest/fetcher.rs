//! Disclosure page download

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::FetchConfig;
use crate::error::Result;

use super::table::{parse_tables, select_data_table, RawTable};

/// Anything that can produce today's raw disclosure table
#[async_trait]
pub trait DisclosureSource: Send + Sync {
    /// Fetch the current disclosure table.
    ///
    /// `Ok(None)` means the source answered but had no usable table.
    async fn fetch(&self) -> Result<Option<RawTable>>;
}

/// Fetches the BSE insider trading listing over HTTP
pub struct DisclosureFetcher {
    client: Client,
    url: String,
    min_columns: usize,
}

impl DisclosureFetcher {
    /// Create a fetcher with browser-like headers and a fixed timeout
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()?;

        info!(url = %config.url, "Disclosure fetcher initialized");

        Ok(Self {
            client,
            url: config.url.clone(),
            min_columns: config.min_columns,
        })
    }
}

#[async_trait]
impl DisclosureSource for DisclosureFetcher {
    async fn fetch(&self) -> Result<Option<RawTable>> {
        info!(url = %self.url, "Fetching insider trading disclosures");

        let body = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let tables = parse_tables(&body);
        if tables.is_empty() {
            warn!("No tables found in disclosure page");
            return Ok(None);
        }

        for (index, table) in tables.iter().enumerate() {
            debug!(
                index,
                rows = table.height(),
                columns = table.width(),
                cells = table.cell_count(),
                "Candidate table"
            );
        }

        let count = tables.len();
        match select_data_table(tables, self.min_columns) {
            Some(table) => {
                info!(
                    rows = table.height(),
                    columns = table.width(),
                    "Selected disclosure table"
                );
                Ok(Some(table))
            }
            None => {
                warn!(
                    tables = count,
                    min_columns = self.min_columns,
                    "No table wide enough to hold disclosures"
                );
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::time::Duration;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> FetchConfig {
        FetchConfig {
            url: format!("{}/corporates/Insider_Trading_new.aspx", server.uri()),
            timeout: Duration::from_secs(5),
            ..FetchConfig::default()
        }
    }

    fn page(columns: usize, rows: usize) -> String {
        let mut html = String::from("<html><body><table><tr><td>nav</td></tr></table><table>");
        for r in 0..rows {
            html.push_str("<tr>");
            for c in 0..columns {
                html.push_str(&format!("<td>{r}-{c}</td>"));
            }
            html.push_str("</tr>");
        }
        html.push_str("</table></body></html>");
        html
    }

    #[tokio::test]
    async fn test_fetch_selects_data_table() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/corporates/Insider_Trading_new.aspx"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page(16, 3)))
            .mount(&server)
            .await;

        let fetcher = DisclosureFetcher::new(&config_for(&server)).unwrap();
        let table = fetcher.fetch().await.unwrap().expect("table");
        assert_eq!(table.width(), 16);
        assert_eq!(table.height(), 3);
    }

    #[tokio::test]
    async fn test_fetch_without_wide_table_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page(5, 10)))
            .mount(&server)
            .await;

        let fetcher = DisclosureFetcher::new(&config_for(&server)).unwrap();
        assert!(fetcher.fetch().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fetch_http_error_is_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = DisclosureFetcher::new(&config_for(&server)).unwrap();
        let err = fetcher.fetch().await.unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
    }
}
