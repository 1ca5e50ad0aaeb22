//! Socrata SODA API fetcher.
//!
//! Builds the `$where` date-window predicate and pages through the result
//! with `$limit`, `$offset` and `$order`, newest rows first.

use std::sync::Arc;

use chrono::NaiveDateTime;
use crash_injury_source_models::RawCrash;

use crate::dataset_def::{DatasetDefinition, FetcherConfig};
use crate::progress::ProgressCallback;
use crate::{FetchOptions, SourceError, retry};

/// Timestamp format Socrata expects inside `$where` literals.
const SOCRATA_TIMESTAMP: &str = "%Y-%m-%dT%H:%M:%S";

/// One page request against a Socrata resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocrataQuery<'a> {
    /// Resource URL.
    pub api_url: &'a str,
    /// Timestamp column for ordering and filtering.
    pub date_column: &'a str,
    /// Lower bound (exclusive) on `date_column`.
    pub since: Option<NaiveDateTime>,
    /// Page size.
    pub limit: u64,
    /// Rows to skip.
    pub offset: u64,
}

impl SocrataQuery<'_> {
    /// The `$where` predicate, if a lower bound is set.
    #[must_use]
    pub fn where_clause(&self) -> Option<String> {
        self.since.map(|since| {
            format!(
                "{} > '{}'",
                self.date_column,
                since.format(SOCRATA_TIMESTAMP)
            )
        })
    }

    /// Query-string parameters for this page.
    #[must_use]
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("$limit", self.limit.to_string()),
            ("$offset", self.offset.to_string()),
            ("$order", format!("{} DESC", self.date_column)),
        ];
        if let Some(clause) = self.where_clause() {
            params.push(("$where", clause));
        }
        params
    }
}

/// Fetches every row of `dataset` matching `options`, newest first.
///
/// Pagination stops at the first short page or once `options.limit` rows
/// have been collected.
///
/// # Errors
///
/// Returns [`SourceError`] if any page request fails or a page is not a JSON
/// array of rows.
#[allow(clippy::future_not_send)]
pub async fn fetch_socrata(
    dataset: &DatasetDefinition,
    options: &FetchOptions,
    progress: Arc<dyn ProgressCallback>,
) -> Result<Vec<RawCrash>, SourceError> {
    let FetcherConfig::Socrata {
        api_url,
        date_column,
        page_size,
    } = &dataset.fetcher;

    let client = reqwest::Client::new();
    let mut rows: Vec<RawCrash> = Vec::new();
    let mut offset: u64 = 0;
    let fetch_limit = options.limit.unwrap_or(u64::MAX);

    if let Some(limit) = options.limit {
        progress.set_total(limit);
    }
    progress.set_message(format!("Fetching {}", dataset.name));

    loop {
        let remaining = fetch_limit.saturating_sub(offset);
        if remaining == 0 {
            break;
        }
        let query = SocrataQuery {
            api_url,
            date_column,
            since: options.since,
            limit: remaining.min((*page_size).max(1)),
            offset,
        };
        let params = query.params();

        log::info!(
            "Fetching {} data: offset={offset}, limit={}",
            dataset.id,
            query.limit
        );
        let body = retry::send_json(&options.retry, || {
            let request = client.get(query.api_url).query(&params);
            match &options.app_token {
                Some(token) => request.header("X-App-Token", token),
                None => request,
            }
        })
        .await?;
        let page: Vec<RawCrash> = serde_json::from_value(body)?;

        let count = page.len() as u64;
        rows.extend(page);
        offset += count;
        progress.inc(count);

        if count < query.limit {
            break;
        }
    }

    log::info!("Downloaded {} {} rows total", rows.len(), dataset.id);
    progress.finish(format!("Fetched {} rows", rows.len()));

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, ServerGuard};

    use super::*;
    use crate::progress::null_progress;

    fn query(since: Option<NaiveDateTime>) -> SocrataQuery<'static> {
        SocrataQuery {
            api_url: "https://data.cityofchicago.org/resource/85ca-t3if.json",
            date_column: "crash_date",
            since,
            limit: 50_000,
            offset: 100_000,
        }
    }

    #[test]
    fn where_clause_uses_strict_greater_than() {
        let since = chrono::NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(
            query(Some(since)).where_clause().unwrap(),
            "crash_date > '2020-01-01T00:00:00'"
        );
    }

    #[test]
    fn params_page_newest_first() {
        let params = query(None).params();
        assert_eq!(
            params,
            vec![
                ("$limit", "50000".to_string()),
                ("$offset", "100000".to_string()),
                ("$order", "crash_date DESC".to_string()),
            ]
        );
    }

    #[test]
    fn params_include_where_when_bounded() {
        let since = chrono::NaiveDate::from_ymd_opt(2023, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let params = query(Some(since)).params();
        assert_eq!(params.len(), 4);
        assert_eq!(params[3].0, "$where");
    }

    fn dataset(server: &ServerGuard, page_size: u64) -> DatasetDefinition {
        DatasetDefinition {
            id: "test_crashes".to_string(),
            name: "Test crashes".to_string(),
            portal_url: None,
            fetcher: FetcherConfig::Socrata {
                api_url: format!("{}/resource/test.json", server.url()),
                date_column: "crash_date".to_string(),
                page_size,
            },
        }
    }

    fn page(ids: &[&str]) -> String {
        let rows: Vec<String> = ids
            .iter()
            .map(|id| format!(r#"{{"crash_record_id":"{id}","injuries_total":"0"}}"#))
            .collect();
        format!("[{}]", rows.join(","))
    }

    fn param(key: &str, value: &str) -> Matcher {
        Matcher::UrlEncoded(key.to_string(), value.to_string())
    }

    fn ids(rows: &[RawCrash]) -> Vec<&str> {
        rows.iter()
            .filter_map(|r| r.crash_record_id.as_deref())
            .collect()
    }

    #[tokio::test]
    async fn pagination_stops_on_a_short_page() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/resource/test.json")
            .match_query(Matcher::AllOf(vec![param("$offset", "0"), param("$limit", "2")]))
            .with_body(page(&["a", "b"]))
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/resource/test.json")
            .match_query(Matcher::AllOf(vec![param("$offset", "2"), param("$limit", "2")]))
            .with_body(page(&["c"]))
            .expect(1)
            .create_async()
            .await;

        let rows = fetch_socrata(&dataset(&server, 2), &FetchOptions::default(), null_progress())
            .await
            .unwrap();

        assert_eq!(ids(&rows), vec!["a", "b", "c"]);
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn pagination_stops_at_the_limit() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/resource/test.json")
            .match_query(Matcher::AllOf(vec![param("$offset", "0"), param("$limit", "2")]))
            .with_body(page(&["a", "b"]))
            .expect(1)
            .create_async()
            .await;
        let last = server
            .mock("GET", "/resource/test.json")
            .match_query(Matcher::AllOf(vec![param("$offset", "2"), param("$limit", "1")]))
            .with_body(page(&["c"]))
            .expect(1)
            .create_async()
            .await;

        let options = FetchOptions {
            limit: Some(3),
            ..FetchOptions::default()
        };
        let rows = fetch_socrata(&dataset(&server, 2), &options, null_progress())
            .await
            .unwrap();

        assert_eq!(rows.len(), 3);
        first.assert_async().await;
        last.assert_async().await;
    }

    #[tokio::test]
    async fn sends_app_token_and_date_window() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/resource/test.json")
            .match_header("X-App-Token", "secret")
            .match_query(Matcher::AllOf(vec![
                param("$where", "crash_date > '2020-01-01T00:00:00'"),
                param("$order", "crash_date DESC"),
            ]))
            .with_body(page(&["a"]))
            .expect(1)
            .create_async()
            .await;

        let options = FetchOptions {
            since: chrono::NaiveDate::from_ymd_opt(2020, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0)),
            app_token: Some("secret".to_string()),
            ..FetchOptions::default()
        };
        let rows = fetch_socrata(&dataset(&server, 10), &options, null_progress())
            .await
            .unwrap();

        assert_eq!(ids(&rows), vec!["a"]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_error_is_not_retried_by_default() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/resource/test.json")
            .match_query(Matcher::Any)
            .with_status(500)
            .expect(1)
            .create_async()
            .await;

        let result =
            fetch_socrata(&dataset(&server, 10), &FetchOptions::default(), null_progress()).await;

        assert!(matches!(
            result,
            Err(SourceError::Status { status: 500, .. })
        ));
        mock.assert_async().await;
    }
}
