use crate::core::config::DEFAULT_YAHOO_COOKIE_URL;
use crate::core::{
    DailyBar, FetchError, Period, PriceProvider, PriceSeries, RangeSpec, TickerSummary,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::StatusCode;
use reqwest::header::SET_COOKIE;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Desktop browser UA; the quote endpoints reject obvious bots.
const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (X11; Linux x86_64) ",
    "AppleWebKit/537.36 (KHTML, like Gecko) ",
    "Chrome/122.0.0.0 Safari/537.36"
);

// YahooFinanceProvider implementation for PriceProvider
pub struct YahooFinanceProvider {
    base_url: String,
    cookie_url: String,
    client: reqwest::Client,
    crumb: RwLock<Option<String>>,
}

impl YahooFinanceProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()?;
        Ok(YahooFinanceProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            cookie_url: DEFAULT_YAHOO_COOKIE_URL.to_string(),
            client,
            crumb: RwLock::new(None),
        })
    }

    pub fn with_cookie_url(mut self, cookie_url: &str) -> Self {
        self.cookie_url = cookie_url.to_string();
        self
    }

    fn range_query(range: &RangeSpec) -> Vec<(&'static str, String)> {
        let mut query = vec![("interval", "1d".to_string())];
        match range {
            RangeSpec::Period(period) => query.push(("range", period.to_string())),
            RangeSpec::Between { start, end } => {
                query.push(("period1", midnight_utc(*start).to_string()));
                query.push(("period2", midnight_utc(*end).to_string()));
            }
        }
        query
    }

    async fn get_text(
        &self,
        url: &str,
        query: &[(&str, String)],
        symbol: &str,
    ) -> Result<(StatusCode, String), FetchError> {
        debug!("Requesting {} {:?}", url, query);
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::provider(format!("Request error: {e} for symbol: {symbol}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| FetchError::provider(format!("Failed to read response for {symbol}: {e}")))?;
        Ok((status, text))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        symbol: &str,
    ) -> Result<T, FetchError> {
        let (status, text) = self.get_text(url, query, symbol).await?;
        decode_body(status, &text, symbol)
    }

    /// Drops any known crumb, then fetches a session cookie and a fresh crumb.
    ///
    /// The cookie lands in the client's cookie store and is sent with every
    /// later request.
    async fn refresh_crumb(&self) -> Result<String, FetchError> {
        let mut crumb = self.crumb.write().await;
        *crumb = None;

        debug!("Requesting session cookie from {}", self.cookie_url);
        let response = self
            .client
            .get(&self.cookie_url)
            .send()
            .await
            .map_err(|e| FetchError::provider(format!("Cookie request error: {e}")))?;
        // The consent endpoint answers 404 but still sets the cookie
        if response.headers().get(SET_COOKIE).is_none() {
            return Err(FetchError::provider(format!(
                "No cookie received from {}",
                self.cookie_url
            )));
        }

        let crumb_url = format!("{}/v1/test/getcrumb", self.base_url);
        debug!("Requesting crumb from {}", crumb_url);
        let response = self
            .client
            .get(&crumb_url)
            .send()
            .await
            .map_err(|e| FetchError::provider(format!("Crumb request error: {e}")))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| FetchError::provider(format!("Failed to read crumb: {e}")))?;
        let text = text.trim();
        if !status.is_success() || text.is_empty() || text.contains('{') || text.contains('<') {
            return Err(FetchError::provider(format!(
                "Received invalid crumb ({status}): {text}"
            )));
        }

        *crumb = Some(text.to_string());
        Ok(text.to_string())
    }

    /// Quote lookup. Sends the known crumb if any; on 401/403 obtains a new
    /// cookie and crumb and tries once more.
    async fn fetch_quote(&self, symbol: &str) -> Result<QuoteItem, FetchError> {
        let url = format!("{}/v7/finance/quote", self.base_url);
        let mut query = vec![("symbols", symbol.to_string())];
        let known = self.crumb.read().await.clone();
        if let Some(crumb) = known {
            query.push(("crumb", crumb));
        }

        let (mut status, mut text) = self.get_text(&url, &query, symbol).await?;
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            debug!(%symbol, %status, "Quote lookup rejected, refreshing crumb");
            let crumb = self.refresh_crumb().await?;
            query.retain(|(key, _)| *key != "crumb");
            query.push(("crumb", crumb));
            (status, text) = self.get_text(&url, &query, symbol).await?;
        }

        let data: QuoteEnvelope = decode_body(status, &text, symbol)?;
        data.quote_response
            .result
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::provider(format!("No quote found for symbol: {symbol}")))
    }
}

fn decode_body<T: DeserializeOwned>(
    status: StatusCode,
    text: &str,
    symbol: &str,
) -> Result<T, FetchError> {
    if !status.is_success() {
        // Chart errors come back as JSON with a description
        if let Ok(ChartResponse {
            chart:
                ChartResult {
                    error: Some(err), ..
                },
        }) = serde_json::from_str::<ChartResponse>(text)
        {
            return Err(FetchError::provider(format!(
                "{}: {}",
                err.code, err.description
            )));
        }
        return Err(FetchError::provider(format!(
            "HTTP error: {status} for symbol: {symbol}"
        )));
    }

    serde_json::from_str(text).map_err(|e| {
        FetchError::provider(format!("Failed to parse JSON response for {symbol}: {e}"))
    })
}

fn midnight_utc(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

#[derive(Deserialize, Debug)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    // Required key: `null` means no data, a missing key is a malformed body
    #[serde(deserialize_with = "Option::deserialize")]
    result: Option<Vec<ChartItem>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Deserialize, Debug)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
struct ChartMeta {
    #[serde(alias = "gmtoffset", default)]
    gmt_offset: i64,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct Quote {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

#[derive(Deserialize, Debug)]
struct QuoteEnvelope {
    #[serde(rename = "quoteResponse")]
    quote_response: QuoteResult,
}

#[derive(Deserialize, Debug)]
struct QuoteResult {
    #[serde(default)]
    result: Vec<QuoteItem>,
}

#[derive(Deserialize, Debug)]
struct QuoteItem {
    #[serde(alias = "marketCap")]
    market_cap: Option<f64>,
    #[serde(alias = "longName")]
    long_name: Option<String>,
    #[serde(alias = "shortName")]
    short_name: Option<String>,
}

/// Maps the provider's column arrays onto canonical daily bars.
///
/// Days missing any of open/high/low/close are dropped; a missing volume is 0.
fn extract_bars(item: ChartItem) -> Vec<DailyBar> {
    let offset = item.meta.map_or(0, |m| m.gmt_offset);
    let (Some(timestamps), Some(quote)) = (
        item.timestamp,
        item.indicators.and_then(|i| i.quote.into_iter().next()),
    ) else {
        return Vec::new();
    };

    timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            let date = DateTime::from_timestamp(ts + offset, 0)?.date_naive();
            Some(DailyBar {
                date,
                open: quote.open.get(i).copied().flatten()?,
                high: quote.high.get(i).copied().flatten()?,
                low: quote.low.get(i).copied().flatten()?,
                close: quote.close.get(i).copied().flatten()?,
                volume: quote
                    .volume
                    .get(i)
                    .copied()
                    .flatten()
                    .map_or(0, |v| v.max(0.0).round() as u64),
            })
        })
        .collect()
}

#[async_trait]
impl PriceProvider for YahooFinanceProvider {
    #[instrument(name = "YahooHistoryFetch", skip(self), fields(symbol = %symbol, range = %range))]
    async fn fetch_history(
        &self,
        symbol: &str,
        range: &RangeSpec,
    ) -> Result<PriceSeries, FetchError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        let data: ChartResponse = self
            .get_json(&url, &Self::range_query(range), symbol)
            .await?;

        if let Some(err) = data.chart.error {
            return Err(FetchError::provider(format!(
                "{}: {}",
                err.code, err.description
            )));
        }

        let Some(item) = data.chart.result.and_then(|r| r.into_iter().next()) else {
            return Err(FetchError::NoData);
        };

        let series = PriceSeries::new(symbol, extract_bars(item));
        if series.is_empty() {
            return Err(FetchError::NoData);
        }
        debug!("Fetched {} bars for {}", series.len(), symbol);
        Ok(series)
    }

    #[instrument(name = "YahooSummaryFetch", skip(self), fields(symbol = %symbol))]
    async fn fetch_summary(&self, symbol: &str) -> Result<TickerSummary, FetchError> {
        let recent = self
            .fetch_history(symbol, &RangeSpec::Period(Period::FiveDays))
            .await?;
        let (Some(last_price), Some(avg_volume)) = (recent.last_close(), recent.mean_volume())
        else {
            return Err(FetchError::NoData);
        };

        let quote = self.fetch_quote(symbol).await?;

        Ok(TickerSummary {
            symbol: recent.symbol,
            name: quote.long_name.or(quote.short_name),
            last_price,
            avg_volume,
            market_cap: quote.market_cap.unwrap_or(0.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // 2024-01-02 and 2024-01-03, 14:30 UTC
    const TS_1: i64 = 1_704_205_800;
    const TS_2: i64 = 1_704_292_200;
    const TS_3: i64 = 1_704_378_600;

    fn chart_body() -> String {
        format!(
            r#"{{
                "chart": {{
                    "result": [{{
                        "meta": {{ "currency": "USD", "gmtoffset": -18000 }},
                        "timestamp": [{TS_2}, {TS_1}, {TS_3}],
                        "indicators": {{
                            "quote": [{{
                                "open":   [11.0, 10.0, null],
                                "high":   [12.0, 11.0, null],
                                "low":    [10.5, 9.5, null],
                                "close":  [11.5, 10.5, null],
                                "volume": [2000, 1000, null]
                            }}]
                        }}
                    }}],
                    "error": null
                }}
            }}"#
        )
    }

    pub async fn create_mock_server(symbol: &str, mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        let request_path = format!("/v8/finance/chart/{symbol}");

        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }

    #[tokio::test]
    async fn test_successful_history_fetch() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/AAPL"))
            .and(query_param("interval", "1d"))
            .and(query_param("range", "8y"))
            .respond_with(ResponseTemplate::new(200).set_body_string(chart_body()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = YahooFinanceProvider::new(&mock_server.uri()).unwrap();
        let series = provider
            .fetch_history("AAPL", &RangeSpec::Period(Period::EightYears))
            .await
            .unwrap();

        assert_eq!(series.symbol, "AAPL");
        assert_eq!(series.len(), 2);
        let bars = series.bars();
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[0].open, 10.0);
        assert_eq!(bars[0].volume, 1000);
        assert_eq!(bars[1].date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_eq!(bars[1].close, 11.5);
    }

    #[tokio::test]
    async fn test_date_range_uses_unix_bounds() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/MSFT"))
            .and(query_param("period1", "1704067200"))
            .and(query_param("period2", "1706745600"))
            .respond_with(ResponseTemplate::new(200).set_body_string(chart_body()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = YahooFinanceProvider::new(&mock_server.uri()).unwrap();
        let range = RangeSpec::Between {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        };
        let series = provider.fetch_history("MSFT", &range).await.unwrap();
        assert_eq!(series.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_result_is_no_data() {
        let mock_server =
            create_mock_server("EMPTY", r#"{"chart": {"result": [{"meta": {}}], "error": null}}"#)
                .await;
        let provider = YahooFinanceProvider::new(&mock_server.uri()).unwrap();
        let result = provider
            .fetch_history("EMPTY", &RangeSpec::Period(Period::OneYear))
            .await;
        assert_eq!(result.unwrap_err(), FetchError::NoData);
    }

    #[tokio::test]
    async fn test_null_result_is_no_data() {
        let mock_server =
            create_mock_server("NULL", r#"{"chart": {"result": null, "error": null}}"#).await;
        let provider = YahooFinanceProvider::new(&mock_server.uri()).unwrap();
        let result = provider
            .fetch_history("NULL", &RangeSpec::Period(Period::OneYear))
            .await;
        assert_eq!(result.unwrap_err(), FetchError::NoData);
    }

    #[tokio::test]
    async fn test_unknown_symbol_is_provider_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/BADTICKER"))
            .respond_with(ResponseTemplate::new(404).set_body_string(
                r#"{"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}}"#,
            ))
            .mount(&mock_server)
            .await;

        let provider = YahooFinanceProvider::new(&mock_server.uri()).unwrap();
        let result = provider
            .fetch_history("BADTICKER", &RangeSpec::Period(Period::OneYear))
            .await;
        assert_eq!(
            result.unwrap_err(),
            FetchError::provider("Not Found: No data found, symbol may be delisted")
        );
    }

    #[tokio::test]
    async fn test_server_error_without_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/AAPL"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let provider = YahooFinanceProvider::new(&mock_server.uri()).unwrap();
        let result = provider
            .fetch_history("AAPL", &RangeSpec::Period(Period::OneYear))
            .await;
        assert_eq!(
            result.unwrap_err(),
            FetchError::provider("HTTP error: 500 Internal Server Error for symbol: AAPL")
        );
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let mock_server = create_mock_server("AAPL", r#"{"chart": {"results": []}}"#).await;
        let provider = YahooFinanceProvider::new(&mock_server.uri()).unwrap();
        let err = provider
            .fetch_history("AAPL", &RangeSpec::Period(Period::OneYear))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "ProviderError");
        assert!(
            err.to_string()
                .contains("Failed to parse JSON response for AAPL")
        );
    }

    #[tokio::test]
    async fn test_summary_fetch() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/AAPL"))
            .and(query_param("range", "5d"))
            .respond_with(ResponseTemplate::new(200).set_body_string(chart_body()))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v7/finance/quote"))
            .and(query_param("symbols", "AAPL"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"quoteResponse": {"result": [{"symbol": "AAPL", "marketCap": 2900000000000, "longName": "Apple Inc.", "shortName": "Apple"}], "error": null}}"#,
            ))
            .mount(&mock_server)
            .await;

        let provider = YahooFinanceProvider::new(&mock_server.uri()).unwrap();
        let summary = provider.fetch_summary("AAPL").await.unwrap();
        assert_eq!(summary.symbol, "AAPL");
        assert_eq!(summary.name.as_deref(), Some("Apple Inc."));
        assert_eq!(summary.last_price, 11.5);
        assert_eq!(summary.avg_volume, 1500.0);
        assert_eq!(summary.market_cap, 2.9e12);
    }

    #[tokio::test]
    async fn test_summary_without_market_cap_or_long_name() {
        let mock_server = create_mock_server("ETF", &chart_body()).await;
        Mock::given(method("GET"))
            .and(path("/v7/finance/quote"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"quoteResponse": {"result": [{"symbol": "ETF", "shortName": "Some ETF"}]}}"#,
            ))
            .mount(&mock_server)
            .await;

        let provider = YahooFinanceProvider::new(&mock_server.uri()).unwrap();
        let summary = provider.fetch_summary("ETF").await.unwrap();
        assert_eq!(summary.name.as_deref(), Some("Some ETF"));
        assert_eq!(summary.market_cap, 0.0);
    }

    #[tokio::test]
    async fn test_summary_missing_quote() {
        let mock_server = create_mock_server("AAPL", &chart_body()).await;
        Mock::given(method("GET"))
            .and(path("/v7/finance/quote"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"quoteResponse": {"result": []}}"#),
            )
            .mount(&mock_server)
            .await;

        let provider = YahooFinanceProvider::new(&mock_server.uri()).unwrap();
        let err = provider.fetch_summary("AAPL").await.unwrap_err();
        assert_eq!(err, FetchError::provider("No quote found for symbol: AAPL"));
    }

    const QUOTE_BODY: &str = r#"{"quoteResponse": {"result": [{"symbol": "AAPL", "marketCap": 2900000000000, "longName": "Apple Inc."}], "error": null}}"#;
    const UNAUTHORIZED_BODY: &str = r#"{"finance": {"result": null, "error": {"code": "Unauthorized", "description": "Invalid Crumb"}}}"#;

    async fn mount_auth_flow(mock_server: &MockServer, crumb: &str) {
        Mock::given(method("GET"))
            .and(path("/consent"))
            .respond_with(
                ResponseTemplate::new(404).insert_header("set-cookie", "A3=d=test; Path=/"),
            )
            .expect(1)
            .mount(mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/test/getcrumb"))
            .respond_with(ResponseTemplate::new(200).set_body_string(crumb))
            .expect(1)
            .mount(mock_server)
            .await;
    }

    #[tokio::test]
    async fn test_quote_requires_crumb_after_unauthorized() {
        let mock_server = create_mock_server("AAPL", &chart_body()).await;
        mount_auth_flow(&mock_server, "abc123").await;
        Mock::given(method("GET"))
            .and(path("/v7/finance/quote"))
            .and(query_param("crumb", "abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_string(QUOTE_BODY))
            .expect(2)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v7/finance/quote"))
            .and(query_param_is_missing("crumb"))
            .respond_with(ResponseTemplate::new(401).set_body_string(UNAUTHORIZED_BODY))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = YahooFinanceProvider::new(&mock_server.uri())
            .unwrap()
            .with_cookie_url(&format!("{}/consent", mock_server.uri()));
        let summary = provider.fetch_summary("AAPL").await.unwrap();
        assert_eq!(summary.market_cap, 2.9e12);
        assert_eq!(summary.name.as_deref(), Some("Apple Inc."));

        // The crumb is reused without another handshake
        let again = provider.fetch_summary("AAPL").await.unwrap();
        assert_eq!(again.market_cap, 2.9e12);
    }

    #[tokio::test]
    async fn test_quote_fails_when_crumb_is_rejected() {
        let mock_server = create_mock_server("AAPL", &chart_body()).await;
        Mock::given(method("GET"))
            .and(path("/consent"))
            .respond_with(
                ResponseTemplate::new(404).insert_header("set-cookie", "A3=d=test; Path=/"),
            )
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/test/getcrumb"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>denied</html>"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v7/finance/quote"))
            .respond_with(ResponseTemplate::new(401).set_body_string(UNAUTHORIZED_BODY))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = YahooFinanceProvider::new(&mock_server.uri())
            .unwrap()
            .with_cookie_url(&format!("{}/consent", mock_server.uri()));
        let err = provider.fetch_summary("AAPL").await.unwrap_err();
        assert_eq!(err.kind(), "ProviderError");
        assert!(err.to_string().contains("Received invalid crumb"));
    }

    #[tokio::test]
    async fn test_explicit_null_result_differs_from_missing_key() {
        let mock_server = create_mock_server("AAPL", r#"{"chart": {"error": null}}"#).await;
        let provider = YahooFinanceProvider::new(&mock_server.uri()).unwrap();
        let err = provider
            .fetch_history("AAPL", &RangeSpec::Period(Period::OneYear))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "ProviderError");
    }
}
