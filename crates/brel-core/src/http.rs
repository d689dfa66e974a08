use std::future::Future;
use std::time::Duration;

use log::debug;
use serde::de::DeserializeOwned;

use crate::error::FetchError;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const SNIPPET_CHARS: usize = 160;

/// Per-request timeout and retry schedule shared by all fetchers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    pub timeout: Duration,
    /// Delay before each attempt; the first entry is usually `0`.
    pub retry_delays_secs: Vec<u64>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry_delays_secs: vec![0, 2, 5],
        }
    }
}

impl FetchError {
    /// Errors worth another attempt.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request { .. } | Self::Timeout { .. } | Self::RateLimited { .. } => true,
            Self::HttpStatus { status, .. } => *status >= 500,
            Self::Parse { .. } | Self::UnexpectedShape { .. } => false,
        }
    }
}

/// GET `url` and return the body as text.
///
/// # Errors
/// Returns a [`FetchError`] when every attempt fails or a non-transient
/// error (for example a 404) is hit.
pub async fn get_text(
    client: &reqwest::Client,
    url: &str,
    settings: &FetchSettings,
) -> Result<String, FetchError> {
    retry_with_delays(url, &settings.retry_delays_secs, || {
        run_with_timeout(settings.timeout, url, fetch_once(client, url))
    })
    .await
}

/// GET `url` and decode the body as JSON.
///
/// # Errors
/// Returns a [`FetchError`] when the request fails or the body does not
/// match `T`.
pub async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    settings: &FetchSettings,
) -> Result<T, FetchError> {
    let body = get_text(client, url, settings).await?;
    parse_json(url, &body)
}

/// Decode a JSON body, reporting failures against `url`.
///
/// # Errors
/// Returns [`FetchError::Parse`] when `body` does not match `T`.
pub fn parse_json<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, FetchError> {
    serde_json::from_str(body).map_err(|error| FetchError::parse_from(url, error))
}

async fn fetch_once(client: &reqwest::Client, url: &str) -> Result<String, FetchError> {
    debug!("GET {url}");
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|error| FetchError::request_from(url, error))?;

    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(FetchError::RateLimited {
            url: url.to_string(),
        });
    }
    if !status.is_success() {
        let body_snippet = response
            .text()
            .await
            .ok()
            .map(|body| response_snippet(&body, SNIPPET_CHARS))
            .unwrap_or_default();
        return Err(FetchError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
            body_snippet,
        });
    }

    response
        .text()
        .await
        .map_err(|error| FetchError::request_from(url, error))
}

async fn run_with_timeout<T, F>(timeout: Duration, url: &str, future: F) -> Result<T, FetchError>
where
    F: Future<Output = Result<T, FetchError>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout {
            url: url.to_string(),
            seconds: timeout.as_secs(),
        }),
    }
}

pub(crate) async fn retry_with_delays<T, Op, Fut>(
    operation_name: &str,
    retry_delays_secs: &[u64],
    mut operation: Op,
) -> Result<T, FetchError>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut last_err = None;

    for (attempt, &delay_secs) in retry_delays_secs.iter().enumerate() {
        if delay_secs > 0 {
            tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        }

        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_transient() => {
                debug!("{} attempt {} failed: {}", operation_name, attempt + 1, error);
                last_err = Some(error);
            }
            Err(error) => return Err(error),
        }
    }

    Err(last_err.unwrap_or_else(|| FetchError::Request {
        url: operation_name.to_string(),
        details: "no attempts configured".to_string(),
    }))
}

fn response_snippet(body: &str, max_chars: usize) -> String {
    let snippet: String = body.trim().chars().take(max_chars).collect();
    if snippet.is_empty() {
        String::new()
    } else {
        format!(": {snippet}")
    }
}
