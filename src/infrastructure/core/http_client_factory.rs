use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use std::time::Duration;

const USER_AGENT: &str = concat!("pricecast/", env!("CARGO_PKG_VERSION"));

pub struct HttpClientFactory;

impl HttpClientFactory {
    /// Creates an HTTP client bounded by `timeout` per request.
    ///
    /// Transient failures are retried `max_retries` times with exponential
    /// backoff before the caller sees the error; with 0 the retry layer is
    /// skipped and endpoint failover is the only recovery.
    pub fn create_client(timeout: Duration, max_retries: u32) -> ClientWithMiddleware {
        let client = Client::builder()
            .pool_max_idle_per_host(2)
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());

        let builder = ClientBuilder::new(client);
        if max_retries == 0 {
            return builder.build();
        }

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
        builder
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build()
    }
}

/// Helper function to build a URL with query parameters.
/// reqwest-middleware's request builder has no `.query()`, so the query
/// string is encoded here and appended to the URL.
pub fn build_url_with_query<K, V>(base_url: &str, params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    if params.is_empty() {
        return base_url.to_string();
    }

    let query_string = params
        .iter()
        .map(|(k, v)| format!("{}={}", encode_component(k.as_ref()), encode_component(v.as_ref())))
        .collect::<Vec<_>>()
        .join("&");

    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", base_url, separator, query_string)
}

/// Percent-encodes everything outside the RFC 3986 unreserved set.
fn encode_component(s: &str) -> String {
    let mut encoded = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char);
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_appended() {
        let url = build_url_with_query(
            "https://api.binance.com/api/v3/ticker/price",
            &[("symbol", "BTCUSDT")],
        );
        assert_eq!(url, "https://api.binance.com/api/v3/ticker/price?symbol=BTCUSDT");
    }

    #[test]
    fn test_query_extends_existing() {
        let url = build_url_with_query("http://a.local/x?y=1", &[("pair", "USDT/BOB")]);
        assert_eq!(url, "http://a.local/x?y=1&pair=USDT%2FBOB");
    }

    #[test]
    fn test_empty_params_leave_url() {
        let params: [(&str, &str); 0] = [];
        assert_eq!(build_url_with_query("http://a.local", &params), "http://a.local");
    }
}
