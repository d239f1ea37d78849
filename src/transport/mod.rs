use std::sync::OnceLock;
use std::time::Duration;

use crate::config::ServiceConfig;
use crate::error::ChatError;

fn build_reqwest_client(
    pool_max_idle_per_host: usize,
    pool_idle_timeout: Option<Duration>,
    timeout: Duration,
    proxy_url: Option<&str>,
) -> Result<reqwest::Client, ChatError> {
    let mut builder = reqwest::Client::builder()
        .pool_max_idle_per_host(pool_max_idle_per_host)
        .pool_idle_timeout(pool_idle_timeout)
        .tcp_nodelay(true)
        .connect_timeout(Duration::from_secs(5))
        .redirect(reqwest::redirect::Policy::none())
        .timeout(timeout);

    if let Some(proxy_url) = proxy_url {
        let proxy = reqwest::Proxy::all(proxy_url)
            .map_err(|err| ChatError::Transport(format!("Invalid proxy URL: {err}")))?;
        builder = builder.no_proxy().proxy(proxy);
    } else {
        builder = builder.no_proxy();
    }

    builder
        .build()
        .map_err(|err| ChatError::Transport(format!("Failed to build HTTP client: {err}")))
}

/// HTTP transport for talking to the upstream chat service.
///
/// One lazily-built reqwest client with pooling and timeouts from the service
/// config. Requests are sent once: retry policy belongs to the caller layer,
/// and a caller-side abort surfaces as a body stream error.
#[derive(Debug)]
pub struct HttpTransport {
    client: OnceLock<reqwest::Client>,
    pool_max_idle_per_host: usize,
    pool_idle_timeout: Option<Duration>,
    timeout: Duration,
    proxy_url: Option<String>,
}

impl HttpTransport {
    #[must_use]
    pub fn new(config: &ServiceConfig) -> Self {
        let pool_idle_timeout = if config.http_pool_idle_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(config.http_pool_idle_timeout_secs))
        };
        Self {
            client: OnceLock::new(),
            pool_max_idle_per_host: config.http_pool_max_idle_per_host.max(1),
            pool_idle_timeout,
            timeout: Duration::from_secs(config.timeout_secs),
            proxy_url: config.proxy.clone(),
        }
    }

    fn client(&self) -> &reqwest::Client {
        self.client.get_or_init(|| {
            match build_reqwest_client(
                self.pool_max_idle_per_host,
                self.pool_idle_timeout,
                self.timeout,
                self.proxy_url.as_deref(),
            ) {
                Ok(client) => client,
                Err(err) => {
                    tracing::error!(error = %err, "failed to build configured reqwest client, falling back to default client");
                    reqwest::Client::new()
                }
            }
        })
    }

    /// POST a request whose response body the caller reads as a byte stream.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Transport`] when request execution fails. A
    /// non-200 status is returned as a normal response; status handling is the
    /// caller's concern.
    pub async fn send_stream(
        &self,
        url: &url::Url,
        headers: &http::HeaderMap,
        body: bytes::Bytes,
    ) -> Result<reqwest::Response, ChatError> {
        let mut request = reqwest::Request::new(http::Method::POST, url.clone());
        *request.headers_mut() = headers.clone();
        *request.body_mut() = Some(reqwest::Body::from(body));
        self.client()
            .execute(request)
            .await
            .map_err(ChatError::from)
    }

    /// Send a bodyless GET request (model listing, connectivity probe).
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Transport`] when request execution fails.
    pub async fn send_get(
        &self,
        url: &url::Url,
        headers: &http::HeaderMap,
    ) -> Result<reqwest::Response, ChatError> {
        let mut request = reqwest::Request::new(http::Method::GET, url.clone());
        *request.headers_mut() = headers.clone();
        self.client()
            .execute(request)
            .await
            .map_err(ChatError::from)
    }
}
