use bytes::Bytes;
use futures_util::StreamExt;
use smallvec::SmallVec;

use crate::config::ServiceConfig;
use crate::error::ChatError;
use crate::protocol::{build_payload, ChatRequest, ModelsResponse};
use crate::stream::{classify_line, Dispatcher, LineReader, StreamHandler};
use crate::transport::HttpTransport;

/// Streaming chat client for one configured upstream service.
///
/// Each [`ChatClient::chat_stream`] call owns its own line reader and
/// dispatcher; independent calls share nothing but the pooled HTTP client.
#[derive(Debug)]
pub struct ChatClient {
    config: ServiceConfig,
    transport: HttpTransport,
    completions_url: url::Url,
    base_endpoint: String,
    headers: http::HeaderMap,
}

impl ChatClient {
    /// Build a client from a validated service config.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Config`] when the endpoint does not parse as a
    /// URL or the API key cannot form an `Authorization` header.
    pub fn new(config: ServiceConfig) -> Result<Self, ChatError> {
        let base_endpoint = normalize_endpoint(&config.api_endpoint);
        let completions_url = url::Url::parse(&completions_endpoint(&base_endpoint))
            .map_err(|e| ChatError::Config(format!("invalid api_endpoint: {e}")))?;

        let mut headers = http::HeaderMap::new();
        headers.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );
        let bearer = http::HeaderValue::try_from(format!("Bearer {}", config.api_key))
            .map_err(|e| ChatError::Config(format!("api_key is not a valid header value: {e}")))?;
        headers.insert(http::header::AUTHORIZATION, bearer);

        let transport = HttpTransport::new(&config);
        Ok(Self {
            config,
            transport,
            completions_url,
            base_endpoint,
            headers,
        })
    }

    /// Stream a chat completion, reporting every event through `handler`.
    ///
    /// Exactly one terminal callback fires per call: `on_done` when the
    /// transport closes naturally, `on_error` for a non-200 initial response,
    /// a transport fault, or a mid-stream error frame. `on_chunk` calls occur
    /// in strict arrival order. Cancellation is the caller's concern: drop
    /// the returned future to abort the underlying transport.
    pub async fn chat_stream<H: StreamHandler>(&self, request: &ChatRequest, handler: &mut H) {
        let mut dispatcher = Dispatcher::new(handler);
        if let Err(error) = self.run_stream(request, &mut dispatcher).await {
            dispatcher.fail(&error);
            return;
        }
        dispatcher.finish();
    }

    async fn run_stream<H: StreamHandler>(
        &self,
        request: &ChatRequest,
        dispatcher: &mut Dispatcher<'_, H>,
    ) -> Result<(), ChatError> {
        if request.messages.is_empty() {
            return Err(ChatError::InvalidRequest(
                "message list must not be empty".to_string(),
            ));
        }

        let payload = build_payload(request, &self.config);
        let body = serde_json::to_vec(&payload)
            .map_err(|e| ChatError::InvalidRequest(format!("unserializable request: {e}")))?;

        let response = self
            .transport
            .send_stream(&self.completions_url, &self.headers, Bytes::from(body))
            .await?;

        let status = response.status();
        if status != http::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Server {
                status: status.as_u16(),
                body,
            });
        }

        dispatcher.opened();
        tracing::debug!(model = %self.config.model, "stream opened");

        let mut byte_stream = response.bytes_stream();
        let mut reader = LineReader::new();
        let mut lines: Vec<String> = Vec::with_capacity(8);
        let mut chunk_count = 0_u64;

        while let Some(next) = byte_stream.next().await {
            let chunk = next.map_err(|e| ChatError::Transport(e.to_string()))?;
            reader.feed_into(&chunk, &mut lines);
            for line in lines.drain(..) {
                if let Some(event) = classify_line(&line) {
                    chunk_count += 1;
                    dispatcher.dispatch(event)?;
                }
            }
        }

        reader.finish();
        tracing::debug!(events = chunk_count, "stream closed");
        Ok(())
    }

    /// List model ids offered by the upstream, sorted.
    ///
    /// Tries `{base}/v1/models` first (when the base does not already end in
    /// `/v1`) and falls back to `{base}/models`.
    ///
    /// # Errors
    ///
    /// Returns the last candidate's error when every candidate fails.
    pub async fn fetch_models(&self) -> Result<Vec<String>, ChatError> {
        let mut last_err: Option<ChatError> = None;
        for candidate in self.model_urls()? {
            match self.try_fetch_models(&candidate).await {
                Ok(models) => return Ok(models),
                Err(err) => {
                    tracing::debug!(url = %candidate, error = %err, "model listing candidate failed");
                    last_err = Some(err);
                }
            }
        }
        Err(last_err
            .unwrap_or_else(|| ChatError::Transport("no model endpoint candidates".to_string())))
    }

    async fn try_fetch_models(&self, url: &url::Url) -> Result<Vec<String>, ChatError> {
        let response = self.transport.send_get(url, &self.headers).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Server {
                status: status.as_u16(),
                body,
            });
        }
        let body = response.text().await.unwrap_or_default();
        let listing: ModelsResponse = serde_json::from_str(&body)
            .map_err(|e| ChatError::Transport(format!("malformed model listing: {e}")))?;
        let mut ids: Vec<String> = listing.data.into_iter().map(|entry| entry.id).collect();
        ids.sort_unstable();
        Ok(ids)
    }

    /// Probe the upstream with the configured credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Server`] on a non-success status and
    /// [`ChatError::Transport`] when the endpoint is unreachable.
    pub async fn test_connection(&self) -> Result<(), ChatError> {
        let url = url::Url::parse(&format!("{}/models", self.base_endpoint))
            .map_err(|e| ChatError::Config(format!("invalid api_endpoint: {e}")))?;
        let response = self.transport.send_get(&url, &self.headers).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(ChatError::Server {
            status: status.as_u16(),
            body,
        })
    }

    fn model_urls(&self) -> Result<SmallVec<[url::Url; 2]>, ChatError> {
        let mut candidates: SmallVec<[String; 2]> = SmallVec::new();
        if !self.base_endpoint.ends_with("/v1") {
            candidates.push(format!("{}/v1/models", self.base_endpoint));
        }
        candidates.push(format!("{}/models", self.base_endpoint));

        let mut urls = SmallVec::new();
        for candidate in candidates {
            let url = url::Url::parse(&candidate)
                .map_err(|e| ChatError::Config(format!("invalid api_endpoint: {e}")))?;
            urls.push(url);
        }
        Ok(urls)
    }
}

/// Clean the configured endpoint: trim whitespace, drop trailing slashes, and
/// strip an explicit `/chat/completions` suffix back to the base.
fn normalize_endpoint(endpoint: &str) -> String {
    let clean = endpoint.trim().trim_end_matches('/');
    clean
        .strip_suffix("/chat/completions")
        .unwrap_or(clean)
        .to_string()
}

/// Completions URL for a cleaned base endpoint.
fn completions_endpoint(base: &str) -> String {
    format!("{base}/chat/completions")
}
