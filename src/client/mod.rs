//! The network client: request dispatch and typed JSON decoding.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::{NetworkConfig, NetworkConfigBuilder};
use crate::dispatch::CallbackContext;
use crate::download::{DownloadCoordinator, DownloadHandle};
use crate::errors::{NetworkError, NetworkResult};
use crate::request::{self, Authorization, HttpMethod, Parameters};
use crate::status::HttpStatus;
use crate::transport::{HttpTransport, ReqwestTransport};

/// Async HTTP convenience client.
///
/// Each request is a single attempt with a fixed timeout and resolves to
/// exactly one result: the raw response bytes on HTTP 200, or a classified
/// [`NetworkError`] otherwise. Cloning is cheap; clones share the transport,
/// the download coordinator and the callback context.
///
/// Construct explicit client values and pass them where needed;
/// [`NetworkClient::with_defaults`] is the convenience constructor for the
/// common single-client case.
#[derive(Clone)]
pub struct NetworkClient {
    config: NetworkConfig,
    transport: Arc<dyn HttpTransport>,
    callbacks: CallbackContext,
    downloads: Arc<DownloadCoordinator>,
}

impl NetworkClient {
    /// Creates a client with the given configuration and the default
    /// transport.
    pub fn new(config: NetworkConfig) -> NetworkResult<Self> {
        config.validate()?;
        let transport = Arc::new(ReqwestTransport::new(&config).map_err(|e| {
            NetworkError::configuration(format!("failed to create transport: {e}"))
        })?);
        Ok(Self::with_transport(config, transport))
    }

    /// Creates a client with default configuration.
    pub fn with_defaults() -> NetworkResult<Self> {
        Self::new(NetworkConfig::default())
    }

    /// Creates a client over a custom transport.
    pub fn with_transport(config: NetworkConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let callbacks = CallbackContext::new();
        let downloads = Arc::new(DownloadCoordinator::new(
            Arc::clone(&transport),
            callbacks.clone(),
        ));
        Self {
            config,
            transport,
            callbacks,
            downloads,
        }
    }

    /// Creates a new client builder.
    pub fn builder() -> NetworkClientBuilder {
        NetworkClientBuilder::new()
    }

    /// The client configuration.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// The download coordinator shared by this client.
    pub fn downloads(&self) -> &Arc<DownloadCoordinator> {
        &self.downloads
    }

    /// Starts building a GET request.
    pub fn get(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(HttpMethod::Get, url)
    }

    /// Starts building a POST request.
    pub fn post(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(HttpMethod::Post, url)
    }

    /// Starts building a DELETE request.
    pub fn delete(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(HttpMethod::Delete, url)
    }

    /// Starts building a request with an explicit method.
    pub fn request(&self, method: HttpMethod, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder {
            client: self.clone(),
            method,
            url: url.into(),
            authorization: None,
            parameters: None,
            timeout: None,
        }
    }

    /// Builds, encodes and dispatches a request, classifying the response.
    ///
    /// Status exactly 200 resolves to the raw body; any other status logs
    /// the body (UTF-8 text when decodable, hex dump otherwise — diagnostic
    /// only) and resolves to [`NetworkError::HttpServerSide`].
    async fn dispatch(
        &self,
        method: HttpMethod,
        url: &str,
        authorization: Option<&Authorization>,
        parameters: Option<&Parameters>,
        timeout: Option<Duration>,
    ) -> NetworkResult<Bytes> {
        let timeout = timeout.unwrap_or(self.config.timeout);
        let mut descriptor = request::build(url, method, timeout, authorization)?;
        if let Some(parameters) = parameters {
            request::encode_parameters(&mut descriptor, parameters)?;
        }

        let response = self.transport.send(descriptor).await?;
        let status = HttpStatus::from_code(response.status);
        if status.is_success() {
            Ok(response.body)
        } else {
            log_error_body(&response.body);
            Err(NetworkError::HttpServerSide {
                body: response.body,
                status,
            })
        }
    }
}

impl std::fmt::Debug for NetworkClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkClient")
            .field("config", &self.config)
            .finish()
    }
}

/// Logs a server-side error body for diagnosis. Best effort only; never
/// affects result delivery.
fn log_error_body(body: &Bytes) {
    match std::str::from_utf8(body) {
        Ok(text) => debug!(body = %text, "server-side error response body"),
        Err(_) => debug!(body_hex = %hex::encode(body), "server-side error response body"),
    }
}

/// Fluent request builder.
///
/// Terminal methods come in two forms with identical classification
/// semantics: the async form ([`send`](RequestBuilder::send),
/// [`object`](RequestBuilder::object)) resolves on the awaiting task and
/// cancels the underlying transfer if the future is dropped; the callback
/// form ([`send_with`](RequestBuilder::send_with),
/// [`object_with`](RequestBuilder::object_with)) runs the handler exactly
/// once on the client's callback context.
#[derive(Debug)]
pub struct RequestBuilder {
    client: NetworkClient,
    method: HttpMethod,
    url: String,
    authorization: Option<Authorization>,
    parameters: Option<Parameters>,
    timeout: Option<Duration>,
}

impl RequestBuilder {
    /// Sets the authorization.
    pub fn authorization(mut self, authorization: Authorization) -> Self {
        self.authorization = Some(authorization);
        self
    }

    /// Sets bearer-token authorization.
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.authorization = Some(Authorization::BearerToken(Some(token.into())));
        self
    }

    /// Sets the request parameters.
    pub fn parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Overrides the client's default timeout for this request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sends the request and resolves to the raw response bytes.
    pub async fn send(self) -> NetworkResult<Bytes> {
        self.client
            .dispatch(
                self.method,
                &self.url,
                self.authorization.as_ref(),
                self.parameters.as_ref(),
                self.timeout,
            )
            .await
    }

    /// Sends the request and decodes the success body into `T`.
    ///
    /// A body that fails to decode resolves to
    /// [`NetworkError::JsonFormat`]; every other classification passes
    /// through unchanged from [`send`](RequestBuilder::send).
    pub async fn object<T: DeserializeOwned>(self) -> NetworkResult<T> {
        let bytes = self.send().await?;
        serde_json::from_slice(&bytes).map_err(|e| NetworkError::JsonFormat {
            message: e.to_string(),
        })
    }

    /// Sends the request, delivering the result to `handler` on the
    /// client's callback context.
    ///
    /// Must be called within a Tokio runtime. The handler runs exactly
    /// once, for success and for every failure kind alike.
    pub fn send_with<F>(self, handler: F)
    where
        F: FnOnce(NetworkResult<Bytes>) + Send + 'static,
    {
        let callbacks = self.client.callbacks.clone();
        tokio::spawn(async move {
            let result = self.send().await;
            callbacks.post(move || handler(result));
        });
    }

    /// Sends the request and decodes the success body, delivering the
    /// result to `handler` on the client's callback context.
    pub fn object_with<T, F>(self, handler: F)
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(NetworkResult<T>) + Send + 'static,
    {
        let callbacks = self.client.callbacks.clone();
        tokio::spawn(async move {
            let result = self.object::<T>().await;
            callbacks.post(move || handler(result));
        });
    }

    /// Downloads the response body, resolving to the full accumulated
    /// buffer. `progress` receives fractions in `[0, 1]` on the callback
    /// context; it is never invoked when the expected length is unknown.
    pub async fn download<P>(self, progress: P) -> NetworkResult<Bytes>
    where
        P: Fn(f64) + Send + Sync + 'static,
    {
        let descriptor = self.descriptor()?;
        self.client.downloads.download(descriptor, progress).await
    }

    /// Begins a cancellable download with callback delivery.
    ///
    /// A descriptor that fails to build (bad URL, unserializable POST
    /// parameters) still delivers exactly one completion, with the failure,
    /// and no transfer is started.
    pub fn download_with<P, C>(self, progress: P, completion: C) -> Option<DownloadHandle>
    where
        P: Fn(f64) + Send + Sync + 'static,
        C: FnOnce(NetworkResult<Bytes>) + Send + 'static,
    {
        let callbacks = self.client.callbacks.clone();
        match self.descriptor() {
            Ok(descriptor) => Some(self.client.downloads.begin(descriptor, progress, completion)),
            Err(e) => {
                callbacks.post(move || completion(Err(e)));
                None
            }
        }
    }

    fn descriptor(&self) -> NetworkResult<crate::request::RequestDescriptor> {
        let timeout = self.timeout.unwrap_or(self.client.config.timeout);
        let mut descriptor =
            request::build(&self.url, self.method, timeout, self.authorization.as_ref())?;
        if let Some(parameters) = &self.parameters {
            request::encode_parameters(&mut descriptor, parameters)?;
        }
        Ok(descriptor)
    }
}

/// Builder for [`NetworkClient`].
pub struct NetworkClientBuilder {
    config_builder: NetworkConfigBuilder,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl NetworkClientBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            config_builder: NetworkConfigBuilder::new(),
            transport: None,
        }
    }

    /// Sets the default request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config_builder = self.config_builder.timeout(timeout);
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config_builder = self.config_builder.connect_timeout(timeout);
        self
    }

    /// Sets the user agent string.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.user_agent(ua);
        self
    }

    /// Sets a custom transport.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds the client.
    pub fn build(self) -> NetworkResult<NetworkClient> {
        let config = self.config_builder.build()?;
        match self.transport {
            Some(transport) => Ok(NetworkClient::with_transport(config, transport)),
            None => NetworkClient::new(config),
        }
    }
}

impl Default for NetworkClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
