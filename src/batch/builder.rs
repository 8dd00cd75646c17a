use super::controller::BatchController;
use crate::request::RequestBuilder;
use crate::transport::{HttpTransport, TransportConfig};
use crate::Result;

/// Builder for [`BatchController`].
///
/// Defaults come from the environment and are overridden by the setters:
/// - `MULTI_HTTP_USER_AGENT`
/// - `MULTI_HTTP_PROXY_URL`
/// - `MULTI_HTTP_MAX_REDIRECTS` (default 0, redirects are returned as-is)
/// - `MULTI_HTTP_MAX_RESPONSE_BYTES` (default unlimited)
#[derive(Debug, Clone)]
pub struct BatchControllerBuilder {
    user_agent: Option<String>,
    transport: TransportConfig,
}

impl BatchControllerBuilder {
    pub fn new() -> Self {
        Self {
            user_agent: std::env::var("MULTI_HTTP_USER_AGENT")
                .ok()
                .filter(|s| !s.is_empty()),
            transport: TransportConfig::from_env(),
        }
    }

    /// Client identifier sent with GET requests.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn proxy(mut self, url: impl Into<String>) -> Self {
        self.transport.proxy_url = Some(url.into());
        self
    }

    /// Ignore any proxy configured through the environment.
    pub fn without_proxy(mut self) -> Self {
        self.transport.proxy_url = None;
        self
    }

    pub fn max_redirects(mut self, n: usize) -> Self {
        self.transport.max_redirects = n;
        self
    }

    /// Cut stored response bodies at `n` bytes.
    pub fn max_response_bytes(mut self, n: u64) -> Self {
        self.transport.max_response_bytes = Some(n);
        self
    }

    pub fn transport_config(&self) -> &TransportConfig {
        &self.transport
    }

    /// Build the controller and open its event loop.
    pub fn build(self) -> Result<BatchController> {
        let builder = match self.user_agent.as_deref() {
            Some(ua) => RequestBuilder::with_user_agent(ua)?,
            None => RequestBuilder::new(),
        };
        BatchController::from_parts(builder, HttpTransport::new(self.transport))
    }
}

impl Default for BatchControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
