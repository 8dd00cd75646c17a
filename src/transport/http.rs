use crate::request::{Body, RequestDescriptor};
use crate::types::{FailureKind, TaskInfo, TransportFailure};
use bytes::{Bytes, BytesMut};
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use reqwest::Proxy;
use std::env;
use std::time::Instant;

/// Transport settings applied to every handle of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportConfig {
    pub proxy_url: Option<String>,
    /// 0 leaves redirects unfollowed.
    pub max_redirects: usize,
    /// Stored bodies are cut at this many bytes.
    pub max_response_bytes: Option<u64>,
}

impl TransportConfig {
    /// Defaults overridden by `MULTI_HTTP_*` environment variables.
    pub fn from_env() -> Self {
        Self {
            proxy_url: env::var("MULTI_HTTP_PROXY_URL").ok().filter(|s| !s.is_empty()),
            max_redirects: env::var("MULTI_HTTP_MAX_REDIRECTS")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(0),
            max_response_bytes: env::var("MULTI_HTTP_MAX_RESPONSE_BYTES")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|n| *n > 0),
        }
    }
}

/// Turns descriptors into reqwest requests and runs single transfers.
///
/// Every handle gets its own client: connect timeouts are a client setting, and
/// nothing is pooled from one execution to the next.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    config: TransportConfig,
    proxy: Option<Proxy>,
}

impl HttpTransport {
    pub fn new(config: TransportConfig) -> Self {
        let proxy = config
            .proxy_url
            .as_deref()
            .and_then(|url| match Proxy::all(url) {
                Ok(p) => Some(p),
                Err(e) => {
                    tracing::warn!(proxy = url, error = %e, "ignoring invalid proxy url");
                    None
                }
            });
        Self { config, proxy }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Build the client and request for one descriptor.
    pub fn prepare(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<(reqwest::Client, reqwest::Request), TransportError> {
        let redirect = match self.config.max_redirects {
            0 => Policy::none(),
            n => Policy::limited(n),
        };
        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .redirect(redirect);
        if let Some(t) = descriptor.connect_timeout() {
            builder = builder.connect_timeout(t);
        }
        // proxying is only ever configured explicitly, never from HTTP_PROXY & co
        builder = match &self.proxy {
            Some(proxy) => builder.proxy(proxy.clone()),
            None => builder.no_proxy(),
        };
        let client = builder.build()?;

        let mut headers = descriptor.headers.clone();
        let mut req = client.request(descriptor.method.into(), descriptor.url.as_str());
        match &descriptor.body {
            Body::Empty => req = req.headers(headers),
            Body::Text(text) => req = req.headers(headers).body(text.clone()),
            Body::Multipart(parts) => {
                // the encoder supplies its own content type carrying the boundary
                headers.remove(CONTENT_TYPE);
                let form = parts
                    .iter()
                    .fold(reqwest::multipart::Form::new(), |form, (k, v)| {
                        form.text(k.clone(), v.clone())
                    });
                req = req.headers(headers).multipart(form);
            }
        }
        if let Some(t) = descriptor.timeout() {
            req = req.timeout(t);
        }
        let request = req.build()?;
        Ok((client, request))
    }

    /// Run one transfer to completion, filling `info` as the response arrives.
    pub async fn transfer(
        &self,
        client: &reqwest::Client,
        request: reqwest::Request,
        info: &mut TaskInfo,
        started: Instant,
    ) -> Result<Bytes, TransportError> {
        let mut resp = client.execute(request).await?;
        info.starttransfer_time = started.elapsed().as_secs_f64();
        info.status = Some(resp.status().as_u16());
        info.effective_url = resp.url().to_string();
        info.http_version = Some(format!("{:?}", resp.version()));
        info.remote_addr = resp.remote_addr();
        info.content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        info.headers = resp
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();

        let limit = self.config.max_response_bytes;
        let mut body = BytesMut::new();
        while let Some(chunk) = resp.chunk().await? {
            info.size_download += chunk.len() as u64;
            match limit {
                Some(max) if body.len() as u64 + chunk.len() as u64 > max => {
                    let room = (max as usize).saturating_sub(body.len());
                    body.extend_from_slice(&chunk[..room]);
                    info.truncated = true;
                    break;
                }
                _ => body.extend_from_slice(&chunk),
            }
        }
        Ok(body.freeze())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    pub fn kind(&self) -> FailureKind {
        match self {
            TransportError::Http(e) if e.is_timeout() => FailureKind::Timeout,
            TransportError::Http(e) if e.is_connect() => FailureKind::Connect,
            TransportError::Http(e) if e.is_redirect() => FailureKind::Redirect,
            TransportError::Http(e) if e.is_builder() => FailureKind::Builder,
            TransportError::Http(e) if e.is_body() => FailureKind::Body,
            TransportError::Http(e) if e.is_decode() => FailureKind::Decode,
            TransportError::Http(e) if e.is_request() => FailureKind::Request,
            _ => FailureKind::Other,
        }
    }

    pub fn to_failure(&self) -> TransportFailure {
        TransportFailure {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}
