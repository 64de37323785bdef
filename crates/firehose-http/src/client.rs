//! Streaming HTTP transport backed by `reqwest`.
//!
//! One `open_subscription` call is one long-lived POST:
//! - the form body carries `track=<comma-joined keywords>`
//! - a non-2xx status fails the attempt (420/429 as `RateLimited`)
//! - the body is read line by line and fed to the listener until it halts
//! - silence longer than the stall timeout, or the server closing the
//!   body, fails the attempt so the connection re-opens it

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, info};

use firehose_core::{KeywordSet, StreamTransport, SubscriptionListener, TransportError};

use crate::config::HttpStreamConfig;
use crate::framing::LineFramer;

/// HTTP status codes the endpoint uses to throttle clients.
const RATE_LIMIT_STATUSES: [u16; 2] = [420, 429];

pub struct HttpStreamTransport {
    config: HttpStreamConfig,
    http: reqwest::Client,
}

impl HttpStreamTransport {
    pub fn new(config: HttpStreamConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &HttpStreamConfig {
        &self.config
    }

    fn request(&self, keywords: &KeywordSet) -> reqwest::RequestBuilder {
        let request = self
            .http
            .post(&self.config.endpoint)
            .form(&[("track", keywords.to_track_param())]);
        match &self.config.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl StreamTransport for HttpStreamTransport {
    async fn open_subscription(
        &self,
        keywords: &KeywordSet,
        listener: Arc<dyn SubscriptionListener>,
    ) -> Result<(), TransportError> {
        debug!(endpoint = %self.config.endpoint, keywords = %keywords, "opening filtered stream");

        let resp = self
            .request(keywords)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        let status = resp.status().as_u16();
        if RATE_LIMIT_STATUSES.contains(&status) {
            return Err(TransportError::RateLimited { code: status });
        }
        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Status { code: status, body });
        }

        info!(endpoint = %self.config.endpoint, "filtered stream open");
        if listener.on_connected().is_halt() {
            return Ok(());
        }

        let stall = self.config.stall_timeout();
        let mut body = resp.bytes_stream();
        let mut framer = LineFramer::new(self.config.max_line_bytes);
        loop {
            let chunk = match tokio::time::timeout(stall, body.next()).await {
                Err(_) => {
                    return Err(TransportError::Timeout {
                        ms: stall.as_millis() as u64,
                    })
                }
                Ok(None) => return Err(TransportError::Closed),
                Ok(Some(Err(e))) => return Err(TransportError::Http(e.to_string())),
                Ok(Some(Ok(chunk))) => chunk,
            };

            for line in framer.push(&chunk) {
                if listener.on_data(&line).is_halt() {
                    debug!(endpoint = %self.config.endpoint, "listener halted the stream");
                    return Ok(());
                }
            }
        }
    }

    fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}
