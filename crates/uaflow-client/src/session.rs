//! A single connect → session → browse → close sequence.

use crate::client::ProtocolClient;
use crate::error::{BrowseError, BrowseStep, ClientError};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info};
use uaflow_core::{NodeId, ReferenceDescription};

/// Default bound on each step of a browse session.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(10);

/// What a browse session produced.
#[derive(Debug)]
pub struct BrowseOutcome {
    /// Every reference of every browse result, in the order received.
    pub items: Vec<ReferenceDescription>,
    /// Set when closing the session failed after the items were collected.
    pub close_error: Option<BrowseError>,
}

/// Owns one browse sequence against one endpoint.
///
/// Steps run strictly in order; the first failure among connect, open
/// session and browse aborts the rest. The session and connection are
/// dropped when `run` returns.
pub struct BrowseSession<C: ProtocolClient> {
    client: C,
    endpoint_url: String,
    step_timeout: Duration,
}

impl<C: ProtocolClient> BrowseSession<C> {
    pub fn new(client: C, endpoint_url: impl Into<String>) -> Self {
        Self {
            client,
            endpoint_url: endpoint_url.into(),
            step_timeout: DEFAULT_STEP_TIMEOUT,
        }
    }

    pub fn with_step_timeout(mut self, step_timeout: Duration) -> Self {
        self.step_timeout = step_timeout;
        self
    }

    pub async fn run(self, root: &NodeId) -> Result<BrowseOutcome, BrowseError> {
        let client = &self.client;

        info!("Starting browse client on {}", self.endpoint_url);
        let mut connection = self
            .step(BrowseStep::Connect, client.connect(&self.endpoint_url))
            .await?;

        let session = self
            .step(BrowseStep::OpenSession, client.open_session(&mut connection))
            .await?;
        debug!("Browse session open on {}", self.endpoint_url);

        debug!("Browsing from {}", root);
        let results = self
            .step(
                BrowseStep::Browse,
                client.browse(&mut connection, &session, root),
            )
            .await?;

        let items: Vec<_> = results
            .into_iter()
            .flat_map(|result| {
                if result.status_code.is_bad() {
                    debug!("Browse result status {}", result.status_code);
                }
                result.references
            })
            .collect();
        info!("Collected {} items from {}", items.len(), root);

        let close_error = self
            .step(
                BrowseStep::CloseSession,
                client.close_session(&mut connection, session),
            )
            .await
            .err();
        if let Some(e) = &close_error {
            error!("Session close failed on browse: {}", e);
        }

        Ok(BrowseOutcome { items, close_error })
    }

    async fn step<T, F>(&self, step: BrowseStep, fut: F) -> Result<T, BrowseError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        match timeout(self.step_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(BrowseError::new(step, e)),
            Err(_) => Err(BrowseError::new(
                step,
                ClientError::Timeout(self.step_timeout),
            )),
        }
    }
}
