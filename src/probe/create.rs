//! Resource creation with transient-500 retry and content-type diagnosis.
//!
//! ```text
//! Attempt --500--> Retry --2xx--> Resolved(Recovered)
//!    |               |
//!    |               +--else--> Diagnose --2xx--> Resolved(ContentTypeRejection)
//!    |                              |
//!    |                              +--else--> Resolved(ServerError)
//!    +--other--> Resolved(Response)
//! ```
//!
//! The retry re-sends the request unchanged after a delay. The diagnostic
//! attempt sends `Content-Type: application/json`; a resource it creates is
//! registered and then deleted straight away.

use log::{debug, info, warn};
use serde_json::Value;
use std::time::Duration;

use super::registry::CreationRegistry;
use crate::client::{
    Headers, HttpMethod, JSON_CONTENT_TYPE, ScimClient, ScimResponse, ScimTransport, item_path,
};
use crate::error::ClientError;
use crate::schema::ResourceKind;

#[derive(Debug, Clone, PartialEq)]
pub enum CreateState {
    Attempt,
    Retry { first: ScimResponse },
    Diagnose { first: ScimResponse },
    Resolved(CreateOutcome),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    /// The first attempt got a response other than 500
    Response(ScimResponse),
    /// The first attempt got 500, the retry succeeded
    Recovered { retried: ScimResponse },
    /// Both conformant attempts got 500 but `application/json` was accepted
    ContentTypeRejection {
        diagnostic_id: Option<String>,
        /// The diagnostic resource was deleted again
        deleted: bool,
    },
    /// 500 on every attempt
    ServerError(ScimResponse),
    ClientFailure(ClientError),
}

fn created(response: &ScimResponse) -> bool {
    matches!(response.status, 200 | 201)
}

/// One resource-creating POST.
pub struct CreateAttempt<'a, T> {
    client: &'a ScimClient<T>,
    kind: ResourceKind,
    payload: &'a Value,
    retry_delay: Duration,
}

impl<'a, T: ScimTransport> CreateAttempt<'a, T> {
    pub fn new(
        client: &'a ScimClient<T>,
        kind: ResourceKind,
        payload: &'a Value,
        retry_delay: Duration,
    ) -> Self {
        Self {
            client,
            kind,
            payload,
            retry_delay,
        }
    }

    /// Drive the state machine to its resolution.
    pub async fn run(&self, registry: &mut CreationRegistry) -> CreateOutcome {
        let mut state = CreateState::Attempt;
        loop {
            state = match state {
                CreateState::Resolved(outcome) => return outcome,
                state => self.advance(state, registry).await,
            };
        }
    }

    /// Perform the transition out of `state`.
    pub async fn advance(&self, state: CreateState, registry: &mut CreationRegistry) -> CreateState {
        let endpoint = self.kind.endpoint();
        match state {
            CreateState::Attempt => match self.client.post(endpoint, self.payload).await {
                Ok(response) if response.status == 500 => CreateState::Retry { first: response },
                Ok(response) => CreateState::Resolved(CreateOutcome::Response(response)),
                Err(error) => CreateState::Resolved(CreateOutcome::ClientFailure(error)),
            },
            CreateState::Retry { first } => {
                warn!(
                    "POST {} returned 500, retrying in {:.1}s",
                    endpoint,
                    self.retry_delay.as_secs_f64()
                );
                tokio::time::sleep(self.retry_delay).await;
                match self.client.post(endpoint, self.payload).await {
                    Ok(retried) if created(&retried) => {
                        CreateState::Resolved(CreateOutcome::Recovered { retried })
                    }
                    Ok(retried) => {
                        debug!("POST {} retry returned {}", endpoint, retried.status);
                        CreateState::Diagnose { first }
                    }
                    Err(error) => {
                        debug!("POST {} retry failed: {}", endpoint, error);
                        CreateState::Diagnose { first }
                    }
                }
            }
            CreateState::Diagnose { first } => self.diagnose(first, registry).await,
            resolved @ CreateState::Resolved(_) => resolved,
        }
    }

    async fn diagnose(&self, first: ScimResponse, registry: &mut CreationRegistry) -> CreateState {
        let endpoint = self.kind.endpoint();
        let headers = Headers::new().with("Content-Type", JSON_CONTENT_TYPE);
        let response = match self
            .client
            .execute(HttpMethod::Post, endpoint, Some(self.payload), Some(&headers))
            .await
        {
            Ok(response) if created(&response) => response,
            _ => return CreateState::Resolved(CreateOutcome::ServerError(first)),
        };

        info!(
            "POST {} accepted with {} after rejecting the SCIM content type",
            endpoint, JSON_CONTENT_TYPE
        );

        let Some(id) = response.resource_id() else {
            return CreateState::Resolved(CreateOutcome::ContentTypeRejection {
                diagnostic_id: None,
                deleted: false,
            });
        };
        registry.record(self.kind, id.clone());

        let path = item_path(endpoint, &id);
        let deleted = match self.client.delete(&path).await {
            Ok(response) if response.is_success() || response.status == 404 => {
                registry.confirm_deleted(self.kind, &id);
                true
            }
            Ok(response) => {
                warn!("Diagnostic resource {} not deleted ({}), left for cleanup", path, response.status);
                false
            }
            Err(error) => {
                warn!("Diagnostic resource {} not deleted: {}", path, error);
                false
            }
        };

        CreateState::Resolved(CreateOutcome::ContentTypeRejection {
            diagnostic_id: Some(id),
            deleted,
        })
    }
}
