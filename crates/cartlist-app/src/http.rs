//! HTTP adapter for the collection endpoint.

use std::time::Duration;

use anyhow::{Context, Result};
use cartlist_core::{Item, ItemId, ItemPatch, NewItem, UpdateRequest};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::RemoteConfig;
use crate::error::{FailureKind, SyncError};
use crate::remote::{Operation, RemoteItems};
use crate::session::Session;

const MAX_ERROR_BODY_CHARS: usize = 200;

/// Remote collection reached over HTTP.
///
/// `GET` lists, `POST` creates, `PUT` updates and `DELETE ?id=` deletes, all
/// against one endpoint. A bearer token is attached whenever the session
/// holds one.
pub struct HttpRemote {
    client: Client,
    endpoint: Url,
    session: Session,
}

impl HttpRemote {
    /// Build an adapter with its own client.
    ///
    /// # Errors
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn new(endpoint: Url, timeout: Duration, session: Session) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self::with_client(client, endpoint, session))
    }

    /// Build an adapter from the `[remote]` configuration block.
    ///
    /// # Errors
    /// Returns an error when the endpoint is invalid or the client cannot be built.
    pub fn from_config(config: &RemoteConfig, session: Session) -> Result<Self> {
        Self::new(config.endpoint_url()?, config.timeout(), session)
    }

    /// Build an adapter around an existing client.
    #[must_use]
    pub const fn with_client(client: Client, endpoint: Url, session: Session) -> Self {
        Self {
            client,
            endpoint,
            session,
        }
    }

    /// Collection endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match self.session.bearer() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn delete_url(&self, id: &ItemId) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("id", id.as_str());
        url
    }

    async fn execute(&self, operation: Operation, builder: RequestBuilder) -> Result<Response, SyncError> {
        debug!(%operation, "sending request");
        let response = builder.send().await.map_err(|err| {
            warn!(%operation, error = %err, "request failed");
            SyncError::transport(operation, describe(&err))
        })?;

        let status = response.status();
        let Some(kind) = classify_status(status) else {
            return Ok(response);
        };
        let body = response.text().await.unwrap_or_default();
        let detail: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
        warn!(%operation, status = status.as_u16(), "remote rejected request");
        Err(SyncError::from_kind(
            kind,
            operation,
            format!("HTTP {}: {detail}", status.as_u16()),
        ))
    }

    async fn decode<T: DeserializeOwned>(operation: Operation, response: Response) -> Result<T, SyncError> {
        response
            .json::<T>()
            .await
            .map_err(|err| SyncError::transport(operation, format!("unexpected response body: {err}")))
    }
}

impl RemoteItems for HttpRemote {
    async fn list(&self) -> Result<Vec<Item>, SyncError> {
        let builder = self.request(Method::GET, self.endpoint.clone());
        let response = self.execute(Operation::List, builder).await?;
        Self::decode(Operation::List, response).await
    }

    async fn create(&self, item: &NewItem) -> Result<Item, SyncError> {
        let builder = self.request(Method::POST, self.endpoint.clone()).json(item);
        let response = self.execute(Operation::Create, builder).await?;
        Self::decode(Operation::Create, response).await
    }

    async fn update(&self, id: &ItemId, patch: &ItemPatch) -> Result<Item, SyncError> {
        let body = UpdateRequest {
            item_id: id.clone(),
            updates: patch.clone(),
        };
        let builder = self.request(Method::PUT, self.endpoint.clone()).json(&body);
        let response = self.execute(Operation::Update, builder).await?;
        Self::decode(Operation::Update, response).await
    }

    async fn delete(&self, id: &ItemId) -> Result<(), SyncError> {
        let builder = self.request(Method::DELETE, self.delete_url(id));
        self.execute(Operation::Delete, builder).await.map(drop)
    }
}

/// Map a response status onto a failure class; `None` means success.
#[must_use]
pub fn classify_status(status: StatusCode) -> Option<FailureKind> {
    if status.is_success() {
        None
    } else if status == StatusCode::UNAUTHORIZED {
        Some(FailureKind::Auth)
    } else {
        Some(FailureKind::Transport)
    }
}

fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("timeout: {err}")
    } else if err.is_connect() {
        format!("connection error: {err}")
    } else {
        err.to_string()
    }
}
