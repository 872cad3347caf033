use super::{Config, StoreError};
use crate::APP_USER_AGENT;
use reqwest::{Client, Response};
use secrecy::ExposeSecret;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, error, instrument};

#[derive(Deserialize, Debug)]
struct QueryResponse<T> {
    result: T,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MutationResponse {
    #[serde(default)]
    pub transaction_id: String,
    #[serde(default)]
    pub document_ids: Vec<String>,
}

/// HTTP client for the query and mutate endpoints of one dataset.
#[derive(Clone)]
pub struct SanityClient {
    http: Client,
    config: Config,
}

impl SanityClient {
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self, StoreError> {
        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(config.timeout())
            .build()?;

        Ok(Self { http, config })
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Run a GROQ query and decode its `result`.
    ///
    /// # Errors
    /// Returns an error on transport failure, a non-success status or an
    /// undecodable body.
    #[instrument(skip(self))]
    pub async fn fetch<T: DeserializeOwned>(&self, query: &str) -> Result<T, StoreError> {
        let url = self.config.query_url(query)?;

        let response = self
            .http
            .get(url)
            .bearer_auth(self.config.token().expose_secret())
            .send()
            .await?;

        let body = success_body(response).await?;
        let decoded: QueryResponse<T> = serde_json::from_str(&body)?;

        Ok(decoded.result)
    }

    /// Start a patch against document `id`; nothing is sent until `commit`.
    #[must_use]
    pub fn patch(&self, id: &str) -> Patch<'_> {
        Patch {
            client: self,
            id: id.to_string(),
            set: Map::new(),
        }
    }

    /// # Errors
    /// Returns an error if the store rejects the deletion.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<MutationResponse, StoreError> {
        self.mutate(vec![json!({ "delete": { "id": id } })]).await
    }

    async fn mutate(&self, mutations: Vec<Value>) -> Result<MutationResponse, StoreError> {
        let url = self.config.mutate_url()?;

        let response = self
            .http
            .post(url)
            .bearer_auth(self.config.token().expose_secret())
            .json(&json!({ "mutations": mutations }))
            .send()
            .await?;

        let body = success_body(response).await?;
        let decoded: MutationResponse = serde_json::from_str(&body)?;

        debug!("transaction {} committed", decoded.transaction_id);

        Ok(decoded)
    }
}

impl std::fmt::Debug for SanityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SanityClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Pending `set` patch for a single document.
#[derive(Debug)]
pub struct Patch<'a> {
    client: &'a SanityClient,
    id: String,
    set: Map<String, Value>,
}

impl Patch<'_> {
    /// Merge `fields` into the attributes to set. Non-object values are ignored.
    #[must_use]
    pub fn set(mut self, fields: Value) -> Self {
        if let Value::Object(fields) = fields {
            self.set.extend(fields);
        }
        self
    }

    /// # Errors
    /// Returns an error if the store rejects the patch.
    #[instrument(skip(self))]
    pub async fn commit(self) -> Result<MutationResponse, StoreError> {
        if self.set.is_empty() {
            return Err(StoreError::InvalidConfig(format!(
                "empty patch for document {}",
                self.id
            )));
        }

        self.client
            .mutate(vec![json!({ "patch": { "id": self.id, "set": self.set } })])
            .await
    }
}

async fn success_body(response: Response) -> Result<String, StoreError> {
    let status = response.status();
    let body = response.text().await?;

    if status.is_success() {
        return Ok(body);
    }

    let message = error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    });

    error!("document store error {}: {}", status, message);

    Err(StoreError::Status { status, message })
}

/// Sanity reports errors either as `{"error": {"description": ...}}` or as
/// `{"error": "...", "message": "..."}`.
fn error_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;

    json["error"]["description"]
        .as_str()
        .or_else(|| json["message"].as_str())
        .or_else(|| json["error"].as_str())
        .map(str::to_string)
}
