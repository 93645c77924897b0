use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, RequestBuilder};
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::{
    batch::multipart_content_type,
    config::WalletConfig,
    credential::IssuerIdentity,
    error::{Result, WalletError},
    oauth::{build_token_assertion, token_request_form, AccessToken},
    object_store::{ObjectStore, ResourceKind},
    pass::PassType,
};

/// Object store reached over the wallet REST API.
///
/// The access token is fetched on first use and kept for the lifetime of the store.
pub struct RestObjectStore {
    http: reqwest::Client,
    config: WalletConfig,
    identity: IssuerIdentity,
    access_token: OnceCell<String>,
}

impl RestObjectStore {
    pub fn new(identity: IssuerIdentity, config: WalletConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            identity,
            access_token: OnceCell::new(),
        }
    }

    fn token_uri(&self) -> &str {
        self.identity
            .token_uri
            .as_deref()
            .unwrap_or(&self.config.token_uri)
    }

    async fn fetch_access_token(&self) -> Result<String> {
        let token_uri = self.token_uri();
        log::info!("Requesting access token for '{}' from {token_uri}", self.identity.subject);

        let assertion = build_token_assertion(
            &self.identity,
            &self.config.scope,
            token_uri,
            chrono::Utc::now(),
        )?;

        let request = self
            .http
            .post(token_uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(token_request_form(&assertion));

        let text = send(request).await?;
        let token: AccessToken = serde_json::from_str(&text)
            .map_err(|e| WalletError::Http(format!("failed to parse token response: {e}")))?;

        log::debug!("Access token obtained, expires in {:?}s", token.expires_in);

        Ok(token.access_token)
    }

    async fn access_token(&self) -> Result<&str> {
        let token = self
            .access_token
            .get_or_try_init(|| self.fetch_access_token())
            .await?;
        Ok(token.as_str())
    }

    fn resource_url(&self, kind: ResourceKind, pass_type: PassType) -> String {
        format!("{}/{}", self.config.api_base_url, kind.resource(pass_type))
    }
}

async fn send(request: RequestBuilder) -> Result<String> {
    let response = request
        .send()
        .await
        .map_err(|e| WalletError::Http(e.to_string()))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| WalletError::Http(e.to_string()))?;

    log::trace!("Response status: {status}, body: {text}");

    if !status.is_success() {
        return Err(WalletError::Api {
            status: status.as_u16(),
            body: text,
        });
    }

    Ok(text)
}

fn parse_json(text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text)
        .map_err(|e| WalletError::Http(format!("failed to parse JSON response: {e}. Response body: {text}")))
}

#[async_trait]
impl ObjectStore for RestObjectStore {
    async fn get(&self, kind: ResourceKind, pass_type: PassType, id: &str) -> Result<Option<Value>> {
        let url = format!("{}/{id}", self.resource_url(kind, pass_type));
        let token = self.access_token().await?;

        match send(self.http.get(url).bearer_auth(token)).await {
            Ok(text) => parse_json(&text).map(Some),
            Err(WalletError::Api { status: 404, .. }) => {
                log::debug!("{kind} {id} not found");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn insert(&self, kind: ResourceKind, pass_type: PassType, body: &Value) -> Result<Value> {
        let url = self.resource_url(kind, pass_type);
        let token = self.access_token().await?;

        let text = send(self.http.post(url).bearer_auth(token).json(body)).await?;
        log::info!("{kind} insert response: {text}");
        parse_json(&text)
    }

    async fn update(
        &self,
        kind: ResourceKind,
        pass_type: PassType,
        id: &str,
        body: &Value,
    ) -> Result<Value> {
        let url = format!("{}/{id}", self.resource_url(kind, pass_type));
        let token = self.access_token().await?;

        let text = send(self.http.put(url).bearer_auth(token).json(body)).await?;
        log::info!("{kind} update response: {text}");
        parse_json(&text)
    }

    async fn patch(
        &self,
        kind: ResourceKind,
        pass_type: PassType,
        id: &str,
        body: &Value,
    ) -> Result<Value> {
        let url = format!("{}/{id}", self.resource_url(kind, pass_type));
        let token = self.access_token().await?;

        let text = send(self.http.patch(url).bearer_auth(token).json(body)).await?;
        log::info!("{kind} patch response: {text}");
        parse_json(&text)
    }

    async fn add_message(
        &self,
        kind: ResourceKind,
        pass_type: PassType,
        id: &str,
        message: &Value,
    ) -> Result<Value> {
        let url = format!("{}/{id}/addMessage", self.resource_url(kind, pass_type));
        let token = self.access_token().await?;

        let body = serde_json::json!({ "message": message });
        let text = send(self.http.post(url).bearer_auth(token).json(&body)).await?;
        log::info!("{kind} addMessage response: {text}");
        parse_json(&text)
    }

    async fn batch(&self, boundary: &str, body: String) -> Result<String> {
        let token = self.access_token().await?;

        let request = self
            .http
            .post(&self.config.batch_url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, multipart_content_type(boundary))
            .body(body);

        let text = send(request).await?;
        log::info!("Batch insert response: {text}");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::tests::test_identity;

    #[test]
    fn urls_and_token_endpoint() {
        let mut config = WalletConfig::default();
        config.api_base_url = "http://localhost:9/v1".to_owned();
        config.token_uri = "http://localhost:9/token".to_owned();

        let store = RestObjectStore::new(test_identity(), config);

        assert_eq!(
            store.resource_url(ResourceKind::Object, PassType::Transit),
            "http://localhost:9/v1/transitObject"
        );
        assert_eq!(store.token_uri(), "http://localhost:9/token");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_http_error() {
        let mut config = WalletConfig::default();
        config.token_uri = "http://127.0.0.1:9/token".to_owned();
        let store = RestObjectStore::new(test_identity(), config);

        let err = store
            .get(ResourceKind::Class, PassType::Loyalty, "1.c")
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::Http(_)), "{err:?}");
    }
}
