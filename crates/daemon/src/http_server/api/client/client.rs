use reqwest::{header::HeaderMap, header::HeaderValue, Client};
use url::Url;

use super::error::ApiError;
use super::ApiRequest;
use crate::http_server::extract::{PRINCIPAL_ID_HEADER, PRINCIPAL_NAME_HEADER, PRINCIPAL_ROLE_HEADER};
use crate::principal::Principal;

#[derive(Debug, Clone)]
pub struct ApiClient {
    pub remote: Url,
    client: Client,
}

impl ApiClient {
    pub fn new(remote: &Url) -> Result<Self, ApiError> {
        Self::build(remote, HeaderMap::new())
    }

    /// A client that presents itself as `principal` on every request, the
    /// way the authenticating proxy would.
    pub fn with_principal(remote: &Url, principal: &Principal) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        for (name, value) in [
            (PRINCIPAL_ID_HEADER, principal.id.as_str()),
            (PRINCIPAL_NAME_HEADER, principal.display_name.as_str()),
            (PRINCIPAL_ROLE_HEADER, principal.role.as_str()),
        ] {
            let value = HeaderValue::from_str(value).map_err(|e| {
                ApiError::HttpStatus(reqwest::StatusCode::BAD_REQUEST, e.to_string())
            })?;
            headers.insert(name, value);
        }
        Self::build(remote, headers)
    }

    fn build(remote: &Url, default_headers: HeaderMap) -> Result<Self, ApiError> {
        let client = Client::builder().default_headers(default_headers).build()?;

        Ok(Self {
            remote: remote.clone(),
            client,
        })
    }

    pub async fn call<T: ApiRequest>(&mut self, request: T) -> Result<T::Response, ApiError> {
        let request_builder = request.build_request(&self.remote, &self.client);
        let response = request_builder.send().await?;

        if response.status().is_success() {
            Ok(response.json::<T::Response>().await?)
        } else {
            let status = response.status();
            Err(ApiError::from_status(status, response.text().await?))
        }
    }

    /// Get the base URL for API requests
    pub fn base_url(&self) -> &Url {
        &self.remote
    }

    /// Get the underlying HTTP client for custom requests
    pub fn http_client(&self) -> &Client {
        &self.client
    }
}
