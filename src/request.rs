use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, IntoUrl, Method, Response};

use crate::errors::Error;
use crate::manager::TokenManager;

/// Per-request options for [`AuthenticatedClient::fetch`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
        }
    }
}

impl FetchOptions {
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Sends requests carrying the manager's current bearer token.
///
/// Responses are returned as they arrive; status codes are not inspected and
/// nothing is retried.
#[derive(Clone, Debug)]
pub struct AuthenticatedClient {
    manager: Arc<TokenManager>,
    http: Client,
}

impl AuthenticatedClient {
    pub fn new(manager: Arc<TokenManager>, http: Client) -> Self {
        Self { manager, http }
    }

    pub async fn fetch<U: IntoUrl>(&self, url: U, options: FetchOptions) -> Result<Response, Error> {
        let token = self.manager.get_valid_access_token().await?;
        let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| Error::InvalidHeader(format!("access token: {e}")))?;

        let FetchOptions {
            method,
            mut headers,
            query,
            body,
        } = options;
        headers.insert(AUTHORIZATION, bearer);

        let mut request = self.http.request(method, url).headers(headers);
        if !query.is_empty() {
            request = request.query(&query);
        }
        if let Some(body) = body {
            request = request.body(body);
        }
        Ok(request.send().await?)
    }

    pub async fn get<U: IntoUrl>(&self, url: U) -> Result<Response, Error> {
        self.fetch(url, FetchOptions::default()).await
    }
}
