//! Registrar wire format.
//!
//! After a push subscription is renewed the worker reports the new endpoint
//! with `POST /register` and a JSON body `{"endpoint": "..."}`.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::NetworkError;
use crate::platform::HttpClient;

/// Default registrar path
pub const REGISTER_PATH: &str = "/register";

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Body of the registrar request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub endpoint: String,
}

/// Minimal outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: &'static str,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Client for the remote registrar.
pub struct Registrar {
    client: Rc<dyn HttpClient>,
    path: String,
}

impl Registrar {
    pub fn new(client: Rc<dyn HttpClient>, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn build_request(&self, endpoint: &str) -> Result<HttpRequest, NetworkError> {
        let body = serde_json::to_vec(&RegisterRequest {
            endpoint: endpoint.to_string(),
        })
        .map_err(|e| NetworkError::Encode(e.to_string()))?;

        Ok(HttpRequest {
            method: "POST",
            path: self.path.clone(),
            headers: vec![(String::from("Content-Type"), String::from(JSON_CONTENT_TYPE))],
            body,
        })
    }

    /// Report `endpoint`. A non-2xx answer is an error.
    pub async fn register_endpoint(&self, endpoint: &str) -> Result<(), NetworkError> {
        let request = self.build_request(endpoint)?;
        let response = self.client.send(request).await?;
        if !response.is_success() {
            return Err(NetworkError::Status {
                status: response.status,
            });
        }
        Ok(())
    }
}
