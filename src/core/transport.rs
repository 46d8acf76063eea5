/// HTTP transport for gRPC-Web calls

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::core::error::TransportError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn ok(body: Vec<u8>) -> Self {
        Self { status: 200, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// `POST(url, headers, body) -> status, body`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Connection {
                url: String::new(),
                message: format!("failed to create HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url;
        let mut builder = self.client.post(&url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let to_error = |e: reqwest::Error, url: &str| {
            if e.is_timeout() {
                TransportError::Timeout { url: url.to_string() }
            } else {
                TransportError::Connection {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        };

        let response = builder
            .body(request.body)
            .send()
            .await
            .map_err(|e| to_error(e, &url))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| to_error(e, &url))?;

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedTransport;
    use super::*;

    #[test]
    fn test_response_success_range() {
        assert!(HttpResponse::ok(vec![]).is_success());
        assert!(!HttpResponse { status: 503, body: vec![] }.is_success());
        assert!(!HttpResponse { status: 302, body: vec![] }.is_success());
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let request = HttpRequest {
            url: "https://example.invalid".to_string(),
            headers: vec![("Browser-Id".to_string(), "abc".to_string())],
            body: vec![],
        };
        assert_eq!(request.header("browser-id"), Some("abc"));
        assert_eq!(request.header("authorization"), None);
    }

    #[tokio::test]
    async fn test_scripted_transport_replays_in_order() {
        let transport = ScriptedTransport::new()
            .respond(Ok(HttpResponse::ok(vec![1])))
            .respond(Ok(HttpResponse::ok(vec![2])));

        let request = HttpRequest {
            url: "https://example.invalid/A".to_string(),
            headers: vec![],
            body: vec![],
        };
        assert_eq!(transport.post(request.clone()).await.unwrap().body, vec![1]);
        assert_eq!(transport.post(request.clone()).await.unwrap().body, vec![2]);
        assert!(transport.post(request).await.is_err());
        assert_eq!(transport.requests().len(), 3);
        assert_eq!(transport.remaining(), 0);
    }
}
