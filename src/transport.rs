//! Transport Module
//!
//! The HTTP collaborator that executes a [`SignedRequest`]. The client core
//! never touches sockets itself; anything implementing [`Transport`] can stand
//! in, which is how the client tests run without a network.

use crate::error::{Result, SesError};
use crate::signer::{Method, SignedRequest};
use reqwest::blocking::Client;
use std::time::Duration;

/// Status code and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

pub trait Transport {
    /// Executes one request. Errors are returned as [`SesError::Transport`].
    fn execute(&self, request: &SignedRequest) -> Result<HttpResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &SignedRequest) -> Result<HttpResponse> {
        (**self).execute(request)
    }
}

/// Blocking transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SesError::Transport(Box::new(e)))?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: &SignedRequest) -> Result<HttpResponse> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        };
        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .map_err(|e| SesError::Transport(Box::new(e)))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| SesError::Transport(Box::new(e)))?;
        Ok(HttpResponse { status, body })
    }
}
