//! Wire-level request/response types and the HTTP transport

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::PipelineError;
use crate::pipeline::cookies::PersistentCookieJar;
use crate::types::ImageFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone)]
pub enum MultipartPart {
    Text { name: String, value: String },
    File { name: String, file: ImageFile },
}

/// Request body. Owned and cloneable so a request can be replayed after a refresh.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
    Multipart(Vec<MultipartPart>),
}

impl RequestBody {
    /// Bodies that carry their own content type
    pub fn sets_content_type(&self) -> bool {
        matches!(self, RequestBody::Form(_) | RequestBody::Multipart(_))
    }
}

/// A logical call against the backend, relative to the configured base address
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = RequestBody::Form(fields);
        self
    }

    pub fn multipart(mut self, parts: Vec<MultipartPart>) -> Self {
        self.body = RequestBody::Multipart(parts);
        self
    }
}

/// A request with base address, default headers and credential applied
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl PreparedRequest {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, PipelineError> {
        serde_json::from_slice(&self.body).map_err(|e| PipelineError::Decode(e.to_string()))
    }
}

/// Sends prepared requests. Any HTTP status is a successful send; only
/// transport-level failures are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &PreparedRequest) -> Result<ApiResponse, PipelineError>;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build a transport over a persistent cookie jar, so the refresh cookie
    /// set at sign-in is sent back on refresh, also after a restart.
    pub fn new(
        connect_timeout: Duration,
        request_timeout: Duration,
        cookies: Arc<PersistentCookieJar>,
    ) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .cookie_provider(cookies)
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| PipelineError::Network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &PreparedRequest) -> Result<ApiResponse, PipelineError> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| PipelineError::InvalidRequest(e.to_string()))?;
        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Form(fields) => builder.form(fields),
            RequestBody::Multipart(parts) => builder.multipart(to_multipart(parts)?),
        };

        let response = builder.send().await.map_err(map_http_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_http_error)?;
        Ok(ApiResponse::new(status, body.to_vec()))
    }
}

fn to_multipart(parts: &[MultipartPart]) -> Result<reqwest::multipart::Form, PipelineError> {
    let mut form = reqwest::multipart::Form::new();
    for part in parts {
        form = match part {
            MultipartPart::Text { name, value } => form.text(name.clone(), value.clone()),
            MultipartPart::File { name, file } => {
                let body = reqwest::multipart::Part::bytes(file.bytes.clone())
                    .file_name(file.name.clone())
                    .mime_str(&file.mime_type)
                    .map_err(|e| PipelineError::InvalidRequest(format!("Invalid mime type: {}", e)))?;
                form.part(name.clone(), body)
            }
        };
    }
    Ok(form)
}

// Status codes never reach here: the transport reports them as responses.
fn map_http_error(error: reqwest::Error) -> PipelineError {
    if error.is_timeout() {
        PipelineError::Network(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        PipelineError::Network(format!("Connection error: {}", error))
    } else if error.is_builder() {
        PipelineError::InvalidRequest(error.to_string())
    } else {
        PipelineError::Network(format!("HTTP error: {}", error))
    }
}
