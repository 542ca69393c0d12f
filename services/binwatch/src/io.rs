//! HTTP client abstraction for testability

use async_trait::async_trait;
use serde_json::Value;

/// HTTP response from a request
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Abstraction over HTTP client for dependency injection
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait HttpClient: Send + Sync {
    /// Send a GET request to the given URL
    async fn get(&self, url: &str) -> crate::Result<HttpResponse>;

    /// Send a PUT request with a JSON body
    async fn put_json(&self, url: &str, body: &Value) -> crate::Result<HttpResponse>;

    /// Send a POST request with a JSON body
    async fn post_json(&self, url: &str, body: &Value) -> crate::Result<HttpResponse>;

    /// Send a DELETE request to the given URL
    async fn delete(&self, url: &str) -> crate::Result<HttpResponse>;

    /// Open a streaming GET request and read its body line by line.
    ///
    /// Non-200 responses are errors.
    async fn get_lines(&self, url: &str, accept: &str) -> crate::Result<Box<dyn LineReader>>;
}

/// Line-oriented body of a streaming response
#[async_trait]
pub trait LineReader: Send {
    /// Read the next line without its terminator.
    ///
    /// Returns `Ok(None)` once the stream has ended.
    async fn read_line(&mut self) -> crate::Result<Option<String>>;
}

/// Production HTTP client using reqwest
#[derive(Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    async fn send(
        &self,
        method: &str,
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> crate::Result<HttpResponse> {
        tracing::debug!("{} {}", method, redact(url));
        let response = request.send().await.map_err(|e| {
            crate::BinwatchError::Http(format!(
                "{} {} failed: {}",
                method,
                redact(url),
                e.without_url()
            ))
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| crate::BinwatchError::Http(format!("Reading response body: {}", e)))?;

        tracing::debug!(
            "{} {} -> {} ({} bytes)",
            method,
            redact(url),
            status,
            body.len()
        );
        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str) -> crate::Result<HttpResponse> {
        self.send("GET", url, self.client.get(url)).await
    }

    async fn put_json(&self, url: &str, body: &Value) -> crate::Result<HttpResponse> {
        self.send("PUT", url, self.client.put(url).json(body)).await
    }

    async fn post_json(&self, url: &str, body: &Value) -> crate::Result<HttpResponse> {
        self.send("POST", url, self.client.post(url).json(body)).await
    }

    async fn delete(&self, url: &str) -> crate::Result<HttpResponse> {
        self.send("DELETE", url, self.client.delete(url)).await
    }

    async fn get_lines(&self, url: &str, accept: &str) -> crate::Result<Box<dyn LineReader>> {
        tracing::debug!("GET {} (streaming)", redact(url));
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, accept)
            .send()
            .await
            .map_err(|e| {
                crate::BinwatchError::Http(format!(
                    "GET {} failed: {}",
                    redact(url),
                    e.without_url()
                ))
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(crate::BinwatchError::Http(format!(
                "GET {} returned status {}: {}",
                redact(url),
                status,
                body
            )));
        }

        Ok(Box::new(ResponseLineReader {
            response,
            buffer: Vec::new(),
            finished: false,
        }))
    }
}

/// Splits a streaming reqwest response body into lines
struct ResponseLineReader {
    response: reqwest::Response,
    buffer: Vec<u8>,
    finished: bool,
}

impl ResponseLineReader {
    fn take_line(&mut self) -> Option<String> {
        let end = self.buffer.iter().position(|b| *b == b'\n')?;
        let line: Vec<u8> = self.buffer.drain(..=end).collect();
        Some(decode_line(&line))
    }
}

#[async_trait]
impl LineReader for ResponseLineReader {
    async fn read_line(&mut self) -> crate::Result<Option<String>> {
        loop {
            if let Some(line) = self.take_line() {
                return Ok(Some(line));
            }
            if self.finished {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                let rest = std::mem::take(&mut self.buffer);
                return Ok(Some(decode_line(&rest)));
            }
            match self.response.chunk().await {
                Ok(Some(chunk)) => self.buffer.extend_from_slice(&chunk),
                Ok(None) => self.finished = true,
                Err(e) => {
                    return Err(crate::BinwatchError::Http(format!(
                        "Reading stream failed: {}",
                        e.without_url()
                    )))
                }
            }
        }
    }
}

/// Decode one line, dropping a trailing `\n` or `\r\n`
fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Strip the query string so auth tokens never reach the logs
fn redact(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}
