//! HTTP client abstraction for testability

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;

/// HTTP response from a request
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    /// Entity tag, present when the server was asked for one
    pub etag: Option<String>,
}

/// Abstraction over HTTP client for dependency injection
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait HttpClient: Send + Sync {
    /// Send a GET request with the given extra headers
    async fn get(&self, url: &str, headers: &[(String, String)]) -> crate::Result<HttpResponse>;

    /// Send a PUT request with a JSON body and the given extra headers
    async fn put_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        headers: &[(String, String)],
    ) -> crate::Result<HttpResponse>;

    /// Open a streaming GET for server-sent events, yielding one line per message
    async fn stream_lines(&self, url: &str) -> crate::Result<mpsc::Receiver<String>>;
}

/// Production HTTP client using reqwest
#[derive(Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str, headers: &[(String, String)]) -> crate::Result<HttpResponse> {
        tracing::debug!("GET {}", url);
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        let response = request
            .send()
            .await
            .map_err(|e| crate::TallyboardError::Http(format!("GET {} failed: {}", url, e)))?;

        let status = response.status().as_u16();
        let etag = response
            .headers()
            .get(reqwest::header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| crate::TallyboardError::Http(format!("Reading response body: {}", e)))?;

        tracing::debug!("GET {} -> {} ({} bytes)", url, status, body.len());
        Ok(HttpResponse { status, body, etag })
    }

    async fn put_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        headers: &[(String, String)],
    ) -> crate::Result<HttpResponse> {
        tracing::debug!("PUT {}", url);
        let mut request = self.client.put(url).json(body);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        let response = request
            .send()
            .await
            .map_err(|e| crate::TallyboardError::Http(format!("PUT {} failed: {}", url, e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| crate::TallyboardError::Http(format!("Reading response body: {}", e)))?;

        tracing::debug!("PUT {} -> {} ({} bytes)", url, status, body.len());
        Ok(HttpResponse {
            status,
            body,
            etag: None,
        })
    }

    async fn stream_lines(&self, url: &str) -> crate::Result<mpsc::Receiver<String>> {
        tracing::debug!("GET {} (event stream)", url);
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| crate::TallyboardError::Http(format!("GET {} failed: {}", url, e)))?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(crate::TallyboardError::Http(format!(
                "GET {} (event stream) returned status {}",
                url, status
            )));
        }

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut buffer = String::new();
            while let Some(chunk) = stream.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        tracing::debug!("Event stream read error: {}", e);
                        break;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));
                while let Some(newline) = buffer.find('\n') {
                    let line: String = buffer.drain(..=newline).collect();
                    let line = line.trim_end_matches(['\r', '\n']).to_string();
                    if tx.send(line).await.is_err() {
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A URL that will always refuse connections (port 1 is reserved and unbound)
    const UNREACHABLE_URL: &str = "http://127.0.0.1:1/test";

    #[tokio::test]
    async fn get_connection_refused_returns_http_error() {
        let client = ReqwestHttpClient::default();
        let err = client.get(UNREACHABLE_URL, &[]).await.unwrap_err();

        match &err {
            crate::TallyboardError::Http(msg) => {
                assert!(
                    msg.starts_with("GET http://127.0.0.1:1/test failed:"),
                    "{msg}"
                );
            }
            other => panic!("expected TallyboardError::Http, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn put_json_connection_refused_returns_http_error() {
        let client = ReqwestHttpClient::default();
        let err = client
            .put_json(UNREACHABLE_URL, &serde_json::json!({"key": "value"}), &[])
            .await
            .unwrap_err();

        match &err {
            crate::TallyboardError::Http(msg) => {
                assert!(
                    msg.starts_with("PUT http://127.0.0.1:1/test failed:"),
                    "{msg}"
                );
            }
            other => panic!("expected TallyboardError::Http, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stream_lines_connection_refused_returns_http_error() {
        let client = ReqwestHttpClient::default();
        let err = client.stream_lines(UNREACHABLE_URL).await.unwrap_err();

        match &err {
            crate::TallyboardError::Http(msg) => {
                assert!(
                    msg.starts_with("GET http://127.0.0.1:1/test failed:"),
                    "{msg}"
                );
            }
            other => panic!("expected TallyboardError::Http, got {other:?}"),
        }
    }
}
