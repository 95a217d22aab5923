//! Retrieval of the raw reception-report document.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

/// Issues a single GET and returns the body. Non-success statuses are errors;
/// there is no retry.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client
        .execute(req)
        .await
        .with_context(|| format!("request to '{url}' failed"))?;

    let status = resp.status();
    if !status.is_success() {
        bail!("'{url}' returned status {status}");
    }

    Ok(resp.bytes().await?.to_vec())
}

/// Loads the report document from an HTTP(S) URL, or from a local file when
/// `source` is not a URL.
#[tracing::instrument(skip(client))]
pub async fn fetch_source<C: HttpClient>(client: &C, source: &str) -> Result<Vec<u8>> {
    let bytes = if source.starts_with("http://") || source.starts_with("https://") {
        info!("Getting PSKReporter spots");
        fetch_bytes(client, source).await?
    } else {
        debug!("Reading spots from local file");
        std::fs::read(source).with_context(|| format!("failed to read '{source}'"))?
    };
    debug!(bytes = bytes.len(), "Spot document received");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::{Duration, Instant};
    use tokio::net::TcpListener;

    struct StubClient {
        status: u16,
        body: &'static str,
    }

    #[async_trait]
    impl HttpClient for StubClient {
        async fn execute(&self, _req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            let resp = http::Response::builder()
                .status(self.status)
                .body(self.body)
                .unwrap();
            Ok(reqwest::Response::from(resp))
        }
    }

    #[tokio::test]
    async fn test_fetch_bytes_success() {
        let client = StubClient {
            status: 200,
            body: "<receptionReports/>",
        };
        let bytes = fetch_bytes(&client, "https://example.org/query").await.unwrap();
        assert_eq!(bytes, b"<receptionReports/>");
    }

    #[tokio::test]
    async fn test_fetch_bytes_rejects_error_status() {
        let client = StubClient {
            status: 503,
            body: "busy",
        };
        let err = fetch_bytes(&client, "https://example.org/query")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_fetch_source_reads_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spots.xml");
        std::fs::write(&path, "<receptionReports/>").unwrap();

        let client = StubClient {
            status: 500,
            body: "",
        };
        let bytes = fetch_source(&client, path.to_str().unwrap()).await.unwrap();
        assert_eq!(bytes, b"<receptionReports/>");
    }

    #[tokio::test]
    async fn test_fetch_source_missing_file_is_error() {
        let client = StubClient {
            status: 200,
            body: "",
        };
        assert!(fetch_source(&client, "/nonexistent/spots.xml").await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_bytes_times_out_on_silent_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            // Accept and hold connections without ever answering.
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client =
            BasicClient::with_timeouts(Duration::from_secs(1), Duration::from_secs(1)).unwrap();
        let started = Instant::now();
        let err = fetch_bytes(&client, &format!("http://{addr}/query"))
            .await
            .unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(10));
        let timed_out = err
            .chain()
            .filter_map(|cause| cause.downcast_ref::<reqwest::Error>())
            .any(|e| e.is_timeout());
        assert!(timed_out, "expected a timeout, got {err:#}");

        server.abort();
    }
}
