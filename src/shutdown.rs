//! Remote shutdown client for the Selenium server.
//!
//! The legacy standalone server exposes a control command over plain GET;
//! the body of the response is the only success signal it gives.

use crate::classifier::normalize_endpoint;

/// Query path of the remote shutdown command.
const SHUTDOWN_PATH: &str = "/selenium-server/driver/?cmd=shutDownSeleniumServer";

/// Token the server answers with when the shutdown command was accepted.
const SHUTDOWN_OK_TOKEN: &str = "okok";

/// Issues shutdown requests against a running Selenium server.
#[derive(Debug, Clone, Default)]
pub struct ShutdownClient {
    http: reqwest::Client,
}

impl ShutdownClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the server at `endpoint` to shut itself down.
    ///
    /// Returns `true` iff the full response body contains the `OKOK`
    /// acknowledgement. Transport failures are logged and reported as
    /// `false` so the caller can fold them into its failure branch.
    pub async fn shutdown(&self, endpoint: &str) -> bool {
        let url = format!("{}{}", normalize_endpoint(endpoint), SHUTDOWN_PATH);
        tracing::info!("Shutting down Selenium server: {}", endpoint);

        let body = match self.http.get(&url).send().await {
            Ok(resp) => match resp.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!("Failed to read shutdown response from {}: {}", url, e);
                    return false;
                }
            },
            Err(e) => {
                tracing::warn!("Shutdown request to {} failed: {}", url, e);
                return false;
            }
        };

        let success = body_acknowledges_shutdown(&body);
        if success {
            tracing::info!("Shut down Selenium server: {} ({})", endpoint, body.trim());
        } else {
            tracing::warn!("Selenium server at {} refused shutdown ({})", endpoint, body.trim());
        }
        success
    }
}

fn body_acknowledges_shutdown(body: &str) -> bool {
    body.to_ascii_lowercase().contains(SHUTDOWN_OK_TOKEN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn body_predicate_is_case_insensitive() {
        assert!(body_acknowledges_shutdown("OKOK"));
        assert!(body_acknowledges_shutdown("okok extra text"));
        assert!(body_acknowledges_shutdown("response: OkOk"));
        assert!(!body_acknowledges_shutdown("ERROR"));
        assert!(!body_acknowledges_shutdown(""));
    }

    /// Serve exactly one canned HTTP response and return the bound address.
    async fn serve_once(body: &'static str) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
            }
        });
        addr
    }

    #[tokio::test]
    async fn shutdown_succeeds_on_okok_body() {
        let addr = serve_once("OKOK").await;
        let client = ShutdownClient::new();
        assert!(client.shutdown(&format!("http://{}", addr)).await);
    }

    #[tokio::test]
    async fn shutdown_fails_on_error_body() {
        let addr = serve_once("ERROR").await;
        let client = ShutdownClient::new();
        assert!(!client.shutdown(&format!("http://{}", addr)).await);
    }

    #[tokio::test]
    async fn shutdown_strips_hub_suffix_before_requesting() {
        let addr = serve_once("OKOK").await;
        let client = ShutdownClient::new();
        assert!(client.shutdown(&format!("http://{}/wd/hub", addr)).await);
    }

    #[tokio::test]
    async fn transport_failure_reports_false() {
        // Bind then drop to get a port nothing is listening on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ShutdownClient::new();
        assert!(!client.shutdown(&format!("http://{}", addr)).await);
    }
}
