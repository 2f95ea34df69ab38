//! Source fetching over HTTP (image links and chat attachments)

use bytes::Bytes;
use reqwest::Client;
use std::path::Path;
use thiserror::Error;

use crate::core::config;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to fetch image from {url}. Status: {status}")]
    Http { url: String, status: reqwest::StatusCode },
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Builds the shared HTTP client used for all source fetches.
pub fn http_client() -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(config::network::USER_AGENT)
        .timeout(config::network::timeout())
        .connect_timeout(config::network::connect_timeout())
        .build()
}

/// Fetches the full body of `url`.
///
/// Any non-200 status is an error; nothing is returned for partial bodies.
pub async fn fetch_bytes(client: &Client, url: &str) -> Result<Bytes, FetchError> {
    let resp = client.get(url).send().await?;

    if resp.status() != reqwest::StatusCode::OK {
        return Err(FetchError::Http {
            url: url.to_string(),
            status: resp.status(),
        });
    }

    let body = resp.bytes().await?;
    log::debug!("Fetched {} bytes from {}", body.len(), url);
    Ok(body)
}

/// Fetches `url` into a local file, creating parent directories as needed.
///
/// Returns the number of bytes written.
pub async fn fetch_to_file(client: &Client, url: &str, dest: &Path) -> Result<u64, FetchError> {
    let body = fetch_bytes(client, url).await?;

    let write_err = |source| FetchError::Write {
        path: dest.display().to_string(),
        source,
    };

    if let Some(parent) = dest.parent() {
        fs_err::tokio::create_dir_all(parent).await.map_err(write_err)?;
    }
    fs_err::tokio::write(dest, &body).await.map_err(write_err)?;

    Ok(body.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_bytes_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/fox.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3, 4]))
            .mount(&mock_server)
            .await;

        let client = http_client().unwrap();
        let url = format!("{}/fox.png", &mock_server.uri());
        let body = fetch_bytes(&client, &url).await.unwrap();

        assert_eq!(body.as_ref(), &[1u8, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_fetch_bytes_not_found_reports_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/missing.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let client = http_client().unwrap();
        let url = format!("{}/missing.jpg", &mock_server.uri());
        let err = fetch_bytes(&client, &url).await.unwrap_err();

        assert!(matches!(err, FetchError::Http { status, .. } if status == reqwest::StatusCode::NOT_FOUND));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_fetch_to_file_creates_parent_dirs() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/a.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg-bytes".to_vec()))
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested/dir/a.jpg");
        let client = http_client().unwrap();

        let written = fetch_to_file(&client, &format!("{}/a.jpg", mock_server.uri()), &dest)
            .await
            .unwrap();

        assert_eq!(written, 10);
        assert_eq!(std::fs::read(&dest).unwrap(), b"jpeg-bytes");
    }
}
