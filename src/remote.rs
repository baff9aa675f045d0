use std::collections::HashSet;
use std::io::Read;
use std::sync::LazyLock;
use std::thread;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;
use tracing::debug;

use crate::domain::{EntryFormat, MAX_RECIPE_FILE_SIZE};
use crate::error::BrewpadError;
use crate::store::check_size;

/// Error bodies are only kept for the message.
const MAX_ERROR_BODY: u64 = 4 * 1024;

static RECIPE_FILE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[A-Za-z0-9_./-]+\.brewpadrecipe").unwrap());

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub reachable: bool,
    pub status: Option<u16>,
    pub message: String,
}

/// Source of remote recipe files.
pub trait RemoteIndexClient: Send + Sync {
    /// Bare, de-duplicated recipe file names advertised by the server.
    fn fetch_listing(&self) -> Result<Vec<String>, BrewpadError>;
    /// Raw payload of one recipe file, rejected when over the size cap.
    fn download_one(&self, name: &str) -> Result<Vec<u8>, BrewpadError>;
    fn check_health(&self) -> HealthStatus;
}

#[derive(Clone)]
pub struct RemoteHttpClient {
    client: Client,
    base_url: String,
    health_url: String,
}

impl RemoteHttpClient {
    pub fn new(base_url: &str, health_url: &str, timeout: Duration) -> Result<Self, BrewpadError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("brewpad/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| BrewpadError::RemoteHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| BrewpadError::RemoteHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            health_url: health_url.to_string(),
        })
    }

    pub fn file_url(&self, file_name: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), file_name)
    }

    fn handle_status(response: Response) -> Result<Response, BrewpadError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let mut body = Vec::new();
        let message = match response.take(MAX_ERROR_BODY).read_to_end(&mut body) {
            Ok(_) => String::from_utf8_lossy(&body).into_owned(),
            Err(_) => "recipe server request failed".to_string(),
        };
        Err(BrewpadError::RemoteStatus { status, message })
    }

    fn send_with_retries<F>(&self, mut make_req: F) -> Result<Response, BrewpadError>
    where
        F: FnMut() -> RequestBuilder,
    {
        const MAX_RETRIES: usize = 2;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            match make_req().send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(BrewpadError::RemoteHttp(err.to_string()));
                }
            }
        }
    }
}

impl RemoteIndexClient for RemoteHttpClient {
    fn fetch_listing(&self) -> Result<Vec<String>, BrewpadError> {
        let response = self.send_with_retries(|| self.client.get(&self.base_url))?;
        let response = Self::handle_status(response)?;
        let body = read_limited(response, &self.base_url, MAX_RECIPE_FILE_SIZE)?;
        let content = String::from_utf8_lossy(&body);
        let names = extract_recipe_filenames(&content);
        debug!("listing advertised {} recipe files", names.len());
        Ok(names)
    }

    fn download_one(&self, name: &str) -> Result<Vec<u8>, BrewpadError> {
        let file_name = with_recipe_extension(name);
        let url = self.file_url(&file_name);
        let response = self.send_with_retries(|| self.client.get(&url))?;
        let response = Self::handle_status(response)?;
        if let Some(length) = response.content_length() {
            check_size(&file_name, length)?;
        }
        read_limited(response, &file_name, MAX_RECIPE_FILE_SIZE)
    }

    fn check_health(&self) -> HealthStatus {
        match self.client.get(&self.health_url).send() {
            Ok(response) => {
                let status = response.status();
                HealthStatus {
                    reachable: status.is_success(),
                    status: Some(status.as_u16()),
                    message: format!("Status: {}", status.as_u16()),
                }
            }
            Err(err) => HealthStatus {
                reachable: false,
                status: None,
                message: format!("Error: {err}"),
            },
        }
    }
}

/// Scans a directory listing (HTML or plain text) for recipe file names,
/// strips any directory prefix and drops duplicates, keeping first-seen
/// order.
pub fn extract_recipe_filenames(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    RECIPE_FILE_NAME
        .find_iter(content)
        .filter_map(|found| found.as_str().rsplit('/').next())
        .filter(|name| !name.starts_with('.'))
        .filter(|name| seen.insert(name.to_string()))
        .map(str::to_string)
        .collect()
}

/// Reads at most `limit` bytes. A body that keeps going past the limit is
/// rejected without being buffered further.
pub fn read_limited<R: Read>(reader: R, name: &str, limit: u64) -> Result<Vec<u8>, BrewpadError> {
    let mut bytes = Vec::new();
    reader
        .take(limit + 1)
        .read_to_end(&mut bytes)
        .map_err(|err| BrewpadError::RemoteHttp(err.to_string()))?;
    let size = bytes.len() as u64;
    if size > limit {
        return Err(BrewpadError::FileTooLarge {
            name: name.to_string(),
            size,
            limit,
        });
    }
    Ok(bytes)
}

pub fn with_recipe_extension(name: &str) -> String {
    let suffix = format!(".{}", EntryFormat::RemoteSync.extension());
    if name.to_lowercase().ends_with(&suffix) {
        name.to_string()
    } else {
        format!("{name}{suffix}")
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_appended_once() {
        assert_eq!(with_recipe_extension("mocha"), "mocha.brewpadrecipe");
        assert_eq!(
            with_recipe_extension("mocha.brewpadrecipe"),
            "mocha.brewpadrecipe"
        );
    }

    #[test]
    fn body_past_limit_is_rejected() {
        let body = std::io::Cursor::new(vec![b'x'; 64]);
        let err = read_limited(body, "big.brewpadrecipe", 16).unwrap_err();
        assert!(matches!(
            err,
            BrewpadError::FileTooLarge { size: 17, limit: 16, .. }
        ));

        let body = std::io::Cursor::new(b"{}".to_vec());
        assert_eq!(read_limited(body, "ok", 16).unwrap(), b"{}");
    }

    #[test]
    fn file_url_joins_without_double_slash() {
        let client = RemoteHttpClient::new(
            "https://example.invalid/recipes/",
            "https://example.invalid",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            client.file_url("mocha.brewpadrecipe"),
            "https://example.invalid/recipes/mocha.brewpadrecipe"
        );
    }
}
