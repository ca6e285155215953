//! Source loading
//!
//! The bridge asks a [`SourceFetcher`] for the application bundle and keeps
//! pumping while it loads. [`UrlSourceFetcher`] reads `file://` URLs and does
//! a plain HTTP/1.1 GET for `http://` URLs, each on its own thread.

use std::thread;

use hostbridge_modules::http::{self, HttpError, HttpRequest};
use url::Url;

use crate::completion::{completion, Broken, Completion};

/// Why a bundle could not be fetched
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    /// Reading the file or socket failed
    #[error("{0}")]
    Io(String),

    /// The server answered with a non-success status
    #[error("HTTP {status} {reason}")]
    Status {
        /// Status code
        status: u16,
        /// Reason phrase
        reason: String,
    },

    /// The response could not be parsed
    #[error("Invalid HTTP response: {0}")]
    Protocol(String),

    /// The URL scheme cannot be fetched
    #[error("Unsupported URL scheme '{0}'")]
    UnsupportedScheme(String),

    /// The fetch was abandoned
    #[error("Fetch was abandoned")]
    Abandoned,
}

impl From<Broken> for FetchError {
    fn from(_: Broken) -> Self {
        FetchError::Abandoned
    }
}

impl From<HttpError> for FetchError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::Io(message) => FetchError::Io(message),
            HttpError::Protocol(message) => FetchError::Protocol(message),
            HttpError::UnsupportedScheme(scheme) => FetchError::UnsupportedScheme(scheme),
        }
    }
}

impl From<std::io::Error> for FetchError {
    fn from(e: std::io::Error) -> Self {
        FetchError::Io(e.to_string())
    }
}

/// Loads application bundles.
pub trait SourceFetcher: Send + Sync {
    /// Start loading `url`
    fn fetch(&self, url: &Url) -> Completion<Vec<u8>, FetchError>;
}

/// Fetches `file://` and `http://` URLs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UrlSourceFetcher;

impl SourceFetcher for UrlSourceFetcher {
    fn fetch(&self, url: &Url) -> Completion<Vec<u8>, FetchError> {
        if !matches!(url.scheme(), "file" | "http") {
            return Completion::failed(FetchError::UnsupportedScheme(url.scheme().to_string()));
        }

        let (resolver, completion) = completion();
        let url = url.clone();
        let spawned = thread::Builder::new()
            .name("hostbridge-fetch".to_string())
            .spawn(move || {
                tracing::debug!("Fetching {}", url);
                resolver.settle(fetch_url(&url));
            });
        match spawned {
            Ok(_) => completion,
            Err(e) => Completion::failed(FetchError::Io(format!("cannot start fetch thread: {}", e))),
        }
    }
}

/// Fetch on the calling thread
pub fn fetch_url(url: &Url) -> Result<Vec<u8>, FetchError> {
    match url.scheme() {
        "file" => {
            let path = url
                .to_file_path()
                .map_err(|_| FetchError::Io(format!("{} is not a local path", url)))?;
            std::fs::read(&path).map_err(|e| FetchError::Io(format!("{}: {}", path.display(), e)))
        }
        "http" => http_get(url),
        other => Err(FetchError::UnsupportedScheme(other.to_string())),
    }
}

fn http_get(url: &Url) -> Result<Vec<u8>, FetchError> {
    let response = http::send(&HttpRequest::get(url.clone()))?;
    if !response.is_success() {
        return Err(FetchError::Status {
            status: response.status,
            reason: response.reason,
        });
    }
    Ok(response.body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;

    fn serve_once(response: &'static str) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 0 && line != "\r\n" {
                line.clear();
            }
            stream.write_all(response.as_bytes()).unwrap();
        });
        Url::parse(&format!("http://{}/index.bundle?platform=linux", addr)).unwrap()
    }

    #[test]
    fn test_http_fetch() {
        let url = serve_once("HTTP/1.1 200 OK\r\nContent-Length: 11\r\n\r\nvar a = 1;\n");
        let body = UrlSourceFetcher.fetch(&url).wait().unwrap();
        assert_eq!(body, b"var a = 1;\n");
    }

    #[test]
    fn test_http_error_status() {
        let url = serve_once("HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\n\r\n");
        assert_eq!(
            UrlSourceFetcher.fetch(&url).wait(),
            Err(FetchError::Status {
                status: 500,
                reason: "Internal Server Error".to_string()
            })
        );
    }

    #[test]
    fn test_unsupported_scheme() {
        let url = Url::parse("https://example.com/index.bundle").unwrap();
        assert_eq!(
            UrlSourceFetcher.fetch(&url).try_take(),
            Some(Err(FetchError::UnsupportedScheme("https".to_string())))
        );
    }
}
