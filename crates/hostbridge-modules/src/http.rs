//! Minimal HTTP/1.1 client over `std::net`
//!
//! Used by the Networking module and by the bridge to download bundles.
//! Plain `http://` only; one request per connection.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;

use url::Url;

/// Request failure below the HTTP status level
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HttpError {
    /// Socket error
    #[error("{0}")]
    Io(String),

    /// The response could not be parsed
    #[error("Invalid HTTP response: {0}")]
    Protocol(String),

    /// The URL scheme is not `http`
    #[error("Unsupported URL scheme '{0}'")]
    UnsupportedScheme(String),
}

impl From<std::io::Error> for HttpError {
    fn from(e: std::io::Error) -> Self {
        HttpError::Io(e.to_string())
    }
}

/// An outgoing request
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Request method, e.g. `GET`
    pub method: String,
    /// Target URL
    pub url: Url,
    /// Extra headers, sent in order
    pub headers: Vec<(String, String)>,
    /// Request body
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// A bodyless GET
    pub fn get(url: Url) -> Self {
        HttpRequest {
            method: "GET".to_string(),
            url,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }
}

/// A complete response; any status is a response, not an error
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Reason phrase
    pub reason: String,
    /// Headers in arrival order, names lowercased
    pub headers: Vec<(String, String)>,
    /// Decoded body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header with this (lowercase) name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Perform `request` on the calling thread
pub fn send(request: &HttpRequest) -> Result<HttpResponse, HttpError> {
    let url = &request.url;
    if url.scheme() != "http" {
        return Err(HttpError::UnsupportedScheme(url.scheme().to_string()));
    }
    let host = url
        .host_str()
        .ok_or_else(|| HttpError::Protocol(format!("{} has no host", url)))?;
    let port = url.port_or_known_default().unwrap_or(80);
    let mut path = url.path().to_string();
    if let Some(query) = url.query() {
        path.push('?');
        path.push_str(query);
    }

    let mut stream = TcpStream::connect((host, port))?;

    let mut head = format!("{} {} HTTP/1.1\r\n", request.method, path);
    head.push_str(&format!("Host: {}:{}\r\n", host, port));
    let has = |name: &str| request.headers.iter().any(|(key, _)| key.eq_ignore_ascii_case(name));
    if !has("accept") {
        head.push_str("Accept: */*\r\n");
    }
    for (key, value) in &request.headers {
        head.push_str(&format!("{}: {}\r\n", key, value));
    }
    if !request.body.is_empty() && !has("content-length") {
        head.push_str(&format!("Content-Length: {}\r\n", request.body.len()));
    }
    head.push_str("Connection: close\r\n\r\n");
    stream.write_all(head.as_bytes())?;
    stream.write_all(&request.body)?;
    stream.flush()?;

    let mut reader = BufReader::new(stream);

    let mut status_line = String::new();
    reader.read_line(&mut status_line)?;
    let (status, reason) = parse_status_line(&status_line)?;

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            break;
        }
        if let Some((key, value)) = trimmed.split_once(':') {
            headers.push((key.trim().to_lowercase(), value.trim().to_string()));
        }
    }

    let mut response = HttpResponse {
        status,
        reason,
        headers,
        body: Vec::new(),
    };
    let chunked = response
        .header("transfer-encoding")
        .is_some_and(|v| v.to_lowercase().contains("chunked"));
    let content_length = response.header("content-length").and_then(|v| v.parse::<usize>().ok());

    response.body = if request.method.eq_ignore_ascii_case("HEAD") {
        Vec::new()
    } else if chunked {
        read_chunked_body(&mut reader)?
    } else if let Some(len) = content_length {
        let mut body = vec![0u8; len];
        reader.read_exact(&mut body)?;
        body
    } else {
        let mut body = Vec::new();
        reader.read_to_end(&mut body)?;
        body
    };
    Ok(response)
}

fn parse_status_line(line: &str) -> Result<(u16, String), HttpError> {
    // HTTP/1.1 200 OK
    let mut parts = line.trim().splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/") {
        return Err(HttpError::Protocol(format!("bad status line '{}'", line.trim())));
    }
    let status = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| HttpError::Protocol(format!("bad status code in '{}'", line.trim())))?;
    let reason = parts.next().unwrap_or_default().to_string();
    Ok((status, reason))
}

fn read_chunked_body<R: BufRead>(reader: &mut R) -> Result<Vec<u8>, HttpError> {
    let mut body = Vec::new();
    loop {
        let mut size_line = String::new();
        reader.read_line(&mut size_line)?;
        let size_field = size_line.trim().split(';').next().unwrap_or_default();
        let size = usize::from_str_radix(size_field, 16)
            .map_err(|_| HttpError::Protocol(format!("bad chunk size '{}'", size_line.trim())))?;
        if size == 0 {
            break;
        }
        let mut chunk = vec![0u8; size];
        reader.read_exact(&mut chunk)?;
        body.extend_from_slice(&chunk);
        // Read trailing CRLF
        let mut crlf = String::new();
        reader.read_line(&mut crlf)?;
    }
    Ok(body)
}

/// Serve canned responses on a local port, for tests.
#[cfg(test)]
pub(crate) mod test_server {
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    use crossbeam::channel::{self, Receiver};

    /// Answer one connection with `response`; the request head and body
    /// arrive on the returned channel.
    pub fn serve_once(response: &'static str) -> (String, Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = channel::unbounded();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request = String::new();
            let mut content_length = 0;
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                    break;
                }
                if let Some(value) = line.to_lowercase().strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap();
                }
                request.push_str(&line);
            }
            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).unwrap();
            request.push_str(&String::from_utf8_lossy(&body));
            let _ = tx.send(request);
            stream.write_all(response.as_bytes()).unwrap();
        });
        (format!("http://{}", addr), rx)
    }
}
