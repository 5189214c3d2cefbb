//! Minimal HTTP/1.1 client transport over any [`Dialer`].
//!
//! One connection per request, `Connection: close`, response read until
//! the peer closes. Only `http://` URLs are supported.

use std::io;
use std::time::Duration;

use anyhow::{Context as _, Result, bail};
use bytes::Bytes;
use netxtrace_common::{Headers, HttpRequest, HttpResponse};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::utils::{decode_chunked_body, decompress_gzip};
use crate::context::Context;
use crate::probes::network::split_host_port;
use crate::probes::{Dialer, HttpTransport};

const DEFAULT_PORT: &str = "80";
const MAX_HEADERS: usize = 64;

pub struct Http11Transport<D> {
    dialer: D,
    round_trip_timeout: Duration,
}

impl<D: Dialer> Http11Transport<D> {
    pub fn new(dialer: D, round_trip_timeout: Duration) -> Self {
        Self {
            dialer,
            round_trip_timeout,
        }
    }
}

impl<D: Dialer> HttpTransport for Http11Transport<D> {
    async fn round_trip(&self, ctx: Context, request: &HttpRequest) -> Result<HttpResponse> {
        let target = HttpTarget::parse(&request.url)?;
        let mut conn = self.dialer.dial(ctx, "tcp", &target.address).await?;
        let wire = encode_request(request, &target);

        let exchange = async {
            conn.write_all(&wire).await?;
            conn.flush().await?;
            let mut raw = Vec::new();
            conn.read_to_end(&mut raw).await?;
            Ok::<_, io::Error>(raw)
        };
        let raw = tokio::time::timeout(self.round_trip_timeout, exchange).await??;
        parse_response(&raw)
    }
}

/// Where an `http://` URL points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpTarget {
    /// `Host` header value, as written in the URL.
    pub host: String,
    /// `host:port` to dial.
    pub address: String,
    /// Request target: path plus query, at least `/`.
    pub path: String,
}

impl HttpTarget {
    pub fn parse(url: &str) -> Result<Self> {
        let Some(rest) = url.strip_prefix("http://") else {
            bail!("unsupported URL scheme in {url:?}: only http:// is supported");
        };
        let split = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        let (authority, tail) = rest.split_at(split);
        let authority = authority.rsplit('@').next().unwrap_or(authority);
        if authority.is_empty() {
            bail!("missing host in URL {url:?}");
        }

        let tail = tail.split('#').next().unwrap_or_default();
        let path = match tail.chars().next() {
            Some('/') => tail.to_string(),
            Some(_) => format!("/{tail}"),
            None => "/".to_string(),
        };

        let address = match split_host_port(authority) {
            Some(_) => authority.to_string(),
            None => format!("{authority}:{DEFAULT_PORT}"),
        };

        Ok(Self {
            host: authority.to_string(),
            address,
            path,
        })
    }
}

fn encode_request(request: &HttpRequest, target: &HttpTarget) -> Vec<u8> {
    let mut wire = Vec::with_capacity(256 + request.body.len());
    wire.extend_from_slice(format!("{} {} HTTP/1.1\r\n", request.method, target.path).as_bytes());

    if !request.headers.contains("Host") {
        wire.extend_from_slice(format!("Host: {}\r\n", target.host).as_bytes());
    }
    for (key, value) in request.headers.iter() {
        if key.eq_ignore_ascii_case("Connection") || key.eq_ignore_ascii_case("Content-Length") {
            continue;
        }
        wire.extend_from_slice(key.as_bytes());
        wire.extend_from_slice(b": ");
        wire.extend_from_slice(value);
        wire.extend_from_slice(b"\r\n");
    }
    wire.extend_from_slice(b"Connection: close\r\n");
    if !request.body.is_empty() {
        wire.extend_from_slice(format!("Content-Length: {}\r\n", request.body.len()).as_bytes());
    }
    wire.extend_from_slice(b"\r\n");
    wire.extend_from_slice(&request.body);
    wire
}

fn header_contains(headers: &Headers, key: &str, token: &str) -> bool {
    headers
        .iter()
        .filter(|(k, _)| k.eq_ignore_ascii_case(key))
        .any(|(_, v)| String::from_utf8_lossy(v).to_ascii_lowercase().contains(token))
}

/// Parses a complete response as read until EOF. A response cut short
/// before the end of its headers is an unexpected EOF.
pub fn parse_response(raw: &[u8]) -> Result<HttpResponse> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut resp = httparse::Response::new(&mut headers);

    let body_offset = match resp.parse(raw).context("malformed HTTP response")? {
        httparse::Status::Complete(n) => n,
        httparse::Status::Partial => {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
    };
    let status_code = resp.code.context("missing HTTP status code")?;
    let headers: Headers = resp
        .headers
        .iter()
        .map(|h| (h.name.to_string(), Bytes::copy_from_slice(h.value)))
        .collect();

    let mut body = &raw[body_offset..];
    let is_chunked = header_contains(&headers, "Transfer-Encoding", "chunked");
    if !is_chunked
        && let Some(length) = headers.get("Content-Length")
        && let Ok(length) = String::from_utf8_lossy(length).trim().parse::<usize>()
        && length < body.len()
    {
        body = &body[..length];
    }

    let dechunked = if is_chunked {
        decode_chunked_body(body)
    } else {
        std::borrow::Cow::Borrowed(body)
    };

    let body = if header_contains(&headers, "Content-Encoding", "gzip") {
        Bytes::from(decompress_gzip(&dechunked).context("invalid gzip response body")?)
    } else {
        Bytes::copy_from_slice(&dechunked)
    };

    Ok(HttpResponse {
        status_code,
        headers,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::http::utils::find_pattern;
    use crate::probes::network::SystemDialer;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use netxtrace_common::failure;
    use std::io::Write;
    use tokio::net::TcpListener;

    #[test]
    fn test_parse_target() {
        let target = HttpTarget::parse("http://example.com/index.html?q=1").unwrap();
        assert_eq!(target.host, "example.com");
        assert_eq!(target.address, "example.com:80");
        assert_eq!(target.path, "/index.html?q=1");

        let target = HttpTarget::parse("http://127.0.0.1:8080").unwrap();
        assert_eq!(target.address, "127.0.0.1:8080");
        assert_eq!(target.path, "/");

        let target = HttpTarget::parse("http://[::1]/x#frag").unwrap();
        assert_eq!(target.address, "[::1]:80");
        assert_eq!(target.path, "/x");

        let target = HttpTarget::parse("http://example.com?q=1").unwrap();
        assert_eq!(target.path, "/?q=1");
    }

    #[test]
    fn test_parse_target_rejects_other_schemes() {
        assert!(HttpTarget::parse("https://example.com/").is_err());
        assert!(HttpTarget::parse("ftp://example.com/").is_err());
        assert!(HttpTarget::parse("http:///path").is_err());
    }

    #[test]
    fn test_encode_request() {
        let mut request = HttpRequest::get("http://example.com/a");
        request.headers.append("User-Agent", "netxtrace/0.1.0");
        request.headers.append("Connection", "keep-alive");
        let target = HttpTarget::parse(&request.url).unwrap();

        let wire = encode_request(&request, &target);
        assert_eq!(
            String::from_utf8(wire).unwrap(),
            "GET /a HTTP/1.1\r\nHost: example.com\r\nUser-Agent: netxtrace/0.1.0\r\nConnection: close\r\n\r\n"
        );
    }

    #[test]
    fn test_parse_response_with_content_length() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 5\r\n\r\nhello trailing";
        let response = parse_response(raw).unwrap();
        assert_eq!(response.status_code, 200);
        assert_eq!(response.headers.len(), 2);
        assert_eq!(response.body.as_ref(), b"hello");
    }

    #[test]
    fn test_parse_response_with_oversized_chunk() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nffffffffffffffff\r\nabc\r\n0\r\n\r\n";
        let response = parse_response(raw).unwrap();
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body.as_ref(), b"abc\r\n0\r\n\r\n");
    }

    #[test]
    fn test_parse_chunked_gzip_response() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"compressed body").unwrap();
        let gz = encoder.finish().unwrap();

        let mut raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nContent-Encoding: gzip\r\n\r\n".to_vec();
        raw.extend_from_slice(format!("{:x}\r\n", gz.len()).as_bytes());
        raw.extend_from_slice(&gz);
        raw.extend_from_slice(b"\r\n0\r\n\r\n");

        let response = parse_response(&raw).unwrap();
        assert_eq!(response.body.as_ref(), b"compressed body");
    }

    #[test]
    fn test_parse_truncated_headers_is_eof() {
        let err = parse_response(b"HTTP/1.1 200 OK\r\nContent-Ty").unwrap_err();
        let normalized = crate::errors::normalize(Some(&err), "http_round_trip");
        assert_eq!(normalized.failure.as_deref(), Some(failure::EOF_ERROR));
    }

    #[tokio::test]
    async fn test_round_trip_against_local_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while find_end_of_headers(&request).is_none() {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket
                .write_all(b"HTTP/1.1 404 Not Found\r\nX-Test: a\r\nX-Test: b\r\n\r\nmissing")
                .await
                .unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8(request).unwrap()
        });

        let transport = Http11Transport::new(
            SystemDialer::new(Duration::from_secs(5)),
            Duration::from_secs(5),
        );
        let url = format!("http://{address}/robots.txt");
        let response = transport
            .round_trip(Context::new(), &HttpRequest::get(url))
            .await
            .unwrap();

        assert_eq!(response.status_code, 404);
        assert_eq!(response.body.as_ref(), b"missing");
        let values: Vec<&[u8]> = response
            .headers
            .iter()
            .filter(|(k, _)| *k == "X-Test")
            .map(|(_, v)| v.as_ref())
            .collect();
        assert_eq!(values, vec![&b"a"[..], &b"b"[..]]);

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /robots.txt HTTP/1.1\r\n"));
        assert!(request.contains(&format!("Host: {address}\r\n")));
        assert!(request.contains("Connection: close\r\n"));
    }

    #[tokio::test]
    async fn test_round_trip_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let transport = Http11Transport::new(
            SystemDialer::new(Duration::from_secs(5)),
            Duration::from_secs(5),
        );
        let err = transport
            .round_trip(Context::new(), &HttpRequest::get(format!("http://{address}/")))
            .await
            .unwrap_err();
        let normalized = crate::errors::normalize(Some(&err), "http_round_trip");
        assert_eq!(normalized.failure.as_deref(), Some(failure::CONNECTION_REFUSED));
    }

    fn find_end_of_headers(buf: &[u8]) -> Option<usize> {
        find_pattern(buf, b"\r\n\r\n")
    }
}
