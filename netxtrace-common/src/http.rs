use bytes::Bytes;

/// Ordered, multi-valued header collection.
///
/// Values are raw bytes: servers are free to send headers that are not
/// valid UTF-8 and the archival format must preserve them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, Bytes)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, key: impl Into<String>, value: impl Into<Bytes>) {
        self.entries.push((key.into(), value.into()));
    }

    /// First value for `key`, compared case-insensitively.
    pub fn get(&self, key: &str) -> Option<&Bytes> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bytes)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<Bytes>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (key, value) in iter {
            headers.append(key, value);
        }
        headers
    }
}

/// Request handed to an HTTP transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: Headers,
    pub body: Bytes,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    pub fn snapshot(&self) -> RequestSnapshot {
        RequestSnapshot {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
        }
    }
}

/// Response returned by an HTTP transport, body fully read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status_code: u16,
    pub headers: Headers,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn snapshot(&self) -> ResponseSnapshot {
        ResponseSnapshot {
            status_code: self.status_code,
            headers: self.headers.clone(),
        }
    }
}

/// Request line and headers as seen when the round trip started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSnapshot {
    pub method: String,
    pub url: String,
    pub headers: Headers,
}

/// Status and headers of a received response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSnapshot {
    pub status_code: u16,
    pub headers: Headers,
}

/// Prefix of a body, at most `limit` bytes long.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodySnapshot {
    pub data: Bytes,
    pub truncated: bool,
}

impl BodySnapshot {
    pub fn capture(body: &Bytes, limit: usize) -> Self {
        if body.len() > limit {
            Self {
                data: body.slice(..limit),
                truncated: true,
            }
        } else {
            Self {
                data: body.clone(),
                truncated: false,
            }
        }
    }
}
