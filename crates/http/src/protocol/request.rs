//! Request view over a framed [`Message`].
//!
//! A proxy sees two shapes of request line: the absolute form a browser sends to
//! a configured proxy (`GET http://a.example:8080/x?q HTTP/1.1`) and the origin
//! form (`GET /x?q HTTP/1.1`) that relies on the `Host` header. Both resolve to
//! the same [`Request`]: a `Host` header always wins over the authority embedded
//! in the request target.

use std::fmt;
use std::str::FromStr;

use http::uri::Authority;
use http::{Method, Uri};

use crate::ensure;
use crate::protocol::{Message, ParseError};

const HOST: &str = "Host";

/// The tri-state scheme hint from the request target.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
    /// The target carried no scheme, as in origin-form requests.
    Unknown,
}

/// A request parsed out of a [`Message`], which it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    message: Message,
    method: String,
    scheme: Scheme,
    host: String,
    port: Option<u16>,
    uri: String,
    query: Option<String>,
    version: String,
}

impl Request {
    /// Parses the start line of `message` and applies the `Host` header override.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::MalformedStartLine`] if the line is not
    /// `method SP target SP version`, or if the target can't be parsed.
    pub fn parse(message: Message) -> Result<Request, ParseError> {
        let line = message.start_line();
        let malformed = || ParseError::malformed_start_line(line);

        let mut tokens = line.split_ascii_whitespace();
        let (Some(method), Some(target), Some(version), None) = (tokens.next(), tokens.next(), tokens.next(), tokens.next())
        else {
            return Err(malformed());
        };

        ensure!(Method::from_bytes(method.as_bytes()).is_ok(), malformed());
        ensure!(is_http_version(version), malformed());

        let target = RequestTarget::parse(target).ok_or_else(malformed)?;
        let mut host = target.host.unwrap_or_default();
        let mut port = target.port;

        if let Some(value) = message.headers().get(HOST) {
            let authority = Authority::from_str(value.trim()).map_err(|_| malformed())?;
            host = authority.host().to_ascii_lowercase();
            if let Some(header_port) = authority.port_u16() {
                port = Some(header_port);
            }
        }

        let method = method.to_string();
        let version = version.to_string();

        Ok(Request { message, method, scheme: target.scheme, host, port, uri: target.path, query: target.query, version })
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// The explicit port, `None` when neither the target nor `Host` named one.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// The port to connect to: explicit, else the scheme's default.
    pub fn effective_port(&self) -> u16 {
        match (self.port, self.scheme) {
            (Some(port), _) => port,
            (None, Scheme::Https) => 443,
            (None, _) => 80,
        }
    }

    /// The request path, `/` when the target had none.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn message_mut(&mut self) -> &mut Message {
        &mut self.message
    }

    pub fn into_message(self) -> Message {
        self.message
    }

    /// Only complete `GET` requests are cached.
    ///
    /// `Cache-Control: no-cache` from the client is deliberately not consulted.
    pub fn is_cacheable(&self) -> bool {
        self.method == "GET" && !self.host.is_empty() && !self.uri.is_empty() && !self.version.is_empty()
    }

    /// The cache key for this request: host, the port when one was named, then path.
    ///
    /// Origins on different ports of one host never share a key. `None` means the
    /// request must bypass the cache.
    pub fn fingerprint(&self) -> Option<String> {
        self.is_cacheable().then(|| match self.port {
            Some(port) => format!("{}:{port}{}", self.host, self.uri),
            None => format!("{}{}", self.host, self.uri),
        })
    }

    /// Rewrites the start line into origin form and makes sure a `Host` header is present,
    /// ready to be sent to the origin server.
    pub fn into_origin_form(mut self) -> Message {
        let start_line = format!("{} {} {}", self.method, self.path_and_query(), self.version);
        self.message.set_start_line(start_line);

        if !self.message.headers().contains(HOST) {
            let host = match self.port {
                Some(port) => format!("{}:{port}", self.host),
                None => self.host.clone(),
            };
            self.message.headers_mut().insert(HOST, host);
        }

        self.message
    }

    fn path_and_query(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{query}", self.uri),
            None => self.uri.clone(),
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:{}{}", self.method, self.host, self.effective_port(), self.path_and_query())
    }
}

/// The pieces of a request target.
#[derive(Debug)]
struct RequestTarget {
    scheme: Scheme,
    host: Option<String>,
    port: Option<u16>,
    path: String,
    query: Option<String>,
}

impl RequestTarget {
    fn parse(target: &str) -> Option<Self> {
        // `a.example/x` names a host without a scheme; `Uri` only accepts that with one
        let schemeless_authority = !target.starts_with('/') && !target.contains("://") && target.contains('/');

        let uri = if schemeless_authority { Uri::from_str(&format!("http://{target}")) } else { Uri::from_str(target) }.ok()?;

        let scheme = match uri.scheme_str() {
            _ if schemeless_authority => Scheme::Unknown,
            Some(scheme) if scheme.eq_ignore_ascii_case("https") => Scheme::Https,
            Some(scheme) if scheme.eq_ignore_ascii_case("http") => Scheme::Http,
            Some(_) => return None,
            None => Scheme::Unknown,
        };

        let path = match uri.path() {
            "" => "/".to_string(),
            path => path.to_string(),
        };

        Some(Self {
            scheme,
            host: uri.host().map(str::to_ascii_lowercase),
            port: uri.port_u16(),
            path,
            query: uri.query().map(ToString::to_string),
        })
    }
}

/// `HTTP/` followed by a major version and an optional `.minor`.
pub(crate) fn is_http_version(token: &str) -> bool {
    let Some(number) = token.strip_prefix("HTTP/") else {
        return false;
    };
    let (major, minor) = match number.split_once('.') {
        Some((major, minor)) => (major, Some(minor)),
        None => (number, None),
    };
    let is_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    is_digits(major) && minor.is_none_or(is_digits)
}
