//! HTTP request/response types.

use crate::url::FetchUrl;
use jt_core::RunnerError;
use jt_core::RunnerResult;

/// Outbound methods the fetch bridge issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Head,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
        }
    }
}

/// HTTP protocol version reported on the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVersion {
    Http10,
    Http11,
}

impl HttpVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http10 => "HTTP/1.0",
            Self::Http11 => "HTTP/1.1",
        }
    }

    pub fn parse(token: &str) -> RunnerResult<Self> {
        match token {
            "HTTP/1.0" => Ok(Self::Http10),
            "HTTP/1.1" => Ok(Self::Http11),
            other => Err(RunnerError::new(
                "net.http.version_unsupported",
                format!("unsupported response version `{other}`"),
            )),
        }
    }
}

/// Single header with a wire-safe name and value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: &str, value: &str) -> RunnerResult<Self> {
        if name.is_empty() || !name.bytes().all(is_token_char) {
            return Err(RunnerError::new(
                "net.http.header_name_invalid",
                format!("invalid HTTP header name `{name}`"),
            ));
        }
        if value.bytes().any(|byte| matches!(byte, b'\r' | b'\n' | 0)) {
            return Err(RunnerError::new(
                "net.http.header_value_invalid",
                format!("invalid characters found in HTTP header `{name}`"),
            ));
        }
        Ok(Self {
            name: name.to_owned(),
            value: value.to_owned(),
        })
    }
}

/// Case-insensitive lookup of the first header named `name`.
pub fn find_header<'a>(headers: &'a [Header], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|header| header.name.eq_ignore_ascii_case(name))
        .map(|header| header.value.as_str())
}

/// True when any comma-separated token of header `name` equals `token`.
pub fn header_has_token(headers: &[Header], name: &str, token: &str) -> bool {
    headers
        .iter()
        .filter(|header| header.name.eq_ignore_ascii_case(name))
        .flat_map(|header| header.value.split(','))
        .any(|value| value.trim().eq_ignore_ascii_case(token))
}

/// Outgoing request. Bodies are never sent: fetch only issues GET/HEAD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: FetchUrl,
    pub headers: Vec<Header>,
}

impl HttpRequest {
    pub fn builder(method: HttpMethod, url: FetchUrl) -> HttpRequestBuilder {
        HttpRequestBuilder {
            method,
            url,
            headers: Vec::new(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Serialized request head, ready to be written to the stream.
    pub fn encode(&self) -> Vec<u8> {
        let mut head = format!(
            "{} {} {}\r\n",
            self.method.as_str(),
            self.url.path_and_query(),
            HttpVersion::Http11.as_str()
        );
        for header in &self.headers {
            head.push_str(&header.name);
            head.push_str(": ");
            head.push_str(&header.value);
            head.push_str("\r\n");
        }
        head.push_str("\r\n");
        head.into_bytes()
    }
}

/// Builder for [`HttpRequest`]; adds `Host` automatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequestBuilder {
    method: HttpMethod,
    url: FetchUrl,
    headers: Vec<Header>,
}

impl HttpRequestBuilder {
    pub fn header(mut self, name: &str, value: &str) -> RunnerResult<Self> {
        if name.eq_ignore_ascii_case("host") && find_header(&self.headers, "host").is_some() {
            return Err(RunnerError::new(
                "net.http.duplicate_header",
                "header `host` must appear at most once",
            ));
        }
        self.headers.push(Header::new(name, value)?);
        Ok(self)
    }

    pub fn build(mut self) -> RunnerResult<HttpRequest> {
        if find_header(&self.headers, "host").is_none() {
            let host = self.url.authority();
            self.headers.insert(0, Header::new("Host", &host)?);
        }
        Ok(HttpRequest {
            method: self.method,
            url: self.url,
            headers: self.headers,
        })
    }
}

/// Validated status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HttpStatusCode(u16);

impl HttpStatusCode {
    pub fn new(code: u16) -> RunnerResult<Self> {
        if (100..=599).contains(&code) {
            return Ok(Self(code));
        }
        Err(RunnerError::new(
            "net.http.status_invalid",
            format!("status code must be 100-599, got `{code}`"),
        ))
    }

    pub fn as_u16(self) -> u16 {
        self.0
    }

    pub fn is_success(self) -> bool {
        (200..=299).contains(&self.0)
    }

    pub fn is_redirect(self) -> bool {
        matches!(self.0, 301 | 302 | 303 | 307 | 308)
    }

    pub fn allows_body(self) -> bool {
        !((100..200).contains(&self.0) || self.0 == 204 || self.0 == 304)
    }
}

/// Incoming response with a fully decoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub version: HttpVersion,
    pub status: HttpStatusCode,
    pub headers: Vec<Header>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

fn is_token_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric()
        || matches!(
            byte,
            b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_'
                | b'`' | b'|' | b'~'
        )
}
