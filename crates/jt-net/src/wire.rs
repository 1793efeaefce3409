//! HTTP/1.1 response parsing over a buffered stream.

use crate::body::decode_content_encoding;
use crate::http::Header;
use crate::http::HttpMethod;
use crate::http::HttpResponse;
use crate::http::HttpStatusCode;
use crate::http::HttpVersion;
use crate::http::find_header;
use crate::http::header_has_token;
use jt_core::RunnerError;
use jt_core::RunnerResult;
use std::io::BufRead;
use std::io::Read;

const MAX_RESPONSE_HEAD_BYTES: usize = 128 * 1024;
const MAX_LINE_BYTES: usize = 8 * 1024;

/// How the response body is delimited on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyFraming {
    Empty,
    Chunked,
    Length(u64),
    UntilClose,
}

pub(crate) fn read_response<S: BufRead>(
    reader: &mut S,
    method: HttpMethod,
) -> RunnerResult<HttpResponse> {
    let (version, status, headers) = read_head(reader)?;
    let framing = body_framing(method, status, &headers)?;

    let raw_body = match framing {
        BodyFraming::Empty => Vec::new(),
        BodyFraming::Chunked => read_chunked(reader)?,
        BodyFraming::Length(len) => read_sized(reader, len)?,
        BodyFraming::UntilClose => {
            let mut body = Vec::new();
            reader
                .read_to_end(&mut body)
                .map_err(|error| body_read_error("connection-close body", &error))?;
            body
        }
    };

    let body = if framing == BodyFraming::Empty {
        raw_body
    } else {
        decode_content_encoding(&headers, raw_body)?
    };

    Ok(HttpResponse {
        version,
        status,
        headers,
        body,
    })
}

fn read_head<S: BufRead>(
    reader: &mut S,
) -> RunnerResult<(HttpVersion, HttpStatusCode, Vec<Header>)> {
    let status_line = read_line(reader)?.ok_or_else(|| {
        RunnerError::new(
            "net.http.unexpected_eof",
            "connection closed before the status line arrived",
        )
    })?;
    let (version, status) = parse_status_line(&status_line)?;

    let mut head_bytes = status_line.len();
    let mut headers = Vec::new();
    loop {
        let line = read_line(reader)?.ok_or_else(|| {
            RunnerError::new(
                "net.http.unexpected_eof",
                "unexpected EOF before response head completed",
            )
        })?;
        if line.is_empty() {
            break;
        }

        head_bytes += line.len();
        if head_bytes > MAX_RESPONSE_HEAD_BYTES {
            return Err(RunnerError::new(
                "net.http.head_too_large",
                format!("HTTP response head exceeds {MAX_RESPONSE_HEAD_BYTES} bytes"),
            ));
        }

        let (name, value) = line.split_once(':').ok_or_else(|| {
            RunnerError::new(
                "net.http.header_invalid",
                format!("invalid HTTP header line `{line}`"),
            )
        })?;
        headers.push(Header::new(name.trim(), value.trim())?);
    }

    Ok((version, status, headers))
}

fn parse_status_line(line: &str) -> RunnerResult<(HttpVersion, HttpStatusCode)> {
    let mut parts = line.splitn(3, ' ');
    let (Some(version), Some(code)) = (parts.next(), parts.next()) else {
        return Err(RunnerError::new(
            "net.http.status_line_invalid",
            format!("malformed status line `{line}`"),
        ));
    };

    let version = HttpVersion::parse(version)?;
    let code = code.parse::<u16>().map_err(|error| {
        RunnerError::new(
            "net.http.status_line_invalid",
            format!("invalid status code `{code}`: {error}"),
        )
    })?;
    Ok((version, HttpStatusCode::new(code)?))
}

fn body_framing(
    method: HttpMethod,
    status: HttpStatusCode,
    headers: &[Header],
) -> RunnerResult<BodyFraming> {
    if method == HttpMethod::Head || !status.allows_body() {
        return Ok(BodyFraming::Empty);
    }

    if find_header(headers, "transfer-encoding").is_some() {
        if header_has_token(headers, "transfer-encoding", "chunked") {
            return Ok(BodyFraming::Chunked);
        }
        return Err(RunnerError::new(
            "net.http.transfer_encoding_unsupported",
            "only chunked transfer encoding is supported",
        ));
    }

    let mut length: Option<u64> = None;
    for header in headers
        .iter()
        .filter(|header| header.name.eq_ignore_ascii_case("content-length"))
    {
        let parsed = header.value.trim().parse::<u64>().map_err(|error| {
            RunnerError::new(
                "net.http.content_length_invalid",
                format!("invalid Content-Length `{}`: {error}", header.value),
            )
        })?;
        if length.is_some_and(|existing| existing != parsed) {
            return Err(RunnerError::new(
                "net.http.content_length_conflict",
                "conflicting Content-Length headers in response",
            ));
        }
        length = Some(parsed);
    }

    Ok(length.map_or(BodyFraming::UntilClose, BodyFraming::Length))
}

fn read_sized<S: BufRead>(reader: &mut S, len: u64) -> RunnerResult<Vec<u8>> {
    let mut body = Vec::new();
    reader
        .by_ref()
        .take(len)
        .read_to_end(&mut body)
        .map_err(|error| body_read_error("body", &error))?;
    if (body.len() as u64) < len {
        return Err(RunnerError::new(
            "net.http.unexpected_eof",
            format!("body ended after {} of {len} bytes", body.len()),
        ));
    }
    Ok(body)
}

fn read_chunked<S: BufRead>(reader: &mut S) -> RunnerResult<Vec<u8>> {
    let mut body = Vec::new();
    loop {
        let size_line = read_line(reader)?.ok_or_else(|| {
            RunnerError::new("net.http.unexpected_eof", "chunked body ended without a last chunk")
        })?;
        let token = size_line.split(';').next().unwrap_or_default().trim();
        if token.is_empty() {
            continue;
        }

        let size = u64::from_str_radix(token, 16).map_err(|error| {
            RunnerError::new(
                "net.http.chunk_size_invalid",
                format!("invalid chunk size `{token}`: {error}"),
            )
        })?;
        if size == 0 {
            // Trailers are read and discarded.
            while read_line(reader)?.is_some_and(|line| !line.is_empty()) {}
            return Ok(body);
        }

        body.extend(read_sized(reader, size)?);
        if read_line(reader)?.is_none_or(|line| !line.is_empty()) {
            return Err(RunnerError::new(
                "net.http.chunk_terminator_invalid",
                "chunk data is missing trailing CRLF",
            ));
        }
    }
}

/// Reads one CRLF (or bare LF) terminated line; `None` at clean EOF.
fn read_line<S: BufRead>(reader: &mut S) -> RunnerResult<Option<String>> {
    let mut line = Vec::new();
    let read = reader
        .by_ref()
        .take(MAX_LINE_BYTES as u64 + 1)
        .read_until(b'\n', &mut line)
        .map_err(|error| body_read_error("line", &error))?;
    if read == 0 {
        return Ok(None);
    }

    if line.last() != Some(&b'\n') {
        return Err(if line.len() > MAX_LINE_BYTES {
            RunnerError::new(
                "net.http.line_too_large",
                format!("protocol line exceeds {MAX_LINE_BYTES} bytes"),
            )
        } else {
            RunnerError::new("net.http.unexpected_eof", "connection closed mid-line")
        });
    }

    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    String::from_utf8(line).map(Some).map_err(|error| {
        RunnerError::new(
            "net.http.line_invalid_utf8",
            format!("protocol line is not valid UTF-8: {error}"),
        )
    })
}

fn body_read_error(what: &str, error: &std::io::Error) -> RunnerError {
    RunnerError::new(
        "net.http.read_body_failed",
        format!("failed while reading HTTP response {what}: {error}"),
    )
}

#[cfg(test)]
mod tests {
    use super::read_response;
    use crate::http::HttpMethod;
    use crate::http::HttpVersion;
    use std::io::Cursor;

    fn parse(raw: &[u8], method: HttpMethod) -> crate::http::HttpResponse {
        match read_response(&mut Cursor::new(raw.to_vec()), method) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        }
    }

    #[test]
    fn reads_content_length_body() {
        let response = parse(
            b"HTTP/1.0 200 OK\r\nContent-Length: 2\r\n\r\nokEXTRA",
            HttpMethod::Get,
        );
        assert_eq!(response.version, HttpVersion::Http10);
        assert_eq!(response.status.as_u16(), 200);
        assert_eq!(response.body, b"ok");
    }

    #[test]
    fn reads_chunked_body_with_trailers() {
        let response = parse(
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n\
              4\r\nWiki\r\n5;ext=1\r\npedia\r\n0\r\nX-Trailer: yes\r\n\r\n",
            HttpMethod::Get,
        );
        assert_eq!(response.body, b"Wikipedia");
    }

    #[test]
    fn reads_until_close_without_length() {
        let response = parse(b"HTTP/1.1 200 OK\r\n\r\nstreamed", HttpMethod::Get);
        assert_eq!(response.body, b"streamed");
    }

    #[test]
    fn head_and_no_content_have_empty_bodies() {
        let head = parse(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\n", HttpMethod::Head);
        assert!(head.body.is_empty());
        let no_content = parse(b"HTTP/1.1 204 No Content\r\n\r\nignored", HttpMethod::Get);
        assert!(no_content.body.is_empty());
    }

    #[test]
    fn reports_protocol_errors_by_code() {
        let cases: [(&[u8], &str); 4] = [
            (
                b"HTTP/1.1 200 OK\r\nTransfer-Encoding: gzip\r\n\r\nbody",
                "net.http.transfer_encoding_unsupported",
            ),
            (
                b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nZ\r\nx\r\n0\r\n\r\n",
                "net.http.chunk_size_invalid",
            ),
            (
                b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nshort",
                "net.http.unexpected_eof",
            ),
            (b"SPDY/3 200 OK\r\n\r\n", "net.http.version_unsupported"),
        ];
        for (raw, code) in cases {
            let outcome = read_response(&mut Cursor::new(raw.to_vec()), HttpMethod::Get);
            match outcome {
                Ok(_) => panic!("expected `{code}`"),
                Err(error) => assert_eq!(error.code, code),
            }
        }
    }
}
