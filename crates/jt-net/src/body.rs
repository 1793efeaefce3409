//! Response body decoding: content codings and text charsets.

use crate::http::Header;
use brotli::Decompressor;
use encoding_rs::Encoding;
use encoding_rs::UTF_8;
use flate2::read::DeflateDecoder;
use flate2::read::GzDecoder;
use flate2::read::ZlibDecoder;
use jt_core::RunnerError;
use jt_core::RunnerResult;
use std::io::Read;

/// Undoes every `Content-Encoding` layer, last applied first.
pub fn decode_content_encoding(headers: &[Header], body: Vec<u8>) -> RunnerResult<Vec<u8>> {
    let codings: Vec<String> = headers
        .iter()
        .filter(|header| header.name.eq_ignore_ascii_case("content-encoding"))
        .flat_map(|header| header.value.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
        .collect();

    codings.iter().rev().try_fold(body, |decoded, coding| match coding.as_str() {
        "identity" => Ok(decoded),
        "gzip" | "x-gzip" => read_all(GzDecoder::new(decoded.as_slice()), "gzip"),
        "deflate" => {
            // Servers disagree on whether "deflate" means zlib-wrapped or raw.
            read_all(ZlibDecoder::new(decoded.as_slice()), "deflate")
                .or_else(|_| read_all(DeflateDecoder::new(decoded.as_slice()), "deflate"))
        }
        "br" => read_all(Decompressor::new(decoded.as_slice(), 4096), "brotli"),
        other => Err(RunnerError::new(
            "net.http.content_encoding_unsupported",
            format!("unsupported content encoding `{other}`"),
        )),
    })
}

fn read_all(mut decoder: impl Read, coding: &str) -> RunnerResult<Vec<u8>> {
    let mut decoded = Vec::new();
    decoder.read_to_end(&mut decoded).map_err(|error| {
        RunnerError::new(
            "net.http.decode_failed",
            format!("{coding} decode failed: {error}"),
        )
    })?;
    Ok(decoded)
}

/// `charset` parameter of a `Content-Type` value, unquoted.
pub fn charset_from_content_type(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|parameter| {
        let (name, value) = parameter.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let label = value.trim().trim_matches(|ch| ch == '"' || ch == '\'');
        (!label.is_empty()).then_some(label)
    })
}

/// Strictly decodes `body` as text.
///
/// A byte-order mark wins over the declared charset, the declared charset
/// wins over the UTF-8 default. Returns `None` when the bytes are malformed
/// for the chosen encoding; no replacement characters are ever produced.
pub fn decode_text(body: &[u8], content_type: Option<&str>) -> Option<String> {
    let declared = content_type
        .and_then(charset_from_content_type)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);
    let (encoding, bom_len) = Encoding::for_bom(body).unwrap_or((declared, 0));
    encoding
        .decode_without_bom_handling_and_without_replacement(&body[bom_len..])
        .map(|text| text.into_owned())
}
