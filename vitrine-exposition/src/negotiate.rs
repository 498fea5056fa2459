//! Content negotiation from client-supplied request headers.
//!
//! Both functions are pure: the same headers always yield the same answer,
//! and malformed input only ever degrades to the defaults (text, identity).

use crate::compress::Compression;
use crate::format::ExpositionFormat;
use http::HeaderMap;
use http::header::{ACCEPT, ACCEPT_ENCODING};

const PROTOBUF_MEDIA_TYPE: (&str, &str) = ("application", "vnd.google.protobuf");
const PROTOBUF_PROTO: &str = "io.prometheus.client.MetricFamily";
const TEXT_VERSION: &str = "0.0.4";

/// Pick the exposition format from the `Accept` header.
///
/// Media ranges are tried by descending `q`, more specific ranges first on a
/// tie. The first supported one wins; otherwise plain text.
pub fn negotiate_format(headers: &HeaderMap) -> ExpositionFormat {
    let Some(accept) = headers.get(ACCEPT).and_then(|v| v.to_str().ok()) else {
        return ExpositionFormat::default();
    };

    for range in parse_accept(accept) {
        if range.is(PROTOBUF_MEDIA_TYPE)
            && range.param("proto") == Some(PROTOBUF_PROTO)
            && range.param("encoding") == Some("delimited")
        {
            return ExpositionFormat::ProtobufDelimited;
        }
        if range.is(("text", "plain")) && matches!(range.param("version"), None | Some(TEXT_VERSION)) {
            return ExpositionFormat::Text;
        }
    }
    ExpositionFormat::default()
}

/// Pick the response compression from the `Accept-Encoding` header.
pub fn negotiate_encoding(headers: &HeaderMap, disabled: bool) -> Compression {
    compression_for(headers.get(ACCEPT_ENCODING).map(|v| v.as_bytes()), disabled)
}

/// Pick the response compression from a raw `Accept-Encoding` value.
///
/// Any token that is exactly `gzip` or starts with `gzip;` selects gzip.
/// Quality values are not weighed, so `gzip;q=0` still counts.
pub fn compression_for(accept_encoding: Option<&[u8]>, disabled: bool) -> Compression {
    if disabled {
        return Compression::None;
    }
    let Some(raw) = accept_encoding else {
        return Compression::None;
    };
    let value = String::from_utf8_lossy(raw);
    let gzip = value
        .split(',')
        .map(str::trim)
        .any(|token| token == "gzip" || token.starts_with("gzip;"));
    if gzip { Compression::Gzip } else { Compression::None }
}

/// One entry of an `Accept` header.
#[derive(Debug)]
struct MediaRange<'a> {
    kind: &'a str,
    subtype: &'a str,
    q: f32,
    params: Vec<(&'a str, &'a str)>,
}

impl MediaRange<'_> {
    fn is(&self, (kind, subtype): (&str, &str)) -> bool {
        self.kind.eq_ignore_ascii_case(kind) && self.subtype.eq_ignore_ascii_case(subtype)
    }

    fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| *v)
    }

    fn specificity(&self) -> u8 {
        match (self.kind, self.subtype) {
            ("*", _) => 0,
            (_, "*") => 1,
            _ => 2,
        }
    }
}

/// Parse and order an `Accept` header. Ranges with `q=0` are dropped.
fn parse_accept(header: &str) -> Vec<MediaRange<'_>> {
    let mut ranges: Vec<MediaRange<'_>> = header
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split(';');
            let media = parts.next()?.trim();
            let (kind, subtype) = match media.split_once('/') {
                Some((k, s)) => (k.trim(), s.trim()),
                None if media == "*" => ("*", "*"),
                None => return None,
            };
            if kind.is_empty() || subtype.is_empty() {
                return None;
            }

            let mut q = 1.0;
            let mut params = Vec::new();
            for param in parts {
                let Some((key, value)) = param.split_once('=') else {
                    continue;
                };
                let key = key.trim();
                let value = value.trim().trim_matches('"');
                if key.eq_ignore_ascii_case("q") {
                    q = value.parse::<f32>().unwrap_or(0.0);
                } else {
                    params.push((key, value));
                }
            }
            Some(MediaRange { kind, subtype, q, params })
        })
        .filter(|range| range.q > 0.0)
        .collect();

    // Stable: equal ranges keep header order.
    ranges.sort_by(|a, b| {
        b.q.total_cmp(&a.q)
            .then_with(|| b.specificity().cmp(&a.specificity()))
    });
    ranges
}
