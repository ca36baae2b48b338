//! RFC 5322 header handling: framing, folding, encoded-words (RFC 2047),
//! address lists, and date parsing.

use base64::Engine;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;
use tracing::{debug, warn};

/// Split a raw message (or body part) into its header block and body.
///
/// The header block ends at the first blank line. Without one, the whole
/// input is headers and the body is empty.
pub fn split_message(data: &[u8]) -> (&[u8], &[u8]) {
    match find_header_end(data) {
        Some((header_end, body_start)) => (&data[..header_end], &data[body_start..]),
        None => (data, &[]),
    }
}

/// Locate the blank line ending the header block.
///
/// Returns `(end of header bytes, start of body)`.
fn find_header_end(data: &[u8]) -> Option<(usize, usize)> {
    if data.starts_with(b"\r\n") {
        return Some((0, 2));
    }
    if data.starts_with(b"\n") {
        return Some((0, 1));
    }

    let mut from = 0;
    while let Some(rel) = memchr::memchr(b'\n', &data[from..]) {
        let i = from + rel;
        let rest = &data[i + 1..];
        let body_start = if rest.starts_with(b"\n") {
            Some(i + 2)
        } else if rest.starts_with(b"\r\n") {
            Some(i + 3)
        } else {
            None
        };
        if let Some(body_start) = body_start {
            let header_end = if i > 0 && data[i - 1] == b'\r' { i - 1 } else { i };
            return Some((header_end, body_start));
        }
        from = i + 1;
    }
    None
}

/// An unfolded header block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderBlock {
    /// `(lowercase_name, unfolded_value)` in header order.
    fields: Vec<(String, String)>,
}

impl HeaderBlock {
    /// Parse raw header bytes, joining continuation lines.
    ///
    /// Returns `None` when a line is neither a continuation nor a
    /// `name: value` field, or when the block starts with a continuation.
    pub fn parse(raw: &[u8]) -> Option<Self> {
        let text = decode_header_bytes(raw);
        let mut fields: Vec<(String, String)> = Vec::new();

        for line in text.lines() {
            if line.is_empty() {
                continue;
            }
            if line.starts_with(' ') || line.starts_with('\t') {
                let (_, value) = fields.last_mut()?;
                let cont = line.trim();
                if !cont.is_empty() {
                    if !value.is_empty() {
                        value.push(' ');
                    }
                    value.push_str(cont);
                }
                continue;
            }
            let colon = line.find(':')?;
            let name = &line[..colon];
            if name.is_empty() || name.bytes().any(|b| !b.is_ascii_graphic()) {
                return None;
            }
            fields.push((
                name.to_ascii_lowercase(),
                line[colon + 1..].trim().to_string(),
            ));
        }

        Some(Self { fields })
    }

    /// First value for a header name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every byte).
fn decode_header_bytes(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Why a header field could not be decoded.
#[derive(Error, Debug, PartialEq, Eq)]
enum FieldDecodeError {
    #[error("unknown charset {0:?} in encoded-word")]
    UnknownCharset(String),
}

/// Decode a header value's RFC 2047 encoded-words, falling back to the raw value.
///
/// A failure here only affects this one field.
pub fn decode_header_value(raw: &str) -> String {
    match decode_encoded_words(raw) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!(error = %e, value = raw, "Header decoding failed, keeping raw value");
            raw.to_string()
        }
    }
}

/// Decode RFC 2047 encoded-words in a header value.
///
/// Example: `"=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="` → `"Hola mundo"`
///
/// Words that are malformed or whose payload does not decode are kept
/// literally. A word naming an unknown charset fails the whole value.
fn decode_encoded_words(input: &str) -> Result<String, FieldDecodeError> {
    let mut result = String::with_capacity(input.len());
    let mut remaining = input;
    let mut last_was_encoded = false;

    while let Some(start) = remaining.find("=?") {
        let before = &remaining[..start];
        // Whitespace between two encoded words is dropped (RFC 2047 §6.2)
        if !last_was_encoded || !before.trim().is_empty() {
            result.push_str(before);
        }

        let after_start = &remaining[start + 2..];

        if let Some(decoded) = try_decode_one_word(after_start)? {
            result.push_str(&decoded.text);
            remaining = &remaining[start + 2 + decoded.consumed..];
            last_was_encoded = true;
        } else {
            result.push_str("=?");
            remaining = after_start;
            last_was_encoded = false;
        }
    }

    result.push_str(remaining);
    Ok(result)
}

struct DecodedWord {
    text: String,
    consumed: usize, // bytes consumed from the string *after* the initial "=?"
}

fn try_decode_one_word(s: &str) -> Result<Option<DecodedWord>, FieldDecodeError> {
    // Format: charset?encoding?encoded_text?=
    let Some(first_q) = s.find('?') else {
        return Ok(None);
    };
    let charset = &s[..first_q];

    let rest = &s[first_q + 1..];
    let Some(second_q) = rest.find('?') else {
        return Ok(None);
    };
    let encoding = &rest[..second_q];

    let rest2 = &rest[second_q + 1..];
    let Some(end) = rest2.find("?=") else {
        return Ok(None);
    };
    let encoded_text = &rest2[..end];

    if charset.is_empty() || encoded_text.contains(char::is_whitespace) {
        return Ok(None);
    }

    let total_consumed = first_q + 1 + second_q + 1 + end + 2;

    let bytes = match encoding {
        "B" | "b" => base64::engine::general_purpose::STANDARD
            .decode(encoded_text)
            .ok(),
        "Q" | "q" => decode_q_encoding(encoded_text),
        _ => None,
    };
    let Some(bytes) = bytes else {
        return Ok(None);
    };

    let text = decode_charset(charset, &bytes)?;

    Ok(Some(DecodedWord {
        text,
        consumed: total_consumed,
    }))
}

/// Decode Q-encoding (RFC 2047): underscores → spaces, `=XX` → byte.
fn decode_q_encoding(input: &str) -> Option<Vec<u8>> {
    let mut result = Vec::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                result.push(b' ');
                i += 1;
            }
            b'=' => {
                let hex = std::str::from_utf8(bytes.get(i + 1..i + 3)?).ok()?;
                result.push(u8::from_str_radix(hex, 16).ok()?);
                i += 3;
            }
            b => {
                result.push(b);
                i += 1;
            }
        }
    }
    Some(result)
}

/// Decode bytes using a named charset.
fn decode_charset(charset: &str, bytes: &[u8]) -> Result<String, FieldDecodeError> {
    // RFC 2231 language suffix: "utf-8*en"
    let charset = charset.split('*').next().unwrap_or(charset);
    if charset.eq_ignore_ascii_case("utf-8") || charset.eq_ignore_ascii_case("utf8") {
        return Ok(String::from_utf8_lossy(bytes).into_owned());
    }
    match encoding_rs::Encoding::for_label(charset.as_bytes()) {
        Some(encoding) => {
            let (decoded, _, _) = encoding.decode(bytes);
            Ok(decoded.into_owned())
        }
        None => Err(FieldDecodeError::UnknownCharset(charset.to_string())),
    }
}

/// Parse an address-list header (`To`, `Cc`, `Bcc`) into bare addresses.
///
/// Group members are flattened into the list. An empty or unparseable
/// value yields an empty list.
pub fn parse_address_list(raw: &str) -> Vec<String> {
    use mail_parser::{Address, MessageParser};

    if raw.trim().is_empty() {
        return Vec::new();
    }

    // Wrap the value in a minimal RFC 5322 message so mail-parser can parse it
    let carrier = format!("To: {raw}\r\n\r\n");
    let parser = MessageParser::default();
    let Some(parsed) = parser.parse(carrier.as_bytes()) else {
        debug!(value = raw, "Unparseable address list");
        return Vec::new();
    };

    let addrs: Vec<&mail_parser::Addr<'_>> = match parsed.to() {
        Some(Address::List(list)) => list.iter().collect(),
        Some(Address::Group(groups)) => groups
            .iter()
            .flat_map(|group| group.addresses.iter())
            .collect(),
        None => Vec::new(),
    };

    addrs
        .into_iter()
        .filter_map(|addr| addr.address.as_ref())
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect()
}

/// Parse an email date string in various common formats.
///
/// Supports RFC 2822, ISO 8601, and many broken real-world variants.
pub fn parse_date(date_str: &str) -> Option<DateTime<Utc>> {
    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    let no_dow = strip_day_of_week(trimmed);

    let formats = [
        "%d %b %Y %H:%M:%S %z",
        "%d %b %Y %H:%M:%S",
        "%d %b %Y %H:%M %z",
        "%b %d %H:%M:%S %Y",
        "%Y-%m-%d %H:%M:%S %z",
        "%Y-%m-%d %H:%M:%S",
    ];

    let candidates = [no_dow.clone(), replace_named_tz(&no_dow)];
    for candidate in &candidates {
        for fmt in &formats {
            if let Ok(dt) = DateTime::parse_from_str(candidate, fmt) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(ndt) = NaiveDateTime::parse_from_str(candidate, fmt) {
                return Some(Utc.from_utc_datetime(&ndt));
            }
        }
    }

    if let Some(dt) = mail_parser_date(trimmed) {
        return Some(dt);
    }

    warn!(date = trimmed, "Could not parse date");
    None
}

/// Attempt to parse a date using `mail-parser`'s built-in parser.
fn mail_parser_date(input: &str) -> Option<DateTime<Utc>> {
    use mail_parser::MessageParser;

    let fake_msg = format!("Date: {input}\n\n");
    let parser = MessageParser::default();
    let parsed = parser.parse(fake_msg.as_bytes())?;
    let dt = parsed.date()?.to_rfc3339();
    DateTime::parse_from_rfc3339(&dt)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Strip leading day-of-week prefix (e.g. "Thu, " or "Thu ").
fn strip_day_of_week(s: &str) -> String {
    let days = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
    for day in &days {
        if let Some(rest) = s.strip_prefix(day) {
            if rest.starts_with(',') || rest.starts_with(' ') {
                return rest.trim_start_matches(',').trim().to_string();
            }
        }
    }
    s.to_string()
}

/// Replace well-known timezone abbreviations with numeric offsets.
fn replace_named_tz(s: &str) -> String {
    let tzs = [
        ("EST", "-0500"),
        ("EDT", "-0400"),
        ("CST", "-0600"),
        ("CDT", "-0500"),
        ("MST", "-0700"),
        ("MDT", "-0600"),
        ("PST", "-0800"),
        ("PDT", "-0700"),
        ("GMT", "+0000"),
        ("UTC", "+0000"),
        ("UT", "+0000"),
        ("CEST", "+0200"),
        ("CET", "+0100"),
    ];
    for (name, offset) in &tzs {
        if let Some(head) = s.strip_suffix(name) {
            if head.ends_with(' ') {
                return format!("{head}{offset}");
            }
        }
    }
    s.to_string()
}
