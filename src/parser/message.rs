//! Top-level message decoding: envelope headers, then the body by shape.

use tracing::debug;

use crate::config::ParserConfig;
use crate::error::{MailError, Result};
use crate::model::mail::{BodyFormat, DecodedBodyPart, Layout, StructuredMessage};
use crate::parser::content_type::ContentType;
use crate::parser::header::{decode_header_value, parse_address_list, split_message, HeaderBlock};
use crate::parser::multipart::{MultipartWalker, MAX_NESTING_DEPTH};
use crate::parser::transfer::decode_transfer;

/// How much of a message to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Envelope headers only; the body is never looked at.
    HeadersOnly,
    /// Headers plus every body part.
    Full,
}

/// Decodes raw RFC 5322 messages into [`StructuredMessage`]s.
///
/// Holds no state between calls and can be shared freely across threads.
#[derive(Debug, Clone, Copy)]
pub struct MessageDecoder {
    walker: MultipartWalker,
}

impl Default for MessageDecoder {
    fn default() -> Self {
        Self::with_max_depth(MAX_NESTING_DEPTH)
    }
}

impl MessageDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder that refuses multipart nesting deeper than `max_depth`.
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            walker: MultipartWalker::new(max_depth),
        }
    }

    pub fn from_config(config: &ParserConfig) -> Self {
        Self::with_max_depth(config.max_nesting_depth)
    }

    /// Decode `raw` into a structured message.
    ///
    /// Any failure aborts the whole call. Individual header fields that
    /// fail RFC 2047 decoding keep their raw value instead.
    pub fn parse(&self, raw: &[u8], mode: ParseMode) -> Result<StructuredMessage> {
        let (raw_headers, body) = split_message(raw);
        let headers = HeaderBlock::parse(raw_headers).ok_or(MailError::MalformedMessage)?;
        if headers.is_empty() && body.is_empty() {
            return Err(MailError::MalformedMessage);
        }

        let mut message = decode_envelope(&headers);
        if mode == ParseMode::HeadersOnly {
            return Ok(message);
        }

        let raw_type = headers.get("content-type").unwrap_or_default();
        let content_type = ContentType::parse(raw_type)
            .ok_or_else(|| MailError::CannotDetermineContentType(raw_type.to_string()))?;

        if !content_type.is_multipart() {
            // Single-part bodies are always shown as plain text.
            let decoded = decode_transfer(headers.get("content-transfer-encoding"), body)?;
            message.layout = Layout::SinglePart;
            message.body_parts.push(DecodedBodyPart {
                format: BodyFormat::PlainText,
                text: String::from_utf8_lossy(&decoded).into_owned(),
            });
            return Ok(message);
        }

        message.layout = if content_type.is_sub_type("alternative") {
            Layout::MultipartAlternative
        } else if content_type.is_sub_type("mixed") {
            Layout::MultipartMixed
        } else {
            return Err(MailError::UnsupportedMultipartType(content_type.essence()));
        };

        message.body_parts = match content_type.boundary() {
            Some(boundary) => self.walker.walk(body, boundary)?,
            None => {
                debug!(content_type = raw_type, "Multipart message without boundary");
                Vec::new()
            }
        };

        debug!(
            layout = ?message.layout,
            parts = message.body_parts.len(),
            "Decoded message body"
        );
        Ok(message)
    }
}

/// Decode a message with the default nesting limit.
pub fn parse_message(raw: &[u8], mode: ParseMode) -> Result<StructuredMessage> {
    MessageDecoder::default().parse(raw, mode)
}

/// Decode the envelope-relevant headers. Never fails.
fn decode_envelope(headers: &HeaderBlock) -> StructuredMessage {
    let field = |name: &str| decode_header_value(headers.get(name).unwrap_or_default());
    let addresses = |name: &str| parse_address_list(headers.get(name).unwrap_or_default());

    StructuredMessage {
        from: field("from"),
        to: addresses("to"),
        cc: addresses("cc"),
        bcc: addresses("bcc"),
        subject: field("subject"),
        date: field("date"),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALTERNATIVE: &[u8] = b"From: Alice <alice@example.com>\r\n\
To: bob@example.com\r\n\
Subject: Hello\r\n\
Content-Type: multipart/alternative; boundary=\"alt\"\r\n\
\r\n\
--alt\r\n\
Content-Type: text/plain\r\n\
\r\n\
Hi Bob\r\n\
--alt\r\n\
Content-Type: text/html\r\n\
\r\n\
<b>Hi Bob</b>\r\n\
--alt--\r\n";

    #[test]
    fn test_parse_alternative() {
        let msg = parse_message(ALTERNATIVE, ParseMode::Full).unwrap();
        assert_eq!(msg.from, "Alice <alice@example.com>");
        assert_eq!(msg.to, vec!["bob@example.com"]);
        assert!(msg.cc.is_empty());
        assert_eq!(msg.subject, "Hello");
        assert_eq!(msg.layout, Layout::MultipartAlternative);
        assert_eq!(msg.body_parts.len(), 2);
        assert_eq!(msg.body_parts[0].format, BodyFormat::PlainText);
        assert_eq!(msg.body_parts[0].text, "Hi Bob");
        assert_eq!(msg.body_parts[1].format, BodyFormat::Html);
        assert_eq!(msg.preferred_index, None);
    }

    #[test]
    fn test_headers_only_skips_body() {
        let msg = parse_message(ALTERNATIVE, ParseMode::HeadersOnly).unwrap();
        assert_eq!(msg.subject, "Hello");
        assert!(msg.body_parts.is_empty());
        assert_eq!(msg.layout, Layout::SinglePart);
        assert_eq!(msg.preferred_index, None);
    }

    #[test]
    fn test_single_part_ignores_declared_subtype() {
        let raw = b"Subject: x\nContent-Type: text/html\n\n<p>raw</p>\n";
        let msg = parse_message(raw, ParseMode::Full).unwrap();
        assert_eq!(msg.layout, Layout::SinglePart);
        assert_eq!(msg.body_parts.len(), 1);
        assert_eq!(msg.body_parts[0].format, BodyFormat::PlainText);
        assert_eq!(msg.body_parts[0].text, "<p>raw</p>\n");
    }

    #[test]
    fn test_single_part_transfer_decoded() {
        let raw = b"Content-Type: text/plain\r\nContent-Transfer-Encoding: Base64\r\n\r\naGVsbG8=\r\n";
        let msg = parse_message(raw, ParseMode::Full).unwrap();
        assert_eq!(msg.body_parts[0].text, "hello");
    }

    #[test]
    fn test_missing_content_type_when_body_requested() {
        let raw = b"Subject: none\r\n\r\nbody\r\n";
        assert!(parse_message(raw, ParseMode::HeadersOnly).is_ok());
        let err = parse_message(raw, ParseMode::Full).unwrap_err();
        assert!(matches!(err, MailError::CannotDetermineContentType(_)));
    }

    #[test]
    fn test_unsupported_multipart_subtype() {
        let raw = b"Content-Type: multipart/related; boundary=r\r\n\r\n--r\r\nContent-Type: text/plain\r\n\r\nx\r\n--r--\r\n";
        match parse_message(raw, ParseMode::Full) {
            Err(MailError::UnsupportedMultipartType(t)) => assert_eq!(t, "multipart/related"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_multipart_subtype_case_insensitive() {
        let raw = b"Content-Type: Multipart/MIXED; boundary=m\r\n\r\n--m\r\nContent-Type: text/markdown\r\n\r\n# hi\r\n--m--\r\n";
        let msg = parse_message(raw, ParseMode::Full).unwrap();
        assert_eq!(msg.layout, Layout::MultipartMixed);
        assert_eq!(msg.body_parts[0].format, BodyFormat::Markdown);
    }

    #[test]
    fn test_multipart_without_boundary_is_empty() {
        let raw = b"Content-Type: multipart/mixed\r\n\r\nanything\r\n";
        let msg = parse_message(raw, ParseMode::Full).unwrap();
        assert_eq!(msg.layout, Layout::MultipartMixed);
        assert!(msg.body_parts.is_empty());
    }

    #[test]
    fn test_malformed_header_block() {
        assert!(matches!(
            parse_message(b"", ParseMode::HeadersOnly),
            Err(MailError::MalformedMessage)
        ));
        assert!(matches!(
            parse_message(b"no colon on this line\r\n\r\nbody", ParseMode::HeadersOnly),
            Err(MailError::MalformedMessage)
        ));
    }

    #[test]
    fn test_decoder_depth_from_config() {
        let config = ParserConfig {
            max_nesting_depth: 1,
            ..Default::default()
        };
        let raw = b"Content-Type: multipart/mixed; boundary=o\r\n\r\n\
--o\r\n\
Content-Type: multipart/alternative; boundary=i\r\n\
\r\n\
--i\r\n\
Content-Type: text/plain\r\n\
\r\n\
x\r\n\
--i--\r\n\
--o--\r\n";
        let err = MessageDecoder::from_config(&config)
            .parse(raw, ParseMode::Full)
            .unwrap_err();
        assert!(matches!(err, MailError::TooDeeplyNested { limit: 1 }));
        assert!(MessageDecoder::new().parse(raw, ParseMode::Full).is_ok());
    }
}
