//! Ingestion helpers for incoming mail: recipient-domain policy and the
//! header-only record a store keeps for listing views.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{MailError, Result};
use crate::parser::{parse_message, ParseMode};

/// The domain part of an address (everything after the first `@`).
pub fn address_domain(addr: &str) -> Option<&str> {
    addr.find('@').map(|i| &addr[i + 1..])
}

/// Whether `addr` is an inbox on `domain`. Domains compare ASCII case-insensitively.
pub fn accepts_recipient(addr: &str, domain: &str) -> bool {
    address_domain(bare_address(addr)).is_some_and(|d| d.eq_ignore_ascii_case(domain))
}

/// Strip surrounding whitespace and angle brackets from an envelope address.
fn bare_address(addr: &str) -> &str {
    let trimmed = addr.trim();
    trimmed
        .strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(trimmed)
}

/// What gets persisted for one delivered message.
#[derive(Debug, Clone, Serialize)]
pub struct InboxRecord {
    pub arrived_at: DateTime<Utc>,
    pub rcpt_addr: String,
    pub from_addr: String,
    pub subject: String,
    /// The message exactly as received; bodies are decoded on view.
    #[serde(skip)]
    pub raw: Vec<u8>,
}

impl InboxRecord {
    /// Accept a delivered message for `rcpt`.
    ///
    /// The recipient must belong to `domain`, and the message headers must
    /// frame. The body is not decoded here.
    pub fn ingest(
        raw: Vec<u8>,
        envelope_from: &str,
        rcpt: &str,
        domain: &str,
        arrived_at: DateTime<Utc>,
    ) -> Result<Self> {
        if !accepts_recipient(rcpt, domain) {
            debug!(rcpt, domain, "Rejecting recipient outside inbox domain");
            return Err(MailError::RecipientRejected(rcpt.to_string()));
        }

        let headers = parse_message(&raw, ParseMode::HeadersOnly)?;
        let from_addr = if headers.from.trim().is_empty() {
            bare_address(envelope_from).to_string()
        } else {
            headers.from
        };

        let record = Self {
            arrived_at,
            rcpt_addr: bare_address(rcpt).to_string(),
            from_addr,
            subject: headers.subject,
            raw,
        };
        info!(
            rcpt = %record.rcpt_addr,
            size = record.raw.len(),
            "Accepted message"
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn arrival() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_address_domain() {
        assert_eq!(address_domain("calm-red-otter@nthmail.test"), Some("nthmail.test"));
        assert_eq!(address_domain("no-domain"), None);
        assert_eq!(address_domain("trailing@"), Some(""));
    }

    #[test]
    fn test_accepts_recipient() {
        assert!(accepts_recipient("a@nthmail.test", "nthmail.test"));
        assert!(accepts_recipient("<a@NTHMAIL.test>", "nthmail.test"));
        assert!(!accepts_recipient("a@other.test", "nthmail.test"));
        assert!(!accepts_recipient("a@sub.nthmail.test", "nthmail.test"));
        assert!(!accepts_recipient("nthmail.test", "nthmail.test"));
    }

    #[test]
    fn test_ingest_extracts_headers() {
        let raw = b"From: =?UTF-8?Q?Ana_Mar=C3=ADa?= <ana@example.com>\r\n\
Subject: Welcome\r\n\
\r\n\
not decoded at ingest\r\n"
            .to_vec();
        let record =
            InboxRecord::ingest(raw, "bounce@example.com", "x@nthmail.test", "nthmail.test", arrival())
                .unwrap();
        assert_eq!(record.from_addr, "Ana María <ana@example.com>");
        assert_eq!(record.subject, "Welcome");
        assert_eq!(record.rcpt_addr, "x@nthmail.test");
        assert_eq!(record.arrived_at, arrival());
    }

    #[test]
    fn test_ingest_falls_back_to_envelope_sender() {
        let raw = b"Subject: anonymous\r\n\r\nhi\r\n".to_vec();
        let record =
            InboxRecord::ingest(raw, "<bounce@example.com>", "x@nthmail.test", "nthmail.test", arrival())
                .unwrap();
        assert_eq!(record.from_addr, "bounce@example.com");
    }

    #[test]
    fn test_ingest_rejects_foreign_domain() {
        let raw = b"Subject: hi\r\n\r\nhi\r\n".to_vec();
        let err = InboxRecord::ingest(raw, "a@b.c", "x@elsewhere.test", "nthmail.test", arrival())
            .unwrap_err();
        assert!(matches!(err, MailError::RecipientRejected(_)));
    }

    #[test]
    fn test_ingest_rejects_malformed_headers() {
        let raw = b"garbage without a colon\r\n\r\n".to_vec();
        let err = InboxRecord::ingest(raw, "a@b.c", "x@nthmail.test", "nthmail.test", arrival())
            .unwrap_err();
        assert!(matches!(err, MailError::MalformedMessage));
    }
}
