//! Loading of individual `.eml` files (raw RFC 5322 messages on disk).

use std::path::Path;

use crate::error::{MailError, Result};

/// Read a raw message file, refusing anything larger than `max_size` bytes.
///
/// A UTF-8 byte-order mark and a leading mbox `From ` separator line are
/// stripped, so files saved by common mail clients decode directly.
pub fn load_eml(path: impl AsRef<Path>, max_size: u64) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let metadata = std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            MailError::FileNotFound(path.to_path_buf())
        } else {
            MailError::io(path, e)
        }
    })?;

    if metadata.len() > max_size {
        return Err(MailError::MessageTooLarge {
            size: metadata.len(),
            limit: max_size,
        });
    }

    let data = std::fs::read(path).map_err(|e| MailError::io(path, e))?;
    Ok(strip_envelope_line(&data).to_vec())
}

/// Skip a BOM and the `From ` separator line that mbox exports carry.
fn strip_envelope_line(data: &[u8]) -> &[u8] {
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);

    if data.starts_with(b"From ") {
        if let Some(pos) = memchr::memchr(b'\n', data) {
            return &data[pos + 1..];
        }
    }
    data
}
