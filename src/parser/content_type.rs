//! `Content-Type` header values (RFC 2045 §5.1).

/// A parsed `type/subtype; name=value` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    primary: String,
    sub: String,
    /// Parameters in header order, names lowercased.
    params: Vec<(String, String)>,
}

impl ContentType {
    /// Parse a header value. Returns `None` when no `type/subtype` token is present.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let (type_part, params_part) = match value.find(';') {
            Some(i) => (value[..i].trim(), &value[i + 1..]),
            None => (value, ""),
        };
        let slash = type_part.find('/')?;
        let primary = type_part[..slash].trim();
        let sub = type_part[slash + 1..].trim();
        if !is_token(primary) || !is_token(sub) {
            return None;
        }
        Some(Self {
            primary: primary.to_string(),
            sub: sub.to_string(),
            params: parse_params(params_part),
        })
    }

    /// Lowercased `type/subtype`.
    pub fn essence(&self) -> String {
        format!(
            "{}/{}",
            self.primary.to_ascii_lowercase(),
            self.sub.to_ascii_lowercase()
        )
    }

    pub fn is_multipart(&self) -> bool {
        self.primary.eq_ignore_ascii_case("multipart")
    }

    pub fn is_sub_type(&self, sub: &str) -> bool {
        self.sub.eq_ignore_ascii_case(sub)
    }

    /// Look up a parameter by case-insensitive name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The `boundary` parameter, if present and non-empty.
    pub fn boundary(&self) -> Option<&str> {
        self.param("boundary").filter(|b| !b.is_empty())
    }
}

/// Parse a `; name=value; name="quoted value"` list.
///
/// An entry with no `=` or with a non-token name is dropped on its own;
/// the entries after it still parse.
fn parse_params(input: &str) -> Vec<(String, String)> {
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut params = Vec::new();
    let mut pos = 0;

    while pos < len {
        while pos < len && (bytes[pos] == b';' || bytes[pos].is_ascii_whitespace()) {
            pos += 1;
        }
        if pos >= len {
            break;
        }
        let Some(sep) = bytes[pos..].iter().position(|&b| b == b'=' || b == b';') else {
            break;
        };
        if bytes[pos + sep] == b';' {
            pos += sep;
            continue;
        }
        let name = input[pos..pos + sep].trim();
        pos += sep + 1;
        while pos < len && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }

        let value = if pos < len && bytes[pos] == b'"' {
            pos += 1;
            let mut v = Vec::new();
            while pos < len {
                match bytes[pos] {
                    b'\\' if pos + 1 < len => {
                        v.push(bytes[pos + 1]);
                        pos += 2;
                    }
                    b'"' => {
                        pos += 1;
                        break;
                    }
                    c => {
                        v.push(c);
                        pos += 1;
                    }
                }
            }
            String::from_utf8_lossy(&v).into_owned()
        } else {
            let end = bytes[pos..]
                .iter()
                .position(|&b| b == b';')
                .map(|i| pos + i)
                .unwrap_or(len);
            let v = input[pos..end].trim().to_string();
            pos = end;
            v
        };

        // Skip to the next separator after a quoted value.
        while pos < len && bytes[pos] != b';' {
            pos += 1;
        }

        if is_token(name) {
            params.push((name.to_ascii_lowercase(), value));
        }
    }

    params
}

/// RFC 2045 token: printable ASCII, no spaces or tspecials.
fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_graphic()
                && !matches!(
                    b,
                    b'(' | b')'
                        | b'<'
                        | b'>'
                        | b'@'
                        | b','
                        | b';'
                        | b':'
                        | b'\\'
                        | b'"'
                        | b'/'
                        | b'['
                        | b']'
                        | b'?'
                        | b'='
                )
        })
}
