//! A RESP-like codec for the durable stream backend's command/reply
//! protocol: bulk strings, simple strings, errors, integers, and arrays.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    Simple(String),
    Error(String),
    Integer(i64),
    /// `None` represents the null bulk string (`$-1\r\n`).
    Bulk(Option<Vec<u8>>),
    /// `None` represents the null array (`*-1\r\n`).
    Array(Option<Vec<RespValue>>),
}

impl RespValue {
    pub fn as_simple(&self) -> Option<&str> {
        match self {
            RespValue::Simple(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bulk_str(&self) -> Option<&str> {
        match self {
            RespValue::Bulk(Some(bytes)) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[RespValue]> {
        match self {
            RespValue::Array(Some(items)) => Some(items),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RespError {
    #[error("malformed RESP frame: {0}")]
    Malformed(&'static str),
}

/// Encodes a command as an array of bulk strings, the standard RESP
/// request form (`*N\r\n$len\r\narg\r\n...`).
pub fn encode_command<I, A>(args: I) -> Vec<u8>
where
    I: IntoIterator<Item = A>,
    A: AsRef<[u8]>,
{
    let args: Vec<Vec<u8>> = args.into_iter().map(|a| a.as_ref().to_vec()).collect();
    let mut out = Vec::new();
    out.extend_from_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        out.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        out.extend_from_slice(&arg);
        out.extend_from_slice(b"\r\n");
    }
    out
}

/// Parses one reply at the head of `buf`.
///
/// Returns `Ok(None)` when `buf` does not yet contain a complete value, so
/// callers reading off a socket can retry once more bytes arrive.
pub fn parse(buf: &[u8]) -> Result<Option<(RespValue, usize)>, RespError> {
    parse_at(buf, 0)
}

fn find_crlf(buf: &[u8], start: usize) -> Option<usize> {
    buf[start..]
        .windows(2)
        .position(|w| w == b"\r\n")
        .map(|p| start + p)
    // Note: search is O(n) per call; replies are short so this is fine.
}

fn parse_at(buf: &[u8], start: usize) -> Result<Option<(RespValue, usize)>, RespError> {
    if start >= buf.len() {
        return Ok(None);
    }
    let tag = buf[start];
    let line_start = start + 1;
    match tag {
        b'+' | b'-' | b':' => {
            let Some(crlf) = find_crlf(buf, line_start) else {
                return Ok(None);
            };
            let text = std::str::from_utf8(&buf[line_start..crlf])
                .map_err(|_| RespError::Malformed("non-utf8 simple line"))?
                .to_owned();
            let value = match tag {
                b'+' => RespValue::Simple(text),
                b'-' => RespValue::Error(text),
                b':' => RespValue::Integer(
                    text.parse()
                        .map_err(|_| RespError::Malformed("invalid integer"))?,
                ),
                _ => unreachable!(),
            };
            Ok(Some((value, crlf + 2)))
        }
        b'$' => {
            let Some(crlf) = find_crlf(buf, line_start) else {
                return Ok(None);
            };
            let len_str = std::str::from_utf8(&buf[line_start..crlf])
                .map_err(|_| RespError::Malformed("non-utf8 bulk length"))?;
            let len: i64 = len_str
                .parse()
                .map_err(|_| RespError::Malformed("invalid bulk length"))?;
            if len < 0 {
                return Ok(Some((RespValue::Bulk(None), crlf + 2)));
            }
            let len = len as usize;
            let data_start = crlf + 2;
            let data_end = data_start + len;
            if buf.len() < data_end + 2 {
                return Ok(None);
            }
            if &buf[data_end..data_end + 2] != b"\r\n" {
                return Err(RespError::Malformed("bulk string missing trailing CRLF"));
            }
            Ok(Some((
                RespValue::Bulk(Some(buf[data_start..data_end].to_vec())),
                data_end + 2,
            )))
        }
        b'*' => {
            let Some(crlf) = find_crlf(buf, line_start) else {
                return Ok(None);
            };
            let len_str = std::str::from_utf8(&buf[line_start..crlf])
                .map_err(|_| RespError::Malformed("non-utf8 array length"))?;
            let len: i64 = len_str
                .parse()
                .map_err(|_| RespError::Malformed("invalid array length"))?;
            if len < 0 {
                return Ok(Some((RespValue::Array(None), crlf + 2)));
            }
            let mut items = Vec::with_capacity(len as usize);
            let mut cursor = crlf + 2;
            for _ in 0..len {
                match parse_at(buf, cursor)? {
                    Some((value, next)) => {
                        items.push(value);
                        cursor = next;
                    }
                    None => return Ok(None),
                }
            }
            Ok(Some((RespValue::Array(Some(items)), cursor)))
        }
        _ => Err(RespError::Malformed("unrecognized type tag")),
    }
}
