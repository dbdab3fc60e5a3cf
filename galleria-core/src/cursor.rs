//! Opaque continuation tokens.
//!
//! A cursor carries the `(sort value, id)` pair of the last item a page
//! returned, so the next request can resume strictly after it even when
//! neighbouring rows share the same sort value.
//!
//! Binary layout (version 1), rendered as URL-safe base64 without padding:
//!
//! ```text
//! [version u8][sort field tag u8][value tag u8][value payload][item id 16 bytes]
//! ```
//!
//! Payloads: `Null` has none, `Integer` and `Timestamp` are big-endian `i64`,
//! `Float` is the big-endian IEEE-754 bit pattern and `Text` is a big-endian
//! `u32` byte length followed by UTF-8.

use std::cmp::Ordering;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use galleria_contracts::CatalogError;
use galleria_model::{
    Cursor, ItemId, MediaItem, SortField, SortOrder, SortValue,
};
use thiserror::Error;

pub const CURSOR_VERSION: u8 = 1;

const TAG_NULL: u8 = 0;
const TAG_INTEGER: u8 = 1;
const TAG_FLOAT: u8 = 2;
const TAG_TEXT: u8 = 3;
const TAG_TIMESTAMP: u8 = 4;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CursorDecodeError {
    #[error("cursor is not valid base64: {0}")]
    Encoding(String),

    #[error("cursor is empty")]
    Empty,

    #[error("unsupported cursor version {0}")]
    UnsupportedVersion(u8),

    #[error("unknown sort field tag {0}")]
    UnknownSortField(u8),

    #[error("unknown sort value tag {0}")]
    UnknownValueTag(u8),

    #[error("cursor ended early while reading {0}")]
    Truncated(&'static str),

    #[error("cursor text value is not valid UTF-8")]
    InvalidText,

    #[error("{0} unexpected trailing bytes in cursor")]
    TrailingBytes(usize),

    #[error("cursor was minted for {found} but the gallery is sorted by {expected}")]
    SortFieldMismatch { expected: SortField, found: SortField },
}

impl From<CursorDecodeError> for CatalogError {
    fn from(err: CursorDecodeError) -> Self {
        CatalogError::InvalidCursor(err.to_string())
    }
}

/// Decoded resume point: the last item of the previous page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorPosition {
    pub sort_field: SortField,
    pub sort_value: SortValue,
    pub id: ItemId,
}

impl CursorPosition {
    pub fn of(item: &MediaItem, sort_field: SortField) -> Self {
        Self {
            sort_field,
            sort_value: item.sort_value(sort_field),
            id: item.id,
        }
    }

    /// True when `item` comes strictly after this position in `order`.
    pub fn admits(&self, item: &MediaItem, order: SortOrder) -> bool {
        let ascending = item
            .sort_value(self.sort_field)
            .cmp(&self.sort_value)
            .then_with(|| item.id.cmp(&self.id));
        order.apply(ascending) == Ordering::Greater
    }

    pub fn encode(&self) -> Cursor {
        let mut buf = Vec::with_capacity(3 + 16 + 8);
        buf.push(CURSOR_VERSION);
        buf.push(self.sort_field.tag());
        match &self.sort_value {
            SortValue::Null => buf.push(TAG_NULL),
            SortValue::Integer(value) => {
                buf.push(TAG_INTEGER);
                buf.extend_from_slice(&value.to_be_bytes());
            }
            SortValue::Float(value) => {
                buf.push(TAG_FLOAT);
                buf.extend_from_slice(&value.0.to_bits().to_be_bytes());
            }
            SortValue::Text(text) => {
                buf.push(TAG_TEXT);
                // Titles are far below 4 GiB; clamp rather than wrap.
                let len = u32::try_from(text.len()).unwrap_or(u32::MAX);
                buf.extend_from_slice(&len.to_be_bytes());
                buf.extend_from_slice(&text.as_bytes()[..len as usize]);
            }
            SortValue::Timestamp(millis) => {
                buf.push(TAG_TIMESTAMP);
                buf.extend_from_slice(&millis.to_be_bytes());
            }
        }
        buf.extend_from_slice(self.id.as_bytes());
        Cursor::new(URL_SAFE_NO_PAD.encode(buf))
    }
}

/// Cursor pointing just past `item` under `sort_field`.
pub fn encode(item: &MediaItem, sort_field: SortField) -> Cursor {
    CursorPosition::of(item, sort_field).encode()
}

pub fn decode(cursor: &Cursor) -> Result<CursorPosition, CursorDecodeError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(cursor.as_str())
        .map_err(|err| CursorDecodeError::Encoding(err.to_string()))?;
    if bytes.is_empty() {
        return Err(CursorDecodeError::Empty);
    }

    let mut reader = Reader::new(&bytes);
    let version = reader.u8("version")?;
    if version != CURSOR_VERSION {
        return Err(CursorDecodeError::UnsupportedVersion(version));
    }

    let field_tag = reader.u8("sort field")?;
    let sort_field = SortField::from_tag(field_tag)
        .ok_or(CursorDecodeError::UnknownSortField(field_tag))?;

    let sort_value = match reader.u8("value tag")? {
        TAG_NULL => SortValue::Null,
        TAG_INTEGER => SortValue::Integer(reader.i64("integer value")?),
        TAG_FLOAT => {
            let bits = u64::from_be_bytes(reader.array("float value")?);
            SortValue::float(f64::from_bits(bits))
        }
        TAG_TEXT => {
            let len = u32::from_be_bytes(reader.array("text length")?) as usize;
            let raw = reader.take(len, "text value")?;
            let text = std::str::from_utf8(raw)
                .map_err(|_| CursorDecodeError::InvalidText)?;
            SortValue::Text(text.to_string())
        }
        TAG_TIMESTAMP => SortValue::Timestamp(reader.i64("timestamp value")?),
        other => return Err(CursorDecodeError::UnknownValueTag(other)),
    };

    let id = ItemId::from_bytes(reader.array("item id")?);

    if reader.remaining() > 0 {
        return Err(CursorDecodeError::TrailingBytes(reader.remaining()));
    }

    Ok(CursorPosition {
        sort_field,
        sort_value,
        id,
    })
}

/// Decode and require the cursor to belong to the active sort field.
pub fn decode_for(
    cursor: &Cursor,
    expected: SortField,
) -> Result<CursorPosition, CursorDecodeError> {
    let position = decode(cursor)?;
    if position.sort_field != expected {
        return Err(CursorDecodeError::SortFieldMismatch {
            expected,
            found: position.sort_field,
        });
    }
    Ok(position)
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(
        &mut self,
        len: usize,
        what: &'static str,
    ) -> Result<&'a [u8], CursorDecodeError> {
        if self.remaining() < len {
            return Err(CursorDecodeError::Truncated(what));
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn array<const N: usize>(
        &mut self,
        what: &'static str,
    ) -> Result<[u8; N], CursorDecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, what)?);
        Ok(out)
    }

    fn u8(&mut self, what: &'static str) -> Result<u8, CursorDecodeError> {
        Ok(self.take(1, what)?[0])
    }

    fn i64(&mut self, what: &'static str) -> Result<i64, CursorDecodeError> {
        Ok(i64::from_be_bytes(self.array(what)?))
    }
}
