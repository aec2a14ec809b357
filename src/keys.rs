//! Keys and the layout of the keyspace.
//!
//! The keyspace is split into two parts: local (system) keys, which sort
//! below [`LOCAL_MAX`], and user keys, which sort at or above it. Local keys
//! are further divided into range-ID keys (addressed by the numeric id of a
//! range) and range-local keys (addressed by a user key of the range).

use {
    bytes::{BufMut, Bytes, BytesMut},
    std::{borrow::Borrow, fmt, ops::Deref},
};

/// Prefix of every local key.
pub const LOCAL_PREFIX: &[u8] = b"\x01";

/// Upper bound of the local keyspace. First user key.
pub const LOCAL_MAX: &[u8] = b"\x02";

/// Prefix of keys addressed by range id.
pub const LOCAL_RANGE_ID_PREFIX: &[u8] = b"\x01i";

/// Infix of range-ID keys that are part of the replicated state.
pub const LOCAL_RANGE_ID_REPLICATED_INFIX: &[u8] = b"r";

/// Infix of range-ID keys that are local to a single replica.
pub const LOCAL_RANGE_ID_UNREPLICATED_INFIX: &[u8] = b"u";

/// Prefix of keys addressed by a user key of the range.
pub const LOCAL_RANGE_PREFIX: &[u8] = b"\x01k";

/// Upper bound of the whole keyspace.
pub const KEY_MAX: &[u8] = b"\xff\xff";

const INT_MAX: u8 = 0xfd;
const INT_MAX_WIDTH: u8 = 8;
const INT_ZERO: u8 = 0x80 + INT_MAX_WIDTH;
const INT_SMALL: u64 = (INT_MAX - INT_ZERO - INT_MAX_WIDTH) as u64;

const ESCAPE: u8 = 0x00;
const ESCAPED_TERM: u8 = 0x01;
const ESCAPED_00: u8 = 0xff;

/// Key in the keyspace.
///
/// Keys are compared lexicographically by their bytes. Cloning is cheap: the
/// underlying buffer is reference counted.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(Bytes);

impl Key {
    /// The smallest key.
    pub const MIN: Key = Key(Bytes::new());

    /// Creates a key from a static byte string without copying.
    pub const fn from_static(bytes: &'static [u8]) -> Self {
        Self(Bytes::from_static(bytes))
    }

    /// Creates a key by copying the given bytes.
    pub fn copy_from_slice(bytes: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(bytes))
    }

    /// Returns the raw bytes of the key.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the underlying buffer.
    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    /// Whether the key belongs to the local (system) part of the keyspace.
    pub fn is_local(&self) -> bool {
        self.as_bytes() < LOCAL_MAX
    }

    /// Returns the first key that does not have `self` as a prefix and sorts
    /// after all the keys that do.
    ///
    /// The empty key maps to [`KEY_MAX`]. A key of `0xff` bytes only has no
    /// such successor and is returned unchanged.
    pub fn prefix_end(&self) -> Key {
        let bytes = self.as_bytes();
        match bytes.iter().rposition(|b| *b != 0xff) {
            Some(pos) => {
                let mut end = BytesMut::from(&bytes[..=pos]);
                end[pos] += 1;
                Key(end.freeze())
            }
            None if bytes.is_empty() => Key::from_static(KEY_MAX),
            None => self.clone(),
        }
    }

    /// Returns the smallest key that sorts after `self`.
    pub fn next(&self) -> Key {
        let mut next = BytesMut::with_capacity(self.0.len() + 1);
        next.put_slice(&self.0);
        next.put_u8(0);
        Key(next.freeze())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0.escape_ascii())
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl Deref for Key {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Borrow<[u8]> for Key {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Key {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Bytes> for Key {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl From<Vec<u8>> for Key {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

impl From<&[u8]> for Key {
    fn from(bytes: &[u8]) -> Self {
        Self::copy_from_slice(bytes)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self::copy_from_slice(s.as_bytes())
    }
}

/// Appends an order preserving encoding of `v` to `buf`.
///
/// Small values (up to 109) take a single byte; larger values are written
/// as a length marker followed by the minimal big-endian representation.
pub fn encode_uvarint_ascending(buf: &mut BytesMut, v: u64) {
    if v <= INT_SMALL {
        buf.put_u8(INT_ZERO + v as u8);
        return;
    }
    let width = (8 - v.leading_zeros() / 8) as u8;
    buf.put_u8(INT_MAX - INT_MAX_WIDTH + width);
    buf.put_slice(&v.to_be_bytes()[(8 - width as usize)..]);
}

/// Appends an order preserving, self-terminating encoding of `bytes` to
/// `buf`.
///
/// `0x00` is escaped as `0x00 0xff` and the value is terminated with
/// `0x00 0x01`, so no encoded value is a prefix of another.
pub fn encode_bytes_ascending(buf: &mut BytesMut, bytes: &[u8]) {
    for chunk in bytes.split_inclusive(|b| *b == ESCAPE) {
        match chunk.split_last() {
            Some((&ESCAPE, head)) => {
                buf.put_slice(head);
                buf.put_slice(&[ESCAPE, ESCAPED_00]);
            }
            _ => buf.put_slice(chunk),
        }
    }
    buf.put_slice(&[ESCAPE, ESCAPED_TERM]);
}

/// Prefix of all range-ID keys of the given range.
pub fn range_id_prefix(range_id: u64) -> Key {
    let mut buf = BytesMut::with_capacity(LOCAL_RANGE_ID_PREFIX.len() + 9);
    buf.put_slice(LOCAL_RANGE_ID_PREFIX);
    encode_uvarint_ascending(&mut buf, range_id);
    Key(buf.freeze())
}

/// Prefix of the replicated range-ID keys of the given range.
pub fn range_id_replicated_prefix(range_id: u64) -> Key {
    range_id_prefix_with_infix(range_id, LOCAL_RANGE_ID_REPLICATED_INFIX)
}

/// Prefix of the unreplicated range-ID keys of the given range.
pub fn range_id_unreplicated_prefix(range_id: u64) -> Key {
    range_id_prefix_with_infix(range_id, LOCAL_RANGE_ID_UNREPLICATED_INFIX)
}

fn range_id_prefix_with_infix(range_id: u64, infix: &[u8]) -> Key {
    let prefix = range_id_prefix(range_id);
    let mut buf = BytesMut::with_capacity(prefix.len() + infix.len());
    buf.put_slice(&prefix);
    buf.put_slice(infix);
    Key(buf.freeze())
}

/// Prefix of the range-local keys addressed by `key`.
pub fn range_key_prefix(key: &Key) -> Key {
    let mut buf = BytesMut::with_capacity(LOCAL_RANGE_PREFIX.len() + key.len() + 2);
    buf.put_slice(LOCAL_RANGE_PREFIX);
    encode_bytes_ascending(&mut buf, key);
    Key(buf.freeze())
}

/// Builds a range-local key: the range key prefix of `key` followed by
/// `suffix`.
pub fn make_range_key(key: &Key, suffix: &[u8]) -> Key {
    let prefix = range_key_prefix(key);
    let mut buf = BytesMut::with_capacity(prefix.len() + suffix.len());
    buf.put_slice(&prefix);
    buf.put_slice(suffix);
    Key(buf.freeze())
}

/// Builds a replicated range-ID key: the replicated prefix of `range_id`
/// followed by `suffix`.
pub fn make_range_id_replicated_key(range_id: u64, suffix: &[u8]) -> Key {
    let prefix = range_id_replicated_prefix(range_id);
    let mut buf = BytesMut::with_capacity(prefix.len() + suffix.len());
    buf.put_slice(&prefix);
    buf.put_slice(suffix);
    Key(buf.freeze())
}
