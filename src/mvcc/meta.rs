use {
    super::{MVCC_VERSION_TIMESTAMP_SIZE, Timestamp},
    bytes::{Buf, BufMut, Bytes, BytesMut},
};

const FLAG_TXN: u8 = 1 << 0;
const FLAG_DELETED: u8 = 1 << 1;
const FLAG_INLINE: u8 = 1 << 2;
const KNOWN_FLAGS: u8 = FLAG_TXN | FLAG_DELETED | FLAG_INLINE;

/// flags + wall time + logical + key bytes + value bytes
const HEADER_LEN: usize = 1 + 8 + 4 + 8 + 8;
/// transaction id + epoch
const TXN_LEN: usize = 16 + 4;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum MetadataError {
    /// Input ended before the entry was fully read
    #[error("Truncated metadata: need {need} more bytes, {have} left")]
    Truncated { need: usize, have: usize },

    /// Bytes left over after a complete entry
    #[error("Unexpected {0} trailing bytes")]
    TrailingBytes(usize),

    /// Flag bits this codec does not know about
    #[error("Unknown flags: {0:#04x}")]
    UnknownFlags(u8),

    /// Inline value longer than a `u32` length prefix can describe
    #[error("Inline value of {0} bytes is too large")]
    ValueTooLarge(usize),
}

/// Transaction owning an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxnMeta {
    pub id: u128,
    pub epoch: u32,
}

/// Metadata entry of an MVCC chain.
///
/// Present when the newest version is an intent, or when the key holds an
/// inline (unversioned) value. For plain committed chains the metadata is
/// implicit, see [`MvccMetadata::implicit`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MvccMetadata {
    /// Transaction of the intent, if the newest version is uncommitted.
    pub txn: Option<TxnMeta>,
    /// Timestamp of the newest version.
    pub timestamp: Timestamp,
    /// Whether the newest version is a deletion tombstone.
    pub deleted: bool,
    /// Encoded key size of the newest version.
    pub key_bytes: i64,
    /// Value size of the newest version.
    pub val_bytes: i64,
    /// Inline value. Keys with inline values have no versions.
    pub raw_bytes: Option<Bytes>,
}

impl MvccMetadata {
    /// Metadata of an intent written by `txn` at `timestamp`.
    pub fn intent(txn: TxnMeta, timestamp: Timestamp, value_len: usize) -> Self {
        Self {
            txn: Some(txn),
            timestamp,
            deleted: value_len == 0,
            key_bytes: MVCC_VERSION_TIMESTAMP_SIZE,
            val_bytes: value_len as i64,
            raw_bytes: None,
        }
    }

    /// Metadata holding an inline value.
    pub fn inline(value: impl Into<Bytes>) -> Self {
        Self {
            raw_bytes: Some(value.into()),
            ..Default::default()
        }
    }

    /// Metadata of a chain without an explicit metadata entry, derived from
    /// its newest version.
    pub fn implicit(timestamp: Timestamp, value_len: usize) -> Self {
        Self {
            txn: None,
            timestamp,
            deleted: value_len == 0,
            key_bytes: MVCC_VERSION_TIMESTAMP_SIZE,
            val_bytes: value_len as i64,
            raw_bytes: None,
        }
    }

    pub fn is_intent(&self) -> bool {
        self.txn.is_some()
    }

    pub fn is_inline(&self) -> bool {
        self.raw_bytes.is_some()
    }

    /// Length of the encoded entry.
    pub fn encoded_len(&self) -> usize {
        let mut len = HEADER_LEN;
        if self.txn.is_some() {
            len += TXN_LEN;
        }
        if let Some(raw) = &self.raw_bytes {
            len += 4 + raw.len();
        }
        len
    }

    /// Encodes the entry.
    ///
    /// Fails if the inline value does not fit a `u32` length prefix.
    pub fn encode(&self) -> Result<Bytes, MetadataError> {
        let mut flags = 0;
        if self.txn.is_some() {
            flags |= FLAG_TXN;
        }
        if self.deleted {
            flags |= FLAG_DELETED;
        }
        if self.raw_bytes.is_some() {
            flags |= FLAG_INLINE;
        }

        let mut out = BytesMut::with_capacity(self.encoded_len());
        out.put_u8(flags);
        out.put_i64(self.timestamp.wall_time);
        out.put_i32(self.timestamp.logical);
        out.put_i64(self.key_bytes);
        out.put_i64(self.val_bytes);
        if let Some(txn) = &self.txn {
            out.put_u128(txn.id);
            out.put_u32(txn.epoch);
        }
        if let Some(raw) = &self.raw_bytes {
            out.put_u32(raw_len(raw.len())?);
            out.put_slice(raw);
        }
        Ok(out.freeze())
    }

    pub fn decode(data: &[u8]) -> Result<Self, MetadataError> {
        let mut buf = data;
        ensure_remaining(buf, HEADER_LEN)?;
        let flags = buf.get_u8();
        if flags & !KNOWN_FLAGS != 0 {
            return Err(MetadataError::UnknownFlags(flags));
        }
        let wall_time = buf.get_i64();
        let logical = buf.get_i32();
        let key_bytes = buf.get_i64();
        let val_bytes = buf.get_i64();

        let txn = if flags & FLAG_TXN != 0 {
            ensure_remaining(buf, TXN_LEN)?;
            Some(TxnMeta {
                id: buf.get_u128(),
                epoch: buf.get_u32(),
            })
        } else {
            None
        };

        let raw_bytes = if flags & FLAG_INLINE != 0 {
            ensure_remaining(buf, 4)?;
            let len = buf.get_u32() as usize;
            ensure_remaining(buf, len)?;
            let raw = Bytes::copy_from_slice(&buf[..len]);
            buf.advance(len);
            Some(raw)
        } else {
            None
        };

        if buf.has_remaining() {
            return Err(MetadataError::TrailingBytes(buf.remaining()));
        }

        Ok(Self {
            txn,
            timestamp: Timestamp::new(wall_time, logical),
            deleted: flags & FLAG_DELETED != 0,
            key_bytes,
            val_bytes,
            raw_bytes,
        })
    }
}

fn raw_len(len: usize) -> Result<u32, MetadataError> {
    u32::try_from(len).map_err(|_| MetadataError::ValueTooLarge(len))
}

fn ensure_remaining(buf: &[u8], need: usize) -> Result<(), MetadataError> {
    if buf.len() < need {
        return Err(MetadataError::Truncated {
            need,
            have: buf.len(),
        });
    }
    Ok(())
}
