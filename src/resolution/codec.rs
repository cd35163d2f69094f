//! 解析记录二进制编解码
//!
//! Layout, integers big-endian:
//!
//! ```text
//! u8     format version (1)
//! u8     deleted (0 / 1)
//! -- tombstone ends here --
//! i32    link type
//! u64    destination length
//! [u8]   destination, UTF-8
//! ```

use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::errors::ShardlinkError;
use crate::storage::LinkType;

pub const FORMAT_VERSION_V1: u8 = 1;

/// 复制解析存储中的一条记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionRecord {
    Active {
        link_type: LinkType,
        /// 已合并并排序 query params 的完整目标地址
        destination: String,
    },
    Tombstone,
}

impl ResolutionRecord {
    pub fn active(link_type: LinkType, destination: impl Into<String>) -> Self {
        ResolutionRecord::Active {
            link_type,
            destination: destination.into(),
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, ResolutionRecord::Tombstone)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    Empty,
    UnknownVersion(u8),
    InvalidBool(u8),
    UnknownLinkType(i32),
    Truncated { needed: u64, remaining: usize },
    InvalidUtf8,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Empty => write!(f, "empty resolution record"),
            DecodeError::UnknownVersion(v) => write!(f, "unknown format version {}", v),
            DecodeError::InvalidBool(b) => write!(f, "invalid bool byte {:#04x}", b),
            DecodeError::UnknownLinkType(t) => write!(f, "unknown link type {}", t),
            DecodeError::Truncated { needed, remaining } => write!(
                f,
                "truncated record: needed {} bytes, {} remaining",
                needed, remaining
            ),
            DecodeError::InvalidUtf8 => write!(f, "destination is not valid UTF-8"),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<DecodeError> for ShardlinkError {
    fn from(err: DecodeError) -> Self {
        ShardlinkError::internal(format!("corrupt resolution record: {}", err))
    }
}

/// 按当前格式版本编码
pub fn encode(record: &ResolutionRecord) -> Bytes {
    match record {
        ResolutionRecord::Tombstone => {
            let mut buf = BytesMut::with_capacity(2);
            buf.put_u8(FORMAT_VERSION_V1);
            buf.put_u8(1);
            buf.freeze()
        }
        ResolutionRecord::Active {
            link_type,
            destination,
        } => {
            let mut buf = BytesMut::with_capacity(2 + 4 + 8 + destination.len());
            buf.put_u8(FORMAT_VERSION_V1);
            buf.put_u8(0);
            buf.put_i32(link_type.as_i32());
            put_string(&mut buf, destination);
            buf.freeze()
        }
    }
}

pub fn decode(mut data: &[u8]) -> Result<ResolutionRecord, DecodeError> {
    if data.is_empty() {
        return Err(DecodeError::Empty);
    }
    match data.get_u8() {
        FORMAT_VERSION_V1 => decode_v1(data),
        other => Err(DecodeError::UnknownVersion(other)),
    }
}

fn decode_v1(mut data: &[u8]) -> Result<ResolutionRecord, DecodeError> {
    ensure_remaining(&data, 1)?;
    let deleted = match data.get_u8() {
        0 => false,
        1 => true,
        other => return Err(DecodeError::InvalidBool(other)),
    };
    if deleted {
        return Ok(ResolutionRecord::Tombstone);
    }

    ensure_remaining(&data, 4)?;
    let raw_type = data.get_i32();
    let link_type =
        LinkType::try_from(raw_type).map_err(|_| DecodeError::UnknownLinkType(raw_type))?;
    let destination = get_string(&mut data)?;

    Ok(ResolutionRecord::Active {
        link_type,
        destination,
    })
}

fn put_string(buf: &mut BytesMut, s: &str) {
    buf.put_u64(s.len() as u64);
    buf.put_slice(s.as_bytes());
}

fn get_string(data: &mut &[u8]) -> Result<String, DecodeError> {
    ensure_remaining(data, 8)?;
    let len = data.get_u64();
    if len > data.remaining() as u64 {
        return Err(DecodeError::Truncated {
            needed: len,
            remaining: data.remaining(),
        });
    }
    let raw = data.copy_to_bytes(len as usize);
    String::from_utf8(raw.to_vec()).map_err(|_| DecodeError::InvalidUtf8)
}

fn ensure_remaining(data: &&[u8], needed: usize) -> Result<(), DecodeError> {
    if data.remaining() < needed {
        return Err(DecodeError::Truncated {
            needed: needed as u64,
            remaining: data.remaining(),
        });
    }
    Ok(())
}
