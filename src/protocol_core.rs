//! Frame encoding and decoding shared by the client and by test receivers
//!
//! A frame is `name_len (u16 LE) | name`, followed by the file body. The
//! stream-delimited variant lets the body run until the connection closes;
//! the length-prefixed variant inserts a u64 body length after the name.

use crate::config::NameMode;
use crate::protocol::{
    BODY_LEN_BYTES, MAX_NAME_LEN, NAME_LEN_BYTES, SPACE, SPACE_REPLACEMENT, WIRE_PATH_SEPARATOR,
};
use std::path::{Component, Path};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("file name is {len} bytes, longer than the {max} bytes a frame can declare")]
    NameTooLong { len: usize, max: usize },
    #[error("file name is not valid UTF-8")]
    InvalidName,
    #[error("i/o while reading frame: {0}")]
    Io(#[from] std::io::Error),
}

/// Replace spaces with underscores.
pub fn sanitize_name(name: &str) -> String {
    name.replace(SPACE, &SPACE_REPLACEMENT.to_string())
}

/// Name to put on the wire for a file at `relative` under the walked root.
pub fn wire_name(relative: &Path, mode: NameMode) -> String {
    let raw = match mode {
        NameMode::BaseName => relative
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        NameMode::RelativePath => relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(&WIRE_PATH_SEPARATOR.to_string()),
    };
    sanitize_name(&raw)
}

/// Build the 2-byte name length prefix
pub fn encode_name_header(name: &str) -> Result<[u8; NAME_LEN_BYTES], ProtocolError> {
    let len = name.len();
    if len > MAX_NAME_LEN {
        return Err(ProtocolError::NameTooLong {
            len,
            max: MAX_NAME_LEN,
        });
    }
    Ok((len as u16).to_le_bytes())
}

pub fn decode_name_len(header: [u8; NAME_LEN_BYTES]) -> usize {
    u16::from_le_bytes(header) as usize
}

/// Read the length prefix and the name that follows it. The reader is left
/// positioned at the first body byte.
pub async fn read_frame_name<R>(reader: &mut R) -> Result<String, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut hdr = [0u8; NAME_LEN_BYTES];
    reader.read_exact(&mut hdr).await?;
    let mut name = vec![0u8; decode_name_len(hdr)];
    reader.read_exact(&mut name).await?;
    String::from_utf8(name).map_err(|_| ProtocolError::InvalidName)
}

/// Read the u64 body length written by [`LengthPrefixed`].
pub async fn read_body_len<R>(reader: &mut R) -> Result<u64, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; BODY_LEN_BYTES];
    reader.read_exact(&mut buf).await?;
    Ok(u64::from_le_bytes(buf))
}

/// How a file's metadata is laid out in front of its body.
///
/// Traversal code only ever talks to this trait, so the body delimiting
/// strategy can change without touching the walker.
pub trait FrameCodec: Send + Sync {
    /// Bytes to write before the body. `name` must already be sanitized.
    fn encode_header(&self, name: &str, body_len: u64) -> Result<Vec<u8>, ProtocolError>;

    /// True when the header declares the body length, in which case the
    /// sender must write exactly `body_len` bytes.
    fn bounds_body(&self) -> bool;
}

/// Literal wire format: the body runs until the connection is closed.
#[derive(Debug, Default, Clone, Copy)]
pub struct StreamDelimited;

impl FrameCodec for StreamDelimited {
    fn encode_header(&self, name: &str, _body_len: u64) -> Result<Vec<u8>, ProtocolError> {
        let hdr = encode_name_header(name)?;
        let mut out = Vec::with_capacity(NAME_LEN_BYTES + name.len());
        out.extend_from_slice(&hdr);
        out.extend_from_slice(name.as_bytes());
        Ok(out)
    }

    fn bounds_body(&self) -> bool {
        false
    }
}

/// Variant that declares the body length after the name.
#[derive(Debug, Default, Clone, Copy)]
pub struct LengthPrefixed;

impl FrameCodec for LengthPrefixed {
    fn encode_header(&self, name: &str, body_len: u64) -> Result<Vec<u8>, ProtocolError> {
        let mut out = StreamDelimited.encode_header(name, body_len)?;
        out.extend_from_slice(&body_len.to_le_bytes());
        Ok(out)
    }

    fn bounds_body(&self) -> bool {
        true
    }
}
