//! On-disk layout of the data file.
//!
//! ```text
//! [MAGIC "LFXS"(4)][VERSION(1)][FLAGS(1)][BODY(N)]
//! ```
//!
//! `BODY` is the postcard encoding of every partition. When `FLAGS` has the LZ4 bit set the
//! body is an LZ4 block with its uncompressed size prepended.

use crate::error::{StorageError, StorageErrorExt};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Partition name → (key → value).
pub(crate) type Partitions = BTreeMap<String, BTreeMap<String, Vec<u8>>>;

const MAGIC: [u8; 4] = *b"LFXS";
pub(crate) const FORMAT_VERSION_V1: u8 = 1;
const HEADER_LEN: usize = 6;
const FLAG_LZ4: u8 = 1 << 0;

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum Compression {
    #[default]
    None,
    Lz4,
}

pub(crate) fn encode(partitions: &Partitions, compression: Compression) -> Result<Vec<u8>, StorageError> {
    let body = postcard::to_stdvec(partitions).context("Postcard encoding failed")?;
    let (flags, body) = match compression {
        Compression::None => (0, body),
        Compression::Lz4 => (FLAG_LZ4, lz4_flex::compress_prepend_size(&body)),
    };

    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.extend_from_slice(&MAGIC);
    out.push(FORMAT_VERSION_V1);
    out.push(flags);
    out.extend_from_slice(&body);
    Ok(out)
}

pub(crate) fn decode(bytes: &[u8]) -> Result<Partitions, StorageError> {
    if bytes.len() < HEADER_LEN {
        return Err(StorageError::Corrupted {
            message: format!("{} bytes is shorter than the header", bytes.len()).into(),
            context: None,
        });
    }

    let (header, body) = bytes.split_at(HEADER_LEN);
    let (magic, rest) = header.split_at(MAGIC.len());
    if magic != MAGIC.as_slice() {
        return Err(StorageError::Corrupted { message: "Bad magic bytes".into(), context: None });
    }

    let (version, flags) = (rest[0], rest[1]);
    if version != FORMAT_VERSION_V1 {
        return Err(StorageError::Corrupted {
            message: format!("Unsupported format version {version}").into(),
            context: None,
        });
    }
    if flags & !FLAG_LZ4 != 0 {
        return Err(StorageError::Corrupted {
            message: format!("Unknown header flags {flags:#010b}").into(),
            context: None,
        });
    }

    let body: Cow<'_, [u8]> = if flags & FLAG_LZ4 == 0 {
        Cow::Borrowed(body)
    } else {
        Cow::Owned(lz4_flex::decompress_size_prepended(body).context("Lz4 decompression failed")?)
    };

    postcard::from_bytes(&body).context("Postcard decoding failed")
}
