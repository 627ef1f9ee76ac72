//! Git object ids and the loose object format.

use crate::{GitError, Result};
use bytes::Bytes;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use sha1::{Digest, Sha1};
use std::fmt;
use std::io::{Read, Write};

/// Longest header a loose object can carry: `"commit " + u64 digits + NUL`.
const MAX_HEADER_LEN: u64 = 32;

/// A 20-byte SHA-1 object identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 20]);

impl ObjectId {
    /// Creates an ObjectId from raw bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Creates an ObjectId from a hex string.
    pub fn from_hex(hex: &str) -> Result<Self> {
        if hex.len() != 40 {
            return Err(GitError::InvalidObject(format!(
                "invalid object id length: {}",
                hex.len()
            )));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(hex, &mut bytes)
            .map_err(|e| GitError::InvalidObject(e.to_string()))?;
        Ok(Self(bytes))
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns the hex representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Computes the SHA-1 hash of data with a git object header.
    pub fn hash_object(object_type: ObjectType, data: &[u8]) -> Self {
        let header = format!("{} {}\0", object_type.as_str(), data.len());
        let mut hasher = Sha1::new();
        hasher.update(header.as_bytes());
        hasher.update(data);
        let result = hasher.finalize();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&result);
        Self(bytes)
    }

    /// Repository-relative path of the loose object: `objects/ab/cdef...`.
    pub fn loose_path(&self) -> String {
        let hex = self.to_hex();
        format!("objects/{}/{}", &hex[..2], &hex[2..])
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Git object types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    /// File content.
    Blob,
    /// Directory listing.
    Tree,
    /// Commit object.
    Commit,
    /// Annotated tag.
    Tag,
}

impl ObjectType {
    /// Returns the string representation used in git.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
            Self::Tag => "tag",
        }
    }

    /// Parses an object type from a string.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "blob" => Ok(Self::Blob),
            "tree" => Ok(Self::Tree),
            "commit" => Ok(Self::Commit),
            "tag" => Ok(Self::Tag),
            _ => Err(GitError::InvalidObject(format!(
                "unknown object type: {}",
                s
            ))),
        }
    }
}

/// A decoded git object.
#[derive(Debug, Clone)]
pub struct RawObject {
    /// The object's id.
    pub id: ObjectId,
    /// The type of object.
    pub object_type: ObjectType,
    /// The uncompressed content, header removed.
    pub data: Bytes,
}

impl RawObject {
    /// Creates an object, computing its id from the data.
    pub fn new(object_type: ObjectType, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let id = ObjectId::hash_object(object_type, &data);
        Self {
            id,
            object_type,
            data,
        }
    }
}

/// The first bytes of an object's content plus its declared size.
#[derive(Debug, Clone)]
pub struct ObjectSample {
    /// The type of object.
    pub object_type: ObjectType,
    /// Declared content size.
    pub size: u64,
    /// Up to the requested number of leading content bytes.
    pub head: Bytes,
}

/// Compresses an object into the loose format.
pub fn encode_loose(object: &RawObject) -> Result<Vec<u8>> {
    let header = format!("{} {}\0", object.object_type.as_str(), object.data.len());
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(header.as_bytes())
        .map_err(|e| GitError::InvalidObject(e.to_string()))?;
    encoder
        .write_all(&object.data)
        .map_err(|e| GitError::InvalidObject(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| GitError::InvalidObject(e.to_string()))
}

fn parse_header(inflated: &[u8]) -> Result<(ObjectType, u64, usize)> {
    let null_pos = inflated
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| GitError::InvalidObject("missing null byte in header".to_string()))?;

    let header = String::from_utf8_lossy(&inflated[..null_pos]);
    let (kind, size) = header
        .split_once(' ')
        .ok_or_else(|| GitError::InvalidObject(format!("invalid header: {}", header)))?;
    let object_type = ObjectType::parse(kind)?;
    let size: u64 = size
        .parse()
        .map_err(|_| GitError::InvalidObject("invalid size".to_string()))?;
    Ok((object_type, size, null_pos + 1))
}

/// Decompresses a loose object and checks it against its header.
pub fn decode_loose(compressed: &[u8]) -> Result<RawObject> {
    let mut decoder = ZlibDecoder::new(compressed);
    let mut inflated = Vec::new();
    decoder
        .read_to_end(&mut inflated)
        .map_err(|e| GitError::InvalidObject(e.to_string()))?;

    let (object_type, size, start) = parse_header(&inflated)?;
    let data = &inflated[start..];
    if data.len() as u64 != size {
        return Err(GitError::InvalidObject(format!(
            "header declares {} bytes, found {}",
            size,
            data.len()
        )));
    }
    Ok(RawObject::new(object_type, Bytes::copy_from_slice(data)))
}

/// Inflates only the header and at most `max` content bytes.
pub fn sample_loose(compressed: &[u8], max: usize) -> Result<ObjectSample> {
    let decoder = ZlibDecoder::new(compressed);
    let mut inflated = Vec::new();
    decoder
        .take(MAX_HEADER_LEN + max as u64)
        .read_to_end(&mut inflated)
        .map_err(|e| GitError::InvalidObject(e.to_string()))?;

    let (object_type, size, start) = parse_header(&inflated)?;
    let end = inflated.len().min(start + max);
    Ok(ObjectSample {
        object_type,
        size,
        head: Bytes::copy_from_slice(&inflated[start..end]),
    })
}
