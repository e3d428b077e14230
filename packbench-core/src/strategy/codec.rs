//! flate2/base64 plumbing shared by the built-in strategies.

use std::io::{self, Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};
use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};
use flate2::Compression;

use crate::types::CompressionLevel;

/// Deflate framing understood by the sandbox-side decoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// RFC 1950 (zlib header + adler32).
    Zlib,
    /// RFC 1951 raw deflate stream.
    Raw,
    /// RFC 1952 (gzip header + crc32).
    Gzip,
}

pub fn deflate(container: Container, level: CompressionLevel, data: &[u8]) -> io::Result<Vec<u8>> {
    let level = Compression::new(level.value());
    match container {
        Container::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), level);
            encoder.write_all(data)?;
            encoder.finish()
        }
        Container::Raw => {
            let mut encoder = DeflateEncoder::new(Vec::new(), level);
            encoder.write_all(data)?;
            encoder.finish()
        }
        Container::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), level);
            encoder.write_all(data)?;
            encoder.finish()
        }
    }
}

pub fn inflate(container: Container, data: &[u8]) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    match container {
        Container::Zlib => ZlibDecoder::new(data).read_to_end(&mut out)?,
        Container::Raw => DeflateDecoder::new(data).read_to_end(&mut out)?,
        Container::Gzip => GzDecoder::new(data).read_to_end(&mut out)?,
    };
    Ok(out)
}

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode_base64(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(text)
}
