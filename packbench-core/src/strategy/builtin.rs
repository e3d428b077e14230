//! Built-in strategies backed by flate2 or lz-str on the orchestrator side
//! and the matching npm decoders inside the sandbox.

use super::codec::{self, Container};
use super::{blob_import, Strategy, SUPPORT_MODULE};
use crate::error::StrategyError;
use crate::types::{CompressionLevel, StrategyName};

fn compress_error(name: &StrategyName, source: std::io::Error) -> StrategyError {
    StrategyError::Compress {
        strategy: name.to_string(),
        source,
    }
}

fn decode_error(name: &StrategyName, reason: impl ToString) -> StrategyError {
    StrategyError::Decode {
        strategy: name.to_string(),
        reason: reason.to_string(),
    }
}

fn deflate_base64(
    name: &StrategyName,
    container: Container,
    level: CompressionLevel,
    payload: &[u8],
) -> Result<String, StrategyError> {
    let compressed =
        codec::deflate(container, level, payload).map_err(|e| compress_error(name, e))?;
    Ok(codec::encode_base64(&compressed))
}

fn inflate_base64(
    name: &StrategyName,
    container: Container,
    blob: &str,
) -> Result<Vec<u8>, StrategyError> {
    let compressed = codec::decode_base64(blob).map_err(|e| decode_error(name, e))?;
    codec::inflate(container, &compressed).map_err(|e| decode_error(name, e))
}

/// Uncompressed base64 baseline.
#[derive(Debug, Clone)]
pub struct Base64Strategy {
    name: StrategyName,
}

impl Base64Strategy {
    pub fn new(name: StrategyName) -> Self {
        Self { name }
    }
}

impl Strategy for Base64Strategy {
    fn name(&self) -> &StrategyName {
        &self.name
    }

    fn compress(&self, payload: &[u8]) -> Result<String, StrategyError> {
        Ok(codec::encode_base64(payload))
    }

    fn generate_source(&self, blob_module: &str) -> String {
        format!(
            r#"{import}
import {{ base64ToUint8, uint8ToString, publish }} from "./{support}";

const start = performance.now();
const value = uint8ToString(base64ToUint8(blob));
publish(start, value);
"#,
            import = blob_import(blob_module),
            support = SUPPORT_MODULE,
        )
    }

    fn decompress(&self, blob: &str) -> Result<Vec<u8>, StrategyError> {
        codec::decode_base64(blob).map_err(|e| decode_error(&self.name, e))
    }
}

/// zlib stream inflated by `pako`.
#[derive(Debug, Clone)]
pub struct PakoStrategy {
    name: StrategyName,
    level: CompressionLevel,
}

impl PakoStrategy {
    pub fn new(name: StrategyName, level: CompressionLevel) -> Self {
        Self { name, level }
    }
}

impl Strategy for PakoStrategy {
    fn name(&self) -> &StrategyName {
        &self.name
    }

    fn compress(&self, payload: &[u8]) -> Result<String, StrategyError> {
        deflate_base64(&self.name, Container::Zlib, self.level, payload)
    }

    fn generate_source(&self, blob_module: &str) -> String {
        format!(
            r#"import {{ inflate }} from 'pako';
{import}
import {{ base64ToUint8, uint8ToString, publish }} from "./{support}";

const start = performance.now();
const value = uint8ToString(inflate(base64ToUint8(blob)));
publish(start, value);
"#,
            import = blob_import(blob_module),
            support = SUPPORT_MODULE,
        )
    }

    fn decompress(&self, blob: &str) -> Result<Vec<u8>, StrategyError> {
        inflate_base64(&self.name, Container::Zlib, blob)
    }
}

/// Raw deflate inflated by `uzip`.
#[derive(Debug, Clone)]
pub struct UzipStrategy {
    name: StrategyName,
    level: CompressionLevel,
}

impl UzipStrategy {
    pub fn new(name: StrategyName, level: CompressionLevel) -> Self {
        Self { name, level }
    }
}

impl Strategy for UzipStrategy {
    fn name(&self) -> &StrategyName {
        &self.name
    }

    fn compress(&self, payload: &[u8]) -> Result<String, StrategyError> {
        deflate_base64(&self.name, Container::Raw, self.level, payload)
    }

    fn generate_source(&self, blob_module: &str) -> String {
        format!(
            r#"import {{ inflateRaw }} from 'uzip';
{import}
import {{ base64ToUint8, uint8ToString, publish }} from "./{support}";

const start = performance.now();
const value = uint8ToString(inflateRaw(base64ToUint8(blob)));
publish(start, value);
"#,
            import = blob_import(blob_module),
            support = SUPPORT_MODULE,
        )
    }

    fn decompress(&self, blob: &str) -> Result<Vec<u8>, StrategyError> {
        inflate_base64(&self.name, Container::Raw, blob)
    }
}

/// gzip member decoded by `fflate`'s auto-detecting `decompressSync`.
#[derive(Debug, Clone)]
pub struct FflateStrategy {
    name: StrategyName,
    level: CompressionLevel,
}

impl FflateStrategy {
    pub fn new(name: StrategyName, level: CompressionLevel) -> Self {
        Self { name, level }
    }
}

impl Strategy for FflateStrategy {
    fn name(&self) -> &StrategyName {
        &self.name
    }

    fn compress(&self, payload: &[u8]) -> Result<String, StrategyError> {
        deflate_base64(&self.name, Container::Gzip, self.level, payload)
    }

    fn generate_source(&self, blob_module: &str) -> String {
        format!(
            r#"import {{ decompressSync }} from 'fflate';
{import}
import {{ base64ToUint8, uint8ToString, publish }} from "./{support}";

const start = performance.now();
const value = uint8ToString(decompressSync(base64ToUint8(blob)));
publish(start, value);
"#,
            import = blob_import(blob_module),
            support = SUPPORT_MODULE,
        )
    }

    fn decompress(&self, blob: &str) -> Result<Vec<u8>, StrategyError> {
        inflate_base64(&self.name, Container::Gzip, blob)
    }
}

/// Raw deflate for `tiny-inflate`, which needs the output size up front.
///
/// Blob layout: `<decimal raw length>:<base64 raw deflate>`.
#[derive(Debug, Clone)]
pub struct TinyInflateStrategy {
    name: StrategyName,
    level: CompressionLevel,
}

impl TinyInflateStrategy {
    pub fn new(name: StrategyName, level: CompressionLevel) -> Self {
        Self { name, level }
    }
}

impl Strategy for TinyInflateStrategy {
    fn name(&self) -> &StrategyName {
        &self.name
    }

    fn compress(&self, payload: &[u8]) -> Result<String, StrategyError> {
        let body = deflate_base64(&self.name, Container::Raw, self.level, payload)?;
        Ok(format!("{}:{}", payload.len(), body))
    }

    fn generate_source(&self, blob_module: &str) -> String {
        format!(
            r#"import inflate from 'tiny-inflate';
{import}
import {{ base64ToUint8, uint8ToString, publish }} from "./{support}";

const start = performance.now();
const sep = blob.indexOf(':');
const out = new Uint8Array(parseInt(blob.slice(0, sep), 10));
inflate(base64ToUint8(blob.slice(sep + 1)), out);
const value = uint8ToString(out);
publish(start, value);
"#,
            import = blob_import(blob_module),
            support = SUPPORT_MODULE,
        )
    }

    fn decompress(&self, blob: &str) -> Result<Vec<u8>, StrategyError> {
        let (len, body) = blob
            .split_once(':')
            .ok_or_else(|| decode_error(&self.name, "missing length prefix"))?;
        let len: usize = len
            .parse()
            .map_err(|e| decode_error(&self.name, format!("bad length prefix: {}", e)))?;
        let decoded = inflate_base64(&self.name, Container::Raw, body)?;
        if decoded.len() != len {
            return Err(decode_error(
                &self.name,
                format!("length prefix {} but inflated {} bytes", len, decoded.len()),
            ));
        }
        Ok(decoded)
    }
}

/// `lz-string`'s base64 output, decoded by its `decompressFromBase64`.
///
/// Works on UTF-16 code units, so the payload must be valid UTF-8.
#[derive(Debug, Clone)]
pub struct LzStringStrategy {
    name: StrategyName,
}

impl LzStringStrategy {
    pub fn new(name: StrategyName) -> Self {
        Self { name }
    }
}

impl Strategy for LzStringStrategy {
    fn name(&self) -> &StrategyName {
        &self.name
    }

    fn compress(&self, payload: &[u8]) -> Result<String, StrategyError> {
        let text = std::str::from_utf8(payload).map_err(|e| {
            compress_error(&self.name, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        Ok(lz_str::compress_to_base64(text))
    }

    fn generate_source(&self, blob_module: &str) -> String {
        format!(
            r#"import {{ decompressFromBase64 }} from 'lz-string';
{import}
import {{ publish }} from "./{support}";

const start = performance.now();
const value = decompressFromBase64(blob);
publish(start, value);
"#,
            import = blob_import(blob_module),
            support = SUPPORT_MODULE,
        )
    }

    fn decompress(&self, blob: &str) -> Result<Vec<u8>, StrategyError> {
        let units = lz_str::decompress_from_base64(blob)
            .ok_or_else(|| decode_error(&self.name, "not an lz-string base64 stream"))?;
        String::from_utf16(&units)
            .map(String::into_bytes)
            .map_err(|e| decode_error(&self.name, e))
    }
}
