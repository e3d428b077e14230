//! Round-trip verification.
//!
//! Equality is exact and byte-wise. A mismatch persists the sandbox output
//! next to the artifact so the pair can be inspected after the run.

use std::path::Path;

use crate::error::{PairFailure, VerificationMismatch};

/// Outcome of comparing the sandbox output against the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Matched,
    Mismatched(String),
}

/// Compare without side effects.
pub fn compare(original: &[u8], decompressed: &[u8]) -> Verdict {
    if original == decompressed {
        return Verdict::Matched;
    }

    let first_difference = original
        .iter()
        .zip(decompressed)
        .position(|(a, b)| a != b)
        .unwrap_or_else(|| original.len().min(decompressed.len()));

    let diagnostic = format!(
        "expected {} bytes, got {}; first difference at byte {} (expected {}, got {})",
        original.len(),
        decompressed.len(),
        first_difference,
        describe(original.get(first_difference)),
        describe(decompressed.get(first_difference)),
    );
    Verdict::Mismatched(diagnostic)
}

fn describe(byte: Option<&u8>) -> String {
    match byte {
        Some(b) if b.is_ascii_graphic() || *b == b' ' => format!("{:?}", *b as char),
        Some(b) => format!("0x{:02x}", b),
        None => "end of data".to_string(),
    }
}

/// Compare and, on mismatch, write the decompressed output to `dump_path`.
pub async fn verify(
    original: &[u8],
    decompressed: &[u8],
    dump_path: &Path,
) -> Result<(), PairFailure> {
    match compare(original, decompressed) {
        Verdict::Matched => Ok(()),
        Verdict::Mismatched(diagnostic) => {
            tokio::fs::write(dump_path, decompressed)
                .await
                .map_err(|source| PairFailure::Io {
                    context: "writing mismatch dump",
                    source,
                })?;

            tracing::warn!(
                dump = %dump_path.display(),
                diagnostic = %diagnostic,
                "Round-trip mismatch"
            );

            Err(VerificationMismatch {
                diagnostic,
                dump_path: dump_path.to_path_buf(),
            }
            .into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_exact_match() {
        assert_eq!(compare(b"{\"a\":1}", b"{\"a\":1}"), Verdict::Matched);
        assert_eq!(compare(b"", b""), Verdict::Matched);
    }

    #[test]
    fn test_first_difference_reported() {
        let Verdict::Mismatched(diag) = compare(b"{\"a\":1}", b"{\"a\":2}") else {
            panic!("expected mismatch");
        };
        assert!(diag.contains("byte 5"));
        assert!(diag.contains("'1'"));
        assert!(diag.contains("'2'"));
    }

    #[test]
    fn test_truncation_reported() {
        let Verdict::Mismatched(diag) = compare(b"abcdef", b"abc") else {
            panic!("expected mismatch");
        };
        assert!(diag.contains("expected 6 bytes, got 3"));
        assert!(diag.contains("byte 3"));
        assert!(diag.contains("end of data"));
    }

    #[test]
    fn test_whitespace_is_significant() {
        assert!(matches!(compare(b"[1,2]", b"[1, 2]"), Verdict::Mismatched(_)));
    }

    #[tokio::test]
    async fn test_mismatch_persists_dump() {
        let dir = TempDir::new().unwrap();
        let dump = dir.path().join("pako-a.json.decompressed");

        verify(b"same", b"same", &dump).await.unwrap();
        assert!(!dump.exists());

        let err = verify(b"original", b"0riginal", &dump).await.unwrap_err();
        assert_eq!(err.kind(), "mismatch");
        assert_eq!(std::fs::read(&dump).unwrap(), b"0riginal");
    }
}
