//! Sampled content fingerprinting.
//!
//! Files below [`WHOLE_FILE_LIMIT`] are hashed in full. Larger files are
//! represented by their first and last [`SAMPLE_SIZE`] bytes. The decimal
//! byte size is always folded in last, so files of different size never
//! share a fingerprint.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use blake3::Hasher;

use diskscope_core::ContentHash;

/// Files smaller than this are hashed in full.
pub const WHOLE_FILE_LIMIT: u64 = 2 * 1024 * 1024;

/// Bytes read from each end of a large file.
pub const SAMPLE_SIZE: u64 = 1024 * 1024;

/// Compute the fingerprint of the file at `path`.
///
/// Any open, stat or read failure is returned as-is; callers treat it as
/// "unreadable" and move on.
pub fn fingerprint(path: &Path) -> io::Result<ContentHash> {
    let mut file = File::open(path)?;
    let size = file.metadata()?.len();

    let mut hasher = Hasher::new();

    if size < WHOLE_FILE_LIMIT {
        io::copy(&mut file, &mut hasher)?;
    } else {
        let mut buf = vec![0u8; SAMPLE_SIZE as usize];
        file.read_exact(&mut buf)?;
        hasher.update(&buf);

        file.seek(SeekFrom::End(-(SAMPLE_SIZE as i64)))?;
        file.read_exact(&mut buf)?;
        hasher.update(&buf);
    }

    hasher.update(size.to_string().as_bytes());

    Ok(ContentHash::new(*hasher.finalize().as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_identical_content_same_hash() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.bin");
        let b = temp.path().join("b.bin");
        fs::write(&a, b"same bytes").unwrap();
        fs::write(&b, b"same bytes").unwrap();

        assert_eq!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }

    #[test]
    fn test_idempotent() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.bin");
        fs::write(&a, vec![7u8; 4096]).unwrap();

        assert_eq!(fingerprint(&a).unwrap(), fingerprint(&a).unwrap());
    }

    #[test]
    fn test_size_folded_into_digest() {
        let temp = TempDir::new().unwrap();
        let short = temp.path().join("short.bin");
        let long = temp.path().join("long.bin");
        fs::write(&short, b"abc").unwrap();
        fs::write(&long, b"abcabc").unwrap();

        assert_ne!(fingerprint(&short).unwrap(), fingerprint(&long).unwrap());

        // Empty content still yields a digest of the size string.
        let empty = temp.path().join("empty.bin");
        fs::write(&empty, b"").unwrap();
        let mut hasher = Hasher::new();
        hasher.update(b"0");
        assert_eq!(
            fingerprint(&empty).unwrap(),
            ContentHash::new(*hasher.finalize().as_bytes())
        );
    }

    #[test]
    fn test_large_files_sampled_at_both_ends() {
        let temp = TempDir::new().unwrap();
        let size = (WHOLE_FILE_LIMIT + 4096) as usize;

        let base = vec![1u8; size];
        let mut middle_changed = base.clone();
        middle_changed[size / 2] = 9;
        let mut tail_changed = base.clone();
        tail_changed[size - 1] = 9;

        let p_base = temp.path().join("base.bin");
        let p_middle = temp.path().join("middle.bin");
        let p_tail = temp.path().join("tail.bin");
        fs::write(&p_base, &base).unwrap();
        fs::write(&p_middle, &middle_changed).unwrap();
        fs::write(&p_tail, &tail_changed).unwrap();

        // Bytes outside the sampled windows do not participate.
        assert_eq!(fingerprint(&p_base).unwrap(), fingerprint(&p_middle).unwrap());
        assert_ne!(fingerprint(&p_base).unwrap(), fingerprint(&p_tail).unwrap());
    }

    #[test]
    fn test_missing_file_is_error() {
        let temp = TempDir::new().unwrap();
        let err = fingerprint(&temp.path().join("gone.bin")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
