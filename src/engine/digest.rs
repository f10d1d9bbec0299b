//! Digest provider: resolve an algorithm once, then stream files through it.

use sha2::Digest;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::Algorithm;
use crate::error::{ConfigError, FileError};
use crate::utils::config::HashingConsts;

/// Digest function handed to the worker pool: `(path, deadline) -> lowercase hex digest`.
///
/// The deadline is checked between reads; a file still streaming past it yields
/// [`FileError::TimedOut`].
pub type DigestFn =
    Arc<dyn Fn(&Path, Option<Instant>) -> Result<String, FileError> + Send + Sync + 'static>;

/// Incremental hasher over every supported algorithm.
enum StreamHasher {
    Crc32(crc32fast::Hasher),
    Md5(md5::Md5),
    Sha1(sha1::Sha1),
    Sha256(sha2::Sha256),
    Sha512(sha2::Sha512),
    Blake3(Box<blake3::Hasher>),
}

impl StreamHasher {
    fn new(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Crc32 => StreamHasher::Crc32(crc32fast::Hasher::new()),
            Algorithm::Md5 => StreamHasher::Md5(md5::Md5::new()),
            Algorithm::Sha1 => StreamHasher::Sha1(sha1::Sha1::new()),
            Algorithm::Sha256 => StreamHasher::Sha256(sha2::Sha256::new()),
            Algorithm::Sha512 => StreamHasher::Sha512(sha2::Sha512::new()),
            Algorithm::Blake3 => StreamHasher::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, bytes: &[u8]) {
        match self {
            StreamHasher::Crc32(h) => h.update(bytes),
            StreamHasher::Md5(h) => Digest::update(h, bytes),
            StreamHasher::Sha1(h) => Digest::update(h, bytes),
            StreamHasher::Sha256(h) => Digest::update(h, bytes),
            StreamHasher::Sha512(h) => Digest::update(h, bytes),
            StreamHasher::Blake3(h) => {
                h.update(bytes);
            }
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            StreamHasher::Crc32(h) => format!("{:08x}", h.finalize()),
            StreamHasher::Md5(h) => format!("{:x}", h.finalize()),
            StreamHasher::Sha1(h) => format!("{:x}", h.finalize()),
            StreamHasher::Sha256(h) => format!("{:x}", h.finalize()),
            StreamHasher::Sha512(h) => format!("{:x}", h.finalize()),
            StreamHasher::Blake3(h) => h.finalize().to_hex().to_string(),
        }
    }
}

/// Digest an in-memory byte string.
pub fn digest_bytes(algorithm: Algorithm, bytes: &[u8]) -> String {
    let mut hasher = StreamHasher::new(algorithm);
    hasher.update(bytes);
    hasher.finalize_hex()
}

/// Stream `path` through `algorithm` with a fixed-size buffer. Memory use does not grow with file size.
pub fn digest_file(
    algorithm: Algorithm,
    path: &Path,
    deadline: Option<Instant>,
) -> Result<String, FileError> {
    let started = Instant::now();
    let mut file = open_nonblocking(path)?;
    let mut hasher = StreamHasher::new(algorithm);
    let mut buffer = vec![0u8; HashingConsts::READ_CHUNK_SIZE];
    loop {
        if let Some(deadline) = deadline
            && Instant::now() >= deadline
        {
            return Err(FileError::TimedOut(elapsed_rounded(started)));
        }
        let n = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            // Fifo or device with nothing to read yet: wait, then re-check the deadline.
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                thread::sleep(HashingConsts::WOULD_BLOCK_BACKOFF);
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        hasher.update(&buffer[..n]);
    }
    Ok(hasher.finalize_hex())
}

/// Open for reading without blocking in `open(2)`. A fifo with no writer would otherwise
/// park the worker before any deadline check. No effect on regular files.
#[cfg(unix)]
fn open_nonblocking(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
}

#[cfg(not(unix))]
fn open_nonblocking(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().read(true).open(path)
}

fn elapsed_rounded(started: Instant) -> Duration {
    Duration::from_millis(started.elapsed().as_millis() as u64)
}

/// Resolve an algorithm into the digest function passed to the pool.
pub fn resolve(algorithm: Algorithm) -> DigestFn {
    Arc::new(move |path: &Path, deadline: Option<Instant>| digest_file(algorithm, path, deadline))
}

/// Resolve an algorithm identifier. Unknown identifiers fail here, before any traversal.
pub fn resolve_named(id: &str) -> Result<DigestFn, ConfigError> {
    let algorithm = id.parse::<Algorithm>()?;
    Ok(resolve(algorithm))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn known_digests_of_hello() {
        let hello = b"hello";
        assert_eq!(digest_bytes(Algorithm::Crc32, hello), "3610a686");
        assert_eq!(
            digest_bytes(Algorithm::Md5, hello),
            "5d41402abc4b2a76b9719d911017c592"
        );
        assert_eq!(
            digest_bytes(Algorithm::Sha1, hello),
            "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d"
        );
        assert_eq!(
            digest_bytes(Algorithm::Sha256, hello),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn known_digests_of_empty_input() {
        assert_eq!(digest_bytes(Algorithm::Crc32, b""), "00000000");
        assert_eq!(
            digest_bytes(Algorithm::Md5, b""),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
        assert_eq!(
            digest_bytes(Algorithm::Blake3, b""),
            "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262"
        );
    }

    #[test]
    fn hex_is_lowercase_with_expected_length() {
        for algo in Algorithm::all() {
            let hex = digest_bytes(*algo, b"filesig");
            assert_eq!(hex.len(), algo.hex_len(), "{algo}");
            assert!(
                hex.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)),
                "{algo}: {hex}"
            );
        }
    }

    #[test]
    fn file_spanning_several_chunks_matches_in_memory_digest() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("big.bin");
        let data: Vec<u8> = (0..HashingConsts::READ_CHUNK_SIZE * 3 + 17)
            .map(|i| (i % 251) as u8)
            .collect();
        std::fs::File::create(&path)
            .unwrap()
            .write_all(&data)
            .unwrap();
        for algo in Algorithm::all() {
            assert_eq!(
                digest_file(*algo, &path, None).unwrap(),
                digest_bytes(*algo, &data)
            );
        }
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = digest_file(Algorithm::Md5, Path::new("/nonexistent/filesig"), None).unwrap_err();
        assert!(matches!(err, FileError::Io(ref e) if e.kind() == ErrorKind::NotFound));
        assert_eq!(err.kind(), crate::FailureKind::Read);
    }

    #[test]
    fn expired_deadline_is_timeout() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "hello").unwrap();
        let err = digest_file(Algorithm::Sha256, &path, Some(Instant::now())).unwrap_err();
        assert_eq!(err.kind(), crate::FailureKind::Timeout);
    }

    #[cfg(unix)]
    fn mkfifo(path: &Path) {
        use std::os::unix::ffi::OsStrExt;
        let c_path = std::ffi::CString::new(path.as_os_str().as_bytes()).unwrap();
        assert_eq!(unsafe { libc::mkfifo(c_path.as_ptr(), 0o644) }, 0);
    }

    #[cfg(unix)]
    #[test]
    fn idle_fifo_times_out_instead_of_blocking() {
        let dir = tempfile::TempDir::new().unwrap();
        let fifo = dir.path().join("pipe");
        mkfifo(&fifo);
        // Hold a writer that never writes, so reads would block forever.
        let _writer = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&fifo)
            .unwrap();
        let started = Instant::now();
        let deadline = Some(started + Duration::from_millis(200));
        let err = digest_file(Algorithm::Md5, &fifo, deadline).unwrap_err();
        assert_eq!(err.kind(), crate::FailureKind::Timeout);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[test]
    fn fifo_without_writer_reads_as_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let fifo = dir.path().join("pipe");
        mkfifo(&fifo);
        assert_eq!(
            digest_file(Algorithm::Md5, &fifo, None).unwrap(),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
    }

    #[test]
    fn resolve_named_rejects_unknown() {
        assert!(resolve_named("sha256").is_ok());
        assert!(matches!(
            resolve_named("md4"),
            Err(ConfigError::UnknownAlgorithm { .. })
        ));
    }
}
