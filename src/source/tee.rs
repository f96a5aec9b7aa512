//! Read-through cache writer
//!
//! Wraps a network body so that every chunk handed to the decoder is also
//! appended to a cache file. Bytes land in `<name>.part`; the file is renamed
//! into place only once the body has been read to EOF, so an interrupted
//! stream never leaves something that looks like a cache hit.

use crate::error::CacheWriteError;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Suffix for in-progress cache files
pub const PARTIAL_SUFFIX: &str = ".part";

/// In-progress cache file: written as `<name>.part`, renamed on commit and
/// removed if dropped uncommitted
pub struct CacheFile {
    /// Open while the download is in progress; `None` once committed or failed
    sink: Option<BufWriter<File>>,
    partial_path: PathBuf,
    final_path: PathBuf,
    bytes_written: u64,
}

impl CacheFile {
    /// Open `cache_dir/filename.part` for writing, creating the directory if needed
    pub fn create(cache_dir: &Path, filename: &str) -> Result<Self, CacheWriteError> {
        fs::create_dir_all(cache_dir).map_err(|source| CacheWriteError {
            path: cache_dir.to_path_buf(),
            source,
        })?;

        let final_path = cache_dir.join(filename);
        let partial_path = cache_dir.join(format!("{filename}{PARTIAL_SUFFIX}"));
        let file = File::create(&partial_path).map_err(|source| CacheWriteError {
            path: partial_path.clone(),
            source,
        })?;

        debug!("Caching to {}", partial_path.display());

        Ok(Self {
            sink: Some(BufWriter::with_capacity(256 * 1024, file)),
            partial_path,
            final_path,
            bytes_written: 0,
        })
    }

    /// Final location of the cache file
    pub fn path(&self) -> &Path {
        &self.final_path
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn is_complete(&self) -> bool {
        self.sink.is_none() && self.final_path.exists()
    }

    fn write(&mut self, chunk: &[u8]) -> Result<(), CacheWriteError> {
        let Some(sink) = self.sink.as_mut() else {
            return Ok(());
        };
        if let Err(source) = sink.write_all(chunk) {
            let err = CacheWriteError {
                path: self.partial_path.clone(),
                source,
            };
            self.discard();
            return Err(err);
        }
        self.bytes_written += chunk.len() as u64;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), CacheWriteError> {
        let Some(writer) = self.sink.take() else {
            return Ok(());
        };

        let result = writer
            .into_inner()
            .map_err(|e| e.into_error())
            .and_then(|file| file.sync_all())
            .map_err(|source| CacheWriteError {
                path: self.partial_path.clone(),
                source,
            })
            .and_then(|()| {
                fs::rename(&self.partial_path, &self.final_path).map_err(|source| {
                    CacheWriteError {
                        path: self.final_path.clone(),
                        source,
                    }
                })
            });

        if let Err(e) = result {
            // The sink is already gone; only the leftover file needs removing
            let _ = fs::remove_file(&self.partial_path);
            return Err(e);
        }

        info!(
            "Cached {} ({} bytes)",
            self.final_path.display(),
            self.bytes_written
        );
        Ok(())
    }

    fn discard(&mut self) {
        if let Some(writer) = self.sink.take() {
            drop(writer);
            match fs::remove_file(&self.partial_path) {
                Ok(()) => warn!(
                    "Discarded partial cache file {} after {} bytes",
                    self.partial_path.display(),
                    self.bytes_written
                ),
                Err(e) => warn!(
                    "Failed to remove partial cache file {}: {}",
                    self.partial_path.display(),
                    e
                ),
            }
        }
    }
}

impl Drop for CacheFile {
    fn drop(&mut self) {
        // Still holding the sink means EOF was never reached
        self.discard();
    }
}

/// Dual-sink reader: yields bytes from `inner` and writes them to the cache
pub struct CacheTee<R> {
    inner: R,
    cache: CacheFile,
}

impl<R: Read> CacheTee<R> {
    /// Tee `inner` into an already opened cache file
    pub fn new(inner: R, cache: CacheFile) -> Self {
        Self { inner, cache }
    }

    /// Start teeing `inner` into `cache_dir/filename`, creating the directory if needed
    pub fn create(inner: R, cache_dir: &Path, filename: &str) -> Result<Self, CacheWriteError> {
        Ok(Self::new(inner, CacheFile::create(cache_dir, filename)?))
    }

    /// Final location of the cache file
    pub fn cache_path(&self) -> &Path {
        self.cache.path()
    }

    /// Whether the cache file has been committed
    pub fn is_complete(&self) -> bool {
        self.cache.is_complete()
    }

    pub fn bytes_written(&self) -> u64 {
        self.cache.bytes_written()
    }
}

impl<R: Read> Read for CacheTee<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;

        if n == 0 {
            self.cache.commit().map_err(CacheWriteError::into_io)?;
            return Ok(0);
        }

        self.cache
            .write(&buf[..n])
            .map_err(CacheWriteError::into_io)?;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn test_tee_commits_on_eof() {
        let dir = TempDir::new().unwrap();
        let payload: Vec<u8> = (0..50_000u32).flat_map(|i| i.to_le_bytes()).collect();

        let mut tee = CacheTee::create(Cursor::new(payload.clone()), dir.path(), "a.gz").unwrap();
        let mut out = Vec::new();
        tee.read_to_end(&mut out).unwrap();

        assert_eq!(out, payload);
        assert!(tee.is_complete());
        assert_eq!(tee.bytes_written(), payload.len() as u64);
        assert_eq!(fs::read(dir.path().join("a.gz")).unwrap(), payload);
        assert!(!dir.path().join("a.gz.part").exists());
    }

    #[test]
    fn test_tee_discards_partial_on_drop() {
        let dir = TempDir::new().unwrap();
        let payload = vec![7u8; 10_000];

        let mut tee = CacheTee::create(Cursor::new(payload), dir.path(), "b.gz").unwrap();
        let mut chunk = [0u8; 100];
        tee.read_exact(&mut chunk).unwrap();
        assert!(dir.path().join("b.gz.part").exists());
        drop(tee);

        assert!(!dir.path().join("b.gz.part").exists());
        assert!(!dir.path().join("b.gz").exists());
    }

    #[test]
    fn test_tee_creates_cache_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested").join("cache");

        let mut tee = CacheTee::create(Cursor::new(b"abc".to_vec()), &nested, "c.gz").unwrap();
        io::copy(&mut tee, &mut io::sink()).unwrap();

        assert_eq!(fs::read(nested.join("c.gz")).unwrap(), b"abc");
    }

    #[test]
    fn test_uncommitted_cache_file_is_removed() {
        let dir = TempDir::new().unwrap();

        let cache = CacheFile::create(dir.path(), "e.gz").unwrap();
        assert!(dir.path().join("e.gz.part").exists());
        assert_eq!(cache.path(), dir.path().join("e.gz"));
        drop(cache);

        assert!(!dir.path().join("e.gz.part").exists());
        assert!(!dir.path().join("e.gz").exists());
    }

    #[test]
    fn test_unwritable_cache_dir_fails_fast() {
        let dir = TempDir::new().unwrap();
        // A regular file where the directory should be
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();

        let err = CacheTee::create(Cursor::new(Vec::new()), &blocker, "d.gz")
            .err()
            .unwrap();
        assert_eq!(err.path, blocker);
    }
}
