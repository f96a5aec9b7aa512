//! Byte-stream acquisition
//!
//! Resolves a [`FileId`] to a readable stream of (still compressed) dump bytes:
//!
//! ```text
//!   FileId::Local(path) ────────────────────────────► File
//!   FileId::Name / Timestamp
//!        │
//!        ├─ cache_dir/filename exists ──────────────► File          (no network)
//!        ├─ cache_dir configured ─► HttpClient ─► CacheTee ─► body (+ cache file)
//!        └─ no cache ─────────────► HttpClient ─────────────► body
//! ```

pub mod http;
pub mod naming;
pub mod tee;

pub use http::{HttpClient, HttpSettings, ReqwestClient, DEFAULT_USER_AGENT};
pub use naming::{filename_from_timestamp, parse_timestamp, url_from_filename, BASE_URL};
pub use tee::{CacheFile, CacheTee};

use crate::error::StreamError;
use chrono::NaiveDateTime;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Identifies which dump to read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileId {
    /// Canonical dump filename, e.g. `pageviews-20240105-070000.gz`
    Name(String),
    /// Any instant within the wanted hour
    Timestamp(NaiveDateTime),
    /// A gzip file already on disk; read directly, bypassing cache and network
    Local(PathBuf),
}

impl FileId {
    /// Interpret user input: a timestamp if it parses as one, otherwise a filename
    pub fn parse(input: &str) -> Self {
        match parse_timestamp(input) {
            Some(ts) => FileId::Timestamp(ts),
            None => FileId::Name(input.to_string()),
        }
    }

    /// Resolve to a dump filename
    pub fn filename(&self) -> Result<String, StreamError> {
        match self {
            FileId::Name(name) if name.trim().is_empty() => {
                Err(StreamError::InvalidFilename(name.clone()))
            }
            FileId::Name(name) => Ok(name.clone()),
            FileId::Timestamp(ts) => Ok(filename_from_timestamp(ts)),
            FileId::Local(path) => path
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
                .ok_or_else(|| StreamError::InvalidFilename(path.display().to_string())),
        }
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileId::Name(name) => f.write_str(name),
            FileId::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%dT%H:00")),
            FileId::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

impl From<&str> for FileId {
    fn from(name: &str) -> Self {
        FileId::Name(name.to_string())
    }
}

impl From<String> for FileId {
    fn from(name: String) -> Self {
        FileId::Name(name)
    }
}

impl From<NaiveDateTime> for FileId {
    fn from(ts: NaiveDateTime) -> Self {
        FileId::Timestamp(ts)
    }
}

impl From<PathBuf> for FileId {
    fn from(path: PathBuf) -> Self {
        FileId::Local(path)
    }
}

/// Where a stream's bytes come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOrigin {
    /// Existing cache file, no network access
    Cache,
    /// Explicit local file
    Local,
    /// Network only
    Network,
    /// Network, written through to the cache
    NetworkCaching,
}

impl fmt::Display for SourceOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceOrigin::Cache => "cache",
            SourceOrigin::Local => "local",
            SourceOrigin::Network => "network",
            SourceOrigin::NetworkCaching => "network+cache",
        })
    }
}

/// An open dump stream, positioned at the first byte of the file
pub enum SourceStream {
    Cached(File),
    Local(File),
    Remote(Box<dyn Read + Send>),
    Teed(CacheTee<Box<dyn Read + Send>>),
}

impl SourceStream {
    pub fn origin(&self) -> SourceOrigin {
        match self {
            SourceStream::Cached(_) => SourceOrigin::Cache,
            SourceStream::Local(_) => SourceOrigin::Local,
            SourceStream::Remote(_) => SourceOrigin::Network,
            SourceStream::Teed(_) => SourceOrigin::NetworkCaching,
        }
    }
}

impl Read for SourceStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            SourceStream::Cached(f) | SourceStream::Local(f) => f.read(buf),
            SourceStream::Remote(body) => body.read(buf),
            SourceStream::Teed(tee) => tee.read(buf),
        }
    }
}

impl fmt::Debug for SourceStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceStream")
            .field("origin", &self.origin())
            .finish()
    }
}

/// Opens dump streams from the cache or the network
#[derive(Clone)]
pub struct ByteSource {
    base_url: String,
    cache_dir: Option<PathBuf>,
    client: Arc<dyn HttpClient>,
}

impl ByteSource {
    pub fn new(base_url: impl Into<String>, client: Arc<dyn HttpClient>) -> Self {
        Self {
            base_url: base_url.into(),
            cache_dir: None,
            client,
        }
    }

    /// Read from and populate this directory
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(cache_dir.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache_dir.as_deref()
    }

    /// Path a cached copy of `filename` would live at
    pub fn cache_path(&self, filename: &str) -> Option<PathBuf> {
        self.cache_dir.as_ref().map(|dir| dir.join(filename))
    }

    /// Open a stream for `id`.
    ///
    /// A cache hit never touches the network. A miss with a cache directory
    /// returns a stream that writes through to the cache as it is read.
    /// HTTP status is checked here, before any bytes are handed out.
    pub fn open(&self, id: &FileId) -> Result<SourceStream, StreamError> {
        if let FileId::Local(path) = id {
            info!("Reading local file {}", path.display());
            return Ok(SourceStream::Local(File::open(path)?));
        }

        let filename = id.filename()?;

        if let Some(cached) = self.cache_path(&filename).filter(|p| p.is_file()) {
            info!("Cache hit: {}", cached.display());
            return Ok(SourceStream::Cached(File::open(&cached)?));
        }

        let url = url_from_filename(&self.base_url, &filename)?;
        // Open the cache file first so an unusable cache fails without a request
        let cache = match &self.cache_dir {
            Some(dir) => Some(CacheFile::create(dir, &filename)?),
            None => None,
        };

        let body = self.fetch(&url)?;
        match cache {
            Some(cache) => Ok(SourceStream::Teed(CacheTee::new(body, cache))),
            None => Ok(SourceStream::Remote(body)),
        }
    }

    /// Make sure `id` is present in `cache_dir` without decoding it. Returns the cache path.
    pub fn download(&self, id: &FileId, cache_dir: &Path) -> Result<PathBuf, StreamError> {
        let filename = id.filename()?;
        let target = cache_dir.join(&filename);
        if target.is_file() {
            info!("Already cached: {}", target.display());
            return Ok(target);
        }

        if let FileId::Local(path) = id {
            std::fs::create_dir_all(cache_dir)?;
            std::fs::copy(path, &target)?;
            return Ok(target);
        }

        let url = url_from_filename(&self.base_url, &filename)?;
        let cache = CacheFile::create(cache_dir, &filename)?;
        let mut tee = CacheTee::new(self.fetch(&url)?, cache);
        io::copy(&mut tee, &mut io::sink()).map_err(StreamError::from_read)?;

        Ok(target)
    }

    fn fetch(&self, url: &str) -> Result<Box<dyn Read + Send>, StreamError> {
        info!("Fetching {}", url);
        let body = self.client.open(url)?;
        debug!("Streaming {}", url);
        Ok(body)
    }
}

impl fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteSource")
            .field("base_url", &self.base_url)
            .field("cache_dir", &self.cache_dir)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    const NAME: &str = "pageviews-20240105-070000.gz";

    /// Serves a fixed body (or status) and records requested URLs
    struct FakeClient {
        body: Vec<u8>,
        status: u16,
        requests: Mutex<Vec<String>>,
        opened: AtomicUsize,
    }

    impl FakeClient {
        fn ok(body: &[u8]) -> Arc<Self> {
            Arc::new(Self {
                body: body.to_vec(),
                status: 200,
                requests: Mutex::new(Vec::new()),
                opened: AtomicUsize::new(0),
            })
        }

        fn status(status: u16) -> Arc<Self> {
            Arc::new(Self {
                body: Vec::new(),
                status,
                requests: Mutex::new(Vec::new()),
                opened: AtomicUsize::new(0),
            })
        }
    }

    impl HttpClient for FakeClient {
        fn open(&self, url: &str) -> Result<Box<dyn Read + Send>, StreamError> {
            self.requests.lock().unwrap().push(url.to_string());
            if self.status != 200 {
                return Err(StreamError::Fetch {
                    url: url.to_string(),
                    status: self.status,
                });
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(Cursor::new(self.body.clone())))
        }
    }

    #[test]
    fn test_file_id_parse() {
        assert!(matches!(FileId::parse("2024-01-05T07"), FileId::Timestamp(_)));
        assert_eq!(FileId::parse(NAME), FileId::Name(NAME.to_string()));
        assert_eq!(FileId::parse("2024-01-05T07:59").filename().unwrap(), NAME);
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let source = ByteSource::new(BASE_URL, FakeClient::ok(b""));
        assert!(matches!(
            source.open(&FileId::Name(String::new())),
            Err(StreamError::InvalidFilename(_))
        ));
    }

    #[test]
    fn test_remote_url_layout() {
        let client = FakeClient::ok(b"data");
        let source = ByteSource::new("http://mirror.test/pv", client.clone());

        let stream = source.open(&FileId::from(NAME)).unwrap();
        assert_eq!(stream.origin(), SourceOrigin::Network);
        assert_eq!(
            client.requests.lock().unwrap().as_slice(),
            ["http://mirror.test/pv/2024/2024-01/pageviews-20240105-070000.gz"]
        );
    }

    #[test]
    fn test_fetch_error_carries_status() {
        let source = ByteSource::new(BASE_URL, FakeClient::status(404));
        match source.open(&FileId::from(NAME)) {
            Err(StreamError::Fetch { status, url }) => {
                assert_eq!(status, 404);
                assert!(url.ends_with(NAME));
            }
            other => panic!("expected fetch error, got {:?}", other),
        }
    }

    #[test]
    fn test_cache_miss_then_hit() {
        let dir = TempDir::new().unwrap();
        let client = FakeClient::ok(b"compressed bytes");
        let source = ByteSource::new(BASE_URL, client.clone()).with_cache_dir(dir.path());

        let mut first = source.open(&FileId::from(NAME)).unwrap();
        assert_eq!(first.origin(), SourceOrigin::NetworkCaching);
        let mut bytes = Vec::new();
        first.read_to_end(&mut bytes).unwrap();
        drop(first);
        assert_eq!(fs_read(&dir.path().join(NAME)), b"compressed bytes");

        let second = source.open(&FileId::from(NAME)).unwrap();
        assert_eq!(second.origin(), SourceOrigin::Cache);
        assert_eq!(client.opened.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cache_hit_skips_name_validation() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("custom.gz"), b"x").unwrap();
        let client = FakeClient::ok(b"");
        let source = ByteSource::new(BASE_URL, client.clone()).with_cache_dir(dir.path());

        let stream = source.open(&FileId::from("custom.gz")).unwrap();
        assert_eq!(stream.origin(), SourceOrigin::Cache);
        assert!(client.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_download_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let client = FakeClient::ok(b"0123456789");
        let source = ByteSource::new(BASE_URL, client.clone());

        let path = source.download(&FileId::from(NAME), dir.path()).unwrap();
        assert_eq!(fs_read(&path), b"0123456789");
        let again = source.download(&FileId::from(NAME), dir.path()).unwrap();
        assert_eq!(path, again);
        assert_eq!(client.requests.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_unusable_cache_dir_skips_request() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("cache");
        std::fs::write(&blocker, b"occupied").unwrap();
        let client = FakeClient::ok(b"data");
        let source = ByteSource::new(BASE_URL, client.clone()).with_cache_dir(&blocker);

        assert!(matches!(
            source.open(&FileId::from(NAME)),
            Err(StreamError::CacheWrite { .. })
        ));
        assert!(matches!(
            source.download(&FileId::from(NAME), &blocker),
            Err(StreamError::CacheWrite { .. })
        ));
        assert!(client.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_fetch_error_removes_partial_file() {
        let dir = TempDir::new().unwrap();
        let source =
            ByteSource::new(BASE_URL, FakeClient::status(503)).with_cache_dir(dir.path());

        assert!(source.open(&FileId::from(NAME)).is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    fn fs_read(path: &Path) -> Vec<u8> {
        std::fs::read(path).unwrap()
    }
}
