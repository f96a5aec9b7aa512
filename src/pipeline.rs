//! Composition of the streaming stages
//!
//! `ByteSource` → `LineDecoder` → `FilterChain` → `parse_line`, pulled one
//! record at a time. Nothing is read ahead of what the consumer asks for,
//! and dropping the stream closes the body, the cache file and any partial
//! download.

use crate::decode::LineDecoder;
use crate::error::{StreamError, StreamResult};
use crate::filter::{FilterChain, FilterSpec};
use crate::parse::{parse_line, Pageviews, ParseError};
use crate::source::{
    ByteSource, FileId, HttpClient, HttpSettings, ReqwestClient, SourceOrigin, SourceStream,
    BASE_URL,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Callback invoked for each malformed line that gets skipped
pub type SkipHandler = Box<dyn FnMut(&ParseError) + Send>;

/// Counters for a single pass over a dump
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStats {
    /// Lines produced by the decoder
    pub lines_read: u64,
    /// Lines rejected by the filter chain
    pub lines_filtered: u64,
    /// Records handed to the consumer
    pub records: u64,
    /// Lines that passed the filters but failed to parse
    pub lines_skipped: u64,
}

/// Everything needed to open a pageviews stream
pub struct StreamRequest {
    id: FileId,
    base_url: String,
    cache_dir: Option<PathBuf>,
    filter: FilterSpec,
    client: Option<Arc<dyn HttpClient>>,
    http: HttpSettings,
}

impl StreamRequest {
    pub fn new(id: impl Into<FileId>) -> Self {
        Self {
            id: id.into(),
            base_url: BASE_URL.to_string(),
            cache_dir: None,
            filter: FilterSpec::default(),
            client: None,
            http: HttpSettings::default(),
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Read from and write through to this directory
    pub fn cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(cache_dir.into());
        self
    }

    pub fn cache_dir_opt(mut self, cache_dir: Option<PathBuf>) -> Self {
        self.cache_dir = cache_dir;
        self
    }

    pub fn filter(mut self, filter: FilterSpec) -> Self {
        self.filter = filter;
        self
    }

    /// Use a custom HTTP client instead of the default reqwest one
    pub fn client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn http_settings(mut self, http: HttpSettings) -> Self {
        self.http = http;
        self
    }

    /// Validate the filters, then open the source.
    ///
    /// Filter errors surface before any I/O; HTTP status errors surface
    /// before any record is yielded.
    pub fn open(self) -> StreamResult<PageviewsStream> {
        let filter = FilterChain::new(&self.filter)?;
        debug!("Filter chain with {} condition(s)", filter.len());

        let client: Arc<dyn HttpClient> = match self.client {
            Some(client) => client,
            None => Arc::new(ReqwestClient::new(&self.http)?),
        };

        let mut source = ByteSource::new(self.base_url, client);
        if let Some(dir) = self.cache_dir {
            source = source.with_cache_dir(dir);
        }

        let stream = source.open(&self.id)?;
        info!("Streaming {} from {}", self.id, stream.origin());

        Ok(PageviewsStream::new(stream, filter))
    }
}

/// Open a filtered stream of pageview records.
///
/// ```no_run
/// use pvcreek::{pvcreek, FilterSpec, StreamRequest};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let request = StreamRequest::new("pageviews-20240105-070000.gz")
///     .cache_dir(".cache/pageviews")
///     .filter(FilterSpec::new().starts_with("no"));
///
/// for record in pvcreek(request)? {
///     let record = record?;
///     println!("{} {}", record.page_title, record.count_views);
/// }
/// # Ok(())
/// # }
/// ```
pub fn pvcreek(request: StreamRequest) -> StreamResult<PageviewsStream> {
    request.open()
}

/// Lazy, forward-only sequence of parsed records
pub struct PageviewsStream {
    lines: LineDecoder<SourceStream>,
    filter: FilterChain,
    origin: SourceOrigin,
    stats: StreamStats,
    on_skip: Option<SkipHandler>,
    finished: bool,
}

impl PageviewsStream {
    /// Wrap an already-open source
    pub fn new(source: SourceStream, filter: FilterChain) -> Self {
        let origin = source.origin();
        Self {
            lines: LineDecoder::new(source),
            filter,
            origin,
            stats: StreamStats::default(),
            on_skip: None,
            finished: false,
        }
    }

    /// Register a callback for malformed lines, in addition to the warning log
    pub fn on_skip<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&ParseError) + Send + 'static,
    {
        self.on_skip = Some(Box::new(handler));
        self
    }

    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    pub fn origin(&self) -> SourceOrigin {
        self.origin
    }

    fn finish(&mut self) {
        if !self.finished {
            self.finished = true;
            info!(
                "Stream complete: {} lines, {} filtered, {} records, {} skipped",
                self.stats.lines_read,
                self.stats.lines_filtered,
                self.stats.records,
                self.stats.lines_skipped
            );
        }
    }
}

impl Iterator for PageviewsStream {
    type Item = Result<Pageviews, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(e));
                }
                None => {
                    self.finish();
                    return None;
                }
            };
            self.stats.lines_read += 1;

            if !self.filter.accepts(&line) {
                self.stats.lines_filtered += 1;
                continue;
            }

            match parse_line(&line) {
                Ok(record) => {
                    self.stats.records += 1;
                    return Some(Ok(record));
                }
                Err(e) => {
                    self.stats.lines_skipped += 1;
                    warn!("Skipping line {}: {}", self.stats.lines_read, e);
                    if let Some(handler) = self.on_skip.as_mut() {
                        handler(&e);
                    }
                }
            }
        }
    }
}
