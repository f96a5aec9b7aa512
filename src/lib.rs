//! pvcreek: stream Wikimedia hourly pageview dumps
//!
//! Hourly dumps are gzip-compressed text files with one line per page:
//! `<domain_code> <page_title> <count_views> <total_response_size>`.
//! They are large enough that holding one decompressed in memory is wasteful,
//! and most consumers want only a small slice of the lines. This crate:
//!
//! - fetches a dump over HTTP, or reads it from a local cache, optionally
//!   writing it through to the cache during the same pass
//! - decompresses incrementally and splits lines as they arrive
//! - applies cheap text filters before any parsing happens
//! - parses surviving lines into [`Pageviews`] records, decoding the compact
//!   domain code into language, project and mobile flag
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐   ┌─────────────┐   ┌─────────────┐   ┌────────────┐
//! │ ByteSource │──►│ LineDecoder │──►│ FilterChain │──►│ parse_line │──► Pageviews
//! │ cache/HTTP │   │ gzip, lines │   │ AND of conds│   │ domain code│
//! └────────────┘   └─────────────┘   └─────────────┘   └────────────┘
//! ```
//!
//! Every stage is a pull-based iterator; dropping the [`PageviewsStream`]
//! releases the network body and cache file.

pub mod config;
pub mod decode;
pub mod error;
pub mod filter;
pub mod parse;
pub mod pipeline;
pub mod progress;
pub mod source;

pub use config::Config;
pub use decode::LineDecoder;
pub use error::{StreamError, StreamResult};
pub use filter::{FilterChain, FilterConfigError, FilterSpec};
pub use parse::{parse_line, project_host, DomainCode, Pageviews, ParseError, ParseErrorReason};
pub use pipeline::{pvcreek, PageviewsStream, StreamRequest, StreamStats};
pub use source::{ByteSource, FileId, HttpClient, ReqwestClient, SourceOrigin};
