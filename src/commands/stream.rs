use crate::OutputFormat;
use anyhow::{Context, Result};
use pvcreek::{
    config::Config, progress::StreamProgress, pvcreek, Pageviews, StreamError, StreamRequest,
};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

/// CLI overrides for `pvcreek stream`
pub struct StreamOptions {
    pub file: String,
    pub base_url: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub starts_with: Option<String>,
    pub contains: Option<String>,
    pub regex: Option<String>,
    pub limit: Option<u64>,
    pub format: OutputFormat,
    pub quiet: bool,
}

pub fn stream_records(config: Config, options: StreamOptions) -> Result<()> {
    let id = super::file_id(&options.file);

    let mut filter = config.filter.clone();
    if options.starts_with.is_some() {
        filter.starts_with = options.starts_with;
    }
    if options.contains.is_some() {
        filter.contains = options.contains;
    }
    if options.regex.is_some() {
        filter.regex = options.regex;
    }

    let request = StreamRequest::new(id.clone())
        .base_url(options.base_url.unwrap_or(config.source.base_url.clone()))
        .cache_dir_opt(options.cache_dir.or(config.source.cache_dir.clone()))
        .http_settings(config.source.http_settings())
        .filter(filter);

    let mut stream = pvcreek(request).with_context(|| format!("Failed to open {}", id))?;
    let mut progress = StreamProgress::new(&id.to_string(), options.quiet);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let written = match emit_records(
        &mut out,
        stream.by_ref(),
        options.format,
        options.limit,
        &mut progress,
    ) {
        Ok(written) => written,
        Err(e) => {
            progress.abandon("failed");
            return Err(e).with_context(|| format!("Error while streaming {}", id));
        }
    };
    if options.limit == Some(written) {
        info!("Reached limit of {} records", written);
    }

    match out.flush() {
        Err(e) if e.kind() != io::ErrorKind::BrokenPipe => return Err(e.into()),
        _ => {}
    }
    progress.finish(&stream.stats());
    Ok(())
}

/// Write up to `limit` records, returning how many were written. Stops
/// quietly when downstream closes the pipe (e.g. piped into `head`).
fn emit_records<I>(
    out: &mut impl Write,
    records: I,
    format: OutputFormat,
    limit: Option<u64>,
    progress: &mut StreamProgress,
) -> Result<u64>
where
    I: Iterator<Item = Result<Pageviews, StreamError>>,
{
    let max = limit.map_or(usize::MAX, |n| usize::try_from(n).unwrap_or(usize::MAX));
    let mut written = 0u64;

    for record in records.take(max) {
        let record = record?;
        if let Err(e) = write_record(out, &record, format) {
            if e.kind() == io::ErrorKind::BrokenPipe {
                break;
            }
            return Err(e.into());
        }
        written += 1;
        progress.record();
    }

    Ok(written)
}

fn write_record(out: &mut impl Write, record: &Pageviews, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Text => writeln!(
            out,
            "{} {} {} {} {} {}",
            record.domain_code,
            record.page_title,
            record.count_views,
            record.language,
            record.project,
            if record.mobile { "mobile" } else { "desktop" }
        ),
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, record)?;
            out.write_all(b"\n")
        }
    }
}
