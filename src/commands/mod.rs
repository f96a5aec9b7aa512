pub mod download;
pub mod filename;
pub mod stream;

use std::path::Path;

/// Treat arguments that point at an existing file (or end in `.gz` with a
/// directory component) as local dumps rather than remote names.
pub fn file_id(input: &str) -> pvcreek::FileId {
    let path = Path::new(input);
    let has_dir = path.parent().is_some_and(|p| !p.as_os_str().is_empty());
    if path.is_file() || (has_dir && input.ends_with(".gz")) {
        pvcreek::FileId::Local(path.to_path_buf())
    } else {
        pvcreek::FileId::parse(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pvcreek::FileId;

    #[test]
    fn test_file_id_classification() {
        assert!(matches!(file_id("dumps/pageviews-20240105-070000.gz"), FileId::Local(_)));
        assert!(matches!(file_id("pageviews-20240105-070000.gz"), FileId::Name(_)));
        assert!(matches!(file_id("2024-01-05T07"), FileId::Timestamp(_)));
    }
}
