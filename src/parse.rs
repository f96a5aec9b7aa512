//! Pageview record parsing
//!
//! Each dump line is `<domain_code> <page_title> <count_views> <total_response_size>`.
//! The domain code packs language, project and the mobile flag into one token:
//!
//! | domain code | language | project    | mobile |
//! |-------------|----------|------------|--------|
//! | `en`        | `en`     | wikipedia  | false  |
//! | `en.m`      | `en`     | wikipedia  | true   |
//! | `en.d`      | `en`     | d          | false  |
//! | `commons.m` | `commons`| wikipedia  | true   |
//!
//! See <https://wikitech.wikimedia.org/wiki/Data_Platform/Data_Lake/Traffic/Pageviews>.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Project assumed when the domain code is a bare language
pub const DEFAULT_PROJECT: &str = "wikipedia";

const MOBILE_SUFFIX: &str = ".m";

/// Abbreviated project codes and the hosts they stand for
const PROJECT_HOSTS: &[(&str, &str)] = &[
    ("wikipedia", "wikipedia.org"),
    ("b", "wikibooks.org"),
    ("d", "wiktionary.org"),
    ("f", "wikimediafoundation.org"),
    ("m", "wikimedia.org"),
    ("n", "wikinews.org"),
    ("q", "wikiquote.org"),
    ("s", "wikisource.org"),
    ("v", "wikiversity.org"),
    ("voy", "wikivoyage.org"),
    ("w", "mediawiki.org"),
    ("wd", "wikidata.org"),
    ("wikibooks", "wikibooks.org"),
    ("wiktionary", "wiktionary.org"),
    ("wikimedia", "wikimedia.org"),
    ("wikinews", "wikinews.org"),
    ("wikiquote", "wikiquote.org"),
    ("wikisource", "wikisource.org"),
    ("wikiversity", "wikiversity.org"),
    ("wikivoyage", "wikivoyage.org"),
    ("mediawiki", "mediawiki.org"),
    ("wikidata", "wikidata.org"),
];

/// A line that could not be turned into a record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed pageviews line ({reason}): {line:?}")]
pub struct ParseError {
    /// The offending line, verbatim
    pub line: String,
    pub reason: ParseErrorReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorReason {
    #[error("expected at least 3 fields, found {0}")]
    TooFewFields(usize),
    #[error("empty domain code")]
    EmptyDomainCode,
    #[error("view count {0:?} is not a non-negative integer")]
    InvalidCount(String),
}

/// Language, project and mobile flag decoded from a domain code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainCode {
    pub language: String,
    pub project: String,
    pub mobile: bool,
}

impl DomainCode {
    /// Decompose a raw domain code.
    ///
    /// A trailing `.m` marks mobile traffic and is removed first. What is left
    /// splits on the first dot into language and project; without a dot the
    /// project is [`DEFAULT_PROJECT`].
    pub fn parse(domain_code: &str) -> Self {
        let (rest, mobile) = match domain_code.strip_suffix(MOBILE_SUFFIX) {
            Some(rest) => (rest, true),
            None => (domain_code, false),
        };

        let (language, project) = match rest.split_once('.') {
            Some((language, project)) => (language, project),
            None => (rest, DEFAULT_PROJECT),
        };

        Self {
            language: language.to_string(),
            project: project.to_string(),
            mobile,
        }
    }
}

/// One parsed line of a pageviews dump
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pageviews {
    /// Raw domain code, e.g. `en.m`
    pub domain_code: String,
    /// Page title exactly as it appears in the dump
    pub page_title: String,
    pub count_views: u64,

    // Derived from `domain_code` only
    pub language: String,
    pub project: String,
    pub mobile: bool,
}

impl Pageviews {
    /// Host serving this record's project, when the project code is known
    pub fn project_host(&self) -> Option<&'static str> {
        project_host(&self.project)
    }
}

/// Look up the host for a project code (`d` and `wiktionary` both give `wiktionary.org`)
pub fn project_host(project: &str) -> Option<&'static str> {
    PROJECT_HOSTS
        .iter()
        .find(|(code, _)| *code == project)
        .map(|(_, host)| *host)
}

/// Parse a single dump line. The fourth field, when present, is ignored.
pub fn parse_line(line: &str) -> Result<Pageviews, ParseError> {
    let fail = |reason| ParseError {
        line: line.to_string(),
        reason,
    };

    let mut fields = line.splitn(4, ' ');
    let (Some(domain_code), Some(page_title), Some(count)) =
        (fields.next(), fields.next(), fields.next())
    else {
        let found = line.splitn(4, ' ').count();
        return Err(fail(ParseErrorReason::TooFewFields(found)));
    };

    if domain_code.is_empty() {
        return Err(fail(ParseErrorReason::EmptyDomainCode));
    }

    // `u64::from_str` would also take a leading `+`
    let count_views = Some(count)
        .filter(|c| !c.is_empty() && c.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|c| c.parse::<u64>().ok())
        .ok_or_else(|| fail(ParseErrorReason::InvalidCount(count.to_string())))?;

    let DomainCode {
        language,
        project,
        mobile,
    } = DomainCode::parse(domain_code);

    Ok(Pageviews {
        domain_code: domain_code.to_string(),
        page_title: page_title.to_string(),
        count_views,
        language,
        project,
        mobile,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(code: &str) -> (String, String, bool) {
        let d = DomainCode::parse(code);
        (d.language, d.project, d.mobile)
    }

    #[test]
    fn test_mobile_language_code() {
        for lang in ["en", "no", "de", "zh-min-nan", "commons"] {
            let code = format!("{}.m", lang);
            assert_eq!(triple(&code), (lang.to_string(), "wikipedia".to_string(), true));
        }
    }

    #[test]
    fn test_language_with_project() {
        for (code, lang, project) in [
            ("en.d", "en", "d"),
            ("fr.wiktionary", "fr", "wiktionary"),
            ("de.voy", "de", "voy"),
            ("en.wikipedia", "en", "wikipedia"),
        ] {
            assert_eq!(triple(code), (lang.to_string(), project.to_string(), false));
        }
    }

    #[test]
    fn test_bare_language() {
        assert_eq!(triple("en"), ("en".to_string(), "wikipedia".to_string(), false));
        assert_eq!(triple("ja"), ("ja".to_string(), "wikipedia".to_string(), false));
    }

    #[test]
    fn test_mobile_suffix_then_project() {
        // Only the trailing ".m" is the mobile marker
        assert_eq!(triple("en.d.m"), ("en".to_string(), "d".to_string(), true));
        assert_eq!(triple("en.m.m"), ("en".to_string(), "m".to_string(), true));
        // ".m" followed by more text is not a mobile suffix
        assert_eq!(triple("en.mw"), ("en".to_string(), "mw".to_string(), false));
    }

    #[test]
    fn test_decomposition_is_deterministic() {
        for code in ["en", "en.m", "commons.m", "en.wikipedia", "fr.b.m"] {
            assert_eq!(DomainCode::parse(code), DomainCode::parse(code));
        }
    }

    #[test]
    fn test_parse_full_line() {
        let pv = parse_line("no.m Forsiden 7 512").unwrap();
        assert_eq!(
            pv,
            Pageviews {
                domain_code: "no.m".to_string(),
                page_title: "Forsiden".to_string(),
                count_views: 7,
                language: "no".to_string(),
                project: "wikipedia".to_string(),
                mobile: true,
            }
        );
    }

    #[test]
    fn test_parse_without_response_size() {
        let pv = parse_line("en.d dictionary 3").unwrap();
        assert_eq!(pv.page_title, "dictionary");
        assert_eq!(pv.count_views, 3);
        assert_eq!(pv.project, "d");
    }

    #[test]
    fn test_title_carried_verbatim() {
        let pv = parse_line("en Caf%C3%A9_M\u{fc}ller 12 0").unwrap();
        assert_eq!(pv.page_title, "Caf%C3%A9_M\u{fc}ller");
    }

    #[test]
    fn test_too_few_fields() {
        let err = parse_line("bad_line_no_counts").unwrap_err();
        assert_eq!(err.reason, ParseErrorReason::TooFewFields(1));
        assert_eq!(err.line, "bad_line_no_counts");

        let err = parse_line("en Main_Page").unwrap_err();
        assert_eq!(err.reason, ParseErrorReason::TooFewFields(2));
    }

    #[test]
    fn test_invalid_count() {
        let err = parse_line("en Main_Page lots 100").unwrap_err();
        assert_eq!(err.reason, ParseErrorReason::InvalidCount("lots".to_string()));

        let err = parse_line("en Main_Page -4 100").unwrap_err();
        assert!(matches!(err.reason, ParseErrorReason::InvalidCount(_)));

        let err = parse_line("en Main_Page +5 100").unwrap_err();
        assert_eq!(err.reason, ParseErrorReason::InvalidCount("+5".to_string()));
    }

    #[test]
    fn test_empty_domain_code() {
        let err = parse_line(" Main_Page 4 100").unwrap_err();
        assert_eq!(err.reason, ParseErrorReason::EmptyDomainCode);
    }

    #[test]
    fn test_project_host() {
        assert_eq!(project_host("d"), Some("wiktionary.org"));
        assert_eq!(project_host("wikipedia"), Some("wikipedia.org"));
        assert_eq!(project_host("commons"), None);

        let pv = parse_line("en.voy Oslo 2 0").unwrap();
        assert_eq!(pv.project_host(), Some("wikivoyage.org"));
        assert_eq!(pv.project, "voy");
    }
}
