//! Version identifier validation and archive URL resolution.
//!
//! A URL template contains the `$VERSION` placeholder and optionally a
//! fragment naming the directory inside the archive to expose:
//!
//! ```text
//! https://codeload.github.com/org/repo/zip/refs/heads/$VERSION#*/doc/
//! ```
//!
//! ### Resolution steps
//! 1. Empty version → default branch
//! 2. Reject versions containing `..`, `?` or `#`
//! 3. Reject templates for multi-ref hosts unless every `$VERSION` in the URL path
//!    follows `/refs/heads/` and none appears in the query
//! 4. Substitute the version, rewrite `refs/heads/` to `refs/tags/` for `vN...` versions
//! 5. Split the fragment off as the archive directory

use url::Url;

use crate::Error;

/// Placeholder replaced by the version identifier.
pub const VERSION_PLACEHOLDER: &str = "$VERSION";

/// Directory fragment prefix standing for the archive's top-level directory.
pub const WILDCARD_DIR: &str = "*/";

const BRANCH_REFS: &str = "refs/heads/";
const TAG_REFS: &str = "refs/tags/";
const PINNED_PLACEHOLDER: &str = "refs/heads/$VERSION";

/// Substrings that must never appear in a version identifier.
const FORBIDDEN: &[&str] = &["..", "?", "#"];

/// An archive URL ready to fetch, plus the directory to expose from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrl {
    pub url: Url,
    /// Directory prefix inside the archive; empty means the whole archive.
    pub dir: String,
}

/// Substitute the default branch for an empty version identifier.
pub fn effective_version<'a>(version: &'a str, default_branch: &'a str) -> &'a str {
    if version.is_empty() { default_branch } else { version }
}

/// Reject version identifiers that could escape their URL path segment.
pub fn validate_version(version: &str) -> Result<(), Error> {
    if FORBIDDEN.iter().any(|bad| version.contains(bad)) {
        return Err(Error::InvalidVersion(format!("invalid version {version:?}")));
    }
    Ok(())
}

/// Whether a version names a release tag rather than a branch.
///
/// `v` followed by a digit is treated as a tag. Branches such as
/// `v2-experimental` are misclassified.
pub fn looks_like_tag(version: &str) -> bool {
    let mut chars = version.chars();
    chars.next() == Some('v') && chars.next().is_some_and(|c| c.is_ascii_digit())
}

/// Reject templates where a caller-controlled version could resolve to an
/// unexpected ref on a host that serves both branches and tags.
pub fn check_template(template: &str) -> Result<(), Error> {
    if template.trim().is_empty() {
        return Err(Error::InvalidUrl("empty URL template".into()));
    }
    if template.contains(VERSION_PLACEHOLDER) && is_multi_ref_host(template) && !pins_every_placeholder(template) {
        return Err(Error::InsecureTemplate(format!(
            "the URL pattern {template:?} must place every {VERSION_PLACEHOLDER:?} in a {PINNED_PLACEHOLDER:?} path segment"
        )));
    }
    Ok(())
}

/// Whether every `$VERSION` in the fetched URL sits in a `/refs/heads/$VERSION`
/// path segment. The fragment never reaches the server and is ignored; any
/// placeholder in the query is unpinned.
fn pins_every_placeholder(template: &str) -> bool {
    let base = template.split_once('#').map_or(template, |(base, _)| base);
    let (path, query) = base.split_once('?').unwrap_or((base, ""));
    if query.contains(VERSION_PLACEHOLDER) {
        return false;
    }

    let pinned_prefix = format!("/{BRANCH_REFS}");
    path.match_indices(VERSION_PLACEHOLDER).all(|(at, _)| path[..at].ends_with(&pinned_prefix))
}

/// Host detection is heuristic: a hostname containing "github". Templates
/// whose host cannot be parsed fall back to scanning the whole string.
fn is_multi_ref_host(template: &str) -> bool {
    let base = template.split_once('#').map_or(template, |(base, _)| base);
    match Url::parse(base.trim()) {
        Ok(url) => url.host_str().is_some_and(|host| host.to_lowercase().contains("github")),
        Err(_) => template.to_lowercase().contains("github"),
    }
}

/// Resolve a version identifier against a URL template.
pub fn resolve(version: &str, template: &str, default_branch: &str) -> Result<ResolvedUrl, Error> {
    let version = effective_version(version, default_branch);
    validate_version(version)?;
    check_template(template)?;

    let mut substituted = template.trim().replace(VERSION_PLACEHOLDER, version);
    if looks_like_tag(version) {
        substituted = substituted.replacen(BRANCH_REFS, TAG_REFS, 1);
    }

    let (base, dir) = match substituted.split_once('#') {
        Some((base, fragment)) => (base, fragment.to_string()),
        None => (substituted.as_str(), String::new()),
    };

    let url = parse_archive_url(base)?;
    Ok(ResolvedUrl { url, dir })
}

/// Parse an archive URL, allowing only http(s) and lowercasing the host.
fn parse_archive_url(input: &str) -> Result<Url, Error> {
    let mut parsed = Url::parse(input).map_err(|e| Error::InvalidUrl(format!("{input:?}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(Error::InvalidUrl(format!("unsupported scheme: {scheme}"))),
    }

    if let Some(host) = parsed.host_str() {
        let host = host.to_lowercase();
        parsed
            .set_host(Some(&host))
            .map_err(|e| Error::InvalidUrl(e.to_string()))?;
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GITHUB: &str = "https://codeload.github.com/org/repo/zip/refs/heads/$VERSION#*/doc/";

    #[test]
    fn test_resolve_basic() {
        let resolved = resolve("main", GITHUB, "master").unwrap();
        assert_eq!(resolved.url.as_str(), "https://codeload.github.com/org/repo/zip/refs/heads/main");
        assert_eq!(resolved.dir, "*/doc/");
    }

    #[test]
    fn test_resolve_empty_uses_default_branch() {
        let from_empty = resolve("", GITHUB, "master").unwrap();
        let explicit = resolve("master", GITHUB, "master").unwrap();
        assert_eq!(from_empty, explicit);
    }

    #[test]
    fn test_resolve_rejects_forbidden_substrings() {
        for bad in ["../x", "a?b", "a#b", "..", "v1/../../etc"] {
            let result = resolve(bad, GITHUB, "master");
            assert!(matches!(result, Err(Error::InvalidVersion(_))), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_resolve_rejects_invalid_default_branch() {
        let result = resolve("", GITHUB, "a?b");
        assert!(matches!(result, Err(Error::InvalidVersion(_))));
    }

    #[test]
    fn test_resolve_tag_rewrite() {
        let resolved = resolve("v2.1", GITHUB, "master").unwrap();
        assert!(resolved.url.as_str().contains("refs/tags/v2.1"));
        assert!(!resolved.url.as_str().contains("refs/heads/"));
    }

    #[test]
    fn test_resolve_tag_rewrite_first_occurrence_only() {
        let template = "https://example.com/refs/heads/$VERSION/refs/heads/x.zip";
        let resolved = resolve("v10", template, "main").unwrap();
        assert_eq!(resolved.url.as_str(), "https://example.com/refs/tags/v10/refs/heads/x.zip");
    }

    #[test]
    fn test_resolve_branch_not_rewritten() {
        let resolved = resolve("version-two", GITHUB, "master").unwrap();
        assert!(resolved.url.as_str().contains("refs/heads/version-two"));
    }

    #[test]
    fn test_looks_like_tag() {
        assert!(looks_like_tag("v2"));
        assert!(looks_like_tag("v10.3"));
        assert!(looks_like_tag("v2-experimental"));
        assert!(!looks_like_tag("v"));
        assert!(!looks_like_tag("vx"));
        assert!(!looks_like_tag("main"));
        assert!(!looks_like_tag("2.0"));
    }

    #[test]
    fn test_check_template_insecure_github() {
        let result = check_template("https://codeload.github.com/org/repo/zip/$VERSION#doc/");
        assert!(matches!(result, Err(Error::InsecureTemplate(_))));
    }

    #[test]
    fn test_check_template_secure_github() {
        assert!(check_template(GITHUB).is_ok());
    }

    #[test]
    fn test_check_template_pinned_only_in_fragment() {
        let result = check_template("https://codeload.github.com/o/r/zip/$VERSION#refs/heads/$VERSION");
        assert!(matches!(result, Err(Error::InsecureTemplate(_))));
    }

    #[test]
    fn test_check_template_placeholder_in_query() {
        let result = check_template("https://codeload.github.com/o/r/zip/refs/heads/$VERSION?ref=$VERSION");
        assert!(matches!(result, Err(Error::InsecureTemplate(_))));
    }

    #[test]
    fn test_check_template_one_copy_unpinned() {
        let result = check_template("https://codeload.github.com/o/r/zip/refs/heads/$VERSION/$VERSION.zip");
        assert!(matches!(result, Err(Error::InsecureTemplate(_))));
    }

    #[test]
    fn test_check_template_pinned_must_be_whole_segment() {
        let result = check_template("https://codeload.github.com/o/r/zip/xrefs/heads/$VERSION");
        assert!(matches!(result, Err(Error::InsecureTemplate(_))));
    }

    #[test]
    fn test_check_template_placeholder_only_in_fragment_allowed() {
        assert!(check_template("https://codeload.github.com/o/r/zip/refs/heads/main#*/$VERSION/").is_ok());
    }

    #[test]
    fn test_resolve_rejects_fragment_pinned_template() {
        let result = resolve("main", "https://codeload.github.com/o/r/zip/$VERSION#refs/heads/$VERSION", "main");
        assert!(matches!(result, Err(Error::InsecureTemplate(_))));
    }

    #[test]
    fn test_check_template_other_host_allowed() {
        assert!(check_template("https://docs.example.com/archive/$VERSION.zip#docs/").is_ok());
    }

    #[test]
    fn test_check_template_without_placeholder_allowed() {
        assert!(check_template("https://github.com/org/repo/archive/main.zip").is_ok());
    }

    #[test]
    fn test_check_template_empty() {
        assert!(matches!(check_template("  "), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_resolve_insecure_template_rejected() {
        let result = resolve("main", "https://github.com/org/repo/archive/$VERSION.zip", "main");
        assert!(matches!(result, Err(Error::InsecureTemplate(_))));
    }

    #[test]
    fn test_resolve_no_fragment_means_whole_archive() {
        let resolved = resolve("main", "https://example.com/$VERSION.zip", "main").unwrap();
        assert_eq!(resolved.dir, "");
        assert_eq!(resolved.url.fragment(), None);
    }

    #[test]
    fn test_resolve_lowercases_host() {
        let resolved = resolve("main", "https://EXAMPLE.com/$VERSION.zip", "main").unwrap();
        assert_eq!(resolved.url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_resolve_unsupported_scheme() {
        let result = resolve("main", "file:///srv/$VERSION.zip", "main");
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_resolve_unparseable_url() {
        let result = resolve("main", "not a url $VERSION", "main");
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }
}
