//! Wildcard expansion against a node store
//!
//! Patterns are matched one path component at a time. Each component with
//! metacharacters is matched against a fresh listing of every candidate
//! container; literal components are appended as-is and checked at the end.
//! As with shell globbing, `*` and `?` do not match a leading `.`.

use globset::{GlobBuilder, GlobMatcher};
use tracing::debug;
use vocp_types::paths::{self, SEPARATOR};
use vocp_types::{Error, NodeClient, Result};

/// Whether a pattern contains glob metacharacters
pub fn has_magic(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

fn compile(component: &str) -> Result<GlobMatcher> {
    GlobBuilder::new(component)
        .literal_separator(true)
        .backslash_escape(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|e| Error::InvalidArgument {
            message: format!("bad pattern '{}': {}", component, e),
        })
}

/// Split a pattern into its fixed root (scheme, leading `/` or `//authority`)
/// and the remaining components
fn split_root(pattern: &str) -> (String, &str) {
    let (prefix, rest) = match paths::split_scheme(pattern) {
        Some((scheme, rest)) => (format!("{scheme}:"), rest),
        None => (String::new(), pattern),
    };

    if let Some(stripped) = rest.strip_prefix("//") {
        let end = stripped.find(SEPARATOR).unwrap_or(stripped.len());
        let authority = &stripped[..end];
        let body = stripped[end..].trim_start_matches(SEPARATOR);
        return (format!("{prefix}//{authority}/"), body);
    }
    if let Some(body) = rest.strip_prefix(SEPARATOR) {
        return (format!("{prefix}{SEPARATOR}"), body);
    }
    (prefix, rest)
}

/// Expand `pattern` into the sorted list of matching node paths.
///
/// A pattern without metacharacters is returned unchanged, whether or not the
/// node exists. Unmatched patterns expand to an empty list.
pub async fn expand<C: NodeClient + ?Sized>(client: &C, pattern: &str) -> Result<Vec<String>> {
    if !has_magic(pattern) {
        return Ok(vec![pattern.to_string()]);
    }

    let (root, body) = split_root(pattern);
    let mut candidates = vec![root];
    let mut pending_literal = false;

    for component in body.split(SEPARATOR).filter(|c| !c.is_empty()) {
        if !has_magic(component) {
            candidates = candidates
                .iter()
                .map(|base| paths::join(base, component))
                .collect();
            pending_literal = true;
            continue;
        }

        let matcher = compile(component)?;
        let allow_hidden = component.starts_with('.');
        let mut next = Vec::new();
        for base in &candidates {
            let listing_path = if base.is_empty() { "." } else { base.as_str() };
            let names = match client.list_dir(listing_path, true).await {
                Ok(names) => names,
                Err(e) => {
                    debug!("glob: cannot list {}: {}", listing_path, e);
                    continue;
                }
            };
            next.extend(
                names
                    .iter()
                    .filter(|name| allow_hidden || !name.starts_with('.'))
                    .filter(|name| matcher.is_match(name.as_str()))
                    .map(|name| paths::join(base, name)),
            );
        }
        candidates = next;
        pending_literal = false;
    }

    if pending_literal {
        let mut existing = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if client.get_node(&candidate).await.is_ok() {
                existing.push(candidate);
            }
        }
        candidates = existing;
    }

    candidates.sort();
    candidates.dedup();
    debug!("glob {} matched {} nodes", pattern, candidates.len());
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryNodeStore;
    use rstest::rstest;

    fn store() -> MemoryNodeStore {
        let store = MemoryNodeStore::new();
        store.add_dir("vos:data").unwrap();
        store.add_dir("vos:data/run1").unwrap();
        store.add_dir("vos:data/run2").unwrap();
        store.add_file("vos:data/run1/img.fits", b"1").unwrap();
        store.add_file("vos:data/run2/img.fits", b"2").unwrap();
        store.add_file("vos:data/run2/cat.txt", b"3").unwrap();
        store.add_file("vos:data/a.fits", b"4").unwrap();
        store.add_file("vos:data/b.fits", b"5").unwrap();
        store.add_file("vos:data/.hidden.fits", b"6").unwrap();
        store
    }

    #[rstest]
    #[case("vos:data/*.fits", &["vos:data/a.fits", "vos:data/b.fits"])]
    #[case("vos:data/?.fits", &["vos:data/a.fits", "vos:data/b.fits"])]
    #[case("vos:data/[a].fits", &["vos:data/a.fits"])]
    #[case("vos:data/.*.fits", &["vos:data/.hidden.fits"])]
    #[case("vos:data/run*/img.fits", &["vos:data/run1/img.fits", "vos:data/run2/img.fits"])]
    #[case("vos:data/run*/cat.txt", &["vos:data/run2/cat.txt"])]
    #[case("vos:data/*/*", &[
        "vos:data/run1/img.fits",
        "vos:data/run2/cat.txt",
        "vos:data/run2/img.fits",
    ])]
    #[case("vos:da*", &["vos:data"])]
    #[case("vos:data/*.none", &[])]
    #[case("vos:missing/*", &[])]
    #[tokio::test]
    async fn test_expand(#[case] pattern: &str, #[case] expected: &[&str]) {
        let store = store();
        let matches = expand(&store, pattern).await.unwrap();
        assert_eq!(matches, expected);
    }

    #[tokio::test]
    async fn test_literal_returned_unchanged() {
        let store = store();
        assert_eq!(
            expand(&store, "vos:does/not/exist").await.unwrap(),
            vec!["vos:does/not/exist"]
        );
    }

    #[rstest]
    #[case("vos:data/*", "vos:", "data/*")]
    #[case("vos:/data/*", "vos:/", "data/*")]
    #[case("vos://host~vault/data/*", "vos://host~vault/", "data/*")]
    #[case("/tmp/*", "/", "tmp/*")]
    fn test_split_root(#[case] pattern: &str, #[case] root: &str, #[case] body: &str) {
        assert_eq!(split_root(pattern), (root.to_string(), body));
    }
}
