//! Path string helpers shared by both backends
//!
//! Remote paths are URIs such as `vos:project/data/img.fits` and cannot be
//! handled by [`std::path::Path`], so the engine works on `&str` and uses these
//! helpers for the handful of manipulations it needs.

/// Separator used when building child paths
pub const SEPARATOR: char = '/';

fn is_separator(c: char) -> bool {
    c == SEPARATOR || c == std::path::MAIN_SEPARATOR
}

/// Split `scheme:rest`, if the path starts with a URI scheme.
///
/// Single letters are not treated as schemes so that `C:\data` stays local.
pub fn split_scheme(path: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = path.split_once(':')?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if scheme.len() < 2
        || !first.is_ascii_alphabetic()
        || !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    {
        return None;
    }
    Some((scheme, rest))
}

/// URI scheme of a path, if any
pub fn scheme(path: &str) -> Option<&str> {
    split_scheme(path).map(|(scheme, _)| scheme)
}

/// Whether the path names a directory explicitly
pub fn has_trailing_separator(path: &str) -> bool {
    path.ends_with(is_separator)
}

/// Append a child name to a path
pub fn join(base: &str, name: &str) -> String {
    if base.is_empty() {
        return name.to_string();
    }
    if has_trailing_separator(base) || base.ends_with(':') {
        format!("{base}{name}")
    } else {
        format!("{base}{SEPARATOR}{name}")
    }
}

/// Last component of a path, ignoring trailing separators and any scheme
pub fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches(is_separator);
    let last = trimmed.rsplit(is_separator).next().unwrap_or(trimmed);
    match split_scheme(last) {
        Some((_, rest)) if last.len() == trimmed.len() => rest,
        _ => last,
    }
}

/// Lexically normalise a path: drop `.` and empty components, fold `..`.
///
/// The scheme prefix and a leading `/` or `//authority` are preserved.
pub fn normalize(path: &str) -> String {
    let (prefix, rest) = match split_scheme(path) {
        Some((scheme, rest)) => (format!("{scheme}:"), rest),
        None => (String::new(), path),
    };

    let (root, body) = if let Some(stripped) = rest.strip_prefix("//") {
        let end = stripped.find(SEPARATOR).unwrap_or(stripped.len());
        (format!("//{}", &stripped[..end]), &stripped[end..])
    } else if rest.starts_with(is_separator) {
        (SEPARATOR.to_string(), rest)
    } else {
        (String::new(), rest)
    };
    let absolute = !root.is_empty();

    let mut parts: Vec<&str> = Vec::new();
    for part in body.split(is_separator) {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join(&SEPARATOR.to_string());
    let root = if root.starts_with("//") && !joined.is_empty() {
        format!("{root}{SEPARATOR}")
    } else {
        root
    };
    if root.is_empty() && joined.is_empty() && prefix.is_empty() {
        return ".".to_string();
    }
    format!("{prefix}{root}{joined}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("vos:data/a.fits", Some("vos"))]
    #[case("vos://cadc.nrc.ca~vault/data", Some("vos"))]
    #[case("C:\\data", None)]
    #[case("/tmp/file", None)]
    #[case("relative/file", None)]
    #[case("1abc:x", None)]
    fn test_scheme(#[case] path: &str, #[case] expected: Option<&str>) {
        assert_eq!(scheme(path), expected);
    }

    #[rstest]
    #[case("vos:img.fits", "img.fits")]
    #[case("vos:outDir/img.fits", "img.fits")]
    #[case("vos:dir/", "dir")]
    #[case("/tmp/localDir", "localDir")]
    #[case("/tmp/localDir/", "localDir")]
    #[case("vos:image.fits[1:10,1:10]", "image.fits[1:10,1:10]")]
    #[case("plain", "plain")]
    fn test_basename(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(basename(path), expected);
    }

    #[rstest]
    #[case("vos:outDir", "img.fits", "vos:outDir/img.fits")]
    #[case("vos:outDir/", "img.fits", "vos:outDir/img.fits")]
    #[case("vos:", "img.fits", "vos:img.fits")]
    #[case("/tmp", "a", "/tmp/a")]
    fn test_join(#[case] base: &str, #[case] name: &str, #[case] expected: &str) {
        assert_eq!(join(base, name), expected);
    }

    #[rstest]
    #[case("vos:target//./sub/../a", "vos:target/a")]
    #[case("/tmp/x/../y/", "/tmp/y")]
    #[case("/../a", "/a")]
    #[case("a/../../b", "../b")]
    #[case("vos://host~vault/d/./e", "vos://host~vault/d/e")]
    #[case("./", ".")]
    fn test_normalize(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(normalize(path), expected);
    }

    #[test]
    fn test_trailing_separator() {
        assert!(has_trailing_separator("vos:target/"));
        assert!(!has_trailing_separator("vos:target"));
    }

    proptest! {
        #[test]
        fn test_normalize_is_idempotent(
            path in "(vos:)?/?([a-z]{1,3}|\\.|\\.\\.)(/([a-z]{1,3}|\\.|\\.\\.)){0,4}/?"
        ) {
            let once = normalize(&path);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn test_join_then_basename(
            base in "(vos:)?[a-z]{0,3}(/[a-z]{1,3}){0,3}/?",
            name in "[a-z][a-z.]{0,8}"
        ) {
            let joined = join(&base, &name);
            prop_assert_eq!(basename(&joined), name.as_str());
        }
    }
}
