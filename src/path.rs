//! Path normalization.
//!
//! Operator paths are slash separated and relative to the backend root.
//! A trailing `/` marks a directory; the root itself is `/`.

/// Normalize a caller-supplied path.
///
/// - empty and `.` segments are dropped
/// - `..` removes the previous segment, never climbing above the root
/// - the leading `/` is removed and a trailing `/` is kept
/// - an empty result is the root, `/`
///
/// Normalization is idempotent.
///
/// ```rust
/// use anystore::normalize_path;
///
/// assert_eq!(normalize_path("/a//b/./c/"), "a/b/c/");
/// assert_eq!(normalize_path("a/../../b"), "b");
/// assert_eq!(normalize_path(""), "/");
/// ```
pub fn normalize_path(path: &str) -> String {
    let is_dir = path.ends_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    let mut out = segments.join("/");
    // A trailing `.` or `..` always names a directory.
    if is_dir || path.ends_with("/..") || path.ends_with("/.") {
        out.push('/');
    }
    out
}

/// Normalize a backend root: absolute, always ending in `/`.
///
/// ```rust
/// use anystore::normalize_root;
///
/// assert_eq!(normalize_root("data/store"), "/data/store/");
/// assert_eq!(normalize_root(""), "/");
/// ```
pub fn normalize_root(root: &str) -> String {
    let normalized = normalize_path(root);
    if normalized == "/" {
        return normalized;
    }
    let mut out = String::with_capacity(normalized.len() + 2);
    out.push('/');
    out.push_str(normalized.trim_end_matches('/'));
    out.push('/');
    out
}

/// Returns `true` if the normalized path denotes a directory.
#[inline]
pub fn is_dir_path(path: &str) -> bool {
    path.ends_with('/')
}

/// Parent directory of a normalized path, or `/` for top-level entries.
///
/// ```rust
/// use anystore::get_parent;
///
/// assert_eq!(get_parent("a/b/c"), "a/b/");
/// assert_eq!(get_parent("a/b/"), "a/");
/// assert_eq!(get_parent("a"), "/");
/// ```
pub fn get_parent(path: &str) -> &str {
    if path == "/" {
        return "/";
    }
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &path[..=idx],
        None => "/",
    }
}

/// Last segment of a normalized path, keeping a directory's trailing `/`.
///
/// ```rust
/// use anystore::get_basename;
///
/// assert_eq!(get_basename("a/b/c"), "c");
/// assert_eq!(get_basename("a/b/"), "b/");
/// ```
pub fn get_basename(path: &str) -> &str {
    if path == "/" {
        return "/";
    }
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn normalize_basic_cases() {
        let cases = [
            ("", "/"),
            ("/", "/"),
            ("//", "/"),
            ("a", "a"),
            ("/a", "a"),
            ("a/", "a/"),
            ("/a/b/c", "a/b/c"),
            ("a//b///c/", "a/b/c/"),
            ("./a/./b", "a/b"),
            ("a/b/..", "a/"),
            ("a/..", "/"),
            ("../../a", "a"),
            ("a/b/.", "a/b/"),
            ("my file/x", "my file/x"),
        ];
        for (input, expected) in cases {
            assert_eq!(normalize_path(input), expected, "input: {input:?}");
        }
    }

    #[test]
    fn normalize_root_cases() {
        assert_eq!(normalize_root("/"), "/");
        assert_eq!(normalize_root("/tmp/data"), "/tmp/data/");
        assert_eq!(normalize_root("tmp/data/"), "/tmp/data/");
    }

    #[test]
    fn parent_and_basename() {
        assert_eq!(get_parent("/"), "/");
        assert_eq!(get_parent("a/"), "/");
        assert_eq!(get_basename("a/"), "a/");
        assert_eq!(get_basename("x"), "x");
    }

    #[test]
    fn dir_path_detection() {
        assert!(is_dir_path("/"));
        assert!(is_dir_path("a/"));
        assert!(!is_dir_path("a"));
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(path in "[ a-c./]{0,24}") {
            let once = normalize_path(&path);
            prop_assert_eq!(normalize_path(&once), once.clone());
        }

        #[test]
        fn normalized_paths_have_no_leading_slash(path in "[a-c./]{0,24}") {
            let normalized = normalize_path(&path);
            prop_assert!(normalized == "/" || !normalized.starts_with('/'));
            prop_assert!(!normalized.contains("//"));
        }
    }
}
