//! Wildcard path resolution.
//!
//! A pattern such as `sdmc:/switch/*/config/*.ini` is split into a volume
//! prefix (`sdmc:/`) and `/`-separated segments. The tree is walked one
//! segment at a time; at each level every directory entry name is matched
//! against the segment with shell-glob semantics (`*`, `?`, `[...]`, no
//! escape character). Intermediate matches must be directories. A pattern
//! ending in `/` only yields directories.
//!
//! Directory results always carry a trailing `/`, so they can be passed
//! straight to the directory forms of the transfer operations.
//!
//! Results follow directory-enumeration order; sort them when determinism
//! matters.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use tracing::{debug, instrument};

use crate::paths::split_volume;
use crate::walk::{EntryKind, Worklist, read_entries};

/// Resolves `pattern` to the existing paths it matches.
///
/// Never fails: an unreadable root or an empty match set both yield an empty
/// vector.
#[must_use]
#[instrument(level = "debug")]
pub fn resolve(pattern: &str) -> Vec<PathBuf> {
    resolve_limited(pattern, 0)
}

/// Like [`resolve`], but stops after `max_results` matches (`0` = unlimited).
#[must_use]
pub fn resolve_limited(pattern: &str, max_results: usize) -> Vec<PathBuf> {
    let mut results = Vec::new();
    if pattern.is_empty() {
        return results;
    }

    let directory_only = pattern.ends_with('/');
    let (volume, rest) = split_volume(pattern);
    let segments: Vec<SegmentMatcher> = rest
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(SegmentMatcher::new)
        .collect();
    if segments.is_empty() {
        return results;
    }

    let mut pending = Worklist::depth_first((volume.to_string(), 0_usize));
    while let Some((current, index)) = pending.pop() {
        let Some(segment) = segments.get(index) else {
            continue;
        };
        let is_last = index + 1 == segments.len();
        let dir = if current.is_empty() { "." } else { current.as_str() };

        let Ok(entries) = read_entries(Path::new(dir)) else {
            debug!(dir, "cannot open directory while resolving pattern");
            continue;
        };

        let mut descend = Vec::new();
        for entry in entries {
            let Some(name) = entry.name.to_str() else {
                debug!(path = %entry.path.display(), "skipping non UTF-8 entry name");
                continue;
            };
            if !segment.is_match(name) {
                continue;
            }

            // Links to directories count as directories (stat semantics).
            let is_dir = match entry.kind {
                EntryKind::Dir => true,
                EntryKind::Other => entry.path.is_dir(),
                EntryKind::File => false,
            };
            let mut full = join(&current, name);
            if is_last {
                if directory_only && !is_dir {
                    continue;
                }
                if is_dir {
                    full.push('/');
                }
                results.push(PathBuf::from(full));
                if max_results > 0 && results.len() >= max_results {
                    return results;
                }
            } else if is_dir {
                descend.push((full, index + 1));
            }
        }
        // Reversed so the LIFO pops siblings in enumeration order.
        for child in descend.into_iter().rev() {
            pending.push(child);
        }
    }

    debug!(pattern, matches = results.len(), "resolved pattern");
    results
}

fn join(base: &str, name: &str) -> String {
    if base.is_empty() || base.ends_with('/') {
        format!("{base}{name}")
    } else {
        format!("{base}/{name}")
    }
}

/// Glob matcher for a single path segment.
enum SegmentMatcher {
    Glob(GlobMatcher),
    /// Segments that do not compile as globs are compared literally.
    Literal(String),
}

impl SegmentMatcher {
    fn new(segment: &str) -> Self {
        GlobBuilder::new(&literal_braces(segment))
            .literal_separator(true)
            .backslash_escape(false)
            .build()
            .map_or_else(
                |_| Self::Literal(segment.to_string()),
                |glob| Self::Glob(glob.compile_matcher()),
            )
    }

    fn is_match(&self, name: &str) -> bool {
        match self {
            Self::Glob(matcher) => matcher.is_match(name),
            Self::Literal(literal) => literal == name,
        }
    }
}

/// Rewrites `{` and `}` outside character classes as `[{]` and `[}]`, and an
/// unclosed `[` as `[[]`.
///
/// Braces carry no meaning in shell globs, but `globset` reads them as
/// alternation.
fn literal_braces(segment: &str) -> String {
    let chars: Vec<char> = segment.chars().collect();
    let mut out = String::with_capacity(segment.len());
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '[' => {
                // A `]` right after `[`, `[!` or `[^` is a member, not the end.
                let mut j = i + 1;
                if matches!(chars.get(j), Some('!' | '^')) {
                    j += 1;
                }
                if chars.get(j) == Some(&']') {
                    j += 1;
                }
                while j < chars.len() && chars[j] != ']' {
                    j += 1;
                }
                if j < chars.len() {
                    out.extend(&chars[i..=j]);
                    i = j + 1;
                } else {
                    out.push_str("[[]");
                    i += 1;
                }
            }
            '{' => {
                out.push_str("[{]");
                i += 1;
            }
            '}' => {
                out.push_str("[}]");
                i += 1;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("mods/alpha/romfs")).unwrap();
        fs::create_dir_all(root.join("mods/beta/romfs")).unwrap();
        fs::create_dir_all(root.join("mods/gamma")).unwrap();
        fs::write(root.join("mods/alpha/romfs/a.bin"), b"a").unwrap();
        fs::write(root.join("mods/beta/romfs/b.bin"), b"bb").unwrap();
        fs::write(root.join("mods/beta/readme.txt"), b"r").unwrap();
        fs::write(root.join("mods/notes.txt"), b"n").unwrap();
        dir
    }

    fn sorted(mut paths: Vec<PathBuf>) -> Vec<String> {
        paths.sort();
        paths
            .into_iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_resolve_star_matches_files_and_dirs() {
        let dir = fixture();
        let root = dir.path().display().to_string();
        let found = sorted(resolve(&format!("{root}/mods/*")));
        assert_eq!(
            found,
            vec![
                format!("{root}/mods/alpha/"),
                format!("{root}/mods/beta/"),
                format!("{root}/mods/gamma/"),
                format!("{root}/mods/notes.txt"),
            ]
        );
    }

    #[test]
    fn test_resolve_trailing_separator_only_dirs() {
        let dir = fixture();
        let root = dir.path().display().to_string();
        let found = resolve(&format!("{root}/mods/*/"));
        assert_eq!(found.len(), 3);
        assert!(found.iter().all(|p| p.is_dir()));
        assert!(found.iter().all(|p| p.to_string_lossy().ends_with('/')));
    }

    #[test]
    fn test_resolve_nested_wildcards() {
        let dir = fixture();
        let root = dir.path().display().to_string();
        let found = sorted(resolve(&format!("{root}/mods/*/romfs/*.bin")));
        assert_eq!(
            found,
            vec![
                format!("{root}/mods/alpha/romfs/a.bin"),
                format!("{root}/mods/beta/romfs/b.bin"),
            ]
        );
    }

    #[test]
    fn test_resolve_question_mark_and_class() {
        let dir = fixture();
        let root = dir.path().display().to_string();
        let found = sorted(resolve(&format!("{root}/mods/[ab]???/")));
        assert_eq!(found, vec![format!("{root}/mods/beta/")]);
        let found = sorted(resolve(&format!("{root}/mods/[!ab]*/")));
        assert_eq!(found, vec![format!("{root}/mods/gamma/")]);
    }

    #[test]
    fn test_resolve_literal_segments_act_as_exact_match() {
        let dir = fixture();
        let root = dir.path().display().to_string();
        let found = resolve(&format!("{root}/mods/notes.txt"));
        assert_eq!(found, vec![PathBuf::from(format!("{root}/mods/notes.txt"))]);
    }

    #[test]
    fn test_resolve_missing_root_is_empty() {
        let dir = fixture();
        let root = dir.path().display().to_string();
        assert!(resolve(&format!("{root}/nope/*")).is_empty());
        assert!(resolve("").is_empty());
    }

    #[test]
    fn test_resolve_intermediate_matches_must_be_dirs() {
        let dir = fixture();
        let root = dir.path().display().to_string();
        // notes.txt matches `*` but is a file, so nothing beneath it is searched.
        let found = resolve(&format!("{root}/mods/*/readme.txt"));
        assert_eq!(
            found,
            vec![PathBuf::from(format!("{root}/mods/beta/readme.txt"))]
        );
    }

    #[test]
    fn test_resolve_limited_stops_early() {
        let dir = fixture();
        let root = dir.path().display().to_string();
        assert_eq!(resolve_limited(&format!("{root}/mods/*"), 2).len(), 2);
    }

    #[test]
    fn test_resolve_braces_are_literal() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().display().to_string();
        fs::write(dir.path().join("file{1}.txt"), b"x").unwrap();
        fs::write(dir.path().join("file1.txt"), b"x").unwrap();
        fs::write(dir.path().join("a{b.txt"), b"x").unwrap();

        assert_eq!(
            resolve(&format!("{root}/file{{1}}.txt")),
            vec![PathBuf::from(format!("{root}/file{{1}}.txt"))]
        );
        assert_eq!(
            resolve(&format!("{root}/a{{*.txt")),
            vec![PathBuf::from(format!("{root}/a{{b.txt"))]
        );
        assert!(resolve(&format!("{root}/file{{1,2}}.txt")).is_empty());
    }

    #[test]
    fn test_literal_braces_leaves_classes_alone() {
        assert_eq!(literal_braces("a{b}"), "a[{]b[}]");
        assert_eq!(literal_braces("[{}]x"), "[{}]x");
        assert_eq!(literal_braces("[]{]*"), "[]{]*");
        assert_eq!(literal_braces("[!{]{"), "[!{][{]");
        assert_eq!(literal_braces("open[{"), "open[[][{]");
    }

    #[test]
    fn test_resolve_follows_enumeration_order_across_levels() {
        let dir = fixture();
        let root = dir.path().display().to_string();
        let mut expected = Vec::new();
        for entry in fs::read_dir(dir.path().join("mods")).unwrap() {
            let entry = entry.unwrap();
            let leaf = entry.path().join("romfs");
            if !leaf.is_dir() {
                continue;
            }
            for file in fs::read_dir(&leaf).unwrap() {
                let name = file.unwrap().file_name().to_string_lossy().into_owned();
                let owner = entry.file_name().to_string_lossy().into_owned();
                expected.push(PathBuf::from(format!("{root}/mods/{owner}/romfs/{name}")));
            }
        }

        assert_eq!(resolve(&format!("{root}/mods/*/romfs/*")), expected);
    }
}
