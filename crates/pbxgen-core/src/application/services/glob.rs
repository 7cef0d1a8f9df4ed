//! Shell-style pattern matching for source discovery.
//!
//! Two consumers with deliberately different rules:
//!
//! - [`GlobWalker`] expands include patterns against the filesystem. Whether
//!   `**` recurses, and what a trailing `**/` yields, is selected by a
//!   [`GlobBehavior`] preset.
//! - [`ExcludeFilter`] tests walked paths against exclude patterns. `**` is
//!   never recursive here; it degrades to `*`.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::{
    application::{ApplicationError, ports::Filesystem},
    domain::GlobBehavior,
    error::PbxResult,
};

/// Directory names never descended while expanding `**`.
pub const BLACKLISTED_DIRECTORIES: &[&str] = &["node_modules", "Pods"];

// ── Pattern ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Char(char),
    AnyChar,
    AnySequence,
    Class { negated: bool, ranges: Vec<(char, char)> },
}

impl Token {
    fn matches(&self, c: char) -> bool {
        match self {
            Self::Char(expected) => *expected == c,
            Self::AnyChar => c != '/',
            Self::AnySequence => false,
            Self::Class { negated, ranges } => {
                let hit = ranges.iter().any(|(lo, hi)| (*lo..=*hi).contains(&c));
                hit != *negated && c != '/'
            }
        }
    }
}

/// A compiled pattern supporting `*`, `?`, `[...]`, `[!...]` and `\` escapes.
///
/// Wildcards never match `/`. An unterminated `[` is a literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    tokens: Vec<Token>,
}

impl Pattern {
    pub fn new(pattern: &str) -> Self {
        let chars: Vec<char> = pattern.chars().collect();
        let mut tokens = Vec::with_capacity(chars.len());
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '*' => {
                    if tokens.last() != Some(&Token::AnySequence) {
                        tokens.push(Token::AnySequence);
                    }
                    i += 1;
                }
                '?' => {
                    tokens.push(Token::AnyChar);
                    i += 1;
                }
                '\\' if i + 1 < chars.len() => {
                    tokens.push(Token::Char(chars[i + 1]));
                    i += 2;
                }
                '[' => match parse_class(&chars[i + 1..]) {
                    Some((token, consumed)) => {
                        tokens.push(token);
                        i += consumed + 1;
                    }
                    None => {
                        tokens.push(Token::Char('['));
                        i += 1;
                    }
                },
                c => {
                    tokens.push(Token::Char(c));
                    i += 1;
                }
            }
        }

        Self {
            source: pattern.to_string(),
            tokens,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the pattern has no wildcards.
    pub fn is_literal(&self) -> bool {
        self.tokens.iter().all(|t| matches!(t, Token::Char(_)))
    }

    pub fn matches(&self, text: &str) -> bool {
        let chars: Vec<char> = text.chars().collect();
        match_tokens(&self.tokens, &chars)
    }
}

/// Parse the body of a bracket class. Returns the token and the number of
/// characters consumed including the closing `]`.
fn parse_class(chars: &[char]) -> Option<(Token, usize)> {
    let mut i = 0;
    let negated = matches!(chars.first(), Some('!') | Some('^'));
    if negated {
        i += 1;
    }

    let mut ranges = Vec::new();
    let mut first = true;
    while i < chars.len() {
        let c = chars[i];
        if c == ']' && !first {
            return Some((Token::Class { negated, ranges }, i + 1));
        }
        first = false;
        if i + 2 < chars.len() && chars[i + 1] == '-' && chars[i + 2] != ']' {
            ranges.push((c, chars[i + 2]));
            i += 3;
        } else {
            ranges.push((c, c));
            i += 1;
        }
    }
    None
}

fn match_tokens(tokens: &[Token], text: &[char]) -> bool {
    match tokens.split_first() {
        None => text.is_empty(),
        Some((Token::AnySequence, rest)) => (0..=text.len())
            .take_while(|&i| i == 0 || text[i - 1] != '/')
            .any(|i| match_tokens(rest, &text[i..])),
        Some((token, rest)) => match text.split_first() {
            Some((c, tail)) if token.matches(*c) => match_tokens(rest, tail),
            _ => false,
        },
    }
}

/// Expand `{a,b}` alternations. Braces without a top-level comma stay literal.
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let chars: Vec<char> = pattern.chars().collect();

    let mut depth = 0usize;
    let mut open = None;
    let mut commas = Vec::new();
    for (i, &c) in chars.iter().enumerate() {
        match c {
            '{' => {
                if depth == 0 {
                    open = Some(i);
                    commas.clear();
                }
                depth += 1;
            }
            ',' if depth == 1 => commas.push(i),
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(start) = open.filter(|_| !commas.is_empty()) {
                        let prefix: String = chars[..start].iter().collect();
                        let suffix: String = chars[i + 1..].iter().collect();
                        let mut bounds = vec![start];
                        bounds.extend(&commas);
                        bounds.push(i);
                        return bounds
                            .windows(2)
                            .flat_map(|w| {
                                let alt: String = chars[w[0] + 1..w[1]].iter().collect();
                                expand_braces(&format!("{prefix}{alt}{suffix}"))
                            })
                            .collect();
                    }
                    open = None;
                }
            }
            _ => {}
        }
    }

    vec![pattern.to_string()]
}

// ── Excludes ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct ExcludeRule {
    pattern: Pattern,
    /// Pattern contains `/` and is matched against the root-relative path.
    anchored: bool,
    directories_only: bool,
}

/// Exclude patterns of one source entry.
///
/// A pattern without `/` matches an entry's name at any depth; a pattern with
/// `/` matches the path relative to the source root. A trailing `/` limits a
/// pattern to directories. `**` is not recursive and behaves as `*`.
#[derive(Debug, Clone, Default)]
pub struct ExcludeFilter {
    rules: Vec<ExcludeRule>,
}

impl ExcludeFilter {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let mut rules = Vec::new();
        for raw in patterns {
            for expanded in expand_braces(raw.as_ref()) {
                let flattened = expanded.replace("**", "*");
                let trimmed = flattened.trim_start_matches("./");
                let directories_only = trimmed.ends_with('/');
                let body = trimmed.trim_end_matches('/');
                if body.is_empty() {
                    continue;
                }
                rules.push(ExcludeRule {
                    pattern: Pattern::new(body),
                    anchored: body.contains('/'),
                    directories_only,
                });
            }
        }
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether `relative` (root-relative, `/`-separated) is excluded.
    pub fn is_excluded(&self, relative: &str, is_dir: bool) -> bool {
        let name = relative.rsplit('/').next().unwrap_or(relative);
        self.rules.iter().any(|rule| {
            if rule.directories_only && !is_dir {
                return false;
            }
            if rule.anchored {
                rule.pattern.matches(relative)
            } else {
                rule.pattern.matches(name)
            }
        })
    }
}

// ── Include expansion ────────────────────────────────────────────────────────

/// Expands include patterns against a [`Filesystem`].
///
/// Holds an is-directory memo for the lifetime of one walk. Create a walker
/// per source entry and drop it afterwards.
pub struct GlobWalker<'a> {
    fs: &'a dyn Filesystem,
    behavior: GlobBehavior,
    dirs: RwLock<HashMap<PathBuf, bool>>,
}

impl<'a> GlobWalker<'a> {
    pub fn new(fs: &'a dyn Filesystem, behavior: GlobBehavior) -> Self {
        Self {
            fs,
            behavior,
            dirs: RwLock::new(HashMap::new()),
        }
    }

    /// Paths below `root` matched by `pattern`.
    pub fn expand(&self, root: &Path, pattern: &str) -> PbxResult<BTreeSet<PathBuf>> {
        let mut out = BTreeSet::new();
        for expanded in expand_braces(pattern) {
            let trimmed = expanded.trim_start_matches("./");
            let trailing_slash = trimmed.ends_with('/');
            let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
            if segments.is_empty() {
                continue;
            }
            self.walk(root, &segments, trailing_slash, &mut out)?;
        }

        if !self.behavior.includes_directories() {
            let mut files = BTreeSet::new();
            for path in out {
                if !self.is_dir(&path)? {
                    files.insert(path);
                }
            }
            return Ok(files);
        }
        Ok(out)
    }

    /// Memoized directory check.
    pub fn is_dir(&self, path: &Path) -> PbxResult<bool> {
        {
            let memo = self
                .dirs
                .read()
                .map_err(|_| ApplicationError::StoreLockError)?;
            if let Some(&known) = memo.get(path) {
                return Ok(known);
            }
        }

        let is_dir = self.fs.is_dir(path);
        self.dirs
            .write()
            .map_err(|_| ApplicationError::StoreLockError)?
            .insert(path.to_path_buf(), is_dir);
        Ok(is_dir)
    }

    fn walk(
        &self,
        dir: &Path,
        segments: &[&str],
        trailing_slash: bool,
        out: &mut BTreeSet<PathBuf>,
    ) -> PbxResult<()> {
        let Some((&segment, rest)) = segments.split_first() else {
            return Ok(());
        };

        if segment == "**" && self.behavior.supports_globstar() {
            if rest.is_empty() {
                let files_too = !trailing_slash || self.behavior.includes_files_if_trailing_slash();
                return self.collect_descendants(dir, files_too, out);
            }

            let mut levels = Vec::new();
            if self.behavior.includes_files_from_globstar_root() {
                levels.push(dir.to_path_buf());
            }
            self.descendant_directories(dir, &mut levels)?;
            for level in levels {
                self.walk(&level, rest, trailing_slash, out)?;
            }
            return Ok(());
        }

        let pattern = Pattern::new(if segment == "**" { "*" } else { segment });
        let candidates = if pattern.is_literal() {
            let path = dir.join(segment);
            if self.fs.exists(&path) {
                vec![segment.to_string()]
            } else {
                Vec::new()
            }
        } else {
            self.entries(dir)?
                .into_iter()
                .filter(|name| !name.starts_with('.') || segment.starts_with('.'))
                .filter(|name| pattern.matches(name))
                .collect()
        };

        for name in candidates {
            let path = dir.join(&name);
            if rest.is_empty() {
                if trailing_slash && !self.is_dir(&path)? {
                    continue;
                }
                out.insert(path);
            } else if self.is_dir(&path)? {
                self.walk(&path, rest, trailing_slash, out)?;
            }
        }
        Ok(())
    }

    fn entries(&self, dir: &Path) -> PbxResult<Vec<String>> {
        if !self.is_dir(dir)? {
            return Ok(Vec::new());
        }
        let mut names = self.fs.read_dir(dir)?;
        names.sort();
        Ok(names)
    }

    fn descendant_directories(&self, dir: &Path, out: &mut Vec<PathBuf>) -> PbxResult<()> {
        for name in self.entries(dir)? {
            if name.starts_with('.') || BLACKLISTED_DIRECTORIES.contains(&name.as_str()) {
                continue;
            }
            let path = dir.join(&name);
            if self.is_dir(&path)? {
                out.push(path.clone());
                self.descendant_directories(&path, out)?;
            }
        }
        Ok(())
    }

    fn collect_descendants(
        &self,
        dir: &Path,
        files_too: bool,
        out: &mut BTreeSet<PathBuf>,
    ) -> PbxResult<()> {
        for name in self.entries(dir)? {
            if name.starts_with('.') {
                continue;
            }
            let path = dir.join(&name);
            if self.is_dir(&path)? {
                if BLACKLISTED_DIRECTORIES.contains(&name.as_str()) {
                    continue;
                }
                out.insert(path.clone());
                self.collect_descendants(&path, files_too, out)?;
            } else if files_too {
                out.insert(path);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::test_support::TreeFs;

    fn tree() -> TreeFs {
        TreeFs::with_files(&[
            "/p/a.swift",
            "/p/b.m",
            "/p/Sub/c.swift",
            "/p/Sub/Deep/d.swift",
            "/p/Pods/Lib/e.swift",
            "/p/.hidden/f.swift",
        ])
    }

    fn names(set: &BTreeSet<PathBuf>) -> Vec<String> {
        set.iter()
            .map(|p| p.strip_prefix("/p").unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn wildcards_do_not_cross_separators() {
        assert!(Pattern::new("*.swift").matches("a.swift"));
        assert!(!Pattern::new("*.swift").matches("Sub/a.swift"));
        assert!(Pattern::new("Sub/*.swift").matches("Sub/a.swift"));
        assert!(Pattern::new("?.m").matches("b.m"));
        assert!(!Pattern::new("?.m").matches("bb.m"));
    }

    #[test]
    fn bracket_classes() {
        let digits = Pattern::new("file[0-9].txt");
        assert!(digits.matches("file3.txt"));
        assert!(!digits.matches("fileA.txt"));

        let negated = Pattern::new("[!a]*");
        assert!(negated.matches("bcd"));
        assert!(!negated.matches("abc"));

        assert!(Pattern::new("[abc").matches("[abc"));
        assert!(Pattern::new("[]]").matches("]"));
    }

    #[test]
    fn escapes_are_literal() {
        assert!(Pattern::new(r"\*.txt").matches("*.txt"));
        assert!(!Pattern::new(r"\*.txt").matches("a.txt"));
    }

    #[test]
    fn brace_expansion() {
        assert_eq!(expand_braces("*.{h,m}"), vec!["*.h", "*.m"]);
        assert_eq!(
            expand_braces("{a,b}/{c,d}"),
            vec!["a/c", "a/d", "b/c", "b/d"]
        );
        assert_eq!(expand_braces("{single}"), vec!["{single}"]);
        assert_eq!(expand_braces("{a,{b,c}}"), vec!["a", "b", "c"]);
    }

    #[test]
    fn unanchored_excludes_match_names_at_any_depth() {
        let filter = ExcludeFilter::new(&["B"]);
        assert!(filter.is_excluded("B", true));
        assert!(filter.is_excluded("A/B", true));
        assert!(!filter.is_excluded("A", true));
        assert!(!filter.is_excluded("A/a.swift", false));
    }

    #[test]
    fn anchored_excludes_match_relative_paths() {
        let filter = ExcludeFilter::new(&["A/*.swift"]);
        assert!(filter.is_excluded("A/a.swift", false));
        assert!(!filter.is_excluded("B/A/a.swift", false));
    }

    #[test]
    fn globstar_is_not_recursive_in_excludes() {
        let filter = ExcludeFilter::new(&["**/*.swift"]);
        assert!(filter.is_excluded("A/a.swift", false));
        assert!(!filter.is_excluded("A/B/b.swift", false));
    }

    #[test]
    fn trailing_slash_limits_excludes_to_directories() {
        let filter = ExcludeFilter::new(&["Generated/"]);
        assert!(filter.is_excluded("Generated", true));
        assert!(!filter.is_excluded("Generated", false));
    }

    #[test]
    fn bash_v4_globstar_includes_root_and_descendants() {
        let fs = tree();
        let walker = GlobWalker::new(&fs, GlobBehavior::BashV4);
        let matched = walker.expand(Path::new("/p"), "**/*.swift").unwrap();
        assert_eq!(
            names(&matched),
            vec!["Sub/Deep/d.swift", "Sub/c.swift", "a.swift"]
        );
    }

    #[test]
    fn bash_v3_treats_globstar_as_star() {
        let fs = tree();
        let walker = GlobWalker::new(&fs, GlobBehavior::BashV3);
        let matched = walker.expand(Path::new("/p"), "**/*.swift").unwrap();
        assert_eq!(names(&matched), vec!["Sub/c.swift"]);
    }

    #[test]
    fn trailing_globstar_slash_differs_by_preset() {
        let fs = tree();

        let bash = GlobWalker::new(&fs, GlobBehavior::BashV4);
        let dirs = bash.expand(Path::new("/p"), "Sub/**/").unwrap();
        assert_eq!(names(&dirs), vec!["Sub/Deep"]);

        let gradle = GlobWalker::new(&fs, GlobBehavior::Gradle);
        let files = gradle.expand(Path::new("/p"), "Sub/**/").unwrap();
        assert_eq!(names(&files), vec!["Sub/Deep/d.swift", "Sub/c.swift"]);
    }

    #[test]
    fn gradle_drops_directories_from_results() {
        let fs = tree();
        let walker = GlobWalker::new(&fs, GlobBehavior::Gradle);
        assert!(walker.expand(Path::new("/p"), "Sub").unwrap().is_empty());

        let bash = GlobWalker::new(&fs, GlobBehavior::BashV4);
        assert_eq!(names(&bash.expand(Path::new("/p"), "Sub").unwrap()), vec!["Sub"]);
    }

    #[test]
    fn globstar_skips_blacklist_and_hidden_directories() {
        let fs = tree();
        let walker = GlobWalker::new(&fs, GlobBehavior::BashV4);
        let matched = walker.expand(Path::new("/p"), "**").unwrap();
        let found = names(&matched);
        assert!(!found.iter().any(|p| p.starts_with("Pods")));
        assert!(!found.iter().any(|p| p.starts_with(".hidden")));
        assert!(found.contains(&"Sub/Deep/d.swift".to_string()));
    }

    #[test]
    fn braces_in_includes() {
        let fs = tree();
        let walker = GlobWalker::new(&fs, GlobBehavior::BashV4);
        let matched = walker.expand(Path::new("/p"), "*.{m,swift}").unwrap();
        assert_eq!(names(&matched), vec!["a.swift", "b.m"]);
    }
}
