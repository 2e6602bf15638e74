//! `.dockerignore` 互換のビルドコンテキストフィルタ
//!
//! ルールはファイルに書かれた順に評価し、最後にマッチしたルールが勝つ。
//! `!` で始まるルールは除外を取り消す。

use crate::error::{BuildError, Result};
use glob::Pattern;
use std::fs;
use std::path::Path;

pub const DOCKERIGNORE: &str = ".dockerignore";

/// 1行分の ignore ルール
#[derive(Debug, Clone)]
pub struct IgnoreRule {
    source: String,
    negated: bool,
    matcher: Matcher,
}

#[derive(Debug, Clone)]
enum Matcher {
    /// `**` で始まるパターン。パス全体、または `**/` を外したパターンで末尾からマッチ
    Tail { full: Pattern, root: Pattern },
    /// パスセグメントを左から順に照合
    Segments(Vec<Pattern>),
}

impl IgnoreRule {
    /// `.dockerignore` の1行を前処理してルールにする
    ///
    /// コメントと空行は `None`。パスは Go の `filepath.Clean` 相当で正規化し、
    /// 先頭の `/` はコンテキストのルートとして取り除く。
    pub fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return None;
        }

        let (negated, body) = match trimmed.strip_prefix('!') {
            Some(rest) => (true, rest.trim()),
            None => (false, trimmed),
        };

        let cleaned = clean_path(body);
        if cleaned.is_empty() {
            return None;
        }

        let matcher = if cleaned.starts_with("**") {
            let root = cleaned.trim_start_matches("**").trim_start_matches('/');
            Matcher::Tail {
                full: compile(&cleaned),
                root: compile(root),
            }
        } else {
            Matcher::Segments(cleaned.split('/').map(compile).collect())
        };

        Some(Self {
            source: cleaned,
            negated,
            matcher,
        })
    }

    /// 指定したファイルを常に含めるための否定ルール
    pub fn include(path: &str) -> Self {
        let cleaned = clean_path(path);
        Self {
            matcher: Matcher::Segments(cleaned.split('/').map(compile).collect()),
            source: cleaned,
            negated: true,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.source
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// コンテキストルートからの相対パス（`/` 区切り）にマッチするか
    pub fn matches(&self, rel_path: &str) -> bool {
        match &self.matcher {
            Matcher::Tail { full, root } => full.matches(rel_path) || root.matches(rel_path),
            Matcher::Segments(segments) => {
                let path_segments: Vec<&str> = rel_path.split('/').collect();
                // パターンの方が深ければマッチしようがない
                if segments.len() > path_segments.len() {
                    return false;
                }
                segments
                    .iter()
                    .zip(path_segments)
                    .all(|(pattern, segment)| pattern.matches(segment))
            }
        }
    }
}

/// ルール集合
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    rules: Vec<IgnoreRule>,
}

impl IgnoreRules {
    pub fn new(rules: Vec<IgnoreRule>) -> Self {
        Self { rules }
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(
            lines
                .into_iter()
                .filter_map(|line| IgnoreRule::parse(line.as_ref()))
                .collect(),
        )
    }

    /// ディレクトリ直下の `.dockerignore` を読み込む
    ///
    /// ファイルが無ければ空のルール集合。ある場合は `.dockerignore` 自身を
    /// 最後に否定ルールとして加え、コンテキストに必ず残す。
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(DOCKERIGNORE);
        if !path.is_file() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let mut rules = Self::from_lines(content.lines());
        rules.rules.push(IgnoreRule::include(DOCKERIGNORE));

        tracing::debug!(
            "Loaded {} ignore rules from {}",
            rules.rules.len(),
            path.display()
        );
        Ok(rules)
    }

    pub fn rules(&self) -> &[IgnoreRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 後のルールが前のルールを上書きする
    pub fn is_ignored(&self, rel_path: &str) -> bool {
        let mut ignored = false;
        for rule in &self.rules {
            if rule.matches(rel_path) {
                ignored = !rule.negated;
            }
        }
        ignored
    }

    /// コピー時の除外判定。`rel_dir` 内の `entries` のうち除外すべきものを返す
    pub fn excluded<'a>(&self, rel_dir: &str, entries: &'a [String]) -> Vec<&'a str> {
        entries
            .iter()
            .filter(|entry| self.is_ignored(&join_rel(rel_dir, entry)))
            .map(String::as_str)
            .collect()
    }
}

/// 除外されずに残るディレクトリエントリ
struct Visible {
    name: std::ffi::OsString,
    rel_path: String,
    file_type: fs::FileType,
}

fn visible_entries(dir: &Path, rel_dir: &str, rules: &IgnoreRules) -> std::io::Result<Vec<Visible>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        entries.push((entry.file_name(), entry.file_type()?));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let names: Vec<String> = entries
        .iter()
        .map(|(name, _)| name.to_string_lossy().into_owned())
        .collect();
    let excluded = rules.excluded(rel_dir, &names);

    Ok(entries
        .into_iter()
        .zip(names.iter())
        .filter(|(_, name)| !excluded.contains(&name.as_str()))
        .map(|((name, file_type), display)| Visible {
            name,
            rel_path: join_rel(rel_dir, display),
            file_type,
        })
        .collect())
}

/// 除外ルールを適用したディレクトリサイズ（バイト）
///
/// シンボリックリンクは数えない。除外されたディレクトリの中と `skip` は走査しない。
pub fn dir_size(root: &Path, rules: &IgnoreRules, skip: Option<&Path>) -> Result<u64> {
    fn walk(
        dir: &Path,
        rel_dir: &str,
        rules: &IgnoreRules,
        skip: Option<&Path>,
    ) -> std::io::Result<u64> {
        let mut total = 0;
        for entry in visible_entries(dir, rel_dir, rules)? {
            let path = dir.join(&entry.name);
            if entry.file_type.is_symlink() {
                continue;
            }
            if entry.file_type.is_dir() {
                if is_same_dir(&path, skip) {
                    continue;
                }
                total += walk(&path, &entry.rel_path, rules, skip)?;
            } else if entry.file_type.is_file() {
                total += fs::metadata(&path)?.len();
            }
        }
        Ok(total)
    }

    let skip = skip.and_then(|path| path.canonicalize().ok());
    walk(root, "", rules, skip.as_deref()).map_err(BuildError::Io)
}

/// `src` を除外ルールに従って `dest` に再帰コピーし、コピーしたファイル数を返す
///
/// ファイルへのシンボリックリンクは実体をコピーする。ディレクトリへのリンクは
/// 循環を避けるため辿らない。`dest` が `src` の中にあっても `dest` 自体はコピーしない。
pub fn copy_filtered(src: &Path, dest: &Path, rules: &IgnoreRules) -> Result<u64> {
    fn walk(
        src: &Path,
        dest: &Path,
        rel_dir: &str,
        rules: &IgnoreRules,
        dest_root: &Path,
    ) -> Result<u64> {
        let staging = |source: std::io::Error| BuildError::Staging {
            path: dest.to_path_buf(),
            source,
        };

        fs::create_dir_all(dest).map_err(staging)?;
        let mut copied = 0;
        for entry in visible_entries(src, rel_dir, rules).map_err(staging)? {
            let from = src.join(&entry.name);
            let to = dest.join(&entry.name);

            let is_file = if entry.file_type.is_symlink() {
                match fs::metadata(&from) {
                    Ok(meta) if meta.is_file() => true,
                    _ => {
                        tracing::debug!("Skipping symlink: {}", from.display());
                        false
                    }
                }
            } else {
                entry.file_type.is_file()
            };

            if entry.file_type.is_dir() {
                if is_same_dir(&from, Some(dest_root)) {
                    tracing::debug!("Skipping staging directory: {}", from.display());
                    continue;
                }
                copied += walk(&from, &to, &entry.rel_path, rules, dest_root)?;
            } else if is_file {
                fs::copy(&from, &to).map_err(|source| BuildError::Staging {
                    path: from.clone(),
                    source,
                })?;
                copied += 1;
            }
        }
        Ok(copied)
    }

    let staging = |source: std::io::Error| BuildError::Staging {
        path: dest.to_path_buf(),
        source,
    };
    fs::create_dir_all(dest).map_err(staging)?;
    let dest_root = dest.canonicalize().map_err(staging)?;
    walk(src, dest, "", rules, &dest_root)
}

/// `skip` は正規化済みのパス
fn is_same_dir(path: &Path, skip: Option<&Path>) -> bool {
    match skip {
        Some(skip) => path.canonicalize().is_ok_and(|path| path == skip),
        None => false,
    }
}

fn join_rel(rel_dir: &str, name: &str) -> String {
    if rel_dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", rel_dir, name)
    }
}

/// Go の `filepath.Clean` 相当（`/` 区切り、先頭の `/` は外す）
fn clean_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if matches!(parts.last(), Some(last) if *last != "..") {
                    parts.pop();
                } else if !path.starts_with('/') {
                    parts.push(part);
                }
            }
            _ => parts.push(part),
        }
    }
    parts.join("/")
}

/// 不正なグロブはリテラルとして扱う
fn compile(pattern: &str) -> Pattern {
    Pattern::new(pattern).unwrap_or_else(|_| {
        Pattern::new(&Pattern::escape(pattern)).unwrap_or_default()
    })
}
