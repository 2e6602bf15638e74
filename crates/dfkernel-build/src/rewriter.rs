//! セルを単独でビルド可能な Dockerfile に書き換える
//!
//! 1. `--from=<alias|index>` をステージ表のイメージIDに置き換える
//! 2. 現在のイメージがあれば先頭に `FROM <image id>` を差し込む
//!
//! 同じセル内で定義されたエイリアスは Docker 自身が解決するので触らない。

use crate::instruction::{self, Instruction};
use crate::stage::StageTable;
use std::collections::HashSet;
use std::ops::Range;

/// 書き換え結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    /// ビルド定義ファイルにそのまま書き出すテキスト
    pub text: String,
    /// 解決できなかった参照についての注意書き（ビルドは続行する）
    pub advisories: Vec<String>,
    /// このセルの `FROM` が開くステージのエイリアス（出現順）
    pub opened: Vec<Option<String>>,
}

impl Rewrite {
    /// このセルが新しいステージを開くか
    pub fn opens_stage(&self) -> bool {
        !self.opened.is_empty()
    }
}

/// セルを書き換える。入力が同じなら結果も同じ
pub fn rewrite(raw: &str, base_image: Option<&str>, stages: &StageTable) -> Rewrite {
    let instructions = instruction::parse(raw);

    let mut replacements: Vec<(Range<usize>, String)> = Vec::new();
    let mut advisories = Vec::new();
    let mut opened = Vec::new();
    let mut local_aliases: HashSet<&str> = HashSet::new();

    for inst in &instructions {
        if let Some(flag) = inst.flag("from") {
            if let (Some(token), Some(span)) = (flag.value, flag.value_span) {
                if !local_aliases.contains(token) {
                    match stages.resolve(token) {
                        Ok(image_id) => replacements.push((span, image_id.to_string())),
                        Err(_) => {
                            tracing::warn!("Unknown build stage referenced by --from: {}", token);
                            advisories.push(unknown_stage_advisory(token));
                        }
                    }
                }
            }
        }

        if inst.is("FROM") {
            if let Some(replacement) = resolve_base_image(inst, stages, &local_aliases) {
                replacements.push(replacement);
            }
            if let Some(alias) = inst.stage_alias() {
                local_aliases.insert(alias);
            }
            opened.push(inst.stage_alias().map(str::to_string));
        }
    }

    let mut text = apply(raw, replacements);
    if let Some(base) = base_image {
        text = format!("FROM {}\n{}", base, text);
    }

    Rewrite {
        text,
        advisories,
        opened,
    }
}

/// `FROM <alias>` が過去のセルのステージを指していればイメージIDに置き換える
///
/// インデックスは通常のイメージ名と区別できないため対象外。
fn resolve_base_image(
    inst: &Instruction<'_>,
    stages: &StageTable,
    local_aliases: &HashSet<&str>,
) -> Option<(Range<usize>, String)> {
    let image = inst.base_image()?;
    if local_aliases.contains(image.value.as_str()) {
        return None;
    }
    stages.index_of(&image.value)?;
    let image_id = stages.resolve(&image.value).ok()?;
    Some((image.span.clone(), image_id.to_string()))
}

fn unknown_stage_advisory(token: &str) -> String {
    format!(
        "Note: Build stage {token} is not known.\nAttempting to use image with name {token}...\n"
    )
}

/// 範囲を後ろから置換して元の表記を保つ
fn apply(raw: &str, mut replacements: Vec<(Range<usize>, String)>) -> String {
    replacements.sort_by(|a, b| b.0.start.cmp(&a.0.start));
    let mut text = raw.to_string();
    for (range, value) in replacements {
        text.replace_range(range, &value);
    }
    text
}
