//! マルチステージビルドのステージ管理
//!
//! インデックスは `FROM` ごとに 0 から順に払い出し、減ることはない。
//! 失敗したビルドでエントリを消すことはしない。

use crate::error::{BuildError, Result};
use std::collections::HashMap;
use std::fmt;

/// 1つのビルドステージ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub index: usize,
    pub alias: Option<String>,
    /// そのステージで最後に成功したビルドのイメージID
    pub image_id: Option<String>,
}

/// インデックス → (イメージID, エイリアス) の表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageTable {
    stages: Vec<Stage>,
    aliases: HashMap<String, usize>,
}

impl StageTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 次のインデックスを払い出す
    ///
    /// 既存のエイリアスを再利用した場合、エイリアスは新しいステージを指すようになる。
    pub fn open_stage(&mut self, alias: Option<&str>) -> usize {
        let index = self.stages.len();
        if let Some(alias) = alias {
            if let Some(previous) = self.aliases.insert(alias.to_string(), index) {
                tracing::debug!(
                    "Alias '{}' moved from stage {} to stage {}",
                    alias,
                    previous,
                    index
                );
            }
        }
        self.stages.push(Stage {
            index,
            alias: alias.map(str::to_string),
            image_id: None,
        });
        index
    }

    /// イメージIDを記録（同じステージ内のビルドは上書き）
    pub fn record_result(&mut self, index: usize, image_id: &str) -> Result<()> {
        let stage = self
            .stages
            .get_mut(index)
            .ok_or_else(|| BuildError::UnknownStage(index.to_string()))?;
        stage.image_id = Some(image_id.to_string());
        Ok(())
    }

    /// 数値ならインデックス、それ以外はエイリアスとして解決する
    pub fn resolve(&self, token: &str) -> Result<&str> {
        let index = if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
            token.parse::<usize>().ok()
        } else {
            self.aliases.get(token).copied()
        };

        index
            .and_then(|index| self.stages.get(index))
            .and_then(|stage| stage.image_id.as_deref())
            .ok_or_else(|| BuildError::UnknownStage(token.to_string()))
    }

    pub fn index_of(&self, alias: &str) -> Option<usize> {
        self.aliases.get(alias).copied()
    }

    /// 最後に開いたステージ
    pub fn current(&self) -> Option<&Stage> {
        self.stages.last()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.stages.len().checked_sub(1)
    }

    pub fn get(&self, index: usize) -> Option<&Stage> {
        self.stages.get(index)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl fmt::Display for StageTable {
    /// `%stages` で表示する表
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows: Vec<[String; 3]> = self
            .stages
            .iter()
            .map(|stage| {
                [
                    stage.index.to_string(),
                    stage.alias.clone().unwrap_or_else(|| "-".to_string()),
                    stage.image_id.clone().unwrap_or_else(|| "-".to_string()),
                ]
            })
            .collect();

        let headers = ["index", "alias", "image id"];
        let mut widths = headers.map(str::len);
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.len());
            }
        }

        let border = format!(
            "+{}+{}+{}+",
            "-".repeat(widths[0] + 2),
            "-".repeat(widths[1] + 2),
            "-".repeat(widths[2] + 2)
        );

        writeln!(f, "{}", border)?;
        write_row(f, &widths, headers)?;
        writeln!(f, "{}", border)?;
        for row in &rows {
            write_row(f, &widths, [row[0].as_str(), row[1].as_str(), row[2].as_str()])?;
        }
        write!(f, "{}", border)
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, widths: &[usize; 3], cells: [&str; 3]) -> fmt::Result {
    writeln!(
        f,
        "| {:<w0$} | {:<w1$} | {:<w2$} |",
        cells[0],
        cells[1],
        cells[2],
        w0 = widths[0],
        w1 = widths[1],
        w2 = widths[2]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_are_sequential() {
        let mut table = StageTable::new();
        assert_eq!(table.open_stage(Some("base")), 0);
        assert_eq!(table.open_stage(None), 1);
        assert_eq!(table.open_stage(Some("final")), 2);
        assert_eq!(table.current_index(), Some(2));
    }

    #[test]
    fn test_alias_and_index_resolve_to_same_image() {
        let mut table = StageTable::new();
        let index = table.open_stage(Some("builder"));
        table.record_result(index, "sha256:aaa").unwrap();

        assert_eq!(table.resolve("builder").unwrap(), "sha256:aaa");
        assert_eq!(table.resolve("0").unwrap(), table.resolve("builder").unwrap());
    }

    #[test]
    fn test_record_result_overwrites() {
        let mut table = StageTable::new();
        let index = table.open_stage(Some("base"));
        table.record_result(index, "sha256:aaa").unwrap();
        table.record_result(index, "sha256:bbb").unwrap();

        let stage = table.get(0).unwrap();
        assert_eq!(stage.image_id.as_deref(), Some("sha256:bbb"));
        assert_eq!(stage.alias.as_deref(), Some("base"));
    }

    #[test]
    fn test_resolve_unknown() {
        let mut table = StageTable::new();
        assert!(matches!(
            table.resolve("999"),
            Err(BuildError::UnknownStage(token)) if token == "999"
        ));
        assert!(table.resolve("nope").is_err());

        // 開いたがまだビルドされていないステージも解決できない
        table.open_stage(Some("pending"));
        assert!(table.resolve("pending").is_err());
    }

    #[test]
    fn test_alias_reassignment_last_write_wins() {
        let mut table = StageTable::new();
        let first = table.open_stage(Some("x"));
        table.record_result(first, "sha256:one").unwrap();
        let second = table.open_stage(Some("x"));
        table.record_result(second, "sha256:two").unwrap();

        assert_eq!(table.resolve("x").unwrap(), "sha256:two");
        // 古いステージはインデックスで引き続き参照できる
        assert_eq!(table.resolve("0").unwrap(), "sha256:one");
    }

    #[test]
    fn test_record_result_unknown_index() {
        let mut table = StageTable::new();
        assert!(table.record_result(3, "sha256:aaa").is_err());
    }

    #[test]
    fn test_display_table() {
        let mut table = StageTable::new();
        let index = table.open_stage(Some("base"));
        table.record_result(index, "sha256:aaa").unwrap();
        table.open_stage(None);

        let rendered = table.to_string();
        assert!(rendered.contains("| index | alias | image id   |"));
        assert!(rendered.contains("| 0     | base  | sha256:aaa |"));
        assert!(rendered.contains("| 1     | -     | -          |"));
    }
}
