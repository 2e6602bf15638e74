//! 解析済みのディレクティブと、その適用

use crate::error::Result;
use crate::target::{BuildArgs, CellBuilder, ContextControl, DirectiveTarget, StageView, Tagging};
use dfkernel_build::{ArgSelection, BuildOutcome, MessageSink};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    SetArgs(Vec<(String, String)>),
    RemoveArgs(ArgSelection),
    /// 空なら全件
    ListArgs(Vec<String>),
    Context(PathBuf),
    Tag {
        /// ステージのエイリアスまたはインデックス。無ければ現在のイメージ
        stage: Option<String>,
        name: String,
        tag: Option<String>,
    },
    Stages,
    Magics,
    Install {
        /// 次の入力セルに差し込む複数行の形
        pretty: String,
        /// 実際にビルドする1行の形
        instruction: String,
    },
}

impl Directive {
    /// セッションに適用する。ビルドを伴うものはその結果を返す
    pub async fn apply<T: DirectiveTarget>(
        self,
        target: &mut T,
        directive_names: &[&str],
        sink: &mut dyn MessageSink,
    ) -> Result<Option<BuildOutcome>> {
        match self {
            Directive::SetArgs(args) => set_args(target, args, sink),
            Directive::RemoveArgs(selection) => remove_args(target, selection, sink),
            Directive::ListArgs(names) => list_args(&*target, &names, sink),
            Directive::Context(dir) => change_context(target, dir, sink)?,
            Directive::Tag { stage, name, tag } => {
                tag_image(&*target, stage.as_deref(), &name, tag.as_deref(), sink).await?
            }
            Directive::Stages => show_stages(&*target, sink),
            Directive::Magics => {
                let mut names = directive_names.to_vec();
                names.sort_unstable();
                sink.send(&names.join("\n"));
            }
            Directive::Install {
                pretty,
                instruction,
            } => return Ok(Some(install(target, pretty, &instruction, sink).await)),
        }
        Ok(None)
    }
}

fn set_args(target: &mut impl BuildArgs, args: Vec<(String, String)>, sink: &mut dyn MessageSink) {
    for (name, value) in &args {
        sink.send(&format!("Build argument '{}' set to '{}'\n", name, value));
    }
    target.update_build_args(args);
    list_args(&*target, &[], sink);
}

fn remove_args(target: &mut impl BuildArgs, selection: ArgSelection, sink: &mut dyn MessageSink) {
    match selection {
        ArgSelection::All => {
            target.remove_build_args(ArgSelection::All);
            sink.send("All build arguments removed\n");
        }
        ArgSelection::Names(names) => {
            // 1つでも無ければ何も消さない
            if let Some(missing) = names.iter().find(|n| !target.build_args().contains_key(*n)) {
                sink.send(&format!("'{}' not in current build arguments", missing));
                return;
            }
            let removed = target.remove_build_args(ArgSelection::Names(names));
            let response: String = removed
                .iter()
                .map(|name| format!("Build argument '{}' removed\n", name))
                .collect();
            sink.send(&response);
        }
    }
}

fn list_args(target: &impl BuildArgs, names: &[String], sink: &mut dyn MessageSink) {
    let args = target.build_args();
    if names.is_empty() {
        if args.is_empty() {
            sink.send("No current build arguments");
            return;
        }
        let mut response = String::from("Current build arguments:\n");
        for (name, value) in args {
            response.push_str(&format!("\t{}={}\n", name, value));
        }
        sink.send(&response);
        return;
    }

    let mut response = String::from("Current build arguments:\n");
    for name in names {
        match args.get(name) {
            Some(value) => response.push_str(&format!("\t{}={}\n", name, value)),
            None => {
                sink.send(&format!("'{}' not in current build arguments", name));
                return;
            }
        }
    }
    sink.send(&response);
}

fn change_context(
    target: &mut impl ContextControl,
    dir: PathBuf,
    sink: &mut dyn MessageSink,
) -> Result<()> {
    target.set_build_context(&dir)?;
    let shown = target.build_context_dir().unwrap_or(dir.as_path());
    sink.send(&format!("Build context changed: {}\n", shown.display()));
    Ok(())
}

async fn tag_image(
    target: &impl Tagging,
    stage: Option<&str>,
    name: &str,
    tag: Option<&str>,
    sink: &mut dyn MessageSink,
) -> Result<()> {
    let message = target.tag_image(stage, name, tag).await?;
    sink.send(&message);
    Ok(())
}

fn show_stages(target: &impl StageView, sink: &mut dyn MessageSink) {
    sink.send(&format!("{}\n", target.stage_table()));
}

async fn install(
    target: &mut impl CellBuilder,
    pretty: String,
    instruction: &str,
    sink: &mut dyn MessageSink,
) -> BuildOutcome {
    target.set_next_input(pretty, true);
    target.build_cell(instruction, sink).await
}
