//! ディレクティブから触れるセッションの操作
//!
//! ディレクティブごとに必要な操作だけを見せるよう、能力ごとにトレイトを分けている。

use dfkernel_build::{
    ArgSelection, BuildOutcome, ContainerEngine, MessageSink, Payload, Session, StageTable,
};
use std::collections::BTreeMap;
use std::path::Path;

/// ビルド引数の読み書き
pub trait BuildArgs {
    fn build_args(&self) -> &BTreeMap<String, String>;
    fn update_build_args(&mut self, args: Vec<(String, String)>);
    fn remove_build_args(&mut self, selection: ArgSelection) -> Vec<String>;
}

/// ビルドコンテキストの切り替え
pub trait ContextControl {
    fn build_context_dir(&self) -> Option<&Path>;
    fn set_build_context(&mut self, dir: &Path) -> dfkernel_build::Result<()>;
}

pub trait StageView {
    fn stage_table(&self) -> &StageTable;
}

#[allow(async_fn_in_trait)]
pub trait Tagging {
    /// `stage` が無ければ現在のイメージ
    async fn tag_image(
        &self,
        stage: Option<&str>,
        name: &str,
        tag: Option<&str>,
    ) -> dfkernel_build::Result<String>;
}

/// セルのビルドと、次の入力セルへの差し込み
#[allow(async_fn_in_trait)]
pub trait CellBuilder {
    async fn build_cell(&mut self, raw: &str, sink: &mut dyn MessageSink) -> BuildOutcome;
    fn set_next_input(&mut self, text: String, replace: bool);
    fn take_payload(&mut self) -> Option<Payload>;
}

/// カーネルが扱うセッションに必要な能力の全体
pub trait DirectiveTarget: BuildArgs + ContextControl + StageView + Tagging + CellBuilder {}

impl<T> DirectiveTarget for T where T: BuildArgs + ContextControl + StageView + Tagging + CellBuilder {}

impl<E: ContainerEngine> BuildArgs for Session<E> {
    fn build_args(&self) -> &BTreeMap<String, String> {
        Session::build_args(self)
    }

    fn update_build_args(&mut self, args: Vec<(String, String)>) {
        Session::update_build_args(self, args);
    }

    fn remove_build_args(&mut self, selection: ArgSelection) -> Vec<String> {
        Session::remove_build_args(self, selection)
    }
}

impl<E: ContainerEngine> ContextControl for Session<E> {
    fn build_context_dir(&self) -> Option<&Path> {
        Session::build_context_dir(self)
    }

    fn set_build_context(&mut self, dir: &Path) -> dfkernel_build::Result<()> {
        Session::set_build_context(self, Some(dir))
    }
}

impl<E: ContainerEngine> StageView for Session<E> {
    fn stage_table(&self) -> &StageTable {
        Session::stage_table(self)
    }
}

impl<E: ContainerEngine> Tagging for Session<E> {
    async fn tag_image(
        &self,
        stage: Option<&str>,
        name: &str,
        tag: Option<&str>,
    ) -> dfkernel_build::Result<String> {
        match stage {
            Some(stage) => self.tag_stage(stage, name, tag).await,
            None => Session::tag_image(self, name, tag).await,
        }
    }
}

impl<E: ContainerEngine> CellBuilder for Session<E> {
    async fn build_cell(&mut self, raw: &str, sink: &mut dyn MessageSink) -> BuildOutcome {
        self.rewrite_and_build_with(raw, sink).await
    }

    fn set_next_input(&mut self, text: String, replace: bool) {
        Session::set_next_input(self, text, replace);
    }

    fn take_payload(&mut self) -> Option<Payload> {
        Session::take_payload(self)
    }
}
