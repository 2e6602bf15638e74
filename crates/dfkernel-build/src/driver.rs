//! 1ラウンド分のビルド
//!
//! `Idle → Staging → Building → {Committed, Failed} → Idle`
//!
//! セッション状態（現在のイメージ・ステージ表）を書き換えるのは Committed に
//! 到達したときだけ。失敗したラウンドは何も残さない。

use crate::engine::{BuildRecord, BuildRequest, ContainerEngine};
use crate::error::{BuildError, Result};
use crate::ignore::IgnoreRules;
use crate::rewriter::{self, Rewrite};
use crate::session::SessionState;
use futures_util::stream::StreamExt;
use std::time::Duration;

/// ビルドドライバの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Idle,
    Staging,
    Building,
    Committed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    Committed,
    Failed,
}

/// ビルド1ラウンドの結果
#[derive(Debug)]
pub struct BuildOutcome {
    pub status: BuildStatus,
    /// Committed のときのイメージID
    pub image_id: Option<String>,
    /// 実行ホストへ転送したメッセージ（順序どおり）
    pub messages: Vec<String>,
    pub error: Option<BuildError>,
}

impl BuildOutcome {
    pub fn is_committed(&self) -> bool {
        self.status == BuildStatus::Committed
    }
}

/// 実行ホストへのメッセージ送信口
pub trait MessageSink {
    fn send(&mut self, message: &str);
}

impl MessageSink for Vec<String> {
    fn send(&mut self, message: &str) {
        self.push(message.to_string());
    }
}

/// 転送しつつ結果用にも控える
struct Recorder<'s> {
    sink: &'s mut dyn MessageSink,
    messages: Vec<String>,
}

impl Recorder<'_> {
    fn send(&mut self, message: &str) {
        self.sink.send(message);
        self.messages.push(message.to_string());
    }
}

#[derive(Debug)]
pub struct BuildDriver {
    state: BuildState,
    timeout: Option<Duration>,
    remove_intermediate: bool,
}

impl BuildDriver {
    pub fn new(timeout: Option<Duration>, remove_intermediate: bool) -> Self {
        Self {
            state: BuildState::Idle,
            timeout,
            remove_intermediate,
        }
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    fn transition(&mut self, next: BuildState) {
        tracing::debug!("Build state: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// セルを書き換えてビルドし、成功したときだけセッション状態を更新する
    pub async fn run<E: ContainerEngine>(
        &mut self,
        engine: &E,
        state: &mut SessionState,
        raw: &str,
        sink: &mut dyn MessageSink,
    ) -> BuildOutcome {
        let mut recorder = Recorder {
            sink,
            messages: Vec::new(),
        };

        self.transition(BuildState::Staging);
        let rewrite = rewriter::rewrite(raw, state.current_image_id.as_deref(), &state.stages);
        for advisory in &rewrite.advisories {
            recorder.send(advisory);
        }
        tracing::debug!("Rewritten instruction:\n{}", rewrite.text);

        let result = match self.stage(state, &rewrite) {
            Ok(()) => {
                self.transition(BuildState::Building);
                self.build(engine, state, &mut recorder).await
            }
            Err(e) => Err(e),
        };

        let (status, image_id, error) = match result {
            Ok(image_id) => {
                commit(state, &rewrite, &image_id);
                self.transition(BuildState::Committed);
                tracing::info!("Successfully built: {}", image_id);
                (BuildStatus::Committed, Some(image_id), None)
            }
            Err(error) => {
                // エンジンのメッセージはそのまま1回だけ転送する
                recorder.send(&error.user_message());
                self.transition(BuildState::Failed);
                tracing::info!("Build failed: {}", error);
                (BuildStatus::Failed, None, Some(error))
            }
        };

        self.transition(BuildState::Idle);
        BuildOutcome {
            status,
            image_id,
            messages: recorder.messages,
            error,
        }
    }

    /// コンテキストが変わっていればコピーし直し、ビルド定義を書き出す
    fn stage(&self, state: &mut SessionState, rewrite: &Rewrite) -> Result<()> {
        let context = state.build_context_dir.clone();
        if state.staging.populated_from() != context.as_deref() {
            match &context {
                Some(dir) => {
                    let rules = IgnoreRules::load(dir)?;
                    state.staging.populate(dir, &rules)?;
                }
                None => state.staging.clear()?,
            }
        }
        let path = state.staging.write_build_file(&rewrite.text)?;
        tracing::debug!("Build file written: {}", path.display());
        Ok(())
    }

    async fn build<E: ContainerEngine>(
        &self,
        engine: &E,
        state: &SessionState,
        recorder: &mut Recorder<'_>,
    ) -> Result<String> {
        let request = BuildRequest {
            context_dir: state.staging.path(),
            dockerfile: state.staging.dockerfile_name(),
            build_args: &state.build_args,
            remove_intermediate: self.remove_intermediate,
        };
        if !state.build_args.is_empty() {
            tracing::debug!("Build args: {:?}", state.build_args);
        }

        let consume = consume(engine, request, recorder);
        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, consume)
                .await
                .unwrap_or(Err(BuildError::EngineTimeout(timeout))),
            None => consume.await,
        }
    }
}

/// レコードを順に処理し、エラーがあればそこで打ち切る
async fn consume<E: ContainerEngine>(
    engine: &E,
    request: BuildRequest<'_>,
    recorder: &mut Recorder<'_>,
) -> Result<String> {
    let mut stream = engine.build(request).await?;
    let mut image_id = None;

    while let Some(record) = stream.next().await {
        match record? {
            BuildRecord::Stream(text) => {
                if !text.trim().is_empty() {
                    recorder.send(&text);
                }
            }
            BuildRecord::Aux { id } => {
                tracing::debug!("Build produced image: {}", id);
                image_id = Some(id);
            }
            BuildRecord::Error(text) => return Err(BuildError::Engine(text)),
            BuildRecord::Other => {}
        }
    }

    image_id.ok_or_else(|| BuildError::Engine("build finished without an image id".to_string()))
}

/// ステージ表と現在のイメージを更新する
fn commit(state: &mut SessionState, rewrite: &Rewrite, image_id: &str) {
    for alias in &rewrite.opened {
        state.stages.open_stage(alias.as_deref());
    }
    // ステージが開く前の ARG やコメントだけのセルは延長先が無い
    if let Some(index) = state.stages.current_index() {
        if let Err(e) = state.stages.record_result(index, image_id) {
            tracing::warn!("Failed to record stage result: {}", e);
        }
    }
    state.current_image_id = Some(image_id.to_string());
}
