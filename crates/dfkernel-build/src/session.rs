//! セッション状態と、ディレクティブから呼ばれる操作

use crate::context::StagingDir;
use crate::driver::{BuildDriver, BuildOutcome, BuildState, MessageSink};
use crate::engine::ContainerEngine;
use crate::error::{BuildError, Result};
use crate::ignore::{self, IgnoreRules};
use crate::rewriter::{self, Rewrite};
use crate::stage::{Stage, StageTable};
use dfkernel_config::KernelConfig;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// ビルドドライバだけが書き換えるセッションの中身
#[derive(Debug)]
pub struct SessionState {
    pub(crate) current_image_id: Option<String>,
    pub(crate) build_args: BTreeMap<String, String>,
    pub(crate) build_context_dir: Option<PathBuf>,
    pub(crate) stages: StageTable,
    pub(crate) staging: StagingDir,
}

/// 次の入力セルに差し込むテキスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub text: String,
    /// 現在のセルを置き換えるか
    pub replace: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelInfo {
    pub image_id: Option<String>,
    pub build_context: Option<PathBuf>,
    pub stages: usize,
}

/// ビルド引数の削除対象
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgSelection {
    All,
    Names(Vec<String>),
}

pub struct Session<E: ContainerEngine> {
    engine: E,
    state: SessionState,
    driver: BuildDriver,
    context_size_limit: u64,
    payload: Option<Payload>,
}

impl<E: ContainerEngine> Session<E> {
    /// ビルドコンテキスト無しでセッションを作る
    ///
    /// ステージングディレクトリを作れない場合だけ失敗する。
    pub fn new(engine: E, config: &KernelConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| BuildError::InvalidConfig(e.to_string()))?;

        let staging = StagingDir::create(&config.dockerfile_name)?;
        Ok(Self {
            engine,
            state: SessionState {
                current_image_id: None,
                build_args: BTreeMap::new(),
                build_context_dir: None,
                stages: StageTable::new(),
                staging,
            },
            driver: BuildDriver::new(config.build_timeout(), config.remove_intermediate),
            context_size_limit: config.context_size_limit,
            payload: None,
        })
    }

    /// `initial_context` を使えればビルドコンテキストにしてセッションを作る
    ///
    /// 大きすぎる・存在しないなどで使えない場合はコンテキスト無しで始める。
    pub fn open(engine: E, config: &KernelConfig, initial_context: &Path) -> Result<Self> {
        let mut session = Self::new(engine, config)?;
        if let Err(e) = session.set_build_context(Some(initial_context)) {
            tracing::warn!(
                "Starting without build context ({}): {}",
                initial_context.display(),
                e
            );
        }
        Ok(session)
    }

    /// セルをビルドする。メッセージは結果の `messages` に集める
    pub async fn rewrite_and_build(&mut self, raw: &str) -> BuildOutcome {
        let mut sink: Vec<String> = Vec::new();
        self.rewrite_and_build_with(raw, &mut sink).await
    }

    /// メッセージを届いた順に `sink` へも流しながらビルドする
    pub async fn rewrite_and_build_with(
        &mut self,
        raw: &str,
        sink: &mut dyn MessageSink,
    ) -> BuildOutcome {
        tracing::info!("Building cell ({} bytes)", raw.len());
        self.driver
            .run(&self.engine, &mut self.state, raw, sink)
            .await
    }

    /// ビルドせずに書き換え結果だけを得る
    pub fn rewrite(&self, raw: &str) -> Rewrite {
        rewriter::rewrite(
            raw,
            self.state.current_image_id.as_deref(),
            &self.state.stages,
        )
    }

    pub fn resolve_stage(&self, token: &str) -> Result<String> {
        self.state.stages.resolve(token).map(str::to_string)
    }

    pub fn list_stages(&self) -> Vec<Stage> {
        self.state.stages.stages().to_vec()
    }

    pub fn stage_table(&self) -> &StageTable {
        &self.state.stages
    }

    /// ビルドコンテキストを切り替える。`None` ならコンテキスト無し
    ///
    /// 検証に失敗した場合は以前のコンテキストのまま。
    pub fn set_build_context(&mut self, dir: Option<&Path>) -> Result<()> {
        let Some(dir) = dir else {
            self.state.staging.clear()?;
            self.state.build_context_dir = None;
            tracing::info!("Build context cleared");
            return Ok(());
        };

        let (dir, rules) = self.check_context(dir)?;
        self.state.staging.populate(&dir, &rules)?;
        tracing::info!("Build context changed: {}", dir.display());
        self.state.build_context_dir = Some(dir);
        Ok(())
    }

    fn check_context(&self, dir: &Path) -> Result<(PathBuf, IgnoreRules)> {
        if !dir.exists() {
            return Err(BuildError::ContextNotFound(dir.to_path_buf()));
        }
        if !dir.is_dir() {
            return Err(BuildError::NotADirectory(dir.to_path_buf()));
        }
        let dir = dir
            .canonicalize()
            .map_err(|_| BuildError::ContextNotFound(dir.to_path_buf()))?;

        let rules = IgnoreRules::load(&dir)?;
        let size = ignore::dir_size(&dir, &rules, Some(self.state.staging.path()))?;
        tracing::debug!("Build context size: {} bytes ({})", size, dir.display());
        if size > self.context_size_limit {
            tracing::warn!(
                "Build context too large: {} bytes (limit {})",
                size,
                self.context_size_limit
            );
            return Err(BuildError::ContextTooLarge {
                path: dir,
                size,
                limit: self.context_size_limit,
            });
        }
        Ok((dir, rules))
    }

    /// 同名は後勝ち
    pub fn update_build_args<I, K, V>(&mut self, args: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in args {
            let name = name.into();
            let value = value.into();
            tracing::debug!("Build arg set: {}={}", name, value);
            self.state.build_args.insert(name, value);
        }
    }

    /// 実際に削除した名前を返す。存在しない名前は無視する
    pub fn remove_build_args(&mut self, selection: ArgSelection) -> Vec<String> {
        match selection {
            ArgSelection::All => {
                let removed = self.state.build_args.keys().cloned().collect();
                self.state.build_args.clear();
                removed
            }
            ArgSelection::Names(names) => names
                .into_iter()
                .filter(|name| self.state.build_args.remove(name).is_some())
                .collect(),
        }
    }

    pub fn build_args(&self) -> &BTreeMap<String, String> {
        &self.state.build_args
    }

    /// 現在のイメージにタグを付ける
    pub async fn tag_image(&self, name: &str, tag: Option<&str>) -> Result<String> {
        let image_id = self
            .state
            .current_image_id
            .as_deref()
            .ok_or(BuildError::NoImageYet)?;
        self.tag_image_id(image_id, name, tag).await
    }

    /// ステージ（エイリアスまたはインデックス）のイメージにタグを付ける
    pub async fn tag_stage(&self, stage: &str, name: &str, tag: Option<&str>) -> Result<String> {
        let image_id = self.state.stages.resolve(stage)?;
        self.tag_image_id(image_id, name, tag).await
    }

    async fn tag_image_id(&self, image_id: &str, name: &str, tag: Option<&str>) -> Result<String> {
        self.engine.tag(image_id, name, tag).await?;
        tracing::info!("Tagged {} as {}:{}", image_id, name, tag.unwrap_or("latest"));
        Ok(format!(
            "Image {} is tagged with: {}:{}",
            short_id(image_id),
            name,
            tag.unwrap_or("latest")
        ))
    }

    pub fn current_image_id(&self) -> Option<&str> {
        self.state.current_image_id.as_deref()
    }

    pub fn build_context_dir(&self) -> Option<&Path> {
        self.state.build_context_dir.as_deref()
    }

    pub fn staging_dir(&self) -> &Path {
        self.state.staging.path()
    }

    pub fn build_state(&self) -> BuildState {
        self.driver.state()
    }

    /// 次の入力セルの内容を実行ホストへ依頼する
    pub fn set_next_input(&mut self, text: impl Into<String>, replace: bool) {
        self.payload = Some(Payload {
            text: text.into(),
            replace,
        });
    }

    pub fn take_payload(&mut self) -> Option<Payload> {
        self.payload.take()
    }

    pub fn kernel_info(&self) -> KernelInfo {
        KernelInfo {
            image_id: self.state.current_image_id.clone(),
            build_context: self.state.build_context_dir.clone(),
            stages: self.state.stages.len(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}

/// `sha256:` を外した先頭12文字
fn short_id(image_id: &str) -> &str {
    let id = image_id
        .split_once(':')
        .map(|(_, digest)| digest)
        .unwrap_or(image_id);
    id.get(..12).unwrap_or(id)
}
