use dfkernel_build::{BuildError, BuildRecord, BuildRequest, ContainerEngine, RecordStream, Result};
use futures_util::stream::{self, StreamExt};
use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::Mutex;

/// エンジンが1回のビルドで返す内容
#[allow(dead_code)]
pub enum Script {
    Records(Vec<BuildRecord>),
    /// レコードを流した後で接続が切れる
    Interrupted(Vec<BuildRecord>, String),
    /// ビルド開始自体が失敗する
    Transport(String),
    /// いつまでも終わらない
    Hang,
}

/// エンジンが受け取ったビルド要求
#[derive(Debug, Clone)]
pub struct BuildCall {
    pub dockerfile: String,
    pub files: Vec<String>,
    pub build_args: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCall {
    pub image_id: String,
    pub repo: String,
    pub tag: Option<String>,
}

/// 台本どおりに応答するエンジン
#[derive(Default)]
pub struct FakeEngine {
    scripts: Mutex<VecDeque<Script>>,
    calls: Mutex<Vec<BuildCall>>,
    tags: Mutex<Vec<TagCall>>,
    tag_error: Mutex<Option<String>>,
}

#[allow(dead_code)]
impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, script: Script) {
        self.scripts.lock().unwrap().push_back(script);
    }

    pub fn succeed(&self, image_id: &str) {
        self.push(Script::Records(vec![
            BuildRecord::Stream("Step 1/1 : ...\n".to_string()),
            BuildRecord::Stream("\n".to_string()),
            BuildRecord::Aux {
                id: image_id.to_string(),
            },
            BuildRecord::Stream(format!("Successfully built {}\n", image_id)),
        ]));
    }

    pub fn fail(&self, message: &str) {
        self.push(Script::Records(vec![
            BuildRecord::Stream("Step 2/2 : RUN false\n".to_string()),
            BuildRecord::Error(message.to_string()),
            BuildRecord::Stream("never forwarded\n".to_string()),
        ]));
    }

    pub fn reject_tags(&self, message: &str) {
        *self.tag_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<BuildCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_dockerfile(&self) -> String {
        self.calls
            .lock()
            .unwrap()
            .last()
            .map(|call| call.dockerfile.clone())
            .unwrap_or_default()
    }

    pub fn tags(&self) -> Vec<TagCall> {
        self.tags.lock().unwrap().clone()
    }
}

impl ContainerEngine for FakeEngine {
    async fn build<'a>(&'a self, request: BuildRequest<'_>) -> Result<RecordStream<'a>> {
        let dockerfile =
            fs::read_to_string(request.context_dir.join(request.dockerfile)).unwrap_or_default();
        let mut files = list_files(request.context_dir, request.context_dir);
        files.retain(|file| file != request.dockerfile);
        files.sort();

        self.calls.lock().unwrap().push(BuildCall {
            dockerfile,
            files,
            build_args: request.build_args.clone(),
        });

        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            Some(Script::Records(records)) => Ok(stream::iter(records.into_iter().map(Ok)).boxed()),
            Some(Script::Interrupted(records, error)) => Ok(stream::iter(
                records
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(BuildError::Engine(error)))),
            )
            .boxed()),
            Some(Script::Transport(message)) => Err(BuildError::Engine(message)),
            Some(Script::Hang) => Ok(stream::pending().boxed()),
            None => Err(BuildError::Engine("no scripted build".to_string())),
        }
    }

    async fn tag(&self, image_id: &str, repo: &str, tag: Option<&str>) -> Result<()> {
        if let Some(message) = self.tag_error.lock().unwrap().clone() {
            return Err(BuildError::Engine(message));
        }
        self.tags.lock().unwrap().push(TagCall {
            image_id: image_id.to_string(),
            repo: repo.to_string(),
            tag: tag.map(str::to_string),
        });
        Ok(())
    }
}

fn list_files(root: &Path, dir: &Path) -> Vec<String> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            files.extend(list_files(root, &path));
        } else {
            let rel = path.strip_prefix(root).unwrap();
            files.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }
    files
}
