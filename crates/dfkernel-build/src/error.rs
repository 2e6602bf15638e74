use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Unknown build stage: {0}")]
    UnknownStage(String),

    #[error("Build context directory not found: {0}")]
    ContextNotFound(PathBuf),

    #[error("Build context is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Build context too large: {path} ({size} bytes, limit {limit} bytes)")]
    ContextTooLarge {
        path: PathBuf,
        size: u64,
        limit: u64,
    },

    #[error("no valid image, please build the image first")]
    NoImageYet,

    /// デーモンが返したメッセージをそのまま保持する
    #[error("{0}")]
    Engine(String),

    #[error("Build did not finish within {0:?}")]
    EngineTimeout(Duration),

    #[error("Failed to stage build context at {path}: {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid build configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// 実行ホストへ返す構造化エラーの種別名
    pub fn kind(&self) -> &'static str {
        match self {
            BuildError::UnknownStage(_) => "UnknownStage",
            BuildError::ContextNotFound(_) | BuildError::NotADirectory(_) => {
                "InvalidContextPath"
            }
            BuildError::ContextTooLarge { .. } => "ContextTooLarge",
            BuildError::NoImageYet => "NoImageYet",
            BuildError::Engine(_) => "EngineError",
            BuildError::EngineTimeout(_) => "EngineTimeout",
            BuildError::Staging { .. } => "StagingError",
            BuildError::InvalidConfig(_) => "ConfigError",
            BuildError::Io(_) => "IoError",
        }
    }

    /// ユーザー向けの分かりやすいエラーメッセージ
    ///
    /// エンジンのメッセージは唯一の手がかりであることが多いため加工しない。
    pub fn user_message(&self) -> String {
        match self {
            BuildError::Engine(msg) => msg.clone(),
            BuildError::ContextNotFound(path) => {
                format!(
                    "ビルドコンテキストが見つかりません: {}\n\
                     \n\
                     ディレクトリのパスを確認してください。",
                    path.display()
                )
            }
            BuildError::NotADirectory(path) => {
                format!(
                    "ビルドコンテキストはディレクトリではありません: {}",
                    path.display()
                )
            }
            BuildError::ContextTooLarge { path, size, limit } => {
                format!(
                    "ビルドコンテキストが大きすぎます: {}（{}MB、上限 {}MB）\n\
                     \n\
                     .dockerignoreファイルで不要なファイルを除外してください。",
                    path.display(),
                    size / 1024 / 1024,
                    limit / 1024 / 1024
                )
            }
            BuildError::NoImageYet => {
                "イメージがまだありません。先にイメージをビルドしてください".to_string()
            }
            BuildError::EngineTimeout(timeout) => {
                format!(
                    "ビルドが {} 秒以内に完了しませんでした。\n\
                     \n\
                     Dockerデーモンが応答しているか確認してください。",
                    timeout.as_secs()
                )
            }
            _ => format!("{}", self),
        }
    }
}

impl From<bollard::errors::Error> for BuildError {
    fn from(err: bollard::errors::Error) -> Self {
        match err {
            // デーモンの説明文だけを取り出す
            bollard::errors::Error::DockerResponseServerError { message, .. } => {
                BuildError::Engine(message)
            }
            other => BuildError::Engine(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;
