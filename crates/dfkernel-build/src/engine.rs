//! コンテナエンジン（Dockerデーモン）との境界

use crate::context::ContextBuilder;
use crate::error::{BuildError, Result};
use bollard::Docker;
use bollard::models::BuildInfo;
use bollard::query_parameters::{BuildImageOptionsBuilder, TagImageOptionsBuilder};
use futures_util::stream::{BoxStream, StreamExt};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// ビルド中にエンジンが流してくるレコード
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildRecord {
    /// 人間向けの進捗テキスト
    Stream(String),
    /// ビルド結果のイメージID
    Aux { id: String },
    /// ビルドエラー
    Error(String),
    /// pull の進捗など、転送しないレコード
    Other,
}

impl From<BuildInfo> for BuildRecord {
    fn from(info: BuildInfo) -> Self {
        if let Some(error) = info.error {
            return BuildRecord::Error(error);
        }
        if let Some(detail) = info.error_detail {
            return BuildRecord::Error(
                detail
                    .message
                    .unwrap_or_else(|| "Unknown build error".to_string()),
            );
        }
        if let Some(id) = info.aux.and_then(|aux| aux.id) {
            return BuildRecord::Aux { id };
        }
        if let Some(stream) = info.stream {
            return BuildRecord::Stream(stream);
        }
        BuildRecord::Other
    }
}

/// 1ラウンド分のビルド要求
#[derive(Debug, Clone, Copy)]
pub struct BuildRequest<'a> {
    pub context_dir: &'a Path,
    /// コンテキスト内のビルド定義ファイル名
    pub dockerfile: &'a str,
    pub build_args: &'a BTreeMap<String, String>,
    pub remove_intermediate: bool,
}

pub type RecordStream<'a> = BoxStream<'a, Result<BuildRecord>>;

/// コンテナエンジンのトレイト
#[allow(async_fn_in_trait)]
pub trait ContainerEngine {
    /// ビルドを開始し、レコードをエンジンが出した順に返すストリームを得る
    async fn build<'a>(&'a self, request: BuildRequest<'_>) -> Result<RecordStream<'a>>;

    /// `tag` が `None` ならデーモン側のデフォルト（latest）
    async fn tag(&self, image_id: &str, repo: &str, tag: Option<&str>) -> Result<()>;
}

/// bollard 経由で Docker デーモンを使う実装
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// `host` が無ければローカルのデフォルト、`unix://` ならソケット、それ以外は HTTP
    pub fn connect(host: Option<&str>) -> Result<Self> {
        const TIMEOUT_SECS: u64 = 120;

        let docker = match host {
            None => Docker::connect_with_local_defaults()?,
            Some(host) if host.starts_with("unix://") => {
                Docker::connect_with_socket(host, TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)?
            }
            Some(host) => {
                Docker::connect_with_http(host, TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)?
            }
        };
        Ok(Self::new(docker))
    }
}

impl ContainerEngine for DockerEngine {
    async fn build<'a>(&'a self, request: BuildRequest<'_>) -> Result<RecordStream<'a>> {
        use bytes::Bytes;
        use http_body_util::{Either, Full};

        let context_data = ContextBuilder::create_context(request.context_dir)?;

        let build_args: HashMap<String, String> = request
            .build_args
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let options = BuildImageOptionsBuilder::default()
            .dockerfile(request.dockerfile)
            .buildargs(&build_args)
            .rm(request.remove_intermediate)
            // ビルド失敗時も中間コンテナを削除
            .forcerm(request.remove_intermediate)
            .build();

        tracing::debug!("Build options: {:?}", options);

        let body = Full::new(Bytes::from(context_data));
        let stream = self
            .docker
            .build_image(options, None, Some(Either::Left(body)))
            .map(|item| item.map(BuildRecord::from).map_err(BuildError::from));

        Ok(stream.boxed())
    }

    async fn tag(&self, image_id: &str, repo: &str, tag: Option<&str>) -> Result<()> {
        let mut options = TagImageOptionsBuilder::default().repo(repo);
        if let Some(tag) = tag {
            options = options.tag(tag);
        }
        self.docker.tag_image(image_id, Some(options.build())).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::{ErrorDetail, ImageId};

    #[test]
    fn test_classify_stream() {
        let info = BuildInfo {
            stream: Some("Step 1/2 : FROM alpine\n".to_string()),
            ..Default::default()
        };
        assert_eq!(
            BuildRecord::from(info),
            BuildRecord::Stream("Step 1/2 : FROM alpine\n".to_string())
        );
    }

    #[test]
    fn test_classify_aux() {
        let info = BuildInfo {
            aux: Some(ImageId {
                id: Some("sha256:aaa".to_string()),
            }),
            ..Default::default()
        };
        assert_eq!(
            BuildRecord::from(info),
            BuildRecord::Aux {
                id: "sha256:aaa".to_string()
            }
        );
    }

    #[test]
    fn test_classify_error_detail() {
        let info = BuildInfo {
            error_detail: Some(ErrorDetail {
                code: None,
                message: Some("returned a non-zero code: 1".to_string()),
            }),
            ..Default::default()
        };
        assert_eq!(
            BuildRecord::from(info),
            BuildRecord::Error("returned a non-zero code: 1".to_string())
        );
    }

    #[test]
    fn test_classify_status_only() {
        let info = BuildInfo {
            status: Some("Downloading".to_string()),
            ..Default::default()
        };
        assert_eq!(BuildRecord::from(info), BuildRecord::Other);
    }

    #[tokio::test]
    #[ignore] // Docker接続が必要なため、通常のテストではスキップ
    async fn test_build_simple_image() {
        let engine = DockerEngine::connect(None).unwrap();

        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join("Dockerfile"), "FROM alpine:latest\nCMD echo 'test'")
            .unwrap();

        let args = BTreeMap::new();
        let request = BuildRequest {
            context_dir: temp_dir.path(),
            dockerfile: "Dockerfile",
            build_args: &args,
            remove_intermediate: true,
        };

        let mut stream = engine.build(request).await.unwrap();
        let mut image_id = None;
        while let Some(record) = stream.next().await {
            if let BuildRecord::Aux { id } = record.unwrap() {
                image_id = Some(id);
            }
        }
        assert!(image_id.unwrap().starts_with("sha256:"));
    }
}
