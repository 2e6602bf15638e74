use crate::error::{BuildError, Result};
use crate::ignore::{self, IgnoreRules};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs;
use std::path::{Path, PathBuf};
use tar::Builder;
use tempfile::TempDir;

pub struct ContextBuilder;

impl ContextBuilder {
    /// ステージングディレクトリをtar.gzアーカイブにする
    ///
    /// ビルド定義ファイルは既にディレクトリ内に書き出されている前提。
    pub fn create_context(context_path: &Path) -> Result<Vec<u8>> {
        tracing::debug!("Creating build context from: {}", context_path.display());

        let mut archive_data = Vec::new();
        {
            let encoder = GzEncoder::new(&mut archive_data, Compression::default());
            let mut tar = Builder::new(encoder);
            tar.follow_symlinks(false);

            tar.append_dir_all(".", context_path)
                .map_err(BuildError::Io)?;

            tar.into_inner()
                .and_then(|encoder| encoder.finish())
                .map_err(BuildError::Io)?;
        }

        tracing::debug!("Build context created: {} bytes", archive_data.len());
        Ok(archive_data)
    }
}

/// セッション専用の一時ディレクトリ
///
/// フィルタ済みのビルドコンテキストと、ビルドのたびに書き直すビルド定義
/// ファイルを置く。ドロップ時にディレクトリごと削除される。
#[derive(Debug)]
pub struct StagingDir {
    dir: TempDir,
    dockerfile_name: String,
    populated_from: Option<PathBuf>,
}

impl StagingDir {
    pub fn create(dockerfile_name: &str) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("dfkernel-")
            .tempdir()
            .map_err(|source| BuildError::Staging {
                path: std::env::temp_dir(),
                source,
            })?;
        tracing::debug!("Staging directory: {}", dir.path().display());

        Ok(Self {
            dir,
            dockerfile_name: dockerfile_name.to_string(),
            populated_from: None,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn dockerfile_name(&self) -> &str {
        &self.dockerfile_name
    }

    /// 現在の中身のコピー元
    pub fn populated_from(&self) -> Option<&Path> {
        self.populated_from.as_deref()
    }

    /// ディレクトリ自体は残して中身を空にする
    pub fn clear(&mut self) -> Result<()> {
        self.populated_from = None;
        let staging = |source| BuildError::Staging {
            path: self.dir.path().to_path_buf(),
            source,
        };

        for entry in fs::read_dir(self.dir.path()).map_err(staging)? {
            let entry = entry.map_err(staging)?;
            let path = entry.path();
            if entry.file_type().map_err(staging)?.is_dir() {
                fs::remove_dir_all(&path).map_err(staging)?;
            } else {
                fs::remove_file(&path).map_err(staging)?;
            }
        }
        Ok(())
    }

    /// 空にしてから `src` をフィルタ付きでコピーし直す
    pub fn populate(&mut self, src: &Path, rules: &IgnoreRules) -> Result<u64> {
        self.clear()?;
        let copied = ignore::copy_filtered(src, self.dir.path(), rules)?;
        self.populated_from = Some(src.to_path_buf());
        tracing::debug!(
            "Copied {} files from {} into staging",
            copied,
            src.display()
        );
        Ok(copied)
    }

    /// ビルド定義ファイルを書き出す
    pub fn write_build_file(&self, content: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(&self.dockerfile_name);
        fs::write(&path, content).map_err(|source| BuildError::Staging {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}
