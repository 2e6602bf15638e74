pub mod error;

pub use error::*;

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// ビルドコンテキストとして許容する最大サイズ（100MiB）
pub const DEFAULT_CONTEXT_SIZE_LIMIT: u64 = 104_857_600;

/// ステージングディレクトリに書き出すビルド定義ファイル名
pub const DEFAULT_DOCKERFILE_NAME: &str = "Dockerfile";

const CANDIDATES: [&str; 4] = [
    "dfkernel.local.yaml",
    ".dfkernel.local.yaml",
    "dfkernel.yaml",
    ".dfkernel.yaml",
];

/// カーネル全体の設定
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KernelConfig {
    /// これを超えるディレクトリはビルドコンテキストとして採用しない
    pub context_size_limit: u64,
    /// `unix://...` または `tcp://...`。未指定ならローカルのデフォルト接続
    pub docker_host: Option<String>,
    /// 1ラウンドのビルドに許す秒数。未指定なら無制限
    pub build_timeout_secs: Option<u64>,
    pub dockerfile_name: String,
    /// 中間コンテナを削除する（docker build --rm）
    pub remove_intermediate: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            context_size_limit: DEFAULT_CONTEXT_SIZE_LIMIT,
            docker_host: None,
            build_timeout_secs: None,
            dockerfile_name: DEFAULT_DOCKERFILE_NAME.to_string(),
            remove_intermediate: true,
        }
    }
}

impl KernelConfig {
    pub fn build_timeout(&self) -> Option<Duration> {
        self.build_timeout_secs.map(Duration::from_secs)
    }

    /// YAMLファイルから設定を読み込む
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: KernelConfig =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// 設定ファイルを探して読み込む。見つからなければデフォルト値
    pub fn discover() -> Result<Self> {
        match find_config_file() {
            Ok(path) => Self::load_from(&path),
            Err(ConfigError::ConfigNotFound) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// ビルド定義ファイル名はステージングディレクトリ直下のファイル名でなければならない
    pub fn validate(&self) -> Result<()> {
        let name = self.dockerfile_name.as_str();
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains('/')
            || name.contains('\\')
        {
            return Err(ConfigError::Invalid(format!(
                "dockerfile_name はファイル名のみ指定できます: '{}'",
                name
            )));
        }
        if self.build_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "build_timeout_secs は 1 以上を指定してください".to_string(),
            ));
        }
        Ok(())
    }
}

/// グローバル設定ファイルのパス（~/.config/dfkernel/config.yaml）
///
/// パスを組み立てるだけで、ディレクトリは作らない。
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dfkernel").join("config.yaml"))
}

/// 設定ファイルを探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 DFKERNEL_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリ: dfkernel.local.yaml, .dfkernel.local.yaml, dfkernel.yaml, .dfkernel.yaml
/// 3. ~/.config/dfkernel/config.yaml (グローバル設定)
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var("DFKERNEL_CONFIG_PATH") {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;
    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    if let Some(global_config) = global_config_path() {
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    fn test_default_values() {
        let config = KernelConfig::default();
        assert_eq!(config.context_size_limit, 104_857_600);
        assert_eq!(config.dockerfile_name, "Dockerfile");
        assert!(config.remove_intermediate);
        assert_eq!(config.build_timeout(), None);
    }

    #[test]
    fn test_load_partial_yaml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("dfkernel.yaml");
        fs::write(&path, "context_size_limit: 1024\nbuild_timeout_secs: 30\n").unwrap();

        let config = KernelConfig::load_from(&path).unwrap();
        assert_eq!(config.context_size_limit, 1024);
        assert_eq!(config.build_timeout(), Some(Duration::from_secs(30)));
        // 未指定の項目はデフォルト
        assert_eq!(config.dockerfile_name, "Dockerfile");
    }

    #[test]
    fn test_load_rejects_unknown_field() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("dfkernel.yaml");
        fs::write(&path, "contxt_size_limit: 1\n").unwrap();

        let result = KernelConfig::load_from(&path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_validate_dockerfile_name() {
        let config = KernelConfig {
            dockerfile_name: "../Dockerfile".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = KernelConfig {
            dockerfile_name: "Dockerfile.cell".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let config = KernelConfig {
            build_timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_find_config_file_local_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("dfkernel.yaml"), "context_size_limit: 1").unwrap();
        fs::write(temp_dir.path().join("dfkernel.local.yaml"), "{}").unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();

        let result = temp_env::with_var_unset("DFKERNEL_CONFIG_PATH", find_config_file);

        std::env::set_current_dir(original_dir).unwrap();

        // dfkernel.local.yaml が優先される
        assert!(result.unwrap().ends_with("dfkernel.local.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_config_file_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.yaml");
        fs::write(&config_path, "{}").unwrap();

        let result = temp_env::with_var(
            "DFKERNEL_CONFIG_PATH",
            Some(config_path.to_str().unwrap()),
            find_config_file,
        );
        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    #[serial]
    fn test_discover_falls_back_to_default() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = temp_env::with_vars(
            [
                ("DFKERNEL_CONFIG_PATH", None::<&str>),
                ("XDG_CONFIG_HOME", Some(temp_dir.path().to_str().unwrap())),
                ("HOME", Some(temp_dir.path().to_str().unwrap())),
            ],
            KernelConfig::discover,
        );

        std::env::set_current_dir(original_dir).unwrap();

        assert_eq!(result.unwrap(), KernelConfig::default());
    }

    #[cfg(target_os = "linux")]
    #[test]
    #[serial]
    fn test_find_global_config() {
        let temp_dir = tempfile::tempdir().unwrap();
        let work_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();
        let global_dir = temp_dir.path().join("dfkernel");
        fs::create_dir(&global_dir).unwrap();
        fs::write(global_dir.join("config.yaml"), "context_size_limit: 1").unwrap();

        std::env::set_current_dir(&work_dir).unwrap();
        let result = temp_env::with_vars(
            [
                ("DFKERNEL_CONFIG_PATH", None::<&str>),
                ("XDG_CONFIG_HOME", Some(temp_dir.path().to_str().unwrap())),
            ],
            find_config_file,
        );
        std::env::set_current_dir(original_dir).unwrap();

        assert_eq!(result.unwrap(), global_dir.join("config.yaml"));
    }

    /// 探索だけで設定ディレクトリを作らない
    #[cfg(target_os = "linux")]
    #[test]
    #[serial]
    fn test_search_does_not_create_config_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let (path, result) = temp_env::with_vars(
            [
                ("DFKERNEL_CONFIG_PATH", None::<&str>),
                ("XDG_CONFIG_HOME", Some(temp_dir.path().to_str().unwrap())),
            ],
            || (global_config_path(), find_config_file()),
        );
        std::env::set_current_dir(original_dir).unwrap();

        assert_eq!(path.unwrap(), temp_dir.path().join("dfkernel/config.yaml"));
        assert!(matches!(result, Err(ConfigError::ConfigNotFound)));
        assert!(!temp_dir.path().join("dfkernel").exists());
    }
}
