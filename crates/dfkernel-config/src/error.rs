use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "設定ファイルが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリ: dfkernel.local.yaml, .dfkernel.local.yaml, dfkernel.yaml, .dfkernel.yaml\n\
        - ~/.config/dfkernel/config.yaml\n\
        または DFKERNEL_CONFIG_PATH 環境変数で直接指定できます"
    )]
    ConfigNotFound,

    #[error("設定ファイルの解析に失敗しました: {path}\n{source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("設定値が不正です: {0}")]
    Invalid(String),

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
