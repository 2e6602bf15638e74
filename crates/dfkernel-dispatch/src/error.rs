use dfkernel_build::BuildError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectiveError {
    #[error("No directive named {0}")]
    Unknown(String),

    #[error("Missing argument: {name} at position {position}")]
    MissingArgument { name: &'static str, position: usize },

    #[error("Argument at position {position} is not valid: {message}")]
    InvalidArgument { position: usize, message: String },

    #[error("No argument is needed")]
    NoArgumentNeeded,

    #[error("Unknown flag: {0}")]
    UnknownFlag(String),

    #[error("No value for flag: {0}")]
    MissingFlagValue(String),

    #[error("Duplicate flag: --{0}")]
    DuplicateFlag(String),

    #[error("'{0}' does not match input format, expected format: '<name>=<value>'")]
    InvalidBuildArg(String),

    #[error(
        "Package manager not available: {0} (currently available: apt(-get), conda, conda-forge, npm, pip)"
    )]
    UnsupportedPackageManager(String),

    #[error(transparent)]
    Build(#[from] BuildError),
}

impl DirectiveError {
    /// 実行結果に載せるエラー種別
    pub fn kind(&self) -> &'static str {
        match self {
            DirectiveError::Build(e) => e.kind(),
            _ => "DirectiveError",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            DirectiveError::Build(e) => e.user_message(),
            DirectiveError::Unknown(name) => {
                format!(
                    "{}\n\n%magics で利用可能なディレクティブを確認してください。",
                    DirectiveError::Unknown(name.clone())
                )
            }
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DirectiveError>;
