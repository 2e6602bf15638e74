//! 実行ホストへ返す結果

use crate::error::DirectiveError;
use dfkernel_build::{BuildError, Payload};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Ok,
    Error,
}

/// 構造化エラー（種別 + 人間向けメッセージ）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyError {
    pub kind: String,
    pub message: String,
}

impl From<&BuildError> for ReplyError {
    fn from(err: &BuildError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.user_message(),
        }
    }
}

impl From<&DirectiveError> for ReplyError {
    fn from(err: &DirectiveError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.user_message(),
        }
    }
}

/// 次の入力セルへの差し込み要求
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextInput {
    pub source: &'static str,
    pub text: String,
    pub replace: bool,
}

impl From<Payload> for NextInput {
    fn from(payload: Payload) -> Self {
        Self {
            source: "set_next_input",
            text: payload.text,
            replace: payload.replace,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecuteReply {
    pub status: ReplyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ReplyError>,
    /// 送った順のメッセージ
    pub messages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<NextInput>,
}

impl ExecuteReply {
    pub fn is_ok(&self) -> bool {
        self.status == ReplyStatus::Ok
    }
}
