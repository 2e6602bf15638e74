//! dfkernel のディレクティブ振り分け
//!
//! `%` で始まるセルは静的な表からハンドラを引いて解析し、能力ごとのトレイト
//! ([`target`]) 経由でセッションに適用する。それ以外のセルはビルドに回す。

pub mod args;
pub mod directive;
pub mod error;
pub mod handlers;
pub mod kernel;
pub mod registry;
pub mod reply;
pub mod target;

pub use directive::Directive;
pub use error::{DirectiveError, Result};
pub use kernel::Kernel;
pub use registry::{DirectiveHandler, DirectiveRegistry};
pub use reply::{ExecuteReply, NextInput, ReplyError, ReplyStatus};
pub use target::{BuildArgs, CellBuilder, ContextControl, DirectiveTarget, StageView, Tagging};
