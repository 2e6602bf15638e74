//! dfkernel のビルドコア
//!
//! ノートブックのセルを1つずつ受け取り、直前にビルドしたイメージを土台に
//! 差分ビルドしていく。マルチステージビルドのステージはインデックスと
//! エイリアスで参照できる。

pub mod context;
pub mod driver;
pub mod engine;
pub mod error;
pub mod ignore;
pub mod instruction;
pub mod rewriter;
pub mod session;
pub mod stage;

pub use context::{ContextBuilder, StagingDir};
pub use driver::{BuildDriver, BuildOutcome, BuildState, BuildStatus, MessageSink};
pub use engine::{BuildRecord, BuildRequest, ContainerEngine, DockerEngine, RecordStream};
pub use error::{BuildError, Result};
pub use ignore::{IgnoreRule, IgnoreRules};
pub use rewriter::Rewrite;
pub use session::{ArgSelection, KernelInfo, Payload, Session};
pub use stage::{Stage, StageTable};
