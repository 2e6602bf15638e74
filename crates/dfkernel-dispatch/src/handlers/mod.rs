//! 組み込みディレクティブ

mod arg;
mod context;
mod install;
mod stages;
mod tag;

pub use arg::ArgHandler;
pub use context::ContextHandler;
pub use install::InstallHandler;
pub use stages::{MagicsHandler, StagesHandler};
pub use tag::TagHandler;
