use crate::args::{ArgSpec, DirectiveInput};
use crate::directive::Directive;
use crate::error::{DirectiveError, Result};
use crate::registry::DirectiveHandler;
use std::path::PathBuf;

/// `%context <dir>`
///
/// 存在確認・サイズ確認はセッション側で行う。
pub struct ContextHandler;

impl DirectiveHandler for ContextHandler {
    fn name(&self) -> &'static str {
        "context"
    }

    fn description(&self) -> &'static str {
        "Change the directory used as build context"
    }

    fn arguments(&self) -> ArgSpec {
        ArgSpec {
            names: &["directory_path"],
            required: 1,
        }
    }

    fn parse(&self, input: DirectiveInput) -> Result<Directive> {
        let dir = input.arg(0).ok_or(DirectiveError::MissingArgument {
            name: "directory_path",
            position: 1,
        })?;
        Ok(Directive::Context(PathBuf::from(dir)))
    }
}
