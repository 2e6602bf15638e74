//! ディレクティブ名 → ハンドラの静的な表

use crate::args::{self, ArgSpec, DirectiveInput, FlagSpec};
use crate::directive::Directive;
use crate::error::{DirectiveError, Result};
use crate::handlers::{
    ArgHandler, ContextHandler, InstallHandler, MagicsHandler, StagesHandler, TagHandler,
};

/// 1つのディレクティブの入力仕様と解析
pub trait DirectiveHandler: Send + Sync {
    /// `%` を除いた小文字の名前
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn arguments(&self) -> ArgSpec {
        ArgSpec::NONE
    }

    fn flags(&self) -> &'static [FlagSpec] {
        &[]
    }

    /// 件数・フラグの検証を通った入力から、ディレクティブを組み立てる
    fn parse(&self, input: DirectiveInput) -> Result<Directive>;
}

static BUILTIN: &[&dyn DirectiveHandler] = &[
    &ArgHandler,
    &ContextHandler,
    &InstallHandler,
    &MagicsHandler,
    &StagesHandler,
    &TagHandler,
];

#[derive(Clone)]
pub struct DirectiveRegistry {
    handlers: Vec<&'static dyn DirectiveHandler>,
}

impl DirectiveRegistry {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// 組み込みのディレクティブをすべて登録した表
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for handler in BUILTIN {
            registry.register(*handler);
        }
        registry
    }

    /// 同名があれば置き換える
    pub fn register(&mut self, handler: &'static dyn DirectiveHandler) {
        self.handlers.retain(|h| h.name() != handler.name());
        self.handlers.push(handler);
    }

    /// 完全一致で探す
    pub fn find(&self, name: &str) -> Option<&'static dyn DirectiveHandler> {
        self.handlers.iter().copied().find(|h| h.name() == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.handlers.iter().map(|h| h.name()).collect();
        names.sort_unstable();
        names
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static dyn DirectiveHandler> + '_ {
        self.handlers.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// `%name ...` の名前以降を解析する
    pub fn prepare(&self, name: &str, rest: &str) -> Result<Directive> {
        let handler = self
            .find(&name.to_lowercase())
            .ok_or_else(|| DirectiveError::Unknown(name.to_string()))?;
        let input = args::parse_input(rest, handler.arguments(), handler.flags())?;
        tracing::debug!("Directive %{} with {:?}", handler.name(), input);
        handler.parse(input)
    }
}

impl Default for DirectiveRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
