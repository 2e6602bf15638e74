//! セル1つ分の実行
//!
//! ディレクティブ（`%name ...`）、ヘルプ要求（末尾 `?`）、通常のビルド命令の
//! いずれかに振り分け、結果を [`ExecuteReply`] にまとめる。

use crate::args;
use crate::registry::DirectiveRegistry;
use crate::reply::{ExecuteReply, NextInput, ReplyError, ReplyStatus};
use crate::target::DirectiveTarget;
use dfkernel_build::MessageSink;

const CONTEXT_WARNING: &str = "No build context is available. Instructions that read files \
    from the build context (COPY, ADD) will fail.\nUse %context <dir> to choose a directory.\n";

const REFERENCE_URL: &str = "https://docs.docker.com/reference/dockerfile/";

/// 転送しつつ返信用にも控える
struct Transcript<'s> {
    sink: &'s mut dyn MessageSink,
    messages: Vec<String>,
}

impl MessageSink for Transcript<'_> {
    fn send(&mut self, message: &str) {
        self.sink.send(message);
        self.messages.push(message.to_string());
    }
}

pub struct Kernel<T: DirectiveTarget> {
    target: T,
    registry: DirectiveRegistry,
    context_warning_shown: bool,
}

impl<T: DirectiveTarget> Kernel<T> {
    pub fn new(target: T) -> Self {
        Self::with_registry(target, DirectiveRegistry::builtin())
    }

    pub fn with_registry(target: T, registry: DirectiveRegistry) -> Self {
        Self {
            target,
            registry,
            context_warning_shown: false,
        }
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    pub fn into_target(self) -> T {
        self.target
    }

    pub fn registry(&self) -> &DirectiveRegistry {
        &self.registry
    }

    /// セルを実行する。メッセージは届いた順に `sink` へ流す
    pub async fn execute(&mut self, code: &str, sink: &mut dyn MessageSink) -> ExecuteReply {
        // 前回の差し込み要求は持ち越さない
        self.target.take_payload();

        let mut transcript = Transcript {
            sink,
            messages: Vec::new(),
        };
        let result = self.dispatch(code, &mut transcript).await;
        let payload = self.target.take_payload().map(NextInput::from);

        let (status, error) = match result {
            Ok(()) => (ReplyStatus::Ok, None),
            Err(error) => (ReplyStatus::Error, Some(error)),
        };
        ExecuteReply {
            status,
            error,
            messages: transcript.messages,
            payload,
        }
    }

    async fn dispatch(
        &mut self,
        code: &str,
        transcript: &mut Transcript<'_>,
    ) -> Result<(), ReplyError> {
        if code.trim().is_empty() {
            return Ok(());
        }

        if let Some((name, rest)) = args::split_directive(code) {
            return self.run_directive(name, rest, transcript).await;
        }

        if let Some(hook) = help_hook(code) {
            transcript.send(&help_message(hook));
            return Ok(());
        }

        if self.target.build_context_dir().is_none() && !self.context_warning_shown {
            transcript.send(CONTEXT_WARNING);
            self.context_warning_shown = true;
        }

        let outcome = self.target.build_cell(code, transcript).await;
        match &outcome.error {
            // メッセージはビルド中に転送済み
            Some(error) => Err(error.into()),
            None => Ok(()),
        }
    }

    async fn run_directive(
        &mut self,
        name: &str,
        rest: &str,
        transcript: &mut Transcript<'_>,
    ) -> Result<(), ReplyError> {
        let names = self.registry.names();
        let result = match self.registry.prepare(name, rest) {
            Ok(directive) => directive.apply(&mut self.target, &names, transcript).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(Some(outcome)) => match &outcome.error {
                Some(error) => Err(error.into()),
                None => Ok(()),
            },
            Ok(None) => Ok(()),
            Err(error) => {
                tracing::debug!("Directive %{} failed: {}", name, error);
                transcript.send(&error.user_message());
                Err(ReplyError::from(&error))
            }
        }
    }
}

/// `RUN?` のように `?` で終わるセルなら、最後の語を返す
fn help_hook(code: &str) -> Option<&str> {
    let code = code.trim_end().strip_suffix('?')?;
    Some(code.rsplit(char::is_whitespace).next().unwrap_or(code))
}

fn help_message(hook: &str) -> String {
    if hook.is_empty() {
        return format!("Dockerfile reference: {}\n", REFERENCE_URL);
    }
    format!(
        "{}: {}#{}\n",
        hook.to_uppercase(),
        REFERENCE_URL,
        hook.to_lowercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_help_hook() {
        assert_eq!(help_hook("RUN?"), Some("RUN"));
        assert_eq!(help_hook("COPY --from=x /a /b EXPOSE? \n"), Some("EXPOSE"));
        assert_eq!(help_hook("RUN echo hi"), None);
    }

    #[test]
    fn test_help_message() {
        assert_eq!(
            help_message("run"),
            "RUN: https://docs.docker.com/reference/dockerfile/#run\n"
        );
    }
}
