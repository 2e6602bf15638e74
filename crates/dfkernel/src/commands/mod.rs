pub mod directives;
pub mod repl;
pub mod run;

use crate::progress::CellProgress;
use colored::Colorize;
use dfkernel_build::{DockerEngine, Session};
use dfkernel_config::KernelConfig;
use dfkernel_dispatch::{ExecuteReply, Kernel};
use std::path::Path;

pub type DockerKernel = Kernel<Session<DockerEngine>>;

/// デーモンへの接続とセッションの準備
///
/// 接続自体は遅延されるので、デーモンが無くてもここでは失敗しない。
pub fn open_kernel(config: &KernelConfig, context: &Path) -> anyhow::Result<DockerKernel> {
    let engine = DockerEngine::connect(config.docker_host.as_deref())?;
    let session = Session::open(engine, config, context)?;
    tracing::debug!(
        "Session opened (context: {:?}, staging: {})",
        session.build_context_dir(),
        session.staging_dir().display()
    );
    Ok(Kernel::new(session))
}

/// 出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Terminal,
    Json,
}

/// セルを1つ実行して結果を表示する
pub async fn execute_cell(
    kernel: &mut DockerKernel,
    code: &str,
    label: &str,
    output: Output,
) -> anyhow::Result<ExecuteReply> {
    match output {
        Output::Json => {
            let mut messages: Vec<String> = Vec::new();
            let reply = kernel.execute(code, &mut messages).await;
            println!("{}", serde_json::to_string(&reply)?);
            Ok(reply)
        }
        Output::Terminal => {
            let mut progress = CellProgress::new(label);
            let reply = kernel.execute(code, &mut progress).await;
            progress.finish();
            print_reply(label, &reply);
            Ok(reply)
        }
    }
}

fn print_reply(label: &str, reply: &ExecuteReply) {
    match &reply.error {
        None => println!("{} {}", "✓".green(), label.dimmed()),
        Some(error) => eprintln!("{} {} {}", "✗".red(), label.dimmed(), error.kind.red().bold()),
    }
    if let Some(payload) = &reply.payload {
        println!("{}", "Next input:".cyan());
        for line in payload.text.lines() {
            println!("  {}", line);
        }
    }
}
