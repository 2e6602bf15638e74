mod cells;
mod commands;
mod progress;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::Output;
use dfkernel_config::KernelConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dfkernel")]
#[command(about = "Dockerfile をセル単位で対話的にビルドする", long_about = None)]
struct Cli {
    /// 設定ファイルのパス（省略時は探索）
    #[arg(long, global = true, env = "DFKERNEL_CONFIG_PATH")]
    config: Option<PathBuf>,
    /// 初期ビルドコンテキスト（省略時はカレントディレクトリ）
    #[arg(long, global = true)]
    context: Option<PathBuf>,
    /// デバッグログを出力
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// ファイルをセルに分けて順に実行
    Run {
        /// `# %%` 行または空行で区切られたファイル
        file: PathBuf,
        /// 失敗したセルがあっても続ける
        #[arg(short, long)]
        keep_going: bool,
        /// 返信を1セル1行のJSONで出力
        #[arg(long)]
        json: bool,
    },
    /// 標準入力からセルを読んで実行（空行でセルの終わり）
    Repl {
        /// 返信を1セル1行のJSONで出力
        #[arg(long)]
        json: bool,
    },
    /// 使えるディレクティブの一覧
    Directives,
    /// バージョン情報を表示
    Version,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<KernelConfig> {
    let config = match path {
        Some(path) => KernelConfig::load_from(path)?,
        None => KernelConfig::discover()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // デーモンも設定も不要なコマンド
    match cli.command {
        Commands::Version => {
            println!("dfkernel {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Commands::Directives => {
            commands::directives::handle();
            return Ok(());
        }
        _ => {}
    }

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };
    let context = match cli.context {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let mut kernel = commands::open_kernel(&config, &context)?;

    match cli.command {
        Commands::Run {
            file,
            keep_going,
            json,
        } => {
            let output = if json { Output::Json } else { Output::Terminal };
            commands::run::handle(&mut kernel, &file, keep_going, output).await?;
        }
        Commands::Repl { json } => {
            let output = if json { Output::Json } else { Output::Terminal };
            commands::repl::handle(&mut kernel, output).await?;
        }
        Commands::Version | Commands::Directives => {
            unreachable!("handled before the session is opened");
        }
    }

    Ok(())
}
