use super::{DockerKernel, Output, execute_cell};
use crate::cells;
use colored::Colorize;
use std::path::Path;

pub async fn handle(
    kernel: &mut DockerKernel,
    file: &Path,
    keep_going: bool,
    output: Output,
) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(file)
        .map_err(|e| anyhow::anyhow!("{} を読み込めません: {}", file.display(), e))?;
    let cells = cells::split_cells(&source);
    tracing::info!("Running {} cells from {}", cells.len(), file.display());

    let mut failed = 0usize;
    for (index, cell) in cells.iter().enumerate() {
        let label = format!("[{}]", index + 1);
        let reply = execute_cell(kernel, cell, &label, output).await?;
        if !reply.is_ok() {
            failed += 1;
            if !keep_going {
                break;
            }
        }
    }

    if output == Output::Terminal {
        let info = kernel.target().kernel_info();
        if let Some(image_id) = &info.image_id {
            println!("{} {}", "Current image:".bold(), image_id);
        }
    }

    if failed > 0 {
        anyhow::bail!("{} 個のセルが失敗しました", failed);
    }
    Ok(())
}
