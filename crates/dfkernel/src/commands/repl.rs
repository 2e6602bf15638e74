use super::{DockerKernel, Output, execute_cell};
use std::io::{BufRead, Write};

const PROMPT: &str = "dfkernel> ";
const CONTINUATION: &str = "     ... ";

/// 標準入力からセルを読む。空行でセルが終わる
pub async fn handle(kernel: &mut DockerKernel, output: Output) -> anyhow::Result<()> {
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    let mut cell: Vec<String> = Vec::new();
    let mut count = 0usize;

    loop {
        prompt(if cell.is_empty() { PROMPT } else { CONTINUATION })?;
        let line = match lines.next() {
            Some(line) => line?,
            None => break,
        };

        if !line.trim().is_empty() {
            cell.push(line);
            continue;
        }
        if cell.is_empty() {
            continue;
        }
        count += 1;
        let code = cell.join("\n");
        cell.clear();
        execute_cell(kernel, &code, &format!("[{}]", count), output).await?;
    }

    // 入力の終わりで残っていれば実行する
    if !cell.is_empty() {
        count += 1;
        let code = cell.join("\n");
        execute_cell(kernel, &code, &format!("[{}]", count), output).await?;
    }
    Ok(())
}

fn prompt(text: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    write!(stderr, "{}", text)?;
    stderr.flush()
}
