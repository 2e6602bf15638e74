use dfkernel_build::MessageSink;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// セル実行中のスピナー。届いたメッセージはスピナーの上に流す
pub struct CellProgress {
    progress_bar: ProgressBar,
}

impl CellProgress {
    pub fn new(label: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) =
            ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
        {
            pb.set_style(style);
        }
        pb.set_message(format!("Executing {}...", label));
        pb.enable_steady_tick(Duration::from_millis(120));

        Self { progress_bar: pb }
    }

    pub fn finish(&self) {
        self.progress_bar.finish_and_clear();
    }
}

impl MessageSink for CellProgress {
    fn send(&mut self, message: &str) {
        let text = message.trim_end_matches('\n');
        if let Some(step) = text.lines().rev().find(|line| line.starts_with("Step ")) {
            self.progress_bar.set_message(step.to_string());
        }
        // 端末でなければバーは描画されないので直接出す
        if self.progress_bar.is_hidden() {
            println!("{}", text);
        } else {
            self.progress_bar.println(text);
        }
    }
}

impl Drop for CellProgress {
    fn drop(&mut self) {
        if !self.progress_bar.is_finished() {
            self.progress_bar.finish_and_clear();
        }
    }
}
