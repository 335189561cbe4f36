use std::io::{self, Write};

use dxfmesh_io::ProgressSink;
use tracing::debug;

/// 控制台进度显示：每跨过一个 10% 刻度刷新一次，完成时换行。
#[derive(Debug, Default)]
pub struct ConsoleProgress {
    last_step: Option<u32>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// 返回需要打印的百分比；与上次相同则返回 None。
    fn advance(&mut self, progress: f64) -> Option<u32> {
        let percent = (progress.clamp(0.0, 1.0) * 100.0) as u32;
        let step = percent / 10 * 10;
        if self.last_step == Some(step) {
            return None;
        }
        self.last_step = Some(step);
        Some(step)
    }
}

impl ProgressSink for ConsoleProgress {
    fn report(&mut self, progress: f64) {
        let Some(step) = self.advance(progress) else {
            return;
        };
        if let Err(err) = print_step(step) {
            debug!(error = %err, "进度输出失败");
        }
    }
}

fn print_step(step: u32) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    write!(stdout, "\r处理进度: {step:>3}%")?;
    if step >= 100 {
        writeln!(stdout)?;
    }
    stdout.flush()
}
