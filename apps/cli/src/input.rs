//! 键盘输入线程
//!
//! 逐行读取 stdin：`q` 切换显示开关。与生命周期线程之间只共享 [`DisplayFlag`]。

use anyhow::{Context, Result};
use racebox_driver::DisplayFlag;
use std::io::BufRead;
use tracing::debug;

/// 处理一行输入，返回是否切换了开关
pub fn handle_line(line: &str, display: &DisplayFlag) -> bool {
    if !line.trim().eq_ignore_ascii_case("q") {
        return false;
    }
    if display.toggle() {
        println!("\nStarting data display...");
    } else {
        println!("\nPausing data display...");
    }
    true
}

/// 启动输入线程
///
/// stdin 读取无法中断，线程不做 join，随进程退出。
pub fn spawn_toggle_thread(display: DisplayFlag) -> Result<()> {
    std::thread::Builder::new()
        .name("racebox-input".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        handle_line(&line, &display);
                    },
                    Err(e) => {
                        debug!("stdin read error: {}", e);
                        break;
                    },
                }
            }
            debug!("Input thread finished (stdin closed)");
        })
        .context("启动输入线程失败")?;
    Ok(())
}
