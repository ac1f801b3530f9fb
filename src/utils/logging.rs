// 日志工具模块
//
// 封装 flexi_logger 的初始化和关闭操作，确保异步日志正确 flush

use crate::config::{Config, LogConfig};
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use std::sync::Mutex;

/// 全局日志句柄，用于程序退出时 flush
static LOGGER_HANDLE: Mutex<Option<LoggerHandle>> = Mutex::new(None);

/// 初始化日志系统
///
/// 重复调用时只调整日志级别，不会重新创建日志文件
///
/// # Examples
/// ```no_run
/// use accessgate::config::Config;
/// use accessgate::utils::logging;
///
/// let config = Config::default();
/// logging::init(&config).expect("日志初始化失败");
/// ```
pub fn init(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut guard = LOGGER_HANDLE
        .lock()
        .map_err(|e| format!("日志句柄锁已损坏: {}", e))?;

    if let Some(handle) = guard.as_mut() {
        handle.parse_new_spec(&config.log.level)?;
        return Ok(());
    }

    let handle = start_logger(&config.log)?;
    *guard = Some(handle);

    log::info!(
        "日志系统初始化完成: {}/{} (level={})",
        config.log.dir,
        config.log.file,
        config.log.level
    );
    Ok(())
}

fn start_logger(log: &LogConfig) -> Result<LoggerHandle, Box<dyn std::error::Error>> {
    let handle = Logger::try_with_str(&log.level)?
        .log_to_file(FileSpec::default().basename(&log.file).directory(&log.dir))
        .rotate(
            Criterion::Size(log.max_file_size),
            Naming::Numbers,
            Cleanup::KeepLogFiles(log.max_files),
        )
        .write_mode(WriteMode::Async)
        .append()
        .start()?;
    Ok(handle)
}

/// 刷新并关闭日志系统
///
/// 在程序退出前调用，确保所有异步日志都已写入文件
pub fn shutdown() {
    if let Ok(mut guard) = LOGGER_HANDLE.lock() {
        if let Some(handle) = guard.take() {
            handle.flush();
            handle.shutdown();
        }
    }
}

pub fn is_initialized() -> bool {
    LOGGER_HANDLE
        .lock()
        .map(|guard| guard.is_some())
        .unwrap_or(false)
}
