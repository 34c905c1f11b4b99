//! # Logging モジュール
//!
//! シミュレーションのログ出力を初期化します。
//!
//! `tracing-subscriber` のレイヤーを出力先ごとに組み立て、ファイル出力は
//! `tracing-appender` の日次ローテーション + 非同期書き込みで行います。
//! コンソールは人が読むためのコンパクト形式、ファイルは後処理用のJSON形式です。
//!
//! 環境変数 `RUST_LOG` が設定されていれば、設定ファイルやCLIのレベルより優先されます。
//!
//! ## 出力先
//!
//! - `Console`: コンソールのみ
//! - `File`: ファイルのみ（`logs/dogsim.YYYY-MM-DD`）
//! - `Both`: コンソールとファイルの両方

use std::str::FromStr;
use thiserror::Error;
use tracing::Level;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter, Registry,
};

/// ログ出力先の設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    /// コンソールのみ
    Console,
    /// ファイルのみ
    File,
    /// コンソールとファイルの両方
    Both,
}

impl LogOutput {
    fn to_console(self) -> bool {
        matches!(self, LogOutput::Console | LogOutput::Both)
    }

    fn to_file(self) -> bool {
        matches!(self, LogOutput::File | LogOutput::Both)
    }
}

impl FromStr for LogOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "console" | "stdout" => Ok(LogOutput::Console),
            "file" => Ok(LogOutput::File),
            "both" | "all" => Ok(LogOutput::Both),
            _ => Err(format!("無効な出力先: {}. 利用可能: console, file, both", s)),
        }
    }
}

/// ログ設定
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub output: LogOutput,
    /// ログファイルのディレクトリ（File / Both の場合）
    pub log_dir: String,
    /// ログファイル名のプレフィックス
    pub file_prefix: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            output: LogOutput::Console,
            log_dir: "logs".to_string(),
            file_prefix: "dogsim".to_string(),
        }
    }
}

/// ログ初期化エラー
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("ログディレクトリを作成できません {path}: {source}")]
    Directory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("ログシステムは既に初期化されています: {0}")]
    AlreadyInitialized(#[from] TryInitError),
}

/// ログシステムを初期化
///
/// # 引数
///
/// * `config` - ログ設定
///
/// # 戻り値
///
/// ファイル出力を行う場合は非同期書き込みのガード。
/// ガードを破棄すると未書き込みのログが失われるため、プロセス終了まで保持すること。
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.level.to_string()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = config.output.to_console().then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .compact()
    });

    let (file_layer, guard) = if config.output.to_file() {
        ensure_log_directory(&config.log_dir)?;
        let appender = rolling::daily(&config.log_dir, &config.file_prefix);
        let (writer, guard) = non_blocking(appender);
        let layer = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(false)
            .json();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    Registry::default()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

/// ログレベルを文字列から解析（大文字小文字は区別しない）
pub fn parse_log_level(level_str: &str) -> Option<Level> {
    match level_str.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// `-v` の回数からログレベルを決定
///
/// 明示的なレベル指定がある場合はそちらを優先します。
pub fn level_for_verbosity(verbose: u8, explicit: Option<Level>) -> Level {
    explicit.unwrap_or(match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    })
}

/// ログディレクトリを作成
pub fn ensure_log_directory(log_dir: &str) -> Result<(), LoggingError> {
    std::fs::create_dir_all(log_dir).map_err(|source| LoggingError::Directory {
        path: log_dir.to_string(),
        source,
    })
}
