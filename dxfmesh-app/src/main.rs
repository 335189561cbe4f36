use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use dxfmesh_config::{AppConfig, ConfigError, OutputFormat, SummaryDetail};
use dxfmesh_engine::summary::{DetailLevel, Summary, summarize};
use dxfmesh_io::{DxfMeshReader, ReadError};
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use crate::progress::ConsoleProgress;
use crate::report::{ReportError, SummaryWriter};

mod progress;
mod report;

/// 分析 DXF 文件中的 3DFACE 网格并输出统计摘要。
#[derive(Debug, Parser)]
#[command(name = "dxfmesh", version)]
struct Cli {
    /// 待分析的 DXF 文件
    input: PathBuf,
    /// 输出目录（默认取配置，缺省为当前目录）
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,
    /// 输出格式
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,
    /// 统计详细程度
    #[arg(short, long, value_enum)]
    summarizer: Option<SummarizerArg>,
    /// 输出文件名前缀
    #[arg(short = 'n', long = "name", value_name = "BASENAME")]
    name: Option<String>,
    /// 文件名与内容中不附带时间戳
    #[arg(long)]
    no_timestamp: bool,
    /// 输出紧凑 JSON
    #[arg(long)]
    no_pretty: bool,
    /// 显式指定配置文件
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Json,
    Text,
    Csv,
}

impl From<FormatArg> for OutputFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Csv => OutputFormat::Csv,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SummarizerArg {
    Basic,
    Detailed,
}

impl From<SummarizerArg> for SummaryDetail {
    fn from(value: SummarizerArg) -> Self {
        match value {
            SummarizerArg::Basic => SummaryDetail::Basic,
            SummarizerArg::Detailed => SummaryDetail::Detailed,
        }
    }
}

#[derive(Debug, Error)]
enum AppError {
    #[error("DXF Reader Error: {0}")]
    Read(#[from] ReadError),
    #[error("Summary Writer Error: {0}")]
    Report(#[from] ReportError),
}

impl AppError {
    fn exit_code(&self) -> ExitCode {
        match self {
            AppError::Read(_) => ExitCode::from(2),
            AppError::Report(_) => ExitCode::from(3),
        }
    }
}

/// 命令行参数覆盖配置文件后的最终设置。
#[derive(Debug)]
struct RunSettings {
    input: PathBuf,
    format: OutputFormat,
    directory: PathBuf,
    base_name: String,
    include_timestamp: bool,
    pretty: bool,
    detail: DetailLevel,
}

impl RunSettings {
    fn resolve(cli: Cli, config: &AppConfig) -> Self {
        let detail = match cli
            .summarizer
            .map(SummaryDetail::from)
            .unwrap_or(config.summary.detail)
        {
            SummaryDetail::Basic => DetailLevel::Basic,
            SummaryDetail::Detailed => DetailLevel::Detailed,
        };
        Self {
            input: cli.input,
            format: cli.format.map(OutputFormat::from).unwrap_or(config.output.format),
            directory: cli.output.unwrap_or_else(|| config.output.directory.clone()),
            base_name: cli.name.unwrap_or_else(|| config.output.base_name.clone()),
            include_timestamp: config.output.include_timestamp && !cli.no_timestamp,
            pretty: config.output.pretty && !cli.no_pretty,
            detail,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let (config, config_error) = load_configuration(cli.config.as_deref());
    init_logging(&config);
    if let Some(err) = config_error {
        warn_config_fallback(&err);
    }

    let settings = RunSettings::resolve(cli, &config);
    match run(&settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "处理失败");
            eprintln!("{err}");
            err.exit_code()
        }
    }
}

fn run(settings: &RunSettings) -> Result<(), AppError> {
    info!(input = %settings.input.display(), "开始处理 DXF 文件");
    println!("DXF Mesh Processor v{}", env!("CARGO_PKG_VERSION"));
    println!("输入文件: {}", settings.input.display());
    println!("输出目录: {}", settings.directory.display());
    println!("输出格式: {:?}", settings.format);
    println!("统计级别: {:?}\n", settings.detail);

    let started = Instant::now();
    let mut reader = DxfMeshReader::new();
    let mut progress = ConsoleProgress::new();
    let mesh = reader.read_file_with_progress(&settings.input, &mut progress)?;
    println!("已读取 {} 个三角形", reader.last_entity_count());
    let fallbacks = reader.last_diagnostics().coordinate_fallbacks.len();
    if fallbacks > 0 {
        println!("其中 {fallbacks} 个坐标无法解析，已按 0.0 处理");
    }

    let summary = summarize(&mesh, settings.detail);
    let writer = SummaryWriter::new(settings.format, &settings.directory)
        .with_timestamp(settings.include_timestamp)
        .with_pretty(settings.pretty);
    let output_path = writer.write_to_file(&summary, &settings.base_name)?;

    println!("\n处理完成");
    println!("输出文件: {}", output_path.display());
    println!("耗时: {} ms", started.elapsed().as_millis());
    print_overview(&summary);
    Ok(())
}

fn print_overview(summary: &Summary) {
    let bounds = &summary.bounding_box;
    let (min, max, size) = (bounds.min(), bounds.max(), bounds.size());
    println!("\n概览:");
    println!("  三角形数量: {}", summary.triangle_count);
    println!("  表面积: {:.2}", summary.total_surface_area);
    println!(
        "  包围盒: ({:.2}, {:.2}, {:.2}) - ({:.2}, {:.2}, {:.2})",
        min.x(),
        min.y(),
        min.z(),
        max.x(),
        max.y(),
        max.z()
    );
    println!("  尺寸: {:.2} x {:.2} x {:.2}", size.x(), size.y(), size.z());
}

/// 读取配置；失败时回退到默认值并交回错误，待日志初始化后再报告。
fn load_configuration(override_path: Option<&Path>) -> (AppConfig, Option<ConfigError>) {
    let loaded = match override_path {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::discover(),
    };
    match loaded {
        Ok(cfg) => (cfg, None),
        Err(err) => (AppConfig::default(), Some(err)),
    }
}

fn warn_config_fallback(err: &ConfigError) {
    match err {
        ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
            warn!(path = %path.display(), error = %err, "加载配置失败，使用内建默认值");
        }
        ConfigError::Context { .. } => {
            warn!(error = %err, "加载配置失败，使用内建默认值");
        }
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
