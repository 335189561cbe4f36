use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, Utc};
use dxfmesh_config::OutputFormat;
use dxfmesh_core::geometry::Point3;
use dxfmesh_engine::summary::{FieldValue, Summary};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("cannot create output directory {path:?}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("output path is not a directory: {path:?}")]
    NotADirectory { path: PathBuf },
    #[error("cannot write output file {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize summary: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to render CSV summary: {0}")]
    Csv(#[from] csv::Error),
}

/// 将统计结果按指定格式写入输出目录。
#[derive(Debug, Clone)]
pub struct SummaryWriter {
    format: OutputFormat,
    directory: PathBuf,
    include_timestamp: bool,
    pretty: bool,
}

impl SummaryWriter {
    pub fn new(format: OutputFormat, directory: impl Into<PathBuf>) -> Self {
        Self {
            format,
            directory: directory.into(),
            include_timestamp: true,
            pretty: true,
        }
    }

    pub fn with_timestamp(mut self, include_timestamp: bool) -> Self {
        self.include_timestamp = include_timestamp;
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// 写入文件并返回其绝对路径。输出目录不存在时自动创建。
    pub fn write_to_file(&self, summary: &Summary, base_name: &str) -> Result<PathBuf, ReportError> {
        ensure_directory(&self.directory)?;
        let content = self.render(summary)?;
        let path = self.directory.join(self.file_name(base_name));
        fs::write(&path, content).map_err(|source| ReportError::Write {
            path: path.clone(),
            source,
        })?;
        let path = std::path::absolute(&path).unwrap_or(path);
        info!(path = %path.display(), format = ?self.format, "统计结果已写入");
        Ok(path)
    }

    pub fn render(&self, summary: &Summary) -> Result<String, ReportError> {
        match self.format {
            OutputFormat::Json => self.render_json(summary),
            OutputFormat::Text => Ok(self.render_text(summary)),
            OutputFormat::Csv => self.render_csv(summary),
        }
    }

    fn file_name(&self, base_name: &str) -> String {
        let mut name = base_name.to_string();
        if self.include_timestamp {
            name.push_str(&Local::now().format("_%Y%m%d_%H%M%S_%3f").to_string());
        }
        name.push('.');
        name.push_str(extension(self.format));
        name
    }

    fn timestamp(&self) -> Option<String> {
        self.include_timestamp
            .then(|| Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string())
    }

    fn render_json(&self, summary: &Summary) -> Result<String, ReportError> {
        let size = summary.bounding_box.size();
        let report = JsonReport {
            triangle_count: summary.triangle_count,
            total_surface_area: summary.total_surface_area,
            bounding_box: JsonBounds {
                min: summary.bounding_box.min(),
                max: summary.bounding_box.max(),
                size: Dimensions {
                    width: size.x(),
                    height: size.y(),
                    depth: size.z(),
                },
            },
            centroid: summary.centroid,
            custom_fields: &summary.custom_fields,
            timestamp: self.timestamp(),
        };
        let content = if self.pretty {
            serde_json::to_string_pretty(&report)?
        } else {
            serde_json::to_string(&report)?
        };
        Ok(content)
    }

    fn render_text(&self, summary: &Summary) -> String {
        let bounds = &summary.bounding_box;
        let size = bounds.size();
        let mut lines = vec!["DXF Mesh Summary".to_string(), "================\n".to_string()];
        if let Some(timestamp) = self.timestamp() {
            lines.push(format!("Generated: {timestamp}\n"));
        }
        lines.extend([
            "Basic Statistics:".to_string(),
            "-----------------".to_string(),
            format!("Triangle Count: {}", summary.triangle_count),
            format!("Total Surface Area: {:.6}\n", summary.total_surface_area),
            "Bounding Box:".to_string(),
            "-------------".to_string(),
            format!("Min Point: {}", format_point(bounds.min())),
            format!("Max Point: {}", format_point(bounds.max())),
            format!(
                "Dimensions: {:.6} x {:.6} x {:.6}",
                size.x(),
                size.y(),
                size.z()
            ),
            format!("Volume: {:.6}\n", bounds.volume()),
            format!("Centroid: {}\n", format_point(summary.centroid)),
        ]);
        if !summary.custom_fields.is_empty() {
            lines.push("Additional Properties:".to_string());
            lines.push("---------------------".to_string());
            lines.extend(
                summary
                    .custom_fields
                    .iter()
                    .map(|(name, value)| format!("{name}: {value}")),
            );
        }
        let mut text = lines.join("\n");
        text.push('\n');
        text
    }

    fn render_csv(&self, summary: &Summary) -> Result<String, ReportError> {
        let bounds = &summary.bounding_box;
        let (min, max, size) = (bounds.min(), bounds.max(), bounds.size());
        let mut rows: Vec<(String, String)> = vec![
            ("triangle_count".into(), summary.triangle_count.to_string()),
            (
                "total_surface_area".into(),
                format!("{:.6}", summary.total_surface_area),
            ),
        ];
        for (prefix, point) in [("bounding_box_min", min), ("bounding_box_max", max)] {
            for (axis, value) in [("x", point.x()), ("y", point.y()), ("z", point.z())] {
                rows.push((format!("{prefix}_{axis}"), format!("{value:.6}")));
            }
        }
        for (name, value) in [
            ("width", size.x()),
            ("height", size.y()),
            ("depth", size.z()),
            ("volume", bounds.volume()),
            ("centroid_x", summary.centroid.x()),
            ("centroid_y", summary.centroid.y()),
            ("centroid_z", summary.centroid.z()),
        ] {
            rows.push((name.into(), format!("{value:.6}")));
        }
        rows.extend(
            summary
                .custom_fields
                .iter()
                .map(|(name, value)| (name.clone(), value.to_string())),
        );
        if let Some(timestamp) = self.timestamp() {
            rows.push(("timestamp".into(), timestamp));
        }

        let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
        writer.write_record(["Property", "Value"])?;
        for (name, value) in &rows {
            writer.write_record([name, value])?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|err| ReportError::Csv(err.into_error().into()))?;
        // 字段均来自 String，输出必为合法 UTF-8
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    triangle_count: usize,
    total_surface_area: f64,
    bounding_box: JsonBounds,
    centroid: Point3,
    #[serde(skip_serializing_if = "is_empty_fields")]
    custom_fields: &'a BTreeMap<String, FieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
}

#[derive(Serialize)]
struct JsonBounds {
    min: Point3,
    max: Point3,
    size: Dimensions,
}

#[derive(Serialize)]
struct Dimensions {
    width: f64,
    height: f64,
    depth: f64,
}

fn is_empty_fields(fields: &&BTreeMap<String, FieldValue>) -> bool {
    fields.is_empty()
}

fn format_point(point: Point3) -> String {
    format!("({:.6}, {:.6}, {:.6})", point.x(), point.y(), point.z())
}

fn extension(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Json => "json",
        OutputFormat::Text => "txt",
        OutputFormat::Csv => "csv",
    }
}

fn ensure_directory(directory: &Path) -> Result<(), ReportError> {
    if !directory.exists() {
        fs::create_dir_all(directory).map_err(|source| ReportError::CreateDirectory {
            path: directory.to_path_buf(),
            source,
        })?;
    }
    if !directory.is_dir() {
        return Err(ReportError::NotADirectory {
            path: directory.to_path_buf(),
        });
    }
    Ok(())
}
