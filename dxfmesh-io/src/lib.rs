use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use dxfmesh_core::{
    geometry::{Point3, Triangle},
    mesh::Mesh,
};
use thiserror::Error;
use tracing::{debug, info, warn};

/// 每接受这么多个 3DFACE 汇报一次进度。
const PROGRESS_INTERVAL: usize = 100;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("file does not exist: {path:?}")]
    FileNotFound { path: PathBuf },
    #[error("path is not a regular file: {path:?}")]
    NotARegularFile { path: PathBuf },
    #[error("cannot open file {path:?}: {source}")]
    CannotOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no 3D faces found in DXF file {path:?}")]
    NoFacesFound { path: PathBuf },
}

/// 进度接收端。解析过程中同步调用，取值范围 `[0, 1]`，单调不减。
pub trait ProgressSink {
    fn report(&mut self, progress: f64);
}

impl<F: FnMut(f64)> ProgressSink for F {
    fn report(&mut self, progress: f64) {
        self(progress)
    }
}

/// 不关心进度时使用的空实现。
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _progress: f64) {}
}

/// 某个坐标值无法解析、被替换为 0.0 的记录。
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateFallback {
    /// 值所在行号（从 1 开始）。
    pub line: usize,
    pub code: i32,
    pub raw: String,
}

/// 宽松解析过程中被“吞掉”的问题，供诊断使用，不影响解析结果。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseDiagnostics {
    pub line_count: usize,
    pub coordinate_fallbacks: Vec<CoordinateFallback>,
    /// 3DFACE 内部无法解析为整数的组码行数。
    pub skipped_code_lines: usize,
    /// 缺少任一 X 坐标（组码 10/11/12）而被丢弃的 3DFACE 数量。
    pub rejected_faces: usize,
}

impl ParseDiagnostics {
    pub fn is_clean(&self) -> bool {
        self.coordinate_fallbacks.is_empty()
            && self.skipped_code_lines == 0
            && self.rejected_faces == 0
    }
}

/// 整个文件按行读入内存后的结果。每行去掉行尾换行及首尾空格/制表符，空行保留。
#[derive(Debug, Clone, Default)]
pub struct DxfLines {
    lines: Vec<String>,
}

impl DxfLines {
    pub fn open(path: &Path) -> Result<Self, ReadError> {
        let file = File::open(path).map_err(|source| ReadError::CannotOpen {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_source(path, BufReader::new(file))
    }

    /// 读取过程中的 I/O 错误连同来源路径一起包装为 [`ReadError::Io`]。
    fn from_source<R: BufRead>(path: &Path, reader: R) -> Result<Self, ReadError> {
        Self::from_reader(reader).map_err(|source| ReadError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 非 UTF-8 字节按有损方式解码，不视为错误。
    pub fn from_reader<R: BufRead>(reader: R) -> std::io::Result<Self> {
        let mut lines = Vec::new();
        for chunk in reader.split(b'\n') {
            let chunk = chunk?;
            lines.push(normalize_line(&String::from_utf8_lossy(&chunk)));
        }
        Ok(Self { lines })
    }

    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.lines().map(normalize_line).collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    #[inline]
    fn is(&self, index: usize, literal: &str) -> bool {
        self.get(index) == Some(literal)
    }
}

fn normalize_line(raw: &str) -> String {
    raw.trim_matches([' ', '\t', '\r']).to_string()
}

/// 扫描结束后得到的网格与诊断信息。
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub mesh: Mesh,
    pub diagnostics: ParseDiagnostics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Outside,
    InEntities,
}

/// 在行序列上运行实体扫描状态机，收集 ENTITIES 段内的 3DFACE。
///
/// 只识别 `0/SECTION` + `2/ENTITIES`、`0/ENDSEC` 与 `0/3DFACE`。其余内容逐行前进，
/// 不按组码/值成对跳过，因此未知实体里恰好为 `0` 的值行可能被当作实体起始。
pub fn scan_entities(lines: &DxfLines, progress: &mut dyn ProgressSink) -> ScanOutcome {
    let mut outcome = ScanOutcome {
        mesh: Mesh::new(),
        diagnostics: ParseDiagnostics {
            line_count: lines.len(),
            ..ParseDiagnostics::default()
        },
    };
    let mut state = ScanState::Outside;
    let mut cursor = 0;

    while cursor < lines.len() {
        if !lines.is(cursor, "0") {
            cursor += 1;
            continue;
        }
        match lines.get(cursor + 1) {
            Some("SECTION") if lines.is(cursor + 2, "2") && lines.is(cursor + 3, "ENTITIES") => {
                debug!(line = cursor + 1, "进入 ENTITIES 段");
                state = ScanState::InEntities;
                cursor += 4;
            }
            Some("ENDSEC") => {
                if state == ScanState::InEntities {
                    debug!(line = cursor + 1, "离开 ENTITIES 段");
                }
                state = ScanState::Outside;
                cursor += 2;
            }
            Some("3DFACE") if state == ScanState::InEntities => {
                let parsed = parse_3dface(lines, cursor + 2, &mut outcome.diagnostics);
                if let Some(triangle) = parsed.triangle {
                    outcome.mesh.push(triangle);
                    if outcome.mesh.len() % PROGRESS_INTERVAL == 0 {
                        report_clamped(progress, parsed.next as f64 / lines.len() as f64);
                    }
                } else {
                    outcome.diagnostics.rejected_faces += 1;
                    debug!(line = cursor + 1, "3DFACE 缺少顶点 X 坐标，已丢弃");
                }
                cursor = parsed.next;
            }
            _ => cursor += 1,
        }
    }

    report_clamped(progress, 1.0);
    outcome
}

fn report_clamped(progress: &mut dyn ProgressSink, value: f64) {
    progress.report(value.clamp(0.0, 1.0));
}

struct FaceParse {
    triangle: Option<Triangle>,
    next: usize,
}

/// 从 `start`（3DFACE 标记之后的第一行）起读取组码/值对，直到遇到 `0` 行或输入结束。
///
/// 只读取前三个顶点；第四顶点（13/23/33）被忽略，四边形面退化为前三个顶点组成的三角形。
/// 顶点是否存在只取决于其 X 组码（10/11/12）是否成功解析。
fn parse_3dface(lines: &DxfLines, start: usize, diagnostics: &mut ParseDiagnostics) -> FaceParse {
    let mut coords = [[0.0_f64; 3]; 3];
    let mut present = [false; 3];
    let mut cursor = start;

    while let Some(code_line) = lines.get(cursor) {
        if code_line == "0" {
            break;
        }
        let Ok(code) = code_line.parse::<i32>() else {
            // 单行跳过，避免丢失组码/值的对齐
            diagnostics.skipped_code_lines += 1;
            debug!(line = cursor + 1, text = code_line, "组码无法解析为整数，跳过该行");
            cursor += 1;
            continue;
        };
        let Some(value) = lines.get(cursor + 1) else {
            break;
        };

        let (vertex, axis) = match code {
            10..=12 => ((code - 10) as usize, 0),
            20..=22 => ((code - 20) as usize, 1),
            30..=32 => ((code - 30) as usize, 2),
            _ => {
                cursor += 2;
                continue;
            }
        };
        match value.parse::<f64>() {
            Ok(parsed) => {
                coords[vertex][axis] = parsed;
                if axis == 0 {
                    present[vertex] = true;
                }
            }
            Err(_) => {
                coords[vertex][axis] = 0.0;
                debug!(line = cursor + 2, code, raw = value, "坐标解析失败，按 0.0 处理");
                diagnostics.coordinate_fallbacks.push(CoordinateFallback {
                    line: cursor + 2,
                    code,
                    raw: value.to_string(),
                });
            }
        }
        cursor += 2;
    }

    let triangle = present.iter().all(|flag| *flag).then(|| {
        let [a, b, c] = coords.map(|[x, y, z]| Point3::new(x, y, z));
        Triangle::new(a, b, c)
    });
    FaceParse {
        triangle,
        next: cursor,
    }
}

/// DXF 3DFACE 读取器。可顺序复用于多个文件，但不支持并发共享。
#[derive(Debug, Default)]
pub struct DxfMeshReader {
    last_entity_count: usize,
    last_diagnostics: ParseDiagnostics,
}

impl DxfMeshReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_file(&mut self, path: impl AsRef<Path>) -> Result<Mesh, ReadError> {
        self.read_file_with_progress(path, &mut NoProgress)
    }

    /// 读取并解析 DXF 文件。未找到任何 3DFACE 时返回 [`ReadError::NoFacesFound`]，
    /// 出错时不会返回部分网格。
    pub fn read_file_with_progress(
        &mut self,
        path: impl AsRef<Path>,
        progress: &mut dyn ProgressSink,
    ) -> Result<Mesh, ReadError> {
        let path = path.as_ref();
        self.last_entity_count = 0;
        self.last_diagnostics = ParseDiagnostics::default();

        validate_input_path(path)?;
        let lines = DxfLines::open(path)?;
        debug!(path = %path.display(), lines = lines.len(), "DXF 文件已读入内存");

        let ScanOutcome { mesh, diagnostics } = scan_entities(&lines, progress);
        self.last_entity_count = mesh.len();
        if !diagnostics.is_clean() {
            warn!(
                path = %path.display(),
                coordinate_fallbacks = diagnostics.coordinate_fallbacks.len(),
                skipped_code_lines = diagnostics.skipped_code_lines,
                rejected_faces = diagnostics.rejected_faces,
                "DXF 解析过程中存在被容错处理的数据"
            );
        }
        self.last_diagnostics = diagnostics;

        if mesh.is_empty() {
            return Err(ReadError::NoFacesFound {
                path: path.to_path_buf(),
            });
        }
        info!(path = %path.display(), triangles = mesh.len(), "DXF 解析完成");
        Ok(mesh)
    }

    /// 最近一次读取中被接受的三角形数量。
    #[inline]
    pub fn last_entity_count(&self) -> usize {
        self.last_entity_count
    }

    #[inline]
    pub fn last_diagnostics(&self) -> &ParseDiagnostics {
        &self.last_diagnostics
    }
}

fn validate_input_path(path: &Path) -> Result<(), ReadError> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ReadError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(source) => {
            return Err(ReadError::CannotOpen {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    if !metadata.is_file() {
        return Err(ReadError::NotARegularFile {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}
