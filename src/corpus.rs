use std::collections::HashSet;
use std::path::{Path, PathBuf};

use base64::prelude::*;
use log::{info, warn};
use walkdir::WalkDir;

use crate::error::{BovwError, Result};

/// 图片数据的来源
#[derive(Debug, Clone)]
enum Source {
    /// base64 编码的图片文件
    File(PathBuf),
    /// 已经解码的图片字节
    Memory(Vec<u8>),
}

/// 图片集中的一项，只记录身份和来源，图片内容在需要时才读取
#[derive(Debug, Clone)]
pub struct CorpusEntry {
    id: String,
    source: Source,
}

/// 读取并解码后的图片
#[derive(Debug, Clone)]
pub struct ImageRecord {
    pub id: String,
    pub bytes: Vec<u8>,
}

impl CorpusEntry {
    pub fn file(path: PathBuf) -> Self {
        let id = path.file_name().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
        Self { id, source: Source::File(path) }
    }

    pub fn memory(id: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { id: id.into(), source: Source::Memory(bytes) }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// 读取图片内容，文件中的 base64 数据会被解码
    pub fn load(&self) -> Result<ImageRecord> {
        let bytes = match &self.source {
            Source::File(path) => decode_payload(&self.id, &std::fs::read(path)?)?,
            Source::Memory(bytes) => bytes.clone(),
        };
        Ok(ImageRecord { id: self.id.clone(), bytes })
    }
}

/// 解码 base64 图片数据，允许包含空白字符和 `data:*;base64,` 前缀
pub fn decode_payload(id: &str, text: &[u8]) -> Result<Vec<u8>> {
    let text = match text.strip_prefix(b"data:") {
        Some(rest) => match rest.iter().position(|&c| c == b',') {
            Some(pos) => &rest[pos + 1..],
            None => return Err(BovwError::decode(id, "无效的 data URI")),
        },
        None => text,
    };
    let compact = text.iter().copied().filter(|c| !c.is_ascii_whitespace()).collect::<Vec<_>>();
    BASE64_STANDARD.decode(compact).map_err(|e| BovwError::decode(id, e))
}

/// 不可变的图片集，下标顺序在多次运行之间保持稳定
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    entries: Vec<CorpusEntry>,
}

impl Corpus {
    pub fn new(entries: Vec<CorpusEntry>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !seen.insert(entry.id.as_str()) {
                return Err(BovwError::InvalidConfig(format!("重复的图片: {}", entry.id)));
            }
        }
        Ok(Self { entries })
    }

    /// 扫描目录下的所有文件（不递归，跟随符号链接），按文件名排序
    ///
    /// 无法访问的项（例如失效的符号链接）仍然加入图片集，读取时失败并被排除
    pub fn scan<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        info!("开始扫描目录: {}", dir.display());
        if !dir.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("目录不存在: {}", dir.display()),
            )
            .into());
        }
        let mut entries = vec![];
        let walker =
            WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true).sort_by_file_name();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().filter(|_| e.depth() > 0).map(Path::to_path_buf);
                    let Some(path) = path else {
                        return Err(std::io::Error::from(e).into());
                    };
                    warn!("无法访问 {}: {}", path.display(), e);
                    entries.push(CorpusEntry::file(path));
                    continue;
                }
            };
            if entry.file_type().is_file() {
                entries.push(CorpusEntry::file(entry.into_path()));
            }
        }
        info!("扫描完成，共 {} 张图片", entries.len());
        Self::new(entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CorpusEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    /// 包含全部图片的活动集合
    pub fn all(&self) -> ActiveSet {
        ActiveSet((0..self.entries.len()).collect())
    }
}

/// 图片集中仍参与后续计算的图片下标，升序排列
///
/// 剪除图片时总是生成新的集合，不修改原图片集
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActiveSet(Vec<usize>);

impl ActiveSet {
    pub fn from_indices(mut indices: Vec<usize>) -> Self {
        indices.sort_unstable();
        indices.dedup();
        Self(indices)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.0.binary_search(&index).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }

    /// 返回只保留满足条件的下标的新集合
    pub fn filter<F: FnMut(usize) -> bool>(&self, mut keep: F) -> Self {
        Self(self.0.iter().copied().filter(|&i| keep(i)).collect())
    }
}
