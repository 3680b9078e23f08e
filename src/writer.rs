use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::corpus::{ActiveSet, Corpus};
use crate::error::{BovwError, Result};

/// 图片名称到 TF-IDF 向量的映射，按名称排序
pub type ResultMap = BTreeMap<String, Vec<f64>>;

/// 将有效图片与其 TF-IDF 向量一一对应
pub fn build_result_map(corpus: &Corpus, active: &ActiveSet, vectors: Vec<Vec<f64>>) -> ResultMap {
    active
        .iter()
        .zip(vectors)
        .filter_map(|(i, v)| corpus.get(i).map(|entry| (entry.id().to_owned(), v)))
        .collect()
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// 将结果写入 JSON 文件
///
/// 先写入同目录下的临时文件，再重命名覆盖目标文件。失败时删除临时文件，目标文件保持不变
pub fn write_results<P: AsRef<Path>>(path: P, results: &ResultMap) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_file = tmp_path(path);
    let written = write_json(&tmp_file, results)
        .and_then(|()| std::fs::rename(&tmp_file, path).map_err(BovwError::from));
    if let Err(e) = written {
        if tmp_file.exists() {
            if let Err(re) = std::fs::remove_file(&tmp_file) {
                warn!("无法删除临时文件 {}: {}", tmp_file.display(), re);
            }
        }
        return Err(e);
    }
    info!("已写入 {} 张图片的结果到 {}", results.len(), path.display());
    Ok(())
}

fn write_json(path: &Path, results: &ResultMap) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    let mut ser = serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
    results.serialize(&mut ser)?;
    writer.write_all(b"\n")?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(())
}

/// 读取结果文件
pub fn read_results<P: AsRef<Path>>(path: P) -> Result<ResultMap> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
