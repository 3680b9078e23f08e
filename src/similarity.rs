use rayon::prelude::*;

use crate::error::{BovwError, Result};
use crate::writer::ResultMap;

/// 余弦相似度，任意一方为零向量时返回 0
pub fn cosine_similarity(va: &[f64], vb: &[f64]) -> f64 {
    let (mut dot, mut na, mut nb) = (0.0, 0.0, 0.0);
    for (a, b) in va.iter().zip(vb) {
        dot += a * b;
        na += a * a;
        nb += b * b;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

/// 按照与 `query` 的相似度从高到低返回其他图片，最多 `count` 个
///
/// 相似度相同时按名称排序，保证结果稳定
pub fn rank(results: &ResultMap, query: &str, count: usize) -> Result<Vec<(f64, String)>> {
    let target = results.get(query).ok_or_else(|| BovwError::UnknownImage(query.to_owned()))?;
    let mut scores = results
        .par_iter()
        .filter(|(id, _)| id.as_str() != query)
        .map(|(id, v)| (cosine_similarity(target, v), id.clone()))
        .collect::<Vec<_>>();
    scores.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    scores.truncate(count);
    Ok(scores)
}
