use thiserror::Error;

pub type Result<T> = std::result::Result<T, BovwError>;

#[derive(Error, Debug)]
pub enum BovwError {
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
    /// 单张图片无法解码，只影响这一张图片
    #[error("无法解码图片 {id}: {reason}")]
    Decode { id: String, reason: String },
    /// 训练用的特征点数量少于词典大小
    #[error("训练数据不足：共 {available} 个特征点，至少需要 {required} 个")]
    InsufficientData { available: usize, required: usize },
    #[error("图片集为空")]
    EmptyCorpus,
    #[error("特征点维度不一致：期望 {expected}，实际 {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("结果中不存在图片: {0}")]
    UnknownImage(String),
    #[error("无效的配置: {0}")]
    InvalidConfig(String),
    #[error("JSON 序列化失败: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("词典序列化失败: {0}")]
    Codebook(#[from] bincode::Error),
    #[cfg(feature = "opencv")]
    #[error("OpenCV 错误: {0}")]
    OpenCv(#[from] opencv::Error),
}

impl BovwError {
    pub fn decode(id: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode { id: id.into(), reason: reason.to_string() }
    }
}
