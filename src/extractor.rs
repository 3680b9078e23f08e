use std::cell::RefCell;

use opencv::core::{CV_8U, CV_32F, KeyPoint, Mat, Ptr, Vector};
use opencv::features2d::{ORB, ORB_ScoreType, SIFT};
use opencv::imgcodecs;
use opencv::prelude::*;

use crate::config::{Algorithm, ExtractorOptions};
use crate::descriptor::{Descriptors, Extractor};
use crate::error::{BovwError, Result};
use crate::utils;

// NOTE: OpenCV 的检测器不能跨线程共享，每个线程持有一份，参数变化时重新创建
thread_local! {
    static DETECTOR: RefCell<Option<(ExtractorOptions, Detector)>> = const { RefCell::new(None) };
}

enum Detector {
    Sift(Ptr<SIFT>),
    Orb(Ptr<ORB>),
}

impl Detector {
    fn create(opts: &ExtractorOptions) -> opencv::Result<Self> {
        Ok(match opts.algorithm {
            Algorithm::Sift => Self::Sift(SIFT::create_def()?),
            Algorithm::Orb => Self::Orb(ORB::create(
                opts.orb_nfeatures as i32,
                opts.orb_scale_factor,
                opts.orb_nlevels as i32,
                31,
                0,
                2,
                ORB_ScoreType::HARRIS_SCORE,
                31,
                opts.orb_fast_threshold as i32,
            )?),
        })
    }

    fn detect_and_compute(&mut self, image: &Mat) -> opencv::Result<(Vector<KeyPoint>, Mat)> {
        let mask = Mat::default();
        let mut kps = Vector::<KeyPoint>::new();
        let mut des = Mat::default();
        match self {
            Self::Sift(sift) => sift.detect_and_compute(image, &mask, &mut kps, &mut des, false)?,
            Self::Orb(orb) => orb.detect_and_compute(image, &mask, &mut kps, &mut des, false)?,
        }
        Ok((kps, des))
    }
}

/// 基于 OpenCV 的 SIFT / ORB 特征提取器
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    opts: ExtractorOptions,
}

impl FeatureExtractor {
    pub fn new(opts: ExtractorOptions) -> Self {
        Self { opts }
    }

    fn with_detector<R>(&self, f: impl FnOnce(&mut Detector) -> opencv::Result<R>) -> Result<R> {
        DETECTOR.with(|cell| {
            let mut cell = cell.borrow_mut();
            match &mut *cell {
                Some((opts, detector)) if *opts == self.opts => Ok(f(detector)?),
                slot => {
                    let mut detector = Detector::create(&self.opts)?;
                    let r = f(&mut detector);
                    *slot = Some((self.opts.clone(), detector));
                    Ok(r?)
                }
            }
        })
    }

    /// 解码图片并转换为灰度图
    pub fn decode(&self, id: &str, bytes: &[u8]) -> Result<Mat> {
        let buf = Vector::<u8>::from_slice(bytes);
        let image = imgcodecs::imdecode(&buf, imgcodecs::IMREAD_ANYCOLOR)
            .map_err(|e| BovwError::decode(id, e))?;
        if image.empty() {
            return Err(BovwError::decode(id, "不是有效的图片"));
        }
        let image = utils::to_grayscale(image)?;
        Ok(utils::adjust_image_size(image, self.opts.max_size)?)
    }

    /// 返回灰度图、特征点和原始描述符矩阵
    pub fn detect(&self, id: &str, bytes: &[u8]) -> Result<(Mat, Vector<KeyPoint>, Mat)> {
        let image = self.decode(id, bytes)?;
        let (kps, des) = self.with_detector(|detector| detector.detect_and_compute(&image))?;
        Ok((image, kps, des))
    }
}

impl Extractor for FeatureExtractor {
    fn extract(&self, id: &str, bytes: &[u8]) -> Result<Option<Descriptors>> {
        let (_, _, des) = self.detect(id, bytes)?;
        mat_to_descriptors(id, &des)
    }
}

/// 将描述符矩阵转换为 f32，ORB 的每个字节转换为一个分量
fn mat_to_descriptors(id: &str, des: &Mat) -> Result<Option<Descriptors>> {
    if des.empty() || des.rows() == 0 {
        return Ok(None);
    }
    let dim = des.cols() as usize;
    let data = match des.depth() {
        CV_8U => des.data_typed::<u8>()?.iter().map(|&b| b as f32).collect(),
        CV_32F => des.data_typed::<f32>()?.to_vec(),
        depth => return Err(BovwError::decode(id, format!("不支持的描述符类型: {depth}"))),
    };
    Descriptors::new(dim, data).map(Some)
}
