use indicatif::ProgressStyle;

pub fn pb_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta}) {msg}")
        .expect("invalid progress bar template")
        .progress_chars("#>-")
}

#[cfg(feature = "opencv")]
pub use self::image::*;

#[cfg(feature = "opencv")]
mod image {
    use opencv::core::{self, KeyPoint, Mat, Vector};
    use opencv::prelude::*;
    use opencv::{features2d, imgcodecs, imgproc};

    /// 如果宽高**均**超过最大尺寸，则等比缩小图片
    pub fn adjust_image_size(img: Mat, (width, height): (i32, i32)) -> opencv::Result<Mat> {
        if width <= 0 || height <= 0 || img.cols() <= width || img.rows() <= height {
            return Ok(img);
        }
        let (ow, oh) = (img.cols() as f64, img.rows() as f64);
        let scale = (height as f64 / oh).min(width as f64 / ow);
        let mut output = Mat::default();
        imgproc::resize(
            &img,
            &mut output,
            core::Size::default(),
            scale,
            scale,
            imgproc::InterpolationFlags::INTER_AREA as i32,
        )?;
        Ok(output)
    }

    /// 转换为单通道灰度图
    pub fn to_grayscale(img: Mat) -> opencv::Result<Mat> {
        let code = match img.channels() {
            3 => imgproc::COLOR_BGR2GRAY,
            4 => imgproc::COLOR_BGRA2GRAY,
            _ => return Ok(img),
        };
        let mut output = Mat::default();
        imgproc::cvt_color_def(&img, &mut output, code)?;
        Ok(output)
    }

    pub fn draw_keypoints(image: &Mat, keypoints: &Vector<KeyPoint>) -> opencv::Result<Mat> {
        let mut output = Mat::default();
        features2d::draw_keypoints(
            image,
            keypoints,
            &mut output,
            core::Scalar::all(-1.0),
            features2d::DrawMatchesFlags::DEFAULT,
        )?;
        Ok(output)
    }

    pub fn imwrite(filename: &str, img: &Mat) -> opencv::Result<bool> {
        let flags = Vector::<i32>::new();
        imgcodecs::imwrite(filename, img, &flags)
    }

}
