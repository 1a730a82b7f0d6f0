use crate::annotation::Annotation;
use bytes::Bytes;
use opencv::{
    core::{self, Mat, Point, Rect, Scalar, Vector},
    imgcodecs, imgproc,
    prelude::*,
};
use thiserror::Error;

const BOX_THICKNESS: i32 = 2;
const FONT_SCALE: f64 = 0.5;
const CAPTION_PADDING: i32 = 1;
const CAPTION_BACKGROUND_ALPHA: f64 = 0.6;

fn box_color() -> Scalar {
    Scalar::new(0.0, 0.0, 255.0, 0.0)
}

fn caption_background() -> Scalar {
    Scalar::new(0.0, 255.0, 255.0, 0.0)
}

#[derive(Error, Debug)]
pub enum CvUtilsError {
    #[error("Failed to encode image: {0}")]
    EncodeFailed(opencv::Error),
    #[error("OpenCV error: {0}")]
    OpenCvError(opencv::Error),
    #[error("OpenCV decode error: {0}")]
    OpenCvDecodeError(opencv::Error),
    #[error("image bytes could not be decoded into a bitmap")]
    EmptyImage,
}

impl From<opencv::Error> for CvUtilsError {
    fn from(err: opencv::Error) -> Self {
        CvUtilsError::OpenCvError(err)
    }
}

/// Decoded bitmap with known pixel dimensions.
pub struct CvImage {
    pub mat: Mat,
}

impl CvImage {
    pub fn from_bytes(bytes: Bytes) -> Result<Self, CvUtilsError> {
        let mat = imgcodecs::imdecode(&Vector::from_slice(&bytes), imgcodecs::IMREAD_COLOR)
            .map_err(CvUtilsError::OpenCvDecodeError)?;
        if mat.empty() {
            return Err(CvUtilsError::EmptyImage);
        }
        Ok(Self { mat })
    }

    pub fn width(&self) -> u32 {
        self.mat.cols().max(0) as u32
    }

    pub fn height(&self) -> u32 {
        self.mat.rows().max(0) as u32
    }

    pub fn to_jpg(&self) -> Result<Vec<u8>, CvUtilsError> {
        let mut buf = Vector::<u8>::new();
        imgcodecs::imencode(".jpg", &self.mat, &mut buf, &Vector::new())
            .map_err(CvUtilsError::EncodeFailed)?;
        Ok(buf.into())
    }

    /// Draws every annotation: caption backgrounds are blended first, then
    /// outlines and caption text go on top at full opacity.
    pub fn annotate(&mut self, annotations: &[Annotation]) -> Result<&mut Self, CvUtilsError> {
        if annotations.is_empty() {
            return Ok(self);
        }

        let mut overlay = self.mat.try_clone()?;
        let mut text_origins = Vec::with_capacity(annotations.len());
        for annotation in annotations {
            let origin = Point::new(
                annotation.caption.x.round() as i32,
                annotation.caption.y.round() as i32,
            );
            let mut baseline = 0;
            let size = imgproc::get_text_size(
                &annotation.caption.text,
                imgproc::FONT_HERSHEY_SIMPLEX,
                FONT_SCALE,
                1,
                &mut baseline,
            )?;

            let patch = Rect::new(
                origin.x - CAPTION_PADDING,
                origin.y - size.height - CAPTION_PADDING,
                size.width + 2 * CAPTION_PADDING,
                size.height + baseline + 2 * CAPTION_PADDING,
            );
            imgproc::rectangle(
                &mut overlay,
                patch,
                caption_background(),
                imgproc::FILLED,
                imgproc::LINE_8,
                0,
            )?;
            text_origins.push(origin);
        }

        let mut blended = Mat::default();
        core::add_weighted(
            &overlay,
            CAPTION_BACKGROUND_ALPHA,
            &self.mat,
            1.0 - CAPTION_BACKGROUND_ALPHA,
            0.0,
            &mut blended,
            -1,
        )?;
        self.mat = blended;

        for (annotation, origin) in annotations.iter().zip(text_origins) {
            let rect = &annotation.rect;
            imgproc::rectangle(
                &mut self.mat,
                Rect::new(
                    rect.left.round() as i32,
                    rect.top.round() as i32,
                    rect.width.round() as i32,
                    rect.height.round() as i32,
                ),
                box_color(),
                BOX_THICKNESS,
                imgproc::LINE_8,
                0,
            )?;

            imgproc::put_text(
                &mut self.mat,
                &annotation.caption.text,
                origin,
                imgproc::FONT_HERSHEY_SIMPLEX,
                FONT_SCALE,
                box_color(),
                1,
                imgproc::LINE_AA,
                false,
            )?;
        }
        Ok(self)
    }
}
