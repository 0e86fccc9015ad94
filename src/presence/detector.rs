use anyhow::Result;

use crate::device::VideoFrame;

/// Bounding box of one detected face, in frame pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub confidence: f32,
}

impl FaceBox {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Face detection capability
///
/// Implementations wrap a platform detector (neural-net model in a webview,
/// native vision framework on mobile). Thresholding is left to the monitor.
pub trait FrameDetector: Send + Sync {
    fn detect(&self, frame: &VideoFrame) -> Result<Vec<FaceBox>>;

    fn name(&self) -> &str;
}

/// Count detections large enough to be a real face
pub fn count_faces(faces: &[FaceBox], frame: &VideoFrame, min_area_ratio: f32) -> usize {
    let min_area = (frame.area() as f64 * min_area_ratio as f64).ceil() as u64;
    faces.iter().filter(|face| face.area() >= min_area).count()
}

/// Detector for platforms without face detection; never reports a face
pub struct DisabledDetector;

impl FrameDetector for DisabledDetector {
    fn detect(&self, _frame: &VideoFrame) -> Result<Vec<FaceBox>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "disabled"
    }
}
