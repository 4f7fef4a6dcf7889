//! Image Acquisition - photos for memory spheres
//!
//! Every still, whether uploaded or captured, is decoded, bounded to 2048px on
//! its longer side, and re-encoded as JPEG. The result is carried around as a
//! `data:image/jpeg;base64,...` URL.
//!
//! Decoding runs off the UI thread (`spawn_blocking`) and hands back either an
//! `EncodedImage` or an `AcquireError`; callers only write on success.

use base64::{engine::general_purpose, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Longest side after resizing
pub const MAX_DIMENSION: u32 = 2048;

/// JPEG quality for uploads
pub const UPLOAD_QUALITY: u8 = 88;

/// JPEG quality for camera captures
pub const CAMERA_QUALITY: u8 = 90;

const DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

#[derive(Error, Debug)]
pub enum AcquireError {
    #[error("Permission denied")]
    PermissionDenied,
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("Could not decode image: {0}")]
    Decode(String),
    #[error("I/O error: {0}")]
    Io(std::io::Error),
    #[error("Capture cancelled")]
    Cancelled,
    #[error("Acquisition failed: {0}")]
    Failed(String),
}

impl From<std::io::Error> for AcquireError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::PermissionDenied => AcquireError::PermissionDenied,
            _ => AcquireError::Io(e),
        }
    }
}

/// A decoded, resized and re-encoded still
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub width: u32,
    pub height: u32,
    pub jpeg: Vec<u8>,
}

impl EncodedImage {
    pub fn data_url(&self) -> String {
        format!("{}{}", DATA_URL_PREFIX, general_purpose::STANDARD.encode(&self.jpeg))
    }
}

/// Decode the JPEG bytes out of a data URL produced by `EncodedImage::data_url`
pub fn decode_data_url(url: &str) -> Option<Vec<u8>> {
    let payload = url.strip_prefix(DATA_URL_PREFIX)?;
    general_purpose::STANDARD.decode(payload).ok()
}

/// Scale (width, height) so neither exceeds `max`, keeping aspect ratio
pub fn bounded_size(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width <= max && height <= max {
        return (width, height);
    }
    let (w, h) = (width as f64, height as f64);
    let (bw, bh) = if width > height {
        (max as f64, h / w * max as f64)
    } else {
        (w / h * max as f64, max as f64)
    };
    ((bw as u32).max(1), (bh as u32).max(1))
}

/// Decode any supported image and re-encode it as a bounded JPEG
pub fn encode_still(bytes: &[u8], quality: u8) -> Result<EncodedImage, AcquireError> {
    let img = image::load_from_memory(bytes).map_err(|e| AcquireError::Decode(e.to_string()))?;
    encode_dynamic(img, quality)
}

fn encode_dynamic(img: DynamicImage, quality: u8) -> Result<EncodedImage, AcquireError> {
    let (w, h) = bounded_size(img.width(), img.height(), MAX_DIMENSION);
    let img = if (w, h) != (img.width(), img.height()) {
        debug!("Resizing {}x{} -> {}x{}", img.width(), img.height(), w, h);
        img.resize_exact(w, h, FilterType::Lanczos3)
    } else {
        img
    };

    let rgb = img.to_rgb8();
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality)
        .encode_image(&rgb)
        .map_err(|e| AcquireError::Failed(e.to_string()))?;

    Ok(EncodedImage {
        width: rgb.width(),
        height: rgb.height(),
        jpeg,
    })
}

/// Load and encode one image file
pub async fn acquire_file(path: PathBuf) -> Result<EncodedImage, AcquireError> {
    let bytes = tokio::fs::read(&path).await?;
    let result = tokio::task::spawn_blocking(move || encode_still(&bytes, UPLOAD_QUALITY))
        .await
        .map_err(|e| AcquireError::Failed(e.to_string()))?;

    match &result {
        Ok(img) => info!("Acquired {:?}: {}x{}, {} bytes", path, img.width, img.height, img.jpeg.len()),
        Err(e) => warn!("Failed to acquire {:?}: {}", path, e),
    }
    result
}

/// Load several files concurrently; results come back in input order
pub async fn acquire_files(paths: Vec<PathBuf>) -> Vec<Result<EncodedImage, AcquireError>> {
    let handles: Vec<_> = paths.into_iter().map(|p| tokio::spawn(acquire_file(p))).collect();

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(match handle.await {
            Ok(r) => r,
            Err(e) => Err(AcquireError::Failed(e.to_string())),
        });
    }
    results
}

// ============================================================================
// Camera capture
// ============================================================================

/// Raw RGB frame from a camera stream
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

/// A live camera stream; must stop the device on `release`
pub trait CameraStream: Send {
    fn grab(&mut self) -> Result<Frame, AcquireError>;
    fn release(&mut self);
}

pub trait CameraDevice {
    fn open(&mut self) -> Result<Box<dyn CameraStream>, AcquireError>;
}

/// Scoped camera access. The stream is released on `close` or on drop,
/// even if a capture never happened.
pub struct CaptureSession {
    stream: Option<Box<dyn CameraStream>>,
}

impl CaptureSession {
    pub fn start(device: &mut dyn CameraDevice) -> Result<Self, AcquireError> {
        let stream = device.open()?;
        info!("Camera stream opened");
        Ok(Self { stream: Some(stream) })
    }

    /// Grab a frame and encode it
    pub fn capture(&mut self) -> Result<EncodedImage, AcquireError> {
        let stream = self.stream.as_mut().ok_or(AcquireError::Cancelled)?;
        let frame = stream.grab()?;
        let rgb = RgbImage::from_raw(frame.width, frame.height, frame.rgb)
            .ok_or_else(|| AcquireError::Decode("frame buffer does not match its size".to_string()))?;
        encode_dynamic(DynamicImage::ImageRgb8(rgb), CAMERA_QUALITY)
    }

    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.release();
            info!("Camera stream released");
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.release();
    }
}
