//! Image engine seam.
//!
//! The [`ImageEngine`] trait is the boundary between pipeline logic and pixel
//! work. Actions describe *what* to do through spec structs; the engine does
//! it. The production implementation is [`RasterEngine`](raster::RasterEngine)
//! — pure Rust on the `image` crate, statically linked. Tests use a recording
//! mock so dispatch and masking can be asserted without decoding anything.
//!
//! An [`ImageHandle`] owns the decoded pixels (one still image, or the frame
//! list of an animated source), the source format, the EXIF orientation
//! captured at decode time, and the pending [`EncodeSettings`]. The handle is
//! single-writer: only the currently executing action mutates it.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod raster;

pub use raster::RasterEngine;

pub use image::Frame;
pub use image::metadata::Orientation;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

/// Formats the engine can decode and encode.
///
/// [`PixelFormat::from_name`] accepts the DSL spellings (`jpg` and `jpeg`
/// both map to [`PixelFormat::Jpeg`]); [`PixelFormat::name`] is the canonical
/// lowercase name reported in output info.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    Jpeg,
    Png,
    Webp,
    Gif,
    Bmp,
    Tiff,
}

impl PixelFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::Webp),
            "gif" => Some(Self::Gif),
            "bmp" => Some(Self::Bmp),
            "tif" | "tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
        }
    }

    /// File extension for derived outputs.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            other => other.name(),
        }
    }

    /// Whether the format can carry more than one frame.
    pub fn animatable(self) -> bool {
        matches!(self, Self::Gif)
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Metadata snapshot of a handle, and the info block returned with encoded
/// output (`format` is then the encoded format, `pages` the encoded frames).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub pages: u32,
}

/// Decode options for [`ImageEngine::load`].
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    /// Decode every frame of an animated source. When false only the first
    /// frame is read, which is how animated sources are flattened for still
    /// output formats.
    pub all_frames: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { all_frames: true }
    }
}

/// Pending output options, applied once at encode time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EncodeSettings {
    pub format: Option<PixelFormat>,
    /// True when a `format` action chose the output format. Finalization
    /// policy (auto-webp) only applies when this is false.
    pub explicit_format: bool,
    pub quality: Option<u8>,
    pub progressive: bool,
}

/// Decoded pixels: a still image or the frames of an animated source.
pub enum Pixels {
    Still(image::DynamicImage),
    Animated(Vec<Frame>),
}

/// One decoded image plus its pending encode settings.
pub struct ImageHandle {
    pixels: Pixels,
    source_format: PixelFormat,
    orientation: Option<Orientation>,
    encode: EncodeSettings,
}

impl ImageHandle {
    pub fn still(image: image::DynamicImage, format: PixelFormat) -> Self {
        Self {
            pixels: Pixels::Still(image),
            source_format: format,
            orientation: None,
            encode: EncodeSettings::default(),
        }
    }

    /// A handle over decoded animation frames. A single-frame list behaves
    /// like a still image everywhere except `pages`.
    pub fn animated(frames: Vec<Frame>, format: PixelFormat) -> Self {
        Self {
            pixels: Pixels::Animated(frames),
            source_format: format,
            orientation: None,
            encode: EncodeSettings::default(),
        }
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = Some(orientation);
    }

    /// Consume the stored EXIF orientation (applied at most once).
    pub fn take_orientation(&mut self) -> Option<Orientation> {
        self.orientation.take()
    }

    pub fn source_format(&self) -> PixelFormat {
        self.source_format
    }

    pub fn pixels(&self) -> &Pixels {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut Pixels {
        &mut self.pixels
    }

    pub fn encode_settings(&self) -> &EncodeSettings {
        &self.encode
    }

    pub fn encode_settings_mut(&mut self) -> &mut EncodeSettings {
        &mut self.encode
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match &self.pixels {
            Pixels::Still(image) => (image.width(), image.height()),
            Pixels::Animated(frames) => frames
                .first()
                .map(|f| f.buffer().dimensions())
                .unwrap_or((0, 0)),
        }
    }

    pub fn pages(&self) -> u32 {
        match &self.pixels {
            Pixels::Still(_) => 1,
            Pixels::Animated(frames) => frames.len() as u32,
        }
    }

    pub fn color_channels(&self) -> u8 {
        match &self.pixels {
            Pixels::Still(image) => image.color().channel_count(),
            Pixels::Animated(_) => 4,
        }
    }
}

/// How to fit the image into the requested box. Mirrors the `m_` values of
/// the resize grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeMode {
    /// Largest image that fits inside the box, ratio preserved.
    #[default]
    Lfit,
    /// Smallest image that covers the box, ratio preserved.
    Mfit,
    /// Cover the box, then center-crop to it.
    Fill,
    /// Fit inside the box, then pad to it.
    Pad,
    /// Exactly the box, ratio ignored.
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResizeSpec {
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Proportional scale in percent; overrides width/height when set.
    pub percent: Option<u32>,
    pub mode: ResizeMode,
    /// `limit_0` — permit scaling beyond the source dimensions. Off by
    /// default: a target larger than the source leaves the image untouched.
    pub allow_enlarge: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct OverlaySpec {
    pub x: i64,
    pub y: i64,
    /// 0.0–1.0 multiplier applied to the overlay's alpha.
    pub opacity: f32,
}

/// Encoded output bytes plus final info.
pub struct Encoded {
    pub data: Vec<u8>,
    pub info: ImageInfo,
}

/// Pixel-work capability consumed by actions.
///
/// Every mutation takes `&mut ImageHandle`; the pipeline guarantees at most
/// one call is in flight per handle. Implementations must be shareable
/// across request threads.
pub trait ImageEngine: Send + Sync {
    fn load(&self, bytes: &[u8], opts: &LoadOptions) -> Result<ImageHandle, EngineError>;

    /// Metadata snapshot. Infallible: handles are always fully decoded.
    fn metadata(&self, handle: &ImageHandle) -> ImageInfo;

    fn resize(&self, handle: &mut ImageHandle, spec: &ResizeSpec) -> Result<(), EngineError>;

    fn crop(&self, handle: &mut ImageHandle, region: CropRegion) -> Result<(), EngineError>;

    /// Quarter-turn rotation; `degrees` must be a multiple of 90.
    fn rotate(&self, handle: &mut ImageHandle, degrees: u16) -> Result<(), EngineError>;

    /// Apply the EXIF orientation captured at decode, if any.
    fn orient(&self, handle: &mut ImageHandle) -> Result<(), EngineError>;

    fn round_corners(&self, handle: &mut ImageHandle, radius: u32) -> Result<(), EngineError>;

    fn grayscale(&self, handle: &mut ImageHandle) -> Result<(), EngineError>;

    fn brighten(&self, handle: &mut ImageHandle, value: i32) -> Result<(), EngineError>;

    fn adjust_contrast(&self, handle: &mut ImageHandle, value: f32) -> Result<(), EngineError>;

    fn blur(&self, handle: &mut ImageHandle, sigma: f32) -> Result<(), EngineError>;

    fn sharpen(
        &self,
        handle: &mut ImageHandle,
        sigma: f32,
        threshold: i32,
    ) -> Result<(), EngineError>;

    /// Composite `overlay` onto the handle at the spec position.
    fn overlay(
        &self,
        handle: &mut ImageHandle,
        overlay: &ImageHandle,
        spec: &OverlaySpec,
    ) -> Result<(), EngineError>;

    fn encode(&self, handle: &ImageHandle) -> Result<Encoded, EngineError>;
}
