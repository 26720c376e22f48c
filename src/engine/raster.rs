//! Pure Rust production engine on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, WebP, BMP, TIFF) | `image` crate decoders |
//! | Animated GIF | `GifDecoder::into_frames` / `GifEncoder::encode_frames` |
//! | Resize | `resize_exact` / `resize_to_fill` with `Lanczos3` |
//! | Rotate | `rotate90` / `rotate180` / `rotate270` |
//! | EXIF orientation | decoder `orientation()` + `apply_orientation` |
//! | Filters | `imageops` (blur, unsharpen, brighten, contrast, grayscale) |
//! | Watermark | alpha-scaled `imageops::overlay` |
//!
//! Animated handles apply every operation per frame, so a resized GIF keeps
//! its timing and frame offsets. Encoding to a still format flattens to the
//! first frame (the pipeline normally reloads single-frame beforehand, so
//! the flatten here is only a fallback).

use super::{
    CropRegion, Encoded, EngineError, ImageEngine, ImageHandle, ImageInfo, LoadOptions,
    OverlaySpec, PixelFormat, Pixels, ResizeMode, ResizeSpec,
};
use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{
    AnimationDecoder, DynamicImage, ExtendedColorType, Frame, ImageDecoder, ImageFormat,
    ImageReader, Rgba, RgbaImage, imageops,
};
use log::debug;
use std::io::Cursor;

/// Quality used when no `quality` action ran.
const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Production [`ImageEngine`] — pure Rust, statically linked.
pub struct RasterEngine;

impl RasterEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RasterEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn pixel_format(format: ImageFormat) -> Option<PixelFormat> {
    match format {
        ImageFormat::Jpeg => Some(PixelFormat::Jpeg),
        ImageFormat::Png => Some(PixelFormat::Png),
        ImageFormat::WebP => Some(PixelFormat::Webp),
        ImageFormat::Gif => Some(PixelFormat::Gif),
        ImageFormat::Bmp => Some(PixelFormat::Bmp),
        ImageFormat::Tiff => Some(PixelFormat::Tiff),
        _ => None,
    }
}

/// Apply a whole-image transform to every frame of the handle.
fn transform(handle: &mut ImageHandle, f: impl Fn(DynamicImage) -> DynamicImage) {
    match handle.pixels_mut() {
        Pixels::Still(image) => {
            let owned = std::mem::replace(image, DynamicImage::new_rgb8(1, 1));
            *image = f(owned);
        }
        Pixels::Animated(frames) => {
            for frame in frames.iter_mut() {
                let (left, top, delay) = (frame.left(), frame.top(), frame.delay());
                let out = f(DynamicImage::ImageRgba8(frame.buffer().clone())).into_rgba8();
                *frame = Frame::from_parts(out, left, top, delay);
            }
        }
    }
}

/// Computed resize target. `None` means the request is a no-op (target would
/// enlarge and `limit_0` was not given).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResizePlan {
    /// Resize to exactly these dimensions.
    Scale(u32, u32),
    /// Cover the box, then center-crop to it.
    Fill(u32, u32),
    /// Fit the image to `inner`, then center it on a white canvas.
    Pad { inner: (u32, u32), canvas: (u32, u32) },
}

fn scaled(src: (u32, u32), scale: f64) -> (u32, u32) {
    let w = ((src.0 as f64) * scale).round().max(1.0) as u32;
    let h = ((src.1 as f64) * scale).round().max(1.0) as u32;
    (w, h)
}

/// Ratio-preserving scale factor for a target box. `cover` picks the factor
/// that covers the box, otherwise the factor that fits inside it.
fn box_scale(src: (u32, u32), width: Option<u32>, height: Option<u32>, cover: bool) -> f64 {
    let sx = width.map(|w| w as f64 / src.0 as f64);
    let sy = height.map(|h| h as f64 / src.1 as f64);
    match (sx, sy) {
        (Some(sx), Some(sy)) => {
            if cover {
                sx.max(sy)
            } else {
                sx.min(sy)
            }
        }
        (Some(sx), None) => sx,
        (None, Some(sy)) => sy,
        (None, None) => 1.0,
    }
}

fn plan_resize(src: (u32, u32), spec: &ResizeSpec) -> Option<ResizePlan> {
    let enlarge_guard = |target: (u32, u32)| {
        if !spec.allow_enlarge && (target.0 > src.0 || target.1 > src.1) {
            None
        } else {
            Some(target)
        }
    };

    if let Some(percent) = spec.percent {
        let target = scaled(src, percent as f64 / 100.0);
        return enlarge_guard(target).map(|(w, h)| ResizePlan::Scale(w, h));
    }
    if spec.width.is_none() && spec.height.is_none() {
        return None;
    }

    match spec.mode {
        ResizeMode::Lfit | ResizeMode::Mfit => {
            let cover = spec.mode == ResizeMode::Mfit;
            let scale = box_scale(src, spec.width, spec.height, cover);
            enlarge_guard(scaled(src, scale)).map(|(w, h)| ResizePlan::Scale(w, h))
        }
        ResizeMode::Fixed => {
            let w = spec.width.unwrap_or(src.0);
            let h = spec.height.unwrap_or(src.1);
            enlarge_guard((w, h)).map(|(w, h)| ResizePlan::Scale(w, h))
        }
        ResizeMode::Fill => {
            // A single dimension means a square box.
            let w = spec.width.or(spec.height).unwrap();
            let h = spec.height.or(spec.width).unwrap();
            enlarge_guard((w, h)).map(|(w, h)| ResizePlan::Fill(w, h))
        }
        ResizeMode::Pad => {
            let w = spec.width.or(spec.height).unwrap();
            let h = spec.height.or(spec.width).unwrap();
            let mut scale = box_scale(src, Some(w), Some(h), false);
            // The canvas may exceed the source; the content never does
            // unless limit_0 was given.
            if !spec.allow_enlarge {
                scale = scale.min(1.0);
            }
            Some(ResizePlan::Pad {
                inner: scaled(src, scale),
                canvas: (w, h),
            })
        }
    }
}

fn pad_onto_canvas(image: DynamicImage, inner: (u32, u32), canvas: (u32, u32)) -> DynamicImage {
    let fitted = image.resize_exact(inner.0, inner.1, FilterType::Lanczos3);
    let mut background = RgbaImage::from_pixel(canvas.0, canvas.1, Rgba([255, 255, 255, 255]));
    let x = (canvas.0.saturating_sub(inner.0) / 2) as i64;
    let y = (canvas.1.saturating_sub(inner.1) / 2) as i64;
    imageops::overlay(&mut background, &fitted.into_rgba8(), x, y);
    DynamicImage::ImageRgba8(background)
}

/// Zero the alpha of every pixel outside the corner circles of radius `r`.
fn round_rgba(image: &mut RgbaImage, radius: u32) {
    let (w, h) = image.dimensions();
    let r = radius.min(w / 2).min(h / 2) as i64;
    if r == 0 {
        return;
    }
    for y in 0..h {
        for x in 0..w {
            let dx = if (x as i64) < r {
                r - x as i64
            } else if (x as i64) >= w as i64 - r {
                x as i64 - (w as i64 - 1 - r)
            } else {
                0
            };
            let dy = if (y as i64) < r {
                r - y as i64
            } else if (y as i64) >= h as i64 - r {
                y as i64 - (h as i64 - 1 - r)
            } else {
                0
            };
            if dx > 0 && dy > 0 && dx * dx + dy * dy > r * r {
                image.get_pixel_mut(x, y).0[3] = 0;
            }
        }
    }
}

fn encode_err(e: image::ImageError) -> EngineError {
    EngineError::Encode(e.to_string())
}

fn decode_err(e: image::ImageError) -> EngineError {
    EngineError::Decode(e.to_string())
}

impl ImageEngine for RasterEngine {
    fn load(&self, bytes: &[u8], opts: &LoadOptions) -> Result<ImageHandle, EngineError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| EngineError::Decode(e.to_string()))?;
        let Some(detected) = reader.format() else {
            return Err(EngineError::Decode("unrecognized image format".into()));
        };
        let format = pixel_format(detected)
            .ok_or_else(|| EngineError::Unsupported(format!("{detected:?}")))?;

        if format == PixelFormat::Gif && opts.all_frames {
            let decoder = GifDecoder::new(Cursor::new(bytes)).map_err(decode_err)?;
            let frames = decoder.into_frames().collect_frames().map_err(decode_err)?;
            match frames.len() {
                0 => return Err(EngineError::Decode("GIF with no frames".into())),
                1 => {
                    let frame = frames.into_iter().next().unwrap();
                    let image = DynamicImage::ImageRgba8(frame.into_buffer());
                    return Ok(ImageHandle::still(image, format));
                }
                _ => return Ok(ImageHandle::animated(frames, format)),
            }
        }

        let mut decoder = reader.into_decoder().map_err(decode_err)?;
        let orientation = decoder.orientation().ok();
        let image = DynamicImage::from_decoder(decoder).map_err(decode_err)?;
        let mut handle = ImageHandle::still(image, format);
        if let Some(orientation) = orientation {
            handle.set_orientation(orientation);
        }
        Ok(handle)
    }

    fn metadata(&self, handle: &ImageHandle) -> ImageInfo {
        let (width, height) = handle.dimensions();
        ImageInfo {
            format: handle.source_format(),
            width,
            height,
            channels: handle.color_channels(),
            pages: handle.pages(),
        }
    }

    fn resize(&self, handle: &mut ImageHandle, spec: &ResizeSpec) -> Result<(), EngineError> {
        let Some(plan) = plan_resize(handle.dimensions(), spec) else {
            debug!("resize is a no-op for {:?}", spec);
            return Ok(());
        };
        match plan {
            ResizePlan::Scale(w, h) => {
                transform(handle, |img| img.resize_exact(w, h, FilterType::Lanczos3));
            }
            ResizePlan::Fill(w, h) => {
                transform(handle, |img| img.resize_to_fill(w, h, FilterType::Lanczos3));
            }
            ResizePlan::Pad { inner, canvas } => {
                transform(handle, |img| pad_onto_canvas(img, inner, canvas));
            }
        }
        Ok(())
    }

    fn crop(&self, handle: &mut ImageHandle, region: CropRegion) -> Result<(), EngineError> {
        let (w, h) = handle.dimensions();
        if region.x >= w || region.y >= h {
            return Err(EngineError::Unsupported(format!(
                "crop region {region:?} outside {w}x{h} image"
            )));
        }
        let cw = region.width.min(w - region.x).max(1);
        let ch = region.height.min(h - region.y).max(1);
        transform(handle, |img| img.crop_imm(region.x, region.y, cw, ch));
        Ok(())
    }

    fn rotate(&self, handle: &mut ImageHandle, degrees: u16) -> Result<(), EngineError> {
        match degrees % 360 {
            0 => {}
            90 => transform(handle, |img| img.rotate90()),
            180 => transform(handle, |img| img.rotate180()),
            270 => transform(handle, |img| img.rotate270()),
            other => {
                return Err(EngineError::Unsupported(format!(
                    "rotation by {other} degrees (quarter turns only)"
                )));
            }
        }
        Ok(())
    }

    fn orient(&self, handle: &mut ImageHandle) -> Result<(), EngineError> {
        let Some(orientation) = handle.take_orientation() else {
            return Ok(());
        };
        if let Pixels::Still(image) = handle.pixels_mut() {
            image.apply_orientation(orientation);
        }
        Ok(())
    }

    fn round_corners(&self, handle: &mut ImageHandle, radius: u32) -> Result<(), EngineError> {
        transform(handle, |img| {
            let mut rgba = img.into_rgba8();
            round_rgba(&mut rgba, radius);
            DynamicImage::ImageRgba8(rgba)
        });
        Ok(())
    }

    fn grayscale(&self, handle: &mut ImageHandle) -> Result<(), EngineError> {
        transform(handle, |img| img.grayscale());
        Ok(())
    }

    fn brighten(&self, handle: &mut ImageHandle, value: i32) -> Result<(), EngineError> {
        transform(handle, |img| img.brighten(value));
        Ok(())
    }

    fn adjust_contrast(&self, handle: &mut ImageHandle, value: f32) -> Result<(), EngineError> {
        transform(handle, |img| img.adjust_contrast(value));
        Ok(())
    }

    fn blur(&self, handle: &mut ImageHandle, sigma: f32) -> Result<(), EngineError> {
        transform(handle, |img| img.blur(sigma));
        Ok(())
    }

    fn sharpen(
        &self,
        handle: &mut ImageHandle,
        sigma: f32,
        threshold: i32,
    ) -> Result<(), EngineError> {
        transform(handle, |img| img.unsharpen(sigma, threshold));
        Ok(())
    }

    fn overlay(
        &self,
        handle: &mut ImageHandle,
        overlay: &ImageHandle,
        spec: &OverlaySpec,
    ) -> Result<(), EngineError> {
        let mut top = match overlay.pixels() {
            Pixels::Still(image) => image.to_rgba8(),
            Pixels::Animated(frames) => frames
                .first()
                .map(|f| f.buffer().clone())
                .ok_or_else(|| EngineError::Unsupported("empty overlay".into()))?,
        };
        let opacity = spec.opacity.clamp(0.0, 1.0);
        if opacity < 1.0 {
            for pixel in top.pixels_mut() {
                pixel.0[3] = (pixel.0[3] as f32 * opacity) as u8;
            }
        }
        let (x, y) = (spec.x, spec.y);
        transform(handle, |img| {
            let mut base = img.into_rgba8();
            imageops::overlay(&mut base, &top, x, y);
            DynamicImage::ImageRgba8(base)
        });
        Ok(())
    }

    fn encode(&self, handle: &ImageHandle) -> Result<Encoded, EngineError> {
        let settings = *handle.encode_settings();
        let target = settings.format.unwrap_or(handle.source_format());

        if let Pixels::Animated(frames) = handle.pixels()
            && target == PixelFormat::Gif
            && frames.len() > 1
        {
            let mut data = Vec::new();
            {
                let mut encoder = GifEncoder::new(&mut data);
                encoder.set_repeat(Repeat::Infinite).map_err(encode_err)?;
                encoder
                    .encode_frames(frames.iter().cloned())
                    .map_err(encode_err)?;
            }
            let (width, height) = handle.dimensions();
            return Ok(Encoded {
                data,
                info: ImageInfo {
                    format: PixelFormat::Gif,
                    width,
                    height,
                    channels: 4,
                    pages: frames.len() as u32,
                },
            });
        }

        let image = match handle.pixels() {
            Pixels::Still(image) => image.clone(),
            Pixels::Animated(frames) => DynamicImage::ImageRgba8(
                frames
                    .first()
                    .ok_or_else(|| EngineError::Encode("no frames to encode".into()))?
                    .buffer()
                    .clone(),
            ),
        };
        let (width, height) = (image.width(), image.height());
        let mut data = Vec::new();
        let channels;

        match target {
            PixelFormat::Jpeg => {
                if settings.progressive {
                    // The pure-Rust encoder emits baseline JPEG only.
                    debug!("progressive JPEG requested; encoding baseline");
                }
                let rgb = image.into_rgb8();
                let quality = settings.quality.unwrap_or(DEFAULT_JPEG_QUALITY);
                let mut encoder = JpegEncoder::new_with_quality(Cursor::new(&mut data), quality);
                encoder.encode_image(&rgb).map_err(encode_err)?;
                channels = 3;
            }
            PixelFormat::Png => {
                image
                    .write_with_encoder(PngEncoder::new(Cursor::new(&mut data)))
                    .map_err(encode_err)?;
                channels = image.color().channel_count();
            }
            PixelFormat::Webp => {
                // Lossless-only encoder; accepts RGB8/RGBA8.
                if image.color().has_alpha() {
                    let rgba = image.into_rgba8();
                    WebPEncoder::new_lossless(Cursor::new(&mut data))
                        .encode(&rgba, width, height, ExtendedColorType::Rgba8)
                        .map_err(encode_err)?;
                    channels = 4;
                } else {
                    let rgb = image.into_rgb8();
                    WebPEncoder::new_lossless(Cursor::new(&mut data))
                        .encode(&rgb, width, height, ExtendedColorType::Rgb8)
                        .map_err(encode_err)?;
                    channels = 3;
                }
            }
            PixelFormat::Gif => {
                let frame = Frame::new(image.into_rgba8());
                {
                    let mut encoder = GifEncoder::new(&mut data);
                    encoder.encode_frame(frame).map_err(encode_err)?;
                }
                channels = 4;
            }
            PixelFormat::Bmp => {
                let rgba = DynamicImage::ImageRgba8(image.into_rgba8());
                rgba.write_to(&mut Cursor::new(&mut data), ImageFormat::Bmp)
                    .map_err(encode_err)?;
                channels = 4;
            }
            PixelFormat::Tiff => {
                channels = image.color().channel_count();
                image
                    .write_to(&mut Cursor::new(&mut data), ImageFormat::Tiff)
                    .map_err(encode_err)?;
            }
        }

        Ok(Encoded {
            data,
            info: ImageInfo {
                format: target,
                width,
                height,
                channels,
                pages: 1,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(width: Option<u32>, height: Option<u32>, mode: ResizeMode) -> ResizeSpec {
        ResizeSpec {
            width,
            height,
            mode,
            ..ResizeSpec::default()
        }
    }

    #[test]
    fn lfit_single_dimension_scales_proportionally() {
        let plan = plan_resize((400, 200), &spec(Some(50), None, ResizeMode::Lfit));
        assert_eq!(plan, Some(ResizePlan::Scale(50, 25)));
    }

    #[test]
    fn lfit_box_uses_smaller_scale() {
        let plan = plan_resize((400, 200), &spec(Some(100), Some(100), ResizeMode::Lfit));
        assert_eq!(plan, Some(ResizePlan::Scale(100, 50)));
    }

    #[test]
    fn mfit_box_uses_larger_scale() {
        let plan = plan_resize((400, 200), &spec(Some(100), Some(100), ResizeMode::Mfit));
        assert_eq!(plan, Some(ResizePlan::Scale(200, 100)));
    }

    #[test]
    fn enlargement_is_a_noop_by_default() {
        assert_eq!(
            plan_resize((50, 50), &spec(Some(100), Some(100), ResizeMode::Fixed)),
            None
        );
        assert_eq!(
            plan_resize((50, 50), &spec(Some(100), None, ResizeMode::Lfit)),
            None
        );
    }

    #[test]
    fn limit_zero_permits_enlargement() {
        let plan = plan_resize(
            (50, 50),
            &ResizeSpec {
                width: Some(100),
                height: Some(100),
                mode: ResizeMode::Fixed,
                allow_enlarge: true,
                ..ResizeSpec::default()
            },
        );
        assert_eq!(plan, Some(ResizePlan::Scale(100, 100)));
    }

    #[test]
    fn percent_overrides_box() {
        let plan = plan_resize(
            (400, 200),
            &ResizeSpec {
                width: Some(999),
                percent: Some(50),
                ..ResizeSpec::default()
            },
        );
        assert_eq!(plan, Some(ResizePlan::Scale(200, 100)));
    }

    #[test]
    fn empty_spec_is_a_noop() {
        assert_eq!(plan_resize((400, 200), &ResizeSpec::default()), None);
    }

    #[test]
    fn fill_single_dimension_means_square() {
        let plan = plan_resize((400, 200), &spec(Some(100), None, ResizeMode::Fill));
        assert_eq!(plan, Some(ResizePlan::Fill(100, 100)));
    }

    #[test]
    fn pad_caps_content_scale_but_keeps_canvas() {
        let plan = plan_resize((40, 20), &spec(Some(100), Some(100), ResizeMode::Pad));
        assert_eq!(
            plan,
            Some(ResizePlan::Pad {
                inner: (40, 20),
                canvas: (100, 100),
            })
        );
    }

    #[test]
    fn rounded_corners_clear_the_corner_alpha() {
        let mut rgba = RgbaImage::from_pixel(20, 20, Rgba([10, 20, 30, 255]));
        round_rgba(&mut rgba, 8);

        assert_eq!(rgba.get_pixel(0, 0).0[3], 0);
        assert_eq!(rgba.get_pixel(19, 0).0[3], 0);
        assert_eq!(rgba.get_pixel(0, 19).0[3], 0);
        assert_eq!(rgba.get_pixel(19, 19).0[3], 0);
        // Center and edge midpoints stay opaque.
        assert_eq!(rgba.get_pixel(10, 10).0[3], 255);
        assert_eq!(rgba.get_pixel(10, 0).0[3], 255);
        assert_eq!(rgba.get_pixel(0, 10).0[3], 255);
    }

    #[test]
    fn load_reports_png_metadata() {
        let mut bytes = Vec::new();
        DynamicImage::new_rgb8(30, 20)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        let engine = RasterEngine::new();
        let handle = engine.load(&bytes, &LoadOptions::default()).unwrap();
        let info = engine.metadata(&handle);

        assert_eq!(info.format, PixelFormat::Png);
        assert_eq!((info.width, info.height), (30, 20));
        assert_eq!(info.pages, 1);
    }

    #[test]
    fn load_rejects_garbage() {
        let engine = RasterEngine::new();
        assert!(matches!(
            engine.load(b"not an image", &LoadOptions::default()),
            Err(EngineError::Decode(_))
        ));
    }

    #[test]
    fn rotate_rejects_odd_angles() {
        let engine = RasterEngine::new();
        let mut handle =
            ImageHandle::still(DynamicImage::new_rgb8(4, 4), PixelFormat::Png);
        assert!(matches!(
            engine.rotate(&mut handle, 45),
            Err(EngineError::Unsupported(_))
        ));
    }

    #[test]
    fn encode_respects_target_format() {
        let engine = RasterEngine::new();
        let mut handle =
            ImageHandle::still(DynamicImage::new_rgb8(10, 10), PixelFormat::Jpeg);
        handle.encode_settings_mut().format = Some(PixelFormat::Png);

        let encoded = engine.encode(&handle).unwrap();
        assert_eq!(encoded.info.format, PixelFormat::Png);

        // Output really is a PNG.
        let reloaded = engine.load(&encoded.data, &LoadOptions::default()).unwrap();
        assert_eq!(reloaded.source_format(), PixelFormat::Png);
    }
}
