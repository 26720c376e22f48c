//! End-to-end pipeline tests over the real raster engine.
//!
//! Fixtures are generated in memory — a solid PNG, a JPEG, a three-frame
//! GIF — seeded into a `MemStore`, processed through the production
//! processor, and the encoded output decoded again for assertions.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use image::codecs::gif::{GifDecoder, GifEncoder};
use image::{AnimationDecoder, DynamicImage, Frame, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use imgpipe::{
    ImageProcessor, MemStore, MemStyleStore, PipelineError, PixelFormat, StyleProcessor,
};
use std::io::Cursor;

fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Vec::new();
    image.write_to(&mut Cursor::new(&mut out), format).unwrap();
    out
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([255, 0, 0])));
    encode(image, ImageFormat::Png)
}

fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([0, 128, 255])));
    encode(image, ImageFormat::Jpeg)
}

fn animated_gif_bytes(width: u32, height: u32, frames: u32) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut out);
        for i in 0..frames {
            let shade = (i * 60) as u8;
            let frame = Frame::new(RgbaImage::from_pixel(
                width,
                height,
                Rgba([shade, 255 - shade, 0, 255]),
            ));
            encoder.encode_frame(frame).unwrap();
        }
    }
    out
}

fn store_with(key: &str, bytes: Vec<u8>) -> MemStore {
    let store = MemStore::new();
    store.insert(key, bytes);
    store
}

#[test]
fn resize_fixed_enlarges_with_limit_zero() {
    let store = store_with("source.png", png_bytes(50, 50));
    let p = ImageProcessor::global();

    let mut ctx = p
        .new_context("source.png", "image/resize,w_100,h_100,m_fixed,limit_0/", &store)
        .unwrap();
    let output = p.process(&mut ctx).unwrap();

    assert_eq!((output.info.width, output.info.height), (100, 100));
    let decoded = image::load_from_memory(&output.data).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (100, 100));
}

#[test]
fn resize_without_limit_zero_never_enlarges() {
    let store = store_with("source.png", png_bytes(50, 50));
    let p = ImageProcessor::global();

    let mut ctx = p
        .new_context("source.png", "image/resize,w_100,h_100,m_fixed", &store)
        .unwrap();
    let output = p.process(&mut ctx).unwrap();

    assert_eq!((output.info.width, output.info.height), (50, 50));
}

#[test]
fn crop_round_corners_format_chain() {
    let store = store_with("example.jpg", jpeg_bytes(400, 200));
    let p = ImageProcessor::global();

    let mut ctx = p
        .new_context(
            "example.jpg",
            "image/crop,w_100,h_100/rounded-corners,r_10/format,png",
            &store,
        )
        .unwrap();
    let output = p.process(&mut ctx).unwrap();

    assert_eq!((output.info.width, output.info.height), (100, 100));
    assert_eq!(output.info.format, PixelFormat::Png);
    assert_eq!(output.info.channels, 4);

    // The corner really is transparent and the center opaque.
    let decoded = image::load_from_memory(&output.data).unwrap().into_rgba8();
    assert_eq!(decoded.get_pixel(0, 0).0[3], 0);
    assert_eq!(decoded.get_pixel(50, 50).0[3], 255);
}

#[test]
fn resize_single_dimension_keeps_ratio() {
    let store = store_with("example.jpg", jpeg_bytes(400, 200));
    let p = ImageProcessor::global();

    let mut ctx = p
        .new_context("example.jpg", "image/resize,w_50/format,png", &store)
        .unwrap();
    let output = p.process(&mut ctx).unwrap();

    assert_eq!((output.info.width, output.info.height), (50, 25));
}

#[test]
fn resize_then_rotate_quarter_turn() {
    let store = store_with("example.jpg", jpeg_bytes(400, 200));
    let p = ImageProcessor::global();

    let mut ctx = p
        .new_context("example.jpg", "image/resize,w_200/rotate,90", &store)
        .unwrap();
    let output = p.process(&mut ctx).unwrap();

    assert_eq!((output.info.width, output.info.height), (100, 200));
    assert_eq!(output.info.format, PixelFormat::Jpeg);
    assert_eq!(output.info.channels, 3);
}

#[test]
fn indexcrop_strip_wider_than_image_is_a_noop() {
    let store = store_with("example.jpg", jpeg_bytes(400, 200));
    let p = ImageProcessor::global();

    let mut ctx = p
        .new_context("example.jpg", "image/resize,w_20/indexcrop,x_50,i_0/", &store)
        .unwrap();
    let output = p.process(&mut ctx).unwrap();

    assert_eq!(output.info.width, 20);
}

#[test]
fn animated_gif_to_jpeg_flattens_to_one_frame() {
    let store = store_with("example.gif", animated_gif_bytes(50, 30, 3));
    let p = ImageProcessor::global();

    let mut ctx = p
        .new_context("example.gif", "image/format,jpg", &store)
        .unwrap();
    assert_eq!(ctx.info.pages, 3);

    let output = p.process(&mut ctx).unwrap();

    assert!(!ctx.features.read_all_frames);
    assert_eq!((output.info.width, output.info.height), (50, 30));
    assert_eq!(output.info.format, PixelFormat::Jpeg);
    assert_eq!(output.info.channels, 3);
    assert_eq!(output.info.pages, 1);
}

#[test]
fn animated_gif_to_png_flattens_to_one_frame() {
    let store = store_with("example.gif", animated_gif_bytes(50, 30, 3));
    let p = ImageProcessor::global();

    let mut ctx = p
        .new_context("example.gif", "image/format,png", &store)
        .unwrap();
    let output = p.process(&mut ctx).unwrap();

    assert!(!ctx.features.read_all_frames);
    assert_eq!((output.info.width, output.info.height), (50, 30));
    assert_eq!(output.info.format, PixelFormat::Png);
}

#[test]
fn animated_gif_resize_keeps_every_frame() {
    let store = store_with("example.gif", animated_gif_bytes(50, 30, 3));
    let p = ImageProcessor::global();

    let mut ctx = p
        .new_context("example.gif", "image/resize,w_25", &store)
        .unwrap();
    let output = p.process(&mut ctx).unwrap();

    assert_eq!(output.info.format, PixelFormat::Gif);
    assert_eq!(output.info.pages, 3);

    let decoder = GifDecoder::new(Cursor::new(&output.data)).unwrap();
    let frames = decoder.into_frames().collect_frames().unwrap();
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].buffer().width(), 25);
}

#[test]
fn auto_webp_applies_when_no_format_action_ran() {
    let store = store_with("example.jpg", jpeg_bytes(40, 40));
    let p = ImageProcessor::global();

    let mut ctx = p.new_context("example.jpg", "", &store).unwrap();
    ctx.features.auto_webp = true;
    let output = p.process(&mut ctx).unwrap();

    assert_eq!(output.info.format, PixelFormat::Webp);
    let decoded = image::ImageReader::new(Cursor::new(&output.data))
        .with_guessed_format()
        .unwrap();
    assert_eq!(decoded.format(), Some(ImageFormat::WebP));
}

#[test]
fn explicit_format_overrides_auto_webp() {
    let store = store_with("example.jpg", jpeg_bytes(40, 40));
    let p = ImageProcessor::global();

    let mut ctx = p
        .new_context("example.jpg", "image/format,png", &store)
        .unwrap();
    ctx.features.auto_webp = true;
    let output = p.process(&mut ctx).unwrap();

    assert_eq!(output.info.format, PixelFormat::Png);
}

#[test]
fn format_selection_is_source_independent() {
    let p = ImageProcessor::global();
    for (key, bytes) in [
        ("a.jpg", jpeg_bytes(30, 30)),
        ("b.png", png_bytes(30, 30)),
        ("c.gif", animated_gif_bytes(30, 30, 2)),
    ] {
        let store = store_with(key, bytes);
        let mut ctx = p.new_context(key, "image/format,png", &store).unwrap();
        let output = p.process(&mut ctx).unwrap();
        assert_eq!(output.info.format, PixelFormat::Png, "source {key}");
    }
}

#[test]
fn unknown_action_fails_with_not_found() {
    let store = store_with("example.jpg", jpeg_bytes(40, 40));
    let p = ImageProcessor::global();

    let mut ctx = p
        .new_context("example.jpg", "image/sepia,1/resize,w_10", &store)
        .unwrap();
    let err = p.process(&mut ctx).unwrap_err();

    assert!(matches!(err, PipelineError::NotFound(_)));
    assert_eq!(err.to_string(), "unknown action sepia");
}

#[test]
fn style_behaves_like_the_stored_instruction() {
    let instruction = "image/resize,w_100,h_100,m_fixed,limit_0/";
    let p = ImageProcessor::global();
    let styles = MemStyleStore::from_styles([("style1", instruction)]);
    let style_processor = StyleProcessor::new(&styles, p);

    let store = store_with("source.png", png_bytes(50, 50));
    let mut ctx = style_processor
        .new_context("source.png", "style/style1", &store)
        .unwrap();
    let styled = style_processor.process(&mut ctx).unwrap();

    let store = store_with("source.png", png_bytes(50, 50));
    let mut ctx = p.new_context("source.png", instruction, &store).unwrap();
    let direct = p.process(&mut ctx).unwrap();

    assert_eq!(styled.info, direct.info);
    assert_eq!(styled.data, direct.data);
}

#[test]
fn invalid_style_name_is_rejected_before_lookup() {
    let p = ImageProcessor::global();
    let styles = MemStyleStore::from_styles([("style1", "image/resize,w_100")]);
    let style_processor = StyleProcessor::new(&styles, p);

    let store = store_with("source.png", png_bytes(50, 50));
    let mut ctx = style_processor
        .new_context("source.png", "style/ #$ ", &store)
        .unwrap();
    let err = style_processor.process(&mut ctx).unwrap_err();

    assert!(matches!(err, PipelineError::InvalidArgument(_)));
    assert_eq!(err.to_string(), "Invalid style name");
}

#[test]
fn unregistered_style_is_not_found() {
    let p = ImageProcessor::global();
    let styles = MemStyleStore::from_styles([("style1", "image/resize,w_100")]);
    let style_processor = StyleProcessor::new(&styles, p);

    let store = store_with("source.png", png_bytes(50, 50));
    let mut ctx = style_processor
        .new_context("source.png", "style/notfound", &store)
        .unwrap();
    let err = style_processor.process(&mut ctx).unwrap_err();

    assert!(matches!(err, PipelineError::NotFound(_)));
    assert_eq!(err.to_string(), "Style not found");
}

#[test]
fn watermark_composites_the_stored_overlay() {
    let store = store_with("base.png", png_bytes(100, 100));
    store.insert(
        "logo.png",
        encode(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, Rgb([0, 0, 255]))),
            ImageFormat::Png,
        ),
    );
    let p = ImageProcessor::global();

    let key = URL_SAFE_NO_PAD.encode("logo.png");
    let instruction = format!("image/watermark,image_{key},g_se");
    let mut ctx = p.new_context("base.png", &instruction, &store).unwrap();
    let output = p.process(&mut ctx).unwrap();

    let decoded = image::load_from_memory(&output.data).unwrap().into_rgba8();
    // Overlay sits 10px in from the south-east corner.
    assert_eq!(decoded.get_pixel(85, 85).0, [0, 0, 255, 255]);
    // Far corner keeps the base color.
    assert_eq!(decoded.get_pixel(5, 5).0, [255, 0, 0, 255]);
}

#[test]
fn grey_and_quality_pipeline_runs_end_to_end() {
    let store = store_with("example.jpg", jpeg_bytes(60, 40));
    let p = ImageProcessor::global();

    let mut ctx = p
        .new_context("example.jpg", "image/grey,1/quality,q_60", &store)
        .unwrap();
    let output = p.process(&mut ctx).unwrap();

    assert_eq!(output.info.format, PixelFormat::Jpeg);
    let decoded = image::load_from_memory(&output.data).unwrap().into_rgb8();
    let pixel = decoded.get_pixel(30, 20).0;
    // Grayscale JPEG: channels equalized (within compression tolerance).
    assert!(pixel[0].abs_diff(pixel[1]) < 8 && pixel[1].abs_diff(pixel[2]) < 8);
}
