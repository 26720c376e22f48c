//! `watermark` — composite a stored image onto the canvas.
//!
//! Grammar: `watermark,image_<base64url(key)>,t_90,g_se,x_10,y_10`. The
//! overlay is fetched through the context's byte store under the decoded
//! key, positioned by gravity plus the x/y inset, and blended with `t_`
//! percent opacity. An overlay larger than the canvas is a silent no-op.
//! Disabled for animated sources.

use super::{Action, Gravity, split_kv};
use crate::context::ProcessingContext;
use crate::engine::{LoadOptions, OverlaySpec, PixelFormat};
use crate::error::{PipelineError, Result};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use log::debug;

const HINT: &str = "Watermark param error, e.g: watermark,image_<base64url key>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatermarkOpts {
    pub key: String,
    /// Opacity percentage, 0–100.
    pub opacity: u32,
    pub gravity: Gravity,
    pub x: u32,
    pub y: u32,
}

pub struct WatermarkAction;

impl WatermarkAction {
    pub fn options(params: &[String]) -> Result<WatermarkOpts> {
        if params.len() < 2 {
            return Err(PipelineError::invalid(HINT));
        }
        let mut opt = WatermarkOpts {
            key: String::new(),
            opacity: 100,
            gravity: Gravity::SouthEast,
            x: 10,
            y: 10,
        };
        for param in &params[1..] {
            match split_kv(param) {
                ("image", value) => {
                    let decoded = URL_SAFE_NO_PAD.decode(value).map_err(|_| {
                        PipelineError::invalid("Watermark image key must be base64url")
                    })?;
                    opt.key = String::from_utf8(decoded).map_err(|_| {
                        PipelineError::invalid("Watermark image key must be base64url")
                    })?;
                }
                ("t", value) => {
                    opt.opacity = super::parse_ranged_u32(
                        value,
                        0,
                        100,
                        "Watermark transparency must be between 0 and 100",
                    )?;
                }
                ("g", value) => {
                    opt.gravity = Gravity::from_param(value)
                        .ok_or_else(|| PipelineError::invalid(HINT))?;
                }
                ("x", value) => opt.x = super::parse_ranged_u32(value, 0, 4096, HINT)?,
                ("y", value) => opt.y = super::parse_ranged_u32(value, 0, 4096, HINT)?,
                _ => return Err(PipelineError::invalid(HINT)),
            }
        }
        if opt.key.is_empty() {
            return Err(PipelineError::invalid(HINT));
        }
        Ok(opt)
    }
}

impl Action for WatermarkAction {
    fn name(&self) -> &'static str {
        "watermark"
    }

    fn validate(&self, params: &[String]) -> Result<()> {
        Self::options(params).map(|_| ())
    }

    fn before_process(&self, ctx: &mut ProcessingContext, _params: &[String], index: usize) {
        if ctx.info.format == PixelFormat::Gif {
            ctx.mask.disable(index);
        }
    }

    fn process(&self, ctx: &mut ProcessingContext, params: &[String]) -> Result<()> {
        let opt = Self::options(params)?;
        let object = ctx.store.get(&opt.key)?;
        let overlay = ctx
            .engine
            .load(&object.bytes, &LoadOptions { all_frames: false })
            .map_err(|e| PipelineError::engine(self.name(), e))?;

        let (sw, sh) = (ctx.info.width, ctx.info.height);
        let (ow, oh) = overlay.dimensions();
        if ow > sw || oh > sh {
            debug!("watermark {}x{} exceeds canvas {sw}x{sh}; skipping", ow, oh);
            return Ok(());
        }

        let anchor = opt.gravity.anchor((sw, sh), (ow, oh));
        // Insets push the overlay toward the interior of the canvas.
        let x = anchor.0 as i64
            + match opt.gravity {
                Gravity::NorthWest | Gravity::West | Gravity::SouthWest => opt.x as i64,
                Gravity::North | Gravity::Center | Gravity::South => 0,
                Gravity::NorthEast | Gravity::East | Gravity::SouthEast => -(opt.x as i64),
            };
        let y = anchor.1 as i64
            + match opt.gravity {
                Gravity::NorthWest | Gravity::North | Gravity::NorthEast => opt.y as i64,
                Gravity::West | Gravity::Center | Gravity::East => 0,
                Gravity::SouthWest | Gravity::South | Gravity::SouthEast => -(opt.y as i64),
            };
        let spec = OverlaySpec {
            x: x.max(0),
            y: y.max(0),
            opacity: opt.opacity as f32 / 100.0,
        };
        ctx.engine
            .overlay(&mut ctx.handle, &overlay, &spec)
            .map_err(|e| PipelineError::engine(self.name(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::{MockEngine, RecordedOp};
    use crate::store::MemStore;
    use crate::store::tests::RecordingStore;
    use crate::test_helpers::{params, test_ctx};

    fn encoded_key(key: &str) -> String {
        URL_SAFE_NO_PAD.encode(key)
    }

    #[test]
    fn decodes_the_image_key() {
        let instruction = format!("watermark,image_{},t_50,g_nw", encoded_key("logo.png"));
        let opt = WatermarkAction::options(&params(&instruction)).unwrap();
        assert_eq!(opt.key, "logo.png");
        assert_eq!(opt.opacity, 50);
        assert_eq!(opt.gravity, Gravity::NorthWest);
    }

    #[test]
    fn defaults_mirror_the_grammar() {
        let instruction = format!("watermark,image_{}", encoded_key("logo.png"));
        let opt = WatermarkAction::options(&params(&instruction)).unwrap();
        assert_eq!(opt.opacity, 100);
        assert_eq!(opt.gravity, Gravity::SouthEast);
        assert_eq!((opt.x, opt.y), (10, 10));
    }

    #[test]
    fn rejects_missing_or_undecodable_key() {
        assert!(WatermarkAction::options(&params("watermark")).is_err());
        assert!(WatermarkAction::options(&params("watermark,t_50")).is_err());
        assert!(WatermarkAction::options(&params("watermark,image_%%%")).is_err());
    }

    #[test]
    fn fetches_the_overlay_through_the_context_store() {
        let engine = MockEngine::new(PixelFormat::Jpeg);
        let inner = MemStore::new();
        inner.insert("logo.png", vec![1, 2, 3]);
        let store = RecordingStore::new(inner);
        let instruction = format!("watermark,image_{}", encoded_key("logo.png"));
        let mut ctx = test_ctx(&engine, &store, &instruction);

        WatermarkAction
            .process(&mut ctx, &params(&instruction))
            .unwrap();

        assert_eq!(store.gets.lock().unwrap().as_slice(), ["logo.png"]);
        assert!(
            engine
                .recorded()
                .iter()
                .any(|op| matches!(op, RecordedOp::Overlay))
        );
    }
}
