//! `crop` — cut a region out of the image.
//!
//! Grammar: `crop,x_10,y_10,w_100,h_100,g_nw`. Width and height default to
//! the remaining extent; `g_` anchors the region, `x_`/`y_` offset it from
//! the anchor.

use super::{Action, Gravity, split_kv};
use crate::context::ProcessingContext;
use crate::engine::CropRegion;
use crate::error::{PipelineError, Result};

const HINT: &str = "Crop param error, e.g: crop,x_100,y_100,w_100,h_100";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CropOpts {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub x: u32,
    pub y: u32,
    pub gravity: Gravity,
}

pub struct CropAction;

impl CropAction {
    pub fn options(params: &[String]) -> Result<CropOpts> {
        if params.len() < 2 {
            return Err(PipelineError::invalid(HINT));
        }
        let mut opt = CropOpts::default();
        for param in &params[1..] {
            match split_kv(param) {
                ("w", value) => opt.width = Some(super::parse_ranged_u32(value, 1, 16384, HINT)?),
                ("h", value) => opt.height = Some(super::parse_ranged_u32(value, 1, 16384, HINT)?),
                ("x", value) => opt.x = super::parse_ranged_u32(value, 0, 16384, HINT)?,
                ("y", value) => opt.y = super::parse_ranged_u32(value, 0, 16384, HINT)?,
                ("g", value) => {
                    opt.gravity = Gravity::from_param(value).ok_or_else(|| {
                        PipelineError::invalid(
                            "Crop gravity must be one of nw,north,ne,west,center,east,sw,south,se",
                        )
                    })?;
                }
                _ => return Err(PipelineError::invalid(HINT)),
            }
        }
        Ok(opt)
    }
}

impl Action for CropAction {
    fn name(&self) -> &'static str {
        "crop"
    }

    fn validate(&self, params: &[String]) -> Result<()> {
        Self::options(params).map(|_| ())
    }

    fn process(&self, ctx: &mut ProcessingContext, params: &[String]) -> Result<()> {
        let opt = Self::options(params)?;
        let (sw, sh) = (ctx.info.width, ctx.info.height);
        let width = opt.width.unwrap_or(sw).min(sw);
        let height = opt.height.unwrap_or(sh).min(sh);
        let anchor = opt.gravity.anchor((sw, sh), (width, height));
        let x = anchor.0 + opt.x;
        let y = anchor.1 + opt.y;
        if x >= sw || y >= sh {
            return Err(PipelineError::invalid(
                "Incorrect crop parameters: region starts outside the image",
            ));
        }
        let region = CropRegion {
            x,
            y,
            width: width.min(sw - x),
            height: height.min(sh - y),
        };
        ctx.engine
            .crop(&mut ctx.handle, region)
            .map_err(|e| PipelineError::engine(self.name(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::{MockEngine, RecordedOp};
    use crate::engine::PixelFormat;
    use crate::store::MemStore;
    use crate::test_helpers::{params, test_ctx};

    #[test]
    fn parses_region_and_gravity() {
        let opt = CropAction::options(&params("crop,w_100,h_50,x_5,y_6,g_se")).unwrap();
        assert_eq!(opt.width, Some(100));
        assert_eq!(opt.height, Some(50));
        assert_eq!((opt.x, opt.y), (5, 6));
        assert_eq!(opt.gravity, Gravity::SouthEast);
    }

    #[test]
    fn rejects_bad_params() {
        assert!(CropAction::options(&params("crop")).is_err());
        assert!(CropAction::options(&params("crop,w_0")).is_err());
        assert!(CropAction::options(&params("crop,g_middle")).is_err());
        assert!(CropAction::options(&params("crop,z_9")).is_err());
    }

    #[test]
    fn region_is_clamped_to_the_image() {
        let engine = MockEngine::new(PixelFormat::Jpeg); // mock images are 8x8
        let store = MemStore::new();
        let mut ctx = test_ctx(&engine, &store, "crop,w_100,h_100");

        CropAction
            .process(&mut ctx, &params("crop,w_100,h_100"))
            .unwrap();

        let ops = engine.recorded();
        assert!(matches!(
            ops.last(),
            Some(RecordedOp::Crop(region)) if region.width == 8 && region.height == 8
        ));
    }

    #[test]
    fn offset_outside_the_image_fails() {
        let engine = MockEngine::new(PixelFormat::Jpeg);
        let store = MemStore::new();
        let mut ctx = test_ctx(&engine, &store, "crop,x_20");

        let err = CropAction
            .process(&mut ctx, &params("crop,x_20"))
            .unwrap_err();
        assert!(err.to_string().contains("Incorrect crop parameters"));
    }
}
