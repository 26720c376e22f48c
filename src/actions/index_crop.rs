//! `indexcrop` — cut the image into equal strips and keep one.
//!
//! Grammar: `indexcrop,x_100,i_0` (vertical strips of width 100) or
//! `indexcrop,y_100,i_0` (horizontal strips). Exactly one axis must be
//! given. An index past the last strip leaves the image untouched.

use super::{Action, split_kv};
use crate::context::ProcessingContext;
use crate::engine::CropRegion;
use crate::error::{PipelineError, Result};
use log::debug;

const HINT: &str = "IndexCrop param error, e.g: indexcrop,x_100,i_0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexCropOpts {
    pub x: Option<u32>,
    pub y: Option<u32>,
    pub index: u32,
}

pub struct IndexCropAction;

impl IndexCropAction {
    pub fn options(params: &[String]) -> Result<IndexCropOpts> {
        if params.len() < 2 {
            return Err(PipelineError::invalid(HINT));
        }
        let mut opt = IndexCropOpts::default();
        for param in &params[1..] {
            match split_kv(param) {
                ("x", value) => opt.x = Some(super::parse_ranged_u32(value, 1, 16384, HINT)?),
                ("y", value) => opt.y = Some(super::parse_ranged_u32(value, 1, 16384, HINT)?),
                ("i", value) => opt.index = super::parse_ranged_u32(value, 0, 16384, HINT)?,
                _ => return Err(PipelineError::invalid(HINT)),
            }
        }
        if opt.x.is_some() == opt.y.is_some() {
            return Err(PipelineError::invalid(
                "IndexCrop requires exactly one of x or y",
            ));
        }
        Ok(opt)
    }
}

impl Action for IndexCropAction {
    fn name(&self) -> &'static str {
        "indexcrop"
    }

    fn validate(&self, params: &[String]) -> Result<()> {
        Self::options(params).map(|_| ())
    }

    fn process(&self, ctx: &mut ProcessingContext, params: &[String]) -> Result<()> {
        let opt = Self::options(params)?;
        let (sw, sh) = (ctx.info.width, ctx.info.height);
        let (strip, extent, vertical) = match opt.x {
            Some(x) => (x, sw, true),
            None => (opt.y.unwrap(), sh, false),
        };
        let strips = extent.div_ceil(strip);
        if opt.index >= strips {
            debug!(
                "indexcrop index {} past the last strip ({}); skipping",
                opt.index, strips
            );
            return Ok(());
        }
        let offset = opt.index * strip;
        let length = strip.min(extent - offset);
        let region = if vertical {
            CropRegion {
                x: offset,
                y: 0,
                width: length,
                height: sh,
            }
        } else {
            CropRegion {
                x: 0,
                y: offset,
                width: sw,
                height: length,
            }
        };
        ctx.engine
            .crop(&mut ctx.handle, region)
            .map_err(|e| PipelineError::engine(self.name(), e))
    }
}
