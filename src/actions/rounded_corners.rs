//! `rounded-corners` — clear the alpha outside corner circles.
//!
//! Grammar: `rounded-corners,r_10` (1–4096). Adds an alpha channel, so a
//! PNG or WebP target encodes with 4 channels afterwards. Disabled for
//! animated sources.

use super::{Action, split_kv};
use crate::context::ProcessingContext;
use crate::engine::PixelFormat;
use crate::error::{PipelineError, Result};

const HINT: &str = "RoundedCorners param error, e.g: rounded-corners,r_10";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundedCornersOpts {
    pub radius: u32,
}

pub struct RoundedCornersAction;

impl RoundedCornersAction {
    pub fn options(params: &[String]) -> Result<RoundedCornersOpts> {
        if params.len() != 2 {
            return Err(PipelineError::invalid(HINT));
        }
        let radius = match split_kv(&params[1]) {
            ("r", value) => super::parse_ranged_u32(value, 1, 4096, HINT)?,
            _ => return Err(PipelineError::invalid(HINT)),
        };
        Ok(RoundedCornersOpts { radius })
    }
}

impl Action for RoundedCornersAction {
    fn name(&self) -> &'static str {
        "rounded-corners"
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
        ctx.engine
            .round_corners(&mut ctx.handle, opt.radius)
            .map_err(|e| PipelineError::engine(self.name(), e))
    }
}
