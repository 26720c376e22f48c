//! `interlace` — progressive layout for JPEG output.
//!
//! Grammar: `interlace,1`. Applies only when the target format is the JPEG
//! family; on any other target the request is a silent no-op. Animated
//! sources disable the action entirely in the pre-pass.

use super::{Action, parse_toggle};
use crate::context::ProcessingContext;
use crate::engine::PixelFormat;
use crate::error::Result;

const ARITY_HINT: &str = "Interlace param error, e.g: interlace,1";
const DOMAIN_HINT: &str = "Interlace must be 0 or 1";

pub struct InterlaceAction;

impl InterlaceAction {
    pub fn options(params: &[String]) -> Result<bool> {
        parse_toggle(params, ARITY_HINT, DOMAIN_HINT)
    }
}

impl Action for InterlaceAction {
    fn name(&self) -> &'static str {
        "interlace"
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
        let interlace = Self::options(params)?;
        let target = ctx
            .handle
            .encode_settings()
            .format
            .unwrap_or(ctx.info.format);
        if target == PixelFormat::Jpeg && interlace {
            ctx.handle.encode_settings_mut().progressive = true;
        }
        Ok(())
    }
}
