//! `format` — choose the output encoding.
//!
//! Grammar: `format,png` with one of jpg, jpeg, png, webp, gif, bmp, tiff.
//! An explicit format always wins over finalization policy (auto-webp). In
//! the pre-pass, targeting a still format from an animated source switches
//! animation decoding off so the pipeline reloads only the first frame.

use super::Action;
use crate::context::ProcessingContext;
use crate::engine::PixelFormat;
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOpts {
    pub format: PixelFormat,
}

pub struct FormatAction;

impl FormatAction {
    pub fn options(params: &[String]) -> Result<FormatOpts> {
        if params.len() != 2 {
            return Err(PipelineError::invalid("Format param error, e.g: format,jpg"));
        }
        let format = PixelFormat::from_name(&params[1]).ok_or_else(|| {
            PipelineError::invalid("Format must be one of jpg,jpeg,png,webp,gif,bmp,tiff")
        })?;
        Ok(FormatOpts { format })
    }
}

impl Action for FormatAction {
    fn name(&self) -> &'static str {
        "format"
    }

    fn validate(&self, params: &[String]) -> Result<()> {
        Self::options(params).map(|_| ())
    }

    fn before_process(&self, ctx: &mut ProcessingContext, params: &[String], _index: usize) {
        let Ok(opt) = Self::options(params) else {
            return;
        };
        if ctx.info.pages > 1 && !opt.format.animatable() {
            ctx.features.read_all_frames = false;
        }
    }

    fn process(&self, ctx: &mut ProcessingContext, params: &[String]) -> Result<()> {
        let opt = Self::options(params)?;
        let settings = ctx.handle.encode_settings_mut();
        settings.format = Some(opt.format);
        settings.explicit_format = true;
        Ok(())
    }
}
