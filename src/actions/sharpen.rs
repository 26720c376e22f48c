//! `sharpen` — unsharp-mask sharpening. Grammar: `sharpen,100` (50–399).
//! Disabled for animated sources.

use super::Action;
use crate::context::ProcessingContext;
use crate::engine::PixelFormat;
use crate::error::{PipelineError, Result};

const HINT: &str = "Sharpen param error, e.g: sharpen,100";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharpenOpts {
    pub amount: u32,
}

pub struct SharpenAction;

impl SharpenAction {
    pub fn options(params: &[String]) -> Result<SharpenOpts> {
        if params.len() != 2 {
            return Err(PipelineError::invalid(HINT));
        }
        let amount = super::parse_ranged_u32(&params[1], 50, 399, HINT)?;
        Ok(SharpenOpts { amount })
    }
}

impl Action for SharpenAction {
    fn name(&self) -> &'static str {
        "sharpen"
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
        let sigma = opt.amount as f32 / 100.0;
        ctx.engine
            .sharpen(&mut ctx.handle, sigma, 0)
            .map_err(|e| PipelineError::engine(self.name(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::params;

    #[test]
    fn accepts_the_documented_range() {
        assert_eq!(
            SharpenAction::options(&params("sharpen,100")).unwrap().amount,
            100
        );
        assert!(SharpenAction::options(&params("sharpen,50")).is_ok());
        assert!(SharpenAction::options(&params("sharpen,399")).is_ok());
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(SharpenAction::options(&params("sharpen,49")).is_err());
        assert!(SharpenAction::options(&params("sharpen,400")).is_err());
        assert!(SharpenAction::options(&params("sharpen")).is_err());
    }
}
