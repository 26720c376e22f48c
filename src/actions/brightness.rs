//! `bright` — brightness adjustment. Grammar: `bright,50` (−100..100).

use super::Action;
use crate::context::ProcessingContext;
use crate::error::{PipelineError, Result};

const HINT: &str = "Bright param error, e.g: bright,50";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrightOpts {
    pub value: i32,
}

pub struct BrightAction;

impl BrightAction {
    pub fn options(params: &[String]) -> Result<BrightOpts> {
        if params.len() != 2 {
            return Err(PipelineError::invalid(HINT));
        }
        let value = super::parse_ranged_i32(&params[1], -100, 100, HINT)?;
        Ok(BrightOpts { value })
    }
}

impl Action for BrightAction {
    fn name(&self) -> &'static str {
        "bright"
    }

    fn validate(&self, params: &[String]) -> Result<()> {
        Self::options(params).map(|_| ())
    }

    fn process(&self, ctx: &mut ProcessingContext, params: &[String]) -> Result<()> {
        let opt = Self::options(params)?;
        if opt.value == 0 {
            return Ok(());
        }
        ctx.engine
            .brighten(&mut ctx.handle, opt.value)
            .map_err(|e| PipelineError::engine(self.name(), e))
    }
}
