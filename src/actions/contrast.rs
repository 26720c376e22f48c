//! `contrast` — contrast adjustment. Grammar: `contrast,-50` (−100..100).

use super::Action;
use crate::context::ProcessingContext;
use crate::error::{PipelineError, Result};

const HINT: &str = "Contrast param error, e.g: contrast,-50";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContrastOpts {
    pub value: i32,
}

pub struct ContrastAction;

impl ContrastAction {
    pub fn options(params: &[String]) -> Result<ContrastOpts> {
        if params.len() != 2 {
            return Err(PipelineError::invalid(HINT));
        }
        let value = super::parse_ranged_i32(&params[1], -100, 100, HINT)?;
        Ok(ContrastOpts { value })
    }
}

impl Action for ContrastAction {
    fn name(&self) -> &'static str {
        "contrast"
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
            .adjust_contrast(&mut ctx.handle, opt.value as f32)
            .map_err(|e| PipelineError::engine(self.name(), e))
    }
}
