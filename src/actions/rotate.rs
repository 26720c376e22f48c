//! `rotate` — clockwise quarter-turn rotation.
//!
//! Grammar: `rotate,90`. The engine rotates in quarter turns only, so the
//! degree value must be a multiple of 90 between 0 and 360.

use super::Action;
use crate::context::ProcessingContext;
use crate::error::{PipelineError, Result};

const HINT: &str = "Rotate param error, e.g: rotate,90";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotateOpts {
    pub degrees: u16,
}

pub struct RotateAction;

impl RotateAction {
    pub fn options(params: &[String]) -> Result<RotateOpts> {
        if params.len() != 2 {
            return Err(PipelineError::invalid(HINT));
        }
        let degrees: u16 = params[1]
            .parse()
            .map_err(|_| PipelineError::invalid(HINT))?;
        if degrees > 360 || degrees % 90 != 0 {
            return Err(PipelineError::invalid(
                "Rotate must be a multiple of 90 between 0 and 360",
            ));
        }
        Ok(RotateOpts { degrees })
    }
}

impl Action for RotateAction {
    fn name(&self) -> &'static str {
        "rotate"
    }

    fn validate(&self, params: &[String]) -> Result<()> {
        Self::options(params).map(|_| ())
    }

    fn process(&self, ctx: &mut ProcessingContext, params: &[String]) -> Result<()> {
        let opt = Self::options(params)?;
        if opt.degrees % 360 == 0 {
            return Ok(());
        }
        ctx.engine
            .rotate(&mut ctx.handle, opt.degrees)
            .map_err(|e| PipelineError::engine(self.name(), e))
    }
}
