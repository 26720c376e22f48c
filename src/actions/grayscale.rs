//! `grey` — grayscale conversion. Grammar: `grey,1`.

use super::{Action, parse_toggle};
use crate::context::ProcessingContext;
use crate::error::{PipelineError, Result};

const ARITY_HINT: &str = "Grey param error, e.g: grey,1";
const DOMAIN_HINT: &str = "Grey must be 0 or 1";

pub struct GreyAction;

impl GreyAction {
    pub fn options(params: &[String]) -> Result<bool> {
        parse_toggle(params, ARITY_HINT, DOMAIN_HINT)
    }
}

impl Action for GreyAction {
    fn name(&self) -> &'static str {
        "grey"
    }

    fn validate(&self, params: &[String]) -> Result<()> {
        Self::options(params).map(|_| ())
    }

    fn process(&self, ctx: &mut ProcessingContext, params: &[String]) -> Result<()> {
        if !Self::options(params)? {
            return Ok(());
        }
        ctx.engine
            .grayscale(&mut ctx.handle)
            .map_err(|e| PipelineError::engine(self.name(), e))
    }
}
