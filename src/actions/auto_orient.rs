//! `auto-orient` — apply the EXIF orientation captured at decode.

use super::{Action, parse_toggle};
use crate::context::ProcessingContext;
use crate::error::{PipelineError, Result};

const ARITY_HINT: &str = "AutoOrient param error, e.g: auto-orient,1";
const DOMAIN_HINT: &str = "AutoOrient must be 0 or 1";

pub struct AutoOrientAction;

impl AutoOrientAction {
    pub fn options(params: &[String]) -> Result<bool> {
        parse_toggle(params, ARITY_HINT, DOMAIN_HINT)
    }
}

impl Action for AutoOrientAction {
    fn name(&self) -> &'static str {
        "auto-orient"
    }

    fn validate(&self, params: &[String]) -> Result<()> {
        Self::options(params).map(|_| ())
    }

    fn process(&self, ctx: &mut ProcessingContext, params: &[String]) -> Result<()> {
        if !Self::options(params)? {
            return Ok(());
        }
        ctx.engine
            .orient(&mut ctx.handle)
            .map_err(|e| PipelineError::engine(self.name(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::params;

    #[test]
    fn toggle_grammar() {
        assert!(AutoOrientAction::options(&params("auto-orient,1")).unwrap());
        assert!(!AutoOrientAction::options(&params("auto-orient,0")).unwrap());
        assert!(AutoOrientAction::options(&params("auto-orient")).is_err());
        assert!(AutoOrientAction::options(&params("auto-orient,2")).is_err());
    }
}
