//! `blur` — Gaussian blur. Grammar: `blur,r_3,s_2` (radius advisory, sigma
//! drives the kernel; either may be given, 1–50).

use super::{Action, split_kv};
use crate::context::ProcessingContext;
use crate::error::{PipelineError, Result};

const HINT: &str = "Blur param error, e.g: blur,r_3,s_2";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlurOpts {
    pub radius: Option<u32>,
    pub sigma: Option<u32>,
}

pub struct BlurAction;

impl BlurAction {
    pub fn options(params: &[String]) -> Result<BlurOpts> {
        if params.len() < 2 {
            return Err(PipelineError::invalid(HINT));
        }
        let mut opt = BlurOpts::default();
        for param in &params[1..] {
            match split_kv(param) {
                ("r", value) => opt.radius = Some(super::parse_ranged_u32(value, 1, 50, HINT)?),
                ("s", value) => opt.sigma = Some(super::parse_ranged_u32(value, 1, 50, HINT)?),
                _ => return Err(PipelineError::invalid(HINT)),
            }
        }
        if opt.radius.is_none() && opt.sigma.is_none() {
            return Err(PipelineError::invalid(HINT));
        }
        Ok(opt)
    }
}

impl Action for BlurAction {
    fn name(&self) -> &'static str {
        "blur"
    }

    fn validate(&self, params: &[String]) -> Result<()> {
        Self::options(params).map(|_| ())
    }

    fn process(&self, ctx: &mut ProcessingContext, params: &[String]) -> Result<()> {
        let opt = Self::options(params)?;
        let sigma = opt.sigma.or(opt.radius).unwrap() as f32;
        ctx.engine
            .blur(&mut ctx.handle, sigma)
            .map_err(|e| PipelineError::engine(self.name(), e))
    }
}
