//! `resize` — scale the image into a target box.
//!
//! Grammar: `resize,w_100,h_100,m_lfit,p_50,limit_0` — every parameter is a
//! `key_value` pair and optional, but at least one must be given. `limit_1`
//! (the default) makes enlarging targets a no-op.

use super::{Action, split_kv};
use crate::context::ProcessingContext;
use crate::engine::{ResizeMode, ResizeSpec};
use crate::error::{PipelineError, Result};

const HINT: &str = "Resize param error, e.g: resize,m_lfit,w_100,h_100";

pub struct ResizeAction;

impl ResizeAction {
    pub fn options(params: &[String]) -> Result<ResizeSpec> {
        if params.len() < 2 {
            return Err(PipelineError::invalid(HINT));
        }
        let mut spec = ResizeSpec::default();
        for param in &params[1..] {
            match split_kv(param) {
                ("w", value) => spec.width = Some(super::parse_ranged_u32(value, 1, 16384, HINT)?),
                ("h", value) => spec.height = Some(super::parse_ranged_u32(value, 1, 16384, HINT)?),
                ("p", value) => {
                    spec.percent = Some(super::parse_ranged_u32(
                        value,
                        1,
                        1000,
                        "Resize percentage must be between 1 and 1000",
                    )?);
                }
                ("m", value) => {
                    spec.mode = match value {
                        "lfit" => ResizeMode::Lfit,
                        "mfit" => ResizeMode::Mfit,
                        "fill" => ResizeMode::Fill,
                        "pad" => ResizeMode::Pad,
                        "fixed" => ResizeMode::Fixed,
                        _ => {
                            return Err(PipelineError::invalid(
                                "Resize mode must be one of lfit, mfit, fill, pad, fixed",
                            ));
                        }
                    };
                }
                ("limit", value) => {
                    spec.allow_enlarge = match value {
                        "0" => true,
                        "1" => false,
                        _ => return Err(PipelineError::invalid("Resize limit must be 0 or 1")),
                    };
                }
                _ => return Err(PipelineError::invalid(HINT)),
            }
        }
        if spec.mode == ResizeMode::Fixed && (spec.width.is_none() || spec.height.is_none()) {
            return Err(PipelineError::invalid(
                "Resize mode fixed requires both w and h",
            ));
        }
        Ok(spec)
    }
}

impl Action for ResizeAction {
    fn name(&self) -> &'static str {
        "resize"
    }

    fn validate(&self, params: &[String]) -> Result<()> {
        Self::options(params).map(|_| ())
    }

    fn process(&self, ctx: &mut ProcessingContext, params: &[String]) -> Result<()> {
        let spec = Self::options(params)?;
        ctx.engine
            .resize(&mut ctx.handle, &spec)
            .map_err(|e| PipelineError::engine(self.name(), e))
    }
}
