//! `quality` — lossy encoding quality.
//!
//! Grammar: `quality,q_80` or `quality,Q_80` (1–100). The engine's encoders
//! take one absolute quality, so both spellings behave as absolute here.
//! Lossless targets ignore the setting.

use super::{Action, split_kv};
use crate::context::ProcessingContext;
use crate::error::{PipelineError, Result};

const HINT: &str = "Quality param error, e.g: quality,q_80";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityOpts {
    pub quality: u8,
}

pub struct QualityAction;

impl QualityAction {
    pub fn options(params: &[String]) -> Result<QualityOpts> {
        if params.len() != 2 {
            return Err(PipelineError::invalid(HINT));
        }
        let quality = match split_kv(&params[1]) {
            ("q", value) | ("Q", value) => super::parse_ranged_u32(value, 1, 100, HINT)?,
            _ => return Err(PipelineError::invalid(HINT)),
        };
        Ok(QualityOpts {
            quality: quality as u8,
        })
    }
}

impl Action for QualityAction {
    fn name(&self) -> &'static str {
        "quality"
    }

    fn validate(&self, params: &[String]) -> Result<()> {
        Self::options(params).map(|_| ())
    }

    fn process(&self, ctx: &mut ProcessingContext, params: &[String]) -> Result<()> {
        let opt = Self::options(params)?;
        ctx.handle.encode_settings_mut().quality = Some(opt.quality);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::params;

    #[test]
    fn both_spellings_parse() {
        assert_eq!(
            QualityAction::options(&params("quality,q_80")).unwrap().quality,
            80
        );
        assert_eq!(
            QualityAction::options(&params("quality,Q_95")).unwrap().quality,
            95
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert!(QualityAction::options(&params("quality")).is_err());
        assert!(QualityAction::options(&params("quality,q_0")).is_err());
        assert!(QualityAction::options(&params("quality,q_101")).is_err());
        assert!(QualityAction::options(&params("quality,80")).is_err());
    }
}
