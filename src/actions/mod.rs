//! Named pipeline actions.
//!
//! Every operation the instruction DSL can name lives here, one module per
//! action. An action is three capabilities behind the [`Action`] trait:
//!
//! - `validate` — pure parameter check; rejects wrong arity or out-of-domain
//!   values with `InvalidArgument` and a corrective hint. Each action also
//!   exposes a typed `options` constructor used by `process`.
//! - `before_process` — pre-pass hook, run over *all* parsed actions in
//!   order before anything executes; may disable entries in the context mask
//!   (e.g. animated sources) or flip feature flags.
//! - `process` — re-validates, inspects the metadata snapshot, and applies
//!   the transform through the engine when still applicable. Inapplicable
//!   combinations (interlace on a PNG target) are silent no-ops.

use crate::context::ProcessingContext;
use crate::error::{PipelineError, Result};

mod auto_orient;
mod blur;
mod brightness;
mod contrast;
mod crop;
mod format;
mod grayscale;
mod index_crop;
mod interlace;
mod quality;
mod resize;
mod rotate;
mod rounded_corners;
mod sharpen;
mod watermark;

pub use auto_orient::AutoOrientAction;
pub use blur::BlurAction;
pub use brightness::BrightAction;
pub use contrast::ContrastAction;
pub use crop::CropAction;
pub use format::FormatAction;
pub use grayscale::GreyAction;
pub use index_crop::IndexCropAction;
pub use interlace::InterlaceAction;
pub use quality::QualityAction;
pub use resize::ResizeAction;
pub use rotate::RotateAction;
pub use rounded_corners::RoundedCornersAction;
pub use sharpen::SharpenAction;
pub use watermark::WatermarkAction;

/// One named, parameterized image operation.
pub trait Action: Send + Sync {
    fn name(&self) -> &'static str;

    /// Check parameters without applying them. Pure: same input, same
    /// verdict, no mutation.
    fn validate(&self, params: &[String]) -> Result<()>;

    /// Pre-pass hook; `index` is the action's position in the parsed
    /// instruction, used to disable it in the context mask.
    fn before_process(&self, _ctx: &mut ProcessingContext, _params: &[String], _index: usize) {}

    fn process(&self, ctx: &mut ProcessingContext, params: &[String]) -> Result<()>;
}

impl std::fmt::Debug for dyn Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action").field("name", &self.name()).finish()
    }
}

/// Every built-in action, in registration order.
pub fn builtin() -> Vec<std::sync::Arc<dyn Action>> {
    vec![
        std::sync::Arc::new(ResizeAction),
        std::sync::Arc::new(CropAction),
        std::sync::Arc::new(IndexCropAction),
        std::sync::Arc::new(RotateAction),
        std::sync::Arc::new(AutoOrientAction),
        std::sync::Arc::new(FormatAction),
        std::sync::Arc::new(QualityAction),
        std::sync::Arc::new(InterlaceAction),
        std::sync::Arc::new(RoundedCornersAction),
        std::sync::Arc::new(GreyAction),
        std::sync::Arc::new(BrightAction),
        std::sync::Arc::new(ContrastAction),
        std::sync::Arc::new(BlurAction),
        std::sync::Arc::new(SharpenAction),
        std::sync::Arc::new(WatermarkAction),
    ]
}

/// Split a `key_value` parameter. `"w_100"` → `("w", "100")`; a parameter
/// without a separator keeps an empty value.
pub(crate) fn split_kv(param: &str) -> (&str, &str) {
    match param.split_once('_') {
        Some((key, value)) => (key, value),
        None => (param, ""),
    }
}

/// Parse an integer within an inclusive range; the hint is the user-facing
/// grammar reminder.
pub(crate) fn parse_ranged_u32(value: &str, min: u32, max: u32, hint: &str) -> Result<u32> {
    let n: u32 = value
        .parse()
        .map_err(|_| PipelineError::invalid(hint.to_string()))?;
    if n < min || n > max {
        return Err(PipelineError::invalid(hint.to_string()));
    }
    Ok(n)
}

pub(crate) fn parse_ranged_i32(value: &str, min: i32, max: i32, hint: &str) -> Result<i32> {
    let n: i32 = value
        .parse()
        .map_err(|_| PipelineError::invalid(hint.to_string()))?;
    if n < min || n > max {
        return Err(PipelineError::invalid(hint.to_string()));
    }
    Ok(n)
}

/// Parse a binary toggle action: exactly `name,0` or `name,1`.
pub(crate) fn parse_toggle(params: &[String], arity_hint: &str, domain_hint: &str) -> Result<bool> {
    if params.len() != 2 {
        return Err(PipelineError::invalid(arity_hint.to_string()));
    }
    match params[1].as_str() {
        "1" => Ok(true),
        "0" => Ok(false),
        _ => Err(PipelineError::invalid(domain_hint.to_string())),
    }
}

/// Anchor position for crop regions and watermark placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gravity {
    #[default]
    NorthWest,
    North,
    NorthEast,
    West,
    Center,
    East,
    SouthWest,
    South,
    SouthEast,
}

impl Gravity {
    pub fn from_param(value: &str) -> Option<Self> {
        match value {
            "nw" => Some(Self::NorthWest),
            "north" => Some(Self::North),
            "ne" => Some(Self::NorthEast),
            "west" => Some(Self::West),
            "center" => Some(Self::Center),
            "east" => Some(Self::East),
            "sw" => Some(Self::SouthWest),
            "south" => Some(Self::South),
            "se" => Some(Self::SouthEast),
            _ => None,
        }
    }

    /// Top-left corner of an `inner` box anchored inside `outer`.
    pub fn anchor(self, outer: (u32, u32), inner: (u32, u32)) -> (u32, u32) {
        let slack_x = outer.0.saturating_sub(inner.0);
        let slack_y = outer.1.saturating_sub(inner.1);
        let x = match self {
            Self::NorthWest | Self::West | Self::SouthWest => 0,
            Self::North | Self::Center | Self::South => slack_x / 2,
            Self::NorthEast | Self::East | Self::SouthEast => slack_x,
        };
        let y = match self {
            Self::NorthWest | Self::North | Self::NorthEast => 0,
            Self::West | Self::Center | Self::East => slack_y / 2,
            Self::SouthWest | Self::South | Self::SouthEast => slack_y,
        };
        (x, y)
    }
}
