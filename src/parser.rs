//! Instruction mini-DSL parser.
//!
//! An instruction is a path-style string: slash-delimited segments, each a
//! comma-separated list whose first element names an action and whose
//! remainder are positional parameters:
//!
//! ```text
//! image/resize,w_100,h_100/rounded-corners,r_10/format,png
//! ```
//!
//! Parsing is deliberately lenient: empty segments are skipped, segments are
//! never merged, and nothing is validated here — a malformed segment becomes
//! a [`ParsedAction`] whose owning action rejects it in `validate`. Token
//! order is preserved and determines execution order.

/// One parsed segment. `params[0]` is always the action name, mirroring the
/// raw token, so actions can validate arity against the full token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAction {
    pub name: String,
    pub params: Vec<String>,
}

impl ParsedAction {
    fn from_segment(segment: &str) -> Self {
        let params: Vec<String> = segment.split(',').map(str::to_string).collect();
        Self {
            name: params[0].clone(),
            params,
        }
    }
}

/// Parse a full instruction string.
pub fn parse_instruction(instruction: &str) -> Vec<ParsedAction> {
    parse_segments(&instruction.split('/').collect::<Vec<_>>())
}

/// Parse pre-split path segments (the boundary layer usually has them).
pub fn parse_segments<S: AsRef<str>>(segments: &[S]) -> Vec<ParsedAction> {
    segments
        .iter()
        .map(|s| s.as_ref())
        .filter(|s| !s.is_empty())
        .map(ParsedAction::from_segment)
        .collect()
}
