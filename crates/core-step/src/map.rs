//! Single-step position mapping.

use crate::{Bias, Position, Step};

/// Where a tracked position ended up after one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingResult {
    pub old_pos: Position,
    pub new_pos: Position,
    /// The old position sat inside the deleted range; `new_pos` is the collapse point.
    pub deleted: bool,
}

impl MappingResult {
    fn kept(old_pos: Position, new_pos: Position) -> Self {
        Self {
            old_pos,
            new_pos,
            deleted: false,
        }
    }

    pub fn moved(&self) -> bool {
        self.old_pos != self.new_pos
    }
}

/// Map `pos` through `step` with right bias.
pub fn map(pos: Position, step: &Step) -> MappingResult {
    map_with_bias(pos, step, Bias::Right)
}

/// Map `pos` through `step`. Arguments are assumed in range.
pub fn map_with_bias(pos: Position, step: &Step, bias: Bias) -> MappingResult {
    match step {
        Step::Insert { from, .. } => {
            let n = step.inserted_len();
            if pos < *from || (pos == *from && bias == Bias::Left) {
                MappingResult::kept(pos, pos)
            } else {
                MappingResult::kept(pos, pos + n)
            }
        }
        Step::Delete { .. } => {
            let (from, to) = step.range();
            if pos < from {
                MappingResult::kept(pos, pos)
            } else if pos >= to {
                MappingResult::kept(pos, pos - (to - from))
            } else {
                MappingResult {
                    old_pos: pos,
                    new_pos: from,
                    deleted: true,
                }
            }
        }
    }
}
