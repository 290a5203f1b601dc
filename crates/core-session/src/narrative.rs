//! Local, rule-based story for the primary tracked position.
//!
//! Works without any network access; the AI explanation is an optional extra.

use core_step::{Bias, MappingResult, Step};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrativeKind {
    /// Insert strictly after the cursor.
    Stay,
    /// Insert exactly at the cursor, right bias.
    FollowInsertion,
    /// Insert exactly at the cursor, left bias.
    HoldGround,
    /// Insert before the cursor.
    ShiftRight,
    /// Delete strictly after the cursor.
    Safe,
    /// Delete before the cursor.
    ShiftLeft,
    /// Cursor inside the deleted range.
    Swallowed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Narrative {
    pub kind: NarrativeKind,
    pub title: &'static str,
    pub body: String,
}

pub fn narrate(step: &Step, bias: Bias, result: &MappingResult) -> Narrative {
    let pos = result.old_pos;
    let kind = classify(step, bias, result);
    let (title, body) = match kind {
        NarrativeKind::Stay => (
            "Stay",
            "Something is happening further down the line, but not here. I keep my seat.\n\n\
             (The insertion is to my right, so nothing to my left changes.)"
                .to_string(),
        ),
        NarrativeKind::FollowInsertion => (
            "Follow the insertion (bias > 0)",
            format!(
                "New characters landed right on my spot! I ride along behind them to {}.\n\n\
                 (With right bias a position at the insertion point moves past the inserted \
                 content, just like a caret while typing.)",
                result.new_pos
            ),
        ),
        NarrativeKind::HoldGround => (
            "Hold ground (bias < 0)",
            format!(
                "New characters landed right on my spot, but I stay in front of them at {pos}.\n\n\
                 (With left bias a position at the insertion point keeps its index.)"
            ),
        ),
        NarrativeKind::ShiftRight => {
            let n = step.inserted_len();
            (
                "Shift right",
                format!(
                    "{n} newcomers cut in line ahead of me, so I shuffle back to {}.\n\n\
                     (Every position after the insertion point grows by the inserted length.)",
                    result.new_pos
                ),
            )
        }
        NarrativeKind::Safe => (
            "Safe",
            "Someone vanished further along, but I am far enough away. My index is unchanged.\n\n\
             (The deletion is to my right; positions to its left are unaffected.)"
                .to_string(),
        ),
        NarrativeKind::ShiftLeft => {
            let n = step.deleted_len();
            (
                "Shift left",
                format!(
                    "The road ahead caved in and left {n} empty seats. I move up to {}.\n\n\
                     (Content before me was removed, the document got shorter, so my index drops.)",
                    result.new_pos
                ),
            )
        }
        NarrativeKind::Swallowed => (
            "Swallowed by the deletion",
            format!(
                "The floor under {pos} disappeared! I respawn at the edge, position {}.\n\n\
                 (The position was inside the deleted range. It collapses to the deletion's \
                 start and is marked deleted: true.)",
                result.new_pos
            ),
        ),
    };
    Narrative { kind, title, body }
}

fn classify(step: &Step, bias: Bias, result: &MappingResult) -> NarrativeKind {
    let pos = result.old_pos;
    match step {
        Step::Insert { .. } => {
            let from = step.from();
            if pos < from {
                NarrativeKind::Stay
            } else if pos == from {
                match bias {
                    Bias::Right => NarrativeKind::FollowInsertion,
                    Bias::Left => NarrativeKind::HoldGround,
                }
            } else {
                NarrativeKind::ShiftRight
            }
        }
        Step::Delete { .. } if result.deleted => NarrativeKind::Swallowed,
        Step::Delete { .. } => {
            if pos < step.from() {
                NarrativeKind::Safe
            } else {
                NarrativeKind::ShiftLeft
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_step::map_with_bias;

    fn kind_for(step: Step, pos: usize, bias: Bias) -> NarrativeKind {
        let r = map_with_bias(pos, &step, bias);
        narrate(&step, bias, &r).kind
    }

    #[test]
    fn insert_cases() {
        assert_eq!(kind_for(Step::insert(2, "XYZ"), 1, Bias::Right), NarrativeKind::Stay);
        assert_eq!(
            kind_for(Step::insert(2, "XYZ"), 2, Bias::Right),
            NarrativeKind::FollowInsertion
        );
        assert_eq!(
            kind_for(Step::insert(2, "XYZ"), 2, Bias::Left),
            NarrativeKind::HoldGround
        );
        assert_eq!(
            kind_for(Step::insert(2, "XYZ"), 4, Bias::Right),
            NarrativeKind::ShiftRight
        );
    }

    #[test]
    fn delete_cases() {
        assert_eq!(kind_for(Step::delete(1, 3), 0, Bias::Right), NarrativeKind::Safe);
        assert_eq!(kind_for(Step::delete(1, 3), 1, Bias::Right), NarrativeKind::Swallowed);
        assert_eq!(kind_for(Step::delete(1, 3), 3, Bias::Right), NarrativeKind::ShiftLeft);
    }

    #[test]
    fn bodies_mention_the_numbers() {
        let step = Step::insert(1, "AB");
        let r = map_with_bias(3, &step, Bias::Right);
        let n = narrate(&step, Bias::Right, &r);
        assert!(n.body.contains("2 newcomers"));
        assert!(n.body.contains(" 5."));

        let step = Step::delete(0, 2);
        let r = map_with_bias(4, &step, Bias::Right);
        let n = narrate(&step, Bias::Right, &r);
        assert!(n.body.contains("2 empty seats"));
        assert!(n.body.contains("move up to 2"));
    }
}
