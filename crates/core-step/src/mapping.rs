//! Ordered step sequences.
//!
//! Library API for mapping through an edit history; the interactive session
//! holds a single step and does not use it.

use crate::map::{MappingResult, map_with_bias};
use crate::{Bias, Position, Step, StepError};

/// Steps applied one after another; each step's positions refer to the
/// document produced by the previous one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    steps: Vec<Step>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn map(&self, pos: Position) -> MappingResult {
        self.map_with_bias(pos, Bias::Right)
    }

    /// Map through every step; the result is `deleted` if any step collapsed the position.
    pub fn map_with_bias(&self, pos: Position, bias: Bias) -> MappingResult {
        let mut current = pos;
        let mut deleted = false;
        for step in &self.steps {
            let r = map_with_bias(current, step, bias);
            deleted |= r.deleted;
            current = r.new_pos;
        }
        MappingResult {
            old_pos: pos,
            new_pos: current,
            deleted,
        }
    }

    pub fn apply(&self, doc: &str) -> Result<String, StepError> {
        let mut out = doc.to_string();
        for step in &self.steps {
            out = step.apply(&out)?;
        }
        Ok(out)
    }
}

impl FromIterator<Step> for Mapping {
    fn from_iter<I: IntoIterator<Item = Step>>(iter: I) -> Self {
        Self {
            steps: iter.into_iter().collect(),
        }
    }
}
