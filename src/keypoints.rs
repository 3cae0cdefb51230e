use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{MatchError, Result};

/// How two pixel observations are decided to be the same keypoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DedupPolicy {
    /// Both components compared bit for bit.
    #[default]
    Exact,
    /// Reuse the earliest keypoint within `radius` pixels.
    Tolerance { radius: f32 },
}

impl DedupPolicy {
    pub fn validate(&self) -> Result<()> {
        match *self {
            DedupPolicy::Exact => Ok(()),
            DedupPolicy::Tolerance { radius } if radius.is_finite() && radius > 0.0 => Ok(()),
            DedupPolicy::Tolerance { radius } => Err(MatchError::Config(format!(
                "dedup radius must be positive and finite, got {}",
                radius
            ))),
        }
    }
}

/// Bit pattern of a coordinate, used as the exact-equality key.
fn exact_key(p: Vec2) -> (u32, u32) {
    (p.x.to_bits(), p.y.to_bits())
}

/// Grid cell of side `radius` holding `p`. The float to int cast saturates,
/// so far-out coordinates collapse into the outermost cells.
fn grid_cell(p: Vec2, radius: f32) -> (i64, i64) {
    ((p.x / radius).floor() as i64, (p.y / radius).floor() as i64)
}

/// Per-camera map from pixel coordinate to a dense keypoint id.
///
/// Ids are handed out as `0, 1, 2, ...` in order of first occurrence and the
/// coordinate stored for an id is the first one observed.
#[derive(Debug, Clone)]
pub struct KeypointTable {
    policy: DedupPolicy,
    exact: HashMap<(u32, u32), u32>,
    grid: HashMap<(i64, i64), Vec<u32>>,
    points: Vec<Vec2>,
}

impl Default for KeypointTable {
    fn default() -> Self {
        KeypointTable::new(DedupPolicy::Exact)
    }
}

impl KeypointTable {
    pub fn new(policy: DedupPolicy) -> KeypointTable {
        KeypointTable {
            policy,
            exact: HashMap::new(),
            grid: HashMap::new(),
            points: Vec::new(),
        }
    }

    /// Returns the id for `point`, assigning the next free one if the point
    /// has not been seen. The flag is `true` when a new id was assigned.
    pub fn lookup_or_insert(&mut self, point: Vec2) -> (u32, bool) {
        if let Some(id) = self.lookup(point) {
            return (id, false);
        }
        let id = self.points.len() as u32;
        self.points.push(point);
        match self.policy {
            DedupPolicy::Exact => {
                self.exact.insert(exact_key(point), id);
            }
            DedupPolicy::Tolerance { radius } => {
                self.grid.entry(grid_cell(point, radius)).or_default().push(id);
            }
        }
        (id, true)
    }

    /// Id already assigned to `point`, if any.
    pub fn lookup(&self, point: Vec2) -> Option<u32> {
        match self.policy {
            DedupPolicy::Exact => self.exact.get(&exact_key(point)).copied(),
            DedupPolicy::Tolerance { radius } => {
                let (cx, cy) = grid_cell(point, radius);
                let mut best: Option<u32> = None;
                for dx in -1..=1 {
                    for dy in -1..=1 {
                        let cell = (cx.saturating_add(dx), cy.saturating_add(dy));
                        let Some(ids) = self.grid.get(&cell) else {
                            continue;
                        };
                        for &id in ids {
                            if self.points[id as usize].distance(point) <= radius
                                && best.is_none_or(|b| id < b)
                            {
                                best = Some(id);
                            }
                        }
                    }
                }
                best
            }
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<Vec2> {
        self.points.get(id as usize).copied()
    }

    /// Coordinates indexed by keypoint id.
    pub fn coordinates(&self) -> &[Vec2] {
        &self.points
    }
}
