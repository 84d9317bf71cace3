//! Node placement and waypoint ordering.

use super::ScriptError;
use crate::topology::{Node, Position};

/// Where a node sits in the simulation.
#[derive(Debug, Clone, PartialEq)]
pub enum Placement<'a> {
    /// A single fixed position; the origin when none was given
    Static(Position),
    /// A multi-point trajectory, in the order it was declared
    Trajectory(&'a [Position]),
}

impl<'a> Placement<'a> {
    /// Decide how `node` is placed.
    ///
    /// A list with more than one entry is a trajectory. Only one of the
    /// absolute and relative lists may be a trajectory. Otherwise the
    /// absolute position wins over the relative one.
    pub fn of(node: &'a Node) -> Result<Self, ScriptError> {
        let absolute = &node.abs_positions;
        let relative = &node.positions;
        match (absolute.len() > 1, relative.len() > 1) {
            (true, true) => Err(ScriptError::ConflictingPositions {
                node: node.name.clone(),
                absolute: absolute.len(),
                relative: relative.len(),
            }),
            (true, false) => Ok(Placement::Trajectory(absolute)),
            (false, true) => Ok(Placement::Trajectory(relative)),
            (false, false) => Ok(Placement::Static(
                absolute
                    .first()
                    .or_else(|| relative.first())
                    .copied()
                    .unwrap_or_default(),
            )),
        }
    }
}

/// Order waypoints by timestamp, whatever order they were declared in.
///
/// Each round picks the earliest position strictly later than the one
/// picked before it. Returns `None` when a round finds nothing while
/// positions remain, which happens for duplicate or NaN timestamps.
pub fn chronological(positions: &[Position]) -> Option<Vec<Position>> {
    let mut ordered = Vec::with_capacity(positions.len());
    let mut previous: Option<f64> = None;
    for _ in positions {
        let next = positions
            .iter()
            .filter(|p| previous.map_or(!p.time.is_nan(), |t| p.time > t))
            .min_by(|a, b| a.time.total_cmp(&b.time))?;
        previous = Some(next.time);
        ordered.push(*next);
    }
    Some(ordered)
}
