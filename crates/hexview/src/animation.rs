//! Moving-unit animation queue.
//!
//! Every unit in the queue advances one waypoint per step interval, all in
//! lockstep. The view turns the returned [`MovementStep`]s into sprite
//! changes.

use std::collections::VecDeque;

use hexview_core::{EntityId, HexCoord};

#[derive(Clone, Debug, PartialEq, Eq)]
struct MovingUnit {
    entity: EntityId,
    start: HexCoord,
    path: VecDeque<HexCoord>,
}

/// One state change produced by [`MovementQueue::tick`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MovementStep {
    /// The unit is now shown at `at`; `start` is where its ghost stays.
    Moved {
        id: EntityId,
        at: HexCoord,
        start: HexCoord,
    },
    /// The unit ran out of waypoints.
    Finished { id: EntityId },
}

#[derive(Debug)]
pub struct MovementQueue {
    units: VecDeque<MovingUnit>,
    interval_ms: u64,
    last_step: Option<u64>,
}

impl MovementQueue {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            units: VecDeque::new(),
            interval_ms,
            last_step: None,
        }
    }

    /// Queues `entity` to walk `path`; the first waypoint is its start hex.
    /// A unit already moving has its path replaced. Empty paths are ignored.
    pub fn push(&mut self, entity: EntityId, path: Vec<HexCoord>) {
        let mut path: VecDeque<HexCoord> = path.into();
        let Some(start) = path.pop_front() else {
            return;
        };
        self.units.retain(|u| u.entity != entity);
        self.units.push_back(MovingUnit {
            entity,
            start,
            path,
        });
    }

    pub fn is_moving(&self, entity: EntityId) -> bool {
        self.units.iter().any(|u| u.entity == entity)
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Advances every unit by one waypoint if the step interval has passed
    /// since the last step. Units with no waypoints left finish.
    pub fn tick(&mut self, now_ms: u64) -> Vec<MovementStep> {
        if self.units.is_empty() {
            self.last_step = None;
            return Vec::new();
        }
        if self
            .last_step
            .is_some_and(|last| now_ms.saturating_sub(last) < self.interval_ms)
        {
            return Vec::new();
        }
        self.last_step = Some(now_ms);
        let mut steps = Vec::with_capacity(self.units.len());
        self.units.retain_mut(|unit| match unit.path.pop_front() {
            Some(at) => {
                steps.push(MovementStep::Moved {
                    id: unit.entity,
                    at,
                    start: unit.start,
                });
                true
            }
            None => {
                steps.push(MovementStep::Finished { id: unit.entity });
                false
            }
        });
        steps
    }
}
