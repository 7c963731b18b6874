//! Types for the sender number pool.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lifecycle state of a pooled number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberState {
    /// Free to be assigned
    Available,
    /// Bound to a target
    Assigned,
    /// Released, waiting for the next daily reset
    Cooldown,
    /// Taken out of rotation by an operator
    Disabled,
}

impl NumberState {
    /// Get the string name of this state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Assigned => "assigned",
            Self::Cooldown => "cooldown",
            Self::Disabled => "disabled",
        }
    }
}

/// A sender number owned by the pool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PooledNumber {
    /// The number itself (E.164)
    pub number: String,

    /// Provider that owns the number
    pub provider: String,

    /// Current state
    pub state: NumberState,

    /// Target this number is bound to while assigned
    pub assigned_target: Option<String>,

    /// Task that requested the assignment
    pub assigned_task_id: Option<String>,

    /// Last time the number was assigned
    pub last_used: Option<DateTime<Utc>>,

    /// Assignments since the last daily reset
    pub daily_send_count: u32,

    /// Assignments since the number joined the pool
    pub total_send_count: u64,

    /// Disabled while in Cooldown; enabling returns it to Cooldown
    #[serde(skip)]
    pub(crate) cooling: bool,
}

impl PooledNumber {
    pub(crate) fn new(number: &str, provider: &str) -> Self {
        Self {
            number: number.to_string(),
            provider: provider.to_string(),
            state: NumberState::Available,
            assigned_target: None,
            assigned_task_id: None,
            last_used: None,
            daily_send_count: 0,
            total_send_count: 0,
            cooling: false,
        }
    }

    /// Check if the number can take a new assignment under `daily_limit`.
    pub fn is_assignable(&self, daily_limit: u32) -> bool {
        self.state == NumberState::Available && self.daily_send_count < daily_limit
    }

    pub(crate) fn bind(&mut self, target: &str, task_id: Option<&str>) {
        self.state = NumberState::Assigned;
        self.assigned_target = Some(target.to_string());
        self.assigned_task_id = task_id.map(str::to_string);
        self.last_used = Some(Utc::now());
        self.daily_send_count += 1;
        self.total_send_count += 1;
    }

    pub(crate) fn unbind(&mut self, state: NumberState) {
        self.state = state;
        self.assigned_target = None;
        self.assigned_task_id = None;
    }
}

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub total: usize,
    pub available: usize,
    pub assigned: usize,
    pub cooldown: usize,
    pub disabled: usize,
    pub daily_limit: u32,
}

impl PoolStats {
    pub(crate) fn count(&mut self, state: NumberState) {
        self.total += 1;
        match state {
            NumberState::Available => self.available += 1,
            NumberState::Assigned => self.assigned += 1,
            NumberState::Cooldown => self.cooldown += 1,
            NumberState::Disabled => self.disabled += 1,
        }
    }
}
