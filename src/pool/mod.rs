//! Sender number pool.
//!
//! A bounded set of sender numbers handed out one-to-one to targets under a
//! daily quota. Lifecycle:
//!
//! ```text
//!            assign                release(cooldown)
//! Available ───────▶ Assigned ─────────────────────▶ Cooldown
//!     ▲                 │                               │
//!     │                 │ release(no cooldown)          │ reset_daily_counts
//!     └─────────────────┴───────────────────────────────┘
//!
//! Disabled: only via disable_number / enable_number
//! ```
//!
//! All mutations run under the write half of one pool-wide lock, so the
//! check-then-act of an assignment is atomic with respect to every other
//! assignment or release. A target holds at most one assigned number.

mod number;
mod reset;

pub use number::{NumberState, PoolStats, PooledNumber};
pub use reset::DailyReset;

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::telemetry::counters;

/// Default assignments allowed per number per day.
pub const DEFAULT_DAILY_LIMIT: u32 = 20;

/// Pool state guarded by the pool lock.
#[derive(Default)]
struct PoolInner {
    /// Numbers in insertion order
    numbers: Vec<PooledNumber>,

    /// Number -> position in `numbers`
    index: HashMap<String, usize>,

    /// Target -> position of the number assigned to it
    bindings: HashMap<String, usize>,
}

impl PoolInner {
    fn insert(&mut self, number: &str, provider: &str) {
        let fresh = PooledNumber::new(number, provider);
        match self.index.get(number).copied() {
            Some(idx) => {
                if let Some(target) = self.numbers[idx].assigned_target.take() {
                    self.bindings.remove(&target);
                }
                self.numbers[idx] = fresh;
            }
            None => {
                self.index.insert(number.to_string(), self.numbers.len());
                self.numbers.push(fresh);
            }
        }
    }

    fn assign(&mut self, target: &str, task_id: Option<&str>, daily_limit: u32) -> Option<String> {
        // Repeat assignment for the same target is a no-op
        if let Some(&idx) = self.bindings.get(target) {
            let existing = &self.numbers[idx];
            debug!(number = %existing.number, target = %target, "target already assigned");
            return Some(existing.number.clone());
        }

        let Some(idx) = self
            .numbers
            .iter()
            .position(|n| n.is_assignable(daily_limit))
        else {
            warn!(target = %target, "no available numbers for target");
            counters::pool_exhausted();
            return None;
        };

        let number = &mut self.numbers[idx];
        number.bind(target, task_id);
        self.bindings.insert(target.to_string(), idx);

        info!(
            number = %number.number,
            target = %target,
            provider = %number.provider,
            daily_count = number.daily_send_count,
            "number assigned"
        );
        counters::pool_number_assigned(&number.provider);

        Some(number.number.clone())
    }

    /// Drop the binding of the number at `idx` and move it to `state`.
    fn unbind(&mut self, idx: usize, state: NumberState) {
        if let Some(target) = self.numbers[idx].assigned_target.as_deref() {
            if self.bindings.get(target) == Some(&idx) {
                self.bindings.remove(target);
            }
        }
        self.numbers[idx].unbind(state);
    }
}

/// Pool of sender numbers.
pub struct NumberPool {
    inner: RwLock<PoolInner>,
    daily_limit: u32,
}

impl NumberPool {
    /// Create an empty pool.
    pub fn new(daily_limit: u32) -> Self {
        Self {
            inner: RwLock::new(PoolInner::default()),
            daily_limit,
        }
    }

    /// Assignments allowed per number per day.
    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    /// Add a number in the Available state.
    ///
    /// Adding a number that already exists replaces it with a fresh record
    /// at the same position.
    pub async fn add_number(&self, number: &str, provider: &str) {
        self.inner.write().await.insert(number, provider);
        info!(number = %number, provider = %provider, "number added to pool");
    }

    /// Add several `(number, provider)` pairs.
    pub async fn add_numbers_bulk<I, N, P>(&self, numbers: I)
    where
        I: IntoIterator<Item = (N, P)>,
        N: AsRef<str>,
        P: AsRef<str>,
    {
        let mut inner = self.inner.write().await;
        let mut added = 0usize;
        for (number, provider) in numbers {
            inner.insert(number.as_ref(), provider.as_ref());
            added += 1;
        }
        info!(count = added, "numbers added to pool");
    }

    /// Assign a number to `target`.
    ///
    /// Returns the number already bound to `target` if there is one, without
    /// touching its counters. `None` means the pool has no capacity left.
    pub async fn assign_number(&self, target: &str, task_id: Option<&str>) -> Option<String> {
        self.inner
            .write()
            .await
            .assign(target, task_id, self.daily_limit)
    }

    /// Assign numbers to `targets` in order, stopping at the first target
    /// that cannot be served.
    ///
    /// The result may be shorter than `targets`. Assignments already made are
    /// kept; pass the result to [`undo_assignments`](Self::undo_assignments)
    /// to roll them back.
    pub async fn assign_batch<S: AsRef<str>>(
        &self,
        targets: &[S],
        task_id: Option<&str>,
    ) -> HashMap<String, String> {
        let mut inner = self.inner.write().await;
        let mut assignments = HashMap::with_capacity(targets.len());

        for target in targets {
            let target = target.as_ref();
            match inner.assign(target, task_id, self.daily_limit) {
                Some(number) => {
                    assignments.insert(target.to_string(), number);
                }
                None => {
                    warn!(
                        requested = targets.len(),
                        assigned = assignments.len(),
                        "batch assignment stopped early"
                    );
                    break;
                }
            }
        }

        assignments
    }

    /// Release an assigned number.
    ///
    /// With `cooldown` the number waits for the next daily reset, otherwise
    /// it is Available again immediately. Numbers that are not Assigned are
    /// left untouched. Returns whether a release happened.
    pub async fn release_number(&self, number: &str, cooldown: bool) -> bool {
        let mut inner = self.inner.write().await;
        let Some(&idx) = inner.index.get(number) else {
            debug!(number = %number, "release of unknown number ignored");
            return false;
        };

        if inner.numbers[idx].state != NumberState::Assigned {
            debug!(
                number = %number,
                state = inner.numbers[idx].state.name(),
                "release of unassigned number ignored"
            );
            return false;
        }

        let next = if cooldown {
            NumberState::Cooldown
        } else {
            NumberState::Available
        };
        inner.unbind(idx, next);

        info!(number = %number, state = next.name(), "number released");
        counters::pool_number_released(cooldown);
        true
    }

    /// Roll back assignments returned by [`assign_batch`](Self::assign_batch)
    /// or [`assign_number`](Self::assign_number).
    ///
    /// Every number still bound to the listed target goes back to Available
    /// with its daily and total counters decremented. Returns how many were
    /// undone.
    pub async fn undo_assignments(&self, assignments: &HashMap<String, String>) -> usize {
        let mut inner = self.inner.write().await;
        let mut undone = 0;

        for (target, number) in assignments {
            let Some(&idx) = inner.index.get(number.as_str()) else {
                continue;
            };
            let entry = &inner.numbers[idx];
            if entry.state != NumberState::Assigned
                || entry.assigned_target.as_deref() != Some(target.as_str())
            {
                continue;
            }

            inner.unbind(idx, NumberState::Available);
            let entry = &mut inner.numbers[idx];
            entry.daily_send_count = entry.daily_send_count.saturating_sub(1);
            entry.total_send_count = entry.total_send_count.saturating_sub(1);
            undone += 1;
        }

        if undone > 0 {
            info!(count = undone, "assignments rolled back");
        }
        undone
    }

    /// Zero every daily counter and return Cooldown numbers to Available.
    ///
    /// This is the only way a cooldown ends; the pool never calls it on its
    /// own. Returns how many numbers left Cooldown.
    pub async fn reset_daily_counts(&self) -> usize {
        let mut inner = self.inner.write().await;
        let mut restored = 0;

        for number in inner.numbers.iter_mut() {
            number.daily_send_count = 0;
            number.cooling = false;
            if number.state == NumberState::Cooldown {
                number.state = NumberState::Available;
                restored += 1;
            }
        }

        info!(
            numbers = inner.numbers.len(),
            restored = restored,
            "daily counts reset"
        );
        counters::pool_daily_reset(restored as u64);
        restored
    }

    /// Take a number out of rotation. Any binding is dropped.
    ///
    /// A number disabled during Cooldown stays cooling: enabling it before
    /// the next daily reset puts it back in Cooldown.
    pub async fn disable_number(&self, number: &str) -> bool {
        let mut inner = self.inner.write().await;
        let Some(&idx) = inner.index.get(number) else {
            return false;
        };
        if inner.numbers[idx].state == NumberState::Cooldown {
            inner.numbers[idx].cooling = true;
        }
        inner.unbind(idx, NumberState::Disabled);
        warn!(number = %number, "number disabled");
        true
    }

    /// Put a disabled number back into rotation.
    pub async fn enable_number(&self, number: &str) -> bool {
        let mut inner = self.inner.write().await;
        let Some(&idx) = inner.index.get(number) else {
            return false;
        };
        let entry = &mut inner.numbers[idx];
        if entry.state != NumberState::Disabled {
            return false;
        }
        entry.state = if entry.cooling {
            NumberState::Cooldown
        } else {
            NumberState::Available
        };
        entry.cooling = false;
        info!(number = %number, state = entry.state.name(), "number enabled");
        true
    }

    /// Number of numbers in the Available state.
    pub async fn available_count(&self) -> usize {
        self.inner
            .read()
            .await
            .numbers
            .iter()
            .filter(|n| n.state == NumberState::Available)
            .count()
    }

    /// Occupancy by state.
    pub async fn stats(&self) -> PoolStats {
        let inner = self.inner.read().await;
        let mut stats = PoolStats {
            daily_limit: self.daily_limit,
            ..Default::default()
        };
        for number in &inner.numbers {
            stats.count(number.state);
        }
        stats
    }

    /// Snapshot of one number.
    pub async fn get(&self, number: &str) -> Option<PooledNumber> {
        let inner = self.inner.read().await;
        inner
            .index
            .get(number)
            .map(|&idx| inner.numbers[idx].clone())
    }

    /// Number currently assigned to `target`.
    pub async fn assigned_to(&self, target: &str) -> Option<String> {
        let inner = self.inner.read().await;
        inner
            .bindings
            .get(target)
            .map(|&idx| inner.numbers[idx].number.clone())
    }

    /// Snapshot of every number in insertion order.
    pub async fn numbers(&self) -> Vec<PooledNumber> {
        self.inner.read().await.numbers.clone()
    }

    /// Total numbers in the pool.
    pub async fn len(&self) -> usize {
        self.inner.read().await.numbers.len()
    }

    /// Check if empty.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for NumberPool {
    fn default() -> Self {
        Self::new(DEFAULT_DAILY_LIMIT)
    }
}
