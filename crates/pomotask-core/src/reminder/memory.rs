//! In-process reminder scheduler that records every call.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use super::{ReminderHandle, ReminderRequest, ReminderScheduler};
use crate::error::SchedulingError;

/// [`ReminderScheduler`] that keeps pending reminders in memory.
///
/// Counts schedule/cancel calls so callers can assert on duplicate
/// scheduling, and can be told to fail to exercise degraded paths.
#[derive(Debug, Default)]
pub struct MemoryScheduler {
    pending: RefCell<BTreeMap<ReminderHandle, ReminderRequest>>,
    cancelled: RefCell<Vec<ReminderHandle>>,
    scheduled_total: Cell<usize>,
    next_id: Cell<u64>,
    fail_schedule: Cell<bool>,
    fail_cancel: Cell<bool>,
}

impl MemoryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_schedule(&self, fail: bool) {
        self.fail_schedule.set(fail);
    }

    pub fn set_fail_cancel(&self, fail: bool) {
        self.fail_cancel.set(fail);
    }

    /// Reminders scheduled and not yet cancelled.
    pub fn pending(&self) -> Vec<(ReminderHandle, ReminderRequest)> {
        self.pending
            .borrow()
            .iter()
            .map(|(h, r)| (h.clone(), r.clone()))
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn is_pending(&self, handle: &ReminderHandle) -> bool {
        self.pending.borrow().contains_key(handle)
    }

    /// Number of successful `schedule` calls so far.
    pub fn scheduled_total(&self) -> usize {
        self.scheduled_total.get()
    }

    /// Handles passed to successful `cancel` calls, in call order.
    pub fn cancelled(&self) -> Vec<ReminderHandle> {
        self.cancelled.borrow().clone()
    }
}

impl ReminderScheduler for MemoryScheduler {
    fn schedule(&self, request: &ReminderRequest) -> Result<ReminderHandle, SchedulingError> {
        if self.fail_schedule.get() {
            return Err(SchedulingError::ScheduleFailed {
                title: request.title.clone(),
                message: "scheduler offline".into(),
            });
        }
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        let handle = ReminderHandle::new(format!("mem-{id}"));
        self.pending
            .borrow_mut()
            .insert(handle.clone(), request.clone());
        self.scheduled_total.set(self.scheduled_total.get() + 1);
        Ok(handle)
    }

    fn cancel(&self, handle: &ReminderHandle) -> Result<(), SchedulingError> {
        if self.fail_cancel.get() {
            return Err(SchedulingError::CancelFailed {
                handle: handle.to_string(),
                message: "scheduler offline".into(),
            });
        }
        self.pending.borrow_mut().remove(handle);
        self.cancelled.borrow_mut().push(handle.clone());
        Ok(())
    }
}
