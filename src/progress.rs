//! Progress reporting type (§6). Decoupled from any terminal UI: the
//! CLI drives an `indicatif::ProgressBar` from these events, but a host
//! embedding the crate is free to do anything else with them.

use super::*;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub progress: f32,
    pub event: String,
    pub task_id: i64,
    pub ray_count: u64,
}

impl ProgressEvent {
    pub fn new(progress: f32, event: impl Into<String>, task_id: i64, ray_count: u64) -> Self {
        Self {
            progress,
            event: event.into(),
            task_id,
            ray_count,
        }
    }
}

/// Emits progress at roughly 10% ray-count intervals (§6), calling back
/// into whatever the host supplied. `total_rays` of 0 means "unknown",
/// and is reported as a single 0%-then-100% pair via `update`/`complete`.
pub struct ProgressTracker<'a> {
    total_rays: u64,
    task_id: i64,
    last_bucket: u64,
    callback: Box<dyn FnMut(ProgressEvent) + 'a>,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(total_rays: u64, task_id: i64, callback: impl FnMut(ProgressEvent) + 'a) -> Self {
        Self {
            total_rays,
            task_id,
            last_bucket: 0,
            callback: Box::new(callback),
        }
    }

    /// Ray-cast-stage progress: fires when `rays_so_far` crosses into a
    /// new 10% bucket of `total_rays`. A no-op once `total_rays` is
    /// unknown (0) or the final bucket has already fired — `complete`
    /// is the stage's one terminal event.
    pub fn update(&mut self, event: &str, rays_so_far: u64) {
        if self.total_rays == 0 || self.last_bucket >= 10 {
            return;
        }
        let bucket = (rays_so_far * 10 / self.total_rays).min(10);
        if bucket > self.last_bucket {
            self.last_bucket = bucket;
            let progress = (rays_so_far as f32 / self.total_rays as f32).min(1.0);
            (self.callback)(ProgressEvent::new(progress, event.to_owned(), self.task_id, rays_so_far));
        }
    }

    /// Unconditionally emits one final 100% event for `event` (the
    /// output stage, §6), regardless of whether `update` already reached
    /// its last bucket or `total_rays` was unknown.
    pub fn complete(&mut self, event: &str, rays_so_far: u64) {
        self.last_bucket = 10;
        (self.callback)(ProgressEvent::new(1.0, event.to_owned(), self.task_id, rays_so_far));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_tracker_emits_at_ten_percent_steps() {
        let events = RefCell::new(vec![]);
        let mut tracker = ProgressTracker::new(100, 1, |e| events.borrow_mut().push(e));
        for rays in [0, 5, 10, 15, 50, 100] {
            tracker.update("render", rays);
        }
        let recorded = events.borrow();
        assert!(recorded.len() >= 2);
        assert_eq!(recorded.last().unwrap().ray_count, 100);
    }

    #[test]
    fn test_complete_always_fires_even_after_last_bucket() {
        let events = RefCell::new(vec![]);
        let mut tracker = ProgressTracker::new(100, 2, |e| events.borrow_mut().push(e));
        tracker.update("render", 100);
        tracker.update("render", 150); // no-op: already at the last bucket
        tracker.complete("output", 150);
        let recorded = events.borrow();
        assert_eq!(recorded.last().unwrap().event, "output");
        assert!((recorded.last().unwrap().progress - 1.0).abs() < 1e-6);
    }
}
