use std::net::IpAddr;
use std::time::{Duration, Instant};

use common::config::AccessConfig;
use dashmap::DashMap;
use tracing::debug;

use crate::error::AppError;

/// Who is asking to see a resume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    /// No token; identified by client IP.
    Anonymous(IpAddr),
    User(i32),
}

impl Viewer {
    pub fn user_id(&self) -> Option<i32> {
        match self {
            Viewer::User(id) => Some(*id),
            Viewer::Anonymous(_) => None,
        }
    }

    fn counter_key(&self) -> String {
        match self {
            Viewer::Anonymous(ip) => format!("ip:{ip}"),
            Viewer::User(id) => format!("user:{id}"),
        }
    }
}

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window view limits for anonymous and low-engagement callers.
///
/// Owners are never counted and users who have uploaded a resume of their
/// own are unlimited. Everyone else gets a per-window allowance.
pub struct AccessPolicy {
    config: AccessConfig,
    windows: DashMap<String, Window>,
}

impl AccessPolicy {
    pub fn new(config: AccessConfig) -> Self {
        Self {
            config,
            windows: DashMap::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn window(&self) -> Duration {
        Duration::from_secs(self.config.window_secs)
    }

    /// Record one access by `viewer` to a resume owned by `owner_id`.
    ///
    /// `viewer_has_uploads` is whether the viewer owns at least one resume.
    pub fn check(
        &self,
        viewer: &Viewer,
        owner_id: i32,
        viewer_has_uploads: bool,
    ) -> Result<(), AppError> {
        if !self.config.enabled || viewer.user_id() == Some(owner_id) {
            return Ok(());
        }

        let limit = match viewer {
            Viewer::User(_) if viewer_has_uploads => return Ok(()),
            Viewer::User(_) => self.config.registered_view_limit,
            Viewer::Anonymous(_) => self.config.anonymous_view_limit,
        };

        let window = self.window();
        let now = Instant::now();
        let mut entry = self
            .windows
            .entry(viewer.counter_key())
            .or_insert_with(|| Window {
                started: now,
                count: 0,
            });

        if now.duration_since(entry.started) >= window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= limit {
            let elapsed = now.duration_since(entry.started);
            let retry_after = window.saturating_sub(elapsed).as_secs().max(1);
            debug!(viewer = ?viewer, limit, retry_after, "View limit reached");
            return Err(AppError::ViewLimitExceeded { retry_after });
        }

        entry.count += 1;
        Ok(())
    }

    /// Drop windows that have run out. Returns how many were removed.
    pub fn prune_expired(&self) -> usize {
        let window = self.window();
        let before = self.windows.len();
        self.windows
            .retain(|_, w| w.started.elapsed() < window);
        before.saturating_sub(self.windows.len())
    }
}
