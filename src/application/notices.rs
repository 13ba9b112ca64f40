// SPDX-License-Identifier: MPL-2.0
//! User-facing notices.
//!
//! Recoverable failures never abort a viewer operation; they are published
//! here instead. Subscribers receive notices over a broadcast channel and a
//! short history is kept for late subscribers.

use crate::config::{NOTICE_CHANNEL_CAPACITY, NOTICE_HISTORY_LEN};
use crate::error::Error;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

/// Unique identifier for a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoticeId(u64);

impl NoticeId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for NoticeId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    Info,
    /// Something did not happen, the viewer carries on.
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    id: NoticeId,
    severity: Severity,
    message: String,
    error: Option<Error>,
    created_at: DateTime<Utc>,
}

impl Notice {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            id: NoticeId::new(),
            severity,
            message: message.into(),
            error: None,
            created_at: Utc::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    /// Transient failures become warnings, everything else an error.
    #[must_use]
    pub fn from_error(error: Error) -> Self {
        let severity = if error.is_transient() {
            Severity::Warning
        } else {
            Severity::Error
        };
        let message = error.to_string();
        Self {
            error: Some(error),
            ..Self::new(severity, message)
        }
    }

    #[must_use]
    pub fn id(&self) -> NoticeId {
        self.id
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Broadcast sender plus bounded history.
#[derive(Debug)]
pub struct NoticeChannel {
    sender: broadcast::Sender<Notice>,
    recent: VecDeque<Notice>,
}

impl NoticeChannel {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(NOTICE_CHANNEL_CAPACITY);
        Self {
            sender,
            recent: VecDeque::with_capacity(NOTICE_HISTORY_LEN),
        }
    }

    pub fn publish(&mut self, notice: Notice) {
        match notice.severity {
            Severity::Info => log::info!("{}", notice.message),
            Severity::Warning => log::warn!("{}", notice.message),
            Severity::Error => log::error!("{}", notice.message),
        }
        if self.recent.len() == NOTICE_HISTORY_LEN {
            self.recent.pop_front();
        }
        self.recent.push_back(notice.clone());
        // No subscriber is not an error.
        let _ = self.sender.send(notice);
    }

    pub fn report(&mut self, error: Error) {
        self.publish(Notice::from_error(error));
    }

    pub fn report_all(&mut self, errors: impl IntoIterator<Item = Error>) {
        for error in errors {
            self.report(error);
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.sender.subscribe()
    }

    /// Sender handle, for subscribing from another task.
    #[must_use]
    pub fn sender(&self) -> broadcast::Sender<Notice> {
        self.sender.clone()
    }

    /// Most recent notices, oldest first.
    #[must_use]
    pub fn recent(&self) -> Vec<Notice> {
        self.recent.iter().cloned().collect()
    }
}

impl Default for NoticeChannel {
    fn default() -> Self {
        Self::new()
    }
}
