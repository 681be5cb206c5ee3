//! Bounded diagnostic queue shared by every component and system of an engine.
//!
//! The queue is the only state that crosses simulation worker threads, so all
//! mutation goes through a single mutex. Every message is mirrored to `tracing`
//! at the matching level when it is added.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

/// Queue capacity used by [`MessageHandler::new`].
pub const DEFAULT_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Debug,
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Fatal,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            Severity::Debug => "Debug: ",
            Severity::Info => "Info: ",
            Severity::Warning => "Warning: ",
            Severity::Error => "Error: ",
            Severity::Fatal => "Fatal error: ",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Message {
    pub severity: Severity,
    pub text: String,
    pub tag: Option<String>,
    pub debug_level: u8,
}

impl Message {
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
            tag: None,
            debug_level: 0,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_debug_level(mut self, level: u8) -> Self {
        self.debug_level = level;
        self
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.severity.prefix(), self.text)
    }
}

#[derive(Debug, Default)]
struct Queue {
    messages: VecDeque<Message>,
    counts: [usize; 5],
}

/// Thread-safe bounded FIFO of [`Message`]s with per-severity counters.
///
/// A handler made with [`MessageHandler::forwarding_to`] queues nothing: it
/// passes every message on to its target and only keeps the counters, so one
/// producer's diagnostics can be tallied while sharing a common queue.
#[derive(Debug)]
pub struct MessageHandler {
    queue: Mutex<Queue>,
    capacity: usize,
    max_debug_level: u8,
    target: Option<Arc<MessageHandler>>,
}

impl Default for MessageHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageHandler {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(Queue::default()),
            capacity: DEFAULT_CAPACITY,
            max_debug_level: 1,
            target: None,
        }
    }

    /// Handler that counts what it is given and queues it on `target`.
    pub fn forwarding_to(target: Arc<MessageHandler>) -> Self {
        Self {
            max_debug_level: target.max_debug_level,
            target: Some(target),
            ..Self::new()
        }
    }

    pub fn target(&self) -> Option<&Arc<MessageHandler>> {
        self.target.as_ref()
    }

    pub fn with_capacity(capacity: usize) -> CoreResult<Self> {
        if capacity == 0 {
            return Err(CoreError::ZeroCapacity);
        }
        Ok(Self {
            capacity,
            ..Self::new()
        })
    }

    /// Debug messages above this level are traced but not queued.
    pub fn set_max_debug_level(&mut self, level: u8) {
        self.max_debug_level = level;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, Queue> {
        // A panicking producer cannot leave the queue half-updated.
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_message(&self, message: Message) {
        if let Some(target) = &self.target {
            if !self.drops(&message) {
                self.lock().counts[message.severity.slot()] += 1;
            }
            target.add_message(message);
            return;
        }

        trace_message(&message);
        if self.drops(&message) {
            return;
        }

        let mut queue = self.lock();
        queue.counts[message.severity.slot()] += 1;
        queue.messages.push_back(message);
        while queue.messages.len() > self.capacity {
            if let Some(evicted) = queue.messages.pop_front() {
                queue.counts[evicted.severity.slot()] -= 1;
            }
        }
    }

    fn drops(&self, message: &Message) -> bool {
        message.severity == Severity::Debug && message.debug_level > self.max_debug_level
    }

    pub fn add(&self, severity: Severity, text: impl Into<String>, tag: Option<&str>) {
        let mut message = Message::new(severity, text);
        message.tag = tag.map(str::to_owned);
        self.add_message(message);
    }

    pub fn info(&self, text: impl Into<String>) {
        self.add_message(Message::new(Severity::Info, text));
    }

    pub fn warning(&self, text: impl Into<String>) {
        self.add_message(Message::new(Severity::Warning, text));
    }

    pub fn error(&self, text: impl Into<String>) {
        self.add_message(Message::new(Severity::Error, text));
    }

    pub fn fatal(&self, text: impl Into<String>) {
        self.add_message(Message::new(Severity::Fatal, text));
    }

    pub fn debug(&self, level: u8, text: impl Into<String>) {
        self.add_message(Message::new(Severity::Debug, text).with_debug_level(level));
    }

    /// Pop the oldest message.
    pub fn get_message(&self) -> Option<Message> {
        let mut queue = self.lock();
        let message = queue.messages.pop_front()?;
        queue.counts[message.severity.slot()] -= 1;
        Some(message)
    }

    /// Pop everything currently queued, oldest first.
    pub fn drain(&self) -> Vec<Message> {
        let mut queue = self.lock();
        queue.counts = [0; 5];
        queue.messages.drain(..).collect()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.lock().counts[severity.slot()]
    }

    pub fn num_waiting(&self) -> usize {
        self.lock().messages.len()
    }

    pub fn num_debug_messages(&self) -> usize {
        self.count(Severity::Debug)
    }

    pub fn num_info_messages(&self) -> usize {
        self.count(Severity::Info)
    }

    pub fn num_warning_messages(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn num_error_messages(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn num_fatal_messages(&self) -> usize {
        self.count(Severity::Fatal)
    }

    pub fn clear(&self) {
        let mut queue = self.lock();
        queue.messages.clear();
        queue.counts = [0; 5];
    }
}

fn trace_message(message: &Message) {
    let tag = message.tag.as_deref().unwrap_or("");
    match message.severity {
        Severity::Debug => {
            tracing::debug!(tag, level = message.debug_level, "{}", message.text)
        }
        Severity::Info => tracing::info!(tag, "{}", message.text),
        Severity::Warning => tracing::warn!(tag, "{}", message.text),
        Severity::Error | Severity::Fatal => tracing::error!(tag, "{}", message.text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn severity_for(i: usize) -> Severity {
        if i % 3 == 0 {
            Severity::Warning
        } else {
            Severity::Info
        }
    }

    #[test]
    fn fifo_order_and_counters() {
        let handler = MessageHandler::new();
        handler.info("first");
        handler.warning("second");
        handler.error("third");
        assert_eq!(handler.num_waiting(), 3);
        assert_eq!(handler.num_warning_messages(), 1);

        let first = handler.get_message().unwrap();
        assert_eq!(first.text, "first");
        assert_eq!(first.to_string(), "Info: first");
        assert_eq!(handler.num_info_messages(), 0);
        assert_eq!(handler.num_waiting(), 2);
    }

    #[test]
    fn empty_queue_returns_none() {
        let handler = MessageHandler::new();
        assert!(handler.get_message().is_none());
    }

    #[test]
    fn overflow_evicts_oldest_and_adjusts_its_counter() {
        let at_capacity = MessageHandler::new();
        for i in 0..10_000 {
            at_capacity.add(severity_for(i), format!("msg {}", i + 1), None);
        }

        let overflowed = MessageHandler::new();
        for i in 0..10_001 {
            overflowed.add(severity_for(i), format!("msg {}", i + 1), None);
        }

        assert_eq!(overflowed.num_waiting(), 10_000);
        // message #1 was a warning, message #10001 is an info
        assert_eq!(
            overflowed.num_warning_messages(),
            at_capacity.num_warning_messages() - 1
        );
        assert_eq!(
            overflowed.num_info_messages(),
            at_capacity.num_info_messages() + 1
        );
        assert_eq!(overflowed.get_message().unwrap().text, "msg 2");
    }

    #[test]
    fn clear_resets_everything() {
        let handler = MessageHandler::with_capacity(4).unwrap();
        handler.fatal("boom");
        handler.debug(0, "trace");
        handler.clear();
        assert_eq!(handler.num_waiting(), 0);
        for severity in Severity::ALL {
            assert_eq!(handler.count(severity), 0);
        }
    }

    #[test]
    fn debug_messages_above_max_level_are_dropped() {
        let mut handler = MessageHandler::new();
        handler.set_max_debug_level(2);
        handler.debug(2, "kept");
        handler.debug(3, "dropped");
        assert_eq!(handler.num_debug_messages(), 1);
    }

    #[test]
    fn forwarding_handler_tallies_and_queues_on_target() {
        let shared = Arc::new(MessageHandler::new());
        let noisy = MessageHandler::forwarding_to(Arc::clone(&shared));
        let quiet = MessageHandler::forwarding_to(Arc::clone(&shared));
        noisy.warning("unused parameter");
        noisy.debug(5, "too detailed");
        quiet.info("started");

        assert_eq!(noisy.num_warning_messages(), 1);
        assert_eq!(noisy.num_debug_messages(), 0);
        assert_eq!(noisy.num_waiting(), 0);
        assert_eq!(quiet.num_warning_messages(), 0);
        assert_eq!(shared.num_waiting(), 2);

        shared.drain();
        assert_eq!(noisy.num_warning_messages(), 1);
        assert!(Arc::ptr_eq(noisy.target().unwrap(), &shared));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert_eq!(
            MessageHandler::with_capacity(0).unwrap_err(),
            CoreError::ZeroCapacity
        );
    }

    #[test]
    fn concurrent_producers_keep_counts_consistent() {
        let handler = Arc::new(MessageHandler::with_capacity(100).unwrap());
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let handler = Arc::clone(&handler);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        handler.error("worker");
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(handler.num_waiting(), 100);
        assert_eq!(handler.num_error_messages(), 100);
        assert_eq!(handler.drain().len(), 100);
        assert_eq!(handler.num_error_messages(), 0);
    }
}
