//! # Thread Filter
//!
//! Substring filtering of the thread list. A stack passes when every
//! whitespace-separated term occurs in its display name or in its
//! stack-trace digest (one `frame\n` line per frame).
//!
//! Digests are computed on first need, in the background, at most once per
//! stack: the cache entry is flipped to `Computing` under the lock before the
//! backend is asked, so concurrent evaluations never start a second request.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::provider::{FrameEvent, FrameReceiver};
use crate::queue::{Task, TaskSender};
use crate::types::{StackId, StackRef};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Digest
{
    Computing,
    Unavailable,
    Ready(String),
}

#[derive(Debug, Default)]
struct DigestCache
{
    digests: HashMap<StackId, Digest>,
    in_flight: usize,
    epoch: u64,
}

/// Stack-trace digest cache plus the matching rule.
///
/// Cloning shares the cache, so clones can be used from other threads.
#[derive(Clone)]
pub struct ThreadFilter
{
    cache: Arc<Mutex<DigestCache>>,
    tasks: TaskSender,
}

impl ThreadFilter
{
    pub(crate) fn new(tasks: TaskSender) -> Self
    {
        Self { cache: Arc::new(Mutex::new(DigestCache::default())), tasks }
    }

    fn lock(&self) -> MutexGuard<'_, DigestCache>
    {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether `stack` passes `filter_text`.
    ///
    /// An empty filter matches everything without touching the cache. For
    /// any other filter a missing digest is requested and the stack is judged
    /// by its name alone until the digest arrives.
    pub fn matches(&self, stack: &StackRef, filter_text: &str) -> bool
    {
        let terms: Vec<&str> = filter_text.split_whitespace().collect();
        if terms.is_empty() {
            return true;
        }

        let name = stack.display_name();
        let (matched, request) = {
            let mut cache = self.lock();
            match cache.digests.get(&stack.id()) {
                Some(Digest::Ready(digest)) => {
                    let matched = terms.iter().all(|term| name.contains(term) || digest.contains(term));
                    (matched, None)
                }
                Some(Digest::Computing | Digest::Unavailable) => (terms.iter().all(|term| name.contains(term)), None),
                None => {
                    cache.digests.insert(stack.id(), Digest::Computing);
                    cache.in_flight += 1;
                    let first = cache.in_flight == 1;
                    (terms.iter().all(|term| name.contains(term)), Some((cache.epoch, first)))
                }
            }
        };

        if let Some((epoch, first)) = request {
            if first {
                self.tasks.send(Task::FilterActivity);
            }
            debug!(stack = %stack.id(), "computing stack trace digest");
            stack.compute_frames(0, Arc::new(StackTraceBuilder {
                stack: stack.id(),
                epoch,
                finished: AtomicBool::new(false),
                text: Mutex::new(String::new()),
                cache: self.cache.clone(),
                tasks: self.tasks.clone(),
            }));
        }

        matched
    }

    /// Cached digest of `stack`, if computed.
    #[must_use]
    pub fn digest(&self, stack: StackId) -> Option<String>
    {
        match self.lock().digests.get(&stack) {
            Some(Digest::Ready(digest)) => Some(digest.clone()),
            _ => None,
        }
    }

    /// Number of digest computations still outstanding.
    #[must_use]
    pub fn computations_in_flight(&self) -> usize
    {
        self.lock().in_flight
    }

    /// Forget every digest. Computations still running finish silently.
    pub(crate) fn invalidate(&self)
    {
        let mut cache = self.lock();
        cache.digests.clear();
        cache.epoch += 1;
    }
}

struct StackTraceBuilder
{
    stack: StackId,
    epoch: u64,
    finished: AtomicBool,
    text: Mutex<String>,
    cache: Arc<Mutex<DigestCache>>,
    tasks: TaskSender,
}

impl StackTraceBuilder
{
    fn finish(&self, digest: Option<String>)
    {
        if self.finished.swap(true, Ordering::SeqCst) {
            return;
        }
        let (stored, idle) = {
            let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            cache.in_flight = cache.in_flight.saturating_sub(1);
            let current = cache.epoch == self.epoch;
            let stored = current && digest.is_some();
            if current {
                let entry = digest.map_or(Digest::Unavailable, Digest::Ready);
                cache.digests.insert(self.stack, entry);
            }
            (stored, cache.in_flight == 0)
        };

        if stored {
            self.tasks.send(Task::DigestReady(self.stack));
        }
        if idle {
            self.tasks.send(Task::FilterActivity);
        }
    }
}

impl FrameReceiver for StackTraceBuilder
{
    fn deliver(&self, event: FrameEvent)
    {
        match event {
            FrameEvent::Batch { frames, last, .. } => {
                let digest = {
                    let mut text = self.text.lock().unwrap_or_else(PoisonError::into_inner);
                    for frame in &frames {
                        let _ = writeln!(text, "{frame}");
                    }
                    last.then(|| std::mem::take(&mut *text))
                };
                if digest.is_some() {
                    self.finish(digest);
                }
            }
            FrameEvent::Error(message) => {
                warn!(stack = %self.stack, %message, "stack trace digest failed");
                self.finish(None);
            }
        }
    }

    fn is_obsolete(&self) -> bool
    {
        self.finished.load(Ordering::SeqCst)
    }
}
