//! Single-threaded cooperative scheduling loop.
//!
//! All listener state, deliveries and scripting calls live on the thread that
//! owns the [`RunLoop`]. Other threads reach it only through a [`LoopHandle`],
//! which carries `Send` messages over a channel.
//!
//! # Turn order
//!
//! ```text
//! turn():
//!   1. deferred tasks queued before this turn
//!   2. remote messages (wake-ups, stop)
//!   3. sources (per-turn hooks, e.g. draining producer inboxes)
//!   4. due timers
//! ```
//!
//! Work deferred during a turn always runs on the next turn, never inside the
//! current one.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::clock::{duration_to_ticks, Clock};
use crate::error::{ListenerError, Result};

/// Upper bound on how long [`RunLoop::run`] sleeps without a timer deadline.
const MAX_IDLE_WAIT: Duration = Duration::from_millis(100);

type LocalTask = Box<dyn FnOnce()>;

enum Message {
    Wake,
    Stop,
}

/// Identifies a timer installed with [`RunLoop::add_timer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// Identifies a source installed with [`RunLoop::add_source`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(u64);

struct Timer {
    id: TimerId,
    interval: u64,
    next_fire: u64,
    callback: Rc<dyn Fn()>,
}

struct Source {
    id: SourceId,
    callback: Rc<dyn Fn() -> bool>,
}

/// Thread-safe handle for reaching a [`RunLoop`] from other threads.
#[derive(Clone)]
pub struct LoopHandle {
    tx: Sender<Message>,
}

impl LoopHandle {
    /// Wake the loop so it runs a turn. Never blocks.
    pub fn wake(&self) {
        let _ = self.tx.send(Message::Wake);
    }

    /// Ask [`RunLoop::run`] to return after the current turn.
    pub fn stop(&self) {
        let _ = self.tx.send(Message::Stop);
    }
}

/// Cooperative scheduling loop driven by a [`Clock`].
pub struct RunLoop {
    clock: Arc<dyn Clock>,
    tx: Sender<Message>,
    rx: Receiver<Message>,
    deferred: RefCell<VecDeque<LocalTask>>,
    timers: RefCell<Vec<Timer>>,
    sources: RefCell<Vec<Source>>,
    next_id: Cell<u64>,
    stopped: Cell<bool>,
}

impl RunLoop {
    pub fn new(clock: Arc<dyn Clock>) -> Rc<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        Rc::new(Self {
            clock,
            tx,
            rx,
            deferred: RefCell::new(VecDeque::new()),
            timers: RefCell::new(Vec::new()),
            sources: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
            stopped: Cell::new(false),
        })
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn handle(&self) -> LoopHandle {
        LoopHandle {
            tx: self.tx.clone(),
        }
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    /// Queue a loop-local task for the next turn.
    pub fn defer(&self, task: impl FnOnce() + 'static) {
        self.deferred.borrow_mut().push_back(Box::new(task));
    }

    /// Install a repeating timer. The first fire is one interval from now.
    pub fn add_timer(&self, interval: Duration, callback: impl Fn() + 'static) -> Result<TimerId> {
        let interval = duration_to_ticks(self.clock.as_ref(), interval);
        if interval == 0 {
            return Err(ListenerError::ZeroInterval);
        }
        let id = TimerId(self.next_id());
        self.timers.borrow_mut().push(Timer {
            id,
            interval,
            next_fire: self.clock.now_ticks().saturating_add(interval),
            callback: Rc::new(callback),
        });
        Ok(id)
    }

    /// Remove a timer. After this returns the timer never fires again.
    pub fn remove_timer(&self, id: TimerId) {
        self.timers.borrow_mut().retain(|t| t.id != id);
    }

    /// Install a per-turn source. The callback returns `true` if it did work.
    pub fn add_source(&self, callback: impl Fn() -> bool + 'static) -> SourceId {
        let id = SourceId(self.next_id());
        self.sources.borrow_mut().push(Source {
            id,
            callback: Rc::new(callback),
        });
        id
    }

    pub fn remove_source(&self, id: SourceId) {
        self.sources.borrow_mut().retain(|s| s.id != id);
    }

    pub fn timer_count(&self) -> usize {
        self.timers.borrow().len()
    }

    pub fn source_count(&self) -> usize {
        self.sources.borrow().len()
    }

    /// Run one turn. Returns whether any work was done.
    pub fn turn(&self) -> bool {
        let mut worked = false;

        let deferred = std::mem::take(&mut *self.deferred.borrow_mut());
        for task in deferred {
            task();
            worked = true;
        }

        while let Ok(message) = self.rx.try_recv() {
            self.handle_message(message);
            worked = true;
        }

        let sources: Vec<(SourceId, Rc<dyn Fn() -> bool>)> = self
            .sources
            .borrow()
            .iter()
            .map(|s| (s.id, s.callback.clone()))
            .collect();
        for (id, callback) in sources {
            // A previous callback may have removed this source.
            if self.sources.borrow().iter().any(|s| s.id == id) {
                worked |= callback();
            }
        }

        for (id, callback) in self.take_due_timers() {
            if self.timers.borrow().iter().any(|t| t.id == id) {
                callback();
                worked = true;
            }
        }

        worked
    }

    /// Run turns until one does no work.
    pub fn run_until_idle(&self) {
        while self.turn() {}
    }

    /// Run until [`LoopHandle::stop`] is called, sleeping between turns until
    /// the next timer deadline or an incoming message.
    pub fn run(&self) {
        self.stopped.set(false);
        log::debug!("run loop started");
        loop {
            self.turn();
            if self.stopped.get() {
                break;
            }
            if !self.deferred.borrow().is_empty() {
                continue;
            }
            match self.rx.recv_timeout(self.idle_wait()) {
                Ok(message) => self.handle_message(message),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            if self.stopped.get() {
                break;
            }
        }
        log::debug!("run loop stopped");
    }

    fn handle_message(&self, message: Message) {
        match message {
            Message::Wake => {}
            Message::Stop => self.stopped.set(true),
        }
    }

    /// Collect due timers and schedule their next fire. Missed periods are
    /// skipped rather than replayed.
    fn take_due_timers(&self) -> Vec<(TimerId, Rc<dyn Fn()>)> {
        let now = self.clock.now_ticks();
        let mut due = Vec::new();
        for timer in self.timers.borrow_mut().iter_mut() {
            if timer.next_fire > now {
                continue;
            }
            timer.next_fire = timer.next_fire.saturating_add(timer.interval);
            if timer.next_fire <= now {
                timer.next_fire = now.saturating_add(timer.interval);
            }
            due.push((timer.id, timer.callback.clone()));
        }
        due
    }

    fn idle_wait(&self) -> Duration {
        let now = self.clock.now_ticks();
        let Some(deadline) = self.timers.borrow().iter().map(|t| t.next_fire).min() else {
            return MAX_IDLE_WAIT;
        };
        let ticks = deadline.saturating_sub(now) as f64;
        Duration::from_secs_f64(ticks / self.clock.ticks_per_second()).min(MAX_IDLE_WAIT)
    }
}
