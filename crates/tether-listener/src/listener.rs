//! Coalescing, rate-limited event listener.
//!
//! [`EventListener`] decouples host notification threads from the run loop:
//!
//! ```text
//! host thread                 run loop thread
//! -----------                 ---------------
//! raw callback
//!   stamp now_ticks()
//!   inbox.send(arrival) ---->  inbox source: append to matching queues
//!   wake loop                  flush timer:  one coalesced run per queue
//!                                            defer delivery
//!                              next turn:    callback(Delivery)
//! ```
//!
//! Queues are touched only on the run loop thread, so no lock guards them.
//! The raw callback captures nothing but a channel sender, a clock and a loop
//! handle.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use tether_core::{AuEvent, EventSource, ListenerConfig, RawEventCallback, RegistrationId};

use crate::clock::{seconds_to_ticks, Clock};
use crate::coalesce::take_coalesced_run;
use crate::error::{ListenerError, Result};
use crate::run_loop::{LoopHandle, RunLoop, SourceId, TimerId};

/// One coalesced notification handed to the listener callback.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery<T> {
    /// Token supplied to [`EventListener::start_listening`].
    pub subscriber: T,
    pub event: AuEvent,
    /// Arrival tick of the last notification in the coalesced run.
    pub timestamp: u64,
    /// Always `0.0`: raw notifications do not carry the changed value.
    pub value: f32,
}

/// Notification stamped on the producer thread.
#[derive(Debug, Clone, Copy)]
struct Arrival {
    event: AuEvent,
    timestamp: u64,
}

struct Watched<T> {
    subscriber: T,
    event: AuEvent,
    pending: VecDeque<u64>,
}

struct State<T> {
    watched: Vec<Watched<T>>,
    /// One host registration per distinct event.
    registrations: Vec<(AuEvent, RegistrationId)>,
    disposed: bool,
}

/// Loop-side half, reachable weakly from the flush timer, the inbox source
/// and deferred deliveries.
struct Shared<T> {
    state: RefCell<State<T>>,
    callback: RefCell<Box<dyn FnMut(Delivery<T>)>>,
    inbox: Receiver<Arrival>,
    granularity: u64,
    run_loop: Rc<RunLoop>,
}

impl<T: Clone + 'static> Shared<T> {
    /// Append queued arrivals to every watcher of the same event.
    fn drain_inbox(&self) -> bool {
        let mut state = self.state.borrow_mut();
        let mut worked = false;
        for arrival in self.inbox.try_iter() {
            worked = true;
            if state.disposed {
                continue;
            }
            for watched in state.watched.iter_mut().filter(|w| w.event == arrival.event) {
                watched.pending.push_back(arrival.timestamp);
            }
        }
        worked
    }

    fn flush(self: &Rc<Self>) {
        let deliveries: Vec<Delivery<T>> = {
            let mut state = self.state.borrow_mut();
            if state.disposed {
                return;
            }
            let granularity = self.granularity;
            state
                .watched
                .iter_mut()
                .filter_map(|watched| {
                    let timestamp = take_coalesced_run(&mut watched.pending, granularity)?;
                    Some(Delivery {
                        subscriber: watched.subscriber.clone(),
                        event: watched.event,
                        timestamp,
                        value: 0.0,
                    })
                })
                .collect()
        };

        for delivery in deliveries {
            let weak = Rc::downgrade(self);
            self.run_loop.defer(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.deliver(delivery);
                }
            });
        }
    }

    fn deliver(&self, delivery: Delivery<T>) {
        if self.state.borrow().disposed {
            return;
        }
        match self.callback.try_borrow_mut() {
            Ok(mut callback) => callback(delivery),
            Err(_) => log::warn!("dropping reentrant delivery for {:?}", delivery.event),
        }
    }
}

/// Watches host events and delivers coalesced notifications on a run loop.
pub struct EventListener<T: Clone + PartialEq + 'static> {
    shared: Rc<Shared<T>>,
    source: Arc<dyn EventSource>,
    clock: Arc<dyn Clock>,
    inbox_tx: Sender<Arrival>,
    loop_handle: LoopHandle,
    timer: Cell<Option<TimerId>>,
    inbox_source: Cell<Option<SourceId>>,
}

impl<T: Clone + PartialEq + 'static> EventListener<T> {
    /// Create a listener delivering to `callback` on `run_loop`.
    ///
    /// `config.granularity` is converted into ticks of `clock`, and a flush
    /// timer repeating every `config.delivery_interval` is installed on
    /// `run_loop`.
    pub fn new(
        run_loop: Rc<RunLoop>,
        source: Arc<dyn EventSource>,
        clock: Arc<dyn Clock>,
        config: ListenerConfig,
        callback: impl FnMut(Delivery<T>) + 'static,
    ) -> Result<Self> {
        config.validate()?;
        let granularity = seconds_to_ticks(config.granularity, clock.ticks_per_second());

        let (inbox_tx, inbox) = crossbeam_channel::unbounded();
        let shared = Rc::new(Shared {
            state: RefCell::new(State {
                watched: Vec::new(),
                registrations: Vec::new(),
                disposed: false,
            }),
            callback: RefCell::new(Box::new(callback)),
            inbox,
            granularity,
            run_loop: run_loop.clone(),
        });

        let weak: Weak<Shared<T>> = Rc::downgrade(&shared);
        let timer = run_loop.add_timer(Duration::from_secs_f64(config.delivery_interval), move || {
            if let Some(shared) = weak.upgrade() {
                shared.flush();
            }
        })?;

        let weak: Weak<Shared<T>> = Rc::downgrade(&shared);
        let inbox_source = run_loop.add_source(move || {
            weak.upgrade().is_some_and(|shared| shared.drain_inbox())
        });

        log::debug!(
            "event listener created: interval {}s, granularity {}s ({granularity} ticks)",
            config.delivery_interval,
            config.granularity,
        );

        Ok(Self {
            shared,
            source,
            clock,
            inbox_tx,
            loop_handle: run_loop.handle(),
            timer: Cell::new(Some(timer)),
            inbox_source: Cell::new(Some(inbox_source)),
        })
    }

    /// Watch `event` on behalf of `subscriber`.
    ///
    /// Registering the same `(subscriber, event)` pair again is a no-op. The
    /// same event under a different subscriber adds a second watcher that
    /// receives its own deliveries; both share one host registration.
    pub fn start_listening(&self, subscriber: T, event: AuEvent) -> Result<()> {
        let mut state = self.shared.state.borrow_mut();
        if state.disposed {
            return Err(ListenerError::Disposed);
        }
        if state
            .watched
            .iter()
            .any(|w| w.event == event && w.subscriber == subscriber)
        {
            log::debug!("already watching {event:?} for this subscriber");
            return Ok(());
        }

        if !state.registrations.iter().any(|(e, _)| *e == event) {
            let registration = self.source.add_listener(event, self.raw_callback())?;
            state.registrations.push((event, registration));
        }

        state.watched.push(Watched {
            subscriber,
            event,
            pending: VecDeque::new(),
        });
        log::debug!("watching {event:?}");
        Ok(())
    }

    /// Stop watching `event` for every subscriber and release its host
    /// registration. Pending notifications for it are discarded.
    pub fn stop_listening(&self, event: AuEvent) {
        let mut state = self.shared.state.borrow_mut();
        state.watched.retain(|w| w.event != event);
        if let Some(pos) = state.registrations.iter().position(|(e, _)| *e == event) {
            let (_, registration) = state.registrations.remove(pos);
            self.source.remove_listener(registration);
        }
    }

    /// Remove the flush timer and every host registration.
    ///
    /// No delivery happens after this returns, including deliveries already
    /// deferred on the run loop. Calling it again is a no-op.
    pub fn dispose(&self) {
        let registrations = {
            let mut state = self.shared.state.borrow_mut();
            if state.disposed {
                return;
            }
            state.disposed = true;
            state.watched.clear();
            std::mem::take(&mut state.registrations)
        };

        if let Some(timer) = self.timer.take() {
            self.shared.run_loop.remove_timer(timer);
        }
        if let Some(source) = self.inbox_source.take() {
            self.shared.run_loop.remove_source(source);
        }
        for (_, registration) in registrations {
            self.source.remove_listener(registration);
        }
        // Arrivals sent before the host registrations went away.
        while self.shared.inbox.try_recv().is_ok() {}

        log::debug!("event listener disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.state.borrow().disposed
    }

    /// Number of watchers (subscriber and event pairs).
    pub fn watched_count(&self) -> usize {
        self.shared.state.borrow().watched.len()
    }

    /// Number of distinct events registered with the host.
    pub fn registration_count(&self) -> usize {
        self.shared.state.borrow().registrations.len()
    }

    /// Queued, not yet flushed timestamps across all watchers of `event`.
    pub fn pending_count(&self, event: AuEvent) -> usize {
        self.shared
            .state
            .borrow()
            .watched
            .iter()
            .filter(|w| w.event == event)
            .map(|w| w.pending.len())
            .sum()
    }

    /// The granularity window in clock ticks.
    pub fn granularity_ticks(&self) -> u64 {
        self.shared.granularity
    }

    /// Raw callback handed to the host. Runs on arbitrary threads.
    fn raw_callback(&self) -> RawEventCallback {
        let inbox = self.inbox_tx.clone();
        let clock = self.clock.clone();
        let loop_handle = self.loop_handle.clone();
        Arc::new(move |event: &AuEvent| {
            let arrival = Arrival {
                event: *event,
                timestamp: clock.now_ticks(),
            };
            if inbox.send(arrival).is_ok() {
                loop_handle.wake();
            }
        })
    }
}

impl<T: Clone + PartialEq + 'static> Drop for EventListener<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}
