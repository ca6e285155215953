//! Timing: script timers backed by a native timer thread
//!
//! Scripts schedule timers with `createTimer(callbackId, duration,
//! schedulingTime, repeats)`. A worker thread owns the deadlines and, when
//! timers expire, asks the runtime to run `JSTimersExecution.callTimers` with
//! the expired IDs. The worker is started when the bridge is attached and
//! stops when the module is dropped (its command channel disconnects).

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crossbeam::channel::{self, RecvTimeoutError, Sender};
use hostbridge_sdk::{json, Args, BridgeContext, MethodInfo, NativeError, NativeModule, NativeResult, Value};
use parking_lot::Mutex;

/// Script module that receives expired timers
pub const TIMERS_EXECUTION_MODULE: &str = "JSTimersExecution";

/// Interval between idle callbacks while idle events are enabled
const IDLE_FRAME: Duration = Duration::from_millis(16);

const CREATE_TIMER: usize = 0;
const DELETE_TIMER: usize = 1;
const SET_SEND_IDLE_EVENTS: usize = 2;

enum TimerCommand {
    Create {
        id: u64,
        delay: Duration,
        interval: Option<Duration>,
    },
    Delete(u64),
    SendIdleEvents(bool),
}

/// Native timer module.
pub struct Timing {
    worker: Mutex<Option<Sender<TimerCommand>>>,
}

impl Timing {
    /// Create the module; timers are accepted once the bridge is attached
    pub fn new() -> Self {
        Timing {
            worker: Mutex::new(None),
        }
    }

    fn send(&self, command: TimerCommand) -> NativeResult<()> {
        let worker = self.worker.lock();
        let sender = worker
            .as_ref()
            .ok_or_else(|| NativeError::ModuleError("timer used before bridge was attached".to_string()))?;
        sender
            .send(command)
            .map_err(|_| NativeError::ModuleError("timer thread has stopped".to_string()))
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeModule for Timing {
    fn name(&self) -> &str {
        "Timing"
    }

    fn methods(&self) -> Vec<MethodInfo> {
        vec![
            MethodInfo::method("createTimer"),
            MethodInfo::method("deleteTimer"),
            MethodInfo::method("setSendIdleEvents"),
        ]
    }

    fn set_bridge(&self, bridge: Arc<dyn BridgeContext>) {
        let (tx, rx) = channel::unbounded();
        let spawned = thread::Builder::new()
            .name("hostbridge-timing".to_string())
            .spawn(move || run_timers(rx, bridge));
        match spawned {
            Ok(_) => {
                // Replacing the sender stops the previous worker.
                *self.worker.lock() = Some(tx);
            }
            Err(e) => tracing::error!("Could not start timer thread: {}", e),
        }
    }

    fn call(&self, _ctx: &dyn BridgeContext, method: usize, args: Args<'_>) -> NativeResult<Value> {
        match method {
            CREATE_TIMER => {
                let id: u64 = args.get(0)?;
                let duration: f64 = args.get(1)?;
                let scheduled_at: f64 = args.opt(2)?.unwrap_or_else(now_millis);
                let repeats: bool = args.opt(3)?.unwrap_or(false);

                let duration = duration.max(0.0);
                // Time already spent between scheduling and the native call
                // counts against the delay.
                let remaining = (scheduled_at + duration - now_millis()).max(0.0);
                let interval = repeats.then(|| millis_to_duration(duration.max(1.0)));
                self.send(TimerCommand::Create {
                    id,
                    delay: millis_to_duration(remaining),
                    interval,
                })?;
            }
            DELETE_TIMER => {
                let id: u64 = args.get(0)?;
                self.send(TimerCommand::Delete(id))?;
            }
            SET_SEND_IDLE_EVENTS => {
                let enabled: bool = args.get(0)?;
                self.send(TimerCommand::SendIdleEvents(enabled))?;
            }
            other => return Err(NativeError::UnknownMethod(other)),
        }
        Ok(Value::Null)
    }
}

fn now_millis() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
        * 1000.0
}

/// Out-of-range delays saturate to `Duration::MAX`, which never fires.
fn millis_to_duration(millis: f64) -> Duration {
    Duration::try_from_secs_f64(millis / 1000.0).unwrap_or(Duration::MAX)
}

struct TimerEntry {
    seq: u64,
    interval: Option<Duration>,
}

fn run_timers(rx: channel::Receiver<TimerCommand>, bridge: Arc<dyn BridgeContext>) {
    let mut deadlines: BinaryHeap<Reverse<(Instant, u64, u64)>> = BinaryHeap::new();
    let mut timers: HashMap<u64, TimerEntry> = HashMap::new();
    let mut next_seq = 0u64;
    let mut idle_events = false;

    loop {
        let now = Instant::now();
        let mut wait = deadlines
            .peek()
            .map(|Reverse((at, _, _))| at.saturating_duration_since(now));
        if idle_events {
            wait = Some(wait.map_or(IDLE_FRAME, |w| w.min(IDLE_FRAME)));
        }

        let received = match wait {
            Some(timeout) => rx.recv_timeout(timeout),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(TimerCommand::Create { id, delay, interval }) => {
                next_seq += 1;
                timers.insert(id, TimerEntry { seq: next_seq, interval });
                // Unreachable deadlines stay registered so deleteTimer still works.
                match Instant::now().checked_add(delay) {
                    Some(at) => deadlines.push(Reverse((at, next_seq, id))),
                    None => tracing::debug!("Timer {} is too far in the future to fire", id),
                }
            }
            Ok(TimerCommand::Delete(id)) => {
                timers.remove(&id);
            }
            Ok(TimerCommand::SendIdleEvents(enabled)) => idle_events = enabled,
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if !bridge.is_current() {
            break;
        }

        let now = Instant::now();
        let mut expired = Vec::new();
        while let Some(Reverse((at, seq, id))) = deadlines.peek().copied() {
            if at > now {
                break;
            }
            deadlines.pop();
            let Some(entry) = timers.get(&id) else { continue };
            if entry.seq != seq {
                continue;
            }
            let interval = entry.interval;
            expired.push(id);
            match interval.and_then(|interval| now.checked_add(interval)) {
                Some(at) => deadlines.push(Reverse((at, seq, id))),
                None => {
                    timers.remove(&id);
                }
            }
        }

        if !expired.is_empty() {
            tracing::trace!("Firing timers {:?}", expired);
            bridge.enqueue_script_call(TIMERS_EXECUTION_MODULE, "callTimers", vec![json!(expired)]);
        } else if idle_events && deadlines.is_empty() {
            bridge.enqueue_script_call(
                TIMERS_EXECUTION_MODULE,
                "callIdleCallbacks",
                vec![json!(now_millis())],
            );
        }
    }
    tracing::debug!("Timer thread stopped");
}
