//! Daily trigger loop.
//!
//! The loop is a three-state machine (`Idle`, `Waiting`, `Running`) driven by
//! timer and run-completion events. A new run can only begin from `Waiting`,
//! and `Running` only leaves on `RunCompleted`, so at most one run is ever in
//! flight. Time comes from a [`Clock`], which tests replace with a manual one.

use std::fmt::Display;
use std::future::Future;

use chrono::{DateTime, Local, NaiveTime, Utc};
use tracing::{error, info, warn};

/// Fires once a day at a fixed UTC wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTrigger {
    at: NaiveTime,
}

impl DailyTrigger {
    pub fn new(at: NaiveTime) -> Self {
        Self { at }
    }

    /// Parse `HH:MM` (24h, UTC).
    pub fn parse(s: &str) -> Result<Self, chrono::ParseError> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M").map(Self::new)
    }

    /// Today's trigger instant, or tomorrow's once `now` has reached it.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive().and_time(self.at).and_utc();
        if now >= today {
            today + chrono::Duration::days(1)
        } else {
            today
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Waiting { until: DateTime<Utc> },
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Start { now: DateTime<Utc> },
    TimerFired { now: DateTime<Utc> },
    RunCompleted { now: DateTime<Utc> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SleepUntil(DateTime<Utc>),
    BeginRun,
    Ignore,
}

pub fn transition(state: State, event: Event, trigger: &DailyTrigger) -> (State, Action) {
    match (state, event) {
        (State::Idle, Event::Start { now }) | (State::Running, Event::RunCompleted { now }) => {
            let until = trigger.next_after(now);
            (State::Waiting { until }, Action::SleepUntil(until))
        }
        (State::Waiting { until }, Event::TimerFired { now }) if now >= until => {
            (State::Running, Action::BeginRun)
        }
        // woke early
        (State::Waiting { until }, Event::TimerFired { .. }) => {
            (State::Waiting { until }, Action::SleepUntil(until))
        }
        (state, _) => (state, Action::Ignore),
    }
}

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
    fn sleep_until(&self, until: DateTime<Utc>) -> impl Future<Output = ()> + Send;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep_until(&self, until: DateTime<Utc>) {
        let delay = (until - Utc::now()).to_std().unwrap_or_default();
        tokio::time::sleep(delay).await;
    }
}

pub struct Scheduler<C> {
    clock: C,
    trigger: DailyTrigger,
    state: State,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(clock: C, trigger: DailyTrigger) -> Self {
        Self {
            clock,
            trigger,
            state: State::Idle,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    fn apply(&mut self, event: Event) -> Action {
        let (next, action) = transition(self.state, event, &self.trigger);
        self.state = next;
        action
    }

    /// Run `job` at every trigger. Failures are logged and the next day is
    /// scheduled as usual. Returns only after `limit` runs, if given.
    pub async fn run<F, Fut, T, E>(&mut self, mut job: F, limit: Option<usize>)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut runs = 0usize;
        let mut action = self.apply(Event::Start {
            now: self.clock.now(),
        });

        loop {
            match action {
                Action::SleepUntil(until) => {
                    info!(
                        utc = %until.format("%Y-%m-%d %H:%M:%S UTC"),
                        local = %until.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S %Z"),
                        "next run scheduled"
                    );
                    self.clock.sleep_until(until).await;
                    action = self.apply(Event::TimerFired {
                        now: self.clock.now(),
                    });
                }
                Action::BeginRun => {
                    info!(at = %self.clock.now(), "starting scheduled run");
                    match job().await {
                        Ok(_) => info!("run completed, scheduling next run"),
                        Err(e) => error!(error = %e, "run failed, scheduling next run anyway"),
                    }
                    runs += 1;
                    if limit.is_some_and(|l| runs >= l) {
                        return;
                    }
                    action = self.apply(Event::RunCompleted {
                        now: self.clock.now(),
                    });
                }
                Action::Ignore => {
                    warn!(state = ?self.state(), "scheduler event ignored, restarting from idle");
                    self.state = State::Idle;
                    action = self.apply(Event::Start {
                        now: self.clock.now(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::{Arc, Mutex};

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, d, h, m, 0).unwrap()
    }

    fn trigger() -> DailyTrigger {
        DailyTrigger::parse("21:37").unwrap()
    }

    #[test]
    fn next_after_same_day_or_tomorrow() {
        let t = trigger();
        assert_eq!(t.next_after(at(18, 9, 0)), at(18, 21, 37));
        assert_eq!(t.next_after(at(18, 21, 37)), at(19, 21, 37));
        assert_eq!(t.next_after(at(18, 23, 59)), at(19, 21, 37));
    }

    #[test]
    fn next_after_crosses_month_end() {
        let t = trigger();
        assert_eq!(t.next_after(at(31, 22, 0)), Utc.with_ymd_and_hms(2026, 11, 1, 21, 37, 0).unwrap());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(DailyTrigger::parse("25:00").is_err());
        assert!(DailyTrigger::parse("noon").is_err());
        assert!(DailyTrigger::parse(" 06:05 ").is_ok());
    }

    #[test]
    fn start_waits_for_trigger() {
        let (state, action) = transition(State::Idle, Event::Start { now: at(18, 9, 0) }, &trigger());
        assert_eq!(state, State::Waiting { until: at(18, 21, 37) });
        assert_eq!(action, Action::SleepUntil(at(18, 21, 37)));
    }

    #[test]
    fn early_wake_keeps_waiting() {
        let waiting = State::Waiting { until: at(18, 21, 37) };
        let (state, action) = transition(waiting, Event::TimerFired { now: at(18, 21, 36) }, &trigger());
        assert_eq!(state, waiting);
        assert_eq!(action, Action::SleepUntil(at(18, 21, 37)));
    }

    #[test]
    fn timer_starts_run() {
        let waiting = State::Waiting { until: at(18, 21, 37) };
        let (state, action) = transition(waiting, Event::TimerFired { now: at(18, 21, 37) }, &trigger());
        assert_eq!(state, State::Running);
        assert_eq!(action, Action::BeginRun);
    }

    #[test]
    fn no_second_run_while_running() {
        for event in [
            Event::TimerFired { now: at(19, 21, 37) },
            Event::Start { now: at(19, 21, 37) },
        ] {
            let (state, action) = transition(State::Running, event, &trigger());
            assert_eq!(state, State::Running);
            assert_eq!(action, Action::Ignore);
        }
    }

    #[test]
    fn completion_schedules_next_day() {
        let (state, action) =
            transition(State::Running, Event::RunCompleted { now: at(18, 21, 40) }, &trigger());
        assert_eq!(state, State::Waiting { until: at(19, 21, 37) });
        assert_eq!(action, Action::SleepUntil(at(19, 21, 37)));
    }

    #[test]
    fn stray_completion_is_ignored() {
        let (state, action) = transition(State::Idle, Event::RunCompleted { now: at(18, 0, 0) }, &trigger());
        assert_eq!((state, action), (State::Idle, Action::Ignore));
    }

    #[derive(Clone)]
    struct ManualClock {
        now: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        fn advance(&self, by: chrono::Duration) {
            let mut now = self.now.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }

        async fn sleep_until(&self, until: DateTime<Utc>) {
            let mut now = self.now.lock().unwrap();
            if until > *now {
                *now = until;
            }
        }
    }

    #[tokio::test]
    async fn runs_daily_and_survives_failures() {
        let clock = ManualClock {
            now: Arc::new(Mutex::new(at(18, 10, 0))),
        };
        let starts: Arc<Mutex<Vec<DateTime<Utc>>>> = Arc::default();
        let mut scheduler = Scheduler::new(clock.clone(), trigger());

        let job = {
            let clock = clock.clone();
            let starts = Arc::clone(&starts);
            move || {
                let clock = clock.clone();
                let starts = Arc::clone(&starts);
                async move {
                    let n = {
                        let mut s = starts.lock().unwrap();
                        s.push(clock.now());
                        s.len()
                    };
                    // each run takes a few minutes
                    clock.advance(chrono::Duration::minutes(3));
                    if n == 2 {
                        Err("page fetch failed")
                    } else {
                        Ok(())
                    }
                }
            }
        };

        scheduler.run(job, Some(3)).await;

        assert_eq!(
            *starts.lock().unwrap(),
            vec![at(18, 21, 37), at(19, 21, 37), at(20, 21, 37)]
        );
        assert_eq!(scheduler.state(), State::Running);
    }
}
