// src/typewriter.rs

use crate::events::AppEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

/// Reveals a target string one character per tick.
///
/// `displayed()` is always a prefix of `target()` and only ever grows until
/// the two are equal or a new target is started.
#[derive(Debug, Clone, Default)]
pub struct Typewriter {
    target: String,
    // Byte offset of the revealed prefix, always on a char boundary.
    cursor: usize,
}

impl Typewriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins revealing `target` from an empty display.
    ///
    /// Any reveal in progress is abandoned. An empty target is ignored and
    /// `false` is returned.
    pub fn start(&mut self, target: impl Into<String>) -> bool {
        let target = target.into();
        if target.is_empty() {
            return false;
        }
        self.target = target;
        self.cursor = 0;
        true
    }

    /// Reveals the next character. Returns `false` once nothing is left.
    pub fn tick(&mut self) -> bool {
        match self.target[self.cursor..].chars().next() {
            Some(c) => {
                self.cursor += c.len_utf8();
                true
            }
            None => false,
        }
    }

    pub fn displayed(&self) -> &str {
        &self.target[..self.cursor]
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn is_active(&self) -> bool {
        !self.target.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.is_active() && self.cursor == self.target.len()
    }

    pub fn clear(&mut self) {
        self.target.clear();
        self.cursor = 0;
    }
}

/// Cancellable periodic task that feeds `AppEvent::RevealTick` into the UI
/// loop.
///
/// Every restart bumps the generation; ticks stamped with an older
/// generation must be ignored by the receiver. Dropping the timer aborts the
/// task.
#[derive(Debug, Default)]
pub struct RevealTimer {
    handle: Option<JoinHandle<()>>,
    generation: u64,
}

impl RevealTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels any running reveal and starts a fresh one. Must be called from
    /// within a tokio runtime.
    pub fn restart(&mut self, period: Duration, sink: mpsc::UnboundedSender<AppEvent>) -> u64 {
        self.cancel();
        self.generation = self.generation.wrapping_add(1);
        let generation = self.generation;

        let handle = tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                if sink.send(AppEvent::RevealTick(generation)).is_err() {
                    break;
                }
            }
        });
        self.handle = Some(handle);
        generation
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.handle.is_some() && self.generation == generation
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for RevealTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_to_end(tw: &mut Typewriter) -> Vec<String> {
        let mut frames = Vec::new();
        while tw.tick() {
            frames.push(tw.displayed().to_string());
        }
        frames
    }

    #[test]
    fn test_reveals_one_char_per_tick() {
        let mut tw = Typewriter::new();
        assert!(tw.start("hi there"));
        assert_eq!(tw.displayed(), "");

        let frames = run_to_end(&mut tw);
        assert_eq!(frames.first().map(String::as_str), Some("h"));
        assert_eq!(frames.get(1).map(String::as_str), Some("hi"));
        assert_eq!(frames.len(), "hi there".len());
        assert_eq!(tw.displayed(), "hi there");
        assert!(tw.is_complete());
    }

    #[test]
    fn test_display_is_always_prefix_of_target() {
        for target in ["a", "hello world", "naïve café", "日本語テキスト", "🙂 ok"] {
            let mut tw = Typewriter::new();
            tw.start(target);
            let mut ticks = 0;
            while tw.tick() {
                ticks += 1;
                assert!(target.starts_with(tw.displayed()));
            }
            assert_eq!(ticks, target.chars().count());
            assert_eq!(tw.displayed(), target);
        }
    }

    #[test]
    fn test_empty_target_is_noop() {
        let mut tw = Typewriter::new();
        assert!(!tw.start(""));
        assert!(!tw.is_active());
        assert!(!tw.tick());

        tw.start("abc");
        tw.tick();
        assert!(!tw.start(""));
        assert_eq!(tw.target(), "abc");
        assert_eq!(tw.displayed(), "a");
    }

    #[test]
    fn test_retarget_restarts_from_empty() {
        let mut tw = Typewriter::new();
        tw.start("first reply");
        tw.tick();
        tw.tick();
        tw.tick();
        assert_eq!(tw.displayed(), "fir");

        tw.start("second");
        assert_eq!(tw.displayed(), "");
        tw.tick();
        assert_eq!(tw.displayed(), "s");
        run_to_end(&mut tw);
        assert_eq!(tw.displayed(), "second");
    }

    #[test]
    fn test_tick_past_end_is_stable() {
        let mut tw = Typewriter::new();
        tw.start("ab");
        run_to_end(&mut tw);
        assert!(!tw.tick());
        assert_eq!(tw.displayed(), "ab");
        tw.clear();
        assert!(!tw.is_complete());
        assert_eq!(tw.displayed(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_emits_ticks_with_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = RevealTimer::new();
        let generation = timer.restart(Duration::from_millis(30), tx);

        for _ in 0..3 {
            match rx.recv().await {
                Some(AppEvent::RevealTick(g)) => assert_eq!(g, generation),
                other => panic!("unexpected event: {:?}", other),
            }
        }
        assert!(timer.is_current(generation));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_supersedes_previous_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = RevealTimer::new();
        let first = timer.restart(Duration::from_millis(30), tx.clone());
        let second = timer.restart(Duration::from_millis(30), tx);
        assert_ne!(first, second);
        assert!(!timer.is_current(first));

        for _ in 0..3 {
            match rx.recv().await {
                Some(AppEvent::RevealTick(g)) => assert_eq!(g, second),
                other => panic!("unexpected event: {:?}", other),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = RevealTimer::new();
        let generation = timer.restart(Duration::from_millis(30), tx);
        timer.cancel();
        assert!(!timer.is_current(generation));
        assert!(!timer.is_running());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_ticks() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        {
            let mut timer = RevealTimer::new();
            timer.restart(Duration::from_millis(30), tx);
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
        // The aborted task drops its sender, closing the channel.
        assert!(rx.recv().await.is_none());
    }
}
