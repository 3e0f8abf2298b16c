use crossterm::event::Event as CEvent;

/// Events delivered to the UI loop from local sources.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Raw terminal input.
    Input(CEvent),
    /// Periodic redraw, drives the spinner.
    Tick,
    /// One reveal step for the given timer generation.
    RevealTick(u64),
}
