//! Synthetic progress ticks for the loading screen. Puzzle generation gives
//! no real progress signal, so the ticker climbs steadily and parks below
//! 100 until the case lands.

use std::time::Duration;

use crate::{
    services::sse_events,
    state::{SharedState, machine::Screen},
};

/// Delay between ticks.
pub const TICK_INTERVAL: Duration = Duration::from_millis(120);
/// Percent added per tick.
const STEP: u8 = 7;
/// The ticker never reaches 100; completion is signalled by the screen
/// change, not by the progress value.
const CEILING: u8 = 95;

/// Next percentage after one tick. Monotone and capped at [`CEILING`].
pub fn next_percent(current: u8) -> u8 {
    current.saturating_add(STEP).min(CEILING)
}

/// Spawn a task that broadcasts progress while the loading screen is up.
/// Stops by itself as soon as the screen moves on.
pub fn spawn_loading_ticker(state: SharedState) {
    tokio::spawn(async move {
        let mut percent = 0;
        loop {
            tokio::time::sleep(TICK_INTERVAL).await;
            if state.current_screen().await != Screen::Loading {
                break;
            }
            percent = next_percent(percent);
            sse_events::broadcast_loading_progress(&state, percent);
        }
    });
}
