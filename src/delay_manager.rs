use std::thread;
use std::time::Duration;
use log::debug;

/// Blocks for a fixed wait after a navigation so the page can settle.
pub fn settle_delay(delay: Duration) {
    if delay.is_zero() {
        return;
    }
    debug!("Waiting for {} ms (Settle Delay)...", delay.as_millis());
    thread::sleep(delay);
}

/// Blocks between scroll steps.
pub fn scroll_pause(pause: Duration) {
    if pause.is_zero() {
        return;
    }
    thread::sleep(pause);
}
