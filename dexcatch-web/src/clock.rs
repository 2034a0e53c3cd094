use dexcatch_game::Clock;
use dexcatch_game::numbers::millis_from_f64;

/// Wall clock backed by `Date.now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsClock;

impl Clock for JsClock {
    fn now_ms(&self) -> u64 {
        millis_from_f64(js_sys::Date::now())
    }
}
