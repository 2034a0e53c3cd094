#![forbid(unsafe_code)]
//! Browser host for Dexcatch: `localStorage` persistence, `fetch` catalog
//! access, console logging, and the `DexSession` command bridge.
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
pub mod bridge;
pub mod catalog;
pub mod clock;
pub mod commands;
pub mod dom;
pub mod error;
pub mod logger;
pub mod storage;

pub use catalog::FetchCatalog;
pub use clock::JsClock;
pub use error::BridgeError;
pub use storage::BrowserStore;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    logger::init(log::LevelFilter::Info);
}
