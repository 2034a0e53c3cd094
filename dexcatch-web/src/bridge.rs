//! `DexSession`: the JavaScript-facing command surface.
use std::cell::RefCell;
use std::rc::Rc;

use dexcatch_game::{BallKind, CollectionQuery, GameSession, RngRolls};
use rand_chacha::ChaCha20Rng;
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::catalog::FetchCatalog;
use crate::clock::JsClock;
use crate::commands::{self, Action, SharedSession};
use crate::dom;
use crate::error::{BridgeError, export_format, session_config};
use crate::storage::BrowserStore;

/// Pause between accepting an action and completing it.
const SETTLE_MS: i32 = 450;

type WebSession = GameSession<BrowserStore, RngRolls<ChaCha20Rng>, JsClock>;

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(JsValue::from)
}

fn entropy_seed() -> u64 {
    js_sys::Math::random().to_bits() ^ js_sys::Date::now().to_bits().rotate_left(29)
}

#[wasm_bindgen]
pub struct DexSession {
    session: SharedSession<BrowserStore, RngRolls<ChaCha20Rng>, JsClock>,
    catalog: Rc<FetchCatalog>,
    settle_ms: i32,
}

impl DexSession {
    fn perform(&self, action: Action) -> js_sys::Promise {
        let session = Rc::clone(&self.session);
        let catalog = Rc::clone(&self.catalog);
        let settle_ms = self.settle_ms;
        future_to_promise(async move {
            let report = commands::perform(&session, &*catalog, action, || async move {
                if let Err(err) = dom::sleep_ms(settle_ms).await {
                    log::warn!("settle timer failed: {}", dom::js_error_message(&err));
                }
            })
            .await;
            to_js(&report)
        })
    }
}

#[wasm_bindgen]
impl DexSession {
    /// Create a session. `config_json` overrides tuning values; `catalog_base`
    /// points at a catalog mirror.
    ///
    /// # Errors
    /// Returns an error if the configuration override is invalid.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>, catalog_base: Option<String>) -> Result<Self, JsValue> {
        let config = session_config(config_json.as_deref())?;
        let catalog = catalog_base
            .as_deref()
            .map_or_else(FetchCatalog::default, FetchCatalog::new);
        let store = BrowserStore::open();
        let session: WebSession = GameSession::new(
            config,
            store,
            RngRolls::seeded(entropy_seed()),
            JsClock,
        );
        Ok(Self {
            session: Rc::new(RefCell::new(session)),
            catalog: Rc::new(catalog),
            settle_ms: SETTLE_MS,
        })
    }

    /// Override the settle pause, e.g. `0` for automated tests.
    #[wasm_bindgen(js_name = setSettleMs)]
    pub fn set_settle_ms(&mut self, settle_ms: i32) {
        self.settle_ms = settle_ms.max(0);
    }

    /// Resolves to the new encounter, or `null` when a request is already out.
    #[wasm_bindgen(js_name = triggerEncounter)]
    pub fn trigger_encounter(&self) -> js_sys::Promise {
        let session = Rc::clone(&self.session);
        let catalog = Rc::clone(&self.catalog);
        future_to_promise(async move {
            let encounter = commands::trigger_encounter(&session, &*catalog).await;
            to_js(&encounter)
        })
    }

    /// Resolves to an action report once the capture settles.
    ///
    /// # Errors
    /// Returns an error for an unknown ball kind.
    #[wasm_bindgen(js_name = attemptCapture)]
    pub fn attempt_capture(&self, ball: &str) -> Result<js_sys::Promise, JsValue> {
        let ball: BallKind = ball.parse().map_err(BridgeError::from)?;
        Ok(self.perform(Action::Capture(ball)))
    }

    pub fn flee(&self) -> js_sys::Promise {
        self.perform(Action::Flee)
    }

    /// Run the resolver watchdog. Returns `true` when it reset a stuck action.
    #[wasm_bindgen(js_name = pollWatchdog)]
    pub fn poll_watchdog(&self) -> bool {
        self.session.borrow_mut().poll_watchdog()
    }

    /// # Errors
    /// Returns an error for an unknown format or a serialization failure.
    #[wasm_bindgen(js_name = exportCollection)]
    pub fn export_collection(&self, format: &str) -> Result<String, JsValue> {
        let format = export_format(format)?;
        let text = self
            .session
            .borrow()
            .export_collection(format)
            .map_err(BridgeError::from)?;
        Ok(text)
    }

    /// # Errors
    /// Returns the import error; the collection is left untouched.
    #[wasm_bindgen(js_name = importCollection)]
    pub fn import_collection(&self, text: &str) -> Result<JsValue, JsValue> {
        let summary = self
            .session
            .borrow_mut()
            .import_collection(text)
            .map_err(BridgeError::from)?;
        to_js(&summary)
    }

    /// # Errors
    /// Returns an error if the summary cannot be converted.
    #[wasm_bindgen(js_name = resetCollection)]
    pub fn reset_collection(&self) -> Result<JsValue, JsValue> {
        let summary = self.session.borrow_mut().reset_collection();
        to_js(&summary)
    }

    /// # Errors
    /// Returns an error if the stats cannot be converted.
    pub fn stats(&self) -> Result<JsValue, JsValue> {
        to_js(&self.session.borrow().stats())
    }

    /// Page through the collection. `query` is a partial `CollectionQuery`.
    ///
    /// # Errors
    /// Returns an error if `query` has the wrong shape.
    pub fn query(&self, query: JsValue) -> Result<JsValue, JsValue> {
        let query: CollectionQuery = if query.is_undefined() || query.is_null() {
            CollectionQuery::default()
        } else {
            serde_wasm_bindgen::from_value(query).map_err(JsValue::from)?
        };
        to_js(&self.session.borrow().query(&query))
    }

    /// Encounter, busy flag, and ball stock for rendering.
    ///
    /// # Errors
    /// Returns an error if the view cannot be converted.
    pub fn view(&self) -> Result<JsValue, JsValue> {
        to_js(&commands::view(&self.session))
    }

    /// # Errors
    /// Returns an error if the notices cannot be converted.
    #[wasm_bindgen(js_name = drainNotices)]
    pub fn drain_notices(&self) -> Result<JsValue, JsValue> {
        to_js(&commands::drain_notices(&self.session))
    }

    #[wasm_bindgen(js_name = isPersistent)]
    pub fn is_persistent(&self) -> bool {
        self.session.borrow().store().is_persistent()
    }
}
