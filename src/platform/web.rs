//! Browser bindings
//!
//! `WebClawMachine` wraps an `Engine` for the page script. The page measures
//! the widget, forwards visibility, button and key events, and calls
//! `update` from its animation frame loop; it renders from `snapshot_json`.

use wasm_bindgen::prelude::*;

use crate::catalog::Catalog;
use crate::engine::{CollectionNotifier, Engine, OutcomeHooks};
use crate::ledger::CollectionLedger;
use crate::settings::Settings;
use crate::sim::{Control, MachineLayout, Rect};

/// Posts `{"type": "claw-machine:collected", "category": ...}` to the parent frame
#[derive(Debug, Default, Clone, Copy)]
pub struct ParentFrameNotifier;

impl CollectionNotifier for ParentFrameNotifier {
    fn collected(&self, category: &str) {
        let Some(parent) = web_sys::window().and_then(|w| w.parent().ok().flatten()) else {
            log::debug!("No parent frame to notify");
            return;
        };
        let message = serde_json::json!({
            "type": "claw-machine:collected",
            "category": category,
        });
        if let Err(e) = parent.post_message(&JsValue::from_str(&message.to_string()), "*") {
            log::debug!("Parent frame notification failed: {:?}", e);
        }
    }
}

fn call_hook(hook: &js_sys::Function, arg: JsValue) {
    if let Err(e) = hook.call1(&JsValue::NULL, &arg) {
        log::warn!("Outcome hook threw: {:?}", e);
    }
}

#[wasm_bindgen]
pub struct WebClawMachine {
    engine: Engine,
}

#[wasm_bindgen]
impl WebClawMachine {
    #[wasm_bindgen(constructor)]
    pub fn new(catalog_json: &str, seed: Option<String>) -> Result<WebClawMachine, JsValue> {
        super::init_logging();

        let catalog =
            Catalog::from_json(catalog_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        let mut engine = Engine::new(catalog, Settings::load())
            .with_sink(CollectionLedger::load())
            .with_notifier(ParentFrameNotifier);
        engine.set_seed(seed.as_deref());
        log::info!("Claw machine created (seed: {})", seed.as_deref().unwrap_or("random"));
        Ok(Self { engine })
    }

    /// Optional JS callbacks: success(category), drop(category), cycleEnd(caught)
    #[wasm_bindgen(js_name = setHooks)]
    pub fn set_hooks(
        &mut self,
        on_success: Option<js_sys::Function>,
        on_drop: Option<js_sys::Function>,
        on_cycle_end: Option<js_sys::Function>,
    ) {
        let hooks = OutcomeHooks {
            on_success: on_success.map(|f| {
                Box::new(move |category: &str| call_hook(&f, JsValue::from_str(category)))
                    as Box<dyn FnMut(&str)>
            }),
            on_drop: on_drop.map(|f| {
                Box::new(move |category: &str| call_hook(&f, JsValue::from_str(category)))
                    as Box<dyn FnMut(&str)>
            }),
            on_cycle_end: on_cycle_end.map(|f| {
                Box::new(move |caught: bool| call_hook(&f, JsValue::from_bool(caught)))
                    as Box<dyn FnMut(bool)>
            }),
        };
        self.engine.set_hooks(hooks);
    }

    /// Widget measurements in CSS pixels
    #[allow(clippy::too_many_arguments)]
    #[wasm_bindgen(js_name = setLayout)]
    pub fn set_layout(
        &mut self,
        width: f32,
        height: f32,
        top_height: f32,
        chute_x: f32,
        chute_y: f32,
        chute_w: f32,
        chute_h: f32,
    ) {
        self.engine.set_layout(MachineLayout {
            width,
            height,
            top_height,
            chute: Rect::from_xywh(chute_x, chute_y, chute_w, chute_h),
        });
    }

    #[wasm_bindgen(js_name = setVisible)]
    pub fn set_visible(&mut self, visible: bool) {
        self.engine.set_visible(visible);
    }

    #[wasm_bindgen(js_name = setSeed)]
    pub fn set_seed(&mut self, seed: Option<String>) {
        self.engine.set_seed(seed.as_deref());
    }

    #[wasm_bindgen(js_name = setPlayable)]
    pub fn set_playable(&mut self, playable: bool) {
        self.engine.set_playable(playable);
    }

    /// Difficulty lever; the tuned settings are persisted for the next visit
    #[wasm_bindgen(js_name = tuneSlipProbability)]
    pub fn tune_slip_probability(&mut self, p: f32) -> f32 {
        let applied = self.engine.tune_slip_probability(p);
        if let Err(e) = self.engine.settings().save() {
            log::warn!("Could not persist settings: {}", e);
        }
        applied
    }

    #[wasm_bindgen(js_name = setOwner)]
    pub fn set_owner(&mut self, owner: Option<String>) {
        self.engine.set_owner(owner.as_deref());
    }

    /// On-screen button: "horizontal" or "vertical"
    #[wasm_bindgen(js_name = buttonDown)]
    pub fn button_down(&mut self, name: &str) {
        if let Some(control) = button(name) {
            self.engine.press(control);
        }
    }

    #[wasm_bindgen(js_name = buttonUp)]
    pub fn button_up(&mut self, name: &str) {
        if let Some(control) = button(name) {
            self.engine.release(control);
        }
    }

    /// Returns true if the key was consumed
    #[wasm_bindgen(js_name = keyDown)]
    pub fn key_down(&mut self, key: &str) -> bool {
        self.engine.key_down(key)
    }

    #[wasm_bindgen(js_name = keyUp)]
    pub fn key_up(&mut self, key: &str) -> bool {
        self.engine.key_up(key)
    }

    pub fn claim(&mut self) {
        self.engine.claim();
    }

    /// Frame delta from requestAnimationFrame, in milliseconds
    pub fn update(&mut self, dt_ms: f64) {
        self.engine.update(dt_ms.clamp(0.0, u32::MAX as f64) as u32);
    }

    #[wasm_bindgen(js_name = snapshotJson)]
    pub fn snapshot_json(&self) -> Option<String> {
        let snapshot = self.engine.snapshot()?;
        serde_json::to_string(&snapshot)
            .map_err(|e| log::warn!("Snapshot serialization failed: {}", e))
            .ok()
    }

    #[wasm_bindgen(js_name = summaryJson)]
    pub fn summary_json(&self) -> Option<String> {
        let summary = self.engine.summary()?;
        serde_json::to_string(&summary).ok()
    }

    pub fn dispose(&mut self) {
        self.engine.dispose();
    }
}

fn button(name: &str) -> Option<Control> {
    match name {
        "horizontal" => Some(Control::Horizontal),
        "vertical" => Some(Control::Vertical),
        _ => {
            log::warn!("Unknown button: {}", name);
            None
        }
    }
}
