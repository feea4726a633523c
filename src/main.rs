//! Claw Machine entry point
//!
//! Native builds run a scripted headless round and print what happened.
//! The browser build is driven through `platform::web::WebClawMachine`.

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use std::cell::RefCell;
    use std::rc::Rc;

    use claw_machine::engine::OutcomeHooks;
    use claw_machine::platform::{StdoutNotifier, init_logging};
    use claw_machine::sim::{ClawPhase, Control, MachineLayout};
    use claw_machine::{Catalog, ClawError, CollectionLedger, Engine, Settings};

    const CATALOG: &str = include_str!("../assets/catalog.json");
    const OWNER: &str = "demo";
    const FRAME_MS: u32 = 16;

    /// (horizontal hold, vertical hold) in frames, one per attempt
    const ATTEMPTS: [(u32, u32); 3] = [(4, 4), (8, 3), (2, 6)];

    fn frames(engine: &mut Engine, count: u32) {
        for _ in 0..count {
            engine.update(FRAME_MS);
        }
    }

    fn hold(engine: &mut Engine, control: Control, count: u32) {
        engine.press(control);
        frames(engine, count);
        engine.release(control);
        frames(engine, 1);
    }

    fn wait_for_idle(engine: &mut Engine) {
        for _ in 0..10_000 {
            if engine.state().is_some_and(|s| s.phase == ClawPhase::Idle) {
                return;
            }
            engine.update(FRAME_MS);
        }
        log::warn!("Machine did not return to idle");
    }

    pub fn run() -> Result<(), ClawError> {
        init_logging();

        let seed = std::env::args().nth(1);
        let catalog = Catalog::from_json(CATALOG)?;
        let ledger = Rc::new(RefCell::new(CollectionLedger::new()));

        let hooks = OutcomeHooks {
            on_success: Some(Box::new(|category: &str| println!("  caught a {category}"))),
            on_drop: Some(Box::new(|category: &str| println!("  the {category} slipped"))),
            on_cycle_end: Some(Box::new(|caught: bool| {
                println!("  cycle over ({})", if caught { "prize" } else { "empty" })
            })),
        };
        let mut engine = Engine::new(catalog, Settings::default())
            .with_sink(ledger.clone())
            .with_notifier(StdoutNotifier)
            .with_hooks(hooks);
        engine.set_seed(seed.as_deref());
        engine.set_owner(Some(OWNER));
        engine.set_layout(MachineLayout::standard());
        engine.set_visible(true);

        for (i, (across, down)) in ATTEMPTS.into_iter().enumerate() {
            println!("Attempt {}", i + 1);
            hold(&mut engine, Control::Horizontal, across);
            hold(&mut engine, Control::Vertical, down);
            wait_for_idle(&mut engine);
            engine.claim();
            frames(&mut engine, 1);
        }

        if let Some(summary) = engine.summary() {
            println!(
                "Seed {}: {} collected, {} slipped, {} cycles",
                summary.seed.as_deref().unwrap_or("random"),
                summary.collected,
                summary.slips,
                summary.cycles
            );
        }
        if let Some(collection) = ledger.borrow().collection(OWNER) {
            for (category, count) in collection {
                println!("  {category}: {count}");
            }
        }

        engine.dispose();
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    if let Err(e) = demo::run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is WebClawMachine, this is just to satisfy the compiler
}
