//! Round lifecycle around the simulation
//!
//! The engine owns at most one `GameState`. It defers building it until the
//! widget is visible and its layout measures, feeds player input into fixed
//! timesteps, and hands round outcomes to the host collaborators
//! (persistence sink, cross-frame notifier, outcome hooks).

use serde::Serialize;

use crate::catalog::Catalog;
use crate::ledger::{CollectionLedger, PersistenceSink};
use crate::settings::Settings;
use crate::sim::{
    Control, ControlEdge, GameState, MachineGeometry, MachineLayout, RoundEvent, RoundSnapshot,
    TickInput, tick,
};

/// Best-effort broadcast of collected prizes to whatever embeds the widget
pub trait CollectionNotifier {
    fn collected(&self, category: &str);
}

/// Notifier for hosts with nobody listening
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl CollectionNotifier for LogNotifier {
    fn collected(&self, category: &str) {
        log::debug!("Collected {} (no listener)", category);
    }
}

/// Optional synchronous outcome callbacks
#[derive(Default)]
pub struct OutcomeHooks {
    /// A prize made it into the chute
    pub on_success: Option<Box<dyn FnMut(&str)>>,
    /// A prize slipped out of the claw
    pub on_drop: Option<Box<dyn FnMut(&str)>>,
    /// One full actuator cycle ended; true if something was caught
    pub on_cycle_end: Option<Box<dyn FnMut(bool)>>,
}

/// Per-round totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundSummary {
    pub seed: Option<String>,
    pub collected: u32,
    pub slips: u32,
    pub cycles: u32,
}

pub struct Engine {
    catalog: Catalog,
    settings: Settings,
    seed: Option<String>,
    /// Controls accept input
    playable: bool,
    owner: Option<String>,
    visible: bool,
    layout: Option<MachineLayout>,
    state: Option<GameState>,
    /// Input gathered since the last tick
    input: TickInput,
    accumulator_ms: u32,
    sink: Box<dyn PersistenceSink>,
    notifier: Box<dyn CollectionNotifier>,
    hooks: OutcomeHooks,
}

impl Engine {
    pub fn new(catalog: Catalog, settings: Settings) -> Self {
        let settings = match settings.validate() {
            Ok(()) => settings,
            Err(e) => {
                log::warn!("{}, using defaults", e);
                Settings::default()
            }
        };
        Self {
            catalog,
            settings,
            seed: None,
            playable: true,
            owner: None,
            visible: false,
            layout: None,
            state: None,
            input: TickInput::default(),
            accumulator_ms: 0,
            sink: Box::new(CollectionLedger::load()),
            notifier: Box::new(LogNotifier),
            hooks: OutcomeHooks::default(),
        }
    }

    pub fn with_sink(mut self, sink: impl PersistenceSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn with_notifier(mut self, notifier: impl CollectionNotifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn with_hooks(mut self, hooks: OutcomeHooks) -> Self {
        self.set_hooks(hooks);
        self
    }

    pub fn set_hooks(&mut self, hooks: OutcomeHooks) {
        self.hooks = hooks;
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Runtime difficulty lever; applies to the live round too
    ///
    /// Returns the slip probability actually applied.
    pub fn tune_slip_probability(&mut self, p: f32) -> f32 {
        let applied = self.settings.tune_slip_probability(p);
        if let Some(state) = self.state.as_mut() {
            state.settings.slip_probability = applied;
        }
        log::info!("Slip probability tuned to {}", applied);
        applied
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> Option<&GameState> {
        self.state.as_ref()
    }

    /// Render view, with each toy's sprite resolved for its current state
    pub fn snapshot(&self) -> Option<RoundSnapshot> {
        let state = self.state.as_ref()?;
        let mut snapshot = state.snapshot();
        snapshot.sprites = state
            .toys
            .iter()
            .map(|toy| {
                self.catalog
                    .lookup(&toy.category)
                    .map(|c| c.sprite(toy.state).to_string())
                    .unwrap_or_default()
            })
            .collect();
        Some(snapshot)
    }

    pub fn summary(&self) -> Option<RoundSummary> {
        self.state.as_ref().map(|s| RoundSummary {
            seed: s.seed.clone(),
            collected: s.collected,
            slips: s.slips,
            cycles: s.cycles,
        })
    }

    /// Host measured (or re-measured) the widget
    pub fn set_layout(&mut self, layout: MachineLayout) {
        self.layout = Some(layout);
        self.try_initialize();
    }

    /// Showing the widget initializes the round; hiding it tears it down
    pub fn set_visible(&mut self, visible: bool) {
        if self.visible == visible {
            return;
        }
        self.visible = visible;
        if visible {
            self.try_initialize();
        } else {
            self.teardown();
        }
    }

    /// Reseed the current round, or remember the seed for the first one
    pub fn set_seed(&mut self, seed: Option<&str>) {
        self.seed = seed.filter(|s| !s.is_empty()).map(str::to_string);
        if let Some(state) = self.state.as_mut() {
            state.reseed(self.seed.as_deref(), &self.catalog);
        }
    }

    pub fn set_playable(&mut self, playable: bool) {
        self.playable = playable;
        if !playable {
            self.input.edges.clear();
        }
    }

    pub fn set_owner(&mut self, owner: Option<&str>) {
        self.owner = owner.map(str::to_string);
    }

    pub fn press(&mut self, control: Control) {
        self.push_edge(control, true);
    }

    pub fn release(&mut self, control: Control) {
        self.push_edge(control, false);
    }

    fn push_edge(&mut self, control: Control, pressed: bool) {
        if !self.playable {
            log::debug!("Ignoring {:?} while not playable", control);
            return;
        }
        if self.state.is_none() {
            log::debug!("Ignoring {:?} before the round exists", control);
            return;
        }
        self.input.edges.push(ControlEdge { control, pressed });
    }

    /// Returns true if the key maps to a control
    pub fn key_down(&mut self, key: &str) -> bool {
        let Some(control) = Control::from_key(key) else {
            return false;
        };
        self.press(control);
        true
    }

    pub fn key_up(&mut self, key: &str) -> bool {
        let Some(control) = Control::from_key(key) else {
            return false;
        };
        self.release(control);
        true
    }

    /// Tap on the prize waiting in the chute
    pub fn claim(&mut self) {
        if self.state.is_none() {
            log::debug!("Ignoring claim before the round exists");
            return;
        }
        self.input.claim = true;
    }

    /// Advance by wall-clock `dt_ms`, in fixed steps of the motion interval
    pub fn update(&mut self, dt_ms: u32) {
        if self.state.is_none() {
            self.try_initialize();
        }
        let Some(state) = self.state.as_mut() else {
            return;
        };

        let step = self.settings.motion_interval_ms.max(1);
        let max_substeps = self.settings.max_substeps.max(1);
        // Clamp long frames (tab switches) instead of fast-forwarding
        let frame_ms = dt_ms.min(step.saturating_mul(max_substeps));
        self.accumulator_ms = self.accumulator_ms.saturating_add(frame_ms);

        let mut substeps = 0;
        while self.accumulator_ms >= step && substeps < max_substeps {
            let input = std::mem::take(&mut self.input);
            tick(state, &input, step);
            self.accumulator_ms -= step;
            substeps += 1;
        }

        let outcomes = state.drain_outcomes();
        for outcome in outcomes {
            self.dispatch(outcome);
        }
    }

    fn dispatch(&mut self, outcome: RoundEvent) {
        match outcome {
            RoundEvent::Collected { category, .. } => {
                match self.owner.as_deref() {
                    Some(owner) => {
                        if let Err(e) = self.sink.record(owner, &category) {
                            log::warn!("Could not record {} for {}: {}", category, owner, e);
                        }
                    }
                    None => log::warn!("No owner set, {} not recorded", category),
                }
                self.notifier.collected(&category);
                if let Some(hook) = self.hooks.on_success.as_mut() {
                    hook(&category);
                }
            }
            RoundEvent::Slipped { category } => {
                if let Some(hook) = self.hooks.on_drop.as_mut() {
                    hook(&category);
                }
            }
            RoundEvent::CycleFinished { caught } => {
                if let Some(hook) = self.hooks.on_cycle_end.as_mut() {
                    hook(caught);
                }
            }
            RoundEvent::Grabbed { .. } | RoundEvent::Missed => {}
        }
    }

    fn try_initialize(&mut self) {
        if self.state.is_some() {
            return;
        }
        if !self.visible {
            log::debug!("Not visible yet, deferring initialization");
            return;
        }
        let Some(layout) = self.layout else {
            log::debug!("No layout yet, deferring initialization");
            return;
        };
        match MachineGeometry::measure(&layout) {
            Ok(geometry) => {
                self.state = Some(GameState::new(
                    geometry,
                    self.settings.clone(),
                    &self.catalog,
                    self.seed.as_deref(),
                ));
                self.accumulator_ms = 0;
                log::info!("Claw machine ready");
            }
            Err(e) => log::debug!("Deferring initialization: {}", e),
        }
    }

    fn teardown(&mut self) {
        if let Some(mut state) = self.state.take() {
            state.teardown();
        }
        self.input = TickInput::default();
        self.accumulator_ms = 0;
    }

    /// Cancel everything and drop the round
    pub fn dispose(&mut self) {
        self.visible = false;
        self.teardown();
        log::info!("Claw machine disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClawError;
    use crate::settings::MIN_TUNED_SLIP_PROBABILITY;
    use crate::sim::state::tests::test_catalog;
    use crate::sim::{ClawPhase, Rect};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    const DT: u32 = 10;

    struct FailingSink;

    impl PersistenceSink for FailingSink {
        fn record(&mut self, _owner: &str, _category: &str) -> Result<u32, ClawError> {
            Err(ClawError::Sink("offline".into()))
        }
    }

    #[derive(Clone, Default)]
    struct RecordingNotifier(Rc<RefCell<Vec<String>>>);

    impl CollectionNotifier for RecordingNotifier {
        fn collected(&self, category: &str) {
            self.0.borrow_mut().push(category.to_string());
        }
    }

    #[derive(Clone, Default)]
    struct Counters {
        success: Rc<Cell<u32>>,
        drops: Rc<Cell<u32>>,
        cycles: Rc<RefCell<Vec<bool>>>,
    }

    impl Counters {
        fn hooks(&self) -> OutcomeHooks {
            let (success, drops, cycles) =
                (self.success.clone(), self.drops.clone(), self.cycles.clone());
            OutcomeHooks {
                on_success: Some(Box::new(move |_: &str| success.set(success.get() + 1))),
                on_drop: Some(Box::new(move |_: &str| drops.set(drops.get() + 1))),
                on_cycle_end: Some(Box::new(move |caught: bool| {
                    cycles.borrow_mut().push(caught)
                })),
            }
        }
    }

    fn ready_engine(settings: Settings, layout: MachineLayout) -> Engine {
        let mut engine = Engine::new(test_catalog(), settings)
            .with_sink(Rc::new(RefCell::new(CollectionLedger::new())));
        engine.set_seed(Some("engine"));
        engine.set_owner(Some("ana"));
        engine.set_layout(layout);
        engine.set_visible(true);
        engine
    }

    fn hold(engine: &mut Engine, control: Control, ticks: usize) {
        engine.press(control);
        for _ in 0..ticks {
            engine.update(DT);
        }
        engine.release(control);
        engine.update(DT);
    }

    /// Aim at slot 5 and play until the cycle ends
    fn play_cycle(engine: &mut Engine) {
        hold(engine, Control::Horizontal, 6);
        hold(engine, Control::Vertical, 6);
        for _ in 0..5000 {
            if engine.summary().is_some_and(|s| s.cycles == 1) {
                return;
            }
            engine.update(DT);
        }
        panic!("cycle never finished");
    }

    fn rail_x(engine: &Engine) -> f32 {
        let state = engine.state().unwrap();
        state.body(state.rail).unwrap().pos.x
    }

    #[test]
    fn test_initialization_waits_for_visibility_and_layout() {
        let mut engine = Engine::new(test_catalog(), Settings::default());
        engine.update(DT);
        assert!(!engine.is_initialized());

        engine.set_layout(MachineLayout {
            width: 0.0,
            height: 0.0,
            ..MachineLayout::standard()
        });
        engine.set_visible(true);
        engine.update(DT);
        assert!(!engine.is_initialized());

        engine.set_layout(MachineLayout::standard());
        assert!(engine.is_initialized());
        assert_eq!(engine.state().unwrap().toys.len(), 11);
    }

    #[test]
    fn test_catch_records_notifies_and_fires_hooks() {
        let ledger = Rc::new(RefCell::new(CollectionLedger::new()));
        let notifier = RecordingNotifier::default();
        let counters = Counters::default();
        let mut engine = Engine::new(
            test_catalog(),
            Settings {
                slip_probability: 0.0,
                ..Settings::default()
            },
        )
        .with_sink(ledger.clone())
        .with_notifier(notifier.clone())
        .with_hooks(counters.hooks());
        engine.set_owner(Some("ana"));
        engine.set_seed(Some("engine"));
        engine.set_layout(MachineLayout::standard());
        engine.set_visible(true);

        play_cycle(&mut engine);

        let categories = notifier.0.borrow().clone();
        assert_eq!(categories.len(), 1);
        assert_eq!(ledger.borrow().count("ana", &categories[0]), 1);
        assert_eq!(counters.success.get(), 1);
        assert_eq!(counters.drops.get(), 0);
        assert_eq!(*counters.cycles.borrow(), vec![true]);
        assert_eq!(engine.summary().unwrap().collected, 1);
    }

    #[test]
    fn test_slip_fires_drop_hook_once() {
        let counters = Counters::default();
        let settings = Settings {
            slip_probability: 1.0,
            slip_delay_max_ms: 1,
            ..Settings::default()
        };
        let layout = MachineLayout {
            chute: Rect::from_xywh(1000.0, 1000.0, 10.0, 10.0),
            ..MachineLayout::standard()
        };
        let mut engine = ready_engine(settings, layout).with_hooks(counters.hooks());

        play_cycle(&mut engine);

        assert_eq!(counters.drops.get(), 1);
        assert_eq!(counters.success.get(), 0);
        assert_eq!(*counters.cycles.borrow(), vec![false]);
        let summary = engine.summary().unwrap();
        assert_eq!(summary.slips, 1);
        assert_eq!(summary.collected, 0);
    }

    #[test]
    fn test_sink_failure_is_not_fatal() {
        let counters = Counters::default();
        let mut engine = ready_engine(
            Settings {
                slip_probability: 0.0,
                ..Settings::default()
            },
            MachineLayout::standard(),
        )
        .with_sink(FailingSink)
        .with_hooks(counters.hooks());

        play_cycle(&mut engine);
        assert_eq!(engine.summary().unwrap().collected, 1);
        assert_eq!(counters.success.get(), 1);

        // Machine is still operable
        engine.press(Control::Horizontal);
        engine.update(DT);
        assert_eq!(rail_x(&engine), 10.0);
    }

    #[test]
    fn test_not_playable_ignores_controls() {
        let mut engine = ready_engine(Settings::default(), MachineLayout::standard());
        engine.set_playable(false);
        engine.press(Control::Horizontal);
        engine.update(DT * 3);
        assert_eq!(rail_x(&engine), 0.0);

        engine.set_playable(true);
        assert!(engine.key_down("ArrowRight"));
        engine.update(DT);
        assert_eq!(rail_x(&engine), 10.0);
        assert!(!engine.key_down("q"));
    }

    #[test]
    fn test_update_clamps_long_frames() {
        let mut engine = ready_engine(Settings::default(), MachineLayout::standard());
        engine.press(Control::Horizontal);
        engine.update(10_000);
        let max = Settings::default().max_substeps as f32 * 10.0;
        assert_eq!(rail_x(&engine), max);
    }

    #[test]
    fn test_set_seed_reseeds_live_round() {
        let mut engine = ready_engine(Settings::default(), MachineLayout::standard());
        let before: Vec<String> = engine
            .state()
            .unwrap()
            .toys
            .iter()
            .map(|t| t.category.clone())
            .collect();

        engine.set_seed(Some("engine"));
        let state = engine.state().unwrap();
        let after: Vec<String> = state.toys.iter().map(|t| t.category.clone()).collect();
        assert_eq!(before, after);
        assert_eq!(state.seed.as_deref(), Some("engine"));
    }

    #[test]
    fn test_snapshot_resolves_sprites() {
        let engine = ready_engine(Settings::default(), MachineLayout::standard());
        let snapshot = engine.snapshot().unwrap();
        assert_eq!(snapshot.sprites.len(), snapshot.toys.len());
        for (toy, sprite) in snapshot.toys.iter().zip(&snapshot.sprites) {
            assert_eq!(sprite, &format!("{}.png", toy.category));
        }
    }

    #[test]
    fn test_input_before_init_is_dropped() {
        let mut engine = Engine::new(test_catalog(), Settings::default());
        engine.press(Control::Horizontal);
        engine.claim();
        engine.update(DT);
        assert!(!engine.is_initialized());

        engine.set_layout(MachineLayout::standard());
        engine.set_visible(true);
        engine.update(DT);
        let state = engine.state().unwrap();
        assert_eq!(rail_x(&engine), 0.0);
        assert_eq!(state.phase, ClawPhase::Idle);
    }

    #[test]
    fn test_seed_before_init_only_stores() {
        let mut engine = Engine::new(test_catalog(), Settings::default());
        engine.set_seed(Some("early"));
        assert!(!engine.is_initialized());
        assert!(engine.state().is_none());

        engine.set_layout(MachineLayout::standard());
        engine.set_visible(true);
        let geometry = MachineGeometry::measure(&MachineLayout::standard()).unwrap();
        let expected =
            GameState::new(geometry, Settings::default(), &test_catalog(), Some("early"));
        let layout = |state: &GameState| -> Vec<(String, usize)> {
            state
                .toys
                .iter()
                .map(|t| (t.category.clone(), t.slot))
                .collect()
        };
        let state = engine.state().unwrap();
        assert_eq!(state.seed.as_deref(), Some("early"));
        assert_eq!(layout(state), layout(&expected));
        for (toy, other) in state.toys.iter().zip(&expected.toys) {
            assert_eq!(state.body(toy.body).unwrap().pos, expected.body(other.body).unwrap().pos);
        }
    }

    #[test]
    fn test_tuning_reaches_live_round() {
        let mut engine = ready_engine(Settings::default(), MachineLayout::standard());
        assert_eq!(engine.tune_slip_probability(0.0), MIN_TUNED_SLIP_PROBABILITY);
        assert_eq!(engine.settings().slip_probability, MIN_TUNED_SLIP_PROBABILITY);
        let state = engine.state().unwrap();
        assert_eq!(state.settings.slip_probability, MIN_TUNED_SLIP_PROBABILITY);

        // Survives a rebuild of the round
        engine.set_visible(false);
        engine.set_visible(true);
        assert_eq!(engine.tune_slip_probability(0.3), 0.3);
        engine.set_visible(false);
        engine.set_visible(true);
        assert_eq!(engine.state().unwrap().settings.slip_probability, 0.3);
    }

    #[test]
    fn test_invalid_settings_fall_back_to_defaults() {
        let engine = Engine::new(
            test_catalog(),
            Settings {
                motion_interval_ms: 0,
                ..Settings::default()
            },
        );
        assert_eq!(engine.settings().motion_interval_ms, 10);
    }

    #[test]
    fn test_huge_frames_do_not_overflow() {
        let settings = Settings {
            motion_interval_ms: u32::MAX / 2,
            max_substeps: 4,
            ..Settings::default()
        };
        let mut engine = ready_engine(settings, MachineLayout::standard());
        engine.update(u32::MAX);
        engine.update(u32::MAX);
        assert!(engine.is_initialized());
    }

    #[test]
    fn test_dispose_drops_round() {
        let mut engine = ready_engine(Settings::default(), MachineLayout::standard());
        engine.press(Control::Horizontal);
        engine.update(DT);
        engine.dispose();
        assert!(!engine.is_initialized());

        engine.update(DT);
        assert!(!engine.is_initialized());
        assert!(engine.snapshot().is_none());
    }
}
