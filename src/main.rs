//! Sleigh Ride entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, HtmlCanvasElement, KeyboardEvent, TouchEvent};

    use sleigh_ride::audio::{AudioSink, WebAudio};
    use sleigh_ride::persistence::{LocalStorageStore, ProgressFlags};
    use sleigh_ride::renderer::{RenderState, SceneRenderer};
    use sleigh_ride::sim::GameMode;
    use sleigh_ride::ui::HudSnapshot;
    use sleigh_ride::driver::INTRO_STAGE_SECS;
    use sleigh_ride::{FrameDriver, FrameOutcome, GamePhase, RunListener, Settings, StartupError};

    const CANVAS_ID: &str = "canvas";
    /// Event the overlay listens on for HUD snapshots
    const HUD_EVENT: &str = "sleigh-hud";

    /// Game instance holding all state
    struct Game {
        driver: FrameDriver<WebAudio>,
        scene: SceneRenderer,
        render_state: RenderState,
        settings: Settings,
        store: LocalStorageStore,
        flags: ProgressFlags,
        document: Document,
        /// A frame callback is scheduled
        running: bool,
    }

    impl Game {
        /// Advance, draw and report one frame
        fn frame(&mut self, time: f64) -> FrameOutcome {
            let Game {
                driver,
                scene,
                render_state,
                settings,
                store,
                flags,
                document,
                ..
            } = self;

            let mut hud = DomHud {
                document,
                store,
                flags,
            };
            let outcome = driver.frame(time, &mut hud);

            let vertices = scene.draw(driver.state(), time, settings);
            match render_state.render(&vertices) {
                Ok(_) => {}
                Err(wgpu::SurfaceError::Lost) => {
                    render_state.resize(render_state.size.0, render_state.size.1);
                }
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    log::error!("Out of memory!");
                }
                Err(e) => log::warn!("Render error: {:?}", e),
            }

            show_phase(document, driver.phase());
            if driver.phase() == GamePhase::Intro {
                show_intro_stage(document, driver.intro_stage());
            }
            outcome
        }

        /// Escape during the intro; persists intro-seen like a full viewing
        fn skip_intro(&mut self) {
            let Game {
                driver,
                store,
                flags,
                document,
                ..
            } = self;
            let mut hud = DomHud {
                document,
                store,
                flags,
            };
            driver.skip_intro(&mut hud);
        }

        /// Any input may be the first user gesture, which audio needs
        fn wake_audio(&mut self) {
            self.driver.audio_mut().initialize();
        }

        fn cycle_quality(&mut self) {
            let quality = self.settings.cycle_quality();
            self.driver.set_particle_cap(self.settings.max_particles());
            self.settings.save(&mut self.store);
            log::info!("Quality set to {:?}", quality);
        }

        fn toggle_reduced_motion(&mut self) {
            let on = self.settings.toggle_reduced_motion();
            self.settings.save(&mut self.store);
            log::info!("Reduced motion {}", if on { "on" } else { "off" });
        }

        fn restart(&mut self, mode: GameMode) {
            if mode == GameMode::Endless && !self.flags.endless_unlocked() {
                log::info!("Endless mode is locked until the story is finished");
                return;
            }
            self.driver.start_run(mode);
        }
    }

    /// Mirrors run events into the DOM overlay and persists flags
    struct DomHud<'a> {
        document: &'a Document,
        store: &'a mut LocalStorageStore,
        flags: &'a mut ProgressFlags,
    }

    impl DomHud<'_> {
        fn set_text(&self, selector: &str, text: &str) {
            if let Some(el) = self.document.query_selector(selector).ok().flatten() {
                el.set_text_content(Some(text));
            }
        }
    }

    impl RunListener for DomHud<'_> {
        fn on_intro_finished(&mut self) {
            if !self.flags.intro_seen {
                self.flags.mark_intro_seen(&mut *self.store);
            }
        }

        fn on_victory(&mut self, score: u32) {
            self.flags.mark_story_complete(&mut *self.store);
            self.set_text("#victory-score", &score.to_string());
        }

        fn on_game_over(&mut self, score: u32) {
            self.set_text("#final-score", &score.to_string());
        }

        fn on_hud(&mut self, snapshot: &HudSnapshot) {
            self.set_text("#hud-lives .hud-value", &snapshot.lives.to_string());
            self.set_text("#hud-snowballs .hud-value", &snapshot.snowballs.to_string());
            self.set_text("#hud-progress .hud-value", &format!("{:.0}%", snapshot.progress));
            self.set_text("#hud-time .hud-value", &snapshot.time_text);
            self.set_text("#hud-act .hud-value", snapshot.act_name);
            self.set_text("#act-description", snapshot.act_description);
            self.set_text("#hud-score .hud-value", &snapshot.score.to_string());
            self.set_text(
                "#dialogue",
                snapshot.dialogue.as_ref().map(|d| d.text).unwrap_or_default(),
            );
            self.set_text("#wish", snapshot.wish.unwrap_or_default());

            // Full snapshot for richer overlays
            let json = match serde_json::to_string(snapshot) {
                Ok(json) => json,
                Err(e) => {
                    log::warn!("HUD snapshot not serialisable: {}", e);
                    return;
                }
            };
            let init = web_sys::CustomEventInit::new();
            init.set_detail(&JsValue::from_str(&json));
            if let Ok(event) = web_sys::CustomEvent::new_with_event_init_dict(HUD_EVENT, &init) {
                if let Some(window) = web_sys::window() {
                    let _ = window.dispatch_event(&event);
                }
            }
        }
    }

    /// Toggle the overlay panels for the current phase
    fn show_phase(document: &Document, phase: GamePhase) {
        for (id, visible) in [
            ("intro", phase == GamePhase::Intro),
            ("hud", phase == GamePhase::Playing),
            ("game-over", phase == GamePhase::GameOver),
            ("victory", phase == GamePhase::Victory),
        ] {
            if let Some(el) = document.get_element_by_id(id) {
                let _ = el.class_list().toggle_with_force("hidden", !visible);
            }
        }
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::error_1(&format!("Logger init failed: {}", e).into());
        }

        log::info!("Sleigh Ride starting...");

        if let Err(e) = start().await {
            log::error!("Startup failed: {}", e);
        }
    }

    async fn start() -> Result<(), StartupError> {
        let window = web_sys::window().ok_or(StartupError::NoWindow)?;
        let document = window.document().ok_or(StartupError::NoWindow)?;

        // Hide loading indicator
        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let canvas: HtmlCanvasElement = document
            .get_element_by_id(CANVAS_ID)
            .and_then(|el| el.dyn_into().ok())
            .ok_or(StartupError::NoCanvas(CANVAS_ID))?;
        let (width, height) = fit_canvas(&window, &canvas);

        let store = LocalStorageStore::new();
        let flags = ProgressFlags::load(&store);
        let settings = Settings::load(&store);

        if flags.needs_update_notice() {
            if let Some(el) = document.get_element_by_id("update-notice") {
                let _ = el.class_list().remove_1("hidden");
            }
        }

        let seed = js_sys::Date::now() as u64;
        let audio = WebAudio::new(
            settings.effective_sfx_volume(),
            settings.effective_music_volume(),
        );
        let mut driver = FrameDriver::new(audio, seed, GameMode::Story, flags.intro_seen);
        driver.set_particle_cap(settings.max_particles());
        log::info!("Game initialized with seed: {}", seed);

        // Initialize WebGPU
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::BROWSER_WEBGPU | wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance.create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        log::info!("Using adapter: {:?}", adapter.get_info().name);

        let render_state = RenderState::new(surface, &adapter, width, height).await?;

        let game = Rc::new(RefCell::new(Game {
            driver,
            scene: SceneRenderer::new(seed, settings.quality),
            render_state,
            settings,
            store,
            flags,
            document,
            running: false,
        }));

        setup_input_handlers(&canvas, game.clone());
        setup_buttons(game.clone());
        setup_resize(canvas, game.clone());

        resume(game);

        log::info!("Sleigh Ride running!");
        Ok(())
    }

    /// Match the backing store to the displayed size
    /// Reveal the intro script lines up to `stage`
    fn show_intro_stage(document: &Document, stage: usize) {
        for line in 0..=INTRO_STAGE_SECS.len() {
            if let Some(el) = document.get_element_by_id(&format!("intro-stage-{}", line)) {
                let _ = el.class_list().toggle_with_force("hidden", line > stage);
            }
        }
    }

    fn fit_canvas(window: &web_sys::Window, canvas: &HtmlCanvasElement) -> (u32, u32) {
        let dpr = window.device_pixel_ratio();
        let width = ((canvas.client_width() as f64 * dpr) as u32).max(1);
        let height = ((canvas.client_height() as f64 * dpr) as u32).max(1);
        canvas.set_width(width);
        canvas.set_height(height);
        (width, height)
    }

    fn setup_input_handlers(canvas: &HtmlCanvasElement, game: Rc<RefCell<Game>>) {
        // Keyboard
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let restart = {
                    let mut g = game.borrow_mut();
                    g.wake_audio();
                    match event.key().as_str() {
                        " " | "ArrowUp" | "w" | "W" => {
                            event.prevent_default();
                            g.driver.jump();
                            None
                        }
                        "z" | "Z" | "Enter" => {
                            g.driver.shoot();
                            None
                        }
                        "Escape" => {
                            g.skip_intro();
                            None
                        }
                        "`" => {
                            g.driver.toggle_cinematic();
                            None
                        }
                        "q" | "Q" => {
                            g.cycle_quality();
                            None
                        }
                        "m" | "M" => {
                            g.toggle_reduced_motion();
                            None
                        }
                        "r" | "R" => Some(GameMode::Story),
                        "e" | "E" => Some(GameMode::Endless),
                        _ => None,
                    }
                };
                if let Some(mode) = restart {
                    game.borrow_mut().restart(mode);
                    resume(game.clone());
                }
            });
            if let Some(window) = web_sys::window() {
                let _ = window
                    .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            }
            closure.forget();
        }

        // Touch: one finger jumps, two fingers shoot
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                event.prevent_default();
                let mut g = game.borrow_mut();
                g.wake_audio();
                if event.touches().length() > 1 {
                    g.driver.shoot();
                } else {
                    g.driver.jump();
                }
            });
            let _ = canvas
                .add_event_listener_with_callback("touchstart", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_buttons(game: Rc<RefCell<Game>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };

        for (id, mode) in [
            ("restart-btn", GameMode::Story),
            ("victory-restart-btn", GameMode::Story),
            ("endless-btn", GameMode::Endless),
        ] {
            if let Some(btn) = document.get_element_by_id(id) {
                let game = game.clone();
                let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                    {
                        let mut g = game.borrow_mut();
                        g.wake_audio();
                        g.restart(mode);
                    }
                    resume(game.clone());
                });
                let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
                closure.forget();
            }
        }

        if let Some(btn) = document.get_element_by_id("update-dismiss-btn") {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                let mut g = game.borrow_mut();
                let Game { flags, store, document, .. } = &mut *g;
                flags.acknowledge_version(store);
                if let Some(el) = document.get_element_by_id("update-notice") {
                    let _ = el.class_list().add_1("hidden");
                }
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_resize(canvas: HtmlCanvasElement, game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            if let Some(window) = web_sys::window() {
                let (width, height) = fit_canvas(&window, &canvas);
                game.borrow_mut().render_state.resize(width, height);
            }
        });
        let _ = window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    /// Schedule the loop unless it is already running
    fn resume(game: Rc<RefCell<Game>>) {
        {
            let mut g = game.borrow_mut();
            if g.running {
                return;
            }
            g.running = true;
        }
        request_animation_frame(game);
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        let outcome = game.borrow_mut().frame(time);
        match outcome {
            FrameOutcome::Continue => request_animation_frame(game),
            FrameOutcome::Stop => {
                game.borrow_mut().running = false;
                log::info!("Frame loop stopped");
            }
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_game::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Sleigh Ride (native) starting...");
    log::info!("Native mode runs a headless demo - build for wasm32 to play");

    headless_demo();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Play half a minute of a story run with scripted jumps
#[cfg(not(target_arch = "wasm32"))]
fn headless_demo() {
    use sleigh_ride::audio::NullAudio;
    use sleigh_ride::driver::NoopListener;
    use sleigh_ride::renderer::SceneRenderer;
    use sleigh_ride::sim::GameMode;
    use sleigh_ride::{FrameDriver, FrameOutcome, QualityPreset, Settings};

    const FRAMES: u32 = 60 * 30;

    let settings = Settings::default();
    let mut driver = FrameDriver::new(NullAudio, 42, GameMode::Story, true);
    driver.set_particle_cap(settings.max_particles());
    let mut listener = NoopListener;
    driver.skip_intro(&mut listener);
    let mut scene = SceneRenderer::new(42, QualityPreset::Medium);

    let mut time = 0.0;
    for frame in 0..FRAMES {
        time += 1000.0 / 60.0;
        if frame % 40 == 0 {
            driver.jump();
        }
        if driver.frame(time, &mut listener) == FrameOutcome::Stop {
            break;
        }
        if frame % 300 == 0 {
            let vertices = scene.draw(driver.state(), time, &settings);
            let state = driver.state();
            println!(
                "t={:>5.1}s  lives={}  distance={:>8.0}  obstacles={:>2}  vertices={}",
                time / 1000.0,
                state.player.lives,
                state.distance,
                state.obstacles.len(),
                vertices.len()
            );
        }
    }

    let state = driver.state();
    println!(
        "\nDemo finished in {:?}: score {:.0}, progress {:.1}%",
        driver.phase(),
        state.score,
        state.progress() * 100.0
    );
}
