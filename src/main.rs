mod audio;
mod behavior;
mod camera;
mod collision;
mod debug;
mod driver;
mod effects;
mod entity;
mod events;
mod game_runtime;
mod input;
mod level;
mod levels;
mod player;
mod projectile;
mod rect;
mod render;
mod scenario;
mod sim;

use bevy::prelude::*;

use driver::{HeadlessMode, ViewConfig};
use level::LevelLibrary;

#[derive(serde::Deserialize, Default)]
struct StartupConfig {
    window_title: Option<String>,
    window_width: Option<f32>,
    window_height: Option<f32>,
    background_color: Option<[f32; 3]>,
    reduced_motion: Option<bool>,
    level_dir: Option<String>,
}

fn load_startup_config() -> StartupConfig {
    let path = std::env::var("SNARE_CONFIG")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "snare.json".to_string());
    match std::fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str::<StartupConfig>(&contents) {
            Ok(cfg) => {
                println!("[Snare] Loaded startup config from {}", path);
                cfg
            }
            Err(e) => {
                eprintln!("[Snare] Failed to parse {}: {}", path, e);
                StartupConfig::default()
            }
        },
        Err(_) => StartupConfig::default(),
    }
}

fn run_scenario_file(path: &str) -> Result<String, String> {
    let raw =
        std::fs::read_to_string(path).map_err(|e| format!("read {}: {}", path, e))?;
    let request: scenario::ScenarioRequest =
        serde_json::from_str(&raw).map_err(|e| format!("parse {}: {}", path, e))?;
    let report = scenario::run_scenario(&request)?;
    serde_json::to_string_pretty(&report).map_err(|e| e.to_string())
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let headless = args.iter().any(|a| a == "--headless");

    if let Some(i) = args.iter().position(|a| a == "--scenario") {
        let Some(path) = args.get(i + 1) else {
            eprintln!("[Snare] --scenario needs a file argument");
            std::process::exit(2);
        };
        match run_scenario_file(path) {
            Ok(report) => {
                println!("{}", report);
                return;
            }
            Err(e) => {
                eprintln!("[Snare] Scenario failed: {}", e);
                std::process::exit(2);
            }
        }
    }

    let startup_config = load_startup_config();

    let mut library = LevelLibrary::builtin();
    let level_dir = args
        .iter()
        .position(|a| a == "--levels")
        .and_then(|i| args.get(i + 1))
        .cloned()
        .or_else(|| startup_config.level_dir.clone());
    if let Some(dir) = &level_dir {
        let added = library.load_dir(std::path::Path::new(dir));
        println!("[Snare] Loaded {} level(s) from {}", added, dir);
    }

    let window_width = startup_config.window_width.unwrap_or(1280.0);
    let window_height = startup_config.window_height.unwrap_or(720.0);
    let view = ViewConfig {
        width: window_width,
        height: window_height,
        reduced_motion: startup_config.reduced_motion.unwrap_or(false),
    };

    let mut app = App::new();
    app.insert_resource(HeadlessMode(headless));

    if headless {
        // Headless mode: no window, no rendering, just the fixed clock
        app.add_plugins(MinimalPlugins);
        app.add_plugins(bevy::state::app::StatesPlugin);
        println!("[Snare] Starting in HEADLESS mode");
    } else {
        let window_title = startup_config
            .window_title
            .unwrap_or_else(|| "Snare".to_string());
        app.add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: window_title,
                resolution: (window_width, window_height).into(),
                present_mode: bevy::window::PresentMode::AutoVsync,
                ..default()
            }),
            ..default()
        }));
        let clear = match startup_config.background_color {
            Some(bg) => Color::srgb(bg[0], bg[1], bg[2]),
            None => render::background_color(),
        };
        app.insert_resource(ClearColor(clear));
        app.add_plugins(render::RenderPlugin);
        println!("[Snare] Starting in WINDOWED mode");
    }

    app.insert_resource(library)
        .insert_resource(view)
        .insert_resource(Time::<Fixed>::from_hz(120.0))
        // A hitched frame feeds at most 0.1 s into the fixed clock.
        .insert_resource(Time::<Virtual>::from_max_delta(std::time::Duration::from_millis(
            100,
        )))
        .add_plugins(input::InputPlugin)
        .add_plugins(game_runtime::GamePhasePlugin)
        .add_plugins(driver::DriverPlugin)
        .add_plugins(events::GameEventsPlugin)
        .add_plugins(audio::AudioPlugin)
        .add_plugins(camera::SnareCameraPlugin)
        .add_plugins(debug::DebugPlugin);

    app.run();
}
