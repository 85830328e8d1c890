//! Headless матч ботов
//!
//! Usage: skirmish_ai [seed] [tuning.json]

use skirmish_ai::arena::demo::{demo_geometry, populate_demo};
use skirmish_ai::{
    bot_snapshots, create_headless_app, log_error, log_info, BotTuning, SimulationPlugin,
};

const TICKS: usize = 1800;
const BOTS_PER_TEAM: usize = 3;

fn main() {
    let mut args = std::env::args().skip(1);
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(42);
    let tuning = match args.next() {
        Some(path) => match BotTuning::from_json_file(&path) {
            Ok(tuning) => tuning,
            Err(err) => {
                log_error(&format!("Failed to load tuning {}: {}", path, err));
                std::process::exit(1);
            }
        },
        None => BotTuning::default(),
    };

    let mut app = create_headless_app(seed);
    log_info(&format!("Starting skirmish headless match (seed: {})", seed));

    app.insert_resource(tuning)
        .add_plugins(SimulationPlugin::new(demo_geometry()));
    populate_demo(&mut app.world_mut().commands(), BOTS_PER_TEAM);

    for tick in 0..TICKS {
        app.update();

        if tick % 300 == 0 {
            let summary: Vec<String> = bot_snapshots(app.world_mut())
                .iter()
                .map(ToString::to_string)
                .collect();
            log_info(&format!("Tick {}: {}", tick, summary.join(" ")));
        }
    }

    log_info("Match complete!");
}
