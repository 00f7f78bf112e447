mod demo;

use anyhow::Result;
use engine::{Config, EngineContext};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        log::error!("{err:#}");
        std::process::exit(-1);
    }
}

fn run() -> Result<()> {
    let assets = engine::assets::locate_assets()?;
    log::info!("assets directory: {}", assets.display());

    let ctx = EngineContext::new(Config::default(), Box::new(demo::Demo::new(assets)))?;
    ctx.run()
}
