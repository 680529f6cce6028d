use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use gridgl::headless::HeadlessApi;
use gridgl::Device;
use hex_viewer::{
    hex_program_spec, FieldEngine, FieldSource, LocalFieldSource, HEX_SHADERS,
};
use log::info;

#[derive(Parser, Debug)]
#[command(name = "hex-viewer", version)]
struct Args {
    /// Field edge length in cells.
    #[arg(long, default_value_t = 16)]
    size: usize,

    /// Seed for the synthetic field source.
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Simulation steps to advance before the final frame.
    #[arg(long, default_value_t = 3)]
    steps: u32,

    #[arg(long, default_value_t = 1280)]
    width: u32,

    #[arg(long, default_value_t = 720)]
    height: u32,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut api = HeadlessApi::new();
    api.register_program(&HEX_SHADERS, hex_program_spec());
    let device = Device::new(api)?;

    let mut source = LocalFieldSource::new(args.size, args.seed);
    let field = source.fetch_field().context("fetching the initial field")?;
    let mut engine = FieldEngine::new(device, field)?;

    engine.resize(args.width, args.height);
    engine.render_frame()?;

    let stats = engine.advance(&mut source, Some(args.steps))?;
    engine.render_frame()?;

    // Pick through the viewport center.
    match engine.pick_ndc(0.0, 0.0) {
        Some(pick) => info!(
            "center pick: cell ({}, {}) population {:.0} (delta {:+.3}), scale {:.2}",
            pick.cell.col,
            pick.cell.row,
            pick.cell.population,
            pick.cell.population_delta,
            pick.scale,
        ),
        None => info!("center pick missed the field"),
    }

    info!(
        "rendered {} cells over {} draw calls; advanced {} steps in {:.2} ms",
        engine.field().cell_count(),
        engine.device().api().draw_call_count(),
        stats.steps_run,
        stats.total_time,
    );
    Ok(())
}
