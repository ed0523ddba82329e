use std::{env, time::Instant};

use anyhow::{Context as _, bail};
use indicatif::ProgressBar;
use minirender::{
    HardwareRenderer, RasterizationRenderer, RayTracingRenderer, Renderer, Settings,
    input::InputState,
};

const USAGE: &str = "Usage: minirender-cli <rasterizer|raytracer|hardware> [settings.toml]";

fn main() -> anyhow::Result<()> {
    let mut args = env::args().skip(1);
    let Some(engine) = args.next() else {
        bail!(USAGE);
    };
    let settings = match args.next() {
        Some(path) => Settings::from_toml_file(&path)
            .with_context(|| format!("Failed to load settings from {path}"))?,
        None => Settings::default(),
    };
    init_logging(settings.log_filter.as_deref());

    let mut progress = None;
    let frame_count = if engine == "hardware" {
        settings.frame_count
    } else {
        1
    };
    let mut renderer: Box<dyn Renderer> = match engine.as_str() {
        "rasterizer" => Box::new(RasterizationRenderer::new(settings)),
        "raytracer" => {
            let bar = ProgressBar::no_length();
            let mut renderer = RayTracingRenderer::new(settings);
            renderer.set_progress_callback({
                let bar = bar.clone();
                move |done, total| {
                    bar.set_length(total as u64);
                    bar.set_position(done as u64);
                }
            });
            progress = Some(bar);
            Box::new(renderer)
        }
        "hardware" => Box::new(HardwareRenderer::with_software_device(settings)?),
        other => bail!("Unknown renderer {other:?}\n{USAGE}"),
    };

    renderer.init().context("Initialization failed")?;

    let mut input = InputState::default();
    let mut last_frame = Instant::now();
    for _ in 0..frame_count {
        let now = Instant::now();
        renderer.update(&input, (now - last_frame).as_secs_f32())?;
        last_frame = now;
        renderer.render()?;
        input.end_frame();
    }
    if let Some(bar) = progress {
        bar.finish();
    }

    renderer.destroy()?;
    Ok(())
}

/// `filter` uses env_logger syntax and takes precedence over `RUST_LOG`.
fn init_logging(filter: Option<&str>) {
    let mut builder = env_logger::Builder::new();
    if let Some(filter) = filter {
        builder.parse_filters(filter);
    } else if let Ok(filter) = env::var("RUST_LOG") {
        builder.parse_filters(&filter);
    } else {
        builder.filter_level(log::LevelFilter::Info);
    }
    builder.init();
}
