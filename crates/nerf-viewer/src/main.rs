//! Entry point for the rasterized NeRF viewer.

use anyhow::Result;
use clap::Parser;
use nerf_viewer::app::App;
use nerf_assets::SceneCatalog;
use std::{path::PathBuf, sync::Arc};
use winit::{
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

#[derive(Parser)]
#[command(name = "nerf_viewer", about = "Real-time rasterized NeRF viewer")]
struct Args {
    /// External scene map JSON; the embedded catalog is used when omitted.
    #[arg(long)]
    scene_map: Option<PathBuf>,

    /// Scene to render, overriding the map's target_model.
    #[arg(long)]
    target: Option<String>,

    /// Root directory containing the scene asset folders.
    #[arg(long, default_value = "assets")]
    assets: PathBuf,
}

/// Configuration and asset errors have no degraded mode; log and exit.
fn fatal(err: anyhow::Error) -> ! {
    log::error!("{:#}", err);
    std::process::exit(1);
}

fn main() -> Result<()> {
    // Initialize logging; default to "info" if RUST_LOG is unset.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let catalog = match &args.scene_map {
        Some(path) => SceneCatalog::from_file(path),
        None => SceneCatalog::embedded(),
    }
    .unwrap_or_else(|err| fatal(err));

    let scene = catalog
        .resolve(args.target.as_deref())
        .unwrap_or_else(|err| fatal(err));
    log::info!("Target scene: {}", scene.name);

    let [width, height] = scene.fixed_viewport.unwrap_or([1280, 720]);

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("NeRF Viewer")
            .with_inner_size(winit::dpi::LogicalSize::new(width, height))
            .build(&event_loop)?,
    );

    // Initialize the application (async → sync).
    let mut app = pollster::block_on(App::new(window.clone(), scene, args.assets))
        .unwrap_or_else(|err| fatal(err));

    event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => {
                // Forward events to the app; handle unconsumed window events.
                if !app.handle_event(&window, &event) {
                    match event {
                        WindowEvent::CloseRequested => elwt.exit(),
                        WindowEvent::KeyboardInput { event, .. } => {
                            if event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                                elwt.exit();
                            }
                        }
                        WindowEvent::RedrawRequested => match app.render(&window) {
                            Ok(_) => {}
                            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                                app.resize(app.renderer.gfx.size);
                            }
                            Err(wgpu::SurfaceError::OutOfMemory) => {
                                log::error!("GPU out of memory, exiting.");
                                elwt.exit();
                            }
                            Err(e) => log::error!("Render error: {:?}", e),
                        },
                        _ => {}
                    }
                }
            }
            Event::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    })?;

    Ok(())
}
