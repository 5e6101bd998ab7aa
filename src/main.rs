/// Reload host executable
/// Loads the configured module, watches the config file as a resource and
/// drives frames until `max_frames` is reached (or forever).

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use reload_engine::{AppContext, Application, Engine, EngineConfig, NativePlatform, ResourceId, TomlResource};

/// Keeps the config file resident and reports edits to it
struct ConfigMonitor {
    path: PathBuf,
    resource: Option<ResourceId>,
}

impl ConfigMonitor {
    fn new(path: PathBuf) -> Self {
        Self { path, resource: None }
    }
}

impl Application for ConfigMonitor {
    fn name(&self) -> &str {
        "config-monitor"
    }

    fn start(&mut self, ctx: &mut AppContext<'_>) {
        let name = self.path.display().to_string();
        let id = match ctx.resources.find_or_create_resource::<TomlResource>(&name) {
            Ok(id) => id,
            Err(e) => {
                log::error!("[ConfigMonitor::start] {}", e);
                return;
            }
        };

        if let Err(e) = ctx.resources.use_load(id) {
            log::error!("[ConfigMonitor::start] {}", e);
            return;
        }
        if let Err(e) = ctx.resources.start_reload_on_file_changed(id, &self.path) {
            log::warn!("[ConfigMonitor::start] Not watching {}: {}", name, e);
        }
        self.resource = Some(id);
    }

    fn after_reload(&mut self, ctx: &mut AppContext<'_>) {
        log::info!("Module swapped at frame {}", ctx.engine.frame());
    }

    fn shutdown(&mut self, ctx: &mut AppContext<'_>) {
        if let Some(id) = self.resource.take() {
            if let Err(e) = ctx.resources.release_unuse(id) {
                log::warn!("[ConfigMonitor::shutdown] {}", e);
            }
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("reload.toml"));

    let config = if config_path.exists() {
        EngineConfig::load(&config_path)
            .with_context(|| format!("Failed to load config {}", config_path.display()))?
    } else {
        log::warn!("No config at {}, using defaults", config_path.display());
        EngineConfig::default()
    };
    let frame_interval = config.frame_interval();
    let max_frames = config.max_frames;

    let mut engine = Engine::new(config, NativePlatform::new());
    if config_path.exists() {
        engine.add_application(Box::new(ConfigMonitor::new(config_path)));
    }
    engine.startup().context("Engine startup failed")?;

    loop {
        let started = Instant::now();

        match engine.update() {
            Ok(report) => {
                if report.resources_reloaded > 0 {
                    log::info!(
                        "Frame {}: reloaded {} resource(s)",
                        report.frame,
                        report.resources_reloaded
                    );
                }
                if let Some(e) = report.module_error {
                    log::warn!("Frame {}: running without module: {}", report.frame, e);
                }
            }
            Err(e) => log::error!("Frame {} failed: {}", engine.context().frame(), e),
        }

        if max_frames > 0 && engine.context().frame() >= max_frames {
            break;
        }

        if let Some(remaining) = frame_interval.checked_sub(started.elapsed()) {
            std::thread::sleep(remaining);
        }
    }

    engine.shutdown().context("Engine shutdown failed")?;
    Ok(())
}
