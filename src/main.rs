use std::path::PathBuf;

use vantage::math::Vector3f;
use vantage::{AppConfig, run};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // every argument is a model to load
    let paths: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();

    let result = run(AppConfig::new(), move |gpu, graphics| {
        for path in &paths {
            match graphics.add_model(gpu, path) {
                Ok(model) => log::info!("{}: volume {:.4}", path.display(), model.volume()),
                Err(err) => log::error!("{}: {err}", path.display()),
            }
        }

        if paths.is_empty() {
            graphics.add_sphere(gpu, 2, 0.25, Vector3f::new(0.0, 0.25, 0.0));
        }
    });

    if let Err(err) = result {
        log::error!("event loop failed: {err}");
        std::process::exit(1);
    }
}
