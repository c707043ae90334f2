use std::path::PathBuf;

const DEFAULT_SETTINGS_PATH: &str = "markerwatch.json";

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let settings_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH));

    let settings = match markerwatch_lib::settings::load_settings(&settings_path) {
        Ok(settings) => settings,
        Err(error) => {
            tracing::error!("{error}");
            std::process::exit(1);
        }
    };

    if let Err(error) = markerwatch_lib::run(settings).await {
        tracing::error!("{error}");
        std::process::exit(1);
    }
}
