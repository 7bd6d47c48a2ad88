use physics_sandbox::cli::CliOverrides;
use physics_sandbox::run_with_overrides;
use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("physics_sandbox=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = match CliOverrides::parse_from_env() {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::error!("[cli] {err}");
            std::process::exit(2);
        }
    };
    let config_path = cli.config_path().map(|path| path.to_path_buf());
    if let Err(err) = run_with_overrides(config_path.as_deref(), cli.into_config_overrides()) {
        tracing::error!("Application error: {err:?}");
        std::process::exit(1);
    }
}
