use env_logger::{Builder, Env};

/// Diagnostics go to stderr through `log`; `RUST_LOG` wins over `level`.
pub fn init_logger(level: &str) {
    let env = Env::default().default_filter_or(level);
    let result = Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .try_init();
    if let Err(err) = result {
        eprintln!("⚠️  Logger already initialised: {}", err);
    }
}
