use log::info;

/// Sets up `env_logger`. `RUST_LOG` wins over the default level, which is
/// `warn`, or `debug` when `verbose` is set.
pub fn initialize_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));
    builder.format_timestamp_secs().format_module_path(true);

    if builder.try_init().is_ok() {
        info!("Logger initialized");
    }
}

// Helper method for parsing tags
pub fn parse_tags(tags: Option<String>) -> Vec<String> {
    tags.map(|t| {
        t.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
    .unwrap_or_default()
}
