use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    config::{Appender, Config, Root},
};

/// Initializes console logging for integration tests.
pub fn init_default_logging() {
    let stdout = ConsoleAppender::builder().build();
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Debug))
        .unwrap();

    // Tests in one binary share the global logger; only the first
    // initialization wins.
    let _ = log4rs::init_config(config);
}
