use slog::{o, Drain, Logger};
use slog_async::OverflowStrategy;

const ASYNC_CHAN_SIZE: usize = 8192;

/// Standard stdout logger: terminal formatting behind an async drain that
/// blocks on overflow so no step output is ever dropped.
pub fn new_stdout_logger() -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain)
        .chan_size(ASYNC_CHAN_SIZE)
        .overflow_strategy(OverflowStrategy::Block)
        .build()
        .fuse();
    Logger::root(drain, o!())
}

pub fn new_discard_logger() -> Logger {
    Logger::root(slog::Discard, o!())
}
