//! Test logger: forwards to `env_logger` and keeps the messages of the current thread, so a
//! test can check what a pass reported.

use std::{cell::RefCell, sync::OnceLock};

use log::{Level, LevelFilter, Log, Metadata, Record};

struct CapturingLogger {
    inner: env_logger::Logger,
}

thread_local! {
    static RECORDS: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
}

impl Log for CapturingLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        RECORDS.with(|records| {
            records
                .borrow_mut()
                .push((record.level(), record.args().to_string()));
        });
        if self.inner.enabled(record.metadata()) {
            self.inner.log(record);
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

static LOGGER: OnceLock<CapturingLogger> = OnceLock::new();

/// Installs the logger on first use and forgets what the calling thread logged so far.
pub fn init_logger() {
    let logger = LOGGER.get_or_init(|| CapturingLogger {
        inner: env_logger::Builder::from_default_env()
            .is_test(true)
            .build(),
    });
    if log::set_logger(logger).is_ok() {
        log::set_max_level(LevelFilter::Trace);
    }
    RECORDS.with(|records| records.borrow_mut().clear());
}

/// Messages the calling thread logged at `level` since [`init_logger`].
pub fn logged(level: Level) -> Vec<String> {
    RECORDS.with(|records| {
        records
            .borrow()
            .iter()
            .filter(|(logged_level, _)| *logged_level == level)
            .map(|(_, message)| message.clone())
            .collect()
    })
}
