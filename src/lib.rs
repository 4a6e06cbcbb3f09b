pub use crate::archiver::database::{
    chats::ChatRow,
    events::{
        EventKind, EventRecord, EventRow, MemberPayload, MessagePinnedPayload, ServiceWrite,
        TitleChangedPayload,
    },
    messages::{MediaAttributes, MessageRecord, MessageRow, MessageType},
    users::UserRow,
    Database, DatabaseError,
};
pub use crate::archiver::error::{ArchiverError, Result};
pub use crate::archiver::event_processor::{IngestFailure, IngestOutcome, IngestReport, RunSummary};
pub use crate::archiver::forward_origin::ForwardInfo;
pub use crate::archiver::media::{
    download::{MediaDownloader, RemoteFile},
    MediaExtract,
};
pub use crate::archiver::store::Store;
pub use crate::archiver::{Archiver, ArchiverConfig};
pub use crate::types::*;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::EnvFilter, fmt::Layer, prelude::*, registry::Registry};

use std::sync::{Mutex, OnceLock};

mod archiver;
mod types;

static TRACING_GUARDS: OnceLock<Mutex<Option<(WorkerGuard, WorkerGuard)>>> = OnceLock::new();
static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs stdout and daily-rolling file logging. Only the first call has any effect.
pub fn init_tracing(logs_dir: &std::path::Path) {
    TRACING_INIT.get_or_init(|| {
        let file_appender = match tracing_appender::rolling::RollingFileAppender::builder()
            .rotation(tracing_appender::rolling::Rotation::DAILY)
            .filename_prefix("chat-archiver")
            .filename_suffix("log")
            .build(logs_dir)
        {
            Ok(appender) => appender,
            Err(e) => {
                eprintln!("Failed to create log file appender in {:?}: {}", logs_dir, e);
                return;
            }
        };

        let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);
        let (non_blocking_stdout, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());

        TRACING_GUARDS
            .set(Mutex::new(Some((file_guard, stdout_guard))))
            .ok();

        let stdout_layer = Layer::new()
            .with_writer(non_blocking_stdout)
            .with_ansi(true)
            .with_target(true);

        let file_layer = Layer::new()
            .with_writer(non_blocking_file)
            .with_ansi(false)
            .with_target(true);

        // A global subscriber may already be installed by the host application
        Registry::default()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .with(stdout_layer)
            .with(file_layer)
            .try_init()
            .ok();
    });
}
