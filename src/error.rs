use std::io;
use std::path::PathBuf;

/// Error returned when a record cannot be encoded.
#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    #[error("failed to encode record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error while encoding record: {0}")]
    Io(#[from] io::Error),
}

/// Error returned by a writer.
#[derive(thiserror::Error, Debug)]
pub enum WriteError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("writer is closed")]
    Closed,

    #[error("failed to rotate {}: {source}", .path.display())]
    Rotation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Fanout(#[from] FanoutError),
}

/// Per-member failures collected by a fan-out writer.
#[derive(thiserror::Error, Debug)]
#[error("{} of {} writers failed{}", .failures.len(), .total, render_failures(.failures))]
pub struct FanoutError {
    pub total: usize,
    pub failures: Vec<(usize, WriteError)>,
}

fn render_failures(failures: &[(usize, WriteError)]) -> String {
    failures
        .iter()
        .map(|(index, err)| format!("; writer {index}: {err}"))
        .collect()
}

/// Error returned by [`Logger::log`](crate::logger::Logger::log).
#[derive(thiserror::Error, Debug)]
pub enum LogError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Error returned when installing the tracing bridge.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("failed to open log output: {0}")]
    Writer(#[from] WriteError),

    #[error("global subscriber already set: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown log level: {0:?}")]
pub struct ParseLevelError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fanout_error_names_failing_members() {
        let err = FanoutError {
            total: 3,
            failures: vec![(0, WriteError::Closed), (2, WriteError::Closed)],
        };
        assert_eq!(
            err.to_string(),
            "2 of 3 writers failed; writer 0: writer is closed; writer 2: writer is closed"
        );

        let err = WriteError::from(err);
        assert!(err.to_string().starts_with("2 of 3 writers failed; writer 0:"));
        let boxed: Box<dyn std::error::Error> = Box::new(err);
        assert!(boxed.source().is_none());
    }
}
