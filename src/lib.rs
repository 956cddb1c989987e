pub mod config;
pub mod env;
pub mod error;
pub mod formatter;
pub mod init;
pub mod layer;
pub mod logger;
pub mod record;
pub mod sink;
pub mod timefmt;
pub mod writer;

pub use config::LoggerConfig;
pub use error::{FanoutError, FormatError, InitError, LogError, WriteError};
pub use formatter::{Format, FormatKind, FormatOptions, Formatter};
pub use init::{init_from_env, init_tracing};
pub use layer::RecordLayer;
pub use logger::Logger;
pub use record::{Attr, Level, Record, Source, Value};
pub use sink::Sink;
pub use timefmt::{TimeLayout, Timezone};
pub use writer::{RotationFallback, RotationPolicy, Writer};
