use chrono::Utc;
use log_pipeline::{
    Formatter, Level, Logger, Record, RotationPolicy, Writer,
};

/// Writes enough records to trigger a few rotations of a small file and
/// lists the resulting backups.
fn main() {
    let dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string());
    let path = std::path::Path::new(&dir).join("demo.log");

    let policy = RotationPolicy::default()
        .with_max_size(4 * 1024)
        .with_max_backups(3)
        .with_compress(true);

    let writer = Writer::multi(vec![
        Writer::stdout(),
        Writer::rotating(&path, policy).expect("failed to open log file"),
    ]);
    let logger = Logger::new(Formatter::json(), writer).with_level(Level::Debug);

    for i in 0..200_i64 {
        let record = Record::new(Utc::now(), Level::Info, "tick")
            .with_attr("iteration", i)
            .with_attr("payload", "x".repeat(32));
        if let Err(e) = logger.log(&record) {
            eprintln!("log failed: {}", e);
        }
    }
    logger.close().expect("close");

    if let Ok(entries) = std::fs::read_dir(&dir) {
        for entry in entries.flatten() {
            println!("{}", entry.path().display());
        }
    }
}
