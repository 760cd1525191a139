use chrono::Utc;
use slog::Drain;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;

/// Logs to `<directory>/p4rt_<device_id>_<timestamp>.log`. The directory must exist.
pub fn create_root_logger_for_file(directory: impl AsRef<Path>, device_id: u64) -> io::Result<slog::Logger> {
    let now = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    let log_path = directory
        .as_ref()
        .join(format!("p4rt_{}_{}.log", device_id, now));
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)?;

    let decorator = slog_term::PlainDecorator::new(file);
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    Ok(slog::Logger::root(drain, slog::o!("DeviceId" => device_id)))
}

pub fn create_root_logger_for_stdout(device_id: u64) -> slog::Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).use_file_location().build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    slog::Logger::root(drain, slog::o!("DeviceId" => device_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_logger_creates_a_log_file() {
        let directory = std::env::temp_dir().join(format!("p4rt_logging_test_{}", std::process::id()));
        std::fs::create_dir_all(&directory).unwrap();

        let logger = create_root_logger_for_file(&directory, 7).unwrap();
        slog::info!(logger, "hello");
        drop(logger);

        let files: Vec<_> = std::fs::read_dir(&directory).unwrap().collect();
        assert_eq!(1, files.len());
        std::fs::remove_dir_all(&directory).unwrap();
    }

    #[test]
    fn missing_directory_is_an_error() {
        let directory = std::env::temp_dir().join("p4rt_logging_test_does_not_exist").join("nested");

        assert!(create_root_logger_for_file(&directory, 7).is_err());
    }
}
