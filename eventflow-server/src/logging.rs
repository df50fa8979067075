use colored::{ColoredString, Colorize};
use log::Level;

/// Sets up the log output: a timestamp, a level badge, a colored column
/// naming the originating crate, and the message. Workspace crates log
/// from info up; everything else only surfaces warnings and errors.
pub fn init_logger() {
    fern::Dispatch::new()
        .format(|out, message, record| {
            let now = chrono::Local::now();

            out.finish(format_args!(
                "{} {} {:^8} {}",
                now.format("%H:%M:%S").to_string().bright_black(),
                level_badge(record.level()),
                crate_label(record.target()),
                message
            ))
        })
        .filter(|meta| {
            let threshold = if is_local(meta.target()) {
                Level::Info
            } else {
                Level::Warn
            };

            meta.level() <= threshold
        })
        .chain(std::io::stdout())
        .apply()
        .expect("logging is initialized")
}

fn crate_of(target: &str) -> &str {
    target.split("::").next().unwrap_or_default()
}

fn is_local(target: &str) -> bool {
    matches!(crate_of(target), "eventflow_server" | "eventflow_core")
}

fn crate_label(target: &str) -> ColoredString {
    match crate_of(target) {
        "eventflow_server" => "SERVER".bright_green(),
        "eventflow_core" => "CORE".blue(),
        other => other.bright_black(),
    }
}

fn level_badge(level: Level) -> ColoredString {
    match level {
        Level::Error => "ERROR".red().bold(),
        Level::Warn => " WARN".yellow().bold(),
        Level::Info => " INFO".green(),
        Level::Debug => "DEBUG".dimmed(),
        Level::Trace => "TRACE".normal(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_local_targets() {
        assert!(is_local("eventflow_server::routes"));
        assert!(is_local("eventflow_core::mirror"));
        assert!(!is_local("sqlx::query"));
        assert!(!is_local("hyper"));
    }
}
