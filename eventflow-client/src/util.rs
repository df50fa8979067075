use chrono::Utc;
use rand::{distributions::Alphanumeric, thread_rng, Rng};

/// Generates an uppercase alphanumeric token, used for invite codes
pub fn random_code(length: usize) -> String {
    let mut rng = thread_rng();

    std::iter::repeat(())
        .map(|_| rng.sample(Alphanumeric) as char)
        .map(|c| c.to_ascii_uppercase())
        .take(length)
        .collect()
}

/// Today's date in `YYYY-MM-DD` form
pub fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// The current time in milliseconds since the epoch
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
