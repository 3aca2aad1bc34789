//! Project-wide constants.

use std::time::Duration;

pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
pub const REPO: &str = env!("CARGO_PKG_REPOSITORY");

/// Sliding window for per-user submission limits.
pub const DEFAULT_RATE_WINDOW: Duration = Duration::from_secs(3600);

/// Accepted submissions per user within [`DEFAULT_RATE_WINDOW`].
pub const DEFAULT_MAX_REQUESTS: usize = 5;

/// Tasks allowed in flight across all users.
pub const DEFAULT_MAX_GLOBAL: usize = 10;

/// Tasks allowed in flight per user.
pub const DEFAULT_MAX_PER_IDENTITY: usize = 1;

/// Bounds only the "did the worker accept the job" round trip.
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Path the worker posts completion notifications to.
pub const CALLBACK_PATH: &str = "/webhook/result";

pub const HEALTH_PATH: &str = "/health";

/// Largest image or video accepted into a job.
pub const MAX_MEDIA_BYTES: usize = 20 * 1024 * 1024;

/// Largest finished video accepted back from the worker.
pub const MAX_VIDEO_BYTES: usize = 200 * 1024 * 1024;

/// Request body cap on the callback route: a base64 video of
/// [`MAX_VIDEO_BYTES`] plus 1 MiB for the other fields.
pub const MAX_CALLBACK_BYTES: usize = MAX_VIDEO_BYTES.div_ceil(3) * 4 + 1024 * 1024;

/// Rejection bodies from the worker are cut to this many characters.
pub const MAX_ERROR_BODY_CHARS: usize = 500;

/// Render a wait as whole seconds, rounding any fraction up.
pub fn format_wait(wait: Duration) -> String {
    let mut secs = wait.as_secs();
    if wait.subsec_nanos() > 0 {
        secs += 1;
    }
    format!("{secs}s")
}

/// Truncate to at most `max` characters, respecting char boundaries.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
