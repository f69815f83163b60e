//! Constants for RcGuard Core
//!
//! Defaults for the timing monitor, grouped by the component that uses them.
//! Most of these can be overridden through `NodeConfig`. The alert texts are
//! fixed.

// ===== TIMING =====

/// Deviation from the running average, in milliseconds, that counts as an
/// anomaly. Compared with strict `>`.
pub const DEFAULT_THRESHOLD_MS: u64 = 25;

/// Running average value meaning "no interval seen yet".
///
/// The first measured interval seeds the average directly.
pub const UNINITIALIZED_AVERAGE_MS: u64 = 0;

// ===== QUEUE =====

/// Default capacity of the edge -> publisher hand-off queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// How often a blocked `put`/`take` re-checks its cancellation token.
pub const CANCEL_POLL_INTERVAL_MS: u64 = 5;

// ===== PUBLISHING =====

/// Pause after each publish to let other threads run.
pub const DEFAULT_PUBLISH_YIELD_MS: u64 = 1;

/// Channel the status alerts go out on.
pub const DEFAULT_STATUS_TOPIC: &str = "robocore/status";

/// Node name, also used as the alert `name` field.
pub const DEFAULT_NODE_NAME: &str = "gpiotrigger";

// ===== ALERT CONTENT =====

/// Fixed alert message. Diagnostic text goes in the annotations.
pub const ALERT_MESSAGE: &str = "Attention!";

/// Annotation used when no alert file was configured.
pub const DEFAULT_ALERT_LINE: &str = "Default GPIO event message";

/// Annotation used when the configured alert file could not be read.
pub const MISSING_ALERT_LINE: &str = "Cannot find alert file for GPIO Listener";

/// Lines in the alert file starting with this are skipped.
pub const DEFAULT_COMMENT_DELIMITER: &str = "#";

/// Startup remapping that names the alert file (`__alertfile:=path`).
pub const ALERT_FILE_REMAP: &str = "__alertfile";

/// Startup remapping that renames the node (`__name:=node`).
pub const NODE_NAME_REMAP: &str = "__name";

// ===== PINS (cobbler numbering) =====

/// Input line watched for the comparator trip.
pub const DEFAULT_INPUT_PIN: u8 = 22;

/// Output line that charges/discharges the capacitor.
pub const DEFAULT_OUTPUT_PIN: u8 = 23;
