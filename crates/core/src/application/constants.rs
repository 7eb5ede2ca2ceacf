// Watchdog constants (no magic values)
use std::time::Duration;

/// How often the mount table is checked (15s)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Pause between escalation stages during shutdown (5ms)
pub const DEFAULT_ESCALATION_DELAY: Duration = Duration::from_millis(5);

/// Default location of the live mount table
pub const DEFAULT_MTAB_PATH: &str = "/etc/mtab";

/// Shell used to interpret recovery commands
pub const DEFAULT_SHELL: &str = "sh";
