// Mount Table Entry Model + line parser
// Format (see fstab(5)): <device> <mountpoint> <fstype> <options>[ <dumpfreq>[ <passno>]]

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use super::error::ParseError;

/// Value stored for options given without `=value` (e.g. `rw`)
pub const FLAG_OPTION_VALUE: &str = "true";

const MIN_FIELDS: usize = 4;
const MAX_FIELDS: usize = 6;

/// One row of the live mount table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountEntry {
    pub device_path: String,
    pub mount_path: String,
    pub file_system: String,
    pub options: HashMap<String, String>,
    pub dump_freq: u32,
    pub pass_no: u32,
}

impl MountEntry {
    /// Value of a mount option, `"true"` for flag-only options
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    pub fn has_option(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }
}

impl FromStr for MountEntry {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        parse_mount_line(line)
    }
}

/// Parse one mount table line
///
/// Fields are separated by single spaces; 4 to 6 fields are accepted.
/// Missing dump frequency / pass number default to 0.
///
/// # Errors
/// - `ParseError::TooFewFields` / `ParseError::TooManyFields` on a bad field count
/// - `ParseError::InvalidNumber` if dump frequency or pass number is not an unsigned integer
///
/// # Example
/// ```
/// use mountmond_core::domain::parse_mount_line;
///
/// let entry = parse_mount_line("/dev/sda1 / ext4 rw,relatime 0 1").unwrap();
/// assert_eq!(entry.mount_path, "/");
/// assert_eq!(entry.option("rw"), Some("true"));
/// assert_eq!(entry.pass_no, 1);
/// ```
pub fn parse_mount_line(line: &str) -> Result<MountEntry, ParseError> {
    let fields: Vec<&str> = line.split(' ').collect();
    if fields.len() > MAX_FIELDS {
        return Err(ParseError::TooManyFields {
            count: fields.len(),
            line: line.to_string(),
        });
    }
    if fields.len() < MIN_FIELDS {
        return Err(ParseError::TooFewFields {
            count: fields.len(),
            line: line.to_string(),
        });
    }

    let dump_freq = match fields.get(4) {
        Some(raw) => parse_number("dump frequency", raw)?,
        None => 0,
    };
    let pass_no = match fields.get(5) {
        Some(raw) => parse_number("pass number", raw)?,
        None => 0,
    };

    Ok(MountEntry {
        device_path: fields[0].to_string(),
        mount_path: fields[1].to_string(),
        file_system: fields[2].to_string(),
        options: parse_options(fields[3]),
        dump_freq,
        pass_no,
    })
}

/// Digits only: `u32::from_str` would also take a leading `+`
fn parse_number(field: &'static str, raw: &str) -> Result<u32, ParseError> {
    let invalid = |source| ParseError::InvalidNumber {
        field,
        value: raw.to_string(),
        source,
    };
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(None));
    }
    raw.parse::<u32>().map_err(|e| invalid(Some(e)))
}

/// Parse `opt1=val1,opt2,opt3=val3` into a map; flag-only options map to `"true"`
pub fn parse_options(opts: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for token in opts.split(',') {
        if token.is_empty() || token == "=" {
            continue;
        }

        match token.split_once('=') {
            Some((key, value)) => out.insert(key.to_string(), value.to_string()),
            None => out.insert(token.to_string(), FLAG_OPTION_VALUE.to_string()),
        };
    }
    out
}
