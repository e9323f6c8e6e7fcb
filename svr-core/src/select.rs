//! Newest-bundle selection
//!
//! Remote keys look like `<prefix>/<folder>-<epochMillis>-secrets.tar.gz`.
//! The creation instant is recovered from the key's basename: split on `-`
//! and parse the second segment as integer epoch milliseconds. A key whose
//! second segment is not numeric fails the whole selection rather than
//! competing with a bogus value. Ties on the timestamp are broken by the
//! lexicographically greatest key so the result is deterministic.

use crate::{Result, SvrError};

/// One remote bundle candidate, with its embedded creation instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub key: String,
    pub size: i64,
    pub timestamp_millis: i64,
}

impl RemoteEntry {
    /// Basename of the remote key.
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

/// Extract the epoch-millisecond timestamp embedded in a remote key.
pub fn parse_embedded_millis(key: &str) -> Result<i64> {
    let basename = key.rsplit('/').next().unwrap_or(key);
    let segment = basename
        .split('-')
        .nth(1)
        .ok_or_else(|| SvrError::MalformedKey(key.to_string()))?;
    segment
        .parse::<i64>()
        .map_err(|_| SvrError::MalformedKey(key.to_string()))
}

/// Pick the newest bundle out of a remote listing.
///
/// # Errors
/// * `NoRemoteObjects` if the listing is empty
/// * `MalformedKey` if any key does not embed a numeric timestamp
pub fn newest_bundle<I>(objects: I) -> Result<RemoteEntry>
where
    I: IntoIterator<Item = (String, i64)>,
{
    let mut newest: Option<RemoteEntry> = None;
    for (key, size) in objects {
        let timestamp_millis = parse_embedded_millis(&key)?;
        let entry = RemoteEntry {
            key,
            size,
            timestamp_millis,
        };
        let wins = match &newest {
            None => true,
            Some(current) => {
                (entry.timestamp_millis, entry.key.as_str())
                    > (current.timestamp_millis, current.key.as_str())
            }
        };
        if wins {
            newest = Some(entry);
        }
    }
    newest.ok_or(SvrError::NoRemoteObjects)
}
