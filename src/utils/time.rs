/*
 * Conversion between the OS file time (100 ns ticks since 1601-01-01 UTC,
 * split in two 32-bit halves) and `SystemTime`. Precision is whole seconds.
 */

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Ticks between 1601-01-01 and 1970-01-01.
const EPOCH_DIFFERENCE: i128 = 116_444_736_000_000_000;
const TICKS_PER_SECOND: i128 = 10_000_000;

/// Layout mirror of `FILETIME`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileTime {
    pub low: u32,
    pub high: u32,
}

impl FileTime {
    pub fn from_ticks(ticks: u64) -> Self {
        Self {
            low: ticks as u32,
            high: (ticks >> 32) as u32,
        }
    }

    pub fn ticks(self) -> u64 {
        u64::from(self.low) | (u64::from(self.high) << 32)
    }

    /// Truncates `time` to whole seconds. Times outside the file time range
    /// saturate to its first or last tick.
    pub fn from_system_time(time: SystemTime) -> Self {
        let secs = match time.duration_since(UNIX_EPOCH) {
            Ok(after) => i128::from(after.as_secs()),
            Err(before) => -i128::from(before.duration().as_secs()),
        };
        let ticks = secs * TICKS_PER_SECOND + EPOCH_DIFFERENCE;
        Self::from_ticks(ticks.clamp(0, i128::from(u64::MAX)) as u64)
    }

    /// `None` when the platform's `SystemTime` cannot represent this instant.
    pub fn to_system_time(self) -> Option<SystemTime> {
        // Every u64 tick count fits in i128.
        let secs = (i128::from(self.ticks()) - EPOCH_DIFFERENCE) / TICKS_PER_SECOND;
        let offset = Duration::from_secs(u64::try_from(secs.unsigned_abs()).ok()?);
        if secs >= 0 {
            UNIX_EPOCH.checked_add(offset)
        } else {
            UNIX_EPOCH.checked_sub(offset)
        }
    }
}

impl From<SystemTime> for FileTime {
    fn from(time: SystemTime) -> Self {
        Self::from_system_time(time)
    }
}

impl TryFrom<FileTime> for SystemTime {
    type Error = crate::error::PlatformError;

    fn try_from(ft: FileTime) -> Result<Self, Self::Error> {
        ft.to_system_time().ok_or_else(|| {
            crate::error::PlatformError::invalid_argument(format!(
                "File time {:#x} is out of the system time range.",
                ft.ticks()
            ))
        })
    }
}
