//! Boot times from the systemd manager properties, read over D-Bus.
//!
//! systemd records a monotonic timestamp (microseconds) for each boot
//! milestone. The firmware and loader timestamps are stored as the time
//! elapsed *before* the kernel started, so they are not directly comparable
//! with the others. The arithmetic below mirrors what `systemd-analyze time`
//! does with the same values, so that both sources agree on a given boot.

use std::time::Duration;

use log::{debug, trace, warn};
use zbus::{
    blocking::{fdo::PropertiesProxy, Connection},
    names::InterfaceName,
};

use super::BootTimeSource;
use crate::{
    error::{Error, Result},
    model::{RetrievalMethod, StageDurations},
    utils::checked_micros,
};

const DESTINATION: &str = "org.freedesktop.systemd1";
const OBJECT_PATH: &str = "/org/freedesktop/systemd1";
const MANAGER_INTERFACE: &str = "org.freedesktop.systemd1.Manager";

// =============================================================================
// Public Interface
// =============================================================================

/// The manager timestamps, in microseconds of the monotonic clock. Zero means
/// the timestamp is not available.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct MonotonicTimestamps {
    pub firmware: u64,
    pub loader: u64,
    pub initrd: u64,
    pub userspace: u64,
    pub finish: u64,
}

impl MonotonicTimestamps {
    /// Derive the stage durations, the way systemd does.
    ///
    /// Fails with [`Error::NotReady`] when the boot has not finished yet, and
    /// with [`Error::MalformedData`] when a duration does not fit in 64-bit
    /// nanoseconds. A stage whose timestamps are missing, or would give a
    /// negative duration, is left at zero.
    pub fn boot_times(&self) -> Result<StageDurations> {
        if self.finish == 0 {
            return Err(Error::NotReady);
        }

        let known = |us: u64| (us > 0).then(|| us);
        let usec = |us: Option<u64>| match us {
            None => Ok(Duration::ZERO),
            Some(us) => checked_micros(us).ok_or_else(|| {
                Error::malformed("systemd timestamps", format!("{}us is out of range", us))
            }),
        };

        let kernel_done = if self.initrd > 0 {
            self.initrd
        } else {
            self.userspace
        };

        let firmware = known(self.firmware);
        let loader = known(self.loader);
        let initrd = known(self.initrd);
        let userspace = known(self.userspace);
        let finish = known(self.finish);

        Ok(StageDurations {
            firmware: usec(firmware.zip(loader).and_then(|(f, l)| f.checked_sub(l)))?,
            loader: usec(loader)?,
            kernel: usec(known(kernel_done))?,
            initrd: usec(initrd.zip(userspace).and_then(|(i, u)| u.checked_sub(i)))?,
            userspace: usec(userspace.zip(finish).and_then(|(u, f)| f.checked_sub(u)))?,
            // Adds rather than subtracts: this is what the manager reports as
            // the total, kept as is so both systemd sources line up.
            total: usec(firmware.zip(finish).and_then(|(f, e)| f.checked_add(e)))?,
        })
    }
}

/// Reads the manager properties from the system bus.
#[derive(Debug, Clone, Default)]
pub struct SystemdDbus {}

impl SystemdDbus {
    pub fn new() -> Self {
        SystemdDbus {}
    }

    /// Fetch the timestamps. Only failing to reach the bus is an error; a
    /// property that cannot be read is left at zero.
    fn timestamps(&self) -> Result<MonotonicTimestamps> {
        let conn = Connection::system().map_err(Error::Connection)?;
        let proxy = PropertiesProxy::builder(&conn)
            .destination(DESTINATION)
            .and_then(|builder| builder.path(OBJECT_PATH))
            .and_then(|builder| builder.build())
            .map_err(Error::Connection)?;
        let interface = InterfaceName::from_static_str_unchecked(MANAGER_INTERFACE);

        let mut ts = MonotonicTimestamps::default();
        for (property, slot) in vec![
            ("FirmwareTimestampMonotonic", &mut ts.firmware),
            ("LoaderTimestampMonotonic", &mut ts.loader),
            ("InitRDTimestampMonotonic", &mut ts.initrd),
            ("UserspaceTimestampMonotonic", &mut ts.userspace),
            ("FinishTimestampMonotonic", &mut ts.finish),
        ] {
            match proxy.get(interface.clone(), property) {
                Ok(value) => match u64::try_from(value) {
                    Ok(value) => *slot = value,
                    Err(e) => warn!("{}: unexpected type: {}", property, e),
                },
                Err(e) => debug!("{} unavailable: {}", property, e),
            }
        }
        trace!("{:?}", ts);
        Ok(ts)
    }
}

impl BootTimeSource for SystemdDbus {
    fn method(&self) -> RetrievalMethod {
        RetrievalMethod::IpcProperty
    }

    fn retrieve(&self) -> Result<StageDurations> {
        self.timestamps()?.boot_times()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn ms(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    #[test]
    fn unfinished_boot_is_not_ready() {
        let ts = MonotonicTimestamps {
            firmware: 4_000_000,
            userspace: 1_000_000,
            ..Default::default()
        };
        assert_eq!(ts.boot_times().unwrap_err().kind(), ErrorKind::NotReady);
    }

    #[test]
    fn full_boot_with_initrd() {
        let ts = MonotonicTimestamps {
            firmware: 5_000_000,
            loader: 1_500_000,
            initrd: 900_000,
            userspace: 2_400_000,
            finish: 9_400_000,
        };
        let times = ts.boot_times().unwrap();
        assert_eq!(times.firmware, ms(3500));
        assert_eq!(times.loader, ms(1500));
        assert_eq!(times.kernel, ms(900));
        assert_eq!(times.initrd, ms(1500));
        assert_eq!(times.userspace, ms(7000));
        assert_eq!(times.total, ms(14400));
    }

    #[test]
    fn kernel_ends_at_userspace_without_initrd() {
        let ts = MonotonicTimestamps {
            userspace: 1_200_000,
            finish: 3_000_000,
            ..Default::default()
        };
        let times = ts.boot_times().unwrap();
        assert_eq!(times.kernel, ms(1200));
        assert_eq!(times.initrd, Duration::ZERO);
        assert_eq!(times.userspace, ms(1800));
        assert_eq!(times.firmware, Duration::ZERO);
        assert_eq!(times.loader, Duration::ZERO);
        assert_eq!(times.total, Duration::ZERO);
    }

    #[test]
    fn negative_differences_are_unavailable() {
        let ts = MonotonicTimestamps {
            firmware: 1_000_000,
            loader: 2_000_000,
            initrd: 3_000_000,
            userspace: 2_500_000,
            finish: 2_000_000,
        };
        let times = ts.boot_times().unwrap();
        assert_eq!(times.firmware, Duration::ZERO);
        assert_eq!(times.initrd, Duration::ZERO);
        assert_eq!(times.userspace, Duration::ZERO);
        assert_eq!(times.loader, ms(2000));
    }

    #[test]
    fn timestamps_beyond_nanosecond_range_are_malformed() {
        let ts = MonotonicTimestamps {
            userspace: 1_000_000,
            finish: u64::MAX / 2,
            ..Default::default()
        };
        assert_eq!(ts.boot_times().unwrap_err().kind(), ErrorKind::MalformedData);
    }
}
