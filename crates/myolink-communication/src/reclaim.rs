//! Forced reclaim of busy serial ports
//!
//! When the sensor port is still held by a stale process (a crashed
//! previous instance, a forgotten terminal session), the link manager
//! asks a [`PortReclaimer`] to free it. The capability is injected so
//! the platform-specific lookup stays out of the connection logic and
//! tests can substitute a mock.

use myolink_core::DeviceError;

/// Frees a serial port held by another process.
pub trait PortReclaimer: Send + Sync {
    /// Locate whichever process holds `port` open and terminate it.
    ///
    /// Returns `Ok(())` when no owner is found; the busy state may have
    /// cleared on its own between the probe and the reclaim.
    fn reclaim(&self, port: &str) -> Result<(), DeviceError>;
}

/// Reclaimer backed by the host OS process table.
///
/// On Unix hosts the owner is located with `lsof` and terminated with
/// `kill`. Other platforms report the reclaim as unsupported and the
/// busy port propagates as a connection failure.
pub struct OsPortReclaimer;

#[cfg(unix)]
impl PortReclaimer for OsPortReclaimer {
    fn reclaim(&self, port: &str) -> Result<(), DeviceError> {
        let output = std::process::Command::new("lsof")
            .args(["-t", port])
            .output()
            .map_err(|e| DeviceError::ReclaimFailed {
                port: port.to_string(),
                reason: format!("failed to run lsof: {}", e),
            })?;

        // lsof exits non-zero when nothing holds the file open
        let stdout = String::from_utf8_lossy(&output.stdout);
        let owners = parse_pid_list(&stdout, std::process::id());
        if owners.is_empty() {
            tracing::debug!("No process found holding {}", port);
            return Ok(());
        }

        for pid in owners {
            tracing::warn!("Terminating process {} holding {}", pid, port);
            let killed = std::process::Command::new("kill")
                .args(["-9", &pid.to_string()])
                .status()
                .map_err(|e| DeviceError::ReclaimFailed {
                    port: port.to_string(),
                    reason: format!("failed to run kill: {}", e),
                })?;
            if !killed.success() {
                return Err(DeviceError::ReclaimFailed {
                    port: port.to_string(),
                    reason: format!("kill -9 {} exited with {}", pid, killed),
                });
            }
        }
        Ok(())
    }
}

#[cfg(not(unix))]
impl PortReclaimer for OsPortReclaimer {
    fn reclaim(&self, port: &str) -> Result<(), DeviceError> {
        Err(DeviceError::ReclaimFailed {
            port: port.to_string(),
            reason: "forced port reclaim is not supported on this platform".to_string(),
        })
    }
}

/// Parse the PID-per-line output of `lsof -t`, dropping our own PID.
fn parse_pid_list(stdout: &str, own_pid: u32) -> Vec<u32> {
    stdout
        .lines()
        .filter_map(|line| line.trim().parse::<u32>().ok())
        .filter(|pid| *pid != own_pid)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pid_list() {
        assert_eq!(parse_pid_list("1234\n5678\n", 1), vec![1234, 5678]);
        assert_eq!(parse_pid_list("  1234  \n", 1), vec![1234]);
        assert_eq!(parse_pid_list("", 1), Vec::<u32>::new());
        assert_eq!(parse_pid_list("garbage\n42\n", 1), vec![42]);
    }

    #[test]
    fn test_parse_pid_list_skips_own_pid() {
        assert_eq!(parse_pid_list("1234\n42\n", 42), vec![1234]);
    }
}
