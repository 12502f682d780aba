/// Resource limits applied to a spawned process before exec
///
/// `apply` runs inside `pre_exec`, between fork and exec, so it may only use
/// async-signal-safe calls: no allocation, no locks, no logging.
use crate::config::types::Limits;

#[cfg(all(target_os = "linux", target_env = "gnu"))]
type Resource = libc::__rlimit_resource_t;
#[cfg(all(unix, not(all(target_os = "linux", target_env = "gnu"))))]
type Resource = libc::c_int;

/// rlimit set for one step. `None` leaves the inherited limit untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceLimits {
    /// RLIMIT_CPU soft limit; hard limit is one second above it
    pub cpu_seconds: Option<u64>,
    /// RLIMIT_AS, falling back to RLIMIT_DATA where AS is rejected
    pub address_space_bytes: Option<u64>,
    /// RLIMIT_FSIZE
    pub file_size_bytes: Option<u64>,
    /// RLIMIT_CORE = 0
    pub disable_core_dumps: bool,
}

impl ResourceLimits {
    /// No limits at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// Limits for the run step of a job.
    ///
    /// `limit_address_space` is false for runtimes that bound their own heap;
    /// the output file may grow to one byte past the cap so overflow is
    /// observable from the file size.
    pub fn for_run(limits: &Limits, limit_address_space: bool) -> Self {
        Self {
            cpu_seconds: Some(limits.cpu_time_seconds.max(1)),
            address_space_bytes: limit_address_space.then_some(limits.memory_bytes),
            file_size_bytes: Some(limits.output_byte_cap.saturating_add(1)),
            disable_core_dumps: true,
        }
    }

    /// Compile steps only get core dumps disabled.
    pub fn for_compile() -> Self {
        Self {
            disable_core_dumps: true,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply the limits to the calling process.
    #[cfg(unix)]
    pub fn apply(&self) -> std::io::Result<()> {
        if let Some(cpu) = self.cpu_seconds {
            set_limit(libc::RLIMIT_CPU, cpu, cpu.saturating_add(1))?;
        }

        if let Some(bytes) = self.address_space_bytes {
            if let Err(err) = set_limit(libc::RLIMIT_AS, bytes, bytes) {
                if err.raw_os_error() != Some(libc::EINVAL) {
                    return Err(err);
                }
                set_limit(libc::RLIMIT_DATA, bytes, bytes)?;
            }
        }

        if let Some(bytes) = self.file_size_bytes {
            set_limit(libc::RLIMIT_FSIZE, bytes, bytes)?;
        }

        if self.disable_core_dumps {
            set_limit(libc::RLIMIT_CORE, 0, 0)?;
        }

        Ok(())
    }

    #[cfg(not(unix))]
    pub fn apply(&self) -> std::io::Result<()> {
        Ok(())
    }
}

/// setrlimit with both values clamped to the current hard limit, since an
/// unprivileged process may only lower it.
#[cfg(unix)]
fn set_limit(resource: Resource, soft: u64, hard: u64) -> std::io::Result<()> {
    let mut current = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    if unsafe { libc::getrlimit(resource, &mut current) } != 0 {
        return Err(std::io::Error::last_os_error());
    }

    let ceiling = current.rlim_max;
    let clamp = |value: u64| -> libc::rlim_t {
        let value = value as libc::rlim_t;
        if ceiling != libc::RLIM_INFINITY && value > ceiling {
            ceiling
        } else {
            value
        }
    };

    let limit = libc::rlimit {
        rlim_cur: clamp(soft),
        rlim_max: clamp(hard),
    };
    if unsafe { libc::setrlimit(resource, &limit) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}
