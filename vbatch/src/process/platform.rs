//! Platform-specific process plumbing.

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Apply the Windows `CREATE_NO_WINDOW` flag so spawned encoders do not pop
/// console windows. On non-Windows targets this is a no-op.
pub trait NoWindowExt {
    fn no_window(&mut self);
}

impl NoWindowExt for tokio::process::Command {
    fn no_window(&mut self) {
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            self.as_std_mut().creation_flags(CREATE_NO_WINDOW);
        }
    }
}

/// Suspend a process without terminating it. Returns `false` when the
/// operation is unsupported or the signal could not be delivered.
#[cfg(unix)]
pub fn suspend_process(pid: u32) -> bool {
    unsafe { libc::kill(pid as libc::pid_t, libc::SIGSTOP) == 0 }
}

/// Continue a previously suspended process.
#[cfg(unix)]
pub fn resume_process(pid: u32) -> bool {
    unsafe { libc::kill(pid as libc::pid_t, libc::SIGCONT) == 0 }
}

#[cfg(not(unix))]
pub fn suspend_process(_pid: u32) -> bool {
    tracing::warn!("process suspension is not supported on this platform");
    false
}

#[cfg(not(unix))]
pub fn resume_process(_pid: u32) -> bool {
    tracing::warn!("process resumption is not supported on this platform");
    false
}
