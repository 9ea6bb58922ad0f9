use tokio::process::Child;

/// Asks the child to terminate, then makes sure it is gone.
#[cfg(unix)]
pub async fn kill_graceful(child: &mut Child) -> std::io::Result<()> {
    if let Some(pid) = child.id() {
        // SAFETY: plain signal delivery to a pid we spawned and still own.
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }
    }
    child.kill().await
}

#[cfg(not(unix))]
pub async fn kill_graceful(child: &mut Child) -> std::io::Result<()> {
    child.kill().await
}
