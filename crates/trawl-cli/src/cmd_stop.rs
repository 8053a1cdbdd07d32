use std::path::Path;

use trawl_conductor::runner::status_file::read_status;
use trawl_store::StorePaths;

pub fn execute(paths: &StorePaths) -> anyhow::Result<()> {
    if request_stop(paths)? {
        println!("Stop requested; the session will wind down within a second.");
    } else {
        println!("No active session.");
    }
    Ok(())
}

/// Drop the STOP marker if a session looks active. Returns whether it did.
fn request_stop(paths: &StorePaths) -> anyhow::Result<bool> {
    if !read_status(&paths.status_json)?.active {
        return Ok(false);
    }
    touch(&paths.stop_request)?;
    Ok(true)
}

fn touch(path: &Path) -> anyhow::Result<()> {
    trawl_store::write_atomic(path, b"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use trawl_conductor::runner::status_file::write_status;
    use trawl_conductor::SessionState;

    #[test]
    fn idle_session_gets_no_marker() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = StorePaths::discover(tmp.path());
        assert!(!request_stop(&paths).unwrap());
        assert!(!paths.stop_request.exists());
    }

    #[test]
    fn active_session_gets_marker() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = StorePaths::discover(tmp.path());
        let state = SessionState::begin(1, vec!["https://fb.test/groups/a".into()]).unwrap();
        write_status(&paths.status_json, &state).unwrap();
        assert!(request_stop(&paths).unwrap());
        assert!(paths.stop_request.exists());
    }
}
