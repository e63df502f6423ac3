//! Authentication facade: one optional logged-in user whose uid/gid stamp
//! every inode the directory and file engines create. Mutating commands
//! refuse to run without an active session.

use tracing::info;

use crate::error::{FsError, FsResult};
use crate::ext2::fs::Ext2Fs;
use crate::ext2::users::UsersFile;

#[derive(Debug, Clone)]
pub struct ActiveUser {
    pub username: String,
    pub group: String,
    pub uid: i32,
    pub gid: i32,
    pub mount_id: String,
}

/// `LOGGED_OUT -> LOGGED_IN` via `login`, back via `logout`.
#[derive(Debug, Default)]
pub struct Session {
    current: Option<ActiveUser>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    /// The logged-in user, or `Unauthorized` for commands that need one.
    pub fn active(&self) -> FsResult<&ActiveUser> {
        self.current.as_ref().ok_or(FsError::Unauthorized)
    }

    /// Match credentials against `/users.txt` on the mounted volume.
    pub fn login(
        &mut self,
        fs: &Ext2Fs,
        username: &str,
        password: &str,
        mount_id: &str,
    ) -> FsResult<()> {
        if let Some(active) = &self.current {
            return Err(FsError::AlreadyExists(format!(
                "user '{}' is already logged in",
                active.username
            )));
        }
        let users = UsersFile::load(fs)?;
        let record = users
            .find_user(username)
            .filter(|u| u.password == password)
            .ok_or_else(|| {
                FsError::NotFound(format!("no user '{username}' with that password"))
            })?;
        let gid = users
            .find_group(&record.group)
            .map(|g| g.gid)
            .unwrap_or(record.uid);
        self.current = Some(ActiveUser {
            username: record.name.clone(),
            group: record.group.clone(),
            uid: record.uid,
            gid,
            mount_id: mount_id.to_string(),
        });
        info!(username, mount_id, "session started");
        Ok(())
    }

    pub fn logout(&mut self) -> FsResult<()> {
        match self.current.take() {
            Some(active) => {
                info!(username = %active.username, "session ended");
                Ok(())
            }
            None => Err(FsError::Unauthorized),
        }
    }
}
