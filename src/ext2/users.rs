//! The `/users.txt` account database: `gid,G,group` and
//! `uid,U,group,user,password` lines, one record each. Group creation
//! rewrites the file in place through the block allocator.

use tracing::debug;

use super::fs::Ext2Fs;
use crate::error::{FsError, FsResult};
use crate::session::Session;

pub const USERS_PATH: &str = "/users.txt";

const MAX_GROUP_NAME: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRecord {
    pub gid: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub uid: i32,
    pub group: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Default)]
pub struct UsersFile {
    pub groups: Vec<GroupRecord>,
    pub users: Vec<UserRecord>,
}

impl UsersFile {
    /// Malformed lines are skipped rather than failing the whole file.
    pub fn parse(content: &str) -> Self {
        let mut file = Self::default();
        for line in content.lines() {
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            match fields.as_slice() {
                [gid, "G", name] => {
                    if let Ok(gid) = gid.parse() {
                        file.groups.push(GroupRecord {
                            gid,
                            name: (*name).to_string(),
                        });
                    }
                }
                [uid, "U", group, name, password] => {
                    if let Ok(uid) = uid.parse() {
                        file.users.push(UserRecord {
                            uid,
                            group: (*group).to_string(),
                            name: (*name).to_string(),
                            password: (*password).to_string(),
                        });
                    }
                }
                _ => {}
            }
        }
        file
    }

    pub fn load(fs: &Ext2Fs) -> FsResult<Self> {
        let bytes = fs.read_file(USERS_PATH)?;
        Ok(Self::parse(&String::from_utf8_lossy(&bytes)))
    }

    pub fn find_user(&self, name: &str) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.name == name)
    }

    pub fn find_group(&self, name: &str) -> Option<&GroupRecord> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn next_gid(&self) -> i32 {
        self.groups.iter().map(|g| g.gid).max().unwrap_or(0) + 1
    }
}

/// `mkgrp`: append a group record to `/users.txt`. Only root may edit the
/// account database.
pub fn make_group(fs: &mut Ext2Fs, session: &Session, name: &str) -> FsResult<()> {
    let user = session.active()?;
    if user.username != "root" {
        return Err(FsError::Unauthorized);
    }
    if name.is_empty() || name.len() > MAX_GROUP_NAME {
        return Err(FsError::InvalidArg(format!(
            "group name '{name}' must be 1..={MAX_GROUP_NAME} bytes"
        )));
    }

    let current = fs.read_file(USERS_PATH)?;
    let mut text = String::from_utf8_lossy(&current).to_string();
    let parsed = UsersFile::parse(&text);
    if parsed.find_group(name).is_some() {
        return Err(FsError::AlreadyExists(format!(
            "group '{name}' already exists"
        )));
    }
    text.push_str(&format!("{},G,{}\n", parsed.next_gid(), name));
    debug!(name, "appending group record");
    rewrite_users(fs, &text)
}

/// Replace the content of `/users.txt`: free the old blocks, allocate a
/// fresh layout, and restamp the inode. The inode index never changes.
fn rewrite_users(fs: &mut Ext2Fs, text: &str) -> FsResult<()> {
    let (index, _) = fs.resolve(USERS_PATH)?;
    fs.free_inode_blocks(index)?;
    let layout = fs.allocate_data_blocks(text.as_bytes())?;
    let mut inode = fs.read_inode(index)?;
    inode.block = layout;
    inode.size = text.len() as i32;
    inode.touch();
    fs.write_inode(index, &inode)?;
    fs.save_superblock()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ext2::mkfs;
    use anyhow::Result;
    use tempfile::{tempdir, TempDir};

    fn volume() -> Result<(TempDir, Ext2Fs, Session)> {
        let dir = tempdir()?;
        let path = dir.path().join("vol.dsk");
        std::fs::File::create(&path)?.set_len(1024 * 1024)?;
        let fs = mkfs::make(path, 0, 1024 * 1024)?;
        let mut session = Session::new();
        session.login(&fs, "root", "123", "621A")?;
        Ok((dir, fs, session))
    }

    #[test]
    fn parse_reads_both_record_kinds() {
        let users = UsersFile::parse(mkfs::USERS_SEED);
        assert_eq!(users.groups.len(), 1);
        assert_eq!(users.groups[0], GroupRecord { gid: 1, name: "root".into() });
        assert_eq!(users.users.len(), 1);
        let root = users.find_user("root").unwrap();
        assert_eq!(root.uid, 1);
        assert_eq!(root.password, "123");
        assert_eq!(users.next_gid(), 2);

        // Garbage lines are ignored.
        let users = UsersFile::parse("oops\n1,G,root\nx,U,a,b\n");
        assert_eq!(users.groups.len(), 1);
        assert!(users.users.is_empty());
    }

    #[test]
    fn mkgrp_appends_and_rejects_duplicates() -> Result<()> {
        let (_dir, mut fs, session) = volume()?;
        make_group(&mut fs, &session, "devs")?;

        let content = fs.read_file(USERS_PATH)?;
        let text = String::from_utf8(content)?;
        assert_eq!(text, format!("{}2,G,devs\n", mkfs::USERS_SEED));

        let users = UsersFile::load(&fs)?;
        assert_eq!(users.find_group("devs").unwrap().gid, 2);

        let err = make_group(&mut fs, &session, "devs").unwrap_err();
        assert!(matches!(err, FsError::AlreadyExists(_)));

        make_group(&mut fs, &session, "ops")?;
        assert_eq!(UsersFile::load(&fs)?.find_group("ops").unwrap().gid, 3);
        Ok(())
    }

    #[test]
    fn mkgrp_requires_a_root_session() -> Result<()> {
        let (_dir, mut fs, _session) = volume()?;
        let logged_out = Session::new();
        assert!(matches!(
            make_group(&mut fs, &logged_out, "devs"),
            Err(FsError::Unauthorized)
        ));
        Ok(())
    }

    #[test]
    fn rewriting_keeps_the_bitmap_consistent() -> Result<()> {
        let (_dir, mut fs, session) = volume()?;
        let free_before = fs.superblock().free_blocks_count;
        // Two appends grow the file past one block; each rewrite burns
        // fresh blocks (the bump cursor never rewinds) but frees the old.
        make_group(&mut fs, &session, "devs")?;
        make_group(&mut fs, &session, "ops")?;

        let text = String::from_utf8(fs.read_file(USERS_PATH)?)?;
        assert!(text.ends_with("3,G,ops\n"));
        // 44 bytes now: one data block in use, same as before the edits.
        assert_eq!(fs.superblock().free_blocks_count, free_before);
        Ok(())
    }
}
