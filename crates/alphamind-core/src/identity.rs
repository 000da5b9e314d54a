// Per-installation user identity.
// Format: UUIDv4 text in `<data dir>/user_id`

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{CoreError, IdentityError};
use crate::model::UserId;
use crate::storage::data_dir;

const USER_ID_FILE: &str = "user_id";

/// Reads or creates the stable user identifier for this installation.
///
/// The first write is compare-and-set: the candidate is written in full to a
/// staging file and then hard-linked into place, so `user_id` never exists
/// without its content. When two callers race on an empty directory the
/// loser discards its candidate and returns the winner's identifier.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    dir: PathBuf,
}

enum Stored {
    Missing,
    Empty,
    Id(UserId),
}

impl IdentityResolver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(USER_ID_FILE)
    }

    /// Get or create the user id.
    ///
    /// An empty `user_id` (left behind by an interrupted write) counts as
    /// absent and is replaced.
    ///
    /// # Errors
    /// `InvalidFormat` if a stored value is not a UUID (it is never silently
    /// replaced); `Io` for filesystem failures.
    pub fn resolve(&self) -> Result<UserId, IdentityError> {
        let path = self.path();

        match read_stored(&path)? {
            Stored::Id(id) => return Ok(id),
            Stored::Empty => {
                tracing::warn!(path = %path.display(), "discarding empty user_id file");
                match fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
            Stored::Missing => {}
        }

        fs::create_dir_all(&self.dir)?;

        let candidate = UserId::generate();
        let staged = self.dir.join(format!("{USER_ID_FILE}.{candidate}.tmp"));
        write_staged(&staged, &candidate)?;

        let linked = fs::hard_link(&staged, &path);
        if let Err(e) = fs::remove_file(&staged) {
            tracing::debug!(path = %staged.display(), "failed to remove staged user_id: {e}");
        }

        match linked {
            Ok(()) => {
                tracing::info!(user_id = %candidate, "created user identity");
                Ok(candidate)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                tracing::debug!("identity created concurrently, adopting stored value");
                read_winner(&path)
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn write_staged(path: &Path, id: &UserId) -> Result<(), IdentityError> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    writeln!(file, "{id}")?;
    file.sync_all()?;
    Ok(())
}

fn read_stored(path: &Path) -> Result<Stored, IdentityError> {
    match fs::read_to_string(path) {
        Ok(content) if content.trim().is_empty() => Ok(Stored::Empty),
        Ok(content) => UserId::parse(&content).map(Stored::Id),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Stored::Missing),
        Err(e) => Err(e.into()),
    }
}

// Another resolver may be replacing an empty file between our check and link.
fn read_winner(path: &Path) -> Result<UserId, IdentityError> {
    for _ in 0..50 {
        if let Stored::Id(id) = read_stored(path)? {
            return Ok(id);
        }
        std::thread::sleep(std::time::Duration::from_millis(10));
    }
    Err(IdentityError::Io(std::io::Error::new(
        ErrorKind::TimedOut,
        "user_id file stayed empty",
    )))
}

/// Resolve the user id from the default data directory.
pub fn resolve_default() -> Result<UserId, CoreError> {
    let dir = data_dir()?;
    Ok(IdentityResolver::new(dir).resolve()?)
}
