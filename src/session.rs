//! Small on-disk memory of the last opened project.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub last_project_id: Option<String>,
}

impl Session {
    /// Load the session file, falling back to an empty session when it is
    /// missing or unreadable.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Session::default();
        }
        match fs::read_to_string(path) {
            Ok(buf) => match serde_json::from_str(&buf) {
                Ok(session) => session,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "ignoring unparsable session file");
                    Session::default()
                }
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not read session file");
                Session::default()
            }
        }
    }

    /// Save via temp file + rename.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let mut f = File::create(&tmp)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    /// Remember `project_id`, logging instead of failing when the disk says no.
    pub fn remember(path: &Path, project_id: Option<&str>) {
        let session = Session {
            last_project_id: project_id.map(str::to_string),
        };
        if let Err(e) = session.save(path) {
            tracing::warn!(path = %path.display(), error = %e.message(), "could not save session");
        }
    }
}
