/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Indirection over the process environment and the file system so that credential providers
//! can be tested without touching either.

use std::collections::HashMap;
use std::env::VarError;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File system abstraction
///
/// Construct a file system which delegates to `std::fs`:
/// ```rust
/// let fs = aws_types::os_shim_internal::Fs::real();
/// ```
///
/// Construct an in-memory file system for testing:
/// ```rust
/// use aws_types::os_shim_internal::Fs;
/// let fs = Fs::from_slice(&[("/home/.aws/config", "[default]\nregion = us-east-1")]);
/// assert!(fs.read_to_string("/home/.aws/config").is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct Fs(Arc<FsInner>);

#[derive(Debug)]
enum FsInner {
    Real,
    Fake(HashMap<PathBuf, Vec<u8>>),
}

impl Default for Fs {
    fn default() -> Self {
        Fs::real()
    }
}

impl Fs {
    pub fn real() -> Self {
        Fs(Arc::new(FsInner::Real))
    }

    pub fn from_map(data: HashMap<String, Vec<u8>>) -> Self {
        Fs(Arc::new(FsInner::Fake(
            data.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        )))
    }

    pub fn from_slice(files: &[(&str, &str)]) -> Self {
        Fs(Arc::new(FsInner::Fake(
            files
                .iter()
                .map(|(path, contents)| (PathBuf::from(path), contents.as_bytes().to_vec()))
                .collect(),
        )))
    }

    pub fn read_to_end(&self, path: impl AsRef<Path>) -> std::io::Result<Vec<u8>> {
        match self.0.as_ref() {
            FsInner::Real => std::fs::read(path),
            FsInner::Fake(files) => files
                .get(path.as_ref())
                .cloned()
                .ok_or_else(|| std::io::ErrorKind::NotFound.into()),
        }
    }

    pub fn read_to_string(&self, path: impl AsRef<Path>) -> std::io::Result<String> {
        let bytes = self.read_to_end(path)?;
        String::from_utf8(bytes)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    }
}

/// Environment variable abstraction
///
/// Environment variables are global to a process and hard to test with a multi-threaded test
/// runner. `Env` reads either from the real process environment or from a map.
#[derive(Clone, Debug)]
pub struct Env(Arc<EnvInner>);

#[derive(Debug)]
enum EnvInner {
    Real,
    Fake {
        vars: HashMap<String, String>,
        os_home: Option<PathBuf>,
    },
}

impl Default for Env {
    fn default() -> Self {
        Self::real()
    }
}

impl Env {
    pub fn get(&self, k: &str) -> Result<String, VarError> {
        match self.0.as_ref() {
            EnvInner::Real => std::env::var(k),
            EnvInner::Fake { vars, .. } => vars.get(k).cloned().ok_or(VarError::NotPresent),
        }
    }

    /// Like [`get`](Self::get), but treats an empty value as unset.
    pub fn get_non_empty(&self, k: &str) -> Option<String> {
        self.get(k).ok().filter(|v| !v.is_empty())
    }

    /// Create a fake process environment from a slice of tuples.
    ///
    /// ```rust
    /// use aws_types::os_shim_internal::Env;
    /// let mock_env = Env::from_slice(&[
    ///     ("HOME", "/home/myname"),
    ///     ("AWS_REGION", "us-west-2")
    /// ]);
    /// assert_eq!(mock_env.get("HOME").unwrap(), "/home/myname");
    /// ```
    pub fn from_slice<'a>(vars: &[(&'a str, &'a str)]) -> Self {
        vars.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>()
            .into()
    }

    /// Sets the directory a fake environment reports from the operating system's home directory
    /// lookup. Has no effect on a real environment.
    pub fn with_os_home(self, home: impl Into<PathBuf>) -> Self {
        match self.0.as_ref() {
            EnvInner::Real => self,
            EnvInner::Fake { vars, .. } => Env(Arc::new(EnvInner::Fake {
                vars: vars.clone(),
                os_home: Some(home.into()),
            })),
        }
    }

    /// Delegates to [`std::env::var`] and the operating system's home directory lookup.
    pub fn real() -> Self {
        Self(Arc::new(EnvInner::Real))
    }

    fn os_home(&self) -> Option<PathBuf> {
        match self.0.as_ref() {
            EnvInner::Real => dirs::home_dir(),
            EnvInner::Fake { os_home, .. } => os_home.clone(),
        }
    }

    /// Resolves the user's home directory.
    ///
    /// Tried in order: `HOME`, the operating system lookup, `HOMEDRIVE` + `HOMEPATH` (the drive
    /// defaults to `C:/`), then `USERPROFILE`.
    pub fn home_dir(&self) -> Option<PathBuf> {
        if let Some(home) = self.get_non_empty("HOME") {
            tracing::debug!(src = "HOME", "loaded home directory");
            return Some(home.into());
        }
        if let Some(home) = self.os_home() {
            tracing::debug!(src = "os", "loaded home directory");
            return Some(home);
        }
        if let Some(path) = self.get_non_empty("HOMEPATH") {
            tracing::debug!(src = "HOMEDRIVE/HOMEPATH", "loaded home directory");
            let mut drive = self
                .get_non_empty("HOMEDRIVE")
                .unwrap_or_else(|| "C:/".to_string());
            drive.push_str(&path);
            return Some(drive.into());
        }
        if let Some(home) = self.get_non_empty("USERPROFILE") {
            tracing::debug!(src = "USERPROFILE", "loaded home directory");
            return Some(home.into());
        }
        None
    }
}

impl From<HashMap<String, String>> for Env {
    fn from(vars: HashMap<String, String>) -> Self {
        Self(Arc::new(EnvInner::Fake {
            vars,
            os_home: None,
        }))
    }
}

#[cfg(test)]
mod test {
    use crate::os_shim_internal::{Env, Fs};
    use std::env::VarError;
    use std::path::PathBuf;

    #[test]
    fn env_works() {
        let env = Env::from_slice(&[("FOO", "BAR"), ("EMPTY", "")]);
        assert_eq!(env.get("FOO").unwrap(), "BAR");
        assert_eq!(
            env.get("OTHER").expect_err("no present"),
            VarError::NotPresent
        );
        assert_eq!(env.get_non_empty("EMPTY"), None);
    }

    #[test]
    fn fake_fs_reads_files() {
        let fs = Fs::from_slice(&[("/users/test/.aws/config", "[default]")]);
        assert_eq!(
            fs.read_to_string("/users/test/.aws/config").unwrap(),
            "[default]"
        );
        assert_eq!(
            fs.read_to_end("doesntexist").expect_err("missing").kind(),
            std::io::ErrorKind::NotFound
        );
    }

    #[test]
    fn real_fs_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials");
        std::fs::write(&path, "[default]").unwrap();
        assert_eq!(Fs::real().read_to_string(&path).unwrap(), "[default]");
    }

    #[test]
    fn home_resolution_order() {
        let env = Env::from_slice(&[
            ("HOME", "/home/a"),
            ("HOMEPATH", "\\Users\\b"),
            ("USERPROFILE", "C:\\Users\\c"),
        ])
        .with_os_home("/os/home");
        assert_eq!(env.home_dir(), Some(PathBuf::from("/home/a")));

        let env = Env::from_slice(&[("HOMEPATH", "\\Users\\b")]).with_os_home("/os/home");
        assert_eq!(env.home_dir(), Some(PathBuf::from("/os/home")));

        let env = Env::from_slice(&[("HOMEPATH", "Users/b"), ("USERPROFILE", "C:\\Users\\c")]);
        assert_eq!(env.home_dir(), Some(PathBuf::from("C:/Users/b")));

        let env = Env::from_slice(&[("HOMEDRIVE", "D:"), ("HOMEPATH", "\\Users\\b")]);
        assert_eq!(env.home_dir(), Some(PathBuf::from("D:\\Users\\b")));

        let env = Env::from_slice(&[("USERPROFILE", "C:\\Users\\c")]);
        assert_eq!(env.home_dir(), Some(PathBuf::from("C:\\Users\\c")));

        assert_eq!(Env::from_slice(&[]).home_dir(), None);
    }
}
