//! Persisted PEM artifacts.
//!
//! Files are overwritten on every run; nothing is versioned or backed up.

use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{ProvisionError, Result, Stage};

/// File name of the root certificate
pub const ROOT_CERT_FILE: &str = "rootCA.pem";

/// File name of the intermediate certificate
pub const INTERMEDIATE_CERT_FILE: &str = "intermediateCA.pem";

/// Paths of a persisted leaf certificate and its key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafPaths {
    /// `<common name>.pem`
    pub certificate: PathBuf,
    /// `<common name>.key`
    pub private_key: PathBuf,
}

/// Output directory for certificates and keys
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Store rooted at `dir`; the directory is created on first write
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Output directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the root certificate is written
    #[must_use]
    pub fn root_cert_path(&self) -> PathBuf {
        self.dir.join(ROOT_CERT_FILE)
    }

    /// Where the intermediate certificate is written
    #[must_use]
    pub fn intermediate_cert_path(&self) -> PathBuf {
        self.dir.join(INTERMEDIATE_CERT_FILE)
    }

    /// Where a leaf for `common_name` is written, or `None` if the name
    /// cannot be used as a file name
    #[must_use]
    pub fn leaf_paths(&self, common_name: &str) -> Option<LeafPaths> {
        if !is_file_safe(common_name) {
            return None;
        }
        Some(LeafPaths {
            certificate: self.dir.join(format!("{common_name}.pem")),
            private_key: self.dir.join(format!("{common_name}.key")),
        })
    }

    pub(crate) async fn write_root(&self, pem: &str) -> Result<PathBuf> {
        let path = self.root_cert_path();
        self.write(Stage::Root, &path, pem, false).await?;
        Ok(path)
    }

    pub(crate) async fn write_intermediate(&self, pem: &str) -> Result<PathBuf> {
        let path = self.intermediate_cert_path();
        self.write(Stage::Intermediate, &path, pem, false).await?;
        Ok(path)
    }

    /// Write a leaf key and certificate; `paths` comes from [`Self::leaf_paths`].
    ///
    /// On failure neither file is left behind.
    pub(crate) async fn write_leaf(
        &self,
        paths: &LeafPaths,
        certificate: &str,
        private_key: &str,
    ) -> Result<()> {
        self.write(Stage::Issuance, &paths.private_key, private_key, true)
            .await?;
        if let Err(err) = self
            .write(Stage::Issuance, &paths.certificate, certificate, false)
            .await
        {
            if let Err(cleanup) = tokio::fs::remove_file(&paths.private_key).await {
                warn!(path = %paths.private_key.display(), error = %cleanup, "could not remove orphaned key");
            }
            return Err(err);
        }
        Ok(())
    }

    async fn write(&self, stage: Stage, path: &Path, contents: &str, secret: bool) -> Result<()> {
        let wrap = |source: io::Error| ProvisionError::Artifact {
            stage,
            path: path.to_path_buf(),
            source,
        };

        tokio::fs::create_dir_all(&self.dir).await.map_err(wrap)?;
        let mut body = contents.trim_end().to_string();
        body.push('\n');
        tokio::fs::write(path, body).await.map_err(wrap)?;
        if secret {
            restrict(path).await.map_err(wrap)?;
        }
        Ok(())
    }
}

#[cfg(unix)]
async fn restrict(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await
}

#[cfg(not(unix))]
async fn restrict(_path: &Path) -> io::Result<()> {
    Ok(())
}

fn is_file_safe(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_paths_are_named_after_common_name() {
        let store = ArtifactStore::new("/out");
        let paths = store.leaf_paths("ABCD1234-0000-1111-2222").unwrap();
        assert_eq!(paths.certificate, Path::new("/out/ABCD1234-0000-1111-2222.pem"));
        assert_eq!(paths.private_key, Path::new("/out/ABCD1234-0000-1111-2222.key"));
    }

    #[test]
    fn path_like_common_names_are_refused() {
        let store = ArtifactStore::new("/out");
        for cn in ["", ".", "..", "../etc/passwd", "a/b", r"a\b"] {
            assert!(store.leaf_paths(cn).is_none(), "{cn:?} accepted");
        }
    }

    #[tokio::test]
    async fn writes_create_directory_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("nested"));

        store.write_root("FIRST").await.unwrap();
        let path = store.write_root("SECOND\n\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "SECOND\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn private_key_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let paths = store.leaf_paths("sensor").unwrap();
        store.write_leaf(&paths, "CERT", "KEY").await.unwrap();

        let mode = std::fs::metadata(&paths.private_key).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(std::fs::read_to_string(&paths.certificate).unwrap(), "CERT\n");
    }

    #[tokio::test]
    async fn failed_key_write_leaves_no_certificate() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let paths = store.leaf_paths("sensor").unwrap();
        std::fs::create_dir(&paths.private_key).unwrap();

        let err = store.write_leaf(&paths, "CERT", "KEY").await.unwrap_err();
        assert!(matches!(err, ProvisionError::Artifact { stage: Stage::Issuance, .. }));
        assert!(!paths.certificate.exists());
    }

    #[tokio::test]
    async fn failed_certificate_write_removes_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let paths = store.leaf_paths("sensor").unwrap();
        std::fs::create_dir(&paths.certificate).unwrap();

        let err = store.write_leaf(&paths, "CERT", "KEY").await.unwrap_err();
        assert!(matches!(err, ProvisionError::Artifact { ref path, .. } if *path == paths.certificate));
        assert!(!paths.private_key.exists());
    }
}
