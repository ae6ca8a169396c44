//! Files recording the outcome of deployments.

use {
    alloy::primitives::Address,
    anyhow::{Context, Result},
    std::{
        io::ErrorKind,
        path::{Path, PathBuf},
    },
};

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ArtifactStore: Send + Sync + 'static {
    /// Records where a contract was deployed to.
    async fn write_address(&self, name: &str, address: Address) -> Result<()>;

    /// Records the hex encoded constructor arguments of a deployment.
    async fn write_args(&self, name: &str, encoded: &str) -> Result<()>;

    /// Drops recorded constructor arguments. Succeeds if there are none.
    async fn remove_args(&self, name: &str) -> Result<()>;

    /// Human readable location of the records.
    fn location(&self) -> String;
}

/// Stores `<name>.address` and `<name>.args` files in a directory.
#[derive(Clone, Debug)]
pub struct ArtifactsDir {
    root: PathBuf,
}

impl ArtifactsDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn address_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.address"))
    }

    pub fn args_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.args"))
    }

    async fn write(&self, path: &Path, contents: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("could not create {}", self.root.display()))?;
        tokio::fs::write(path, contents)
            .await
            .with_context(|| format!("could not write {}", path.display()))
    }
}

#[async_trait::async_trait]
impl ArtifactStore for ArtifactsDir {
    async fn write_address(&self, name: &str, address: Address) -> Result<()> {
        self.write(&self.address_path(name), &address.to_string())
            .await
    }

    async fn write_args(&self, name: &str, encoded: &str) -> Result<()> {
        self.write(&self.args_path(name), encoded).await
    }

    async fn remove_args(&self, name: &str) -> Result<()> {
        let path = self.args_path(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "removed stale constructor arguments");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("could not remove {}", path.display())),
        }
    }

    fn location(&self) -> String {
        self.root.display().to_string()
    }
}
