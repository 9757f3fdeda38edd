//! Element workspaces: a directory tree on disk, or objects held in memory.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::client::{ElementSource, LineStream};
use crate::error::SourceError;

/// Workspace rooted at a local directory: `<root>/<container>/<path>`
#[derive(Debug, Clone)]
pub struct FilesystemElementSource {
    root: PathBuf,
}

impl FilesystemElementSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, container: &str, path: &str) -> PathBuf {
        self.root.join(container).join(path)
    }

    fn map_io(error: std::io::Error, container: &str, path: &str) -> SourceError {
        if error.kind() == std::io::ErrorKind::NotFound {
            SourceError::NotFound {
                container: container.to_string(),
                path: path.to_string(),
            }
        } else {
            SourceError::Io(error)
        }
    }
}

#[async_trait]
impl ElementSource for FilesystemElementSource {
    async fn list_directory(
        &self,
        container: &str,
        path: &str,
    ) -> Result<Vec<String>, SourceError> {
        let dir = self.resolve(container, path);
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| Self::map_io(e, container, path))?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    async fn read_blob(&self, container: &str, path: &str) -> Result<Vec<u8>, SourceError> {
        tokio::fs::read(self.resolve(container, path))
            .await
            .map_err(|e| Self::map_io(e, container, path))
    }

    async fn read_lines(&self, container: &str, path: &str) -> Result<LineStream, SourceError> {
        let file = tokio::fs::File::open(self.resolve(container, path))
            .await
            .map_err(|e| Self::map_io(e, container, path))?;

        let lines = BufReader::new(file).lines();
        let stream = stream::unfold(lines, |mut lines| async move {
            match lines.next_line().await {
                Ok(Some(line)) => Some((Ok(line), lines)),
                Ok(None) => None,
                Err(e) => Some((Err(SourceError::Io(e)), lines)),
            }
        });
        Ok(stream.boxed())
    }
}

/// Workspace held in memory, keyed by container then object path
#[derive(Debug, Default)]
pub struct InMemoryElementSource {
    objects: RwLock<BTreeMap<String, BTreeMap<String, Vec<u8>>>>,
}

impl InMemoryElementSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, container: &str, path: &str, content: impl Into<Vec<u8>>) {
        self.objects
            .write()
            .entry(container.to_string())
            .or_default()
            .insert(path.to_string(), content.into());
    }

    /// Store `value` serialized as JSON
    pub fn put_json<T: serde::Serialize>(
        &self,
        container: &str,
        path: &str,
        value: &T,
    ) -> Result<(), SourceError> {
        self.put(container, path, serde_json::to_vec(value)?);
        Ok(())
    }

    fn get(&self, container: &str, path: &str) -> Result<Vec<u8>, SourceError> {
        self.objects
            .read()
            .get(container)
            .and_then(|objects| objects.get(path))
            .cloned()
            .ok_or_else(|| SourceError::NotFound {
                container: container.to_string(),
                path: path.to_string(),
            })
    }
}

#[async_trait]
impl ElementSource for InMemoryElementSource {
    async fn list_directory(
        &self,
        container: &str,
        path: &str,
    ) -> Result<Vec<String>, SourceError> {
        let objects = self.objects.read();
        let Some(objects) = objects.get(container) else {
            return Err(SourceError::NotFound {
                container: container.to_string(),
                path: path.to_string(),
            });
        };

        let prefix = format!("{}/", path.trim_end_matches('/'));
        let names: BTreeSet<String> = objects
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter_map(|rest| rest.split('/').next())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        Ok(names.into_iter().collect())
    }

    async fn read_blob(&self, container: &str, path: &str) -> Result<Vec<u8>, SourceError> {
        self.get(container, path)
    }

    async fn read_lines(&self, container: &str, path: &str) -> Result<LineStream, SourceError> {
        let content = String::from_utf8(self.get(container, path)?)
            .map_err(|e| SourceError::Parse(e.to_string()))?;
        let lines: Vec<Result<String, SourceError>> =
            content.lines().map(|line| Ok(line.to_string())).collect();
        Ok(stream::iter(lines).boxed())
    }
}
