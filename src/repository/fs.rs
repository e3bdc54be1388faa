//! File-system backed [`ContentRepository`].
//!
//! Folders and files under the root directory are folders and file nodes.
//! Everything a plain file system cannot express (node types, mixins,
//! properties, binary properties, child nodes of a file) lives in a sidecar
//! tree at `<root>/.docview/nodes/`, mirroring the node path:
//!
//! ```text
//! <root>/docs/report.pdf                               file content
//! <root>/.docview/nodes/docs/report.pdf/.node.json     type, mixins, properties
//! <root>/.docview/nodes/docs/report.pdf/.binary/…      binary properties
//! <root>/.docview/nodes/docs/report.pdf/thumbnail/…    child node metadata
//! ```
//!
//! Writes go straight to disk, so [`save`](ContentRepository::save) has
//! nothing left to do.

use super::{ContentRepository, NodePath, PropertyValue, PROP_LAST_MODIFIED, PROP_MIME_TYPE};
use crate::error::RepositoryError;
use crate::mime::mime_from_path;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Name of the sidecar directory under the repository root.
pub const META_DIR: &str = ".docview";
const META_FILE: &str = ".node.json";
const BINARY_DIR: &str = ".binary";

#[derive(Debug, Default, Serialize, Deserialize)]
struct NodeMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    node_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    mixins: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    properties: BTreeMap<String, PropertyValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    binaries: Vec<String>,
    /// Child nodes that exist only in metadata, in creation order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<String>,
}

/// Repository rooted at a directory on the local file system.
#[derive(Debug, Clone)]
pub struct FsRepository {
    root: PathBuf,
}

impl FsRepository {
    /// Open the repository at `root`, which must be an existing directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let root = root.as_ref();
        let root = fs::canonicalize(root).map_err(|e| io_err(root.display().to_string(), e))?;
        if !root.is_dir() {
            return Err(RepositoryError::InvalidPath(root.display().to_string()));
        }
        debug!("Opened file-system repository at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Content location of `node` under the root.
    pub fn file_path(&self, node: &NodePath) -> Result<PathBuf, RepositoryError> {
        let mut path = self.root.clone();
        for (idx, segment) in node.segments().enumerate() {
            if segment == "." || segment == ".." || (idx == 0 && segment == META_DIR) {
                return Err(RepositoryError::InvalidPath(node.to_string()));
            }
            path.push(segment);
        }
        Ok(path)
    }

    /// Names of all children of `node`: directory entries first (sorted),
    /// then metadata-only children in creation order.
    pub fn children(&self, node: &NodePath) -> Result<Vec<String>, RepositoryError> {
        self.require(node)?;
        let mut names = Vec::new();
        let path = self.file_path(node)?;
        if path.is_dir() {
            let entries = fs::read_dir(&path).map_err(|e| io_err(node.as_str(), e))?;
            for entry in entries {
                let entry = entry.map_err(|e| io_err(node.as_str(), e))?;
                let name = entry.file_name().to_string_lossy().into_owned();
                if !(node.is_root() && name == META_DIR) {
                    names.push(name);
                }
            }
            names.sort();
        }
        for name in self.load_meta(node)?.children {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Ok(names)
    }

    fn meta_dir(&self, node: &NodePath) -> Result<PathBuf, RepositoryError> {
        // Validates the path as a side effect.
        self.file_path(node)?;
        let mut dir = self.root.join(META_DIR).join("nodes");
        for segment in node.segments() {
            dir.push(segment);
        }
        Ok(dir)
    }

    fn load_meta(&self, node: &NodePath) -> Result<NodeMeta, RepositoryError> {
        let file = self.meta_dir(node)?.join(META_FILE);
        match fs::read(&file) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| RepositoryError::Metadata {
                path: node.to_string(),
                source: e,
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(NodeMeta::default()),
            Err(e) => Err(io_err(node.as_str(), e)),
        }
    }

    fn store_meta(&self, node: &NodePath, meta: &NodeMeta) -> Result<(), RepositoryError> {
        let dir = self.meta_dir(node)?;
        fs::create_dir_all(&dir).map_err(|e| io_err(node.as_str(), e))?;
        let json = serde_json::to_vec_pretty(meta).map_err(|e| RepositoryError::Metadata {
            path: node.to_string(),
            source: e,
        })?;
        fs::write(dir.join(META_FILE), json).map_err(|e| io_err(node.as_str(), e))?;
        trace!("Stored metadata for {}", node);
        Ok(())
    }

    fn update_meta(
        &self,
        node: &NodePath,
        f: impl FnOnce(&mut NodeMeta),
    ) -> Result<(), RepositoryError> {
        self.require(node)?;
        let mut meta = self.load_meta(node)?;
        f(&mut meta);
        self.store_meta(node, &meta)
    }

    fn binary_path(&self, node: &NodePath, name: &str) -> Result<PathBuf, RepositoryError> {
        Ok(self
            .meta_dir(node)?
            .join(BINARY_DIR)
            .join(encode_property_name(name)))
    }

    fn require(&self, node: &NodePath) -> Result<(), RepositoryError> {
        if self.exists(node)? {
            Ok(())
        } else {
            Err(RepositoryError::NotFound(node.to_string()))
        }
    }

    fn require_file(&self, node: &NodePath) -> Result<PathBuf, RepositoryError> {
        self.require(node)?;
        let path = self.file_path(node)?;
        if path.is_file() {
            Ok(path)
        } else {
            Err(RepositoryError::NotAFile(node.to_string()))
        }
    }
}

impl ContentRepository for FsRepository {
    fn exists(&self, node: &NodePath) -> Result<bool, RepositoryError> {
        if self.file_path(node)?.exists() {
            return Ok(true);
        }
        Ok(self.load_meta(node)?.node_type.is_some())
    }

    fn is_file_node(&self, node: &NodePath) -> Result<bool, RepositoryError> {
        Ok(self.file_path(node)?.is_file())
    }

    fn content_type(&self, node: &NodePath) -> Result<Option<String>, RepositoryError> {
        let path = self.require_file(node)?;
        let stored = self
            .load_meta(node)?
            .properties
            .get(PROP_MIME_TYPE)
            .and_then(|v| v.as_str().map(str::to_string));
        Ok(stored.or_else(|| Some(mime_from_path(&path).to_string())))
    }

    fn download_content(&self, node: &NodePath, dest: &Path) -> Result<(), RepositoryError> {
        let path = self.require_file(node)?;
        let bytes = fs::copy(&path, dest).map_err(|e| io_err(node.as_str(), e))?;
        debug!("Downloaded {} ({} bytes) to {}", node, bytes, dest.display());
        Ok(())
    }

    fn read_content(&self, node: &NodePath) -> Result<Vec<u8>, RepositoryError> {
        let path = self.require_file(node)?;
        fs::read(&path).map_err(|e| io_err(node.as_str(), e))
    }

    fn parent(&self, node: &NodePath) -> Result<Option<NodePath>, RepositoryError> {
        self.require(node)?;
        Ok(node.parent())
    }

    fn upload_file(
        &self,
        parent: &NodePath,
        name: &str,
        content: &mut dyn Read,
        mime_type: &str,
    ) -> Result<NodePath, RepositoryError> {
        let dir = self.file_path(parent)?;
        if !dir.is_dir() {
            return Err(RepositoryError::NotFound(parent.to_string()));
        }
        let node = parent.join(name);
        let path = self.file_path(&node)?;
        let mut file = fs::File::create(&path).map_err(|e| io_err(node.as_str(), e))?;
        let bytes = io::copy(content, &mut file).map_err(|e| io_err(node.as_str(), e))?;

        let mut meta = self.load_meta(&node)?;
        meta.properties
            .insert(PROP_MIME_TYPE.to_string(), PropertyValue::from(mime_type));
        meta.properties.insert(
            PROP_LAST_MODIFIED.to_string(),
            PropertyValue::Date(chrono::Utc::now()),
        );
        self.store_meta(&node, &meta)?;
        debug!("Uploaded {} ({} bytes, {})", node, bytes, mime_type);
        Ok(node)
    }

    fn find_available_name(
        &self,
        parent: &NodePath,
        desired: &str,
    ) -> Result<String, RepositoryError> {
        if !self.exists(&parent.join(desired))? {
            return Ok(desired.to_string());
        }
        let (stem, ext) = match desired.rfind('.') {
            Some(idx) if idx > 0 => (&desired[..idx], &desired[idx..]),
            _ => (desired, ""),
        };
        let mut n = 1u32;
        loop {
            let candidate = format!("{stem}-{n}{ext}");
            if !self.exists(&parent.join(&candidate))? {
                return Ok(candidate);
            }
            n += 1;
        }
    }

    fn checkout_for_write(&self, node: &NodePath) -> Result<(), RepositoryError> {
        self.require(node)?;
        trace!("Checked out {} (no-op on file system)", node);
        Ok(())
    }

    fn child(&self, node: &NodePath, name: &str) -> Result<Option<NodePath>, RepositoryError> {
        let child = node.join(name);
        Ok(self.exists(&child)?.then_some(child))
    }

    fn add_child(
        &self,
        node: &NodePath,
        name: &str,
        node_type: &str,
    ) -> Result<NodePath, RepositoryError> {
        if name.is_empty() || name.contains('/') {
            return Err(RepositoryError::InvalidPath(format!("{node}/{name}")));
        }
        self.require(node)?;
        let child = node.join(name);

        let mut meta = self.load_meta(&child)?;
        meta.node_type = Some(node_type.to_string());
        self.store_meta(&child, &meta)?;

        let mut parent_meta = self.load_meta(node)?;
        if !parent_meta.children.iter().any(|c| c == name) {
            parent_meta.children.push(name.to_string());
            self.store_meta(node, &parent_meta)?;
        }
        debug!("Added child {} ({})", child, node_type);
        Ok(child)
    }

    fn has_mixin(&self, node: &NodePath, mixin: &str) -> Result<bool, RepositoryError> {
        self.require(node)?;
        Ok(self.load_meta(node)?.mixins.iter().any(|m| m == mixin))
    }

    fn add_mixin(&self, node: &NodePath, mixin: &str) -> Result<(), RepositoryError> {
        self.update_meta(node, |meta| {
            if !meta.mixins.iter().any(|m| m == mixin) {
                meta.mixins.push(mixin.to_string());
            }
        })
    }

    fn has_property(&self, node: &NodePath, name: &str) -> Result<bool, RepositoryError> {
        self.require(node)?;
        let meta = self.load_meta(node)?;
        Ok(meta.properties.contains_key(name) || meta.binaries.iter().any(|b| b == name))
    }

    fn remove_property(&self, node: &NodePath, name: &str) -> Result<(), RepositoryError> {
        self.require(node)?;
        let mut meta = self.load_meta(node)?;
        meta.properties.remove(name);
        if let Some(idx) = meta.binaries.iter().position(|b| b == name) {
            meta.binaries.remove(idx);
            let path = self.binary_path(node, name)?;
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(io_err(node.as_str(), e)),
            }
        }
        self.store_meta(node, &meta)
    }

    fn set_binary_property(
        &self,
        node: &NodePath,
        name: &str,
        content: &mut dyn Read,
    ) -> Result<(), RepositoryError> {
        self.require(node)?;
        let path = self.binary_path(node, name)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| io_err(node.as_str(), e))?;
        }
        let mut file = fs::File::create(&path).map_err(|e| io_err(node.as_str(), e))?;
        let bytes = io::copy(content, &mut file).map_err(|e| io_err(node.as_str(), e))?;

        let mut meta = self.load_meta(node)?;
        meta.properties.remove(name);
        if !meta.binaries.iter().any(|b| b == name) {
            meta.binaries.push(name.to_string());
        }
        self.store_meta(node, &meta)?;
        trace!("Set binary {}@{} ({} bytes)", node, name, bytes);
        Ok(())
    }

    fn set_property(
        &self,
        node: &NodePath,
        name: &str,
        value: PropertyValue,
    ) -> Result<(), RepositoryError> {
        self.update_meta(node, |meta| {
            meta.properties.insert(name.to_string(), value);
        })
    }

    fn get_property(
        &self,
        node: &NodePath,
        name: &str,
    ) -> Result<Option<PropertyValue>, RepositoryError> {
        self.require(node)?;
        Ok(self.load_meta(node)?.properties.get(name).cloned())
    }

    fn read_binary_property(
        &self,
        node: &NodePath,
        name: &str,
    ) -> Result<Option<Vec<u8>>, RepositoryError> {
        self.require(node)?;
        if !self.load_meta(node)?.binaries.iter().any(|b| b == name) {
            return Ok(None);
        }
        let path = self.binary_path(node, name)?;
        fs::read(&path)
            .map(Some)
            .map_err(|e| io_err(node.as_str(), e))
    }

    fn save(&self) -> Result<(), RepositoryError> {
        trace!("save: file-system repository writes eagerly");
        Ok(())
    }
}

fn io_err(path: impl Into<String>, source: io::Error) -> RepositoryError {
    RepositoryError::Io {
        path: path.into(),
        source,
    }
}

/// `jcr:data` → `jcr%3Adata`, keeping property files portable.
fn encode_property_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.' {
            out.push(ch);
        } else {
            let mut buf = [0u8; 4];
            for b in ch.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{b:02X}"));
            }
        }
    }
    out
}
