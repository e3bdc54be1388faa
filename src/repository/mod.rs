//! Content repository abstraction.
//!
//! The pipeline reads source documents from, and writes derived artifacts
//! to, a hierarchical node store. Nodes are addressed by absolute
//! slash-separated paths. A node has a type, a set of mixins, properties
//! (string, integer, date or binary) and ordered children. File nodes carry
//! content that can be downloaded or streamed.
//!
//! [`fs::FsRepository`] is the bundled implementation. Anything else (a
//! remote CMS, an in-memory fake for tests) only needs to implement
//! [`ContentRepository`].

pub mod fs;

use crate::error::RepositoryError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::Path;

pub use fs::FsRepository;

// ── Well-known names ─────────────────────────────────────────────────────

/// Binary payload of a resource node.
pub const PROP_DATA: &str = "jcr:data";
/// MIME type of a resource node.
pub const PROP_MIME_TYPE: &str = "jcr:mimeType";
/// Last modification time of a node.
pub const PROP_LAST_MODIFIED: &str = "jcr:lastModified";
pub const PROP_WIDTH: &str = "j:width";
pub const PROP_HEIGHT: &str = "j:height";
/// Per-folder override of the thumbnail size used by document rules.
pub const PROP_THUMBNAIL_SIZE: &str = "j:documentRuleThumbnailSize";

/// Node type of a thumbnail child.
pub const TYPE_THUMBNAIL: &str = "jnt:resource";
/// Node type of a view child.
pub const TYPE_VIEW: &str = "nt:resource";

/// Mixin added to a freshly created thumbnail child.
pub const MIXIN_IMAGE: &str = "jmix:image";
/// Mixin marking a document that carries a vector view.
pub const MIXIN_VECTOR_VIEW: &str = "jmix:swfDocumentView";

/// Name of the vector view child.
pub const VIEW_NODE_NAME: &str = "swfView";

// ── Types ────────────────────────────────────────────────────────────────

/// Absolute, slash-separated path of a repository node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodePath(String);

impl NodePath {
    /// Normalise `path`: leading slash added, duplicate and trailing slashes
    /// removed. `"docs//a.pdf/"` becomes `"/docs/a.pdf"`.
    pub fn new(path: impl AsRef<str>) -> Self {
        let segments: Vec<&str> = path
            .as_ref()
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        NodePath(format!("/{}", segments.join("/")))
    }

    pub fn root() -> Self {
        NodePath("/".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Last path segment; empty for the root.
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or("")
    }

    /// Parent path, or `None` for the root.
    pub fn parent(&self) -> Option<NodePath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(NodePath::root()),
            Some(idx) => Some(NodePath(self.0[..idx].to_string())),
            None => None,
        }
    }

    /// Child path `self/name`.
    pub fn join(&self, name: &str) -> NodePath {
        if self.is_root() {
            NodePath::new(name)
        } else {
            NodePath::new(format!("{}/{}", self.0, name))
        }
    }

    /// Segments after the root.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodePath {
    fn from(s: &str) -> Self {
        NodePath::new(s)
    }
}

impl From<String> for NodePath {
    fn from(s: String) -> Self {
        NodePath::new(s)
    }
}

/// A scalar node property.
///
/// Binary properties are written and read as streams through
/// [`ContentRepository::set_binary_property`] and
/// [`ContentRepository::read_binary_property`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum PropertyValue {
    String(String),
    Long(i64),
    Date(DateTime<Utc>),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view; numeric strings are accepted.
    pub fn as_long(&self) -> Option<i64> {
        match self {
            PropertyValue::Long(v) => Some(*v),
            PropertyValue::String(s) => s.trim().parse().ok(),
            PropertyValue::Date(_) => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Long(v)
    }
}

impl From<DateTime<Utc>> for PropertyValue {
    fn from(v: DateTime<Utc>) -> Self {
        PropertyValue::Date(v)
    }
}

// ── Trait ────────────────────────────────────────────────────────────────

/// Hierarchical node store used by the document pipeline.
///
/// Mutations may be buffered by an implementation until [`save`] is called;
/// the pipeline always calls `save` once per completed operation.
///
/// [`save`]: ContentRepository::save
pub trait ContentRepository {
    fn exists(&self, node: &NodePath) -> Result<bool, RepositoryError>;

    /// True for nodes that carry downloadable file content.
    fn is_file_node(&self, node: &NodePath) -> Result<bool, RepositoryError>;

    /// MIME type of a file node's content, if known.
    fn content_type(&self, node: &NodePath) -> Result<Option<String>, RepositoryError>;

    /// Copy a file node's content to `dest`.
    fn download_content(&self, node: &NodePath, dest: &Path) -> Result<(), RepositoryError>;

    /// Read a file node's content into memory.
    fn read_content(&self, node: &NodePath) -> Result<Vec<u8>, RepositoryError>;

    fn parent(&self, node: &NodePath) -> Result<Option<NodePath>, RepositoryError>;

    /// Create or replace file `name` under `parent`.
    fn upload_file(
        &self,
        parent: &NodePath,
        name: &str,
        content: &mut dyn Read,
        mime_type: &str,
    ) -> Result<NodePath, RepositoryError>;

    /// `desired` if no child of `parent` has that name, else a variant of it
    /// that is free.
    fn find_available_name(&self, parent: &NodePath, desired: &str)
        -> Result<String, RepositoryError>;

    /// Lock or check out `node` for modification, if the store needs it.
    fn checkout_for_write(&self, node: &NodePath) -> Result<(), RepositoryError>;

    /// Existing child `name` of `node`.
    fn child(&self, node: &NodePath, name: &str) -> Result<Option<NodePath>, RepositoryError>;

    /// Create child `name` of type `node_type` under `node`.
    fn add_child(
        &self,
        node: &NodePath,
        name: &str,
        node_type: &str,
    ) -> Result<NodePath, RepositoryError>;

    fn has_mixin(&self, node: &NodePath, mixin: &str) -> Result<bool, RepositoryError>;

    fn add_mixin(&self, node: &NodePath, mixin: &str) -> Result<(), RepositoryError>;

    fn has_property(&self, node: &NodePath, name: &str) -> Result<bool, RepositoryError>;

    fn remove_property(&self, node: &NodePath, name: &str) -> Result<(), RepositoryError>;

    fn set_binary_property(
        &self,
        node: &NodePath,
        name: &str,
        content: &mut dyn Read,
    ) -> Result<(), RepositoryError>;

    fn set_property(
        &self,
        node: &NodePath,
        name: &str,
        value: PropertyValue,
    ) -> Result<(), RepositoryError>;

    fn get_property(
        &self,
        node: &NodePath,
        name: &str,
    ) -> Result<Option<PropertyValue>, RepositoryError>;

    fn read_binary_property(
        &self,
        node: &NodePath,
        name: &str,
    ) -> Result<Option<Vec<u8>>, RepositoryError>;

    /// Persist pending changes.
    fn save(&self) -> Result<(), RepositoryError>;
}
