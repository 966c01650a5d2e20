use ahash::AHashMap;
use joymap_input::DeviceInfo;

use crate::codec;
use crate::template::Template;
use crate::{Error, Result};

/// Key the template list is persisted under.
pub const STORE_KEY: &str = "joymap";

/// Synchronous key-value blob storage.
pub trait BlobStore {
    fn load(&self, key: &str) -> Result<Vec<u8>>;
    fn save(&mut self, key: &str, data: &[u8]) -> Result<()>;
}

/// Blob store kept in process memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    blobs: AHashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(key: &str, data: impl Into<Vec<u8>>) -> Self {
        let mut store = Self::new();
        store.blobs.insert(key.to_string(), data.into());
        store
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.blobs.get(key).map(Vec::as_slice)
    }
}

impl BlobStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Vec<u8>> {
        self.blobs
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    fn save(&mut self, key: &str, data: &[u8]) -> Result<()> {
        self.blobs.insert(key.to_string(), data.to_vec());
        Ok(())
    }
}

/// Ordered template list backed by a blob store.
///
/// Lookup returns the first matching template, so order is preserved
/// across load and save.
pub struct TemplateStore {
    templates: Vec<Template>,
    backend: Box<dyn BlobStore>,
}

impl std::fmt::Debug for TemplateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateStore")
            .field("templates", &self.templates.len())
            .finish_non_exhaustive()
    }
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::new(MemoryStore::new())
    }
}

impl TemplateStore {
    /// Load templates from `backend`. Missing or malformed data yields an
    /// empty list.
    pub fn new<S: BlobStore + 'static>(backend: S) -> Self {
        let templates = match backend.load(STORE_KEY) {
            Ok(data) => match codec::decode(&data) {
                Ok(templates) => templates,
                Err(e) => {
                    log::warn!("discarding stored templates: {e}");
                    Vec::new()
                }
            },
            Err(Error::NotFound(_)) => Vec::new(),
            Err(e) => {
                log::warn!("failed to load templates: {e}");
                Vec::new()
            }
        };
        log::debug!("loaded {} templates", templates.len());
        Self {
            templates,
            backend: Box::new(backend),
        }
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// First template matching the device.
    pub fn find(&self, info: &DeviceInfo) -> Option<&Template> {
        self.templates.iter().find(|t| t.matches(info))
    }

    /// Append a template and persist the whole list.
    pub fn push(&mut self, template: Template) {
        self.templates.push(template);
        self.persist();
    }

    /// Drop every template and persist the empty list.
    pub fn clear(&mut self) {
        self.templates.clear();
        self.persist();
    }

    fn persist(&mut self) {
        let data = codec::encode(&self.templates);
        if let Err(e) = self.backend.save(STORE_KEY, data.as_bytes()) {
            log::warn!("skipped saving templates: {e}");
        }
    }
}
