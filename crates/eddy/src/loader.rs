//! Template source loading for `include`.
//!
//! The engine never touches the filesystem on its own: when an include
//! renders, it asks the process-wide [`TemplateLoader`] for source text by
//! name. The default loader rejects every request, so hosts that want
//! includes must install one with [`set_template_loader`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use crate::error::RenderError;

/// Supplies template source text to `include` tags.
pub trait TemplateLoader: Send + Sync {
    fn load_template_source(&self, name: &str) -> Result<String, RenderError>;
}

/// The default loader: every include fails.
pub struct NullLoader;

impl TemplateLoader for NullLoader {
    fn load_template_source(&self, _name: &str) -> Result<String, RenderError> {
        Err(RenderError::IncludesNotAllowed)
    }
}

/// Serves templates from an in-memory name → source map.
#[derive(Default)]
pub struct MemoryLoader {
    templates: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<String>) -> &mut Self {
        self.templates.insert(name.into(), source.into());
        self
    }
}

impl TemplateLoader for MemoryLoader {
    fn load_template_source(&self, name: &str) -> Result<String, RenderError> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| RenderError::TemplateNotFound(name.to_string()))
    }
}

/// Reads `<root>/<name>` from disk on every request.
pub struct DirLoader {
    root: PathBuf,
}

impl DirLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TemplateLoader for DirLoader {
    fn load_template_source(&self, name: &str) -> Result<String, RenderError> {
        let path = self.root.join(name);
        match std::fs::read_to_string(&path) {
            Ok(source) => Ok(source),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(RenderError::TemplateNotFound(name.to_string()))
            }
            Err(err) => Err(RenderError::Io(err)),
        }
    }
}

static LOADER: Lazy<RwLock<Arc<dyn TemplateLoader>>> =
    Lazy::new(|| RwLock::new(Arc::new(NullLoader)));

/// Installs the process-wide loader used by all subsequent include renders.
pub fn set_template_loader(loader: Arc<dyn TemplateLoader>) {
    *LOADER.write().expect("loader slot poisoned") = loader;
}

pub(crate) fn load_template_source(name: &str) -> Result<String, RenderError> {
    let loader = Arc::clone(&*LOADER.read().expect("loader slot poisoned"));
    loader.load_template_source(name)
}
