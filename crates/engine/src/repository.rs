//! Template repository.
//!
//! Long-lived storage of loaded templates keyed by case-insensitive name.
//! Lookups are concurrent; loading the same name twice is arbitrated
//! first-registration-wins, the loser receiving `TemplateAlreadyExists`.

use std::path::{Path, PathBuf};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, info};

use entforge_domain::EntityTemplate;

use crate::error::ParseError;
use crate::loader::{SourceFormat, TemplateLoader};

/// Failure loading templates into the repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Startup/load-time integrity error: the name is already taken.
    /// Note that 'foo.yaml' and 'foo.json' count as the same template.
    #[error("Template '{name}' already exists")]
    TemplateAlreadyExists { name: String },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// An abstraction over a collection of entity template sources. May be fed
/// from strings, single files, or whole folders.
#[derive(Debug, Default)]
pub struct TemplateRepository {
    templates: DashMap<String, EntityTemplate>,
}

impl TemplateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `text` and stores the result under `name`.
    pub fn load_str(
        &self,
        name: &str,
        text: &str,
        format: SourceFormat,
    ) -> Result<(), RepositoryError> {
        let template = TemplateLoader::new().parse_str(text, format)?;
        self.insert(name, template)
    }

    /// Loads one template file; the template name is the file stem, and
    /// `$ref`/`$merge-ref` targets resolve relative to the file's directory.
    pub fn load_file(&self, path: &Path) -> Result<(), RepositoryError> {
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| ParseError::UnsupportedExtension {
                path: path.to_path_buf(),
            })?
            .to_string();
        let template = TemplateLoader::new().load_file(path)?;
        self.insert(&name, template)
    }

    /// Recursively loads every .yaml/.yml/.json file under `dir`, in
    /// lexicographic path order for reproducibility.
    pub fn load_dir(&self, dir: &Path) -> Result<(), RepositoryError> {
        let mut files = Vec::new();
        collect_template_files(dir, &mut files)?;
        files.sort();
        for file in &files {
            self.load_file(file)?;
        }
        info!(count = files.len(), dir = %dir.display(), "loaded template folder");
        Ok(())
    }

    /// Registers an already-built template. Assigns `name` to the template
    /// if it does not carry one yet.
    pub fn insert(&self, name: &str, mut template: EntityTemplate) -> Result<(), RepositoryError> {
        if template.name().is_none() {
            template.set_name(name);
        }
        match self.templates.entry(name.to_ascii_lowercase()) {
            Entry::Occupied(_) => Err(RepositoryError::TemplateAlreadyExists {
                name: name.to_string(),
            }),
            Entry::Vacant(slot) => {
                debug!(template = name, "template registered");
                slot.insert(template);
                Ok(())
            }
        }
    }

    /// Case-insensitive template lookup. Returns an independent copy; the
    /// stored template is never handed out by reference.
    pub fn get(&self, name: &str) -> Option<EntityTemplate> {
        self.templates
            .get(&name.to_ascii_lowercase())
            .map(|entry| entry.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(&name.to_ascii_lowercase())
    }

    /// Names of all registered templates, in no particular order.
    pub fn template_names(&self) -> Vec<String> {
        self.templates
            .iter()
            .filter_map(|entry| entry.value().name().map(ToString::to_string))
            .collect()
    }

    /// Templates carrying ALL of the given tags.
    pub fn get_by_tags<T: AsRef<str>>(&self, tags: &[T]) -> Vec<EntityTemplate> {
        self.templates
            .iter()
            .filter(|entry| entry.value().has_all_tags(tags))
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn collect_template_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), ParseError> {
    let entries = std::fs::read_dir(dir).map_err(|e| ParseError::Io {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    })?;
    for entry in entries {
        let entry = entry.map_err(|e| ParseError::Io {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_template_files(&path, files)?;
        } else if SourceFormat::from_path(&path).is_some() {
            files.push(path);
        }
    }
    Ok(())
}
