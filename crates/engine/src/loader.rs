//! Template loader.
//!
//! Parses YAML or JSON template sources into [`EntityTemplate`]s. Top-level
//! keys dispatch four ways: the known template properties (`tags`,
//! `inherits`, `components`) merge additively; `$ref` loads another template
//! file as an embedded template; `$merge-ref` loads another file and merges
//! it in (local declarations win); any other mapping-valued key is an inline
//! embedded template named after the key. Everything else is a parse error
//! naming the offending key.

use std::path::{Path, PathBuf};

use tracing::debug;

use entforge_domain::{EntityTemplate, ScalarValue, TemplateValue};

use crate::error::ParseError;

const REF_KEY: &str = "$ref";
const MERGE_REF_KEY: &str = "$merge-ref";

/// Source format of a template document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Yaml,
    Json,
}

impl SourceFormat {
    /// Detects the format from a file extension; `None` for anything other
    /// than .yaml/.yml/.json.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            ext if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Some(Self::Yaml)
            }
            ext if ext.eq_ignore_ascii_case("json") => Some(Self::Json),
            _ => None,
        }
    }
}

/// Loader for entity templates. Reference meta-properties resolve relative
/// to the loader's base directory (or, inside a referenced file, relative
/// to that file's own directory).
#[derive(Debug, Clone, Default)]
pub struct TemplateLoader {
    base_dir: PathBuf,
}

impl TemplateLoader {
    /// A loader resolving references against the current directory.
    pub fn new() -> Self {
        Self {
            base_dir: PathBuf::from("."),
        }
    }

    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Parses template source text. The resulting template is nameless;
    /// naming is the caller's (repository's) context to provide.
    pub fn parse_str(&self, text: &str, format: SourceFormat) -> Result<EntityTemplate, ParseError> {
        let value = parse_document(text, format)?;
        self.parse_value_inner(&value, &self.base_dir, &mut Vec::new())
    }

    /// Parses an already-deserialized structured value.
    pub fn parse_value(&self, value: &TemplateValue) -> Result<EntityTemplate, ParseError> {
        self.parse_value_inner(value, &self.base_dir, &mut Vec::new())
    }

    /// Loads a template from a file, detecting the format from the
    /// extension. The template is left nameless.
    pub fn load_file(&self, path: &Path) -> Result<EntityTemplate, ParseError> {
        self.load_file_inner(path, &mut Vec::new())
    }

    fn load_file_inner(
        &self,
        path: &Path,
        in_progress: &mut Vec<PathBuf>,
    ) -> Result<EntityTemplate, ParseError> {
        let format =
            SourceFormat::from_path(path).ok_or_else(|| ParseError::UnsupportedExtension {
                path: path.to_path_buf(),
            })?;

        let identity = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if in_progress.contains(&identity) {
            return Err(ParseError::CircularReference {
                path: path.to_path_buf(),
            });
        }
        in_progress.push(identity);

        let text = std::fs::read_to_string(path).map_err(|e| ParseError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let value = parse_document(&text, format)?;
        let base_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        let template = self.parse_value_inner(&value, &base_dir, in_progress)?;

        in_progress.pop();
        debug!(path = %path.display(), "loaded template file");
        Ok(template)
    }

    fn parse_value_inner(
        &self,
        value: &TemplateValue,
        base_dir: &Path,
        in_progress: &mut Vec<PathBuf>,
    ) -> Result<EntityTemplate, ParseError> {
        let entries = value.as_mapping().ok_or(ParseError::NotAMapping)?;

        let mut template = EntityTemplate::new();
        let mut merge_refs = Vec::new();

        for (key, entry) in entries {
            if key.eq_ignore_ascii_case("tags") {
                for tag in parse_string_sequence(key, entry)? {
                    template.add_tag(tag);
                }
            } else if key.eq_ignore_ascii_case("inherits") {
                for name in parse_string_sequence(key, entry)? {
                    template.add_inherit(name);
                }
            } else if key.eq_ignore_ascii_case("components") {
                let components =
                    entry
                        .as_mapping()
                        .ok_or_else(|| ParseError::MalformedProperty {
                            key: key.clone(),
                            expected: "mapping of component names to payloads",
                        })?;
                for (name, payload) in components {
                    template.add_component(name.clone(), payload.clone());
                }
            } else if let Some(ScalarValue::String(reference)) = entry.as_scalar() {
                if key.eq_ignore_ascii_case(REF_KEY) {
                    let mut embedded =
                        self.load_file_inner(&base_dir.join(reference), in_progress)?;
                    embedded.set_name(reference.clone());
                    template.add_embedded(embedded);
                } else if key.eq_ignore_ascii_case(MERGE_REF_KEY) {
                    merge_refs.push(reference.clone());
                } else {
                    return Err(ParseError::UnrecognizedMetaProperty { key: key.clone() });
                }
            } else if entry.is_mapping() {
                // Inline embedded template, named after its key.
                let mut embedded = self.parse_value_inner(entry, base_dir, in_progress)?;
                embedded.set_name(key.clone());
                template.add_embedded(embedded);
            } else {
                return Err(ParseError::UnexpectedProperty { key: key.clone() });
            }
        }

        // Merge-refs apply after every local declaration so that local
        // fields win regardless of key order in the document.
        for reference in merge_refs {
            let mut other = self.load_file_inner(&base_dir.join(&reference), in_progress)?;
            other.set_name(reference);
            template.merge_with(&other);
        }

        Ok(template)
    }
}

fn parse_string_sequence(key: &str, value: &TemplateValue) -> Result<Vec<String>, ParseError> {
    let items = value.as_sequence().ok_or_else(|| ParseError::MalformedProperty {
        key: key.to_string(),
        expected: "sequence of strings",
    })?;
    items
        .iter()
        .map(|item| {
            item.as_scalar()
                .and_then(ScalarValue::as_str)
                .map(ToString::to_string)
                .ok_or_else(|| ParseError::MalformedProperty {
                    key: key.to_string(),
                    expected: "sequence of strings",
                })
        })
        .collect()
}

fn parse_document(text: &str, format: SourceFormat) -> Result<TemplateValue, ParseError> {
    let value = match format {
        SourceFormat::Yaml => {
            let raw: serde_yaml::Value =
                serde_yaml::from_str(text).map_err(|e| ParseError::Syntax {
                    format: "YAML",
                    reason: e.to_string(),
                })?;
            template_value_from_yaml(raw)?
        }
        SourceFormat::Json => {
            let raw: serde_json::Value =
                serde_json::from_str(text).map_err(|e| ParseError::Syntax {
                    format: "JSON",
                    reason: e.to_string(),
                })?;
            template_value_from_json(raw)?
        }
    };
    if !value.is_mapping() {
        return Err(ParseError::NotAMapping);
    }
    Ok(value)
}

/// Converts a deserialized YAML value into the structured value model.
/// Nulls become empty mappings, the usual YAML idiom for marker entries.
pub fn template_value_from_yaml(value: serde_yaml::Value) -> Result<TemplateValue, ParseError> {
    match value {
        serde_yaml::Value::Null => Ok(TemplateValue::Mapping(Vec::new())),
        serde_yaml::Value::Bool(b) => Ok(TemplateValue::bool(b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(TemplateValue::int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(TemplateValue::float(f))
            } else {
                Err(ParseError::UnsupportedValue(format!(
                    "number out of range: {n}"
                )))
            }
        }
        serde_yaml::Value::String(s) => Ok(TemplateValue::string(s)),
        serde_yaml::Value::Sequence(items) => Ok(TemplateValue::Sequence(
            items
                .into_iter()
                .map(template_value_from_yaml)
                .collect::<Result<_, _>>()?,
        )),
        serde_yaml::Value::Mapping(mapping) => {
            let mut entries = Vec::with_capacity(mapping.len());
            for (key, entry) in mapping {
                let serde_yaml::Value::String(key) = key else {
                    return Err(ParseError::NonStringKey {
                        key: format!("{key:?}"),
                    });
                };
                entries.push((key, template_value_from_yaml(entry)?));
            }
            Ok(TemplateValue::Mapping(entries))
        }
        serde_yaml::Value::Tagged(tagged) => Err(ParseError::UnsupportedValue(format!(
            "tagged value '{}'",
            tagged.tag
        ))),
    }
}

/// Converts a deserialized JSON value into the structured value model.
pub fn template_value_from_json(value: serde_json::Value) -> Result<TemplateValue, ParseError> {
    match value {
        serde_json::Value::Null => Ok(TemplateValue::Mapping(Vec::new())),
        serde_json::Value::Bool(b) => Ok(TemplateValue::bool(b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(TemplateValue::int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(TemplateValue::float(f))
            } else {
                Err(ParseError::UnsupportedValue(format!(
                    "number out of range: {n}"
                )))
            }
        }
        serde_json::Value::String(s) => Ok(TemplateValue::string(s)),
        serde_json::Value::Array(items) => Ok(TemplateValue::Sequence(
            items
                .into_iter()
                .map(template_value_from_json)
                .collect::<Result<_, _>>()?,
        )),
        serde_json::Value::Object(object) => Ok(TemplateValue::Mapping(
            object
                .into_iter()
                .map(|(key, entry)| Ok((key, template_value_from_json(entry)?)))
                .collect::<Result<_, ParseError>>()?,
        )),
    }
}
