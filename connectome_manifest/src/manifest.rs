//! The manifest tree and its JSON configuration file.
//!
//! A manifest is a three-level hierarchy: group → modality → ordered list
//! of file paths. It lives under the `data_loading` key of a larger JSON
//! configuration document; every other key in that document passes through
//! untouched.
//!
//! Everything here is GUI-independent and fully synchronous.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

/// Top-level configuration key owned by this tool.
pub const DATA_LOADING_KEY: &str = "data_loading";

#[derive(Debug)]
pub enum ManifestError {
    Io(std::io::Error),
    /// The configuration file did not parse as JSON.
    InvalidJson(serde_json::Error),
    /// The configuration parsed, but its top level is not an object.
    NotAnObject,
    /// The `data_loading` value has the wrong shape.
    MalformedTree(String),
    UnknownGroup(String),
    UnknownModality { group: String, modality: String },
}

impl fmt::Display for ManifestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestError::Io(err) => write!(f, "IO error: {err}"),
            ManifestError::InvalidJson(err) => {
                write!(f, "configuration is not valid JSON: {err}")
            }
            ManifestError::NotAnObject => {
                write!(f, "configuration top level must be a JSON object")
            }
            ManifestError::MalformedTree(msg) => write!(f, "malformed data_loading tree: {msg}"),
            ManifestError::UnknownGroup(group) => write!(f, "no such group: {group}"),
            ManifestError::UnknownModality { group, modality } => {
                write!(f, "no such modality {modality} in group {group}")
            }
        }
    }
}

impl std::error::Error for ManifestError {}

impl From<std::io::Error> for ManifestError {
    fn from(value: std::io::Error) -> Self {
        ManifestError::Io(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Modality {
    pub name: String,
    /// Append-ordered; duplicates allowed until a removal collapses them.
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Group {
    pub name: String,
    pub modalities: Vec<Modality>,
}

/// The group → modality → files hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestTree {
    groups: Vec<Group>,
}

impl ManifestTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    fn group_mut(&mut self, name: &str) -> Result<&mut Group, ManifestError> {
        self.groups
            .iter_mut()
            .find(|g| g.name == name)
            .ok_or_else(|| ManifestError::UnknownGroup(name.to_string()))
    }

    fn modality_mut(
        &mut self,
        group: &str,
        modality: &str,
    ) -> Result<&mut Modality, ManifestError> {
        let group_name = group.to_string();
        self.group_mut(group)?
            .modalities
            .iter_mut()
            .find(|m| m.name == modality)
            .ok_or_else(|| ManifestError::UnknownModality {
                group: group_name,
                modality: modality.to_string(),
            })
    }

    /// Add a group; existing names are left untouched.
    pub fn add_group(&mut self, name: &str) -> bool {
        if name.is_empty() || self.group(name).is_some() {
            return false;
        }
        self.groups.push(Group {
            name: name.to_string(),
            modalities: Vec::new(),
        });
        true
    }

    /// Remove a group and its entire modality/file subtree.
    pub fn remove_group(&mut self, name: &str) -> bool {
        let before = self.groups.len();
        self.groups.retain(|g| g.name != name);
        self.groups.len() != before
    }

    pub fn clear_groups(&mut self) {
        self.groups.clear();
    }

    /// Add a modality under an existing group; idempotent on the name.
    pub fn add_modality(&mut self, group: &str, name: &str) -> Result<bool, ManifestError> {
        let group = self.group_mut(group)?;
        if name.is_empty() || group.modalities.iter().any(|m| m.name == name) {
            return Ok(false);
        }
        group.modalities.push(Modality {
            name: name.to_string(),
            files: Vec::new(),
        });
        Ok(true)
    }

    pub fn remove_modality(&mut self, group: &str, name: &str) -> Result<bool, ManifestError> {
        let group = self.group_mut(group)?;
        let before = group.modalities.len();
        group.modalities.retain(|m| m.name != name);
        Ok(group.modalities.len() != before)
    }

    pub fn clear_modalities(&mut self, group: &str) -> Result<(), ManifestError> {
        self.group_mut(group)?.modalities.clear();
        Ok(())
    }

    pub fn files(&self, group: &str, modality: &str) -> Option<&[String]> {
        self.group(group)?
            .modalities
            .iter()
            .find(|m| m.name == modality)
            .map(|m| m.files.as_slice())
    }

    /// Append files to a (group, modality) list. Appends, never replaces.
    pub fn add_files<I>(&mut self, group: &str, modality: &str, paths: I) -> Result<(), ManifestError>
    where
        I: IntoIterator<Item = String>,
    {
        self.modality_mut(group, modality)?.files.extend(paths);
        Ok(())
    }

    /// Remove every occurrence of `path` from the list; other entries keep
    /// their order.
    pub fn remove_file(
        &mut self,
        group: &str,
        modality: &str,
        path: &str,
    ) -> Result<bool, ManifestError> {
        let files = &mut self.modality_mut(group, modality)?.files;
        let before = files.len();
        files.retain(|f| f != path);
        Ok(files.len() != before)
    }

    pub fn clear_files(&mut self, group: &str, modality: &str) -> Result<(), ManifestError> {
        self.modality_mut(group, modality)?.files.clear();
        Ok(())
    }

    /// The JSON value stored under [`DATA_LOADING_KEY`].
    pub fn to_json(&self) -> Value {
        let mut groups = Map::new();
        for group in &self.groups {
            let mut modalities = Map::new();
            for modality in &group.modalities {
                let files = modality
                    .files
                    .iter()
                    .map(|f| Value::String(f.clone()))
                    .collect();
                modalities.insert(modality.name.clone(), Value::Array(files));
            }
            groups.insert(group.name.clone(), Value::Object(modalities));
        }
        Value::Object(groups)
    }

    /// Rebuild a tree from the stored JSON value.
    pub fn from_json(value: &Value) -> Result<Self, ManifestError> {
        let groups_map = value
            .as_object()
            .ok_or_else(|| ManifestError::MalformedTree("groups must be an object".into()))?;

        let mut groups = Vec::with_capacity(groups_map.len());
        for (group_name, modalities_value) in groups_map {
            let modalities_map = modalities_value.as_object().ok_or_else(|| {
                ManifestError::MalformedTree(format!("group {group_name} must hold an object"))
            })?;

            let mut modalities = Vec::with_capacity(modalities_map.len());
            for (modality_name, files_value) in modalities_map {
                let files_array = files_value.as_array().ok_or_else(|| {
                    ManifestError::MalformedTree(format!(
                        "modality {modality_name} must hold an array"
                    ))
                })?;
                let mut files = Vec::with_capacity(files_array.len());
                for file in files_array {
                    let file = file.as_str().ok_or_else(|| {
                        ManifestError::MalformedTree("file entries must be strings".into())
                    })?;
                    files.push(file.to_string());
                }
                modalities.push(Modality {
                    name: modality_name.clone(),
                    files,
                });
            }
            groups.push(Group {
                name: group_name.clone(),
                modalities,
            });
        }

        Ok(Self { groups })
    }
}

/// Explicit selection state for the editor.
///
/// Initialized empty at construction and changed only through these
/// transitions; nothing downstream probes for attributes that may not
/// exist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub group: Option<String>,
    pub modality: Option<String>,
    pub file: Option<String>,
}

impl Selection {
    /// Selecting a different group drops the modality and file selection.
    pub fn select_group(&mut self, name: &str) {
        if self.group.as_deref() != Some(name) {
            self.group = Some(name.to_string());
            self.modality = None;
            self.file = None;
        }
    }

    /// Selecting a different modality drops the file selection.
    pub fn select_modality(&mut self, name: &str) {
        if self.modality.as_deref() != Some(name) {
            self.modality = Some(name.to_string());
            self.file = None;
        }
    }

    pub fn select_file(&mut self, path: &str) {
        self.file = Some(path.to_string());
    }

    /// Removing a group invalidates any selection that pointed into it.
    pub fn on_group_removed(&mut self, name: &str) {
        if self.group.as_deref() == Some(name) {
            self.group = None;
            self.modality = None;
            self.file = None;
        }
    }

    pub fn on_modality_removed(&mut self, group: &str, modality: &str) {
        if self.group.as_deref() == Some(group) && self.modality.as_deref() == Some(modality) {
            self.modality = None;
            self.file = None;
        }
    }

    pub fn on_file_removed(&mut self, path: &str) {
        if self.file.as_deref() == Some(path) {
            self.file = None;
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// A loaded JSON configuration document plus the path it came from.
///
/// Only the `data_loading` key is ever rewritten; all other top-level keys
/// round-trip unchanged.
pub struct ConfigurationFile {
    path: PathBuf,
    document: Map<String, Value>,
}

impl ConfigurationFile {
    /// Parse a configuration file. On any failure the path is discarded
    /// along with the content: the caller holds no configuration afterward.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ManifestError> {
        let path = path.as_ref().to_path_buf();
        let contents = fs::read_to_string(&path)?;
        let value: Value = serde_json::from_str(&contents).map_err(ManifestError::InvalidJson)?;
        let document = match value {
            Value::Object(map) => map,
            _ => return Err(ManifestError::NotAnObject),
        };
        Ok(Self { path, document })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The manifest stored in the document, or an empty tree if the key is
    /// absent.
    pub fn manifest(&self) -> Result<ManifestTree, ManifestError> {
        match self.document.get(DATA_LOADING_KEY) {
            Some(value) => ManifestTree::from_json(value),
            None => Ok(ManifestTree::new()),
        }
    }

    /// Write the tree under `data_loading` and persist the whole document.
    pub fn save(&mut self, tree: &ManifestTree) -> Result<(), ManifestError> {
        self.document
            .insert(DATA_LOADING_KEY.to_string(), tree.to_json());
        let rendered = serde_json::to_string_pretty(&Value::Object(self.document.clone()))
            .map_err(ManifestError::InvalidJson)?;
        fs::write(&self.path, rendered)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn add_group_is_idempotent() {
        let mut tree = ManifestTree::new();
        assert!(tree.add_group("G1"));
        assert!(!tree.add_group("G1"));
        assert_eq!(tree.groups().len(), 1);
    }

    #[test]
    fn add_modality_requires_a_group() {
        let mut tree = ManifestTree::new();
        assert!(matches!(
            tree.add_modality("missing", "M1"),
            Err(ManifestError::UnknownGroup(_))
        ));

        tree.add_group("G1");
        assert!(tree.add_modality("G1", "M1").unwrap());
        assert!(!tree.add_modality("G1", "M1").unwrap());
    }

    #[test]
    fn add_files_appends_rather_than_replaces() {
        let mut tree = ManifestTree::new();
        tree.add_group("G1");
        tree.add_modality("G1", "M1").unwrap();

        tree.add_files("G1", "M1", vec!["a.txt".into()]).unwrap();
        tree.add_files("G1", "M1", vec!["b.txt".into(), "c.txt".into()])
            .unwrap();

        assert_eq!(
            tree.files("G1", "M1").unwrap(),
            &["a.txt", "b.txt", "c.txt"]
        );
    }

    #[test]
    fn remove_file_removes_exactly_that_entry() {
        let mut tree = ManifestTree::new();
        tree.add_group("G1");
        tree.add_modality("G1", "M1").unwrap();
        tree.add_files(
            "G1",
            "M1",
            vec!["a.txt".into(), "b.txt".into(), "a.txt".into(), "c.txt".into()],
        )
        .unwrap();

        assert!(tree.remove_file("G1", "M1", "a.txt").unwrap());
        assert_eq!(tree.files("G1", "M1").unwrap(), &["b.txt", "c.txt"]);
        assert!(!tree.remove_file("G1", "M1", "a.txt").unwrap());
    }

    #[test]
    fn remove_group_drops_the_whole_subtree() {
        let mut tree = ManifestTree::new();
        tree.add_group("G1");
        tree.add_modality("G1", "M1").unwrap();
        tree.add_files("G1", "M1", vec!["a.txt".into()]).unwrap();

        assert!(tree.remove_group("G1"));
        assert!(tree.is_empty());
        assert!(tree.files("G1", "M1").is_none());
    }

    #[test]
    fn json_round_trip_preserves_the_tree() {
        let mut tree = ManifestTree::new();
        tree.add_group("G1");
        tree.add_modality("G1", "M1").unwrap();
        tree.add_files("G1", "M1", vec!["a.txt".into(), "b.txt".into()])
            .unwrap();
        tree.add_group("G2");

        let restored = ManifestTree::from_json(&tree.to_json()).unwrap();
        assert_eq!(restored, tree);
    }

    #[test]
    fn selection_transitions_reset_downstream_state() {
        let mut selection = Selection::default();
        selection.select_group("G1");
        selection.select_modality("M1");
        selection.select_file("a.txt");

        // Re-selecting the same group changes nothing.
        selection.select_group("G1");
        assert_eq!(selection.modality.as_deref(), Some("M1"));

        // A different group drops modality and file.
        selection.select_group("G2");
        assert_eq!(selection.group.as_deref(), Some("G2"));
        assert!(selection.modality.is_none());
        assert!(selection.file.is_none());
    }

    #[test]
    fn removals_invalidate_matching_selections() {
        let mut selection = Selection::default();
        selection.select_group("G1");
        selection.select_modality("M1");
        selection.select_file("a.txt");

        selection.on_modality_removed("G1", "other");
        assert_eq!(selection.modality.as_deref(), Some("M1"));

        selection.on_modality_removed("G1", "M1");
        assert!(selection.modality.is_none());
        assert!(selection.file.is_none());
        assert_eq!(selection.group.as_deref(), Some("G1"));

        selection.on_group_removed("G1");
        assert!(selection.group.is_none());
    }

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write");
        file
    }

    #[test]
    fn load_rejects_invalid_json() {
        let file = write_temp("{not json");
        assert!(matches!(
            ConfigurationFile::load(file.path()),
            Err(ManifestError::InvalidJson(_))
        ));
    }

    #[test]
    fn load_rejects_non_object_documents() {
        let file = write_temp("[1, 2, 3]");
        assert!(matches!(
            ConfigurationFile::load(file.path()),
            Err(ManifestError::NotAnObject)
        ));
    }

    #[test]
    fn save_and_reload_reproduce_the_data_loading_subtree() {
        let file = write_temp(r#"{"version": 3, "other_tool": {"keep": true}}"#);

        let mut config = ConfigurationFile::load(file.path()).unwrap();
        let mut tree = ManifestTree::new();
        tree.add_group("G1");
        tree.add_modality("G1", "M1").unwrap();
        tree.add_files("G1", "M1", vec!["a.txt".into(), "b.txt".into()])
            .unwrap();
        config.save(&tree).unwrap();

        let reloaded = ConfigurationFile::load(file.path()).unwrap();
        assert_eq!(reloaded.manifest().unwrap(), tree);

        // Foreign keys pass through the save untouched.
        let raw: Value =
            serde_json::from_str(&std::fs::read_to_string(file.path()).unwrap()).unwrap();
        assert_eq!(raw["version"], Value::from(3));
        assert_eq!(raw["other_tool"]["keep"], Value::from(true));
    }

    #[test]
    fn manifest_defaults_to_empty_without_the_key() {
        let file = write_temp(r#"{"version": 1}"#);
        let config = ConfigurationFile::load(file.path()).unwrap();
        assert!(config.manifest().unwrap().is_empty());
    }
}
