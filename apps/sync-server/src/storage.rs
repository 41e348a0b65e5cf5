//! JSON-file storage, one file per replicated document. Reads are forgiving:
//! a missing, empty, or corrupt file degrades to the document's default
//! instead of failing the server. Writes are whole-file replacements and are
//! validated by the API layer before they get here.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use replication::DocumentKind;
use serde_json::{json, Value};
use templates::{repair_order, TemplateTree};
use tracing::warn;

pub const UNASSIGNED_DOCTOR: &str = "Unassigned";
pub const UNASSIGNED_COLOR: &str = "#808080";

pub struct SnapshotStore {
    data_dir: PathBuf,
    templates: RwLock<TemplateTree>,
    checklist: RwLock<Value>,
    doctors: RwLock<Value>,
}

impl SnapshotStore {
    pub fn new(data_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)?;

        let templates = load_templates(&data_dir.join(file_name(DocumentKind::Templates)));
        let checklist = load_object(&data_dir.join(file_name(DocumentKind::Checklist)))
            .unwrap_or_else(|| json!({}));
        let mut doctors = load_object(&data_dir.join(file_name(DocumentKind::DoctorColors)))
            .unwrap_or_else(|| json!({}));
        ensure_unassigned(&mut doctors);

        Ok(Self {
            data_dir,
            templates: RwLock::new(templates),
            checklist: RwLock::new(checklist),
            doctors: RwLock::new(doctors),
        })
    }

    pub fn templates(&self) -> TemplateTree {
        self.templates.read().clone()
    }

    pub fn store_templates(&self, tree: &TemplateTree) -> anyhow::Result<()> {
        self.persist(DocumentKind::Templates, &serde_json::to_value(tree)?)?;
        *self.templates.write() = tree.clone();
        Ok(())
    }

    pub fn checklist(&self) -> Value {
        self.checklist.read().clone()
    }

    pub fn store_checklist(&self, document: Value) -> anyhow::Result<()> {
        self.persist(DocumentKind::Checklist, &document)?;
        *self.checklist.write() = document;
        Ok(())
    }

    pub fn doctors(&self) -> Value {
        self.doctors.read().clone()
    }

    /// Stores the doctor registry, re-inserting the default entry when a
    /// client omits it. Returns the document as stored, for broadcasting.
    pub fn store_doctors(&self, mut document: Value) -> anyhow::Result<Value> {
        ensure_unassigned(&mut document);
        self.persist(DocumentKind::DoctorColors, &document)?;
        *self.doctors.write() = document.clone();
        Ok(document)
    }

    fn persist(&self, kind: DocumentKind, document: &Value) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(document)?;
        fs::write(self.data_dir.join(file_name(kind)), json)?;
        Ok(())
    }
}

fn file_name(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::Templates => "data.json",
        DocumentKind::Checklist => "checklist.json",
        DocumentKind::DoctorColors => "doctors.json",
    }
}

fn load_templates(path: &Path) -> TemplateTree {
    let Some(raw) = read_non_empty(path) else {
        return TemplateTree::new();
    };
    // The decoder reconciles duplicate top-level names from legacy files.
    match serde_json::from_str::<TemplateTree>(&raw) {
        Ok(mut tree) => {
            repair_order(&mut tree.root);
            tree
        }
        Err(e) => {
            warn!("Discarding corrupt template file {}: {}", path.display(), e);
            TemplateTree::new()
        }
    }
}

fn load_object(path: &Path) -> Option<Value> {
    let raw = read_non_empty(path)?;
    match serde_json::from_str::<Value>(&raw) {
        Ok(value) if value.is_object() => Some(value),
        Ok(_) => {
            warn!("Ignoring non-mapping document in {}", path.display());
            None
        }
        Err(e) => {
            warn!("Discarding corrupt document {}: {}", path.display(), e);
            None
        }
    }
}

fn read_non_empty(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(raw) if !raw.trim().is_empty() => Some(raw),
        Ok(_) => None,
        Err(_) => None,
    }
}

fn ensure_unassigned(doctors: &mut Value) {
    if let Some(map) = doctors.as_object_mut() {
        map.entry(UNASSIGNED_DOCTOR.to_string())
            .or_insert_with(|| Value::String(UNASSIGNED_COLOR.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use templates::{apply_command, TreeCommand};

    #[test]
    fn missing_files_load_as_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path()).unwrap();

        assert_eq!(store.templates(), TemplateTree::new());
        assert_eq!(store.checklist(), json!({}));
        assert_eq!(
            store.doctors(),
            json!({ UNASSIGNED_DOCTOR: UNASSIGNED_COLOR })
        );
    }

    #[test]
    fn templates_survive_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let mut tree = TemplateTree::new();
        apply_command(
            &mut tree,
            TreeCommand::AddCategory {
                parent: vec![],
                name: "Ortho".to_string(),
            },
        )
        .unwrap();

        {
            let store = SnapshotStore::new(dir.path()).unwrap();
            store.store_templates(&tree).unwrap();
        }
        let reopened = SnapshotStore::new(dir.path()).unwrap();
        assert_eq!(reopened.templates(), tree);
    }

    #[test]
    fn corrupt_template_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("data.json"), "{not json").unwrap();

        let store = SnapshotStore::new(dir.path()).unwrap();
        assert_eq!(store.templates(), TemplateTree::new());
    }

    #[test]
    fn legacy_duplicate_keys_are_reconciled_on_load() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("data.json"),
            r#"{"Ortho": {"A": {}}, "Ortho": {"B": {}}}"#,
        )
        .unwrap();

        let store = SnapshotStore::new(dir.path()).unwrap();
        let tree = store.templates();
        let ortho = tree.root.child("Ortho").unwrap();
        assert!(ortho.has_child("A"));
        assert!(ortho.has_child("B"));
        assert_eq!(ortho.child_order(), ["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn stale_order_lists_are_repaired_on_load() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("data.json"),
            r#"{"B": {}, "A": {}, "_sort_order": ["B", "Ghost"]}"#,
        )
        .unwrap();

        let store = SnapshotStore::new(dir.path()).unwrap();
        let tree = store.templates();
        assert_eq!(tree.root.child_order(), ["B".to_string(), "A".to_string()]);
    }

    #[test]
    fn doctors_always_keep_the_default_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path()).unwrap();

        let stored = store
            .store_doctors(json!({ "Dr. Hart": "#ff0000" }))
            .unwrap();
        assert_eq!(stored[UNASSIGNED_DOCTOR], UNASSIGNED_COLOR);
        assert_eq!(store.doctors()["Dr. Hart"], "#ff0000");
    }

    #[test]
    fn non_mapping_checklist_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("checklist.json"), "[1, 2, 3]").unwrap();

        let store = SnapshotStore::new(dir.path()).unwrap();
        assert_eq!(store.checklist(), json!({}));
    }
}
