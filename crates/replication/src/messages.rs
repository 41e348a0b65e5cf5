use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::DocumentKind;

/// Message pushed from the server to every connected client after a
/// successful write. Carries the full replacement document for its kind;
/// receivers replace their local copy wholesale, so re-applying one's own
/// broadcast is harmless.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum PushEvent {
    DataUpdated(Value),
    ChecklistUpdated(Value),
    DoctorsUpdated(Value),
}

impl PushEvent {
    pub fn new(kind: DocumentKind, document: Value) -> Self {
        match kind {
            DocumentKind::Templates => PushEvent::DataUpdated(document),
            DocumentKind::Checklist => PushEvent::ChecklistUpdated(document),
            DocumentKind::DoctorColors => PushEvent::DoctorsUpdated(document),
        }
    }

    pub fn kind(&self) -> DocumentKind {
        match self {
            PushEvent::DataUpdated(_) => DocumentKind::Templates,
            PushEvent::ChecklistUpdated(_) => DocumentKind::Checklist,
            PushEvent::DoctorsUpdated(_) => DocumentKind::DoctorColors,
        }
    }

    pub fn document(&self) -> &Value {
        match self {
            PushEvent::DataUpdated(document)
            | PushEvent::ChecklistUpdated(document)
            | PushEvent::DoctorsUpdated(document) => document,
        }
    }

    pub fn into_document(self) -> Value {
        match self {
            PushEvent::DataUpdated(document)
            | PushEvent::ChecklistUpdated(document)
            | PushEvent::DoctorsUpdated(document) => document,
        }
    }
}
