use serde::{Deserialize, Serialize};

/// The three independently-synchronized documents. Each has its own snapshot
/// endpoint and its own push event; all three follow the same
/// replace-wholesale contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Templates,
    Checklist,
    DoctorColors,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [
        DocumentKind::Templates,
        DocumentKind::Checklist,
        DocumentKind::DoctorColors,
    ];

    pub fn api_path(&self) -> &'static str {
        match self {
            DocumentKind::Templates => "/api/data",
            DocumentKind::Checklist => "/api/checklist",
            DocumentKind::DoctorColors => "/api/doctors",
        }
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            DocumentKind::Templates => "data_updated",
            DocumentKind::Checklist => "checklist_updated",
            DocumentKind::DoctorColors => "doctors_updated",
        }
    }

    pub fn from_event_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.event_name() == name)
    }
}
