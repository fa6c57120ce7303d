// Reference data: companies, projects, dataloggers and their readings
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub projects: Vec<Project>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    Air,
    Water,
    Noise,
    Multiple,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub company_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ProjectType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub dataloggers: Vec<Datalogger>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Datalogger {
    pub id: String,
    pub project_id: String,
    pub serial: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub location: Location,
    #[serde(default)]
    pub variables: Vec<String>,
    pub last_activity: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub datalogger_id: String,
    #[serde(default)]
    pub variables: BTreeMap<String, f64>,
}

/// A datalogger together with the names of its owners, for selection lists.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataloggerOption {
    pub id: String,
    pub label: String,
    pub variables: Vec<String>,
}

impl Company {
    pub fn dataloggers(&self) -> impl Iterator<Item = (&Project, &Datalogger)> {
        self.projects
            .iter()
            .flat_map(|p| p.dataloggers.iter().map(move |d| (p, d)))
    }
}
