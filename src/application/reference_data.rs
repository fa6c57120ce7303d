// Read-only access to companies, dataloggers and readings
use crate::domain::reference::{Company, Datalogger, DataloggerOption, Reading};

pub trait ReferenceDataProvider: Send + Sync {
    /// Company → project → datalogger hierarchy.
    fn companies(&self) -> &[Company];

    /// All readings, in no particular order.
    fn readings(&self) -> &[Reading];

    fn datalogger(&self, id: &str) -> Option<&Datalogger> {
        self.companies()
            .iter()
            .flat_map(|c| c.dataloggers())
            .map(|(_, d)| d)
            .find(|d| d.id == id)
    }

    /// Every datalogger labelled "company - project - datalogger", in hierarchy order.
    fn datalogger_options(&self) -> Vec<DataloggerOption> {
        self.companies()
            .iter()
            .flat_map(|company| {
                company.dataloggers().map(move |(project, datalogger)| DataloggerOption {
                    id: datalogger.id.clone(),
                    label: format!("{} - {} - {}", company.name, project.name, datalogger.name),
                    variables: datalogger.variables.clone(),
                })
            })
            .collect()
    }
}

/// Reference data held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReferenceData {
    companies: Vec<Company>,
    readings: Vec<Reading>,
}

impl InMemoryReferenceData {
    pub fn new(companies: Vec<Company>, readings: Vec<Reading>) -> Self {
        Self { companies, readings }
    }
}

impl ReferenceDataProvider for InMemoryReferenceData {
    fn companies(&self) -> &[Company] {
        &self.companies
    }

    fn readings(&self) -> &[Reading] {
        &self.readings
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::InMemoryReferenceData;
    use crate::domain::reference::{Company, Datalogger, Location, Project, ProjectType, Reading};
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::BTreeMap;

    pub fn datalogger(id: &str, project_id: &str, variables: &[&str]) -> Datalogger {
        Datalogger {
            id: id.to_string(),
            project_id: project_id.to_string(),
            serial: format!("SN-{}", id),
            name: format!("Station {}", id),
            kind: "calidadAire".to_string(),
            location: Location {
                name: "Centro".to_string(),
                latitude: 7.119349,
                longitude: -73.122742,
            },
            variables: variables.iter().map(|v| v.to_string()).collect(),
            last_activity: base_time(),
        }
    }

    pub fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    pub fn reading(datalogger_id: &str, hours_ago: i64, values: &[(&str, f64)]) -> Reading {
        Reading {
            timestamp: base_time() - chrono::Duration::hours(hours_ago),
            datalogger_id: datalogger_id.to_string(),
            variables: values
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    /// Two companies, three dataloggers with overlapping variables.
    pub fn sample() -> InMemoryReferenceData {
        let companies = vec![
            Company {
                id: "cdmb".to_string(),
                name: "CDMB".to_string(),
                logo: None,
                description: String::new(),
                projects: vec![Project {
                    id: "cdmb-air".to_string(),
                    company_id: "cdmb".to_string(),
                    name: "Red de Calidad del Aire".to_string(),
                    kind: ProjectType::Air,
                    description: String::new(),
                    dataloggers: vec![
                        datalogger("cdmb-air-001", "cdmb-air", &["PM2.5", "PM10", "temperatura"]),
                        datalogger("cdmb-air-002", "cdmb-air", &["PM2.5", "CO2"]),
                    ],
                }],
            },
            Company {
                id: "cerrejon".to_string(),
                name: "Cerrejón".to_string(),
                logo: None,
                description: String::new(),
                projects: vec![Project {
                    id: "cerrejon-noise".to_string(),
                    company_id: "cerrejon".to_string(),
                    name: "Ruido".to_string(),
                    kind: ProjectType::Noise,
                    description: String::new(),
                    dataloggers: vec![datalogger("cerrejon-noise-001", "cerrejon-noise", &["ruido"])],
                }],
            },
        ];

        let readings = vec![
            reading("cdmb-air-001", 1, &[("PM2.5", 30.0), ("temperatura", 24.0)]),
            reading("cdmb-air-001", 2, &[("PM2.5", 20.0), ("temperatura", 22.0)]),
            reading("cdmb-air-001", 3, &[("PM2.5", 40.0), ("temperatura", 26.0)]),
            reading("cdmb-air-001", 72, &[("PM2.5", 90.0), ("temperatura", 30.0)]),
            reading("cdmb-air-002", 1, &[("PM2.5", 12.5), ("CO2", 410.0)]),
        ];

        InMemoryReferenceData::new(companies, readings)
    }
}
