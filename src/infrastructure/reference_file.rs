// Reference data loaded from a TOML file
use crate::application::reference_data::InMemoryReferenceData;
use crate::domain::reference::{Company, Reading};
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct ReferenceFile {
    #[serde(default)]
    companies: Vec<Company>,
    #[serde(default)]
    readings: Vec<Reading>,
    #[serde(default)]
    synthetic: Option<SyntheticReadings>,
}

/// Hourly readings generated for every datalogger, ending at startup time.
#[derive(Debug, Deserialize)]
struct SyntheticReadings {
    hours: u32,
}

pub fn load_reference_data(path: impl AsRef<Path>, now: DateTime<Utc>) -> anyhow::Result<InMemoryReferenceData> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_reference_data(&raw, now).with_context(|| format!("parsing {}", path.display()))
}

pub fn parse_reference_data(raw: &str, now: DateTime<Utc>) -> anyhow::Result<InMemoryReferenceData> {
    let mut file: ReferenceFile = toml::from_str(raw)?;

    if let Some(synthetic) = &file.synthetic {
        for company in &mut file.companies {
            for project in &mut company.projects {
                for datalogger in &mut project.dataloggers {
                    datalogger.last_activity = now;
                    file.readings
                        .extend(synthesize(&datalogger.id, &datalogger.variables, synthetic.hours, now));
                }
            }
        }
    }

    let dataloggers: usize = file.companies.iter().map(|c| c.dataloggers().count()).sum();
    tracing::info!(
        "Loaded {} companies, {} dataloggers, {} readings",
        file.companies.len(),
        dataloggers,
        file.readings.len()
    );

    Ok(InMemoryReferenceData::new(file.companies, file.readings))
}

/// Typical range (base, spread) for a measured variable.
fn variable_range(variable: &str) -> (f64, f64) {
    match variable {
        "PM2.5" => (25.0, 30.0),
        "PM10" => (45.0, 40.0),
        "CO2" => (400.0, 200.0),
        "NO2" => (20.0, 30.0),
        "temperatura" => (22.0, 8.0),
        "humedad" => (60.0, 20.0),
        "ruido" => (55.0, 25.0),
        _ => (0.0, 100.0),
    }
}

fn synthesize(datalogger_id: &str, variables: &[String], hours: u32, now: DateTime<Utc>) -> Vec<Reading> {
    let seed = datalogger_id.bytes().map(f64::from).sum::<f64>();

    (0..hours)
        .map(|hour| {
            let values: BTreeMap<String, f64> = variables
                .iter()
                .enumerate()
                .map(|(n, variable)| {
                    let (base, spread) = variable_range(variable);
                    // Smooth daily cycle, shifted per station and variable
                    let phase = (hour as f64 / 24.0) * std::f64::consts::TAU + seed + n as f64;
                    let value = base + spread * (0.5 + 0.5 * phase.sin());
                    (variable.clone(), (value * 100.0).round() / 100.0)
                })
                .collect();

            Reading {
                timestamp: now - Duration::hours(hour as i64),
                datalogger_id: datalogger_id.to_string(),
                variables: values,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::reference_data::ReferenceDataProvider;
    use chrono::TimeZone;

    const SAMPLE: &str = r#"
[[companies]]
id = "cdmb"
name = "CDMB"

[[companies.projects]]
id = "cdmb-air"
companyId = "cdmb"
name = "Red de Calidad del Aire"
type = "air"

[[companies.projects.dataloggers]]
id = "cdmb-air-001"
projectId = "cdmb-air"
serial = "CE0125"
name = "Estación Centro"
type = "calidadAire"
variables = ["PM2.5", "temperatura"]
lastActivity = "2024-03-10T12:00:00Z"
location = { name = "Centro", latitude = 7.119349, longitude = -73.122742 }

[[readings]]
timestamp = "2024-03-10T11:00:00Z"
dataloggerId = "cdmb-air-001"
variables = { "PM2.5" = 31.5, temperatura = 24.0 }
"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_hierarchy_and_readings() {
        let data = parse_reference_data(SAMPLE, now()).unwrap();

        let options = data.datalogger_options();
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].label, "CDMB - Red de Calidad del Aire - Estación Centro");
        assert_eq!(data.readings().len(), 1);
        assert_eq!(data.readings()[0].variables.get("PM2.5"), Some(&31.5));
    }

    #[test]
    fn test_synthetic_readings() {
        let raw = format!("{}\n[synthetic]\nhours = 48\n", SAMPLE);
        let data = parse_reference_data(&raw, now()).unwrap();

        let generated: Vec<&Reading> = data
            .readings()
            .iter()
            .filter(|r| r.timestamp == now())
            .collect();
        assert_eq!(generated.len(), 1);
        assert_eq!(data.readings().len(), 49);

        assert!(data
            .readings()
            .iter()
            .all(|r| (22.0..=30.0).contains(&r.variables["temperatura"])));
        assert_eq!(data.datalogger("cdmb-air-001").unwrap().last_activity, now());
    }

    #[test]
    fn test_missing_file() {
        assert!(load_reference_data("/nonexistent/reference.toml", now()).is_err());
    }
}
