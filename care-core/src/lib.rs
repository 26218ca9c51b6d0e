//! Domain model, in-memory log store and view projections for a
//! residential elderly-care facility (ILPI).

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Mobility level of a resident, as recorded at intake.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MobilityStatus {
    Independent,
    Cane,
    Walker,
    Wheelchair,
    Bedbound,
}

impl MobilityStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MobilityStatus::Independent => "Independent",
            MobilityStatus::Cane => "Cane",
            MobilityStatus::Walker => "Walker",
            MobilityStatus::Wheelchair => "Wheelchair",
            MobilityStatus::Bedbound => "Bedbound",
        }
    }
}

/// Category of a daily log entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogType {
    Vitals,
    Meal,
    Hygiene,
    Medication,
    Mood,
    Note,
}

impl LogType {
    pub fn as_str(self) -> &'static str {
        match self {
            LogType::Vitals => "VITALS",
            LogType::Meal => "MEAL",
            LogType::Hygiene => "HYGIENE",
            LogType::Medication => "MEDICATION",
            LogType::Mood => "MOOD",
            LogType::Note => "NOTE",
        }
    }
}

/// Observed mood attached to a log entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Mood {
    Happy,
    Neutral,
    Sad,
    Agitated,
    Confused,
}

impl Mood {
    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Happy => "Happy",
            Mood::Neutral => "Neutral",
            Mood::Sad => "Sad",
            Mood::Agitated => "Agitated",
            Mood::Confused => "Confused",
        }
    }
}

/// One physiological measurement snapshot. The model itself enforces no
/// bounds; interpretation is left to the advisory layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VitalSigns {
    pub systolic: i32,
    pub diastolic: i32,
    pub heart_rate: i32,
    pub temperature: f64,
    pub oxygen_saturation: i32,
}

/// A timestamped, staff-authored observation about a resident.
/// Append-only: once stored it is never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyLog {
    pub id: String,
    pub resident_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub log_type: LogType,
    pub description: String,
    #[serde(default)]
    pub vitals: Option<VitalSigns>,
    #[serde(default)]
    pub mood: Option<Mood>,
    pub staff_name: String,
}

/// A prescribed medication, owned by its resident.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub id: String,
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub next_due: String,
}

/// Contact person for emergencies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
    pub relation: String,
}

/// A person under the facility's care. Identity is stable for the
/// resident's lifetime; demographic and clinical attributes are fixed at
/// intake within this scope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Resident {
    pub id: String,
    pub name: String,
    pub age: u8,
    pub room_number: String,
    pub admission_date: NaiveDate,
    pub photo_url: String,
    pub medical_conditions: Vec<String>,
    pub allergies: Vec<String>,
    pub dietary_restrictions: String,
    pub mobility_status: MobilityStatus,
    pub medications: Vec<Medication>,
    pub emergency_contact: EmergencyContact,
}

/// Errors raised at the store boundary.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("log {log_id} references unknown resident {resident_id}")]
    UnknownResident { log_id: String, resident_id: String },
}

/// In-memory roster plus append-only log sequence. Held explicitly by the
/// caller and passed by reference to consumers; there is no global
/// singleton. Process lifetime only, nothing is persisted.
#[derive(Debug, Clone, Default)]
pub struct CareStore {
    residents: Vec<Resident>,
    logs: Vec<DailyLog>,
}

impl CareStore {
    /// Create a store with a fixed roster and no logs.
    pub fn new(residents: Vec<Resident>) -> Self {
        Self {
            residents,
            logs: Vec::new(),
        }
    }

    /// Create a store populated with the deterministic seed fixtures,
    /// with log timestamps laid out relative to `anchor`.
    pub fn seeded(anchor: DateTime<Utc>) -> Self {
        let mut store = Self::new(seed_residents());
        for log in seed_logs(anchor) {
            // Seed logs reference only seeded residents.
            store.add_log(log).ok();
        }
        store
    }

    /// Append a log. The record is inserted at the head of the sequence
    /// and is immutable from then on. A log referencing a resident that
    /// is not on the roster is rejected.
    pub fn add_log(&mut self, log: DailyLog) -> Result<(), StoreError> {
        if self.resident(&log.resident_id).is_none() {
            return Err(StoreError::UnknownResident {
                log_id: log.id,
                resident_id: log.resident_id,
            });
        }
        self.logs.insert(0, log);
        Ok(())
    }

    pub fn residents(&self) -> &[Resident] {
        &self.residents
    }

    pub fn resident(&self, id: &str) -> Option<&Resident> {
        self.residents.iter().find(|r| r.id == id)
    }

    /// All logs in insertion order, newest insertion first.
    pub fn logs(&self) -> &[DailyLog] {
        &self.logs
    }

    /// Logs for one resident, most recent timestamp first.
    pub fn logs_for_resident(&self, resident_id: &str) -> Vec<DailyLog> {
        logs_for_resident(&self.logs, resident_id)
    }
}

/// Select the logs belonging to `resident_id`, ordered by timestamp
/// descending. Equal timestamps keep their relative order from the input
/// (the sort is stable).
pub fn logs_for_resident(logs: &[DailyLog], resident_id: &str) -> Vec<DailyLog> {
    let mut selected: Vec<DailyLog> = logs
        .iter()
        .filter(|log| log.resident_id == resident_id)
        .cloned()
        .collect();
    selected.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    selected
}

/// One chart-ready point of a vitals series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VitalsPoint {
    /// Short axis label, day/month.
    pub date: String,
    /// Full timestamp label for tooltips.
    pub full_date: String,
    pub timestamp: DateTime<Utc>,
    pub systolic: i32,
    pub diastolic: i32,
    pub heart_rate: i32,
    pub temperature: f64,
    pub oxygen_saturation: i32,
}

/// Flatten a log sequence into a chart-ready vitals series, oldest first.
///
/// Only entries of type VITALS that actually carry a payload contribute a
/// point. Charting needs chronological ascending order while the log list
/// is newest-first, so the series is sorted ascending explicitly rather
/// than by reversing an assumed-descending input.
pub fn vitals_series(logs: &[DailyLog]) -> Vec<VitalsPoint> {
    let mut points: Vec<VitalsPoint> = logs
        .iter()
        .filter(|log| log.log_type == LogType::Vitals)
        .filter_map(|log| {
            let vitals = log.vitals.as_ref()?;
            Some(VitalsPoint {
                date: log.timestamp.format("%d/%m").to_string(),
                full_date: log.timestamp.format("%d/%m/%Y %H:%M").to_string(),
                timestamp: log.timestamp,
                systolic: vitals.systolic,
                diastolic: vitals.diastolic,
                heart_rate: vitals.heart_rate,
                temperature: vitals.temperature,
                oxygen_saturation: vitals.oxygen_saturation,
            })
        })
        .collect();
    points.sort_by_key(|point| point.timestamp);
    points
}

/// Canonical roster used when no real intake data is available.
pub fn seed_residents() -> Vec<Resident> {
    vec![
        Resident {
            id: "1".to_string(),
            name: "Alberto Santos".to_string(),
            age: 82,
            room_number: "101-A".to_string(),
            admission_date: NaiveDate::from_ymd_opt(2023, 5, 12).unwrap_or_default(),
            photo_url: "https://picsum.photos/200/200?random=1".to_string(),
            medical_conditions: vec!["Hipertensão".to_string(), "Diabetes Tipo 2".to_string()],
            allergies: vec!["Penicilina".to_string()],
            dietary_restrictions: "Hipossódica, Sem açúcar".to_string(),
            mobility_status: MobilityStatus::Cane,
            medications: vec![
                Medication {
                    id: "m1".to_string(),
                    name: "Losartana".to_string(),
                    dosage: "50mg".to_string(),
                    frequency: "12/12h".to_string(),
                    next_due: "20:00".to_string(),
                },
                Medication {
                    id: "m2".to_string(),
                    name: "Metformina".to_string(),
                    dosage: "850mg".to_string(),
                    frequency: "24/24h".to_string(),
                    next_due: "08:00".to_string(),
                },
            ],
            emergency_contact: EmergencyContact {
                name: "Maria Santos".to_string(),
                phone: "(11) 99999-1234".to_string(),
                relation: "Filha".to_string(),
            },
        },
        Resident {
            id: "2".to_string(),
            name: "Helena Oliveira".to_string(),
            age: 91,
            room_number: "102-B".to_string(),
            admission_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap_or_default(),
            photo_url: "https://picsum.photos/200/200?random=2".to_string(),
            medical_conditions: vec![
                "Alzheimer (Estágio Inicial)".to_string(),
                "Artrose".to_string(),
            ],
            allergies: Vec::new(),
            dietary_restrictions: "Pastosa".to_string(),
            mobility_status: MobilityStatus::Wheelchair,
            medications: vec![Medication {
                id: "m3".to_string(),
                name: "Donepezila".to_string(),
                dosage: "10mg".to_string(),
                frequency: "24/24h".to_string(),
                next_due: "21:00".to_string(),
            }],
            emergency_contact: EmergencyContact {
                name: "Roberto Oliveira".to_string(),
                phone: "(11) 98888-5678".to_string(),
                relation: "Sobrinho".to_string(),
            },
        },
        Resident {
            id: "3".to_string(),
            name: "João Pedro Costa".to_string(),
            age: 78,
            room_number: "103-A".to_string(),
            admission_date: NaiveDate::from_ymd_opt(2023, 11, 20).unwrap_or_default(),
            photo_url: "https://picsum.photos/200/200?random=3".to_string(),
            medical_conditions: vec!["DPOC".to_string()],
            allergies: vec!["Frutos do mar".to_string()],
            dietary_restrictions: "Geral".to_string(),
            mobility_status: MobilityStatus::Independent,
            medications: Vec::new(),
            emergency_contact: EmergencyContact {
                name: "Carla Costa".to_string(),
                phone: "(11) 97777-4321".to_string(),
                relation: "Filha".to_string(),
            },
        },
    ]
}

/// Deterministic log fixtures: 15 entries per seeded resident spanning
/// the 5 days before `anchor`, with a fixed type rotation in which every
/// fourth entry carries vitals. Reproducible, unlike randomized mocks.
pub fn seed_logs(anchor: DateTime<Utc>) -> Vec<DailyLog> {
    let rotation = [
        LogType::Vitals,
        LogType::Meal,
        LogType::Medication,
        LogType::Note,
    ];
    let mut logs = Vec::new();

    for resident in seed_residents() {
        for i in 0..15u32 {
            let log_type = rotation[(i as usize) % rotation.len()];
            let timestamp = anchor
                - Duration::days(i64::from(i % 5))
                - Duration::hours(i64::from((i * 3) % 12));

            let (description, vitals) = match log_type {
                LogType::Vitals => (
                    "Aferição de rotina".to_string(),
                    Some(seed_vitals(&resident.id, i)),
                ),
                LogType::Meal => ("Almoço: Aceitou bem a dieta.".to_string(), None),
                LogType::Medication => ("Medicação matinal administrada.".to_string(), None),
                _ => (
                    "Residente tranquilo, interagindo com outros.".to_string(),
                    None,
                ),
            };

            logs.push(DailyLog {
                id: format!("{}-{i}", resident.id),
                resident_id: resident.id.clone(),
                timestamp,
                log_type,
                description,
                vitals,
                mood: None,
                staff_name: "Enf. Maria".to_string(),
            });
        }
    }

    logs
}

fn seed_vitals(resident_id: &str, index: u32) -> VitalSigns {
    // Entry index and resident id spread the values over realistic
    // ranges while keeping every run identical.
    let salt = resident_id.bytes().map(u32::from).sum::<u32>() + index;
    VitalSigns {
        systolic: 110 + (salt * 7 % 30) as i32,
        diastolic: 70 + (salt * 5 % 15) as i32,
        heart_rate: 60 + (salt * 3 % 20) as i32,
        temperature: 36.0 + f64::from(salt % 10) / 10.0,
        oxygen_saturation: 94 + (salt % 5) as i32,
    }
}
