use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use care_advisor::{
    Advisor, AdvisorError, GenerativeModel, ModelRequest, FALLBACK_ACTIVITIES, SUMMARY_ERROR,
    SUMMARY_UNAVAILABLE,
};
use care_core::{seed_residents, vitals_series, DailyLog, LogType, Mood, Resident, VitalSigns};
use chrono::{Duration, TimeZone, Utc};

/// Scripted model: replies with a fixed text and records the request it
/// received so tests can inspect the prompt.
struct Scripted {
    reply: &'static str,
    seen: Arc<Mutex<Option<ModelRequest>>>,
}

impl Scripted {
    fn replying(reply: &'static str) -> (Self, Arc<Mutex<Option<ModelRequest>>>) {
        let seen = Arc::new(Mutex::new(None));
        (
            Self {
                reply,
                seen: Arc::clone(&seen),
            },
            seen,
        )
    }
}

#[async_trait]
impl GenerativeModel for Scripted {
    async fn generate(&self, request: ModelRequest) -> Result<String, AdvisorError> {
        *self.seen.lock().expect("lock") = Some(request);
        Ok(self.reply.to_string())
    }
}

/// Model whose call always fails, simulating network/auth errors.
struct Unreachable;

#[async_trait]
impl GenerativeModel for Unreachable {
    async fn generate(&self, _request: ModelRequest) -> Result<String, AdvisorError> {
        Err(AdvisorError::Api {
            status: 503,
            body: "service unavailable".to_string(),
        })
    }
}

fn resident() -> Resident {
    seed_residents().remove(0)
}

fn sample_logs() -> Vec<DailyLog> {
    let anchor = Utc
        .with_ymd_and_hms(2024, 6, 10, 9, 0, 0)
        .single()
        .expect("anchor inválido");
    vec![
        DailyLog {
            id: "l1".to_string(),
            resident_id: "1".to_string(),
            timestamp: anchor,
            log_type: LogType::Vitals,
            description: "Aferição de rotina".to_string(),
            vitals: Some(VitalSigns {
                systolic: 150,
                diastolic: 95,
                heart_rate: 88,
                temperature: 37.2,
                oxygen_saturation: 95,
            }),
            mood: None,
            staff_name: "Enf. Maria".to_string(),
        },
        DailyLog {
            id: "l2".to_string(),
            resident_id: "1".to_string(),
            timestamp: anchor - Duration::hours(6),
            log_type: LogType::Mood,
            description: "Recusou o café da manhã".to_string(),
            vitals: None,
            mood: Some(Mood::Agitated),
            staff_name: "Enf. Maria".to_string(),
        },
    ]
}

fn current_vitals() -> VitalSigns {
    VitalSigns {
        systolic: 180,
        diastolic: 110,
        heart_rate: 100,
        temperature: 38.0,
        oxygen_saturation: 91,
    }
}

#[tokio::test]
async fn clinical_summary_embeds_resident_and_log_digest() {
    let (model, seen) = Scripted::replying("Residente estável.");
    let advisor = Advisor::new(model);

    let outcome = advisor.clinical_summary(&resident(), &sample_logs()).await;
    assert!(!outcome.is_degraded());
    assert_eq!(outcome.value(), "Residente estável.");

    let request = seen.lock().expect("lock").take().expect("request enviado");
    assert!(request.response_schema.is_none());
    assert!(request.prompt.contains("Alberto Santos"));
    assert!(request.prompt.contains("Hipertensão"));
    assert!(request.prompt.contains("VITALS: Aferição de rotina"));
    assert!(request.prompt.contains("(BP: 150/95, Temp: 37.2C)"));
    assert!(request.prompt.contains("(Mood: Agitated)"));
}

#[tokio::test]
async fn clinical_summary_degrades_to_error_literal_when_call_fails() {
    let advisor = Advisor::new(Unreachable);
    let outcome = advisor.clinical_summary(&resident(), &sample_logs()).await;

    assert!(outcome.is_degraded());
    assert_eq!(outcome.value(), SUMMARY_ERROR);
}

#[tokio::test]
async fn clinical_summary_degrades_when_model_returns_blank_text() {
    let (model, _) = Scripted::replying("   \n");
    let advisor = Advisor::new(model);

    let outcome = advisor.clinical_summary(&resident(), &[]).await;
    assert!(outcome.is_degraded());
    assert_eq!(outcome.value(), SUMMARY_UNAVAILABLE);
}

#[tokio::test]
async fn suggest_activities_parses_a_json_array_and_requests_a_schema() {
    let (model, seen) =
        Scripted::replying(r#"["Jardinagem adaptada","Bingo musical","Alongamento na cadeira"]"#);
    let advisor = Advisor::new(model);

    let outcome = advisor.suggest_activities(&resident()).await;
    assert!(!outcome.is_degraded());
    assert_eq!(
        outcome.value(),
        &vec![
            "Jardinagem adaptada".to_string(),
            "Bingo musical".to_string(),
            "Alongamento na cadeira".to_string(),
        ]
    );

    let request = seen.lock().expect("lock").take().expect("request enviado");
    assert!(request.response_schema.is_some());
    assert!(request.prompt.contains("Mobilidade: Cane"));
}

#[tokio::test]
async fn suggest_activities_tolerates_markdown_code_fences() {
    let (model, _) = Scripted::replying("```json\n[\"Leitura assistida\"]\n```");
    let advisor = Advisor::new(model);

    let outcome = advisor.suggest_activities(&resident()).await;
    assert!(!outcome.is_degraded());
    assert_eq!(outcome.value(), &vec!["Leitura assistida".to_string()]);
}

#[tokio::test]
async fn suggest_activities_falls_back_on_malformed_json() {
    let (model, _) = Scripted::replying("com certeza! aqui vão as atividades");
    let advisor = Advisor::new(model);

    let outcome = advisor.suggest_activities(&resident()).await;
    assert!(outcome.is_degraded());
    assert_eq!(outcome.value().len(), FALLBACK_ACTIVITIES.len());
    assert_eq!(outcome.value()[0], FALLBACK_ACTIVITIES[0]);
}

#[tokio::test]
async fn suggest_activities_never_resolves_to_an_empty_list() {
    for advisor_outcome in [
        Advisor::new(Unreachable).suggest_activities(&resident()).await,
        {
            let (model, _) = Scripted::replying("[]");
            Advisor::new(model).suggest_activities(&resident()).await
        },
    ] {
        assert!(advisor_outcome.is_degraded());
        assert!(!advisor_outcome.value().is_empty());
    }
}

#[tokio::test]
async fn anomaly_check_maps_ok_with_whitespace_to_no_alert() {
    let (model, _) = Scripted::replying("  OK \n");
    let advisor = Advisor::new(model);

    let outcome = advisor.check_vitals_anomaly(&current_vitals(), &[]).await;
    assert!(!outcome.is_degraded());
    assert_eq!(outcome.value(), &None);
}

#[tokio::test]
async fn anomaly_check_returns_trimmed_alert_text() {
    let (model, _) = Scripted::replying(" Pressão arterial muito acima do habitual. \n");
    let advisor = Advisor::new(model);

    let outcome = advisor.check_vitals_anomaly(&current_vitals(), &[]).await;
    assert!(!outcome.is_degraded());
    assert_eq!(
        outcome.value().as_deref(),
        Some("Pressão arterial muito acima do habitual.")
    );
}

#[tokio::test]
async fn anomaly_check_degrades_to_none_on_failure_or_empty_reply() {
    let failed = Advisor::new(Unreachable)
        .check_vitals_anomaly(&current_vitals(), &[])
        .await;
    assert!(failed.is_degraded());
    assert_eq!(failed.value(), &None);

    let (model, _) = Scripted::replying("");
    let blank = Advisor::new(model)
        .check_vitals_anomaly(&current_vitals(), &[])
        .await;
    assert!(blank.is_degraded());
    assert_eq!(blank.value(), &None);
}

#[tokio::test]
async fn anomaly_check_embeds_current_and_history_in_the_prompt() {
    let (model, seen) = Scripted::replying("OK");
    let advisor = Advisor::new(model);

    let history = vitals_series(&sample_logs());
    advisor
        .check_vitals_anomaly(&current_vitals(), &history)
        .await;

    let request = seen.lock().expect("lock").take().expect("request enviado");
    assert!(request.prompt.contains("\"systolic\":180"));
    assert!(request.prompt.contains("\"systolic\":150"));
    assert!(request.prompt.contains("retorne \"OK\""));
}
