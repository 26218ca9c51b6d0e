//! AI advisory facade: bridges resident data to an external generative
//! model and back, for three independent advisory operations.
//!
//! Every operation resolves to a usable value. Failures against the
//! external service are absorbed at this boundary and surface as a
//! [`Advisory::Degraded`] carrying the operation's defined fallback, so
//! callers can still distinguish a genuine model answer from a
//! suppressed failure.

use std::time::Duration;

use async_trait::async_trait;
use care_core::{DailyLog, Resident, VitalSigns, VitalsPoint};
use serde_json::{json, Value};
use tracing::warn;

/// Caller-side window for clinical summaries: only the latest logs are
/// embedded in the prompt.
pub const RECENT_LOG_WINDOW: usize = 10;

/// Anomaly checks compare against at most this many historical points.
pub const VITALS_HISTORY_WINDOW: usize = 3;

/// Shown when the model answered but produced no text.
pub const SUMMARY_UNAVAILABLE: &str = "Não foi possível gerar o resumo no momento.";

/// Shown when the summary call itself failed.
pub const SUMMARY_ERROR: &str =
    "Erro ao conectar com a IA para gerar o resumo. Verifique sua chave API.";

/// Generic activities used whenever the suggestion call degrades.
pub const FALLBACK_ACTIVITIES: [&str; 3] = [
    "Caminhada leve supervisionada",
    "Leitura em grupo",
    "Musicoterapia",
];

/// Failures at the external-model boundary.
#[derive(Debug, thiserror::Error)]
pub enum AdvisorError {
    #[error("request to generative model failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("generative model returned status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("generative model returned an empty response")]
    EmptyResponse,
    #[error("could not parse model response: {0}")]
    MalformedResponse(String),
}

/// Outcome of an advisory operation.
///
/// `Generated` carries an answer the model actually produced; `Degraded`
/// carries the operation's fallback value together with the failure that
/// forced it. Both hold a usable value, so no advisory call ever fails
/// from the caller's point of view.
#[derive(Debug)]
pub enum Advisory<T> {
    Generated(T),
    Degraded { value: T, reason: AdvisorError },
}

impl<T> Advisory<T> {
    pub fn value(&self) -> &T {
        match self {
            Advisory::Generated(value) => value,
            Advisory::Degraded { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Advisory::Generated(value) => value,
            Advisory::Degraded { value, .. } => value,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Advisory::Degraded { .. })
    }
}

/// One request against the generative model.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub prompt: String,
    /// When set, the model is asked for JSON conforming to this schema.
    pub response_schema: Option<Value>,
}

impl ModelRequest {
    pub fn text(prompt: String) -> Self {
        Self {
            prompt,
            response_schema: None,
        }
    }

    pub fn json(prompt: String, schema: Value) -> Self {
        Self {
            prompt,
            response_schema: Some(schema),
        }
    }
}

/// Boundary to the external generative model. Production code uses
/// [`GeminiClient`]; tests substitute scripted implementations.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, request: ModelRequest) -> Result<String, AdvisorError>;
}

/// Connection settings for the Gemini REST endpoint.
#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl AdvisorConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "gemini-3-flash-preview".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Read the API key from `GEMINI_API_KEY`, falling back to the
    /// legacy `API_KEY` variable.
    pub fn from_env() -> Self {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("API_KEY"))
            .unwrap_or_default();
        Self::new(api_key)
    }
}

/// `generateContent` client. Requests carry an explicit timeout so a
/// hung upstream resolves as an error instead of pending forever.
pub struct GeminiClient {
    client: reqwest::Client,
    config: AdvisorConfig,
}

impl GeminiClient {
    pub fn new(config: AdvisorConfig) -> Result<Self, AdvisorError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, request: ModelRequest) -> Result<String, AdvisorError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        );

        let mut body = json!({
            "contents": [{ "parts": [{ "text": request.prompt }] }]
        });
        if let Some(schema) = request.response_schema {
            body["generationConfig"] = json!({
                "responseMimeType": "application/json",
                "responseSchema": schema,
            });
        }

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdvisorError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response.json().await?;
        extract_candidate_text(&payload).ok_or(AdvisorError::EmptyResponse)
    }
}

/// Concatenate the text parts of the first candidate, if any.
fn extract_candidate_text(payload: &Value) -> Option<String> {
    let parts = payload
        .get("candidates")?
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// The three advisory operations. Each call is one-shot and stateless:
/// issue request, await a single response, map it to an [`Advisory`].
/// No retries, no streaming, no shared mutable state between calls.
pub struct Advisor<M> {
    model: M,
}

impl<M: GenerativeModel> Advisor<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    /// Clinical summary of the resident's recent logs (caller passes the
    /// latest [`RECENT_LOG_WINDOW`] entries, newest first).
    pub async fn clinical_summary(
        &self,
        resident: &Resident,
        recent_logs: &[DailyLog],
    ) -> Advisory<String> {
        let request = ModelRequest::text(summary_prompt(resident, recent_logs));
        match self.model.generate(request).await {
            Ok(text) if !text.trim().is_empty() => Advisory::Generated(text),
            Ok(_) => Advisory::Degraded {
                value: SUMMARY_UNAVAILABLE.to_string(),
                reason: AdvisorError::EmptyResponse,
            },
            Err(reason) => {
                warn!(resident = %resident.id, error = %reason, "clinical summary degraded");
                Advisory::Degraded {
                    value: SUMMARY_ERROR.to_string(),
                    reason,
                }
            }
        }
    }

    /// Exactly three activity titles tailored to the resident. The
    /// result list is never empty: any failure degrades to
    /// [`FALLBACK_ACTIVITIES`].
    pub async fn suggest_activities(&self, resident: &Resident) -> Advisory<Vec<String>> {
        let schema = json!({ "type": "ARRAY", "items": { "type": "STRING" } });
        let request = ModelRequest::json(activities_prompt(resident), schema);

        let reason = match self.model.generate(request).await {
            Ok(text) => match parse_activity_list(&text) {
                Ok(titles) if !titles.is_empty() => return Advisory::Generated(titles),
                Ok(_) => AdvisorError::EmptyResponse,
                Err(reason) => reason,
            },
            Err(reason) => reason,
        };

        warn!(resident = %resident.id, error = %reason, "activity suggestion degraded");
        Advisory::Degraded {
            value: FALLBACK_ACTIVITIES.iter().map(|s| s.to_string()).collect(),
            reason,
        }
    }

    /// Compare current vitals against recent history. `Generated(None)`
    /// means the model explicitly answered "OK"; any other non-empty
    /// answer is an alert. A failed or empty check degrades to `None`
    /// so the caller can tell "no alert" apart from "check never ran".
    pub async fn check_vitals_anomaly(
        &self,
        current: &VitalSigns,
        history: &[VitalsPoint],
    ) -> Advisory<Option<String>> {
        let request = ModelRequest::text(anomaly_prompt(current, history));
        match self.model.generate(request).await {
            Ok(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    Advisory::Degraded {
                        value: None,
                        reason: AdvisorError::EmptyResponse,
                    }
                } else if trimmed == "OK" {
                    Advisory::Generated(None)
                } else {
                    Advisory::Generated(Some(trimmed.to_string()))
                }
            }
            Err(reason) => {
                warn!(error = %reason, "vitals anomaly check degraded");
                Advisory::Degraded {
                    value: None,
                    reason,
                }
            }
        }
    }
}

fn summary_prompt(resident: &Resident, recent_logs: &[DailyLog]) -> String {
    let digest: Vec<String> = recent_logs.iter().map(log_digest_line).collect();
    format!(
        "Atue como um enfermeiro chefe experiente em geriatria (ILPI).\n\
         Analise os seguintes registros recentes do residente {} (Idade: {}).\n\n\
         Condições Médicas: {}\n\n\
         Registros Recentes:\n{}\n\n\
         Forneça um resumo clínico conciso em português (máximo 2 parágrafos).\n\
         Destaque quaisquer tendências preocupantes (ex: alterações de humor, sinais vitais instáveis)\n\
         ou confirme a estabilidade. Use tom profissional.",
        resident.name,
        resident.age,
        resident.medical_conditions.join(", "),
        digest.join("\n"),
    )
}

/// One prompt line per log: timestamp, type, description and the
/// optional mood/vitals annotations.
fn log_digest_line(log: &DailyLog) -> String {
    let mut line = format!(
        "- [{}] {}: {}",
        log.timestamp.format("%d/%m/%Y %H:%M"),
        log.log_type.as_str(),
        log.description,
    );
    if let Some(mood) = log.mood {
        line.push_str(&format!(" (Mood: {})", mood.as_str()));
    }
    if let Some(vitals) = &log.vitals {
        line.push_str(&format!(
            " (BP: {}/{}, Temp: {}C)",
            vitals.systolic, vitals.diastolic, vitals.temperature,
        ));
    }
    line
}

fn activities_prompt(resident: &Resident) -> String {
    format!(
        "Sugira 3 atividades recreativas ou terapêuticas específicas para um idoso em uma ILPI.\n\n\
         Perfil:\n\
         - Nome: {}\n\
         - Idade: {}\n\
         - Mobilidade: {}\n\
         - Condições: {}\n\n\
         Retorne APENAS um array JSON de strings com os títulos das atividades.",
        resident.name,
        resident.age,
        resident.mobility_status.as_str(),
        resident.medical_conditions.join(", "),
    )
}

fn anomaly_prompt(current: &VitalSigns, history: &[VitalsPoint]) -> String {
    let current_json = serde_json::to_string(current).unwrap_or_default();
    let history_json = serde_json::to_string(history).unwrap_or_default();
    format!(
        "Analise estes sinais vitais atuais comparados ao histórico breve.\n\
         Atual: {current_json}\n\
         Histórico (médias): {history_json}\n\n\
         Se houver algo alarmante (risco imediato), retorne uma frase curta de alerta em Português.\n\
         Se estiver normal ou aceitável, retorne \"OK\".",
    )
}

/// Parse the model's activity list, tolerating a JSON array wrapped in
/// markdown code fences.
fn parse_activity_list(text: &str) -> Result<Vec<String>, AdvisorError> {
    let payload = strip_code_fences(text);
    serde_json::from_str(payload).map_err(|err| AdvisorError::MalformedResponse(err.to_string()))
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
    else {
        return trimmed;
    };
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
