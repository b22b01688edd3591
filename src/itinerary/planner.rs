use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, trace, warn};

use super::dedup::dedupe_by_name;
use super::error::{PlanningError, PlanningResult};
use super::models::{DayPlan, ItineraryPlan, Poi, SIGHT, TIME_SLOTS};
use super::retry::{is_transient, parse_retry_after, RetryPolicy, Sleeper};

pub const MAX_CANDIDATES: usize = 18;
const PROMPT_PER_INTEREST: usize = 5;
const PROMPT_SIGHTS: usize = 8;
const PROMPT_CANDIDATES: usize = 14;
const WHOLE_TRIP_CANDIDATES: usize = 6;
const DAY_TOKEN_CAP: u32 = 220;
const WHOLE_TRIP_TOKEN_CAP: u32 = 400;
const ERROR_BODY_CHARS: usize = 400;

const DAY_SYSTEM_PROMPT: &str = "You are a precise travel planner. Output ONLY JSON with keys: date (string), items (array of {name,lat,lon,start,end,blurb,category}). No extra text.";
const WHOLE_TRIP_SYSTEM_PROMPT: &str = "You are a precise travel planner. Return ONLY valid JSON that matches the provided JSON Schema exactly. No extra text.";

/// Generative planning seam used by the orchestrator.
#[async_trait]
pub trait DayPlanner: Send + Sync {
    async fn plan_day(
        &self,
        city: &str,
        date: &str,
        interests: &[String],
        candidates: &[Poi],
    ) -> PlanningResult<DayPlan>;

    async fn plan_itinerary(
        &self,
        city: &str,
        dates: &[String],
        interests: &[String],
        pois: &[Poi],
    ) -> PlanningResult<ItineraryPlan>;
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub retry_after: Option<String>,
    pub body: String,
}

/// One HTTP round trip to the chat-completions endpoint.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, body: &Value) -> PlanningResult<TransportResponse>;
}

pub struct OpenAiTransport {
    http: Client,
    url: String,
}

impl OpenAiTransport {
    pub fn new(
        api_base: &str,
        api_key: &str,
        org_id: Option<&str>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .default_headers(Self::default_headers(api_key, org_id)?)
            .build()
            .context("failed to build planner reqwest client")?;

        Ok(Self {
            http,
            url: format!("{}/chat/completions", api_base.trim_end_matches('/')),
        })
    }

    fn default_headers(api_key: &str, org_id: Option<&str>) -> anyhow::Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
                .context("invalid OPENAI_API_KEY for header")?,
        );
        if let Some(org) = org_id.filter(|value| !value.trim().is_empty()) {
            headers.insert(
                "OpenAI-Organization",
                header::HeaderValue::from_str(org.trim())
                    .context("invalid OPENAI_ORG_ID for header")?,
            );
        }
        Ok(headers)
    }
}

#[async_trait]
impl ChatTransport for OpenAiTransport {
    async fn send(&self, body: &Value) -> PlanningResult<TransportResponse> {
        trace!(url = %self.url, "posting planning request");
        let response = self.http.post(&self.url).json(body).send().await?;
        let status = response.status();
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;
        Ok(TransportResponse {
            status,
            retry_after,
            body,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct PlannerClient {
    transport: Arc<dyn ChatTransport>,
    model: String,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl PlannerClient {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        model: impl Into<String>,
        policy: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            transport,
            model: model.into(),
            policy,
            sleeper,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn post_with_retries(&self, body: &Value) -> PlanningResult<String> {
        let mut attempt = 1;
        loop {
            let response = self.transport.send(body).await?;
            let status = response.status;
            if !status.is_client_error() && !status.is_server_error() {
                return Ok(response.body);
            }

            let excerpt = truncate_chars(&response.body, ERROR_BODY_CHARS);
            if !is_transient(status) {
                return Err(PlanningError::Permanent {
                    status: status.as_u16(),
                    body: excerpt,
                });
            }
            if self.policy.is_final(attempt) {
                return Err(PlanningError::Transient {
                    status: status.as_u16(),
                    attempts: attempt,
                    body: excerpt,
                });
            }

            let hint = parse_retry_after(response.retry_after.as_deref());
            let wait = self.policy.wait_for(attempt, hint);
            warn!(
                "Retrying planner call due to {} (attempt {}/{}), waiting {:?}",
                status, attempt, self.policy.max_attempts, wait
            );
            self.sleeper.sleep(wait).await;
            attempt += 1;
        }
    }

    async fn complete<T: DeserializeOwned>(&self, body: &Value) -> PlanningResult<T> {
        let raw = self.post_with_retries(body).await?;
        let completion: ChatCompletion = serde_json::from_str(&raw).map_err(|e| {
            PlanningError::Malformed(format!("unexpected completion payload: {}", e))
        })?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| PlanningError::Malformed("response has no message content".to_string()))?;
        debug!(chars = content.len(), "planner returned content");
        parse_structured(&content)
    }
}

#[async_trait]
impl DayPlanner for PlannerClient {
    async fn plan_day(
        &self,
        city: &str,
        date: &str,
        interests: &[String],
        candidates: &[Poi],
    ) -> PlanningResult<DayPlan> {
        let merged = balanced_candidates(interests, candidates);
        let body = day_request(&self.model, city, date, interests, &merged)?;
        self.complete(&body).await
    }

    async fn plan_itinerary(
        &self,
        city: &str,
        dates: &[String],
        interests: &[String],
        pois: &[Poi],
    ) -> PlanningResult<ItineraryPlan> {
        let candidates = &pois[..pois.len().min(WHOLE_TRIP_CANDIDATES)];
        let body = itinerary_request(&self.model, city, dates, interests, candidates)?;
        self.complete(&body).await
    }
}

/// Reasoning models take `max_completion_tokens`, older chat models `max_tokens`.
pub fn token_cap_key(model: &str) -> &'static str {
    if model.starts_with("o4") || model.starts_with("gpt-5") {
        "max_completion_tokens"
    } else {
        "max_tokens"
    }
}

/// A few per interest first, then sights, so the prompt keeps its variety.
pub fn balanced_candidates(interests: &[String], candidates: &[Poi]) -> Vec<Poi> {
    let mut by_category: HashMap<String, Vec<&Poi>> = HashMap::new();
    for poi in candidates {
        by_category.entry(poi.category_key()).or_default().push(poi);
    }

    let mut merged: Vec<Poi> = Vec::new();
    for interest in interests {
        if let Some(items) = by_category.get(interest) {
            merged.extend(items.iter().take(PROMPT_PER_INTEREST).map(|p| (*p).clone()));
        }
    }
    if let Some(sights) = by_category.get(SIGHT) {
        merged.extend(sights.iter().take(PROMPT_SIGHTS).map(|p| (*p).clone()));
    }

    let mut merged = dedupe_by_name(&merged);
    merged.truncate(PROMPT_CANDIDATES);
    merged
}

fn time_slots() -> Vec<[&'static str; 2]> {
    TIME_SLOTS.iter().map(|slot| [slot.start, slot.end]).collect()
}

pub fn day_request(
    model: &str,
    city: &str,
    date: &str,
    interests: &[String],
    candidates: &[Poi],
) -> PlanningResult<Value> {
    let payload = json!({
        "city": city,
        "date": date,
        "interests": interests,
        "time_slots": time_slots(),
        "rules": [
            "Pick 3–4 items total.",
            "Use only items from candidates; copy name/lat/lon/category.",
            "Prefer variety: include at least 2 distinct categories per day.",
            "If 'food' is present in interests, schedule the food item at 11:00–13:00 or 16:00–18:00.",
            "Each item: one brief, friendly blurb (1–2 sentences).",
            "Return ONLY compact JSON: {date, items[]}. No markdown or prose."
        ],
        "candidates": candidates,
    });

    let mut body = json!({
        "model": model,
        "messages": [
            {"role": "system", "content": DAY_SYSTEM_PROMPT},
            {"role": "user", "content": serde_json::to_string(&payload)?}
        ],
        "stop": ["```"]
    });
    body[token_cap_key(model)] = json!(DAY_TOKEN_CAP);
    Ok(body)
}

pub fn itinerary_request(
    model: &str,
    city: &str,
    dates: &[String],
    interests: &[String],
    candidates: &[Poi],
) -> PlanningResult<Value> {
    let payload = json!({
        "city": city,
        "dates": dates,
        "interests": interests,
        "time_slots": time_slots(),
        "rules": [
            "Prefer items that match interests; keep travel time reasonable.",
            "Up to 4 items per day; fewer is fine if quality is better.",
            "Each item: one brief, friendly blurb (1–2 sentences)."
        ],
        "candidates": candidates,
    });

    let mut body = json!({
        "model": model,
        "temperature": 0.4,
        "response_format": {
            "type": "json_schema",
            "json_schema": itinerary_schema()
        },
        "messages": [
            {"role": "system", "content": WHOLE_TRIP_SYSTEM_PROMPT},
            {"role": "user", "content": serde_json::to_string(&payload)?}
        ]
    });
    body[token_cap_key(model)] = json!(WHOLE_TRIP_TOKEN_CAP);
    Ok(body)
}

/// Strict schema for the whole-trip response.
pub fn itinerary_schema() -> Value {
    let item = json!({
        "type": "object",
        "properties": {
            "name": {"type": "string"},
            "lat": {"type": "number"},
            "lon": {"type": "number"},
            "start": {"type": "string"},
            "end": {"type": "string"},
            "blurb": {"type": "string"},
            "category": {"type": "string"}
        },
        "required": ["name", "lat", "lon", "start", "end", "blurb", "category"],
        "additionalProperties": false
    });

    json!({
        "name": "Itinerary",
        "schema": {
            "type": "object",
            "properties": {
                "days": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "date": {"type": "string"},
                            "items": {"type": "array", "items": item}
                        },
                        "required": ["date", "items"],
                        "additionalProperties": false
                    }
                },
                "totals": {
                    "type": "object",
                    "properties": {
                        "cost_low": {"type": "number"},
                        "cost_high": {"type": "number"}
                    },
                    "required": ["cost_low", "cost_high"],
                    "additionalProperties": true
                }
            },
            "required": ["days", "totals"],
            "additionalProperties": false
        },
        "strict": true
    })
}

/// Parses model output, falling back to the outermost `{...}` span when the
/// model wrapped its JSON in prose or fences.
pub fn parse_structured<T: DeserializeOwned>(content: &str) -> PlanningResult<T> {
    if let Ok(value) = serde_json::from_str::<T>(content) {
        return Ok(value);
    }

    let (Some(left), Some(right)) = (content.find('{'), content.rfind('}')) else {
        return Err(PlanningError::Malformed(
            "model returned non-JSON content".to_string(),
        ));
    };
    if right <= left {
        return Err(PlanningError::Malformed(
            "model returned non-JSON content".to_string(),
        ));
    }

    serde_json::from_str::<T>(&content[left..=right])
        .map_err(|e| PlanningError::Malformed(format!("could not parse extracted JSON: {}", e)))
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::itinerary::testing::RecordingSleeper;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedTransport {
        responses: Mutex<VecDeque<TransportResponse>>,
        bodies: Mutex<Vec<Value>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<TransportResponse>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                bodies: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.bodies.lock().unwrap().len()
        }

        fn last_body(&self) -> Value {
            self.bodies.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn send(&self, body: &Value) -> PlanningResult<TransportResponse> {
            self.bodies.lock().unwrap().push(body.clone());
            Ok(self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted response left"))
        }
    }

    fn status(code: u16, retry_after: Option<&str>) -> TransportResponse {
        TransportResponse {
            status: StatusCode::from_u16(code).unwrap(),
            retry_after: retry_after.map(str::to_string),
            body: format!("status {code}"),
        }
    }

    fn completion(content: &str) -> TransportResponse {
        TransportResponse {
            status: StatusCode::OK,
            retry_after: None,
            body: json!({"choices": [{"message": {"content": content}}]}).to_string(),
        }
    }

    const DAY_JSON: &str = r#"{"date":"2025-09-01","items":[{"name":"Senso-ji","lat":35.71,"lon":139.79,"start":"09:00","end":"11:00","blurb":"Old temple.","category":"history"}]}"#;

    fn client(transport: Arc<ScriptedTransport>, sleeper: Arc<RecordingSleeper>) -> PlannerClient {
        PlannerClient::new(transport, "o4-mini", RetryPolicy::default(), sleeper)
    }

    fn interests() -> Vec<String> {
        vec!["history".to_string(), "food".to_string()]
    }

    #[tokio::test]
    async fn test_plan_day_success_first_try() {
        let transport = ScriptedTransport::new(vec![completion(DAY_JSON)]);
        let sleeper = Arc::new(RecordingSleeper::new());
        let planner = client(transport.clone(), sleeper.clone());

        let day = planner
            .plan_day("Tokyo", "2025-09-01", &interests(), &[])
            .await
            .unwrap();
        assert_eq!(day.items.len(), 1);
        assert_eq!(day.items[0].name, "Senso-ji");
        assert!(sleeper.waits().is_empty());

        let body = transport.last_body();
        assert_eq!(body["max_completion_tokens"], json!(220));
        assert_eq!(body["stop"], json!(["```"]));
    }

    #[tokio::test]
    async fn test_transient_errors_back_off_then_succeed() {
        let transport = ScriptedTransport::new(vec![
            status(429, Some("10")),
            status(503, None),
            completion(DAY_JSON),
        ]);
        let sleeper = Arc::new(RecordingSleeper::new());
        let planner = client(transport.clone(), sleeper.clone());

        planner
            .plan_day("Tokyo", "2025-09-01", &interests(), &[])
            .await
            .unwrap();
        assert_eq!(transport.calls(), 3);
        assert_eq!(
            sleeper.waits(),
            vec![Duration::from_secs(10), Duration::from_secs(6)]
        );
    }

    #[tokio::test]
    async fn test_transient_failure_is_terminal_after_five_attempts() {
        let transport = ScriptedTransport::new((0..5).map(|_| status(500, None)).collect());
        let sleeper = Arc::new(RecordingSleeper::new());
        let planner = client(transport.clone(), sleeper.clone());

        let err = planner
            .plan_day("Tokyo", "2025-09-01", &interests(), &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PlanningError::Transient {
                status: 500,
                attempts: 5,
                ..
            }
        ));
        assert_eq!(transport.calls(), 5);
        let secs: Vec<u64> = sleeper.waits().iter().map(|d| d.as_secs()).collect();
        assert_eq!(secs, vec![3, 6, 12, 24]);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let transport = ScriptedTransport::new(vec![status(401, None)]);
        let sleeper = Arc::new(RecordingSleeper::new());
        let planner = client(transport.clone(), sleeper.clone());

        let err = planner
            .plan_day("Tokyo", "2025-09-01", &interests(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, PlanningError::Permanent { status: 401, .. }));
        assert_eq!(transport.calls(), 1);
        assert!(sleeper.waits().is_empty());
    }

    #[tokio::test]
    async fn test_prose_wrapped_json_is_extracted() {
        let wrapped = format!("Here is your day:\n{}\nEnjoy!", DAY_JSON);
        let transport = ScriptedTransport::new(vec![completion(&wrapped)]);
        let planner = client(transport, Arc::new(RecordingSleeper::new()));

        let day = planner
            .plan_day("Tokyo", "2025-09-01", &interests(), &[])
            .await
            .unwrap();
        assert_eq!(day.date, "2025-09-01");
    }

    #[tokio::test]
    async fn test_non_json_content_is_malformed() {
        let transport = ScriptedTransport::new(vec![completion("Sorry, I cannot help.")]);
        let planner = client(transport, Arc::new(RecordingSleeper::new()));

        let err = planner
            .plan_day("Tokyo", "2025-09-01", &interests(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, PlanningError::Malformed(_)));
    }

    #[test]
    fn test_object_without_items_is_malformed() {
        let err = parse_structured::<DayPlan>(r#"{"error":"I cannot plan this day"}"#).unwrap_err();
        assert!(matches!(err, PlanningError::Malformed(_)));

        let wrapped = parse_structured::<DayPlan>("Sorry: {\"error\":\"no\"} try later");
        assert!(matches!(wrapped, Err(PlanningError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_wrong_shape_reply_fails_the_day() {
        let transport = ScriptedTransport::new(vec![completion(r#"{"error":"I cannot plan this day"}"#)]);
        let planner = client(transport, Arc::new(RecordingSleeper::new()));

        let err = planner
            .plan_day("Tokyo", "2025-09-01", &interests(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, PlanningError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_plan_itinerary_uses_strict_schema() {
        let content = json!({
            "days": [{"date": "2025-09-01", "items": []}],
            "totals": {"cost_low": 80, "cost_high": 200}
        })
        .to_string();
        let transport = ScriptedTransport::new(vec![completion(&content)]);
        let planner = PlannerClient::new(
            transport.clone(),
            "gpt-4o-mini",
            RetryPolicy::default(),
            Arc::new(RecordingSleeper::new()),
        );

        let pois: Vec<Poi> = (0..10)
            .map(|i| Poi::new(format!("Spot {i}"), 35.0, 139.0, "sight"))
            .collect();
        let plan = planner
            .plan_itinerary("Tokyo", &["2025-09-01".to_string()], &[], &pois)
            .await
            .unwrap();
        assert_eq!(plan.totals.cost_low, Some(80.0));

        let body = transport.last_body();
        assert_eq!(body["response_format"]["json_schema"]["strict"], json!(true));
        assert_eq!(body["max_tokens"], json!(400));
        let user: Value =
            serde_json::from_str(body["messages"][1]["content"].as_str().unwrap()).unwrap();
        assert_eq!(user["candidates"].as_array().unwrap().len(), 6);
    }

    #[test]
    fn test_token_cap_key() {
        assert_eq!(token_cap_key("o4-mini"), "max_completion_tokens");
        assert_eq!(token_cap_key("gpt-5-mini"), "max_completion_tokens");
        assert_eq!(token_cap_key("gpt-4o"), "max_tokens");
    }

    #[test]
    fn test_balanced_candidates_caps_per_category() {
        let mut candidates: Vec<Poi> = (0..7)
            .map(|i| Poi::new(format!("Temple {i}"), 35.0, 139.0, "history"))
            .collect();
        candidates.extend((0..10).map(|i| Poi::new(format!("Tower {i}"), 35.0, 139.0, "sight")));

        let merged = balanced_candidates(&interests(), &candidates);
        assert_eq!(merged.len(), 13);
        assert_eq!(merged.iter().filter(|p| p.category == "history").count(), 5);
        assert_eq!(merged.iter().filter(|p| p.category == "sight").count(), 8);
    }
}
