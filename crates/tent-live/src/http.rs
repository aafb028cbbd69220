//! HTTP clients for the dashboard back-end
//!
//! [`HttpActionSink`] posts actuator actions; [`HttpAutomationRegistry`]
//! implements the automation registry over `/api/automations`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use tent_automation::{AutomationError, AutomationRegistry, AutomationResult, AutomationRule};
use tracing::debug;

use crate::action::{ActionRequest, ActionSink, ActuatorAction};
use crate::error::{LiveError, LiveResult};

const TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct Api {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl Api {
    fn new(base_url: &str, token: Option<String>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(TIMEOUT).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let request = self.client.request(method, &url);
        match &self.token {
            Some(token) => request.header(header::AUTHORIZATION, format!("Bearer {}", token)),
            None => request,
        }
    }
}

/// Error text of a failed response
async fn failure(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    #[derive(Deserialize)]
    struct Detail {
        detail: String,
    }
    match serde_json::from_str::<Detail>(&body) {
        Ok(d) => format!("{}: {}", status, d.detail),
        Err(_) => status.to_string(),
    }
}

/// Posts actions to `/api/tents/{tent}/actions`
#[derive(Debug, Clone)]
pub struct HttpActionSink {
    api: Api,
}

impl HttpActionSink {
    pub fn new(base_url: &str, token: Option<String>) -> LiveResult<Self> {
        Ok(Self {
            api: Api::new(base_url, token)?,
        })
    }
}

fn action_body(request: &ActionRequest) -> serde_json::Value {
    match request.action {
        ActuatorAction::TurnOn => json!({"action": "turn_on", "entity_type": request.slot}),
        ActuatorAction::TurnOff => json!({"action": "turn_off", "entity_type": request.slot}),
        ActuatorAction::SetSpeed { percentage } => {
            json!({"action": "set_fan", "entity_type": request.slot, "value": percentage})
        }
    }
}

#[async_trait]
impl ActionSink for HttpActionSink {
    async fn send(&self, request: &ActionRequest) -> LiveResult<()> {
        let path = format!("/api/tents/{}/actions", request.tent_id);
        debug!("POST {} {:?}", path, request.action);
        let response = self
            .api
            .request(reqwest::Method::POST, &path)
            .json(&action_body(request))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(LiveError::ActionFailed {
                tent_id: request.tent_id.clone(),
                slot: request.slot.clone(),
                reason: failure(response).await,
            })
        }
    }
}

/// Automation registry served over HTTP
#[derive(Debug, Clone)]
pub struct HttpAutomationRegistry {
    api: Api,
}

#[derive(Deserialize)]
struct RuleList {
    rules: Vec<AutomationRule>,
}

#[derive(Deserialize)]
struct RuleEnvelope {
    rule: AutomationRule,
}

fn registry_error(e: reqwest::Error) -> AutomationError {
    AutomationError::Registry(e.to_string())
}

impl HttpAutomationRegistry {
    pub fn new(base_url: &str, token: Option<String>) -> LiveResult<Self> {
        Ok(Self {
            api: Api::new(base_url, token)?,
        })
    }

    async fn call(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&AutomationRule>,
    ) -> AutomationResult<Response> {
        let mut request = self.api.request(method, &format!("/api/automations{}", path));
        if let Some(rule) = body {
            request = request.json(rule);
        }
        let response = request.send().await.map_err(registry_error)?;
        match response.status() {
            s if s.is_success() => Ok(response),
            reqwest::StatusCode::NOT_FOUND => Err(AutomationError::NotFound(path.to_string())),
            _ => Err(AutomationError::Registry(failure(response).await)),
        }
    }

    async fn get(&self, rule_id: &str) -> AutomationResult<AutomationRule> {
        let response = self
            .call(reqwest::Method::GET, &format!("/{}", rule_id), None)
            .await?;
        let envelope: RuleEnvelope = response.json().await.map_err(registry_error)?;
        Ok(envelope.rule)
    }
}

#[async_trait]
impl AutomationRegistry for HttpAutomationRegistry {
    async fn list(&self) -> AutomationResult<Vec<AutomationRule>> {
        let response = self.call(reqwest::Method::GET, "", None).await?;
        let list: RuleList = response.json().await.map_err(registry_error)?;
        Ok(list.rules)
    }

    async fn create(&self, rule: AutomationRule) -> AutomationResult<String> {
        rule.validate()?;
        let response = self
            .call(reqwest::Method::POST, "", Some(&rule))
            .await?;
        // the back-end assigns its own id
        let created: RuleEnvelope = response.json().await.map_err(registry_error)?;
        Ok(created.rule.id)
    }

    async fn update(&self, rule: AutomationRule) -> AutomationResult<()> {
        rule.validate()?;
        self.call(reqwest::Method::PUT, &format!("/{}", rule.id), Some(&rule))
            .await?;
        Ok(())
    }

    async fn delete(&self, rule_id: &str) -> AutomationResult<AutomationRule> {
        let rule = self.get(rule_id).await?;
        self.call(reqwest::Method::DELETE, &format!("/{}", rule_id), None)
            .await?;
        Ok(rule)
    }

    async fn trigger(&self, rule_id: &str) -> AutomationResult<()> {
        self.call(reqwest::Method::POST, &format!("/{}/trigger", rule_id), None)
            .await?;
        Ok(())
    }

    async fn set_enabled(&self, rule_id: &str, enabled: bool) -> AutomationResult<()> {
        let verb = if enabled { "enable" } else { "disable" };
        self.call(reqwest::Method::POST, &format!("/{}/{}", rule_id, verb), None)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_bodies() {
        let on = ActionRequest::new("t1", "light", ActuatorAction::TurnOn);
        assert_eq!(
            action_body(&on),
            json!({"action": "turn_on", "entity_type": "light"})
        );
        let speed = ActionRequest::new("t1", "exhaust_fan", ActuatorAction::SetSpeed { percentage: 0 });
        assert_eq!(action_body(&speed)["value"], 0);
    }

    #[test]
    fn test_base_url_trimmed() {
        let api = Api::new("http://localhost:8099/", None).unwrap();
        assert_eq!(api.base_url, "http://localhost:8099");
    }
}
