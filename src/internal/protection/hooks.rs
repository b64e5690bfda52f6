//! Hook registry: named hooks at the four classic Git hook points, run in priority order,
//! plus webhook dispatch with HMAC-signed JSON payloads and exponential-backoff retry.

use std::time::Duration;

use ring::hmac;
use serde::Serialize;

use crate::errors::GitError;

/// The four points in the receive-pack lifecycle a hook can be registered at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    PreReceive,
    Update,
    PostReceive,
    PostUpdate,
}

/// Whether a hook point's registered hooks run one at a time (first failure aborts) or
/// concurrently (all results collected before deciding).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookMode {
    Sync,
    Async,
}

/// A single webhook registration.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub url: String,
    pub secret: Option<String>,
    pub attempts: u32,
    pub initial_delay: Duration,
    pub backoff: f64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            secret: None,
            attempts: 3,
            initial_delay: Duration::from_millis(200),
            backoff: 2.0,
        }
    }
}

/// One hook registered at a given point.
#[derive(Debug, Clone)]
pub struct HookRegistration {
    pub name: String,
    pub point: HookPoint,
    pub priority: i32,
    pub timeout_ms: u64,
    pub enabled: bool,
    pub webhook: WebhookConfig,
}

impl HookRegistration {
    pub fn new(name: impl Into<String>, point: HookPoint, webhook: WebhookConfig) -> Self {
        Self {
            name: name.into(),
            point,
            priority: 100,
            timeout_ms: 30_000,
            enabled: true,
            webhook,
        }
    }
}

/// Payload posted to a webhook on each hook firing.
#[derive(Debug, Serialize)]
pub struct HookPayload {
    pub hook: String,
    pub timestamp: i64,
    pub repository: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commands: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<String>>,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub ref_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<Vec<(String, String)>>,
}

/// Outcome of running every hook registered at one point.
#[derive(Debug, Clone)]
pub struct HookOutcome {
    pub hook_name: String,
    pub accepted: bool,
    pub message: Option<String>,
}

/// Compute the `X-Hook-Signature` header value: `sha256=<hex hmac>`.
pub fn sign_payload(secret: &str, body: &[u8]) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    let tag = hmac::sign(&key, body);
    format!("sha256={}", hex::encode(tag.as_ref()))
}

/// Ordered collection of hooks per point. Hooks within a point run in ascending priority order
/// (lower first), matching the "lower runs first, default 100" rule.
#[derive(Debug, Clone, Default)]
pub struct HookRegistry {
    hooks: Vec<HookRegistration>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: HookRegistration) {
        self.hooks.push(hook);
    }

    fn ordered(&self, point: HookPoint) -> Vec<&HookRegistration> {
        let mut hooks: Vec<&HookRegistration> = self
            .hooks
            .iter()
            .filter(|h| h.point == point && h.enabled)
            .collect();
        hooks.sort_by_key(|h| h.priority);
        hooks
    }

    /// Fire every hook registered at `point`. In `Sync` mode the first rejection stops the run
    /// (matching pre-receive's "aborts on first failure"); in `Async` mode every hook runs and
    /// all outcomes are returned regardless of individual failures.
    pub fn fire(
        &self,
        point: HookPoint,
        mode: HookMode,
        payload: &HookPayload,
    ) -> Result<Vec<HookOutcome>, GitError> {
        let mut outcomes = Vec::new();
        for hook in self.ordered(point) {
            let outcome = dispatch_webhook(hook, payload)?;
            let rejected = !outcome.accepted;
            outcomes.push(outcome);
            if mode == HookMode::Sync && rejected {
                break;
            }
        }
        Ok(outcomes)
    }
}

fn dispatch_webhook(
    hook: &HookRegistration,
    payload: &HookPayload,
) -> Result<HookOutcome, GitError> {
    let body = serde_json::to_vec(payload)
        .map_err(|e| GitError::HookRejected(format!("failed to serialize payload: {e}")))?;

    let mut delay = hook.webhook.initial_delay;
    let mut last_error: Option<String> = None;

    for attempt in 0..hook.webhook.attempts.max(1) {
        let mut request = ureq::post(&hook.webhook.url)
            .header("Content-Type", "application/json");
        if let Some(secret) = &hook.webhook.secret {
            request = request.header("X-Hook-Signature", &sign_payload(secret, &body));
        }

        match request.send(&body[..]) {
            Ok(response) => {
                let status = response.status().as_u16();
                if (200..300).contains(&status) {
                    return Ok(HookOutcome {
                        hook_name: hook.name.clone(),
                        accepted: true,
                        message: None,
                    });
                }
                if (400..500).contains(&status) {
                    return Ok(HookOutcome {
                        hook_name: hook.name.clone(),
                        accepted: false,
                        message: Some(format!("webhook returned {status}")),
                    });
                }
                last_error = Some(format!("webhook returned {status}"));
            }
            Err(e) => last_error = Some(e.to_string()),
        }

        if attempt + 1 < hook.webhook.attempts {
            std::thread::sleep(delay);
            delay = Duration::from_secs_f64(delay.as_secs_f64() * hook.webhook.backoff);
        }
    }

    Ok(HookOutcome {
        hook_name: hook.name.clone(),
        accepted: false,
        message: last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_payload_is_deterministic_for_the_same_secret_and_body() {
        let body = b"{\"hook\":\"pre-receive\"}";
        let a = sign_payload("s3cret", body);
        let b = sign_payload("s3cret", body);
        assert_eq!(a, b);
        assert!(a.starts_with("sha256="));
    }

    #[test]
    fn sign_payload_differs_for_different_secrets() {
        let body = b"payload";
        assert_ne!(sign_payload("a", body), sign_payload("b", body));
    }

    #[test]
    fn ordered_sorts_by_priority_ascending() {
        let mut registry = HookRegistry::new();
        registry.register(HookRegistration {
            priority: 200,
            ..HookRegistration::new("late", HookPoint::PreReceive, WebhookConfig::default())
        });
        registry.register(HookRegistration {
            priority: 50,
            ..HookRegistration::new("early", HookPoint::PreReceive, WebhookConfig::default())
        });
        let ordered = registry.ordered(HookPoint::PreReceive);
        assert_eq!(ordered[0].name, "early");
        assert_eq!(ordered[1].name, "late");
    }

    #[test]
    fn ordered_skips_disabled_hooks_and_other_points() {
        let mut registry = HookRegistry::new();
        registry.register(HookRegistration::new(
            "disabled",
            HookPoint::PreReceive,
            WebhookConfig::default(),
        ));
        registry.hooks[0].enabled = false;
        registry.register(HookRegistration::new(
            "other-point",
            HookPoint::PostReceive,
            WebhookConfig::default(),
        ));
        assert!(registry.ordered(HookPoint::PreReceive).is_empty());
    }
}
