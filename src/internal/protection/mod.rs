//! Branch protection rules and the pre-receive/update/post-receive/post-update hook registry,
//! including webhook dispatch with HMAC-signed payloads.

pub mod hooks;

use std::cmp::Ordering;

use crate::errors::GitError;

/// One branch-protection rule, matched against a ref name by glob pattern.
#[derive(Debug, Clone, Default)]
pub struct ProtectionRule {
    pub pattern: String,
    pub lock_branch: bool,
    pub block_deletion: bool,
    pub block_force_push: bool,
    pub required_reviews: u32,
    pub require_linear_history: bool,
    pub require_signed_commits: bool,
    pub required_status_checks: Vec<String>,
    pub require_up_to_date: bool,
    pub require_conversation_resolution: bool,
    pub allow_admin_bypass: bool,
    pub bypass_users: Vec<String>,
    pub bypass_teams: Vec<String>,
    pub custom_message: Option<String>,
}

/// The set of configured rules plus the fallback applied when nothing matches.
#[derive(Debug, Clone, Default)]
pub struct ProtectionConfig {
    pub rules: Vec<ProtectionRule>,
    pub default_protection: Option<ProtectionRule>,
}

/// Everything about an incoming push that protection rules need to evaluate it.
#[derive(Debug, Clone, Default)]
pub struct PushContext {
    pub ref_name: String,
    pub user: String,
    pub teams: Vec<String>,
    pub is_admin: bool,
    pub is_deletion: bool,
    pub is_force_push: bool,
    pub approved_review_count: u32,
    pub has_merge_commits: bool,
    pub all_new_commits_signed: bool,
    pub passed_status_checks: Vec<String>,
    pub is_up_to_date: bool,
    pub has_unresolved_conversations: bool,
}

/// Match a glob `pattern` (supporting `*` for a single path segment, `**` for any number of
/// segments including none, and `?` for a single character) against `text`.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    match_from(&p, 0, &t, 0)
}

fn match_from(p: &[char], pi: usize, t: &[char], ti: usize) -> bool {
    if pi == p.len() {
        return ti == t.len();
    }
    if p[pi] == '*' && pi + 1 < p.len() && p[pi + 1] == '*' {
        let mut next_pi = pi + 2;
        while next_pi < p.len() && p[next_pi] == '/' {
            next_pi += 1;
        }
        for split in ti..=t.len() {
            if match_from(p, next_pi, t, split) {
                return true;
            }
        }
        return false;
    }
    if p[pi] == '*' {
        for split in ti..=t.len() {
            if t[ti..split].contains(&'/') {
                break;
            }
            if match_from(p, pi + 1, t, split) {
                return true;
            }
        }
        return false;
    }
    if p[pi] == '?' {
        return ti < t.len() && t[ti] != '/' && match_from(p, pi + 1, t, ti + 1);
    }
    ti < t.len() && t[ti] == p[pi] && match_from(p, pi + 1, t, ti + 1)
}

fn specificity(pattern: &str, ref_name: &str) -> i64 {
    if pattern == ref_name {
        return i64::MAX;
    }
    let double_star = pattern.matches("**").count() as i64;
    let single_star = pattern.matches('*').count() as i64 - 2 * double_star;
    pattern.len() as i64 * 10 - (100 * double_star + 10 * single_star)
}

impl ProtectionConfig {
    /// The most specific rule matching `ref_name`, or the configured default.
    pub fn matching_rule(&self, ref_name: &str) -> Option<&ProtectionRule> {
        self.rules
            .iter()
            .filter(|rule| glob_match(&rule.pattern, ref_name))
            .max_by(|a, b| {
                specificity(&a.pattern, ref_name)
                    .partial_cmp(&specificity(&b.pattern, ref_name))
                    .unwrap_or(Ordering::Equal)
            })
            .or(self.default_protection.as_ref())
    }

    /// Run the ten-step evaluation order against `ctx`, returning `Err` on the first violation.
    pub fn evaluate(&self, ctx: &PushContext) -> Result<(), GitError> {
        let Some(rule) = self.matching_rule(&ctx.ref_name) else {
            return Ok(());
        };

        let reject = |reason: &str| -> GitError {
            GitError::Protected(
                rule.custom_message
                    .clone()
                    .unwrap_or_else(|| reason.to_string()),
            )
        };

        if (rule.allow_admin_bypass && ctx.is_admin)
            || rule.bypass_users.contains(&ctx.user)
            || ctx.teams.iter().any(|t| rule.bypass_teams.contains(t))
        {
            return Ok(());
        }

        if rule.lock_branch {
            return Err(reject("branch_locked"));
        }
        if ctx.is_deletion {
            if rule.block_deletion {
                return Err(reject("deletion_blocked"));
            }
            return Ok(());
        }
        if ctx.is_force_push && rule.block_force_push {
            return Err(reject("force_push_blocked"));
        }
        if rule.required_reviews > ctx.approved_review_count {
            return Err(reject("reviews_required"));
        }
        if rule.require_linear_history && ctx.has_merge_commits {
            return Err(reject("linear_history_required"));
        }
        if rule.require_signed_commits && !ctx.all_new_commits_signed {
            return Err(reject("signed_commits_required"));
        }
        if rule
            .required_status_checks
            .iter()
            .any(|check| !ctx.passed_status_checks.contains(check))
        {
            return Err(reject("status_checks_required"));
        }
        if rule.require_up_to_date && !ctx.is_up_to_date {
            return Err(reject("up_to_date_required"));
        }
        if rule.require_conversation_resolution && ctx.has_unresolved_conversations {
            return Err(reject("conversation_resolution_required"));
        }
        Ok(())
    }
}

/// Flatten push options into the `GIT_PUSH_OPTION_COUNT` / `GIT_PUSH_OPTION_{i}` env vars hooks
/// expect to see.
pub fn push_options_to_env(options: &[String]) -> Vec<(String, String)> {
    let mut env = vec![("GIT_PUSH_OPTION_COUNT".to_string(), options.len().to_string())];
    for (i, option) in options.iter().enumerate() {
        env.push((format!("GIT_PUSH_OPTION_{i}"), option.clone()));
    }
    env
}
