//! Role and Registry: the static description of a deliberation's participants.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{CouncilError, CouncilResult};

/// Sampling parameters passed to a [`crate::provider::Provider`] call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f64>,
    pub presence_penalty: Option<f64>,
    pub frequency_penalty: Option<f64>,
    #[serde(default)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: None,
            top_p: None,
            presence_penalty: None,
            frequency_penalty: None,
            extra: HashMap::new(),
        }
    }
}

impl SamplingConfig {
    pub fn validate(&self) -> CouncilResult<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(CouncilError::configuration(format!(
                "temperature must be within [0, 2], got {}",
                self.temperature
            )));
        }
        if let Some(max_tokens) = self.max_tokens {
            if max_tokens == 0 {
                return Err(CouncilError::configuration(
                    "max_tokens must be > 0 when set",
                ));
            }
        }
        if let Some(top_p) = self.top_p {
            if !(0.0..=1.0).contains(&top_p) {
                return Err(CouncilError::configuration(format!(
                    "top_p must be within [0, 1], got {top_p}"
                )));
            }
        }
        Ok(())
    }

    /// Judge sampling is fixed regardless of role configuration: crisp, short.
    pub fn judge_defaults() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: Some(500),
            ..Default::default()
        }
    }
}

/// A named deliberation participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub prompt: String,
    pub model: String,
    pub weight: f64,
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl Role {
    pub fn new(name: impl Into<String>, prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompt: prompt.into(),
            model: model.into(),
            weight: 1.0,
            sampling: SamplingConfig::default(),
            depends_on: Vec::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn depends_on_role(mut self, role_name: impl Into<String>) -> Self {
        self.depends_on.push(role_name.into());
        self
    }

    pub fn validate(&self) -> CouncilResult<()> {
        if self.name.trim().is_empty() {
            return Err(CouncilError::configuration("role name must not be empty"));
        }
        if self.model.trim().is_empty() {
            return Err(CouncilError::configuration(format!(
                "role '{}' has an empty model",
                self.name
            )));
        }
        if self.weight <= 0.0 {
            return Err(CouncilError::configuration(format!(
                "role '{}' weight must be > 0, got {}",
                self.name, self.weight
            )));
        }
        self.sampling.validate()?;
        Ok(())
    }
}

/// The outcome of dispatching one role against a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleResult {
    pub role_name: String,
    pub content: String,
    pub model: String,
    pub tokens_used: Option<u32>,
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
}

impl RoleResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// An ordered, unique-by-name collection of [`Role`]s. Iteration order is
/// insertion order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    order: Vec<String>,
    roles: HashMap<String, Role>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, role: Role) -> CouncilResult<&mut Self> {
        if self.roles.contains_key(&role.name) {
            return Err(CouncilError::configuration(format!(
                "duplicate role name '{}'",
                role.name
            )));
        }
        self.order.push(role.name.clone());
        self.roles.insert(role.name.clone(), role);
        Ok(self)
    }

    pub fn get(&self, name: &str) -> CouncilResult<&Role> {
        self.roles
            .get(name)
            .ok_or_else(|| CouncilError::configuration(format!("unknown role '{name}'")))
    }

    pub fn has(&self, name: &str) -> bool {
        self.roles.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Role> {
        if let Some(pos) = self.order.iter().position(|n| n == name) {
            self.order.remove(pos);
        }
        self.roles.remove(name)
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.roles.clear();
    }

    pub fn get_by_model(&self, model: &str) -> Vec<&Role> {
        self.iter().filter(|r| r.model == model).collect()
    }

    pub fn list_names(&self) -> &[String] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.order.iter().map(move |name| &self.roles[name])
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.has(name)
    }

    pub fn validate(&self) -> CouncilResult<()> {
        for role in self.iter() {
            role.validate()?;
            for dep in &role.depends_on {
                if !self.has(dep) {
                    return Err(CouncilError::configuration(format!(
                        "role '{}' depends on unknown role '{}'",
                        role.name, dep
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names_rejected() {
        let mut registry = Registry::new();
        registry.add(Role::new("alice", "p", "m")).unwrap();
        let err = registry.add(Role::new("alice", "p2", "m2")).unwrap_err();
        assert!(matches!(err, CouncilError::Configuration { .. }));
    }

    #[test]
    fn insertion_order_preserved() {
        let mut registry = Registry::new();
        registry.add(Role::new("b", "p", "m")).unwrap();
        registry.add(Role::new("a", "p", "m")).unwrap();
        assert_eq!(registry.list_names(), &["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn sampling_bounds() {
        let mut sampling = SamplingConfig::default();
        sampling.temperature = 3.0;
        assert!(sampling.validate().is_err());
    }
}
