use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::command::{Command, CommandContext, Verdict};
use crate::commands::{GET_LAYER_STATES, VALIDATE_LAYERS};
use crate::error::{E2eError, E2eResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerState {
    pub id: String,
    #[serde(default)]
    pub visible: bool,
    #[serde(default)]
    pub opacity: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayerValidation {
    pub valid: bool,
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Accepts either `[{id, ...}]` or `{id: {...}}`
pub fn parse_layer_states(value: serde_json::Value) -> E2eResult<Vec<LayerState>> {
    match value {
        serde_json::Value::Array(_) => Ok(serde_json::from_value(value)?),
        serde_json::Value::Object(map) => map
            .into_iter()
            .map(|(id, mut state)| {
                if let Some(obj) = state.as_object_mut() {
                    obj.entry("id").or_insert_with(|| json!(id));
                }
                serde_json::from_value(state).map_err(E2eError::from)
            })
            .collect(),
        other => Err(E2eError::AssertionFailed(format!(
            "getLayerStates returned {}",
            other
        ))),
    }
}

/// Problems with the layer set: missing expected layers, bad opacity
pub fn check_layer_states(states: &[LayerState], expected: &[String]) -> Vec<String> {
    let mut problems: Vec<String> = expected
        .iter()
        .filter(|id| !states.iter().any(|s| &s.id == *id))
        .map(|id| format!("layer '{}' missing", id))
        .collect();

    for state in states.iter().filter(|s| s.visible) {
        if let Some(opacity) = state.opacity {
            if !(0.0..=1.0).contains(&opacity) {
                problems.push(format!("layer '{}' has opacity {}", state.id, opacity));
            }
        }
    }
    problems
}

/// The map's layer stack validates and holds every expected layer
pub struct InvariantsCommand {
    expected_layers: Vec<String>,
    timeout: Duration,
}

impl InvariantsCommand {
    pub fn new(expected_layers: Vec<String>, timeout: Duration) -> Self {
        Self {
            expected_layers,
            timeout,
        }
    }
}

#[async_trait]
impl Command for InvariantsCommand {
    fn name(&self) -> &str {
        "invariants"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn run(&self, ctx: &CommandContext<'_>) -> E2eResult<Verdict> {
        let states = parse_layer_states(ctx.page.evaluate(GET_LAYER_STATES).await?)?;
        let validation: LayerValidation =
            serde_json::from_value(ctx.page.evaluate(VALIDATE_LAYERS).await?)?;

        let mut problems = check_layer_states(&states, &self.expected_layers);
        if !validation.valid {
            if validation.errors.is_empty() {
                problems.push("validateLayers() reported invalid".to_string());
            }
            problems.extend(validation.errors);
        }

        let details = json!({ "layers": states, "problems": problems });
        if problems.is_empty() {
            Ok(Verdict::pass(format!("{} layer(s) consistent", states.len())).with_details(details))
        } else {
            Ok(Verdict::fail(problems.join("; ")).with_details(details))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_layer_map() {
        let states = parse_layer_states(json!({
            "hazard-zones": { "visible": true, "opacity": 0.6 },
            "safe-routes": { "visible": false }
        }))
        .unwrap();
        assert_eq!(states.len(), 2);
        assert!(states.iter().any(|s| s.id == "safe-routes" && !s.visible));
    }

    #[test]
    fn test_parse_rejects_scalar() {
        assert!(parse_layer_states(json!(42)).is_err());
    }

    #[test]
    fn test_missing_layer_and_bad_opacity() {
        let states = vec![LayerState {
            id: "hazard-zones".to_string(),
            visible: true,
            opacity: Some(1.4),
        }];
        let expected = vec!["hazard-zones".to_string(), "safe-routes".to_string()];

        let problems = check_layer_states(&states, &expected);
        assert_eq!(problems.len(), 2);
        assert!(problems[0].contains("safe-routes"));
        assert!(problems[1].contains("opacity"));
    }
}
