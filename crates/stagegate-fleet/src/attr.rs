//! Nested attribute-path lookup over JSON peer attributes.

use serde_json::Value;

use stagegate_state::StateKind;

use crate::error::{FleetError, FleetResult};

/// Walk `root` down an ordered sequence of object keys.
///
/// Fails with [`FleetError::AttributeNotFound`] the first time a key
/// is missing at any depth, or when an intermediate value is not an
/// object. The error names the path up to the failing key.
pub fn attribute_at<'a, S: AsRef<str>>(root: &'a Value, path: &[S]) -> FleetResult<&'a Value> {
    let mut node = root;
    for (depth, key) in path.iter().enumerate() {
        node = node
            .as_object()
            .and_then(|obj| obj.get(key.as_ref()))
            .ok_or_else(|| FleetError::AttributeNotFound {
                path: path[..=depth]
                    .iter()
                    .map(AsRef::as_ref)
                    .collect::<Vec<_>>()
                    .join("."),
            })?;
    }
    Ok(node)
}

/// Attribute path where a node records its rollout state ids:
/// `stagegate.state.<state_name>.<current|desired>`.
pub fn state_path(state_name: &str, kind: StateKind) -> [String; 4] {
    [
        "stagegate".to_string(),
        "state".to_string(),
        state_name.to_string(),
        kind.as_str().to_string(),
    ]
}
