//! A JSON-patch style operation.
//!
//! The queue never looks inside operations; this type is a ready-made shape
//! for targets that mutate a JSON document by path.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Remove,
    Replace,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: PatchOp,
    pub path: Vec<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub value: Value,
}

impl PatchOperation {
    pub fn new<P, S>(op: PatchOp, path: P, value: Value) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            op,
            path: path.into_iter().map(Into::into).collect(),
            value,
        }
    }

    pub fn add<P, S>(path: P, value: Value) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(PatchOp::Add, path, value)
    }

    pub fn replace<P, S>(path: P, value: Value) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(PatchOp::Replace, path, value)
    }

    pub fn remove<P, S>(path: P) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(PatchOp::Remove, path, Value::Null)
    }

    /// Path joined with `/`, e.g. `planets/123`
    pub fn path_string(&self) -> String {
        self.path.join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let op = PatchOperation::add(["planets", "123"], json!("Mercury"));
        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            json!({"op": "add", "path": ["planets", "123"], "value": "Mercury"})
        );
    }

    #[test]
    fn test_remove_omits_value() {
        let op = PatchOperation::remove(["planets", "234"]);
        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            json!({"op": "remove", "path": ["planets", "234"]})
        );

        let parsed: PatchOperation =
            serde_json::from_value(json!({"op": "remove", "path": ["planets", "234"]})).unwrap();
        assert_eq!(parsed, op);
        assert_eq!(parsed.path_string(), "planets/234");
    }
}
