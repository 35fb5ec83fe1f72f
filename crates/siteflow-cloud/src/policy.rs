//! Bucket policy documents
//!
//! The serialised form must stay byte-for-byte stable: providers store the
//! document as given, and the field order below is the order the policy
//! language documents use.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const POLICY_VERSION: &str = "2012-10-17";

/// IAM-style policy document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(rename = "Version")]
    pub version: String,

    #[serde(rename = "Statement")]
    pub statement: Vec<PolicyStatement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyStatement {
    #[serde(rename = "Effect")]
    pub effect: String,

    #[serde(rename = "Principal")]
    pub principal: String,

    #[serde(rename = "Action")]
    pub action: Vec<String>,

    #[serde(rename = "Resource")]
    pub resource: Vec<String>,
}

impl PolicyDocument {
    pub fn single_statement(
        effect: impl Into<String>,
        principal: impl Into<String>,
        action: Vec<String>,
        resource: Vec<String>,
    ) -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statement: vec![PolicyStatement {
                effect: effect.into(),
                principal: principal.into(),
                action,
                resource,
            }],
        }
    }

    /// Compact JSON as sent to the provider
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Semantic comparison against a policy read back from the provider.
    ///
    /// Providers may return single-element lists as plain strings, expand
    /// `"*"` principals to `{"AWS": "*"}`, reorder list entries or add `Sid`
    /// fields.
    pub fn is_equivalent(&self, observed: &Value) -> bool {
        normalize(&self.to_value()) == normalize(observed)
    }
}

fn normalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (key, v) in map {
                match key.as_str() {
                    "Sid" => {}
                    "Action" | "NotAction" | "Resource" | "NotResource" => {
                        out.insert(key.clone(), normalize_list(v));
                    }
                    "Principal" => {
                        out.insert(key.clone(), normalize_principal(v));
                    }
                    "Statement" => {
                        let statements = match v {
                            Value::Array(items) => items.iter().map(normalize).collect(),
                            other => vec![normalize(other)],
                        };
                        out.insert(key.clone(), Value::Array(statements));
                    }
                    _ => {
                        out.insert(key.clone(), normalize(v));
                    }
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(normalize).collect()),
        other => other.clone(),
    }
}

fn normalize_list(value: &Value) -> Value {
    let mut items: Vec<String> = match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        other => vec![other.to_string()],
    };
    items.sort();
    items.dedup();
    Value::Array(items.into_iter().map(Value::String).collect())
}

fn normalize_principal(value: &Value) -> Value {
    match value {
        Value::Object(map) if map.len() == 1 && map.get("AWS") == Some(&Value::from("*")) => {
            Value::from("*")
        }
        Value::Object(map) if map.len() == 1 => match map.get("AWS") {
            Some(Value::Array(items)) if items.len() == 1 && items[0] == "*" => Value::from("*"),
            _ => Value::Object(map.clone()),
        },
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn public_read(bucket: &str) -> PolicyDocument {
        PolicyDocument::single_statement(
            "Allow",
            "*",
            vec!["s3:GetObject".to_string()],
            vec![format!("arn:aws:s3:::{}/*", bucket)],
        )
    }

    #[test]
    fn test_exact_serialisation() {
        let doc = public_read("my-terraform-portfolio-site-12345");
        assert_eq!(
            doc.to_json().unwrap(),
            r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Principal":"*","Action":["s3:GetObject"],"Resource":["arn:aws:s3:::my-terraform-portfolio-site-12345/*"]}]}"#
        );
        assert_eq!(
            doc.statement[0].resource,
            vec!["arn:aws:s3:::my-terraform-portfolio-site-12345/*"]
        );
    }

    #[test]
    fn test_equivalent_to_provider_normalised_form() {
        let doc = public_read("my-site");
        let observed = json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Sid": "PublicReadGetObject",
                "Effect": "Allow",
                "Principal": {"AWS": "*"},
                "Action": "s3:GetObject",
                "Resource": "arn:aws:s3:::my-site/*"
            }]
        });
        assert!(doc.is_equivalent(&observed));
    }

    #[test]
    fn test_not_equivalent_when_resource_differs() {
        let doc = public_read("my-site");
        let observed = public_read("other-site").to_value();
        assert!(!doc.is_equivalent(&observed));
    }

    #[test]
    fn test_not_equivalent_with_extra_statement() {
        let doc = public_read("my-site");
        let mut observed = doc.to_value();
        observed["Statement"]
            .as_array_mut()
            .unwrap()
            .push(json!({"Effect": "Deny", "Principal": "*", "Action": "s3:PutObject", "Resource": "*"}));
        assert!(!doc.is_equivalent(&observed));
    }
}
