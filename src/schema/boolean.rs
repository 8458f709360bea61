use serde_json::Value;

use super::SchemaNode;

impl SchemaNode {
    pub(super) fn transform_boolean(&self, value: bool) -> Value {
        Value::Bool(value != self.constraints.inverse)
    }
}

#[cfg(test)]
mod tests {
    use crate::path::JsonPath;
    use crate::schema::Schema;
    use serde_json::json;

    #[test]
    fn test_shorthand_accepts_any_boolean() {
        let schema = Schema::compile(&json!(true)).unwrap();
        assert!(schema.validate(&json!(false), &JsonPath::root()).is_success());
        assert!(schema.validate(&json!("true"), &JsonPath::root()).is_failure());
    }

    #[test]
    fn test_inverse() {
        let schema = Schema::compile(&json!({".type": "boolean", ".inverse": true})).unwrap();
        assert_eq!(schema.transform(None, &json!(true)).unwrap(), json!(false));
        assert_eq!(schema.transform(Some(&json!(true)), &json!(false)).unwrap(), json!(true));
    }

    #[test]
    fn test_passes_through() {
        let schema = Schema::compile(&json!({".type": "boolean"})).unwrap();
        assert_eq!(schema.transform(Some(&json!(false)), &json!(true)).unwrap(), json!(true));
    }
}
