use crate::error::{NormalizeError, Result};
use serde_json::Value;
use std::collections::BTreeMap;

/// Value of a static final field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstantValue {
    /// Numbers, booleans and chars, inlined as written
    Primitive(String),
    /// Any other value, inlined as a quoted string literal
    Text(String),
}

impl ConstantValue {
    pub fn render(&self) -> String {
        match self {
            Self::Primitive(raw) => raw.clone(),
            Self::Text(text) => {
                let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
                format!("\"{escaped}\"")
            }
        }
    }
}

/// Symbol table consulted when inlining `Class.CONSTANT` references
pub trait ConstantSource: Send + Sync {
    /// Values of static final fields named `field` declared by registered classes
    /// whose name matches `qualifier`.
    ///
    /// Returns every candidate; an empty list means nothing resolved.
    fn resolve(&self, qualifier: &str, field: &str) -> Result<Vec<ConstantValue>>;
}

/// In-memory [`ConstantSource`] keyed by fully qualified class name.
///
/// Nested classes may be registered as `Outer$Inner`; they match the source
/// spelling `Outer.Inner`.
#[derive(Debug, Clone, Default)]
pub struct ConstantTable {
    classes: BTreeMap<String, Option<BTreeMap<String, ConstantValue>>>,
}

impl ConstantTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, class: &str, field: &str, value: ConstantValue) {
        self.classes
            .entry(class.to_string())
            .or_insert_with(|| Some(BTreeMap::new()))
            .get_or_insert_with(BTreeMap::new)
            .insert(field.to_string(), value);
    }

    /// Register a class name whose fields cannot be loaded
    pub fn register_unresolvable(&mut self, class: &str) {
        self.classes.insert(class.to_string(), None);
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Build from `{"pkg.Class": {"FIELD": value, ...}, "pkg.Missing": null}`
    pub fn from_json_value(value: &Value) -> Result<Self> {
        let Value::Object(classes) = value else {
            return Err(NormalizeError::invalid_table("expected an object of classes"));
        };
        let mut table = Self::new();
        for (class, fields) in classes {
            match fields {
                Value::Null => table.register_unresolvable(class),
                Value::Object(fields) => {
                    table.classes.entry(class.clone()).or_insert_with(|| Some(BTreeMap::new()));
                    for (field, value) in fields {
                        let constant = match value {
                            Value::String(text) => ConstantValue::Text(text.clone()),
                            Value::Number(n) => ConstantValue::Primitive(n.to_string()),
                            Value::Bool(b) => ConstantValue::Primitive(b.to_string()),
                            other => {
                                return Err(NormalizeError::invalid_table(format!(
                                    "unsupported value for {class}.{field}: {other}"
                                )))
                            }
                        };
                        table.insert(class, field, constant);
                    }
                }
                other => {
                    return Err(NormalizeError::invalid_table(format!(
                        "fields of {class} must be an object, got {other}"
                    )))
                }
            }
        }
        Ok(table)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_json_value(&value)
    }
}

fn class_matches(registered: &str, qualifier: &str) -> bool {
    let registered = registered.replace('$', ".");
    let qualifier = qualifier.replace('$', ".");
    registered == qualifier
        || registered
            .strip_suffix(qualifier.as_str())
            .is_some_and(|prefix| prefix.ends_with('.'))
}

impl ConstantSource for ConstantTable {
    fn resolve(&self, qualifier: &str, field: &str) -> Result<Vec<ConstantValue>> {
        let mut values = Vec::new();
        let mut missing = None;
        for (class, fields) in &self.classes {
            if !class_matches(class, qualifier) {
                continue;
            }
            match fields {
                Some(fields) => values.extend(fields.get(field).cloned()),
                None => missing = Some(class.clone()),
            }
        }
        match missing {
            Some(class) if values.is_empty() => Err(NormalizeError::class_not_found(class)),
            _ => Ok(values),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_resolve_by_simple_and_qualified_name() {
        let mut table = ConstantTable::new();
        table.insert("org.acme.Limits", "MAX", ConstantValue::Primitive("10".into()));

        assert_eq!(
            table.resolve("Limits", "MAX").unwrap(),
            vec![ConstantValue::Primitive("10".into())]
        );
        assert_eq!(table.resolve("org.acme.Limits", "MAX").unwrap().len(), 1);
        assert!(table.resolve("Limits", "MIN").unwrap().is_empty());
        assert!(table.resolve("cme.Limits", "MAX").unwrap().is_empty());
    }

    #[test]
    fn test_nested_class_names() {
        let mut table = ConstantTable::new();
        table.insert("org.acme.Outer$Inner", "KEY", ConstantValue::Text("k".into()));
        assert_eq!(table.resolve("Outer.Inner", "KEY").unwrap().len(), 1);
        assert_eq!(table.resolve("Inner", "KEY").unwrap().len(), 1);
    }

    #[test]
    fn test_unresolvable_class_reports_error() {
        let mut table = ConstantTable::new();
        table.register_unresolvable("org.acme.Broken");
        let err = table.resolve("Broken", "X").unwrap_err();
        assert!(matches!(err, NormalizeError::ClassNotFound(_)));
    }

    #[test]
    fn test_from_json() {
        let table = ConstantTable::from_json(
            r#"{"org.acme.Limits": {"MAX": 10, "NAME": "acme", "ON": true},
                "org.acme.Broken": null}"#,
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.resolve("Limits", "NAME").unwrap(),
            vec![ConstantValue::Text("acme".into())]
        );
        assert_eq!(
            table.resolve("Limits", "ON").unwrap(),
            vec![ConstantValue::Primitive("true".into())]
        );
        assert!(ConstantTable::from_json("[1, 2]").is_err());
    }

    #[test]
    fn test_render() {
        assert_eq!(ConstantValue::Primitive("42".into()).render(), "42");
        assert_eq!(ConstantValue::Text("a\"b".into()).render(), "\"a\\\"b\"");
    }
}
