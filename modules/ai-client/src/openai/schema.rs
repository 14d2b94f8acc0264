use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Types usable as an OpenAI `json_schema` response format.
///
/// Implemented for everything that is `JsonSchema + DeserializeOwned`. Strict
/// mode wants every object closed (`additionalProperties: false`), every
/// property listed in `required` (nullable ones included), no `$ref`s and no
/// `default` or non-string `format` keywords.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    fn openai_schema() -> Value {
        let mut value = serde_json::to_value(schema_for!(Self)).unwrap_or_default();

        let definitions = match &mut value {
            Value::Object(map) => {
                map.remove("$schema");
                map.remove("definitions")
            }
            _ => None,
        };
        if let Some(Value::Object(definitions)) = definitions {
            inline_refs(&mut value, &definitions);
        }
        strip_unsupported(&mut value);
        close_objects(&mut value);

        value
    }

    fn type_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

fn close_objects(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some("object") {
                map.insert("additionalProperties".into(), Value::Bool(false));
                let required: Vec<Value> = map
                    .get("properties")
                    .and_then(Value::as_object)
                    .map(|props| props.keys().cloned().map(Value::String).collect())
                    .unwrap_or_default();
                map.insert("required".into(), Value::Array(required));
            }
            map.values_mut().for_each(close_objects);
        }
        Value::Array(items) => items.iter_mut().for_each(close_objects),
        _ => {}
    }
}

/// Drop keywords strict mode rejects. `properties` maps are walked per entry so
/// a field that happens to be named `default` or `format` survives.
fn strip_unsupported(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.remove("default");
            let string_typed = match map.get("type") {
                Some(Value::String(t)) => t == "string",
                Some(Value::Array(types)) => types.iter().any(|t| t == "string"),
                _ => false,
            };
            if !string_typed {
                map.remove("format");
            }
            for (key, v) in map.iter_mut() {
                match (key.as_str(), v) {
                    ("properties", Value::Object(props)) => {
                        props.values_mut().for_each(strip_unsupported)
                    }
                    (_, v) => strip_unsupported(v),
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(strip_unsupported),
        _ => {}
    }
}

fn inline_refs(value: &mut Value, definitions: &Map<String, Value>) {
    match value {
        Value::Object(map) => {
            let target = map
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|path| path.strip_prefix("#/definitions/"))
                .and_then(|name| definitions.get(name));
            if let Some(def) = target {
                *value = def.clone();
                inline_refs(value, definitions);
                return;
            }

            // schemars wraps a referenced field with a description in a single-entry allOf.
            let single = match map.get_mut("allOf") {
                Some(Value::Array(all_of)) if all_of.len() == 1 => all_of.pop(),
                _ => None,
            };
            if let Some(inner) = single {
                *value = inner;
                inline_refs(value, definitions);
                return;
            }

            for v in map.values_mut() {
                inline_refs(v, definitions);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                inline_refs(item, definitions);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    struct PriceRange {
        min: Option<f64>,
        max: Option<f64>,
    }

    #[derive(Deserialize, JsonSchema)]
    struct Parsed {
        category: Option<String>,
        price: PriceRange,
        keywords: Vec<String>,
    }

    #[test]
    fn nullable_fields_are_required() {
        let schema = Parsed::openai_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert!(required.contains(&"category"));
        assert!(required.contains(&"price"));
        assert!(required.contains(&"keywords"));
        assert_eq!(schema["additionalProperties"], Value::Bool(false));
    }

    #[derive(Deserialize, JsonSchema)]
    struct Lenient {
        #[serde(default)]
        total: Option<f64>,
        #[serde(default)]
        tags: Vec<String>,
        #[serde(default)]
        default: Option<u32>,
    }

    #[test]
    fn default_and_numeric_format_are_stripped() {
        let schema = Lenient::openai_schema();
        let rendered = schema.to_string();
        assert!(!rendered.contains("\"format\""), "{rendered}");

        let props = schema["properties"].as_object().unwrap();
        assert!(props.contains_key("default"));
        for (name, prop) in props {
            assert!(prop.get("default").is_none(), "{name} keeps a default");
        }
        assert_eq!(schema["additionalProperties"], Value::Bool(false));
    }

    #[test]
    fn nested_struct_is_inlined_and_closed() {
        let schema = Parsed::openai_schema();
        let obj = schema.as_object().unwrap();
        assert!(!obj.contains_key("definitions"));
        assert!(!obj.contains_key("$schema"));

        let price = &schema["properties"]["price"];
        assert!(price.get("$ref").is_none());
        assert_eq!(price["type"], Value::String("object".into()));
        assert_eq!(price["additionalProperties"], Value::Bool(false));
    }
}
