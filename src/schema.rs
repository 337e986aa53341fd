use serde::{ Deserialize, Serialize };
use serde_json::Value;

use crate::error::{ BrowserError, Result };

/// Typed view over a class definition returned by `/v1/schema/{name}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CollectionSchema {
    /// The collection (class) name.
    pub class: String,
    pub description: Option<String>,
    /// Name of the module that embeds objects, e.g. `text2vec-openai`.
    pub vectorizer: Option<String>,
    pub properties: Vec<PropertySchema>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PropertySchema {
    pub name: String,
    /// First entry of the server's `dataType` array, `unknown` if absent.
    pub data_type: String,
    pub description: Option<String>,
    pub tokenization: Option<String>,
    pub index_filterable: Option<bool>,
    pub index_searchable: Option<bool>,
    pub kind: PropertyKind,
}

/// Object properties own their nested list, so walking the tree never has
/// to probe optional fields.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum PropertyKind {
    Leaf,
    Object {
        /// `object[]` rather than `object`.
        array: bool,
        nested: Vec<PropertySchema>,
    },
}

/// One row of a flattened schema tree.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FlatProperty {
    pub depth: usize,
    /// Dotted path from the top-level property, e.g. `author.address.city`.
    pub path: String,
    pub data_type: String,
}

/// Per-collection details available from the `/v1/schema` listing.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CollectionSummary {
    pub name: String,
    pub vectorizer: Option<String>,
    pub property_count: usize,
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(String::from)
}

fn property_list<'a>(value: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    value
        .get(key)
        .and_then(Value::as_array)
        .filter(|list| !list.is_empty())
}

impl CollectionSchema {
    pub fn from_value(value: &Value) -> Result<Self> {
        let class = str_field(value, "class").ok_or_else(||
            BrowserError::MalformedResponse("schema has no class name".to_string())
        )?;
        let properties = match value.get("properties") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(list)) =>
                list.iter().map(PropertySchema::from_value).collect::<Result<Vec<_>>>()?,
            Some(_) => {
                return Err(
                    BrowserError::MalformedResponse(
                        format!("properties of '{}' is not a list", class)
                    )
                );
            }
        };
        Ok(Self {
            description: str_field(value, "description"),
            vectorizer: str_field(value, "vectorizer"),
            class,
            properties,
        })
    }

    /// Depth-first listing of every property, nested ones included.
    pub fn flatten(&self) -> Vec<FlatProperty> {
        let mut rows = Vec::new();
        for property in &self.properties {
            property.flatten_into(0, "", &mut rows);
        }
        rows
    }
}

impl PropertySchema {
    pub fn from_value(value: &Value) -> Result<Self> {
        let name = str_field(value, "name").ok_or_else(||
            BrowserError::MalformedResponse("property has no name".to_string())
        )?;
        let data_type = value
            .get("dataType")
            .and_then(Value::as_array)
            .and_then(|types| types.first())
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        let kind = match data_type.as_str() {
            "object" | "object[]" => {
                let nested = property_list(value, "nestedProperties")
                    .or_else(|| property_list(value, "properties"))
                    .map(|list| list.iter().map(PropertySchema::from_value).collect::<Result<Vec<_>>>())
                    .transpose()?
                    .unwrap_or_default();
                PropertyKind::Object {
                    array: data_type == "object[]",
                    nested,
                }
            }
            _ => PropertyKind::Leaf,
        };

        Ok(Self {
            name,
            description: str_field(value, "description"),
            tokenization: str_field(value, "tokenization"),
            index_filterable: value.get("indexFilterable").and_then(Value::as_bool),
            index_searchable: value.get("indexSearchable").and_then(Value::as_bool),
            data_type,
            kind,
        })
    }

    pub fn nested(&self) -> &[PropertySchema] {
        match &self.kind {
            PropertyKind::Object { nested, .. } => nested,
            PropertyKind::Leaf => &[],
        }
    }

    fn flatten_into(&self, depth: usize, prefix: &str, rows: &mut Vec<FlatProperty>) {
        let path = if prefix.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", prefix, self.name)
        };
        rows.push(FlatProperty {
            depth,
            path: path.clone(),
            data_type: self.data_type.clone(),
        });
        for child in self.nested() {
            child.flatten_into(depth + 1, &path, rows);
        }
    }
}

/// Summaries for every class in a raw `/v1/schema` listing. Entries without a
/// class name are skipped.
pub fn summarize_classes(listing: &Value) -> Vec<CollectionSummary> {
    listing
        .get("classes")
        .and_then(Value::as_array)
        .map(|classes| {
            classes
                .iter()
                .filter_map(|c| {
                    Some(CollectionSummary {
                        name: str_field(c, "class")?,
                        vectorizer: str_field(c, "vectorizer"),
                        property_count: c
                            .get("properties")
                            .and_then(Value::as_array)
                            .map_or(0, Vec::len),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}
