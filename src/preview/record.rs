use serde::Serialize;
use serde_json::{Map, Value as Json};

use super::{more_marker, safe_repr, window, PreviewKind, PreviewOptions, FIELD_REPR_LIMIT, UNBOX_DEPTH};
use crate::value::{CArray, CStruct, Record, Value};

const UNREADABLE: &str = "<unreadable>";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DataclassField {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<Vec<usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dtype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Json>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CtypesField {
    pub name: String,
    pub ctype: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elem_ctype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Json>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Json>,
}

pub(super) fn dataclass_preview(record: &Record) -> PreviewKind {
    let fields = record
        .fields
        .iter()
        .map(|field| {
            let mut entry = DataclassField {
                name: field.name.clone(),
                type_name: field.type_name.clone(),
                kind: "value",
                shape: None,
                dtype: None,
                repr: None,
                value: None,
            };
            match &field.value {
                Value::Array(array) => {
                    entry.kind = "ndarray";
                    entry.shape = Some(array.shape.clone());
                    entry.dtype = Some(array.dtype.clone());
                }
                Value::Frame(frame) => {
                    entry.kind = "dataframe";
                    entry.shape = Some(vec![frame.height(), frame.width()]);
                }
                Value::Unreadable(_) => {
                    entry.kind = "unknown";
                    entry.value = Some(Json::String(UNREADABLE.to_string()));
                }
                other => entry.repr = Some(safe_repr(other, FIELD_REPR_LIMIT)),
            }
            entry
        })
        .collect();
    PreviewKind::Dataclass {
        class_name: record.class_name.clone(),
        fields,
    }
}

pub(super) fn struct_preview(structure: &CStruct, options: &PreviewOptions) -> PreviewKind {
    let fields = structure
        .fields
        .iter()
        .map(|field| {
            let mut entry = CtypesField {
                name: field.name.clone(),
                ctype: field.ctype.clone(),
                kind: "scalar",
                length: None,
                elem_ctype: None,
                values: None,
                value: None,
            };
            match &field.value {
                Value::CArray(array) => {
                    entry.kind = "array";
                    entry.length = Some(array.items.len());
                    entry.elem_ctype = Some(array.elem_ctype.clone());
                    entry.values = Some(unbox_items(array, 0, options.max_cols));
                }
                Value::CStruct(_) => {
                    entry.kind = "struct";
                    entry.value = Some(unbox(&field.value, 0, options.max_cols));
                }
                Value::Unreadable(_) => {
                    entry.kind = "unknown";
                    entry.value = Some(Json::String(UNREADABLE.to_string()));
                }
                other => entry.value = Some(unbox(other, 0, options.max_cols)),
            }
            entry
        })
        .collect();
    PreviewKind::Ctypes {
        struct_name: structure.name.clone(),
        fields,
    }
}

pub(super) fn struct_array_preview(array: &CArray, options: &PreviewOptions) -> PreviewKind {
    let length = array.items.len();
    let range = window(length, options.row_offset, options.max_rows);
    let remaining = length - range.end;
    let mut values: Vec<Json> = array.items[range]
        .iter()
        .map(|item| unbox(item, 1, options.max_cols))
        .collect();
    if remaining > 0 {
        values.push(more_marker(remaining));
    }
    PreviewKind::CtypesArray {
        ctype: array.type_name(),
        length,
        values,
    }
}

/// Flattens fixed-layout values into plain JSON. Arrays are cut at
/// `max_cols` elements; nesting stops past [`UNBOX_DEPTH`].
fn unbox(value: &Value, depth: usize, max_cols: usize) -> Json {
    if depth > UNBOX_DEPTH {
        return Json::String("<depth limit>".to_string());
    }
    match value {
        Value::CArray(array) => Json::Array(unbox_items(array, depth, max_cols)),
        Value::CStruct(structure) => {
            let mut out = Map::new();
            for field in &structure.fields {
                out.insert(field.name.clone(), unbox(&field.value, depth + 1, max_cols));
            }
            Json::Object(out)
        }
        Value::CScalar(scalar) => unbox(&scalar.value, depth, max_cols),
        Value::Unreadable(_) => Json::String(UNREADABLE.to_string()),
        other => other
            .scalar_json()
            .unwrap_or_else(|| Json::String(safe_repr(other, FIELD_REPR_LIMIT))),
    }
}

fn unbox_items(array: &CArray, depth: usize, max_cols: usize) -> Vec<Json> {
    let shown = array.items.len().min(max_cols);
    let mut values: Vec<Json> = array.items[..shown]
        .iter()
        .map(|item| unbox(item, depth + 1, max_cols))
        .collect();
    if array.items.len() > shown {
        values.push(more_marker(array.items.len() - shown));
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{CField, CScalar, Column, DataFrame, NdArray, RecordField};
    use serde_json::json;

    fn c_int(value: i64) -> Value {
        Value::CScalar(CScalar {
            ctype: "c_int".to_string(),
            value: Box::new(Value::Int(value)),
        })
    }

    fn c_array(count: i64) -> CArray {
        CArray {
            elem_ctype: "c_int".to_string(),
            items: (0..count).map(c_int).collect(),
        }
    }

    fn nested(depth: usize) -> Value {
        (0..depth).fold(c_int(1), |inner, level| {
            Value::CStruct(CStruct {
                name: format!("Level{level}"),
                fields: vec![CField {
                    name: "next".to_string(),
                    ctype: "Level".to_string(),
                    value: inner,
                }],
            })
        })
    }

    #[test]
    fn dataclass_fields_are_classified_one_level_deep() -> anyhow::Result<()> {
        let record = Record {
            class_name: "Sample".to_string(),
            fields: vec![
                RecordField {
                    name: "grid".to_string(),
                    type_name: "ndarray".to_string(),
                    value: Value::Array(NdArray::new("float64", vec![2], vec![Value::Float(1.0), Value::Float(2.0)])?),
                },
                RecordField {
                    name: "table".to_string(),
                    type_name: "DataFrame".to_string(),
                    value: Value::Frame(DataFrame::new(vec![Column::new("a", vec![Value::Int(1)])])),
                },
                RecordField {
                    name: "label".to_string(),
                    type_name: "str".to_string(),
                    value: Value::Str("x".repeat(200)),
                },
                RecordField {
                    name: "broken".to_string(),
                    type_name: "int".to_string(),
                    value: Value::Unreadable("property raised".to_string()),
                },
            ],
        };
        let payload = serde_json::to_value(dataclass_preview(&record))?;
        assert_eq!(payload["kind"], "dataclass");
        assert_eq!(payload["class_name"], "Sample");
        let fields = &payload["fields"];
        assert_eq!(
            fields[0],
            json!({"name": "grid", "type": "ndarray", "kind": "ndarray", "shape": [2], "dtype": "float64"})
        );
        assert_eq!(
            fields[1],
            json!({"name": "table", "type": "DataFrame", "kind": "dataframe", "shape": [1, 1]})
        );
        assert_eq!(fields[2]["kind"], "value");
        assert_eq!(fields[2]["repr"].as_str().map(|text| text.chars().count()), Some(123));
        assert_eq!(
            fields[3],
            json!({"name": "broken", "type": "int", "kind": "unknown", "value": "<unreadable>"})
        );
        Ok(())
    }

    #[test]
    fn struct_fields_unbox_arrays_with_sentinel() -> anyhow::Result<()> {
        let structure = CStruct {
            name: "Packet".to_string(),
            fields: vec![
                CField {
                    name: "id".to_string(),
                    ctype: "c_int".to_string(),
                    value: c_int(7),
                },
                CField {
                    name: "payload".to_string(),
                    ctype: "c_int_Array_5".to_string(),
                    value: Value::CArray(c_array(5)),
                },
                CField {
                    name: "flag".to_string(),
                    ctype: "c_bool".to_string(),
                    value: Value::Unreadable("bad read".to_string()),
                },
            ],
        };
        let payload = serde_json::to_value(struct_preview(&structure, &PreviewOptions::new(10, 3)))?;
        assert_eq!(payload["struct_name"], "Packet");
        assert_eq!(
            payload["fields"][0],
            json!({"name": "id", "ctype": "c_int", "kind": "scalar", "value": 7})
        );
        assert_eq!(
            payload["fields"][1],
            json!({
                "name": "payload",
                "ctype": "c_int_Array_5",
                "kind": "array",
                "length": 5,
                "elem_ctype": "c_int",
                "values": [0, 1, 2, "...(+2 more)"],
            })
        );
        assert_eq!(payload["fields"][2]["kind"], "unknown");
        Ok(())
    }

    #[test]
    fn deep_nesting_hits_depth_limit() {
        let value = unbox(&nested(8), 0, 20);
        let mut cursor = &value;
        let mut levels = 0;
        while let Some(next) = cursor.get("next") {
            cursor = next;
            levels += 1;
        }
        assert_eq!(levels, UNBOX_DEPTH + 1);
        assert_eq!(cursor, &json!("<depth limit>"));
    }

    #[test]
    fn struct_array_is_windowed_by_rows() -> anyhow::Result<()> {
        let options = PreviewOptions::new(3, 20).with_offsets(2, 0);
        let payload = serde_json::to_value(struct_array_preview(&c_array(10), &options))?;
        assert_eq!(
            payload,
            json!({
                "kind": "ctypes_array",
                "ctype": "c_int_Array_10",
                "length": 10,
                "values": [2, 3, 4, "...(+5 more)"],
            })
        );
        Ok(())
    }
}
