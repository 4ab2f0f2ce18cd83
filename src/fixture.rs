//! Namespace fixtures: a JSON or YAML mapping of variable names to values.
//! Plain data maps onto scalars, lists and dicts; mappings carrying a
//! `$type` key build the richer runtime values.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use serde_yaml::{Mapping, Value as Yaml};

use crate::value::{
    infer_dtype, CArray, CField, CScalar, CStruct, Column, DataFrame, Key, Namespace, NdArray, Object,
    Record, RecordField, Series, Value,
};

const TYPE_KEY: &str = "$type";

pub fn load_namespace(path: &Path) -> Result<Namespace> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("unable to read namespace fixture: {}", path.display()))?;
    let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
    parse_namespace(&text, &base)
        .with_context(|| format!("invalid namespace fixture: {}", path.display()))
}

/// Parses fixture text; JSON is read through the YAML parser so key order
/// is kept. Relative `csv` paths resolve against `base`.
pub fn parse_namespace(text: &str, base: &Path) -> Result<Namespace> {
    let document: Yaml = serde_yaml::from_str(text)?;
    let Yaml::Mapping(entries) = document else {
        bail!("fixture root must be a mapping");
    };
    let loader = Loader {
        base: base.to_path_buf(),
    };
    let mut namespace = Namespace::new();
    for (name, raw) in &entries {
        let name = name
            .as_str()
            .ok_or_else(|| anyhow!("variable names must be strings"))?;
        let value = loader
            .value(raw)
            .with_context(|| format!("variable '{name}'"))?;
        namespace.insert(name.to_string(), value);
    }
    log::debug!("fixture loaded variables={}", namespace.len());
    Ok(namespace)
}

struct Loader {
    base: PathBuf,
}

impl Loader {
    fn value(&self, raw: &Yaml) -> Result<Value> {
        Ok(match raw {
            Yaml::Null => Value::None,
            Yaml::Bool(flag) => Value::Bool(*flag),
            Yaml::Number(number) => match number.as_i64() {
                Some(int) => Value::Int(int),
                None => Value::Float(number.as_f64().unwrap_or(f64::NAN)),
            },
            Yaml::String(text) => Value::Str(text.clone()),
            Yaml::Sequence(items) => Value::List(self.values(items)?),
            Yaml::Mapping(entries) => match entries.get(TYPE_KEY) {
                Some(tag) => {
                    let tag = tag
                        .as_str()
                        .ok_or_else(|| anyhow!("{TYPE_KEY} must be a string"))?;
                    self.tagged(tag, entries)
                        .with_context(|| format!("{TYPE_KEY} {tag}"))?
                }
                None => Value::Dict(self.dict(entries)?),
            },
            Yaml::Tagged(tagged) => bail!("unsupported YAML tag {}", tagged.tag),
        })
    }

    fn values(&self, items: &[Yaml]) -> Result<Vec<Value>> {
        items.iter().map(|item| self.value(item)).collect()
    }

    fn dict(&self, entries: &Mapping) -> Result<Vec<(Key, Value)>> {
        entries
            .iter()
            .map(|(key, value)| {
                let key = match key {
                    Yaml::String(text) => Key::Str(text.clone()),
                    Yaml::Number(number) => Key::Int(
                        number
                            .as_i64()
                            .ok_or_else(|| anyhow!("dict keys must be strings or integers"))?,
                    ),
                    _ => bail!("dict keys must be strings or integers"),
                };
                Ok((key, self.value(value)?))
            })
            .collect()
    }

    fn tagged(&self, tag: &str, entries: &Mapping) -> Result<Value> {
        let field = |key: &str| entries.get(key);
        let text = |key: &str| -> Result<String> {
            field(key)
                .and_then(Yaml::as_str)
                .map(str::to_string)
                .ok_or_else(|| anyhow!("missing string field '{key}'"))
        };
        Ok(match tag {
            "tuple" => Value::Tuple(self.values(sequence(field("items"))?)?),
            "bytes" => Value::Bytes(text("value")?.into_bytes()),
            "float" => Value::Float(special_float(field("value"))?),
            "dataframe" => Value::Frame(self.frame(entries)?),
            "series" => {
                let values = self.values(sequence(field("values"))?)?;
                let name = text("name").unwrap_or_default();
                Value::Series(Series {
                    dtype: infer_dtype(&values).to_string(),
                    name,
                    values,
                })
            }
            "ndarray" => Value::Array(self.array(entries)?),
            "dataclass" => Value::Record(self.record(text("class_name")?, field("fields"))?),
            "struct" => Value::CStruct(self.structure(entries)?),
            "cscalar" => {
                let value = self.value(field("value").unwrap_or(&Yaml::Null))?;
                Value::CScalar(CScalar {
                    ctype: text("ctype").unwrap_or_else(|_| default_ctype(&value).to_string()),
                    value: Box::new(value),
                })
            }
            "carray" => Value::CArray(self.carray(entries)?),
            "object" => {
                let attrs = match field("attrs") {
                    Some(Yaml::Mapping(attrs)) => self
                        .dict(attrs)?
                        .into_iter()
                        .map(|(key, value)| match key {
                            Key::Str(name) => (name, value),
                            Key::Int(index) => (index.to_string(), value),
                        })
                        .collect(),
                    _ => Vec::new(),
                };
                Value::Object(Object {
                    class_name: text("class_name")?,
                    attrs,
                    repr: text("repr").ok(),
                })
            }
            "function" => Value::Function(text("name")?),
            "class" => Value::Class(text("name")?),
            "module" => Value::Module(text("name")?),
            "unreadable" => {
                Value::Unreadable(text("message").unwrap_or_else(|_| "unreadable".to_string()))
            }
            other => bail!("unknown value type '{other}'"),
        })
    }

    fn frame(&self, entries: &Mapping) -> Result<DataFrame> {
        if let Some(columns) = entries.get("columns") {
            let columns = match columns {
                Yaml::Mapping(columns) => columns
                    .iter()
                    .map(|(name, values)| {
                        let name = name
                            .as_str()
                            .ok_or_else(|| anyhow!("column names must be strings"))?;
                        Ok(Column::new(name, self.values(sequence(Some(values))?)?))
                    })
                    .collect::<Result<Vec<_>>>()?,
                Yaml::Sequence(columns) => columns
                    .iter()
                    .map(|column| {
                        let name = column
                            .get("name")
                            .and_then(Yaml::as_str)
                            .ok_or_else(|| anyhow!("column entries need a name"))?;
                        Ok(Column::new(name, self.values(sequence(column.get("values"))?)?))
                    })
                    .collect::<Result<Vec<_>>>()?,
                _ => bail!("columns must be a mapping or a list"),
            };
            return Ok(DataFrame::new(columns));
        }
        if let Some(inline) = entries.get("csv_text").and_then(Yaml::as_str) {
            return frame_from_csv(inline.as_bytes());
        }
        if let Some(relative) = entries.get("csv").and_then(Yaml::as_str) {
            let path = self.base.join(relative);
            let data = fs::read(&path)
                .with_context(|| format!("unable to read csv file: {}", path.display()))?;
            return frame_from_csv(&data);
        }
        bail!("dataframe needs columns, csv or csv_text")
    }

    fn array(&self, entries: &Mapping) -> Result<NdArray> {
        let data = entries
            .get("data")
            .ok_or_else(|| anyhow!("ndarray needs data"))?;
        let mut shape = Vec::new();
        let mut probe = data;
        while let Yaml::Sequence(items) = probe {
            shape.push(items.len());
            match items.first() {
                Some(first) => probe = first,
                None => break,
            }
        }
        let mut flat = Vec::new();
        self.flatten(data, &shape, &mut flat)?;
        let dtype = match entries.get("dtype").and_then(Yaml::as_str) {
            Some(dtype) => dtype.to_string(),
            None => infer_dtype(&flat).to_string(),
        };
        NdArray::new(dtype, shape, flat)
    }

    fn flatten(&self, raw: &Yaml, shape: &[usize], out: &mut Vec<Value>) -> Result<()> {
        match (raw, shape.split_first()) {
            (Yaml::Sequence(items), Some((len, rest))) => {
                if items.len() != *len {
                    bail!("ndarray data is not rectangular");
                }
                for item in items {
                    self.flatten(item, rest, out)?;
                }
                Ok(())
            }
            (Yaml::Sequence(_), None) => bail!("ndarray data is not rectangular"),
            (scalar, None) => {
                out.push(self.value(scalar)?);
                Ok(())
            }
            (_, Some(_)) => bail!("ndarray data is not rectangular"),
        }
    }

    fn record(&self, class_name: String, fields: Option<&Yaml>) -> Result<Record> {
        let fields = match fields {
            Some(Yaml::Mapping(fields)) => fields
                .iter()
                .map(|(name, raw)| {
                    let name = name
                        .as_str()
                        .ok_or_else(|| anyhow!("field names must be strings"))?;
                    let value = self.value(raw)?;
                    Ok(RecordField {
                        name: name.to_string(),
                        type_name: value.type_name().into_owned(),
                        value,
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            Some(Yaml::Sequence(fields)) => fields
                .iter()
                .map(|entry| {
                    let name = entry
                        .get("name")
                        .and_then(Yaml::as_str)
                        .ok_or_else(|| anyhow!("record fields need a name"))?;
                    let value = self.value(entry.get("value").unwrap_or(&Yaml::Null))?;
                    let type_name = entry
                        .get("type")
                        .and_then(Yaml::as_str)
                        .map_or_else(|| value.type_name().into_owned(), str::to_string);
                    Ok(RecordField {
                        name: name.to_string(),
                        type_name,
                        value,
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
            Some(_) => bail!("fields must be a mapping or a list"),
        };
        Ok(Record { class_name, fields })
    }

    fn structure(&self, entries: &Mapping) -> Result<CStruct> {
        let name = entries
            .get("name")
            .and_then(Yaml::as_str)
            .ok_or_else(|| anyhow!("struct needs a name"))?;
        let fields = sequence(entries.get("fields"))?
            .iter()
            .map(|entry| {
                let name = entry
                    .get("name")
                    .and_then(Yaml::as_str)
                    .ok_or_else(|| anyhow!("struct fields need a name"))?;
                let value = self.value(entry.get("value").unwrap_or(&Yaml::Null))?;
                let ctype = entry
                    .get("ctype")
                    .and_then(Yaml::as_str)
                    .map_or_else(|| default_ctype(&value).to_string(), str::to_string);
                Ok(CField {
                    name: name.to_string(),
                    ctype,
                    value,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(CStruct {
            name: name.to_string(),
            fields,
        })
    }

    fn carray(&self, entries: &Mapping) -> Result<CArray> {
        let elem_ctype = entries
            .get("elem_ctype")
            .and_then(Yaml::as_str)
            .ok_or_else(|| anyhow!("carray needs elem_ctype"))?
            .to_string();
        let items = sequence(entries.get("items"))?
            .iter()
            .map(|item| {
                let value = self.value(item)?;
                Ok(match value {
                    Value::CStruct(_) | Value::CArray(_) | Value::CScalar(_) => value,
                    scalar => Value::CScalar(CScalar {
                        ctype: elem_ctype.clone(),
                        value: Box::new(scalar),
                    }),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(CArray { elem_ctype, items })
    }
}

fn sequence(raw: Option<&Yaml>) -> Result<&[Yaml]> {
    match raw {
        Some(Yaml::Sequence(items)) => Ok(items.as_slice()),
        None | Some(Yaml::Null) => Ok(&[]),
        Some(_) => bail!("expected a list"),
    }
}

fn special_float(raw: Option<&Yaml>) -> Result<f64> {
    match raw {
        Some(Yaml::Number(number)) => number
            .as_f64()
            .ok_or_else(|| anyhow!("invalid float")),
        Some(Yaml::String(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "nan" => Ok(f64::NAN),
            "inf" | "+inf" | "infinity" => Ok(f64::INFINITY),
            "-inf" | "-infinity" => Ok(f64::NEG_INFINITY),
            other => other
                .parse()
                .map_err(|err| anyhow!("invalid float '{other}': {err}")),
        },
        _ => bail!("float needs a value"),
    }
}

fn default_ctype(value: &Value) -> &'static str {
    match value {
        Value::Bool(_) => "c_bool",
        Value::Int(_) => "c_int",
        Value::Float(_) => "c_double",
        Value::Str(_) => "c_char_p",
        _ => "c_void_p",
    }
}

fn frame_from_csv(data: &[u8]) -> Result<DataFrame> {
    let mut reader = csv::ReaderBuilder::new().from_reader(data);
    let headers: Vec<String> = reader
        .headers()
        .context("csv header row missing")?
        .iter()
        .map(str::to_string)
        .collect();
    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("csv record {}", line + 1))?;
        for (index, column) in columns.iter_mut().enumerate() {
            column.push(csv_cell(record.get(index).unwrap_or("")));
        }
    }
    Ok(DataFrame::new(
        headers
            .into_iter()
            .zip(columns)
            .map(|(name, values)| Column::new(name, promote_ints(values)))
            .collect(),
    ))
}

/// A column mixing ints with floats or blanks reads as all floats.
fn promote_ints(values: Vec<Value>) -> Vec<Value> {
    if infer_dtype(&values) != "float64" {
        return values;
    }
    values
        .into_iter()
        .map(|value| match value {
            Value::Int(int) => Value::Float(int as f64),
            other => other,
        })
        .collect()
}

fn csv_cell(raw: &str) -> Value {
    let raw = raw.trim();
    if raw.is_empty() {
        return Value::None;
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Value::Int(int);
    }
    if let Ok(float) = raw.parse::<f64>() {
        return Value::Float(float);
    }
    match raw {
        "True" | "true" => Value::Bool(true),
        "False" | "false" => Value::Bool(false),
        _ => Value::Str(raw.to_string()),
    }
}
