//! Dynamic value model for the target session.
//!
//! Values mirror what a foreign interpreter keeps in its namespaces: scalars,
//! containers, columnar frames, numeric arrays, fixed-layout records and
//! opaque objects. Lookups report failures with the interpreter's own wording
//! so that error strings surfaced to the driver read naturally.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde_json::{json, Value as Json};

pub type Namespace = BTreeMap<String, Value>;

#[derive(Clone, Debug, PartialEq)]
pub enum Key {
    Int(i64),
    Str(String),
}

impl Key {
    pub fn repr(&self) -> String {
        match self {
            Key::Int(index) => index.to_string(),
            Key::Str(text) => quote_str(text),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Dict(Vec<(Key, Value)>),
    Frame(DataFrame),
    Series(Series),
    Array(NdArray),
    Record(Record),
    CScalar(CScalar),
    CStruct(CStruct),
    CArray(CArray),
    Object(Object),
    Function(String),
    Class(String),
    Module(String),
    /// A value whose read (or repr) raises inside the target.
    Unreadable(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub dtype: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        let dtype = infer_dtype(&values).to_string();
        Self {
            name: name.into(),
            dtype,
            values,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataFrame {
    pub columns: Vec<Column>,
}

impl DataFrame {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn height(&self) -> usize {
        self.columns
            .iter()
            .map(|column| column.values.len())
            .max()
            .unwrap_or(0)
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn cell(&self, row: usize, col: usize) -> &Value {
        self.columns
            .get(col)
            .and_then(|column| column.values.get(row))
            .unwrap_or(&Value::None)
    }

    fn series(&self, column: &Column) -> Series {
        Series {
            name: column.name.clone(),
            dtype: column.dtype.clone(),
            values: column.values.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Series {
    pub name: String,
    pub dtype: String,
    pub values: Vec<Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NdArray {
    pub dtype: String,
    pub shape: Vec<usize>,
    /// Row-major scalar data.
    pub data: Vec<Value>,
}

impl NdArray {
    pub fn new(dtype: impl Into<String>, shape: Vec<usize>, data: Vec<Value>) -> anyhow::Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            anyhow::bail!(
                "cannot reshape array of size {} into shape {:?}",
                data.len(),
                shape
            );
        }
        Ok(Self {
            dtype: dtype.into(),
            shape,
            data,
        })
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    fn stride(&self) -> usize {
        self.shape.iter().skip(1).product()
    }

    /// Element `index` along the first axis: a scalar for 1-D arrays, a
    /// sub-array otherwise.
    pub fn along_first_axis(&self, index: usize) -> Value {
        let stride = self.stride();
        let start = index * stride;
        if self.ndim() <= 1 {
            return self.data.get(index).cloned().unwrap_or(Value::None);
        }
        Value::Array(NdArray {
            dtype: self.dtype.clone(),
            shape: self.shape[1..].to_vec(),
            data: self.data[start..start + stride].to_vec(),
        })
    }

    fn write_nested(&self, out: &mut String, dim: usize, offset: usize) -> Result<(), String> {
        out.push('[');
        let count = self.shape.get(dim).copied().unwrap_or(0);
        let stride: usize = self.shape.iter().skip(dim + 1).product();
        for index in 0..count {
            if index > 0 {
                out.push_str(", ");
            }
            if dim + 1 == self.shape.len() {
                self.data[offset + index].write_repr(out)?;
            } else {
                self.write_nested(out, dim + 1, offset + index * stride)?;
            }
        }
        out.push(']');
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordField {
    pub name: String,
    pub type_name: String,
    pub value: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub class_name: String,
    pub fields: Vec<RecordField>,
}

impl Record {
    pub fn field(&self, name: &str) -> Option<&RecordField> {
        self.fields.iter().find(|field| field.name == name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CScalar {
    pub ctype: String,
    pub value: Box<Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CField {
    pub name: String,
    pub ctype: String,
    pub value: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CStruct {
    pub name: String,
    pub fields: Vec<CField>,
}

impl CStruct {
    pub fn field(&self, name: &str) -> Option<&CField> {
        self.fields.iter().find(|field| field.name == name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CArray {
    pub elem_ctype: String,
    pub items: Vec<Value>,
}

impl CArray {
    pub fn type_name(&self) -> String {
        format!("{}_Array_{}", self.elem_ctype, self.items.len())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Object {
    pub class_name: String,
    pub attrs: Vec<(String, Value)>,
    pub repr: Option<String>,
}

pub fn infer_dtype(values: &[Value]) -> &'static str {
    let mut saw_float = false;
    let mut saw_missing = false;
    let mut saw_int = false;
    let mut saw_bool = false;
    for value in values {
        match value {
            Value::Int(_) => saw_int = true,
            Value::Float(_) => saw_float = true,
            Value::None => saw_missing = true,
            Value::Bool(_) => saw_bool = true,
            _ => return "object",
        }
    }
    match (saw_bool, saw_int || saw_float || saw_missing) {
        (true, true) => "object",
        (true, false) => "bool",
        _ if saw_float || saw_missing => "float64",
        _ => "int64",
    }
}

fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let resolved = if index < 0 { index + len } else { index };
    if resolved < 0 || resolved >= len {
        None
    } else {
        Some(resolved as usize)
    }
}

impl Value {
    pub fn type_name(&self) -> Cow<'_, str> {
        match self {
            Value::None => Cow::Borrowed("NoneType"),
            Value::Bool(_) => Cow::Borrowed("bool"),
            Value::Int(_) => Cow::Borrowed("int"),
            Value::Float(_) => Cow::Borrowed("float"),
            Value::Str(_) => Cow::Borrowed("str"),
            Value::Bytes(_) => Cow::Borrowed("bytes"),
            Value::List(_) => Cow::Borrowed("list"),
            Value::Tuple(_) => Cow::Borrowed("tuple"),
            Value::Dict(_) => Cow::Borrowed("dict"),
            Value::Frame(_) => Cow::Borrowed("DataFrame"),
            Value::Series(_) => Cow::Borrowed("Series"),
            Value::Array(_) => Cow::Borrowed("ndarray"),
            Value::Record(record) => Cow::Borrowed(record.class_name.as_str()),
            Value::CScalar(scalar) => Cow::Borrowed(scalar.ctype.as_str()),
            Value::CStruct(structure) => Cow::Borrowed(structure.name.as_str()),
            Value::CArray(array) => Cow::Owned(array.type_name()),
            Value::Object(object) => Cow::Borrowed(object.class_name.as_str()),
            Value::Function(_) => Cow::Borrowed("function"),
            Value::Class(_) => Cow::Borrowed("type"),
            Value::Module(_) => Cow::Borrowed("module"),
            Value::Unreadable(_) => Cow::Borrowed("object"),
        }
    }

    /// Functions, classes and modules are not variables.
    pub fn is_callable_like(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Class(_) | Value::Module(_))
    }

    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Str(text) => Some(text.chars().count()),
            Value::Bytes(bytes) => Some(bytes.len()),
            Value::List(items) | Value::Tuple(items) => Some(items.len()),
            Value::Dict(entries) => Some(entries.len()),
            Value::Frame(frame) => Some(frame.height()),
            Value::Series(series) => Some(series.values.len()),
            Value::Array(array) => array.shape.first().copied(),
            Value::CArray(array) => Some(array.items.len()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// JSON form for scalars; `None` for anything that is not a plain
    /// number, boolean, string or null. Non-finite floats become null.
    pub fn scalar_json(&self) -> Option<Json> {
        match self {
            Value::None => Some(Json::Null),
            Value::Bool(flag) => Some(Json::Bool(*flag)),
            Value::Int(number) => Some(json!(number)),
            Value::Float(number) => Some(
                serde_json::Number::from_f64(*number)
                    .map(Json::Number)
                    .unwrap_or(Json::Null),
            ),
            Value::Str(text) => Some(Json::String(text.clone())),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        match self {
            Value::None => true,
            Value::Float(number) => number.is_nan(),
            _ => false,
        }
    }

    pub fn attr(&self, name: &str) -> Result<Cow<'_, Value>, String> {
        let found: Option<Cow<'_, Value>> = match self {
            Value::Record(record) => record.field(name).map(|field| Cow::Borrowed(&field.value)),
            Value::CStruct(structure) => structure
                .field(name)
                .map(|field| Cow::Borrowed(&field.value)),
            Value::CScalar(scalar) if name == "value" => Some(Cow::Borrowed(scalar.value.as_ref())),
            Value::Object(object) => object
                .attrs
                .iter()
                .find(|(attr, _)| attr == name)
                .map(|(_, value)| Cow::Borrowed(value)),
            Value::Frame(frame) => match name {
                "shape" => Some(Cow::Owned(Value::Tuple(vec![
                    Value::Int(frame.height() as i64),
                    Value::Int(frame.width() as i64),
                ]))),
                "columns" => Some(Cow::Owned(Value::List(
                    frame
                        .columns
                        .iter()
                        .map(|column| Value::Str(column.name.clone()))
                        .collect(),
                ))),
                _ => frame
                    .column(name)
                    .map(|column| Cow::Owned(Value::Series(frame.series(column)))),
            },
            Value::Series(series) => match name {
                "name" => Some(Cow::Owned(Value::Str(series.name.clone()))),
                "dtype" => Some(Cow::Owned(Value::Str(series.dtype.clone()))),
                "shape" => Some(Cow::Owned(Value::Tuple(vec![Value::Int(
                    series.values.len() as i64,
                )]))),
                _ => None,
            },
            Value::Array(array) => match name {
                "shape" => Some(Cow::Owned(Value::Tuple(
                    array.shape.iter().map(|dim| Value::Int(*dim as i64)).collect(),
                ))),
                "dtype" => Some(Cow::Owned(Value::Str(array.dtype.clone()))),
                "ndim" => Some(Cow::Owned(Value::Int(array.ndim() as i64))),
                "size" => Some(Cow::Owned(Value::Int(array.data.len() as i64))),
                _ => None,
            },
            _ => None,
        };
        if let Some(Value::Unreadable(message)) = found.as_deref() {
            return Err(message.clone());
        }
        found.ok_or_else(|| {
            format!(
                "'{}' object has no attribute '{}'",
                self.type_name(),
                name
            )
        })
    }

    pub fn item(&self, key: &Key) -> Result<Cow<'_, Value>, String> {
        let found = match (self, key) {
            (Value::List(items), Key::Int(index)) => normalize_index(*index, items.len())
                .map(|at| Cow::Borrowed(&items[at]))
                .ok_or_else(|| "list index out of range".to_string()),
            (Value::List(_), Key::Str(_)) => {
                Err("list indices must be integers or slices, not str".to_string())
            }
            (Value::Tuple(items), Key::Int(index)) => normalize_index(*index, items.len())
                .map(|at| Cow::Borrowed(&items[at]))
                .ok_or_else(|| "tuple index out of range".to_string()),
            (Value::Tuple(_), Key::Str(_)) => {
                Err("tuple indices must be integers or slices, not str".to_string())
            }
            (Value::Str(text), Key::Int(index)) => {
                let count = text.chars().count();
                normalize_index(*index, count)
                    .and_then(|at| text.chars().nth(at))
                    .map(|ch| Cow::Owned(Value::Str(ch.to_string())))
                    .ok_or_else(|| "string index out of range".to_string())
            }
            (Value::Str(_), Key::Str(_)) => {
                Err("string indices must be integers, not 'str'".to_string())
            }
            (Value::Bytes(bytes), Key::Int(index)) => normalize_index(*index, bytes.len())
                .map(|at| Cow::Owned(Value::Int(bytes[at] as i64)))
                .ok_or_else(|| "index out of range".to_string()),
            (Value::Dict(entries), key) => entries
                .iter()
                .find(|(candidate, _)| candidate == key)
                .map(|(_, value)| Cow::Borrowed(value))
                .ok_or_else(|| key.repr()),
            (Value::Frame(frame), Key::Str(name)) => frame
                .column(name)
                .map(|column| Cow::Owned(Value::Series(frame.series(column))))
                .ok_or_else(|| key.repr()),
            (Value::Frame(_), Key::Int(index)) => Err(index.to_string()),
            (Value::Series(series), Key::Int(index)) => usize::try_from(*index)
                .ok()
                .and_then(|at| series.values.get(at))
                .map(Cow::Borrowed)
                .ok_or_else(|| index.to_string()),
            (Value::Series(_), Key::Str(_)) => Err(key.repr()),
            (Value::Array(array), Key::Int(index)) => {
                let size = array.shape.first().copied().unwrap_or(0);
                normalize_index(*index, size)
                    .map(|at| Cow::Owned(array.along_first_axis(at)))
                    .ok_or_else(|| {
                        format!("index {index} is out of bounds for axis 0 with size {size}")
                    })
            }
            (Value::Array(_), Key::Str(_)) => Err(
                "only integers, slices (`:`), ellipsis (`...`), numpy.newaxis (`None`) and integer or boolean arrays are valid indices"
                    .to_string(),
            ),
            (Value::CArray(array), Key::Int(index)) => normalize_index(*index, array.items.len())
                .map(|at| Cow::Borrowed(&array.items[at]))
                .ok_or_else(|| "invalid index".to_string()),
            (Value::CArray(_), Key::Str(_)) => Err("indices must be integers".to_string()),
            _ => Err(format!("'{}' object is not subscriptable", self.type_name())),
        }?;
        if let Value::Unreadable(message) = &*found {
            return Err(message.clone());
        }
        Ok(found)
    }

    /// Interpreter-style representation. Fails when any part of the value
    /// cannot be rendered.
    pub fn repr(&self) -> Result<String, String> {
        let mut out = String::new();
        self.write_repr(&mut out)?;
        Ok(out)
    }

    /// `str()` rendering: strings are unquoted, everything else uses repr.
    pub fn display(&self) -> Result<String, String> {
        match self {
            Value::Str(text) => Ok(text.clone()),
            other => other.repr(),
        }
    }

    fn write_repr(&self, out: &mut String) -> Result<(), String> {
        match self {
            Value::None => out.push_str("None"),
            Value::Bool(true) => out.push_str("True"),
            Value::Bool(false) => out.push_str("False"),
            Value::Int(number) => out.push_str(&number.to_string()),
            Value::Float(number) => out.push_str(&float_repr(*number)),
            Value::Str(text) => out.push_str(&quote_str(text)),
            Value::Bytes(bytes) => out.push_str(&bytes_repr(bytes)),
            Value::List(items) => write_sequence(out, items, '[', ']', false)?,
            Value::Tuple(items) => write_sequence(out, items, '(', ')', items.len() == 1)?,
            Value::Dict(entries) => {
                out.push('{');
                for (index, (key, value)) in entries.iter().enumerate() {
                    if index > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(&key.repr());
                    out.push_str(": ");
                    value.write_repr(out)?;
                }
                out.push('}');
            }
            Value::Frame(frame) => out.push_str(&frame_repr(frame)?),
            Value::Series(series) => out.push_str(&series_repr(series)?),
            Value::Array(array) => {
                out.push_str("array(");
                if array.ndim() == 0 {
                    match array.data.first() {
                        Some(value) => value.write_repr(out)?,
                        None => out.push_str("[]"),
                    }
                } else {
                    array.write_nested(out, 0, 0)?;
                }
                out.push(')');
            }
            Value::Record(record) => {
                out.push_str(&record.class_name);
                out.push('(');
                for (index, field) in record.fields.iter().enumerate() {
                    if index > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(&field.name);
                    out.push('=');
                    field.value.write_repr(out)?;
                }
                out.push(')');
            }
            Value::CScalar(scalar) => {
                out.push_str(&scalar.ctype);
                out.push('(');
                scalar.value.write_repr(out)?;
                out.push(')');
            }
            Value::CStruct(structure) => out.push_str(&format!("<{} object>", structure.name)),
            Value::CArray(array) => out.push_str(&format!("<{} object>", array.type_name())),
            Value::Object(object) => match &object.repr {
                Some(text) => out.push_str(text),
                None => out.push_str(&format!("<{} object>", object.class_name)),
            },
            Value::Function(name) => out.push_str(&format!("<function {name}>")),
            Value::Class(name) => out.push_str(&format!("<class '{name}'>")),
            Value::Module(name) => out.push_str(&format!("<module '{name}'>")),
            Value::Unreadable(message) => return Err(message.clone()),
        }
        Ok(())
    }
}

fn write_sequence(
    out: &mut String,
    items: &[Value],
    open: char,
    close: char,
    trailing_comma: bool,
) -> Result<(), String> {
    out.push(open);
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            out.push_str(", ");
        }
        item.write_repr(out)?;
    }
    if trailing_comma {
        out.push(',');
    }
    out.push(close);
    Ok(())
}

pub fn float_repr(number: f64) -> String {
    if number.is_nan() {
        "nan".to_string()
    } else if number.is_infinite() {
        let text = if number > 0.0 { "inf" } else { "-inf" };
        text.to_string()
    } else if number.fract() == 0.0 && number.abs() < 1e16 {
        format!("{number:.1}")
    } else {
        format!("{number}")
    }
}

pub fn quote_str(text: &str) -> String {
    let quote = if text.contains('\'') && !text.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(text.len() + 2);
    out.push(quote);
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

fn bytes_repr(bytes: &[u8]) -> String {
    let mut out = String::from("b'");
    for byte in bytes {
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'\'' => out.push_str("\\'"),
            b'\n' => out.push_str("\\n"),
            0x20..=0x7e => out.push(*byte as char),
            other => out.push_str(&format!("\\x{other:02x}")),
        }
    }
    out.push('\'');
    out
}

fn frame_repr(frame: &DataFrame) -> Result<String, String> {
    let height = frame.height();
    let index_width = height.saturating_sub(1).to_string().len();
    let mut cells: Vec<Vec<String>> = Vec::with_capacity(frame.width());
    for column in &frame.columns {
        let mut rendered = vec![column.name.clone()];
        for row in 0..height {
            let value = column.values.get(row).unwrap_or(&Value::None);
            rendered.push(if value.is_missing() {
                "NaN".to_string()
            } else {
                value.display()?
            });
        }
        cells.push(rendered);
    }
    let widths: Vec<usize> = cells
        .iter()
        .map(|column| column.iter().map(|cell| cell.chars().count()).max().unwrap_or(0))
        .collect();
    let mut lines = Vec::with_capacity(height + 1);
    for row in 0..=height {
        let mut line = if row == 0 {
            " ".repeat(index_width)
        } else {
            format!("{:<index_width$}", row - 1)
        };
        for (column, width) in cells.iter().zip(&widths) {
            line.push_str(&format!("  {:>width$}", column[row], width = *width));
        }
        lines.push(line);
    }
    Ok(lines.join("\n"))
}

fn series_repr(series: &Series) -> Result<String, String> {
    let mut lines = Vec::with_capacity(series.values.len() + 1);
    for (index, value) in series.values.iter().enumerate() {
        let text = if value.is_missing() {
            "NaN".to_string()
        } else {
            value.display()?
        };
        lines.push(format!("{index}    {text}"));
    }
    lines.push(format!("Name: {}, dtype: {}", series.name, series.dtype));
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point() -> Value {
        Value::Record(Record {
            class_name: "Point".to_string(),
            fields: vec![
                RecordField {
                    name: "x".to_string(),
                    type_name: "int".to_string(),
                    value: Value::Int(1),
                },
                RecordField {
                    name: "y".to_string(),
                    type_name: "float".to_string(),
                    value: Value::Float(2.5),
                },
            ],
        })
    }

    #[test]
    fn repr_follows_interpreter_conventions() {
        let value = Value::List(vec![
            Value::Int(1),
            Value::Float(2.0),
            Value::Str("it's".to_string()),
            Value::None,
            Value::Bool(true),
            Value::Tuple(vec![Value::Int(7)]),
        ]);
        assert_eq!(value.repr().unwrap(), "[1, 2.0, \"it's\", None, True, (7,)]");
        assert_eq!(point().repr().unwrap(), "Point(x=1, y=2.5)");
    }

    #[test]
    fn unreadable_parts_fail_repr() {
        let value = Value::List(vec![Value::Int(1), Value::Unreadable("boom".to_string())]);
        assert_eq!(value.repr().unwrap_err(), "boom");
    }

    #[test]
    fn attribute_errors_use_native_wording() {
        let err = Value::Int(5).attr("real_part").unwrap_err();
        assert_eq!(err, "'int' object has no attribute 'real_part'");
        assert_eq!(point().attr("x").unwrap().into_owned(), Value::Int(1));
    }

    #[test]
    fn indexing_supports_negative_positions() {
        let list = Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(list.item(&Key::Int(-1)).unwrap().into_owned(), Value::Int(3));
        assert_eq!(list.item(&Key::Int(3)).unwrap_err(), "list index out of range");
    }

    #[test]
    fn dict_missing_key_reports_key_repr() {
        let dict = Value::Dict(vec![(Key::Str("a".to_string()), Value::Int(1))]);
        assert_eq!(dict.item(&Key::Str("b".to_string())).unwrap_err(), "'b'");
    }

    #[test]
    fn array_first_axis_yields_rows() -> anyhow::Result<()> {
        let array = NdArray::new(
            "int64",
            vec![2, 2],
            vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)],
        )?;
        let row = Value::Array(array.clone()).item(&Key::Int(1)).unwrap().into_owned();
        assert_eq!(row.repr().unwrap(), "array([3, 4])");
        assert_eq!(Value::Array(array).repr().unwrap(), "array([[1, 2], [3, 4]])");
        Ok(())
    }

    #[test]
    fn dtype_inference_matches_columnar_rules() {
        assert_eq!(infer_dtype(&[Value::Int(1), Value::Int(2)]), "int64");
        assert_eq!(infer_dtype(&[Value::Int(1), Value::None]), "float64");
        assert_eq!(infer_dtype(&[Value::Bool(true)]), "bool");
        assert_eq!(infer_dtype(&[Value::Str("a".to_string())]), "object");
    }
}
