use serde_json::Value as Json;

use super::{safe_repr, PreviewKind, PreviewOptions, REPR_LIMIT};
use crate::value::{DataFrame, NdArray, Value};

pub(super) fn frame_preview(frame: &DataFrame, options: &PreviewOptions) -> PreviewKind {
    let rows = options.rows(frame.height());
    let cols = options.cols(frame.width());
    let columns = frame.columns[cols.clone()]
        .iter()
        .map(|column| column.name.clone())
        .collect();
    let rows = rows
        .map(|row| cols.clone().map(|col| cell_json(frame.cell(row, col))).collect())
        .collect();
    PreviewKind::Dataframe {
        shape: [frame.height(), frame.width()],
        columns,
        rows,
        row_offset: options.row_offset,
        col_offset: options.col_offset,
    }
}

/// Numbers and booleans pass through, missing values become null and
/// everything else is stringified.
fn cell_json(value: &Value) -> Json {
    if value.is_missing() {
        return Json::Null;
    }
    match value {
        Value::Bool(_) | Value::Int(_) | Value::Float(_) => value.scalar_json().unwrap_or(Json::Null),
        other => Json::String(
            other
                .display()
                .unwrap_or_else(|_| "<unrepr>".to_string()),
        ),
    }
}

pub(super) fn array_preview(array: &NdArray, options: &PreviewOptions) -> PreviewKind {
    let mut values1d = None;
    let mut rows = None;
    let mut repr = None;
    match array.shape.as_slice() {
        [len] => {
            values1d = Some(array.data[options.rows(*len)].iter().map(element).collect());
        }
        [height, width] => {
            let cols = options.cols(*width);
            rows = Some(
                options
                    .rows(*height)
                    .map(|row| {
                        array.data[row * width + cols.start..row * width + cols.end]
                            .iter()
                            .map(element)
                            .collect()
                    })
                    .collect(),
            );
        }
        _ => repr = Some(safe_repr(&Value::Array(array.clone()), REPR_LIMIT)),
    }
    PreviewKind::Ndarray {
        dtype: array.dtype.clone(),
        shape: array.shape.clone(),
        values1d,
        rows,
        repr,
    }
}

fn element(value: &Value) -> Json {
    value
        .scalar_json()
        .unwrap_or_else(|| Json::String(value.display().unwrap_or_else(|_| "<unrepr>".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Column;
    use serde_json::json;

    fn frame() -> DataFrame {
        DataFrame::new(vec![
            Column::new("a", vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
            Column::new(
                "b",
                vec![Value::Float(0.5), Value::Float(f64::NAN), Value::None],
            ),
            Column::new(
                "c",
                vec![
                    Value::Str("x".to_string()),
                    Value::Bool(true),
                    Value::Tuple(vec![Value::Int(1)]),
                ],
            ),
        ])
    }

    #[test]
    fn frame_cells_are_converted() -> anyhow::Result<()> {
        let preview = frame_preview(&frame(), &PreviewOptions::new(10, 10));
        let payload = serde_json::to_value(&preview)?;
        assert_eq!(payload["kind"], "dataframe");
        assert_eq!(payload["shape"], json!([3, 3]));
        assert_eq!(payload["columns"], json!(["a", "b", "c"]));
        assert_eq!(
            payload["rows"],
            json!([[1, 0.5, "x"], [2, null, true], [3, null, "(1,)"]])
        );
        Ok(())
    }

    #[test]
    fn frame_window_clips_rows_and_columns() -> anyhow::Result<()> {
        let options = PreviewOptions::new(1, 2).with_offsets(1, 1);
        let payload = serde_json::to_value(frame_preview(&frame(), &options))?;
        assert_eq!(payload["shape"], json!([3, 3]));
        assert_eq!(payload["columns"], json!(["b", "c"]));
        assert_eq!(payload["rows"], json!([[null, true]]));
        assert_eq!(payload["row_offset"], 1);
        assert_eq!(payload["col_offset"], 1);
        Ok(())
    }

    #[test]
    fn offsets_past_the_end_give_empty_windows() -> anyhow::Result<()> {
        let options = PreviewOptions::new(5, 5).with_offsets(10, 10);
        let payload = serde_json::to_value(frame_preview(&frame(), &options))?;
        assert_eq!(payload["columns"], json!([]));
        assert_eq!(payload["rows"], json!([]));
        Ok(())
    }

    #[test]
    fn array_previews_follow_dimensionality() -> anyhow::Result<()> {
        let flat = NdArray::new("int64", vec![4], (0..4).map(Value::Int).collect())?;
        let payload = serde_json::to_value(array_preview(&flat, &PreviewOptions::new(2, 2)))?;
        assert_eq!(payload["values1d"], json!([0, 1]));
        assert!(payload.get("rows").is_none());

        let grid = NdArray::new("int64", vec![3, 3], (0..9).map(Value::Int).collect())?;
        let options = PreviewOptions::new(2, 2).with_offsets(1, 1);
        let payload = serde_json::to_value(array_preview(&grid, &options))?;
        assert_eq!(payload["shape"], json!([3, 3]));
        assert_eq!(payload["rows"], json!([[4, 5], [7, 8]]));

        let cube = NdArray::new("int64", vec![2, 1, 2], (0..4).map(Value::Int).collect())?;
        let payload = serde_json::to_value(array_preview(&cube, &PreviewOptions::new(2, 2)))?;
        assert_eq!(payload["repr"], "array([[[0, 1]], [[2, 3]]])");
        Ok(())
    }
}
