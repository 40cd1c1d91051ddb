use crate::csv::{CsvOptions, parse_records};
use crate::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Flow records: one row per entity, one column per stage.
///
/// Each row carries a weight (1 for plain records) that becomes ribbon width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFlowTable")]
pub struct FlowTable {
    rows: Vec<Vec<String>>,
    weights: Vec<f64>,
}

/// Unchecked serde form; deserialisation goes through the same validation as the constructors.
#[derive(Deserialize)]
struct RawFlowTable {
    rows: Vec<Vec<String>>,
    #[serde(default)]
    weights: Option<Vec<f64>>,
}

impl TryFrom<RawFlowTable> for FlowTable {
    type Error = Error;

    fn try_from(raw: RawFlowTable) -> Result<Self> {
        let weights = raw.weights.unwrap_or_else(|| vec![1.0; raw.rows.len()]);
        Self::new(raw.rows, weights)
    }
}

impl FlowTable {
    /// Builds a table of unit-weight records.
    pub fn from_rows<I, R, C>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = C>,
        C: ToString,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|c| c.to_string()).collect::<Vec<_>>())
            .collect::<Vec<_>>();
        let weights = vec![1.0; rows.len()];
        Self::new(rows, weights)
    }

    pub fn from_weighted_rows<I, R, C>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = (R, f64)>,
        R: IntoIterator<Item = C>,
        C: ToString,
    {
        let (rows, weights): (Vec<Vec<String>>, Vec<f64>) = rows
            .into_iter()
            .map(|(row, w)| {
                (
                    row.into_iter()
                        .map(|c| c.to_string())
                        .collect::<Vec<String>>(),
                    w,
                )
            })
            .unzip();
        Self::new(rows, weights)
    }

    /// Builds a two-stage table from `source -> target -> width` pairs.
    pub fn from_pair_weights<I, A, J, B>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (A, J)>,
        A: ToString,
        J: IntoIterator<Item = (B, f64)>,
        B: ToString,
    {
        let mut rows = Vec::new();
        let mut weights = Vec::new();
        for (a, targets) in pairs {
            let a = a.to_string();
            for (b, w) in targets {
                rows.push(vec![a.clone(), b.to_string()]);
                weights.push(w);
            }
        }
        Self::new(rows, weights)
    }

    /// Accepts an array of arrays of scalars, or an object of objects of numbers.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Array(rows) => {
                let mut out = Vec::with_capacity(rows.len());
                for (i, row) in rows.iter().enumerate() {
                    let Value::Array(cells) = row else {
                        return Err(Error::malformed(format!("row {i} is not an array")));
                    };
                    let cells = cells
                        .iter()
                        .map(|cell| {
                            json_scalar_to_string(cell).ok_or_else(|| {
                                Error::malformed(format!("row {i} contains a non-scalar cell"))
                            })
                        })
                        .collect::<Result<Vec<_>>>()?;
                    out.push(cells);
                }
                Self::from_rows(out)
            }
            Value::Object(sources) => {
                let mut pairs: IndexMap<String, Vec<(String, f64)>> = IndexMap::new();
                for (a, targets) in sources {
                    let Value::Object(targets) = targets else {
                        return Err(Error::malformed(format!(
                            "entry `{a}` must map targets to widths"
                        )));
                    };
                    let entry = pairs.entry(a.clone()).or_default();
                    for (b, w) in targets {
                        let w = w.as_f64().ok_or_else(|| {
                            Error::malformed(format!("width of `{a}` -> `{b}` is not a number"))
                        })?;
                        entry.push((b.clone(), w));
                    }
                }
                Self::from_pair_weights(pairs)
            }
            _ => Err(Error::malformed(
                "expected an array of rows or an object of weighted pairs",
            )),
        }
    }

    pub fn from_csv(input: &str, options: &CsvOptions) -> Result<Self> {
        let mut records = parse_records(input)?;
        if options.has_header && !records.is_empty() {
            records.remove(0);
        }
        if !options.weight_column {
            return Self::from_rows(records);
        }

        let mut rows = Vec::with_capacity(records.len());
        let mut weights = Vec::with_capacity(records.len());
        for (i, mut record) in records.into_iter().enumerate() {
            let raw = record
                .pop()
                .ok_or_else(|| Error::malformed(format!("record {i} is empty")))?;
            let w = raw.trim().parse::<f64>().map_err(|_| {
                Error::malformed(format!("record {i} has a non-numeric weight `{raw}`"))
            })?;
            rows.push(record);
            weights.push(w);
        }
        Self::new(rows, weights)
    }

    fn new(rows: Vec<Vec<String>>, weights: Vec<f64>) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Err(Error::malformed("table has no rows"));
        };
        if weights.len() != rows.len() {
            return Err(Error::malformed(format!(
                "{} weights given for {} rows",
                weights.len(),
                rows.len()
            )));
        }
        let stages = first.len();
        if stages < 2 {
            return Err(Error::malformed(format!(
                "rows need at least two stages, found {stages}"
            )));
        }
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != stages) {
            return Err(Error::malformed(format!(
                "row {i} has {} stages, expected {stages}",
                row.len()
            )));
        }
        if let Some((i, w)) = weights
            .iter()
            .enumerate()
            .find(|(_, w)| !(w.is_finite() && **w >= 0.0))
        {
            return Err(Error::malformed(format!("row {i} has an invalid weight {w}")));
        }
        tracing::debug!(rows = rows.len(), stages, "flow table built");
        Ok(Self { rows, weights })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn stage_count(&self) -> usize {
        self.rows.first().map(|r| r.len()).unwrap_or(0)
    }

    pub fn total_weight(&self) -> f64 {
        self.weights.iter().sum()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Rows paired with their weights.
    pub fn records(&self) -> impl Iterator<Item = (&[String], f64)> {
        self.rows
            .iter()
            .map(Vec::as_slice)
            .zip(self.weights.iter().copied())
    }

    /// Plain nested-sequence form of the table.
    pub fn to_nested(&self) -> Vec<Vec<String>> {
        self.rows.clone()
    }
}

fn json_scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Conversion of caller data into a [`FlowTable`].
pub trait IntoFlowTable {
    fn into_flow_table(self) -> Result<FlowTable>;
}

impl IntoFlowTable for FlowTable {
    fn into_flow_table(self) -> Result<FlowTable> {
        Ok(self)
    }
}

impl IntoFlowTable for &FlowTable {
    fn into_flow_table(self) -> Result<FlowTable> {
        Ok(self.clone())
    }
}

impl IntoFlowTable for &Value {
    fn into_flow_table(self) -> Result<FlowTable> {
        FlowTable::from_json(self)
    }
}

impl IntoFlowTable for Value {
    fn into_flow_table(self) -> Result<FlowTable> {
        FlowTable::from_json(&self)
    }
}

impl<C: ToString> IntoFlowTable for Vec<Vec<C>> {
    fn into_flow_table(self) -> Result<FlowTable> {
        FlowTable::from_rows(self)
    }
}

impl<C: ToString> IntoFlowTable for &[Vec<C>] {
    fn into_flow_table(self) -> Result<FlowTable> {
        FlowTable::from_rows(self.iter().map(|r| r.iter().map(ToString::to_string)))
    }
}

impl<C: ToString, const N: usize> IntoFlowTable for &[[C; N]] {
    fn into_flow_table(self) -> Result<FlowTable> {
        FlowTable::from_rows(self.iter().map(|r| r.iter().map(ToString::to_string)))
    }
}

impl<C: ToString, const N: usize, const M: usize> IntoFlowTable for [[C; N]; M] {
    fn into_flow_table(self) -> Result<FlowTable> {
        FlowTable::from_rows(self)
    }
}
