use crate::color::{Colormap, Rgba};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Options recognised by the alluvial layout and renderer.
///
/// Every field has a default (see [`AlluvialOptions::default`]); deserialising a partial JSON
/// or YAML object fills the rest. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlluvialOptions {
    /// Stage whose category colours each ribbon. With two stages, `0` is the left side and
    /// `1` the right side. Values past the last stage select the last stage.
    pub color_side: usize,
    /// Ribbon opacity in `[0, 1]`.
    pub alpha: f64,
    /// Horizontal data extent of the first and last stage.
    pub x_range: (f64, f64),
    /// Number of samples along each ribbon edge.
    pub res: usize,
    /// Canvas size in inches.
    pub figsize: (f64, f64),
    /// Append each category's total width to its label.
    pub disp_width: bool,
    /// Print widths in data units; when off, as a percentage of the total weight.
    pub width_in: bool,
    /// Separator between the category and its width.
    pub wdisp_sep: String,
    pub cmap: Colormap,
    /// Vertical gap between stacked categories, as a fraction of the total weight.
    pub v_gap_frac: f64,
    /// Horizontal gap around stages, as a fraction of the `x_range` span.
    pub h_gap_frac: f64,
    /// One label per stage.
    pub labels: Option<Vec<String>>,
    /// Label font; `FontDefaults::family` follows it as the fallback.
    pub fontname: String,
    /// Resolution used when a figure is saved to a raster format.
    pub dpi: f64,
    /// Draw colormap positions pseudo-randomly with this seed instead of evenly spacing them.
    pub color_seed: Option<u64>,
    /// Explicit colours for the categories of the colour stage, in stage order.
    pub colors: Option<Vec<Rgba>>,
    /// Extra outward offset of the outer stage labels, in characters.
    pub label_shift: f64,
    /// Explicit category order per stage (bottom to top).
    pub stage_orders: Option<Vec<Vec<String>>>,
}

impl Default for AlluvialOptions {
    fn default() -> Self {
        Self {
            color_side: 1,
            alpha: 0.5,
            x_range: (0.0, 1.0),
            res: 20,
            figsize: (21.0, 15.0),
            disp_width: true,
            width_in: true,
            wdisp_sep: " ".repeat(2),
            cmap: Colormap::Jet,
            v_gap_frac: 0.03,
            h_gap_frac: 0.03,
            labels: None,
            fontname: "Arial".to_string(),
            dpi: 200.0,
            color_seed: None,
            colors: None,
            label_shift: 0.0,
            stage_orders: None,
        }
    }
}

impl AlluvialOptions {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(Error::invalid_option("alpha", "must be within [0, 1]"));
        }
        if self.res < 2 {
            return Err(Error::invalid_option("res", "must be at least 2"));
        }
        let (x0, x1) = self.x_range;
        if !(x0.is_finite() && x1.is_finite() && x1 > x0) {
            return Err(Error::invalid_option(
                "x_range",
                "must be a finite, increasing pair",
            ));
        }
        if !(self.v_gap_frac.is_finite() && self.v_gap_frac >= 0.0) {
            return Err(Error::invalid_option("v_gap_frac", "must be non-negative"));
        }
        if !(self.h_gap_frac.is_finite() && self.h_gap_frac >= 0.0) {
            return Err(Error::invalid_option("h_gap_frac", "must be non-negative"));
        }
        let (w, h) = self.figsize;
        if !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0) {
            return Err(Error::invalid_option("figsize", "must be positive"));
        }
        if !(self.dpi.is_finite() && self.dpi > 0.0) {
            return Err(Error::invalid_option("dpi", "must be positive"));
        }
        if !self.label_shift.is_finite() {
            return Err(Error::invalid_option("label_shift", "must be finite"));
        }
        self.cmap.validate()
    }

    /// Returns a copy with `overrides` deep-merged over the current values.
    pub fn with_overrides(&self, overrides: &OptionOverrides) -> Result<Self> {
        let mut base = serde_json::to_value(self)?;
        deep_merge_value(&mut base, overrides.as_value());
        let merged: Self = serde_json::from_value(base)?;
        tracing::debug!(overrides = %overrides.as_value(), "options overridden");
        Ok(merged)
    }

    /// Parses a complete or partial options document (JSON or YAML).
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }
}

/// Text defaults shared by every figure drawn through one rendering context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontDefaults {
    /// Fallback after the figure's `fontname`, used alone when that is empty.
    pub family: String,
    pub weight: String,
    /// Stage label size.
    pub size: f64,
    /// Axis tick labels. Alluvial figures draw no axes, so layout never reads it.
    pub tick_label_size: f64,
}

impl Default for FontDefaults {
    fn default() -> Self {
        Self {
            family: "Arial".to_string(),
            weight: "bold".to_string(),
            size: 14.0,
            tick_label_size: 14.0,
        }
    }
}

/// A sparse JSON object of option values, addressed by dotted paths.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionOverrides(Value);

impl Default for OptionOverrides {
    fn default() -> Self {
        Self::empty_object()
    }
}

impl OptionOverrides {
    pub fn empty_object() -> Self {
        Self(Value::Object(Map::new()))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(Self(serde_json::from_str(text)?))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(Self(serde_yaml::from_str(text)?))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.as_object().is_none_or(Map::is_empty)
    }

    pub fn set_value(&mut self, dotted_path: &str, value: Value) {
        if !self.0.is_object() {
            self.0 = Value::Object(Map::new());
        }

        let Value::Object(ref mut root) = self.0 else {
            return;
        };
        let mut cur: &mut Map<String, Value> = root;
        let mut segments = dotted_path.split('.').peekable();
        while let Some(seg) = segments.next() {
            if segments.peek().is_none() {
                cur.insert(seg.to_string(), value);
                return;
            }
            let slot = cur.entry(seg).or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            let Some(next) = slot.as_object_mut() else {
                return;
            };
            cur = next;
        }
    }

    /// Applies a `key=value` assignment. The value is read as JSON when it parses as JSON,
    /// otherwise as a plain string (`fontname=DejaVu Sans`).
    pub fn set_assignment(&mut self, assignment: &str) -> Result<()> {
        let Some((key, raw)) = assignment.split_once('=') else {
            return Err(Error::InvalidOption {
                option: "set",
                message: format!("expected key=value, got `{assignment}`"),
            });
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::InvalidOption {
                option: "set",
                message: format!("missing key in `{assignment}`"),
            });
        }
        let value = serde_json::from_str::<Value>(raw.trim())
            .unwrap_or_else(|_| Value::String(raw.to_string()));
        self.set_value(key, value);
        Ok(())
    }

    pub fn deep_merge(&mut self, other: &Value) {
        deep_merge_value(&mut self.0, other);
    }
}

fn deep_merge_value(base: &mut Value, incoming: &Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(in_map)) => {
            for (key, in_value) in in_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge_value(base_value, in_value),
                    None => {
                        base_map.insert(key.clone(), in_value.clone());
                    }
                }
            }
        }
        (base_slot, in_value) => {
            *base_slot = in_value.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_documented_table() {
        let o = AlluvialOptions::default();
        assert_eq!(o.color_side, 1);
        assert_eq!(o.alpha, 0.5);
        assert_eq!(o.x_range, (0.0, 1.0));
        assert_eq!(o.res, 20);
        assert_eq!(o.figsize, (21.0, 15.0));
        assert!(o.disp_width);
        assert!(o.width_in);
        assert_eq!(o.wdisp_sep, "  ");
        assert_eq!(o.cmap, Colormap::Jet);
        assert_eq!(o.v_gap_frac, 0.03);
        assert_eq!(o.h_gap_frac, 0.03);
        assert_eq!(o.labels, None);
        assert_eq!(o.fontname, "Arial");
        assert_eq!(o.dpi, 200.0);
        assert!(o.validate().is_ok());
    }

    #[test]
    fn partial_documents_fill_defaults() {
        let o = AlluvialOptions::from_json_str(r#"{"alpha": 0.9, "x_range": [0, 2]}"#).unwrap();
        assert_eq!(o.alpha, 0.9);
        assert_eq!(o.x_range, (0.0, 2.0));
        assert_eq!(o.res, 20);

        let y = AlluvialOptions::from_yaml_str("cmap: hsv\nlabels: [before, after]\n").unwrap();
        assert_eq!(y.cmap, Colormap::Hsv);
        assert_eq!(y.labels.as_deref(), Some(&["before".to_string(), "after".to_string()][..]));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(AlluvialOptions::from_json_str(r#"{"aplha": 0.9}"#).is_err());
    }

    #[test]
    fn validation_catches_out_of_range_values() {
        let bad = [
            AlluvialOptions {
                alpha: 1.5,
                ..Default::default()
            },
            AlluvialOptions {
                res: 1,
                ..Default::default()
            },
            AlluvialOptions {
                x_range: (1.0, 1.0),
                ..Default::default()
            },
            AlluvialOptions {
                dpi: 0.0,
                ..Default::default()
            },
            AlluvialOptions {
                cmap: Colormap::Gradient(Vec::new()),
                ..Default::default()
            },
        ];
        for o in bad {
            assert!(o.validate().is_err(), "{o:?}");
        }
    }

    #[test]
    fn overrides_merge_over_current_values() {
        let mut overrides = OptionOverrides::default();
        overrides.set_assignment("alpha=0.25").unwrap();
        overrides.set_assignment("fontname=DejaVu Sans").unwrap();
        overrides.set_assignment("figsize=[8, 6]").unwrap();
        let base = AlluvialOptions {
            res: 50,
            ..Default::default()
        };
        let merged = base.with_overrides(&overrides).unwrap();
        assert_eq!(merged.alpha, 0.25);
        assert_eq!(merged.fontname, "DejaVu Sans");
        assert_eq!(merged.figsize, (8.0, 6.0));
        assert_eq!(merged.res, 50);
    }

    #[test]
    fn set_value_builds_nested_objects() {
        let mut o = OptionOverrides::from_value(json!("not an object"));
        o.set_value("a.b", json!(1));
        assert_eq!(o.as_value(), &json!({"a": {"b": 1}}));
        assert!(o.set_assignment("novalue").is_err());
    }
}
