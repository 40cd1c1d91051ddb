//! Node label text: the category name, optionally joined with its width.
//!
//! Labels of one stage are padded to common field widths so the name and width columns line
//! up. Names are aligned towards the ribbons, numbers are right-aligned. Widths print in data
//! units, or as a share of the total weight when `width_in` is off.

use crate::model::StageSide;
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

fn pad(text: &str, width: usize, align: Align) -> String {
    let fill = width.saturating_sub(text.width());
    let spaces = " ".repeat(fill);
    match align {
        Align::Left => format!("{text}{spaces}"),
        Align::Right => format!("{spaces}{text}"),
    }
}

/// Shortest decimal form of a width; integral values print without a fraction.
pub fn format_width(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let rounded = (value * 1e6).round() / 1e6;
    let s = rounded.to_string();
    if s == "-0" { "0".to_string() } else { s }
}

/// Field widths shared by every label of a stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelColumns {
    pub item: usize,
    pub width: usize,
}

impl LabelColumns {
    pub fn measure<'a>(
        entries: impl IntoIterator<Item = (&'a str, f64)>,
        format: &LabelFormat<'_>,
    ) -> Self {
        let mut cols = Self::default();
        for (item, width) in entries {
            cols.item = cols.item.max(item.width());
            cols.width = cols.width.max(format.width_text(width).width());
        }
        cols
    }
}

#[derive(Debug, Clone)]
pub struct LabelFormat<'a> {
    pub disp_width: bool,
    /// Absolute widths; otherwise each width is shown as a percentage of `total`.
    pub width_in: bool,
    pub separator: &'a str,
    pub total: f64,
}

impl LabelFormat<'_> {
    pub fn width_text(&self, width: f64) -> String {
        if self.width_in || !(self.total > 0.0) {
            return format_width(width);
        }
        let percent = (width / self.total * 1000.0).round() / 10.0;
        format!("{}%", format_width(percent))
    }
}

/// The width field always sits on the side facing the ribbons.
pub fn item_text(
    item: &str,
    width: f64,
    side: StageSide,
    columns: LabelColumns,
    format: &LabelFormat<'_>,
) -> String {
    if side == StageSide::Inner {
        // Inner labels are centred on their bar; padding would shift them.
        return if format.disp_width {
            format!("{item}{}{}", format.separator, format.width_text(width))
        } else {
            item.to_string()
        };
    }

    let name_align = match side {
        StageSide::Left => Align::Right,
        _ => Align::Left,
    };
    let name = pad(item, columns.item, name_align);
    if !format.disp_width {
        return name;
    }
    let number = pad(&format.width_text(width), columns.width, Align::Right);

    match side {
        StageSide::Left => format!("{name}{}{number}", format.separator),
        _ => format!("{number}{}{name}", format.separator),
    }
}
