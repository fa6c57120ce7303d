// Responsive grid layout - placement, compaction and drag/resize reconciliation
use crate::domain::widget::{WidgetInstance, MAX_WIDGET_SPAN, MIN_WIDGET_SPAN};
use serde::{Deserialize, Serialize};

pub const GRID_COLUMNS: u32 = 12;

/// Viewport width thresholds and the column count each one selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Breakpoint {
    Lg,
    Md,
    Sm,
    Xs,
    Xxs,
}

impl Breakpoint {
    /// Widest first.
    pub const ALL: [Breakpoint; 5] = [
        Breakpoint::Lg,
        Breakpoint::Md,
        Breakpoint::Sm,
        Breakpoint::Xs,
        Breakpoint::Xxs,
    ];

    pub fn min_width(&self) -> u32 {
        match self {
            Breakpoint::Lg => 1200,
            Breakpoint::Md => 996,
            Breakpoint::Sm => 768,
            Breakpoint::Xs => 480,
            Breakpoint::Xxs => 0,
        }
    }

    pub fn columns(&self) -> u32 {
        match self {
            Breakpoint::Lg => 12,
            Breakpoint::Md => 10,
            Breakpoint::Sm => 6,
            Breakpoint::Xs => 4,
            Breakpoint::Xxs => 2,
        }
    }

    pub fn for_width(width_px: u32) -> Self {
        Self::ALL
            .into_iter()
            .find(|b| width_px >= b.min_width())
            .unwrap_or(Breakpoint::Xxs)
    }
}

/// Geometry of one widget as reported by the grid after a drag or resize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub i: String,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Geometry {
    pub fn of(widget: &WidgetInstance) -> Self {
        Self {
            i: widget.i.clone(),
            x: widget.x,
            y: widget.y,
            w: widget.w as u32,
            h: widget.h as u32,
        }
    }

    fn right(&self) -> u32 {
        self.x.saturating_add(self.w)
    }

    /// Row just below this widget, pinned at `u32::MAX` for rows near the limit.
    fn bottom(&self) -> u32 {
        self.y.saturating_add(self.h)
    }

    fn overlaps(&self, other: &Geometry) -> bool {
        self.x < other.right() && other.x < self.right() && self.y < other.bottom() && other.y < self.bottom()
    }

    fn shares_columns(&self, x: u32, w: u32) -> bool {
        self.x < x.saturating_add(w) && x < self.right()
    }
}

/// Where a new widget goes vertically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Row(u32),
    /// Below everything already occupying the widget's columns.
    AppendBelow,
}

impl Placement {
    /// Resolve into a concrete row for a widget spanning `x..x+w`.
    pub fn resolve(&self, existing: &[WidgetInstance], x: u32, w: u32) -> u32 {
        match self {
            Placement::Row(y) => *y,
            Placement::AppendBelow => existing
                .iter()
                .map(Geometry::of)
                .filter(|g| g.shares_columns(x, w))
                .map(|g| g.bottom())
                .max()
                .unwrap_or(0),
        }
    }
}

/// Column offset for the `index`-th widget of a report: staggered every 4 columns.
pub fn staggered_column(index: usize) -> u32 {
    ((index * 4) % GRID_COLUMNS as usize) as u32
}

/// Overwrite the geometry of every widget named in `items`.
///
/// Items whose `i` matches no widget come from stale drag events and are
/// dropped. Widgets not named keep their geometry. Returns how many widgets moved.
pub fn reconcile(widgets: &mut [WidgetInstance], items: &[Geometry]) -> usize {
    let mut applied = 0;
    for item in items {
        let Some(widget) = widgets.iter_mut().find(|w| w.i == item.i) else {
            tracing::debug!("Dropping layout update for unknown widget {}", item.i);
            continue;
        };

        widget.x = item.x;
        widget.y = item.y;
        widget.w = clamp_cells(item.w);
        widget.h = clamp_cells(item.h);
        applied += 1;
    }
    applied
}

fn clamp_cells(value: u32) -> u8 {
    value.clamp(MIN_WIDGET_SPAN as u32, MAX_WIDGET_SPAN as u32) as u8
}

/// Non-overlapping layout of `widgets` for a viewport `width_px` wide.
///
/// Items are fitted into the breakpoint's columns and then compacted upwards,
/// processing them top-to-bottom, left-to-right. Output keeps input order.
pub fn layout_for(widgets: &[WidgetInstance], width_px: u32) -> (Breakpoint, Vec<Geometry>) {
    let breakpoint = Breakpoint::for_width(width_px);
    let items: Vec<Geometry> = widgets.iter().map(Geometry::of).collect();
    (breakpoint, compact(items, breakpoint.columns()))
}

pub fn compact(items: Vec<Geometry>, columns: u32) -> Vec<Geometry> {
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by_key(|&idx| (items[idx].y, items[idx].x));

    let mut placed: Vec<Geometry> = Vec::with_capacity(items.len());
    let mut slots: Vec<Option<Geometry>> = vec![None; items.len()];

    for idx in order {
        let mut item = items[idx].clone();
        item.w = item.w.clamp(1, columns);
        item.x = item.x.min(columns - item.w);

        let bottom = placed.iter().map(Geometry::bottom).max().unwrap_or(0);
        item.y = item.y.min(bottom);

        // Float up while the row above is free
        while item.y > 0 {
            let above = Geometry { y: item.y - 1, ..item.clone() };
            if placed.iter().any(|p| p.overlaps(&above)) {
                break;
            }
            item.y -= 1;
        }
        // Push down below anything still in the way
        while let Some(blocker) = placed.iter().find(|p| p.overlaps(&item)) {
            item.y = blocker.bottom();
        }

        placed.push(item.clone());
        slots[idx] = Some(item);
    }

    slots.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::widget::{TextConfig, WidgetConfig};

    fn widget(i: &str, x: u32, y: u32, w: u8, h: u8) -> WidgetInstance {
        WidgetInstance {
            i: i.to_string(),
            config: WidgetConfig::Text(TextConfig {
                title: i.to_string(),
                content: String::new(),
                width: w,
                height: h,
            }),
            x,
            y,
            w,
            h,
        }
    }

    fn geometry(i: &str, x: u32, y: u32, w: u32, h: u32) -> Geometry {
        Geometry {
            i: i.to_string(),
            x,
            y,
            w,
            h,
        }
    }

    #[test]
    fn test_breakpoint_table() {
        assert_eq!(Breakpoint::for_width(1920), Breakpoint::Lg);
        assert_eq!(Breakpoint::for_width(1200).columns(), 12);
        assert_eq!(Breakpoint::for_width(1199).columns(), 10);
        assert_eq!(Breakpoint::for_width(996).columns(), 10);
        assert_eq!(Breakpoint::for_width(800).columns(), 6);
        assert_eq!(Breakpoint::for_width(480).columns(), 4);
        assert_eq!(Breakpoint::for_width(320).columns(), 2);
        assert_eq!(Breakpoint::for_width(0), Breakpoint::Xxs);
    }

    #[test]
    fn test_staggered_column() {
        assert_eq!(staggered_column(0), 0);
        assert_eq!(staggered_column(1), 4);
        assert_eq!(staggered_column(2), 8);
        assert_eq!(staggered_column(3), 0);
    }

    #[test]
    fn test_append_below_resolves_to_lowest_edge() {
        let existing = vec![widget("a", 0, 0, 4, 4), widget("b", 4, 0, 4, 6), widget("c", 8, 0, 4, 9)];

        assert_eq!(Placement::AppendBelow.resolve(&existing, 0, 4), 4);
        assert_eq!(Placement::AppendBelow.resolve(&existing, 2, 4), 6);
        assert_eq!(Placement::AppendBelow.resolve(&[], 0, 4), 0);
        assert_eq!(Placement::Row(2).resolve(&existing, 0, 4), 2);
    }

    #[test]
    fn test_reconcile_overwrites_geometry_only() {
        let mut widgets = vec![widget("chart-123", 0, 0, 4, 4), widget("text-1", 4, 0, 4, 4)];
        let config_before = widgets[0].config.clone();

        let applied = reconcile(&mut widgets, &[geometry("chart-123", 2, 0, 6, 5)]);

        assert_eq!(applied, 1);
        assert_eq!((widgets[0].x, widgets[0].y, widgets[0].w, widgets[0].h), (2, 0, 6, 5));
        assert_eq!(widgets[0].config, config_before);
        assert_eq!((widgets[1].x, widgets[1].y), (4, 0));
    }

    #[test]
    fn test_reconcile_drops_unknown_ids() {
        let mut widgets = vec![widget("text-1", 0, 0, 4, 4)];
        let before = widgets.clone();

        let applied = reconcile(&mut widgets, &[geometry("ghost", 1, 1, 2, 2)]);

        assert_eq!(applied, 0);
        assert_eq!(widgets, before);
    }

    #[test]
    fn test_reconcile_clamps_spans() {
        let mut widgets = vec![widget("text-1", 0, 0, 4, 4)];
        reconcile(&mut widgets, &[geometry("text-1", 0, 0, 0, 40)]);
        assert_eq!((widgets[0].w, widgets[0].h), (1, 12));
    }

    #[test]
    fn test_rows_near_the_limit_saturate() {
        let mut widgets = vec![widget("a", 0, 0, 4, 4), widget("b", 8, 0, 4, 4)];
        reconcile(
            &mut widgets,
            &[geometry("a", 0, u32::MAX, 4, 12), geometry("b", u32::MAX, u32::MAX - 1, 4, 4)],
        );
        assert_eq!(widgets[0].y, u32::MAX);

        assert_eq!(Placement::AppendBelow.resolve(&widgets, 0, 4), u32::MAX);
        assert_eq!(Placement::AppendBelow.resolve(&widgets, 4, 4), 0);

        let (_, layout) = layout_for(&widgets, 1200);
        assert_eq!((layout[0].x, layout[0].y), (0, 0));
        assert_eq!((layout[1].x, layout[1].y), (8, 0));
    }

    #[test]
    fn test_compact_floats_items_up() {
        let items = vec![geometry("a", 0, 10, 4, 2), geometry("b", 4, 3, 4, 2)];
        let packed = compact(items, 12);
        assert_eq!(packed[0].y, 0);
        assert_eq!(packed[1].y, 0);
    }

    #[test]
    fn test_compact_never_overlaps() {
        let items = vec![
            geometry("a", 0, 0, 6, 3),
            geometry("b", 2, 0, 6, 2),
            geometry("c", 4, 1, 8, 4),
            geometry("d", 0, 9, 12, 1),
        ];
        let packed = compact(items, 12);

        for (n, left) in packed.iter().enumerate() {
            for right in packed.iter().skip(n + 1) {
                assert!(!left.overlaps(right), "{:?} overlaps {:?}", left, right);
            }
        }
        assert_eq!(packed.iter().map(|g| g.i.as_str()).collect::<Vec<_>>(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_layout_for_narrow_viewport() {
        let widgets = vec![widget("a", 0, 0, 6, 2), widget("b", 6, 0, 6, 2)];

        let (breakpoint, layout) = layout_for(&widgets, 500);

        assert_eq!(breakpoint, Breakpoint::Xs);
        assert!(layout.iter().all(|g| g.x + g.w <= 4));
        assert_eq!(layout[0].y, 0);
        assert_eq!(layout[1].y, 2);
    }
}
