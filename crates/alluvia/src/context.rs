use crate::display::{DisplaySurface, Headless};
use crate::figure::Figure;
use crate::Result;
use alluvia_core::{AlluvialOptions, FlowTable, FontDefaults, IntoFlowTable};
use alluvia_render::layout::{AlluvialLayoutEngine, LayoutEngine};
use alluvia_render::model::AlluvialDiagramLayout;
use alluvia_render::svg::{SvgRenderOptions, render_alluvial_svg};
use alluvia_render::text::{DeterministicTextMeasurer, TextMeasurer};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Rendering state shared by consecutive diagram calls.
///
/// Holds the font defaults, the layout engine, the display surface and the figures that are
/// currently open. Each context is independent; use one per thread.
pub struct RenderContext {
    fonts: FontDefaults,
    engine: Arc<dyn LayoutEngine + Send + Sync>,
    measurer: Arc<dyn TextMeasurer + Send + Sync>,
    display: Box<dyn DisplaySurface + Send>,
    svg: SvgRenderOptions,
    figures: Vec<Figure>,
    next_id: u64,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            fonts: FontDefaults::default(),
            engine: Arc::new(AlluvialLayoutEngine),
            measurer: Arc::new(DeterministicTextMeasurer::default()),
            display: Box::new(Headless),
            svg: SvgRenderOptions::default(),
            figures: Vec::new(),
            next_id: 1,
        }
    }
}

impl fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderContext")
            .field("fonts", &self.fonts)
            .field("svg", &self.svg)
            .field("open_figures", &self.figures.len())
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

/// Closes its figure when dropped, so early returns and panics never leak one.
struct OpenFigure<'a> {
    ctx: &'a mut RenderContext,
    id: u64,
}

impl OpenFigure<'_> {
    fn figure(&self) -> Option<&Figure> {
        self.ctx.figures.iter().find(|f| f.id() == self.id)
    }
}

impl Drop for OpenFigure<'_> {
    fn drop(&mut self) {
        self.ctx.close(self.id);
    }
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fonts(mut self, fonts: FontDefaults) -> Self {
        self.fonts = fonts;
        self
    }

    pub fn with_engine(mut self, engine: Arc<dyn LayoutEngine + Send + Sync>) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_text_measurer(mut self, measurer: Arc<dyn TextMeasurer + Send + Sync>) -> Self {
        self.measurer = measurer;
        self
    }

    pub fn with_display(mut self, display: impl DisplaySurface + Send + 'static) -> Self {
        self.display = Box::new(display);
        self
    }

    pub fn with_svg_options(mut self, svg: SvgRenderOptions) -> Self {
        self.svg = svg;
        self
    }

    pub fn fonts(&self) -> &FontDefaults {
        &self.fonts
    }

    pub fn open_figures(&self) -> usize {
        self.figures.len()
    }

    pub fn close_all(&mut self) {
        if !self.figures.is_empty() {
            tracing::debug!(count = self.figures.len(), "closing open figures");
        }
        self.figures.clear();
    }

    fn close(&mut self, id: u64) {
        self.figures.retain(|f| f.id() != id);
        tracing::debug!(figure = id, "figure closed");
    }

    /// Lays out `table` without opening a figure.
    pub fn layout(
        &self,
        table: &FlowTable,
        options: &AlluvialOptions,
    ) -> Result<AlluvialDiagramLayout> {
        Ok(self.engine.layout(table, options, &self.fonts)?)
    }

    fn open_figure(&mut self, table: &FlowTable, options: &AlluvialOptions) -> Result<u64> {
        let layout = self.layout(table, options)?;

        let id = self.next_id;
        self.next_id += 1;
        let svg_options = SvgRenderOptions {
            diagram_id: Some(
                self.svg
                    .diagram_id
                    .clone()
                    .unwrap_or_else(|| format!("alluvial-{id}")),
            ),
            ..self.svg.clone()
        };
        let svg = render_alluvial_svg(
            &layout,
            options,
            &self.fonts,
            self.measurer.as_ref(),
            &svg_options,
        )?;

        self.figures.push(Figure::new(id, layout, svg));
        tracing::debug!(figure = id, "figure opened");
        Ok(id)
    }

    /// Draws one alluvial diagram.
    ///
    /// Closes every figure left open in this context, lays out `data` with `options`, saves
    /// the figure to `save_path` when given (format from the extension), shows it when `show`
    /// is set, and closes it again. The figure is closed on failure as well.
    pub fn render_sankey<D: IntoFlowTable>(
        &mut self,
        data: D,
        save_path: Option<&Path>,
        show: bool,
        options: &AlluvialOptions,
    ) -> Result<()> {
        self.close_all();
        let table = data.into_flow_table()?;
        let id = self.open_figure(&table, options)?;
        let mut open = OpenFigure { ctx: self, id };

        if let Some(path) = save_path {
            if let Some(figure) = open.figure() {
                figure.save(path, options)?;
            }
        }
        if show {
            let ctx = &mut *open.ctx;
            if let Some(figure) = ctx.figures.iter().find(|f| f.id() == id) {
                ctx.display.show(figure)?;
            }
        }
        Ok(())
    }

    /// Renders `data` and returns the SVG text. No figure stays open.
    pub fn render_svg_string<D: IntoFlowTable>(
        &mut self,
        data: D,
        options: &AlluvialOptions,
    ) -> Result<String> {
        self.close_all();
        let table = data.into_flow_table()?;
        let id = self.open_figure(&table, options)?;
        let open = OpenFigure { ctx: self, id };
        Ok(open.figure().map(|f| f.svg().to_string()).unwrap_or_default())
    }
}

/// Free-function form of [`RenderContext::render_sankey`].
pub fn render_sankey<D: IntoFlowTable>(
    ctx: &mut RenderContext,
    data: D,
    save_path: Option<&Path>,
    show: bool,
    options: &AlluvialOptions,
) -> Result<()> {
    ctx.render_sankey(data, save_path, show, options)
}
