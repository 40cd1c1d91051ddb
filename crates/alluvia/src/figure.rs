use crate::{RenderError, Result};
use alluvia_core::AlluvialOptions;
use alluvia_render::model::AlluvialDiagramLayout;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    Svg,
    Png,
    Jpeg,
    Pdf,
}

impl SaveFormat {
    /// Infers the format from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("svg") => Ok(Self::Svg),
            Some("png") => Ok(Self::Png),
            Some("jpg") | Some("jpeg") => Ok(Self::Jpeg),
            Some("pdf") => Ok(Self::Pdf),
            _ => Err(RenderError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for SaveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Svg => "SVG",
            Self::Png => "PNG",
            Self::Jpeg => "JPG",
            Self::Pdf => "PDF",
        })
    }
}

/// One laid-out diagram together with its SVG rendering.
#[derive(Debug, Clone)]
pub struct Figure {
    id: u64,
    layout: AlluvialDiagramLayout,
    svg: String,
}

impl Figure {
    pub(crate) fn new(id: u64, layout: AlluvialDiagramLayout, svg: String) -> Self {
        Self { id, layout, svg }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn layout(&self) -> &AlluvialDiagramLayout {
        &self.layout
    }

    pub fn svg(&self) -> &str {
        &self.svg
    }

    /// Encodes the figure. Raster output uses `options.dpi` and `options.fontname`.
    pub fn encode(&self, format: SaveFormat, options: &AlluvialOptions) -> Result<Vec<u8>> {
        match format {
            SaveFormat::Svg => Ok(self.svg.clone().into_bytes()),
            #[cfg(feature = "raster")]
            SaveFormat::Png => {
                let raster = crate::render::raster::RasterOptions::for_figure(options);
                Ok(crate::render::raster::svg_to_png(&self.svg, &raster)?)
            }
            #[cfg(feature = "raster")]
            SaveFormat::Jpeg => {
                let raster = crate::render::raster::RasterOptions::for_figure(options);
                Ok(crate::render::raster::svg_to_jpeg(&self.svg, &raster)?)
            }
            #[cfg(feature = "raster")]
            SaveFormat::Pdf => Ok(crate::render::raster::svg_to_pdf(
                &self.svg,
                &options.fontname,
            )?),
            #[cfg(not(feature = "raster"))]
            other => {
                let _ = options;
                Err(RenderError::RasterUnavailable { format: other })
            }
        }
    }

    /// Writes the figure to `path` in the format named by its extension.
    pub fn save(&self, path: &Path, options: &AlluvialOptions) -> Result<()> {
        let format = SaveFormat::from_path(path)?;
        let bytes = self.encode(format, options)?;
        std::fs::write(path, &bytes).map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(
            figure = self.id,
            path = %path.display(),
            %format,
            bytes = bytes.len(),
            "figure saved"
        );
        Ok(())
    }
}
