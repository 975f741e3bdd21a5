use std::io::Cursor;

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::*;

use crate::waveform::config::StreamSettings;
use crate::waveform::paginator::PageSnapshot;
use crate::waveform::ScopeError;

#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub trace: RGBColor,
    pub baseline: RGBColor,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 800,
            height: 400,
            background: RGBColor(10, 10, 10),
            trace: CYAN,
            baseline: RGBColor(70, 70, 70),
        }
    }
}

/// Draws one page on the configured window and amplitude range.
/// Axes carry no labels, so no font backend is needed.
pub fn render_page_png(
    page: &PageSnapshot,
    settings: &StreamSettings,
    style: &PlotStyle,
) -> Result<Vec<u8>, ScopeError> {
    if page.is_empty() {
        return Err(ScopeError::Plot("page has no points".into()));
    }
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let window = settings.window_secs;
        let y_min = settings.amplitude.min as f64;
        let y_max = settings.amplitude.max as f64;
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .build_cartesian_2d(0f64..window, y_min..y_max)?;
        chart.draw_series(LineSeries::new(
            [(0.0, 0.0), (window, 0.0)],
            &style.baseline,
        ))?;
        let trace = page
            .points
            .iter()
            .map(|point| (point.time, point.amplitude as f64));
        chart.draw_series(LineSeries::new(trace, &style.trace))?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}

fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ScopeError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| ScopeError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
