use crate::config::FlowConfig;
use crate::error::{DiagramError, Result};
use crate::text_metrics::TextMeasure;

use super::TextBlock;

/// Measure a (possibly multi-line) label into pixel extents. Width is the
/// widest line's advance; height stacks lines at the configured line height.
pub(super) fn measure_label(
    text: &str,
    font_size: f32,
    font_family: &str,
    config: &FlowConfig,
    measurer: &dyn TextMeasure,
) -> Result<TextBlock> {
    let lines = split_lines(text);
    let mut width = 0.0f32;
    for line in &lines {
        let line_width = measurer
            .line_width(line, font_size, font_family)
            .ok_or_else(|| DiagramError::Font {
                family: font_family.to_string(),
            })?;
        width = width.max(line_width);
    }
    let height = lines.len() as f32 * font_size * config.label_line_height;
    Ok(TextBlock {
        lines,
        width,
        height,
    })
}

pub(super) fn split_lines(text: &str) -> Vec<String> {
    let normalized = text.replace("\\n", "\n");
    let lines: Vec<String> = normalized.split('\n').map(|line| line.to_string()).collect();
    if lines.is_empty() {
        vec![String::new()]
    } else {
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text_metrics::FixedMetrics;

    #[test]
    fn split_lines_handles_escaped_newlines() {
        assert_eq!(split_lines("a\\nb"), vec!["a", "b"]);
        assert_eq!(split_lines("a\nb"), vec!["a", "b"]);
    }

    #[test]
    fn measure_label_width_is_widest_line() {
        let config = FlowConfig::default();
        let metrics = FixedMetrics { char_width: 0.5 };
        let block = measure_label("long line\nab", 10.0, "sans-serif", &config, &metrics).unwrap();
        assert_eq!(block.lines.len(), 2);
        assert!((block.width - 9.0 * 0.5 * 10.0).abs() < 1e-4);
        assert!((block.height - 2.0 * 10.0 * config.label_line_height).abs() < 1e-4);
    }

    #[test]
    fn measure_label_empty_string_is_single_empty_line() {
        let config = FlowConfig::default();
        let metrics = FixedMetrics::default();
        let block = measure_label("", 12.0, "sans-serif", &config, &metrics).unwrap();
        assert_eq!(block.lines.len(), 1);
        assert_eq!(block.width, 0.0);
        assert!(block.height > 0.0);
    }

    #[test]
    fn measure_label_propagates_missing_font() {
        struct NoFonts;
        impl crate::text_metrics::TextMeasure for NoFonts {
            fn line_width(&self, _: &str, _: f32, _: &str) -> Option<f32> {
                None
            }
        }
        let config = FlowConfig::default();
        let result = measure_label("x", 12.0, "missing", &config, &NoFonts);
        assert!(matches!(
            result,
            Err(crate::error::DiagramError::Font { .. })
        ));
    }
}
