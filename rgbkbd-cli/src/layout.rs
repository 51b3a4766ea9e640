//! HTML/SVG rendering of the keymap: the base layer, the FN layer and the
//! LED driver address under every key.

use rgbkbd_core::config::{COLS, LED_CONFIG, ROWS};
use rgbkbd_core::keymap::{self, fn_remap};
use rgbkbd_core::Keycode;

/// Key unit size in SVG pixels.
const U: f64 = 54.0;
/// Gap between keys.
const GAP: f64 = 4.0;
/// Step: key + gap.
const S: f64 = U + GAP;
/// Key corner radius.
const R: f64 = 4.0;
/// Margin around the SVG content.
const MARGIN: f64 = 20.0;
/// Vertical space per layer, including its title.
const LAYER_HEIGHT: f64 = ROWS as f64 * S + 60.0;

#[derive(Copy, Clone, PartialEq, Eq)]
enum Layer {
    Base,
    Fn,
}

impl Layer {
    fn title(self) -> &'static str {
        match self {
            Layer::Base => "Base layer",
            Layer::Fn => "FN layer",
        }
    }

    /// Keycode shown for `(row, col)` and whether the layer changes it.
    fn key(self, row: usize, col: usize) -> (Keycode, bool) {
        let base = keymap::map(row, col);
        match self {
            Layer::Base => (base, false),
            Layer::Fn => {
                let code = fn_remap(base);
                (code, code != base)
            }
        }
    }
}

fn key_class(layer: Layer, code: Keycode, remapped: bool) -> &'static str {
    if code.is_no() {
        "key unused"
    } else if code == Keycode::EditorMode {
        "key editor"
    } else if layer == Layer::Fn && !remapped && !code.is_fn() {
        "key transparent"
    } else if code.is_fn() {
        "key layer"
    } else if code.is_modifier() {
        "key modifier"
    } else {
        "key"
    }
}

/// Render one layer as an SVG group.
fn render_layer(layer: Layer, y_offset: f64) -> String {
    let mut svg = String::new();

    svg.push_str(&format!(
        r#"<g transform="translate({MARGIN}, {y_offset})">"#
    ));
    svg.push_str(&format!(
        r#"<text x="0" y="-10" class="layer-title">{}</text>"#,
        layer.title()
    ));

    for row in 0..ROWS {
        for col in 0..COLS {
            let (code, remapped) = layer.key(row, col);
            let (x, y) = (col as f64 * S, row as f64 * S);

            svg.push_str(&format!(
                r#"<rect x="{x}" y="{y}" width="{U}" height="{U}" rx="{R}" class="{}"/>"#,
                key_class(layer, code, remapped),
            ));

            let label = code.display_name();
            if !label.is_empty() {
                let font_class = if label.len() > 3 { " small" } else { "" };
                svg.push_str(&format!(
                    r#"<text x="{}" y="{}" class="label{font_class}">{}</text>"#,
                    x + U / 2.0,
                    y + U / 2.0 - 4.0,
                    html_escape(label),
                ));
            }

            if let Some(addr) = LED_CONFIG.address(col, row) {
                svg.push_str(&format!(
                    r#"<text x="{}" y="{}" class="led">s{} a{}</text>"#,
                    x + U / 2.0,
                    y + U - 8.0,
                    addr.step,
                    addr.anode,
                ));
            }
        }
    }

    svg.push_str("</g>");
    svg
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Generate the complete HTML document with inline SVG.
pub fn generate_html() -> String {
    let layers = [Layer::Base, Layer::Fn];
    let total_width = COLS as f64 * S + 2.0 * MARGIN;
    let total_height = layers.len() as f64 * LAYER_HEIGHT + 2.0 * MARGIN;

    let mut html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>RGB Keyboard Layout</title>
<style>
  body {{
    background: #1a1a2e;
    color: #eee;
    font-family: system-ui, -apple-system, sans-serif;
    display: flex;
    justify-content: center;
    padding: 2em;
  }}
  .key {{
    fill: #16213e;
    stroke: #0f3460;
    stroke-width: 1.5;
  }}
  .key.unused {{
    fill: #0d1117;
    stroke: #21262d;
    stroke-dasharray: 3 3;
  }}
  .key.transparent {{
    fill: #1a1a2e;
    stroke: #30365e;
    stroke-dasharray: 2 2;
  }}
  .key.layer {{
    fill: #2d1b4e;
    stroke: #e94560;
    stroke-width: 2;
  }}
  .key.editor {{
    fill: #4e1b2d;
    stroke: #e94560;
    stroke-width: 2;
  }}
  .key.modifier {{
    fill: #1b2e4e;
    stroke: #53a8b6;
  }}
  .label {{
    fill: #eee;
    font-family: "JetBrains Mono", "Fira Code", monospace;
    font-size: 13px;
    text-anchor: middle;
    dominant-baseline: middle;
  }}
  .label.small {{
    font-size: 10px;
  }}
  .led {{
    fill: #7a7f9a;
    font-family: monospace;
    font-size: 8px;
    text-anchor: middle;
  }}
  .layer-title {{
    fill: #e94560;
    font-size: 16px;
    font-weight: bold;
  }}
</style>
</head>
<body>
<svg width="{total_width}" height="{total_height}" xmlns="http://www.w3.org/2000/svg">
"#
    );

    for (i, &layer) in layers.iter().enumerate() {
        let y_offset = MARGIN + i as f64 * LAYER_HEIGHT + 30.0;
        html.push_str(&render_layer(layer, y_offset));
        html.push('\n');
    }

    html.push_str("</svg>\n</body>\n</html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_key_rendered_per_layer() {
        let html = generate_html();
        assert_eq!(html.matches("<rect").count(), 2 * ROWS * COLS);
        assert_eq!(html.matches(r#"class="led""#).count(), 2 * ROWS * COLS);
    }

    #[test]
    fn test_fn_layer_marks_remapped_keys() {
        let html = generate_html();
        assert!(html.contains("FN layer"));
        assert_eq!(html.matches("key editor").count(), 1);
        assert!(html.contains(">Ins<"));
        assert!(html.contains(">s9 a7<"));
    }

    #[test]
    fn test_escape() {
        assert_eq!(html_escape("<&>"), "&lt;&amp;&gt;");
    }
}
