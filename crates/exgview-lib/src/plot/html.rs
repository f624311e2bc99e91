//! Plotly.js rendering of a [`Figure`] as a standalone HTML page.
//!
//! The chart data and layout are embedded as JSON; the Plotly runtime itself
//! is pulled from `plotly_src` (a CDN by default), so the page needs network
//! access to render.

use super::{AxisSide, Figure, PlotBackend};
use crate::error::{ExgError, Result};
use serde_json::{json, Value};
use std::io::Write;

pub const DEFAULT_PLOTLY_SRC: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// Id of the `<script type="application/json">` element holding the chart.
pub const DATA_ELEMENT_ID: &str = "exgview-data";

pub struct PlotlyHtml<W: Write> {
    writer: W,
    plotly_src: String,
}

impl<W: Write> PlotlyHtml<W> {
    pub fn new(writer: W) -> Self {
        Self::with_source(writer, DEFAULT_PLOTLY_SRC)
    }

    pub fn with_source(writer: W, plotly_src: impl Into<String>) -> Self {
        Self {
            writer,
            plotly_src: plotly_src.into(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> PlotBackend for PlotlyHtml<W> {
    fn draw(&mut self, fig: &Figure) -> Result<()> {
        let page = render_page(fig, &self.plotly_src)?;
        self.writer
            .write_all(page.as_bytes())
            .and_then(|_| self.writer.flush())
            .map_err(|e| ExgError::Render(e.to_string()))
    }
}

fn trace_json(fig: &Figure) -> Vec<Value> {
    fig.series
        .iter()
        .map(|series| {
            let mut line = json!({
                "color": series.style.color.hex(),
                "width": series.style.width,
            });
            if series.style.dash.is_some() {
                line["dash"] = json!("dot");
            }
            let axis = match series.axis {
                AxisSide::Primary => "y",
                AxisSide::Secondary => "y2",
            };
            json!({
                "type": "scatter",
                "mode": "lines",
                "name": series.name,
                "y": series.y,
                "yaxis": axis,
                "line": line,
            })
        })
        .collect()
}

fn layout_json(fig: &Figure) -> Value {
    let buttons: Vec<Value> = fig
        .presets
        .iter()
        .map(|preset| {
            json!({
                "label": preset.label,
                "method": "update",
                "args": [{ "visible": preset.visible }],
            })
        })
        .collect();
    json!({
        "title": { "text": fig.title.clone().unwrap_or_default() },
        "height": fig.height,
        "hovermode": "x unified",
        "legend": {
            "orientation": "h",
            "yanchor": "bottom",
            "y": 1.02,
            "xanchor": "right",
            "x": 1,
        },
        "xaxis": {
            "title": { "text": fig.x.label },
            "rangeslider": { "visible": true },
        },
        "yaxis": {
            "title": { "text": fig.y.label },
        },
        "yaxis2": {
            "title": { "text": fig.y2.label },
            "overlaying": "y",
            "side": "right",
        },
        "updatemenus": [{
            "type": "buttons",
            "direction": "right",
            "x": 0.01,
            "y": 1.1,
            "buttons": buttons,
        }],
    })
}

/// JSON payload embedded in the page: shared time axis, traces and layout.
pub fn chart_payload(fig: &Figure) -> Value {
    json!({
        "time": fig.time,
        "traces": trace_json(fig),
        "layout": layout_json(fig),
    })
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render the full HTML document for `fig`.
pub fn render_page(fig: &Figure, plotly_src: &str) -> Result<String> {
    let payload = serde_json::to_string(&chart_payload(fig))
        .map_err(|e| ExgError::Render(e.to_string()))?
        .replace("</", "<\\/");
    let title = escape_html(fig.title.as_deref().unwrap_or("exgview"));
    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <script src="{src}"></script>
    <style>
        body {{ margin: 0; font-family: -apple-system, 'Segoe UI', Helvetica, Arial, sans-serif; }}
        #chart {{ width: 100%; }}
    </style>
</head>
<body>
    <div id="chart"></div>
    <script type="application/json" id="{data_id}">{payload}</script>
    <script>
        const spec = JSON.parse(document.getElementById("{data_id}").textContent);
        const traces = spec.traces.map((trace) => Object.assign({{ x: spec.time }}, trace));
        Plotly.newPlot("chart", traces, spec.layout, {{ responsive: true, scrollZoom: true }});
    </script>
</body>
</html>
"#,
        title = title,
        src = escape_html(plotly_src),
        data_id = DATA_ELEMENT_ID,
        payload = payload,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ChannelRole;
    use crate::plot::{Color, Series, Style};
    use crate::table::Cell;

    fn figure() -> Figure {
        let mut fig = Figure::new(Some("Session <1>".to_string()));
        fig.time = vec![Cell::Number(0.0), Cell::Number(0.5), Cell::Missing];
        fig.add_series(Series {
            name: "Fz".into(),
            column: "Fz".into(),
            role: ChannelRole::Eeg,
            axis: AxisSide::Primary,
            y: vec![Some(1.0), None, Some(3.0)],
            style: Style {
                width: 1.0,
                dash: None,
                color: Color(0x1F77B4),
            },
        });
        fig.add_series(Series {
            name: "CM (mV, CM)".into(),
            column: "CM".into(),
            role: ChannelRole::CommonMode,
            axis: AxisSide::Secondary,
            y: vec![Some(0.001), Some(0.002), Some(0.003)],
            style: Style {
                width: 1.4,
                dash: Some([2.0, 2.0]),
                color: Color(0xFF7F0E),
            },
        });
        fig.build_presets();
        fig
    }

    fn embedded_payload(page: &str) -> Value {
        let open = format!(r#"id="{}">"#, DATA_ELEMENT_ID);
        let start = page.find(&open).expect("data element") + open.len();
        let end = start + page[start..].find("</script>").expect("closing tag");
        serde_json::from_str(&page[start..end]).expect("payload json")
    }

    #[test]
    fn payload_maps_axes_and_styles() {
        let payload = chart_payload(&figure());
        let traces = payload["traces"].as_array().unwrap();
        assert_eq!(traces.len(), 2);
        assert_eq!(traces[0]["yaxis"], "y");
        assert_eq!(traces[1]["yaxis"], "y2");
        assert_eq!(traces[1]["line"]["dash"], "dot");
        assert!(traces[0]["line"].get("dash").is_none());
        assert_eq!(traces[0]["y"], json!([1.0, null, 3.0]));
        assert_eq!(payload["time"], json!([0.0, 0.5, null]));
    }

    #[test]
    fn layout_carries_axes_and_buttons() {
        let payload = chart_payload(&figure());
        let layout = &payload["layout"];
        assert_eq!(layout["yaxis"]["title"]["text"], "EEG (µV)");
        assert_eq!(layout["yaxis2"]["title"]["text"], "ECG / CM (mV)");
        assert_eq!(layout["yaxis2"]["overlaying"], "y");
        assert_eq!(layout["xaxis"]["title"]["text"], "Time (s)");
        assert_eq!(layout["xaxis"]["rangeslider"]["visible"], true);
        assert_eq!(layout["hovermode"], "x unified");
        let buttons = layout["updatemenus"][0]["buttons"].as_array().unwrap();
        let labels: Vec<&str> = buttons.iter().map(|b| b["label"].as_str().unwrap()).collect();
        assert_eq!(labels, vec!["All", "EEG only", "ECG+CM only", "Hide all"]);
        assert_eq!(buttons[1]["args"][0]["visible"], json!([true, false]));
    }

    #[test]
    fn page_references_cdn_and_escapes_title() {
        let page = render_page(&figure(), DEFAULT_PLOTLY_SRC).unwrap();
        assert!(page.contains(r#"<script src="https://cdn.plot.ly/plotly-2.35.2.min.js">"#));
        assert!(page.contains("<title>Session &lt;1&gt;</title>"));
        let payload = embedded_payload(&page);
        assert_eq!(payload["layout"]["title"]["text"], "Session <1>");
    }

    #[test]
    fn script_close_tags_in_names_are_escaped() {
        let mut fig = figure();
        fig.series[0].name = "</script><b>".into();
        let page = render_page(&fig, DEFAULT_PLOTLY_SRC).unwrap();
        let payload = embedded_payload(&page);
        assert_eq!(payload["traces"][0]["name"], "</script><b>");
    }

    #[test]
    fn backend_writes_page() {
        let mut backend = PlotlyHtml::new(Vec::new());
        backend.draw(&figure()).unwrap();
        let page = String::from_utf8(backend.into_inner()).unwrap();
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("Plotly.newPlot"));
    }
}
