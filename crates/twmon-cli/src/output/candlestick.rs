//! Standalone HTML page with an SVG candlestick chart.
//!
//! Colours follow the Taiwan convention: red for up sessions, green for down.

use std::fmt::Write as _;

use twmon_core::indicators::rolling_close_avg;
use twmon_core::{Observation, StockReport};

const WIDTH: f64 = 960.0;
const PRICE_HEIGHT: f64 = 360.0;
const VOLUME_HEIGHT: f64 = 100.0;
const GAP: f64 = 20.0;
const MARGIN_LEFT: f64 = 64.0;
const MARGIN_RIGHT: f64 = 16.0;
const MARGIN_TOP: f64 = 16.0;
const MARGIN_BOTTOM: f64 = 28.0;

const UP_COLOUR: &str = "#d62728";
const DOWN_COLOUR: &str = "#2ca02c";
const OVERLAY_COLOURS: [&str; 4] = ["#1f77b4", "#ff7f0e", "#9467bd", "#8c564b"];

pub fn render_html(report: &StockReport, overlay_windows: &[usize]) -> String {
    let title = format!("{} {} ({})", report.stock_id, report.name, report.ticker);
    let svg = render_svg(report.series.observations(), overlay_windows);

    format!(
        "<!DOCTYPE html>\n<html lang=\"zh-Hant\">\n<head>\n<meta charset=\"utf-8\">\n\
<title>{title}</title>\n<style>body{{font-family:sans-serif;margin:24px}}\
.legend span{{margin-right:16px}}</style>\n</head>\n<body>\n<h1>{title}</h1>\n{svg}\n\
<p class=\"legend\">{legend}</p>\n<p><a href=\"{url}\">{url}</a></p>\n</body>\n</html>\n",
        title = escape(&title),
        svg = svg,
        legend = legend(overlay_windows),
        url = escape(&report.reference_url),
    )
}

fn legend(overlay_windows: &[usize]) -> String {
    overlay_windows
        .iter()
        .zip(OVERLAY_COLOURS.iter().cycle())
        .map(|(window, colour)| format!("<span style=\"color:{colour}\">MA{window}</span>"))
        .collect::<Vec<_>>()
        .join("")
}

pub fn render_svg(observations: &[Observation], overlay_windows: &[usize]) -> String {
    let height = MARGIN_TOP + PRICE_HEIGHT + GAP + VOLUME_HEIGHT + MARGIN_BOTTOM;
    let mut svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{WIDTH}\" height=\"{height}\" \
viewBox=\"0 0 {WIDTH} {height}\">\n"
    );

    if observations.is_empty() {
        svg.push_str("<text x=\"20\" y=\"40\">no observations</text>\n</svg>");
        return svg;
    }

    let low = observations
        .iter()
        .map(|observation| observation.low)
        .fold(f64::INFINITY, f64::min);
    let high = observations
        .iter()
        .map(|observation| observation.high)
        .fold(f64::NEG_INFINITY, f64::max);
    let max_volume = observations
        .iter()
        .map(|observation| observation.volume)
        .max()
        .unwrap_or(0)
        .max(1) as f64;

    let span = if high > low { high - low } else { 1.0 };
    let plot_width = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let step = plot_width / observations.len() as f64;
    let body_width = (step * 0.6).max(1.0);
    let price_y = |price: f64| MARGIN_TOP + (high - price) / span * PRICE_HEIGHT;
    let volume_base = MARGIN_TOP + PRICE_HEIGHT + GAP + VOLUME_HEIGHT;
    let centre = |index: usize| MARGIN_LEFT + step * (index as f64 + 0.5);

    // price axis: high, mid, low
    for price in [high, (high + low) / 2.0, low] {
        let y = price_y(price);
        let _ = writeln!(
            svg,
            "<line x1=\"{MARGIN_LEFT}\" y1=\"{y:.1}\" x2=\"{:.1}\" y2=\"{y:.1}\" stroke=\"#ddd\"/>\
<text x=\"4\" y=\"{:.1}\" font-size=\"11\">{price:.2}</text>",
            WIDTH - MARGIN_RIGHT,
            y + 4.0
        );
    }

    for (index, observation) in observations.iter().enumerate() {
        let x = centre(index);
        let colour = if observation.close >= observation.open {
            UP_COLOUR
        } else {
            DOWN_COLOUR
        };
        let top = price_y(observation.open.max(observation.close));
        let bottom = price_y(observation.open.min(observation.close));
        let volume_height = observation.volume as f64 / max_volume * VOLUME_HEIGHT;

        let _ = writeln!(
            svg,
            "<g><title>{date} O {open:.2} H {high:.2} L {low:.2} C {close:.2} V {volume}</title>\
<line x1=\"{x:.1}\" y1=\"{wick_top:.1}\" x2=\"{x:.1}\" y2=\"{wick_bottom:.1}\" stroke=\"{colour}\"/>\
<rect x=\"{left:.1}\" y=\"{top:.1}\" width=\"{body_width:.1}\" height=\"{body_height:.1}\" fill=\"{colour}\"/>\
<rect x=\"{left:.1}\" y=\"{volume_top:.1}\" width=\"{body_width:.1}\" height=\"{volume_height:.1}\" fill=\"{colour}\" opacity=\"0.5\"/></g>",
            date = observation.date,
            open = observation.open,
            high = observation.high,
            low = observation.low,
            close = observation.close,
            volume = observation.volume,
            wick_top = price_y(observation.high),
            wick_bottom = price_y(observation.low),
            left = x - body_width / 2.0,
            body_height = (bottom - top).max(1.0),
            volume_top = volume_base - volume_height,
        );
    }

    for (window, colour) in overlay_windows.iter().zip(OVERLAY_COLOURS.iter().cycle()) {
        let points = (0..observations.len())
            .filter_map(|index| {
                rolling_close_avg(&observations[..=index], *window)
                    .map(|average| format!("{:.1},{:.1}", centre(index), price_y(average)))
            })
            .collect::<Vec<_>>();
        if points.len() > 1 {
            let _ = writeln!(
                svg,
                "<polyline fill=\"none\" stroke=\"{colour}\" stroke-width=\"1.5\" points=\"{}\"/>",
                points.join(" ")
            );
        }
    }

    if let (Some(first), Some(last)) = (observations.first(), observations.last()) {
        let y = height - 8.0;
        let _ = writeln!(
            svg,
            "<text x=\"{MARGIN_LEFT}\" y=\"{y}\" font-size=\"11\">{}</text>\
<text x=\"{:.1}\" y=\"{y}\" font-size=\"11\" text-anchor=\"end\">{}</text>",
            first.date,
            WIDTH - MARGIN_RIGHT,
            last.date
        );
    }

    svg.push_str("</svg>");
    svg
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
