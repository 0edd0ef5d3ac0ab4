//! Minimal SVG drawing for bar, grouped bar and pie charts.

use std::f64::consts::PI;

const WIDTH: f64 = 960.0;
const HEIGHT: f64 = 560.0;
const PLOT_LEFT: f64 = 90.0;
const PLOT_RIGHT: f64 = WIDTH - 40.0;
const PLOT_TOP: f64 = 70.0;
const PLOT_BOTTOM: f64 = HEIGHT - 120.0;
const Y_TICKS: usize = 5;

pub(super) const PALETTE: &[&str] = &[
    "#440154", "#3b528b", "#21918c", "#5ec962", "#fde725", "#e76f51", "#8d99ae", "#f4a261",
    "#2a9d8f", "#b5179e",
];

pub(super) struct Series<'a> {
    pub(super) name: &'a str,
    pub(super) color: &'a str,
    pub(super) values: Vec<f64>,
}

pub(super) struct BarChart<'a> {
    pub(super) title: &'a str,
    pub(super) x_label: &'a str,
    pub(super) y_label: &'a str,
    pub(super) labels: Vec<String>,
    pub(super) series: Vec<Series<'a>>,
}

pub(super) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn open_document(title: &str) -> String {
    let mut doc = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{WIDTH}\" height=\"{HEIGHT}\" \
         viewBox=\"0 0 {WIDTH} {HEIGHT}\" font-family=\"sans-serif\">\n"
    );
    doc.push_str(&format!(
        "<rect width=\"{WIDTH}\" height=\"{HEIGHT}\" fill=\"#ffffff\"/>\n"
    ));
    doc.push_str(&format!(
        "<text x=\"{:.1}\" y=\"36\" font-size=\"20\" text-anchor=\"middle\">{}</text>\n",
        WIDTH / 2.0,
        escape(title)
    ));
    doc
}

fn close_document(mut doc: String) -> String {
    doc.push_str("</svg>\n");
    doc
}

/// Bars per label, one bar for each series. A single series draws a plain
/// bar chart; more than one adds a legend.
pub(super) fn bar_chart(chart: &BarChart<'_>) -> String {
    let mut doc = open_document(chart.title);

    let max = chart
        .series
        .iter()
        .flat_map(|s| s.values.iter().copied())
        .fold(0.0_f64, f64::max);
    let max = if max > 0.0 { max } else { 1.0 };
    let plot_height = PLOT_BOTTOM - PLOT_TOP;
    let plot_width = PLOT_RIGHT - PLOT_LEFT;

    // Gridlines and y tick labels
    for i in 0..=Y_TICKS {
        let fraction = i as f64 / Y_TICKS as f64;
        let y = PLOT_BOTTOM - fraction * plot_height;
        doc.push_str(&format!(
            "<line x1=\"{PLOT_LEFT}\" y1=\"{y:.1}\" x2=\"{PLOT_RIGHT}\" y2=\"{y:.1}\" stroke=\"#e0e0e0\"/>\n"
        ));
        doc.push_str(&format!(
            "<text x=\"{:.1}\" y=\"{:.1}\" font-size=\"11\" text-anchor=\"end\">{:.0}</text>\n",
            PLOT_LEFT - 8.0,
            y + 4.0,
            max * fraction
        ));
    }

    let groups = chart.labels.len().max(1);
    let slot = plot_width / groups as f64;
    let series_count = chart.series.len().max(1);
    let bar_width = slot * 0.7 / series_count as f64;

    for (i, label) in chart.labels.iter().enumerate() {
        let slot_left = PLOT_LEFT + i as f64 * slot;
        for (j, series) in chart.series.iter().enumerate() {
            let value = series.values.get(i).copied().unwrap_or(0.0).max(0.0);
            let h = value / max * plot_height;
            let x = slot_left + slot * 0.15 + j as f64 * bar_width;
            doc.push_str(&format!(
                "<rect x=\"{x:.1}\" y=\"{:.1}\" width=\"{bar_width:.1}\" height=\"{h:.1}\" fill=\"{}\">\
                 <title>{}: {value:.2}</title></rect>\n",
                PLOT_BOTTOM - h,
                series.color,
                escape(label),
            ));
        }
        let cx = slot_left + slot / 2.0;
        let ly = PLOT_BOTTOM + 16.0;
        doc.push_str(&format!(
            "<text x=\"{cx:.1}\" y=\"{ly:.1}\" font-size=\"11\" text-anchor=\"end\" \
             transform=\"rotate(-45 {cx:.1} {ly:.1})\">{}</text>\n",
            escape(label)
        ));
    }

    // Axes
    doc.push_str(&format!(
        "<line x1=\"{PLOT_LEFT}\" y1=\"{PLOT_TOP}\" x2=\"{PLOT_LEFT}\" y2=\"{PLOT_BOTTOM}\" stroke=\"#333\"/>\n"
    ));
    doc.push_str(&format!(
        "<line x1=\"{PLOT_LEFT}\" y1=\"{PLOT_BOTTOM}\" x2=\"{PLOT_RIGHT}\" y2=\"{PLOT_BOTTOM}\" stroke=\"#333\"/>\n"
    ));
    doc.push_str(&format!(
        "<text x=\"{:.1}\" y=\"{:.1}\" font-size=\"13\" text-anchor=\"middle\">{}</text>\n",
        PLOT_LEFT + plot_width / 2.0,
        HEIGHT - 12.0,
        escape(chart.x_label)
    ));
    let y_mid = PLOT_TOP + plot_height / 2.0;
    doc.push_str(&format!(
        "<text x=\"24\" y=\"{y_mid:.1}\" font-size=\"13\" text-anchor=\"middle\" \
         transform=\"rotate(-90 24 {y_mid:.1})\">{}</text>\n",
        escape(chart.y_label)
    ));

    if chart.series.len() > 1 {
        for (j, series) in chart.series.iter().enumerate() {
            let y = PLOT_TOP + j as f64 * 20.0;
            doc.push_str(&format!(
                "<rect x=\"{:.1}\" y=\"{:.1}\" width=\"12\" height=\"12\" fill=\"{}\"/>\n\
                 <text x=\"{:.1}\" y=\"{:.1}\" font-size=\"12\">{}</text>\n",
                PLOT_RIGHT - 110.0,
                y - 10.0,
                series.color,
                PLOT_RIGHT - 92.0,
                y,
                escape(series.name)
            ));
        }
    }

    close_document(doc)
}

/// Pie with a legend listing each slice's share.
pub(super) fn pie_chart(title: &str, labels: &[String], values: &[f64]) -> String {
    let mut doc = open_document(title);

    let total: f64 = values.iter().map(|v| v.max(0.0)).sum();
    let (cx, cy, r) = (WIDTH * 0.35, HEIGHT / 2.0 + 20.0, 210.0);
    let mut angle = -PI / 2.0;

    for (i, (label, value)) in labels.iter().zip(values).enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        let share = if total > 0.0 { value.max(0.0) / total } else { 0.0 };
        let sweep = share * 2.0 * PI;

        if share >= 0.999_999 {
            doc.push_str(&format!(
                "<circle cx=\"{cx:.1}\" cy=\"{cy:.1}\" r=\"{r:.1}\" fill=\"{color}\"/>\n"
            ));
        } else if sweep > 0.0 {
            let (x0, y0) = (cx + r * angle.cos(), cy + r * angle.sin());
            let end = angle + sweep;
            let (x1, y1) = (cx + r * end.cos(), cy + r * end.sin());
            let large_arc = u8::from(sweep > PI);
            doc.push_str(&format!(
                "<path d=\"M {cx:.1} {cy:.1} L {x0:.2} {y0:.2} A {r:.1} {r:.1} 0 {large_arc} 1 {x1:.2} {y1:.2} Z\" \
                 fill=\"{color}\" stroke=\"#ffffff\"/>\n"
            ));
        }
        angle += sweep;

        let ly = 90.0 + i as f64 * 22.0;
        let lx = WIDTH * 0.68;
        doc.push_str(&format!(
            "<rect x=\"{lx:.1}\" y=\"{:.1}\" width=\"14\" height=\"14\" fill=\"{color}\"/>\n\
             <text x=\"{:.1}\" y=\"{ly:.1}\" font-size=\"13\">{} ({:.1}%)</text>\n",
            ly - 12.0,
            lx + 22.0,
            escape(label),
            share * 100.0
        ));
    }

    close_document(doc)
}
