//! Server-rendered calculator page: six inputs and three result cards.
//!
//! The page is recomputed on every request, including the first visit where
//! all inputs are at their 0.0 defaults.

use crate::features::{Feature, InputRecord};
use crate::inference::PredictionResult;

const STYLE: &str = "\
body{font-family:sans-serif;max-width:960px;margin:2em auto;padding:0 1em}\
h2,h4{text-align:center}\
form{display:grid;grid-template-columns:1fr 1fr;gap:.75em 2em}\
label{display:flex;flex-direction:column;font-weight:600}\
input{padding:.4em;font-size:1em}\
button{grid-column:span 2;padding:.6em;font-size:1em}\
.cards{display:flex;gap:1em;margin-top:2em}\
.card{flex:1;background:#639CFF;border:3px solid #639CFF;border-radius:10px;padding:0 5px;text-align:center}\
.card.error{background:#fff;color:#b00020}\
.notice{grid-column:span 2;color:#b00020;font-weight:600}\
.card h3{font-size:1.2em}";

/// Escape text for safe inclusion in HTML content and attribute values.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Render the full page for `input` and its prediction.
pub fn render(input: &InputRecord, result: &PredictionResult) -> String {
    let mut html = open_page();
    render_form(&mut html, input, None);

    html.push_str("<div class=\"cards\">");
    for (target, outcome) in result.entries() {
        let class = if outcome.is_ok() { "card" } else { "card error" };
        html.push_str(&format!(
            "<div class=\"{class}\" id=\"{key}\"><h3>{label}: {text}</h3></div>",
            key = target.key(),
            label = target.label(),
            text = escape(&outcome.to_string()),
        ));
    }
    html.push_str("</div></body></html>");
    html
}

/// Render the form with `message` above it and no result cards.
pub fn render_invalid(message: &str) -> String {
    let mut html = open_page();
    render_form(&mut html, &InputRecord::default(), Some(message));
    html.push_str("</body></html>");
    html
}

fn open_page() -> String {
    let mut html = String::with_capacity(4096);
    html.push_str("<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">");
    html.push_str("<title>NPK Calculator</title><style>");
    html.push_str(STYLE);
    html.push_str("</style></head><body>");
    html.push_str("<h2>NPK Calculator</h2><hr>");
    html.push_str("<h4>Enter the model input variables below to calculate NPK</h4>");
    html
}

fn render_form(html: &mut String, input: &InputRecord, notice: Option<&str>) {
    html.push_str("<form method=\"get\" action=\"/\">");
    if let Some(notice) = notice {
        html.push_str(&format!("<p class=\"notice\">{}</p>", escape(notice)));
    }
    for (feature, value) in input.values() {
        render_input(html, feature, value);
    }
    html.push_str("<button type=\"submit\">Calculate</button></form>");
}

fn render_input(html: &mut String, feature: Feature, value: f64) {
    html.push_str(&format!(
        "<label>{label}<input type=\"number\" step=\"any\" name=\"{key}\" value=\"{value}\"></label>",
        label = feature.label(),
        key = feature.key(),
    ));
}
