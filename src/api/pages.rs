//! Server-rendered HTML for the browser front end

use super::models::ClipForm;
use crate::outputs::RunListing;
use crate::state::RunOutcome;

const STYLE: &str = r#"
        body { font-family: Arial, sans-serif; margin: 40px; max-width: 760px; }
        label { display: block; margin: 12px 0 4px; }
        input[type=text], input[type=number] { width: 100%; padding: 6px; }
        .error { background: #fde8e8; color: #9b1c1c; padding: 10px; margin: 10px 0; }
        .run { background: #f5f5f5; padding: 10px; margin: 10px 0; }
        .partial { color: #9b1c1c; }
        code { background: #e8e8e8; padding: 2px 4px; }
"#;

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{title}</title>
    <style>{style}</style>
</head>
<body>
{body}
</body>
</html>
"#,
        title = escape_html(title),
        style = STYLE,
        body = body
    )
}

/// Clip request form, optionally showing the error of the last submission
pub fn form_page(error: Option<&str>, form: &ClipForm, default_duration: u32) -> String {
    let error_block = error
        .map(|message| format!(r#"    <div class="error">{}</div>"#, escape_html(message)))
        .unwrap_or_default();

    let duration = form
        .duration
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| default_duration.to_string());
    let checked = if form.burn_subtitles() { " checked" } else { "" };

    let body = format!(
        r#"    <h1>Keyword Clipper</h1>
    <p>Cut a clip around every moment a keyword is spoken.</p>
{error_block}
    <form method="post" action="/">
        <label for="source">Video URL</label>
        <input type="text" id="source" name="source" value="{source}" required>
        <label for="keyword">Keyword</label>
        <input type="text" id="keyword" name="keyword" value="{keyword}" required>
        <label for="duration">Clip duration (seconds)</label>
        <input type="number" id="duration" name="duration" min="1" value="{duration}">
        <label><input type="checkbox" name="subtitles"{checked}> Burn in subtitles</label>
        <p><button type="submit">Make clips</button></p>
    </form>
    <p><a href="/download">Browse produced clips</a></p>"#,
        error_block = error_block,
        source = escape_html(&form.source),
        keyword = escape_html(&form.keyword),
        duration = escape_html(&duration),
        checked = checked
    );

    layout("Keyword Clipper", &body)
}

/// Listing of every run and its downloadable clips
pub fn downloads_page(listings: &[RunListing]) -> String {
    let mut body = String::from("    <h1>Produced clips</h1>\n    <p><a href=\"/\">New request</a></p>\n");

    if listings.is_empty() {
        body.push_str("    <p>No clips yet.</p>\n");
    }

    for listing in listings {
        body.push_str("    <div class=\"run\">\n");
        body.push_str(&format!("        <h3><code>{}</code></h3>\n", escape_html(&listing.run_id)));

        if let Some(manifest) = &listing.manifest {
            body.push_str(&format!(
                "        <p>Keyword <strong>{}</strong> in {}</p>\n",
                escape_html(&manifest.keyword),
                escape_html(manifest.title.as_deref().unwrap_or(&manifest.source))
            ));
            if let RunOutcome::Failed { message, .. } = &manifest.outcome {
                body.push_str(&format!(
                    "        <p class=\"partial\">Incomplete run: {}</p>\n",
                    escape_html(message)
                ));
            }
        }

        if listing.clips.is_empty() {
            body.push_str("        <p>No clips.</p>\n");
        } else {
            body.push_str("        <ul>\n");
            for clip in &listing.clips {
                body.push_str(&format!(
                    "            <li><a href=\"/files/{}/{}\">{}</a></li>\n",
                    escape_html(&listing.run_id),
                    escape_html(clip),
                    escape_html(clip)
                ));
            }
            body.push_str("        </ul>\n");
        }
        body.push_str("    </div>\n");
    }

    layout("Produced clips", &body)
}

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
