// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTML for the browser form.  One page: a login form when a password is
// required, otherwise the printer picker and upload form.  Every dynamic
// value goes through `escape`.

use std::fmt::Write;

use printgate_core::human_errors::HumanError;

/// Result banner shown above the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Banner {
    Printed { job_id: Option<String> },
    Failed(HumanError),
}

impl Banner {
    fn colors(&self) -> (&'static str, &'static str) {
        match self {
            Self::Printed { .. } => ("#155724", "#d4edda"),
            Self::Failed(_) => ("#721c24", "#f8d7da"),
        }
    }
}

/// Everything the page needs, borrowed from state and session.
#[derive(Debug)]
pub struct PageView<'a> {
    pub csrf: &'a str,
    pub printers: &'a [String],
    pub selected: Option<&'a str>,
    pub allowed_mime_types: &'a [String],
    pub max_upload_mb: u64,
    /// Password configured and session not yet authenticated.
    pub show_login: bool,
    /// Password configured and session authenticated.
    pub show_logout: bool,
    pub banner: Option<Banner>,
}

/// Minimal HTML escaping for text and attribute values.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn page(view: &PageView<'_>) -> String {
    let mut body = String::new();

    if let Some(banner) = &view.banner {
        body.push_str(&banner_html(banner));
    }

    let csrf = escape(view.csrf);
    if view.show_login {
        let _ = write!(
            body,
            r#"<form method="post" action="/login">
  <input type="hidden" name="csrf" value="{csrf}">
  <label>Password <input type="password" name="password" autofocus></label>
  <button type="submit">Sign in</button>
</form>
"#
        );
    } else {
        body.push_str(&print_form(view, &csrf));
        if view.show_logout {
            let _ = write!(
                body,
                r#"<form method="post" action="/logout">
  <input type="hidden" name="csrf" value="{csrf}">
  <button type="submit">Sign out</button>
</form>
"#
            );
        }
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Printgate</title>
<style>
body {{ font-family: system-ui, sans-serif; max-width: 32rem; margin: 2rem auto; padding: 0 1rem; }}
form {{ margin: 1rem 0; }}
label {{ display: block; margin: 0.5rem 0; }}
.banner {{ padding: 0.75rem 1rem; border-radius: 6px; }}
</style>
</head>
<body>
<h1>Printgate</h1>
{body}</body>
</html>
"#
    )
}

fn print_form(view: &PageView<'_>, csrf: &str) -> String {
    if view.printers.is_empty() {
        return "<p>No printers are configured.</p>\n".into();
    }

    let mut options = String::new();
    for printer in view.printers {
        let name = escape(printer);
        let selected = if Some(printer.as_str()) == view.selected {
            " selected"
        } else {
            ""
        };
        let _ = writeln!(options, r#"    <option value="{name}"{selected}>{name}</option>"#);
    }
    let accept = escape(&view.allowed_mime_types.join(","));
    let max = view.max_upload_mb;

    format!(
        r#"<form method="post" action="/printer">
  <input type="hidden" name="csrf" value="{csrf}">
  <label>Printer
  <select name="printer">
{options}  </select></label>
  <button type="submit">Remember printer</button>
</form>
<form method="post" action="/" enctype="multipart/form-data">
  <input type="hidden" name="csrf" value="{csrf}">
  <label>Document (up to {max} MB) <input type="file" name="file" accept="{accept}" required></label>
  <button type="submit">Print</button>
</form>
"#
    )
}

fn banner_html(banner: &Banner) -> String {
    let (fg, bg) = banner.colors();
    let text = match banner {
        Banner::Printed { job_id: Some(id) } => {
            format!("<strong>Print job sent.</strong> Job number {}.", escape(id))
        }
        Banner::Printed { job_id: None } => "<strong>Print job sent.</strong>".into(),
        Banner::Failed(err) => format!(
            "<strong>{}</strong> {}",
            escape(&err.message),
            escape(&err.suggestion)
        ),
    };
    format!(
        "<div class=\"banner\" role=\"status\" style=\"color: {fg}; background: {bg};\">{text}</div>\n"
    )
}
