//! HTML pages.
//!
//! Every dynamic value goes through [`escape_html`]; course codes placed in
//! links also go through [`encode_path_segment`].

use std::fmt::Write as _;

use super::flash::Flash;
use crate::catalog::CatalogView;
use crate::course::{Course, DESCRIPTION_FIELD, REQUIRED_FIELDS};

const STYLE: &str = "body{font-family:sans-serif;max-width:60rem;margin:2rem auto;padding:0 1rem}\
table{border-collapse:collapse;width:100%}th,td{border:1px solid #ccc;padding:.4rem;text-align:left}\
.flash{padding:.6rem;margin-bottom:1rem;border-radius:4px}\
.flash.error{background:#fde2e2;color:#7a1010}.flash.success{background:#e2f6e5;color:#125c1d}\
label{display:block;margin-top:.6rem}input,textarea{width:100%}";

/// Escape text for use in HTML element content and quoted attributes.
#[must_use]
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Percent-encode a value for use as a single URL path segment.
#[must_use]
pub fn encode_path_segment(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for b in input.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            out.push(char::from(b));
        } else {
            let _ = write!(out, "%{b:02X}");
        }
    }
    out
}

fn layout(title: &str, flash: Option<&Flash>, body: &str) -> String {
    let flash_html = flash.map_or_else(String::new, |f| {
        format!(
            "<div class=\"flash {}\">{}</div>",
            f.category.as_str(),
            escape_html(&f.message)
        )
    });
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{title}</title>\
<style>{STYLE}</style></head><body>\
<nav><a href=\"/\">Home</a> | <a href=\"/catalog\">Course Catalog</a> | <a href=\"/add_course\">Add Course</a></nav>\
{flash_html}{body}</body></html>",
        title = escape_html(title),
    )
}

/// Landing page.
#[must_use]
pub fn index_page(flash: Option<&Flash>) -> String {
    layout(
        "Course Catalog",
        flash,
        "<h1>Welcome to the Course Catalog</h1>\
<p>Browse the <a href=\"/catalog\">course catalog</a> or <a href=\"/add_course\">add a new course</a>.</p>",
    )
}

/// Catalog listing with the course count.
#[must_use]
pub fn catalog_page(view: &CatalogView, flash: Option<&Flash>) -> String {
    let mut rows = String::new();
    for course in &view.courses {
        let _ = write!(
            rows,
            "<tr><td><a href=\"/course/{}\">{}</a></td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            encode_path_segment(&course.code),
            escape_html(&course.code),
            escape_html(&course.name),
            escape_html(&course.instructor),
            escape_html(&course.semester),
            escape_html(&course.schedule),
        );
    }
    if rows.is_empty() {
        rows.push_str("<tr><td colspan=\"5\">No courses yet.</td></tr>");
    }

    let body = format!(
        "<h1>Course Catalog</h1><p>Total courses: <strong>{}</strong></p>\
<table><thead><tr><th>Code</th><th>Name</th><th>Instructor</th><th>Semester</th><th>Schedule</th></tr></thead>\
<tbody>{rows}</tbody></table>",
        view.course_count
    );
    layout("Course Catalog", flash, &body)
}

/// Detail page for one course.
#[must_use]
pub fn course_page(course: &Course, flash: Option<&Flash>) -> String {
    let mut dl = String::new();
    for key in REQUIRED_FIELDS.iter().copied().chain([DESCRIPTION_FIELD]) {
        let value = course.field(key).unwrap_or_default();
        let _ = write!(
            dl,
            "<dt>{}</dt><dd>{}</dd>",
            field_label(key),
            escape_html(value)
        );
    }

    let title = format!("{} - {}", course.code, course.name);
    let body = format!(
        "<h1>{}</h1><dl>{dl}</dl><p><a href=\"/catalog\">Back to catalog</a></p>",
        escape_html(&title)
    );
    layout(&title, flash, &body)
}

/// Empty add-course form.
#[must_use]
pub fn add_course_page(flash: Option<&Flash>) -> String {
    let mut inputs = String::new();
    for key in REQUIRED_FIELDS {
        let _ = write!(
            inputs,
            "<label for=\"{key}\">{}</label><input type=\"text\" id=\"{key}\" name=\"{key}\">",
            field_label(key)
        );
    }
    let _ = write!(
        inputs,
        "<label for=\"{DESCRIPTION_FIELD}\">{}</label>\
<textarea id=\"{DESCRIPTION_FIELD}\" name=\"{DESCRIPTION_FIELD}\" rows=\"4\"></textarea>",
        field_label(DESCRIPTION_FIELD)
    );

    let body = format!(
        "<h1>Add Course</h1><form method=\"post\" action=\"/add_course\">{inputs}\
<p><button type=\"submit\">Add Course</button></p></form>"
    );
    layout("Add Course", flash, &body)
}

/// Generic failure page; details stay in the logs.
#[must_use]
pub fn error_page() -> String {
    layout(
        "Internal Server Error",
        None,
        "<h1>Internal Server Error</h1><p>The request could not be completed.</p>",
    )
}

fn field_label(key: &str) -> &'static str {
    match key {
        "code" => "Course Code",
        "name" => "Course Name",
        "instructor" => "Instructor",
        "semester" => "Semester",
        "schedule" => "Schedule",
        "classroom" => "Classroom",
        "prerequisites" => "Prerequisites",
        "grading" => "Grading",
        DESCRIPTION_FIELD => "Description",
        _ => "",
    }
}
