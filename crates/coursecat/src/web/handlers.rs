//! Route handlers.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;

use super::flash::{self, Flash, IncomingFlash};
use super::observe::RouteNotes;
use super::views;
use super::AppState;
use crate::catalog::{CatalogService, ValidationResult};
use crate::course::Course;
use crate::error::Error;

/// Maps storage failures to a 500 page; the cause goes to the log.
#[derive(Debug)]
pub struct AppError(Error);

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut response =
            (StatusCode::INTERNAL_SERVER_ERROR, Html(views::error_page())).into_response();
        RouteNotes::default()
            .error(self.0.to_string())
            .attach(&mut response);
        response
    }
}

type HandlerResult = Result<Response, AppError>;

/// Render a page, consuming any incoming flash cookie.
fn page(html: String, incoming: &IncomingFlash, notes: RouteNotes) -> Response {
    let mut response = Html(html).into_response();
    if incoming.present {
        response
            .headers_mut()
            .append(SET_COOKIE, flash::clear_cookie());
    }
    notes.attach(&mut response);
    response
}

/// Redirect and leave a flash message for the next page.
fn redirect_with_flash(state: &AppState, to: &str, message: &Flash, notes: RouteNotes) -> Response {
    let mut response = Redirect::to(to).into_response();
    if let Some(cookie) = flash::set_cookie(&state.flash_key.seal(message)) {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    notes.attach(&mut response);
    response
}

pub(crate) async fn index(incoming: IncomingFlash) -> Response {
    page(
        views::index_page(incoming.message()),
        &incoming,
        RouteNotes::default().event("Index Page"),
    )
}

pub(crate) async fn course_catalog(
    State(state): State<AppState>,
    incoming: IncomingFlash,
) -> HandlerResult {
    let view = state.catalog.catalog_view().await?;
    let notes = RouteNotes::default()
        .course_count(view.course_count)
        .event("Course Catalog Page");
    Ok(page(
        views::catalog_page(&view, incoming.message()),
        &incoming,
        notes,
    ))
}

pub(crate) async fn course_details(
    State(state): State<AppState>,
    Path(code): Path<String>,
    incoming: IncomingFlash,
) -> HandlerResult {
    match state.catalog.find_by_code(&code).await? {
        Some(course) => {
            let notes = RouteNotes::default()
                .course_code(course.code.clone())
                .event(format!("Course Details Page: {}", course.code));
            Ok(page(
                views::course_page(&course, incoming.message()),
                &incoming,
                notes,
            ))
        }
        None => {
            let message = format!("No course found with code '{code}'.");
            Ok(redirect_with_flash(
                &state,
                "/catalog",
                &Flash::error(message.clone()),
                RouteNotes::default().error(message),
            ))
        }
    }
}

pub(crate) async fn add_course_form(incoming: IncomingFlash) -> Response {
    page(
        views::add_course_page(incoming.message()),
        &incoming,
        RouteNotes::default().event("Add Course Page"),
    )
}

pub(crate) async fn add_course_submit(
    State(state): State<AppState>,
    Form(fields): Form<HashMap<String, String>>,
) -> HandlerResult {
    let notes = RouteNotes::default().event("Add Course Page");

    match CatalogService::validate_new_course(&fields) {
        ValidationResult::Valid => {}
        invalid @ ValidationResult::Invalid { .. } => {
            let message = invalid.message().unwrap_or_default();
            return Ok(redirect_with_flash(
                &state,
                "/add_course",
                &Flash::error(message.clone()),
                notes.error(message),
            ));
        }
    }

    let course = Course::from_fields(&fields);
    let message = format!("Course '{}' added successfully!", course.code);
    state.catalog.add(course).await?;

    Ok(redirect_with_flash(
        &state,
        "/catalog",
        &Flash::success(message.clone()),
        notes.event(message),
    ))
}
