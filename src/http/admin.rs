//! 使用者管理頁面，僅限 staff

use crate::core::users::{AdminUserChange, AdminUserCreation};
use crate::domain::model::User;
use crate::http::auth::StaffUser;
use crate::http::AppState;
use crate::utils::error::{AppError, FieldErrors, Result};
use askama::Template;
use axum::extract::{Path, State};
use axum::http::header::LOCATION;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Form, Router};
use std::collections::HashMap;

pub const CHANGELIST_PATH: &str = "/admin/core/user/";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/", get(index))
        .route(CHANGELIST_PATH, get(changelist))
        .route("/admin/core/user/add/", get(add_form).post(add_user))
        .route(
            "/admin/core/user/:id/change/",
            get(change_form).post(change_user),
        )
}

fn change_path(id: u64) -> String {
    format!("{}{}/change/", CHANGELIST_PATH, id)
}

fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}

fn error_lines(errors: &FieldErrors) -> Vec<String> {
    errors
        .iter()
        .flat_map(|(field, messages)| {
            messages
                .iter()
                .map(move |message| format!("{}: {}", field, message))
        })
        .collect()
}

fn checkbox(form: &HashMap<String, String>, name: &str) -> bool {
    form.get(name)
        .map(|value| !matches!(value.as_str(), "" | "0" | "false" | "off"))
        .unwrap_or(false)
}

fn field(form: &HashMap<String, String>, name: &str) -> String {
    form.get(name).cloned().unwrap_or_default()
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Site administration</title></head>
<body>
  <header>Signed in as {{ staff }}</header>
  <h1>Site administration</h1>
  <table>
    <caption>Core</caption>
    <tr><th><a href="/admin/core/user/">Users</a></th><td><a href="/admin/core/user/add/">Add</a></td></tr>
  </table>
</body>
</html>"#,
    ext = "html"
)]
struct IndexTemplate<'a> {
    staff: &'a str,
}

struct UserRow {
    id: u64,
    email: String,
    first_name: String,
    last_name: String,
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Select user to change</title></head>
<body>
  <h1>Select user to change</h1>
  <a href="/admin/core/user/add/">Add user</a>
  <table id="result_list">
    <thead><tr><th>Email</th><th>First name</th><th>Last name</th></tr></thead>
    <tbody>
    {% for row in rows %}
      <tr><th><a href="/admin/core/user/{{ row.id }}/change/">{{ row.email }}</a></th><td>{{ row.first_name }}</td><td>{{ row.last_name }}</td></tr>
    {% endfor %}
    </tbody>
  </table>
  <p>{{ rows.len() }} users</p>
</body>
</html>"#,
    ext = "html"
)]
struct ChangeListTemplate {
    rows: Vec<UserRow>,
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Add user</title></head>
<body>
  <h1>Add user</h1>
  {% if !errors.is_empty() %}
  <ul class="errorlist">{% for error in errors %}<li>{{ error }}</li>{% endfor %}</ul>
  {% endif %}
  <form method="post" action="/admin/core/user/add/">
    <fieldset>
      <label for="id_email">Email</label>
      <input type="email" name="email" id="id_email" value="{{ email }}" required>
      <label for="id_password1">Password</label>
      <input type="password" name="password1" id="id_password1" required>
      <label for="id_password2">Password confirmation</label>
      <input type="password" name="password2" id="id_password2" required>
    </fieldset>
    <input type="submit" value="Save">
  </form>
</body>
</html>"#,
    ext = "html"
)]
struct AddFormTemplate {
    email: String,
    errors: Vec<String>,
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Change user</title></head>
<body>
  <h1>Change user</h1>
  <h2>{{ user.email }}</h2>
  {% if !errors.is_empty() %}
  <ul class="errorlist">{% for error in errors %}<li>{{ error }}</li>{% endfor %}</ul>
  {% endif %}
  <form method="post" action="/admin/core/user/{{ user.id }}/change/">
    <fieldset>
      <label for="id_email">Email</label>
      <input type="email" name="email" id="id_email" value="{{ user.email }}" required>
      <label>Password</label>
      <div class="readonly">algorithm: {{ algorithm }}</div>
      <label for="id_first_name">First name</label>
      <input type="text" name="first_name" id="id_first_name" value="{{ user.first_name }}">
      <label for="id_last_name">Last name</label>
      <input type="text" name="last_name" id="id_last_name" value="{{ user.last_name }}">
    </fieldset>
    <fieldset>
      <legend>Permissions</legend>
      <input type="checkbox" name="is_active" id="id_is_active"{% if user.is_active %} checked{% endif %}><label for="id_is_active">Active</label>
      <input type="checkbox" name="is_staff" id="id_is_staff"{% if user.is_staff %} checked{% endif %}><label for="id_is_staff">Staff status</label>
      <input type="checkbox" name="is_superuser" id="id_is_superuser"{% if user.is_superuser %} checked{% endif %}><label for="id_is_superuser">Superuser status</label>
    </fieldset>
    <fieldset>
      <legend>Important Dates</legend>
      <label>Last login</label>
      <div class="readonly">{{ last_login }}</div>
    </fieldset>
    <input type="submit" value="Save">
  </form>
</body>
</html>"#,
    ext = "html"
)]
struct ChangeFormTemplate<'a> {
    user: &'a User,
    algorithm: &'a str,
    last_login: String,
    errors: Vec<String>,
}

impl<'a> ChangeFormTemplate<'a> {
    fn new(user: &'a User, errors: Vec<String>) -> Self {
        Self {
            user,
            algorithm: user.password_hash.split('$').nth(1).unwrap_or("unknown"),
            last_login: user
                .last_login
                .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string()),
            errors,
        }
    }
}

async fn index(StaffUser(staff): StaffUser) -> Result<Html<String>> {
    Ok(Html(IndexTemplate { staff: &staff.email }.render()?))
}

async fn changelist(State(state): State<AppState>, _staff: StaffUser) -> Result<Html<String>> {
    let mut users = state.users.all().await?;
    users.sort_by_key(|user| user.id);

    let rows = users
        .into_iter()
        .map(|user| UserRow {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
        })
        .collect();
    Ok(Html(ChangeListTemplate { rows }.render()?))
}

async fn add_form(_staff: StaffUser) -> Result<Html<String>> {
    let page = AddFormTemplate {
        email: String::new(),
        errors: Vec::new(),
    };
    Ok(Html(page.render()?))
}

async fn add_user(
    State(state): State<AppState>,
    _staff: StaffUser,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Response> {
    let creation = AdminUserCreation {
        email: field(&form, "email"),
        password1: field(&form, "password1"),
        password2: field(&form, "password2"),
    };

    match state.users.create_from_admin(creation.clone()).await {
        Ok(user) => Ok(found(&change_path(user.id))),
        Err(AppError::ValidationError(errors)) => {
            let page = AddFormTemplate {
                email: creation.email,
                errors: error_lines(&errors),
            };
            Ok(Html(page.render()?).into_response())
        }
        Err(e) => Err(e),
    }
}

async fn change_form(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(id): Path<u64>,
) -> Result<Html<String>> {
    let user = state.users.get(id).await?;
    Ok(Html(ChangeFormTemplate::new(&user, Vec::new()).render()?))
}

async fn change_user(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(id): Path<u64>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Response> {
    let change = AdminUserChange {
        email: field(&form, "email"),
        first_name: field(&form, "first_name"),
        last_name: field(&form, "last_name"),
        is_active: checkbox(&form, "is_active"),
        is_staff: checkbox(&form, "is_staff"),
        is_superuser: checkbox(&form, "is_superuser"),
    };

    match state.users.update_from_admin(id, change).await {
        Ok(_) => Ok(found(CHANGELIST_PATH)),
        Err(AppError::ValidationError(errors)) => {
            let user = state.users.get(id).await?;
            let page = ChangeFormTemplate::new(&user, error_lines(&errors));
            Ok(Html(page.render()?).into_response())
        }
        Err(e) => Err(e),
    }
}
