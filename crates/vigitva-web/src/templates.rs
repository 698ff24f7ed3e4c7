//! Server-side page templates.

use minijinja::Environment;
use serde::Serialize;

use crate::error::ApiError;

const TEMPLATES: [(&str, &str); 2] = [
    ("nav.html", include_str!("../templates/nav.html")),
    ("dashboard.html", include_str!("../templates/dashboard.html")),
];

pub fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    for (name, source) in TEMPLATES {
        if let Err(e) = env.add_template(name, source) {
            tracing::error!(template = name, error = %e, "Template failed to compile");
        }
    }
    env
}

pub fn render<S: Serialize>(env: &Environment<'_>, name: &str, ctx: S) -> Result<String, ApiError> {
    env.get_template(name)
        .and_then(|t| t.render(ctx))
        .map_err(|e| ApiError::Internal(format!("Rendering {} failed: {}", name, e)))
}
