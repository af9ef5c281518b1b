use handlebars::Handlebars;
use serde_json::json;

use crate::store::Incident;

/// Server-rendered pages. Templates are embedded at compile time and
/// registered once at startup; handlebars escapes interpolated values, so
/// user-entered incident fields render inert.
pub struct Views {
    registry: Handlebars<'static>,
}

impl Views {
    pub fn new() -> Result<Self, handlebars::TemplateError> {
        let mut registry = Handlebars::new();
        registry.register_template_string("dashboard", include_str!("../../templates/dashboard.hbs"))?;
        registry.register_template_string("login", include_str!("../../templates/login.hbs"))?;
        registry.register_template_string("register", include_str!("../../templates/register.hbs"))?;
        Ok(Self { registry })
    }

    pub fn dashboard(
        &self,
        incidents: &[Incident],
        flash: Option<&str>,
        error: Option<&str>,
    ) -> Result<String, handlebars::RenderError> {
        let rows: Vec<serde_json::Value> = incidents
            .iter()
            .map(|incident| {
                json!({
                    "id": incident.id.0,
                    "title": incident.title,
                    "description": incident.description,
                    "timestamp": incident.timestamp.format("%Y-%m-%d %H:%M UTC").to_string(),
                    "location": incident.location,
                    "severity": incident.severity,
                })
            })
            .collect();

        self.registry.render(
            "dashboard",
            &json!({ "incidents": rows, "flash": flash, "error": error }),
        )
    }

    pub fn login(
        &self,
        flash: Option<&str>,
        error: Option<&str>,
    ) -> Result<String, handlebars::RenderError> {
        self.registry
            .render("login", &json!({ "flash": flash, "error": error }))
    }

    pub fn register(&self, error: Option<&str>) -> Result<String, handlebars::RenderError> {
        self.registry.render("register", &json!({ "error": error }))
    }
}
