//! Page templates, compiled into the binary.

use crate::error::GraderError;
use crate::web::flash::Flash;
use tera::{Context, Tera};

pub const REGISTER_PAGE: &str = "register.html";
pub const DASHBOARD_PAGE: &str = "index.html";

const SOURCES: [(&str, &str); 3] = [
    ("base.html", include_str!("../../templates/base.html")),
    (REGISTER_PAGE, include_str!("../../templates/register.html")),
    (DASHBOARD_PAGE, include_str!("../../templates/index.html")),
];

/// Parsed templates, shared through the app state.
#[derive(Debug)]
pub struct Templates {
    tera: Tera,
}

impl Templates {
    pub fn load() -> Result<Self, GraderError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(SOURCES)
            .map_err(|e| GraderError::Internal(format!("template parse failed: {e}")))?;
        Ok(Self { tera })
    }

    /// Render `page` with the pending flashes added to `ctx`.
    pub fn render(
        &self,
        page: &str,
        flashes: &[Flash],
        mut ctx: Context,
    ) -> Result<String, tera::Error> {
        ctx.insert("flashes", flashes);
        self.tera.render(page, &ctx)
    }
}
