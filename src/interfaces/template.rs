//! Template collaborator — resolves named templates for blueprint prompts.

use std::collections::HashMap;
use std::fmt;

use crate::utilities::errors::TemplateError;

/// Resolves a named template plus variables into literal text.
pub trait TemplateResolver: Send + Sync + fmt::Debug {
    /// Render `name` with the given variables.
    fn render(
        &self,
        name: &str,
        variables: &HashMap<String, String>,
    ) -> Result<String, TemplateError>;
}

/// A `TemplateResolver` backed by an in-memory Tera instance.
pub struct TeraTemplateResolver {
    tera: tera::Tera,
}

impl TeraTemplateResolver {
    /// Create a resolver with no templates registered.
    pub fn new() -> Self {
        Self {
            tera: tera::Tera::default(),
        }
    }

    /// Register a raw template under `name`.
    pub fn add_template(&mut self, name: &str, text: &str) -> Result<(), TemplateError> {
        self.tera
            .add_raw_template(name, text)
            .map_err(|e| TemplateError {
                name: name.to_string(),
                message: e.to_string(),
            })
    }
}

impl Default for TeraTemplateResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TeraTemplateResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TeraTemplateResolver").finish_non_exhaustive()
    }
}

impl TemplateResolver for TeraTemplateResolver {
    fn render(
        &self,
        name: &str,
        variables: &HashMap<String, String>,
    ) -> Result<String, TemplateError> {
        let mut context = tera::Context::new();
        for (key, value) in variables {
            context.insert(key, value);
        }
        self.tera.render(name, &context).map_err(|e| TemplateError {
            name: name.to_string(),
            message: e.to_string(),
        })
    }
}
