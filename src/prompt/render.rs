//! Prompt Renderer - Render phase templates with Handlebars
//!
//! Templates are registered once by name and rendered with any serializable
//! context. HTML escaping is off: prompts carry code and disassembly.

use handlebars::Handlebars;
use serde::Serialize;

use crate::error::{BridgeError, Result};

/// Renders prompt templates using Handlebars templating
pub struct PromptRenderer {
    handlebars: Handlebars<'static>,
}

impl Default for PromptRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptRenderer {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        // Missing variables render as empty strings
        handlebars.set_strict_mode(false);
        handlebars.register_escape_fn(handlebars::no_escape);
        Self { handlebars }
    }

    /// Render an unregistered template string
    pub fn render<T: Serialize>(&self, template: &str, context: &T) -> Result<String> {
        self.handlebars
            .render_template(template, context)
            .map_err(|e| BridgeError::Template(format!("Failed to render template: {}", e)))
    }

    /// Register a named template for later use
    pub fn register_template(&mut self, name: &str, template: &str) -> Result<()> {
        self.handlebars
            .register_template_string(name, template)
            .map_err(|e| BridgeError::Template(format!("Failed to register template '{}': {}", name, e)))
    }

    /// Render a previously registered template
    pub fn render_named<T: Serialize>(&self, name: &str, context: &T) -> Result<String> {
        self.handlebars
            .render(name, context)
            .map_err(|e| BridgeError::Template(format!("Failed to render template '{}': {}", name, e)))
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.handlebars.get_template(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_simple() {
        let renderer = PromptRenderer::new();
        let result = renderer.render("Query: {{query}}", &json!({"query": "what is main?"})).unwrap();
        assert_eq!(result, "Query: what is main?");
    }

    #[test]
    fn test_missing_variable_renders_empty() {
        let renderer = PromptRenderer::default();
        let result = renderer.render("[{{memory}}]", &json!({})).unwrap();
        assert_eq!(result, "[]");
    }

    #[test]
    fn test_no_html_escaping() {
        let renderer = PromptRenderer::new();
        let context = json!({"code": "if (a < b && c > d) { return \"x\"; }"});
        let result = renderer.render("{{code}}", &context).unwrap();
        assert_eq!(result, "if (a < b && c > d) { return \"x\"; }");
    }

    #[test]
    fn test_conditional_section() {
        let renderer = PromptRenderer::new();
        let template = "{{#if history}}## History\n{{history}}\n{{/if}}Task";
        assert_eq!(renderer.render(template, &json!({"history": ""})).unwrap(), "Task");
        assert_eq!(
            renderer.render(template, &json!({"history": "did things"})).unwrap(),
            "## History\ndid things\nTask"
        );
    }

    #[test]
    fn test_render_named() {
        let mut renderer = PromptRenderer::new();
        renderer.register_template("planning", "Plan for {{query}}").unwrap();
        assert!(renderer.has_template("planning"));

        let result = renderer.render_named("planning", &json!({"query": "main"})).unwrap();
        assert_eq!(result, "Plan for main");
    }

    #[test]
    fn test_render_named_not_found() {
        let renderer = PromptRenderer::new();
        let err = renderer.render_named("nonexistent", &json!({})).unwrap_err();
        assert!(matches!(err, BridgeError::Template(_)));
    }

    #[test]
    fn test_register_invalid_template() {
        let mut renderer = PromptRenderer::new();
        assert!(renderer.register_template("broken", "{{#if x}}unclosed").is_err());
        assert!(!renderer.has_template("broken"));
    }

    #[test]
    fn test_render_with_struct() {
        #[derive(Serialize)]
        struct Vars {
            iteration: usize,
            query: String,
        }

        let renderer = PromptRenderer::new();
        let vars = Vars {
            iteration: 2,
            query: "list imports".to_string(),
        };
        assert_eq!(
            renderer.render("{{iteration}}: {{query}}", &vars).unwrap(),
            "2: list imports"
        );
    }
}
