//! Markup production for page views.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;

use crate::error::ViewError;
use crate::promise::Promise;

/// Turns a template id and a model into markup.
///
/// Engines that render synchronously return an already settled promise.
pub trait TemplateEngine: Send + Sync {
    fn render(&self, template: &str, model: Option<&Value>) -> Promise<String, ViewError>;
}

/// Named templates with `{field}` placeholders filled from an object model.
///
/// Placeholders resolve against top-level fields of the model; strings are
/// inserted verbatim, other values use their JSON form. Missing fields and
/// absent models render as an empty string. `{{` and `}}` emit literal braces.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: RwLock<HashMap<String, String>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the template called `name`.
    pub fn register(&self, name: impl Into<String>, source: impl Into<String>) {
        self.templates.write().insert(name.into(), source.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.read().contains_key(name)
    }

    fn fill(template: &str, source: &str, model: Option<&Value>) -> Result<String, ViewError> {
        let mut out = String::with_capacity(source.len());
        let mut chars = source.chars().peekable();
        while let Some(ch) = chars.next() {
            match ch {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                '{' => {
                    let mut field = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(c) => field.push(c),
                            None => {
                                return Err(ViewError::render(
                                    template,
                                    format!("unterminated placeholder '{{{field}'"),
                                ))
                            }
                        }
                    }
                    let value = model.and_then(|model| model.get(field.trim()));
                    match value {
                        Some(Value::String(text)) => out.push_str(text),
                        Some(Value::Null) | None => {}
                        Some(other) => out.push_str(&other.to_string()),
                    }
                }
                other => out.push(other),
            }
        }
        Ok(out)
    }
}

impl TemplateEngine for TemplateRegistry {
    fn render(&self, template: &str, model: Option<&Value>) -> Promise<String, ViewError> {
        let source = self.templates.read().get(template).cloned();
        let outcome = match source {
            Some(source) => Self::fill(template, &source, model),
            None => Err(ViewError::render(template, "template is not registered")),
        };
        let promise = Promise::new();
        promise.settle(outcome);
        promise
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rendered(registry: &TemplateRegistry, name: &str, model: Option<&Value>) -> Result<String, ViewError> {
        let outcome = registry.render(name, model).outcome().expect("settles synchronously");
        (*outcome).clone()
    }

    #[test]
    fn fills_placeholders_from_the_model() {
        let registry = TemplateRegistry::new();
        registry.register("model-tmpl", "<h2>Hello World</h2><p>Color is {color}.</p>");
        let model = json!({ "color": "blue", "primary": true });
        assert_eq!(
            rendered(&registry, "model-tmpl", Some(&model)).unwrap(),
            "<h2>Hello World</h2><p>Color is blue.</p>"
        );
    }

    #[test]
    fn non_string_values_use_json_form_and_missing_fields_are_empty() {
        let registry = TemplateRegistry::new();
        registry.register("t", "{primary}|{count}|{missing}|{{literal}}");
        let model = json!({ "primary": true, "count": 3 });
        assert_eq!(rendered(&registry, "t", Some(&model)).unwrap(), "true|3||{literal}");
    }

    #[test]
    fn unknown_template_is_a_render_error() {
        let registry = TemplateRegistry::new();
        let err = rendered(&registry, "nope", None).unwrap_err();
        assert_eq!(err.kind(), "render_error");
    }

    #[test]
    fn unterminated_placeholder_is_a_render_error() {
        let registry = TemplateRegistry::new();
        registry.register("broken", "Hello {name");
        assert!(rendered(&registry, "broken", None).is_err());
    }
}
