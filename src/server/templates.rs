use crate::domain::ports::AssetSource;
use crate::utils::error::{AppError, Result};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("placeholder pattern is valid")
});

pub const INDEX_TEMPLATE: &str = "index.html";
pub const ERROR_TEMPLATE: &str = "error.html";

/// Escapes text for HTML element content and attribute values.
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Page templates loaded once at startup and shared read-only by all workers.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    templates: HashMap<String, String>,
}

impl TemplateSet {
    pub const REQUIRED: [&'static str; 2] = [INDEX_TEMPLATE, ERROR_TEMPLATE];

    pub fn from_sources<I, K, V>(sources: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            templates: sources
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Reads every required template from `dir`. Any missing template is fatal.
    pub async fn load<A: AssetSource>(assets: &A, dir: &str) -> Result<Self> {
        let mut templates = HashMap::new();
        for name in Self::REQUIRED {
            let path = format!("{}/{}", dir.trim_end_matches('/'), name);
            let source = assets
                .read_to_string(&path)
                .await
                .map_err(|e| AppError::TemplateError {
                    template: path.clone(),
                    message: e.to_string(),
                })?;
            tracing::debug!("Loaded template {} ({} bytes)", path, source.len());
            templates.insert(name.to_string(), source);
        }
        Ok(Self { templates })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Substitutes every `{{ name }}` placeholder. Values are inserted verbatim;
    /// callers escape anything user-derived with [`escape_html`].
    pub fn render(&self, name: &str, values: &HashMap<&str, String>) -> Result<String> {
        let source = self
            .templates
            .get(name)
            .ok_or_else(|| AppError::TemplateError {
                template: name.to_string(),
                message: "template not loaded".to_string(),
            })?;

        let mut missing = Vec::new();
        let rendered = PLACEHOLDER.replace_all(source, |caps: &Captures| {
            let key = &caps[1];
            match values.get(key) {
                Some(value) => value.clone(),
                None => {
                    missing.push(key.to_string());
                    String::new()
                }
            }
        });

        if !missing.is_empty() {
            return Err(AppError::TemplateError {
                template: name.to_string(),
                message: format!("Unresolved placeholders: {}", missing.join(", ")),
            });
        }

        Ok(rendered.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::assets::LocalAssets;
    use tempfile::TempDir;

    #[test]
    fn test_render_substitutes_placeholders() {
        let set = TemplateSet::from_sources([("page.html", "<h1>{{title}}</h1><p>{{ body }}</p>")]);
        let values = HashMap::from([
            ("title", "Feed".to_string()),
            ("body", escape_html("<b>&</b>")),
        ]);

        let html = set.render("page.html", &values).unwrap();
        assert_eq!(html, "<h1>Feed</h1><p>&lt;b&gt;&amp;&lt;/b&gt;</p>");
    }

    #[test]
    fn test_unresolved_placeholder_is_an_error() {
        let set = TemplateSet::from_sources([("page.html", "{{ title }} {{ missing }}")]);
        let values = HashMap::from([("title", "x".to_string())]);

        let err = set.render("page.html", &values).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_unknown_template() {
        let set = TemplateSet::default();
        assert!(set.render("index.html", &HashMap::new()).is_err());
    }

    #[tokio::test]
    async fn test_load_requires_all_templates() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.html"), "{{ ingredient_rows }}").unwrap();
        let assets = LocalAssets::new(dir.path());

        let err = TemplateSet::load(&assets, ".").await.unwrap_err();
        assert!(matches!(err, AppError::TemplateError { .. }));

        std::fs::write(dir.path().join("error.html"), "{{ message }}").unwrap();
        let set = TemplateSet::load(&assets, ".").await.unwrap();
        assert!(set.contains(INDEX_TEMPLATE));
        assert!(set.contains(ERROR_TEMPLATE));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("Biotin 2%"), "Biotin 2%");
        assert_eq!(escape_html("\"a\" & 'b'"), "&quot;a&quot; &amp; &#39;b&#39;");
    }
}
