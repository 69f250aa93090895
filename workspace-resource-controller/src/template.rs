//! Rendering of resource templates
//!
//! Templates use the `{{.Field}}` placeholder syntax of Go templates on top of a
//! strict [`handlebars`] registry:
//!
//! - `{{.Field}}` and `{{.Outer.Inner}}` look up fields on the arguments value
//! - `{{.}}` renders the whole arguments value
//! - `{{- ` and ` -}}` trim surrounding whitespace
//! - `{{/* ... */}}` comments are removed, honouring trim markers
//!
//! Native handlebars expressions such as `{{#if .Flag}}...{{/if}}` pass through unchanged.
//! Substituted values are never escaped, and referencing a field that does not exist is an error.
use handlebars::{no_escape, Handlebars};
use serde::Serialize;
use thiserror::Error;

const TEMPLATE_NAME: &str = "resourceTemplate";

/// Default template shipped with the controller
pub const DEFAULT_RESOURCES: &str = include_str!("../templates/resources.yaml");

/// Errors raised while rendering a template
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Template bytes are not valid UTF-8
    #[error("template is not valid UTF-8: {0}")]
    Encoding(#[source] std::str::Utf8Error),

    /// An action was opened with `{{` but never closed
    #[error("unclosed action starting at byte {0}")]
    UnclosedAction(usize),

    /// The template text could not be parsed
    #[error("failed to parse template: {0}")]
    Parse(#[source] Box<handlebars::TemplateError>),

    /// Execution failed, typically on a missing argument field
    #[error("failed to render template: {0}")]
    Render(#[source] Box<handlebars::RenderError>),

    /// Arguments could not be turned into a template context
    #[error("failed to serialize template arguments: {0}")]
    Arguments(#[source] serde_json::Error),
}

impl TemplateError {
    /// Whether the template text itself is at fault rather than its arguments
    pub fn is_syntax(&self) -> bool {
        matches!(
            self,
            Self::Encoding(_) | Self::UnclosedAction(_) | Self::Parse(_)
        )
    }
}

/// A template and the arguments it is rendered with
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TemplateData {
    /// Raw template text
    pub content: Vec<u8>,
    /// Arguments value, usually a mapping from placeholder name to value
    pub args: serde_json::Value,
}

impl TemplateData {
    /// Pair template content with serializable arguments
    pub fn new(content: impl Into<Vec<u8>>, args: &impl Serialize) -> Result<Self, TemplateError> {
        Ok(Self {
            content: content.into(),
            args: serde_json::to_value(args).map_err(TemplateError::Arguments)?,
        })
    }

    /// Render the stored content with the stored arguments
    pub fn render(&self) -> Result<Vec<u8>, TemplateError> {
        render_resources(&self.content, &self.args)
    }
}

/// Renders the resources from the provided template
///
/// Output is deterministic for a given pair of template and arguments.
pub fn render_resources(content: &[u8], args: &impl Serialize) -> Result<Vec<u8>, TemplateError> {
    let text = std::str::from_utf8(content).map_err(TemplateError::Encoding)?;
    let source = translate_actions(text)?;
    let context = serde_json::to_value(args).map_err(TemplateError::Arguments)?;

    let mut registry = Handlebars::new();
    registry.set_strict_mode(true);
    registry.register_escape_fn(no_escape);
    registry
        .register_template_string(TEMPLATE_NAME, source)
        .map_err(|e| TemplateError::Parse(Box::new(e)))?;
    let rendered = registry
        .render(TEMPLATE_NAME, &context)
        .map_err(|e| TemplateError::Render(Box::new(e)))?;
    Ok(rendered.into_bytes())
}

/// Rewrite Go style actions into their handlebars equivalents
fn translate_actions(text: &str) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(text.len() + 16);
    let mut rest = text;
    let mut offset = 0;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let inner_start = start + 2;
        let len = rest[inner_start..]
            .find("}}")
            .ok_or(TemplateError::UnclosedAction(offset + start))?;
        let inner = &rest[inner_start..inner_start + len];
        let consumed = inner_start + len + 2;
        rest = &rest[consumed..];
        offset += consumed;

        if let Some((trim_left, trim_right)) = comment_trim(inner) {
            if trim_left {
                out.truncate(out.trim_end().len());
            }
            if trim_right {
                let trimmed = rest.trim_start();
                offset += rest.len() - trimmed.len();
                rest = trimmed;
            }
            continue;
        }
        // handlebars reads `\{{` as a literal backslash followed by the expression
        if out.ends_with('\\') {
            out.push('\\');
        }
        out.push_str("{{");
        out.push_str(&rewrite_action(inner));
        out.push_str("}}");
    }
    out.push_str(rest);
    Ok(out)
}

/// Trim markers of a `/* ... */` comment action, `None` for any other action
fn comment_trim(inner: &str) -> Option<(bool, bool)> {
    let (left, body) = match inner.strip_prefix('-') {
        Some(body) if body.starts_with(char::is_whitespace) => (true, body.trim_start()),
        _ => (false, inner),
    };
    let (right, body) = match body.strip_suffix('-') {
        Some(body) if body.ends_with(char::is_whitespace) => (true, body.trim_end()),
        _ => (false, body),
    };
    (body.starts_with("/*") && body.ends_with("*/")).then_some((left, right))
}

fn rewrite_action(inner: &str) -> String {
    // comments, raw blocks and triple-stashes are left to handlebars
    if inner.starts_with('!') || inner.starts_with('{') {
        return inner.to_string();
    }
    let (lead, body) = match inner.strip_prefix('-') {
        Some(body) if body.starts_with(char::is_whitespace) => ("~", body),
        _ => ("", inner),
    };
    let (body, trail) = match body.strip_suffix('-') {
        Some(body) if body.ends_with(char::is_whitespace) => (body, "~"),
        _ => (body, ""),
    };
    format!("{lead}{}{trail}", rewrite_fields(body))
}

/// `.Field` becomes `this.Field`, a lone `.` becomes `this`
fn rewrite_fields(body: &str) -> String {
    let mut out = String::with_capacity(body.len() + 8);
    let mut prev: Option<char> = None;
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        let token_start = prev.map_or(true, |p| p.is_whitespace() || p == '(');
        if c == '.' && token_start {
            match chars.peek() {
                Some(&n) if n.is_alphabetic() || n == '_' => out.push_str("this."),
                Some(&n) if n.is_whitespace() || n == ')' => out.push_str("this"),
                None => out.push_str("this"),
                Some(_) => out.push(c),
            }
        } else {
            out.push(c);
        }
        prev = Some(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    #[serde(rename_all = "PascalCase")]
    struct TemplateArgs {
        namespace: String,
        video_game: String,
    }

    fn mario() -> TemplateArgs {
        TemplateArgs {
            namespace: "default".into(),
            video_game: "mario".into(),
        }
    }

    #[test]
    fn renders_embedded_test_template() {
        let expected = "---
apiVersion: v1
kind: ConfigMap
metadata:
  name: test
  namespace: default
type: Opaque
data:
  video_game: mario
";
        let tmpl = include_bytes!("../templates/test.yaml");
        let actual = render_resources(tmpl, &mario()).unwrap();
        assert_eq!(String::from_utf8(actual).unwrap(), expected);
    }

    #[test]
    fn renders_config_map_scenario_exactly() {
        let tmpl = "kind: ConfigMap\nmetadata:\n  name: test\n  namespace: default\ndata:\n  video_game: {{.VideoGame}}\n";
        let out = render_resources(tmpl.as_bytes(), &json!({"VideoGame": "mario"})).unwrap();
        assert_eq!(
            out,
            b"kind: ConfigMap\nmetadata:\n  name: test\n  namespace: default\ndata:\n  video_game: mario\n"
        );
    }

    #[test]
    fn template_without_placeholders_is_identity() {
        let tmpl = "apiVersion: v1\nkind: Namespace\nmetadata:\n  name: plain # <b>&\n";
        let out = render_resources(tmpl.as_bytes(), &json!({})).unwrap();
        assert_eq!(out, tmpl.as_bytes());
    }

    #[test]
    fn placeholder_is_replaced_in_place() {
        let out = render_resources(b"a{{.Field}}b", &json!({"Field": "<x & y>"})).unwrap();
        assert_eq!(out, b"a<x & y>b");
    }

    #[test]
    fn backslash_before_placeholder_is_kept() {
        let out = render_resources(b"path: C:\\{{.Dir}}\n", &json!({"Dir": "x"})).unwrap();
        assert_eq!(out, b"path: C:\\x\n");
        let out = render_resources(b"re: ^\\d+{{.Suffix}}$", &json!({"Suffix": "s"})).unwrap();
        assert_eq!(out, b"re: ^\\d+s$");
    }

    #[test]
    fn comments_are_dropped() {
        let out = render_resources(b"a{{/* note */}}b", &json!({})).unwrap();
        assert_eq!(out, b"ab");
        let out = render_resources(b"a  {{- /* note */ -}}\n  b {{.X}}", &json!({"X": 1})).unwrap();
        assert_eq!(out, b"ab 1");
        let out = render_resources(b"{{/* keep */}}  x", &json!({})).unwrap();
        assert_eq!(out, b"  x");
    }

    #[test]
    fn rendering_is_deterministic() {
        let tmpl = DEFAULT_RESOURCES.as_bytes();
        let first = render_resources(tmpl, &mario()).unwrap();
        let second = render_resources(tmpl, &mario()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn nested_fields_and_whole_context() {
        let args = json!({"Meta": {"Name": "demo"}, "Count": 3});
        let out = render_resources(b"{{.Meta.Name}}={{ .Count }}", &args).unwrap();
        assert_eq!(out, b"demo=3");
        let out = render_resources(b"[{{.}}]", &json!("whole")).unwrap();
        assert_eq!(out, b"[whole]");
    }

    #[test]
    fn trim_markers_remove_whitespace() {
        let out = render_resources(b"a   {{- .Field -}}   b", &json!({"Field": "x"})).unwrap();
        assert_eq!(out, b"axb");
    }

    #[test]
    fn block_helpers_accept_dotted_fields() {
        let tmpl = b"{{#if .Enabled}}on{{else}}off{{/if}}";
        assert_eq!(render_resources(tmpl, &json!({"Enabled": true})).unwrap(), b"on");
        assert_eq!(render_resources(tmpl, &json!({"Enabled": false})).unwrap(), b"off");
    }

    #[test]
    fn missing_field_is_a_render_error() {
        let err = render_resources(b"{{.Missing}}", &json!({"Field": "x"})).unwrap_err();
        assert!(matches!(err, TemplateError::Render(_)), "{err:?}");
        assert!(!err.is_syntax());
    }

    #[test]
    fn unclosed_action_is_a_syntax_error() {
        let err = render_resources(b"name: {{.Field", &json!({"Field": "x"})).unwrap_err();
        assert!(matches!(err, TemplateError::UnclosedAction(6)), "{err:?}");
        assert!(err.is_syntax());
    }

    #[test]
    fn unclosed_block_is_a_parse_error() {
        let err = render_resources(b"{{#if .Field}}x", &json!({"Field": true})).unwrap_err();
        assert!(matches!(err, TemplateError::Parse(_)), "{err:?}");
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let err = render_resources(&[0xff, 0xfe], &json!({})).unwrap_err();
        assert!(matches!(err, TemplateError::Encoding(_)));
    }

    #[test]
    fn template_data_renders_stored_args() {
        let data = TemplateData::new(DEFAULT_RESOURCES, &mario()).unwrap();
        let out = String::from_utf8(data.render().unwrap()).unwrap();
        assert!(out.contains("namespace: default\n"));
        assert!(out.contains("video_game: mario\n"));
    }

    #[test]
    fn go_actions_are_rewritten() {
        assert_eq!(translate_actions("{{.A}}").unwrap(), "{{this.A}}");
        assert_eq!(translate_actions("{{- .A -}}").unwrap(), "{{~ this.A ~}}");
        assert_eq!(translate_actions("{{../up}}").unwrap(), "{{../up}}");
        assert_eq!(translate_actions("{{! .note }}").unwrap(), "{{! .note }}");
        assert_eq!(translate_actions("{{{.A}}}").unwrap(), "{{{.A}}}");
    }
}
