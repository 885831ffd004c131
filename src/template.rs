//! Template capability used to render reports.
//!
//! Reports only depend on the [`Template`] trait: a pure function from named
//! [`Bindings`] to a string. [`TextTemplate`] is the bundled implementation and
//! understands a small Jinja-like language:
//!
//! - `{{ path.to.value }}` substitutes a string or integer binding
//! - `{% for item in seq %} ... {% endfor %}` repeats its body per list element
//!
//! Undefined variables are errors rather than empty strings.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::error::{Error, Result};

/// Name of the bundled report template.
pub const REPORT_XML_NAME: &str = "report.xml";

/// Source of the bundled report template.
pub const REPORT_XML: &str = include_str!("../templates/report.xml");

/// Named values handed to a template.
pub type Bindings = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(String),
    Int(i64),
    List(Vec<Value>),
    Map(Bindings),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("undefined variable '{0}'")]
    Undefined(String),

    #[error("'{0}' is not a list")]
    NotIterable(String),

    #[error("'{0}' cannot be printed")]
    NotPrintable(String),
}

/// A rendering function from bindings to text.
pub trait Template: Send + Sync {
    fn name(&self) -> &str;

    fn render(&self, bindings: &Bindings) -> Result<String, TemplateError>;
}

/// Resolves template names to loaded templates.
pub trait TemplateLoader {
    fn load(&self, name: &str) -> Result<Arc<dyn Template>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Text(String),
    Var(Vec<String>),
    For {
        item: String,
        seq: Vec<String>,
        body: Vec<Node>,
    },
}

enum Token<'a> {
    Text(&'a str),
    Expr(&'a str),
    Stmt(&'a str),
}

/// A parsed text template.
#[derive(Debug, Clone)]
pub struct TextTemplate {
    name: String,
    nodes: Vec<Node>,
}

impl TextTemplate {
    pub fn parse(name: impl Into<String>, source: &str) -> Result<Self, TemplateError> {
        let tokens = tokenize(source)?;
        let nodes = build(&mut tokens.into_iter(), false)?;
        Ok(Self {
            name: name.into(),
            nodes,
        })
    }
}

impl Template for TextTemplate {
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self, bindings: &Bindings) -> Result<String, TemplateError> {
        let mut out = String::new();
        render_nodes(&self.nodes, bindings, &mut Vec::new(), &mut out)?;
        Ok(out)
    }
}

fn tokenize(source: &str) -> Result<Vec<Token<'_>>, TemplateError> {
    let mut tokens = Vec::new();
    let mut rest = source;

    while !rest.is_empty() {
        let start = [rest.find("{{"), rest.find("{%")].into_iter().flatten().min();
        let Some(start) = start else {
            tokens.push(Token::Text(rest));
            break;
        };
        if start > 0 {
            tokens.push(Token::Text(&rest[..start]));
        }

        let is_expr = rest[start..].starts_with("{{");
        let close = if is_expr { "}}" } else { "%}" };
        let body = &rest[start + 2..];
        let end = body
            .find(close)
            .ok_or_else(|| TemplateError::Syntax(format!("unclosed tag, expected '{close}'")))?;
        let inner = body[..end].trim();
        tokens.push(if is_expr {
            Token::Expr(inner)
        } else {
            Token::Stmt(inner)
        });
        rest = &body[end + 2..];
    }

    Ok(tokens)
}

fn build<'a>(tokens: &mut impl Iterator<Item = Token<'a>>, in_loop: bool) -> Result<Vec<Node>, TemplateError> {
    let mut nodes = Vec::new();

    while let Some(token) = tokens.next() {
        match token {
            Token::Text(text) => nodes.push(Node::Text(text.to_string())),
            Token::Expr(expr) => nodes.push(Node::Var(parse_path(expr)?)),
            Token::Stmt(stmt) => {
                let words: Vec<&str> = stmt.split_whitespace().collect();
                match words.as_slice() {
                    ["for", item, "in", seq] => {
                        let item = parse_path(item)?;
                        let [item] = <[String; 1]>::try_from(item)
                            .map_err(|_| TemplateError::Syntax(format!("invalid loop variable in '{stmt}'")))?;
                        let seq = parse_path(seq)?;
                        let body = build(tokens, true)?;
                        nodes.push(Node::For { item, seq, body });
                    }
                    ["endfor"] if in_loop => return Ok(nodes),
                    _ => return Err(TemplateError::Syntax(format!("unsupported statement '{stmt}'"))),
                }
            }
        }
    }

    if in_loop {
        return Err(TemplateError::Syntax("missing '{% endfor %}'".to_string()));
    }
    Ok(nodes)
}

fn parse_path(expr: &str) -> Result<Vec<String>, TemplateError> {
    let path: Vec<String> = expr.split('.').map(|s| s.trim().to_string()).collect();
    let valid = path.iter().all(|segment| {
        let mut chars = segment.chars();
        chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    });
    if !valid {
        return Err(TemplateError::Syntax(format!("invalid expression '{expr}'")));
    }
    Ok(path)
}

fn render_nodes<'n, 'b>(
    nodes: &'n [Node],
    root: &'b Bindings,
    locals: &mut Vec<(&'n str, &'b Value)>,
    out: &mut String,
) -> Result<(), TemplateError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var(path) => match lookup(path, root, locals)? {
                Value::Str(s) => out.push_str(s),
                Value::Int(i) => {
                    let _ = write!(out, "{i}");
                }
                _ => return Err(TemplateError::NotPrintable(path.join("."))),
            },
            Node::For { item, seq, body } => {
                let Value::List(values) = lookup(seq, root, locals)? else {
                    return Err(TemplateError::NotIterable(seq.join(".")));
                };
                for value in values {
                    locals.push((item.as_str(), value));
                    let rendered = render_nodes(body, root, locals, out);
                    locals.pop();
                    rendered?;
                }
            }
        }
    }
    Ok(())
}

fn lookup<'b>(path: &[String], root: &'b Bindings, locals: &[(&str, &'b Value)]) -> Result<&'b Value, TemplateError> {
    let undefined = || TemplateError::Undefined(path.join("."));
    let (head, rest) = path.split_first().ok_or_else(undefined)?;

    let mut value = locals
        .iter()
        .rev()
        .find(|(name, _)| *name == head.as_str())
        .map(|(_, value)| *value)
        .or_else(|| root.get(head))
        .ok_or_else(undefined)?;

    for key in rest {
        value = match value {
            Value::Map(map) => map.get(key).ok_or_else(undefined)?,
            _ => return Err(undefined()),
        };
    }
    Ok(value)
}

/// Loads templates from files in a directory.
#[derive(Debug, Clone)]
pub struct FileSystemLoader {
    dir: PathBuf,
}

impl FileSystemLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl TemplateLoader for FileSystemLoader {
    fn load(&self, name: &str) -> Result<Arc<dyn Template>> {
        let not_found = || Error::TemplateNotFound {
            name: name.to_string(),
            dir: self.dir.clone(),
        };

        // Names stay inside the template directory
        let relative = Path::new(name);
        if name.is_empty() || !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(not_found());
        }

        let source = match std::fs::read_to_string(self.dir.join(relative)) {
            Ok(source) => source,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
            Err(err) => return Err(err.into()),
        };
        let template = TextTemplate::parse(name, &source).map_err(Error::InvalidTemplateCapability)?;
        Ok(Arc::new(template))
    }
}

/// Serves the templates compiled into the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinLoader;

impl TemplateLoader for BuiltinLoader {
    fn load(&self, name: &str) -> Result<Arc<dyn Template>> {
        match name {
            REPORT_XML_NAME => {
                let template = TextTemplate::parse(name, REPORT_XML).map_err(Error::InvalidTemplateCapability)?;
                Ok(Arc::new(template))
            }
            _ => Err(Error::TemplateNotFound {
                name: name.to_string(),
                dir: PathBuf::from("<builtin>"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(name: &str) -> Value {
        Value::Map(Bindings::from([("name".to_string(), name.into())]))
    }

    #[test]
    fn renders_variables_and_loops() {
        let template = TextTemplate::parse(
            "t",
            "id={{ id }} level={{level}}{% for o in objects %} [{{ o.name }}]{% endfor %}",
        )
        .unwrap();
        let bindings = Bindings::from([
            ("id".to_string(), Value::from("abc")),
            ("level".to_string(), Value::from(42u32)),
            ("objects".to_string(), Value::List(vec![object("x"), object("y")])),
        ]);
        assert_eq!(template.render(&bindings).unwrap(), "id=abc level=42 [x] [y]");
    }

    #[test]
    fn nested_loops_shadow_outer_names() {
        let template = TextTemplate::parse("t", "{% for a in xs %}{% for a in a.ys %}{{ a }}{% endfor %};{% endfor %}").unwrap();
        let inner = |v: &[&str]| {
            Value::Map(Bindings::from([(
                "ys".to_string(),
                Value::List(v.iter().map(|s| Value::from(*s)).collect()),
            )]))
        };
        let bindings = Bindings::from([("xs".to_string(), Value::List(vec![inner(&["1", "2"]), inner(&["3"])]))]);
        assert_eq!(template.render(&bindings).unwrap(), "12;3;");
    }

    #[test]
    fn undefined_variables_are_errors() {
        let template = TextTemplate::parse("t", "{{ missing }}").unwrap();
        assert_eq!(
            template.render(&Bindings::new()),
            Err(TemplateError::Undefined("missing".to_string()))
        );
    }

    #[test]
    fn rejects_broken_syntax() {
        for source in ["{{ id ", "{% for x in xs %}", "{% endfor %}", "{% if x %}", "{{ a..b }}"] {
            assert!(
                matches!(TextTemplate::parse("t", source), Err(TemplateError::Syntax(_))),
                "{source}"
            );
        }
    }

    #[test]
    fn filesystem_loader_resolves_names_in_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("report.xml"), REPORT_XML).unwrap();
        let loader = FileSystemLoader::new(dir.path());

        assert_eq!(loader.load("report.xml").unwrap().name(), "report.xml");
        assert!(matches!(loader.load("other.xml"), Err(Error::TemplateNotFound { .. })));
        assert!(matches!(loader.load("../report.xml"), Err(Error::TemplateNotFound { .. })));
    }

    #[test]
    fn builtin_loader_serves_report_xml() {
        assert!(BuiltinLoader.load(REPORT_XML_NAME).is_ok());
        assert!(matches!(BuiltinLoader.load("report.html"), Err(Error::TemplateNotFound { .. })));
    }
}
