//! Per-language block classification.
//!
//! Every supported grammar is described by a [`RuleTable`]: which CST kinds
//! become classes, functions, statements and so on, and which nodes make up
//! the inside of a construct. All control flow lives in the generic
//! [`Classifier`] implementation below, so adding a language means adding a
//! [`Language`] variant and its table.

pub mod java;
pub mod python;
pub mod rust;

use crate::block::Category;
use ast_grep_language::SupportLang;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tree_sitter::Node;

/// Languages with a block classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Java,
    Python,
    Rust,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Java, Language::Python, Language::Rust];

    /// Parse a language tag such as `"java"`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "java" => Some(Language::Java),
            "python" | "py" => Some(Language::Python),
            "rust" | "rs" => Some(Language::Rust),
            _ => None,
        }
    }

    /// Detect language from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "java" => Some(Language::Java),
            "py" | "pyi" => Some(Language::Python),
            "rs" => Some(Language::Rust),
            _ => None,
        }
    }

    /// Detect language from a file path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::Java => "java",
            Language::Python => "python",
            Language::Rust => "rust",
        }
    }

    /// The ast-grep language carrying this grammar.
    pub fn support_lang(&self) -> SupportLang {
        match self {
            Language::Java => SupportLang::Java,
            Language::Python => SupportLang::Python,
            Language::Rust => SupportLang::Rust,
        }
    }

    pub fn rules(&self) -> &'static RuleTable {
        match self {
            Language::Java => &java::RULES,
            Language::Python => &python::RULES,
            Language::Rust => &rust::RULES,
        }
    }

    /// Render `text` as a single line comment in this language.
    pub fn line_comment(&self, text: &str) -> String {
        format!("{} {}", self.rules().line_comment, text.trim_end())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declarations whose children start after an assignment token.
#[derive(Debug, Clone, Copy)]
pub struct InitializerRule {
    pub kind: &'static str,
    /// Child holding the assignment token; `None` when it is a direct child.
    pub declarator: Option<&'static str>,
    pub token: &'static str,
}

/// Constructs whose children start after an arrow token.
#[derive(Debug, Clone, Copy)]
pub struct ArrowRule {
    pub kind: &'static str,
    pub token: &'static str,
}

/// Constructs that are classified as the definition they wrap.
#[derive(Debug, Clone, Copy)]
pub struct WrapperRule {
    pub kind: &'static str,
    pub field: &'static str,
}

/// Where to read a construct's label: a chain of field names from the node.
#[derive(Debug, Clone, Copy)]
pub struct LabelRule {
    pub kind: &'static str,
    pub fields: &'static [&'static str],
}

/// Table of classification rules for one grammar.
#[derive(Debug)]
pub struct RuleTable {
    pub module_kind: &'static str,
    /// Declarations skipped at the module root (package, namespace).
    pub preamble_kinds: &'static [&'static str],
    pub class_kinds: &'static [&'static str],
    pub function_kinds: &'static [&'static str],
    pub statement_kinds: &'static [&'static str],
    pub import_kinds: &'static [&'static str],
    pub block_delimiters: &'static [&'static str],
    /// Nested block nodes that hold a container's body.
    pub body_kinds: &'static [&'static str],
    pub initializers: &'static [InitializerRule],
    pub arrows: &'static [ArrowRule],
    pub wrappers: &'static [WrapperRule],
    pub labels: &'static [LabelRule],
    /// Comments containing this marker stand for elided code.
    pub elided_marker: &'static str,
    pub line_comment: &'static str,
}

/// Maps CST nodes to block categories and block children.
pub trait Classifier {
    fn language(&self) -> Language;

    /// Category of the block built from `node`.
    fn classify(&self, node: Node<'_>, source: &str) -> Category;

    /// The CST nodes that become the children of the block built from `node`,
    /// in document order.
    fn children_of<'t>(&self, node: Node<'t>) -> Vec<Node<'t>>;

    /// Name used to address the block in a path, if the construct has one.
    fn label_of(&self, node: Node<'_>, source: &str) -> Option<String>;

    fn is_block_delimiter(&self, kind: &str) -> bool;
}

impl Classifier for Language {
    fn language(&self) -> Language {
        *self
    }

    fn classify(&self, node: Node<'_>, source: &str) -> Category {
        self.rules().classify(node, source)
    }

    fn children_of<'t>(&self, node: Node<'t>) -> Vec<Node<'t>> {
        self.rules().children_of(node)
    }

    fn label_of(&self, node: Node<'_>, source: &str) -> Option<String> {
        self.rules().label_of(node, source)
    }

    fn is_block_delimiter(&self, kind: &str) -> bool {
        self.rules().block_delimiters.contains(&kind)
    }
}

impl RuleTable {
    fn classify(&self, node: Node<'_>, source: &str) -> Category {
        if node.is_error() || node.is_missing() {
            return Category::Error;
        }
        let node = self.unwrap(node);
        let kind = node.kind();

        if kind == self.module_kind {
            Category::Module
        } else if self.function_kinds.contains(&kind) {
            Category::Function
        } else if self.class_kinds.contains(&kind) {
            Category::Class
        } else if self.statement_kinds.contains(&kind) {
            Category::Statement
        } else if self.block_delimiters.contains(&kind) {
            Category::BlockDelimiter
        } else if self.import_kinds.contains(&kind) {
            Category::Import
        } else if kind.contains("comment") {
            let text = source.get(node.byte_range()).unwrap_or_default();
            if text.contains(self.elided_marker) {
                Category::CommentedOutCode
            } else {
                Category::Comment
            }
        } else {
            Category::Code
        }
    }

    fn children_of<'t>(&self, node: Node<'t>) -> Vec<Node<'t>> {
        let node = self.unwrap(node);
        let kind = node.kind();
        let children = direct_children(node);

        if kind == self.module_kind {
            return match children
                .iter()
                .position(|c| self.preamble_kinds.contains(&c.kind()))
            {
                Some(i) if i + 1 < children.len() => children[i + 1..].to_vec(),
                _ => children,
            };
        }

        for rule in self.initializers.iter().filter(|r| r.kind == kind) {
            if let Some(nodes) = split_initializer(&children, rule) {
                return nodes;
            }
        }

        for rule in self.arrows.iter().filter(|r| r.kind == kind) {
            if let Some(i) = children.iter().position(|c| c.kind() == rule.token) {
                return children[i + 1..].to_vec();
            }
        }

        if self.body_kinds.contains(&kind) {
            return children;
        }

        if let Some(i) = children
            .iter()
            .position(|c| self.body_kinds.contains(&c.kind()))
        {
            // Trailing clauses (else, catch, finally) stay with the construct
            let mut nodes = direct_children(children[i]);
            nodes.extend_from_slice(&children[i + 1..]);
            return nodes;
        }

        children
    }

    fn label_of(&self, node: Node<'_>, source: &str) -> Option<String> {
        let node = self.unwrap(node);
        let rule = self.labels.iter().find(|r| r.kind == node.kind())?;

        let mut current = node;
        for field in rule.fields {
            current = current.child_by_field_name(field)?;
        }
        source.get(current.byte_range()).map(str::to_string)
    }

    fn unwrap<'t>(&self, node: Node<'t>) -> Node<'t> {
        self.wrappers
            .iter()
            .find(|w| w.kind == node.kind())
            .and_then(|w| node.child_by_field_name(w.field))
            .unwrap_or(node)
    }
}

fn direct_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

fn split_initializer<'t>(children: &[Node<'t>], rule: &InitializerRule) -> Option<Vec<Node<'t>>> {
    match rule.declarator {
        Some(declarator) => {
            let i = children.iter().position(|c| c.kind() == declarator)?;
            let inner = direct_children(children[i]);
            let eq = inner.iter().position(|c| c.kind() == rule.token)?;
            let mut nodes = inner[eq + 1..].to_vec();
            // Remaining declarators and the terminator
            nodes.extend_from_slice(&children[i + 1..]);
            Some(nodes)
        }
        None => {
            let eq = children.iter().position(|c| c.kind() == rule.token)?;
            Some(children[eq + 1..].to_vec())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_detection() {
        assert_eq!(Language::from_extension("java"), Some(Language::Java));
        assert_eq!(Language::from_extension("PY"), Some(Language::Python));
        assert_eq!(
            Language::from_path(Path::new("src/lib.rs")),
            Some(Language::Rust)
        );
        assert_eq!(Language::from_path(Path::new("README.md")), None);
        assert_eq!(Language::parse("Rust"), Some(Language::Rust));
        assert_eq!(Language::parse("cobol"), None);
    }

    #[test]
    fn line_comment_syntax() {
        assert_eq!(Language::Java.line_comment("..."), "// ...");
        assert_eq!(Language::Python.line_comment("...\n"), "# ...");
    }

    #[test]
    fn every_language_has_a_table() {
        for language in Language::ALL {
            let rules = language.rules();
            assert!(!rules.module_kind.is_empty());
            assert_eq!(rules.elided_marker, "...");
        }
    }
}
