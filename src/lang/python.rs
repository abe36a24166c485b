use crate::lang::{ArrowRule, InitializerRule, LabelRule, RuleTable, WrapperRule};

pub static RULES: RuleTable = RuleTable {
    module_kind: "module",
    preamble_kinds: &[],
    class_kinds: &["class_definition"],
    function_kinds: &["function_definition"],
    statement_kinds: &[
        "if_statement",
        "for_statement",
        "while_statement",
        "try_statement",
        "with_statement",
        "match_statement",
    ],
    import_kinds: &[
        "import_statement",
        "import_from_statement",
        "future_import_statement",
    ],
    block_delimiters: &[],
    body_kinds: &["block"],
    initializers: &[InitializerRule {
        kind: "assignment",
        declarator: None,
        token: "=",
    }],
    arrows: &[ArrowRule {
        kind: "lambda",
        token: ":",
    }],
    wrappers: &[WrapperRule {
        kind: "decorated_definition",
        field: "definition",
    }],
    labels: &[
        LabelRule {
            kind: "class_definition",
            fields: &["name"],
        },
        LabelRule {
            kind: "function_definition",
            fields: &["name"],
        },
    ],
    elided_marker: "...",
    line_comment: "#",
};

#[cfg(test)]
mod tests {
    use crate::block::Category;
    use crate::lang::{Classifier, Language};
    use crate::ts::CodeParser;
    use tree_sitter::Node;

    fn find<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
        if node.kind() == kind {
            return Some(node);
        }
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        children.into_iter().find_map(|c| find(c, kind))
    }

    const SOURCE: &str = r#"import os

@dataclass
class Config:
    path = "/tmp"

    def load(self):
        if os.path.exists(self.path):
            return True
        else:
            return False
"#;

    #[test]
    fn decorated_class_is_classified_as_class() {
        let mut parser = CodeParser::new(Language::Python).unwrap();
        let tree = parser.parse(SOURCE).unwrap();
        let decorated = find(tree.root_node(), "decorated_definition").unwrap();

        assert_eq!(
            Language::Python.classify(decorated, SOURCE),
            Category::Class
        );
        assert_eq!(
            Language::Python.label_of(decorated, SOURCE).as_deref(),
            Some("Config")
        );

        let children = Language::Python.children_of(decorated);
        let kinds: Vec<_> = children.iter().map(|n| n.kind()).collect();
        assert_eq!(kinds, vec!["expression_statement", "function_definition"]);
    }

    #[test]
    fn if_statement_keeps_else_clause() {
        let mut parser = CodeParser::new(Language::Python).unwrap();
        let tree = parser.parse(SOURCE).unwrap();
        let stmt = find(tree.root_node(), "if_statement").unwrap();

        assert_eq!(Language::Python.classify(stmt, SOURCE), Category::Statement);
        let children = Language::Python.children_of(stmt);
        let kinds: Vec<_> = children.iter().map(|n| n.kind()).collect();
        assert_eq!(kinds, vec!["return_statement", "else_clause"]);
    }

    #[test]
    fn assignment_children_start_after_equals() {
        let mut parser = CodeParser::new(Language::Python).unwrap();
        let tree = parser.parse(SOURCE).unwrap();
        let assignment = find(tree.root_node(), "assignment").unwrap();
        let children = Language::Python.children_of(assignment);
        let kinds: Vec<_> = children.iter().map(|n| n.kind()).collect();
        assert_eq!(kinds, vec!["string"]);
    }

    #[test]
    fn imports_and_comments() {
        let source = "import os\n# TODO: more ...\nx = 1\n";
        let mut parser = CodeParser::new(Language::Python).unwrap();
        let tree = parser.parse(source).unwrap();
        let root = tree.root_node();

        let import = find(root, "import_statement").unwrap();
        assert_eq!(Language::Python.classify(import, source), Category::Import);
        let comment = find(root, "comment").unwrap();
        assert_eq!(
            Language::Python.classify(comment, source),
            Category::CommentedOutCode
        );
    }
}
