use crate::lang::{ArrowRule, InitializerRule, LabelRule, RuleTable};

const NAME: &[&str] = &["name"];
const DECLARATOR_NAME: &[&str] = &["declarator", "name"];

pub static RULES: RuleTable = RuleTable {
    module_kind: "program",
    preamble_kinds: &["package_declaration"],
    class_kinds: &[
        "annotation_type_declaration",
        "class_declaration",
        "enum_declaration",
        "interface_declaration",
        "record_declaration",
    ],
    function_kinds: &[
        "method_declaration",
        "constructor_declaration",
        "compact_constructor_declaration",
    ],
    statement_kinds: &[
        "static_initializer",
        "if_statement",
        "for_statement",
        "enhanced_for_statement",
        "while_statement",
        "do_statement",
        "synchronized_statement",
        "try_statement",
        "try_with_resources_statement",
        "switch_expression",
    ],
    import_kinds: &["import_declaration"],
    block_delimiters: &["{", "}"],
    body_kinds: &[
        "block",
        "class_body",
        "interface_body",
        "enum_body",
        "constructor_body",
        "annotation_type_body",
        "switch_block",
    ],
    initializers: &[
        InitializerRule {
            kind: "local_variable_declaration",
            declarator: Some("variable_declarator"),
            token: "=",
        },
        InitializerRule {
            kind: "field_declaration",
            declarator: Some("variable_declarator"),
            token: "=",
        },
        InitializerRule {
            kind: "constant_declaration",
            declarator: Some("variable_declarator"),
            token: "=",
        },
        InitializerRule {
            kind: "variable_declarator",
            declarator: None,
            token: "=",
        },
    ],
    arrows: &[
        ArrowRule {
            kind: "switch_rule",
            token: "->",
        },
        ArrowRule {
            kind: "lambda_expression",
            token: "->",
        },
    ],
    wrappers: &[],
    labels: &[
        LabelRule {
            kind: "annotation_type_declaration",
            fields: NAME,
        },
        LabelRule {
            kind: "class_declaration",
            fields: NAME,
        },
        LabelRule {
            kind: "enum_declaration",
            fields: NAME,
        },
        LabelRule {
            kind: "interface_declaration",
            fields: NAME,
        },
        LabelRule {
            kind: "record_declaration",
            fields: NAME,
        },
        LabelRule {
            kind: "method_declaration",
            fields: NAME,
        },
        LabelRule {
            kind: "constructor_declaration",
            fields: NAME,
        },
        LabelRule {
            kind: "compact_constructor_declaration",
            fields: NAME,
        },
        LabelRule {
            kind: "field_declaration",
            fields: DECLARATOR_NAME,
        },
        LabelRule {
            kind: "constant_declaration",
            fields: DECLARATOR_NAME,
        },
    ],
    elided_marker: "...",
    line_comment: "//",
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

    fn kinds(nodes: &[Node<'_>]) -> Vec<&'static str> {
        nodes.iter().map(|n| n.kind()).collect()
    }

    const SOURCE: &str = r#"package com.example;

import java.util.List;

// ... existing fields
public class Foo {
    private int count = 0;

    public Foo() {
        this.count = 1;
    }

    void bar(int x) {
        try {
            run(x);
        } catch (Exception e) {
            fail();
        } finally {
            done();
        }
    }
}
"#;

    #[test]
    fn classifies_declarations() {
        let mut parser = CodeParser::new(Language::Java).unwrap();
        let tree = parser.parse(SOURCE).unwrap();
        let root = tree.root_node();
        let java = Language::Java;

        assert_eq!(java.classify(root, SOURCE), Category::Module);
        let class = find(root, "class_declaration").unwrap();
        assert_eq!(java.classify(class, SOURCE), Category::Class);
        assert_eq!(java.label_of(class, SOURCE).as_deref(), Some("Foo"));

        let method = find(root, "method_declaration").unwrap();
        assert_eq!(java.classify(method, SOURCE), Category::Function);
        assert_eq!(java.label_of(method, SOURCE).as_deref(), Some("bar"));

        let ctor = find(root, "constructor_declaration").unwrap();
        assert_eq!(java.classify(ctor, SOURCE), Category::Function);

        let field = find(root, "field_declaration").unwrap();
        assert_eq!(java.label_of(field, SOURCE).as_deref(), Some("count"));

        let import = find(root, "import_declaration").unwrap();
        assert_eq!(java.classify(import, SOURCE), Category::Import);

        let comment = find(root, "line_comment").unwrap();
        assert_eq!(java.classify(comment, SOURCE), Category::CommentedOutCode);

        let try_stmt = find(root, "try_statement").unwrap();
        assert_eq!(java.classify(try_stmt, SOURCE), Category::Statement);
    }

    #[test]
    fn module_children_skip_package() {
        let mut parser = CodeParser::new(Language::Java).unwrap();
        let tree = parser.parse(SOURCE).unwrap();
        let children = Language::Java.children_of(tree.root_node());
        assert_eq!(children[0].kind(), "import_declaration");
        assert!(!kinds(&children).contains(&"package_declaration"));
    }

    #[test]
    fn field_children_start_after_assignment() {
        let mut parser = CodeParser::new(Language::Java).unwrap();
        let tree = parser.parse(SOURCE).unwrap();
        let field = find(tree.root_node(), "field_declaration").unwrap();
        let children = Language::Java.children_of(field);
        assert_eq!(kinds(&children), vec!["decimal_integer_literal", ";"]);
    }

    #[test]
    fn container_children_keep_trailing_clauses() {
        let mut parser = CodeParser::new(Language::Java).unwrap();
        let tree = parser.parse(SOURCE).unwrap();
        let try_stmt = find(tree.root_node(), "try_statement").unwrap();
        let children = Language::Java.children_of(try_stmt);
        let kinds = kinds(&children);
        assert_eq!(kinds.first(), Some(&"{"));
        assert!(kinds.contains(&"catch_clause"));
        assert_eq!(kinds.last(), Some(&"finally_clause"));
    }

    #[test]
    fn class_children_are_body_members() {
        let mut parser = CodeParser::new(Language::Java).unwrap();
        let tree = parser.parse(SOURCE).unwrap();
        let class = find(tree.root_node(), "class_declaration").unwrap();
        let children = Language::Java.children_of(class);
        assert_eq!(
            kinds(&children),
            vec![
                "{",
                "field_declaration",
                "constructor_declaration",
                "method_declaration",
                "}"
            ]
        );
    }

    #[test]
    fn switch_rule_children_start_after_arrow() {
        let source = "class A { int f(int x) { return switch (x) { case 1 -> 10; default -> 0; }; } }";
        let mut parser = CodeParser::new(Language::Java).unwrap();
        let tree = parser.parse(source).unwrap();
        let rule = find(tree.root_node(), "switch_rule").unwrap();
        let children = Language::Java.children_of(rule);
        assert_eq!(kinds(&children), vec!["expression_statement"]);
    }
}
