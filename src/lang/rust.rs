use crate::lang::{ArrowRule, InitializerRule, LabelRule, RuleTable};

const NAME: &[&str] = &["name"];

pub static RULES: RuleTable = RuleTable {
    module_kind: "source_file",
    preamble_kinds: &[],
    class_kinds: &[
        "struct_item",
        "enum_item",
        "union_item",
        "trait_item",
        "impl_item",
        "mod_item",
    ],
    function_kinds: &["function_item", "function_signature_item"],
    statement_kinds: &[
        "if_expression",
        "match_expression",
        "for_expression",
        "while_expression",
        "loop_expression",
        "unsafe_block",
    ],
    import_kinds: &["use_declaration", "extern_crate_declaration"],
    block_delimiters: &["{", "}"],
    body_kinds: &[
        "block",
        "declaration_list",
        "field_declaration_list",
        "enum_variant_list",
        "match_block",
    ],
    initializers: &[
        InitializerRule {
            kind: "let_declaration",
            declarator: None,
            token: "=",
        },
        InitializerRule {
            kind: "const_item",
            declarator: None,
            token: "=",
        },
        InitializerRule {
            kind: "static_item",
            declarator: None,
            token: "=",
        },
    ],
    arrows: &[ArrowRule {
        kind: "match_arm",
        token: "=>",
    }],
    wrappers: &[],
    labels: &[
        LabelRule {
            kind: "struct_item",
            fields: NAME,
        },
        LabelRule {
            kind: "enum_item",
            fields: NAME,
        },
        LabelRule {
            kind: "union_item",
            fields: NAME,
        },
        LabelRule {
            kind: "trait_item",
            fields: NAME,
        },
        LabelRule {
            kind: "mod_item",
            fields: NAME,
        },
        // impl blocks are addressed by the implementing type
        LabelRule {
            kind: "impl_item",
            fields: &["type"],
        },
        LabelRule {
            kind: "function_item",
            fields: NAME,
        },
        LabelRule {
            kind: "function_signature_item",
            fields: NAME,
        },
        LabelRule {
            kind: "const_item",
            fields: NAME,
        },
        LabelRule {
            kind: "static_item",
            fields: NAME,
        },
    ],
    elided_marker: "...",
    line_comment: "//",
};
