use super::*;

// ============================================================================
// Root
// ============================================================================

ast_node!(SourceFile, SOURCE_FILE);

impl SourceFile {
    children_method!(items, Item);
    first_child_method!(type_id, TypeId);

    /// `#include` targets in source order, with quotes or angle brackets stripped.
    pub fn includes(&self) -> Vec<String> {
        self.items()
            .filter_map(|item| match item {
                Item::Preproc(p) => p.include_target(),
                _ => None,
            })
            .collect()
    }
}

// ============================================================================
// Items
// ============================================================================

/// Any declaration that can appear in a namespace, class or block.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Item {
    Preproc(PreprocDirective),
    Namespace(NamespaceDef),
    NamespaceAlias(NamespaceAlias),
    Linkage(LinkageSpec),
    UsingDirective(UsingDirective),
    UsingDecl(UsingDecl),
    Alias(AliasDecl),
    Typedef(TypedefDecl),
    Template(TemplateDecl),
    ClassForward(ClassForward),
    EnumForward(EnumForward),
    Simple(SimpleDecl),
    Function(FunctionDef),
    Friend(FriendDecl),
    Access(AccessSpec),
}

impl AstNode for Item {
    fn can_cast(kind: SyntaxKind) -> bool {
        matches!(
            kind,
            SyntaxKind::PREPROC_DIRECTIVE
                | SyntaxKind::NAMESPACE_DEF
                | SyntaxKind::NAMESPACE_ALIAS
                | SyntaxKind::LINKAGE_SPEC
                | SyntaxKind::USING_DIRECTIVE
                | SyntaxKind::USING_DECL
                | SyntaxKind::ALIAS_DECL
                | SyntaxKind::TYPEDEF_DECL
                | SyntaxKind::TEMPLATE_DECL
                | SyntaxKind::CLASS_FWD
                | SyntaxKind::ENUM_FWD
                | SyntaxKind::SIMPLE_DECL
                | SyntaxKind::FUNCTION_DEF
                | SyntaxKind::FRIEND_DECL
                | SyntaxKind::ACCESS_SPEC
        )
    }

    fn cast(node: SyntaxNode) -> Option<Self> {
        match node.kind() {
            SyntaxKind::PREPROC_DIRECTIVE => Some(Self::Preproc(PreprocDirective(node))),
            SyntaxKind::NAMESPACE_DEF => Some(Self::Namespace(NamespaceDef(node))),
            SyntaxKind::NAMESPACE_ALIAS => Some(Self::NamespaceAlias(NamespaceAlias(node))),
            SyntaxKind::LINKAGE_SPEC => Some(Self::Linkage(LinkageSpec(node))),
            SyntaxKind::USING_DIRECTIVE => Some(Self::UsingDirective(UsingDirective(node))),
            SyntaxKind::USING_DECL => Some(Self::UsingDecl(UsingDecl(node))),
            SyntaxKind::ALIAS_DECL => Some(Self::Alias(AliasDecl(node))),
            SyntaxKind::TYPEDEF_DECL => Some(Self::Typedef(TypedefDecl(node))),
            SyntaxKind::TEMPLATE_DECL => Some(Self::Template(TemplateDecl(node))),
            SyntaxKind::CLASS_FWD => Some(Self::ClassForward(ClassForward(node))),
            SyntaxKind::ENUM_FWD => Some(Self::EnumForward(EnumForward(node))),
            SyntaxKind::SIMPLE_DECL => Some(Self::Simple(SimpleDecl(node))),
            SyntaxKind::FUNCTION_DEF => Some(Self::Function(FunctionDef(node))),
            SyntaxKind::FRIEND_DECL => Some(Self::Friend(FriendDecl(node))),
            SyntaxKind::ACCESS_SPEC => Some(Self::Access(AccessSpec(node))),
            _ => None,
        }
    }

    fn syntax(&self) -> &SyntaxNode {
        match self {
            Self::Preproc(n) => &n.0,
            Self::Namespace(n) => &n.0,
            Self::NamespaceAlias(n) => &n.0,
            Self::Linkage(n) => &n.0,
            Self::UsingDirective(n) => &n.0,
            Self::UsingDecl(n) => &n.0,
            Self::Alias(n) => &n.0,
            Self::Typedef(n) => &n.0,
            Self::Template(n) => &n.0,
            Self::ClassForward(n) => &n.0,
            Self::EnumForward(n) => &n.0,
            Self::Simple(n) => &n.0,
            Self::Function(n) => &n.0,
            Self::Friend(n) => &n.0,
            Self::Access(n) => &n.0,
        }
    }
}

// ============================================================================
// Preprocessor
// ============================================================================

ast_node!(PreprocDirective, PREPROC_DIRECTIVE);

impl PreprocDirective {
    /// For `#include "a.h"` or `#include <a.h>`, the path between the delimiters.
    pub fn include_target(&self) -> Option<String> {
        let text = find_token(&self.0, SyntaxKind::PREPROC)?.text().to_string();
        let rest = text.strip_prefix('#')?.trim_start();
        let rest = rest.strip_prefix("include")?.trim();
        let (open, close) = match rest.chars().next()? {
            '"' => ('"', '"'),
            '<' => ('<', '>'),
            _ => return None,
        };
        let inner = rest.strip_prefix(open)?;
        let end = inner.find(close)?;
        Some(inner[..end].to_string())
    }
}

// ============================================================================
// Namespaces
// ============================================================================

ast_node!(NamespaceDef, NAMESPACE_DEF);

impl NamespaceDef {
    has_token_method!(is_inline, INLINE_KW, "inline namespace v1 {}");
    first_child_method!(name, QualifiedName);
    first_child_method!(body, DeclBlock);
}

ast_node!(NamespaceAlias, NAMESPACE_ALIAS);

impl NamespaceAlias {
    token_text_method!(name, IDENT);
    first_child_method!(target, QualifiedName);
}

ast_node!(DeclBlock, DECL_BLOCK);

impl DeclBlock {
    children_method!(items, Item);

    /// The closing `}` token, if present.
    pub fn r_brace(&self) -> Option<SyntaxToken> {
        find_token(&self.0, SyntaxKind::R_BRACE)
    }
}

ast_node!(LinkageSpec, LINKAGE_SPEC);

impl LinkageSpec {
    first_child_method!(body, DeclBlock);
}

// ============================================================================
// Using
// ============================================================================

ast_node!(UsingDirective, USING_DIRECTIVE);

impl UsingDirective {
    first_child_method!(target, QualifiedName);
}

ast_node!(UsingDecl, USING_DECL);

impl UsingDecl {
    first_child_method!(target, QualifiedName);
}

ast_node!(AliasDecl, ALIAS_DECL);

impl AliasDecl {
    token_text_method!(name, IDENT);
    first_child_method!(type_id, TypeId);
}

// ============================================================================
// Typedef, template
// ============================================================================

ast_node!(TypedefDecl, TYPEDEF_DECL);

impl TypedefDecl {
    first_child_method!(specifiers, DeclSpecifiers);
    children_vec_method!(declarators, Declarator);
}

ast_node!(TemplateDecl, TEMPLATE_DECL);

impl TemplateDecl {
    first_child_method!(params, TemplateParams);

    /// The templated declaration.
    pub fn item(&self) -> Option<Item> {
        self.0.children().find_map(Item::cast)
    }
}

ast_node!(TemplateParams, TEMPLATE_PARAMS);

impl TemplateParams {
    children_method!(params, TemplateParam);
}

/// What a template parameter stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateParamKind {
    /// `class T`, `typename T`
    Type,
    /// `int N`
    NonType,
    /// `template<class> class C`
    Template,
}

ast_node!(TemplateParam, TEMPLATE_PARAM);

impl TemplateParam {
    first_child_method!(specifiers, DeclSpecifiers);
    first_child_method!(declarator, Declarator);
    first_child_method!(default_type, TypeId);
    first_child_method!(default_template, QualifiedName);

    pub fn kind(&self) -> TemplateParamKind {
        match self.0.first_token().map(|t| t.kind()) {
            Some(SyntaxKind::TEMPLATE_KW) => TemplateParamKind::Template,
            Some(SyntaxKind::CLASS_KW | SyntaxKind::TYPENAME_KW) if self.specifiers().is_none() => {
                TemplateParamKind::Type
            }
            _ => TemplateParamKind::NonType,
        }
    }

    pub fn name(&self) -> Option<String> {
        match self.kind() {
            TemplateParamKind::NonType => self.declarator()?.name()?.last_name(),
            _ => find_token(&self.0, SyntaxKind::IDENT).map(|t| t.text().to_string()),
        }
    }

    pub fn is_variadic(&self) -> bool {
        match self.kind() {
            TemplateParamKind::NonType => self.declarator().is_some_and(|d| d.is_pack()),
            _ => has_token(&self.0, SyntaxKind::ELLIPSIS),
        }
    }

    /// Default value of a non-type parameter.
    pub fn default_expr(&self) -> Option<Expr> {
        if let Some(init) = self.declarator().and_then(|d| d.initializer()) {
            return init.expr();
        }
        self.0.children().find_map(Expr::cast)
    }
}

// ============================================================================
// Forward declarations
// ============================================================================

ast_node!(ClassForward, CLASS_FWD);

impl ClassForward {
    find_token_kind_method!(class_key, [CLASS_KW, STRUCT_KW, UNION_KW], "Get the class key.");
    first_child_method!(name, QualifiedName);
}

ast_node!(EnumForward, ENUM_FWD);

impl EnumForward {
    token_text_method!(name, IDENT);
    first_child_method!(underlying, TypeId);

    pub fn is_scoped(&self) -> bool {
        has_token(&self.0, SyntaxKind::CLASS_KW) || has_token(&self.0, SyntaxKind::STRUCT_KW)
    }
}

// ============================================================================
// Simple declarations and function definitions
// ============================================================================

ast_node!(SimpleDecl, SIMPLE_DECL);

impl SimpleDecl {
    first_child_method!(specifiers, DeclSpecifiers);
    children_vec_method!(declarators, Declarator);
}

ast_node!(FunctionDef, FUNCTION_DEF);

impl FunctionDef {
    first_child_method!(specifiers, DeclSpecifiers);
    first_child_method!(declarator, Declarator);
    first_child_method!(body, CompoundStmt);
}

ast_node!(FriendDecl, FRIEND_DECL);

impl FriendDecl {
    find_token_kind_method!(class_key, [CLASS_KW, STRUCT_KW, UNION_KW], "Class key of `friend class X;`.");
    first_child_method!(name, QualifiedName);
    first_child_method!(specifiers, DeclSpecifiers);
    first_child_method!(declarator, Declarator);
    first_child_method!(body, CompoundStmt);
}

ast_node!(AccessSpec, ACCESS_SPEC);

impl AccessSpec {
    find_token_kind_method!(access, [PUBLIC_KW, PROTECTED_KW, PRIVATE_KW], "Get the access keyword.");
}

// ============================================================================
// Bodies
// ============================================================================

ast_node!(CompoundStmt, COMPOUND_STMT);

impl CompoundStmt {
    /// Declarations made anywhere in this block, including nested blocks
    /// and blocks inside statements, in source order.
    pub fn declarations(&self) -> Vec<Item> {
        let mut out = Vec::new();
        collect_block_items(&self.0, &mut out);
        out
    }
}

fn collect_block_items(node: &SyntaxNode, out: &mut Vec<Item>) {
    for child in node.children() {
        match child.kind() {
            SyntaxKind::COMPOUND_STMT | SyntaxKind::STATEMENT => collect_block_items(&child, out),
            _ => {
                if let Some(item) = Item::cast(child) {
                    out.push(item);
                }
            }
        }
    }
}

ast_node!(Expr, EXPR);

impl Expr {
    pub fn text(&self) -> String {
        compact_text(&self.0)
    }
}
