use super::*;

// ============================================================================
// Specifiers
// ============================================================================

ast_node!(DeclSpecifiers, DECL_SPECIFIERS);

impl DeclSpecifiers {
    has_token_method!(is_static, STATIC_KW, "static int x;");
    has_token_method!(is_extern, EXTERN_KW, "extern int x;");
    has_token_method!(is_inline, INLINE_KW, "inline void f();");
    has_token_method!(is_virtual, VIRTUAL_KW, "virtual void f();");
    has_token_method!(is_explicit, EXPLICIT_KW, "explicit A(int);");
    has_token_method!(is_constexpr, CONSTEXPR_KW, "constexpr int n = 1;");
    has_token_method!(is_mutable, MUTABLE_KW, "mutable int cache;");
    has_token_method!(is_const, CONST_KW, "const int x;");
    has_token_method!(is_volatile, VOLATILE_KW, "volatile int x;");
    first_child_method!(class_spec, ClassSpec);
    first_child_method!(enum_spec, EnumSpec);
    first_child_method!(type_ref, TypeRef);
}

ast_node!(TypeRef, TYPE_REF);

impl TypeRef {
    find_token_kind_method!(
        elaborated_key,
        [CLASS_KW, STRUCT_KW, UNION_KW, ENUM_KW],
        "Class key of an elaborated type specifier such as `struct S`."
    );
    has_token_method!(is_typename, TYPENAME_KW, "typename T::type");
    first_child_method!(name, QualifiedName);
    first_child_method!(decltype_spec, DecltypeSpec);

    /// Builtin keywords joined by one space (`unsigned long`), if this is a builtin.
    pub fn builtin(&self) -> Option<String> {
        let words: Vec<String> = self
            .0
            .children_with_tokens()
            .filter_map(|e| e.into_token())
            .filter(|t| t.kind().is_builtin_type())
            .map(|t| t.text().to_string())
            .collect();
        (!words.is_empty()).then(|| words.join(" "))
    }
}

ast_node!(DecltypeSpec, DECLTYPE_SPEC);

impl DecltypeSpec {
    first_child_method!(expr, Expr);
}

ast_node!(TypeId, TYPE_ID);

impl TypeId {
    first_child_method!(specifiers, DeclSpecifiers);
    first_child_method!(declarator, Declarator);
}

// ============================================================================
// Names
// ============================================================================

ast_node!(QualifiedName, QUALIFIED_NAME);

impl QualifiedName {
    children_vec_method!(segments, NameSegment);

    /// Whether the name starts with `::`.
    pub fn is_global(&self) -> bool {
        self.0
            .first_token()
            .is_some_and(|t| t.kind() == SyntaxKind::COLON_COLON)
    }

    /// Segment names without template arguments.
    pub fn segment_names(&self) -> Vec<String> {
        self.segments().iter().filter_map(NameSegment::name).collect()
    }

    /// Name of the final segment.
    pub fn last_name(&self) -> Option<String> {
        self.segments().last().and_then(NameSegment::name)
    }
}

ast_node!(NameSegment, NAME_SEGMENT);

impl NameSegment {
    first_child_method!(template_args, TemplateArgs);
    has_token_method!(is_destructor, TILDE, "~A");
    has_token_method!(is_operator, OPERATOR_KW, "operator==");

    /// The identifier (`A`, `~A`, `operator==`), without template arguments.
    pub fn name(&self) -> Option<String> {
        let mut out = String::new();
        let mut prev: Option<SyntaxKind> = None;
        for token in self
            .0
            .children_with_tokens()
            .filter_map(|e| e.into_token())
            .filter(|t| !t.kind().is_trivia() && t.kind() != SyntaxKind::TEMPLATE_KW)
        {
            let kind = token.kind();
            if prev.is_some_and(|p| is_word(p) && is_word(kind)) {
                out.push(' ');
            }
            out.push_str(token.text());
            prev = Some(kind);
        }
        (!out.is_empty()).then_some(out)
    }
}

ast_node!(TemplateArgs, TEMPLATE_ARGS);

impl TemplateArgs {
    children_vec_method!(args, TemplateArg);
}

ast_node!(TemplateArg, TEMPLATE_ARG);

impl TemplateArg {
    first_child_method!(type_id, TypeId);
    first_child_method!(expr, Expr);
    has_token_method!(is_pack, ELLIPSIS, "Ts...");
}

// ============================================================================
// Declarators
// ============================================================================

ast_node!(Declarator, DECLARATOR);

impl Declarator {
    children_vec_method!(ptr_ops, PtrOp);
    first_child_method!(name, QualifiedName);
    first_child_method!(nested, NestedDeclarator);
    children_vec_method!(array_suffixes, ArraySuffix);
    first_child_method!(params, ParamList);
    first_child_method!(trailing_return, TrailingReturn);
    first_child_method!(initializer, Initializer);
    has_token_method!(is_pack, ELLIPSIS, "Ts... args");
    has_token_method!(is_override, OVERRIDE_KW, "void f() override;");

    /// `const` applied to the function (after the parameter list).
    pub fn is_const_function(&self) -> bool {
        self.params().is_some() && has_token(&self.0, SyntaxKind::CONST_KW)
    }

    /// The declared name, looking through `(*name)`.
    pub fn declared_name(&self) -> Option<QualifiedName> {
        self.name().or_else(|| self.nested().and_then(|n| n.name()))
    }

    /// Whether this declares a function (not a pointer to one).
    pub fn is_function(&self) -> bool {
        self.params().is_some() && self.nested().is_none()
    }

    /// Whether this declares a pointer or reference to a function.
    pub fn is_function_pointer(&self) -> bool {
        self.params().is_some() && self.nested().is_some()
    }

    /// `= 0`
    pub fn is_pure(&self) -> bool {
        self.initializer()
            .and_then(|i| i.expr())
            .is_some_and(|e| e.text() == "0")
    }

    /// `= default`
    pub fn is_defaulted(&self) -> bool {
        self.initializer()
            .and_then(|i| i.expr())
            .is_some_and(|e| e.text() == "default")
    }

    /// `= delete`
    pub fn is_deleted(&self) -> bool {
        self.initializer()
            .and_then(|i| i.expr())
            .is_some_and(|e| e.text() == "delete")
    }
}

ast_node!(NestedDeclarator, NESTED_DECLARATOR);

impl NestedDeclarator {
    children_vec_method!(ptr_ops, PtrOp);
    first_child_method!(name, QualifiedName);
    children_vec_method!(array_suffixes, ArraySuffix);
}

/// A pointer operator in a declarator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PtrOpKind {
    Pointer { is_const: bool, is_volatile: bool },
    LValueRef,
    RValueRef,
}

ast_node!(PtrOp, PTR_OP);

impl PtrOp {
    pub fn kind(&self) -> PtrOpKind {
        match self.0.first_token().map(|t| t.kind()) {
            Some(SyntaxKind::AMP) => PtrOpKind::LValueRef,
            Some(SyntaxKind::AMP_AMP) => PtrOpKind::RValueRef,
            _ => PtrOpKind::Pointer {
                is_const: has_token(&self.0, SyntaxKind::CONST_KW),
                is_volatile: has_token(&self.0, SyntaxKind::VOLATILE_KW),
            },
        }
    }
}

ast_node!(ArraySuffix, ARRAY_SUFFIX);

impl ArraySuffix {
    first_child_method!(size, Expr);
}

ast_node!(ParamList, PARAM_LIST);

impl ParamList {
    children_vec_method!(params, Param);
}

ast_node!(Param, PARAM);

impl Param {
    first_child_method!(specifiers, DeclSpecifiers);
    first_child_method!(declarator, Declarator);

    /// C-style `...`
    pub fn is_ellipsis(&self) -> bool {
        self.specifiers().is_none() && has_token(&self.0, SyntaxKind::ELLIPSIS)
    }

    /// Default argument, written either in the declarator or after an
    /// unnamed parameter.
    pub fn default_value(&self) -> Option<Expr> {
        if let Some(init) = self.declarator().and_then(|d| d.initializer()) {
            return init.expr();
        }
        self.0.children().find_map(Expr::cast)
    }
}

ast_node!(TrailingReturn, TRAILING_RETURN);

impl TrailingReturn {
    first_child_method!(type_id, TypeId);
}

ast_node!(Initializer, INITIALIZER);

impl Initializer {
    first_child_method!(expr, Expr);
}
