use super::*;

// ============================================================================
// Classes
// ============================================================================

ast_node!(ClassSpec, CLASS_SPEC);

impl ClassSpec {
    find_token_kind_method!(class_key, [CLASS_KW, STRUCT_KW, UNION_KW], "Get the class key.");
    has_token_method!(is_final, FINAL_KW, "struct S final {}");
    first_child_method!(name, QualifiedName);
    first_child_method!(base_clause, BaseClause);
    first_child_method!(member_list, MemberList);

    /// Base specifiers in declaration order.
    pub fn bases(&self) -> Vec<BaseSpec> {
        self.base_clause()
            .map(|clause| clause.bases().collect())
            .unwrap_or_default()
    }

    /// Members in declaration order.
    pub fn members(&self) -> Vec<Item> {
        self.member_list()
            .map(|list| list.items().collect())
            .unwrap_or_default()
    }
}

ast_node!(BaseClause, BASE_CLAUSE);

impl BaseClause {
    children_method!(bases, BaseSpec);
}

ast_node!(BaseSpec, BASE_SPEC);

impl BaseSpec {
    has_token_method!(is_virtual, VIRTUAL_KW, "struct D : virtual B {}");
    has_token_method!(is_pack, ELLIPSIS, "struct D : Bases... {}");
    find_token_kind_method!(access, [PUBLIC_KW, PROTECTED_KW, PRIVATE_KW], "Get the access keyword.");
    first_child_method!(name, QualifiedName);
}

ast_node!(MemberList, MEMBER_LIST);

impl MemberList {
    children_method!(items, Item);

    pub fn l_brace(&self) -> Option<SyntaxToken> {
        find_token(&self.0, SyntaxKind::L_BRACE)
    }

    pub fn r_brace(&self) -> Option<SyntaxToken> {
        find_token(&self.0, SyntaxKind::R_BRACE)
    }
}

// ============================================================================
// Enums
// ============================================================================

ast_node!(EnumSpec, ENUM_SPEC);

impl EnumSpec {
    token_text_method!(name, IDENT);
    first_child_method!(underlying, TypeId);
    first_child_method!(enumerator_list, EnumeratorList);

    pub fn is_scoped(&self) -> bool {
        has_token(&self.0, SyntaxKind::CLASS_KW) || has_token(&self.0, SyntaxKind::STRUCT_KW)
    }

    pub fn enumerators(&self) -> Vec<Enumerator> {
        self.enumerator_list()
            .map(|list| list.enumerators().collect())
            .unwrap_or_default()
    }
}

ast_node!(EnumeratorList, ENUMERATOR_LIST);

impl EnumeratorList {
    children_method!(enumerators, Enumerator);

    pub fn r_brace(&self) -> Option<SyntaxToken> {
        find_token(&self.0, SyntaxKind::R_BRACE)
    }
}

ast_node!(Enumerator, ENUMERATOR);

impl Enumerator {
    token_text_method!(name, IDENT);
    first_child_method!(value, Expr);
}
