//! Syntax kinds for the Rowan-based CST
//!
//! This enum defines all possible node and token kinds in the syntax tree.
//! The node kinds cover the declaration subset of C and C++ that the model
//! layer renders: namespaces, classes, enums, templates, typedefs, usings,
//! functions and variables. Statement bodies are kept as token soup with
//! nested declaration statements.

/// All syntax kinds (tokens and nodes)
///
/// Tokens are leaf nodes (identifiers, keywords, punctuation).
/// Nodes are composite (class specifiers, declarators, template headers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
#[allow(non_camel_case_types)]
pub enum SyntaxKind {
    // =========================================================================
    // TRIVIA (whitespace and comments - preserved but not semantically meaningful)
    // =========================================================================
    WHITESPACE = 0,
    LINE_COMMENT,
    BLOCK_COMMENT,

    // =========================================================================
    // LITERALS
    // =========================================================================
    IDENT,     // identifier
    INTEGER,   // 42, 0x2A, 42u
    FLOAT,     // 3.14f
    STRING,    // "hello"
    CHAR_LIT,  // 'c'
    PREPROC,   // #include <x> (whole line)

    // =========================================================================
    // PUNCTUATION
    // =========================================================================
    L_BRACE,     // {
    R_BRACE,     // }
    L_BRACKET,   // [
    R_BRACKET,   // ]
    L_PAREN,     // (
    R_PAREN,     // )
    SEMICOLON,   // ;
    COLON,       // :
    COLON_COLON, // ::
    COMMA,       // ,
    DOT,         // .
    ELLIPSIS,    // ...
    EQ,          // =
    LT,          // <
    GT,          // >
    STAR,        // *
    AMP,         // &
    AMP_AMP,     // &&
    TILDE,       // ~
    PLUS,        // +
    MINUS,       // -
    SLASH,       // /
    PERCENT,     // %
    BANG,        // !
    PIPE,        // |
    CARET,       // ^
    QUESTION,    // ?
    ARROW,       // ->
    OPERATOR_PUNCT, // any other multi-character operator (==, <<, +=, ...)

    // =========================================================================
    // KEYWORDS
    // =========================================================================
    CLASS_KW,
    STRUCT_KW,
    UNION_KW,
    ENUM_KW,
    NAMESPACE_KW,
    USING_KW,
    TYPEDEF_KW,
    TEMPLATE_KW,
    TYPENAME_KW,
    FRIEND_KW,
    PUBLIC_KW,
    PROTECTED_KW,
    PRIVATE_KW,
    VIRTUAL_KW,
    STATIC_KW,
    EXTERN_KW,
    INLINE_KW,
    CONST_KW,
    VOLATILE_KW,
    MUTABLE_KW,
    EXPLICIT_KW,
    CONSTEXPR_KW,
    OPERATOR_KW,
    DECLTYPE_KW,
    FINAL_KW,
    OVERRIDE_KW,
    NOEXCEPT_KW,
    DEFAULT_KW,
    DELETE_KW,
    STATIC_ASSERT_KW,
    // builtin type keywords
    AUTO_KW,
    VOID_KW,
    BOOL_KW,
    CHAR_KW,
    WCHAR_T_KW,
    CHAR8_T_KW,
    CHAR16_T_KW,
    CHAR32_T_KW,
    SHORT_KW,
    INT_KW,
    LONG_KW,
    SIGNED_KW,
    UNSIGNED_KW,
    FLOAT_KW,
    DOUBLE_KW,

    // =========================================================================
    // NODES
    // =========================================================================
    SOURCE_FILE,
    PREPROC_DIRECTIVE,
    NAMESPACE_DEF,
    NAMESPACE_ALIAS,
    DECL_BLOCK,
    LINKAGE_SPEC,
    USING_DIRECTIVE,
    USING_DECL,
    ALIAS_DECL,
    TYPEDEF_DECL,
    TEMPLATE_DECL,
    TEMPLATE_PARAMS,
    TEMPLATE_PARAM,
    CLASS_SPEC,
    CLASS_FWD,
    BASE_CLAUSE,
    BASE_SPEC,
    MEMBER_LIST,
    ACCESS_SPEC,
    FRIEND_DECL,
    ENUM_SPEC,
    ENUM_FWD,
    ENUMERATOR_LIST,
    ENUMERATOR,
    SIMPLE_DECL,
    FUNCTION_DEF,
    DECL_SPECIFIERS,
    TYPE_REF,
    DECLTYPE_SPEC,
    TYPE_ID,
    QUALIFIED_NAME,
    NAME_SEGMENT,
    TEMPLATE_ARGS,
    TEMPLATE_ARG,
    DECLARATOR,
    NESTED_DECLARATOR,
    PTR_OP,
    ARRAY_SUFFIX,
    PARAM_LIST,
    PARAM,
    TRAILING_RETURN,
    INITIALIZER,
    CTOR_INITIALIZER,
    COMPOUND_STMT,
    STATEMENT,
    EXPR,
    ERROR,

    // Sentinel
    __LAST,
}

impl SyntaxKind {
    /// Check if this is a trivia token (whitespace or comment)
    pub fn is_trivia(self) -> bool {
        matches!(self, Self::WHITESPACE | Self::LINE_COMMENT | Self::BLOCK_COMMENT)
    }

    /// Check if this is a keyword
    pub fn is_keyword(self) -> bool {
        (self as u16) >= (Self::CLASS_KW as u16) && (self as u16) <= (Self::DOUBLE_KW as u16)
    }

    /// Check if this is a keyword naming a builtin type (or part of one)
    pub fn is_builtin_type(self) -> bool {
        (self as u16) >= (Self::AUTO_KW as u16) && (self as u16) <= (Self::DOUBLE_KW as u16)
    }

    /// Check if this is `class`, `struct` or `union`
    pub fn is_class_key(self) -> bool {
        matches!(self, Self::CLASS_KW | Self::STRUCT_KW | Self::UNION_KW)
    }

    /// Check if this is an access specifier keyword
    pub fn is_access(self) -> bool {
        matches!(self, Self::PUBLIC_KW | Self::PROTECTED_KW | Self::PRIVATE_KW)
    }

    /// Check if this is `const` or `volatile`
    pub fn is_cv(self) -> bool {
        matches!(self, Self::CONST_KW | Self::VOLATILE_KW)
    }

    /// Check if this is a punctuation token
    pub fn is_punct(self) -> bool {
        (self as u16) >= (Self::L_BRACE as u16) && (self as u16) <= (Self::OPERATOR_PUNCT as u16)
    }

    /// Check if this is a literal
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            Self::INTEGER | Self::FLOAT | Self::STRING | Self::CHAR_LIT
        )
    }
}

impl From<SyntaxKind> for rowan::SyntaxKind {
    fn from(kind: SyntaxKind) -> Self {
        Self(kind as u16)
    }
}

impl From<rowan::SyntaxKind> for SyntaxKind {
    fn from(raw: rowan::SyntaxKind) -> Self {
        assert!(raw.0 < SyntaxKind::__LAST as u16);
        // Safety: we control all syntax kinds and check bounds above
        unsafe { std::mem::transmute::<u16, SyntaxKind>(raw.0) }
    }
}

/// Language definition for Rowan
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CppLanguage {}

impl rowan::Language for CppLanguage {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        raw.into()
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        kind.into()
    }
}

/// Type aliases for convenience
pub type SyntaxNode = rowan::SyntaxNode<CppLanguage>;
pub type SyntaxToken = rowan::SyntaxToken<CppLanguage>;
pub type SyntaxElement = rowan::SyntaxElement<CppLanguage>;
pub type SyntaxNodeChildren = rowan::SyntaxNodeChildren<CppLanguage>;
