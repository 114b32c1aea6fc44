//! Logos-based lexer for the C/C++ declaration subset
//!
//! Fast tokenization using the logos crate. `>>` is never produced as a
//! single token so nested template argument lists close naturally.

use super::syntax_kind::SyntaxKind;
use logos::Logos;
use rowan::TextSize;

/// A token with its kind, text, and position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: SyntaxKind,
    pub text: &'a str,
    pub offset: TextSize,
}

/// Lexer wrapping the logos-generated tokenizer
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, LogosToken>,
    offset: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            inner: LogosToken::lexer(input),
            offset: 0,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let logos_token = self.inner.next()?;
        let text = self.inner.slice();
        let offset = TextSize::new(self.offset);
        self.offset += text.len() as u32;

        let kind = match logos_token {
            Ok(t) => t.into(),
            Err(()) => SyntaxKind::ERROR,
        };

        Some(Token { kind, text, offset })
    }
}

/// Tokenize an entire string into a Vec
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    Lexer::new(input).collect()
}

/// Consumes a block comment body up to and including `*/`.
/// An unterminated comment runs to the end of input.
fn block_comment(lex: &mut logos::Lexer<'_, LogosToken>) {
    let rest = lex.remainder();
    match rest.find("*/") {
        Some(end) => lex.bump(end + 2),
        None => lex.bump(rest.len()),
    }
}

/// Logos token enum - maps to SyntaxKind
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
pub enum LogosToken {
    // =========================================================================
    // TRIVIA
    // =========================================================================
    #[regex(r"[ \t\r\n\f]+")]
    Whitespace,

    #[regex(r"//[^\n]*")]
    LineComment,

    #[token("/*", block_comment)]
    BlockComment,

    #[regex(r"#[^\n]*")]
    Preproc,

    // =========================================================================
    // LITERALS
    // =========================================================================
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    #[regex(r"(0[xX][0-9a-fA-F']+|[0-9][0-9']*)[uUlLzZ]*")]
    Integer,

    #[regex(r"([0-9]+\.[0-9]*|\.[0-9]+)([eE][+-]?[0-9]+)?[fFlL]?")]
    Float,

    #[regex(r#"(u8|u|U|L)?"([^"\\\n]|\\.)*""#)]
    String,

    #[regex(r"(u8|u|U|L)?'([^'\\\n]|\\.)+'")]
    Char,

    // =========================================================================
    // MULTI-CHARACTER PUNCTUATION (must come before single-char)
    // =========================================================================
    #[token("::")]
    ColonColon,

    #[token("...")]
    Ellipsis,

    #[token("&&")]
    AmpAmp,

    #[token("->")]
    Arrow,

    #[token("==")]
    #[token("!=")]
    #[token("<=")]
    #[token(">=")]
    #[token("<=>")]
    #[token("+=")]
    #[token("-=")]
    #[token("*=")]
    #[token("/=")]
    #[token("%=")]
    #[token("^=")]
    #[token("|=")]
    #[token("&=")]
    #[token("<<")]
    #[token("<<=")]
    #[token("++")]
    #[token("--")]
    #[token("||")]
    #[token("->*")]
    #[token(".*")]
    OperatorPunct,

    // =========================================================================
    // SINGLE-CHARACTER PUNCTUATION
    // =========================================================================
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("=")]
    Eq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("*")]
    Star,
    #[token("&")]
    Amp,
    #[token("~")]
    Tilde,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("!")]
    Bang,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("?")]
    Question,

    // =========================================================================
    // KEYWORDS
    // =========================================================================
    #[token("class")]
    ClassKw,
    #[token("struct")]
    StructKw,
    #[token("union")]
    UnionKw,
    #[token("enum")]
    EnumKw,
    #[token("namespace")]
    NamespaceKw,
    #[token("using")]
    UsingKw,
    #[token("typedef")]
    TypedefKw,
    #[token("template")]
    TemplateKw,
    #[token("typename")]
    TypenameKw,
    #[token("friend")]
    FriendKw,
    #[token("public")]
    PublicKw,
    #[token("protected")]
    ProtectedKw,
    #[token("private")]
    PrivateKw,
    #[token("virtual")]
    VirtualKw,
    #[token("static")]
    StaticKw,
    #[token("extern")]
    ExternKw,
    #[token("inline")]
    InlineKw,
    #[token("const")]
    ConstKw,
    #[token("volatile")]
    VolatileKw,
    #[token("mutable")]
    MutableKw,
    #[token("explicit")]
    ExplicitKw,
    #[token("constexpr")]
    ConstexprKw,
    #[token("operator")]
    OperatorKw,
    #[token("decltype")]
    DecltypeKw,
    #[token("final")]
    FinalKw,
    #[token("override")]
    OverrideKw,
    #[token("noexcept")]
    NoexceptKw,
    #[token("default")]
    DefaultKw,
    #[token("delete")]
    DeleteKw,
    #[token("static_assert")]
    StaticAssertKw,
    #[token("auto")]
    AutoKw,
    #[token("void")]
    VoidKw,
    #[token("bool")]
    BoolKw,
    #[token("char")]
    CharKw,
    #[token("wchar_t")]
    WcharTKw,
    #[token("char8_t")]
    Char8TKw,
    #[token("char16_t")]
    Char16TKw,
    #[token("char32_t")]
    Char32TKw,
    #[token("short")]
    ShortKw,
    #[token("int")]
    IntKw,
    #[token("long")]
    LongKw,
    #[token("signed")]
    SignedKw,
    #[token("unsigned")]
    UnsignedKw,
    #[token("float")]
    FloatKw,
    #[token("double")]
    DoubleKw,
}

impl From<LogosToken> for SyntaxKind {
    fn from(token: LogosToken) -> Self {
        use LogosToken::*;
        match token {
            // Trivia
            Whitespace => SyntaxKind::WHITESPACE,
            LineComment => SyntaxKind::LINE_COMMENT,
            BlockComment => SyntaxKind::BLOCK_COMMENT,
            Preproc => SyntaxKind::PREPROC,

            // Literals
            Ident => SyntaxKind::IDENT,
            Integer => SyntaxKind::INTEGER,
            Float => SyntaxKind::FLOAT,
            String => SyntaxKind::STRING,
            Char => SyntaxKind::CHAR_LIT,

            // Multi-char punctuation
            ColonColon => SyntaxKind::COLON_COLON,
            Ellipsis => SyntaxKind::ELLIPSIS,
            AmpAmp => SyntaxKind::AMP_AMP,
            Arrow => SyntaxKind::ARROW,
            OperatorPunct => SyntaxKind::OPERATOR_PUNCT,

            // Single-char punctuation
            LBrace => SyntaxKind::L_BRACE,
            RBrace => SyntaxKind::R_BRACE,
            LBracket => SyntaxKind::L_BRACKET,
            RBracket => SyntaxKind::R_BRACKET,
            LParen => SyntaxKind::L_PAREN,
            RParen => SyntaxKind::R_PAREN,
            Semicolon => SyntaxKind::SEMICOLON,
            Colon => SyntaxKind::COLON,
            Comma => SyntaxKind::COMMA,
            Dot => SyntaxKind::DOT,
            Eq => SyntaxKind::EQ,
            Lt => SyntaxKind::LT,
            Gt => SyntaxKind::GT,
            Star => SyntaxKind::STAR,
            Amp => SyntaxKind::AMP,
            Tilde => SyntaxKind::TILDE,
            Plus => SyntaxKind::PLUS,
            Minus => SyntaxKind::MINUS,
            Slash => SyntaxKind::SLASH,
            Percent => SyntaxKind::PERCENT,
            Bang => SyntaxKind::BANG,
            Pipe => SyntaxKind::PIPE,
            Caret => SyntaxKind::CARET,
            Question => SyntaxKind::QUESTION,

            // Keywords
            ClassKw => SyntaxKind::CLASS_KW,
            StructKw => SyntaxKind::STRUCT_KW,
            UnionKw => SyntaxKind::UNION_KW,
            EnumKw => SyntaxKind::ENUM_KW,
            NamespaceKw => SyntaxKind::NAMESPACE_KW,
            UsingKw => SyntaxKind::USING_KW,
            TypedefKw => SyntaxKind::TYPEDEF_KW,
            TemplateKw => SyntaxKind::TEMPLATE_KW,
            TypenameKw => SyntaxKind::TYPENAME_KW,
            FriendKw => SyntaxKind::FRIEND_KW,
            PublicKw => SyntaxKind::PUBLIC_KW,
            ProtectedKw => SyntaxKind::PROTECTED_KW,
            PrivateKw => SyntaxKind::PRIVATE_KW,
            VirtualKw => SyntaxKind::VIRTUAL_KW,
            StaticKw => SyntaxKind::STATIC_KW,
            ExternKw => SyntaxKind::EXTERN_KW,
            InlineKw => SyntaxKind::INLINE_KW,
            ConstKw => SyntaxKind::CONST_KW,
            VolatileKw => SyntaxKind::VOLATILE_KW,
            MutableKw => SyntaxKind::MUTABLE_KW,
            ExplicitKw => SyntaxKind::EXPLICIT_KW,
            ConstexprKw => SyntaxKind::CONSTEXPR_KW,
            OperatorKw => SyntaxKind::OPERATOR_KW,
            DecltypeKw => SyntaxKind::DECLTYPE_KW,
            FinalKw => SyntaxKind::FINAL_KW,
            OverrideKw => SyntaxKind::OVERRIDE_KW,
            NoexceptKw => SyntaxKind::NOEXCEPT_KW,
            DefaultKw => SyntaxKind::DEFAULT_KW,
            DeleteKw => SyntaxKind::DELETE_KW,
            StaticAssertKw => SyntaxKind::STATIC_ASSERT_KW,
            AutoKw => SyntaxKind::AUTO_KW,
            VoidKw => SyntaxKind::VOID_KW,
            BoolKw => SyntaxKind::BOOL_KW,
            CharKw => SyntaxKind::CHAR_KW,
            WcharTKw => SyntaxKind::WCHAR_T_KW,
            Char8TKw => SyntaxKind::CHAR8_T_KW,
            Char16TKw => SyntaxKind::CHAR16_T_KW,
            Char32TKw => SyntaxKind::CHAR32_T_KW,
            ShortKw => SyntaxKind::SHORT_KW,
            IntKw => SyntaxKind::INT_KW,
            LongKw => SyntaxKind::LONG_KW,
            SignedKw => SyntaxKind::SIGNED_KW,
            UnsignedKw => SyntaxKind::UNSIGNED_KW,
            FloatKw => SyntaxKind::FLOAT_KW,
            DoubleKw => SyntaxKind::DOUBLE_KW,
        }
    }
}
