//! Recursive descent parser for the C/C++ declaration subset
//!
//! Builds a rowan GreenNode tree from tokens.
//! Supports error recovery and produces a lossless CST.
//!
//! Node ranges never include leading or trailing trivia: trivia is flushed
//! into the enclosing node before a child starts, and a node finishes right
//! after its last significant token.

use super::lexer::{Lexer, Token};
use super::syntax_kind::SyntaxKind;
use rowan::{Checkpoint, GreenNode, GreenNodeBuilder, TextRange, TextSize};

/// Parse result containing the green tree and any errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parse {
    pub green: GreenNode,
    pub errors: Vec<SyntaxError>,
}

impl Parse {
    /// Get the root syntax node
    pub fn syntax(&self) -> super::SyntaxNode {
        super::SyntaxNode::new_root(self.green.clone())
    }

    /// Check if parsing succeeded without errors
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A syntax error with location and message
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyntaxError {
    pub message: String,
    pub range: TextRange,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, range: TextRange) -> Self {
        Self {
            message: message.into(),
            range,
        }
    }
}

/// Parse a translation unit into a CST
pub fn parse(input: &str) -> Parse {
    let tokens: Vec<_> = Lexer::new(input).collect();
    let mut parser = Parser::new(&tokens);
    parser.parse_source_file();
    parser.finish()
}

/// Parse a standalone type-id such as `const std::vector<int>*`.
///
/// The root is a `SOURCE_FILE` holding a single `TYPE_ID`.
pub fn parse_type_id(input: &str) -> Parse {
    let tokens: Vec<_> = Lexer::new(input).collect();
    let mut parser = Parser::new(&tokens);
    parser.start_root();
    parser.parse_type_id();
    if !parser.at_eof() {
        parser.error_recover("unexpected tokens after type", &[]);
    }
    parser.skip_trivia();
    parser.finish_node();
    parser.finish()
}

/// Where an item appears; decides which constructs are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemContext {
    Namespace,
    Class,
    Block,
}

/// Words that start statements; they lex as identifiers.
const STATEMENT_WORDS: &[&str] = &[
    "return", "if", "else", "while", "for", "do", "switch", "case", "break", "continue", "goto",
    "throw", "try", "catch", "new", "co_return", "co_await", "co_yield", "sizeof", "this",
];

/// Tokens that end a declarator initializer, per context.
const ITEM_STOP: &[SyntaxKind] = &[SyntaxKind::COMMA, SyntaxKind::SEMICOLON];
const PARAM_STOP: &[SyntaxKind] = &[SyntaxKind::COMMA, SyntaxKind::R_PAREN];
const TEMPLATE_PARAM_STOP: &[SyntaxKind] = &[SyntaxKind::COMMA, SyntaxKind::GT];

/// The parser state
struct Parser<'a> {
    tokens: &'a [Token<'a>],
    /// Indices of the non-trivia tokens.
    significant: Vec<usize>,
    /// Next raw token to push into the builder.
    pos: usize,
    /// Next entry of `significant` to consume.
    sig_pos: usize,
    builder: GreenNodeBuilder<'static>,
    errors: Vec<SyntaxError>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token<'a>]) -> Self {
        let significant = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.kind.is_trivia())
            .map(|(i, _)| i)
            .collect();
        Self {
            tokens,
            significant,
            pos: 0,
            sig_pos: 0,
            builder: GreenNodeBuilder::new(),
            errors: Vec::new(),
        }
    }

    fn finish(self) -> Parse {
        Parse {
            green: self.builder.finish(),
            errors: self.errors,
        }
    }

    // =========================================================================
    // Token inspection
    // =========================================================================

    fn nth_token(&self, n: usize) -> Option<&Token<'a>> {
        self.significant
            .get(self.sig_pos + n)
            .map(|&idx| &self.tokens[idx])
    }

    fn current(&self) -> Option<&Token<'a>> {
        self.nth_token(0)
    }

    fn nth(&self, n: usize) -> SyntaxKind {
        self.nth_token(n).map(|t| t.kind).unwrap_or(SyntaxKind::ERROR)
    }

    fn nth_text(&self, n: usize) -> &str {
        self.nth_token(n).map(|t| t.text).unwrap_or("")
    }

    fn current_kind(&self) -> SyntaxKind {
        self.nth(0)
    }

    fn at(&self, kind: SyntaxKind) -> bool {
        !self.at_eof() && self.current_kind() == kind
    }

    fn at_any(&self, kinds: &[SyntaxKind]) -> bool {
        !self.at_eof() && kinds.contains(&self.current_kind())
    }

    fn at_eof(&self) -> bool {
        self.sig_pos >= self.significant.len()
    }

    // =========================================================================
    // Token consumption
    // =========================================================================

    /// Push trivia up to the next significant token into the current node.
    fn skip_trivia(&mut self) {
        let limit = self
            .significant
            .get(self.sig_pos)
            .copied()
            .unwrap_or(self.tokens.len());
        while self.pos < limit {
            let token = &self.tokens[self.pos];
            self.builder.token(token.kind.into(), token.text);
            self.pos += 1;
        }
    }

    fn bump(&mut self) {
        if self.at_eof() {
            return;
        }
        self.skip_trivia();
        let token = &self.tokens[self.pos];
        self.builder.token(token.kind.into(), token.text);
        self.pos += 1;
        self.sig_pos += 1;
    }

    fn eat(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: SyntaxKind) -> bool {
        if self.eat(kind) {
            true
        } else {
            self.error(format!("expected {:?}", kind));
            false
        }
    }

    // =========================================================================
    // Error handling
    // =========================================================================

    fn error(&mut self, message: impl Into<String>) {
        let range = self
            .current()
            .map(|t| TextRange::at(t.offset, TextSize::of(t.text)))
            .or_else(|| {
                self.tokens
                    .last()
                    .map(|t| TextRange::empty(t.offset + TextSize::of(t.text)))
            })
            .unwrap_or_else(|| TextRange::empty(TextSize::new(0)));
        self.errors.push(SyntaxError::new(message, range));
    }

    fn error_recover(&mut self, message: impl Into<String>, recovery: &[SyntaxKind]) {
        self.error(message);
        self.start_node(SyntaxKind::ERROR);
        // Always consume at least one token to make progress
        let mut consumed = false;
        while !self.at_eof() && !self.at_any(recovery) {
            self.bump();
            consumed = true;
        }
        if !consumed && !self.at_eof() {
            self.bump();
        }
        self.finish_node();
    }

    // =========================================================================
    // Node building helpers
    // =========================================================================

    fn start_node(&mut self, kind: SyntaxKind) {
        self.skip_trivia();
        self.builder.start_node(kind.into());
    }

    /// The root owns leading trivia, so nothing may be flushed before it.
    fn start_root(&mut self) {
        self.builder.start_node(SyntaxKind::SOURCE_FILE.into());
    }

    fn finish_node(&mut self) {
        self.builder.finish_node();
    }

    fn checkpoint(&mut self) -> Checkpoint {
        self.skip_trivia();
        self.builder.checkpoint()
    }

    fn start_node_at(&mut self, checkpoint: Checkpoint, kind: SyntaxKind) {
        self.builder.start_node_at(checkpoint, kind.into());
    }

    // =========================================================================
    // Lookahead scanning (indices are relative significant-token positions)
    // =========================================================================

    /// Skip a balanced `<...>` starting at `i` (which must be `<`).
    fn skip_angles(&self, mut i: usize) -> usize {
        let mut depth = 0usize;
        let mut parens = 0usize;
        loop {
            match self.nth(i) {
                SyntaxKind::LT if parens == 0 => depth += 1,
                SyntaxKind::GT if parens == 0 => {
                    depth -= 1;
                    if depth == 0 {
                        return i + 1;
                    }
                }
                SyntaxKind::L_PAREN => parens += 1,
                SyntaxKind::R_PAREN => parens = parens.saturating_sub(1),
                SyntaxKind::SEMICOLON | SyntaxKind::L_BRACE | SyntaxKind::R_BRACE => return i,
                _ if self.nth_token(i).is_none() => return i,
                _ => {}
            }
            i += 1;
        }
    }

    /// Index just past a qualified name starting at `i`, or `i` if none.
    fn scan_qualified_name(&self, mut i: usize) -> usize {
        let start = i;
        if self.nth(i) == SyntaxKind::COLON_COLON {
            i += 1;
        }
        loop {
            if self.nth(i) == SyntaxKind::TEMPLATE_KW {
                i += 1;
            }
            if self.nth(i) != SyntaxKind::IDENT {
                return if i == start { start } else { i };
            }
            i += 1;
            if self.nth(i) == SyntaxKind::LT {
                i = self.skip_angles(i);
            }
            if self.nth(i) == SyntaxKind::COLON_COLON
                && matches!(self.nth(i + 1), SyntaxKind::IDENT | SyntaxKind::TEMPLATE_KW)
            {
                i += 1;
            } else {
                return i;
            }
        }
    }

    /// Skip pointer operators and cv-qualifiers starting at `i`.
    fn scan_ptr_ops(&self, mut i: usize) -> usize {
        while matches!(
            self.nth(i),
            SyntaxKind::STAR
                | SyntaxKind::AMP
                | SyntaxKind::AMP_AMP
                | SyntaxKind::CONST_KW
                | SyntaxKind::VOLATILE_KW
        ) {
            i += 1;
        }
        i
    }

    /// `class-key name ;` (also with template arguments, qualified names)
    fn at_class_forward(&self) -> bool {
        if !self.current_kind().is_class_key() {
            return false;
        }
        let end = self.scan_qualified_name(1);
        end > 1 && self.nth(end) == SyntaxKind::SEMICOLON
    }

    /// `class-key name? final? (: bases)? {`
    fn at_class_spec(&self) -> bool {
        if !self.current_kind().is_class_key() {
            return false;
        }
        let mut i = self.scan_qualified_name(1);
        if self.nth(i) == SyntaxKind::FINAL_KW {
            i += 1;
        }
        matches!(self.nth(i), SyntaxKind::L_BRACE | SyntaxKind::COLON)
    }

    /// Returns the token kind that ends an enum head (`{`, `;` or other).
    fn enum_head_terminator(&self) -> (SyntaxKind, bool) {
        let mut i = 1;
        if matches!(self.nth(i), SyntaxKind::CLASS_KW | SyntaxKind::STRUCT_KW) {
            i += 1;
        }
        let named = self.nth(i) == SyntaxKind::IDENT;
        if named {
            i += 1;
        }
        if self.nth(i) == SyntaxKind::COLON {
            i += 1;
            while self.nth_token(i).is_some()
                && !matches!(
                    self.nth(i),
                    SyntaxKind::L_BRACE | SyntaxKind::SEMICOLON | SyntaxKind::R_BRACE
                )
            {
                i += 1;
            }
        }
        (self.nth(i), named)
    }

    fn at_enum_spec(&self) -> bool {
        self.at(SyntaxKind::ENUM_KW) && self.enum_head_terminator().0 == SyntaxKind::L_BRACE
    }

    fn at_enum_forward(&self) -> bool {
        if !self.at(SyntaxKind::ENUM_KW) {
            return false;
        }
        let (end, named) = self.enum_head_terminator();
        named && end == SyntaxKind::SEMICOLON
    }

    /// Whether the template argument at the cursor reads as a type-id.
    fn at_type_argument(&self) -> bool {
        let kind = self.current_kind();
        if kind.is_builtin_type()
            || kind.is_cv()
            || kind.is_class_key()
            || matches!(
                kind,
                SyntaxKind::TYPENAME_KW | SyntaxKind::DECLTYPE_KW | SyntaxKind::ENUM_KW
            )
        {
            return true;
        }
        if !matches!(kind, SyntaxKind::IDENT | SyntaxKind::COLON_COLON) {
            return false;
        }
        let mut i = self.scan_qualified_name(0);
        i = self.scan_ptr_ops(i);
        if self.nth(i) == SyntaxKind::ELLIPSIS {
            i += 1;
        }
        matches!(
            self.nth(i),
            SyntaxKind::COMMA | SyntaxKind::GT | SyntaxKind::L_PAREN | SyntaxKind::L_BRACKET
        )
    }

    /// Whether the `(` at the cursor opens a parameter list rather than a
    /// direct initializer.
    fn at_parameter_list(&self) -> bool {
        let kind = self.nth(1);
        if kind == SyntaxKind::R_PAREN
            || kind == SyntaxKind::ELLIPSIS
            || kind.is_builtin_type()
            || kind.is_cv()
            || kind.is_class_key()
            || matches!(
                kind,
                SyntaxKind::TYPENAME_KW | SyntaxKind::DECLTYPE_KW | SyntaxKind::ENUM_KW
            )
        {
            return true;
        }
        if !matches!(kind, SyntaxKind::IDENT | SyntaxKind::COLON_COLON) {
            return false;
        }
        if STATEMENT_WORDS.contains(&self.nth_text(1)) {
            return false;
        }
        let i = self.scan_qualified_name(1);
        matches!(
            self.nth(i),
            SyntaxKind::IDENT
                | SyntaxKind::STAR
                | SyntaxKind::AMP
                | SyntaxKind::AMP_AMP
                | SyntaxKind::COMMA
                | SyntaxKind::R_PAREN
                | SyntaxKind::ELLIPSIS
                | SyntaxKind::CONST_KW
                | SyntaxKind::VOLATILE_KW
                | SyntaxKind::L_BRACKET
        )
    }

    /// Whether a statement inside a function body is a declaration.
    fn at_local_declaration(&self) -> bool {
        let kind = self.current_kind();
        if kind.is_class_key()
            || kind.is_builtin_type()
            || kind.is_cv()
            || matches!(
                kind,
                SyntaxKind::ENUM_KW
                    | SyntaxKind::TYPEDEF_KW
                    | SyntaxKind::USING_KW
                    | SyntaxKind::STATIC_KW
                    | SyntaxKind::CONSTEXPR_KW
                    | SyntaxKind::EXTERN_KW
                    | SyntaxKind::DECLTYPE_KW
                    | SyntaxKind::TYPENAME_KW
                    | SyntaxKind::TEMPLATE_KW
                    | SyntaxKind::STATIC_ASSERT_KW
            )
        {
            return true;
        }
        if !matches!(kind, SyntaxKind::IDENT | SyntaxKind::COLON_COLON) {
            return false;
        }
        if STATEMENT_WORDS.contains(&self.nth_text(0)) {
            return false;
        }
        let mut i = self.scan_qualified_name(0);
        i = self.scan_ptr_ops(i);
        self.nth(i) == SyntaxKind::IDENT
            && matches!(
                self.nth(i + 1),
                SyntaxKind::SEMICOLON
                    | SyntaxKind::EQ
                    | SyntaxKind::L_PAREN
                    | SyntaxKind::L_BRACE
                    | SyntaxKind::COMMA
                    | SyntaxKind::L_BRACKET
            )
    }

    // =========================================================================
    // Grammar rules: items
    // =========================================================================

    /// SourceFile = Item*
    fn parse_source_file(&mut self) {
        self.start_root();
        self.parse_items_until(None, ItemContext::Namespace);
        self.skip_trivia();
        self.finish_node();
    }

    /// Items up to `terminator` (or EOF), with a progress guard.
    fn parse_items_until(&mut self, terminator: Option<SyntaxKind>, ctx: ItemContext) {
        while !self.at_eof() && !terminator.is_some_and(|k| self.at(k)) {
            let before = self.sig_pos;
            self.parse_item(ctx);
            if self.sig_pos == before && !self.at_eof() {
                self.error_recover(
                    format!("unexpected token: {:?}", self.current_kind()),
                    &[SyntaxKind::SEMICOLON, SyntaxKind::R_BRACE],
                );
                self.eat(SyntaxKind::SEMICOLON);
            }
        }
    }

    /// Item = Preproc | Namespace | Using | Template | Typedef | Friend
    ///      | AccessSpec | LinkageSpec | ClassFwd | EnumFwd | SimpleDecl | FunctionDef
    fn parse_item(&mut self, ctx: ItemContext) {
        match self.current_kind() {
            SyntaxKind::PREPROC => {
                self.start_node(SyntaxKind::PREPROC_DIRECTIVE);
                self.bump();
                self.finish_node();
            }
            SyntaxKind::SEMICOLON => self.bump(),
            SyntaxKind::NAMESPACE_KW => self.parse_namespace(),
            SyntaxKind::INLINE_KW if self.nth(1) == SyntaxKind::NAMESPACE_KW => {
                self.parse_namespace()
            }
            SyntaxKind::USING_KW => self.parse_using(),
            SyntaxKind::TEMPLATE_KW => self.parse_template_decl(ctx),
            SyntaxKind::TYPEDEF_KW => self.parse_typedef(),
            SyntaxKind::FRIEND_KW => self.parse_friend(),
            kind if kind.is_access() && self.nth(1) == SyntaxKind::COLON => {
                self.start_node(SyntaxKind::ACCESS_SPEC);
                self.bump();
                self.bump();
                self.finish_node();
            }
            SyntaxKind::EXTERN_KW
                if self.nth(1) == SyntaxKind::STRING && self.nth(2) == SyntaxKind::L_BRACE =>
            {
                self.start_node(SyntaxKind::LINKAGE_SPEC);
                self.bump();
                self.bump();
                self.parse_decl_block(ItemContext::Namespace);
                self.finish_node();
            }
            SyntaxKind::STATIC_ASSERT_KW => self.parse_statement(),
            _ if self.at_class_forward() => self.parse_class_forward(),
            _ if self.at_enum_forward() => self.parse_enum_forward(),
            _ => self.parse_simple_decl_or_function(ctx),
        }
    }

    /// Namespace = 'inline'? 'namespace' QualifiedName? DeclBlock
    ///           | 'namespace' IDENT '=' QualifiedName ';'
    fn parse_namespace(&mut self) {
        if self.at(SyntaxKind::NAMESPACE_KW)
            && self.nth(1) == SyntaxKind::IDENT
            && self.nth(2) == SyntaxKind::EQ
        {
            self.start_node(SyntaxKind::NAMESPACE_ALIAS);
            self.bump(); // namespace
            self.bump(); // name
            self.bump(); // =
            self.parse_qualified_name();
            self.expect(SyntaxKind::SEMICOLON);
            self.finish_node();
            return;
        }

        self.start_node(SyntaxKind::NAMESPACE_DEF);
        self.eat(SyntaxKind::INLINE_KW);
        self.bump(); // namespace
        if self.at_any(&[SyntaxKind::IDENT, SyntaxKind::COLON_COLON]) {
            self.parse_qualified_name();
        }
        if self.at(SyntaxKind::L_BRACE) {
            self.parse_decl_block(ItemContext::Namespace);
        } else {
            self.error_recover("expected '{' after namespace name", &[SyntaxKind::SEMICOLON]);
            self.eat(SyntaxKind::SEMICOLON);
        }
        self.finish_node();
    }

    /// DeclBlock = '{' Item* '}'
    fn parse_decl_block(&mut self, ctx: ItemContext) {
        self.start_node(SyntaxKind::DECL_BLOCK);
        self.expect(SyntaxKind::L_BRACE);
        self.parse_items_until(Some(SyntaxKind::R_BRACE), ctx);
        self.expect(SyntaxKind::R_BRACE);
        self.finish_node();
    }

    /// Using = 'using' 'namespace' QualifiedName ';'
    ///       | 'using' IDENT '=' TypeId ';'
    ///       | 'using' 'typename'? QualifiedName ';'
    fn parse_using(&mut self) {
        if self.nth(1) == SyntaxKind::NAMESPACE_KW {
            self.start_node(SyntaxKind::USING_DIRECTIVE);
            self.bump(); // using
            self.bump(); // namespace
            self.parse_qualified_name();
        } else if self.nth(1) == SyntaxKind::IDENT && self.nth(2) == SyntaxKind::EQ {
            self.start_node(SyntaxKind::ALIAS_DECL);
            self.bump(); // using
            self.bump(); // name
            self.bump(); // =
            self.parse_type_id();
        } else {
            self.start_node(SyntaxKind::USING_DECL);
            self.bump(); // using
            self.eat(SyntaxKind::TYPENAME_KW);
            self.parse_qualified_name();
        }
        if !self.eat(SyntaxKind::SEMICOLON) {
            self.error_recover("expected ';'", &[SyntaxKind::SEMICOLON, SyntaxKind::R_BRACE]);
            self.eat(SyntaxKind::SEMICOLON);
        }
        self.finish_node();
    }

    /// TemplateDecl = 'template' TemplateParams? Item
    fn parse_template_decl(&mut self, ctx: ItemContext) {
        self.start_node(SyntaxKind::TEMPLATE_DECL);
        self.bump(); // template
        if self.at(SyntaxKind::LT) {
            self.parse_template_params();
        }
        if self.at_eof() {
            self.error("expected declaration after template header");
        } else {
            self.parse_item(ctx);
        }
        self.finish_node();
    }

    /// TemplateParams = '<' (TemplateParam (',' TemplateParam)*)? '>'
    fn parse_template_params(&mut self) {
        self.start_node(SyntaxKind::TEMPLATE_PARAMS);
        self.bump(); // <
        if !self.at(SyntaxKind::GT) {
            self.parse_template_param();
            while self.eat(SyntaxKind::COMMA) {
                self.parse_template_param();
            }
        }
        self.expect(SyntaxKind::GT);
        self.finish_node();
    }

    /// TemplateParam = ('class' | 'typename') '...'? IDENT? ('=' TypeId)?
    ///               | 'template' TemplateParams ('class' | 'typename') '...'? IDENT? ('=' QualifiedName)?
    ///               | DeclSpecifiers Declarator ('=' Expr)?
    fn parse_template_param(&mut self) {
        self.start_node(SyntaxKind::TEMPLATE_PARAM);
        let type_param = matches!(self.current_kind(), SyntaxKind::CLASS_KW | SyntaxKind::TYPENAME_KW)
            && matches!(
                self.nth(1),
                SyntaxKind::IDENT
                    | SyntaxKind::ELLIPSIS
                    | SyntaxKind::COMMA
                    | SyntaxKind::GT
                    | SyntaxKind::EQ
            )
            && self.nth(2) != SyntaxKind::COLON_COLON;
        if self.at(SyntaxKind::TEMPLATE_KW) {
            self.bump();
            if self.at(SyntaxKind::LT) {
                self.parse_template_params();
            }
            if self.at_any(&[SyntaxKind::CLASS_KW, SyntaxKind::TYPENAME_KW]) {
                self.bump();
            } else {
                self.error("expected 'class' in template template parameter");
            }
            self.eat(SyntaxKind::ELLIPSIS);
            self.eat(SyntaxKind::IDENT);
            if self.eat(SyntaxKind::EQ) {
                self.parse_qualified_name();
            }
        } else if type_param {
            self.bump(); // class / typename
            self.eat(SyntaxKind::ELLIPSIS);
            self.eat(SyntaxKind::IDENT);
            if self.eat(SyntaxKind::EQ) {
                self.parse_type_id();
            }
        } else {
            self.parse_decl_specifiers(ItemContext::Block);
            if !self.at_any(&[SyntaxKind::COMMA, SyntaxKind::GT, SyntaxKind::EQ]) {
                self.parse_declarator(ItemContext::Block, TEMPLATE_PARAM_STOP);
            }
            if self.eat(SyntaxKind::EQ) {
                self.parse_expr(TEMPLATE_PARAM_STOP);
            }
        }
        self.finish_node();
    }

    /// Typedef = 'typedef' DeclSpecifiers (Declarator (',' Declarator)*)? ';'
    ///
    /// A missing declarator list is left for the model to report.
    fn parse_typedef(&mut self) {
        self.start_node(SyntaxKind::TYPEDEF_DECL);
        self.bump(); // typedef
        self.parse_decl_specifiers(ItemContext::Namespace);
        if !self.at(SyntaxKind::SEMICOLON) {
            self.parse_declarator(ItemContext::Namespace, ITEM_STOP);
            while self.eat(SyntaxKind::COMMA) {
                self.parse_declarator(ItemContext::Namespace, ITEM_STOP);
            }
        }
        if !self.eat(SyntaxKind::SEMICOLON) {
            self.error_recover("expected ';' after typedef", &[SyntaxKind::SEMICOLON, SyntaxKind::R_BRACE]);
            self.eat(SyntaxKind::SEMICOLON);
        }
        self.finish_node();
    }

    /// Friend = 'friend' ClassKey QualifiedName ';'
    ///        | 'friend' DeclSpecifiers Declarator? (CompoundStmt | ';')
    fn parse_friend(&mut self) {
        self.start_node(SyntaxKind::FRIEND_DECL);
        self.bump(); // friend
        let elaborated = self.current_kind().is_class_key() && {
            let end = self.scan_qualified_name(1);
            end > 1 && self.nth(end) == SyntaxKind::SEMICOLON
        };
        if elaborated {
            self.bump(); // class-key
            self.parse_qualified_name();
        } else {
            self.parse_decl_specifiers(ItemContext::Class);
            if !self.at(SyntaxKind::SEMICOLON) {
                let is_function = self.parse_declarator(ItemContext::Class, ITEM_STOP);
                if is_function && self.at(SyntaxKind::L_BRACE) {
                    self.parse_compound_stmt();
                    self.finish_node();
                    return;
                }
            }
        }
        if !self.eat(SyntaxKind::SEMICOLON) {
            self.error_recover("expected ';' after friend declaration", &[SyntaxKind::SEMICOLON, SyntaxKind::R_BRACE]);
            self.eat(SyntaxKind::SEMICOLON);
        }
        self.finish_node();
    }

    /// ClassFwd = ClassKey QualifiedName ';'
    fn parse_class_forward(&mut self) {
        self.start_node(SyntaxKind::CLASS_FWD);
        self.bump(); // class-key
        self.parse_qualified_name();
        self.expect(SyntaxKind::SEMICOLON);
        self.finish_node();
    }

    /// EnumFwd = 'enum' ('class' | 'struct')? IDENT (':' TypeId)? ';'
    fn parse_enum_forward(&mut self) {
        self.start_node(SyntaxKind::ENUM_FWD);
        self.bump(); // enum
        if self.at_any(&[SyntaxKind::CLASS_KW, SyntaxKind::STRUCT_KW]) {
            self.bump();
        }
        self.expect(SyntaxKind::IDENT);
        if self.eat(SyntaxKind::COLON) {
            self.parse_type_id();
        }
        self.expect(SyntaxKind::SEMICOLON);
        self.finish_node();
    }

    /// SimpleDecl = DeclSpecifiers (Declarator (',' Declarator)*)? ';'
    /// FunctionDef = DeclSpecifiers Declarator CtorInitializer? CompoundStmt
    fn parse_simple_decl_or_function(&mut self, ctx: ItemContext) {
        let checkpoint = self.checkpoint();
        self.parse_decl_specifiers(ctx);

        if self.eat(SyntaxKind::SEMICOLON) {
            self.start_node_at(checkpoint, SyntaxKind::SIMPLE_DECL);
            self.finish_node();
            return;
        }

        let is_function = self.parse_declarator(ctx, ITEM_STOP);
        if is_function && self.at_any(&[SyntaxKind::L_BRACE, SyntaxKind::COLON]) {
            if self.at(SyntaxKind::COLON) {
                self.parse_ctor_initializer();
            }
            if self.at(SyntaxKind::L_BRACE) {
                self.parse_compound_stmt();
            } else {
                self.error("expected function body");
            }
            self.start_node_at(checkpoint, SyntaxKind::FUNCTION_DEF);
            self.finish_node();
            return;
        }

        while self.eat(SyntaxKind::COMMA) {
            self.parse_declarator(ctx, ITEM_STOP);
        }
        if !self.eat(SyntaxKind::SEMICOLON) {
            self.error_recover(
                "expected ';' after declaration",
                &[SyntaxKind::SEMICOLON, SyntaxKind::R_BRACE],
            );
            self.eat(SyntaxKind::SEMICOLON);
        }
        self.start_node_at(checkpoint, SyntaxKind::SIMPLE_DECL);
        self.finish_node();
    }

    // =========================================================================
    // Grammar rules: specifiers
    // =========================================================================

    /// DeclSpecifiers = (StorageSpec | CvQualifier | ClassSpec | EnumSpec | TypeRef)*
    fn parse_decl_specifiers(&mut self, ctx: ItemContext) {
        self.start_node(SyntaxKind::DECL_SPECIFIERS);
        let mut seen_type = false;
        loop {
            let kind = self.current_kind();
            if self.at_eof() {
                break;
            }
            match kind {
                SyntaxKind::STATIC_KW
                | SyntaxKind::INLINE_KW
                | SyntaxKind::VIRTUAL_KW
                | SyntaxKind::EXPLICIT_KW
                | SyntaxKind::CONSTEXPR_KW
                | SyntaxKind::MUTABLE_KW
                | SyntaxKind::CONST_KW
                | SyntaxKind::VOLATILE_KW => self.bump(),
                SyntaxKind::EXTERN_KW => {
                    self.bump();
                    self.eat(SyntaxKind::STRING);
                }
                _ if kind.is_class_key() => {
                    if seen_type {
                        break;
                    }
                    if self.at_class_spec() {
                        self.parse_class_spec();
                    } else {
                        self.start_node(SyntaxKind::TYPE_REF);
                        self.bump();
                        self.parse_qualified_name();
                        self.finish_node();
                    }
                    seen_type = true;
                }
                SyntaxKind::ENUM_KW => {
                    if seen_type {
                        break;
                    }
                    if self.at_enum_spec() {
                        self.parse_enum_spec();
                    } else {
                        self.start_node(SyntaxKind::TYPE_REF);
                        self.bump();
                        if self.at_any(&[SyntaxKind::CLASS_KW, SyntaxKind::STRUCT_KW]) {
                            self.bump();
                        }
                        self.parse_qualified_name();
                        self.finish_node();
                    }
                    seen_type = true;
                }
                _ if kind.is_builtin_type() => {
                    if seen_type {
                        break;
                    }
                    self.start_node(SyntaxKind::TYPE_REF);
                    while self.current_kind().is_builtin_type() && !self.at_eof() {
                        self.bump();
                    }
                    self.finish_node();
                    seen_type = true;
                }
                SyntaxKind::DECLTYPE_KW => {
                    if seen_type {
                        break;
                    }
                    self.start_node(SyntaxKind::TYPE_REF);
                    self.parse_decltype();
                    self.finish_node();
                    seen_type = true;
                }
                SyntaxKind::TYPENAME_KW => {
                    if seen_type {
                        break;
                    }
                    self.start_node(SyntaxKind::TYPE_REF);
                    self.bump();
                    self.parse_qualified_name();
                    self.finish_node();
                    seen_type = true;
                }
                SyntaxKind::IDENT | SyntaxKind::COLON_COLON => {
                    if seen_type {
                        break;
                    }
                    let end = self.scan_qualified_name(0);
                    if end == 0 {
                        break;
                    }
                    // `A(`, `A::A(` and `A::~A(` start a declarator, not a type
                    let declarator_follows = match self.nth(end) {
                        SyntaxKind::L_PAREN => !matches!(
                            self.nth(end + 1),
                            SyntaxKind::STAR | SyntaxKind::AMP | SyntaxKind::AMP_AMP
                        ),
                        SyntaxKind::COLON_COLON => {
                            matches!(self.nth(end + 1), SyntaxKind::TILDE | SyntaxKind::OPERATOR_KW)
                        }
                        _ => false,
                    };
                    if declarator_follows && ctx != ItemContext::Block {
                        break;
                    }
                    if declarator_follows && STATEMENT_WORDS.contains(&self.nth_text(0)) {
                        break;
                    }
                    self.start_node(SyntaxKind::TYPE_REF);
                    self.parse_qualified_name();
                    self.finish_node();
                    seen_type = true;
                }
                _ => break,
            }
        }
        self.finish_node();
    }

    /// Decltype = 'decltype' '(' Expr ')'
    fn parse_decltype(&mut self) {
        self.start_node(SyntaxKind::DECLTYPE_SPEC);
        self.bump(); // decltype
        if self.expect(SyntaxKind::L_PAREN) {
            self.parse_expr(&[SyntaxKind::R_PAREN]);
            self.expect(SyntaxKind::R_PAREN);
        }
        self.finish_node();
    }

    /// ClassSpec = ClassKey QualifiedName? 'final'? BaseClause? MemberList
    fn parse_class_spec(&mut self) {
        self.start_node(SyntaxKind::CLASS_SPEC);
        self.bump(); // class-key
        if self.at_any(&[SyntaxKind::IDENT, SyntaxKind::COLON_COLON]) {
            self.parse_qualified_name();
        }
        self.eat(SyntaxKind::FINAL_KW);
        if self.at(SyntaxKind::COLON) {
            self.parse_base_clause();
        }
        self.parse_member_list();
        self.finish_node();
    }

    /// BaseClause = ':' BaseSpec (',' BaseSpec)*
    fn parse_base_clause(&mut self) {
        self.start_node(SyntaxKind::BASE_CLAUSE);
        self.bump(); // :
        self.parse_base_spec();
        while self.eat(SyntaxKind::COMMA) {
            self.parse_base_spec();
        }
        self.finish_node();
    }

    /// BaseSpec = ('virtual' | AccessKw)* QualifiedName '...'?
    fn parse_base_spec(&mut self) {
        self.start_node(SyntaxKind::BASE_SPEC);
        while self.current_kind().is_access() || self.at(SyntaxKind::VIRTUAL_KW) {
            self.bump();
        }
        self.eat(SyntaxKind::TYPENAME_KW);
        if self.at_any(&[SyntaxKind::IDENT, SyntaxKind::COLON_COLON]) {
            self.parse_qualified_name();
        } else {
            self.error("expected base class name");
        }
        self.eat(SyntaxKind::ELLIPSIS);
        self.finish_node();
    }

    /// MemberList = '{' Item* '}'
    fn parse_member_list(&mut self) {
        self.start_node(SyntaxKind::MEMBER_LIST);
        if self.expect(SyntaxKind::L_BRACE) {
            self.parse_items_until(Some(SyntaxKind::R_BRACE), ItemContext::Class);
            self.expect(SyntaxKind::R_BRACE);
        }
        self.finish_node();
    }

    /// EnumSpec = 'enum' ('class' | 'struct')? IDENT? (':' TypeId)? EnumeratorList
    fn parse_enum_spec(&mut self) {
        self.start_node(SyntaxKind::ENUM_SPEC);
        self.bump(); // enum
        if self.at_any(&[SyntaxKind::CLASS_KW, SyntaxKind::STRUCT_KW]) {
            self.bump();
        }
        self.eat(SyntaxKind::IDENT);
        if self.eat(SyntaxKind::COLON) {
            self.parse_type_id();
        }
        self.start_node(SyntaxKind::ENUMERATOR_LIST);
        if self.expect(SyntaxKind::L_BRACE) {
            while self.at(SyntaxKind::IDENT) {
                self.start_node(SyntaxKind::ENUMERATOR);
                self.bump();
                if self.eat(SyntaxKind::EQ) {
                    self.parse_expr(&[SyntaxKind::COMMA, SyntaxKind::R_BRACE]);
                }
                self.finish_node();
                if !self.eat(SyntaxKind::COMMA) {
                    break;
                }
            }
            if !self.eat(SyntaxKind::R_BRACE) {
                self.error_recover("expected '}' after enumerators", &[SyntaxKind::R_BRACE, SyntaxKind::SEMICOLON]);
                self.eat(SyntaxKind::R_BRACE);
            }
        }
        self.finish_node();
        self.finish_node();
    }

    // =========================================================================
    // Grammar rules: names and types
    // =========================================================================

    /// QualifiedName = '::'? NameSegment ('::' NameSegment)*
    fn parse_qualified_name(&mut self) {
        self.start_node(SyntaxKind::QUALIFIED_NAME);
        self.eat(SyntaxKind::COLON_COLON);
        self.parse_name_segment();
        while self.at(SyntaxKind::COLON_COLON)
            && matches!(
                self.nth(1),
                SyntaxKind::IDENT
                    | SyntaxKind::TILDE
                    | SyntaxKind::TEMPLATE_KW
                    | SyntaxKind::OPERATOR_KW
            )
        {
            self.bump(); // ::
            self.parse_name_segment();
        }
        self.finish_node();
    }

    /// NameSegment = 'template'? (IDENT TemplateArgs? | '~' IDENT | 'operator' OperatorToken+)
    fn parse_name_segment(&mut self) {
        self.start_node(SyntaxKind::NAME_SEGMENT);
        self.eat(SyntaxKind::TEMPLATE_KW);
        match self.current_kind() {
            SyntaxKind::IDENT if !self.at_eof() => {
                self.bump();
                if self.at(SyntaxKind::LT) {
                    self.parse_template_args();
                }
            }
            SyntaxKind::TILDE => {
                self.bump();
                self.expect(SyntaxKind::IDENT);
            }
            SyntaxKind::OPERATOR_KW => {
                self.bump();
                self.parse_operator_name();
            }
            _ => self.error("expected name"),
        }
        self.finish_node();
    }

    /// The tokens after `operator`: a punctuator, `()`, `[]`, or a conversion type.
    fn parse_operator_name(&mut self) {
        match self.current_kind() {
            SyntaxKind::L_PAREN if self.nth(1) == SyntaxKind::R_PAREN => {
                self.bump();
                self.bump();
            }
            SyntaxKind::L_BRACKET if self.nth(1) == SyntaxKind::R_BRACKET => {
                self.bump();
                self.bump();
            }
            SyntaxKind::DELETE_KW => {
                self.bump();
                if self.at(SyntaxKind::L_BRACKET) && self.nth(1) == SyntaxKind::R_BRACKET {
                    self.bump();
                    self.bump();
                }
            }
            kind if kind.is_punct() && kind != SyntaxKind::L_PAREN => {
                self.bump();
                // `operator>>` and `operator>=` lex as two tokens
                if matches!(kind, SyntaxKind::GT | SyntaxKind::LT)
                    && matches!(self.current_kind(), SyntaxKind::GT | SyntaxKind::LT | SyntaxKind::EQ)
                    && !self.at(SyntaxKind::L_PAREN)
                {
                    self.bump();
                }
            }
            _ => {
                // conversion function: operator int, operator const T&
                while (self.current_kind().is_builtin_type()
                    || self.current_kind().is_cv()
                    || matches!(self.current_kind(), SyntaxKind::IDENT | SyntaxKind::STAR | SyntaxKind::AMP | SyntaxKind::AMP_AMP))
                    && !self.at_eof()
                {
                    self.bump();
                }
            }
        }
    }

    /// TemplateArgs = '<' (TemplateArg (',' TemplateArg)*)? '>'
    fn parse_template_args(&mut self) {
        self.start_node(SyntaxKind::TEMPLATE_ARGS);
        self.bump(); // <
        if !self.at(SyntaxKind::GT) {
            self.parse_template_arg();
            while self.eat(SyntaxKind::COMMA) {
                self.parse_template_arg();
            }
        }
        if !self.eat(SyntaxKind::GT) {
            self.error("expected '>' to close template arguments");
        }
        self.finish_node();
    }

    /// TemplateArg = (TypeId | Expr) '...'?
    fn parse_template_arg(&mut self) {
        self.start_node(SyntaxKind::TEMPLATE_ARG);
        if self.at_type_argument() {
            self.parse_type_id();
        } else {
            self.parse_expr(&[SyntaxKind::COMMA, SyntaxKind::GT]);
        }
        self.eat(SyntaxKind::ELLIPSIS);
        self.finish_node();
    }

    /// TypeId = DeclSpecifiers AbstractDeclarator?
    fn parse_type_id(&mut self) {
        self.start_node(SyntaxKind::TYPE_ID);
        self.parse_decl_specifiers(ItemContext::Block);
        if self.at_any(&[
            SyntaxKind::STAR,
            SyntaxKind::AMP,
            SyntaxKind::AMP_AMP,
            SyntaxKind::L_PAREN,
            SyntaxKind::L_BRACKET,
        ]) {
            self.parse_declarator(ItemContext::Block, TEMPLATE_PARAM_STOP);
        }
        self.finish_node();
    }

    /// Declarator = PtrOp* '...'? (NestedDeclarator | QualifiedName)? Suffix* Initializer?
    ///
    /// Returns whether the declarator declares a function (a parameter list
    /// applied directly to the declarator id).
    fn parse_declarator(&mut self, ctx: ItemContext, init_stop: &[SyntaxKind]) -> bool {
        self.start_node(SyntaxKind::DECLARATOR);
        while self.at_any(&[SyntaxKind::STAR, SyntaxKind::AMP, SyntaxKind::AMP_AMP]) {
            self.parse_ptr_op();
        }
        self.eat(SyntaxKind::ELLIPSIS);

        let mut nested = false;
        if self.at(SyntaxKind::L_PAREN)
            && matches!(
                self.nth(1),
                SyntaxKind::STAR | SyntaxKind::AMP | SyntaxKind::AMP_AMP
            )
        {
            self.parse_nested_declarator();
            nested = true;
        } else if self.at_any(&[
            SyntaxKind::IDENT,
            SyntaxKind::COLON_COLON,
            SyntaxKind::TILDE,
            SyntaxKind::OPERATOR_KW,
        ]) {
            self.parse_qualified_name();
        }

        let mut has_params = false;
        loop {
            if self.at(SyntaxKind::L_BRACKET) {
                self.parse_array_suffix();
            } else if self.at(SyntaxKind::L_PAREN) && self.at_parameter_list() {
                self.parse_param_list();
                self.parse_function_qualifiers();
                has_params = true;
            } else {
                break;
            }
        }
        let is_function = has_params && !nested;

        if self.at(SyntaxKind::EQ) {
            self.start_node(SyntaxKind::INITIALIZER);
            self.bump(); // =
            self.parse_expr(init_stop);
            self.finish_node();
        } else if self.at(SyntaxKind::COLON) && ctx == ItemContext::Class && !is_function {
            // bit-field width
            self.start_node(SyntaxKind::INITIALIZER);
            self.bump();
            self.parse_expr(&[SyntaxKind::COMMA, SyntaxKind::SEMICOLON, SyntaxKind::EQ]);
            self.finish_node();
        } else if !is_function && !has_params && self.at(SyntaxKind::L_PAREN) {
            self.start_node(SyntaxKind::INITIALIZER);
            self.bump();
            self.parse_expr(&[SyntaxKind::R_PAREN]);
            self.expect(SyntaxKind::R_PAREN);
            self.finish_node();
        } else if self.at(SyntaxKind::L_BRACE) && !is_function {
            self.start_node(SyntaxKind::INITIALIZER);
            self.parse_balanced_braces();
            self.finish_node();
        }
        self.finish_node();
        is_function
    }

    /// PtrOp = '*' CvQualifier* | '&' | '&&'
    fn parse_ptr_op(&mut self) {
        self.start_node(SyntaxKind::PTR_OP);
        let star = self.at(SyntaxKind::STAR);
        self.bump();
        if star {
            while self.current_kind().is_cv() && !self.at_eof() {
                self.bump();
            }
        }
        self.finish_node();
    }

    /// NestedDeclarator = '(' PtrOp+ QualifiedName? ArraySuffix* ')'
    fn parse_nested_declarator(&mut self) {
        self.start_node(SyntaxKind::NESTED_DECLARATOR);
        self.bump(); // (
        while self.at_any(&[SyntaxKind::STAR, SyntaxKind::AMP, SyntaxKind::AMP_AMP]) {
            self.parse_ptr_op();
        }
        if self.at_any(&[SyntaxKind::IDENT, SyntaxKind::COLON_COLON]) {
            self.parse_qualified_name();
        }
        while self.at(SyntaxKind::L_BRACKET) {
            self.parse_array_suffix();
        }
        self.expect(SyntaxKind::R_PAREN);
        self.finish_node();
    }

    /// ArraySuffix = '[' Expr? ']'
    fn parse_array_suffix(&mut self) {
        self.start_node(SyntaxKind::ARRAY_SUFFIX);
        self.bump(); // [
        if !self.at(SyntaxKind::R_BRACKET) {
            self.parse_expr(&[SyntaxKind::R_BRACKET]);
        }
        self.expect(SyntaxKind::R_BRACKET);
        self.finish_node();
    }

    /// ParamList = '(' (Param (',' Param)*)? ')'
    fn parse_param_list(&mut self) {
        self.start_node(SyntaxKind::PARAM_LIST);
        self.bump(); // (
        if !self.at(SyntaxKind::R_PAREN) {
            self.parse_param();
            while self.eat(SyntaxKind::COMMA) {
                self.parse_param();
            }
        }
        if !self.eat(SyntaxKind::R_PAREN) {
            self.error_recover("expected ')' after parameters", &[SyntaxKind::R_PAREN, SyntaxKind::SEMICOLON, SyntaxKind::L_BRACE]);
            self.eat(SyntaxKind::R_PAREN);
        }
        self.finish_node();
    }

    /// Param = '...' | DeclSpecifiers Declarator? ('=' Expr)?
    fn parse_param(&mut self) {
        self.start_node(SyntaxKind::PARAM);
        if self.at(SyntaxKind::ELLIPSIS) {
            self.bump();
        } else {
            self.parse_decl_specifiers(ItemContext::Block);
            if !self.at_any(&[SyntaxKind::COMMA, SyntaxKind::R_PAREN, SyntaxKind::EQ]) {
                self.parse_declarator(ItemContext::Block, PARAM_STOP);
            }
            if self.eat(SyntaxKind::EQ) {
                self.parse_expr(&[SyntaxKind::COMMA, SyntaxKind::R_PAREN]);
            }
        }
        self.finish_node();
    }

    /// FunctionQualifiers = ('const' | 'volatile' | '&' | '&&' | 'noexcept' ('(' Expr ')')?
    ///                      | 'override' | 'final')* TrailingReturn?
    fn parse_function_qualifiers(&mut self) {
        loop {
            match self.current_kind() {
                _ if self.at_eof() => break,
                SyntaxKind::CONST_KW
                | SyntaxKind::VOLATILE_KW
                | SyntaxKind::AMP
                | SyntaxKind::AMP_AMP
                | SyntaxKind::OVERRIDE_KW
                | SyntaxKind::FINAL_KW => self.bump(),
                SyntaxKind::NOEXCEPT_KW => {
                    self.bump();
                    if self.eat(SyntaxKind::L_PAREN) {
                        self.parse_expr(&[SyntaxKind::R_PAREN]);
                        self.expect(SyntaxKind::R_PAREN);
                    }
                }
                SyntaxKind::ARROW => {
                    self.start_node(SyntaxKind::TRAILING_RETURN);
                    self.bump();
                    self.parse_type_id();
                    self.finish_node();
                }
                _ => break,
            }
        }
    }

    /// CtorInitializer = ':' MemInit (',' MemInit)*
    fn parse_ctor_initializer(&mut self) {
        self.start_node(SyntaxKind::CTOR_INITIALIZER);
        self.bump(); // :
        loop {
            if self.at_any(&[SyntaxKind::IDENT, SyntaxKind::COLON_COLON]) {
                self.parse_qualified_name();
            } else {
                self.error("expected member initializer");
                break;
            }
            if self.at(SyntaxKind::L_PAREN) {
                self.bump();
                self.parse_expr(&[SyntaxKind::R_PAREN]);
                self.expect(SyntaxKind::R_PAREN);
            } else if self.at(SyntaxKind::L_BRACE) {
                self.parse_balanced_braces();
            }
            self.eat(SyntaxKind::ELLIPSIS);
            if !self.eat(SyntaxKind::COMMA) {
                break;
            }
        }
        self.finish_node();
    }

    // =========================================================================
    // Grammar rules: bodies
    // =========================================================================

    /// CompoundStmt = '{' (LocalDeclaration | CompoundStmt | Statement)* '}'
    fn parse_compound_stmt(&mut self) {
        self.start_node(SyntaxKind::COMPOUND_STMT);
        self.bump(); // {
        while !self.at_eof() && !self.at(SyntaxKind::R_BRACE) {
            let before = self.sig_pos;
            if self.at(SyntaxKind::L_BRACE) {
                self.parse_compound_stmt();
            } else if self.at_local_declaration() {
                self.parse_item(ItemContext::Block);
            } else {
                self.parse_statement();
            }
            if self.sig_pos == before {
                self.bump();
            }
        }
        self.expect(SyntaxKind::R_BRACE);
        self.finish_node();
    }

    /// Statement = token soup up to `;` with nested compound statements
    fn parse_statement(&mut self) {
        self.start_node(SyntaxKind::STATEMENT);
        let mut depth = 0usize;
        while !self.at_eof() {
            match self.current_kind() {
                SyntaxKind::SEMICOLON if depth == 0 => {
                    self.bump();
                    break;
                }
                SyntaxKind::L_PAREN | SyntaxKind::L_BRACKET => {
                    depth += 1;
                    self.bump();
                }
                SyntaxKind::R_PAREN | SyntaxKind::R_BRACKET => {
                    depth = depth.saturating_sub(1);
                    self.bump();
                }
                SyntaxKind::L_BRACE => {
                    self.parse_compound_stmt();
                    if depth == 0
                        && !matches!(self.nth_text(0), "else" | "while" | "catch")
                        && !self.at(SyntaxKind::SEMICOLON)
                    {
                        break;
                    }
                }
                SyntaxKind::R_BRACE => break,
                _ => self.bump(),
            }
        }
        self.finish_node();
    }

    /// Expr = balanced token soup up to a stop token at depth 0
    fn parse_expr(&mut self, stop: &[SyntaxKind]) {
        self.start_node(SyntaxKind::EXPR);
        let mut depth = 0usize;
        while !self.at_eof() {
            let kind = self.current_kind();
            if depth == 0 && (stop.contains(&kind) || kind == SyntaxKind::SEMICOLON) {
                break;
            }
            match kind {
                SyntaxKind::L_PAREN | SyntaxKind::L_BRACKET | SyntaxKind::L_BRACE => depth += 1,
                SyntaxKind::R_PAREN | SyntaxKind::R_BRACKET | SyntaxKind::R_BRACE => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                _ => {}
            }
            self.bump();
        }
        self.finish_node();
    }

    /// '{' balanced tokens '}'
    fn parse_balanced_braces(&mut self) {
        let mut depth = 0usize;
        while !self.at_eof() {
            match self.current_kind() {
                SyntaxKind::L_BRACE => depth += 1,
                SyntaxKind::R_BRACE => {
                    depth -= 1;
                    if depth == 0 {
                        self.bump();
                        return;
                    }
                }
                _ => {}
            }
            self.bump();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SyntaxNode;

    fn kinds_of(node: &SyntaxNode) -> Vec<SyntaxKind> {
        node.children().map(|n| n.kind()).collect()
    }

    #[test]
    fn test_parse_empty() {
        let result = parse("");
        assert!(result.ok());
        assert_eq!(result.syntax().kind(), SyntaxKind::SOURCE_FILE);
    }

    #[test]
    fn test_parse_is_lossless() {
        let text = "namespace N { /* c */ struct S { int x; }; }\nclass F;  ";
        let result = parse(text);
        assert_eq!(result.syntax().text().to_string(), text);
    }

    #[test]
    fn test_parse_class_forward() {
        let result = parse("class A;");
        assert!(result.ok(), "{:?}", result.errors);
        assert_eq!(kinds_of(&result.syntax()), vec![SyntaxKind::CLASS_FWD]);
    }

    #[test]
    fn test_parse_class_definition() {
        let result = parse("struct S : public B { int x; void f(); };");
        assert!(result.ok(), "{:?}", result.errors);
        let decl = result.syntax().first_child().unwrap();
        assert_eq!(decl.kind(), SyntaxKind::SIMPLE_DECL);
        let class = decl.descendants().find(|n| n.kind() == SyntaxKind::CLASS_SPEC).unwrap();
        assert!(class.children().any(|n| n.kind() == SyntaxKind::BASE_CLAUSE));
        let members = class.children().find(|n| n.kind() == SyntaxKind::MEMBER_LIST).unwrap();
        assert_eq!(
            kinds_of(&members),
            vec![SyntaxKind::SIMPLE_DECL, SyntaxKind::SIMPLE_DECL]
        );
    }

    #[test]
    fn test_node_ranges_exclude_trivia() {
        let result = parse("  class A;  ");
        let fwd = result.syntax().first_child().unwrap();
        assert_eq!(fwd.text_range(), TextRange::new(2.into(), 10.into()));
    }

    #[test]
    fn test_parse_function_definition() {
        let result = parse("int main(int argc, char** argv) { return 0; }");
        assert!(result.ok(), "{:?}", result.errors);
        assert_eq!(kinds_of(&result.syntax()), vec![SyntaxKind::FUNCTION_DEF]);
    }

    #[test]
    fn test_parse_out_of_line_constructor() {
        let result = parse("A::A() : x(1), y{2} {}");
        assert!(result.ok(), "{:?}", result.errors);
        let def = result.syntax().first_child().unwrap();
        assert_eq!(def.kind(), SyntaxKind::FUNCTION_DEF);
        assert!(def.children().any(|n| n.kind() == SyntaxKind::CTOR_INITIALIZER));
    }

    #[test]
    fn test_parse_template_with_specialization() {
        let result = parse("template<class T> struct V<T*> { };");
        assert!(result.ok(), "{:?}", result.errors);
        let tmpl = result.syntax().first_child().unwrap();
        assert_eq!(tmpl.kind(), SyntaxKind::TEMPLATE_DECL);
        assert_eq!(
            kinds_of(&tmpl),
            vec![SyntaxKind::TEMPLATE_PARAMS, SyntaxKind::SIMPLE_DECL]
        );
    }

    #[test]
    fn test_parse_function_pointer_typedef() {
        let result = parse("typedef int (*handler)(int, const char*);");
        assert!(result.ok(), "{:?}", result.errors);
        let declarator = result
            .syntax()
            .descendants()
            .find(|n| n.kind() == SyntaxKind::DECLARATOR)
            .unwrap();
        assert_eq!(
            kinds_of(&declarator),
            vec![SyntaxKind::NESTED_DECLARATOR, SyntaxKind::PARAM_LIST]
        );
    }

    #[test]
    fn test_parse_typedef_without_declarator() {
        let result = parse("typedef int;\nint ok;");
        let typedef = result
            .syntax()
            .children()
            .find(|n| n.kind() == SyntaxKind::TYPEDEF_DECL)
            .unwrap();
        assert!(!kinds_of(&typedef).contains(&SyntaxKind::DECLARATOR));
        assert_eq!(typedef.text().to_string(), "typedef int;");
    }

    #[test]
    fn test_parse_using_forms() {
        let result = parse("using namespace std; using std::swap; using V = int*;");
        assert!(result.ok(), "{:?}", result.errors);
        assert_eq!(
            kinds_of(&result.syntax()),
            vec![
                SyntaxKind::USING_DIRECTIVE,
                SyntaxKind::USING_DECL,
                SyntaxKind::ALIAS_DECL
            ]
        );
    }

    #[test]
    fn test_parse_local_declarations_in_body() {
        let result = parse("void f() { struct L { }; int x = 1; x++; if (x) { int y; } }");
        assert!(result.ok(), "{:?}", result.errors);
        let body = result
            .syntax()
            .descendants()
            .find(|n| n.kind() == SyntaxKind::COMPOUND_STMT)
            .unwrap();
        assert_eq!(
            kinds_of(&body),
            vec![
                SyntaxKind::SIMPLE_DECL,
                SyntaxKind::SIMPLE_DECL,
                SyntaxKind::STATEMENT,
                SyntaxKind::STATEMENT
            ]
        );
    }

    #[test]
    fn test_parse_recovers_after_garbage() {
        let result = parse("class ; struct Ok {};");
        assert!(!result.ok());
        let last = result.syntax().children().last().unwrap();
        assert_eq!(last.kind(), SyntaxKind::SIMPLE_DECL);
    }

    #[test]
    fn test_parse_type_id_entry() {
        let result = parse_type_id("const A::B<int, 3>* &");
        assert!(result.ok(), "{:?}", result.errors);
        let root = result.syntax();
        assert_eq!(kinds_of(&root), vec![SyntaxKind::TYPE_ID]);
    }
}
