//! Rendering syntax trees into declarations.
//!
//! One pass over a parsed file creates a [`Declaration`] per construct,
//! places it in its scope's and owner's lists, and registers classifiers,
//! forward declarations and specializations with the project. Constructs
//! that cannot be rendered are reported as [`RenderError`]s and skipped;
//! the rest of the file still renders.

mod classes;
mod functions;
mod types;

use std::sync::Arc;

use crate::base::{FileId, Name, QualifiedName, TextRange, TextSize};
use crate::parser::{
    self, AstNode, Item, NamespaceAlias, NamespaceDef, SourceFile, SyntaxKind, SyntaxNode,
    SyntaxToken, TemplateParam,
};

use super::decl::{AliasData, DeclData, Declaration, NamespaceDefinitionData, TemplateInfo, UsingData};
use super::error::RenderError;
use super::ids::{DeclKind, Uid, UidKey, Visibility};
use super::project::Project;
use super::store::FileUnit;

use types::TypeSite;
pub use types::parse_type;

/// What one render pass produced.
#[derive(Debug, Default)]
pub struct RenderOutcome {
    /// Every declaration created, in creation order.
    pub declarations: Vec<Uid>,
    pub errors: Vec<RenderError>,
}

/// Parse `text` and render it as `file`.
///
/// The file must not hold declarations from an earlier render; see
/// [`Project::dispose_file`].
pub fn render_source(project: &Project, file: FileId, text: &str) -> RenderOutcome {
    let parse = parser::parse(text);
    for error in &parse.errors {
        tracing::trace!("[RENDER] {file}: syntax error at {:?}: {}", error.range, error.message);
    }
    render_tree(project, file, &parse.syntax())
}

/// Render an already parsed file.
pub fn render_tree(project: &Project, file: FileId, root: &SyntaxNode) -> RenderOutcome {
    let unit = match project.file_unit(file) {
        Some(unit) => unit,
        None => project.add_file(file, file.to_string()),
    };
    let mut renderer = Renderer {
        project,
        file,
        unit,
        created: Vec::new(),
        errors: Vec::new(),
    };
    if let Some(source) = SourceFile::cast(root.clone()) {
        for item in source.items() {
            renderer.item(&item, Container::File, None);
        }
    }
    let generation = project.advance_generation();
    tracing::debug!(
        "[RENDER] {file}: {} declaration(s), {} error(s), generation {generation}",
        renderer.created.len(),
        renderer.errors.len()
    );
    RenderOutcome {
        declarations: renderer.created,
        errors: renderer.errors,
    }
}

// ============================================================================
// RENDERER
// ============================================================================

/// The declaration whose lists receive what is rendered next.
#[derive(Debug, Clone, Copy)]
enum Container {
    /// File level: scope is the global namespace, owner the file unit.
    File,
    /// Inside `namespace N { }`: scope is the merged namespace, owner the block.
    Namespace { definition: Uid, namespace: Uid },
    Class { class: Uid, access: Visibility },
    /// Function body.
    Body { function: Uid },
}

/// Which lists a new declaration joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Listing {
    /// The scope's list and the owner's list.
    Scope,
    /// Only the owner's list: out-of-line definitions and file-level usings.
    OwnerOnly,
    /// No list; held by another declaration.
    Detached,
}

/// A `template<...>` header waiting for the declaration it applies to.
#[derive(Debug, Clone)]
struct Header {
    params: Vec<TemplateParam>,
    start: TextSize,
}

/// What a new declaration is, before it has a UID.
struct Shape<'n> {
    kind: DeclKind,
    name: &'n str,
    range: TextRange,
    scope: Uid,
}

struct Renderer<'a> {
    project: &'a Project,
    file: FileId,
    unit: Arc<FileUnit>,
    created: Vec<Uid>,
    errors: Vec<RenderError>,
}

impl<'a> Renderer<'a> {
    fn item(&mut self, item: &Item, container: Container, header: Option<&Header>) {
        match item {
            Item::Preproc(_) | Item::Access(_) => {}
            Item::Namespace(def) => self.namespace(def, container),
            Item::NamespaceAlias(alias) => self.namespace_alias(alias, container),
            Item::Linkage(linkage) => {
                if let Some(body) = linkage.body() {
                    for inner in body.items() {
                        self.item(&inner, container, None);
                    }
                }
            }
            Item::UsingDirective(using) => {
                self.using(using.syntax(), using.target(), DeclKind::UsingDirective, container)
            }
            Item::UsingDecl(using) => {
                self.using(using.syntax(), using.target(), DeclKind::UsingDeclaration, container)
            }
            Item::Alias(alias) => self.alias(alias, container, header),
            Item::Typedef(typedef) => self.typedef(typedef, container),
            Item::Template(template) => {
                let header = Header {
                    params: template.params().map(|p| p.params().collect()).unwrap_or_default(),
                    start: header.map_or(template.syntax().text_range().start(), |outer| outer.start),
                };
                match template.item() {
                    Some(inner) => self.item(&inner, container, Some(&header)),
                    None => self.missing_declarator("template", template.syntax()),
                }
            }
            Item::ClassForward(forward) => self.class_forward(forward, container, header),
            Item::EnumForward(forward) => self.enum_forward(forward, container),
            Item::Simple(simple) => self.simple(simple, container, header),
            Item::Function(function) => self.function_definition(function, container, header),
            Item::Friend(friend) => self.friend(friend, container),
        }
    }

    // ------------------------------------------------------------------------
    // Placement
    // ------------------------------------------------------------------------

    /// Scope of declarations rendered directly in `container`.
    fn scope_of(&self, container: Container) -> Uid {
        match container {
            Container::File => self.project.global_namespace(),
            Container::Namespace { namespace, .. } => namespace,
            Container::Class { class, .. } => class,
            Container::Body { function } => function,
        }
    }

    /// The declaration physically holding what is rendered in `container`,
    /// when that is not the scope.
    fn owner_of(&self, container: Container) -> Option<Uid> {
        match container {
            Container::File => Some(self.unit.uid),
            Container::Namespace { definition, .. } => Some(definition),
            Container::Class { .. } | Container::Body { .. } => None,
        }
    }

    fn visibility_of(container: Container) -> Visibility {
        match container {
            Container::Class { access, .. } => access,
            _ => Visibility::Public,
        }
    }

    fn enclosing_class(container: Container) -> Option<Uid> {
        match container {
            Container::Class { class, .. } => Some(class),
            _ => None,
        }
    }

    /// Create a declaration for `shape` and place it in `container`.
    fn declare(
        &mut self,
        container: Container,
        shape: Shape<'_>,
        listing: Listing,
        build: impl FnOnce(Uid) -> DeclData,
    ) -> Arc<Declaration> {
        let owner = match listing {
            Listing::Detached => None,
            Listing::Scope | Listing::OwnerOnly => self.owner_of(container),
        };
        let decl = self.create(shape, owner, Self::visibility_of(container), build);
        if listing != Listing::Detached {
            self.place(container, &decl, listing == Listing::Scope);
        }
        decl
    }

    /// Create a declaration held by another declaration's list rather
    /// than by a container (enumerators, template parameters).
    fn detached(&mut self, shape: Shape<'_>, build: impl FnOnce(Uid) -> DeclData) -> Arc<Declaration> {
        self.create(shape, None, Visibility::Public, build)
    }

    fn create(
        &mut self,
        shape: Shape<'_>,
        owner: Option<Uid>,
        visibility: Visibility,
        build: impl FnOnce(Uid) -> DeclData,
    ) -> Arc<Declaration> {
        let key = UidKey::Decl {
            kind: shape.kind,
            file: self.file,
            name: Name::new(shape.name),
            start: shape.range.start().into(),
            end: shape.range.end().into(),
        };
        let file = self.file;
        let decl = self.project.store().put_declaration(key, |uid| {
            Declaration::new(uid, shape.kind, shape.name, build(uid))
                .in_file(Some(file), shape.range)
                .with_scope(Some(shape.scope))
                .with_owner(owner)
                .with_visibility(visibility)
        });
        self.created.push(decl.uid());
        tracing::trace!(
            "[RENDER] {} {} `{}` at {:?}",
            decl.uid(),
            decl.kind(),
            decl.name(),
            decl.range()
        );
        decl
    }

    fn place(&self, container: Container, decl: &Declaration, in_scope: bool) {
        let entry = decl.entry();
        match container {
            Container::File => {
                if in_scope {
                    if let Some(data) = self.declaration(self.project.global_namespace()).as_deref().and_then(Declaration::namespace_data) {
                        data.declarations.insert(entry.clone());
                    }
                }
                self.unit.declarations.insert(entry);
            }
            Container::Namespace {
                definition,
                namespace,
            } => {
                if in_scope {
                    if let Some(ns) = self.declaration(namespace) {
                        if let Some(data) = ns.namespace_data() {
                            data.declarations.insert(entry.clone());
                        }
                    }
                }
                if let Some(def) = self.declaration(definition) {
                    if let Some(data) = def.namespace_definition_data() {
                        data.declarations.insert(entry);
                    }
                }
            }
            Container::Class { class, .. } => {
                if let Some(data) = self.declaration(class).as_deref().and_then(Declaration::class_data) {
                    match decl.kind() {
                        DeclKind::Friend => data.friends.insert(entry),
                        _ => data.members.insert(entry),
                    }
                }
            }
            Container::Body { function } => {
                if let Some(data) = self.declaration(function).as_deref().and_then(Declaration::function_data) {
                    data.body.insert(entry);
                }
            }
        }
    }

    fn declaration(&self, uid: Uid) -> Option<Arc<Declaration>> {
        self.project.declaration(uid)
    }

    fn site(&self, offset: TextSize, scope: Uid) -> TypeSite {
        TypeSite::new(self.file, offset, scope)
    }

    // ------------------------------------------------------------------------
    // Errors
    // ------------------------------------------------------------------------

    fn report(&mut self, error: RenderError) {
        tracing::warn!("[RENDER] {error}");
        self.errors.push(error);
    }

    fn missing_name(&mut self, construct: &'static str, node: &SyntaxNode) {
        self.report(RenderError::MissingName {
            file: self.file,
            construct,
            range: node.text_range(),
        });
    }

    fn missing_declarator(&mut self, construct: &'static str, node: &SyntaxNode) {
        self.report(RenderError::MissingDeclarator {
            file: self.file,
            construct,
            range: node.text_range(),
        });
    }

    fn missing_type(&mut self, construct: &'static str, node: &SyntaxNode) {
        self.report(RenderError::MissingType {
            file: self.file,
            construct,
            range: node.text_range(),
        });
    }

    fn unsupported(&mut self, construct: &'static str, node: &SyntaxNode) {
        self.report(RenderError::Unsupported {
            file: self.file,
            construct,
            range: node.text_range(),
        });
    }

    // ========================================================================
    // NAMESPACES
    // ========================================================================

    /// `namespace A::B { }` renders one block per segment, each nested in
    /// the previous one and each contributing to its merged namespace.
    fn namespace(&mut self, def: &NamespaceDef, container: Container) {
        let mut parent = match container {
            Container::File => self.project.global_namespace(),
            Container::Namespace { namespace, .. } => namespace,
            Container::Class { .. } | Container::Body { .. } => {
                self.unsupported("namespace outside namespace scope", def.syntax());
                return;
            }
        };
        let mut segments = def.name().map(|n| n.segment_names()).unwrap_or_default();
        if segments.is_empty() {
            segments.push(String::new());
        }
        let range = construct_range(def.syntax(), None);
        let last = segments.len() - 1;

        let mut current = container;
        for (i, segment) in segments.iter().enumerate() {
            let inline = def.is_inline() && i == last;
            let Some(ns) = self.project.namespace_for(parent, segment, Some(self.file), inline) else {
                self.unsupported("namespace", def.syntax());
                return;
            };
            let shape = Shape {
                kind: DeclKind::NamespaceDefinition,
                name: segment,
                range,
                scope: ns.scope().unwrap_or(parent),
            };
            let namespace = ns.uid();
            let definition = self.declare(current, shape, Listing::OwnerOnly, |_| {
                DeclData::NamespaceDefinition(NamespaceDefinitionData {
                    namespace: Some(namespace),
                    ..NamespaceDefinitionData::default()
                })
            });
            if let Some(data) = ns.namespace_data() {
                data.definitions.insert(definition.entry());
            }
            current = Container::Namespace {
                definition: definition.uid(),
                namespace,
            };
            parent = namespace;
        }

        if let Some(body) = def.body() {
            for item in body.items() {
                self.item(&item, current, None);
            }
        }
    }

    /// `namespace fs = std::filesystem;`
    fn namespace_alias(&mut self, alias: &NamespaceAlias, container: Container) {
        let (Some(name), Some(target)) = (alias.name(), alias.target()) else {
            self.missing_name("namespace alias", alias.syntax());
            return;
        };
        let shape = Shape {
            kind: DeclKind::NamespaceDefinition,
            name: &name,
            range: alias.syntax().text_range(),
            scope: self.scope_of(container),
        };
        self.declare(container, shape, Listing::Scope, |_| {
            DeclData::NamespaceDefinition(NamespaceDefinitionData {
                alias: Some(path_of(&target)),
                ..NamespaceDefinitionData::default()
            })
        });
    }

    // ========================================================================
    // USING, ALIASES
    // ========================================================================

    /// A using directive or declaration. At file level it belongs to the
    /// file: its scope is the file unit and only the unit lists it.
    fn using(
        &mut self,
        node: &SyntaxNode,
        target: Option<parser::QualifiedName>,
        kind: DeclKind,
        container: Container,
    ) {
        let Some(target) = target else {
            self.missing_name(kind.as_str(), node);
            return;
        };
        let path = path_of(&target);
        let name = match kind {
            DeclKind::UsingDeclaration => path.last().cloned().unwrap_or_default(),
            _ => Name::new(path.to_string()),
        };
        let (scope, listing) = match container {
            Container::File => (self.unit.uid, Listing::OwnerOnly),
            _ => (self.scope_of(container), Listing::Scope),
        };
        let shape = Shape {
            kind,
            name: &name,
            range: node.text_range(),
            scope,
        };
        self.declare(container, shape, listing, |_| DeclData::Using(UsingData { path }));
    }

    /// `using X = T;`, possibly templated.
    fn alias(&mut self, alias: &parser::AliasDecl, container: Container, header: Option<&Header>) {
        let Some(name) = alias.name() else {
            self.missing_name("alias declaration", alias.syntax());
            return;
        };
        let Some(type_id) = alias.type_id() else {
            self.missing_type("alias declaration", alias.syntax());
            return;
        };
        let range = construct_range(alias.syntax(), header.map(|h| h.start));
        let shape = Shape {
            kind: DeclKind::TypeAlias,
            name: &name,
            range,
            scope: self.scope_of(container),
        };
        let file = self.file;
        let offset = type_id.syntax().text_range().start();
        let decl = self.declare(container, shape, Listing::Scope, |uid| {
            let site = TypeSite::new(file, offset, uid);
            DeclData::Alias(AliasData {
                ty: types::type_or_text(&type_id, site),
                template: header.map(|_| TemplateInfo::default()),
            })
        });
        if let Some(header) = header {
            self.template_params(&decl, header);
        }
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// A parser name as a model path, template arguments dropped.
fn path_of(name: &parser::QualifiedName) -> QualifiedName {
    QualifiedName {
        is_global: name.is_global(),
        segments: name.segment_names().into_iter().map(Name::from).collect(),
    }
}

/// Range of a construct: from `start` (a template header) or the node's
/// own start, to its closing brace when it has a body.
fn construct_range(node: &SyntaxNode, start: Option<TextSize>) -> TextRange {
    let start = start.unwrap_or_else(|| node.text_range().start());
    let end = closing_brace(node)
        .map(|brace| brace.text_range().end())
        .unwrap_or_else(|| node.text_range().end());
    TextRange::new(start, end.max(start))
}

fn closing_brace(node: &SyntaxNode) -> Option<SyntaxToken> {
    let direct = |n: &SyntaxNode| {
        n.children_with_tokens()
            .filter_map(|e| e.into_token())
            .filter(|t| t.kind() == SyntaxKind::R_BRACE)
            .last()
    };
    if let Some(brace) = direct(node) {
        return Some(brace);
    }
    let body = node.children().find(|child| {
        matches!(
            child.kind(),
            SyntaxKind::MEMBER_LIST
                | SyntaxKind::DECL_BLOCK
                | SyntaxKind::ENUMERATOR_LIST
                | SyntaxKind::COMPOUND_STMT
        )
    });
    body.as_ref().and_then(direct)
}
