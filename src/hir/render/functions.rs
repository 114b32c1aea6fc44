//! Functions, variables and typedefs.

use std::sync::Arc;

use crate::base::{Name, QualifiedName, TextRange};
use crate::parser::{AstNode, CompoundStmt, DeclSpecifiers, Declarator, FunctionDef, Param, SimpleDecl, TypedefDecl};

use crate::hir::decl::{AliasData, DeclData, Declaration, FunctionData, FunctionFlags, TemplateInfo, VariableData};
use crate::hir::ids::{DeclKind, Uid};
use crate::hir::resolve::{LookupKind, ResolveContext, Resolver};

use super::types::{self, DeclaratorContext, TypeSite};
use super::{Container, Header, Listing, Renderer, Shape, construct_range};

/// Where a function declarator is rendered.
pub(super) struct Site {
    pub range: TextRange,
    pub scope: Uid,
    pub listing: Listing,
}

impl Renderer<'_> {
    // ========================================================================
    // SIMPLE DECLARATIONS
    // ========================================================================

    /// `int a, *b;`, `struct S { } s;`, `void f(int);`
    pub(super) fn simple(&mut self, simple: &SimpleDecl, container: Container, header: Option<&Header>) {
        let specifiers = simple.specifiers();
        let classifier = self.nested_classifier(specifiers.as_ref(), container, header);
        let declarators = simple.declarators();
        if declarators.is_empty() {
            if specifiers.as_ref().is_none_or(|s| s.class_spec().is_none() && s.enum_spec().is_none()) {
                self.missing_declarator("declaration", simple.syntax());
            }
            return;
        }

        let statement = construct_range(simple.syntax(), header.map(|h| h.start));
        for (i, declarator) in declarators.iter().enumerate() {
            let range = if i == 0 {
                statement
            } else {
                declarator.syntax().text_range()
            };
            if declarator.is_function() {
                let site = Site {
                    range,
                    scope: self.scope_of(container),
                    listing: Listing::Scope,
                };
                self.function(specifiers.as_ref(), declarator, None, container, header, site);
            } else {
                self.variable(specifiers.as_ref(), declarator, classifier.as_ref(), container, range);
            }
        }
    }

    /// A class or enum defined inside `specifiers`.
    fn nested_classifier(
        &mut self,
        specifiers: Option<&DeclSpecifiers>,
        container: Container,
        header: Option<&Header>,
    ) -> Option<Arc<Declaration>> {
        let specifiers = specifiers?;
        if let Some(spec) = specifiers.class_spec() {
            return self.class_spec(&spec, container, header);
        }
        if let Some(spec) = specifiers.enum_spec() {
            return self.enum_spec(&spec, container);
        }
        None
    }

    fn variable(
        &mut self,
        specifiers: Option<&DeclSpecifiers>,
        declarator: &Declarator,
        classifier: Option<&Arc<Declaration>>,
        container: Container,
        range: TextRange,
    ) {
        let Some((qualifier, name)) = split_name(declarator) else {
            self.missing_name("variable", declarator.syntax());
            return;
        };
        let (scope, listing) = match self.qualifier_scope(&qualifier, container, range) {
            Some(scope) => (scope, Listing::OwnerOnly),
            None => (self.scope_of(container), Listing::Scope),
        };
        let site = self.site(range.start(), scope);
        let declared = classifier.map(|c| (c.uid(), c.name().clone()));
        let Some(base) = specifiers.and_then(|s| types::base_type(s, declared, site)) else {
            self.missing_type("variable", declarator.syntax());
            return;
        };
        let ty = types::apply_declarator(base, declarator, DeclaratorContext::Variable, site);
        let kind = match container {
            Container::Class { .. } => DeclKind::Field,
            _ => DeclKind::Variable,
        };
        let shape = Shape {
            kind,
            name: &name,
            range,
            scope,
        };
        let data = VariableData {
            ty,
            is_static: specifiers.is_some_and(DeclSpecifiers::is_static),
            is_extern: specifiers.is_some_and(DeclSpecifiers::is_extern),
            initializer: declarator.initializer().and_then(|i| i.expr()).map(|e| e.text()),
        };
        let decl = self.declare(container, shape, listing, |_| DeclData::Variable(data));
        if let Some(classifier) = classifier {
            add_enclosing(classifier, &decl);
        }
    }

    // ========================================================================
    // TYPEDEFS
    // ========================================================================

    pub(super) fn typedef(&mut self, typedef: &TypedefDecl, container: Container) {
        let specifiers = typedef.specifiers();
        let classifier = self.nested_classifier(specifiers.as_ref(), container, None);
        let declarators = typedef.declarators();
        if declarators.is_empty() {
            self.missing_declarator("typedef", typedef.syntax());
            return;
        }

        let statement = construct_range(typedef.syntax(), None);
        let scope = self.scope_of(container);
        for (i, declarator) in declarators.iter().enumerate() {
            let Some(name) = declarator.declared_name().and_then(|n| n.last_name()) else {
                self.missing_name("typedef", declarator.syntax());
                continue;
            };
            let range = if i == 0 {
                statement
            } else {
                declarator.syntax().text_range()
            };
            let site = self.site(range.start(), scope);
            let declared = classifier.as_ref().map(|c| (c.uid(), c.name().clone()));
            let Some(base) = specifiers.as_ref().and_then(|s| types::base_type(s, declared, site)) else {
                self.missing_type("typedef", declarator.syntax());
                continue;
            };
            let ty = types::apply_declarator(base, declarator, DeclaratorContext::Typedef, site);
            let shape = Shape {
                kind: DeclKind::Typedef,
                name: &name,
                range,
                scope,
            };
            let decl = self.declare(container, shape, Listing::Scope, |_| {
                DeclData::Alias(AliasData { ty, template: None })
            });
            if let Some(classifier) = &classifier {
                add_enclosing(classifier, &decl);
            }
        }
    }

    // ========================================================================
    // FUNCTIONS
    // ========================================================================

    pub(super) fn function_definition(&mut self, def: &FunctionDef, container: Container, header: Option<&Header>) {
        let Some(declarator) = def.declarator() else {
            self.missing_declarator("function definition", def.syntax());
            return;
        };
        let site = Site {
            range: construct_range(def.syntax(), header.map(|h| h.start)),
            scope: self.scope_of(container),
            listing: Listing::Scope,
        };
        self.function(def.specifiers().as_ref(), &declarator, def.body(), container, header, site);
    }

    /// Render a function declarator, its parameters and its body.
    ///
    /// An out-of-line definition (`void A::f() { }`) is scoped to the
    /// class or namespace its qualifier names, listed only by its owner,
    /// and linked to the declaration it implements.
    pub(super) fn function(
        &mut self,
        specifiers: Option<&DeclSpecifiers>,
        declarator: &Declarator,
        body: Option<CompoundStmt>,
        container: Container,
        header: Option<&Header>,
        site: Site,
    ) -> Option<Arc<Declaration>> {
        let Some((qualifier, name)) = split_name(declarator) else {
            self.missing_name("function", declarator.syntax());
            return None;
        };
        let args = declarator
            .declared_name()
            .and_then(|n| n.segments().last().and_then(|s| s.template_args()));

        let out_of_line = self.qualifier_scope(&qualifier, container, site.range);
        let in_class = site.listing != Listing::Detached && out_of_line.is_none();
        let kind = match Renderer::enclosing_class(container).and_then(|uid| self.declaration(uid)) {
            Some(class) if in_class => member_kind(&name, class.name()),
            _ if body.is_some() => DeclKind::FunctionDefinition,
            _ => DeclKind::Function,
        };
        let (scope, listing) = match out_of_line {
            Some(scope) => (scope, Listing::OwnerOnly),
            None => (site.scope, site.listing),
        };

        let params = declarator.params().map(|p| p.params()).unwrap_or_default();
        let flags = FunctionFlags {
            is_const: declarator.is_const_function(),
            is_static: specifiers.is_some_and(DeclSpecifiers::is_static),
            is_virtual: specifiers.is_some_and(DeclSpecifiers::is_virtual) || declarator.is_override(),
            is_pure: declarator.is_pure(),
            is_inline: specifiers.is_some_and(DeclSpecifiers::is_inline)
                || (body.is_some() && matches!(container, Container::Class { .. })),
            is_variadic: params.iter().any(Param::is_ellipsis),
            is_defaulted: declarator.is_defaulted(),
            is_deleted: declarator.is_deleted(),
        };
        let shape = Shape {
            kind,
            name: &name,
            range: site.range,
            scope,
        };
        let file = self.file;
        let offset = site.range.start();
        let has_body = body.is_some();
        let written_qualifier = (!qualifier.is_empty()).then(|| QualifiedName::new(qualifier.clone()));
        let decl = self.declare(container, shape, listing, |uid| {
            let site = TypeSite::new(file, offset, uid);
            let base = specifiers.and_then(|s| types::base_type(s, None, site));
            DeclData::Function(FunctionData {
                return_type: types::return_type(base, declarator, site),
                template: header.map(|_| TemplateInfo::default()),
                specialization: args.map(|a| types::template_args(&a, site)),
                qualifier: written_qualifier,
                flags,
                has_body,
                ..FunctionData::default()
            })
        });

        if let Some(header) = header {
            self.template_params(&decl, header);
        }
        self.params(&decl, &params);
        if has_body {
            self.link_declaration(&decl, scope, params.len());
        }
        if let Some(body) = body {
            let container = Container::Body { function: decl.uid() };
            for item in body.declarations() {
                self.item(&item, container, None);
            }
        }
        self.project.register(&decl);
        Some(decl)
    }

    fn params(&mut self, function: &Declaration, params: &[Param]) {
        let Some(data) = function.function_data() else {
            return;
        };
        if let [only] = params {
            if is_void(only) {
                return;
            }
        }
        for param in params.iter().filter(|p| !p.is_ellipsis()) {
            let Some(specifiers) = param.specifiers() else {
                continue;
            };
            let range = param.syntax().text_range();
            let site = self.site(range.start(), function.uid());
            let Some(base) = types::base_type(&specifiers, None, site) else {
                self.missing_type("parameter", param.syntax());
                continue;
            };
            let inner = param.declarator();
            let ty = match &inner {
                Some(d) => types::apply_declarator(base, d, DeclaratorContext::Parameter, site),
                None => base,
            };
            let name = inner
                .as_ref()
                .and_then(|d| d.declared_name())
                .and_then(|n| n.last_name())
                .unwrap_or_default();
            let shape = Shape {
                kind: DeclKind::Parameter,
                name: &name,
                range,
                scope: function.uid(),
            };
            let initializer = param.default_value().map(|e| e.text());
            let decl = self.detached(shape, |_| {
                DeclData::Variable(VariableData {
                    ty,
                    is_static: false,
                    is_extern: false,
                    initializer,
                })
            });
            data.params.insert(decl.entry());
        }
    }

    /// Point a definition at the earlier declaration it implements: a
    /// bodiless function of the same name in `scope`, preferring one with
    /// the same parameter count.
    fn link_declaration(&self, definition: &Declaration, scope: Uid, param_count: usize) {
        let Some(data) = definition.function_data() else {
            return;
        };
        let Some(scope) = self.declaration(scope) else {
            return;
        };
        let candidates: Vec<Arc<Declaration>> = scope
            .children()
            .into_iter()
            .filter(|e| e.uid != definition.uid() && e.kind.is_function() && e.name == *definition.name())
            .filter_map(|e| self.declaration(e.uid))
            .filter(|d| d.function_data().is_some_and(|f| !f.has_body))
            .collect();
        let arity = |d: &Declaration| d.function_data().map_or(0, |f| f.params.len());
        let target = candidates
            .iter()
            .find(|d| arity(d) == param_count)
            .or_else(|| candidates.first());
        if let Some(target) = target {
            *data.declaration.write() = Some(target.uid());
            tracing::trace!("[RENDER] {} implements {}", definition.uid(), target.uid());
        }
    }

    /// The class or namespace named by an out-of-line qualifier.
    pub(super) fn qualifier_scope(&self, qualifier: &[Name], container: Container, range: TextRange) -> Option<Uid> {
        if qualifier.is_empty() {
            return None;
        }
        let ctx = ResolveContext::at(self.project, self.file, Some(range.start()));
        let path = QualifiedName::new(qualifier.to_vec());
        let target = Resolver::definitions(self.project, &ctx).resolve(
            self.scope_of(container),
            &path,
            LookupKind::NamespaceOrClassifier,
        );
        match target {
            Some(target) if target.kind().is_scope() && !target.is_placeholder() => Some(target.uid()),
            _ => {
                tracing::debug!("[RENDER] qualifier `{path}` does not name a scope");
                None
            }
        }
    }
}

/// Qualifier and final name of a declarator's declared name.
fn split_name(declarator: &Declarator) -> Option<(Vec<Name>, String)> {
    let mut segments = declarator.declared_name()?.segment_names();
    let name = segments.pop()?;
    Some((segments.into_iter().map(Name::from).collect(), name))
}

fn member_kind(name: &str, class_name: &str) -> DeclKind {
    if name.starts_with('~') {
        DeclKind::Destructor
    } else if name == class_name {
        DeclKind::Constructor
    } else {
        DeclKind::Method
    }
}

/// `f(void)`
fn is_void(param: &Param) -> bool {
    let builtin = param
        .specifiers()
        .and_then(|s| s.type_ref())
        .and_then(|t| t.builtin());
    builtin.as_deref() == Some("void") && param.declarator().is_none_or(|d| d.ptr_ops().is_empty() && d.declared_name().is_none())
}

fn add_enclosing(classifier: &Declaration, decl: &Declaration) {
    if let Some(data) = classifier.class_data() {
        data.enclosing.insert(decl.entry());
    } else if let Some(data) = classifier.enum_data() {
        data.enclosing.insert(decl.entry());
    }
}
