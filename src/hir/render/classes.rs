//! Classes, enums, forward declarations, friends and template parameters.

use std::sync::Arc;

use smol_str::SmolStr;

use crate::base::{Name, QualifiedName};
use crate::parser::{
    AstNode, ClassForward, ClassSpec, EnumForward, EnumSpec, FriendDecl, Item, SyntaxKind,
    TemplateParamKind,
};

use crate::hir::decl::{
    ClassData, DeclData, Declaration, EnumData, EnumeratorData, ForwardData, FriendData,
    Inheritance, TemplateInfo, TemplateParameterData, TemplateParameterKind,
};
use crate::hir::forward;
use crate::hir::ids::{ClassKey, DeclKind, Visibility};
use crate::hir::types::{SpecializationParam, Type};

use super::functions::Site;
use super::types::{self, DeclaratorContext, TypeSite};
use super::{Container, Header, Listing, Renderer, Shape, construct_range, path_of};

impl Renderer<'_> {
    // ========================================================================
    // CLASSES
    // ========================================================================

    /// A class specifier with a body. The range starts at the template
    /// header if there is one, otherwise at the class key, and always ends
    /// at the closing brace.
    pub(super) fn class_spec(
        &mut self,
        spec: &ClassSpec,
        container: Container,
        header: Option<&Header>,
    ) -> Option<Arc<Declaration>> {
        let Some(key) = spec.class_key().and_then(types::class_key) else {
            self.missing_name("class", spec.syntax());
            return None;
        };
        let kind = key.definition_kind();
        let segments = spec.name().map(|n| n.segments()).unwrap_or_default();
        let (qualifier, last) = match segments.split_last() {
            Some((last, rest)) => (
                rest.iter().filter_map(|s| s.name()).map(SmolStr::from).collect::<Vec<_>>(),
                Some(last.clone()),
            ),
            None => (Vec::new(), None),
        };
        let name = last.as_ref().and_then(|s| s.name()).unwrap_or_default();
        let args = last.as_ref().and_then(|s| s.template_args());

        let range = construct_range(spec.syntax(), header.map(|h| h.start));
        let listing = if qualifier.is_empty() {
            Listing::Scope
        } else {
            Listing::OwnerOnly
        };
        let shape = Shape {
            kind,
            name: &name,
            range,
            scope: self.scope_of(container),
        };
        let file = self.file;
        let left_brace = spec
            .member_list()
            .and_then(|list| list.l_brace())
            .map(|brace| brace.text_range().start());
        let is_final = spec.is_final();
        let decl = self.declare(container, shape, listing, |uid| {
            let site = TypeSite::new(file, range.start(), uid);
            DeclData::Class(ClassData {
                template: header.map(|_| TemplateInfo::default()),
                specialization: args.map(|a| types::template_args(&a, site)),
                left_brace,
                is_final,
                ..ClassData::default()
            })
        });
        if let Some(header) = header {
            self.template_params(&decl, header);
        }
        self.complete_member_forward(&decl, &qualifier, container);
        self.project.register(&decl);

        if let Some(data) = decl.class_data() {
            let default_access = Visibility::default_for(kind);
            let mut bases = data.bases.write();
            for base in spec.bases() {
                let Some(name) = base.name() else {
                    self.missing_name("base specifier", base.syntax());
                    continue;
                };
                let site = self.site(base.syntax().text_range().start(), decl.uid());
                let Some(mut ty) = types::name_type(&name, site) else {
                    continue;
                };
                ty.pack_expansion = base.is_pack();
                bases.push(Inheritance {
                    base: ty,
                    visibility: base.access().map_or(default_access, access_of),
                    is_virtual: base.is_virtual(),
                });
            }
        }

        self.members(&decl, spec.members());
        Some(decl)
    }

    fn members(&mut self, class: &Declaration, items: Vec<Item>) {
        let mut access = Visibility::default_for(class.kind());
        for item in items {
            if let Item::Access(spec) = &item {
                access = spec.access().map_or(access, access_of);
                continue;
            }
            let container = Container::Class {
                class: class.uid(),
                access,
            };
            self.item(&item, container, None);
        }
    }

    /// Link a definition to the member forward declaration it completes,
    /// or re-parent an out-of-line definition under its qualifier.
    fn complete_member_forward(&self, decl: &Arc<Declaration>, qualifier: &[Name], container: Container) {
        let class = Renderer::enclosing_class(container);
        if qualifier.is_empty() && class.is_none() {
            return;
        }
        if forward::link_member_forward(self.project, decl, qualifier, class).is_some() || qualifier.is_empty() {
            return;
        }
        if let Some(scope) = self.qualifier_scope(qualifier, container, decl.range()) {
            self.project.set_scope(decl, Some(scope));
        }
    }

    // ========================================================================
    // ENUMS
    // ========================================================================

    pub(super) fn enum_spec(
        &mut self,
        spec: &EnumSpec,
        container: Container,
    ) -> Option<Arc<Declaration>> {
        let name = spec.name().unwrap_or_default();
        let range = construct_range(spec.syntax(), None);
        let scope = self.scope_of(container);
        let underlying = spec
            .underlying()
            .map(|t| types::type_or_text(&t, self.site(t.syntax().text_range().start(), scope)));
        let shape = Shape {
            kind: DeclKind::Enum,
            name: &name,
            range,
            scope,
        };
        let is_scoped = spec.is_scoped();
        let decl = self.declare(container, shape, Listing::Scope, |_| {
            DeclData::Enum(EnumData {
                is_scoped,
                underlying,
                ..EnumData::default()
            })
        });

        if let Some(data) = decl.enum_data() {
            for enumerator in spec.enumerators() {
                let Some(name) = enumerator.name() else {
                    self.missing_name("enumerator", enumerator.syntax());
                    continue;
                };
                let shape = Shape {
                    kind: DeclKind::Enumerator,
                    name: &name,
                    range: enumerator.syntax().text_range(),
                    scope: decl.uid(),
                };
                let value = enumerator.value().map(|v| v.text());
                let item = self.detached(shape, |_| {
                    DeclData::Enumerator(EnumeratorData { value })
                });
                data.enumerators.insert(item.entry());
            }
        }
        self.complete_member_forward(&decl, &[], container);
        self.project.register(&decl);
        Some(decl)
    }

    // ========================================================================
    // FORWARD DECLARATIONS, FRIENDS
    // ========================================================================

    pub(super) fn class_forward(&mut self, fwd: &ClassForward, container: Container, header: Option<&Header>) {
        let (Some(key), Some(name)) = (fwd.class_key().and_then(types::class_key), fwd.name()) else {
            self.missing_name("forward declaration", fwd.syntax());
            return;
        };
        let path = path_of(&name);
        let Some(last) = path.last().cloned() else {
            self.missing_name("forward declaration", fwd.syntax());
            return;
        };
        let shape = Shape {
            kind: DeclKind::ClassForwardDeclaration,
            name: &last,
            range: construct_range(fwd.syntax(), header.map(|h| h.start)),
            scope: self.scope_of(container),
        };
        let containing_class = Renderer::enclosing_class(container);
        let decl = self.declare(container, shape, Listing::Scope, |_| {
            DeclData::Forward(ForwardData {
                template: header.map(|_| TemplateInfo::default()),
                containing_class,
                ..ForwardData::new(path, key)
            })
        });
        if let Some(header) = header {
            self.template_params(&decl, header);
        }
        self.project.register(&decl);
    }

    pub(super) fn enum_forward(&mut self, fwd: &EnumForward, container: Container) {
        let Some(name) = fwd.name() else {
            self.missing_name("enum forward declaration", fwd.syntax());
            return;
        };
        let shape = Shape {
            kind: DeclKind::EnumForwardDeclaration,
            name: &name,
            range: fwd.syntax().text_range(),
            scope: self.scope_of(container),
        };
        let containing_class = Renderer::enclosing_class(container);
        let path = QualifiedName::new(vec![Name::new(&name)]);
        let decl = self.declare(container, shape, Listing::Scope, |_| {
            DeclData::Forward(ForwardData {
                containing_class,
                ..ForwardData::new(path, ClassKey::Enum)
            })
        });
        self.project.register(&decl);
    }

    /// `friend class X;` or `friend void f();`. A befriended function is
    /// owned by the friend declaration and scoped to the class's scope.
    pub(super) fn friend(&mut self, friend: &FriendDecl, container: Container) {
        let Some(class) = Renderer::enclosing_class(container).and_then(|uid| self.declaration(uid)) else {
            self.unsupported("friend declaration outside a class", friend.syntax());
            return;
        };
        let range = construct_range(friend.syntax(), None);

        if let (Some(key), Some(name)) = (friend.class_key().and_then(types::class_key), friend.name()) {
            let path = path_of(&name);
            let last = path.last().cloned().unwrap_or_default();
            let shape = Shape {
                kind: DeclKind::Friend,
                name: &last,
                range,
                scope: class.uid(),
            };
            let decl = self.declare(container, shape, Listing::Scope, |_| {
                DeclData::Friend(FriendData {
                    forward: Some(ForwardData::new(path, key)),
                    function: None,
                })
            });
            self.project.register(&decl);
            return;
        }

        let Some(declarator) = friend.declarator() else {
            self.missing_declarator("friend declaration", friend.syntax());
            return;
        };
        let function_scope = class.scope().unwrap_or_else(|| self.project.global_namespace());
        let Some(function) = self.function(
            friend.specifiers().as_ref(),
            &declarator,
            friend.body(),
            container,
            None,
            Site {
                range,
                scope: function_scope,
                listing: Listing::Detached,
            },
        ) else {
            return;
        };
        let shape = Shape {
            kind: DeclKind::Friend,
            name: function.name(),
            range,
            scope: class.uid(),
        };
        let function_uid = function.uid();
        self.declare(container, shape, Listing::Scope, |_| {
            DeclData::Friend(FriendData {
                forward: None,
                function: Some(function_uid),
            })
        });
    }

    // ========================================================================
    // TEMPLATE PARAMETERS
    // ========================================================================

    /// Render `header`'s parameters into `decl`'s template info. The
    /// templated declaration is their scope.
    pub(super) fn template_params(&mut self, decl: &Declaration, header: &Header) {
        let Some(info) = decl.template() else {
            return;
        };
        for (index, param) in header.params.iter().enumerate() {
            let name = param.name().unwrap_or_default();
            let site = self.site(param.syntax().text_range().start(), decl.uid());
            let param_kind = match param.kind() {
                TemplateParamKind::Type => TemplateParameterKind::Type,
                TemplateParamKind::Template => TemplateParameterKind::Template,
                TemplateParamKind::NonType => {
                    let base = param
                        .specifiers()
                        .and_then(|s| types::base_type(&s, None, site))
                        .unwrap_or_else(|| Type::builtin("int"));
                    let ty = match param.declarator() {
                        Some(d) => types::apply_declarator(base, &d, DeclaratorContext::Variable, site),
                        None => base,
                    };
                    TemplateParameterKind::NonType(ty)
                }
            };
            let default = match param.kind() {
                TemplateParamKind::Type => param
                    .default_type()
                    .and_then(|t| types::type_from_type_id(&t, site))
                    .map(SpecializationParam::Type),
                TemplateParamKind::Template => param
                    .default_template()
                    .and_then(|q| types::name_type(&q, site))
                    .map(SpecializationParam::Type),
                TemplateParamKind::NonType => param.default_expr().map(|e| SpecializationParam::Expression(e.text())),
            };
            let shape = Shape {
                kind: DeclKind::TemplateParameter,
                name: &name,
                range: param.syntax().text_range(),
                scope: decl.uid(),
            };
            let is_variadic = param.is_variadic();
            let param_decl = self.detached(shape, |_| {
                DeclData::TemplateParameter(TemplateParameterData {
                    param_kind,
                    is_variadic,
                    default,
                    index: index as u32,
                })
            });
            info.params.insert(param_decl.entry());
        }
    }
}

fn access_of(kind: SyntaxKind) -> Visibility {
    match kind {
        SyntaxKind::PUBLIC_KW => Visibility::Public,
        SyntaxKind::PROTECTED_KW => Visibility::Protected,
        _ => Visibility::Private,
    }
}
