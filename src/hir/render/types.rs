//! Building [`Type`]s from specifiers and declarators.

use crate::base::{FileId, Name, TextSize};
use crate::parser::{
    self, AstNode, DeclSpecifiers, Declarator, PtrOp, PtrOpKind, SyntaxKind, TemplateArgs, TypeId,
};

use crate::hir::ids::{ClassKey, Uid};
use crate::hir::types::{ReferenceKind, SpecializationParam, Type};

/// Where a type is written; names in it resolve from `scope`.
#[derive(Debug, Clone, Copy)]
pub(super) struct TypeSite {
    pub file: FileId,
    pub offset: TextSize,
    pub scope: Uid,
}

impl TypeSite {
    pub fn new(file: FileId, offset: TextSize, scope: Uid) -> Self {
        Self {
            file,
            offset,
            scope,
        }
    }

    fn apply(&self, ty: Type) -> Type {
        ty.at(Some(self.file), self.offset, Some(self.scope))
    }
}

/// How a declarator is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum DeclaratorContext {
    Variable,
    /// Function declarators decay to function pointers.
    Parameter,
    /// `typedef int F(int);` names a function type.
    Typedef,
}

/// The type named by the specifiers alone. `declared` is the classifier
/// defined inside them (`struct { } x;`), if any.
pub(super) fn base_type(
    specifiers: &DeclSpecifiers,
    declared: Option<(Uid, Name)>,
    site: TypeSite,
) -> Option<Type> {
    let mut ty = match declared {
        Some((uid, name)) => Type::declared(uid, name),
        None => {
            let type_ref = specifiers.type_ref()?;
            if let Some(decltype) = type_ref.decltype_spec() {
                Type::decltype(decltype.expr().map(|e| e.text()).unwrap_or_default())
            } else if let Some(builtin) = type_ref.builtin() {
                Type::builtin(builtin)
            } else {
                let mut named = name_type(&type_ref.name()?, site)?;
                named.elaborated = type_ref.elaborated_key().and_then(class_key);
                named
            }
        }
    };
    if specifiers.is_const() {
        ty.const_mask |= 1;
    }
    if specifiers.is_volatile() {
        ty.volatile_mask |= 1;
    }
    Some(site.apply(ty))
}

/// `A::B<int>::C` as nested layers, template arguments on each layer.
pub(super) fn name_type(name: &parser::QualifiedName, site: TypeSite) -> Option<Type> {
    let mut current: Option<Type> = None;
    for segment in name.segments() {
        let mut layer = Type::named(segment.name()?);
        if let Some(args) = segment.template_args() {
            layer.instantiation = Some(template_args(&args, site));
        }
        match current.take() {
            Some(outer) => layer.qualifier = Some(Box::new(outer)),
            None => layer.is_global = name.is_global(),
        }
        current = Some(layer);
    }
    current.map(|ty| site.apply(ty))
}

pub(super) fn template_args(args: &TemplateArgs, site: TypeSite) -> Vec<SpecializationParam> {
    args.args()
        .iter()
        .filter_map(|arg| {
            if let Some(type_id) = arg.type_id() {
                let mut ty = type_from_type_id(&type_id, site)?;
                ty.pack_expansion = arg.is_pack();
                Some(SpecializationParam::Type(ty))
            } else {
                let text = arg.expr()?.text();
                Some(SpecializationParam::Expression(if arg.is_pack() {
                    format!("{text}...")
                } else {
                    text
                }))
            }
        })
        .collect()
}

pub(super) fn type_from_type_id(type_id: &TypeId, site: TypeSite) -> Option<Type> {
    let base = base_type(&type_id.specifiers()?, None, site)?;
    Some(match type_id.declarator() {
        Some(declarator) => apply_declarator(base, &declarator, DeclaratorContext::Variable, site),
        None => base,
    })
}

/// Like [`type_from_type_id`], keeping unreadable text as an opaque
/// builtin so the declaration still renders.
pub(super) fn type_or_text(type_id: &TypeId, site: TypeSite) -> Type {
    type_from_type_id(type_id, site)
        .unwrap_or_else(|| site.apply(Type::builtin(parser::compact_text(type_id.syntax()))))
}

/// Type of the entity `declarator` declares, given the specifiers' type.
pub(super) fn apply_declarator(
    base: Type,
    declarator: &Declarator,
    context: DeclaratorContext,
    site: TypeSite,
) -> Type {
    let mut ty = apply_ptr_ops(base, &declarator.ptr_ops());

    let decays = context == DeclaratorContext::Parameter && declarator.is_function();
    let function_type = context == DeclaratorContext::Typedef && declarator.is_function();
    if declarator.is_function_pointer() || decays || function_type {
        ty = function_pointer(ty, declarator, function_type, site);
    } else {
        ty.array_depth = ty
            .array_depth
            .saturating_add(declarator.array_suffixes().len() as u8);
    }
    ty.pack_expansion = declarator.is_pack();
    site.apply(ty)
}

/// Return type of a function declarator: the specifiers' type with the
/// declarator's own pointer operators, or the trailing return type.
pub(super) fn return_type(base: Option<Type>, declarator: &Declarator, site: TypeSite) -> Option<Type> {
    if let Some(trailing) = declarator.trailing_return().and_then(|t| t.type_id()) {
        return type_from_type_id(&trailing, site);
    }
    Some(site.apply(apply_ptr_ops(base?, &declarator.ptr_ops())))
}

fn apply_ptr_ops(mut ty: Type, ops: &[PtrOp]) -> Type {
    for op in ops {
        match op.kind() {
            PtrOpKind::Pointer {
                is_const,
                is_volatile,
            } => {
                ty = ty.with_pointer();
                if is_const {
                    ty.const_mask |= 1;
                }
                if is_volatile {
                    ty.volatile_mask |= 1;
                }
            }
            PtrOpKind::LValueRef => ty = ty.with_reference(ReferenceKind::LValue),
            PtrOpKind::RValueRef => ty = ty.with_reference(ReferenceKind::RValue),
        }
    }
    ty
}

fn function_pointer(ret: Type, declarator: &Declarator, function_type: bool, site: TypeSite) -> Type {
    let params = declarator.params().map(|p| p.params()).unwrap_or_default();
    let variadic = params.iter().any(|p| p.is_ellipsis());
    let param_types: Vec<Type> = params
        .iter()
        .filter(|p| !p.is_ellipsis())
        .filter_map(|p| {
            let base = base_type(&p.specifiers()?, None, site)?;
            Some(match p.declarator() {
                Some(d) => apply_declarator(base, &d, DeclaratorContext::Parameter, site),
                None => base,
            })
        })
        .collect();

    let mut ty = Type::function_pointer(ret, param_types, variadic);
    match declarator.nested() {
        Some(nested) => {
            ty.pointer_depth = 0;
            ty = apply_ptr_ops(ty, &nested.ptr_ops());
            ty.array_depth = nested.array_suffixes().len() as u8;
        }
        None if function_type => ty.pointer_depth = 0,
        None => {}
    }
    ty
}

pub(super) fn class_key(kind: SyntaxKind) -> Option<ClassKey> {
    match kind {
        SyntaxKind::CLASS_KW => Some(ClassKey::Class),
        SyntaxKind::STRUCT_KW => Some(ClassKey::Struct),
        SyntaxKind::UNION_KW => Some(ClassKey::Union),
        SyntaxKind::ENUM_KW => Some(ClassKey::Enum),
        _ => None,
    }
}

/// Parse `text` as a type id, for hosts that ask about types by text.
/// The type counts as written at the end of `file`, so every file-level
/// using directive there applies to it.
pub fn parse_type(text: &str, file: FileId, scope: Uid) -> Option<Type> {
    let parse = parser::parse_type_id(text);
    let root = parser::SourceFile::cast(parse.syntax())?;
    type_from_type_id(&root.type_id()?, TypeSite::new(file, TextSize::new(u32::MAX), scope))
}
