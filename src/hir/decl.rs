//! Declarations and their per-object lists.
//!
//! A [`Declaration`] has a fixed kind, name and source range, a scope held
//! by UID, a validity flag and kind-specific [`DeclData`]. Child lists are
//! [`OffsetList`]s: always sorted by (file, start offset), guarded by their
//! own lock, and taken as a whole when the owner is disposed.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::base::{FileId, Name, QualifiedName, TextRange, TextSize};

use super::ids::{ClassKey, DeclKind, PlaceholderOrigin, Uid, Visibility};
use super::project::Project;
use super::types::{SpecializationParam, Type};

/// Bound on scope chain walks; a longer chain means a scope cycle.
pub(crate) const MAX_SCOPE_DEPTH: usize = 256;

// ============================================================================
// OFFSET LIST
// ============================================================================

/// One entry of an [`OffsetList`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberEntry {
    pub uid: Uid,
    pub kind: DeclKind,
    pub file: Option<FileId>,
    pub start: TextSize,
    pub name: Name,
}

/// Child UIDs ordered by source position, never by insertion order.
#[derive(Debug, Default)]
pub struct OffsetList {
    entries: RwLock<Vec<MemberEntry>>,
}

impl OffsetList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(mut entries: Vec<MemberEntry>) -> Self {
        entries.sort_by_key(|e| (e.file, e.start));
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Insert keeping (file, start) order; equal positions keep insertion order.
    pub fn insert(&self, entry: MemberEntry) {
        let mut entries = self.entries.write();
        if entries.iter().any(|e| e.uid == entry.uid) {
            return;
        }
        let key = (entry.file, entry.start);
        let at = entries.partition_point(|e| (e.file, e.start) <= key);
        entries.insert(at, entry);
    }

    pub fn remove(&self, uid: Uid) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| e.uid != uid);
        entries.len() != before
    }

    /// Empty the list, returning what it held.
    pub fn take(&self) -> Vec<MemberEntry> {
        std::mem::take(&mut *self.entries.write())
    }

    pub fn snapshot(&self) -> Vec<MemberEntry> {
        self.entries.read().clone()
    }

    pub fn uids(&self) -> Vec<Uid> {
        self.entries.read().iter().map(|e| e.uid).collect()
    }

    pub fn named(&self, name: &str) -> Vec<MemberEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.name == name)
            .cloned()
            .collect()
    }

    pub fn contains(&self, uid: Uid) -> bool {
        self.entries.read().iter().any(|e| e.uid == uid)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

// ============================================================================
// KIND-SPECIFIC DATA
// ============================================================================

/// Template parameters of a templated declaration.
///
/// The templated declaration is the scope of its parameters.
#[derive(Debug, Default)]
pub struct TemplateInfo {
    pub params: OffsetList,
}

/// A base class edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inheritance {
    pub base: Type,
    pub visibility: Visibility,
    pub is_virtual: bool,
}

#[derive(Debug, Default)]
pub struct ClassData {
    pub members: OffsetList,
    pub friends: OffsetList,
    /// Typedefs and variables declared by the statement that defines this
    /// class (`typedef struct { } S;`, `struct { } x;`).
    pub enclosing: OffsetList,
    pub bases: RwLock<Vec<Inheritance>>,
    pub template: Option<TemplateInfo>,
    /// Arguments of an explicit or partial specialization.
    pub specialization: Option<Vec<SpecializationParam>>,
    pub placeholder: Option<PlaceholderOrigin>,
    pub left_brace: Option<TextSize>,
    pub is_final: bool,
}

#[derive(Debug, Default)]
pub struct EnumData {
    pub enumerators: OffsetList,
    pub enclosing: OffsetList,
    pub is_scoped: bool,
    pub underlying: Option<Type>,
    pub placeholder: Option<PlaceholderOrigin>,
}

#[derive(Debug, Default)]
pub struct EnumeratorData {
    pub value: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionFlags {
    pub is_const: bool,
    pub is_static: bool,
    pub is_virtual: bool,
    pub is_pure: bool,
    pub is_inline: bool,
    /// C-style trailing `...`
    pub is_variadic: bool,
    pub is_defaulted: bool,
    pub is_deleted: bool,
}

#[derive(Debug, Default)]
pub struct FunctionData {
    /// Absent for constructors and destructors.
    pub return_type: Option<Type>,
    pub params: OffsetList,
    pub template: Option<TemplateInfo>,
    pub specialization: Option<Vec<SpecializationParam>>,
    /// `A::B` in an out-of-line `void A::B::f() {}`.
    pub qualifier: Option<QualifiedName>,
    pub flags: FunctionFlags,
    /// For a definition, the declaration it implements.
    pub declaration: RwLock<Option<Uid>>,
    /// Declarations made in the function body.
    pub body: OffsetList,
    pub has_body: bool,
}

/// `typedef` and `using X = ...`
#[derive(Debug)]
pub struct AliasData {
    pub ty: Type,
    pub template: Option<TemplateInfo>,
}

/// A project-wide namespace, merged over all of its definitions.
#[derive(Debug, Default)]
pub struct NamespaceData {
    pub declarations: OffsetList,
    pub definitions: OffsetList,
    /// Inline or anonymous: its names are visible in the enclosing namespace.
    pub transparent: AtomicBool,
}

/// One `namespace N { }` block, or a namespace alias.
#[derive(Debug, Default)]
pub struct NamespaceDefinitionData {
    pub namespace: Option<Uid>,
    pub declarations: OffsetList,
    /// `namespace fs = std::filesystem;`
    pub alias: Option<QualifiedName>,
}

#[derive(Debug, Default)]
pub struct UsingData {
    pub path: QualifiedName,
}

/// A forward declaration, or the class part of a friend declaration.
#[derive(Debug)]
pub struct ForwardData {
    pub path: QualifiedName,
    pub key: ClassKey,
    pub template: Option<TemplateInfo>,
    /// Class whose body declares this forward declaration.
    pub containing_class: Option<Uid>,
    /// Last definition this declaration was bound to.
    pub target: RwLock<Option<Uid>>,
    /// Placeholder owned by this declaration.
    pub placeholder: RwLock<Option<Uid>>,
}

impl ForwardData {
    pub fn new(path: QualifiedName, key: ClassKey) -> Self {
        Self {
            path,
            key,
            template: None,
            containing_class: None,
            target: RwLock::new(None),
            placeholder: RwLock::new(None),
        }
    }
}

#[derive(Debug, Default)]
pub struct FriendData {
    /// `friend class X;`
    pub forward: Option<ForwardData>,
    /// `friend void f();`, owned by the friend declaration.
    pub function: Option<Uid>,
}

#[derive(Debug)]
pub struct VariableData {
    pub ty: Type,
    pub is_static: bool,
    pub is_extern: bool,
    pub initializer: Option<String>,
}

/// What a template parameter stands for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TemplateParameterKind {
    Type,
    NonType(Type),
    Template,
}

#[derive(Debug)]
pub struct TemplateParameterData {
    pub param_kind: TemplateParameterKind,
    pub is_variadic: bool,
    pub default: Option<SpecializationParam>,
    pub index: u32,
}

/// Kind-specific payload of a declaration.
#[derive(Debug)]
pub enum DeclData {
    /// Class, Struct, Union
    Class(ClassData),
    Enum(EnumData),
    Enumerator(EnumeratorData),
    /// Function, FunctionDefinition, Method, Constructor, Destructor
    Function(FunctionData),
    /// Typedef, TypeAlias
    Alias(AliasData),
    Namespace(NamespaceData),
    NamespaceDefinition(NamespaceDefinitionData),
    /// UsingDeclaration, UsingDirective
    Using(UsingData),
    Friend(FriendData),
    /// ClassForwardDeclaration, EnumForwardDeclaration
    Forward(ForwardData),
    /// Variable, Field, Parameter
    Variable(VariableData),
    TemplateParameter(TemplateParameterData),
}

// ============================================================================
// DECLARATION
// ============================================================================

#[derive(Debug)]
pub struct Declaration {
    uid: Uid,
    kind: DeclKind,
    file: Option<FileId>,
    range: TextRange,
    name: Name,
    visibility: Visibility,
    scope: RwLock<Option<Uid>>,
    /// Declaration whose list physically holds this one when that is not
    /// the scope (namespace block contents, out-of-line definitions).
    owner: Option<Uid>,
    valid: AtomicBool,
    data: DeclData,
}

impl Declaration {
    pub fn new(uid: Uid, kind: DeclKind, name: impl Into<Name>, data: DeclData) -> Self {
        Self {
            uid,
            kind,
            file: None,
            range: TextRange::default(),
            name: name.into(),
            visibility: Visibility::Public,
            scope: RwLock::new(None),
            owner: None,
            valid: AtomicBool::new(true),
            data,
        }
    }

    pub fn in_file(mut self, file: Option<FileId>, range: TextRange) -> Self {
        self.file = file;
        self.range = range;
        self
    }

    pub fn with_scope(self, scope: Option<Uid>) -> Self {
        *self.scope.write() = scope;
        self
    }

    pub fn with_owner(mut self, owner: Option<Uid>) -> Self {
        self.owner = owner;
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub(crate) fn with_validity(self, valid: bool) -> Self {
        self.valid.store(valid, Ordering::Release);
        self
    }

    // ------------------------------------------------------------------------
    // Common attributes
    // ------------------------------------------------------------------------

    pub fn uid(&self) -> Uid {
        self.uid
    }

    pub fn kind(&self) -> DeclKind {
        self.kind
    }

    pub fn file(&self) -> Option<FileId> {
        self.file
    }

    pub fn range(&self) -> TextRange {
        self.range
    }

    pub fn start(&self) -> TextSize {
        self.range.start()
    }

    pub fn end(&self) -> TextSize {
        self.range.end()
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn scope(&self) -> Option<Uid> {
        *self.scope.read()
    }

    /// Re-parent this declaration. Use [`Project::set_scope`], which
    /// checks that no scope becomes its own ancestor.
    pub(crate) fn replace_scope(&self, scope: Option<Uid>) {
        *self.scope.write() = scope;
    }

    pub fn owner(&self) -> Option<Uid> {
        self.owner
    }

    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    /// Clear the validity flag; it never comes back.
    pub(crate) fn invalidate(&self) -> bool {
        self.valid.swap(false, Ordering::AcqRel)
    }

    pub fn data(&self) -> &DeclData {
        &self.data
    }

    pub fn entry(&self) -> MemberEntry {
        MemberEntry {
            uid: self.uid,
            kind: self.kind,
            file: self.file,
            start: self.range.start(),
            name: self.name.clone(),
        }
    }

    /// `N::S::T`, derived from the scope chain on every call.
    pub fn qualified_name(&self, project: &Project) -> String {
        let mut segments = vec![self.name.clone()];
        let mut current = self.scope();
        let mut depth = 0;
        while let Some(uid) = current {
            depth += 1;
            debug_assert!(depth <= MAX_SCOPE_DEPTH, "scope cycle above {}", self.uid);
            if depth > MAX_SCOPE_DEPTH {
                break;
            }
            let Some(scope) = project.declaration(uid) else {
                break;
            };
            segments.push(scope.name.clone());
            current = scope.scope();
        }
        segments.reverse();
        QualifiedName::join(&segments)
    }

    // ------------------------------------------------------------------------
    // Kind-specific views
    // ------------------------------------------------------------------------

    pub fn class_data(&self) -> Option<&ClassData> {
        match &self.data {
            DeclData::Class(data) => Some(data),
            _ => None,
        }
    }

    pub fn enum_data(&self) -> Option<&EnumData> {
        match &self.data {
            DeclData::Enum(data) => Some(data),
            _ => None,
        }
    }

    pub fn function_data(&self) -> Option<&FunctionData> {
        match &self.data {
            DeclData::Function(data) => Some(data),
            _ => None,
        }
    }

    pub fn namespace_data(&self) -> Option<&NamespaceData> {
        match &self.data {
            DeclData::Namespace(data) => Some(data),
            _ => None,
        }
    }

    pub fn namespace_definition_data(&self) -> Option<&NamespaceDefinitionData> {
        match &self.data {
            DeclData::NamespaceDefinition(data) => Some(data),
            _ => None,
        }
    }

    /// Forward data of a forward declaration or a `friend class`.
    pub fn forward_data(&self) -> Option<&ForwardData> {
        match &self.data {
            DeclData::Forward(data) => Some(data),
            DeclData::Friend(FriendData {
                forward: Some(data),
                ..
            }) => Some(data),
            _ => None,
        }
    }

    pub fn using_path(&self) -> Option<&QualifiedName> {
        match &self.data {
            DeclData::Using(data) => Some(&data.path),
            DeclData::NamespaceDefinition(NamespaceDefinitionData {
                alias: Some(path), ..
            }) => Some(path),
            _ => None,
        }
    }

    pub fn alias_type(&self) -> Option<&Type> {
        match &self.data {
            DeclData::Alias(data) => Some(&data.ty),
            _ => None,
        }
    }

    pub fn variable_data(&self) -> Option<&VariableData> {
        match &self.data {
            DeclData::Variable(data) => Some(data),
            _ => None,
        }
    }

    pub fn template_parameter_data(&self) -> Option<&TemplateParameterData> {
        match &self.data {
            DeclData::TemplateParameter(data) => Some(data),
            _ => None,
        }
    }

    /// The type a declaration introduces or has: a variable's type, an
    /// alias target or a function's return type.
    pub fn declared_type(&self) -> Option<&Type> {
        match &self.data {
            DeclData::Variable(data) => Some(&data.ty),
            DeclData::Alias(data) => Some(&data.ty),
            DeclData::Function(data) => data.return_type.as_ref(),
            DeclData::TemplateParameter(TemplateParameterData {
                param_kind: TemplateParameterKind::NonType(ty),
                ..
            }) => Some(ty),
            _ => None,
        }
    }

    pub fn template(&self) -> Option<&TemplateInfo> {
        match &self.data {
            DeclData::Class(data) => data.template.as_ref(),
            DeclData::Function(data) => data.template.as_ref(),
            DeclData::Alias(data) => data.template.as_ref(),
            DeclData::Forward(data) => data.template.as_ref(),
            _ => None,
        }
    }

    pub fn template_params(&self) -> Option<Vec<Uid>> {
        self.template().map(|t| t.params.uids())
    }

    pub fn specialization(&self) -> Option<&[SpecializationParam]> {
        match &self.data {
            DeclData::Class(data) => data.specialization.as_deref(),
            DeclData::Function(data) => data.specialization.as_deref(),
            _ => None,
        }
    }

    /// A primary template (not a specialization of one).
    pub fn is_template(&self) -> bool {
        self.template().is_some() && self.specialization().is_none()
    }

    pub fn is_specialization(&self) -> bool {
        self.specialization().is_some()
    }

    pub fn placeholder_origin(&self) -> Option<PlaceholderOrigin> {
        match &self.data {
            DeclData::Class(data) => data.placeholder,
            DeclData::Enum(data) => data.placeholder,
            _ => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder_origin().is_some()
    }

    /// Unscoped enums leak their enumerators into the enclosing scope.
    pub fn is_unscoped_enum(&self) -> bool {
        self.enum_data().is_some_and(|e| !e.is_scoped)
    }

    pub fn bases(&self) -> Vec<Inheritance> {
        self.class_data()
            .map(|c| c.bases.read().clone())
            .unwrap_or_default()
    }

    /// Child declarations by lookup role: members of classes, enumerators
    /// of enums, parameters and locals of functions, contents of
    /// namespaces and namespace blocks.
    pub fn children(&self) -> Vec<MemberEntry> {
        match &self.data {
            DeclData::Class(data) => data.members.snapshot(),
            DeclData::Enum(data) => data.enumerators.snapshot(),
            DeclData::Function(data) => {
                let mut out = data.params.snapshot();
                out.extend(data.body.snapshot());
                out
            }
            DeclData::Namespace(data) => data.declarations.snapshot(),
            DeclData::NamespaceDefinition(data) => data.declarations.snapshot(),
            _ => Vec::new(),
        }
    }

    /// Every list this declaration keeps.
    pub fn lists(&self) -> Vec<&OffsetList> {
        let template = self.template().map(|t| &t.params);
        let mut lists: Vec<&OffsetList> = match &self.data {
            DeclData::Class(data) => vec![&data.members, &data.friends, &data.enclosing],
            DeclData::Enum(data) => vec![&data.enumerators, &data.enclosing],
            DeclData::Function(data) => vec![&data.params, &data.body],
            DeclData::Namespace(data) => vec![&data.declarations, &data.definitions],
            DeclData::NamespaceDefinition(data) => vec![&data.declarations],
            _ => Vec::new(),
        };
        lists.extend(template);
        lists
    }

    /// Lists whose entries this declaration owns and disposes with itself.
    ///
    /// Namespace lists are excluded: a merged namespace only indexes what
    /// its definitions own.
    pub(crate) fn owned_lists(&self) -> Vec<&OffsetList> {
        match &self.data {
            DeclData::Class(data) => {
                let mut lists = vec![&data.members, &data.friends];
                lists.extend(data.template.as_ref().map(|t| &t.params));
                lists
            }
            DeclData::Enum(data) => vec![&data.enumerators],
            DeclData::Function(data) => {
                let mut lists = vec![&data.params, &data.body];
                lists.extend(data.template.as_ref().map(|t| &t.params));
                lists
            }
            DeclData::Alias(data) => data.template.as_ref().map(|t| vec![&t.params]).unwrap_or_default(),
            DeclData::Forward(data) => data.template.as_ref().map(|t| vec![&t.params]).unwrap_or_default(),
            DeclData::NamespaceDefinition(data) => vec![&data.declarations],
            _ => Vec::new(),
        }
    }

    /// UIDs of declarations owned outside any list.
    pub(crate) fn owned_extras(&self) -> Vec<Uid> {
        let mut out = Vec::new();
        if let Some(forward) = self.forward_data() {
            out.extend(*forward.placeholder.read());
        }
        if let DeclData::Friend(FriendData {
            function: Some(uid), ..
        }) = &self.data
        {
            out.push(*uid);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn entry(slot: u64, file: u32, start: u32, name: &str) -> MemberEntry {
        MemberEntry {
            uid: Uid::new(0, slot),
            kind: DeclKind::Field,
            file: Some(FileId::new(file)),
            start: TextSize::new(start),
            name: Name::new(name),
        }
    }

    #[test]
    fn test_offset_list_orders_by_position() {
        let list = OffsetList::new();
        list.insert(entry(1, 0, 30, "c"));
        list.insert(entry(2, 0, 10, "a"));
        list.insert(entry(3, 0, 20, "b"));
        let names: Vec<_> = list.snapshot().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_offset_list_orders_by_file_first() {
        let list = OffsetList::new();
        list.insert(entry(1, 1, 0, "late_file"));
        list.insert(entry(2, 0, 99, "early_file"));
        assert_eq!(list.uids(), vec![Uid::new(0, 2), Uid::new(0, 1)]);
    }

    #[test]
    fn test_offset_list_ignores_duplicates_and_takes() {
        let list = OffsetList::new();
        list.insert(entry(1, 0, 5, "x"));
        list.insert(entry(1, 0, 5, "x"));
        assert_eq!(list.len(), 1);
        assert!(list.remove(Uid::new(0, 1)));
        assert!(!list.remove(Uid::new(0, 1)));
        list.insert(entry(2, 0, 5, "y"));
        assert_eq!(list.take().len(), 1);
        assert!(list.is_empty());
    }

    #[rstest]
    #[case(DeclKind::Class, Visibility::Private)]
    #[case(DeclKind::Struct, Visibility::Public)]
    fn test_declaration_builder(#[case] kind: DeclKind, #[case] visibility: Visibility) {
        let decl = Declaration::new(
            Uid::new(0, 7),
            kind,
            "S",
            DeclData::Class(ClassData::default()),
        )
        .in_file(
            Some(FileId::new(0)),
            TextRange::new(TextSize::new(2), TextSize::new(9)),
        )
        .with_visibility(visibility);
        assert_eq!(decl.name(), "S");
        assert_eq!(decl.start(), TextSize::new(2));
        assert_eq!(decl.end(), TextSize::new(9));
        assert_eq!(decl.visibility(), visibility);
        assert!(decl.is_valid());
        assert!(decl.invalidate());
        assert!(!decl.is_valid());
        assert!(!decl.invalidate());
    }
}
