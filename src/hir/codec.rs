//! Self-describing records for the persistence backend.
//!
//! Every declaration kind maps to a plain-data [`DeclRecord`] (lists become
//! vectors, locks become values) and back. Blobs are postcard encodings of
//! [`EntityRecord`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::base::{FileId, Name, QualifiedName, TextRange, TextSize};

use super::decl::{
    AliasData, ClassData, DeclData, Declaration, EnumData, EnumeratorData, ForwardData,
    FriendData, FunctionData, FunctionFlags, Inheritance, MemberEntry, NamespaceData,
    NamespaceDefinitionData, OffsetList, TemplateInfo, TemplateParameterData,
    TemplateParameterKind, UsingData, VariableData,
};
use super::error::StoreError;
use super::ids::{ClassKey, DeclKind, PlaceholderOrigin, Uid, Visibility};
use super::store::{Entity, FileUnit};
use super::types::{SpecializationParam, Type};

// ============================================================================
// RECORDS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityRecord {
    Declaration(DeclRecord),
    File(FileRecord),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub uid: Uid,
    pub file: FileId,
    pub path: String,
    pub declarations: Vec<MemberEntry>,
    pub includes: Option<Vec<FileId>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclRecord {
    pub uid: Uid,
    pub kind: DeclKind,
    pub file: Option<FileId>,
    pub start: TextSize,
    pub end: TextSize,
    pub name: Name,
    pub visibility: Visibility,
    pub scope: Option<Uid>,
    pub owner: Option<Uid>,
    pub valid: bool,
    pub data: DataRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardRecord {
    pub path: QualifiedName,
    pub key: ClassKey,
    pub template: Option<Vec<MemberEntry>>,
    pub containing_class: Option<Uid>,
    pub target: Option<Uid>,
    pub placeholder: Option<Uid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataRecord {
    Class {
        members: Vec<MemberEntry>,
        friends: Vec<MemberEntry>,
        enclosing: Vec<MemberEntry>,
        bases: Vec<Inheritance>,
        template: Option<Vec<MemberEntry>>,
        specialization: Option<Vec<SpecializationParam>>,
        placeholder: Option<PlaceholderOrigin>,
        left_brace: Option<TextSize>,
        is_final: bool,
    },
    Enum {
        enumerators: Vec<MemberEntry>,
        enclosing: Vec<MemberEntry>,
        is_scoped: bool,
        underlying: Option<Type>,
        placeholder: Option<PlaceholderOrigin>,
    },
    Enumerator {
        value: Option<String>,
    },
    Function {
        return_type: Option<Type>,
        params: Vec<MemberEntry>,
        template: Option<Vec<MemberEntry>>,
        specialization: Option<Vec<SpecializationParam>>,
        qualifier: Option<QualifiedName>,
        flags: FunctionFlags,
        declaration: Option<Uid>,
        body: Vec<MemberEntry>,
        has_body: bool,
    },
    Alias {
        ty: Type,
        template: Option<Vec<MemberEntry>>,
    },
    Namespace {
        declarations: Vec<MemberEntry>,
        definitions: Vec<MemberEntry>,
        transparent: bool,
    },
    NamespaceDefinition {
        namespace: Option<Uid>,
        declarations: Vec<MemberEntry>,
        alias: Option<QualifiedName>,
    },
    Using {
        path: QualifiedName,
    },
    Friend {
        forward: Option<ForwardRecord>,
        function: Option<Uid>,
    },
    Forward(ForwardRecord),
    Variable {
        ty: Type,
        is_static: bool,
        is_extern: bool,
        initializer: Option<String>,
    },
    TemplateParameter {
        param_kind: TemplateParameterKind,
        is_variadic: bool,
        default: Option<SpecializationParam>,
        index: u32,
    },
}

// ============================================================================
// MODEL → RECORD
// ============================================================================

fn template_record(template: &Option<TemplateInfo>) -> Option<Vec<MemberEntry>> {
    template.as_ref().map(|t| t.params.snapshot())
}

fn forward_record(data: &ForwardData) -> ForwardRecord {
    ForwardRecord {
        path: data.path.clone(),
        key: data.key,
        template: template_record(&data.template),
        containing_class: data.containing_class,
        target: *data.target.read(),
        placeholder: *data.placeholder.read(),
    }
}

fn data_record(data: &DeclData) -> DataRecord {
    match data {
        DeclData::Class(c) => DataRecord::Class {
            members: c.members.snapshot(),
            friends: c.friends.snapshot(),
            enclosing: c.enclosing.snapshot(),
            bases: c.bases.read().clone(),
            template: template_record(&c.template),
            specialization: c.specialization.clone(),
            placeholder: c.placeholder,
            left_brace: c.left_brace,
            is_final: c.is_final,
        },
        DeclData::Enum(e) => DataRecord::Enum {
            enumerators: e.enumerators.snapshot(),
            enclosing: e.enclosing.snapshot(),
            is_scoped: e.is_scoped,
            underlying: e.underlying.clone(),
            placeholder: e.placeholder,
        },
        DeclData::Enumerator(e) => DataRecord::Enumerator {
            value: e.value.clone(),
        },
        DeclData::Function(f) => DataRecord::Function {
            return_type: f.return_type.clone(),
            params: f.params.snapshot(),
            template: template_record(&f.template),
            specialization: f.specialization.clone(),
            qualifier: f.qualifier.clone(),
            flags: f.flags,
            declaration: *f.declaration.read(),
            body: f.body.snapshot(),
            has_body: f.has_body,
        },
        DeclData::Alias(a) => DataRecord::Alias {
            ty: a.ty.clone(),
            template: template_record(&a.template),
        },
        DeclData::Namespace(n) => DataRecord::Namespace {
            declarations: n.declarations.snapshot(),
            definitions: n.definitions.snapshot(),
            transparent: n.transparent.load(Ordering::Acquire),
        },
        DeclData::NamespaceDefinition(n) => DataRecord::NamespaceDefinition {
            namespace: n.namespace,
            declarations: n.declarations.snapshot(),
            alias: n.alias.clone(),
        },
        DeclData::Using(u) => DataRecord::Using {
            path: u.path.clone(),
        },
        DeclData::Friend(f) => DataRecord::Friend {
            forward: f.forward.as_ref().map(forward_record),
            function: f.function,
        },
        DeclData::Forward(f) => DataRecord::Forward(forward_record(f)),
        DeclData::Variable(v) => DataRecord::Variable {
            ty: v.ty.clone(),
            is_static: v.is_static,
            is_extern: v.is_extern,
            initializer: v.initializer.clone(),
        },
        DeclData::TemplateParameter(t) => DataRecord::TemplateParameter {
            param_kind: t.param_kind.clone(),
            is_variadic: t.is_variadic,
            default: t.default.clone(),
            index: t.index,
        },
    }
}

impl From<&Declaration> for DeclRecord {
    fn from(decl: &Declaration) -> Self {
        Self {
            uid: decl.uid(),
            kind: decl.kind(),
            file: decl.file(),
            start: decl.start(),
            end: decl.end(),
            name: decl.name().clone(),
            visibility: decl.visibility(),
            scope: decl.scope(),
            owner: decl.owner(),
            valid: decl.is_valid(),
            data: data_record(decl.data()),
        }
    }
}

impl From<&FileUnit> for FileRecord {
    fn from(unit: &FileUnit) -> Self {
        Self {
            uid: unit.uid,
            file: unit.file,
            path: unit.path.clone(),
            declarations: unit.declarations.snapshot(),
            includes: unit.includes.read().clone(),
        }
    }
}

pub fn to_record(entity: &Entity) -> EntityRecord {
    match entity {
        Entity::Declaration(decl) => EntityRecord::Declaration(DeclRecord::from(decl.as_ref())),
        Entity::File(unit) => EntityRecord::File(FileRecord::from(unit.as_ref())),
    }
}

// ============================================================================
// RECORD → MODEL
// ============================================================================

fn template_info(entries: Option<Vec<MemberEntry>>) -> Option<TemplateInfo> {
    entries.map(|e| TemplateInfo {
        params: OffsetList::from_entries(e),
    })
}

fn forward_data(record: ForwardRecord) -> ForwardData {
    ForwardData {
        path: record.path,
        key: record.key,
        template: template_info(record.template),
        containing_class: record.containing_class,
        target: RwLock::new(record.target),
        placeholder: RwLock::new(record.placeholder),
    }
}

fn decl_data(record: DataRecord) -> DeclData {
    match record {
        DataRecord::Class {
            members,
            friends,
            enclosing,
            bases,
            template,
            specialization,
            placeholder,
            left_brace,
            is_final,
        } => DeclData::Class(ClassData {
            members: OffsetList::from_entries(members),
            friends: OffsetList::from_entries(friends),
            enclosing: OffsetList::from_entries(enclosing),
            bases: RwLock::new(bases),
            template: template_info(template),
            specialization,
            placeholder,
            left_brace,
            is_final,
        }),
        DataRecord::Enum {
            enumerators,
            enclosing,
            is_scoped,
            underlying,
            placeholder,
        } => DeclData::Enum(EnumData {
            enumerators: OffsetList::from_entries(enumerators),
            enclosing: OffsetList::from_entries(enclosing),
            is_scoped,
            underlying,
            placeholder,
        }),
        DataRecord::Enumerator { value } => DeclData::Enumerator(EnumeratorData { value }),
        DataRecord::Function {
            return_type,
            params,
            template,
            specialization,
            qualifier,
            flags,
            declaration,
            body,
            has_body,
        } => DeclData::Function(FunctionData {
            return_type,
            params: OffsetList::from_entries(params),
            template: template_info(template),
            specialization,
            qualifier,
            flags,
            declaration: RwLock::new(declaration),
            body: OffsetList::from_entries(body),
            has_body,
        }),
        DataRecord::Alias { ty, template } => DeclData::Alias(AliasData {
            ty,
            template: template_info(template),
        }),
        DataRecord::Namespace {
            declarations,
            definitions,
            transparent,
        } => DeclData::Namespace(NamespaceData {
            declarations: OffsetList::from_entries(declarations),
            definitions: OffsetList::from_entries(definitions),
            transparent: AtomicBool::new(transparent),
        }),
        DataRecord::NamespaceDefinition {
            namespace,
            declarations,
            alias,
        } => DeclData::NamespaceDefinition(NamespaceDefinitionData {
            namespace,
            declarations: OffsetList::from_entries(declarations),
            alias,
        }),
        DataRecord::Using { path } => DeclData::Using(UsingData { path }),
        DataRecord::Friend { forward, function } => DeclData::Friend(FriendData {
            forward: forward.map(forward_data),
            function,
        }),
        DataRecord::Forward(record) => DeclData::Forward(forward_data(record)),
        DataRecord::Variable {
            ty,
            is_static,
            is_extern,
            initializer,
        } => DeclData::Variable(VariableData {
            ty,
            is_static,
            is_extern,
            initializer,
        }),
        DataRecord::TemplateParameter {
            param_kind,
            is_variadic,
            default,
            index,
        } => DeclData::TemplateParameter(TemplateParameterData {
            param_kind,
            is_variadic,
            default,
            index,
        }),
    }
}

impl From<DeclRecord> for Declaration {
    fn from(record: DeclRecord) -> Self {
        Declaration::new(record.uid, record.kind, record.name, decl_data(record.data))
            .in_file(record.file, TextRange::new(record.start, record.end))
            .with_scope(record.scope)
            .with_owner(record.owner)
            .with_visibility(record.visibility)
            .with_validity(record.valid)
    }
}

impl From<FileRecord> for FileUnit {
    fn from(record: FileRecord) -> Self {
        FileUnit {
            file: record.file,
            path: record.path,
            uid: record.uid,
            declarations: OffsetList::from_entries(record.declarations),
            includes: RwLock::new(record.includes),
        }
    }
}

pub fn from_record(record: EntityRecord) -> Entity {
    match record {
        EntityRecord::Declaration(decl) => Entity::Declaration(Arc::new(decl.into())),
        EntityRecord::File(unit) => Entity::File(Arc::new(unit.into())),
    }
}

// ============================================================================
// BYTES
// ============================================================================

pub fn encode(entity: &Entity) -> Result<Vec<u8>, StoreError> {
    postcard::to_allocvec(&to_record(entity)).map_err(|source| StoreError::Encode {
        uid: entity.uid(),
        source,
    })
}

pub fn decode(key: &str, bytes: &[u8]) -> Result<Entity, StoreError> {
    postcard::from_bytes::<EntityRecord>(bytes)
        .map(from_record)
        .map_err(|source| StoreError::Decode {
            key: key.to_string(),
            source,
        })
}
