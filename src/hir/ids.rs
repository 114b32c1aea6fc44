//! Identifiers and kind discriminants for model objects.
//!
//! A [`Uid`] is a weak handle: it names an object in a project's
//! [`IdentityStore`](super::IdentityStore) but never keeps it alive.

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::base::{FileId, Name};

// ============================================================================
// UID
// ============================================================================

/// Stable identifier of a declaration or file unit.
///
/// The high 16 bits name the store that issued it, so UIDs handed out by
/// library projects never collide with the main project's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Uid(u64);

impl Uid {
    const SLOT_BITS: u32 = 48;
    const SLOT_MASK: u64 = (1 << Self::SLOT_BITS) - 1;

    pub fn new(store: u16, slot: u64) -> Self {
        debug_assert!(slot <= Self::SLOT_MASK, "uid slot overflow");
        Self(((store as u64) << Self::SLOT_BITS) | (slot & Self::SLOT_MASK))
    }

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    /// Id of the store that issued this UID.
    pub fn store(self) -> u16 {
        (self.0 >> Self::SLOT_BITS) as u16
    }

    pub fn slot(self) -> u64 {
        self.0 & Self::SLOT_MASK
    }

    /// Key under which the object is persisted.
    pub fn storage_key(self) -> String {
        format!("{:016x}", self.0)
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "uid:{}:{}", self.store(), self.slot())
    }
}

// ============================================================================
// KINDS
// ============================================================================

/// The kind of a declaration, fixed when the declaration is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclKind {
    Class,
    Struct,
    Union,
    Enum,
    Enumerator,
    Function,
    FunctionDefinition,
    Method,
    Constructor,
    Destructor,
    Typedef,
    TypeAlias,
    Namespace,
    NamespaceDefinition,
    UsingDeclaration,
    UsingDirective,
    Friend,
    ClassForwardDeclaration,
    EnumForwardDeclaration,
    Variable,
    Field,
    Parameter,
    TemplateParameter,
}

impl DeclKind {
    /// Class, struct or union.
    pub fn is_class(self) -> bool {
        matches!(self, Self::Class | Self::Struct | Self::Union)
    }

    /// A kind usable as the target of a type.
    pub fn is_classifier(self) -> bool {
        self.is_class() || self == Self::Enum
    }

    pub fn is_function(self) -> bool {
        matches!(
            self,
            Self::Function
                | Self::FunctionDefinition
                | Self::Method
                | Self::Constructor
                | Self::Destructor
        )
    }

    pub fn is_forward(self) -> bool {
        matches!(
            self,
            Self::ClassForwardDeclaration | Self::EnumForwardDeclaration
        )
    }

    pub fn is_type_alias(self) -> bool {
        matches!(self, Self::Typedef | Self::TypeAlias)
    }

    pub fn is_variable(self) -> bool {
        matches!(self, Self::Variable | Self::Field | Self::Parameter)
    }

    pub fn is_using(self) -> bool {
        matches!(self, Self::UsingDeclaration | Self::UsingDirective)
    }

    /// Kinds whose declarations own other declarations.
    pub fn is_scope(self) -> bool {
        self.is_classifier()
            || self.is_function()
            || matches!(
                self,
                Self::Namespace | Self::NamespaceDefinition | Self::TypeAlias | Self::Typedef
            )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Struct => "struct",
            Self::Union => "union",
            Self::Enum => "enum",
            Self::Enumerator => "enumerator",
            Self::Function => "function",
            Self::FunctionDefinition => "function definition",
            Self::Method => "method",
            Self::Constructor => "constructor",
            Self::Destructor => "destructor",
            Self::Typedef => "typedef",
            Self::TypeAlias => "type alias",
            Self::Namespace => "namespace",
            Self::NamespaceDefinition => "namespace definition",
            Self::UsingDeclaration => "using declaration",
            Self::UsingDirective => "using directive",
            Self::Friend => "friend",
            Self::ClassForwardDeclaration => "class forward declaration",
            Self::EnumForwardDeclaration => "enum forward declaration",
            Self::Variable => "variable",
            Self::Field => "field",
            Self::Parameter => "parameter",
            Self::TemplateParameter => "template parameter",
        }
    }
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The keyword that introduced a class-like type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassKey {
    Class,
    Struct,
    Union,
    Enum,
}

impl ClassKey {
    /// Declaration kind of a definition introduced with this key.
    pub fn definition_kind(self) -> DeclKind {
        match self {
            Self::Class => DeclKind::Class,
            Self::Struct => DeclKind::Struct,
            Self::Union => DeclKind::Union,
            Self::Enum => DeclKind::Enum,
        }
    }

    pub fn from_kind(kind: DeclKind) -> Option<Self> {
        match kind {
            DeclKind::Class => Some(Self::Class),
            DeclKind::Struct => Some(Self::Struct),
            DeclKind::Union => Some(Self::Union),
            DeclKind::Enum => Some(Self::Enum),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Struct => "struct",
            Self::Union => "union",
            Self::Enum => "enum",
        }
    }
}

/// C++ member access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

impl Visibility {
    /// Default access for members of a class-like declaration.
    pub fn default_for(kind: DeclKind) -> Self {
        match kind {
            DeclKind::Class => Self::Private,
            _ => Self::Public,
        }
    }
}

/// Why a placeholder classifier exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaceholderOrigin {
    /// Owned by a forward declaration.
    Forward,
    /// Created for a type name no declaration matched.
    Unresolved,
}

// ============================================================================
// IDENTITY KEYS
// ============================================================================

/// Content key the store uses to hand out stable UIDs.
///
/// Re-rendering an unchanged construct produces the same key, so it gets its
/// old UID back once the previous object has been disposed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UidKey {
    Decl {
        kind: DeclKind,
        file: FileId,
        name: Name,
        start: u32,
        end: u32,
    },
    /// A project-wide namespace, merged over all its definitions.
    Namespace { qualified: SmolStr },
    Placeholder {
        owner: Uid,
        qualified: SmolStr,
        origin: PlaceholderOrigin,
    },
    File(FileId),
}
