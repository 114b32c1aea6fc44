//! High-level IR (HIR): the declaration model.
//!
//! A [`Project`] owns an [`IdentityStore`] mapping weak [`Uid`]s to live
//! declarations, the merged namespace tree and the registries that link
//! forward declarations, placeholders and template specializations.
//! Rendering fills it from syntax trees; the resolver and the type model
//! read it.
//!
//! ## Layers
//!
//! ```text
//! file_text(file)            ← INPUT: raw source text (Salsa)
//!     │
//!     ▼
//! parse_file(file)           ← lossless tree, memoized
//!     │
//!     ▼
//! render_tree(project, ...)  ← declarations, lists, registries
//!     │
//!     ▼
//! Resolver / Type            ← name lookup, classifiers, instantiation
//! ```
//!
//! ## Key Types
//!
//! - [`Declaration`]: one C++ entity with kind-specific [`DeclData`]
//! - [`Type`]: a written type with a per-generation classifier cache
//! - [`Resolver`]: scope chain, using directives, then libraries
//! - [`Instantiation`]: a template bound to concrete arguments

mod codec;
mod config;
mod db;
mod decl;
mod error;
mod forward;
mod ids;
mod project;
mod render;
mod resolve;
mod store;
mod template;
mod types;

pub use codec::{DeclRecord, EntityRecord, FileRecord, decode, encode, from_record, to_record};
pub use config::ModelConfig;
pub use db::{FileText, ParseResult, RootDatabase, file_includes, parse_file};
pub use decl::{
    AliasData, ClassData, DeclData, Declaration, EnumData, EnumeratorData, ForwardData,
    FriendData, FunctionData, FunctionFlags, Inheritance, MemberEntry, NamespaceData,
    NamespaceDefinitionData, OffsetList, TemplateInfo, TemplateParameterData,
    TemplateParameterKind, UsingData, VariableData,
};
pub use error::{ConfigError, RenderError, StoreError};
pub use forward::{bind_definition, placeholder_for, real_target, unresolved_placeholder};
pub use ids::{ClassKey, DeclKind, PlaceholderOrigin, Uid, UidKey, Visibility};
pub use project::Project;
pub use render::{RenderOutcome, parse_type, render_source, render_tree};
pub use resolve::{LookupKind, ResolveContext, Resolved, Resolver, resolve_qualified};
pub use store::{DirStorage, Entity, FileUnit, IdentityStore, MemoryStorage, Storage};
pub use template::{
    Bindings, Instantiation, deduce_function_args, deduce_type, instantiate, substitute_alias,
    substitute_type, template_signature,
};
pub use types::{
    ClassifierCache, MAX_POINTER_DEPTH, ReferenceKind, SpecializationParam, Type, TypeHead,
};
