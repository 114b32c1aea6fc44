//! Template specialization and instantiation.
//!
//! An [`Instantiation`] is a transient view of a class template applied to
//! arguments. It is never registered in the identity store; the project
//! caches it per (template, canonical argument text) for one generation.
//!
//! Choosing a specialization scores every visible explicit or partial
//! specialization against the argument list:
//!
//! - a concrete pattern argument equal to the argument scores 2,
//! - a pattern variable scores 1, plus 1 per pointer level and 1 for a
//!   reference it requires,
//! - any mismatch disqualifies the specialization.
//!
//! The highest total wins; ties keep the specialization declared first.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::base::Name;

use super::decl::{Declaration, Inheritance, TemplateParameterKind};
use super::project::Project;
use super::resolve::ResolveContext;
use super::types::{ReferenceKind, SpecializationParam, Type, TypeHead};

/// Template parameter name → argument.
pub type Bindings = FxHashMap<Name, SpecializationParam>;

// ============================================================================
// INSTANTIATION
// ============================================================================

#[derive(Debug)]
pub struct Instantiation {
    pub template: Arc<Declaration>,
    /// Chosen explicit or partial specialization, if any.
    pub specialization: Option<Arc<Declaration>>,
    /// Arguments in parameter order, defaults filled in.
    pub args: Vec<SpecializationParam>,
    /// Bindings of the primary template's parameters.
    pub bindings: Bindings,
    /// Bindings of the specialization's own parameters.
    pub specialization_bindings: Bindings,
    pub generation: u64,
}

impl Instantiation {
    /// `V<int, char>`
    pub fn text(&self, project: &Project) -> String {
        let args: Vec<String> = self.args.iter().map(SpecializationParam::text).collect();
        format!("{}<{}>", self.template.qualified_name(project), args.join(", "))
    }

    /// The declaration supplying the body: the specialization if one was
    /// chosen, else the primary template.
    pub fn body(&self) -> &Arc<Declaration> {
        self.specialization.as_ref().unwrap_or(&self.template)
    }

    /// The specialization's members, then every primary member whose name
    /// the specialization does not declare.
    pub fn members(&self, project: &Project) -> Vec<Arc<Declaration>> {
        let own: Vec<Arc<Declaration>> = self
            .specialization
            .iter()
            .flat_map(|s| members_of(project, s))
            .collect();
        let mut out = own.clone();
        out.extend(
            members_of(project, &self.template)
                .into_iter()
                .filter(|m| !own.iter().any(|o| o.name() == m.name())),
        );
        out
    }

    pub fn find_member(&self, project: &Project, ctx: &ResolveContext, name: &str) -> Vec<Arc<Declaration>> {
        let found: Vec<Arc<Declaration>> = self
            .members(project)
            .into_iter()
            .filter(|m| m.name() == name)
            .collect();
        if !found.is_empty() {
            return found;
        }
        let Some(_guard) = ctx.enter(self.template.uid()) else {
            return Vec::new();
        };
        for base in self.bases() {
            let ty = self.substitute(&self.template, &base.base);
            let Some(resolved) = ty.classifier(project, ctx) else {
                continue;
            };
            let hits = match &resolved {
                super::resolve::Resolved::Instance(instance) => instance.find_member(project, ctx, name),
                super::resolve::Resolved::Decl(decl) => super::resolve::Resolver::new(project, ctx)
                    .lookup_in(decl, name, super::resolve::LookupKind::Any),
            };
            if !hits.is_empty() {
                return hits;
            }
        }
        Vec::new()
    }

    /// Base classes of the primary template, verbatim.
    pub fn bases(&self) -> Vec<Inheritance> {
        self.template.bases()
    }

    /// `ty`, written inside `member`, with template parameters replaced.
    ///
    /// Members of the chosen specialization see the specialization's
    /// parameters; everything else sees the primary's.
    pub fn substitute(&self, member: &Declaration, ty: &Type) -> Type {
        let in_specialization = self
            .specialization
            .as_ref()
            .is_some_and(|s| s.uid() == member.uid() || member.scope() == Some(s.uid()));
        if in_specialization {
            substitute_type(ty, &self.specialization_bindings)
        } else {
            substitute_type(ty, &self.bindings)
        }
    }

    /// Type of `member` (variable type, alias target or return type)
    /// within this instantiation.
    pub fn member_type(&self, member: &Declaration) -> Option<Type> {
        member.declared_type().map(|ty| self.substitute(member, ty))
    }
}

fn members_of(project: &Project, decl: &Declaration) -> Vec<Arc<Declaration>> {
    decl.class_data()
        .map(|c| c.members.uids())
        .unwrap_or_default()
        .into_iter()
        .filter_map(|uid| project.declaration(uid))
        .filter(|d| d.is_valid())
        .collect()
}

// ============================================================================
// INSTANTIATE
// ============================================================================

/// Apply `template` to `args`, reusing a cached result of the same
/// generation when allowed.
pub fn instantiate(
    project: &Project,
    ctx: &ResolveContext,
    template: &Arc<Declaration>,
    args: &[SpecializationParam],
) -> Option<Arc<Instantiation>> {
    let _depth = ctx.descend()?;
    let params = parameters(project, template);
    let bound = bind_parameters(&params, args);
    let full_args: Vec<SpecializationParam> = bound.iter().map(|(_, arg)| arg.clone()).collect();

    let key = full_args
        .iter()
        .map(|a| a.canonical_text(project, ctx))
        .collect::<Vec<_>>()
        .join(", ");
    let use_cache = project.config().instantiation_cache;
    if use_cache {
        if let Some(hit) = project.cached_instantiation(template.uid(), &key, ctx.generation()) {
            return Some(hit);
        }
    }

    let flat_args = flatten(&full_args);
    let mut best: Option<(u32, Arc<Declaration>, Bindings)> = None;
    for spec in project.specializations_of(template) {
        if !project.is_visible(&spec, ctx.file()) {
            continue;
        }
        let Some(patterns) = spec.specialization() else {
            continue;
        };
        let spec_params: Vec<Name> = parameters(project, &spec)
            .into_iter()
            .map(|p| p.name)
            .collect();
        let mut deduced = Bindings::default();
        let Some(score) = match_list(project, ctx, patterns, &flat_args, &spec_params, &mut deduced) else {
            continue;
        };
        if best.as_ref().is_none_or(|(s, _, _)| score > *s) {
            best = Some((score, spec, deduced));
        }
    }

    let bindings: Bindings = bound
        .into_iter()
        .filter(|(name, _)| !name.is_empty())
        .collect();
    let (specialization, specialization_bindings) = match best {
        Some((score, spec, deduced)) => {
            tracing::debug!(
                "[TEMPLATE] `{}<{key}>` uses specialization {} (score {score})",
                template.name(),
                spec.uid()
            );
            (Some(spec), deduced)
        }
        None => (None, Bindings::default()),
    };

    let instance = Arc::new(Instantiation {
        template: template.clone(),
        specialization,
        args: full_args,
        bindings,
        specialization_bindings,
        generation: ctx.generation(),
    });
    tracing::debug!("[TEMPLATE] instantiated `{}<{key}>`", template.name());
    if use_cache {
        project.store_instantiation(template.uid(), key, instance.clone());
    }
    Some(instance)
}

/// A template parameter as seen by binding.
#[derive(Debug, Clone)]
struct Parameter {
    name: Name,
    is_variadic: bool,
    default: Option<SpecializationParam>,
}

fn parameters(project: &Project, decl: &Declaration) -> Vec<Parameter> {
    decl.template_params()
        .unwrap_or_default()
        .into_iter()
        .filter_map(|uid| project.declaration(uid))
        .filter_map(|p| {
            let data = p.template_parameter_data()?;
            Some(Parameter {
                name: p.name().clone(),
                is_variadic: data.is_variadic,
                default: data.default.clone(),
            })
        })
        .collect()
}

/// Pair parameters with arguments: missing ones take their defaults (with
/// earlier parameters substituted), a trailing variadic parameter collects
/// the rest into a pack.
fn bind_parameters(params: &[Parameter], args: &[SpecializationParam]) -> Vec<(Name, SpecializationParam)> {
    let mut out: Vec<(Name, SpecializationParam)> = Vec::with_capacity(params.len());
    let mut bindings = Bindings::default();
    let mut rest = args.iter();
    for param in params {
        let arg = if param.is_variadic {
            SpecializationParam::Pack(rest.by_ref().cloned().collect())
        } else if let Some(arg) = rest.next() {
            arg.clone()
        } else if let Some(default) = &param.default {
            substitute_param(default, &bindings)
        } else {
            break;
        };
        if !param.name.is_empty() {
            bindings.insert(param.name.clone(), arg.clone());
        }
        out.push((param.name.clone(), arg));
    }
    out
}

/// Expand packs in place, for matching against specialization patterns.
fn flatten(args: &[SpecializationParam]) -> Vec<SpecializationParam> {
    let mut out = Vec::with_capacity(args.len());
    for arg in args {
        match arg {
            SpecializationParam::Pack(items) => out.extend(flatten(items)),
            other => out.push(other.clone()),
        }
    }
    out
}

/// Bindings of an alias template's parameters, for `substitute_alias`.
fn alias_bindings(project: &Project, alias: &Declaration, args: &[SpecializationParam]) -> Bindings {
    bind_parameters(&parameters(project, alias), args)
        .into_iter()
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

/// The target of an alias template with its parameters replaced.
pub fn substitute_alias(
    project: &Project,
    alias: &Declaration,
    args: &[SpecializationParam],
    target: &Type,
) -> Type {
    substitute_type(target, &alias_bindings(project, alias, args))
}

// ============================================================================
// PATTERN MATCHING
// ============================================================================

fn match_list(
    project: &Project,
    ctx: &ResolveContext,
    patterns: &[SpecializationParam],
    args: &[SpecializationParam],
    vars: &[Name],
    deduced: &mut Bindings,
) -> Option<u32> {
    let mut score = 0;
    let mut index = 0;
    for (i, pattern) in patterns.iter().enumerate() {
        if let Some(var) = pack_variable(pattern, vars) {
            if i + 1 != patterns.len() {
                return None;
            }
            let rest = args.get(index..).unwrap_or_default().to_vec();
            index = args.len();
            bind(deduced, var, SpecializationParam::Pack(rest))?;
            score += 1;
            break;
        }
        let arg = args.get(index)?;
        index += 1;
        score += match_arg(project, ctx, pattern, arg, vars, deduced)?;
    }
    (index == args.len()).then_some(score)
}

/// `Ts...` where `Ts` is a specialization parameter.
fn pack_variable<'a>(pattern: &'a SpecializationParam, vars: &[Name]) -> Option<&'a Name> {
    let ty = pattern.as_type()?;
    if !ty.pack_expansion || ty.qualifier.is_some() {
        return None;
    }
    ty.name().filter(|n| vars.contains(n))
}

fn match_arg(
    project: &Project,
    ctx: &ResolveContext,
    pattern: &SpecializationParam,
    arg: &SpecializationParam,
    vars: &[Name],
    deduced: &mut Bindings,
) -> Option<u32> {
    match (pattern, arg) {
        (SpecializationParam::Type(p), _) if is_variable(p, vars) => {
            let var = p.name()?;
            if let SpecializationParam::Expression(_) = arg {
                if p.pointer_depth > 0 || p.is_reference() {
                    return None;
                }
                bind(deduced, var, arg.clone())?;
                return Some(1);
            }
            let a = arg.as_type()?;
            if p.pointer_depth > a.pointer_depth {
                return None;
            }
            if p.is_reference() && p.reference != a.reference {
                return None;
            }
            let shift = u32::from(p.pointer_depth);
            // cv written on the pattern must be present on the argument
            let cv_ok = (0..=p.pointer_depth).all(|level| {
                (!p.is_const_at(level) || a.is_const_at(level))
                    && (!p.is_volatile_at(level) || a.is_volatile_at(level))
            });
            if !cv_ok {
                return None;
            }
            let mut rest = a.clone();
            rest.cache = Default::default();
            rest.pointer_depth -= p.pointer_depth;
            let strip = |mask: u32| mask.checked_shr(shift).unwrap_or(0);
            rest.const_mask = strip(a.const_mask) & !strip(p.const_mask);
            rest.volatile_mask = strip(a.volatile_mask) & !strip(p.volatile_mask);
            if p.is_reference() {
                rest.reference = ReferenceKind::None;
            }
            bind(deduced, var, SpecializationParam::Type(rest))?;
            let mut score = 1 + shift;
            if p.is_reference() {
                score += 1;
            }
            if p.const_mask != 0 || p.volatile_mask != 0 {
                score += 1;
            }
            Some(score)
        }
        (SpecializationParam::Type(p), SpecializationParam::Type(a)) => {
            if p.pointer_depth != a.pointer_depth
                || p.reference != a.reference
                || p.const_mask != a.const_mask
                || p.volatile_mask != a.volatile_mask
                || p.array_depth != a.array_depth
            {
                return None;
            }
            match (&p.instantiation, &a.instantiation) {
                (Some(p_args), Some(a_args)) if mentions_any(p, vars) => {
                    if bare_canonical(project, ctx, p) != bare_canonical(project, ctx, a) {
                        return None;
                    }
                    let inner = match_list(project, ctx, p_args, &flatten(a_args), vars, deduced)?;
                    Some(2 + inner)
                }
                _ => (p.canonical_text(project, ctx) == a.canonical_text(project, ctx)).then_some(2),
            }
        }
        (SpecializationParam::Expression(p), _) if vars.iter().any(|v| v == p.trim()) => {
            let var = vars.iter().find(|v| *v == p.trim())?;
            bind(deduced, var, arg.clone())?;
            Some(1)
        }
        (SpecializationParam::Expression(p), SpecializationParam::Expression(a)) => {
            (p.trim() == a.trim()).then_some(2)
        }
        (SpecializationParam::Expression(p), SpecializationParam::Type(a)) => {
            // A bare name may parse either way.
            (a.text() == p.trim()).then_some(2)
        }
        (SpecializationParam::Pack(p), SpecializationParam::Pack(a)) => {
            match_list(project, ctx, p, a, vars, deduced)
        }
        _ => None,
    }
}

fn is_variable(ty: &Type, vars: &[Name]) -> bool {
    ty.qualifier.is_none()
        && ty.instantiation.is_none()
        && !ty.pack_expansion
        && ty.name().is_some_and(|n| vars.contains(n))
}

/// Whether any pattern variable occurs inside `ty`.
fn mentions_any(ty: &Type, vars: &[Name]) -> bool {
    if ty.name().is_some_and(|n| vars.contains(n)) {
        return true;
    }
    if ty.qualifier.as_deref().is_some_and(|q| mentions_any(q, vars)) {
        return true;
    }
    ty.instantiation.iter().flatten().any(|arg| match arg {
        SpecializationParam::Type(t) => mentions_any(t, vars),
        SpecializationParam::Expression(e) => vars.iter().any(|v| v == e.trim()),
        SpecializationParam::Pack(items) => items
            .iter()
            .any(|i| i.as_type().is_some_and(|t| mentions_any(t, vars))),
    })
}

/// Canonical text of the template named by `ty`, without arguments.
fn bare_canonical(project: &Project, ctx: &ResolveContext, ty: &Type) -> String {
    match ty.classifier(project, ctx) {
        Some(resolved) if !resolved.is_placeholder() => resolved.qualified_name(project),
        _ => ty.path().to_string(),
    }
}

/// Record `var = value`, failing if `var` is already bound to something else.
fn bind(deduced: &mut Bindings, var: &Name, value: SpecializationParam) -> Option<()> {
    match deduced.get(var) {
        Some(existing) if existing.text() != value.text() => None,
        Some(_) => Some(()),
        None => {
            deduced.insert(var.clone(), value);
            Some(())
        }
    }
}

// ============================================================================
// FUNCTION TEMPLATES
// ============================================================================

/// What `var` stands for when a parameter written as `pattern` receives an
/// argument of type `actual`: `const T*` against `const char*` gives `char`.
///
/// A reference pattern accepts a non-reference argument and may add cv at
/// its outermost level. A by-value pattern ignores the argument's
/// top-level cv.
pub fn deduce_type(
    project: &Project,
    ctx: &ResolveContext,
    var: &Name,
    pattern: &Type,
    actual: &Type,
) -> Option<SpecializationParam> {
    let mut deduced = Bindings::default();
    deduce_into(project, ctx, pattern, actual, std::slice::from_ref(var), &mut deduced)?;
    deduced.remove(var)
}

/// Bindings of `function`'s template parameters deduced from the types of
/// call arguments, in parameter order. Parameters no argument constrains
/// stay unbound. Returns `None` for a non-template, for too many
/// arguments, or when one parameter is deduced two different ways.
pub fn deduce_function_args(
    project: &Project,
    ctx: &ResolveContext,
    function: &Declaration,
    actual: &[Type],
) -> Option<Bindings> {
    let vars: Vec<Name> = parameters(project, function)
        .into_iter()
        .map(|p| p.name)
        .filter(|name| !name.is_empty())
        .collect();
    if vars.is_empty() {
        return None;
    }
    let params = function.function_data()?.params.uids();
    if actual.len() > params.len() {
        return None;
    }
    let mut deduced = Bindings::default();
    for (uid, actual) in params.into_iter().zip(actual) {
        let Some(pattern) = project.declaration(uid).and_then(|p| p.declared_type().cloned()) else {
            continue;
        };
        deduce_into(project, ctx, &pattern, actual, &vars, &mut deduced)?;
    }
    tracing::debug!(
        "[TEMPLATE] deduced {}/{} parameter(s) of `{}`",
        deduced.len(),
        vars.len(),
        function.name()
    );
    Some(deduced)
}

fn deduce_into(
    project: &Project,
    ctx: &ResolveContext,
    pattern: &Type,
    actual: &Type,
    vars: &[Name],
    deduced: &mut Bindings,
) -> Option<()> {
    if !mentions_any(pattern, vars) {
        return Some(());
    }
    let mut p = pattern.clone();
    let mut a = actual.clone();
    p.cache = Default::default();
    a.cache = Default::default();
    p.reference = ReferenceKind::None;
    a.reference = ReferenceKind::None;
    if !pattern.is_reference() {
        a.const_mask &= !1;
        a.volatile_mask &= !1;
    }

    if !is_variable(&p, vars) {
        // the outermost cv of the pattern never blocks a match
        p.const_mask &= !1;
        p.volatile_mask &= !1;
        let (p, a) = (SpecializationParam::Type(p), SpecializationParam::Type(a));
        return match_arg(project, ctx, &p, &a, vars, deduced).map(|_| ());
    }
    let var = p.name()?.clone();
    if p.pointer_depth > a.pointer_depth {
        return None;
    }
    let shift = u32::from(p.pointer_depth);
    let strip = |mask: u32| mask.checked_shr(shift).unwrap_or(0);
    let const_mask = strip(a.const_mask) & !strip(p.const_mask);
    let volatile_mask = strip(a.volatile_mask) & !strip(p.volatile_mask);
    a.pointer_depth -= p.pointer_depth;
    a.const_mask = const_mask;
    a.volatile_mask = volatile_mask;
    bind(deduced, &var, SpecializationParam::Type(a))
}

/// `N::S<class,int>`: the template's qualified name and the kind of each
/// of its parameters, without parameter names. Redeclarations of one
/// template share a signature.
pub fn template_signature(project: &Project, ctx: &ResolveContext, template: &Declaration) -> String {
    let mut out = template.qualified_name(project);
    let params: Vec<Arc<Declaration>> = template
        .template_params()
        .unwrap_or_default()
        .into_iter()
        .filter_map(|uid| project.declaration(uid))
        .collect();
    if params.is_empty() {
        return out;
    }
    let parts: Vec<String> = params
        .iter()
        .filter_map(|p| p.template_parameter_data())
        .map(|data| {
            let mut part = match &data.param_kind {
                TemplateParameterKind::NonType(ty) => ty.canonical_text(project, ctx),
                TemplateParameterKind::Type | TemplateParameterKind::Template => "class".to_string(),
            };
            if data.is_variadic {
                part.push_str("...");
            }
            part
        })
        .collect();
    out.push('<');
    out.push_str(&parts.join(","));
    out.push('>');
    out
}

// ============================================================================
// SUBSTITUTION
// ============================================================================

/// Replace template parameter names in `ty` with their bound arguments.
pub fn substitute_type(ty: &Type, bindings: &Bindings) -> Type {
    if bindings.is_empty() {
        return ty.clone();
    }
    if ty.qualifier.is_none() {
        if let Some(name) = ty.name() {
            if let Some(SpecializationParam::Type(arg)) = bindings.get(name) {
                let mut base = arg.clone();
                if let Some(args) = &ty.instantiation {
                    // template template parameter applied to arguments
                    base.instantiation = Some(substitute_args(args, bindings));
                }
                return ty.decorate(base);
            }
        }
    }

    let mut out = ty.clone();
    out.cache = Default::default();
    if let Some(q) = ty.qualifier.as_deref() {
        out.qualifier = Some(Box::new(substitute_type(q, bindings)));
    }
    if let Some(args) = &ty.instantiation {
        out.instantiation = Some(substitute_args(args, bindings));
    }
    if let TypeHead::FunctionPointer {
        ret,
        params,
        variadic,
    } = &ty.head
    {
        out.head = TypeHead::FunctionPointer {
            ret: Box::new(substitute_type(ret, bindings)),
            params: params.iter().map(|p| substitute_type(p, bindings)).collect(),
            variadic: *variadic,
        };
    }
    out
}

fn substitute_args(args: &[SpecializationParam], bindings: &Bindings) -> Vec<SpecializationParam> {
    let mut out = Vec::with_capacity(args.len());
    for arg in args {
        match arg {
            SpecializationParam::Type(t) if t.pack_expansion && t.qualifier.is_none() => {
                match t.name().and_then(|n| bindings.get(n)) {
                    Some(SpecializationParam::Pack(items)) => out.extend(items.iter().cloned()),
                    _ => out.push(substitute_param(arg, bindings)),
                }
            }
            _ => out.push(substitute_param(arg, bindings)),
        }
    }
    out
}

fn substitute_param(param: &SpecializationParam, bindings: &Bindings) -> SpecializationParam {
    match param {
        SpecializationParam::Type(t) => {
            let bare = t.qualifier.is_none()
                && t.instantiation.is_none()
                && t.pointer_depth == 0
                && !t.is_reference();
            match t.name().and_then(|n| bindings.get(n)) {
                // a non-type parameter used as an argument
                Some(SpecializationParam::Expression(e)) if bare => {
                    SpecializationParam::Expression(e.clone())
                }
                _ => SpecializationParam::Type(substitute_type(t, bindings)),
            }
        }
        SpecializationParam::Expression(e) => match bindings.get(e.trim()) {
            Some(SpecializationParam::Expression(value)) => {
                SpecializationParam::Expression(value.clone())
            }
            Some(SpecializationParam::Type(ty)) => SpecializationParam::Type(ty.clone()),
            _ => param.clone(),
        },
        SpecializationParam::Pack(items) => {
            SpecializationParam::Pack(substitute_args(items, bindings))
        }
    }
}
