//! Template binding, specialization choice and the instantiation cache.

use std::sync::Arc;

use cppmodel::base::FileId;
use cppmodel::hir::{
    Instantiation, LookupKind, MAX_POINTER_DEPTH, ModelConfig, Project, ResolveContext, Resolver,
    Type, deduce_function_args, parse_type, render_source, template_signature,
};
use rstest::rstest;

use crate::helpers::model_helpers::*;
use crate::helpers::source_fixtures::*;

/// The instantiation a variable's declared type names.
fn instance_of(project: &Project, variable: &str) -> Arc<Instantiation> {
    let ctx = ResolveContext::new(project);
    let decl = assert_resolves(project, variable, LookupKind::Variable);
    let resolved = decl
        .declared_type()
        .and_then(|t| t.classifier(project, &ctx))
        .unwrap_or_else(|| panic!("`{variable}` has no classifier"));
    resolved
        .as_instance()
        .cloned()
        .unwrap_or_else(|| panic!("`{variable}` is not an instantiation"))
}

fn member_type_text(project: &Project, instance: &Instantiation, member: &str) -> String {
    let member = instance
        .members(project)
        .into_iter()
        .find(|m| m.name() == member)
        .unwrap_or_else(|| panic!("no member `{member}`"));
    instance.member_type(&member).map(|t| t.text()).unwrap_or_default()
}

const BOX: &str = "struct P { };\ntemplate<class T> struct Box { T value; T* next; typedef T item; };\nBox<P> b;";

#[rstest]
#[case("value", "P")]
#[case("next", "P*")]
#[case("item", "P")]
fn test_members_see_the_bound_argument(#[case] member: &str, #[case] expected: &str) {
    let project = project_from(BOX);
    let instance = instance_of(&project, "b");
    assert_eq!(member_type_text(&project, &instance, member), expected);
    assert_eq!(instance.text(&project), "Box<P>");
}

#[test]
fn test_explicit_specialization_wins_and_inherits_missing_members() {
    let project = project_from(
        "template<class T> struct V { T data; int size; };\n\
         template<> struct V<bool> { unsigned bits; int size; };\n\
         V<bool> flags;\nV<int> ints;",
    );
    let flags = instance_of(&project, "flags");
    assert!(flags.specialization.is_some());
    let names: Vec<String> = flags.members(&project).iter().map(|m| m.name().to_string()).collect();
    assert_eq!(names, vec!["bits", "size", "data"]);

    let ints = instance_of(&project, "ints");
    assert!(ints.specialization.is_none());
    assert_eq!(member_type_text(&project, &ints, "data"), "int");
}

#[test]
fn test_partial_specialization_deduces_its_parameters() {
    let project = project_from(
        "template<class T> struct S { int primary; };\n\
         template<class U> struct S<U*> { U pointee; };\n\
         S<char*> s;",
    );
    let instance = instance_of(&project, "s");
    let chosen = instance.specialization.as_ref().expect("partial specialization chosen");
    assert!(chosen.is_specialization());
    assert_eq!(member_type_text(&project, &instance, "pointee"), "char");
}

#[test]
fn test_deep_pointer_specialization_saturates_instead_of_overflowing() {
    let stars = "*".repeat(40);
    let project = project_from(&format!(
        "template<class T> struct S {{ int primary; }};\n\
         template<class U> struct S<U{stars}> {{ U pointee; }};\n\
         S<int{stars}> v;"
    ));
    let instance = instance_of(&project, "v");
    assert!(instance.specialization.is_some());
    assert_eq!(member_type_text(&project, &instance, "pointee"), "int");

    let v = assert_resolves(&project, "v", LookupKind::Variable);
    let ty = v.declared_type().unwrap();
    let args = ty.instantiation.as_ref().unwrap();
    let arg = args[0].as_type().unwrap();
    assert_eq!(arg.pointer_depth, MAX_POINTER_DEPTH);
}

#[test]
fn test_empty_argument_list_differs_from_no_list() {
    let project = project_from("template<class T = int> struct V { T v; };\nV<> with_list;\nV* without_list;");
    let instance = instance_of(&project, "with_list");
    assert_eq!(instance.text(&project), "V<int>");
    assert_eq!(member_type_text(&project, &instance, "v"), "int");

    let ctx = ResolveContext::new(&project);
    let without = assert_resolves(&project, "without_list", LookupKind::Variable);
    let ty = without.declared_type().unwrap();
    assert!(!ty.is_instantiation());
    let resolved = ty.classifier(&project, &ctx).unwrap();
    assert!(resolved.as_instance().is_none());
    assert_eq!(resolved.qualified_name(&project), "V");
}

#[test]
fn test_geometry_array_specialization() {
    let project = project_from(&format!("{GEOMETRY_H}\ngeo::Array<bool> packed;\ngeo::Array<int, 8> wide;"));
    let packed = instance_of(&project, "packed");
    assert!(packed.specialization.is_some(), "default N = 3 selects Array<bool, 3>");
    assert_eq!(packed.args.len(), 2);
    assert_eq!(packed.text(&project), "geo::Array<bool, 3>");

    let wide = instance_of(&project, "wide");
    assert!(wide.specialization.is_none());
    assert_eq!(member_type_text(&project, &wide, "begin"), "int*");
}

#[test]
fn test_defaults_may_name_earlier_parameters() {
    let project = project_from(
        "template<class T, class U = T*> struct Pair { U second; };\nPair<int> p;",
    );
    let instance = instance_of(&project, "p");
    assert_eq!(member_type_text(&project, &instance, "second"), "int*");
}

#[rstest]
#[case::cached(true)]
#[case::uncached(false)]
fn test_instantiation_cache(#[case] enabled: bool) {
    let config = ModelConfig::default().with_instantiation_cache(enabled);
    let project = Project::new("cache", config);
    render_source(&project, FileId::new(0), "template<class T> struct W { T w; };\nW<int> a;\nW<int> b;");

    let a = instance_of(&project, "a");
    let b = instance_of(&project, "b");
    assert_eq!(Arc::ptr_eq(&a, &b), enabled);
    assert_eq!(project.instantiation_count(), usize::from(enabled));
}

#[test]
fn test_cached_instances_do_not_outlive_their_generation() {
    let project = project_from("template<class T> struct W { T w; };\nW<int> a;");
    let first = instance_of(&project, "a");
    render_source(&project, FileId::new(1), "int unrelated;");
    let second = instance_of(&project, "a");
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(second.generation > first.generation);
}

#[test]
fn test_alias_template_expands() {
    let project = project_from("template<class T> using Ptr = T*;\nPtr<int> p;");
    let ctx = ResolveContext::new(&project);
    let p = assert_resolves(&project, "p", LookupKind::Variable);
    let ty = p.declared_type().unwrap();
    assert_eq!(ty.text(), "Ptr<int>");
    assert_eq!(ty.canonical_text(&project, &ctx), "int*");
}

#[test]
fn test_self_referential_alias_template_terminates() {
    let project = project_from("template<class T> using Loop = Loop<T>;\nLoop<int> l;");
    let ctx = ResolveContext::new(&project);
    let l = assert_resolves(&project, "l", LookupKind::Variable);
    let ty = l.declared_type().unwrap();
    assert!(ty.underlying(&project, &ctx).is_none());
    assert!(ty.classifier(&project, &ctx).is_none());
}

#[test]
fn test_specializations_are_registered_with_their_template() {
    let project = project_from(GEOMETRY_H);
    let array = assert_resolves(&project, "geo::Array", LookupKind::Class);
    let specializations = project.specializations_of(&array);
    assert_eq!(specializations.len(), 1);
    assert_eq!(child_names(&specializations[0]), vec!["bits"]);
}

// ============================================================================
// Primary templates, deduction and signatures
// ============================================================================

const FUNCTIONS: &str = "template<class T> T twice(T v);\n\
                         template<class T> T twice(T a, T b);\n\
                         template<> int twice<int>(int a, int b);\n\
                         template<class K, class V> void put(const K& key, V* value, int flags);";

#[test]
fn test_class_specialization_leads_back_to_its_primary() {
    let project = project_from(GEOMETRY_H);
    let array = assert_resolves(&project, "geo::Array", LookupKind::Class);
    let specs = project.specializations_of(&array);
    assert_eq!(specs.len(), 1);
    let base = project.base_template(&specs[0]).expect("primary template");
    assert_eq!(base.uid(), array.uid());
    assert!(project.base_template(&array).is_none());
}

#[test]
fn test_function_specialization_picks_the_overload_of_its_arity() {
    let project = project_from(FUNCTIONS);
    let any_twice = assert_resolves(&project, "twice", LookupKind::Function);
    let specs = project.specializations_of(&any_twice);
    assert_eq!(specs.len(), 1);
    let base = project.base_template(&specs[0]).expect("primary template");
    assert!(base.is_template());
    assert_eq!(base.function_data().unwrap().params.len(), 2);
}

#[test]
fn test_function_template_arguments_are_deduced_from_call_types() {
    let project = project_from(FUNCTIONS);
    let ctx = ResolveContext::new(&project);
    let put = assert_resolves(&project, "put", LookupKind::Function);
    let global = project.global_namespace();
    let actual: Vec<Type> = ["const char*", "double*", "int"]
        .iter()
        .map(|t| parse_type(t, FileId::new(0), global).unwrap())
        .collect();

    let deduced = deduce_function_args(&project, &ctx, &put, &actual).expect("deducible");
    assert_eq!(deduced.get("K").map(|k| k.text()).as_deref(), Some("const char*"));
    assert_eq!(deduced.get("V").map(|v| v.text()).as_deref(), Some("double"));
}

#[test]
fn test_conflicting_deductions_fail() {
    let project = project_from(FUNCTIONS);
    let ctx = ResolveContext::new(&project);
    let global = project.global_namespace();
    let types = |texts: &[&str]| -> Vec<Type> {
        texts
            .iter()
            .map(|t| parse_type(t, FileId::new(0), global).unwrap())
            .collect()
    };
    let pair = Resolver::new(&project, &ctx)
        .lookup_in(&project.declaration(global).unwrap(), "twice", LookupKind::Function)
        .into_iter()
        .find(|f| f.function_data().is_some_and(|d| d.params.len() == 2))
        .unwrap();

    assert!(deduce_function_args(&project, &ctx, &pair, &types(&["int", "long"])).is_none());
    let deduced = deduce_function_args(&project, &ctx, &pair, &types(&["int", "const int"])).unwrap();
    assert_eq!(deduced.get("T").map(|t| t.text()).as_deref(), Some("int"));
}

#[rstest]
#[case("geo::Array", "geo::Array<class,int>")]
#[case("twice", "twice<class>")]
#[case("put", "put<class,class>")]
fn test_template_signature_ignores_parameter_names(#[case] name: &str, #[case] expected: &str) {
    let project = project_from(&format!("{GEOMETRY_H}\n{FUNCTIONS}"));
    let ctx = ResolveContext::new(&project);
    let kind = if name.contains("::") { LookupKind::Class } else { LookupKind::Function };
    let template = assert_resolves(&project, name, kind);
    assert_eq!(template_signature(&project, &ctx, &template), expected);
}
