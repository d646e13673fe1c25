//! Property-based tests for merging and the bitcode round trip.
//!
//! Generates arbitrary records of every kind and checks that:
//!
//! - encoding then decoding gives back an equal record once locations
//!   are in canonical order
//! - merging a record with itself changes nothing
//! - specifier flags end up the same whatever order occurrences arrive in
//! - inserting a child twice keeps one copy

use indexmap::IndexSet;
use proptest::prelude::*;
use smol_str::SmolStr;
use symgraph::base::{Location, SymbolId};
use symgraph::bitcode::{decode, encode};
use symgraph::hir::{
    AccessKind, BaseInfo, FunctionSpecs, Info, InfoKind, Javadoc, Param, SpecializedMember,
    StorageClass, TemplateArg, TemplateInfo, TemplateParam, TypeInfo, merge,
};

// ============================================================================
// PROPTEST STRATEGIES
// ============================================================================

fn arb_id() -> impl Strategy<Value = SymbolId> {
    "[a-z@:]{1,12}".prop_map(|usr| SymbolId::from_usr(&format!("c:{usr}")).unwrap())
}

fn arb_name() -> impl Strategy<Value = SmolStr> {
    prop_oneof![Just(SmolStr::default()), "[A-Za-z_][A-Za-z0-9_]{0,10}".prop_map(SmolStr::from)]
}

fn arb_kind() -> impl Strategy<Value = InfoKind> {
    proptest::sample::select(InfoKind::ALL.to_vec())
}

fn arb_access() -> impl Strategy<Value = AccessKind> {
    prop_oneof![
        Just(AccessKind::None),
        Just(AccessKind::Public),
        Just(AccessKind::Protected),
        Just(AccessKind::Private),
    ]
}

fn arb_location() -> impl Strategy<Value = Location> {
    ("[a-z]{1,4}\\.h", 0u32..200_000, any::<bool>()).prop_map(|(file, line, in_root)| {
        let loc = Location::new(file, line);
        if in_root { loc } else { loc.outside_root() }
    })
}

fn arb_type() -> impl Strategy<Value = TypeInfo> {
    prop_oneof![
        Just(TypeInfo::default()),
        arb_name().prop_map(TypeInfo::builtin),
        (arb_id(), arb_name()).prop_map(|(id, name)| TypeInfo::new(id, name)),
    ]
}

fn arb_template() -> impl Strategy<Value = Option<TemplateInfo>> {
    let param = arb_name().prop_map(|name| TemplateParam {
        name,
        ..TemplateParam::default()
    });
    prop_oneof![
        Just(None),
        (
            proptest::collection::vec(param, 0..3),
            proptest::collection::vec(arb_name().prop_map(TemplateArg::new), 0..3),
            prop_oneof![Just(SymbolId::INVALID), arb_id()],
        )
            .prop_map(|(params, args, primary)| Some(TemplateInfo {
                params,
                args,
                primary,
            })),
    ]
}

fn arb_ids() -> impl Strategy<Value = IndexSet<SymbolId>> {
    proptest::collection::vec(arb_id(), 0..4).prop_map(|ids| ids.into_iter().collect())
}

/// Common fields plus a few kind-specific ones.
#[derive(Debug, Clone)]
struct Seed {
    kind: InfoKind,
    id: SymbolId,
    name: SmolStr,
    parents: Vec<SymbolId>,
    access: AccessKind,
    brief: SmolStr,
    def_loc: Option<Location>,
    locs: Vec<Location>,
    ids: IndexSet<SymbolId>,
    ty: TypeInfo,
    template: Option<TemplateInfo>,
    text: SmolStr,
    flags: u64,
    flag: bool,
}

fn arb_seed() -> impl Strategy<Value = Seed> {
    (
        (arb_kind(), arb_id(), arb_name(), proptest::collection::vec(arb_id(), 0..3)),
        (arb_access(), arb_name(), proptest::option::of(arb_location())),
        proptest::collection::vec(arb_location(), 0..4),
        (arb_ids(), arb_type(), arb_template()),
        (arb_name(), any::<u16>(), any::<bool>()),
    )
        .prop_map(
            |((kind, id, name, parents), (access, brief, def_loc), locs, (ids, ty, template), (text, flags, flag))| {
                Seed {
                    kind,
                    id,
                    name,
                    parents,
                    access,
                    brief,
                    def_loc,
                    locs,
                    ids,
                    ty,
                    template,
                    text,
                    flags: u64::from(flags),
                    flag,
                }
            },
        )
}

fn build(seed: Seed) -> Info {
    let mut info = Info::new(seed.id, seed.kind);
    {
        let base = info.base_mut();
        base.name = seed.name;
        base.parents = seed.parents;
        base.access = seed.access;
        if !seed.brief.is_empty() {
            base.javadoc = Some(Javadoc::new(seed.brief));
        }
        base.source.def_loc = seed.def_loc;
        for loc in seed.locs {
            base.source.add_location(loc);
        }
    }
    match &mut info {
        Info::Namespace(i) => {
            i.members = seed.ids;
            i.specs.is_inline = seed.flag;
        }
        Info::Record(i) => {
            i.members = seed.ids.clone();
            i.friends = seed.ids.into_iter().collect();
            i.friends.sort();
            i.template = seed.template;
            if !seed.ty.is_empty() {
                i.bases.push(BaseInfo {
                    ty: seed.ty,
                    access: AccessKind::Public,
                    is_virtual: seed.flag,
                });
            }
        }
        Info::Function(i) => {
            i.return_type = seed.ty.clone();
            i.params.push(Param {
                name: seed.text,
                ty: seed.ty,
                default: SmolStr::default(),
            });
            i.template = seed.template;
            i.storage = if seed.flag { StorageClass::Static } else { StorageClass::None };
            i.specs = FunctionSpecs::from_bits(seed.flags);
        }
        Info::Enum(i) => {
            i.scoped = seed.flag;
            i.members = seed.ids;
            i.underlying = (!seed.ty.is_empty()).then_some(seed.ty);
        }
        Info::Enumerator(i) => i.initializer = seed.text,
        Info::Field(i) => {
            i.ty = seed.ty;
            i.default = seed.text;
            i.specs.is_mutable = seed.flag;
        }
        Info::Variable(i) => {
            i.ty = seed.ty;
            i.template = seed.template;
            i.specs.is_constexpr = seed.flag;
        }
        Info::Typedef(i) => {
            i.underlying = seed.ty;
            i.is_using = seed.flag;
            i.template = seed.template;
        }
        Info::Friend(i) => {
            i.friend_symbol = seed.ids.first().copied().unwrap_or(SymbolId::INVALID);
            i.friend_type = seed.flag.then_some(seed.ty);
        }
        Info::Specialization(i) => {
            i.primary = seed.ids.first().copied().unwrap_or(SymbolId::INVALID);
            i.args = seed.template.map(|t| t.args).unwrap_or_default();
            i.members = seed
                .ids
                .iter()
                .map(|id| SpecializedMember {
                    primary: *id,
                    specialized: seed.id,
                })
                .collect();
        }
    }
    info
}

fn arb_info() -> impl Strategy<Value = Info> {
    arb_seed().prop_map(build)
}

fn arb_flags() -> impl Strategy<Value = FunctionSpecs> {
    any::<u16>().prop_map(|bits| FunctionSpecs::from_bits(u64::from(bits)))
}

fn function_with(id: SymbolId, specs: FunctionSpecs) -> Info {
    let mut info = Info::new(id, InfoKind::Function);
    if let Info::Function(f) = &mut info {
        f.specs = specs;
    }
    info
}

fn specs_of(info: &Info) -> FunctionSpecs {
    match info {
        Info::Function(f) => f.specs,
        _ => FunctionSpecs::default(),
    }
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #[test]
    fn prop_bitcode_round_trip(infos in proptest::collection::vec(arb_info(), 0..6)) {
        let decoded = decode(&encode(&infos)).unwrap();
        prop_assert_eq!(decoded, infos);
    }

    #[test]
    fn prop_self_merge_is_noop(info in arb_info()) {
        let mut merged = info.clone();
        merge(&mut merged, info.clone()).unwrap();
        prop_assert_eq!(merged, info);
    }

    #[test]
    fn prop_flags_commute(a in arb_flags(), b in arb_flags(), c in arb_flags()) {
        let id = SymbolId::from_usr("c:@F@f").unwrap();

        let mut abc = function_with(id, a);
        merge(&mut abc, function_with(id, b)).unwrap();
        merge(&mut abc, function_with(id, c)).unwrap();

        let mut acb = function_with(id, a);
        merge(&mut acb, function_with(id, c)).unwrap();
        merge(&mut acb, function_with(id, b)).unwrap();

        prop_assert_eq!(specs_of(&abc), specs_of(&acb));
        prop_assert_eq!(specs_of(&abc).to_bits(), a.to_bits() | b.to_bits() | c.to_bits());
    }

    #[test]
    fn prop_child_insert_is_idempotent(child in arb_id()) {
        let mut ns = Info::new(SymbolId::GLOBAL, InfoKind::Namespace);
        ns.insert_child(child, InfoKind::Function, false);
        ns.insert_child(child, InfoKind::Function, false);
        prop_assert_eq!(ns.members().map(|m| m.len()), Some(1));
    }
}
