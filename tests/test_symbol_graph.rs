//! End-to-end tests: producers build batches, an executor merges them,
//! and the corpus is checked.
//!
//! Every scenario runs against both strategies.

use rstest::rstest;
use symgraph::base::{Location, SymbolId};
use symgraph::bitcode::{decode, encode_info};
use symgraph::corpus::{Link, LinkRole};
use symgraph::exec::{
    BitcodeExecutionContext, BitcodeStore, CancelToken, Config, ExecutionContext, Executor,
    Strategy,
};
use symgraph::hir::{Batch, BatchBuilder, FunctionInfo, Info, InfoKind, codes};

fn sid(usr: &str) -> SymbolId {
    SymbolId::from_usr(usr).unwrap()
}

fn namespace_batch(ns: SymbolId, name: &str, child: SymbolId) -> Batch {
    let mut builder = BatchBuilder::new();
    let info = builder.get_or_create(ns, InfoKind::Namespace).unwrap();
    info.base_mut().name = name.into();
    builder.get_or_create(child, InfoKind::Function).unwrap();
    builder
        .emplace_child(SymbolId::GLOBAL, ns, InfoKind::Namespace)
        .unwrap();
    builder.emplace_child(ns, child, InfoKind::Function).unwrap();
    builder.finish()
}

#[rstest]
#[case(Strategy::InMemory)]
#[case(Strategy::Bitcode)]
fn test_duplicate_namespace_is_merged(#[case] strategy: Strategy) {
    let n = sid("c:@N@foo");
    let (f1, f2) = (sid("c:@N@foo@F@f1"), sid("c:@N@foo@F@f2"));

    let executor = Executor::new(Config::new().with_strategy(strategy));
    executor.ingest(namespace_batch(n, "foo", f1));
    executor.ingest(namespace_batch(n, "", f2));
    let corpus = executor.finish().unwrap();

    let Info::Namespace(ns) = corpus.get(n).unwrap() else {
        panic!("expected a namespace");
    };
    assert_eq!(ns.base.name, "foo");
    assert_eq!(ns.members.len(), 2);
    assert!(ns.members.contains(&f1) && ns.members.contains(&f2));
    assert_eq!(corpus.qualified_name(corpus.get(f2).unwrap()), "foo::<unnamed>");
    assert!(corpus.unresolved().is_empty());
}

#[rstest]
#[case(Strategy::InMemory)]
#[case(Strategy::Bitcode)]
fn test_child_created_in_later_batch(#[case] strategy: Strategy) {
    let n = sid("c:@N@n");
    let c = sid("c:@N@n@S@C");
    let executor = Executor::new(Config::new().with_strategy(strategy));

    let mut first = BatchBuilder::new();
    first.get_or_create(n, InfoKind::Namespace).unwrap();
    first.emplace_child(SymbolId::GLOBAL, n, InfoKind::Namespace).unwrap();
    assert!(first.emplace_child(n, c, InfoKind::Record).unwrap());
    executor.ingest(first.finish());

    let mut second = BatchBuilder::new();
    second.get_or_create(c, InfoKind::Record).unwrap().base_mut().parents = vec![n];
    executor.ingest(second.finish());

    let corpus = executor.finish().unwrap();
    let Info::Namespace(ns) = corpus.get(n).unwrap() else {
        panic!("expected a namespace");
    };
    assert!(ns.members.contains(&c));
    assert!(!corpus.unresolved().contains(&c));
}

#[rstest]
#[case(Strategy::InMemory)]
#[case(Strategy::Bitcode)]
fn test_missing_symbol_stays_unresolved(#[case] strategy: Strategy) {
    let f = sid("c:@F@f");
    let missing = sid("c:@S@Missing");
    let mut function = FunctionInfo::new(f);
    function.base.name = "f".into();
    function.return_type = symgraph::hir::TypeInfo::new(missing, "Missing");

    let executor = Executor::new(Config::new().with_strategy(strategy));
    executor.ingest(Batch::from_infos([Info::from(function)]));
    let corpus = executor.finish().unwrap();

    assert_eq!(corpus.unresolved(), &[missing]);
    let f = corpus.get(f).unwrap();
    let ty = corpus
        .links(f)
        .into_iter()
        .find(|l| l.role == LinkRole::Type)
        .unwrap();
    assert_eq!(ty.link, Link::Unresolved(missing));
    assert_eq!(ty.text(), "Missing");
    assert!(corpus.diagnostics().iter().any(|d| {
        d.code.as_deref() == Some(codes::UNRESOLVED_REFERENCE) && d.symbol == Some(missing)
    }));
}

#[rstest]
#[case(Strategy::InMemory)]
#[case(Strategy::Bitcode)]
fn test_pending_reference_reported_by_both_strategies(#[case] strategy: Strategy) {
    let f = sid("c:@F@f");
    let never = sid("c:@S@Never");

    let mut builder = BatchBuilder::new();
    builder.get_or_create(f, InfoKind::Function).unwrap();
    builder.add_reference(f, never);

    let executor = Executor::new(Config::new().with_strategy(strategy));
    executor.ingest(builder.finish());
    let corpus = executor.finish().unwrap();

    assert_eq!(corpus.unresolved(), &[never]);
    assert!(corpus.diagnostics().iter().any(|d| {
        d.code.as_deref() == Some(codes::UNRESOLVED_REFERENCE) && d.symbol == Some(never)
    }));
}

#[rstest]
#[case(Strategy::InMemory)]
#[case(Strategy::Bitcode)]
fn test_concurrent_producers(#[case] strategy: Strategy) {
    let n = sid("c:@N@shared");
    let executor = Executor::new(Config::new().with_strategy(strategy).with_threads(4));

    std::thread::scope(|s| {
        for i in 0..8 {
            let executor = &executor;
            s.spawn(move || {
                let child = sid(&format!("c:@N@shared@F@f{i}"));
                executor.ingest(namespace_batch(n, "shared", child));
            });
        }
    });

    let corpus = executor.finish().unwrap();
    let Info::Namespace(ns) = corpus.get(n).unwrap() else {
        panic!("expected a namespace");
    };
    assert_eq!(ns.members.len(), 8);
    // Global namespace, the shared namespace and eight functions.
    assert_eq!(corpus.len(), 10);
}

#[test]
fn test_duplicate_locations_collapse() {
    let mut f = FunctionInfo::new(sid("c:@F@f"));
    f.base.source.locs.push(Location::new("a.h", 10));
    f.base.source.locs.push(Location::new("a.h", 10));
    let infos = decode(&encode_info(&Info::from(f))).unwrap();
    assert_eq!(infos[0].base().source.locs.len(), 1);
}

#[test]
fn test_store_handoff_between_contexts() {
    let dir = tempfile::tempdir().unwrap();
    let store = BitcodeStore::new(dir.path());
    let n = sid("c:@N@foo");
    let (f1, f2) = (sid("c:@N@foo@F@f1"), sid("c:@N@foo@F@f2"));

    // Two "processes" each extract one unit and save it.
    for (name, child) in [("foo", f1), ("", f2)] {
        let producer = BitcodeExecutionContext::new(Config::new());
        producer.ingest(namespace_batch(n, name, child));
        store.save(&producer).unwrap();
    }

    let reducer = BitcodeExecutionContext::new(Config::new());
    let loaded = store.load(&reducer).unwrap();
    // Both units share an identical global namespace record.
    assert_eq!(loaded, reducer.occurrences());
    let corpus = reducer.finish().unwrap();

    let Info::Namespace(ns) = corpus.get(n).unwrap() else {
        panic!("expected a namespace");
    };
    assert_eq!(ns.base.name, "foo");
    assert_eq!(ns.members.len(), 2);
}

#[test]
fn test_cancellation_aborts_reduction() {
    let cancel = CancelToken::new();
    let executor = Executor::new(
        Config::new()
            .with_strategy(Strategy::Bitcode)
            .with_cancel(cancel.clone()),
    );
    executor.ingest(namespace_batch(sid("c:@N@a"), "a", sid("c:@N@a@F@f")));
    cancel.cancel();
    assert!(matches!(executor.finish(), Err(symgraph::ExecError::Cancelled)));
}

#[test]
fn test_conflicting_templates_reported_by_bitcode() {
    use symgraph::hir::{RecordInfo, TemplateInfo, TemplateParam};

    let id = sid("c:@ST>1#T@Box");
    let record = |param: &str| {
        let mut r = RecordInfo::new(id);
        r.template = Some(TemplateInfo {
            params: vec![TemplateParam {
                name: param.into(),
                ..TemplateParam::default()
            }],
            ..TemplateInfo::default()
        });
        Info::from(r)
    };

    let executor = Executor::new(
        Config::new()
            .with_strategy(Strategy::Bitcode)
            .with_check_conflicts(true),
    );
    executor.ingest(Batch::from_infos([record("T")]));
    executor.ingest(Batch::from_infos([record("U")]));
    let corpus = executor.finish().unwrap();

    assert!(corpus.diagnostics().iter().any(|d| {
        d.code.as_deref() == Some(codes::STRUCTURAL_MISMATCH) && d.symbol == Some(id)
    }));
}
