use trellis_core::artifact::{Artifact, ConflictId, Exclusion};
use trellis_core::filter::ScopeFilter;
use trellis_core::managed::{ManagedArtifact, ManagedVersions};
use trellis_core::repository::Repository;
use trellis_core::scope::Scope;
use trellis_resolver::conflict::ConflictReport;
use trellis_resolver::error::OverConstrainedReason;
use trellis_resolver::node::ResolutionTree;
use trellis_resolver::{
    collect, CollectRequest, ResolutionError, ResolutionEvent, ResolutionListener,
    StaticSource, TracingListener,
};

#[derive(Default)]
struct Recorder {
    events: Vec<ResolutionEvent>,
}

impl ResolutionListener for Recorder {
    fn on_event(&mut self, _tree: &ResolutionTree, event: &ResolutionEvent) {
        self.events.push(event.clone());
    }
}

fn dep(coordinate: &str) -> Artifact {
    Artifact::parse(coordinate).unwrap()
}

fn request() -> CollectRequest {
    CollectRequest::new(dep("com.example:app:1.0"))
        .with_local_repository(Repository::new("local", "/tmp/trellis-test-repo"))
}

fn summary(result: &trellis_resolver::ResolutionResult) -> Vec<(String, Scope)> {
    result
        .artifacts()
        .iter()
        .map(|a| (a.id(), a.effective_scope()))
        .collect()
}

#[test]
fn nearest_declaration_wins() {
    let mut source = StaticSource::new();
    source.add("org.a:a:1.0", &["org.x:x:1.0"]).unwrap();
    source.add("org.b:b:1.0", &["org.c:c:1.0"]).unwrap();
    source.add("org.c:c:1.0", &["org.x:x:2.0"]).unwrap();

    let req = request()
        .with_dependency(dep("org.a:a:1.0"))
        .with_dependency(dep("org.b:b:1.0"));
    let mut report = ConflictReport::new();
    let result = collect(req, &source, &mut [&mut report]).unwrap();

    assert_eq!(result.len(), 4);
    assert_eq!(result.find("org.x", "x").unwrap().version(), Some("1.0"));
    assert_eq!(report.len(), 1);
    assert_eq!(report.conflicts[0].requested, "2.0");
    assert_eq!(report.conflicts[0].resolved, "1.0");
}

#[test]
fn nearest_wins_when_discovered_last() {
    let mut source = StaticSource::new();
    source.add("org.a:a:1.0", &["org.x:x:1.0"]).unwrap();
    source.add("org.b:b:1.0", &["org.c:c:1.0"]).unwrap();
    source.add("org.c:c:1.0", &["org.x:x:2.0"]).unwrap();

    let req = request()
        .with_dependency(dep("org.b:b:1.0"))
        .with_dependency(dep("org.a:a:1.0"));
    let result = collect(req, &source, &mut []).unwrap();

    let x = result.find("org.x", "x").unwrap();
    assert_eq!(x.version(), Some("1.0"));
    assert_eq!(
        x.dependency_trail(),
        &["com.example:app:jar:1.0", "org.a:a:jar:1.0", "org.x:x:jar:1.0"]
    );
}

#[test]
fn one_artifact_per_conflict_id() {
    let mut source = StaticSource::new();
    source.add("org.a:a:1.0", &["org.x:x:1.0", "org.y:y:1.0"]).unwrap();
    source.add("org.b:b:1.0", &["org.x:x:1.1", "org.y:y:1.1"]).unwrap();
    source.add("org.y:y:1.1", &["org.x:x:1.2"]).unwrap();

    let req = request()
        .with_dependency(dep("org.a:a:1.0"))
        .with_dependency(dep("org.b:b:1.0"))
        .with_dependency(dep("org.x:x:0.9"));
    let result = collect(req, &source, &mut []).unwrap();

    let mut ids: Vec<ConflictId> = result.artifacts().iter().map(|a| a.conflict_id()).collect();
    let total = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), total);
    assert_eq!(result.find("org.x", "x").unwrap().version(), Some("0.9"));
}

#[test]
fn farther_compile_scope_widens_nearer_test_scope() {
    let mut source = StaticSource::new();
    source.add("org.t:testkit:1.0", &["org.x:x:1.0"]).unwrap();
    source.add("org.a:a:1.0", &["org.b:b:1.0"]).unwrap();
    source.add("org.b:b:1.0", &["org.x:x:2.0"]).unwrap();

    let req = request()
        .with_dependency(dep("org.t:testkit:1.0").with_scope(Scope::Test))
        .with_dependency(dep("org.a:a:1.0"));
    let mut recorder = Recorder::default();
    let result = collect(req, &source, &mut [&mut recorder]).unwrap();

    let x = result.find("org.x", "x").unwrap();
    assert_eq!(x.version(), Some("1.0"));
    assert_eq!(x.effective_scope(), Scope::Compile);
    assert_eq!(x.dependency_trail().len(), 4);
    assert!(recorder.events.iter().any(|e| matches!(
        e,
        ResolutionEvent::UpdateScope {
            from: Scope::Test,
            to: Scope::Compile,
            ..
        }
    )));
}

#[test]
fn farther_runtime_scope_widens_nearer_provided_scope() {
    let mut source = StaticSource::new();
    source.add("org.p:container:1.0", &["org.x:x:1.0"]).unwrap();
    source.add("org.a:a:1.0", &["org.b:b:1.0"]).unwrap();
    source
        .insert(
            &dep("org.b:b:1.0"),
            vec![dep("org.x:x:2.0").with_scope(Scope::Runtime)],
        )
        .unwrap();

    let req = request()
        .with_dependency(dep("org.p:container:1.0").with_scope(Scope::Provided))
        .with_dependency(dep("org.a:a:1.0"));
    let mut report = ConflictReport::new();
    let result = collect(req, &source, &mut [&mut report]).unwrap();

    let x = result.find("org.x", "x").unwrap();
    assert_eq!(x.version(), Some("1.0"));
    assert_eq!(x.effective_scope(), Scope::Runtime);
    assert_eq!(report.len(), 1);
    assert_eq!(report.conflicts[0].requested, "2.0");
    assert_eq!(report.conflicts[0].resolved, "1.0");
    assert_eq!(report.conflicts[0].reason, "scope runtime required (depth 3)");
}

#[test]
fn equal_depth_keeps_the_first_declaration() {
    let mut source = StaticSource::new();
    source.add("org.b:b:1.0", &["org.x:x:2.0"]).unwrap();
    source.add("org.a:a:1.0", &["org.x:x:1.0"]).unwrap();

    let req = request()
        .with_dependency(dep("org.b:b:1.0"))
        .with_dependency(dep("org.a:a:1.0"));
    let result = collect(req, &source, &mut []).unwrap();

    let x = result.find("org.x", "x").unwrap();
    assert_eq!(x.version(), Some("2.0"));
    assert_eq!(x.dependency_trail()[1], "org.b:b:jar:1.0");
}

#[test]
fn widened_pin_does_not_override_a_nearer_range() {
    let mut source = StaticSource::new();
    source.add_versions(&ConflictId::parse("org.x:x").unwrap(), &["1.0", "2.0", "3.5"]);
    source.add("org.p:p:1.0", &["org.x:x:1.0"]).unwrap();
    source.add("org.q:q:1.0", &["org.r:r:1.0"]).unwrap();
    source.add("org.r:r:1.0", &["org.x:x:2.0"]).unwrap();
    source.add("org.v:v:1.0", &["org.x:x:[3.0,4.0)"]).unwrap();

    let req = request()
        .with_dependency(dep("org.p:p:1.0").with_scope(Scope::Test))
        .with_dependency(dep("org.q:q:1.0"))
        .with_dependency(dep("org.v:v:1.0"));
    let result = collect(req, &source, &mut []).unwrap();

    let x = result.find("org.x", "x").unwrap();
    assert_eq!(x.version(), Some("3.5"));
    assert_eq!(x.effective_scope(), Scope::Compile);
    assert_eq!(x.dependency_trail()[1], "org.v:v:jar:1.0");
}

#[test]
fn disjoint_ranges_are_over_constrained() {
    let mut source = StaticSource::new();
    source.add_versions(&ConflictId::parse("org.x:x").unwrap(), &["1.5", "3.5"]);
    source.add("org.a:a:1.0", &["org.x:x:[1.0,2.0)"]).unwrap();
    source.add("org.b:b:1.0", &["org.x:x:[3.0,4.0)"]).unwrap();

    let req = request()
        .with_dependency(dep("org.a:a:1.0"))
        .with_dependency(dep("org.b:b:1.0"));
    let err = collect(req, &source, &mut []).unwrap_err();

    match err {
        ResolutionError::OverConstrainedVersion {
            ref reason,
            ref trail,
            ..
        } => {
            assert_eq!(*reason, OverConstrainedReason::NoMatchingVersion);
            assert_eq!(trail[1], "org.a:a:jar:1.0");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn project_declared_scope_is_never_widened() {
    let mut source = StaticSource::new();
    source.add("org.a:a:1.0", &["org.x:x:2.0"]).unwrap();

    let req = request()
        .with_dependency(dep("org.x:x:1.0").with_scope(Scope::Test))
        .with_dependency(dep("org.a:a:1.0"));
    let mut recorder = Recorder::default();
    let result = collect(req, &source, &mut [&mut recorder]).unwrap();

    let x = result.find("org.x", "x").unwrap();
    assert_eq!(x.version(), Some("1.0"));
    assert_eq!(x.effective_scope(), Scope::Test);
    assert!(recorder.events.iter().any(|e| matches!(
        e,
        ResolutionEvent::UpdateScopeBlocked {
            wanted: Scope::Compile,
            ..
        }
    )));
    assert!(!recorder
        .events
        .iter()
        .any(|e| matches!(e, ResolutionEvent::UpdateScope { .. })));
}

#[test]
fn cycle_is_pruned_not_fatal() {
    let mut source = StaticSource::new();
    source.add("org.a:a:1.0", &["org.b:b:1.0"]).unwrap();
    source.add("org.b:b:1.0", &["org.a:a:2.0"]).unwrap();

    let req = request().with_dependency(dep("org.a:a:1.0"));
    let mut recorder = Recorder::default();
    let result = collect(req, &source, &mut [&mut recorder]).unwrap();

    assert_eq!(result.find("org.a", "a").unwrap().version(), Some("1.0"));
    assert!(recorder.events.iter().any(|e| matches!(
        e,
        ResolutionEvent::OmitForCycle { artifact, .. } if artifact == "org.a:a:jar:2.0"
    )));
}

#[test]
fn cycle_back_to_the_project_terminates() {
    let mut source = StaticSource::new();
    source.add("org.a:a:1.0", &["org.b:b:1.0", "org.c:c:1.0"]).unwrap();
    source.add("org.c:c:1.0", &["com.example:app:0.5"]).unwrap();

    let req = request().with_dependency(dep("org.a:a:1.0"));
    let result = collect(req, &source, &mut []).unwrap();
    assert!(result.find("org.b", "b").is_some());
    assert!(result.find("com.example", "app").is_none());
}

#[test]
fn optional_transitive_dependency_is_dropped_with_its_subtree() {
    let mut source = StaticSource::new();
    source
        .insert(
            &dep("org.a:a:1.0"),
            vec![dep("org.opt:extra:1.0").with_optional(true)],
        )
        .unwrap();
    source.add("org.opt:extra:1.0", &["org.b:b:1.0"]).unwrap();

    let req = request().with_dependency(dep("org.a:a:1.0"));
    let result = collect(req, &source, &mut []).unwrap();

    assert_eq!(result.len(), 1);
    assert!(result.find("org.opt", "extra").is_none());
    assert!(result.find("org.b", "b").is_none());
}

#[test]
fn optional_direct_dependency_is_kept() {
    let mut source = StaticSource::new();
    source.add("org.opt:extra:1.0", &["org.b:b:1.0"]).unwrap();

    let req = request().with_dependency(dep("org.opt:extra:1.0").with_optional(true));
    let result = collect(req, &source, &mut []).unwrap();

    assert!(result.find("org.opt", "extra").is_some());
    assert!(result.find("org.b", "b").is_some());
}

#[test]
fn excluded_relocation_drops_subtree_silently() {
    let mut source = StaticSource::new();
    source.add("org.a:a:1.0", &["org.moved:old:1.0", "org.c:c:1.0"]).unwrap();
    source.add("org.moved:old:1.0", &["org.d:d:1.0"]).unwrap();
    source.exclude("org.moved:old:1.0").unwrap();

    let req = request().with_dependency(dep("org.a:a:1.0"));
    let result = collect(req, &source, &mut []).unwrap();

    let names: Vec<&str> = result.artifacts().iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["a", "c"]);
}

#[test]
fn exclusions_apply_to_the_whole_subtree() {
    let mut source = StaticSource::new();
    source.add("org.a:a:1.0", &["org.b:b:1.0"]).unwrap();
    source.add("org.b:b:1.0", &["org.legacy:log:1.0", "org.c:c:1.0"]).unwrap();

    let a = dep("org.a:a:1.0").with_exclusion(Exclusion::parse("org.legacy").unwrap());
    let result = collect(request().with_dependency(a), &source, &mut []).unwrap();

    assert!(result.find("org.legacy", "log").is_none());
    assert!(result.find("org.c", "c").is_some());
}

#[test]
fn range_intersects_with_soft_version() {
    let mut source = StaticSource::new();
    source.add_versions(&ConflictId::parse("org.x:x").unwrap(), &["1.0", "1.5", "1.9"]);
    source.add("org.y:y:1.0", &["org.x:x:1.5"]).unwrap();

    let req = request()
        .with_dependency(dep("org.x:x:[1.0,2.0)").with_scope(Scope::Compile))
        .with_dependency(dep("org.y:y:1.0").with_scope(Scope::Test));
    let mut recorder = Recorder::default();
    let result = collect(req, &source, &mut [&mut recorder]).unwrap();

    let x = result.find("org.x", "x").unwrap();
    assert_eq!(x.version(), Some("1.5"));
    assert_eq!(x.effective_scope(), Scope::Compile);
    assert_eq!(result.len(), 2);

    let selected: Vec<&str> = recorder
        .events
        .iter()
        .filter_map(|e| match e {
            ResolutionEvent::SelectVersionFromRange { version, .. } => Some(version.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(selected, vec!["1.9"]);
    assert!(recorder
        .events
        .iter()
        .any(|e| matches!(e, ResolutionEvent::RestrictRange { .. })));
}

#[test]
fn overlapping_ranges_select_from_the_intersection() {
    let mut source = StaticSource::new();
    source.add_versions(&ConflictId::parse("org.x:x").unwrap(), &["1.0", "1.5", "1.9"]);
    source.add("org.a:a:1.0", &["org.x:x:[1.0,1.5]"]).unwrap();

    let req = request()
        .with_dependency(dep("org.x:x:[1.0,2.0)"))
        .with_dependency(dep("org.a:a:1.0"));
    let result = collect(req, &source, &mut []).unwrap();
    assert_eq!(result.find("org.x", "x").unwrap().version(), Some("1.5"));
}

#[test]
fn empty_repository_is_over_constrained() {
    let source = StaticSource::new();
    let req = request().with_dependency(dep("org.x:x:[1.0,2.0)"));
    let err = collect(req, &source, &mut []).unwrap_err();

    match err {
        ResolutionError::OverConstrainedVersion {
            ref reason,
            ref trail,
            ..
        } => {
            assert_eq!(*reason, OverConstrainedReason::NoVersionsAvailable);
            assert_eq!(trail, &["com.example:app:jar:1.0", "org.x:x:jar:[1.0,2.0)"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn no_matching_version_reports_candidates_and_trail() {
    let mut source = StaticSource::new();
    source.add("org.a:a:1.0", &["org.x:x:[5.0,)"]).unwrap();
    source.add_versions(&ConflictId::parse("org.x:x").unwrap(), &["1.0", "2.0"]);

    let req = request().with_dependency(dep("org.a:a:1.0"));
    let err = collect(req, &source, &mut []).unwrap_err();

    assert_eq!(err.trail().len(), 3);
    assert_eq!(err.trail()[1], "org.a:a:jar:1.0");
    let message = err.to_string();
    assert!(message.contains("[1.0, 2.0]"), "got: {message}");
    assert!(message.contains("[5.0,)"), "got: {message}");
}

#[test]
fn metadata_failure_carries_trail() {
    let mut source = StaticSource::new();
    source.add("org.a:a:1.0", &["org.b:b:1.0"]).unwrap();
    source.fail("org.b:b:jar:1.0", "connection reset");

    let req = request().with_dependency(dep("org.a:a:1.0"));
    let err = collect(req, &source, &mut []).unwrap_err();

    assert!(matches!(err, ResolutionError::MetadataRetrieval { .. }));
    assert_eq!(
        err.trail(),
        &["com.example:app:jar:1.0", "org.a:a:jar:1.0", "org.b:b:jar:1.0"]
    );
    assert!(err.to_string().contains("connection reset"));
}

#[test]
fn managed_versions_scopes_and_exclusions() {
    let mut source = StaticSource::new();
    source.add("org.a:a:1.0", &["org.x:x:1.0", "org.c:c:1.0"]).unwrap();
    source.add("org.c:c:2.0", &["org.d:d:1.0"]).unwrap();

    let mut managed = ManagedVersions::new();
    managed.insert(
        ConflictId::parse("org.a:a").unwrap(),
        ManagedArtifact {
            exclusions: vec![Exclusion::parse("org.x").unwrap()],
            ..Default::default()
        },
    );
    managed.insert(
        ConflictId::parse("org.c:c").unwrap(),
        ManagedArtifact {
            version: Some("2.0".into()),
            scope: Some(Scope::Runtime),
            exclusions: Vec::new(),
        },
    );

    let req = request()
        .with_dependency(dep("org.a:a:1.0"))
        .with_managed(managed);
    let mut recorder = Recorder::default();
    let result = collect(req, &source, &mut [&mut recorder]).unwrap();

    assert!(result.find("org.x", "x").is_none());
    let c = result.find("org.c", "c").unwrap();
    assert_eq!(c.version(), Some("2.0"));
    assert_eq!(c.effective_scope(), Scope::Runtime);
    // metadata of the managed version is used
    assert!(result.find("org.d", "d").is_some());

    let managed_events = recorder
        .events
        .iter()
        .filter(|e| {
            matches!(
                e,
                ResolutionEvent::ManageVersion { .. } | ResolutionEvent::ManageScope { .. }
            )
        })
        .count();
    assert_eq!(managed_events, 2);
}

#[test]
fn scope_filter_limits_result() {
    let mut source = StaticSource::new();
    source
        .insert(
            &dep("org.a:a:1.0"),
            vec![dep("org.r:r:1.0").with_scope(Scope::Runtime)],
        )
        .unwrap();

    let req = request()
        .with_dependency(dep("org.a:a:1.0"))
        .with_dependency(dep("org.t:t:1.0").with_scope(Scope::Test))
        .with_filter(ScopeFilter::new(Scope::Runtime));
    let result = collect(req, &source, &mut []).unwrap();

    assert_eq!(
        summary(&result),
        vec![
            ("org.a:a:jar:1.0".to_string(), Scope::Compile),
            ("org.r:r:jar:1.0".to_string(), Scope::Runtime),
        ]
    );
}

#[test]
fn listeners_do_not_change_the_result() {
    let build = || {
        let mut source = StaticSource::new();
        source.add("org.t:testkit:1.0", &["org.x:x:1.0"]).unwrap();
        source.add("org.a:a:1.0", &["org.b:b:1.0"]).unwrap();
        source.add("org.b:b:1.0", &["org.x:x:2.0", "org.t:testkit:2.0"]).unwrap();
        let req = request()
            .with_dependency(dep("org.t:testkit:1.0").with_scope(Scope::Test))
            .with_dependency(dep("org.a:a:1.0"));
        (source, req)
    };

    let (source, req) = build();
    let quiet = collect(req, &source, &mut []).unwrap();

    let (source, req) = build();
    let mut recorder = Recorder::default();
    let mut logger = TracingListener::new();
    let mut report = ConflictReport::new();
    let observed = collect(
        req,
        &source,
        &mut [&mut recorder, &mut logger, &mut report],
    )
    .unwrap();

    assert_eq!(summary(&quiet), summary(&observed));
    assert!(!recorder.events.is_empty());
}

#[test]
fn every_included_node_is_tested_first() {
    let mut source = StaticSource::new();
    source.add("org.a:a:1.0", &["org.b:b:1.0"]).unwrap();

    let req = request().with_dependency(dep("org.a:a:1.0"));
    let mut recorder = Recorder::default();
    let result = collect(req, &source, &mut [&mut recorder]).unwrap();

    for &id in result.node_ids() {
        let tested = recorder
            .events
            .iter()
            .position(|e| *e == ResolutionEvent::Tested { node: id })
            .unwrap();
        let included = recorder
            .events
            .iter()
            .position(|e| *e == ResolutionEvent::Include { node: id })
            .unwrap();
        assert!(tested < included);
    }
    let starts = recorder
        .events
        .iter()
        .filter(|e| matches!(e, ResolutionEvent::StartChildren { .. }))
        .count();
    let finishes = recorder
        .events
        .iter()
        .filter(|e| matches!(e, ResolutionEvent::FinishChildren { .. }))
        .count();
    assert_eq!(starts, finishes);
}

#[test]
fn graph_renders_resolved_tree() {
    let mut source = StaticSource::new();
    source.add("org.a:a:1.0", &["org.x:x:1.0"]).unwrap();
    source.add("org.b:b:1.0", &["org.x:x:2.0"]).unwrap();

    let req = request()
        .with_dependency(dep("org.a:a:1.0"))
        .with_dependency(dep("org.b:b:1.0"));
    let result = collect(req, &source, &mut []).unwrap();
    let graph = result.graph();

    assert_eq!(graph.len(), 3);
    assert_eq!(
        graph.print_tree(None),
        "com.example:app:1.0\n├── org.a:a:1.0\n│   └── org.x:x:1.0\n└── org.b:b:1.0\n"
    );
    let path = graph.find_path("x").unwrap();
    let names: Vec<&str> = path.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["app", "a", "x"]);
}
