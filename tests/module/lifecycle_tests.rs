//! Module lifecycle tests
//!
//! Runtime loading of compiled plans: instantiate, register, boot.

use serde_json::json;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use modkit::module::compiler::CompiledPlan;
use modkit::{LoaderContext, ModuleError, ModuleState};

use super::test_utils::*;

fn compiled_fixture(log: &EventLog) -> (ModuleTestFixture, LoaderContext) {
    let fixture = ModuleTestFixture::new().unwrap();
    fixture.create_module("core", "1.0.0", json!({}));
    fixture.create_module("blog", "1.0.0", json!({ "core": "^1.0" }));
    fixture.create_module("shop", "1.0.0", json!({ "core": "^1.0", "blog": "*" }));
    fixture.enable(&["shop", "blog", "core"]);

    let context = fixture.context(recording_registry(&["core", "blog", "shop"], log));
    let report = context.compiler().compile().unwrap();
    assert!(report.is_success(), "{}", report);
    (fixture, context)
}

#[test]
fn test_no_plan_is_a_no_op() {
    let fixture = ModuleTestFixture::new().unwrap();
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let context = fixture.context(recording_registry(&[], &log));
    let mut app = TestApp::new(fixture.base_path());

    let mut loader = context.loader();
    loader.load(&mut app).unwrap();
    loader.boot(&mut app).unwrap();

    assert_eq!(loader.state(), ModuleState::Idle);
    assert!(loader.is_empty());
    assert!(events(&log).is_empty());
}

#[test]
fn test_register_then_boot_in_load_order() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let (fixture, context) = compiled_fixture(&log);
    let mut app = TestApp::new(fixture.base_path());

    let mut loader = context.loader();
    loader.load(&mut app).unwrap();
    assert_eq!(loader.state(), ModuleState::Registered);
    assert_eq!(loader.names(), vec!["core", "blog", "shop"]);
    assert_eq!(
        events(&log),
        vec!["register:core", "register:blog", "register:shop"]
    );

    loader.boot(&mut app).unwrap();
    loader.boot(&mut app).unwrap();
    assert_eq!(loader.state(), ModuleState::Booted);
    assert_eq!(
        events(&log)[3..],
        ["boot:core@1.8.0", "boot:blog@1.8.0", "boot:shop@1.8.0"]
    );
}

#[test]
fn test_loaded_modules_resolve_paths() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let (fixture, context) = compiled_fixture(&log);
    let mut app = TestApp::new(fixture.base_path());

    let mut loader = context.loader();
    loader.load(&mut app).unwrap();

    let blog = loader.get("blog").unwrap();
    let root = fixture.modules_dir.join("blog");
    assert_eq!(blog.manifest().version, "1.0.0");
    assert_eq!(blog.path(""), root);
    assert_eq!(blog.path("/views/index.html"), root.join("views/index.html"));
    assert!(loader.get("missing").is_none());

    // Each bootstrap file registered once
    assert_eq!(loader.bootstrap_files().len(), 3);
}

#[test]
fn test_missing_factory_is_fatal() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let (fixture, _) = compiled_fixture(&log);

    // Same plan, but the host no longer provides a constructor for blog
    let context = fixture.context(recording_registry(&["core", "shop"], &log));
    let mut app = TestApp::new(fixture.base_path());
    let mut loader = context.loader();

    match loader.load(&mut app) {
        Err(ModuleError::EntryNotFound { module, entry }) => {
            assert_eq!(module, "blog");
            assert_eq!(entry, "blog::Module");
        }
        other => panic!("expected EntryNotFound, got {:?}", other.map(|_| ())),
    }
    assert!(events(&log).is_empty());
}

#[test]
fn test_failed_load_stays_failed() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let fixture = ModuleTestFixture::new().unwrap();
    fixture.create_module("core", "1.0.0", json!({}));
    fixture.enable(&["core"]);
    let compiling = fixture.context(recording_registry(&["core"], &log));
    assert!(compiling.compiler().compile().unwrap().is_success());

    // The host registers nothing for core
    let context = fixture.context(recording_registry(&[], &log));
    let mut app = TestApp::new(fixture.base_path());
    let mut loader = context.loader();

    assert!(matches!(
        loader.load(&mut app),
        Err(ModuleError::EntryNotFound { ref module, .. }) if module == "core"
    ));
    assert_eq!(loader.state(), ModuleState::Failed);
    assert!(loader.is_empty());
    assert!(loader.bootstrap_files().is_empty());

    match loader.load(&mut app) {
        Err(ModuleError::InitializationError(cause)) => assert!(cause.contains("core::Module")),
        other => panic!("expected InitializationError, got {:?}", other.map(|_| ())),
    }
    assert!(matches!(
        loader.boot(&mut app),
        Err(ModuleError::InitializationError(_))
    ));
    assert_eq!(loader.state(), ModuleState::Failed);
    assert!(events(&log).is_empty());
}

#[test]
fn test_plan_is_not_revalidated() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let (fixture, context) = compiled_fixture(&log);

    // Hand-edit the plan: disable blog and bump a requirement nothing satisfies
    let mut plan = CompiledPlan::read(&fixture.plan_path()).unwrap().unwrap();
    for module in &mut plan.modules {
        if module["name"] == "blog" {
            module.insert("enabled".to_string(), json!(false));
        }
        if module["name"] == "shop" {
            module.insert("requires".to_string(), json!({ "host": "^99.0" }));
        }
    }
    plan.write(&fixture.plan_path()).unwrap();

    let mut app = TestApp::new(fixture.base_path());
    let mut loader = context.loader();
    loader.load(&mut app).unwrap();
    assert_eq!(loader.names(), vec!["core", "shop"]);
}

#[test]
fn test_factory_receives_module_root() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let fixture = ModuleTestFixture::new().unwrap();
    fixture.create_module("core", "1.0.0", json!({}));
    fixture.enable(&["core"]);

    let seen: Arc<Mutex<Option<PathBuf>>> = Arc::new(Mutex::new(None));
    let mut registry = recording_registry(&[], &log);
    let seen_in_factory = Arc::clone(&seen);
    let log_in_factory = Arc::clone(&log);
    registry.register(entry_for("core"), move |root, manifest: &modkit::Manifest| {
        *seen_in_factory.lock().unwrap() = Some(root.clone());
        Box::new(RecordingModule {
            manifest: manifest.clone(),
            root,
            log: Arc::clone(&log_in_factory),
        }) as Box<dyn modkit::Module>
    });

    let context = LoaderContext::new(fixture.config(), registry);
    assert!(context.compiler().compile().unwrap().is_success());

    let mut app = TestApp::new(fixture.base_path());
    let mut loader = context.loader();
    loader.load(&mut app).unwrap();

    assert_eq!(
        seen.lock().unwrap().clone(),
        Some(fixture.modules_dir.join("core"))
    );
}
