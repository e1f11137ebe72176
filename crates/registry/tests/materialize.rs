//! End-to-end materialization scenarios through the public API.

use std::sync::Arc;
use std::thread;

use pretty_assertions::assert_eq;
use tessera_registry::{
	ActionError, DerivedProjection, MaterializationError, ModelCreator, ModelPath, ModelRegistry,
	ModelType, NodeStatus, RegistryConfig, UnmanagedProjection, ViewError,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CompileOptions {
	optimize: bool,
	args: Vec<String>,
}

fn init_tracing() {
	let _ = tracing_subscriber::fmt::try_init();
}

fn path(s: &str) -> ModelPath {
	ModelPath::parse(s).expect("valid path")
}

fn compile_task() -> ModelCreator {
	ModelCreator::builder(path("tasks.compile"), "CompileRules#compileTask")
		.projection(UnmanagedProjection::<CompileOptions>::new())
		.creation_action(|node| {
			node.set_private_data(CompileOptions::default());
			Ok(())
		})
		.build()
}

#[test]
fn write_then_read_shares_state() {
	init_tracing();
	let registry = ModelRegistry::default();
	registry.register(compile_task()).unwrap();

	let node = registry.materialize(&path("tasks.compile")).unwrap();
	let options = node.as_writable::<CompileOptions>().unwrap();
	options.update(|o| {
		o.optimize = true;
		o.args.push("-Werror".to_string());
	});

	let seen = registry
		.materialize(&path("tasks.compile"))
		.unwrap()
		.as_read_only::<CompileOptions>()
		.unwrap()
		.cloned();
	assert_eq!(
		seen,
		CompileOptions {
			optimize: true,
			args: vec!["-Werror".to_string()],
		}
	);
}

#[test]
fn erased_adapter_returns_same_cell() {
	init_tracing();
	let registry = ModelRegistry::default();
	registry.register(compile_task()).unwrap();
	let node = registry.materialize(&path("tasks.compile")).unwrap();

	let ty = ModelType::of::<CompileOptions>();
	let write = node.adapter().as_writable(ty, &node).unwrap();
	let read = node.adapter().as_read_only(ty, &node).unwrap();
	assert!(Arc::ptr_eq(&write, &read));
}

#[test]
fn plugins_extend_projections_before_realization() {
	init_tracing();
	let registry = ModelRegistry::default();
	let creator = registry.register(compile_task()).unwrap();

	// Another rule contributes a summary view.
	creator
		.add_projection(DerivedProjection::new(|o: &CompileOptions| o.args.len()))
		.unwrap();

	let node = registry.materialize(&path("tasks.compile")).unwrap();
	node.as_writable::<CompileOptions>()
		.unwrap()
		.update(|o| o.args.extend(["-a".to_string(), "-b".to_string()]));
	assert_eq!(*node.as_read_only::<usize>().unwrap().get(), 2);

	let err = creator
		.add_projection(UnmanagedProjection::<String>::new())
		.unwrap_err();
	assert_eq!(
		err.to_string(),
		"cannot add projection to model element 'tasks.compile': element has already been realized"
	);
}

#[test]
fn missing_view_reports_offered_types() {
	init_tracing();
	let registry = ModelRegistry::default();
	registry.register(compile_task()).unwrap();
	let node = registry.materialize(&path("tasks.compile")).unwrap();

	let err = node.as_read_only::<String>().unwrap_err();
	let ViewError::NoView(no_view) = &err else {
		panic!("expected NoView, got {err:?}");
	};
	assert_eq!(no_view.offered(), &[ModelType::of::<CompileOptions>()]);
	assert!(err.to_string().contains("cannot be viewed as read-only String"), "{err}");
}

#[test]
fn dependent_tasks_materialize_in_order() {
	init_tracing();
	let registry = Arc::new(ModelRegistry::default());
	registry.register(compile_task()).unwrap();
	registry
		.register(
			ModelCreator::builder(path("tasks.test"), "TestRules#testTask")
				.projection(UnmanagedProjection::<Vec<String>>::new())
				.creation_action(|node| {
					let compile = node.materialize(&path("tasks.compile"))?;
					let args = compile.as_read_only::<CompileOptions>()?.cloned().args;
					node.set_private_data(args);
					Ok(())
				})
				.build(),
		)
		.unwrap();

	let handles: Vec<_> = (0..4)
		.map(|_| {
			let registry = Arc::clone(&registry);
			thread::spawn(move || registry.materialize(&path("tasks.test")))
		})
		.collect();
	let nodes: Vec<_> = handles
		.into_iter()
		.map(|h| h.join().unwrap().unwrap())
		.collect();
	assert!(nodes.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
	assert_eq!(
		registry.status(&path("tasks.compile")),
		Some(NodeStatus::Realized)
	);
	assert_eq!(
		registry.children(&path("tasks")),
		vec![path("tasks.compile"), path("tasks.test")]
	);
}

#[test]
fn cycle_reports_rules() {
	init_tracing();
	let registry = ModelRegistry::default();
	for (p, target, rule) in [
		("tasks.jar", "tasks.classes", "JarRules#jar"),
		("tasks.classes", "tasks.jar", "JavaRules#classes"),
	] {
		registry
			.register(
				ModelCreator::builder(path(p), rule)
					.creation_action(move |node| {
						node.materialize(&path(target))?;
						Ok(())
					})
					.build(),
			)
			.unwrap();
	}

	let err = registry.materialize(&path("tasks.jar")).unwrap_err();
	assert_eq!(
		err.to_string(),
		"cycle detected while materializing model elements: 'tasks.jar' (JarRules#jar) -> \
		 'tasks.classes' (JavaRules#classes) -> 'tasks.jar' (JarRules#jar)"
	);
	assert!(matches!(
		registry.materialize(&path("tasks.classes")),
		Err(MaterializationError::Cycle(_))
	));
}

#[test]
fn registry_config_from_toml() {
	init_tracing();
	let config = RegistryConfig::from_toml("label = \"build\"\nmax_depth = 2\n").unwrap();
	let registry = ModelRegistry::new(config);
	assert_eq!(registry.config().label, "build");

	for (p, target) in [("a", Some("b")), ("b", Some("c")), ("c", None)] {
		registry
			.register(
				ModelCreator::builder(path(p), "rule")
					.creation_action(move |node| {
						if let Some(target) = target {
							node.materialize(&path(target))?;
						}
						Ok::<(), ActionError>(())
					})
					.build(),
			)
			.unwrap();
	}
	assert!(registry.materialize(&path("a")).is_err());
	assert_eq!(registry.status(&path("b")), Some(NodeStatus::Failed));
	// The refused request never claimed its node.
	assert!(registry.materialize(&path("c")).is_ok());
}
