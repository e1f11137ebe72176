use std::collections::BTreeSet;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use tessera_primitives::ModelPath;

use super::*;
use crate::error::ViewError;
use crate::projection::{DerivedProjection, UnmanagedProjection};

fn path(s: &str) -> ModelPath {
	ModelPath::parse(s).unwrap()
}

fn leaf(p: &str) -> ModelCreator {
	ModelCreator::builder(path(p), "rule").build()
}

fn hidden_leaf(p: &str) -> ModelCreator {
	ModelCreator::builder(path(p), "rule").hidden(true).build()
}

#[test]
fn test_unknown_path() {
	let registry = ModelRegistry::default();
	let err = registry.materialize(&path("nope")).unwrap_err();
	assert!(matches!(err, MaterializationError::UnknownPath { .. }));
	assert_eq!(err.to_string(), "no model element is registered at 'nope'");
	assert!(registry.lookup(&path("nope")).is_none());
	assert_eq!(registry.status(&path("nope")), None);
}

#[test]
fn test_lookup_tracks_lifecycle() {
	let registry = ModelRegistry::default();
	let creator = registry.register(leaf("a")).unwrap();

	assert!(matches!(
		registry.lookup(&path("a")),
		Some(ModelEntry::Creator(c)) if Arc::ptr_eq(&c, &creator)
	));
	assert_eq!(registry.status(&path("a")), Some(NodeStatus::Registered));

	let node = registry.materialize(&path("a")).unwrap();
	assert!(matches!(
		registry.lookup(&path("a")),
		Some(ModelEntry::Node(n)) if Arc::ptr_eq(&n, &node)
	));
	assert_eq!(registry.status(&path("a")), Some(NodeStatus::Realized));

	// Idempotent.
	let again = registry.materialize(&path("a")).unwrap();
	assert!(Arc::ptr_eq(&node, &again));

	// The realized node carries the creator's ephemeral flag.
	assert!(!node.is_ephemeral());
	registry
		.register(
			ModelCreator::builder(path("scratch"), "rule")
				.ephemeral(true)
				.build(),
		)
		.unwrap();
	assert!(registry.materialize(&path("scratch")).unwrap().is_ephemeral());
}

#[test]
fn test_lookup_does_not_materialize() {
	let registry = ModelRegistry::default();
	registry
		.register(
			ModelCreator::builder(path("lazy"), "rule")
				.creation_action(|_| Err(ActionError::msg("should not run")))
				.build(),
		)
		.unwrap();
	registry.lookup(&path("lazy"));
	registry.creator(&path("lazy"));
	assert_eq!(registry.status(&path("lazy")), Some(NodeStatus::Registered));
}

#[test]
fn test_status_materializing_inside_own_action() {
	let registry = ModelRegistry::default();
	registry
		.register(
			ModelCreator::builder(path("self"), "rule")
				.creation_action(|node| {
					let status = node.registry().status(node.path());
					if status == Some(NodeStatus::Materializing) {
						Ok(())
					} else {
						Err(ActionError::msg(format!("unexpected status {status:?}")))
					}
				})
				.build(),
		)
		.unwrap();
	registry.materialize(&path("self")).unwrap();
}

#[test]
fn test_paths_in_order() {
	let registry = ModelRegistry::default();
	for p in ["b", "a.z", "a", "a.b"] {
		registry.register(leaf(p)).unwrap();
	}
	assert_eq!(
		registry.paths(),
		vec![path("a"), path("a.b"), path("a.z"), path("b")]
	);
	assert_eq!(registry.len(), 4);
	assert!(!registry.is_empty());
}

#[test]
fn test_children_are_direct_and_ordered() {
	let registry = ModelRegistry::default();
	for p in ["tasks", "tasks.compile", "tasks.compile.options", "tasks.assemble", "tasks0", "other"] {
		registry.register(leaf(p)).unwrap();
	}
	assert_eq!(
		registry.children(&path("tasks")),
		vec![path("tasks.assemble"), path("tasks.compile")]
	);
	assert_eq!(
		registry.children(&ModelPath::root()),
		vec![path("other"), path("tasks"), path("tasks0")]
	);
	assert!(registry.children(&path("missing")).is_empty());
}

#[test]
fn test_children_skip_hidden() {
	let registry = ModelRegistry::default();
	registry.register(leaf("tasks.visible")).unwrap();
	registry.register(hidden_leaf("tasks.declared")).unwrap();
	registry
		.register(
			ModelCreator::builder(path("tasks.stamped"), "rule")
				.registration_action(|node| {
					node.set_hidden(true);
					Ok(())
				})
				.build(),
		)
		.unwrap();

	// Before realization only the declared flag is known.
	assert_eq!(
		registry.children(&path("tasks")),
		vec![path("tasks.stamped"), path("tasks.visible")]
	);
	registry.materialize(&path("tasks.stamped")).unwrap();
	assert_eq!(registry.children(&path("tasks")), vec![path("tasks.visible")]);
	assert_eq!(
		registry.all_children(&path("tasks")),
		vec![path("tasks.declared"), path("tasks.stamped"), path("tasks.visible")]
	);
}

#[test]
fn test_list_hidden_config() {
	let registry = ModelRegistry::new(RegistryConfig {
		list_hidden: true,
		..RegistryConfig::default()
	});
	registry.register(hidden_leaf("x.h")).unwrap();
	assert_eq!(registry.children(&path("x")), vec![path("x.h")]);
}

#[test]
fn test_nested_materialization_sees_dependency() {
	let registry = ModelRegistry::default();
	registry
		.register(
			ModelCreator::builder(path("base"), "rule")
				.projection(UnmanagedProjection::<u32>::new())
				.creation_action(|node| {
					node.set_private_data(20u32);
					Ok(())
				})
				.build(),
		)
		.unwrap();
	registry
		.register(
			ModelCreator::builder(path("derived"), "rule")
				.projection(UnmanagedProjection::<u32>::new())
				.creation_action(|node| {
					let base = node.materialize(&path("base"))?;
					let value = *base.as_read_only::<u32>()?.get();
					node.set_private_data(value + 1);
					Ok(())
				})
				.build(),
		)
		.unwrap();

	let node = registry.materialize(&path("derived")).unwrap();
	assert_eq!(*node.as_read_only::<u32>().unwrap().get(), 21);
	assert_eq!(registry.status(&path("base")), Some(NodeStatus::Realized));
}

#[test]
fn test_action_error_names_rule_and_position() {
	let registry = ModelRegistry::default();
	registry
		.register(
			ModelCreator::builder(path("tasks.compile"), "CompileRules#tasks")
				.creation_action(|_| Ok(()))
				.creation_action_with("CompileRules#configure".into(), |_| {
					Err(ActionError::msg("bad option"))
				})
				.build(),
		)
		.unwrap();

	let err = registry.materialize(&path("tasks.compile")).unwrap_err();
	let MaterializationError::Initializer(failure) = &err else {
		panic!("expected an initializer failure, got {err:?}");
	};
	assert_eq!(failure.descriptor.as_str(), "CompileRules#configure");
	assert_eq!(failure.phase, ActionPhase::Creation);
	assert_eq!(failure.index, 1);
	assert_eq!(failure.source.to_string(), "bad option");
	assert_eq!(
		err.to_string(),
		"exception thrown while executing model rule: CompileRules#configure \
		 (creation action #1 of 'tasks.compile')"
	);
}

#[test]
fn test_nested_failure_is_wrapped_not_cycle() {
	let registry = ModelRegistry::default();
	registry
		.register(
			ModelCreator::builder(path("dep"), "dep rule")
				.creation_action(|_| Err(ActionError::msg("dep failed")))
				.build(),
		)
		.unwrap();
	registry
		.register(
			ModelCreator::builder(path("user"), "user rule")
				.creation_action(|node| {
					node.materialize(&path("dep"))?;
					Ok(())
				})
				.build(),
		)
		.unwrap();

	let err = registry.materialize(&path("user")).unwrap_err();
	let MaterializationError::Initializer(outer) = &err else {
		panic!("expected an initializer failure, got {err:?}");
	};
	assert_eq!(outer.path, path("user"));
	assert!(matches!(
		outer.source.as_ref(),
		ActionError::Materialization(MaterializationError::Initializer(inner))
			if inner.path == path("dep")
	));
}

#[test]
fn test_cycle_through_bystander_is_wrapped() {
	let registry = ModelRegistry::default();
	for (p, target) in [("a", "b"), ("b", "a")] {
		registry
			.register(
				ModelCreator::builder(path(p), "rule")
					.creation_action(move |node| {
						node.materialize(&path(target))?;
						Ok(())
					})
					.build(),
			)
			.unwrap();
	}
	registry
		.register(
			ModelCreator::builder(path("c"), "rule")
				.creation_action(|node| {
					node.materialize(&path("a"))?;
					Ok(())
				})
				.build(),
		)
		.unwrap();

	let err = registry.materialize(&path("c")).unwrap_err();
	assert!(!err.is_cycle(), "{err}");
	assert!(registry.materialize(&path("a")).unwrap_err().is_cycle());
}

#[test]
fn test_views_share_state() {
	let registry = ModelRegistry::default();
	registry
		.register(
			ModelCreator::builder(path("list"), "rule")
				.projection(UnmanagedProjection::<Vec<String>>::new())
				.creation_action(|node| {
					node.set_private_data(Vec::<String>::new());
					Ok(())
				})
				.build(),
		)
		.unwrap();
	let node = registry.materialize(&path("list")).unwrap();

	let reader = node.as_read_only::<Vec<String>>().unwrap();
	let writer = node.as_writable::<Vec<String>>().unwrap();
	assert!(reader.shares_state_with(&writer));
	writer.update(|v| v.push("x".to_string()));
	assert_eq!(reader.cloned(), vec!["x".to_string()]);
	assert_eq!(writer.read_only().cloned(), vec!["x".to_string()]);
}

#[test]
fn test_view_without_backing_state() {
	let registry = ModelRegistry::default();
	registry
		.register(
			ModelCreator::builder(path("empty"), "rule")
				.projection(UnmanagedProjection::<u32>::new())
				.build(),
		)
		.unwrap();
	let node = registry.materialize(&path("empty")).unwrap();
	assert!(matches!(
		node.as_read_only::<u32>().unwrap_err(),
		ViewError::Uninitialized { .. }
	));
}

#[test]
fn test_derived_projection_reads_from_backing_state() {
	let registry = ModelRegistry::default();
	registry
		.register(
			ModelCreator::builder(path("name"), "rule")
				.projection(UnmanagedProjection::<String>::new())
				.projection(DerivedProjection::new(|s: &String| s.len()))
				.creation_action(|node| {
					node.set_private_data(String::from("compile"));
					Ok(())
				})
				.build(),
		)
		.unwrap();
	let node = registry.materialize(&path("name")).unwrap();
	assert_eq!(*node.as_read_only::<usize>().unwrap().get(), 7);
	assert!(node.as_writable::<usize>().is_err());
}

#[test]
fn test_actions_can_extend_own_projections() {
	let registry = ModelRegistry::default();
	registry
		.register(
			ModelCreator::builder(path("ext"), "rule")
				.creation_action(|node| {
					node.set_private_data(5i64);
					node.add_projection(UnmanagedProjection::<i64>::read_only())?;
					Ok(())
				})
				.build(),
		)
		.unwrap();
	let node = registry.materialize(&path("ext")).unwrap();
	assert_eq!(*node.as_read_only::<i64>().unwrap().get(), 5);
}

#[test]
fn test_private_data_helpers() {
	let registry = ModelRegistry::default();
	registry
		.register(
			ModelCreator::builder(path("counter"), "rule")
				.registration_action(|node| {
					node.set_private_data(1u32);
					Ok(())
				})
				.creation_action(|node| {
					node.update_private_data(|v: &mut u32| *v += 1)
						.ok_or_else(|| ActionError::msg("missing state"))?;
					let doubled = node
						.with_private_data(|v: &u32| *v * 2)
						.ok_or_else(|| ActionError::msg("missing state"))?;
					node.set_private_data(doubled);
					// Wrong type is not an error, just absent.
					if node.with_private_data(|_: &String| ()).is_some() {
						return Err(ActionError::msg("type confusion"));
					}
					Ok(())
				})
				.build(),
		)
		.unwrap();
	let node = registry.materialize(&path("counter")).unwrap();
	assert_eq!(node.private_data_type(), Some(tessera_primitives::ModelType::of::<u32>()));
	assert_eq!(*node.private_data::<u32>().unwrap().read(), 4);
}

fn segment() -> impl Strategy<Value = String> {
	"[a-z][a-z0-9_]{0,3}"
}

fn model_path() -> impl Strategy<Value = ModelPath> {
	prop::collection::vec(segment(), 1..4)
		.prop_map(|segments| ModelPath::from_segments(segments).unwrap())
}

proptest! {
	#[test]
	fn registration_conflicts_exactly_on_repeats(paths in prop::collection::vec(model_path(), 1..24)) {
		let registry = ModelRegistry::default();
		let mut seen = BTreeSet::new();
		for p in &paths {
			let result = registry.register(ModelCreator::builder(p.clone(), "rule").build());
			prop_assert_eq!(result.is_ok(), seen.insert(p.clone()));
		}
		prop_assert_eq!(registry.paths(), seen.into_iter().collect::<Vec<_>>());
	}

	#[test]
	fn children_partition_descendants(paths in prop::collection::vec(model_path(), 1..24)) {
		let registry = ModelRegistry::default();
		for p in &paths {
			let _ = registry.register(ModelCreator::builder(p.clone(), "rule").build());
		}
		for parent in registry.paths() {
			let expected: Vec<_> = registry
				.paths()
				.into_iter()
				.filter(|p| p.is_direct_child_of(&parent))
				.collect();
			prop_assert_eq!(registry.children(&parent), expected);
		}
	}
}
