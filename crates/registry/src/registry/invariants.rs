#![allow(dead_code)]

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, mpsc};
use std::thread;
use std::time::Duration;

use tessera_primitives::{ModelPath, ModelType};

use crate::config::RegistryConfig;
use crate::creator::ModelCreator;
use crate::error::{ActionError, MaterializationError, ViewError};
use crate::projection::UnmanagedProjection;
use crate::registry::{ModelRegistry, NodeStatus};

fn path(s: &str) -> ModelPath {
	ModelPath::parse(s).unwrap()
}

fn leaf(p: &str) -> ModelCreator {
	ModelCreator::builder(path(p), format!("rule for {p}")).build()
}

/// Invariant: Registering creators at distinct paths never conflicts.
pub(crate) fn inv_distinct_paths_never_conflict() {
	let registry = ModelRegistry::default();
	for p in ["a", "a.b", "a.c", "b", "a.b.c"] {
		registry.register(leaf(p)).unwrap();
	}
	assert_eq!(registry.len(), 5);
}

#[cfg_attr(test, test)]
pub(crate) fn test_distinct_paths_never_conflict() {
	inv_distinct_paths_never_conflict()
}

/// Invariant: A second creator at a registered path MUST be rejected, naming both rules.
pub(crate) fn inv_duplicate_registration_conflicts() {
	let registry = ModelRegistry::default();
	registry
		.register(ModelCreator::builder(path("tasks"), "first").build())
		.unwrap();
	let err = registry
		.register(ModelCreator::builder(path("tasks"), "second").build())
		.unwrap_err();

	assert_eq!(err.path, path("tasks"));
	assert_eq!(err.existing.as_str(), "first");
	assert_eq!(err.incoming.as_str(), "second");
	// The first registration is untouched.
	assert_eq!(
		registry.creator(&path("tasks")).unwrap().descriptor().as_str(),
		"first"
	);
}

#[cfg_attr(test, test)]
pub(crate) fn test_duplicate_registration_conflicts() {
	inv_duplicate_registration_conflicts()
}

/// Invariant: Concurrent materialization of one path runs the pipeline once.
///
/// All callers MUST receive the same node.
pub(crate) fn inv_single_flight_materialization() {
	const THREADS: usize = 8;

	let runs = Arc::new(AtomicUsize::new(0));
	let registry = Arc::new(ModelRegistry::default());
	let counter = Arc::clone(&runs);
	registry
		.register(
			ModelCreator::builder(path("shared"), "rule")
				.projection(UnmanagedProjection::<u64>::new())
				.creation_action(move |node| {
					counter.fetch_add(1, Ordering::SeqCst);
					thread::sleep(Duration::from_millis(20));
					node.set_private_data(7u64);
					Ok(())
				})
				.build(),
		)
		.unwrap();

	let barrier = Arc::new(Barrier::new(THREADS));
	let handles: Vec<_> = (0..THREADS)
		.map(|_| {
			let registry = Arc::clone(&registry);
			let barrier = Arc::clone(&barrier);
			thread::spawn(move || {
				barrier.wait();
				registry.materialize(&path("shared")).unwrap()
			})
		})
		.collect();
	let nodes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

	assert_eq!(runs.load(Ordering::SeqCst), 1);
	for node in &nodes[1..] {
		assert!(Arc::ptr_eq(&nodes[0], node));
	}
	assert_eq!(*nodes[0].as_read_only::<u64>().unwrap().get(), 7);
}

#[cfg_attr(test, test)]
pub(crate) fn test_single_flight_materialization() {
	inv_single_flight_materialization()
}

/// Invariant: A failed node stays failed and re-delivers the same error.
pub(crate) fn inv_failure_is_cached() {
	let runs = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&runs);
	let registry = ModelRegistry::default();
	registry
		.register(
			ModelCreator::builder(path("broken"), "BrokenRules#broken")
				.creation_action(move |_| {
					counter.fetch_add(1, Ordering::SeqCst);
					Err(ActionError::msg("boom"))
				})
				.build(),
		)
		.unwrap();

	let first = registry.materialize(&path("broken")).unwrap_err();
	let second = registry.materialize(&path("broken")).unwrap_err();

	assert_eq!(runs.load(Ordering::SeqCst), 1);
	assert_eq!(first.to_string(), second.to_string());
	assert_eq!(registry.status(&path("broken")), Some(NodeStatus::Failed));
	match (first, second) {
		(MaterializationError::Initializer(first), MaterializationError::Initializer(second)) => {
			assert_eq!(first.descriptor.as_str(), "BrokenRules#broken");
			assert!(Arc::ptr_eq(&first.source, &second.source));
		}
		other => panic!("expected initializer failures, got {other:?}"),
	}
}

#[cfg_attr(test, test)]
pub(crate) fn test_failure_is_cached() {
	inv_failure_is_cached()
}

/// Invariant: Concurrent callers of a failing pipeline run it once.
///
/// Every caller MUST receive the one cached failure.
pub(crate) fn inv_single_flight_failure() {
	const THREADS: usize = 8;

	let runs = Arc::new(AtomicUsize::new(0));
	let registry = Arc::new(ModelRegistry::default());
	let counter = Arc::clone(&runs);
	registry
		.register(
			ModelCreator::builder(path("flaky"), "FlakyRules#flaky")
				.creation_action(move |_| {
					counter.fetch_add(1, Ordering::SeqCst);
					thread::sleep(Duration::from_millis(20));
					Err(ActionError::msg("boom"))
				})
				.build(),
		)
		.unwrap();

	let barrier = Arc::new(Barrier::new(THREADS));
	let handles: Vec<_> = (0..THREADS)
		.map(|_| {
			let registry = Arc::clone(&registry);
			let barrier = Arc::clone(&barrier);
			thread::spawn(move || {
				barrier.wait();
				registry.materialize(&path("flaky")).unwrap_err()
			})
		})
		.collect();
	let sources: Vec<_> = handles
		.into_iter()
		.map(|h| match h.join().unwrap() {
			MaterializationError::Initializer(err) => err.source,
			other => panic!("expected an initializer failure, got {other:?}"),
		})
		.collect();

	assert_eq!(runs.load(Ordering::SeqCst), 1);
	for source in &sources[1..] {
		assert!(Arc::ptr_eq(&sources[0], source));
	}
	assert_eq!(registry.status(&path("flaky")), Some(NodeStatus::Failed));
}

#[cfg_attr(test, test)]
pub(crate) fn test_single_flight_failure() {
	inv_single_flight_failure()
}

/// Invariant: On overlapping types, the first-registered projection MUST answer.
pub(crate) fn inv_first_registered_projection_wins() {
	let registry = ModelRegistry::default();
	let creator = registry
		.register(
			ModelCreator::builder(path("p"), "rule")
				.projection(UnmanagedProjection::<u32>::read_only())
				.creation_action(|node| {
					node.set_private_data(1u32);
					Ok(())
				})
				.build(),
		)
		.unwrap();
	// Also claims u32 read and write; only consulted where the first says no.
	creator
		.add_projection(UnmanagedProjection::<u32>::new())
		.unwrap();

	let node = registry.materialize(&path("p")).unwrap();
	let u32_ty = ModelType::of::<u32>();
	assert!(node.promise().can_be_viewed_as_read_only(u32_ty));
	assert!(node.promise().can_be_viewed_as_writable(u32_ty));

	let projections = creator.projection().projections();
	let chosen = projections
		.iter()
		.position(|p| p.can_be_viewed_as_read_only(u32_ty));
	assert_eq!(chosen, Some(0));
	let chosen = projections
		.iter()
		.position(|p| p.can_be_viewed_as_writable(u32_ty));
	assert_eq!(chosen, Some(1));

	// Both resolve to the same backing state.
	let write = node.as_writable::<u32>().unwrap();
	write.update(|v| *v = 9);
	assert_eq!(*node.as_read_only::<u32>().unwrap().get(), 9);
}

#[cfg_attr(test, test)]
pub(crate) fn test_first_registered_projection_wins() {
	inv_first_registered_projection_wins()
}

/// Invariant: Projections added before realization are reflected; after it they MUST fail.
pub(crate) fn inv_add_projection_after_realization_fails() {
	let registry = ModelRegistry::default();
	let creator = registry
		.register(
			ModelCreator::builder(path("late"), "rule")
				.creation_action(|node| {
					node.set_private_data(String::from("x"));
					Ok(())
				})
				.build(),
		)
		.unwrap();

	let str_ty = ModelType::of::<String>();
	assert!(!creator.promise().can_be_viewed_as_read_only(str_ty));
	creator
		.add_projection(UnmanagedProjection::<String>::new())
		.unwrap();
	assert!(creator.promise().can_be_viewed_as_read_only(str_ty));

	let node = registry.materialize(&path("late")).unwrap();
	assert!(creator.is_frozen());

	let err = creator
		.add_projection(UnmanagedProjection::<u8>::new())
		.unwrap_err();
	assert_eq!(err.path, path("late"));
	assert!(!node.promise().can_be_viewed_as_read_only(ModelType::of::<u8>()));
	assert_eq!(node.as_read_only::<String>().unwrap().cloned(), "x");
}

#[cfg_attr(test, test)]
pub(crate) fn test_add_projection_after_realization_fails() {
	inv_add_projection_after_realization_fails()
}

/// Invariant: A failed node's projection list is frozen too.
pub(crate) fn inv_failed_node_is_frozen() {
	let registry = ModelRegistry::default();
	let creator = registry
		.register(
			ModelCreator::builder(path("f"), "rule")
				.creation_action(|_| Err(ActionError::msg("no")))
				.build(),
		)
		.unwrap();
	registry.materialize(&path("f")).unwrap_err();
	assert!(
		creator
			.add_projection(UnmanagedProjection::<u8>::new())
			.is_err()
	);
}

#[cfg_attr(test, test)]
pub(crate) fn test_failed_node_is_frozen() {
	inv_failed_node_is_frozen()
}

/// Invariant: Concurrent appends to one creator MUST NOT lose updates.
pub(crate) fn inv_concurrent_add_projection_no_lost_updates() {
	const THREADS: usize = 8;
	const PER_THREAD: usize = 50;

	let registry = ModelRegistry::default();
	let creator = registry.register(leaf("busy")).unwrap();
	thread::scope(|scope| {
		for _ in 0..THREADS {
			let creator = &creator;
			scope.spawn(move || {
				for _ in 0..PER_THREAD {
					creator
						.add_projection(UnmanagedProjection::<u8>::new())
						.unwrap();
				}
			});
		}
	});
	assert_eq!(creator.projection().len(), THREADS * PER_THREAD);
}

#[cfg_attr(test, test)]
pub(crate) fn test_concurrent_add_projection_no_lost_updates() {
	inv_concurrent_add_projection_no_lost_updates()
}

/// Invariant: The synthetic stamp runs after user registration actions.
///
/// A declared flag MUST override what user actions set; an undeclared one leaves it alone.
pub(crate) fn inv_hidden_stamp_runs_last() {
	let registry = ModelRegistry::default();
	let seen = Arc::new(AtomicUsize::new(0));
	let observed = Arc::clone(&seen);
	registry
		.register(
			ModelCreator::builder(path("root.declared"), "rule")
				.hidden(false)
				.registration_action(|node| {
					node.set_hidden(true);
					Ok(())
				})
				.creation_action(move |node| {
					observed.store(usize::from(node.is_hidden()) + 1, Ordering::SeqCst);
					Ok(())
				})
				.build(),
		)
		.unwrap();
	registry
		.register(
			ModelCreator::builder(path("root.user"), "rule")
				.registration_action(|node| {
					node.set_hidden(true);
					Ok(())
				})
				.build(),
		)
		.unwrap();
	registry
		.register(ModelCreator::builder(path("root.plain"), "rule").build())
		.unwrap();

	let declared = registry.materialize(&path("root.declared")).unwrap();
	assert!(!declared.is_hidden());
	// Creation actions observe the stamped value.
	assert_eq!(seen.load(Ordering::SeqCst), 1);

	assert!(registry.materialize(&path("root.user")).unwrap().is_hidden());
	assert!(!registry.materialize(&path("root.plain")).unwrap().is_hidden());
}

#[cfg_attr(test, test)]
pub(crate) fn test_hidden_stamp_runs_last() {
	inv_hidden_stamp_runs_last()
}

/// Invariant: A failed view request MUST list the readable and writable types on offer.
pub(crate) fn inv_no_view_lists_offered_types() {
	let registry = ModelRegistry::default();
	registry
		.register(
			ModelCreator::builder(path("opts"), "rule")
				.projection(UnmanagedProjection::<String>::read_only())
				.projection(UnmanagedProjection::<u32>::new())
				.build(),
		)
		.unwrap();
	let node = registry.materialize(&path("opts")).unwrap();

	let ViewError::NoView(err) = node.as_writable::<String>().unwrap_err() else {
		panic!("expected NoView");
	};
	assert_eq!(
		err.readable,
		vec![ModelType::of::<String>(), ModelType::of::<u32>()]
	);
	assert_eq!(err.writable, vec![ModelType::of::<u32>()]);
	assert_eq!(err.offered(), &[ModelType::of::<u32>()]);
	assert!(err.to_string().contains("writable types: [u32]"), "{err}");

	registry.register(leaf("bare")).unwrap();
	let bare = registry.materialize(&path("bare")).unwrap();
	let ViewError::NoView(err) = bare.as_read_only::<u8>().unwrap_err() else {
		panic!("expected NoView");
	};
	assert!(err.readable.is_empty() && err.writable.is_empty());
	assert!(err.to_string().contains("no projections are registered"), "{err}");
}

#[cfg_attr(test, test)]
pub(crate) fn test_no_view_lists_offered_types() {
	inv_no_view_lists_offered_types()
}

fn materializes(target: &'static str, p: &str) -> ModelCreator {
	ModelCreator::builder(path(p), format!("{p} needs {target}"))
		.creation_action(move |node| {
			node.materialize(&path(target))?;
			Ok(())
		})
		.build()
}

/// Invariant: A same-thread cycle MUST fail fast with every path on it reporting the cycle.
pub(crate) fn inv_same_thread_cycle() {
	let registry = ModelRegistry::default();
	registry.register(materializes("b", "a")).unwrap();
	registry.register(materializes("a", "b")).unwrap();

	let err_a = registry.materialize(&path("a")).unwrap_err();
	let err_b = registry.materialize(&path("b")).unwrap_err();

	for err in [&err_a, &err_b] {
		let cycle = err.as_cycle().expect("cycle error");
		assert!(cycle.involves(&path("a")));
		assert!(cycle.involves(&path("b")));
	}
	let cycle: Vec<_> = err_a.as_cycle().unwrap().paths().cloned().collect();
	assert_eq!(cycle, vec![path("a"), path("b"), path("a")]);
	assert_eq!(
		err_a.as_cycle().unwrap().links[1].descriptor.as_str(),
		"b needs a"
	);
}

#[cfg_attr(test, test)]
pub(crate) fn test_same_thread_cycle() {
	inv_same_thread_cycle()
}

/// Invariant: A cycle spanning two threads MUST be detected instead of deadlocking.
pub(crate) fn inv_cross_thread_cycle() {
	let registry = Arc::new(ModelRegistry::default());
	let barrier = Arc::new(Barrier::new(2));
	for (p, target) in [("a", "b"), ("b", "a")] {
		let barrier = Arc::clone(&barrier);
		registry
			.register(
				ModelCreator::builder(path(p), format!("{p} needs {target}"))
					.creation_action(move |node| {
						// Both nodes are claimed before either asks for the other.
						barrier.wait();
						node.materialize(&path(target))?;
						Ok(())
					})
					.build(),
			)
			.unwrap();
	}

	let (tx, rx) = mpsc::channel();
	for p in ["a", "b"] {
		let registry = Arc::clone(&registry);
		let tx = tx.clone();
		thread::spawn(move || {
			let _ = tx.send((p, registry.materialize(&path(p))));
		});
	}

	for _ in 0..2 {
		let (p, result) = rx
			.recv_timeout(Duration::from_secs(10))
			.expect("cycle was not detected in time");
		let err = result.unwrap_err();
		let cycle = err.as_cycle().unwrap_or_else(|| panic!("{p}: {err}"));
		assert!(cycle.involves(&path("a")) && cycle.involves(&path("b")));
	}
	assert_eq!(registry.status(&path("a")), Some(NodeStatus::Failed));
	assert_eq!(registry.status(&path("b")), Some(NodeStatus::Failed));
}

#[cfg_attr(test, test)]
pub(crate) fn test_cross_thread_cycle() {
	inv_cross_thread_cycle()
}

/// Invariant: A panicking action MUST fail the node rather than leave it materializing.
pub(crate) fn inv_panic_fails_node() {
	let registry = ModelRegistry::default();
	registry
		.register(
			ModelCreator::builder(path("explodes"), "rule")
				.creation_action(|_| panic!("action exploded"))
				.build(),
		)
		.unwrap();

	let unwound = panic::catch_unwind(AssertUnwindSafe(|| registry.materialize(&path("explodes"))));
	assert!(unwound.is_err());

	let err = registry.materialize(&path("explodes")).unwrap_err();
	assert!(matches!(err, MaterializationError::Panicked { .. }), "{err}");
	assert_eq!(registry.status(&path("explodes")), Some(NodeStatus::Failed));
}

#[cfg_attr(test, test)]
pub(crate) fn test_panic_fails_node() {
	inv_panic_fails_node()
}

/// Invariant: A panic on the owning thread MUST release callers parked on another thread.
pub(crate) fn inv_panic_releases_waiters() {
	let registry = Arc::new(ModelRegistry::default());
	let started = Arc::new(Barrier::new(2));
	let entered = Arc::clone(&started);
	registry
		.register(
			ModelCreator::builder(path("explodes"), "rule")
				.creation_action(move |_| {
					entered.wait();
					// Give the waiter time to park on the in-flight node.
					thread::sleep(Duration::from_millis(50));
					panic!("action exploded")
				})
				.build(),
		)
		.unwrap();

	let owner = {
		let registry = Arc::clone(&registry);
		thread::spawn(move || registry.materialize(&path("explodes")))
	};
	started.wait();
	assert_eq!(
		registry.status(&path("explodes")),
		Some(NodeStatus::Materializing)
	);

	let (tx, rx) = mpsc::channel();
	{
		let registry = Arc::clone(&registry);
		thread::spawn(move || {
			let _ = tx.send(registry.materialize(&path("explodes")));
		});
	}

	let err = rx
		.recv_timeout(Duration::from_secs(10))
		.expect("waiter was not released")
		.unwrap_err();
	assert!(matches!(err, MaterializationError::Panicked { .. }), "{err}");
	assert!(owner.join().is_err());
	assert_eq!(registry.status(&path("explodes")), Some(NodeStatus::Failed));
}

#[cfg_attr(test, test)]
pub(crate) fn test_panic_releases_waiters() {
	inv_panic_releases_waiters()
}

/// Invariant: Nesting deeper than the configured limit MUST fail instead of recursing.
pub(crate) fn inv_depth_limit() {
	let registry = ModelRegistry::new(RegistryConfig {
		max_depth: 3,
		..RegistryConfig::default()
	});
	registry.register(materializes("n.b", "n.a")).unwrap();
	registry.register(materializes("n.c", "n.b")).unwrap();
	registry.register(materializes("n.d", "n.c")).unwrap();
	registry.register(leaf("n.d")).unwrap();

	let err = registry.materialize(&path("n.a")).unwrap_err();
	let MaterializationError::Initializer(outer) = &err else {
		panic!("expected an initializer failure, got {err:?}");
	};
	assert_eq!(outer.path, path("n.a"));
	// The deepest request was refused and left registered.
	assert_eq!(registry.status(&path("n.d")), Some(NodeStatus::Registered));
	assert!(registry.materialize(&path("n.d")).is_ok());
}

#[cfg_attr(test, test)]
pub(crate) fn test_depth_limit() {
	inv_depth_limit()
}
