use pretty_assertions::assert_eq;
use tessera_primitives::{ModelPath, ModelType, RuleDescriptor};

use super::*;
use crate::projection::UnmanagedProjection;

fn path(s: &str) -> ModelPath {
	ModelPath::parse(s).unwrap()
}

#[test]
fn test_build_appends_hidden_stamp_last() {
	let creator = ModelCreator::builder(path("tasks.compile"), "CompileRules#tasks")
		.registration_action_with(RuleDescriptor::from("first"), |_| Ok(()))
		.registration_action_with(RuleDescriptor::from("second"), |_| Ok(()))
		.creation_action(|_| Ok(()))
		.build();

	let descriptors: Vec<_> = creator
		.registration_actions()
		.iter()
		.map(|a| a.descriptor().to_string())
		.collect();
	assert_eq!(descriptors, ["first", "second", "CompileRules#tasks"]);
	assert_eq!(creator.creation_actions().len(), 1);
	assert_eq!(
		creator.creation_actions()[0].descriptor().as_str(),
		"CompileRules#tasks"
	);
}

#[test]
fn test_builder_defaults() {
	let creator = ModelCreator::builder(path("a"), "rule").build();
	assert!(!creator.is_ephemeral());
	assert_eq!(creator.declared_hidden(), None);
	assert!(creator.projection().is_empty());
	assert!(!creator.is_frozen());
	assert_eq!(creator.registration_actions().len(), 1);
	assert!(creator.creation_actions().is_empty());
}

#[test]
fn test_builder_records_flags() {
	let creator = ModelCreator::builder(path("a"), "rule")
		.ephemeral(true)
		.hidden(true)
		.build();
	assert!(creator.is_ephemeral());
	assert_eq!(creator.declared_hidden(), Some(true));
}

#[test]
fn test_promise_sees_projection_added_after_build() {
	let creator = ModelCreator::builder(path("a"), "rule")
		.projection(UnmanagedProjection::<u32>::read_only())
		.build();
	let u32_ty = ModelType::of::<u32>();
	let str_ty = ModelType::of::<String>();

	assert!(creator.promise().can_be_viewed_as_read_only(u32_ty));
	assert!(!creator.promise().can_be_viewed_as_writable(u32_ty));
	assert!(!creator.promise().can_be_viewed_as_read_only(str_ty));

	creator
		.add_projection(UnmanagedProjection::<String>::new())
		.unwrap();
	assert!(creator.promise().can_be_viewed_as_read_only(str_ty));
	assert!(creator.promise().can_be_viewed_as_writable(str_ty));
	assert_eq!(creator.promise().readable_types(), vec![u32_ty, str_ty]);
	assert_eq!(creator.promise().writable_types(), vec![str_ty]);
}

#[test]
fn test_add_projection_after_freeze_fails() {
	let creator = ModelCreator::builder(path("a.b"), "rule")
		.projection(UnmanagedProjection::<u32>::new())
		.build();
	assert_eq!(creator.freeze(), 1);
	assert!(creator.is_frozen());

	let err = creator
		.add_projection(UnmanagedProjection::<String>::new())
		.unwrap_err();
	assert_eq!(err.path, path("a.b"));
	assert_eq!(creator.projection().len(), 1);

	// Freezing again keeps the same contents.
	assert_eq!(creator.freeze(), 1);
}

#[test]
fn test_debug_reports_counts() {
	let creator = ModelCreator::builder(path("a"), "rule")
		.creation_action(|_| Ok(()))
		.build();
	let debug = format!("{creator:?}");
	assert!(debug.contains("registration_actions: 1"), "{debug}");
	assert!(debug.contains("creation_actions: 1"), "{debug}");
}
