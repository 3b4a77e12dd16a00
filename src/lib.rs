// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Fluent Given-When-Then harness for integration-style tests.
//!
//! A test is driven by a [`Proctor`]: a fluent builder walking the scope
//! through its phases and recording everything that goes wrong instead of
//! failing mid-run. Panics and errors raised by actions land in a
//! phase-tagged failure log, later phases still execute, and only when the
//! scope is disposed does the accumulated state collapse into a single
//! [`Verdict`] signaled to the surrounding test infrastructure.
//!
//! ```rust
//! use proctor::Proctor;
//!
//! let _proctor = Proctor::new("Given_AnEmptyCart_When_AddingOneItem_Then_TheTotalUpdates")
//!     .given(|scope| scope.store().insert("cart", Vec::<u32>::new()))
//!     .when(|scope| {
//!         let cart = scope.store().read::<Vec<u32>>("cart").unwrap();
//!         scope.store().insert_actual(cart.len() + 1);
//!     })
//!     .then(|scope| {
//!         let total = scope.store().actual::<usize>().unwrap();
//!         assert_eq!(*total, 1);
//!     });
//! ```
//!
//! Each scope owns a [`Scope`]: a keyed [store](RunStore) carrying state
//! between phases, an in-process [event bus](Bus), and the
//! [failure log](FailureLog). On top of that the harness manages external
//! resources for the duration of the scope: a system under test spawned
//! through a [`SutFactory`] (serialized process-wide and retried on
//! transient errors), and a browser session opened through a
//! [`BrowserFactory`]. Both are torn down when the scope ends, in reverse
//! order of acquisition.
//!
//! Failures can be declared expected with the
//! [`then_should_have_failed`](Proctor::then_should_have_failed) family, so
//! a test may assert that a scenario really does go wrong. A scope whose
//! `When` phase never received an executable action ends
//! [inconclusive](Verdict::Inconclusive) rather than passing silently.
//!
//! Runtime knobs (spawn retries, backoff, the port range behind
//! [`RANDOM_PORT`], output coloring) come from `PROCTOR_*` environment
//! variables collected into a [`Config`]. With the `output-json` feature
//! enabled, aggregated [run statistics](RunStats) can be exported as JSON.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![deny(nonstandard_style, rustdoc::all, trivial_casts, trivial_numeric_casts)]
#![forbid(non_ascii_idents, unsafe_code)]
#![warn(
    clippy::absolute_paths,
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::as_conversions,
    clippy::as_pointer_underscore,
    clippy::as_ptr_cast_mut,
    clippy::assertions_on_result_states,
    clippy::branches_sharing_code,
    clippy::cfg_not_test,
    clippy::clear_with_drain,
    clippy::clone_on_ref_ptr,
    clippy::coerce_container_to_any,
    clippy::collection_is_never_read,
    clippy::create_dir,
    clippy::dbg_macro,
    clippy::debug_assert_with_mut_call,
    clippy::decimal_literal_representation,
    clippy::default_union_representation,
    clippy::derive_partial_eq_without_eq,
    clippy::doc_include_without_cfg,
    clippy::empty_drop,
    clippy::empty_structs_with_brackets,
    clippy::equatable_if_let,
    clippy::empty_enum_variants_with_brackets,
    clippy::exit,
    clippy::expect_used,
    clippy::fallible_impl_from,
    clippy::filetype_is_file,
    clippy::float_cmp_const,
    clippy::fn_to_numeric_cast_any,
    clippy::get_unwrap,
    clippy::if_then_some_else_none,
    clippy::imprecise_flops,
    clippy::infinite_loop,
    clippy::iter_on_empty_collections,
    clippy::iter_on_single_items,
    clippy::iter_over_hash_type,
    clippy::iter_with_drain,
    clippy::large_include_file,
    clippy::large_stack_frames,
    clippy::let_underscore_untyped,
    clippy::literal_string_with_formatting_args,
    clippy::lossy_float_literal,
    clippy::map_err_ignore,
    clippy::map_with_unused_argument_over_ranges,
    clippy::mem_forget,
    clippy::missing_assert_message,
    clippy::missing_asserts_for_indexing,
    clippy::missing_const_for_fn,
    clippy::missing_docs_in_private_items,
    clippy::module_name_repetitions,
    clippy::multiple_inherent_impl,
    clippy::multiple_unsafe_ops_per_block,
    clippy::mutex_atomic,
    clippy::mutex_integer,
    clippy::needless_collect,
    clippy::needless_pass_by_ref_mut,
    clippy::needless_raw_strings,
    clippy::non_zero_suggestions,
    clippy::nonstandard_macro_braces,
    clippy::option_if_let_else,
    clippy::or_fun_call,
    clippy::panic_in_result_fn,
    clippy::partial_pub_fields,
    clippy::pathbuf_init_then_push,
    clippy::pedantic,
    clippy::precedence_bits,
    clippy::print_stderr,
    clippy::print_stdout,
    clippy::pub_without_shorthand,
    clippy::rc_buffer,
    clippy::rc_mutex,
    clippy::read_zero_byte_vec,
    clippy::redundant_clone,
    clippy::redundant_test_prefix,
    clippy::redundant_type_annotations,
    clippy::renamed_function_params,
    clippy::ref_patterns,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::return_and_then,
    clippy::same_name_method,
    clippy::semicolon_inside_block,
    clippy::set_contains_or_insert,
    clippy::shadow_unrelated,
    clippy::significant_drop_in_scrutinee,
    clippy::significant_drop_tightening,
    clippy::single_option_map,
    clippy::str_to_string,
    clippy::string_add,
    clippy::string_lit_as_bytes,
    clippy::string_lit_chars_any,
    clippy::string_slice,
    clippy::string_to_string,
    clippy::suboptimal_flops,
    clippy::suspicious_operation_groupings,
    clippy::suspicious_xor_used_as_pow,
    clippy::tests_outside_test_module,
    clippy::todo,
    clippy::too_long_first_doc_paragraph,
    clippy::trailing_empty_array,
    clippy::transmute_undefined_repr,
    clippy::trivial_regex,
    clippy::try_err,
    clippy::undocumented_unsafe_blocks,
    clippy::unimplemented,
    clippy::uninhabited_references,
    clippy::unnecessary_safety_comment,
    clippy::unnecessary_safety_doc,
    clippy::unnecessary_self_imports,
    clippy::unnecessary_struct_initialization,
    clippy::unused_peekable,
    clippy::unused_result_ok,
    clippy::unused_trait_names,
    clippy::unwrap_in_result,
    clippy::unwrap_used,
    clippy::use_debug,
    clippy::use_self,
    clippy::useless_let_if_seq,
    clippy::verbose_file_reads,
    clippy::while_float,
    clippy::wildcard_enum_match_arm,
    ambiguous_negative_literals,
    closure_returning_async_block,
    future_incompatible,
    impl_trait_redundant_captures,
    let_underscore_drop,
    macro_use_extern_crate,
    meta_variable_misuse,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    redundant_lifetimes,
    rust_2018_idioms,
    single_use_lifetimes,
    unit_bindings,
    unnameable_types,
    unreachable_pub,
    unstable_features,
    unused,
    variant_size_differences
)]

pub mod browser;
pub mod config;
pub mod engine;
pub mod event;
pub mod failure;
mod macros;
pub mod naming;
mod phase;
mod proctor;
pub mod report;
mod scope;
pub mod store;
pub mod sut;
pub mod verdict;

pub use self::{
    browser::{Browser, BrowserFactory, BrowserOptions, DriverKind},
    config::Config,
    engine::{action, try_action, Action},
    event::{Bus, FailureLogged, PhaseFinished, StoreMutated},
    failure::Failure,
    naming::{InvalidTestName, TestName},
    phase::Phase,
    proctor::Proctor,
    report::{Coloring, RunStats, StatsSnapshot, Styles},
    scope::Scope,
    store::{FailureLog, FailureRecord, RunStore},
    sut::{SpawnError, SutClient, SutFactory, SutHandle, SutOptions, RANDOM_PORT},
    verdict::{Expected, PanicSink, RecordingSink, Verdict, VerdictSink},
};
