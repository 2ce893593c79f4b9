// Reclamation support for the reference-counted object model.
//
// Objects are owned through `Arc` handles; there is no tracing collector.
// Two pieces live here:
// - the process-wide string intern pool, whose entries never keep a string
//   alive by themselves
// - a sweep for metatable cycles (a table that is its own metatable, or
//   tables that are each other's metatables), which reference counting
//   alone cannot reclaim

mod cycle_collector;
mod string_interner;

pub(crate) use cycle_collector::{closes_cycle, register_cycle};
pub use cycle_collector::collect_cycles;
pub use string_interner::{StringInterner, intern, interned_count};
