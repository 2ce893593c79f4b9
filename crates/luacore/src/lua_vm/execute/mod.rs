/*----------------------------------------------------------------------
  Core operations with metamethod dispatch

  Every operation here works on values only: no interpreter stack, no
  frames. Library functions and embedders call these directly; metamethod
  handlers are invoked through `call`, so a handler may itself be any
  callable value.

  Locking: table storage is locked only inside raw accesses. A handler
  running during `index` on table T may freely read or write T.
----------------------------------------------------------------------*/

pub mod call;
mod comparison_ops;
mod concat;
mod iteration;
mod metamethod;
mod table_ops;

pub use call::{call, call_function};
pub use comparison_ops::{equals, less_equal, less_than};
pub use concat::{concat, concat_values, tostring};
pub use iteration::{NEXT, for_each, ipairs, lua_next, pairs};
pub use metamethod::{TmKind, call_tm_res, get_metamethod, get_metatable};
pub use table_ops::{index, index_str, len, new_index, raw_len};
