/*!

Pyrite MIR: the typed middle-end of the Pyrite compiler, which lowers
statically-typed Python modules to C extension modules.

The pieces, roughly in dependency order:

- `ty`: erased runtime types with C representations and error sentinels.
- `repr`: the register IR itself (registers, basic blocks, ops, the
  per-function environment, function/class/module IR).
- `primitives`: the registry of typed primitive operations the lowerer
  draws from.
- `cfg`: control-flow graphs derived from a block list.
- `dataflow`: the generic gen/kill analysis engine and the concrete
  analyses (definedness, borrowed arguments, liveness).
- `transform`: exception splitting and reference-count insertion.
- `util::pretty`: the canonical printed form of the IR, which doubles
  as the golden format of the test suite.

The front-end (AST lowering) and back-end (C emission, build driver) are
separate crates; this one owns the IR and everything that rewrites it.

*/

#[macro_use]
extern crate log;

pub mod cfg;
pub mod dataflow;
pub mod errors;
pub mod options;
pub mod primitives;
pub mod repr;
pub mod transform;
pub mod ty;
pub mod util;

pub use crate::cfg::{build_cfg, Cfg};
pub use crate::dataflow::impls::{
    analyze_borrowed_arguments, analyze_live_regs, analyze_maybe_defined_regs,
    analyze_must_defined_regs, analyze_undefined_regs,
};
pub use crate::dataflow::{run_analysis, AnalysisResult, Direction, Lattice};
pub use crate::transform::{insert_exception_handling, insert_ref_count_opcodes};
pub use crate::util::pretty::format_func;
