//! 草图引擎：对每条 read 做窗口 minimizer 选择，产生草图元素。

pub mod element;
pub mod hash;
pub mod minimizer;

pub use element::{Direction, PositionInRead, ReadId, Representation, SketchElement};
pub use minimizer::{minimizers, MinimizerIter, SketchParameters};
