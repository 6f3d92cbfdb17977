/*!
 * Skeletons: the replay scripts that rebuild a document around its
 * translation units.
 *
 * - `line`: pseudo-skeleton lines written by the emitter
 * - `stack`: the merge cursor and its restore points
 * - `merge`: reconciliation of a pseudo-skeleton with the literal source
 */

pub mod line;
pub mod merge;
pub mod stack;

pub use self::line::{PseudoSkeleton, SkeletonLine};
pub use self::merge::{MergeOptions, MergeOutcome, MergeReport, SkeletonMerger};
pub use self::stack::PositionStack;
