mod split_by_cutter;

pub use split_by_cutter::{SplitByCutter, SplitPiece};
