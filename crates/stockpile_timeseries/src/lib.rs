pub mod codec;
pub mod normalize;
pub mod row;

pub use codec::{CodecError, decode, encode};
pub use normalize::{RawRow, RawSeries, normalize};
pub use row::{Row, RowSet};
