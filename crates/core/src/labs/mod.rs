//! Lab reference ranges, flag classification and the reference range catalogue.

pub mod catalogue;
pub mod flag;
pub mod range;

pub use catalogue::LabCatalogue;
pub use flag::{classify, LabFlag};
pub use range::{Bounds, RangeOperator, ReferenceRange};
