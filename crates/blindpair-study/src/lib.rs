//! Blind comparison protocol.
//!
//! Two phases share one artifact, the order sheet:
//!
//! - [`builder`] draws a seeded left/right placement per identity, renders
//!   side-by-side videos and writes the pair's order sheet and index mapping.
//! - [`adapter`], [`decoder`] and [`aggregator`] turn participant records
//!   back into model preferences by routing every A/B pick through the
//!   order sheet, then [`report`] writes the results.

pub mod adapter;
pub mod aggregator;
pub mod builder;
pub mod decoder;
pub mod error;
pub mod logging;
pub mod mapping;
pub mod order_sheet;
pub mod report;

pub use adapter::{AdapterSet, Extraction, RawChoice, RecordAdapter, ResultCodeAdapter, StudyJsonAdapter};
pub use aggregator::{Aggregation, Aggregator, Tally};
pub use builder::{
    draw_placements, overlap, BuildSummary, BuildTarget, ComparisonSetBuilder, Overlap, Placement,
};
pub use decoder::{decode_entry, Decoded, OrderSheetBook};
pub use error::{DecodeError, MalformedRecord, StudyError, StudyResult};
pub use logging::PairLogger;
pub use mapping::IndexMapping;
pub use order_sheet::{render_order_sheet, write_order_sheet, OrderSheet};
pub use report::write_outputs;
