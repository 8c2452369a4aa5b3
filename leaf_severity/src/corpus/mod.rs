// THEORY:
// Everything that touches the raw and processed image folders. The `sorter`
// drives the classification core over a corpus; `storage` is the narrow
// file-system interface it and the weather generator go through.

pub mod sorter;
pub mod storage;

pub use sorter::{CorpusLayout, CorpusSorter, Placement, SkippedFile, SortReport, is_eligible};
pub use storage::{CorpusStorage, FsStorage, MemoryStorage};
