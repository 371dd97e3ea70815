// Feed source implementations
pub mod file;
pub mod sheet;

pub use file::FileSource;
pub use sheet::SheetSource;
