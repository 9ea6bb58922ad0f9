mod analyse;
pub use analyse::{AnalyseOutput, analyse_path};

mod dump;
pub use dump::{DumpSummary, archive_name, run_dump};
