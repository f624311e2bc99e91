pub mod csv;

pub use self::csv::{parse_recording_csv, read_recording_csv, strip_comment_lines};
