pub mod issue;
pub mod parse;

pub use issue::BacklogIssue;
pub use parse::load;
