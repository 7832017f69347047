//! Owned HTML tree built on top of `quick-xml` events.
//!
//! The compiler needs to splice, move and drop whole subtrees, which a
//! streaming reader/writer pair cannot do, so documents are materialized
//! into [`Node`]s and written back out once all edits are done.
//!
//! ```text
//! &str ──parse()──► Vec<Node> ──(edit in place)──► serialize() ──► String
//! ```

mod node;
mod parse;
mod serialize;

pub use node::{Element, Node, Origin, walk_elements, walk_elements_mut};
pub use parse::parse;
pub use serialize::serialize;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HtmlError {
    #[error("malformed markup at byte {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("unexpected `</{name}>` at byte {position} with no matching open element")]
    UnmatchedEnd { name: String, position: usize },

    #[error("failed to write html")]
    Io(#[from] std::io::Error),

    #[error("serialized html is not valid utf-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}
