mod srv_resolver;
mod uri_error;
mod uri_options;
mod uri_parser;

pub use srv_resolver::*;
pub use uri_error::*;
pub use uri_options::*;
pub use uri_parser::*;
