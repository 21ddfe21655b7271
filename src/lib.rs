pub mod api;
pub mod ast;
pub mod builder;
pub mod config;
pub mod error;
pub mod events;
pub mod lexer;
pub mod parser;
pub mod rational;
pub mod score;
pub mod tags;
pub mod time_spine;
pub mod writer;

pub use api::{parse, parse_file, parse_with_config, Parsed};
pub use ast::*;
pub use builder::TreeBuilder;
pub use config::ParserConfig;
pub use error::*;
pub use rational::Rational;
pub use score::Score;
pub use tags::{Tag, TagArgs, TagData, TagFactory, TagKind, TagMode};
pub use writer::write_guido;
