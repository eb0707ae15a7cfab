//! SQL introspection: script sections, placeholders, inline hints, DDL
//! column inference, and binding a descriptor tree against a script.

pub mod bind;
pub mod ddl;
pub mod hints;
pub mod placeholders;
pub mod script;

pub use bind::{
    apply_inline_hints, bind_and_derive, bind_sql, check_placeholders, derive_params_from_ddl,
    BindOptions,
};
pub use hints::{extract_inline_hints, InlineHint};
pub use placeholders::to_positional;
pub use script::{parse, ParsedScript, ParsedStatement, QueryKind};
